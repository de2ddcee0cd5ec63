//! Restore protocol under injected storage failures.

use versa_core::rollback::{ACTION_RESTORE, ACTION_RESTORE_FAILED, BACKUP_SUMMARY};
use versa_core::RestoreFailure;
use versa_storage::{AuditLevel, AuditLog, LiveContentStore};
use versa_test_utils::{assert_err, assert_ok, Fault, Harness};

async fn audit_actions(h: &Harness) -> Vec<String> {
    h.storage
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect()
}

#[tokio::test]
async fn successful_restore() {
    let h = Harness::new();
    let v1 = h.seed_version(1, "original body").await;
    h.set_live(1, "edited body").await;

    assert!(h.rollback.restore_version(v1, 2).await);

    assert_eq!(h.live(1).await, "original body");
    let versions = h.store.list_versions(1).await.unwrap();
    let backups: Vec<_> = versions
        .iter()
        .filter(|v| v.change_summary == BACKUP_SUMMARY)
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(
        h.store.get_version_content(backups[0].id).await.unwrap(),
        b"edited body"
    );
    assert_eq!(audit_actions(&h).await, vec![ACTION_RESTORE]);
}

#[tokio::test]
async fn live_write_failure_leaves_live_content_unchanged() {
    let h = Harness::new();
    let v1 = h.seed_version(1, "original").await;
    h.set_live(1, "edited").await;
    let before = h.version_ids(1).await;

    h.storage.fail(Fault::LiveSet);
    let failure = assert_err!(h.rollback.try_restore(v1, 2).await);
    assert!(matches!(failure, RestoreFailure::LiveWrite(_)));
    h.storage.clear_all();

    assert_eq!(h.live(1).await, "edited");
    assert_eq!(h.version_ids(1).await, before);
}

#[tokio::test]
async fn audit_failure_rolls_back_live_write() {
    let h = Harness::new();
    let v1 = h.seed_version(1, "original").await;
    h.set_live(1, "edited").await;
    let before = h.version_ids(1).await;

    h.storage.fail_once(Fault::AuditAction);
    assert!(!h.rollback.restore_version(v1, 2).await);

    assert_eq!(h.live(1).await, "edited");
    assert_eq!(h.version_ids(1).await, before);

    let entries = h.storage.entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, ACTION_RESTORE_FAILED);
    assert_eq!(entries[0].level, AuditLevel::Error);
    assert!(entries[0].message.contains("audit"));
}

#[tokio::test]
async fn backup_failure_touches_nothing() {
    let h = Harness::new();
    let v1 = h.seed_version(1, "original").await;
    h.set_live(1, "edited").await;

    h.storage.fail(Fault::BlobPut);
    let failure = assert_err!(h.rollback.try_restore(v1, 2).await);
    assert!(matches!(failure, RestoreFailure::Backup(_)));
    h.storage.clear_all();

    assert_eq!(h.live(1).await, "edited");
    assert_eq!(h.version_ids(1).await, vec![v1]);
    assert_eq!(h.storage.calls(Fault::LiveSet), 0);
}

#[tokio::test]
async fn unreadable_target_body_fails_before_backup() {
    let h = Harness::new();
    let v1 = h.seed_version(1, "original").await;
    h.set_live(1, "edited").await;

    h.storage.fail(Fault::BlobGet);
    let failure = assert_err!(h.rollback.try_restore(v1, 2).await);
    assert!(matches!(failure, RestoreFailure::ContentUnavailable(_)));
    h.storage.clear_all();

    assert_eq!(h.version_ids(1).await, vec![v1]);
    assert_eq!(h.live(1).await, "edited");
}

#[tokio::test]
async fn restore_is_itself_reversible() {
    let h = Harness::new();
    let v1 = h.seed_version(1, "first").await;
    h.set_live(1, "second").await;

    let outcome = assert_ok!(h.rollback.try_restore(v1, 1).await);
    assert_eq!(h.live(1).await, "first");

    assert!(h.rollback.restore_version(outcome.backup_version_id, 1).await);
    assert_eq!(h.live(1).await, "second");
    assert_eq!(
        LiveContentStore::get(h.storage.inner(), 1).await.unwrap(),
        b"second"
    );
}

#[tokio::test]
async fn failed_restore_does_not_create_live_content() {
    let h = Harness::new();
    let v1 = h.seed_version(1, "original").await;

    h.storage.fail_once(Fault::AuditAction);
    assert!(!h.rollback.restore_version(v1, 2).await);

    let live = LiveContentStore::get(h.storage.inner(), 1).await;
    assert!(matches!(live, Err(ref e) if e.is_not_found()), "live: {live:?}");
    assert_eq!(h.version_ids(1).await, vec![v1]);
    assert_eq!(h.storage.calls(Fault::LiveDelete), 1);
}

#[tokio::test]
async fn failed_undo_is_reported_as_incomplete() {
    let h = Harness::new();
    let v1 = h.seed_version(1, "original").await;
    h.set_live(1, "edited").await;

    h.storage.fail_once(Fault::AuditAction);
    h.storage.fail_after(Fault::LiveSet, 1);
    let failure = assert_err!(h.rollback.try_restore(v1, 2).await);
    h.storage.clear_all();

    assert!(!failure.is_compensated());
    assert_eq!(failure.step(), "audit");
    match failure {
        RestoreFailure::RollbackIncomplete { cause } => {
            assert!(matches!(*cause, RestoreFailure::Audit(_)));
        }
        other => panic!("expected incomplete rollback, got {other:?}"),
    }
    assert_eq!(h.live(1).await, "original");
}

#[tokio::test]
async fn incomplete_rollback_is_audited() {
    let h = Harness::new();
    let v1 = h.seed_version(1, "original").await;
    h.set_live(1, "edited").await;

    h.storage.fail_once(Fault::AuditAction);
    h.storage.fail_after(Fault::LiveSet, 1);
    assert!(!h.rollback.restore_version(v1, 2).await);
    h.storage.clear_all();

    let entries = h.storage.entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, ACTION_RESTORE_FAILED);
    assert!(entries[0].message.contains("rollback incomplete"));
}

#[tokio::test]
async fn clean_failure_is_compensated() {
    let h = Harness::new();
    let v1 = h.seed_version(1, "original").await;
    h.set_live(1, "edited").await;

    h.storage.fail_once(Fault::AuditAction);
    let failure = assert_err!(h.rollback.try_restore(v1, 2).await);
    assert!(failure.is_compensated());
}
