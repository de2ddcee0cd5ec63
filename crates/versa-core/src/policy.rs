//! Automatic snapshotting and retention.

use crate::error::VersionResult;
use crate::store::{CreateVersion, VersionStore};
use chrono::Duration as ChronoDuration;
use similar::TextDiff;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use versa_storage::{ContentId, UserId, VersionId};

/// Change summary of versions created by the policy.
pub const AUTO_SAVE_SUMMARY: &str = "Auto-saved version";

/// Auto-versioning thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyConfig {
    /// Minimum time between automatic snapshots of one content item.
    pub auto_save_interval: Duration,
    /// Retention cap per content item. Zero disables pruning.
    pub max_versions_per_content: usize,
    /// Minimum dissimilarity, in percent, for a new snapshot.
    pub min_changes_for_version: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            auto_save_interval: Duration::from_secs(300),
            max_versions_per_content: 50,
            min_changes_for_version: 5.0,
        }
    }
}

impl PolicyConfig {
    /// Number of versions kept when the cap is reached, leaving room for
    /// the version about to be created.
    pub fn retention_floor(&self) -> usize {
        let cap = self.max_versions_per_content;
        let target = (cap * 4).div_ceil(5);
        target.min(cap.saturating_sub(1))
    }
}

/// Percentage of `new` that differs from `old`, from 0 (identical) to 100.
///
/// Character-level similarity ratio; this is a cheap magnitude estimate and
/// is not derived from the line diff statistics.
pub fn dissimilarity(old: &str, new: &str) -> f64 {
    if old == new {
        return 0.0;
    }
    let ratio = TextDiff::from_chars(old, new).ratio();
    (1.0 - f64::from(ratio)) * 100.0
}

/// Decides when content changes warrant a new version and enforces the
/// per-content retention cap.
pub struct AutoVersioningPolicy {
    store: Arc<VersionStore>,
    config: PolicyConfig,
}

impl AutoVersioningPolicy {
    pub fn new(store: Arc<VersionStore>, config: PolicyConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Snapshot `current` if enough time has passed and it differs enough
    /// from the latest version. `Ok(None)` means no snapshot was needed.
    pub async fn check_and_create_version(
        &self,
        content_id: ContentId,
        current: &str,
        author_id: UserId,
    ) -> VersionResult<Option<VersionId>> {
        let Some(latest) = self.store.latest_version(content_id).await? else {
            debug!(content_id, "No prior version, snapshotting");
            return self.create(content_id, current, author_id).await.map(Some);
        };

        let interval =
            ChronoDuration::from_std(self.config.auto_save_interval).unwrap_or(ChronoDuration::MAX);
        let elapsed = self.store.clock().now() - latest.created_at;
        if elapsed < interval {
            debug!(
                content_id,
                elapsed_secs = elapsed.num_seconds(),
                "Auto-save interval not reached"
            );
            return Ok(None);
        }

        let score = match self.store.get_version_text(latest.id).await {
            Ok(previous) => dissimilarity(&previous, current),
            Err(e) if e.is_not_found() => {
                warn!(content_id, version_id = latest.id, "Latest version vanished");
                100.0
            }
            Err(e) => return Err(e),
        };
        if score < self.config.min_changes_for_version {
            debug!(content_id, score, "Change below threshold");
            return Ok(None);
        }

        let cap = self.config.max_versions_per_content;
        if cap > 0 && self.store.count_versions(content_id).await? >= cap {
            self.prune(content_id, self.config.retention_floor()).await?;
        }

        self.create(content_id, current, author_id).await.map(Some)
    }

    async fn create(
        &self,
        content_id: ContentId,
        current: &str,
        author_id: UserId,
    ) -> VersionResult<VersionId> {
        self.store
            .create_version(
                content_id,
                current.as_bytes(),
                CreateVersion::new(author_id, AUTO_SAVE_SUMMARY),
            )
            .await
    }

    /// Delete the oldest versions of `content_id` until at most `keep`
    /// remain. Leased versions are skipped. Returns the number removed.
    pub async fn prune(&self, content_id: ContentId, keep: usize) -> VersionResult<usize> {
        let versions = self.store.list_versions(content_id).await?;
        let mut excess = versions.len().saturating_sub(keep);
        let mut removed = 0;

        for version in &versions {
            if excess == 0 {
                break;
            }
            if self.store.delete_unleased(version.id).await? {
                removed += 1;
                excess -= 1;
            }
        }

        if removed > 0 {
            info!(content_id, removed, keep, "Pruned versions");
        }
        Ok(removed)
    }

    /// Delete every unleased version older than `days` days, across all
    /// content. Returns the number removed.
    pub async fn cleanup_old_content_versions(&self, days: u32) -> VersionResult<usize> {
        let cutoff = self.store.clock().now() - ChronoDuration::days(i64::from(days));
        let expired = self.store.list_older_than(cutoff).await?;
        let mut removed = 0;

        for version in &expired {
            if self.store.delete_unleased(version.id).await? {
                removed += 1;
            }
        }

        info!(days, removed, "Cleaned up old versions");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::leases::VersionLeases;
    use chrono::{TimeZone, Utc};
    use versa_storage::MemoryStorage;

    fn policy(config: PolicyConfig) -> (AutoVersioningPolicy, Arc<VersionStore>, Arc<ManualClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap(),
        ));
        let store = Arc::new(VersionStore::new(
            storage.clone(),
            storage,
            clock.clone(),
            VersionLeases::new(),
        ));
        (AutoVersioningPolicy::new(store.clone(), config), store, clock)
    }

    #[test]
    fn dissimilarity_bounds() {
        assert_eq!(dissimilarity("same", "same"), 0.0);
        assert!((dissimilarity("abc", "xyz") - 100.0).abs() < 1e-6);
        let partial = dissimilarity("hello world", "hello there");
        assert!(partial > 0.0 && partial < 100.0);
    }

    #[test]
    fn retention_floor_leaves_room() {
        let floor = |cap| {
            PolicyConfig {
                max_versions_per_content: cap,
                ..Default::default()
            }
            .retention_floor()
        };
        assert_eq!(floor(10), 8);
        assert_eq!(floor(3), 2);
        assert_eq!(floor(2), 1);
        assert_eq!(floor(1), 0);
    }

    #[tokio::test]
    async fn first_call_always_snapshots() {
        let (policy, store, _) = policy(PolicyConfig::default());
        let id = policy.check_and_create_version(1, "draft", 5).await.unwrap();
        assert!(id.is_some());
        let meta = store.get_version_metadata(id.unwrap()).await.unwrap();
        assert_eq!(meta.change_summary, AUTO_SAVE_SUMMARY);
        assert_eq!(meta.author_id, 5);
    }

    #[tokio::test]
    async fn interval_and_threshold_gate_snapshots() {
        let (policy, _, clock) = policy(PolicyConfig {
            auto_save_interval: Duration::from_secs(60),
            min_changes_for_version: 1.0,
            ..Default::default()
        });

        assert!(policy.check_and_create_version(1, "text", 1).await.unwrap().is_some());
        assert!(policy.check_and_create_version(1, "text", 1).await.unwrap().is_none());

        clock.advance(ChronoDuration::seconds(30));
        assert!(policy
            .check_and_create_version(1, "entirely new text", 1)
            .await
            .unwrap()
            .is_none());

        clock.advance(ChronoDuration::seconds(30));
        assert!(policy.check_and_create_version(1, "text", 1).await.unwrap().is_none());
        assert!(policy
            .check_and_create_version(1, "entirely new text", 1)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn pruning_keeps_newest_within_cap() {
        let cap = 5;
        let (policy, store, clock) = policy(PolicyConfig {
            auto_save_interval: Duration::from_secs(1),
            max_versions_per_content: cap,
            min_changes_for_version: 0.0,
        });

        let mut created = Vec::new();
        for i in 0..=cap {
            clock.advance(ChronoDuration::seconds(10));
            let id = policy
                .check_and_create_version(1, &format!("revision {i}"), 1)
                .await
                .unwrap()
                .unwrap();
            created.push(id);
            assert!(store.count_versions(1).await.unwrap() <= cap);
        }

        let kept: Vec<_> = store
            .list_versions(1)
            .await
            .unwrap()
            .iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(kept, created[created.len() - kept.len()..].to_vec());
        assert_eq!(kept.last(), created.last());
    }

    #[tokio::test]
    async fn prune_skips_leased_versions() {
        let (policy, store, clock) = policy(PolicyConfig::default());
        let mut ids = Vec::new();
        for i in 0..4 {
            clock.advance(ChronoDuration::seconds(1));
            ids.push(
                store
                    .create_version(1, format!("v{i}").as_bytes(), CreateVersion::new(1, "v"))
                    .await
                    .unwrap(),
            );
        }

        let _lease = store.leases().lease(ids[0]);
        assert_eq!(policy.prune(1, 2).await.unwrap(), 2);

        let remaining: Vec<_> = store
            .list_versions(1)
            .await
            .unwrap()
            .iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(remaining, vec![ids[0], ids[3]]);
    }

    #[tokio::test]
    async fn cleanup_removes_only_old_versions() {
        let (policy, store, clock) = policy(PolicyConfig::default());
        let old_a = store
            .create_version(1, b"a", CreateVersion::new(1, "a"))
            .await
            .unwrap();
        let old_b = store
            .create_version(2, b"b", CreateVersion::new(1, "b"))
            .await
            .unwrap();
        clock.advance(ChronoDuration::days(40));
        let fresh = store
            .create_version(1, b"c", CreateVersion::new(1, "c"))
            .await
            .unwrap();

        assert_eq!(policy.cleanup_old_content_versions(30).await.unwrap(), 2);
        assert!(store.get_version_metadata(old_a).await.unwrap_err().is_not_found());
        assert!(store.get_version_metadata(old_b).await.unwrap_err().is_not_found());
        assert!(store.get_version_metadata(fresh).await.is_ok());
    }
}
