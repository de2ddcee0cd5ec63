//! Restoring historical versions into live content.
//!
//! A restore runs as a compensating transaction over backends that have no
//! native transactions:
//!
//! 1. Load the target version's metadata and body.
//! 2. Snapshot the current live content as a "Pre-restore backup" version.
//! 3. Overwrite live content with the target body.
//! 4. Record a `version_restore` audit entry.
//!
//! If step 2, 3 or 4 fails, the previous live bytes are written back (or
//! the live record is removed again if there was none) and the backup
//! version is deleted, so a failed restore leaves no trace other than a
//! `version_restore_failed` audit entry. When that undo itself fails the
//! failure is reported as [`RestoreFailure::RollbackIncomplete`].

use crate::error::VersionError;
use crate::store::{CreateVersion, VersionAmendment, VersionStore};
use crate::summary::VersionSummary;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use versa_diff::{ContentFormat, DiffEngine, DiffResult};
use versa_storage::{AuditLog, AuthorDirectory, ContentId, LiveContentStore, UserId, VersionId};
use versa_util::TimingGuard;

/// Change summary of the backup taken before every restore.
pub const BACKUP_SUMMARY: &str = "Pre-restore backup";

/// Audit action of a successful restore.
pub const ACTION_RESTORE: &str = "version_restore";

/// Audit action of a failed restore.
pub const ACTION_RESTORE_FAILED: &str = "version_restore_failed";

/// Result of a successful restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub version_id: VersionId,
    pub content_id: ContentId,
    /// Version holding the live content as it was before the restore.
    pub backup_version_id: VersionId,
}

/// Why a restore did not happen.
#[derive(Debug, Error)]
pub enum RestoreFailure {
    #[error("version {0} not found")]
    VersionNotFound(VersionId),

    #[error("content unavailable: {0}")]
    ContentUnavailable(VersionError),

    #[error("pre-restore backup failed: {0}")]
    Backup(VersionError),

    #[error("live content write failed: {0}")]
    LiveWrite(VersionError),

    #[error("audit write failed: {0}")]
    Audit(VersionError),

    /// `cause` happened and undoing the partial restore also failed; live
    /// content may hold the target body.
    #[error("{cause}; rollback incomplete")]
    RollbackIncomplete { cause: Box<RestoreFailure> },
}

impl RestoreFailure {
    /// Short name of the failing step.
    pub fn step(&self) -> &'static str {
        match self {
            Self::VersionNotFound(_) => "load_version",
            Self::ContentUnavailable(_) => "load_content",
            Self::Backup(_) => "backup",
            Self::LiveWrite(_) => "live_write",
            Self::Audit(_) => "audit",
            Self::RollbackIncomplete { cause } => cause.step(),
        }
    }

    /// Whether every side effect of the attempt was undone.
    pub fn is_compensated(&self) -> bool {
        !matches!(self, Self::RollbackIncomplete { .. })
    }
}

/// Side effects of an in-flight restore that must be undone on failure.
struct RestoreTransaction {
    content_id: ContentId,
    /// Live body before the attempt; `None` if there was no live record.
    previous: Option<Vec<u8>>,
    backup_id: Option<VersionId>,
    live_touched: bool,
}

impl RestoreTransaction {
    fn begin(content_id: ContentId, previous: Option<Vec<u8>>) -> Self {
        debug!(content_id, "Beginning restore transaction");
        Self {
            content_id,
            previous,
            backup_id: None,
            live_touched: false,
        }
    }

    /// Undo recorded side effects. Returns false if any undo step failed.
    async fn compensate(self, live: &dyn LiveContentStore, store: &VersionStore) -> bool {
        let mut clean = true;

        if self.live_touched {
            let undo = match &self.previous {
                Some(previous) => live.set(self.content_id, previous).await,
                None => live.delete(self.content_id).await.map(|_| ()),
            };
            if let Err(e) = undo {
                error!(content_id = self.content_id, error = %e, "Failed to restore previous live content");
                clean = false;
            }
        }
        if let Some(backup_id) = self.backup_id {
            if let Err(e) = store.delete_version(backup_id).await {
                error!(backup_id, error = %e, "Failed to delete pre-restore backup");
                clean = false;
            }
        }

        if clean {
            info!(content_id = self.content_id, "Restore rolled back");
        }
        clean
    }
}

/// Restores versions into live content and lists restore candidates.
pub struct RollbackManager {
    store: Arc<VersionStore>,
    live: Arc<dyn LiveContentStore>,
    audit: Arc<dyn AuditLog>,
    authors: Arc<dyn AuthorDirectory>,
    engine: Arc<DiffEngine>,
}

impl RollbackManager {
    pub fn new(
        store: Arc<VersionStore>,
        live: Arc<dyn LiveContentStore>,
        audit: Arc<dyn AuditLog>,
        authors: Arc<dyn AuthorDirectory>,
        engine: Arc<DiffEngine>,
    ) -> Self {
        Self {
            store,
            live,
            audit,
            authors,
            engine,
        }
    }

    /// Restore a version into live content. Never fails: any problem is
    /// logged, audited as `version_restore_failed` and reported as `false`.
    pub async fn restore_version(&self, version_id: VersionId, user_id: UserId) -> bool {
        match self.try_restore(version_id, user_id).await {
            Ok(_) => true,
            Err(failure) => {
                error!(
                    version_id,
                    user_id,
                    step = failure.step(),
                    error = %failure,
                    "Version restore failed"
                );
                let message = format!("Restore of version {version_id} failed: {failure}");
                if let Err(e) = self
                    .audit
                    .log_error(user_id, ACTION_RESTORE_FAILED, &message)
                    .await
                {
                    warn!(version_id, error = %e, "Failed to audit restore failure");
                }
                false
            }
        }
    }

    /// Restore a version into live content, reporting why it failed.
    ///
    /// On failure every side effect has been compensated unless the error is
    /// [`RestoreFailure::RollbackIncomplete`]; the caller is responsible for
    /// auditing the failure.
    pub async fn try_restore(
        &self,
        version_id: VersionId,
        user_id: UserId,
    ) -> Result<RestoreOutcome, RestoreFailure> {
        let _timing = TimingGuard::restore(format!("version {version_id}"));
        let _lease = self.store.leases().lease(version_id);

        let target = match self.store.get_version_metadata(version_id).await {
            Ok(target) => target,
            Err(e) if e.is_not_found() => return Err(RestoreFailure::VersionNotFound(version_id)),
            Err(e) => return Err(RestoreFailure::ContentUnavailable(e)),
        };
        let content_id = target.content_id;

        let body = self
            .store
            .get_version_content(version_id)
            .await
            .map_err(RestoreFailure::ContentUnavailable)?;

        let previous = match self.live.get(content_id).await {
            Ok(previous) => Some(previous),
            Err(e) if e.is_not_found() => {
                debug!(content_id, "No live content, backing up empty body");
                None
            }
            Err(e) => return Err(RestoreFailure::ContentUnavailable(e.into())),
        };

        let mut tx = RestoreTransaction::begin(content_id, previous);

        let backup = CreateVersion {
            author_id: user_id,
            change_summary: BACKUP_SUMMARY.to_string(),
            restored_from_id: Some(version_id),
            ..Default::default()
        };
        let previous = tx.previous.as_deref().unwrap_or_default();
        let backup_id = match self.store.write_version(content_id, previous, backup).await {
            Ok(id) => id,
            Err(e) => return Err(self.abort(tx, RestoreFailure::Backup(e)).await),
        };
        tx.backup_id = Some(backup_id);

        tx.live_touched = true;
        if let Err(e) = self.live.set(content_id, &body).await {
            return Err(self.abort(tx, RestoreFailure::LiveWrite(e.into())).await);
        }

        let message = format!(
            "Restored content {content_id} to version {version_id} (backup version {backup_id})"
        );
        if let Err(e) = self.audit.log_action(user_id, ACTION_RESTORE, &message).await {
            return Err(self.abort(tx, RestoreFailure::Audit(e.into())).await);
        }

        info!(version_id, content_id, backup_id, user_id, "Restored version");

        let notes = format!(
            "Restored by user {user_id} at {}; previous content saved as version {backup_id}",
            self.store.clock().now().to_rfc3339()
        );
        if let Err(e) = self
            .store
            .amend_metadata(
                version_id,
                VersionAmendment {
                    restoration_notes: Some(notes),
                    ..Default::default()
                },
            )
            .await
        {
            warn!(version_id, error = %e, "Failed to record restoration notes");
        }

        Ok(RestoreOutcome {
            version_id,
            content_id,
            backup_version_id: backup_id,
        })
    }

    /// Undo `tx` and report `failure`, escalated if the undo was partial.
    async fn abort(&self, tx: RestoreTransaction, failure: RestoreFailure) -> RestoreFailure {
        if tx.compensate(self.live.as_ref(), &self.store).await {
            failure
        } else {
            RestoreFailure::RollbackIncomplete {
                cause: Box::new(failure),
            }
        }
    }

    /// Versions a content item can be rolled back to, newest first.
    pub async fn get_rollback_candidates(
        &self,
        content_id: ContentId,
        limit: usize,
    ) -> Result<Vec<VersionSummary>, VersionError> {
        let versions = self.store.list_versions(content_id).await?;
        let first_id = versions.first().map(|v| v.id);

        let mut candidates = Vec::new();
        for version in versions.iter().rev().take(limit) {
            let author_name = match self.authors.display_name(version.author_id).await {
                Ok(name) => name,
                Err(e) => {
                    warn!(author_id = version.author_id, error = %e, "Author lookup failed");
                    None
                }
            };
            candidates.push(VersionSummary::new(
                version,
                author_name,
                Some(version.id) == first_id,
            ));
        }
        Ok(candidates)
    }

    /// Diff from current live content to the body a restore would install.
    pub async fn preview_restore(
        &self,
        version_id: VersionId,
        format: ContentFormat,
    ) -> Result<DiffResult, VersionError> {
        let _lease = self.store.leases().lease(version_id);
        let target = self.store.get_version_metadata(version_id).await?;
        let body = self.store.get_version_text(version_id).await?;
        let live = match self.live.get(target.content_id).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.is_not_found() => String::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(self.engine.compare(&live, &body, format)?)
    }
}
