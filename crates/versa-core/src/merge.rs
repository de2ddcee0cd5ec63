//! Merging versions into a new version.
//!
//! Both merges read their inputs under leases and write the result through
//! [`VersionStore::create_version`], so a merge is an ordinary version with
//! a `Merged: ...` change summary.

use crate::error::{VersionError, VersionResult};
use crate::store::{CreateVersion, VersionStore};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use versa_diff::{DiffEngine, LineMergeOptions, MergeConflict, Resolution};
use versa_storage::{ContentId, UserId, VersionId};

/// Change summary prefix of merged versions.
pub const MERGED_PREFIX: &str = "Merged: ";

/// A version produced by a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub version_id: VersionId,
    pub content_id: ContentId,
    /// Conflict blocks written into a line merge.
    pub conflicts: usize,
    /// Conflicting paths of a structured merge left at the current value.
    pub unresolved: Vec<String>,
}

pub struct VersionMerger {
    store: Arc<VersionStore>,
    engine: Arc<DiffEngine>,
}

impl VersionMerger {
    pub fn new(store: Arc<VersionStore>, engine: Arc<DiffEngine>) -> Self {
        Self { store, engine }
    }

    /// Bodies of `ids`, which must all belong to one content item.
    async fn load(&self, ids: &[VersionId]) -> VersionResult<(ContentId, Vec<String>)> {
        let mut content_id = None;
        let mut bodies = Vec::with_capacity(ids.len());
        for &id in ids {
            let record = self.store.get_version_metadata(id).await?;
            match content_id {
                None => content_id = Some(record.content_id),
                Some(expected) if expected != record.content_id => {
                    return Err(VersionError::invalid_argument(format!(
                        "versions {ids:?} belong to different content"
                    )));
                }
                Some(_) => {}
            }
            bodies.push(self.store.get_version_text(id).await?);
        }
        let content_id =
            content_id.ok_or_else(|| VersionError::invalid_argument("no versions to merge"))?;
        Ok((content_id, bodies))
    }

    /// Line-merge `other_id` into `base_id` and save the result. Lines
    /// changed in place are written as marked conflict blocks.
    pub async fn merge_versions(
        &self,
        base_id: VersionId,
        other_id: VersionId,
        user_id: UserId,
        options: LineMergeOptions,
    ) -> VersionResult<MergeOutcome> {
        let leases = self.store.leases();
        let _base_lease = leases.lease(base_id);
        let _other_lease = leases.lease(other_id);

        let (content_id, bodies) = self.load(&[base_id, other_id]).await?;
        let merged = self.engine.merge_lines(&bodies[0], &bodies[1], options)?;

        let version_id = self
            .store
            .create_version(
                content_id,
                merged.text.as_bytes(),
                CreateVersion::new(user_id, format!("{MERGED_PREFIX}v{base_id} + v{other_id}")),
            )
            .await?;

        info!(
            version_id,
            base_id,
            other_id,
            conflicts = merged.conflicts,
            "Merged versions"
        );
        Ok(MergeOutcome {
            version_id,
            content_id,
            conflicts: merged.conflicts,
            unresolved: Vec::new(),
        })
    }

    /// Keys that `current_id` and `incoming_id` changed differently since
    /// `base_id`.
    pub async fn find_conflicts(
        &self,
        base_id: VersionId,
        current_id: VersionId,
        incoming_id: VersionId,
    ) -> VersionResult<Vec<MergeConflict>> {
        let leases = self.store.leases();
        let _leases = [base_id, current_id, incoming_id].map(|id| leases.lease(id));

        let (_, bodies) = self.load(&[base_id, current_id, incoming_id]).await?;
        Ok(self
            .engine
            .merge_conflicts(&bodies[0], &bodies[1], &bodies[2])?)
    }

    /// Three-way structured merge: start from `current_id` and take the
    /// incoming value wherever `resolutions` says so.
    pub async fn merge_structured(
        &self,
        base_id: VersionId,
        current_id: VersionId,
        incoming_id: VersionId,
        resolutions: &BTreeMap<String, Resolution>,
        user_id: UserId,
    ) -> VersionResult<MergeOutcome> {
        let leases = self.store.leases();
        let _leases = [base_id, current_id, incoming_id].map(|id| leases.lease(id));

        let (content_id, bodies) = self.load(&[base_id, current_id, incoming_id]).await?;
        let merged = self
            .engine
            .merge_structured(&bodies[0], &bodies[1], &bodies[2], resolutions)?;
        let body = serde_json::to_string_pretty(&merged.document)
            .map_err(|e| VersionError::InvalidFormat(e.to_string()))?;

        let version_id = self
            .store
            .create_version(
                content_id,
                body.as_bytes(),
                CreateVersion::new(
                    user_id,
                    format!("{MERGED_PREFIX}v{current_id} + v{incoming_id} (base v{base_id})"),
                ),
            )
            .await?;

        info!(
            version_id,
            base_id,
            current_id,
            incoming_id,
            unresolved = merged.unresolved.len(),
            "Merged structured versions"
        );
        Ok(MergeOutcome {
            version_id,
            content_id,
            conflicts: 0,
            unresolved: merged.unresolved,
        })
    }
}
