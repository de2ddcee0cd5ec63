//! Version persistence.
//!
//! A version is a metadata row plus an immutable body blob. The store
//! guarantees that a version never exists with metadata but no body: the
//! row is written first and removed again if the blob write fails.

use crate::clock::Clock;
use crate::error::{VersionError, VersionResult};
use crate::leases::VersionLeases;
use std::sync::Arc;
use tracing::{debug, info, warn};
use versa_storage::{
    sort_chronologically, BlobStore, ContentId, MetadataStore, NewVersion, UserId, VersionId,
    VersionRecord,
};

/// Attributes of a version being created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateVersion {
    pub author_id: UserId,
    pub change_summary: String,
    pub is_major: bool,
    /// Set when the version is a backup taken while restoring another.
    pub restored_from_id: Option<VersionId>,
    pub tags: Vec<String>,
}

impl CreateVersion {
    pub fn new(author_id: UserId, change_summary: impl Into<String>) -> Self {
        Self {
            author_id,
            change_summary: change_summary.into(),
            ..Default::default()
        }
    }

    pub fn major(mut self) -> Self {
        self.is_major = true;
        self
    }
}

/// Mutable metadata of an existing version. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionAmendment {
    pub tags: Option<Vec<String>>,
    pub restoration_notes: Option<String>,
}

/// Creates, reads and deletes versions.
pub struct VersionStore {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    leases: Arc<VersionLeases>,
}

impl VersionStore {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        leases: Arc<VersionLeases>,
    ) -> Self {
        Self {
            metadata,
            blobs,
            clock,
            leases,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn leases(&self) -> &Arc<VersionLeases> {
        &self.leases
    }

    /// Snapshot `content` as a new version of `content_id`.
    ///
    /// Fails with `InvalidArgument` for a non-positive content id or a body
    /// that is empty or only whitespace.
    pub async fn create_version(
        &self,
        content_id: ContentId,
        content: &[u8],
        attrs: CreateVersion,
    ) -> VersionResult<VersionId> {
        if String::from_utf8_lossy(content).trim().is_empty() {
            return Err(VersionError::invalid_argument("content must not be empty"));
        }
        self.write_version(content_id, content, attrs).await
    }

    /// Like [`create_version`](Self::create_version) but accepts an empty
    /// body. Used for restore backups, where live content may be blank.
    pub(crate) async fn write_version(
        &self,
        content_id: ContentId,
        content: &[u8],
        attrs: CreateVersion,
    ) -> VersionResult<VersionId> {
        if content_id <= 0 {
            return Err(VersionError::invalid_argument(format!(
                "content id must be positive, got {content_id}"
            )));
        }

        let record = self
            .metadata
            .insert(NewVersion {
                content_id,
                author_id: attrs.author_id,
                created_at: self.clock.now(),
                change_summary: attrs.change_summary,
                is_major: attrs.is_major,
                restored: attrs.restored_from_id.is_some(),
                restored_from_id: attrs.restored_from_id,
                size_bytes: content.len() as u64,
                tags: attrs.tags,
            })
            .await?;

        if let Err(e) = self.blobs.put(record.id, content).await {
            warn!(
                version_id = record.id,
                content_id,
                error = %e,
                "Blob write failed, removing metadata"
            );
            if let Err(cleanup) = self.metadata.delete(record.id).await {
                warn!(version_id = record.id, error = %cleanup, "Failed to remove orphaned metadata");
            }
            return Err(e.into());
        }

        info!(
            version_id = record.id,
            content_id,
            author_id = record.author_id,
            size_bytes = record.size_bytes,
            "Created version"
        );
        Ok(record.id)
    }

    /// Body of a version.
    pub async fn get_version_content(&self, version_id: VersionId) -> VersionResult<Vec<u8>> {
        debug!(version_id, "Reading version content");
        Ok(self.blobs.get(version_id).await?)
    }

    /// Body of a version as text. Invalid UTF-8 is replaced.
    pub async fn get_version_text(&self, version_id: VersionId) -> VersionResult<String> {
        let bytes = self.get_version_content(version_id).await?;
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }

    pub async fn get_version_metadata(&self, version_id: VersionId) -> VersionResult<VersionRecord> {
        self.metadata
            .get(version_id)
            .await?
            .ok_or_else(|| VersionError::not_found("version", version_id))
    }

    /// Delete body then metadata. Deleting a missing version succeeds.
    pub async fn delete_version(&self, version_id: VersionId) -> VersionResult<()> {
        self.blobs.delete(version_id).await?;
        if self.metadata.delete(version_id).await? {
            info!(version_id, "Deleted version");
        } else {
            debug!(version_id, "Version already deleted");
        }
        Ok(())
    }

    /// Delete a version unless it is leased. Returns whether it was removed.
    pub async fn delete_unleased(&self, version_id: VersionId) -> VersionResult<bool> {
        if self.leases.is_leased(version_id) {
            debug!(version_id, "Skipping leased version");
            return Ok(false);
        }
        self.delete_version(version_id).await?;
        Ok(true)
    }

    /// All versions of a content item, oldest first.
    pub async fn list_versions(&self, content_id: ContentId) -> VersionResult<Vec<VersionRecord>> {
        let mut versions = self.metadata.list_for_content(content_id).await?;
        sort_chronologically(&mut versions);
        Ok(versions)
    }

    pub async fn latest_version(
        &self,
        content_id: ContentId,
    ) -> VersionResult<Option<VersionRecord>> {
        Ok(self.list_versions(content_id).await?.pop())
    }

    pub async fn count_versions(&self, content_id: ContentId) -> VersionResult<usize> {
        Ok(self.metadata.list_for_content(content_id).await?.len())
    }

    /// Every version, oldest first.
    pub async fn list_all(&self) -> VersionResult<Vec<VersionRecord>> {
        let mut versions = self.metadata.list_all().await?;
        sort_chronologically(&mut versions);
        Ok(versions)
    }

    /// Versions created before `cutoff`, across all content.
    pub async fn list_older_than(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> VersionResult<Vec<VersionRecord>> {
        let mut versions = self.metadata.list_older_than(cutoff).await?;
        sort_chronologically(&mut versions);
        Ok(versions)
    }

    /// Update amendable metadata. The body is never touched.
    pub async fn amend_metadata(
        &self,
        version_id: VersionId,
        amendment: VersionAmendment,
    ) -> VersionResult<VersionRecord> {
        let mut record = self.get_version_metadata(version_id).await?;
        if let Some(tags) = amendment.tags {
            record.tags = tags;
        }
        if let Some(notes) = amendment.restoration_notes {
            record.restoration_notes = Some(notes);
        }
        self.metadata.update(&record).await?;
        debug!(version_id, "Amended version metadata");
        Ok(record)
    }
}
