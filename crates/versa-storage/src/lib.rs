//! Storage layer for versa.
//!
//! The versioning services talk to their collaborators only through the
//! traits in this crate:
//! - [`BlobStore`]: immutable version bodies addressed by version id
//! - [`MetadataStore`]: version records, ordered listing and age queries
//! - [`AuditLog`]: append-only actor/action log
//! - [`LiveContentStore`]: the single mutable body of each content item
//! - [`AuthorDirectory`]: display names for author ids
//!
//! Two backends implement all of them:
//! - [`memory::MemoryStorage`] (tests, ephemeral use)
//! - [`json::JsonStorage`] (one JSON/binary file per record)
//!
//! None of the backends provide multi-record transactions; callers that
//! need atomicity across records compensate on failure.

pub mod error;
pub mod json;
pub mod memory;
pub mod record;

pub use error::{StorageError, StorageResult};
pub use json::JsonStorage;
pub use memory::MemoryStorage;
pub use record::{
    sort_chronologically, AuditEntry, AuditLevel, ContentId, NewVersion, UserId, VersionId,
    VersionRecord,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage for version bodies.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the body of a version. Bodies are written once.
    async fn put(&self, version_id: VersionId, body: &[u8]) -> StorageResult<()>;

    /// Read the body of a version.
    ///
    /// Returns [`StorageError::NotFound`] if the body is absent.
    async fn get(&self, version_id: VersionId) -> StorageResult<Vec<u8>>;

    /// Delete the body of a version. Deleting a missing body is not an error.
    async fn delete(&self, version_id: VersionId) -> StorageResult<()>;
}

/// Relational-style storage for version records.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a record, allocating a fresh positive id.
    async fn insert(&self, version: NewVersion) -> StorageResult<VersionRecord>;

    /// Read a record by id.
    async fn get(&self, version_id: VersionId) -> StorageResult<Option<VersionRecord>>;

    /// Replace an existing record (used for metadata amendments).
    ///
    /// Returns [`StorageError::NotFound`] if the record does not exist.
    async fn update(&self, record: &VersionRecord) -> StorageResult<()>;

    /// Delete a record. Returns whether a record was removed.
    async fn delete(&self, version_id: VersionId) -> StorageResult<bool>;

    /// All records of a content item, oldest first.
    async fn list_for_content(&self, content_id: ContentId) -> StorageResult<Vec<VersionRecord>>;

    /// All records created strictly before `cutoff`, oldest first.
    async fn list_older_than(&self, cutoff: DateTime<Utc>) -> StorageResult<Vec<VersionRecord>>;

    /// Every record, oldest first.
    async fn list_all(&self) -> StorageResult<Vec<VersionRecord>>;
}

/// Append-only audit log.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record a successful action.
    async fn log_action(&self, actor_id: UserId, action: &str, message: &str) -> StorageResult<()>;

    /// Record a failed action.
    async fn log_error(&self, actor_id: UserId, action: &str, message: &str) -> StorageResult<()>;

    /// All entries in insertion order.
    async fn entries(&self) -> StorageResult<Vec<AuditEntry>>;
}

/// Accessor for the live (current) body of content items.
///
/// The surrounding content entity owns this record. Within versa only the
/// rollback manager overwrites it.
#[async_trait]
pub trait LiveContentStore: Send + Sync {
    /// Read the live body. Returns [`StorageError::NotFound`] if absent.
    async fn get(&self, content_id: ContentId) -> StorageResult<Vec<u8>>;

    /// Overwrite the live body.
    async fn set(&self, content_id: ContentId, body: &[u8]) -> StorageResult<()>;

    /// Remove the live body. Returns false if there was none.
    async fn delete(&self, content_id: ContentId) -> StorageResult<bool>;
}

/// Lookup of author display names.
#[async_trait]
pub trait AuthorDirectory: Send + Sync {
    /// Display name of a user, if known.
    async fn display_name(&self, user_id: UserId) -> StorageResult<Option<String>>;

    /// Register or rename a user.
    async fn register(&self, user_id: UserId, display_name: &str) -> StorageResult<()>;
}

/// Reject non-positive identifiers before they reach a backend.
pub(crate) fn check_id(kind: &str, id: i64) -> StorageResult<()> {
    if id <= 0 {
        return Err(StorageError::invalid_key(format!("{kind} id must be positive, got {id}")));
    }
    Ok(())
}
