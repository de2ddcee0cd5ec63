//! In-memory storage implementation.
//!
//! All data lives in process memory and is lost on drop. Used by tests and
//! by the CLI when no data directory is configured.

use crate::record::sort_chronologically;
use crate::{
    check_id, AuditEntry, AuditLevel, AuditLog, AuthorDirectory, BlobStore, ContentId,
    LiveContentStore, MetadataStore, NewVersion, StorageError, StorageResult, UserId, VersionId,
    VersionRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    next_id: VersionId,
    versions: BTreeMap<VersionId, VersionRecord>,
    blobs: HashMap<VersionId, Vec<u8>>,
    live: HashMap<ContentId, Vec<u8>>,
    authors: HashMap<UserId, String>,
    audit: Vec<AuditEntry>,
}

/// In-memory storage implementing every versa storage trait.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    /// Create an empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn collect_sorted<F>(&self, filter: F) -> StorageResult<Vec<VersionRecord>>
    where
        F: Fn(&VersionRecord) -> bool,
    {
        let tables = self.read()?;
        let mut records: Vec<VersionRecord> = tables
            .versions
            .values()
            .filter(|r| filter(r))
            .cloned()
            .collect();
        sort_chronologically(&mut records);
        Ok(records)
    }

    fn append_audit(&self, entry: AuditEntry) -> StorageResult<()> {
        self.write()?.audit.push(entry);
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryStorage {
    async fn put(&self, version_id: VersionId, body: &[u8]) -> StorageResult<()> {
        check_id("version", version_id)?;
        self.write()?.blobs.insert(version_id, body.to_vec());
        Ok(())
    }

    async fn get(&self, version_id: VersionId) -> StorageResult<Vec<u8>> {
        self.read()?
            .blobs
            .get(&version_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("version body", version_id))
    }

    async fn delete(&self, version_id: VersionId) -> StorageResult<()> {
        self.write()?.blobs.remove(&version_id);
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for MemoryStorage {
    async fn insert(&self, version: NewVersion) -> StorageResult<VersionRecord> {
        check_id("content", version.content_id)?;
        let mut tables = self.write()?;
        tables.next_id += 1;
        let record = version.into_record(tables.next_id);
        tables.versions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, version_id: VersionId) -> StorageResult<Option<VersionRecord>> {
        Ok(self.read()?.versions.get(&version_id).cloned())
    }

    async fn update(&self, record: &VersionRecord) -> StorageResult<()> {
        let mut tables = self.write()?;
        match tables.versions.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StorageError::not_found("version", record.id)),
        }
    }

    async fn delete(&self, version_id: VersionId) -> StorageResult<bool> {
        Ok(self.write()?.versions.remove(&version_id).is_some())
    }

    async fn list_for_content(&self, content_id: ContentId) -> StorageResult<Vec<VersionRecord>> {
        self.collect_sorted(|r| r.content_id == content_id)
    }

    async fn list_older_than(&self, cutoff: DateTime<Utc>) -> StorageResult<Vec<VersionRecord>> {
        self.collect_sorted(|r| r.created_at < cutoff)
    }

    async fn list_all(&self) -> StorageResult<Vec<VersionRecord>> {
        self.collect_sorted(|_| true)
    }
}

#[async_trait]
impl AuditLog for MemoryStorage {
    async fn log_action(&self, actor_id: UserId, action: &str, message: &str) -> StorageResult<()> {
        self.append_audit(AuditEntry::new(actor_id, action, message, AuditLevel::Info))
    }

    async fn log_error(&self, actor_id: UserId, action: &str, message: &str) -> StorageResult<()> {
        self.append_audit(AuditEntry::new(actor_id, action, message, AuditLevel::Error))
    }

    async fn entries(&self) -> StorageResult<Vec<AuditEntry>> {
        Ok(self.read()?.audit.clone())
    }
}

#[async_trait]
impl LiveContentStore for MemoryStorage {
    async fn get(&self, content_id: ContentId) -> StorageResult<Vec<u8>> {
        self.read()?
            .live
            .get(&content_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("content", content_id))
    }

    async fn set(&self, content_id: ContentId, body: &[u8]) -> StorageResult<()> {
        check_id("content", content_id)?;
        self.write()?.live.insert(content_id, body.to_vec());
        Ok(())
    }

    async fn delete(&self, content_id: ContentId) -> StorageResult<bool> {
        Ok(self.write()?.live.remove(&content_id).is_some())
    }
}

#[async_trait]
impl AuthorDirectory for MemoryStorage {
    async fn display_name(&self, user_id: UserId) -> StorageResult<Option<String>> {
        Ok(self.read()?.authors.get(&user_id).cloned())
    }

    async fn register(&self, user_id: UserId, display_name: &str) -> StorageResult<()> {
        check_id("user", user_id)?;
        self.write()?
            .authors
            .insert(user_id, display_name.to_string());
        Ok(())
    }
}
