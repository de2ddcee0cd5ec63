//! Storage that fails on command.
//!
//! [`FaultyStorage`] delegates to [`MemoryStorage`] and returns
//! `StorageError::Unavailable` from any operation whose [`Fault`] is armed.
//! Faults can be persistent or one-shot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use versa_storage::{
    AuditEntry, AuditLog, AuthorDirectory, BlobStore, ContentId, LiveContentStore, MemoryStorage,
    MetadataStore, NewVersion, StorageError, StorageResult, UserId, VersionId, VersionRecord,
};

/// An operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    BlobPut,
    BlobGet,
    BlobDelete,
    MetadataInsert,
    MetadataDelete,
    LiveGet,
    LiveSet,
    LiveDelete,
    AuditAction,
    AuditError,
}

#[derive(Debug, Clone, Copy)]
enum Arming {
    Always,
    /// Fail the next `n` calls, then pass.
    Times(usize),
    /// Pass the next `n` calls, then fail once.
    After(usize),
}

/// In-memory storage with injectable failures.
#[derive(Default)]
pub struct FaultyStorage {
    inner: MemoryStorage,
    faults: Mutex<HashMap<Fault, Arming>>,
    calls: Mutex<HashMap<Fault, usize>>,
}

impl FaultyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped storage, for setup that must bypass faults.
    pub fn inner(&self) -> &MemoryStorage {
        &self.inner
    }

    /// Fail every call of `fault` until cleared.
    pub fn fail(&self, fault: Fault) {
        self.arm(fault, Arming::Always);
    }

    /// Fail only the next call of `fault`.
    pub fn fail_once(&self, fault: Fault) {
        self.arm(fault, Arming::Times(1));
    }

    /// Let the next `passes` calls of `fault` through, then fail one.
    pub fn fail_after(&self, fault: Fault, passes: usize) {
        self.arm(fault, Arming::After(passes));
    }

    pub fn clear(&self, fault: Fault) {
        self.lock_faults().remove(&fault);
    }

    pub fn clear_all(&self) {
        self.lock_faults().clear();
    }

    /// How many times `fault`'s operation was attempted.
    pub fn calls(&self, fault: Fault) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&fault)
            .copied()
            .unwrap_or(0)
    }

    fn arm(&self, fault: Fault, arming: Arming) {
        self.lock_faults().insert(fault, arming);
    }

    fn lock_faults(&self) -> std::sync::MutexGuard<'_, HashMap<Fault, Arming>> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, fault: Fault) -> StorageResult<()> {
        *self
            .calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(fault)
            .or_insert(0) += 1;

        let mut faults = self.lock_faults();
        match faults.get(&fault).copied() {
            None => Ok(()),
            Some(Arming::Always) => Err(injected(fault)),
            Some(Arming::Times(n)) => {
                if n <= 1 {
                    faults.remove(&fault);
                } else {
                    faults.insert(fault, Arming::Times(n - 1));
                }
                Err(injected(fault))
            }
            Some(Arming::After(0)) => {
                faults.remove(&fault);
                Err(injected(fault))
            }
            Some(Arming::After(n)) => {
                faults.insert(fault, Arming::After(n - 1));
                Ok(())
            }
        }
    }
}

fn injected(fault: Fault) -> StorageError {
    StorageError::unavailable(format!("injected fault: {fault:?}"))
}

#[async_trait]
impl BlobStore for FaultyStorage {
    async fn put(&self, version_id: VersionId, body: &[u8]) -> StorageResult<()> {
        self.check(Fault::BlobPut)?;
        BlobStore::put(&self.inner, version_id, body).await
    }

    async fn get(&self, version_id: VersionId) -> StorageResult<Vec<u8>> {
        self.check(Fault::BlobGet)?;
        BlobStore::get(&self.inner, version_id).await
    }

    async fn delete(&self, version_id: VersionId) -> StorageResult<()> {
        self.check(Fault::BlobDelete)?;
        BlobStore::delete(&self.inner, version_id).await
    }
}

#[async_trait]
impl MetadataStore for FaultyStorage {
    async fn insert(&self, version: NewVersion) -> StorageResult<VersionRecord> {
        self.check(Fault::MetadataInsert)?;
        self.inner.insert(version).await
    }

    async fn get(&self, version_id: VersionId) -> StorageResult<Option<VersionRecord>> {
        MetadataStore::get(&self.inner, version_id).await
    }

    async fn update(&self, record: &VersionRecord) -> StorageResult<()> {
        self.inner.update(record).await
    }

    async fn delete(&self, version_id: VersionId) -> StorageResult<bool> {
        self.check(Fault::MetadataDelete)?;
        MetadataStore::delete(&self.inner, version_id).await
    }

    async fn list_for_content(&self, content_id: ContentId) -> StorageResult<Vec<VersionRecord>> {
        self.inner.list_for_content(content_id).await
    }

    async fn list_older_than(&self, cutoff: DateTime<Utc>) -> StorageResult<Vec<VersionRecord>> {
        self.inner.list_older_than(cutoff).await
    }

    async fn list_all(&self) -> StorageResult<Vec<VersionRecord>> {
        self.inner.list_all().await
    }
}

#[async_trait]
impl AuditLog for FaultyStorage {
    async fn log_action(&self, actor_id: UserId, action: &str, message: &str) -> StorageResult<()> {
        self.check(Fault::AuditAction)?;
        self.inner.log_action(actor_id, action, message).await
    }

    async fn log_error(&self, actor_id: UserId, action: &str, message: &str) -> StorageResult<()> {
        self.check(Fault::AuditError)?;
        self.inner.log_error(actor_id, action, message).await
    }

    async fn entries(&self) -> StorageResult<Vec<AuditEntry>> {
        self.inner.entries().await
    }
}

#[async_trait]
impl LiveContentStore for FaultyStorage {
    async fn get(&self, content_id: ContentId) -> StorageResult<Vec<u8>> {
        self.check(Fault::LiveGet)?;
        LiveContentStore::get(&self.inner, content_id).await
    }

    async fn set(&self, content_id: ContentId, body: &[u8]) -> StorageResult<()> {
        self.check(Fault::LiveSet)?;
        self.inner.set(content_id, body).await
    }

    async fn delete(&self, content_id: ContentId) -> StorageResult<bool> {
        self.check(Fault::LiveDelete)?;
        LiveContentStore::delete(&self.inner, content_id).await
    }
}

#[async_trait]
impl AuthorDirectory for FaultyStorage {
    async fn display_name(&self, user_id: UserId) -> StorageResult<Option<String>> {
        self.inner.display_name(user_id).await
    }

    async fn register(&self, user_id: UserId, display_name: &str) -> StorageResult<()> {
        self.inner.register(user_id, display_name).await
    }
}
