//! JSON file-based storage implementation.
//!
//! Records are stored one file per key under a base directory:
//! ```text
//! base_dir/
//!   sequence.json          # last allocated version id
//!   versions/<id>.json     # VersionRecord
//!   blobs/<id>.bin         # version body
//!   live/<content_id>.bin  # live content body
//!   authors/<user_id>.json # display name
//!   audit.jsonl            # one AuditEntry per line
//! ```
//! Single-file writes are atomic (write to a temp file, then rename).

use crate::record::sort_chronologically;
use crate::{
    check_id, AuditEntry, AuditLevel, AuditLog, AuthorDirectory, BlobStore, ContentId,
    LiveContentStore, MetadataStore, NewVersion, StorageError, StorageResult, UserId, VersionId,
    VersionRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sequence {
    last_id: VersionId,
}

#[derive(Debug, Serialize, Deserialize)]
struct AuthorFile {
    display_name: String,
}

/// JSON file-based storage implementing every versa storage trait.
#[derive(Clone)]
pub struct JsonStorage {
    base_path: PathBuf,
    sequence_lock: Arc<Mutex<()>>,
    audit_lock: Arc<Mutex<()>>,
}

impl JsonStorage {
    /// Create a new JSON storage at the given base path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            sequence_lock: Arc::new(Mutex::new(())),
            audit_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The base directory of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn version_path(&self, id: VersionId) -> PathBuf {
        self.base_path.join("versions").join(format!("{id}.json"))
    }

    fn blob_path(&self, id: VersionId) -> PathBuf {
        self.base_path.join("blobs").join(format!("{id}.bin"))
    }

    fn live_path(&self, content_id: ContentId) -> PathBuf {
        self.base_path.join("live").join(format!("{content_id}.bin"))
    }

    fn author_path(&self, user_id: UserId) -> PathBuf {
        self.base_path.join("authors").join(format!("{user_id}.json"))
    }

    fn audit_path(&self) -> PathBuf {
        self.base_path.join("audit.jsonl")
    }

    async fn read_bytes(path: &Path) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
        match Self::read_bytes(path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn write_bytes(path: &Path, bytes: &[u8]) -> StorageResult<()> {
        debug!(path = %path.display(), "Writing to storage");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);
        fs::write(&temp_path, bytes).await?;
        fs::rename(&temp_path, path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
        let content = serde_json::to_vec_pretty(value)?;
        Self::write_bytes(path, &content).await
    }

    async fn remove_file(path: &Path) -> StorageResult<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn allocate_id(&self) -> StorageResult<VersionId> {
        let _guard = self.sequence_lock.lock().await;
        let path = self.base_path.join("sequence.json");
        let mut sequence: Sequence = Self::read_json(&path).await?.unwrap_or_default();
        sequence.last_id += 1;
        Self::write_json(&path, &sequence).await?;
        Ok(sequence.last_id)
    }

    /// Load every version record, skipping files that vanish mid-scan.
    async fn load_versions(&self) -> StorageResult<Vec<VersionRecord>> {
        let dir = self.base_path.join("versions");
        let mut records = Vec::new();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(StorageError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            match Self::read_json::<VersionRecord>(&path).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!(path = %path.display(), "Version removed during scan"),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable version"),
            }
        }

        sort_chronologically(&mut records);
        Ok(records)
    }

    async fn append_audit(&self, entry: AuditEntry) -> StorageResult<()> {
        let _guard = self.audit_lock.lock().await;
        fs::create_dir_all(&self.base_path).await?;

        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.audit_path())
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for JsonStorage {
    async fn put(&self, version_id: VersionId, body: &[u8]) -> StorageResult<()> {
        check_id("version", version_id)?;
        Self::write_bytes(&self.blob_path(version_id), body).await
    }

    async fn get(&self, version_id: VersionId) -> StorageResult<Vec<u8>> {
        check_id("version", version_id)?;
        Self::read_bytes(&self.blob_path(version_id))
            .await?
            .ok_or_else(|| StorageError::not_found("version body", version_id))
    }

    async fn delete(&self, version_id: VersionId) -> StorageResult<()> {
        check_id("version", version_id)?;
        Self::remove_file(&self.blob_path(version_id)).await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for JsonStorage {
    async fn insert(&self, version: NewVersion) -> StorageResult<VersionRecord> {
        check_id("content", version.content_id)?;
        let id = self.allocate_id().await?;
        let record = version.into_record(id);
        Self::write_json(&self.version_path(id), &record).await?;
        Ok(record)
    }

    async fn get(&self, version_id: VersionId) -> StorageResult<Option<VersionRecord>> {
        check_id("version", version_id)?;
        Self::read_json(&self.version_path(version_id)).await
    }

    async fn update(&self, record: &VersionRecord) -> StorageResult<()> {
        check_id("version", record.id)?;
        let path = self.version_path(record.id);
        if !fs::try_exists(&path).await? {
            return Err(StorageError::not_found("version", record.id));
        }
        Self::write_json(&path, record).await
    }

    async fn delete(&self, version_id: VersionId) -> StorageResult<bool> {
        check_id("version", version_id)?;
        Self::remove_file(&self.version_path(version_id)).await
    }

    async fn list_for_content(&self, content_id: ContentId) -> StorageResult<Vec<VersionRecord>> {
        let mut records = self.load_versions().await?;
        records.retain(|r| r.content_id == content_id);
        Ok(records)
    }

    async fn list_older_than(&self, cutoff: DateTime<Utc>) -> StorageResult<Vec<VersionRecord>> {
        let mut records = self.load_versions().await?;
        records.retain(|r| r.created_at < cutoff);
        Ok(records)
    }

    async fn list_all(&self) -> StorageResult<Vec<VersionRecord>> {
        self.load_versions().await
    }
}

#[async_trait]
impl AuditLog for JsonStorage {
    async fn log_action(&self, actor_id: UserId, action: &str, message: &str) -> StorageResult<()> {
        self.append_audit(AuditEntry::new(actor_id, action, message, AuditLevel::Info))
            .await
    }

    async fn log_error(&self, actor_id: UserId, action: &str, message: &str) -> StorageResult<()> {
        self.append_audit(AuditEntry::new(actor_id, action, message, AuditLevel::Error))
            .await
    }

    async fn entries(&self) -> StorageResult<Vec<AuditEntry>> {
        let Some(bytes) = Self::read_bytes(&self.audit_path()).await? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for line in bytes.split(|b| *b == b'\n') {
            if line.is_empty() {
                continue;
            }
            entries.push(serde_json::from_slice(line)?);
        }
        Ok(entries)
    }
}

#[async_trait]
impl LiveContentStore for JsonStorage {
    async fn get(&self, content_id: ContentId) -> StorageResult<Vec<u8>> {
        check_id("content", content_id)?;
        Self::read_bytes(&self.live_path(content_id))
            .await?
            .ok_or_else(|| StorageError::not_found("content", content_id))
    }

    async fn set(&self, content_id: ContentId, body: &[u8]) -> StorageResult<()> {
        check_id("content", content_id)?;
        Self::write_bytes(&self.live_path(content_id), body).await
    }

    async fn delete(&self, content_id: ContentId) -> StorageResult<bool> {
        check_id("content", content_id)?;
        Self::remove_file(&self.live_path(content_id)).await
    }
}

#[async_trait]
impl AuthorDirectory for JsonStorage {
    async fn display_name(&self, user_id: UserId) -> StorageResult<Option<String>> {
        check_id("user", user_id)?;
        let file: Option<AuthorFile> = Self::read_json(&self.author_path(user_id)).await?;
        Ok(file.map(|f| f.display_name))
    }

    async fn register(&self, user_id: UserId, display_name: &str) -> StorageResult<()> {
        check_id("user", user_id)?;
        let file = AuthorFile {
            display_name: display_name.to_string(),
        };
        Self::write_json(&self.author_path(user_id), &file).await
    }
}
