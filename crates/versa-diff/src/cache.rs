//! Optional cache for comparison results.

use crate::op::{ContentFormat, DiffResult};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Storage for computed diffs. Implementations must be safe to share
/// across tasks; a failed lookup simply means a recomputation.
pub trait DiffCache: Send + Sync {
    fn get(&self, key: &str) -> Option<DiffResult>;
    fn set(&self, key: &str, value: DiffResult, ttl: Duration);
}

/// Cache key for a comparison: hex SHA-256 over the format and both inputs.
pub fn cache_key(old: &str, new: &str, format: ContentFormat) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update((old.len() as u64).to_le_bytes());
    hasher.update(old.as_bytes());
    hasher.update(new.as_bytes());
    hex::encode(hasher.finalize())
}

struct Entry {
    expires_at: Instant,
    value: DiffResult,
}

/// Process-local [`DiffCache`] with per-entry expiry.
#[derive(Default)]
pub struct MemoryDiffCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryDiffCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|e| e.expires_at > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, e| e.expires_at > now);
        }
    }
}

impl DiffCache for MemoryDiffCache {
    fn get(&self, key: &str) -> Option<DiffResult> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: DiffResult, ttl: Duration) {
        let Some(expires_at) = Instant::now().checked_add(ttl) else {
            return;
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), Entry { expires_at, value });
        }
    }
}
