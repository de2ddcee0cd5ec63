//! Scoped pins that keep versions safe from pruning.
//!
//! Compare and restore operations lease the versions they read. Pruning and
//! age-based cleanup skip any version with an outstanding lease, so a
//! version cannot vanish underneath an operation that is using it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use versa_storage::VersionId;

/// Registry of leased versions, shared by every service of one graph.
#[derive(Debug, Default)]
pub struct VersionLeases {
    counts: Mutex<HashMap<VersionId, usize>>,
}

impl VersionLeases {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn counts(&self) -> MutexGuard<'_, HashMap<VersionId, usize>> {
        self.counts.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Pin a version until the returned guard is dropped. Leases nest.
    pub fn lease(self: &Arc<Self>, version_id: VersionId) -> VersionLease {
        *self.counts().entry(version_id).or_insert(0) += 1;
        VersionLease {
            registry: Arc::clone(self),
            version_id,
        }
    }

    pub fn is_leased(&self, version_id: VersionId) -> bool {
        self.counts().contains_key(&version_id)
    }

    /// Number of distinct versions currently pinned.
    pub fn active(&self) -> usize {
        self.counts().len()
    }

    fn release(&self, version_id: VersionId) {
        let mut counts = self.counts();
        if let Some(count) = counts.get_mut(&version_id) {
            *count -= 1;
            if *count == 0 {
                counts.remove(&version_id);
            }
        }
    }
}

/// RAII guard for one lease.
#[derive(Debug)]
pub struct VersionLease {
    registry: Arc<VersionLeases>,
    version_id: VersionId,
}

impl VersionLease {
    pub fn version_id(&self) -> VersionId {
        self.version_id
    }
}

impl Drop for VersionLease {
    fn drop(&mut self) {
        self.registry.release(self.version_id);
    }
}
