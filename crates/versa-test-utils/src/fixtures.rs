//! Pre-wired service graphs for tests.

use crate::faulty::FaultyStorage;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use versa_core::{
    AutoVersioningPolicy, CreateVersion, ManualClock, PolicyConfig, RevisionHistory,
    RollbackManager, VersionLeases, VersionStore,
};
use versa_diff::DiffEngine;
use versa_storage::{ContentId, LiveContentStore, VersionId};

/// Fixed start time of every harness clock: 2024-01-15 09:00:00 UTC.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Core services over one [`FaultyStorage`] and a [`ManualClock`].
pub struct Harness {
    pub storage: Arc<FaultyStorage>,
    pub clock: Arc<ManualClock>,
    pub engine: Arc<DiffEngine>,
    pub store: Arc<VersionStore>,
    pub policy: AutoVersioningPolicy,
    pub rollback: RollbackManager,
    pub history: RevisionHistory,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(PolicyConfig::default())
    }

    pub fn with_policy(config: PolicyConfig) -> Self {
        let storage = Arc::new(FaultyStorage::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let engine = Arc::new(DiffEngine::default());
        let store = Arc::new(VersionStore::new(
            storage.clone(),
            storage.clone(),
            clock.clone(),
            VersionLeases::new(),
        ));

        Self {
            policy: AutoVersioningPolicy::new(store.clone(), config),
            rollback: RollbackManager::new(
                store.clone(),
                storage.clone(),
                storage.clone(),
                storage.clone(),
                engine.clone(),
            ),
            history: RevisionHistory::new(store.clone(), storage.clone(), engine.clone(), 3),
            storage,
            clock,
            engine,
            store,
        }
    }

    /// Create a version authored by user 1.
    pub async fn seed_version(&self, content_id: ContentId, body: &str) -> VersionId {
        self.store
            .create_version(
                content_id,
                body.as_bytes(),
                CreateVersion::new(1, format!("seed {body}")),
            )
            .await
            .unwrap_or_else(|e| panic!("failed to seed version: {e}"))
    }

    /// Overwrite live content, bypassing injected faults.
    pub async fn set_live(&self, content_id: ContentId, body: &str) {
        self.storage
            .inner()
            .set(content_id, body.as_bytes())
            .await
            .unwrap_or_else(|e| panic!("failed to set live content: {e}"));
    }

    /// Current live content as text, bypassing injected faults.
    pub async fn live(&self, content_id: ContentId) -> String {
        let bytes = LiveContentStore::get(self.storage.inner(), content_id)
            .await
            .unwrap_or_else(|e| panic!("failed to read live content: {e}"));
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Ids of all versions of a content item, oldest first.
    pub async fn version_ids(&self, content_id: ContentId) -> Vec<VersionId> {
        self.store
            .list_versions(content_id)
            .await
            .unwrap_or_else(|e| panic!("failed to list versions: {e}"))
            .into_iter()
            .map(|v| v.id)
            .collect()
    }
}
