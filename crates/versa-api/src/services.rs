//! Composition root.
//!
//! Builds the full service graph from a set of storage backends and a
//! resolved [`VersaConfig`]. Nothing else in the workspace constructs
//! services directly outside of tests.

use crate::api::VersionControlApi;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use versa_core::{
    AutoVersioningPolicy, Clock, RevisionHistory, RollbackManager, SystemClock, VersaConfig,
    VersionLeases, VersionMerger, VersionStore,
};
use versa_diff::{DiffEngine, MemoryDiffCache};
use versa_storage::{
    AuditLog, AuthorDirectory, BlobStore, JsonStorage, LiveContentStore, MemoryStorage,
    MetadataStore,
};

/// Storage collaborators and the clock shared by every service.
#[derive(Clone)]
pub struct Backends {
    pub metadata: Arc<dyn MetadataStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub live: Arc<dyn LiveContentStore>,
    pub audit: Arc<dyn AuditLog>,
    pub authors: Arc<dyn AuthorDirectory>,
    pub clock: Arc<dyn Clock>,
}

impl Backends {
    /// Every backend served by one storage value.
    pub fn single<S>(storage: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: MetadataStore + BlobStore + LiveContentStore + AuditLog + AuthorDirectory + 'static,
    {
        Self {
            metadata: storage.clone(),
            blobs: storage.clone(),
            live: storage.clone(),
            audit: storage.clone(),
            authors: storage,
            clock,
        }
    }

    /// Ephemeral in-memory backends.
    pub fn memory() -> Self {
        Self::single(Arc::new(MemoryStorage::new()), Arc::new(SystemClock))
    }

    /// File backends rooted at `dir`.
    pub fn json(dir: impl AsRef<Path>) -> Self {
        Self::single(
            Arc::new(JsonStorage::new(dir.as_ref())),
            Arc::new(SystemClock),
        )
    }
}

/// The wired service graph.
pub struct Services {
    pub engine: Arc<DiffEngine>,
    pub store: Arc<VersionStore>,
    pub policy: Arc<AutoVersioningPolicy>,
    pub rollback: Arc<RollbackManager>,
    pub history: Arc<RevisionHistory>,
    pub merger: Arc<VersionMerger>,
    pub api: Arc<VersionControlApi>,
}

impl Services {
    pub fn build(backends: Backends, config: &VersaConfig) -> Self {
        let mut engine = DiffEngine::new(config.diff_config());
        if config.cache_enabled() {
            engine = engine.with_cache(Arc::new(MemoryDiffCache::new()));
        }
        let engine = Arc::new(engine);

        let store = Arc::new(VersionStore::new(
            backends.metadata,
            backends.blobs,
            backends.clock,
            VersionLeases::new(),
        ));
        let policy = Arc::new(AutoVersioningPolicy::new(
            store.clone(),
            config.policy_config(),
        ));
        let rollback = Arc::new(RollbackManager::new(
            store.clone(),
            backends.live,
            backends.audit,
            backends.authors.clone(),
            engine.clone(),
        ));
        let history = Arc::new(RevisionHistory::new(
            store.clone(),
            backends.authors,
            engine.clone(),
            config.preview_lines(),
        ));
        let merger = Arc::new(VersionMerger::new(store.clone(), engine.clone()));
        let api = Arc::new(VersionControlApi::new(
            store.clone(),
            policy.clone(),
            rollback.clone(),
            history.clone(),
            merger.clone(),
        ));

        info!(
            cache = config.cache_enabled(),
            max_versions = policy.config().max_versions_per_content,
            "Version services ready"
        );

        Self {
            engine,
            store,
            policy,
            rollback,
            history,
            merger,
            api,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_services_handle_requests() {
        let services = Services::build(Backends::memory(), &VersaConfig::default());

        let response = services
            .api
            .handle_request(json!({
                "action": "create_version",
                "params": {"content_id": 4, "content": "hello", "user_id": 1}
            }))
            .await;
        assert_eq!(response["status"], "success");
        assert_eq!(services.store.count_versions(4).await.unwrap(), 1);
    }

    #[test]
    fn config_reaches_services() {
        let config = VersaConfig::parse_jsonc(
            r#"{"auto_versioning": {"max_versions_per_content": 7}, "diff": {"cache_enabled": false}}"#,
            "test",
        )
        .unwrap();
        let services = Services::build(Backends::memory(), &config);
        assert_eq!(services.policy.config().max_versions_per_content, 7);
        assert!(format!("{:?}", services.engine).contains("cached: false"));
    }
}
