//! Subcommand implementations.

pub mod diff;
pub mod maintenance;
pub mod request;
pub mod serve;

use std::path::PathBuf;
use tracing::{info, warn};
use versa_api::{Backends, Services};
use versa_core::VersaConfig;

/// Where version data lives for this invocation.
fn data_dir(config: &VersaConfig) -> Option<PathBuf> {
    config
        .data_dir()
        .map(PathBuf::from)
        .or_else(versa_util::log::default_data_dir)
}

/// Build the service graph over the configured backend.
pub fn services(config: &VersaConfig, memory: bool) -> Services {
    let backends = match (memory, data_dir(config)) {
        (false, Some(dir)) => {
            info!(dir = %dir.display(), "Using JSON storage");
            Backends::json(dir)
        }
        (false, None) => {
            warn!("No data directory available, falling back to memory storage");
            Backends::memory()
        }
        (true, _) => Backends::memory(),
    };
    Services::build(backends, config)
}
