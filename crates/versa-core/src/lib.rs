//! Core version-control services for versa.
//!
//! This crate provides:
//! - [`VersionStore`]: persistence of version metadata and bodies
//! - [`AutoVersioningPolicy`]: time and change based snapshotting with retention
//! - [`RollbackManager`]: compensated restore of historical versions
//! - [`VersionMerger`]: line and structured merges saved as new versions
//! - [`RevisionHistory`]: listing, timeline, search and comparison queries
//! - Configuration loading, a pluggable clock and version leases
//!
//! Services are plain structs shared through `Arc`; wiring them together is
//! left to the caller.

pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod leases;
pub mod merge;
pub mod policy;
pub mod rollback;
pub mod store;
pub mod summary;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::VersaConfig;
pub use error::{ConfigError, ConfigResult, VersionError, VersionResult};
pub use history::{HistoryEntry, RevisionHistory, StorageUsage, TimelineDay};
pub use leases::{VersionLease, VersionLeases};
pub use merge::{MergeOutcome, VersionMerger};
pub use policy::{AutoVersioningPolicy, PolicyConfig};
pub use rollback::{RestoreFailure, RestoreOutcome, RollbackManager};
pub use store::{CreateVersion, VersionAmendment, VersionStore};
pub use summary::VersionSummary;
