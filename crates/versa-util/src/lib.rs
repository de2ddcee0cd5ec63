//! Shared utilities for versa.
//!
//! - Logging setup with tracing
//! - RAII-based timing for diff and storage operations

pub mod log;
pub mod timing;

pub use log::{LogConfig, LogLevel};
pub use timing::TimingGuard;
