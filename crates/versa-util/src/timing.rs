//! RAII timing for diff computations and storage round-trips.
//!
//! # Example
//!
//! ```rust,ignore
//! use versa_util::timing::TimingGuard;
//!
//! fn compare(old: &str, new: &str) {
//!     let _timing = TimingGuard::diff("text");
//!     // ... run Myers ...
//!     // Duration is logged when _timing is dropped
//! }
//! ```

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// RAII guard that measures and logs the duration of an operation.
pub struct TimingGuard {
    /// Category of operation (e.g. "diff", "restore")
    operation_type: &'static str,
    /// Name of the specific operation (e.g. "html", "structured")
    operation_name: String,
    start: Instant,
    /// Minimum duration to log at info level (below this uses debug)
    info_threshold_ms: u64,
    /// Minimum duration to log at warn level
    warn_threshold_ms: u64,
}

impl TimingGuard {
    /// Create a new timing guard. The duration is logged on drop.
    pub fn new(operation_type: &'static str, operation_name: impl Into<String>) -> Self {
        Self {
            operation_type,
            operation_name: operation_name.into(),
            start: Instant::now(),
            info_threshold_ms: 100,
            warn_threshold_ms: 2000,
        }
    }

    /// Timing guard for a diff computation.
    pub fn diff(name: impl Into<String>) -> Self {
        Self::new("diff", name)
    }

    /// Timing guard for a restore transaction.
    pub fn restore(name: impl Into<String>) -> Self {
        Self::new("restore", name)
    }

    /// Set the threshold for info-level logging (in milliseconds).
    pub fn with_info_threshold(mut self, ms: u64) -> Self {
        self.info_threshold_ms = ms;
        self
    }

    /// Set the threshold for warn-level logging (in milliseconds).
    pub fn with_warn_threshold(mut self, ms: u64) -> Self {
        self.warn_threshold_ms = ms;
        self
    }

    /// Get the elapsed time so far.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get the elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

fn format_duration(duration_ms: u128) -> String {
    if duration_ms < 1000 {
        format!("{duration_ms}ms")
    } else if duration_ms < 60_000 {
        format!("{:.2}s", duration_ms as f64 / 1000.0)
    } else {
        let mins = duration_ms / 60_000;
        let secs = (duration_ms % 60_000) as f64 / 1000.0;
        format!("{mins}m {secs:.1}s")
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_millis();
        let duration = format_duration(duration_ms);

        if duration_ms >= self.warn_threshold_ms as u128 {
            warn!(
                operation_type = self.operation_type,
                operation_name = %self.operation_name,
                duration_ms = duration_ms as u64,
                duration = %duration,
                "Slow operation completed"
            );
        } else if duration_ms >= self.info_threshold_ms as u128 {
            info!(
                operation_type = self.operation_type,
                operation_name = %self.operation_name,
                duration_ms = duration_ms as u64,
                duration = %duration,
                "Operation completed"
            );
        } else {
            debug!(
                operation_type = self.operation_type,
                operation_name = %self.operation_name,
                duration_ms = duration_ms as u64,
                "Operation completed"
            );
        }
    }
}
