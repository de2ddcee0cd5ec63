//! Content diffing for versa.
//!
//! This crate provides:
//! - A Myers shortest-edit-script implementation
//! - Line diffs for plain text and normalized HTML, with word-level
//!   detail for changed HTML lines
//! - Key-wise diffs and three-way conflict checks for structured content
//! - Line merges with conflict markers and resolution-driven structured
//!   merges
//! - Conflict detection, statistics, report formatting and patching
//! - An optional result cache

pub mod cache;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod format;
pub mod html;
pub mod merge;
pub mod myers;
pub mod op;
pub mod patch;
pub mod stats;
pub mod structured;
pub mod text;

pub use cache::{cache_key, DiffCache, MemoryDiffCache};
pub use conflict::{detect_conflicts, mark_conflicts, Conflict, OVERLAP_REASON};
pub use engine::{DiffConfig, DiffEngine};
pub use error::{DiffError, Result};
pub use format::format_diff;
pub use merge::{
    apply_resolutions, merge_lines, merge_structured, LineMerge, LineMergeOptions, Resolution,
    StructuredMerge,
};
pub use op::{ContentFormat, DiffOp, DiffResult};
pub use patch::apply_patch;
pub use stats::{diff_stats, DiffStats};
pub use structured::{FieldChange, MergeConflict, StructuredChange, TreeValue};
