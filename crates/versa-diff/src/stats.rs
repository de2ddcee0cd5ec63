//! Summary counts for a diff.

use crate::op::{DiffOp, DiffResult};
use crate::structured::{self, StructuredChange, TreeValue};
use serde::{Deserialize, Serialize};

/// Counts describing a [`DiffResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub total: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub changes: usize,
    pub conflicts: usize,
    pub chars_added: usize,
    pub chars_removed: usize,
}

impl DiffStats {
    fn add_op(&mut self, op: &DiffOp) {
        match op {
            DiffOp::Equal { .. } => return,
            DiffOp::Insert { content, .. } => {
                self.insertions += 1;
                self.chars_added += content.len();
            }
            DiffOp::Delete { content, .. } => {
                self.deletions += 1;
                self.chars_removed += content.len();
            }
            DiffOp::Change {
                old_content,
                new_content,
                conflict,
                ..
            } => {
                self.changes += 1;
                self.chars_added += new_content.len();
                self.chars_removed += old_content.len();
                if conflict.is_some() {
                    self.conflicts += 1;
                }
            }
        }
        self.total += 1;
    }

    fn add_field(&mut self, change: &StructuredChange) {
        match change {
            StructuredChange::Added { value } => {
                self.insertions += 1;
                self.chars_added += rendered_len(value);
            }
            StructuredChange::Removed { value } => {
                self.deletions += 1;
                self.chars_removed += rendered_len(value);
            }
            StructuredChange::Changed {
                old_value,
                new_value,
            } => {
                self.changes += 1;
                self.chars_added += rendered_len(new_value);
                self.chars_removed += rendered_len(old_value);
            }
            StructuredChange::Nested { .. } => return,
        }
        self.total += 1;
    }
}

fn rendered_len(value: &TreeValue) -> usize {
    serde_json::to_string(value).map_or(0, |s| s.len())
}

/// Count the ops (or structured leaves) of a diff. Equal ops are ignored.
pub fn diff_stats(diff: &DiffResult) -> DiffStats {
    let mut stats = DiffStats::default();
    match diff {
        DiffResult::Lines(ops) => ops.iter().for_each(|op| stats.add_op(op)),
        DiffResult::Structured(changes) => {
            structured::walk(changes, &mut |_, change| stats.add_field(change))
        }
    }
    stats
}
