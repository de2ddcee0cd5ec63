//! Overlap detection between two independently computed line diffs.

use crate::op::DiffOp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reason attached to every detected overlap.
pub const OVERLAP_REASON: &str = "Overlapping changes on same line";

/// Both diffs touch the same line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub line: usize,
    pub reason: String,
    pub ours: DiffOp,
    pub theirs: DiffOp,
}

/// Changed lines of a diff keyed by [`DiffOp::line`]. A later op on the
/// same line replaces an earlier one.
fn changed_lines(ops: &[DiffOp]) -> BTreeMap<usize, &DiffOp> {
    ops.iter()
        .filter_map(|op| op.line().map(|line| (line, op)))
        .collect()
}

/// Lines changed by both diffs, ascending.
pub fn detect_conflicts(ours: &[DiffOp], theirs: &[DiffOp]) -> Vec<Conflict> {
    let theirs = changed_lines(theirs);

    changed_lines(ours)
        .into_iter()
        .filter_map(|(line, op)| {
            theirs.get(&line).map(|other| Conflict {
                line,
                reason: OVERLAP_REASON.to_string(),
                ours: op.clone(),
                theirs: (*other).clone(),
            })
        })
        .collect()
}

/// Annotate change ops that sit on a conflicting line. Returns how many
/// ops were marked.
pub fn mark_conflicts(ops: &mut [DiffOp], conflicts: &[Conflict]) -> usize {
    let reasons: BTreeMap<usize, &str> = conflicts
        .iter()
        .map(|c| (c.line, c.reason.as_str()))
        .collect();

    let mut marked = 0;
    for op in ops.iter_mut() {
        let line = op.line();
        if let DiffOp::Change { conflict, .. } = op {
            if let Some(reason) = line.and_then(|l| reasons.get(&l)) {
                *conflict = Some((*reason).to_string());
                marked += 1;
            }
        }
    }
    marked
}
