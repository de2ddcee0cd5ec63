//! Replay a line diff onto its old text.

use crate::op::DiffOp;
use crate::text::split_lines;
use std::collections::{BTreeMap, BTreeSet};

/// Apply the ops of a line diff to `old`, producing the new text.
///
/// Equal ops are optional; lines not mentioned by any op are carried over.
/// For any two LF texts `a` and `b`, `apply_patch(a, &text::compare(a, b)) == b`.
/// Output lines are joined with `\n`.
pub fn apply_patch(old: &str, ops: &[DiffOp]) -> String {
    if ops.is_empty() {
        return old.to_string();
    }

    let old_lines = split_lines(old);
    let mut removed = BTreeSet::new();
    let mut inserted: BTreeMap<usize, &str> = BTreeMap::new();

    for op in ops {
        match op {
            DiffOp::Equal { .. } => {}
            DiffOp::Insert { new_pos, content } => {
                inserted.insert(*new_pos, content);
            }
            DiffOp::Delete { old_pos, .. } => {
                removed.insert(*old_pos);
            }
            DiffOp::Change {
                old_pos,
                new_pos,
                new_content,
                ..
            } => {
                removed.insert(*old_pos);
                inserted.insert(*new_pos, new_content);
            }
        }
    }

    let mut out: Vec<&str> = Vec::with_capacity(old_lines.len() + inserted.len());
    let mut i = 0;
    loop {
        if let Some(line) = inserted.get(&out.len()) {
            out.push(line);
        } else if i < old_lines.len() {
            if !removed.contains(&i) {
                out.push(old_lines[i]);
            }
            i += 1;
        } else {
            break;
        }
    }

    out.join("\n")
}
