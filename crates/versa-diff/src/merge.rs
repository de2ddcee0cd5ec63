//! Merging two versions into one.
//!
//! Text is merged line by line against the base: unchanged lines are kept,
//! additions and deletions follow [`LineMergeOptions`], and lines changed in
//! place become a marked conflict block. Structured content is merged by
//! starting from the current document and taking the incoming value at
//! every path resolved to [`Resolution::Incoming`].

use crate::error::Result;
use crate::op::DiffOp;
use crate::structured::{self, TreeValue, ROOT_KEY};
use crate::text;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MARKER_BASE: &str = "<<<<<<< BASE";
pub const MARKER_SEPARATOR: &str = "=======";
pub const MARKER_OTHER: &str = ">>>>>>> OTHER";

/// How one-sided edits are treated by [`merge_lines`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineMergeOptions {
    /// Take lines that only the other side added.
    pub include_additions: bool,
    /// Drop lines that the other side deleted.
    pub exclude_deletions: bool,
}

impl Default for LineMergeOptions {
    fn default() -> Self {
        Self {
            include_additions: true,
            exclude_deletions: false,
        }
    }
}

/// Result of a line merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMerge {
    pub text: String,
    /// Number of conflict blocks written into `text`.
    pub conflicts: usize,
}

/// Merge `other` into `base`.
pub fn merge_lines(base: &str, other: &str, options: LineMergeOptions) -> LineMerge {
    let mut lines: Vec<&str> = Vec::new();
    let mut conflicts = 0;

    let ops = text::line_ops(base, other, true);
    for op in &ops {
        match op {
            DiffOp::Equal { content, .. } => lines.push(content),
            DiffOp::Insert { content, .. } => {
                if options.include_additions {
                    lines.push(content);
                }
            }
            DiffOp::Delete { content, .. } => {
                if !options.exclude_deletions {
                    lines.push(content);
                }
            }
            DiffOp::Change {
                old_content,
                new_content,
                ..
            } => {
                lines.extend([
                    MARKER_BASE,
                    old_content.as_str(),
                    MARKER_SEPARATOR,
                    new_content.as_str(),
                    MARKER_OTHER,
                ]);
                conflicts += 1;
            }
        }
    }

    LineMerge {
        text: lines.join("\n"),
        conflicts,
    }
}

/// Which side wins at a conflicting path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Current,
    Incoming,
}

/// Build the merged document: `current` with the incoming value taken at
/// every path resolved to [`Resolution::Incoming`]. A path absent from
/// `incoming` is removed from the result.
pub fn apply_resolutions(
    current: &TreeValue,
    incoming: &TreeValue,
    resolutions: &BTreeMap<String, Resolution>,
) -> TreeValue {
    let mut merged = current.clone();
    for (path, resolution) in resolutions {
        if *resolution == Resolution::Incoming {
            let segments = split_path(path);
            let value = lookup(incoming, &segments).cloned();
            assign(&mut merged, &segments, value);
        }
    }
    merged
}

/// Result of a structured merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredMerge {
    pub document: TreeValue,
    /// Conflicting paths with no resolution. These keep the current value.
    pub unresolved: Vec<String>,
}

/// Parse three structured documents and merge `incoming` into `current`
/// using `resolutions`.
pub fn merge_structured(
    base: &str,
    current: &str,
    incoming: &str,
    resolutions: &BTreeMap<String, Resolution>,
) -> Result<StructuredMerge> {
    let base = structured::parse(base)?;
    let current = structured::parse(current)?;
    let incoming = structured::parse(incoming)?;

    let unresolved = structured::merge_conflicts(&base, &current, &incoming)
        .into_iter()
        .map(|conflict| conflict.path)
        .filter(|path| !resolutions.contains_key(path))
        .collect();

    Ok(StructuredMerge {
        document: apply_resolutions(&current, &incoming, resolutions),
        unresolved,
    })
}

fn split_path(path: &str) -> Vec<&str> {
    if path == ROOT_KEY || path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    }
}

fn lookup<'a>(node: &'a TreeValue, segments: &[&str]) -> Option<&'a TreeValue> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(node);
    };
    let child = match node {
        TreeValue::Map(map) => map.get(*first),
        TreeValue::Sequence(items) => first.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }?;
    lookup(child, rest)
}

fn assign(node: &mut TreeValue, segments: &[&str], value: Option<TreeValue>) {
    let Some((first, rest)) = segments.split_first() else {
        *node = value.unwrap_or(TreeValue::Null);
        return;
    };

    match node {
        TreeValue::Map(map) => {
            if !rest.is_empty() {
                let child = map
                    .entry(first.to_string())
                    .or_insert_with(|| TreeValue::Map(BTreeMap::new()));
                assign(child, rest, value);
            } else if let Some(value) = value {
                map.insert(first.to_string(), value);
            } else {
                map.remove(*first);
            }
        }
        TreeValue::Sequence(items) => {
            let Ok(index) = first.parse::<usize>() else {
                return;
            };
            if !rest.is_empty() {
                if let Some(child) = items.get_mut(index) {
                    assign(child, rest, value);
                }
                return;
            }
            match value {
                Some(value) if index < items.len() => items[index] = value,
                Some(value) if index == items.len() => items.push(value),
                None if index < items.len() => {
                    items.remove(index);
                }
                _ => {}
            }
        }
        _ => {
            if value.is_some() {
                *node = TreeValue::Map(BTreeMap::new());
                assign(node, segments, value);
            }
        }
    }
}
