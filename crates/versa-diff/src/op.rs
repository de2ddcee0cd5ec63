//! Diff result types.

use crate::myers::{Edit, EditKind};
use crate::structured::FieldChange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single line (or word) level difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffOp {
    /// Unchanged element present in both inputs.
    Equal {
        old_pos: usize,
        new_pos: usize,
        content: String,
    },
    /// Element only present in the new input.
    Insert { new_pos: usize, content: String },
    /// Element only present in the old input.
    Delete { old_pos: usize, content: String },
    /// Element replaced in place.
    Change {
        old_pos: usize,
        new_pos: usize,
        old_content: String,
        new_content: String,
        /// Word-level diff of the two contents (HTML comparisons only).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        word_diff: Option<Vec<DiffOp>>,
        /// Reason this change overlaps another diff, if it does.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conflict: Option<String>,
    },
}

impl DiffOp {
    /// Build a change op without word diff or conflict annotation.
    pub fn change(
        old_pos: usize,
        new_pos: usize,
        old_content: impl Into<String>,
        new_content: impl Into<String>,
    ) -> Self {
        DiffOp::Change {
            old_pos,
            new_pos,
            old_content: old_content.into(),
            new_content: new_content.into(),
            word_diff: None,
            conflict: None,
        }
    }

    /// The line this op is reported at: the new position for inserts and
    /// changes, the old position for deletes. `None` for equal ops.
    pub fn line(&self) -> Option<usize> {
        match self {
            DiffOp::Equal { .. } => None,
            DiffOp::Insert { new_pos, .. } => Some(*new_pos),
            DiffOp::Delete { old_pos, .. } => Some(*old_pos),
            DiffOp::Change { new_pos, .. } => Some(*new_pos),
        }
    }

    pub fn is_equal(&self) -> bool {
        matches!(self, DiffOp::Equal { .. })
    }

    /// Short name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            DiffOp::Equal { .. } => "equal",
            DiffOp::Insert { .. } => "insert",
            DiffOp::Delete { .. } => "delete",
            DiffOp::Change { .. } => "change",
        }
    }
}

/// The outcome of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "changes", rename_all = "snake_case")]
pub enum DiffResult {
    /// Line diff of text or normalized HTML.
    Lines(Vec<DiffOp>),
    /// Key-wise diff of structured content.
    Structured(Vec<FieldChange>),
}

impl DiffResult {
    pub fn empty() -> Self {
        DiffResult::Lines(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DiffResult::Lines(ops) => ops.is_empty(),
            DiffResult::Structured(changes) => changes.is_empty(),
        }
    }

    /// Line ops of a text/HTML diff; empty for structured diffs.
    pub fn ops(&self) -> &[DiffOp] {
        match self {
            DiffResult::Lines(ops) => ops,
            DiffResult::Structured(_) => &[],
        }
    }

    pub fn ops_mut(&mut self) -> Option<&mut Vec<DiffOp>> {
        match self {
            DiffResult::Lines(ops) => Some(ops),
            DiffResult::Structured(_) => None,
        }
    }
}

/// How content is interpreted for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    #[default]
    Text,
    Html,
    Structured,
}

impl ContentFormat {
    /// Map the `is_html` / `is_structured` flag pair. Structured wins.
    pub fn from_flags(is_html: bool, is_structured: bool) -> Self {
        if is_structured {
            ContentFormat::Structured
        } else if is_html {
            ContentFormat::Html
        } else {
            ContentFormat::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentFormat::Text => "text",
            ContentFormat::Html => "html",
            ContentFormat::Structured => "structured",
        }
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(ContentFormat::Text),
            "html" => Ok(ContentFormat::Html),
            "structured" | "json" => Ok(ContentFormat::Structured),
            other => Err(format!("unknown content format: {other}")),
        }
    }
}

/// Convert an edit script into diff ops.
///
/// Each run of consecutive non-equal edits is a hunk replacing a block of
/// old elements with a block of new ones. The k-th deletion of a hunk is
/// paired with its k-th insertion into a [`DiffOp::Change`]; the unpaired
/// remainder is emitted as plain deletions, then insertions.
pub fn ops_from_script<S: AsRef<str>>(
    old: &[S],
    new: &[S],
    edits: &[Edit],
    include_equal: bool,
) -> Vec<DiffOp> {
    let mut ops = Vec::new();
    let mut deletes: Vec<usize> = Vec::new();
    let mut inserts: Vec<usize> = Vec::new();

    for edit in edits {
        match edit.kind {
            EditKind::Delete => deletes.push(edit.old_pos),
            EditKind::Insert => inserts.push(edit.new_pos),
            EditKind::Equal => {
                flush_hunk(old, new, &mut deletes, &mut inserts, &mut ops);
                if include_equal {
                    ops.push(DiffOp::Equal {
                        old_pos: edit.old_pos,
                        new_pos: edit.new_pos,
                        content: old[edit.old_pos].as_ref().to_string(),
                    });
                }
            }
        }
    }
    flush_hunk(old, new, &mut deletes, &mut inserts, &mut ops);

    ops
}

fn flush_hunk<S: AsRef<str>>(
    old: &[S],
    new: &[S],
    deletes: &mut Vec<usize>,
    inserts: &mut Vec<usize>,
    ops: &mut Vec<DiffOp>,
) {
    let paired = deletes.len().min(inserts.len());

    for (&old_pos, &new_pos) in deletes.iter().zip(inserts.iter()) {
        ops.push(DiffOp::change(
            old_pos,
            new_pos,
            old[old_pos].as_ref(),
            new[new_pos].as_ref(),
        ));
    }
    for &old_pos in &deletes[paired..] {
        ops.push(DiffOp::Delete {
            old_pos,
            content: old[old_pos].as_ref().to_string(),
        });
    }
    for &new_pos in &inserts[paired..] {
        ops.push(DiffOp::Insert {
            new_pos,
            content: new[new_pos].as_ref().to_string(),
        });
    }

    deletes.clear();
    inserts.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::myers;

    #[test]
    fn test_substitution_becomes_change() {
        let old = ["a", "b", "c"];
        let new = ["a", "x", "c"];
        let ops = ops_from_script(&old, &new, &myers::diff(&old, &new), false);

        assert_eq!(ops, vec![DiffOp::change(1, 1, "b", "x")]);
    }

    #[test]
    fn test_uneven_hunk_keeps_remainder() {
        let old = ["a", "b", "c", "d"];
        let new = ["a", "x", "d"];
        let ops = ops_from_script(&old, &new, &myers::diff(&old, &new), false);

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], DiffOp::change(1, 1, "b", "x"));
        assert_eq!(
            ops[1],
            DiffOp::Delete {
                old_pos: 2,
                content: "c".to_string()
            }
        );
    }

    #[test]
    fn test_include_equal_emits_full_script() {
        let old = ["a", "b"];
        let new = ["a", "b", "c"];
        let ops = ops_from_script(&old, &new, &myers::diff(&old, &new), true);

        let kinds: Vec<_> = ops.iter().map(DiffOp::kind).collect();
        assert_eq!(kinds, vec!["equal", "equal", "insert"]);
        assert_eq!(ops[2].line(), Some(2));
    }

    #[test]
    fn test_op_serializes_with_kind_tag() {
        let json = serde_json::to_value(DiffOp::change(1, 1, "b", "c")).unwrap();
        assert_eq!(json["kind"], "change");
        assert_eq!(json["old_content"], "b");
        assert!(json.get("word_diff").is_none());
    }

    #[test]
    fn test_format_from_flags_and_str() {
        assert_eq!(ContentFormat::from_flags(false, false), ContentFormat::Text);
        assert_eq!(ContentFormat::from_flags(true, false), ContentFormat::Html);
        assert_eq!(ContentFormat::from_flags(true, true), ContentFormat::Structured);
        assert_eq!("HTML".parse::<ContentFormat>(), Ok(ContentFormat::Html));
        assert!("yaml".parse::<ContentFormat>().is_err());
    }
}
