//! Plain-text rendering of diffs.

use crate::op::{DiffOp, DiffResult};
use crate::stats::diff_stats;
use crate::structured::{self, StructuredChange, TreeValue};
use std::fmt::Write;

/// Render a diff as a human readable report.
///
/// The output starts with a summary block followed by one entry per op:
/// `+ Line n:` for insertions, `- Line n:` for deletions and `! Line n:`
/// with the old and new line for changes.
pub fn format_diff(diff: &DiffResult) -> String {
    let stats = diff_stats(diff);
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "- Total changes: {}", stats.total);
    let _ = writeln!(out, "- Insertions: {}", stats.insertions);
    let _ = writeln!(out, "- Deletions: {}", stats.deletions);
    let _ = writeln!(out, "- Modifications: {}", stats.changes);
    let _ = writeln!(out, "- Conflicts: {}", stats.conflicts);
    out.push('\n');

    match diff {
        DiffResult::Lines(ops) => {
            for op in ops {
                format_op(&mut out, op);
            }
        }
        DiffResult::Structured(changes) => {
            structured::walk(changes, &mut |path, change| {
                format_field(&mut out, path, change)
            });
        }
    }
    out
}

fn format_op(out: &mut String, op: &DiffOp) {
    match op {
        DiffOp::Equal { .. } => {}
        DiffOp::Insert { new_pos, content } => {
            let _ = writeln!(out, "+ Line {new_pos}: {content}");
        }
        DiffOp::Delete { old_pos, content } => {
            let _ = writeln!(out, "- Line {old_pos}: {content}");
        }
        DiffOp::Change {
            new_pos,
            old_content,
            new_content,
            word_diff,
            conflict,
            ..
        } => {
            let _ = writeln!(out, "! Line {new_pos}:");
            let _ = writeln!(out, "- {old_content}");
            let _ = writeln!(out, "+ {new_content}");

            if let Some(words) = word_diff {
                let _ = writeln!(out, "  Word changes:");
                for word in words {
                    format_word(out, word);
                }
            }
            if let Some(reason) = conflict {
                let _ = writeln!(out, "  CONFLICT: {reason}");
            }
        }
    }
}

fn format_word(out: &mut String, op: &DiffOp) {
    match op {
        DiffOp::Equal { .. } => {}
        DiffOp::Insert { new_pos, content } => {
            let _ = writeln!(out, "    + Word {new_pos}: {content}");
        }
        DiffOp::Delete { old_pos, content } => {
            let _ = writeln!(out, "    - Word {old_pos}: {content}");
        }
        DiffOp::Change {
            new_pos,
            old_content,
            new_content,
            ..
        } => {
            let _ = writeln!(out, "    ! Word {new_pos}:");
            let _ = writeln!(out, "      - {old_content}");
            let _ = writeln!(out, "      + {new_content}");
        }
    }
}

fn format_field(out: &mut String, path: &str, change: &StructuredChange) {
    match change {
        StructuredChange::Added { value } => {
            let _ = writeln!(out, "+ {path}: {}", render(value));
        }
        StructuredChange::Removed { value } => {
            let _ = writeln!(out, "- {path}: {}", render(value));
        }
        StructuredChange::Changed {
            old_value,
            new_value,
        } => {
            let _ = writeln!(out, "! {path}:");
            let _ = writeln!(out, "- {}", render(old_value));
            let _ = writeln!(out, "+ {}", render(new_value));
        }
        StructuredChange::Nested { .. } => {}
    }
}

fn render(value: &TreeValue) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::{detect_conflicts, mark_conflicts};
    use crate::{html, text};

    #[test]
    fn test_format_text_diff() {
        let diff = DiffResult::Lines(text::compare("a\nb", "a\nc\nd"));
        let report = format_diff(&diff);

        assert!(report.starts_with("Summary:\n- Total changes: 2\n"));
        assert!(report.contains("- Modifications: 1\n"));
        assert!(report.contains("! Line 1:\n- b\n+ c\n"));
        assert!(report.contains("+ Line 2: d\n"));
    }

    #[test]
    fn test_format_is_deterministic() {
        let diff = DiffResult::Lines(text::compare("x\ny\nz", "y\nz\nw"));
        assert_eq!(format_diff(&diff), format_diff(&diff.clone()));
        assert!(format_diff(&diff).contains("- Line 0: x\n"));
    }

    #[test]
    fn test_format_word_changes_and_conflicts() {
        let base = "<p>Hello world</p>";
        let mut ours = html::compare(base, "<p>Hello there</p>");
        let theirs = html::compare(base, "<p>Goodbye world</p>");
        let conflicts = detect_conflicts(&ours, &theirs);
        mark_conflicts(&mut ours, &conflicts);

        let report = format_diff(&DiffResult::Lines(ours));
        assert!(report.contains("  Word changes:\n"));
        assert!(report.contains("    ! Word 2:\n      - world</p>\n      + there</p>\n"));
        assert!(report.contains("  CONFLICT: Overlapping changes on same line\n"));
        assert!(report.contains("- Conflicts: 1\n"));
    }

    #[test]
    fn test_format_structured_uses_dotted_paths() {
        let changes = structured::compare(
            r#"{"seo":{"title":"Old"},"draft":true}"#,
            r#"{"seo":{"title":"New"}}"#,
        )
        .unwrap();
        let report = format_diff(&DiffResult::Structured(changes));

        assert!(report.contains("- draft: true\n"));
        assert!(report.contains("! seo.title:\n- \"Old\"\n+ \"New\"\n"));
    }
}
