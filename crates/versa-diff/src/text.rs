//! Line-level text diffing.

use crate::myers;
use crate::op::{ops_from_script, DiffOp};

/// Split text into lines on `\n`, dropping the `\r` of CRLF endings. A
/// trailing newline yields a final empty line so that joining with `\n`
/// reproduces LF input exactly.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Line diff without equal ops.
pub fn compare(old: &str, new: &str) -> Vec<DiffOp> {
    if old == new {
        return Vec::new();
    }
    line_ops(old, new, false)
}

/// Line diff, optionally including equal ops for the full script.
pub fn line_ops(old: &str, new: &str, include_equal: bool) -> Vec<DiffOp> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let edits = myers::diff(&old_lines, &new_lines);
    ops_from_script(&old_lines, &new_lines, &edits, include_equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_has_no_ops() {
        assert!(compare("line1\nline2", "line1\nline2").is_empty());
    }

    #[test]
    fn test_changed_last_line() {
        let ops = compare("a\nb", "a\nc");
        assert_eq!(ops, vec![DiffOp::change(1, 1, "b", "c")]);
    }

    #[test]
    fn test_appended_line_is_insert() {
        let ops = compare("a\nb", "a\nb\nc");
        assert_eq!(
            ops,
            vec![DiffOp::Insert {
                new_pos: 2,
                content: "c".to_string()
            }]
        );
    }

    #[test]
    fn test_removed_first_line_is_delete() {
        let ops = compare("x\na\nb", "a\nb");
        assert_eq!(
            ops,
            vec![DiffOp::Delete {
                old_pos: 0,
                content: "x".to_string()
            }]
        );
    }

    #[test]
    fn test_trailing_newline_is_a_line() {
        assert_eq!(split_lines("a\n"), vec!["a", ""]);
        let ops = compare("a", "a\n");
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind(), "insert");
    }

    #[test]
    fn test_crlf_and_lf_compare_equal() {
        assert!(compare("a\r\nb\r\n", "a\nb\n").is_empty());
        assert_eq!(
            compare("a\r\nb", "a\nc"),
            vec![DiffOp::change(1, 1, "b", "c")]
        );
    }

    #[test]
    fn test_line_ops_with_equal() {
        let ops = line_ops("a\nb\nc", "a\nx\nc", true);
        let kinds: Vec<_> = ops.iter().map(DiffOp::kind).collect();
        assert_eq!(kinds, vec!["equal", "change", "equal"]);
    }
}
