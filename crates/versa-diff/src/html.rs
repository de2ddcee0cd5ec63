//! HTML-aware diffing.
//!
//! Markup is normalized before the line diff so that whitespace and
//! attribute order do not register as changes. Changed lines get an
//! additional word-level diff in which HTML entities are single tokens.

use crate::myers;
use crate::op::{ops_from_script, DiffOp};
use crate::text;
use regex::{Captures, Regex};
use std::sync::OnceLock;

static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();
static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static ATTR_REGEX: OnceLock<Regex> = OnceLock::new();
static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

fn whitespace_regex() -> &'static Regex {
    WHITESPACE_REGEX.get_or_init(|| {
        Regex::new(r"\s+").expect("Invalid regex pattern - this is a compile-time constant")
    })
}

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| {
        Regex::new(r"<([a-zA-Z][a-zA-Z0-9-]*)([^<>]*)>")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

fn attr_regex() -> &'static Regex {
    ATTR_REGEX.get_or_init(|| {
        Regex::new(r#"([^\s=/"'<>]+)(?:\s*=\s*("[^"]*"|'[^']*'|[^\s"'=<>`]+))?"#)
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

fn token_regex() -> &'static Regex {
    TOKEN_REGEX.get_or_init(|| {
        Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);|\s+|[^\s&]+|&")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Normalize markup for comparison.
///
/// Line endings become `\n`, whitespace runs inside a line collapse to a
/// single space, lines are trimmed, blank lines dropped, and the
/// attributes of every opening tag are sorted by name.
pub fn normalize(html: &str) -> String {
    let unified = html.replace("\r\n", "\n").replace('\r', "\n");

    unified
        .split('\n')
        .map(|line| whitespace_regex().replace_all(line.trim(), " "))
        .filter(|line| !line.is_empty())
        .map(|line| sort_attributes(&line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rewrite opening tags with their attributes in name order.
pub fn sort_attributes(line: &str) -> String {
    tag_regex()
        .replace_all(line, |caps: &Captures| {
            let tag = &caps[1];
            let mut body = caps.get(2).map_or("", |m| m.as_str()).trim_end();
            let self_closing = body.ends_with('/');
            if self_closing {
                body = body[..body.len() - 1].trim_end();
            }

            let mut attrs: Vec<(&str, Option<&str>)> = attr_regex()
                .captures_iter(body)
                .filter_map(|a| {
                    let name = a.get(1)?.as_str();
                    Some((name, a.get(2).map(|v| v.as_str())))
                })
                .collect();
            attrs.sort_by(|a, b| a.0.cmp(b.0));

            let mut rebuilt = format!("<{tag}");
            for (name, value) in attrs {
                rebuilt.push(' ');
                rebuilt.push_str(name);
                if let Some(value) = value {
                    rebuilt.push('=');
                    rebuilt.push_str(value);
                }
            }
            if self_closing {
                rebuilt.push_str(" /");
            }
            rebuilt.push('>');
            rebuilt
        })
        .into_owned()
}

/// Split a line into word tokens. Entities and whitespace runs are atomic.
pub fn tokenize(line: &str) -> Vec<&str> {
    token_regex().find_iter(line).map(|m| m.as_str()).collect()
}

/// Word-level diff of two lines.
pub fn word_diff(old: &str, new: &str) -> Vec<DiffOp> {
    let old_words = tokenize(old);
    let new_words = tokenize(new);
    let edits = myers::diff(&old_words, &new_words);
    ops_from_script(&old_words, &new_words, &edits, false)
}

/// Compare two HTML documents.
pub fn compare(old: &str, new: &str) -> Vec<DiffOp> {
    let old = normalize(old);
    let new = normalize(new);

    let mut ops = text::compare(&old, &new);
    for op in &mut ops {
        if let DiffOp::Change {
            old_content,
            new_content,
            word_diff: words,
            ..
        } = op
        {
            *words = Some(word_diff(old_content, new_content));
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        let html = "  <p>Hello   \t world</p>  \r\n\r\n<p>Bye</p>";
        assert_eq!(normalize(html), "<p>Hello world</p>\n<p>Bye</p>");
    }

    #[test]
    fn test_sort_attributes() {
        assert_eq!(
            sort_attributes(r#"<a title='t' href="/x" class=big>link</a>"#),
            r#"<a class=big href="/x" title='t'>link</a>"#
        );
    }

    #[test]
    fn test_sort_attributes_keeps_boolean_and_self_closing() {
        assert_eq!(
            sort_attributes(r#"<input type="checkbox" disabled checked />"#),
            r#"<input checked disabled type="checkbox" />"#
        );
        assert_eq!(sort_attributes("<br/>"), "<br />");
        assert_eq!(sort_attributes("</div>"), "</div>");
    }

    #[test]
    fn test_attribute_order_is_not_a_change() {
        let old = r#"<div id="main" class="wide">Body</div>"#;
        let new = r#"<div class="wide"   id="main">Body</div>"#;
        assert!(compare(old, new).is_empty());
    }

    #[test]
    fn test_tokenize_keeps_entities_whole() {
        assert_eq!(
            tokenize("Fish&amp;chips &#160;now"),
            vec!["Fish", "&amp;", "chips", " ", "&#160;", "now"]
        );
        assert_eq!(tokenize("a & b"), vec!["a", " ", "&", " ", "b"]);
    }

    #[test]
    fn test_changed_line_carries_word_diff() {
        let ops = compare("<p>Hello world</p>", "<p>Hello there world</p>");
        assert_eq!(ops.len(), 1);

        let DiffOp::Change {
            word_diff: Some(words),
            ..
        } = &ops[0]
        else {
            panic!("expected a change with word diff, got {:?}", ops[0]);
        };
        let inserted: Vec<_> = words
            .iter()
            .filter_map(|w| match w {
                DiffOp::Insert { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(inserted, vec!["there", " "]);
    }

    #[test]
    fn test_entity_change_is_one_token() {
        let words = word_diff("a &amp; b", "a &lt; b");
        assert_eq!(words, vec![DiffOp::change(2, 2, "&amp;", "&lt;")]);
    }
}
