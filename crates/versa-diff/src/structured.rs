//! Key-wise diffing of structured (JSON) content.

use crate::error::{DiffError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Key under which a differing root value is reported.
pub const ROOT_KEY: &str = "$";

/// A parsed structured document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum TreeValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<TreeValue>),
    Map(BTreeMap<String, TreeValue>),
}

impl TreeValue {
    fn is_container(&self) -> bool {
        matches!(self, TreeValue::Sequence(_) | TreeValue::Map(_))
    }

    /// Children keyed by name (maps) or index (sequences).
    fn entries(&self) -> BTreeMap<String, &TreeValue> {
        match self {
            TreeValue::Map(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            TreeValue::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    fn same_kind(&self, other: &TreeValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl From<Value> for TreeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => TreeValue::Null,
            Value::Bool(b) => TreeValue::Bool(b),
            Value::Number(n) => TreeValue::Number(n),
            Value::String(s) => TreeValue::String(s),
            Value::Array(items) => TreeValue::Sequence(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                TreeValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<TreeValue> for Value {
    fn from(value: TreeValue) -> Self {
        match value {
            TreeValue::Null => Value::Null,
            TreeValue::Bool(b) => Value::Bool(b),
            TreeValue::Number(n) => Value::Number(n),
            TreeValue::String(s) => Value::String(s),
            TreeValue::Sequence(items) => Value::Array(items.into_iter().map(Into::into).collect()),
            TreeValue::Map(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.into()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

/// Difference at a single key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuredChange {
    Added { value: TreeValue },
    Removed { value: TreeValue },
    Changed { old_value: TreeValue, new_value: TreeValue },
    Nested { changes: Vec<FieldChange> },
}

/// A [`StructuredChange`] and the key it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub key: String,
    #[serde(flatten)]
    pub change: StructuredChange,
}

impl FieldChange {
    fn new(key: impl Into<String>, change: StructuredChange) -> Self {
        Self {
            key: key.into(),
            change,
        }
    }
}

/// Parse JSON text into a tree.
pub fn parse(input: &str) -> Result<TreeValue> {
    serde_json::from_str::<Value>(input)
        .map(TreeValue::from)
        .map_err(|e| DiffError::InvalidFormat(format!("invalid structured content: {e}")))
}

/// Parse and compare two structured documents.
pub fn compare(old: &str, new: &str) -> Result<Vec<FieldChange>> {
    let old = parse(old)?;
    let new = parse(new)?;
    Ok(compare_trees(&old, &new))
}

/// Compare two trees key by key.
pub fn compare_trees(old: &TreeValue, new: &TreeValue) -> Vec<FieldChange> {
    if old == new {
        return Vec::new();
    }
    if old.is_container() && old.same_kind(new) {
        return compare_children(old, new);
    }
    vec![FieldChange::new(
        ROOT_KEY,
        StructuredChange::Changed {
            old_value: old.clone(),
            new_value: new.clone(),
        },
    )]
}

fn compare_children(old: &TreeValue, new: &TreeValue) -> Vec<FieldChange> {
    let old_entries = old.entries();
    let new_entries = new.entries();
    let keys: BTreeSet<&String> = old_entries.keys().chain(new_entries.keys()).collect();

    let mut keys: Vec<&String> = keys.into_iter().collect();
    if matches!(old, TreeValue::Sequence(_)) {
        keys.sort_by_key(|k| k.parse::<usize>().unwrap_or(usize::MAX));
    }

    let mut changes = Vec::new();
    for key in keys {
        let change = match (old_entries.get(key), new_entries.get(key)) {
            (None, Some(value)) => StructuredChange::Added {
                value: (*value).clone(),
            },
            (Some(value), None) => StructuredChange::Removed {
                value: (*value).clone(),
            },
            (Some(a), Some(b)) if a == b => continue,
            (Some(a), Some(b)) if a.is_container() && a.same_kind(b) => {
                StructuredChange::Nested {
                    changes: compare_children(a, b),
                }
            }
            (Some(a), Some(b)) => StructuredChange::Changed {
                old_value: (*a).clone(),
                new_value: (*b).clone(),
            },
            (None, None) => continue,
        };
        changes.push(FieldChange::new(key.as_str(), change));
    }
    changes
}

/// Visit every leaf change with its dotted path.
pub fn walk<'a>(changes: &'a [FieldChange], f: &mut impl FnMut(&str, &'a StructuredChange)) {
    fn go<'a>(
        prefix: &str,
        changes: &'a [FieldChange],
        f: &mut impl FnMut(&str, &'a StructuredChange),
    ) {
        for field in changes {
            let path = if prefix.is_empty() {
                field.key.clone()
            } else {
                format!("{prefix}.{}", field.key)
            };
            match &field.change {
                StructuredChange::Nested { changes } => go(&path, changes, f),
                leaf => f(&path, leaf),
            }
        }
    }
    go("", changes, f);
}

/// A key changed differently by both sides of a three-way merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConflict {
    /// Dotted path of the key.
    pub path: String,
    pub base: Option<TreeValue>,
    pub current: Option<TreeValue>,
    pub incoming: Option<TreeValue>,
}

/// Find keys that `current` and `incoming` both changed away from `base`
/// in different ways.
pub fn merge_conflicts(
    base: &TreeValue,
    current: &TreeValue,
    incoming: &TreeValue,
) -> Vec<MergeConflict> {
    let mut conflicts = Vec::new();
    merge_at(
        String::new(),
        Some(base),
        Some(current),
        Some(incoming),
        &mut conflicts,
    );
    conflicts
}

fn merge_at(
    path: String,
    base: Option<&TreeValue>,
    current: Option<&TreeValue>,
    incoming: Option<&TreeValue>,
    out: &mut Vec<MergeConflict>,
) {
    if current == incoming || current == base || incoming == base {
        return;
    }

    if let (Some(b), Some(c), Some(i)) = (base, current, incoming) {
        if b.is_container() && b.same_kind(c) && b.same_kind(i) {
            let (be, ce, ie) = (b.entries(), c.entries(), i.entries());
            let keys: BTreeSet<&String> = be.keys().chain(ce.keys()).chain(ie.keys()).collect();
            for key in keys {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                merge_at(
                    child,
                    be.get(key).copied(),
                    ce.get(key).copied(),
                    ie.get(key).copied(),
                    out,
                );
            }
            return;
        }
    }

    out.push(MergeConflict {
        path: if path.is_empty() {
            ROOT_KEY.to_string()
        } else {
            path
        },
        base: base.cloned(),
        current: current.cloned(),
        incoming: incoming.cloned(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> TreeValue {
        TreeValue::from(value)
    }

    #[test]
    fn test_malformed_input_is_invalid_format() {
        let err = compare("{\"a\": 1", "{}").unwrap_err();
        assert!(matches!(err, DiffError::InvalidFormat(_)));
    }

    #[test]
    fn test_added_removed_changed() {
        let changes = compare(r#"{"a":1,"b":2,"c":3}"#, r#"{"a":1,"b":5,"d":4}"#).unwrap();

        assert_eq!(
            changes,
            vec![
                FieldChange::new(
                    "b",
                    StructuredChange::Changed {
                        old_value: tree(json!(2)),
                        new_value: tree(json!(5)),
                    }
                ),
                FieldChange::new("c", StructuredChange::Removed { value: tree(json!(3)) }),
                FieldChange::new("d", StructuredChange::Added { value: tree(json!(4)) }),
            ]
        );
    }

    #[test]
    fn test_nested_maps_recurse() {
        let changes = compare(
            r#"{"meta":{"title":"Old","tags":["a"]}}"#,
            r#"{"meta":{"title":"New","tags":["a","b"]}}"#,
        )
        .unwrap();

        let mut paths = Vec::new();
        walk(&changes, &mut |path, change| {
            paths.push((path.to_string(), change.clone()));
        });

        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].0, "meta.tags.1");
        assert!(matches!(paths[0].1, StructuredChange::Added { .. }));
        assert_eq!(paths[1].0, "meta.title");
    }

    #[test]
    fn test_container_kind_change_is_changed() {
        let changes = compare(r#"{"x":[1]}"#, r#"{"x":{"0":1}}"#).unwrap();
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0].change, StructuredChange::Changed { .. }));
    }

    #[test]
    fn test_scalar_root_reported_under_dollar() {
        let changes = compare("1", "2").unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].key, ROOT_KEY);
    }

    #[test]
    fn test_sequence_indices_sort_numerically() {
        let old: Vec<i32> = (0..12).collect();
        let mut new = old.clone();
        new[2] = 99;
        new[10] = 98;
        let changes = compare_trees(&tree(json!(old)), &tree(json!(new)));
        let keys: Vec<_> = changes.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["2", "10"]);
    }

    #[test]
    fn test_tree_value_serializes_as_plain_json() {
        let value = tree(json!({"a": [1, true, null, "s"]}));
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"a": [1, true, null, "s"]})
        );

        let change = FieldChange::new("k", StructuredChange::Added { value: tree(json!(1)) });
        assert_eq!(
            serde_json::to_value(&change).unwrap(),
            json!({"key": "k", "type": "added", "value": 1})
        );
    }

    #[test]
    fn test_merge_conflicts_only_when_both_sides_differ() {
        let base = tree(json!({"title": "A", "body": "x", "meta": {"lang": "en"}}));
        let current = tree(json!({"title": "B", "body": "y", "meta": {"lang": "de"}}));
        let incoming = tree(json!({"title": "C", "body": "x", "meta": {"lang": "fr"}}));

        let conflicts = merge_conflicts(&base, &current, &incoming);
        let paths: Vec<_> = conflicts.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["meta.lang", "title"]);
        assert_eq!(conflicts[1].incoming, Some(tree(json!("C"))));
    }

    #[test]
    fn test_merge_same_change_on_both_sides_is_clean() {
        let base = tree(json!({"a": 1}));
        let both = tree(json!({"a": 2, "b": 3}));
        assert!(merge_conflicts(&base, &both, &both).is_empty());
    }

    #[test]
    fn test_merge_add_add_conflict() {
        let base = tree(json!({}));
        let current = tree(json!({"new": 1}));
        let incoming = tree(json!({"new": 2}));
        let conflicts = merge_conflicts(&base, &current, &incoming);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].base, None);
    }
}
