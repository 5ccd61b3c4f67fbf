//! Order-insensitive structural diff between two documents
//!
//! Objects are compared key by key. Arrays are compared as multisets: an
//! element of the new array cancels one equal element of the old array, so
//! surplus duplicates show up individually. Leftover elements are paired in
//! order and compared recursively when both are objects or both are arrays.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Deepest nesting the diff will walk
pub const MAX_DIFF_DEPTH: usize = 256;

/// Errors raised while diffing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// Documents nest deeper than [`MAX_DIFF_DEPTH`]
    #[error("Document nesting exceeds {limit} levels at '{path}'")]
    TooDeep {
        /// Path where the limit was hit
        path: String,
        /// The configured limit
        limit: usize,
    },
}

/// A single difference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    /// Present only in the new document
    Added {
        /// The added value
        value: Value,
    },
    /// Present only in the old document
    Removed {
        /// The removed value
        value: Value,
    },
    /// Present in both with different values
    Changed {
        /// Value in the old document
        old: Value,
        /// Value in the new document
        new: Value,
    },
}

/// A difference located at a path such as `topicWizardData.scenarioOptions[2]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Dotted path; empty for the document root
    pub path: String,

    /// What happened there
    #[serde(flatten)]
    pub change: Change,
}

/// All differences between two documents, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuralDiff {
    entries: Vec<DiffEntry>,
}

impl StructuralDiff {
    /// Compare two documents
    ///
    /// # Examples
    ///
    /// ```
    /// use reframe_workflow::StructuralDiff;
    /// use serde_json::json;
    ///
    /// let diff = StructuralDiff::between(
    ///     &json!({"narrative": "old", "tags": ["a", "b"]}),
    ///     &json!({"narrative": "new", "tags": ["b", "a"]}),
    /// )
    /// .unwrap();
    /// assert_eq!(diff.changed_paths(), vec!["narrative"]);
    /// ```
    pub fn between(old: &Value, new: &Value) -> Result<Self, DiffError> {
        let mut entries = Vec::new();
        diff_values(old, new, "", 0, &mut entries)?;
        Ok(Self { entries })
    }

    /// Entries in discovery order
    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the documents were structurally equal
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct paths in report order
    pub fn changed_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !paths.contains(&entry.path.as_str()) {
                paths.push(&entry.path);
            }
        }
        paths
    }

    /// Count of (added, removed, changed) entries
    pub fn counts(&self) -> (usize, usize, usize) {
        self.entries
            .iter()
            .fold((0, 0, 0), |(a, r, c), entry| match entry.change {
                Change::Added { .. } => (a + 1, r, c),
                Change::Removed { .. } => (a, r + 1, c),
                Change::Changed { .. } => (a, r, c + 1),
            })
    }
}

/// Deepest container nesting in `value`; scalars have depth 0
///
/// Walks with an explicit stack so arbitrarily deep input is safe to measure.
pub fn nesting_depth(value: &Value) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(value, 0usize)];
    while let Some((current, depth)) = pending.pop() {
        match current {
            Value::Array(items) => pending.extend(items.iter().map(|child| (child, depth + 1))),
            Value::Object(map) => pending.extend(map.values().map(|child| (child, depth + 1))),
            _ => continue,
        }
        deepest = deepest.max(depth + 1);
    }
    deepest
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn index_path(path: &str, index: usize) -> String {
    format!("{}[{}]", path, index)
}

fn diff_values(
    old: &Value,
    new: &Value,
    path: &str,
    depth: usize,
    out: &mut Vec<DiffEntry>,
) -> Result<(), DiffError> {
    if depth > MAX_DIFF_DEPTH {
        return Err(DiffError::TooDeep {
            path: path.to_string(),
            limit: MAX_DIFF_DEPTH,
        });
    }

    match (old, new) {
        (Value::Object(a), Value::Object(b)) => diff_objects(a, b, path, depth, out),
        (Value::Array(a), Value::Array(b)) => diff_arrays(a, b, path, depth, out),
        _ => {
            if old != new {
                out.push(DiffEntry {
                    path: path.to_string(),
                    change: Change::Changed {
                        old: old.clone(),
                        new: new.clone(),
                    },
                });
            }
            Ok(())
        }
    }
}

fn diff_objects(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    path: &str,
    depth: usize,
    out: &mut Vec<DiffEntry>,
) -> Result<(), DiffError> {
    for (key, old_value) in old {
        let at = child_path(path, key);
        match new.get(key) {
            Some(new_value) => diff_values(old_value, new_value, &at, depth + 1, out)?,
            None => out.push(DiffEntry {
                path: at,
                change: Change::Removed {
                    value: old_value.clone(),
                },
            }),
        }
    }
    for (key, new_value) in new {
        if !old.contains_key(key) {
            out.push(DiffEntry {
                path: child_path(path, key),
                change: Change::Added {
                    value: new_value.clone(),
                },
            });
        }
    }
    Ok(())
}

fn diff_arrays(
    old: &[Value],
    new: &[Value],
    path: &str,
    depth: usize,
    out: &mut Vec<DiffEntry>,
) -> Result<(), DiffError> {
    let mut unmatched_old: HashMap<String, VecDeque<usize>> = HashMap::new();
    for (index, item) in old.iter().enumerate() {
        let key = canonical(item, path, depth)?;
        unmatched_old.entry(key).or_default().push_back(index);
    }

    let mut added = Vec::new();
    for (index, item) in new.iter().enumerate() {
        let key = canonical(item, path, depth)?;
        let matched = unmatched_old
            .get_mut(&key)
            .and_then(|bucket| bucket.pop_front())
            .is_some();
        if !matched {
            added.push(index);
        }
    }

    let mut removed: Vec<usize> = unmatched_old.into_values().flatten().collect();
    removed.sort_unstable();

    let paired = removed.len().min(added.len());
    for (&old_index, &new_index) in removed.iter().zip(added.iter()) {
        let (a, b) = (&old[old_index], &new[new_index]);
        let same_container = matches!(
            (a, b),
            (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
        );
        if same_container {
            diff_values(a, b, &index_path(path, new_index), depth + 1, out)?;
        } else {
            out.push(DiffEntry {
                path: index_path(path, old_index),
                change: Change::Removed { value: a.clone() },
            });
            out.push(DiffEntry {
                path: index_path(path, new_index),
                change: Change::Added { value: b.clone() },
            });
        }
    }

    for &old_index in &removed[paired..] {
        out.push(DiffEntry {
            path: index_path(path, old_index),
            change: Change::Removed {
                value: old[old_index].clone(),
            },
        });
    }
    for &new_index in &added[paired..] {
        out.push(DiffEntry {
            path: index_path(path, new_index),
            change: Change::Added {
                value: new[new_index].clone(),
            },
        });
    }
    Ok(())
}

/// Serialization with object keys sorted, so equal values get equal keys
fn canonical(value: &Value, path: &str, depth: usize) -> Result<String, DiffError> {
    let mut buf = String::new();
    write_canonical(value, &mut buf, path, depth)?;
    Ok(buf)
}

fn write_canonical(
    value: &Value,
    buf: &mut String,
    path: &str,
    depth: usize,
) -> Result<(), DiffError> {
    if depth > MAX_DIFF_DEPTH {
        return Err(DiffError::TooDeep {
            path: path.to_string(),
            limit: MAX_DIFF_DEPTH,
        });
    }
    match value {
        Value::Array(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_canonical(item, buf, path, depth + 1)?;
            }
            buf.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            buf.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                buf.push_str(&Value::String(key.clone()).to_string());
                buf.push(':');
                write_canonical(&map[key], buf, path, depth + 1)?;
            }
            buf.push('}');
        }
        scalar => buf.push_str(&scalar.to_string()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_documents_have_empty_diff() {
        let doc = json!({"a": [1, {"b": null}], "c": "x"});
        assert!(StructuralDiff::between(&doc, &doc).unwrap().is_empty());
    }

    #[test]
    fn test_key_order_is_ignored() {
        let a = json!({"x": 1, "y": {"p": 1, "q": 2}});
        let b = json!({"y": {"q": 2, "p": 1}, "x": 1});
        assert!(StructuralDiff::between(&a, &b).unwrap().is_empty());
    }

    #[test]
    fn test_only_changed_field_is_reported() {
        let old = json!({"narrative": "Harvest", "tasks": [1, 2], "meta": {"v": 1}});
        let new = json!({"narrative": "FlexFit", "tasks": [1, 2], "meta": {"v": 1}});
        let diff = StructuralDiff::between(&old, &new).unwrap();

        assert_eq!(diff.changed_paths(), vec!["narrative"]);
        assert_eq!(
            diff.entries()[0].change,
            Change::Changed {
                old: json!("Harvest"),
                new: json!("FlexFit")
            }
        );
    }

    #[test]
    fn test_added_and_removed_keys() {
        let diff = StructuralDiff::between(&json!({"a": 1, "b": 2}), &json!({"b": 2, "c": 3})).unwrap();
        assert_eq!(diff.counts(), (1, 1, 0));
        assert_eq!(diff.changed_paths(), vec!["a", "c"]);
    }

    #[test]
    fn test_array_order_is_ignored() {
        let diff = StructuralDiff::between(&json!([1, "a", {"k": true}]), &json!([{"k": true}, 1, "a"])).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_duplicates_are_counted() {
        let diff = StructuralDiff::between(&json!(["a", "a", "b"]), &json!(["a", "b"])).unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.entries()[0].path, "[1]");
        assert_eq!(diff.entries()[0].change, Change::Removed { value: json!("a") });
    }

    #[test]
    fn test_surplus_duplicates_reported_individually() {
        let diff = StructuralDiff::between(&json!({"t": ["x"]}), &json!({"t": ["x", "x", "x"]})).unwrap();
        assert_eq!(diff.counts(), (2, 0, 0));
        assert_eq!(diff.changed_paths(), vec!["t[1]", "t[2]"]);
    }

    #[test]
    fn test_modified_array_object_is_diffed_recursively() {
        let old = json!({"acts": [{"name": "Survey", "mins": 10}, {"name": "Pitch"}]});
        let new = json!({"acts": [{"name": "Survey", "mins": 15}, {"name": "Pitch"}]});
        let diff = StructuralDiff::between(&old, &new).unwrap();
        assert_eq!(diff.changed_paths(), vec!["acts[0].mins"]);
    }

    #[test]
    fn test_type_change_is_changed() {
        let diff = StructuralDiff::between(&json!({"v": [1]}), &json!({"v": {"0": 1}})).unwrap();
        assert_eq!(diff.counts(), (0, 0, 1));
        assert_eq!(diff.entries()[0].path, "v");
    }

    #[test]
    fn test_root_scalar_change_has_empty_path() {
        let diff = StructuralDiff::between(&json!(1), &json!(2)).unwrap();
        assert_eq!(diff.changed_paths(), vec![""]);
    }

    #[test]
    fn test_excessive_depth_is_an_error() {
        let mut deep = json!(0);
        for _ in 0..(MAX_DIFF_DEPTH + 5) {
            deep = json!({ "n": deep });
        }
        let result = StructuralDiff::between(&deep, &json!({}));
        assert!(result.is_ok(), "shallow side stops recursion early");

        let mut other = json!(1);
        for _ in 0..(MAX_DIFF_DEPTH + 5) {
            other = json!({ "n": other });
        }
        assert!(matches!(
            StructuralDiff::between(&deep, &other),
            Err(DiffError::TooDeep { .. })
        ));
    }

    #[test]
    fn test_nesting_depth() {
        assert_eq!(nesting_depth(&json!("x")), 0);
        assert_eq!(nesting_depth(&json!({})), 1);
        assert_eq!(nesting_depth(&json!({"a": [1, {"b": []}], "c": 2})), 4);

        let mut deep = json!(0);
        for _ in 0..5_000 {
            deep = Value::Array(vec![deep]);
        }
        assert_eq!(nesting_depth(&deep), 5_000);
        // Value drops recursively; unwind the chain by hand
        while let Value::Array(mut items) = deep {
            deep = items.pop().unwrap_or(Value::Null);
        }
    }

    #[test]
    fn test_serializes_as_entry_list() {
        let diff = StructuralDiff::between(&json!({"a": 1}), &json!({"a": 2})).unwrap();
        let value = serde_json::to_value(&diff).unwrap();
        assert_eq!(value, json!([{"path": "a", "kind": "changed", "old": 1, "new": 2}]));
    }
}
