//! Set-like tier lists keyed by structural equality.

use serde_json::{Map, Value};
use std::collections::HashSet;

/// Serialize `value` with every object's keys sorted, recursively, so two
/// structurally equal entries produce the same key regardless of key order.
pub fn canonical_key(value: &Value) -> String {
    serde_json::to_string(&canonicalize(value)).unwrap_or_default()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for k in keys {
                out.insert(k.clone(), canonicalize(&map[k]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Append-only list that ignores entries structurally equal to one already
/// held. First-seen order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierList {
    entries: Vec<Value>,
    keys: HashSet<String>,
}

impl TierList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the entry was new.
    pub fn insert(&mut self, entry: Value) -> bool {
        if !self.keys.insert(canonical_key(&entry)) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[Value] {
        &self.entries
    }
}

/// Drop structural duplicates from an arbitrary list, keeping first-seen order.
pub fn dedup_entries(entries: &[Value]) -> Vec<Value> {
    let mut list = TierList::new();
    for e in entries {
        list.insert(e.clone());
    }
    list.entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_does_not_matter() {
        let a = json!({"id_producto": "7", "precio": 10, "meta": {"b": 1, "a": 2}});
        let b = json!({"meta": {"a": 2, "b": 1}, "precio": 10, "id_producto": "7"});
        assert_eq!(canonical_key(&a), canonical_key(&b));

        let mut list = TierList::new();
        assert!(list.insert(a));
        assert!(!list.insert(b));
        assert_eq!(list.entries().len(), 1);
    }

    #[test]
    fn test_first_seen_order_kept() {
        let mut list = TierList::new();
        list.insert(json!({"cantidad": 10}));
        list.insert(json!({"cantidad": 5}));
        list.insert(json!({"cantidad": 10}));
        list.insert(json!({"cantidad": 1}));
        assert_eq!(
            list.entries(),
            &[
                json!({"cantidad": 10}),
                json!({"cantidad": 5}),
                json!({"cantidad": 1})
            ]
        );
    }

    #[test]
    fn test_array_order_is_significant() {
        assert_ne!(canonical_key(&json!([1, 2])), canonical_key(&json!([2, 1])));
    }

    #[test]
    fn test_dedup_entries() {
        let out = dedup_entries(&[json!({"a": 1, "b": 2}), json!({"b": 2, "a": 1}), json!(3)]);
        assert_eq!(out, vec![json!({"a": 1, "b": 2}), json!(3)]);
    }
}
