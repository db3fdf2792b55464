//! The attribute bag holding server-supplied fields of a resource.
//!
//! # Design
//! Values are `serde_json::Value`, so every attribute is one of
//! string/number/bool/null/object/array. Access is explicit by key; the only
//! typed accessors are for the fields the envelope protocol itself defines
//! (`id` and `meta`).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a remote record. Servers hand out either numbers or
/// strings; both are kept as their textual form for URL construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read an id from a JSON value. Only non-empty strings and integers
    /// qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(ResourceId(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(ResourceId(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        ResourceId(s.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        ResourceId(s)
    }
}

impl From<u64> for ResourceId {
    fn from(n: u64) -> Self {
        ResourceId(n.to_string())
    }
}

impl From<i64> for ResourceId {
    fn from(n: i64) -> Self {
        ResourceId(n.to_string())
    }
}

/// The `meta` block every response envelope carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Meta {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// String-keyed attributes of a resource instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeBag {
    values: Map<String, Value>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge a JSON object into the bag. Each top-level key replaces the
    /// previous value wholesale, nested objects included.
    pub fn merge(&mut self, other: Map<String, Value>) {
        self.values.extend(other);
    }

    pub fn id(&self) -> Option<ResourceId> {
        self.values.get("id").and_then(ResourceId::from_value)
    }

    /// The envelope `meta` block, if present and shaped like one.
    pub fn meta(&self) -> Option<Meta> {
        self.values
            .get("meta")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

impl From<Map<String, Value>> for AttributeBag {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn merge_replaces_scalars_and_keeps_untouched_keys() {
        let mut bag = AttributeBag::new();
        bag.set("name", "Period 1");
        bag.set("grade", 5);

        bag.merge(object(json!({"name": "Period 2", "room": "B12"})));

        assert_eq!(bag.get("name"), Some(&json!("Period 2")));
        assert_eq!(bag.get("grade"), Some(&json!(5)));
        assert_eq!(bag.get("room"), Some(&json!("B12")));
    }

    #[test]
    fn merge_replaces_nested_objects_wholesale() {
        let mut bag = AttributeBag::new();
        bag.merge(object(json!({"meta": {"status": "success", "message": "created"}})));
        bag.merge(object(json!({"meta": {"status": "error"}})));

        let meta = bag.meta().unwrap();
        assert_eq!(meta.status.as_deref(), Some("error"));
        assert_eq!(meta.message, None);
    }

    #[test]
    fn merge_replaces_arrays_wholesale() {
        let mut bag = AttributeBag::new();
        bag.set("tags", json!(["a", "b"]));
        bag.merge(object(json!({"tags": ["c"]})));
        assert_eq!(bag.get("tags"), Some(&json!(["c"])));
    }

    #[test]
    fn id_accepts_numbers_and_strings() {
        let mut bag = AttributeBag::new();
        assert_eq!(bag.id(), None);

        bag.set("id", 42);
        assert_eq!(bag.id(), Some(ResourceId::from(42u64)));

        bag.set("id", "abc-1");
        assert_eq!(bag.id(), Some(ResourceId::from("abc-1")));

        bag.set("id", "");
        assert_eq!(bag.id(), None);

        bag.set("id", 1.5);
        assert_eq!(bag.id(), None);
    }

    #[test]
    fn meta_success_requires_exact_status() {
        let mut bag = AttributeBag::new();
        assert!(bag.meta().is_none());

        bag.set("meta", json!({"status": "success"}));
        assert!(bag.meta().unwrap().is_success());

        bag.set("meta", json!({"status": "Success"}));
        assert!(!bag.meta().unwrap().is_success());

        bag.set("meta", json!("not an object"));
        assert!(bag.meta().is_none());
    }

    #[test]
    fn serializes_as_plain_object() {
        let mut bag = AttributeBag::new();
        bag.set("name", "x");
        assert_eq!(serde_json::to_value(&bag).unwrap(), json!({"name": "x"}));
    }
}
