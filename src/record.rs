//! Flat key-value records.
//!
//! A [`Record`] is one logical row: an ordered mapping from field name to a
//! JSON value. Field order follows insertion order, so records written back
//! out keep the layout they were read with.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DmError, Result};

/// One flat record. Nested values are carried verbatim but never inspected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Read a field that the current operation cannot do without.
    ///
    /// `dataset` and `index` only feed the `MissingField` error.
    pub fn require(&self, field: &str, dataset: &str, index: usize) -> Result<&Value> {
        self.0
            .get(field)
            .ok_or_else(|| DmError::missing(dataset, index, field))
    }

    /// Set a field. An existing field keeps its position; a new one is
    /// appended.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Remove a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.shift_remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Field names in record order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Rename a field in place. The value keeps the position of the old
    /// name. Returns false when `from` is absent.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return self.0.contains_key(from);
        }
        if !self.0.contains_key(from) {
            return false;
        }
        let fields = std::mem::take(&mut self.0);
        for (name, value) in fields {
            if name == from {
                self.0.insert(to.to_string(), value);
            } else if name != to {
                self.0.insert(name, value);
            }
        }
        true
    }
}

/// Largest magnitude below which every integral `f64` is exact.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Canonical text of a key value, used to match records across datasets.
///
/// Values compare by their compact JSON form, so the number `1` and the
/// string `"1"` are distinct keys. Integral floats are written as integers
/// first, so `1.0` and `1` are the same key.
pub fn key_text(value: &Value) -> String {
    if let Value::Number(n) = value
        && n.is_f64()
        && let Some(f) = n.as_f64()
        && f.fract() == 0.0
        && f.abs() <= MAX_EXACT_INT
    {
        return (f as i64).to_string();
    }
    value.to_string()
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = DmError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DmError::InvalidArgument(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    #[test]
    fn test_set_keeps_existing_position() {
        let mut r = rec(json!({"id": 1, "a": 10, "b": 2}));
        r.set("a", json!(11));
        r.set("c", json!(3));
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["id", "a", "b", "c"]);
        assert_eq!(r.get("a"), Some(&json!(11)));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut r = rec(json!({"a": 1, "b": 2, "c": 3}));
        assert_eq!(r.remove("a"), Some(json!(1)));
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_require_reports_position() {
        let r = rec(json!({"a": 1}));
        let err = r.require("b", "base", 4).unwrap_err();
        assert!(matches!(
            err,
            DmError::MissingField { index: 4, ref field, .. } if field == "b"
        ));
    }

    #[test]
    fn test_rename_in_place() {
        let mut r = rec(json!({"a": 1, "b": 2, "c": 3}));
        assert!(r.rename("b", "x"));
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["a", "x", "c"]);
        assert!(!r.rename("missing", "y"));
    }

    #[test]
    fn test_key_text_distinguishes_types() {
        assert_ne!(key_text(&json!(1)), key_text(&json!("1")));
        assert_eq!(key_text(&json!("abc")), "\"abc\"");
    }

    #[test]
    fn test_key_text_integral_float_matches_integer() {
        assert_eq!(key_text(&json!(1.0)), key_text(&json!(1)));
        assert_eq!(key_text(&json!(-0.0)), "0");
        assert_eq!(key_text(&json!(1.5)), "1.5");
        assert_ne!(key_text(&json!(1.0)), key_text(&json!("1")));
    }

    #[test]
    fn test_try_from_rejects_non_object() {
        assert!(Record::try_from(json!([1, 2])).is_err());
    }

    #[test]
    fn test_display_is_compact_json() {
        let r = rec(json!({"id": 1, "name": "é"}));
        assert_eq!(r.to_string(), r#"{"id":1,"name":"é"}"#);
    }
}
