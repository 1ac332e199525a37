//! Untyped value representation shared by session state, step inputs, and
//! function arguments — the Rust stand-in for the duck-typed JSON the source
//! system passes around everywhere.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recursive tagged-union value. Ordered maps keep template resolution and
/// serialization deterministic across runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Look up a single field on a map, or index into a list. `None` means
    /// the key/index is absent, which is a resolution failure, not an error.
    pub fn get(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(segment),
            _ => None,
        }
    }

    /// Index into a list, resolving negative indices from the end the way
    /// the rolling output window does (`[-1]` == last entry).
    pub fn index(&self, i: i64) -> Option<&Value> {
        let Value::List(items) = self else {
            return None;
        };
        let len = items.len() as i64;
        let idx = if i < 0 { len + i } else { i };
        if idx < 0 || idx >= len {
            return None;
        }
        items.get(idx as usize)
    }

    /// Truthiness as used by the condition evaluator: absent/null/false,
    /// zero numbers, and empty strings/lists/maps are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
            Value::String(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
        }
    }

    pub fn from_json(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::List(a.into_iter().map(Value::from_json).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect())
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(l) => serde_json::Value::Array(l.iter().map(Value::to_json).collect()),
            Value::Map(m) => {
                serde_json::Value::Object(m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from_json(v)
    }
}

/// Keyword-argument map passed to registered functions.
pub type Args = std::collections::HashMap<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_matches_rolling_window_semantics() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(!Value::String(String::new()).truthy());
        assert!(!Value::List(vec![]).truthy());
        assert!(Value::String("0".to_string()).truthy());
        assert!(!Value::Number(serde_json::Number::from(0)).truthy());
        assert!(Value::Number(serde_json::Number::from(1)).truthy());
    }

    #[test]
    fn negative_index_addresses_from_end() {
        let list = Value::List(vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]);
        assert_eq!(list.index(-1), Some(&Value::from(3i64)));
        assert_eq!(list.index(0), Some(&Value::from(1i64)));
        assert_eq!(list.index(-4), None);
    }

    #[test]
    fn json_round_trip() {
        let json = serde_json::json!({"a": 1, "b": [true, null, "x"]});
        let value = Value::from_json(json.clone());
        assert_eq!(value.to_json(), json);
    }
}
