//! Property value types for graph nodes and edges

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// Property value attached to a node or edge
///
/// Collection tools emit arbitrary JSON, so every JSON shape has a
/// counterpart here. Objects become `Map`, `null` becomes `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Array(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
    Null,
}

impl PropertyValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<PropertyValue>> {
        match self {
            PropertyValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, PropertyValue>> {
        match self {
            PropertyValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::Array(_) => "Array",
            PropertyValue::Map(_) => "Map",
            PropertyValue::Null => "Null",
        }
    }

    /// Convert a JSON value into a property value.
    ///
    /// Numbers that fit in an `i64` stay integers; everything else numeric
    /// (u64 overflow, fractions) becomes a float.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => PropertyValue::Null,
            JsonValue::Bool(b) => PropertyValue::Boolean(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Integer(i),
                None => PropertyValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => PropertyValue::String(s.clone()),
            JsonValue::Array(items) => {
                PropertyValue::Array(items.iter().map(PropertyValue::from_json).collect())
            }
            JsonValue::Object(map) => PropertyValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert into plain JSON (no type tags), as stored in snapshots and
    /// sent to the Neo4j HTTP endpoint.
    pub fn to_json(&self) -> JsonValue {
        match self {
            PropertyValue::String(s) => JsonValue::String(s.clone()),
            PropertyValue::Integer(i) => JsonValue::from(*i),
            PropertyValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            PropertyValue::Boolean(b) => JsonValue::Bool(*b),
            PropertyValue::Array(arr) => JsonValue::Array(arr.iter().map(|v| v.to_json()).collect()),
            PropertyValue::Map(map) => JsonValue::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            PropertyValue::Null => JsonValue::Null,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Array(arr) => {
                write!(f, "[")?;
                for (i, val) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            PropertyValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, val)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, val)?;
                }
                write!(f, "}}")
            }
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(arr: Vec<PropertyValue>) -> Self {
        PropertyValue::Array(arr)
    }
}

/// Property map for node and edge properties. Ordered so snapshots and
/// logs are stable across runs.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(PropertyValue::from_json(&json!("x")), PropertyValue::from("x"));
        assert_eq!(PropertyValue::from_json(&json!(5)), PropertyValue::Integer(5));
        assert_eq!(PropertyValue::from_json(&json!(2.5)), PropertyValue::Float(2.5));
        assert_eq!(PropertyValue::from_json(&json!(true)), PropertyValue::Boolean(true));
        assert!(PropertyValue::from_json(&json!(null)).is_null());
    }

    #[test]
    fn test_from_json_nested() {
        let value = PropertyValue::from_json(&json!({"ports": [445, 3389], "os": "Windows"}));
        let map = value.as_map().unwrap();
        assert_eq!(map["os"].as_string(), Some("Windows"));
        assert_eq!(map["ports"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_to_json_is_untagged() {
        let value = PropertyValue::Array(vec![1i64.into(), "a".into(), false.into()]);
        assert_eq!(value.to_json(), json!([1, "a", false]));
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert_eq!(PropertyValue::Float(f64::INFINITY).to_json(), json!(null));
    }

    #[test]
    fn test_display() {
        assert_eq!(PropertyValue::from("DC01").to_string(), "\"DC01\"");
        let arr = PropertyValue::Array(vec![1i64.into(), 2i64.into()]);
        assert_eq!(arr.to_string(), "[1, 2]");
    }
}
