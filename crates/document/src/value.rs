use crate::node::{AsNode, Field, Fields, Node};
use indexmap::IndexMap;

/// An owned, codec-agnostic value tree (spec §3 Document).
///
/// Insertion order is preserved in [`Value::Object`] (an [`IndexMap`]) so
/// round-tripping through a codec that cares about field order (HTTP
/// binding, `prettyPrint` JSON) is lossless, even though [`crate::equal`]
/// treats object equality as order-insensitive per the spec's testable
/// properties.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    PosInt(u64),
    NegInt(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(chrono::DateTime<chrono::Utc>),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(m) => Some(m),
            _ => None,
        }
    }

    /// The widest integer/float representation this value holds, or `None`
    /// if it isn't numeric. Used by [`crate::equal`] for cross-kind
    /// numeric-canonical comparison (`1 == 1.0`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::PosInt(n) => Some(*n as f64),
            Value::NegInt(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A human-readable type name, for error messages and the MCP bridge's
    /// JSON-Schema translation.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::PosInt(_) | Value::NegInt(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Bytes(_) => "blob",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "list",
            Value::Object(_) => "map",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        if n >= 0 {
            Value::PosInt(n as u64)
        } else {
            Value::NegInt(n)
        }
    }
}
impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::PosInt(n)
    }
}
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}
impl From<chrono::DateTime<chrono::Utc>> for Value {
    fn from(t: chrono::DateTime<chrono::Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl AsNode for Value {
    type Fields = IndexMap<String, Value>;

    fn as_node<'a>(&'a self) -> Node<'a, Self> {
        match self {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(*b),
            Value::PosInt(n) => Node::PosInt(*n),
            Value::NegInt(n) => Node::NegInt(*n),
            Value::Float(n) => Node::Float(*n),
            Value::String(s) => Node::String(s),
            Value::Bytes(b) => Node::Bytes(b),
            Value::Timestamp(t) => Node::Timestamp(*t),
            Value::Array(a) => Node::Array(a),
            Value::Object(m) => Node::Object(m),
        }
    }
}

impl Fields<Value> for IndexMap<String, Value> {
    type Field<'a> = (&'a str, &'a Value);
    type Iter<'a> = indexmap::map::Iter<'a, String, Value>;

    fn get<'a>(&'a self, property: &str) -> Option<Self::Field<'a>> {
        self.get_key_value(property).map(|(k, v)| (k.as_str(), v))
    }

    fn len(&self) -> usize {
        IndexMap::len(self)
    }

    fn iter<'a>(&'a self) -> Self::Iter<'a> {
        IndexMap::iter(self)
    }
}

impl<'a> Field<'a, Value> for (&'a str, &'a Value) {
    fn property(&self) -> &'a str {
        self.0
    }
    fn value(&self) -> &'a Value {
        self.1
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accessors_match_the_held_variant() {
        let v = Value::from("hello");
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(v.as_bool(), None);
        assert_eq!(Value::from(true).as_bool(), Some(true));
    }

    #[test]
    fn numeric_widening_spans_int_and_float() {
        assert_eq!(Value::from(1u64).as_f64(), Some(1.0));
        assert_eq!(Value::from(-1i64).as_f64(), Some(-1.0));
        assert_eq!(Value::from(1.5f64).as_f64(), Some(1.5));
        assert_eq!(Value::Null.as_f64(), None);
    }
}
