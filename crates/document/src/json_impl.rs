//! `serde_json::Value` is a second, pre-existing [`AsNode`] representation —
//! the wire-level form most codecs actually decode into before a caller
//! asks for a typed [`crate::Value`]. Implementing the trait on it directly
//! means [`crate::equal`] and the document's own serializer work across
//! both without a conversion step.

use crate::node::{AsNode, Field, Fields, Node};
use serde_json::{Map, Number};

impl AsNode for serde_json::Value {
    type Fields = Map<String, serde_json::Value>;

    fn as_node<'a>(&'a self) -> Node<'a, Self> {
        match self {
            serde_json::Value::Null => Node::Null,
            serde_json::Value::Bool(b) => Node::Bool(*b),
            serde_json::Value::Number(n) => number_to_node(n),
            serde_json::Value::String(s) => Node::String(s),
            serde_json::Value::Array(a) => Node::Array(a),
            serde_json::Value::Object(m) => Node::Object(m),
        }
    }
}

fn number_to_node<'a>(n: &'a Number) -> Node<'a, serde_json::Value> {
    if let Some(u) = n.as_u64() {
        Node::PosInt(u)
    } else if let Some(i) = n.as_i64() {
        Node::NegInt(i)
    } else {
        Node::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

impl Fields<serde_json::Value> for Map<String, serde_json::Value> {
    type Field<'a> = (&'a str, &'a serde_json::Value);
    type Iter<'a> = MapIter<'a>;

    fn get<'a>(&'a self, property: &str) -> Option<Self::Field<'a>> {
        self.get_key_value(property).map(|(k, v)| (k.as_str(), v))
    }

    fn len(&self) -> usize {
        Map::len(self)
    }

    fn iter<'a>(&'a self) -> Self::Iter<'a> {
        MapIter(self.iter())
    }
}

pub struct MapIter<'a>(serde_json::map::Iter<'a>);

impl<'a> Iterator for MapIter<'a> {
    type Item = (&'a str, &'a serde_json::Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, v)| (k.as_str(), v))
    }
}

impl<'a> ExactSizeIterator for MapIter<'a> {
    fn len(&self) -> usize {
        self.0.len()
    }
}

impl<'a> Field<'a, serde_json::Value> for (&'a str, &'a serde_json::Value) {
    fn property(&self) -> &'a str {
        self.0
    }
    fn value(&self) -> &'a serde_json::Value {
        self.1
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::equal;
    use serde_json::json;

    #[test]
    fn json_value_and_typed_value_compare_equal() {
        let json = json!({"a": 1, "b": [true, "x"]});
        let typed = crate::Value::Object(indexmap::indexmap! {
            "a".to_string() => crate::Value::from(1u64),
            "b".to_string() => crate::Value::Array(vec![crate::Value::from(true), crate::Value::from("x")]),
        });
        assert!(equal(&json, &typed));
    }
}
