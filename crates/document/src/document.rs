use crate::equal::equal;
use crate::node::AsNode;
use crate::settings::Settings;
use crate::value::Value;
use std::sync::Arc;

/// A value a [`Document`] can wrap instead of holding its own [`Value`]
/// tree directly — a typed, schema-bearing struct from the `codec` crate.
/// Kept as a narrow trait here (rather than depending on `codec`) so
/// `document` stays a leaf crate; `codec::SerializableStruct` implementors
/// get a blanket impl of this trait at the boundary where both crates meet.
///
/// Spec §4.3 edge-case policy: "a document that wraps a typed struct defers
/// to the struct's own schema when asked to serialize" — `to_value` is that
/// deferral point.
pub trait TypedSource: Send + Sync {
    fn to_value(&self) -> Value;
}

/// A dynamically typed value tree that round-trips through any codec
/// (spec §3 Document, §4.3).
#[derive(Clone)]
pub struct Document {
    inner: Inner,
    settings: Settings,
}

#[derive(Clone)]
enum Inner {
    Value(Value),
    Typed(Arc<dyn TypedSource>),
}

impl Document {
    pub fn of(value: Value, settings: Settings) -> Self {
        Document {
            inner: Inner::Value(value),
            settings,
        }
    }

    /// Wrap a typed, schema-bearing struct. Serializing the result defers
    /// to the struct's own encoding rather than re-deriving a `Value` tree
    /// up front, preserving round-trip fidelity through `settings`.
    pub fn wrap_struct(source: Arc<dyn TypedSource>, settings: Settings) -> Self {
        Document {
            inner: Inner::Typed(source),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Materializes the document's value tree, converting a wrapped typed
    /// struct on demand.
    pub fn value(&self) -> Value {
        match &self.inner {
            Inner::Value(v) => v.clone(),
            Inner::Typed(source) => source.to_value(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.value().type_name()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value().as_bool()
    }

    pub fn as_str(&self) -> Option<String> {
        self.value().as_str().map(str::to_string)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value().as_f64()
    }

    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        self.value().as_bytes().map(<[u8]>::to_vec)
    }

    pub fn as_array(&self) -> Option<Vec<Value>> {
        self.value().as_array().map(<[Value]>::to_vec)
    }

    /// Structural equality per spec §8: numeric-canonical, order-insensitive
    /// maps, regardless of which side wraps a typed struct.
    pub fn equals(&self, other: &Document) -> bool {
        equal(&self.value(), &other.value())
    }

    /// Serializes the document's contents via any `serde`-compatible
    /// serializer, honoring the sensitivity/redaction pass a caller applies
    /// upstream (redaction is a `codec` concern; this just walks the tree).
    pub fn serialize_contents<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ValueSer(&self.value()).serialize(serializer)
    }
}

struct ValueSer<'a>(&'a Value);

impl<'a> serde::Serialize for ValueSer<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use crate::node::Node;
        match self.0.as_node() {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(b),
            Node::PosInt(n) => serializer.serialize_u64(n),
            Node::NegInt(n) => serializer.serialize_i64(n),
            Node::Float(n) => serializer.serialize_f64(n),
            Node::String(s) => serializer.serialize_str(s),
            Node::Timestamp(t) => serializer.collect_str(&t.to_rfc3339()),
            Node::Bytes(b) => {
                if serializer.is_human_readable() {
                    use base64::Engine;
                    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(b))
                } else {
                    serializer.serialize_bytes(b)
                }
            }
            Node::Array(a) => serializer.collect_seq(a.iter().map(ValueSer)),
            Node::Object(m) => {
                use crate::node::{Field, Fields};
                serializer.collect_map(m.iter().map(|f| (f.property(), ValueSer(f.value()))))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct FixedSource(Value);
    impl TypedSource for FixedSource {
        fn to_value(&self) -> Value {
            self.0.clone()
        }
    }

    #[test]
    fn of_round_trips_accessors() {
        let doc = Document::of(Value::from("hi"), Settings::default());
        assert_eq!(doc.as_str(), Some("hi".to_string()));
        assert_eq!(doc.type_name(), "string");
    }

    #[test]
    fn wrapped_struct_defers_to_its_source() {
        let doc = Document::wrap_struct(Arc::new(FixedSource(Value::from(42u64))), Settings::default());
        assert_eq!(doc.as_f64(), Some(42.0));
    }

    #[test]
    fn equals_is_structural_across_wrapping() {
        let a = Document::of(Value::from(1u64), Settings::default());
        let b = Document::wrap_struct(Arc::new(FixedSource(Value::from(1.0f64))), Settings::default());
        assert!(a.equals(&b));
    }
}
