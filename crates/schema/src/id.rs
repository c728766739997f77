use std::fmt;

/// A globally unique shape id, `namespace#name`.
///
/// Interned as an owned `String` rather than split fields: shape ids flow
/// through error messages and wire protocols far more often than they're
/// decomposed, so we keep the natural `namespace#name` form as the storage.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ShapeId(String);

impl ShapeId {
    pub fn new(namespace: &str, name: &str) -> Self {
        ShapeId(format!("{namespace}#{name}"))
    }

    /// Parse a `namespace#name` string. Returns `None` if it has no `#`.
    pub fn parse(id: &str) -> Option<Self> {
        id.find('#').map(|_| ShapeId(id.to_string()))
    }

    pub fn namespace(&self) -> &str {
        self.0.split('#').next().unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.0.split('#').nth(1).unwrap_or("")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeId({})", self.0)
    }
}

impl From<&str> for ShapeId {
    fn from(s: &str) -> Self {
        ShapeId::parse(s).unwrap_or_else(|| ShapeId(s.to_string()))
    }
}

/// An index into a [`crate::Registry`]'s shape arena. Cheap to copy and
/// compare; stable for the lifetime of the registry it was produced from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaRef(pub(crate) u32);

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaRef({})", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn namespace_and_name_split_on_hash() {
        let id = ShapeId::new("com.example", "Widget");
        assert_eq!(id.as_str(), "com.example#Widget");
        assert_eq!(id.namespace(), "com.example");
        assert_eq!(id.name(), "Widget");
    }

    #[test]
    fn parse_rejects_missing_hash() {
        assert!(ShapeId::parse("no-hash-here").is_none());
        assert!(ShapeId::parse("com.example#Widget").is_some());
    }
}
