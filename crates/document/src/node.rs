/// The generic form of a document node, produced by any concrete value
/// representation through [`AsNode`]. Mirrors the teacher's `doc::Node` /
/// `json::node::Node` family: one enum, many implementors, so redaction,
/// equality, and serialization all walk the same shape regardless of
/// whether the underlying value is our own [`crate::Value`] or a borrowed
/// `serde_json::Value`.
#[derive(Debug)]
pub enum Node<'a, N: AsNode> {
    Null,
    Bool(bool),
    PosInt(u64),
    NegInt(i64),
    Float(f64),
    String(&'a str),
    Bytes(&'a [u8]),
    Timestamp(chrono::DateTime<chrono::Utc>),
    Array(&'a [N]),
    Object(&'a N::Fields),
}

/// The trait by which a specific document representation is accessed
/// through a generic [`Node`].
pub trait AsNode: Sized {
    type Fields: Fields<Self> + ?Sized;

    fn as_node<'a>(&'a self) -> Node<'a, Self>;
}

/// The generic form of a document object's field collection.
pub trait Fields<N: AsNode> {
    type Field<'a>: Field<'a, N>
    where
        Self: 'a;
    type Iter<'a>: ExactSizeIterator<Item = Self::Field<'a>>
    where
        Self: 'a;

    fn get<'a>(&'a self, property: &str) -> Option<Self::Field<'a>>;
    fn len(&self) -> usize;
    fn iter<'a>(&'a self) -> Self::Iter<'a>;
}

/// The generic form of a single object field.
pub trait Field<'a, N: AsNode> {
    fn property(&self) -> &'a str;
    fn value(&self) -> &'a N;
}
