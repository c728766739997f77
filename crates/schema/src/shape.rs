use crate::id::SchemaRef;

/// The kind of a shape, per §3 of the runtime spec. Scalars are flattened
/// into a single variant family rather than one-variant-per-primitive so
/// match arms that only care "is this a scalar" stay short; callers that
/// need the exact primitive match on [`Scalar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Structure,
    Union,
    List,
    Map,
    Enum,
    IntEnum,
    Blob,
    Scalar(Scalar),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    BigInteger,
    BigDecimal,
    String,
    Timestamp,
    Document,
}

impl ShapeKind {
    pub fn is_scalar(&self) -> bool {
        matches!(self, ShapeKind::Scalar(_))
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            ShapeKind::Structure | ShapeKind::Union | ShapeKind::List | ShapeKind::Map
        )
    }
}

/// A member's stable, dense index within its owning structure or union,
/// `0..N-1`. Serde kernel visitor callbacks dispatch on this rather than on
/// the member name, so implementations can use a match or jump table instead
/// of a string hash per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberIndex(pub u32);

/// A named, ordered child of a structure, union, or enum shape.
///
/// `target` may be unresolved (a forward reference used while building a
/// recursive bundle of shapes); [`crate::Registry::freeze`] resolves every
/// member's target or fails the freeze.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub index: MemberIndex,
    pub target: MemberTarget,
}

#[derive(Debug, Clone)]
pub enum MemberTarget {
    Resolved(SchemaRef),
    /// A deferred target, by shape id, used to allow recursive shape graphs
    /// to be registered before every id in the graph exists. Resolved during
    /// [`crate::Registry::freeze`].
    Deferred(crate::id::ShapeId),
}
