use schema::{MemberIndex, Registry, SchemaRef};

/// A value that exposes its schema and can produce its own member values
/// by schema-driven index, rather than by name (spec §3 SerializableStruct,
/// §4.2: "Visitor callbacks receive the *member schema*... enabling O(1)
/// member dispatch via `memberIndex`").
///
/// Nested structures implement this recursively: `to_document` for a
/// container type calls `to_document` on each struct-typed member, so the
/// resulting [`document::Value`] tree is complete before any codec sees it.
/// Redaction ([`crate::redact::redact`]) then walks that tree alongside the
/// schema to blank out `@sensitive` members, and each codec module encodes
/// the (possibly redacted) tree to wire bytes.
pub trait SerializableStruct {
    fn schema(&self) -> SchemaRef;

    /// Converts this value and its members into a generic document tree,
    /// in member-index order. Implementations never observe partial
    /// failure: construction of the tree is infallible by construction
    /// (invalid data is a bug in the generated binding, not a runtime
    /// condition the spec asks callers to handle here).
    fn to_document(&self, registry: &Registry) -> document::Value;

    /// Direct access to one member's value without building the whole
    /// tree, used by the generic redaction pass and by HTTP binding when
    /// only a handful of members (label/query/header slots) are needed.
    fn member(&self, registry: &Registry, index: MemberIndex) -> Option<document::Value> {
        let members = registry.members(self.schema());
        let target = members.get(index.0 as usize)?;
        let name = &target.name;
        self.to_document(registry).as_object()?.get(name).cloned()
    }
}
