use crate::id::{SchemaRef, ShapeId};
use fxhash::FxHashMap as HashMap;
use std::sync::Arc;

/// Builds a modeled exception value out of wire bytes already deserialized
/// into a generic document/struct form. Operation-specific; supplied by the
/// model-loading collaborator that sits outside the core (§1).
pub trait ErrorBuilder: Send + Sync {
    fn shape(&self) -> SchemaRef;
}

/// Per-operation registry of modeled errors, keyed by shape id so the
/// deserializer can round-trip a discriminated error payload back into its
/// specific exception type (§3 Operation schema).
#[derive(Clone, Default)]
pub struct ErrorRegistry {
    builders: HashMap<ShapeId, Arc<dyn ErrorBuilder>>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ShapeId, builder: Arc<dyn ErrorBuilder>) {
        self.builders.insert(id, builder);
    }

    pub fn get(&self, id: &ShapeId) -> Option<&Arc<dyn ErrorBuilder>> {
        self.builders.get(id)
    }
}

/// An identified {identity-kind, signer} pairing, per the GLOSSARY. The
/// core treats scheme ids as opaque shape ids; client and server crates
/// attach the concrete identity resolver / signer implementations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AuthSchemeId(pub ShapeId);

/// The `@http` trait's payload: method, URI pattern (with `{label}`
/// placeholders resolved against `httpLabel`-bound members), and default
/// success status code (spec §4.2, §6 "HTTP binding").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpTrait {
    pub method: String,
    pub uri_pattern: String,
    pub code: u16,
}

/// The wire protocol an operation (or the service it belongs to) is
/// reachable over (spec §6 "Wire protocols").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolKind {
    RpcV2Cbor,
    AwsJson1_0,
    AwsJson1_1,
    RestJson1,
}

/// The triple of (input, output, error-registry) plus service linkage and
/// effective auth schemes described in §3.
#[derive(Clone)]
pub struct OperationSchema {
    pub id: ShapeId,
    pub service: ShapeId,
    pub input: SchemaRef,
    pub output: SchemaRef,
    pub errors: ErrorRegistry,
    /// Present when this operation carries an `@http` binding (required
    /// for `restJson1`, absent for `rpcV2Cbor`/`awsJson1_*`).
    pub http: Option<HttpTrait>,
    /// Priority-ordered; the first scheme supported by the active identity
    /// resolver chain is selected (§4.4 step 3).
    pub auth_schemes: Vec<AuthSchemeId>,
    /// Whether the input, respectively output, is a streaming blob or event
    /// stream (§4.2 "streaming blobs and event streams"). The proxy service
    /// (§4.7) skips operations with either flag set rather than forwarding
    /// them.
    pub streaming_input: bool,
    pub streaming_output: bool,
    /// The `additionalInput` mixin structure, if this model declares one for
    /// this operation (§4.7): its members are appended to the input shape
    /// of a synthesized `<Name>Proxy` companion operation.
    pub additional_input: Option<SchemaRef>,
    /// Set on a synthesized `<Name>Proxy` companion operation (§4.7): the id
    /// of the original operation it proxies, the runtime-core analogue of a
    /// model's `ProxyOperationTrait`.
    pub proxy_of: Option<ShapeId>,
}

impl OperationSchema {
    /// A plain (non-proxy, non-streaming, no extra mixin) operation —
    /// the common case, and the one nearly every existing test constructs.
    pub fn new(id: ShapeId, service: ShapeId, input: SchemaRef, output: SchemaRef) -> Self {
        OperationSchema {
            id,
            service,
            input,
            output,
            errors: ErrorRegistry::new(),
            http: None,
            auth_schemes: vec![],
            streaming_input: false,
            streaming_output: false,
            additional_input: None,
            proxy_of: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shape::ShapeKind;

    #[test]
    fn error_registry_round_trips_by_shape_id() {
        struct DummyBuilder(SchemaRef);
        impl ErrorBuilder for DummyBuilder {
            fn shape(&self) -> SchemaRef {
                self.0
            }
        }

        let mut reg = crate::Registry::new();
        let throttled = reg
            .register(
                ShapeId::new("ex", "ThrottlingException"),
                ShapeKind::Structure,
                vec![],
                crate::traits::TraitMap::new(),
            )
            .unwrap();

        let mut errors = ErrorRegistry::new();
        errors.insert(
            ShapeId::new("ex", "ThrottlingException"),
            Arc::new(DummyBuilder(throttled)),
        );

        let found = errors.get(&ShapeId::new("ex", "ThrottlingException"));
        assert!(found.is_some());
        assert_eq!(found.unwrap().shape(), throttled);
    }
}
