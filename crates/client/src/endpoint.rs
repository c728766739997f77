use crate::context::Context;
use crate::error::CallError;
use http::Uri;
use transport::Headers;

/// A resolved destination plus any headers the resolver wants injected
/// ahead of signing (spec §4.4 step 2).
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub uri: Uri,
    pub headers: Headers,
}

impl Endpoint {
    pub fn new(uri: Uri) -> Self {
        Endpoint { uri, headers: Headers::new() }
    }
}

/// Produces the destination URI for a call, given the operation, the
/// call's [`Context`], and its input (spec §4.4 step 2, GLOSSARY
/// "Endpoint resolver").
#[async_trait::async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve(
        &self,
        operation: &schema::OperationSchema,
        context: &Context,
        input: &document::Value,
    ) -> Result<Endpoint, CallError>;
}

/// Resolves to a fixed base URI for every call. The common case for a
/// client bound to one service endpoint at construction time.
pub struct StaticEndpointResolver {
    uri: Uri,
}

impl StaticEndpointResolver {
    pub fn new(uri: Uri) -> Self {
        StaticEndpointResolver { uri }
    }
}

#[async_trait::async_trait]
impl EndpointResolver for StaticEndpointResolver {
    async fn resolve(
        &self,
        _operation: &schema::OperationSchema,
        _context: &Context,
        _input: &document::Value,
    ) -> Result<Endpoint, CallError> {
        Ok(Endpoint::new(self.uri.clone()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use schema::{ErrorRegistry, OperationSchema, Registry, ShapeId, ShapeKind};

    fn dummy_operation(registry: &mut Registry) -> OperationSchema {
        let unit = registry
            .register(ShapeId::new("ex", "Unit"), ShapeKind::Structure, vec![], schema::TraitMap::new())
            .unwrap();
        OperationSchema {
            id: ShapeId::new("ex", "Op"),
            service: ShapeId::new("ex", "Svc"),
            input: unit,
            output: unit,
            errors: ErrorRegistry::new(),
            http: None,
            auth_schemes: vec![],
            streaming_input: false,
            streaming_output: false,
            additional_input: None,
            proxy_of: None,
        }
    }

    #[tokio::test]
    async fn static_resolver_always_returns_the_same_uri() {
        let mut registry = Registry::new();
        let op = dummy_operation(&mut registry);
        let resolver = StaticEndpointResolver::new(Uri::from_static("https://example.test"));
        let endpoint =
            resolver.resolve(&op, &Context::new(), &document::Value::Null).await.unwrap();
        assert_eq!(endpoint.uri, Uri::from_static("https://example.test"));
    }
}
