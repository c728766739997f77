use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use document::Value;
use schema::{OperationSchema, Registry, ShapeId};

use crate::error::ServerError;

/// Per-request state an operation handler receives alongside its input
/// (spec §3 Context, generalized to the server's receive path — request
/// headers and the resolved operation are the server-side analogue of the
/// client pipeline's identity/endpoint/retry-attempt bindings).
#[derive(Clone)]
pub struct RequestContext {
    pub operation: ShapeId,
    pub headers: transport::Headers,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A handler invocation (spec §4.5 "Operation invocation"): either a plain
/// synchronous function or one returning a future, matching the source's
/// `(Input, RequestContext) -> Output` / `... -> impl Future<Output =
/// Output>` split. The orchestrator treats both uniformly by boxing the
/// sync case's already-ready result.
pub enum Invocation {
    Sync(Box<dyn Fn(Value, RequestContext) -> Result<Value, ServerError> + Send + Sync>),
    Async(Box<dyn Fn(Value, RequestContext) -> BoxFuture<'static, Result<Value, ServerError>> + Send + Sync>),
}

impl Invocation {
    pub async fn call(&self, input: Value, context: RequestContext) -> Result<Value, ServerError> {
        match self {
            Invocation::Sync(f) => f(input, context),
            Invocation::Async(f) => f(input, context).await,
        }
    }
}

/// One operation's handler plus the schema plumbing the orchestrator needs
/// to deserialize its input and serialize its output (spec §3 "Operation
/// schema", §4.5).
pub struct OperationHandler {
    pub schema: OperationSchema,
    pub invocation: Invocation,
}

/// A collection of operations sharing a namespace and protocol set (spec
/// GLOSSARY "Service"). `get_operation` is the server-side analogue of a
/// generated service trait's dispatch table; the core doesn't generate
/// it — a model-loading collaborator builds one per service (§1).
pub trait Service: Send + Sync {
    fn id(&self) -> &ShapeId;

    fn registry(&self) -> &Arc<Registry>;

    /// All operations this service exposes, in no particular order. Used
    /// by the protocol resolver to match a request's URI/headers and by
    /// the MCP bridge to enumerate tools (spec §4.5, §4.7).
    fn operations(&self) -> &[Arc<OperationHandler>];

    fn get_operation(&self, name: &str) -> Option<&Arc<OperationHandler>> {
        self.operations().iter().find(|op| op.schema.id.name() == name)
    }
}

/// A straightforward in-memory [`Service`]: a fixed operation list built at
/// construction time. Sufficient for the core's own tests and for a
/// model-loading collaborator that doesn't need dynamic registration.
pub struct StaticService {
    id: ShapeId,
    registry: Arc<Registry>,
    operations: Vec<Arc<OperationHandler>>,
}

impl StaticService {
    pub fn new(id: ShapeId, registry: Arc<Registry>, operations: Vec<Arc<OperationHandler>>) -> Self {
        StaticService { id, registry, operations }
    }
}

impl Service for StaticService {
    fn id(&self) -> &ShapeId {
        &self.id
    }

    fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn operations(&self) -> &[Arc<OperationHandler>] {
        &self.operations
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use schema::{ErrorRegistry, Registry, ShapeKind};

    fn unit_op(registry: &mut Registry, name: &str) -> OperationSchema {
        let unit = registry
            .register(ShapeId::new("ex", "Unit"), ShapeKind::Structure, vec![], schema::TraitMap::new())
            .unwrap();
        OperationSchema {
            id: ShapeId::new("ex", name),
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

    #[test]
    fn get_operation_looks_up_by_name() {
        let mut registry = Registry::new();
        let schema = unit_op(&mut registry, "Ping");
        registry.freeze().unwrap();
        let registry = Arc::new(registry);

        let handler = Arc::new(OperationHandler {
            schema,
            invocation: Invocation::Sync(Box::new(|input, _ctx| Ok(input))),
        });
        let svc = StaticService::new(ShapeId::new("ex", "Svc"), registry, vec![handler]);

        assert!(svc.get_operation("Ping").is_some());
        assert!(svc.get_operation("Missing").is_none());
    }

    #[tokio::test]
    async fn sync_and_async_invocations_both_run_through_call() {
        let sync = Invocation::Sync(Box::new(|input, _ctx| Ok(input)));
        let out = sync.call(Value::Null, RequestContext { operation: ShapeId::new("ex", "Op"), headers: transport::Headers::new() }).await;
        assert!(matches!(out, Ok(Value::Null)));

        let asynch = Invocation::Async(Box::new(|input, _ctx| Box::pin(async move { Ok(input) })));
        let out = asynch.call(Value::Null, RequestContext { operation: ShapeId::new("ex", "Op"), headers: transport::Headers::new() }).await;
        assert!(matches!(out, Ok(Value::Null)));
    }
}
