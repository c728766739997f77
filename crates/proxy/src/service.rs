//! The proxy service (spec §4.7 "Proxy service"): a `server::Service` whose
//! handlers forward their already-deserialized input to an upstream
//! endpoint through a `client::Pipeline` call, rather than running any
//! application logic of their own. Grounded on
//! `connector_proxy::connector_runner::run_connector` + `connector_proxy`'s
//! `apis::RequestResponseConverterPair` shape — "protocol on one side,
//! converter pair, run the child" — here the child process is replaced
//! with an outbound client call to a configured upstream.

use std::sync::Arc;

use client::{EndpointResolver, Transport};
use schema::{Member, MemberIndex, MemberTarget, OperationSchema, ProtocolKind, Registry, SchemaRef, ShapeId, ShapeKind, TraitMap};
use server::{Invocation, OperationHandler, RequestContext, Service, ServerError, StaticService};

/// Builds a [`StaticService`] that proxies every non-streaming operation of
/// `operations` to `upstream_protocol` through a [`client::Pipeline`] built
/// from `endpoint_resolver` and `transport`, and returns that pipeline
/// alongside the service. Both share one `Arc<Registry>` — the pipeline's
/// serializer/deserializer steps (spec §4.4 steps 6 and 10) look up the
/// proxied operations' own shapes by [`SchemaRef`] index, which must be the
/// exact registry the service was built from, including any shapes
/// synthesized below.
///
/// Operations with `streaming_input`/`streaming_output` set are skipped
/// outright (spec §4.7: "operations marked as streaming on input or output
/// are skipped"). Operations that carry an `additionalInput` mixin
/// additionally get a synthesized `<Name>Proxy` companion operation
/// registered alongside the original, both of which forward to the same
/// upstream call.
///
/// `registry` is frozen by this call if it isn't already — every shape a
/// proxied operation could reference, including any synthesized
/// `<Name>ProxyInput` shapes, must already be registered.
pub fn build_proxy_service(
    mut registry: Registry,
    service_id: ShapeId,
    operations: Vec<OperationSchema>,
    endpoint_resolver: Arc<dyn EndpointResolver>,
    transport: Arc<dyn Transport>,
    upstream_protocol: ProtocolKind,
) -> (Arc<dyn Service>, Arc<client::Pipeline>) {
    let mut synthesized_ops = Vec::new();
    for op in &operations {
        if op.streaming_input || op.streaming_output {
            continue;
        }
        if let Some(mixin) = op.additional_input {
            synthesized_ops.push(synthesize_proxy_operation(&mut registry, op, mixin));
        }
    }

    if !registry.is_frozen() {
        registry.freeze().expect("proxy service's registry must freeze before serving");
    }
    let registry = Arc::new(registry);

    let pipeline = Arc::new(client::Pipeline {
        registry: registry.clone(),
        endpoint_resolver,
        auth_scheme_resolver: Arc::new(client::ModeledAuthSchemeResolver),
        identity_resolvers: client::IdentityResolverChain::new(vec![]),
        signers: Default::default(),
        interceptors: vec![],
        transport,
        retry: Arc::new(retry::TokenBucket::new(retry::TokenBucketConfig::default())),
    });

    let mut handlers = Vec::new();
    for op in operations {
        if op.streaming_input || op.streaming_output {
            tracing::debug!(operation = %op.id, "skipping streaming operation in proxy service");
            continue;
        }
        handlers.push(proxy_handler(op, pipeline.clone(), upstream_protocol));
    }
    for synthesized in synthesized_ops {
        handlers.push(proxy_handler(synthesized, pipeline.clone(), upstream_protocol));
    }

    (Arc::new(StaticService::new(service_id, registry, handlers)), pipeline)
}

/// Appends `mixin`'s members to `op`'s input shape and registers a
/// `<Name>Proxy` companion operation carrying `proxy_of` set to the
/// original operation's id — the runtime-core stand-in for a model's
/// `ProxyOperationTrait` (spec §4.7).
fn synthesize_proxy_operation(registry: &mut Registry, op: &OperationSchema, mixin: SchemaRef) -> OperationSchema {
    let mut members: Vec<Member> = registry.members(op.input).to_vec();
    let next_index = members.len() as u32;
    for (offset, member) in registry.members(mixin).iter().enumerate() {
        members.push(Member {
            name: member.name.clone(),
            index: MemberIndex(next_index + offset as u32),
            target: MemberTarget::Resolved(registry.member_target(member)),
        });
    }

    let proxy_input_id = ShapeId::new(op.id.namespace(), &format!("{}ProxyInput", op.id.name()));
    let proxy_input = registry
        .register_resolved(proxy_input_id, ShapeKind::Structure, members, TraitMap::new())
        .expect("synthesized proxy input shape registers cleanly");

    let mut proxy = op.clone();
    proxy.id = ShapeId::new(op.id.namespace(), &format!("{}Proxy", op.id.name()));
    proxy.input = proxy_input;
    proxy.additional_input = None;
    proxy.proxy_of = Some(op.id.clone());
    proxy
}

/// Builds the handler that actually issues the upstream call. The
/// operation forwarded upstream is always `op` itself with `id` reset to
/// the original (pre-`Proxy`-suffix) id when `op` is a synthesized
/// companion — the upstream service never heard of the `<Name>Proxy`
/// shape, only of the extra members now folded into its input.
fn proxy_handler(op: OperationSchema, pipeline: Arc<client::Pipeline>, protocol: ProtocolKind) -> Arc<OperationHandler> {
    let mut upstream_op = op.clone();
    if let Some(original_id) = op.proxy_of.clone() {
        upstream_op.id = original_id;
    }

    Arc::new(OperationHandler {
        schema: op,
        invocation: Invocation::Async(Box::new(move |input, _ctx: RequestContext| {
            let pipeline = pipeline.clone();
            let upstream_op = upstream_op.clone();
            Box::pin(async move {
                pipeline
                    .call(&upstream_op, protocol, input, client::Context::new())
                    .await
                    .map_err(call_error_to_server_error)
            })
        })),
    })
}

/// Maps the client pipeline's single error enum onto the server pipeline's
/// (spec §7): both are "single flat enum" taxonomies by design, so this is
/// the one seam where the two meet rather than an ad hoc rewrap at every
/// call site.
fn call_error_to_server_error(error: client::CallError) -> ServerError {
    match error {
        client::CallError::Serialization(e) => ServerError::Serialization(e),
        client::CallError::Modeled { shape_id, value } => {
            ServerError::Modeled { shape_id, fault: schema::ErrorFault::Server, value, status_override: None }
        }
        client::CallError::Cancelled => ServerError::Cancelled,
        other => ServerError::Internal(other.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use client::StaticEndpointResolver;
    use document::Value;
    use schema::{ErrorRegistry, ShapeKind};
    use std::sync::atomic::{AtomicU32, Ordering};
    use transport::{DataStream, HttpResponse};

    struct EchoTransport {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl client::Transport for EchoTransport {
        async fn send(
            &self,
            _request: transport::HttpRequest,
            _timeout: Option<std::time::Duration>,
        ) -> Result<HttpResponse, client::CallError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(http::StatusCode::OK).with_body(DataStream::Empty))
        }
    }

    fn unit_endpoint_resolver() -> Arc<dyn EndpointResolver> {
        Arc::new(StaticEndpointResolver::new(http::Uri::from_static("https://upstream.test")))
    }

    fn unit_op(registry: &mut Registry, name: &str, streaming_output: bool) -> OperationSchema {
        let unit = registry.register(ShapeId::new("ex", "Unit"), ShapeKind::Structure, vec![], TraitMap::new()).unwrap();
        let mut op = OperationSchema::new(ShapeId::new("ex", name), ShapeId::new("ex", "Svc"), unit, unit);
        op.errors = ErrorRegistry::new();
        op.streaming_output = streaming_output;
        op
    }

    #[tokio::test]
    async fn a_plain_operation_forwards_to_the_upstream_pipeline() {
        let mut registry = Registry::new();
        let op = unit_op(&mut registry, "Ping", false);

        let transport = Arc::new(EchoTransport { calls: AtomicU32::new(0) });
        let (service, _pipeline) = build_proxy_service(
            registry,
            ShapeId::new("ex", "Svc"),
            vec![op],
            unit_endpoint_resolver(),
            transport.clone(),
            ProtocolKind::RpcV2Cbor,
        );

        let handler = service.get_operation("Ping").unwrap();
        let out = handler.invocation.call(Value::Null, RequestContext { operation: ShapeId::new("ex", "Ping"), headers: transport::Headers::new() }).await;

        assert!(out.is_ok());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn streaming_operations_are_not_registered() {
        let mut registry = Registry::new();
        let op = unit_op(&mut registry, "StreamIt", true);

        let transport = Arc::new(EchoTransport { calls: AtomicU32::new(0) });
        let (service, _pipeline) = build_proxy_service(
            registry,
            ShapeId::new("ex", "Svc"),
            vec![op],
            unit_endpoint_resolver(),
            transport,
            ProtocolKind::RpcV2Cbor,
        );

        assert!(service.get_operation("StreamIt").is_none());
    }

    #[tokio::test]
    async fn additional_input_mixin_synthesizes_a_proxy_companion() {
        let mut registry = Registry::new();
        let string_shape = registry.register(ShapeId::new("ex", "Str"), ShapeKind::Scalar(schema::Scalar::String), vec![], TraitMap::new()).unwrap();
        let input = registry
            .register(
                ShapeId::new("ex", "GetThingInput"),
                ShapeKind::Structure,
                vec![Member { name: "id".into(), index: MemberIndex(0), target: MemberTarget::Resolved(string_shape) }],
                TraitMap::new(),
            )
            .unwrap();
        let mixin = registry
            .register(
                ShapeId::new("ex", "AdditionalInput"),
                ShapeKind::Structure,
                vec![Member { name: "traceId".into(), index: MemberIndex(0), target: MemberTarget::Resolved(string_shape) }],
                TraitMap::new(),
            )
            .unwrap();

        let mut op = OperationSchema::new(ShapeId::new("ex", "GetThing"), ShapeId::new("ex", "Svc"), input, input);
        op.additional_input = Some(mixin);

        let transport = Arc::new(EchoTransport { calls: AtomicU32::new(0) });
        let (service, _pipeline) = build_proxy_service(
            registry,
            ShapeId::new("ex", "Svc"),
            vec![op],
            unit_endpoint_resolver(),
            transport,
            ProtocolKind::RpcV2Cbor,
        );

        assert!(service.get_operation("GetThing").is_some());
        let proxy = service.get_operation("GetThingProxy").expect("proxy companion was registered");
        assert_eq!(proxy.schema.proxy_of, Some(ShapeId::new("ex", "GetThing")));
        let members = service.registry().members(proxy.schema.input);
        assert_eq!(members.len(), 2);
        assert!(members.iter().any(|m| m.name == "traceId"));
    }
}
