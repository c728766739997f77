//! The server orchestrator (spec §4.5 "Orchestrator"): a bounded queue plus
//! a pool of worker tasks. Each [`Job`] moves through read → deserialize
//! input → invoke operation → serialize output → write, exactly the
//! sequence the spec lists; the orchestrator's only job is to bound how
//! many of those sequences run concurrently and to observe each one's
//! outcome.

use std::sync::Arc;

use document::{Settings, Value};
use http::HeaderMap;
use schema::ProtocolKind;
use tokio::sync::{mpsc, oneshot};
use transport::{DataStream, HttpRequest, HttpResponse};

use crate::cors::apply_cors;
use crate::error::ServerError;
use crate::resolver::{self, Resolved};
use crate::route::Route;
use crate::service::RequestContext;

/// One unit of orchestrator work: an inbound request plus the channel its
/// eventual response is delivered on. The HTTP transport layer
/// (`crate::http`) constructs these; worker tasks are the only consumers.
pub struct Job {
    pub request: HttpRequest,
    respond_to: oneshot::Sender<HttpResponse>,
}

/// Owns the bounded queue and spawns the fixed pool of worker tasks that
/// drain it (spec §4.5, §5 "parallel workers with cooperative asynchronous
/// I/O"). Cloning an `Orchestrator` shares the same queue and worker pool —
/// cheap, and the intended way to hand a sender to multiple transport
/// listeners.
#[derive(Clone)]
pub struct Orchestrator {
    sender: mpsc::Sender<Job>,
}

impl Orchestrator {
    /// Spawns `worker_count` worker tasks draining a queue of depth
    /// `queue_depth`, each dispatching jobs against `routes` in order
    /// (first matching route's candidates are handed to the resolver).
    pub fn spawn(routes: Arc<Vec<Route>>, worker_count: usize, queue_depth: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_depth);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        for worker in 0..worker_count.max(1) {
            let receiver = receiver.clone();
            let routes = routes.clone();
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut receiver = receiver.lock().await;
                        receiver.recv().await
                    };
                    let Some(job) = job else { break };
                    tracing::debug!(worker, "dispatching job");
                    let response = dispatch(&routes, job.request).await;
                    let _ = job.respond_to.send(response);
                }
            });
        }

        Orchestrator { sender }
    }

    /// Enqueues `request` and awaits its response. Backpressure: if the
    /// queue is at capacity, this suspends until a worker frees a slot
    /// (spec §2 "Server pipeline ... asynchronous orchestration with
    /// backpressure").
    pub async fn submit(&self, request: HttpRequest) -> HttpResponse {
        let (respond_to, receive_response) = oneshot::channel();
        if self.sender.send(Job { request, respond_to }).await.is_err() {
            return HttpResponse::new(http::StatusCode::SERVICE_UNAVAILABLE);
        }
        receive_response.await.unwrap_or_else(|_| HttpResponse::new(http::StatusCode::INTERNAL_SERVER_ERROR))
    }
}

/// The per-job pipeline: route → resolve → deserialize → invoke → serialize,
/// with the protocol header echoed and CORS/error mapping applied at every
/// exit point (spec §4.5).
async fn dispatch(routes: &[Route], mut request: HttpRequest) -> HttpResponse {
    let header_map = to_header_map(&request.headers);
    let origin = request.headers.first_value("origin").map(str::to_string);

    let candidates = match routes.iter().find(|r| r.matches(&request.uri)) {
        Some(route) => &route.services,
        None => {
            return error_response(&ServerError::UnknownOperation {
                method: request.method.to_string(),
                uri: request.uri.to_string(),
            })
        }
    };

    let resolved = match resolver::resolve(&request.method, &request.uri, &header_map, candidates) {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    let body = match std::mem::replace(&mut request.body, DataStream::Empty).collect().await {
        Ok(bytes) => bytes,
        Err(e) => return error_response(&ServerError::MalformedHttp(e.to_string())),
    };

    let mut response = match handle(&resolved, &body, &request.headers).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    };

    response.set_header("smithy-protocol", protocol_header(resolved.protocol));

    if let Some(cors) = resolved.service.registry().get_trait(
        resolved.service.registry().lookup(resolved.service.id()).expect("service shape is registered"),
        resolved.service.registry().well_known().cors,
    ) {
        apply_cors(cors, origin.as_deref(), &mut response);
    }

    response
}

async fn handle(resolved: &Resolved, body: &[u8], request_headers: &transport::Headers) -> Result<HttpResponse, ServerError> {
    let registry = resolved.service.registry();
    let op = &resolved.operation.schema;

    let input = decode_input(resolved.protocol, registry, op, body)?;

    let context = RequestContext { operation: op.id.clone(), headers: request_headers.clone() };
    let output = resolved.operation.invocation.call(input, context).await?;

    encode_output(resolved.protocol, registry, op, &output)
}

fn decode_input(
    protocol: ProtocolKind,
    registry: &schema::Registry,
    op: &schema::OperationSchema,
    body: &[u8],
) -> Result<Value, ServerError> {
    Ok(match protocol {
        ProtocolKind::RpcV2Cbor => {
            if body.is_empty() {
                Value::Null
            } else {
                codec::rpcv2_cbor::decode(registry, op.input, body)?
            }
        }
        ProtocolKind::AwsJson1_0 | ProtocolKind::AwsJson1_1 => {
            codec::json_dialect::decode(registry, op.input, body, &Settings::aws_json())?
        }
        ProtocolKind::RestJson1 => {
            if body.is_empty() {
                Value::Object(indexmap::IndexMap::new())
            } else {
                codec::json_dialect::decode(registry, op.input, body, &Settings::rest_json())?
            }
        }
    })
}

fn encode_output(
    protocol: ProtocolKind,
    registry: &schema::Registry,
    op: &schema::OperationSchema,
    output: &Value,
) -> Result<HttpResponse, ServerError> {
    let code = op.http.as_ref().map(|h| h.code).unwrap_or(200);
    let status = http::StatusCode::from_u16(code).unwrap_or(http::StatusCode::OK);
    let mut response = HttpResponse::new(status);

    match protocol {
        ProtocolKind::RpcV2Cbor => {
            if !matches!(output, Value::Null) {
                let bytes = codec::rpcv2_cbor::encode(registry, op.output, output)?;
                response.set_header("content-type", "application/cbor");
                response.body = bytes.into();
            }
        }
        ProtocolKind::AwsJson1_0 | ProtocolKind::AwsJson1_1 => {
            let bytes = codec::json_dialect::encode(registry, op.output, output, &Settings::aws_json())?;
            response.set_header("content-type", "application/x-amz-json-1.1");
            response.body = bytes.into();
        }
        ProtocolKind::RestJson1 => {
            let bytes = codec::json_dialect::encode(registry, op.output, output, &Settings::rest_json())?;
            response.set_header("content-type", "application/json");
            response.body = bytes.into();
        }
    }

    Ok(response)
}

/// Status code mapping (spec §4.5): `@httpError` takes precedence over the
/// generic client/server-fault mapping.
fn error_response(error: &ServerError) -> HttpResponse {
    let status = error.status();
    tracing::warn!(error = %error, status = status.as_u16(), "request failed");
    let mut response = HttpResponse::new(status);
    response.set_header("content-type", "application/json");
    response.body = DataStream::Bytes(format!("{{\"message\":\"{error}\"}}").into_bytes().into());
    response
}

fn protocol_header(protocol: ProtocolKind) -> &'static str {
    match protocol {
        ProtocolKind::RpcV2Cbor => "rpc-v2-cbor",
        ProtocolKind::AwsJson1_0 => "aws-json-1.0",
        ProtocolKind::AwsJson1_1 => "aws-json-1.1",
        ProtocolKind::RestJson1 => "rest-json-1",
    }
}

fn to_header_map(headers: &transport::Headers) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, values) in headers.iter() {
        for value in values {
            if let (Ok(name), Ok(value)) = (http::HeaderName::from_bytes(name.as_bytes()), http::HeaderValue::from_str(value)) {
                map.append(name, value);
            }
        }
    }
    map
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::service::{Invocation, OperationHandler, StaticService};
    use schema::{ErrorRegistry, Registry, ShapeId, ShapeKind};

    fn beer_route() -> Route {
        let mut registry = Registry::new();
        let beer = registry
            .register(
                ShapeId::new("ex", "Beer"),
                ShapeKind::Structure,
                vec![
                    schema::Member { name: "name".into(), index: schema::MemberIndex(0), target: schema::MemberTarget::Resolved(
                        registry_scalar_string(&mut registry),
                    ) },
                ],
                schema::TraitMap::new(),
            )
            .unwrap();
        let output = registry
            .register(
                ShapeId::new("ex", "AddBeerOutput"),
                ShapeKind::Structure,
                vec![
                    schema::Member { name: "id".into(), index: schema::MemberIndex(0), target: schema::MemberTarget::Resolved(
                        registry_scalar_string(&mut registry),
                    ) },
                ],
                schema::TraitMap::new(),
            )
            .unwrap();
        registry.freeze().unwrap();

        let op = schema::OperationSchema {
            id: ShapeId::new("ex", "AddBeer"),
            service: ShapeId::new("ex", "BeerService"),
            input: beer,
            output,
            errors: ErrorRegistry::new(),
            http: None,
            auth_schemes: vec![],
            streaming_input: false,
            streaming_output: false,
            additional_input: None,
            proxy_of: None,
        };
        let handler = Arc::new(OperationHandler {
            schema: op,
            invocation: Invocation::Sync(Box::new(|input, _ctx| {
                let name = input.as_object().and_then(|o| o.get("name")).and_then(Value::as_str).unwrap_or("");
                let mut out = indexmap::IndexMap::new();
                out.insert("id".to_string(), Value::String(base64_lite(name)));
                Ok(Value::Object(out))
            })),
        });
        let service: Arc<dyn crate::service::Service> =
            Arc::new(StaticService::new(ShapeId::new("ex", "BeerService"), Arc::new(registry), vec![handler]));
        Route::prefix("/service", vec![service])
    }

    fn registry_scalar_string(registry: &mut Registry) -> schema::SchemaRef {
        registry
            .register(
                ShapeId::new("ex", "StringShape"),
                ShapeKind::Scalar(schema::Scalar::String),
                vec![],
                schema::TraitMap::new(),
            )
            .unwrap()
    }

    fn base64_lite(s: &str) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(s.as_bytes())
    }

    #[tokio::test]
    async fn scenario_rpcv2_routing_end_to_end() {
        // Spec §8 scenario 1.
        let routes = Arc::new(vec![beer_route()]);
        let orchestrator = Orchestrator::spawn(routes, 2, 8);

        let mut input = indexmap::IndexMap::new();
        input.insert("name".to_string(), Value::String("Oatmeal Stout".to_string()));
        input.insert("quantity".to_string(), Value::PosInt(1));

        let registry_for_encode = {
            // Re-derive a registry matching the route's input schema shape
            // to produce wire bytes the same way a real client would.
            let mut registry = Registry::new();
            let string_shape = registry_scalar_string(&mut registry);
            registry
                .register(
                    ShapeId::new("ex", "Beer"),
                    ShapeKind::Structure,
                    vec![schema::Member { name: "name".into(), index: schema::MemberIndex(0), target: schema::MemberTarget::Resolved(string_shape) }],
                    schema::TraitMap::new(),
                )
                .unwrap();
            registry.freeze().unwrap();
            registry
        };
        let beer_shape = registry_for_encode.lookup(&ShapeId::new("ex", "Beer")).unwrap();
        let body = codec::rpcv2_cbor::encode(&registry_for_encode, beer_shape, &Value::Object(input)).unwrap();

        let mut request = HttpRequest::new(http::Method::POST, http::Uri::from_static("/service/BeerService/operation/AddBeer"));
        request.set_header("smithy-protocol", "rpc-v2-cbor");
        request.set_header("content-type", "application/cbor");
        request.body = body.into();

        let response = orchestrator.submit(request).await;
        assert_eq!(response.status, http::StatusCode::OK);
        assert_eq!(response.headers.first_value("smithy-protocol"), Some("rpc-v2-cbor"));

        let out_bytes = response.body.collect().await.unwrap();
        assert!(!out_bytes.is_empty());
    }

    #[tokio::test]
    async fn an_unmatched_route_maps_to_404() {
        let routes = Arc::new(vec![beer_route()]);
        let orchestrator = Orchestrator::spawn(routes, 1, 4);

        let request = HttpRequest::new(http::Method::GET, http::Uri::from_static("/nope"));
        let response = orchestrator.submit(request).await;
        assert_eq!(response.status, http::StatusCode::NOT_FOUND);
    }
}
