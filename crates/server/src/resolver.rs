//! The protocol resolver (spec §4.5 "Routing"): given a request's method,
//! URI, and headers plus a route's candidate services, picks exactly one
//! `(service, operation, protocol)` triple or fails.

use std::sync::Arc;

use http::{HeaderMap, Method, Uri};
use schema::{OperationSchema, ProtocolKind};

use crate::error::ServerError;
use crate::service::{OperationHandler, Service};

pub struct Resolved {
    pub service: Arc<dyn Service>,
    pub operation: Arc<OperationHandler>,
    pub protocol: ProtocolKind,
}

/// Resolves one request against `candidates` (the services of whichever
/// [`crate::route::Route`] matched the request's path).
///
/// Order of attempts, each short-circuiting on a match:
/// 1. RpcV2 CBOR, if the URI has the `/service/<Service>/operation/<Op>`
///    shape (spec §4.5, §6).
/// 2. `awsJson1_0`/`awsJson1_1`, if an `X-Amz-Target` header is present
///    (spec §6).
/// 3. `restJson1`, matching each candidate operation's `@http` method and
///    URI template against the request (spec §6).
pub fn resolve(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    candidates: &[Arc<dyn Service>],
) -> Result<Resolved, ServerError> {
    if uri.path().starts_with("/service/") {
        return resolve_rpcv2_cbor(method, uri, headers, candidates);
    }
    if let Some(target) = headers.get("x-amz-target").and_then(|v| v.to_str().ok()) {
        return resolve_aws_json(target, candidates);
    }
    resolve_rest_json1(method, uri, candidates)
}

fn resolve_rpcv2_cbor(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    candidates: &[Arc<dyn Service>],
) -> Result<Resolved, ServerError> {
    if method != Method::POST {
        return Err(ServerError::MalformedHttp(format!(
            "rpc-v2-cbor requires POST, got {method}"
        )));
    }
    let protocol_header = headers.get("smithy-protocol").and_then(|v| v.to_str().ok());
    if protocol_header != Some("rpc-v2-cbor") {
        return Err(ServerError::MalformedHttp(
            "POST to a /service/.../operation/... URI requires header 'smithy-protocol: rpc-v2-cbor'".to_string(),
        ));
    }

    let segments: Vec<&str> = uri.path().trim_start_matches('/').split('/').collect();
    let [ "service", service_name, "operation", operation_name ] = segments.as_slice() else {
        return Err(ServerError::MalformedHttp(format!(
            "URI '{}' does not match /service/<Service>/operation/<Operation>",
            uri.path()
        )));
    };

    if let Some(content_type) = headers.get("content-type").and_then(|v| v.to_str().ok()) {
        if content_type != "application/cbor" {
            return Err(ServerError::MalformedHttp(format!(
                "expected content-type 'application/cbor', got '{content_type}'"
            )));
        }
    }

    let service = find_service(candidates, service_name)
        .ok_or_else(|| unknown(method, uri))?;
    let operation = service
        .get_operation(operation_name)
        .cloned()
        .ok_or_else(|| unknown(method, uri))?;

    Ok(Resolved { service, operation, protocol: ProtocolKind::RpcV2Cbor })
}

fn resolve_aws_json(target: &str, candidates: &[Arc<dyn Service>]) -> Result<Resolved, ServerError> {
    let (service_name, operation_name) = target
        .split_once('.')
        .ok_or_else(|| ServerError::MalformedHttp(format!("malformed X-Amz-Target '{target}'")))?;

    let service = find_service(candidates, service_name).ok_or_else(|| ServerError::UnknownOperation {
        method: "POST".to_string(),
        uri: target.to_string(),
    })?;
    let operation = service.get_operation(operation_name).cloned().ok_or_else(|| ServerError::UnknownOperation {
        method: "POST".to_string(),
        uri: target.to_string(),
    })?;

    // Either awsJson1_0 or awsJson1_1 — the wire shape is identical; the
    // caller's configured service protocol decides which JSON settings to
    // use downstream (§6), so either tag works as a routing signal.
    Ok(Resolved { service, operation, protocol: ProtocolKind::AwsJson1_1 })
}

fn resolve_rest_json1(method: &Method, uri: &Uri, candidates: &[Arc<dyn Service>]) -> Result<Resolved, ServerError> {
    for service in candidates {
        for operation in service.operations() {
            let Some(http) = &operation.schema.http else { continue };
            if http.method.as_str() != method.as_str() {
                continue;
            }
            if uri_template_matches(&http.uri_pattern, uri.path()) {
                return Ok(Resolved {
                    service: service.clone(),
                    operation: operation.clone(),
                    protocol: ProtocolKind::RestJson1,
                });
            }
        }
    }
    Err(unknown(method, uri))
}

/// Matches a `{label}`-templated URI pattern against a concrete path,
/// segment by segment; a `{...}` segment accepts any single non-empty
/// segment (spec §4.2, §6 "HTTP binding").
fn uri_template_matches(pattern: &str, path: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    if pattern_segments.len() != path_segments.len() {
        return false;
    }
    pattern_segments.iter().zip(path_segments.iter()).all(|(p, s)| {
        (p.starts_with('{') && p.ends_with('}') && !s.is_empty()) || p == s
    })
}

fn find_service(candidates: &[Arc<dyn Service>], name: &str) -> Option<Arc<dyn Service>> {
    candidates
        .iter()
        .find(|svc| {
            let id = svc.id();
            if let Some((namespace, unqualified)) = name.rsplit_once('.') {
                id.namespace() == namespace && id.name() == unqualified
            } else {
                id.name() == name
            }
        })
        .cloned()
}

fn unknown(method: &Method, uri: &Uri) -> ServerError {
    ServerError::UnknownOperation { method: method.to_string(), uri: uri.to_string() }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::service::{Invocation, OperationHandler, StaticService};
    use schema::{ErrorRegistry, HttpTrait, Registry, ShapeId, ShapeKind};

    fn beer_service() -> Arc<dyn Service> {
        let mut registry = Registry::new();
        let beer = registry
            .register(
                ShapeId::new("ex", "Beer"),
                ShapeKind::Structure,
                vec![],
                schema::TraitMap::new(),
            )
            .unwrap();
        registry.freeze().unwrap();

        let op = OperationSchema {
            id: ShapeId::new("ex", "AddBeer"),
            service: ShapeId::new("ex", "BeerService"),
            input: beer,
            output: beer,
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
            invocation: Invocation::Sync(Box::new(|input, _ctx| Ok(input))),
        });
        Arc::new(StaticService::new(ShapeId::new("ex", "BeerService"), Arc::new(registry), vec![handler]))
    }

    #[test]
    fn scenario_rpcv2_routing_unqualified_service() {
        // Spec §8 scenario 1.
        let candidates = vec![beer_service()];
        let mut headers = HeaderMap::new();
        headers.insert("smithy-protocol", "rpc-v2-cbor".parse().unwrap());
        headers.insert("content-type", "application/cbor".parse().unwrap());

        let resolved = resolve(
            &Method::POST,
            &Uri::from_static("/service/BeerService/operation/AddBeer"),
            &headers,
            &candidates,
        )
        .unwrap();

        assert_eq!(resolved.operation.schema.id.name(), "AddBeer");
        assert!(matches!(resolved.protocol, ProtocolKind::RpcV2Cbor));
    }

    #[test]
    fn post_without_the_protocol_header_is_malformed() {
        let candidates = vec![beer_service()];
        let err = resolve(
            &Method::POST,
            &Uri::from_static("/service/BeerService/operation/AddBeer"),
            &HeaderMap::new(),
            &candidates,
        )
        .unwrap_err();
        assert!(matches!(err, ServerError::MalformedHttp(_)));
    }

    #[test]
    fn mismatched_content_type_is_malformed() {
        let candidates = vec![beer_service()];
        let mut headers = HeaderMap::new();
        headers.insert("smithy-protocol", "rpc-v2-cbor".parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());
        let err = resolve(
            &Method::POST,
            &Uri::from_static("/service/BeerService/operation/AddBeer"),
            &headers,
            &candidates,
        )
        .unwrap_err();
        assert!(matches!(err, ServerError::MalformedHttp(_)));
    }

    #[test]
    fn unknown_operation_name_is_reported_as_such() {
        let candidates = vec![beer_service()];
        let mut headers = HeaderMap::new();
        headers.insert("smithy-protocol", "rpc-v2-cbor".parse().unwrap());
        let err = resolve(
            &Method::POST,
            &Uri::from_static("/service/BeerService/operation/RemoveBeer"),
            &headers,
            &candidates,
        )
        .unwrap_err();
        assert!(matches!(err, ServerError::UnknownOperation { .. }));
    }

    #[test]
    fn rest_json1_matches_http_trait_method_and_labeled_path() {
        let mut registry = Registry::new();
        let widget = registry
            .register(ShapeId::new("ex", "Widget"), ShapeKind::Structure, vec![], schema::TraitMap::new())
            .unwrap();
        registry.freeze().unwrap();
        let op = OperationSchema {
            id: ShapeId::new("ex", "GetWidget"),
            service: ShapeId::new("ex", "WidgetService"),
            input: widget,
            output: widget,
            errors: ErrorRegistry::new(),
            http: Some(HttpTrait { method: "GET".to_string(), uri_pattern: "/widgets/{id}".to_string(), code: 200 }),
            auth_schemes: vec![],
            streaming_input: false,
            streaming_output: false,
            additional_input: None,
            proxy_of: None,
        };
        let handler = Arc::new(OperationHandler { schema: op, invocation: Invocation::Sync(Box::new(|i, _| Ok(i))) });
        let service: Arc<dyn Service> =
            Arc::new(StaticService::new(ShapeId::new("ex", "WidgetService"), Arc::new(registry), vec![handler]));

        let resolved = resolve(&Method::GET, &Uri::from_static("/widgets/abc123"), &HeaderMap::new(), &[service]).unwrap();
        assert_eq!(resolved.operation.schema.id.name(), "GetWidget");
        assert!(matches!(resolved.protocol, ProtocolKind::RestJson1));
    }
}
