//! Protocol-specific request/response assembly (spec §6 "Wire protocols"):
//! turns an operation's input [`document::Value`] into a transport-level
//! [`HttpRequest`] for whichever [`ProtocolKind`] the operation's service
//! speaks, and the reverse for responses. Thin glue over `codec`'s
//! schema-driven encode/decode functions — this module only knows how to
//! shape a wire-level HTTP message around their output, not how to walk a
//! schema itself.

use document::{Settings, Value};
use schema::{OperationSchema, ProtocolKind, Registry};
use transport::{HttpRequest, HttpResponse};

use crate::endpoint::Endpoint;
use crate::error::CallError;

/// Builds the outbound request for one attempt (spec §4.4 step 6).
pub fn build_request(
    registry: &Registry,
    operation: &OperationSchema,
    protocol: ProtocolKind,
    endpoint: &Endpoint,
    input: &Value,
) -> Result<HttpRequest, CallError> {
    match protocol {
        ProtocolKind::RpcV2Cbor => build_rpcv2_cbor(registry, operation, endpoint, input),
        ProtocolKind::AwsJson1_0 => build_aws_json(registry, operation, endpoint, input, "application/x-amz-json-1.0"),
        ProtocolKind::AwsJson1_1 => build_aws_json(registry, operation, endpoint, input, "application/x-amz-json-1.1"),
        ProtocolKind::RestJson1 => build_rest_json(registry, operation, endpoint, input),
    }
}

fn with_endpoint_headers(mut request: HttpRequest, endpoint: &Endpoint) -> HttpRequest {
    for (name, values) in endpoint.headers.iter() {
        for value in values {
            request.add_header(name, value);
        }
    }
    request
}

fn build_rpcv2_cbor(
    registry: &Registry,
    operation: &OperationSchema,
    endpoint: &Endpoint,
    input: &Value,
) -> Result<HttpRequest, CallError> {
    let path = format!(
        "/service/{}/operation/{}",
        operation.service.name(),
        operation.id.name()
    );
    let uri = join_uri(&endpoint.uri, &path);

    let mut request = HttpRequest::new(http::Method::POST, uri);
    request.set_header("smithy-protocol", "rpc-v2-cbor");

    if !matches!(input, Value::Null) {
        let bytes = codec::rpcv2_cbor::encode(registry, operation.input, input)?;
        request.set_header("content-type", "application/cbor");
        request.body = bytes.into();
    }

    Ok(with_endpoint_headers(request, endpoint))
}

fn build_aws_json(
    registry: &Registry,
    operation: &OperationSchema,
    endpoint: &Endpoint,
    input: &Value,
    content_type: &str,
) -> Result<HttpRequest, CallError> {
    let mut request = HttpRequest::new(http::Method::POST, endpoint.uri.clone());
    request.set_header("x-amz-target", &format!("{}.{}", operation.service.name(), operation.id.name()));
    request.set_header("content-type", content_type);

    let bytes = codec::json_dialect::encode(registry, operation.input, input, &Settings::aws_json())?;
    request.body = bytes.into();

    Ok(with_endpoint_headers(request, endpoint))
}

fn build_rest_json(
    registry: &Registry,
    operation: &OperationSchema,
    endpoint: &Endpoint,
    input: &Value,
) -> Result<HttpRequest, CallError> {
    let http_trait = operation
        .http
        .as_ref()
        .ok_or_else(|| CallError::Internal(format!("operation '{}' has no @http binding", operation.id)))?;

    let bound = codec::http_bind(registry, operation.input, input)?;

    let mut path = http_trait.uri_pattern.clone();
    for (name, value) in &bound.labels {
        path = path.replace(&format!("{{{name}}}"), &urlencoding_lite(value));
    }

    let mut uri_string = join_uri(&endpoint.uri, &path).to_string();
    if !bound.query.is_empty() {
        let query: Vec<String> = bound.query.iter().map(|(k, v)| format!("{}={}", k, urlencoding_lite(v))).collect();
        uri_string.push('?');
        uri_string.push_str(&query.join("&"));
    }
    let uri: http::Uri = uri_string.parse().map_err(|e| CallError::Internal(format!("invalid URI: {e}")))?;

    let method = http::Method::from_bytes(http_trait.method.as_bytes())
        .map_err(|e| CallError::Internal(format!("invalid HTTP method: {e}")))?;
    let mut request = HttpRequest::new(method, uri);
    for (name, value) in &bound.headers {
        request.add_header(name, value);
    }

    if let Some(payload_member) = &bound.payload_member {
        if let Some(payload_value) = input.as_object().and_then(|o| o.get(payload_member)) {
            let bytes = codec::json_dialect::encode(registry, operation.input, payload_value, &Settings::rest_json())?;
            request.set_header("content-type", "application/json");
            request.body = bytes.into();
        }
    } else {
        let bytes = codec::json_dialect::encode(registry, operation.input, input, &Settings::rest_json())?;
        if !bytes.is_empty() && bytes.as_slice() != b"null" {
            request.set_header("content-type", "application/json");
            request.body = bytes.into();
        }
    }

    Ok(with_endpoint_headers(request, endpoint))
}

fn join_uri(base: &http::Uri, path: &str) -> http::Uri {
    let base_str = base.to_string();
    let trimmed = base_str.trim_end_matches('/');
    format!("{trimmed}{path}").parse().unwrap_or_else(|_| base.clone())
}

/// A minimal percent-encoder for path segments and query values — only the
/// handful of characters that would otherwise break URI syntax. Not a
/// general-purpose RFC 3986 encoder; sufficient for the label/query values
/// the spec's scalar types produce (strings, numbers, timestamps).
fn urlencoding_lite(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Parses a response for one attempt (spec §4.4 step 10). Returns the
/// output value on a success status; on a non-success status, attempts to
/// resolve the shape-id discriminator and returns
/// [`CallError::Modeled`] so the pipeline can hand the caller a typed
/// exception.
pub async fn parse_response(
    registry: &Registry,
    operation: &OperationSchema,
    protocol: ProtocolKind,
    mut response: HttpResponse,
) -> Result<Value, CallError> {
    let body = std::mem::replace(&mut response.body, transport::DataStream::Empty);
    let bytes = body.collect().await.map_err(|e| CallError::Transport(e.to_string()))?;

    if !response.is_success() {
        return Err(parse_modeled_error(registry, operation, protocol, &response, &bytes));
    }

    match protocol {
        ProtocolKind::RpcV2Cbor => {
            if bytes.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(codec::rpcv2_cbor::decode(registry, operation.output, &bytes)?)
            }
        }
        ProtocolKind::AwsJson1_0 | ProtocolKind::AwsJson1_1 => {
            Ok(codec::json_dialect::decode(registry, operation.output, &bytes, &Settings::aws_json())?)
        }
        ProtocolKind::RestJson1 => {
            Ok(codec::json_dialect::decode(registry, operation.output, &bytes, &Settings::rest_json())?)
        }
    }
}

fn parse_modeled_error(
    registry: &Registry,
    operation: &OperationSchema,
    protocol: ProtocolKind,
    response: &HttpResponse,
    bytes: &[u8],
) -> CallError {
    let discriminator = response
        .headers
        .first_value("x-amzn-errortype")
        .map(str::to_string)
        .or_else(|| error_discriminator_from_body(protocol, bytes));

    let Some(discriminator) = discriminator else {
        return CallError::Transport(format!("HTTP {} with no error discriminator", response.status));
    };
    let shape_name = discriminator.split('#').next_back().unwrap_or(&discriminator);
    let shape_id = schema::ShapeId::new(operation.service.namespace(), shape_name);

    let Some(&shape_ref) = registry.lookup(&shape_id).as_ref() else {
        return CallError::Transport(format!("unmodeled error '{shape_id}' (HTTP {})", response.status));
    };

    let settings = match protocol {
        ProtocolKind::RpcV2Cbor => None,
        ProtocolKind::AwsJson1_0 | ProtocolKind::AwsJson1_1 => Some(Settings::aws_json()),
        ProtocolKind::RestJson1 => Some(Settings::rest_json()),
    };

    let value = match (protocol, settings) {
        (ProtocolKind::RpcV2Cbor, _) => codec::rpcv2_cbor::decode(registry, shape_ref, bytes).unwrap_or(Value::Null),
        (_, Some(settings)) => codec::json_dialect::decode(registry, shape_ref, bytes, &settings).unwrap_or(Value::Null),
        _ => Value::Null,
    };

    CallError::Modeled { shape_id, value }
}

fn error_discriminator_from_body(protocol: ProtocolKind, bytes: &[u8]) -> Option<String> {
    if matches!(protocol, ProtocolKind::RpcV2Cbor) {
        return None;
    }
    let json: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    json.get("__type")
        .or_else(|| json.get("code"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod test {
    use super::*;
    use schema::{ErrorRegistry, Registry, ShapeId, ShapeKind};

    fn registry_with_unit() -> (Registry, schema::SchemaRef) {
        let mut registry = Registry::new();
        let unit = registry
            .register(ShapeId::new("ex", "Unit"), ShapeKind::Structure, vec![], schema::TraitMap::new())
            .unwrap();
        registry.freeze().unwrap();
        (registry, unit)
    }

    #[test]
    fn rpcv2_cbor_request_has_the_spec_shaped_uri_and_headers() {
        let (registry, unit) = registry_with_unit();
        let op = OperationSchema {
            id: ShapeId::new("ex", "AddBeer"),
            service: ShapeId::new("ex", "BeerService"),
            input: unit,
            output: unit,
            errors: ErrorRegistry::new(),
            http: None,
            auth_schemes: vec![],
            streaming_input: false,
            streaming_output: false,
            additional_input: None,
            proxy_of: None,
        };
        let endpoint = Endpoint::new(http::Uri::from_static("https://example.test"));
        let request = build_rpcv2_cbor(&registry, &op, &endpoint, &Value::Null).unwrap();

        assert_eq!(request.uri.path(), "/service/BeerService/operation/AddBeer");
        assert_eq!(request.headers.first_value("smithy-protocol"), Some("rpc-v2-cbor"));
        assert!(request.body.is_empty());
    }

    #[test]
    fn aws_json_request_sets_the_target_header() {
        let (registry, unit) = registry_with_unit();
        let op = OperationSchema {
            id: ShapeId::new("ex", "GetWidget"),
            service: ShapeId::new("ex", "WidgetService"),
            input: unit,
            output: unit,
            errors: ErrorRegistry::new(),
            http: None,
            auth_schemes: vec![],
            streaming_input: false,
            streaming_output: false,
            additional_input: None,
            proxy_of: None,
        };
        let endpoint = Endpoint::new(http::Uri::from_static("https://example.test"));
        let request =
            build_aws_json(&registry, &op, &endpoint, &Value::Object(Default::default()), "application/x-amz-json-1.0")
                .unwrap();

        assert_eq!(request.headers.first_value("x-amz-target"), Some("WidgetService.GetWidget"));
        assert_eq!(request.headers.first_value("content-type"), Some("application/x-amz-json-1.0"));
    }
}
