//! The MCP (Model Context Protocol) bridge (spec §4.7 "MCP bridge", §6
//! "MCP JSON-RPC over stdio"): a JSON-RPC 2.0 loop over line-delimited
//! stdio exposing every operation of a set of services as a callable tool.
//! Grounded on `connector_proxy::connector_runner`'s stdin/stdout
//! bidirectional streaming idiom, reusing `transport::stdio::LineCodec`
//! for the framing, and on `doc::schema::to_schema` generalized to this
//! runtime's own `schema::Registry` (the `$defs`/`$ref` recursion-stop is
//! new: Flow shapes are pre-flattened and never needed one).

use std::collections::HashMap;
use std::sync::Arc;

use document::Settings;
use futures_util::{SinkExt, StreamExt};
use schema::{Registry, Scalar, SchemaRef, ShapeId, ShapeKind};
use serde::{Deserialize, Serialize};
use server::Service;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use transport::stdio::LineCodec;

use crate::error::ProxyError;

/// The MCP protocol version this bridge speaks, per the publicly
/// documented MCP spec (§6): exchanged verbatim in `initialize` responses.
const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
struct RpcRequest {
    id: Option<serde_json::Value>,
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcResponse {
    fn ok(id: serde_json::Value, result: serde_json::Value) -> Self {
        RpcResponse { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    fn err(id: serde_json::Value, code: i64, message: impl Into<String>) -> Self {
        RpcResponse { jsonrpc: "2.0", id, result: None, error: Some(RpcError { code, message: message.into() }) }
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// One tool derived from an operation schema — what `tools/list` enumerates
/// and `tools/call` dispatches against (spec §4.7, GLOSSARY "MCP tool").
struct Tool {
    service: Arc<dyn Service>,
    operation: String,
}

/// Exposes a fixed set of services' operations as MCP tools (spec §4.7).
pub struct McpServer {
    server_name: String,
    server_version: String,
    tools: HashMap<String, Tool>,
}

impl McpServer {
    pub fn new(server_name: impl Into<String>, server_version: impl Into<String>, services: Vec<Arc<dyn Service>>) -> Self {
        let mut tools = HashMap::new();
        for service in services {
            for op in service.operations() {
                tools.insert(op.schema.id.name().to_string(), Tool { service: service.clone(), operation: op.schema.id.name().to_string() });
            }
        }
        McpServer { server_name: server_name.into(), server_version: server_version.into(), tools }
    }

    /// Drives the JSON-RPC loop until `input` reaches EOF (spec §4.7
    /// "runs a JSON-RPC 2.0 loop on line-delimited standard input/output").
    pub async fn run<R, W>(&self, input: R, output: W) -> Result<(), ProxyError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = FramedRead::new(input, LineCodec::default());
        let mut out = FramedWrite::new(output, LineCodec::default());

        while let Some(line) = lines.next().await {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                let text = serde_json::to_string(&response)?;
                out.send(text).await?;
            }
        }
        Ok(())
    }

    async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let request: RpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => return Some(RpcResponse::err(serde_json::Value::Null, -32700, format!("parse error: {e}"))),
        };
        // A request with no `id` is a notification; per JSON-RPC 2.0, it
        // gets no response at all, successful or otherwise.
        let id = request.id?;

        Some(match request.method.as_str() {
            "initialize" => RpcResponse::ok(
                id,
                serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": { "listChanged": false } },
                    "serverInfo": { "name": self.server_name, "version": self.server_version },
                }),
            ),
            "tools/list" => RpcResponse::ok(id, serde_json::json!({ "tools": self.tool_list() })),
            "tools/call" => self.tools_call(id, request.params).await,
            other => RpcResponse::err(id, -32601, format!("method not found: {other}")),
        })
    }

    fn tool_list(&self) -> Vec<serde_json::Value> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.operation.cmp(&b.operation));
        tools
            .into_iter()
            .map(|tool| {
                let registry = tool.service.registry();
                let handler = tool.service.get_operation(&tool.operation).expect("tool was built from a real operation");
                serde_json::json!({
                    "name": tool.operation,
                    "description": format!("Invokes the '{}' operation.", tool.operation),
                    "inputSchema": input_schema_for(registry, handler.schema.input),
                })
            })
            .collect()
    }

    async fn tools_call(&self, id: serde_json::Value, params: serde_json::Value) -> RpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return RpcResponse::err(id, -32602, format!("invalid params: {e}")),
        };

        let Some(tool) = self.tools.get(&params.name) else {
            return RpcResponse::err(id, -32602, format!("unknown tool '{}'", params.name));
        };
        let registry = tool.service.registry();
        let handler = tool.service.get_operation(&tool.operation).expect("tool was built from a real operation");

        let argument_bytes = match serde_json::to_vec(&params.arguments) {
            Ok(b) => b,
            Err(e) => return RpcResponse::err(id, -32602, format!("invalid arguments: {e}")),
        };
        let input = match codec::json_dialect::decode(registry, handler.schema.input, &argument_bytes, &Settings::rest_json()) {
            Ok(v) => v,
            Err(e) => return RpcResponse::err(id, -32602, format!("invalid arguments: {e}")),
        };

        let context = server::RequestContext { operation: handler.schema.id.clone(), headers: transport::Headers::new() };
        let output = match handler.invocation.call(input, context).await {
            Ok(v) => v,
            Err(e) => return RpcResponse::err(id, -32000, format!("tool call failed: {e}")),
        };

        let output_bytes = match codec::json_dialect::encode(registry, handler.schema.output, &output, &Settings::rest_json()) {
            Ok(b) => b,
            Err(e) => return RpcResponse::err(id, -32000, format!("failed to encode tool output: {e}")),
        };
        let text = String::from_utf8_lossy(&output_bytes).into_owned();

        RpcResponse::ok(id, serde_json::json!({ "content": [{ "type": "text", "text": text }] }))
    }
}

/// Translates an operation's input shape into a JSON Schema object (spec
/// §4.7): structures become `object`, lists `array`, scalars a JSON
/// primitive, documents `{type: object, additionalProperties: true}`.
/// Recursive shapes are broken by emitting a `$ref`-equivalent for any
/// shape already on the expansion stack and collecting every expanded
/// shape once into a `$defs`-equivalent section.
fn input_schema_for(registry: &Registry, shape: SchemaRef) -> serde_json::Value {
    let mut defs = serde_json::Map::new();
    let mut stack = Vec::new();
    let mut schema = schema_for_shape(registry, shape, &mut defs, &mut stack);
    if !defs.is_empty() {
        if let serde_json::Value::Object(obj) = &mut schema {
            obj.insert("$defs".to_string(), serde_json::Value::Object(defs));
        }
    }
    schema
}

fn schema_for_shape(
    registry: &Registry,
    shape: SchemaRef,
    defs: &mut serde_json::Map<String, serde_json::Value>,
    stack: &mut Vec<ShapeId>,
) -> serde_json::Value {
    let id = registry.id(shape).clone();

    if stack.contains(&id) {
        return serde_json::json!({ "$ref": format!("#/$defs/{}", id.name()) });
    }

    match registry.kind(shape) {
        ShapeKind::Structure | ShapeKind::Union => {
            stack.push(id.clone());
            let mut properties = serde_json::Map::new();
            for member in registry.members(shape) {
                let target = registry.member_target(member);
                properties.insert(member.name.clone(), schema_for_shape(registry, target, defs, stack));
            }
            stack.pop();

            let schema = serde_json::json!({ "type": "object", "properties": properties });
            defs.entry(id.name().to_string()).or_insert_with(|| schema.clone());
            schema
        }
        ShapeKind::List => {
            stack.push(id.clone());
            let target = registry.members(shape).first().map(|m| registry.member_target(m));
            let items = target
                .map(|t| schema_for_shape(registry, t, defs, stack))
                .unwrap_or_else(|| serde_json::json!({}));
            stack.pop();

            let schema = serde_json::json!({ "type": "array", "items": items });
            defs.entry(id.name().to_string()).or_insert_with(|| schema.clone());
            schema
        }
        ShapeKind::Map => {
            stack.push(id.clone());
            let target = registry.member_by_name(shape, "value").map(|m| registry.member_target(m));
            let additional = target
                .map(|t| schema_for_shape(registry, t, defs, stack))
                .unwrap_or_else(|| serde_json::Value::Bool(true));
            stack.pop();

            let schema = serde_json::json!({ "type": "object", "additionalProperties": additional });
            defs.entry(id.name().to_string()).or_insert_with(|| schema.clone());
            schema
        }
        ShapeKind::Enum => serde_json::json!({ "type": "string" }),
        ShapeKind::IntEnum => serde_json::json!({ "type": "integer" }),
        ShapeKind::Blob => serde_json::json!({ "type": "string", "contentEncoding": "base64" }),
        ShapeKind::Scalar(Scalar::Document) => serde_json::json!({ "type": "object", "additionalProperties": true }),
        ShapeKind::Scalar(Scalar::Boolean) => serde_json::json!({ "type": "boolean" }),
        ShapeKind::Scalar(Scalar::String) | ShapeKind::Scalar(Scalar::BigInteger) | ShapeKind::Scalar(Scalar::BigDecimal) => {
            serde_json::json!({ "type": "string" })
        }
        ShapeKind::Scalar(Scalar::Int8)
        | ShapeKind::Scalar(Scalar::Int16)
        | ShapeKind::Scalar(Scalar::Int32)
        | ShapeKind::Scalar(Scalar::Int64) => serde_json::json!({ "type": "integer" }),
        ShapeKind::Scalar(Scalar::Float32) | ShapeKind::Scalar(Scalar::Float64) => serde_json::json!({ "type": "number" }),
        ShapeKind::Scalar(Scalar::Timestamp) => serde_json::json!({ "type": "string", "format": "date-time" }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use schema::{ErrorRegistry, Member, MemberIndex, MemberTarget, OperationSchema, TraitMap};
    use server::{Invocation, OperationHandler, StaticService};

    fn echo_service() -> Arc<dyn Service> {
        let mut registry = Registry::new();
        let string_shape = registry.register(ShapeId::new("ex", "Str"), ShapeKind::Scalar(Scalar::String), vec![], TraitMap::new()).unwrap();
        let input = registry
            .register(
                ShapeId::new("ex", "EchoInput"),
                ShapeKind::Structure,
                vec![Member { name: "message".into(), index: MemberIndex(0), target: MemberTarget::Resolved(string_shape) }],
                TraitMap::new(),
            )
            .unwrap();
        registry.freeze().unwrap();

        let mut op = OperationSchema::new(ShapeId::new("ex", "Echo"), ShapeId::new("ex", "EchoService"), input, input);
        op.errors = ErrorRegistry::new();

        let handler = Arc::new(OperationHandler {
            schema: op,
            invocation: Invocation::Sync(Box::new(|input, _ctx| Ok(input))),
        });
        Arc::new(StaticService::new(ShapeId::new("ex", "EchoService"), Arc::new(registry), vec![handler]))
    }

    fn recursive_service() -> Arc<dyn Service> {
        let mut registry = Registry::new();
        let tree_id = ShapeId::new("ex", "Tree");
        let list_id = ShapeId::new("ex", "TreeList");
        let tree = registry
            .register(
                tree_id.clone(),
                ShapeKind::Structure,
                vec![Member { name: "children".into(), index: MemberIndex(0), target: MemberTarget::Deferred(list_id.clone()) }],
                TraitMap::new(),
            )
            .unwrap();
        registry
            .register(
                list_id,
                ShapeKind::List,
                vec![Member { name: "member".into(), index: MemberIndex(0), target: MemberTarget::Deferred(tree_id) }],
                TraitMap::new(),
            )
            .unwrap();
        registry.freeze().unwrap();

        let op = OperationSchema::new(ShapeId::new("ex", "GetTree"), ShapeId::new("ex", "TreeService"), tree, tree);
        let handler = Arc::new(OperationHandler { schema: op, invocation: Invocation::Sync(Box::new(|input, _ctx| Ok(input))) });
        Arc::new(StaticService::new(ShapeId::new("ex", "TreeService"), Arc::new(registry), vec![handler]))
    }

    #[tokio::test]
    async fn initialize_reports_server_info_and_protocol_version() {
        let mcp = McpServer::new("test-server", "0.1.0", vec![echo_service()]);
        let response = mcp
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "test-server");
    }

    #[tokio::test]
    async fn tools_list_derives_an_object_schema_from_the_input_structure() {
        let mcp = McpServer::new("test-server", "0.1.0", vec![echo_service()]);
        let response = mcp.handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await.unwrap();
        let tools = response.result.unwrap()["tools"].clone();
        let tools = tools.as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "Echo");
        assert_eq!(tools[0]["inputSchema"]["type"], "object");
        assert_eq!(tools[0]["inputSchema"]["properties"]["message"]["type"], "string");
    }

    #[tokio::test]
    async fn tools_call_invokes_the_operation_and_returns_text_content() {
        let mcp = McpServer::new("test-server", "0.1.0", vec![echo_service()]);
        let params = serde_json::json!({"name": "Echo", "arguments": {"message": "hi"}});
        let response = mcp.tools_call(serde_json::json!(3), params).await;
        assert!(response.error.is_none());
        let content = response.result.unwrap()["content"][0]["text"].as_str().unwrap().to_string();
        assert!(content.contains("hi"));
    }

    #[tokio::test]
    async fn unknown_tool_reports_a_json_rpc_error() {
        let mcp = McpServer::new("test-server", "0.1.0", vec![echo_service()]);
        let params = serde_json::json!({"name": "DoesNotExist", "arguments": {}});
        let response = mcp.tools_call(serde_json::json!(4), params).await;
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[test]
    fn recursive_shape_expansion_terminates_via_a_ref() {
        let service = recursive_service();
        let registry = service.registry();
        let handler = service.get_operation("GetTree").unwrap();
        let schema = input_schema_for(registry, handler.schema.input);

        assert_eq!(schema["type"], "object");
        let defs = schema["$defs"].as_object().unwrap();
        assert!(defs.contains_key("Tree"));
        assert!(defs.contains_key("TreeList"));
    }
}
