//! Parses the JSON service description the `mcp-server` binary is pointed
//! at into a [`schema::Registry`] and [`schema::OperationSchema`] list,
//! without needing `Registry` itself to be `Deserialize` — the model data
//! this binary consumes is exactly the "pre-parsed schemas and traits"
//! the core is scoped to accept from an external collaborator (spec §1);
//! this is the thinnest possible stand-in for that collaborator, built
//! directly on `Registry::register`/`freeze` rather than a new arena
//! format of its own.

use std::collections::HashMap;

use schema::{Member, MemberIndex, MemberTarget, OperationSchema, ProtocolKind, Registry, Scalar, ShapeId, ShapeKind, TraitMap};
use serde::Deserialize;

use crate::error::ProxyError;

#[derive(Debug, Deserialize)]
pub struct ProxyConfig {
    pub service: String,
    pub upstream: String,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    pub shapes: Vec<ShapeConfig>,
    pub operations: Vec<OperationConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolConfig {
    #[default]
    RpcV2Cbor,
    AwsJson1_0,
    AwsJson1_1,
    RestJson1,
}

impl From<&ProtocolConfig> for ProtocolKind {
    fn from(value: &ProtocolConfig) -> Self {
        match value {
            ProtocolConfig::RpcV2Cbor => ProtocolKind::RpcV2Cbor,
            ProtocolConfig::AwsJson1_0 => ProtocolKind::AwsJson1_0,
            ProtocolConfig::AwsJson1_1 => ProtocolKind::AwsJson1_1,
            ProtocolConfig::RestJson1 => ProtocolKind::RestJson1,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ShapeConfig {
    pub id: String,
    pub kind: ShapeKindConfig,
    #[serde(default)]
    pub members: Vec<MemberConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKindConfig {
    Structure,
    Union,
    List,
    Map,
    Enum,
    IntEnum,
    Blob,
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

impl From<&ShapeKindConfig> for ShapeKind {
    fn from(value: &ShapeKindConfig) -> Self {
        match value {
            ShapeKindConfig::Structure => ShapeKind::Structure,
            ShapeKindConfig::Union => ShapeKind::Union,
            ShapeKindConfig::List => ShapeKind::List,
            ShapeKindConfig::Map => ShapeKind::Map,
            ShapeKindConfig::Enum => ShapeKind::Enum,
            ShapeKindConfig::IntEnum => ShapeKind::IntEnum,
            ShapeKindConfig::Blob => ShapeKind::Blob,
            ShapeKindConfig::Boolean => ShapeKind::Scalar(Scalar::Boolean),
            ShapeKindConfig::Int8 => ShapeKind::Scalar(Scalar::Int8),
            ShapeKindConfig::Int16 => ShapeKind::Scalar(Scalar::Int16),
            ShapeKindConfig::Int32 => ShapeKind::Scalar(Scalar::Int32),
            ShapeKindConfig::Int64 => ShapeKind::Scalar(Scalar::Int64),
            ShapeKindConfig::Float32 => ShapeKind::Scalar(Scalar::Float32),
            ShapeKindConfig::Float64 => ShapeKind::Scalar(Scalar::Float64),
            ShapeKindConfig::BigInteger => ShapeKind::Scalar(Scalar::BigInteger),
            ShapeKindConfig::BigDecimal => ShapeKind::Scalar(Scalar::BigDecimal),
            ShapeKindConfig::String => ShapeKind::Scalar(Scalar::String),
            ShapeKindConfig::Timestamp => ShapeKind::Scalar(Scalar::Timestamp),
            ShapeKindConfig::Document => ShapeKind::Scalar(Scalar::Document),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MemberConfig {
    pub name: String,
    /// The target shape's id (`namespace#name`), resolved against the
    /// other entries in [`ProxyConfig::shapes`] at freeze time.
    pub target: String,
}

#[derive(Debug, Deserialize)]
pub struct OperationConfig {
    pub name: String,
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub streaming_input: bool,
    #[serde(default)]
    pub streaming_output: bool,
    #[serde(default)]
    pub additional_input: Option<String>,
}

/// Builds a frozen [`Registry`] plus the operation list for `config.service`
/// out of a [`ProxyConfig`]. Every shape id referenced by a member or
/// operation must also appear in `config.shapes`, or this fails the same
/// way a hand-built registry would at `freeze` (spec §4.1).
pub fn load(config: &ProxyConfig) -> Result<(Registry, ShapeId, Vec<OperationSchema>, ProtocolKind), ProxyError> {
    let mut registry = Registry::new();
    let mut by_config_id = HashMap::new();

    for shape in &config.shapes {
        let id = shape_id(&shape.id);
        let members = shape
            .members
            .iter()
            .enumerate()
            .map(|(index, member)| Member {
                name: member.name.clone(),
                index: MemberIndex(index as u32),
                target: MemberTarget::Deferred(shape_id(&member.target)),
            })
            .collect();
        let reference = registry
            .register(id.clone(), (&shape.kind).into(), members, TraitMap::new())
            .map_err(|e| ProxyError::Config(e.to_string()))?;
        by_config_id.insert(shape.id.clone(), reference);
    }

    registry.freeze().map_err(|e| ProxyError::Config(e.to_string()))?;

    let service_id = shape_id(&config.service);
    let mut operations = Vec::with_capacity(config.operations.len());
    for op in &config.operations {
        let input = *by_config_id
            .get(&op.input)
            .ok_or_else(|| ProxyError::Config(format!("operation '{}' references unknown input shape '{}'", op.name, op.input)))?;
        let output = *by_config_id
            .get(&op.output)
            .ok_or_else(|| ProxyError::Config(format!("operation '{}' references unknown output shape '{}'", op.name, op.output)))?;

        let mut schema = OperationSchema::new(shape_id(&op.name), service_id.clone(), input, output);
        schema.streaming_input = op.streaming_input;
        schema.streaming_output = op.streaming_output;
        if let Some(mixin_id) = &op.additional_input {
            let mixin = *by_config_id
                .get(mixin_id)
                .ok_or_else(|| ProxyError::Config(format!("operation '{}' references unknown additionalInput shape '{}'", op.name, mixin_id)))?;
            schema.additional_input = Some(mixin);
        }
        operations.push(schema);
    }

    Ok((registry, service_id, operations, (&config.protocol).into()))
}

/// Config shape ids are plain names (`"Widget"`) for brevity; expand them
/// into the `namespace#name` form the registry requires, using a fixed
/// synthetic namespace since the config format has no namespace concept
/// of its own.
fn shape_id(name: &str) -> ShapeId {
    ShapeId::parse(name).unwrap_or_else(|| ShapeId::new("proxy.config", name))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn loads_a_simple_echo_operation() {
        let config: ProxyConfig = serde_json::from_str(
            r#"{
                "service": "EchoService",
                "upstream": "https://upstream.test",
                "shapes": [
                    {"id": "Str", "kind": "string"},
                    {"id": "EchoInput", "kind": "structure", "members": [{"name": "message", "target": "Str"}]}
                ],
                "operations": [
                    {"name": "Echo", "input": "EchoInput", "output": "EchoInput"}
                ]
            }"#,
        )
        .unwrap();

        let (registry, service_id, operations, protocol) = load(&config).unwrap();
        assert_eq!(service_id, shape_id("EchoService"));
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].id, shape_id("Echo"));
        assert!(matches!(protocol, ProtocolKind::RpcV2Cbor));
        assert!(registry.is_frozen());
    }

    #[test]
    fn unknown_input_shape_is_reported() {
        let config: ProxyConfig = serde_json::from_str(
            r#"{
                "service": "Svc",
                "upstream": "https://upstream.test",
                "shapes": [],
                "operations": [{"name": "Op", "input": "Missing", "output": "Missing"}]
            }"#,
        )
        .unwrap();

        assert!(load(&config).is_err());
    }
}
