//! HTTP binding codec (spec §4.2, §6): maps individual structure members to
//! URI label, query-string, header, prefix-header, or payload slots using
//! the `httpLabel`/`httpQuery`/`httpHeader`/`httpPrefixHeaders`/
//! `httpPayload` traits.
//!
//! This module produces and consumes a codec-neutral [`BoundRequest`]
//! rather than a concrete HTTP message type: `http_binding` sits below
//! `transport` in the dependency order (see SPEC_FULL §2), so the
//! `transport` crate is the one that assembles an actual request/response
//! out of these label/query/header/payload pieces.

use document::Value;
use schema::{Member, Registry, SchemaRef};

use crate::error::{Result, SerializationException};

/// The pieces a structure's members bind to, prior to URI/header assembly.
#[derive(Debug, Default, Clone)]
pub struct BoundRequest {
    /// In member order; the caller substitutes these into the operation's
    /// URI template by label name.
    pub labels: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    /// Header name is already lowercased, per spec §8 "idempotent header
    /// ops" / case-insensitive-key invariant.
    pub headers: Vec<(String, String)>,
    /// The member bound via `httpPayload`, if any; otherwise `None` and the
    /// caller should serialize the structure's unbound members as the body
    /// via the selected document codec.
    pub payload_member: Option<String>,
}

/// Distributes `value`'s members across label/query/header/prefix-header
/// slots per their traits. Members with none of those traits are left out
/// of the returned plan — they belong in the body.
pub fn bind(registry: &Registry, schema: SchemaRef, value: &Value) -> Result<BoundRequest> {
    let well_known = registry.well_known();
    let fields = value
        .as_object()
        .ok_or_else(|| err(registry, schema, "HTTP-bound value must be a structure"))?;

    let mut plan = BoundRequest::default();

    for member in registry.members(schema) {
        let Some(member_value) = fields.get(&member.name) else {
            continue;
        };
        let target = registry.member_target(member);

        if registry.has_trait(target, well_known.http_label) {
            let rendered = scalar_to_string(member_value);
            if rendered.is_empty() {
                return Err(SerializationException::new(
                    registry.id(target).clone(),
                    format!("HTTP label for {} cannot be empty", registry.id(target)),
                ));
            }
            plan.labels.push((member.name.clone(), rendered));
        } else if let Some(wire_name) = registry.get_trait(target, well_known.http_query) {
            bind_query(&mut plan, wire_name, member_value);
        } else if let Some(wire_name) = registry.get_trait(target, well_known.http_header) {
            bind_header(&mut plan, wire_name, member_value);
        } else if let Some(prefix) = registry.get_trait(target, well_known.http_prefix_headers) {
            bind_prefix_headers(&mut plan, prefix, member_value);
        } else if registry.has_trait(target, well_known.http_payload) {
            plan.payload_member = Some(member.name.clone());
        }
    }

    Ok(plan)
}

fn bind_query(plan: &mut BoundRequest, name: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                plan.query.push((name.to_string(), scalar_to_string(item)));
            }
        }
        other => plan.query.push((name.to_string(), scalar_to_string(other))),
    }
}

fn bind_header(plan: &mut BoundRequest, name: &str, value: &Value) {
    let key = name.to_ascii_lowercase();
    match value {
        // Lists become repeated headers sharing one key (spec §4.2).
        Value::Array(items) => {
            for item in items {
                plan.headers.push((key.clone(), scalar_to_string(item)));
            }
        }
        other => plan.headers.push((key, scalar_to_string(other))),
    }
}

fn bind_prefix_headers(plan: &mut BoundRequest, prefix: &str, value: &Value) {
    if let Some(map) = value.as_object() {
        for (k, v) in map.iter() {
            plan.headers.push((format!("{prefix}{k}").to_ascii_lowercase(), scalar_to_string(v)));
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::PosInt(n) => n.to_string(),
        Value::NegInt(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::Timestamp(t) => t.to_rfc3339(),
        Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}

/// Reassembles bound members (already-resolved label values, parsed query
/// pairs, request headers) plus an optional decoded payload back into a
/// structure-shaped [`Value`], for the server-side deserialization path.
pub fn unbind(
    registry: &Registry,
    schema: SchemaRef,
    labels: &[(String, String)],
    query: &[(String, String)],
    headers: &[(String, String)],
    payload: Option<Value>,
) -> Result<Value> {
    let well_known = registry.well_known();
    let mut out = indexmap::IndexMap::new();

    for member in registry.members(schema) {
        let target = registry.member_target(member);

        if registry.has_trait(target, well_known.http_label) {
            if let Some((_, v)) = labels.iter().find(|(k, _)| k == &member.name) {
                out.insert(member.name.clone(), Value::String(v.clone()));
            }
        } else if let Some(wire_name) = registry.get_trait(target, well_known.http_query) {
            let matches: Vec<Value> = query
                .iter()
                .filter(|(k, _)| k == wire_name)
                .map(|(_, v)| Value::String(v.clone()))
                .collect();
            if !matches.is_empty() {
                out.insert(member.name.clone(), Value::Array(matches));
            }
        } else if let Some(wire_name) = registry.get_trait(target, well_known.http_header) {
            let key = wire_name.to_ascii_lowercase();
            let matches: Vec<Value> = headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(&key))
                .map(|(_, v)| Value::String(v.clone()))
                .collect();
            if matches.len() == 1 {
                out.insert(member.name.clone(), matches.into_iter().next().unwrap());
            } else if !matches.is_empty() {
                out.insert(member.name.clone(), Value::Array(matches));
            }
        } else if let Some(prefix) = registry.get_trait(target, well_known.http_prefix_headers) {
            let mut map = indexmap::IndexMap::new();
            for (k, v) in headers {
                if let Some(rest) = k.strip_prefix(prefix.as_str()) {
                    map.insert(rest.to_string(), Value::String(v.clone()));
                }
            }
            if !map.is_empty() {
                out.insert(member.name.clone(), Value::Object(map));
            }
        } else if registry.has_trait(target, well_known.http_payload) {
            if let Some(p) = payload.clone() {
                out.insert(member.name.clone(), p);
            }
        }
    }

    Ok(Value::Object(out))
}

fn err(registry: &Registry, schema: SchemaRef, message: &str) -> SerializationException {
    SerializationException::new(registry.id(schema).clone(), message.to_string())
}

/// Returns true if `member`'s target carries any HTTP binding trait, i.e.
/// it's not part of the implicit document body.
pub fn is_bound(registry: &Registry, member: &Member) -> bool {
    let well_known = registry.well_known();
    let target = registry.member_target(member);
    registry.has_trait(target, well_known.http_label)
        || registry.has_trait(target, well_known.http_query)
        || registry.has_trait(target, well_known.http_header)
        || registry.has_trait(target, well_known.http_prefix_headers)
        || registry.has_trait(target, well_known.http_payload)
}

#[cfg(test)]
mod test {
    use super::*;
    use schema::{MemberIndex, MemberTarget, ShapeKind, TraitMap};

    fn build_widget() -> (Registry, SchemaRef) {
        let mut reg = Registry::new();
        let string_scalar = reg
            .register(
                schema::ShapeId::new("ex", "Str"),
                ShapeKind::Scalar(schema::Scalar::String),
                vec![],
                TraitMap::new(),
            )
            .unwrap();

        let labeled = {
            let mut t = TraitMap::new();
            t.insert(reg.well_known().http_label, ());
            reg.register(schema::ShapeId::new("ex", "Id"), ShapeKind::Scalar(schema::Scalar::String), vec![], t)
                .unwrap()
        };

        let widget = reg
            .register(
                schema::ShapeId::new("ex", "Widget"),
                ShapeKind::Structure,
                vec![
                    Member { name: "id".into(), index: MemberIndex(0), target: MemberTarget::Resolved(labeled) },
                    Member { name: "name".into(), index: MemberIndex(1), target: MemberTarget::Resolved(string_scalar) },
                ],
                TraitMap::new(),
            )
            .unwrap();
        reg.freeze().unwrap();
        (reg, widget)
    }

    #[test]
    fn label_member_binds_and_empty_label_is_rejected() {
        let (reg, widget) = build_widget();

        let value = Value::Object(indexmap::indexmap! {
            "id".to_string() => Value::from("abc"),
            "name".to_string() => Value::from("n"),
        });
        let plan = bind(&reg, widget, &value).unwrap();
        assert_eq!(plan.labels, vec![("id".to_string(), "abc".to_string())]);

        let empty = Value::Object(indexmap::indexmap! {
            "id".to_string() => Value::from(""),
            "name".to_string() => Value::from("n"),
        });
        let err = bind(&reg, widget, &empty).unwrap_err();
        assert!(err.message.contains("cannot be empty"));
    }
}
