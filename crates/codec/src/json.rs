//! Multi-dialect JSON codec (spec §4.2, §6): one dialect for `restJson1`
//! (honors `@jsonName`, ISO-8601 timestamps by default), one for
//! `awsJson1_0`/`awsJson1_1` (ignores `@jsonName`, epoch-seconds
//! timestamps). Dialect behavior is parameterized entirely through
//! [`document::Settings`] so the same encode/decode pair serves both, per
//! spec §8 scenario 4.

use document::{Settings, TimestampFormat, Value};
use schema::{Registry, Scalar, SchemaRef, ShapeKind};
use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use std::fmt;

use crate::error::{Result, SerializationException};

pub fn encode(registry: &Registry, schema: SchemaRef, value: &Value, settings: &Settings) -> Result<Vec<u8>> {
    let json = to_json(registry, schema, value, settings);
    if settings.pretty_print {
        serde_json::to_vec_pretty(&json)
    } else {
        serde_json::to_vec(&json)
    }
    .map_err(|e| SerializationException::new(registry.id(schema).clone(), format!("json encode: {e}")))
}

pub fn decode(registry: &Registry, schema: SchemaRef, bytes: &[u8], settings: &Settings) -> Result<Value> {
    let json = parse_rejecting_duplicates(bytes)
        .map_err(|e| SerializationException::new(registry.id(schema).clone(), format!("json decode: {e}")))?;
    from_json(registry, schema, &json, settings)
}

fn member_wire_name(registry: &Registry, member: &schema::Member, settings: &Settings) -> String {
    if settings.use_json_name {
        if let Some(name) = registry.get_trait(registry.member_target(member), registry.well_known().json_name) {
            return name.clone();
        }
    }
    member.name.clone()
}

fn to_json(registry: &Registry, schema: SchemaRef, value: &Value, settings: &Settings) -> serde_json::Value {
    if matches!(value, Value::Null) {
        return serde_json::Value::Null;
    }

    match registry.kind(schema) {
        ShapeKind::Scalar(Scalar::Timestamp) => {
            let ts = match value.as_timestamp() {
                Some(ts) => ts,
                None => return serde_json::Value::Null,
            };
            format_timestamp(ts, settings.timestamp_format)
        }
        ShapeKind::Blob if settings.base64_blobs => match value.as_bytes() {
            Some(b) => {
                use base64::Engine;
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            None => serde_json::Value::Null,
        },
        ShapeKind::Structure | ShapeKind::Union => {
            let fields = match value.as_object() {
                Some(f) => f,
                None => return serde_json::Value::Null,
            };
            let mut map = serde_json::Map::new();
            for member in registry.members(schema) {
                if let Some(v) = fields.get(&member.name) {
                    let target = registry.member_target(member);
                    let wire_name = member_wire_name(registry, member, settings);
                    map.insert(wire_name, to_json(registry, target, v, settings));
                }
            }
            serde_json::Value::Object(map)
        }
        ShapeKind::List => {
            let items = match value.as_array() {
                Some(i) => i,
                None => return serde_json::Value::Null,
            };
            let target = registry.members(schema).first().map(|m| registry.member_target(m));
            serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| match target {
                        Some(t) => to_json(registry, t, item, settings),
                        None => generic_to_json(item, settings),
                    })
                    .collect(),
            )
        }
        ShapeKind::Map => {
            let fields = match value.as_object() {
                Some(f) => f,
                None => return serde_json::Value::Null,
            };
            let target = registry.member_by_name(schema, "value").map(|m| registry.member_target(m));
            let mut map = serde_json::Map::new();
            for (k, v) in fields.iter() {
                map.insert(
                    k.clone(),
                    match target {
                        Some(t) => to_json(registry, t, v, settings),
                        None => generic_to_json(v, settings),
                    },
                );
            }
            serde_json::Value::Object(map)
        }
        _ => generic_to_json(value, settings),
    }
}

fn generic_to_json(value: &Value, settings: &Settings) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::PosInt(n) => serde_json::Value::from(*n),
        Value::NegInt(n) => serde_json::Value::from(*n),
        Value::Float(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => {
            use base64::Engine;
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        Value::Timestamp(t) => format_timestamp(*t, settings.timestamp_format),
        Value::Array(a) => serde_json::Value::Array(a.iter().map(|v| generic_to_json(v, settings)).collect()),
        Value::Object(m) => serde_json::Value::Object(
            m.iter().map(|(k, v)| (k.clone(), generic_to_json(v, settings))).collect(),
        ),
    }
}

fn format_timestamp(ts: chrono::DateTime<chrono::Utc>, format: TimestampFormat) -> serde_json::Value {
    match format {
        TimestampFormat::EpochSeconds => {
            let seconds = ts.timestamp() as f64 + ts.timestamp_subsec_nanos() as f64 / 1e9;
            serde_json::Number::from_f64(seconds)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)
        }
        TimestampFormat::DateTime => serde_json::Value::String(ts.to_rfc3339()),
        TimestampFormat::HttpDate => serde_json::Value::String(ts.to_rfc2822()),
    }
}

fn parse_timestamp(json: &serde_json::Value, format: TimestampFormat) -> Option<chrono::DateTime<chrono::Utc>> {
    match format {
        TimestampFormat::EpochSeconds => {
            let seconds = json.as_f64()?;
            chrono::DateTime::from_timestamp(seconds.trunc() as i64, ((seconds.fract()) * 1e9).round() as u32)
        }
        TimestampFormat::DateTime => chrono::DateTime::parse_from_rfc3339(json.as_str()?)
            .ok()
            .map(|dt| dt.with_timezone(&chrono::Utc)),
        TimestampFormat::HttpDate => chrono::DateTime::parse_from_rfc2822(json.as_str()?)
            .ok()
            .map(|dt| dt.with_timezone(&chrono::Utc)),
    }
}

fn from_json(registry: &Registry, schema: SchemaRef, json: &serde_json::Value, settings: &Settings) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }

    match registry.kind(schema) {
        ShapeKind::Scalar(Scalar::Timestamp) => Ok(Value::Timestamp(
            parse_timestamp(json, settings.timestamp_format)
                .ok_or_else(|| err(registry, schema, "malformed timestamp"))?,
        )),
        ShapeKind::Blob if settings.base64_blobs => {
            use base64::Engine;
            let s = json.as_str().ok_or_else(|| err(registry, schema, "expected base64 string"))?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(s)
                .map_err(|e| err(registry, schema, &format!("invalid base64: {e}")))?;
            Ok(Value::Bytes(bytes))
        }
        ShapeKind::Structure | ShapeKind::Union => {
            let obj = json.as_object().ok_or_else(|| err(registry, schema, "expected object"))?;
            let mut out = indexmap::IndexMap::new();
            for member in registry.members(schema) {
                let wire_name = member_wire_name(registry, member, settings);
                if let Some(v) = obj.get(&wire_name).or_else(|| obj.get(&member.name)) {
                    let target = registry.member_target(member);
                    out.insert(member.name.clone(), from_json(registry, target, v, settings)?);
                }
            }
            Ok(Value::Object(out))
        }
        ShapeKind::List => {
            let arr = json.as_array().ok_or_else(|| err(registry, schema, "expected array"))?;
            let target = registry.members(schema).first().map(|m| registry.member_target(m));
            let mut out = Vec::with_capacity(arr.len());
            for item in arr {
                out.push(match target {
                    Some(t) => from_json(registry, t, item, settings)?,
                    None => generic_from_json(item, settings),
                });
            }
            Ok(Value::Array(out))
        }
        ShapeKind::Map => {
            let obj = json.as_object().ok_or_else(|| err(registry, schema, "expected object"))?;
            let target = registry.member_by_name(schema, "value").map(|m| registry.member_target(m));
            let mut out = indexmap::IndexMap::new();
            for (k, v) in obj.iter() {
                out.insert(
                    k.clone(),
                    match target {
                        Some(t) => from_json(registry, t, v, settings)?,
                        None => generic_from_json(v, settings),
                    },
                );
            }
            Ok(Value::Object(out))
        }
        _ => Ok(generic_from_json(json, settings)),
    }
}

fn generic_from_json(json: &serde_json::Value, settings: &Settings) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Value::PosInt(u)
            } else if let Some(i) = n.as_i64() {
                Value::NegInt(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(a) => Value::Array(a.iter().map(|v| generic_from_json(v, settings)).collect()),
        serde_json::Value::Object(m) => {
            Value::Object(m.iter().map(|(k, v)| (k.clone(), generic_from_json(v, settings))).collect())
        }
    }
}

fn err(registry: &Registry, schema: SchemaRef, message: &str) -> SerializationException {
    SerializationException::new(registry.id(schema).clone(), message.to_string())
}

/// Parses JSON text, rejecting input with duplicate object keys at any
/// nesting level (spec §4.2: "Duplicate keys in input are rejected").
/// `serde_json::Value`'s own `Deserialize` impl silently keeps the last
/// occurrence, so this drives a small recursive visitor instead.
fn parse_rejecting_duplicates(bytes: &[u8]) -> std::result::Result<serde_json::Value, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value = NoDupValue::deserialize(&mut de)?;
    de.end()?;
    Ok(value.0)
}

struct NoDupValue(serde_json::Value);

impl<'de> Deserialize<'de> for NoDupValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct V;

        impl<'de> Visitor<'de> for V {
            type Value = NoDupValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON value")
            }

            fn visit_bool<E>(self, v: bool) -> std::result::Result<Self::Value, E> {
                Ok(NoDupValue(serde_json::Value::Bool(v)))
            }
            fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E> {
                Ok(NoDupValue(serde_json::Value::from(v)))
            }
            fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E> {
                Ok(NoDupValue(serde_json::Value::from(v)))
            }
            fn visit_f64<E>(self, v: f64) -> std::result::Result<Self::Value, E> {
                Ok(NoDupValue(
                    serde_json::Number::from_f64(v).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
                ))
            }
            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E> {
                Ok(NoDupValue(serde_json::Value::String(v.to_string())))
            }
            fn visit_string<E>(self, v: String) -> std::result::Result<Self::Value, E> {
                Ok(NoDupValue(serde_json::Value::String(v)))
            }
            fn visit_unit<E>(self) -> std::result::Result<Self::Value, E> {
                Ok(NoDupValue(serde_json::Value::Null))
            }
            fn visit_none<E>(self) -> std::result::Result<Self::Value, E> {
                Ok(NoDupValue(serde_json::Value::Null))
            }
            fn visit_some<D>(self, d: D) -> std::result::Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                NoDupValue::deserialize(d)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut out = Vec::new();
                while let Some(NoDupValue(v)) = seq.next_element()? {
                    out.push(v);
                }
                Ok(NoDupValue(serde_json::Value::Array(out)))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut out = serde_json::Map::new();
                while let Some((key, NoDupValue(value))) = map.next_entry::<String, NoDupValue>()? {
                    if out.contains_key(&key) {
                        return Err(serde::de::Error::custom(format!("duplicate key '{key}'")));
                    }
                    out.insert(key, value);
                }
                Ok(NoDupValue(serde_json::Value::Object(out)))
            }
        }

        deserializer.deserialize_any(V)
    }
}
