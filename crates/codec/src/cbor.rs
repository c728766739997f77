//! RpcV2 CBOR codec (spec §4.2, §6): major-type encoding per RFC 8949 with
//! the spec's concrete decisions — definite-length strings and maps,
//! epoch-seconds-float timestamps (CBOR tag 1), big-integer/decimal via
//! tags 2/3/4, and sparse list slots preserved as CBOR `null`. Wraps
//! `ciborium`, the ecosystem's serde-integrated CBOR crate, rather than
//! hand-rolling major-type bit packing — `ciborium::Value` already models
//! RFC 8949 faithfully; this module only has to get the *shape* mapping
//! right (schema-guided, since big-integer/decimal and timestamp are
//! schema-level scalar kinds, not distinguishable from a bare
//! [`document::Value`] alone).

use ciborium::value::{Integer, Value as Cbor};
use document::Value;
use schema::{Registry, Scalar, SchemaRef, ShapeKind};

use crate::error::{Result, SerializationException};

/// Encodes `value` to RpcV2 CBOR bytes, guided by `schema` so that members
/// typed as `BigInteger`/`BigDecimal`/`Timestamp` get their mandated tags
/// even though the generic document tree stores them as plain strings or
/// floats.
pub fn encode(registry: &Registry, schema: SchemaRef, value: &Value) -> Result<Vec<u8>> {
    let cbor = to_cbor(registry, schema, value)?;
    let mut buf = Vec::new();
    ciborium::into_writer(&cbor, &mut buf).map_err(|e| {
        SerializationException::new(registry.id(schema).clone(), format!("cbor encode: {e}"))
    })?;
    Ok(buf)
}

pub fn decode(registry: &Registry, schema: SchemaRef, bytes: &[u8]) -> Result<Value> {
    let cbor: Cbor = ciborium::from_reader(bytes).map_err(|e| {
        SerializationException::new(registry.id(schema).clone(), format!("cbor decode: {e}"))
    })?;
    from_cbor(registry, schema, &cbor)
}

fn to_cbor(registry: &Registry, schema: SchemaRef, value: &Value) -> Result<Cbor> {
    let kind = registry.kind(schema);

    if matches!(value, Value::Null) {
        return Ok(Cbor::Null);
    }

    match kind {
        ShapeKind::Scalar(Scalar::Timestamp) => {
            let ts = value
                .as_timestamp()
                .ok_or_else(|| err(registry, schema, "expected timestamp"))?;
            let seconds = ts.timestamp() as f64 + ts.timestamp_subsec_nanos() as f64 / 1e9;
            Ok(Cbor::Tag(1, Box::new(Cbor::Float(seconds))))
        }
        ShapeKind::Scalar(Scalar::BigInteger) => {
            let text = value
                .as_str()
                .ok_or_else(|| err(registry, schema, "expected big integer string"))?;
            Ok(encode_bigint(text))
        }
        ShapeKind::Scalar(Scalar::BigDecimal) => {
            let text = value
                .as_str()
                .ok_or_else(|| err(registry, schema, "expected big decimal string"))?;
            encode_bigdecimal(text).ok_or_else(|| err(registry, schema, "malformed big decimal"))
        }
        ShapeKind::Structure | ShapeKind::Union => {
            let fields = value
                .as_object()
                .ok_or_else(|| err(registry, schema, "expected structure"))?;
            let mut entries = Vec::with_capacity(fields.len());
            for member in registry.members(schema) {
                if let Some(v) = fields.get(&member.name) {
                    let target = registry.member_target(member);
                    entries.push((Cbor::Text(member.name.clone()), to_cbor(registry, target, v)?));
                }
            }
            Ok(Cbor::Map(entries))
        }
        ShapeKind::List => {
            let items = value
                .as_array()
                .ok_or_else(|| err(registry, schema, "expected list"))?;
            let target = registry
                .members(schema)
                .first()
                .map(|m| registry.member_target(m));
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(match target {
                    Some(t) => to_cbor(registry, t, item)?,
                    None => generic_to_cbor(item),
                });
            }
            Ok(Cbor::Array(out))
        }
        ShapeKind::Map => {
            let fields = value
                .as_object()
                .ok_or_else(|| err(registry, schema, "expected map"))?;
            let target = registry
                .member_by_name(schema, "value")
                .map(|m| registry.member_target(m));
            let mut entries = Vec::with_capacity(fields.len());
            for (k, v) in fields.iter() {
                let cv = match target {
                    Some(t) => to_cbor(registry, t, v)?,
                    None => generic_to_cbor(v),
                };
                entries.push((Cbor::Text(k.clone()), cv));
            }
            Ok(Cbor::Map(entries))
        }
        ShapeKind::Enum | ShapeKind::IntEnum | ShapeKind::Blob | ShapeKind::Scalar(_) => {
            Ok(generic_to_cbor(value))
        }
    }
}

/// Schema-agnostic fallback for document values (e.g. inside a `Document`
/// member, or a list/map whose element member wasn't registered).
fn generic_to_cbor(value: &Value) -> Cbor {
    match value {
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::PosInt(n) => Cbor::Integer((*n).into()),
        Value::NegInt(n) => Cbor::Integer((*n).into()),
        Value::Float(n) => Cbor::Float(*n),
        Value::String(s) => Cbor::Text(s.clone()),
        Value::Bytes(b) => Cbor::Bytes(b.clone()),
        Value::Timestamp(t) => Cbor::Tag(1, Box::new(Cbor::Float(t.timestamp() as f64))),
        Value::Array(a) => Cbor::Array(a.iter().map(generic_to_cbor).collect()),
        Value::Object(m) => Cbor::Map(
            m.iter()
                .map(|(k, v)| (Cbor::Text(k.clone()), generic_to_cbor(v)))
                .collect(),
        ),
    }
}

fn from_cbor(registry: &Registry, schema: SchemaRef, cbor: &Cbor) -> Result<Value> {
    if matches!(cbor, Cbor::Null) {
        return Ok(Value::Null);
    }

    match registry.kind(schema) {
        ShapeKind::Scalar(Scalar::Timestamp) => match cbor {
            Cbor::Tag(1, inner) => {
                let seconds = as_f64(inner).ok_or_else(|| err(registry, schema, "bad timestamp"))?;
                let secs = seconds.trunc() as i64;
                let nanos = ((seconds.fract()) * 1e9).round() as u32;
                Ok(Value::Timestamp(
                    chrono::DateTime::from_timestamp(secs, nanos)
                        .ok_or_else(|| err(registry, schema, "out-of-range timestamp"))?,
                ))
            }
            other => {
                let seconds = as_f64(other).ok_or_else(|| err(registry, schema, "bad timestamp"))?;
                Ok(Value::Timestamp(
                    chrono::DateTime::from_timestamp(seconds as i64, 0)
                        .ok_or_else(|| err(registry, schema, "out-of-range timestamp"))?,
                ))
            }
        },
        ShapeKind::Scalar(Scalar::BigInteger) => Ok(Value::String(decode_bigint(cbor)
            .ok_or_else(|| err(registry, schema, "bad big integer"))?)),
        ShapeKind::Scalar(Scalar::BigDecimal) => Ok(Value::String(
            decode_bigdecimal(cbor).ok_or_else(|| err(registry, schema, "bad big decimal"))?,
        )),
        ShapeKind::Structure | ShapeKind::Union => {
            let Cbor::Map(entries) = cbor else {
                return Err(err(registry, schema, "expected map"));
            };
            let mut out = indexmap::IndexMap::new();
            for (k, v) in entries {
                let Cbor::Text(name) = k else { continue };
                if let Some(member) = registry.member_by_name(schema, name) {
                    let target = registry.member_target(member);
                    out.insert(name.clone(), from_cbor(registry, target, v)?);
                } else {
                    out.insert(name.clone(), generic_from_cbor(v));
                }
            }
            Ok(Value::Object(out))
        }
        ShapeKind::List => {
            let Cbor::Array(items) = cbor else {
                return Err(err(registry, schema, "expected array"));
            };
            let target = registry
                .members(schema)
                .first()
                .map(|m| registry.member_target(m));
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(match target {
                    Some(t) => from_cbor(registry, t, item)?,
                    None => generic_from_cbor(item),
                });
            }
            Ok(Value::Array(out))
        }
        ShapeKind::Map => {
            let Cbor::Map(entries) = cbor else {
                return Err(err(registry, schema, "expected map"));
            };
            let target = registry
                .member_by_name(schema, "value")
                .map(|m| registry.member_target(m));
            let mut out = indexmap::IndexMap::new();
            for (k, v) in entries {
                let Cbor::Text(name) = k else { continue };
                out.insert(
                    name.clone(),
                    match target {
                        Some(t) => from_cbor(registry, t, v)?,
                        None => generic_from_cbor(v),
                    },
                );
            }
            Ok(Value::Object(out))
        }
        ShapeKind::Enum | ShapeKind::IntEnum | ShapeKind::Blob | ShapeKind::Scalar(_) => {
            Ok(generic_from_cbor(cbor))
        }
    }
}

fn generic_from_cbor(cbor: &Cbor) -> Value {
    match cbor {
        Cbor::Null => Value::Null,
        Cbor::Bool(b) => Value::Bool(*b),
        Cbor::Integer(i) => {
            let n: i128 = (*i).into();
            if n >= 0 {
                Value::PosInt(n as u64)
            } else {
                Value::NegInt(n as i64)
            }
        }
        Cbor::Float(f) => Value::Float(*f),
        Cbor::Text(s) => Value::String(s.clone()),
        Cbor::Bytes(b) => Value::Bytes(b.clone()),
        Cbor::Tag(1, inner) => as_f64(inner)
            .and_then(|s| chrono::DateTime::from_timestamp(s as i64, 0))
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        Cbor::Tag(_, inner) => generic_from_cbor(inner),
        Cbor::Array(a) => Value::Array(a.iter().map(generic_from_cbor).collect()),
        Cbor::Map(m) => Value::Object(
            m.iter()
                .map(|(k, v)| {
                    let key = match k {
                        Cbor::Text(s) => s.clone(),
                        other => format!("{other:?}"),
                    };
                    (key, generic_from_cbor(v))
                })
                .collect(),
        ),
        _ => Value::Null,
    }
}

fn as_f64(cbor: &Cbor) -> Option<f64> {
    match cbor {
        Cbor::Float(f) => Some(*f),
        Cbor::Integer(i) => {
            let n: i128 = (*i).into();
            Some(n as f64)
        }
        _ => None,
    }
}

fn err(registry: &Registry, schema: SchemaRef, message: &str) -> SerializationException {
    SerializationException::new(registry.id(schema).clone(), message.to_string())
}

/// Encodes a decimal digit string (optionally `-`-prefixed) as a CBOR
/// bignum: tag 2 for non-negative, tag 3 for negative (value `-1-n`), per
/// RFC 8949 §3.4.3.
fn encode_bigint(text: &str) -> Cbor {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = decimal_str_to_be_bytes(digits);
    if negative {
        let n_minus_one = be_bytes_sub_one(&magnitude);
        Cbor::Tag(3, Box::new(Cbor::Bytes(n_minus_one)))
    } else {
        Cbor::Tag(2, Box::new(Cbor::Bytes(magnitude)))
    }
}

fn decode_bigint(cbor: &Cbor) -> Option<String> {
    match cbor {
        Cbor::Tag(2, inner) => {
            let Cbor::Bytes(b) = inner.as_ref() else {
                return None;
            };
            Some(be_bytes_to_decimal_str(b))
        }
        Cbor::Tag(3, inner) => {
            let Cbor::Bytes(b) = inner.as_ref() else {
                return None;
            };
            let plus_one = be_bytes_add_one(b);
            Some(format!("-{}", be_bytes_to_decimal_str(&plus_one)))
        }
        Cbor::Integer(i) => Some(format!("{}", i128::from(*i))),
        _ => None,
    }
}

/// Encodes a decimal string like `"123.4500"` as CBOR tag 4
/// `[exponent, mantissa]` per RFC 8949 §3.4.4.
fn encode_bigdecimal(text: &str) -> Option<Cbor> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, text),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, f),
        None => (rest, ""),
    };
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let exponent = -(frac_part.len() as i64);
    let mut digits = format!("{int_part}{frac_part}");
    if digits.is_empty() {
        digits = "0".to_string();
    }
    let mantissa_cbor = if negative {
        encode_bigint(&format!("-{digits}"))
    } else {
        match digits.parse::<u64>() {
            Ok(n) => Cbor::Integer(n.into()),
            Err(_) => encode_bigint(&digits),
        }
    };
    Some(Cbor::Tag(
        4,
        Box::new(Cbor::Array(vec![Cbor::Integer(exponent.into()), mantissa_cbor])),
    ))
}

fn decode_bigdecimal(cbor: &Cbor) -> Option<String> {
    let Cbor::Tag(4, inner) = cbor else { return None };
    let Cbor::Array(parts) = inner.as_ref() else {
        return None;
    };
    let [exp, mantissa] = parts.as_slice() else {
        return None;
    };
    let Cbor::Integer(exp) = exp else { return None };
    let exponent: i128 = (*exp).into();

    let mantissa_str = match mantissa {
        Cbor::Integer(i) => format!("{}", i128::from(*i)),
        other => decode_bigint(other)?,
    };
    let (negative, digits) = match mantissa_str.strip_prefix('-') {
        Some(d) => (true, d.to_string()),
        None => (false, mantissa_str),
    };

    let scaled = if exponent >= 0 {
        format!("{digits}{}", "0".repeat(exponent as usize))
    } else {
        let point = exponent.unsigned_abs() as usize;
        if point >= digits.len() {
            format!("0.{}{digits}", "0".repeat(point - digits.len()))
        } else {
            let split = digits.len() - point;
            format!("{}.{}", &digits[..split], &digits[split..])
        }
    };
    Some(if negative {
        format!("-{scaled}")
    } else {
        scaled
    })
}

fn decimal_str_to_be_bytes(digits: &str) -> Vec<u8> {
    let mut acc: Vec<u8> = digits
        .bytes()
        .map(|b| b - b'0')
        .skip_while(|&d| d == 0)
        .collect();
    if acc.is_empty() {
        return vec![0];
    }
    let mut out_bits = Vec::new();
    while !acc.is_empty() {
        let mut remainder = 0u32;
        let mut next = Vec::with_capacity(acc.len());
        for &d in &acc {
            let cur = remainder * 10 + d as u32;
            let q = (cur / 256) as u8;
            remainder = cur % 256;
            if !next.is_empty() || q != 0 {
                next.push(q);
            }
        }
        out_bits.push(remainder as u8);
        acc = next;
    }
    out_bits.reverse();
    if out_bits.is_empty() {
        vec![0]
    } else {
        out_bits
    }
}

fn be_bytes_to_decimal_str(bytes: &[u8]) -> String {
    let mut digits = vec![0u8];
    for &byte in bytes {
        let mut carry = byte as u32;
        for d in digits.iter_mut() {
            let v = *d as u32 * 256 + carry;
            *d = (v % 10) as u8;
            carry = v / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }
    while digits.len() > 1 && *digits.last().unwrap() == 0 {
        digits.pop();
    }
    digits
        .iter()
        .rev()
        .map(|d| (d + b'0') as char)
        .collect()
}

fn be_bytes_sub_one(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    for b in out.iter_mut().rev() {
        if *b == 0 {
            *b = 255;
        } else {
            *b -= 1;
            break;
        }
    }
    out
}

fn be_bytes_add_one(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    for b in out.iter_mut().rev() {
        if *b == 255 {
            *b = 0;
        } else {
            *b += 1;
            return out;
        }
    }
    out.insert(0, 1);
    out
}
