//! AWS event-stream binary frame encode/decode (spec §3 "Event frame", §6
//! "AWS event streams"): each frame carries a prelude (total length, headers
//! length, prelude CRC), a headers section, a payload, and a trailing
//! message CRC over everything preceding it.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::crc32::crc32;

const PRELUDE_LEN: usize = 12; // total_length + headers_length + prelude_crc
const TRAILER_LEN: usize = 4; // message_crc

#[derive(Debug, thiserror::Error)]
pub enum EventStreamError {
    #[error("frame shorter than the minimum prelude+trailer size")]
    Truncated,
    #[error("prelude checksum mismatch")]
    BadPreludeCrc,
    #[error("message checksum mismatch")]
    BadMessageCrc,
    #[error("frame declared length {declared} does not match the {actual} bytes available")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("unknown header value type {0}")]
    UnknownHeaderType(u8),
    #[error("header name was not valid UTF-8")]
    InvalidHeaderName,
    #[error("string header value was not valid UTF-8")]
    InvalidHeaderValue,
}

/// The value of one event-stream header. AWS's binary frame format encodes
/// seven primitive kinds; this covers every kind the spec's three fixed
/// headers (`:message-type`, `:event-type`, `:content-type`) and any
/// modeled event-header member would need.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Bool(bool),
    Byte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    ByteArray(Bytes),
    String(String),
    Timestamp(i64),
    Uuid([u8; 16]),
}

impl HeaderValue {
    fn type_id(&self) -> u8 {
        match self {
            HeaderValue::Bool(true) => 0,
            HeaderValue::Bool(false) => 1,
            HeaderValue::Byte(_) => 2,
            HeaderValue::Int16(_) => 3,
            HeaderValue::Int32(_) => 4,
            HeaderValue::Int64(_) => 5,
            HeaderValue::ByteArray(_) => 6,
            HeaderValue::String(_) => 7,
            HeaderValue::Timestamp(_) => 8,
            HeaderValue::Uuid(_) => 9,
        }
    }

    fn encode(&self, out: &mut BytesMut) {
        out.put_u8(self.type_id());
        match self {
            HeaderValue::Bool(_) => {}
            HeaderValue::Byte(b) => out.put_i8(*b),
            HeaderValue::Int16(v) => out.put_i16(*v),
            HeaderValue::Int32(v) => out.put_i32(*v),
            HeaderValue::Int64(v) => out.put_i64(*v),
            HeaderValue::ByteArray(bytes) => {
                out.put_u16(bytes.len() as u16);
                out.put_slice(bytes);
            }
            HeaderValue::String(s) => {
                out.put_u16(s.len() as u16);
                out.put_slice(s.as_bytes());
            }
            HeaderValue::Timestamp(ms) => out.put_i64(*ms),
            HeaderValue::Uuid(bytes) => out.put_slice(bytes),
        }
    }

    fn decode(type_id: u8, buf: &mut Bytes) -> Result<Self, EventStreamError> {
        Ok(match type_id {
            0 => HeaderValue::Bool(true),
            1 => HeaderValue::Bool(false),
            2 => HeaderValue::Byte(buf.get_i8()),
            3 => HeaderValue::Int16(buf.get_i16()),
            4 => HeaderValue::Int32(buf.get_i32()),
            5 => HeaderValue::Int64(buf.get_i64()),
            6 => {
                let len = buf.get_u16() as usize;
                HeaderValue::ByteArray(buf.copy_to_bytes(len))
            }
            7 => {
                let len = buf.get_u16() as usize;
                let bytes = buf.copy_to_bytes(len);
                HeaderValue::String(String::from_utf8(bytes.to_vec()).map_err(|_| EventStreamError::InvalidHeaderValue)?)
            }
            8 => HeaderValue::Timestamp(buf.get_i64()),
            9 => {
                let mut uuid = [0u8; 16];
                buf.copy_to_slice(&mut uuid);
                HeaderValue::Uuid(uuid)
            }
            other => return Err(EventStreamError::UnknownHeaderType(other)),
        })
    }
}

/// Encodes one event-stream message: the fixed headers plus any extra
/// headers, and the already-serialized payload produced by the inner wire
/// codec (spec §4.2 "a single payload byte sequence is produced by the
/// inner codec").
pub fn encode_message(headers: &[(String, HeaderValue)], payload: &[u8]) -> Bytes {
    let mut header_bytes = BytesMut::new();
    for (name, value) in headers {
        header_bytes.put_u8(name.len() as u8);
        header_bytes.put_slice(name.as_bytes());
        value.encode(&mut header_bytes);
    }

    let total_length = PRELUDE_LEN + header_bytes.len() + payload.len() + TRAILER_LEN;

    let mut prelude = BytesMut::with_capacity(8);
    prelude.put_u32(total_length as u32);
    prelude.put_u32(header_bytes.len() as u32);
    let prelude_crc = crc32(&prelude);

    let mut message = BytesMut::with_capacity(total_length);
    message.put_slice(&prelude);
    message.put_u32(prelude_crc);
    message.put_slice(&header_bytes);
    message.put_slice(payload);

    let message_crc = crc32(&message);
    message.put_u32(message_crc);

    message.freeze()
}

/// Decoded frame: headers in wire order, plus the raw payload bytes. The
/// caller hands the payload to the operation's chosen inner codec.
pub struct DecodedMessage {
    pub headers: Vec<(String, HeaderValue)>,
    pub payload: Bytes,
}

pub fn decode_message(bytes: &[u8]) -> Result<DecodedMessage, EventStreamError> {
    if bytes.len() < PRELUDE_LEN + TRAILER_LEN {
        return Err(EventStreamError::Truncated);
    }

    let mut prelude = Bytes::copy_from_slice(&bytes[..8]);
    let total_length = prelude.get_u32() as usize;
    let headers_length = prelude.get_u32() as usize;
    let prelude_crc = u32::from_be_bytes(bytes[8..12].try_into().unwrap());

    if crc32(&bytes[..8]) != prelude_crc {
        return Err(EventStreamError::BadPreludeCrc);
    }
    if total_length != bytes.len() {
        return Err(EventStreamError::LengthMismatch { declared: total_length, actual: bytes.len() });
    }

    let message_crc = u32::from_be_bytes(bytes[total_length - 4..total_length].try_into().unwrap());
    if crc32(&bytes[..total_length - 4]) != message_crc {
        return Err(EventStreamError::BadMessageCrc);
    }

    let mut cursor = Bytes::copy_from_slice(&bytes[PRELUDE_LEN..total_length - TRAILER_LEN]);
    let mut header_buf = cursor.split_to(headers_length);
    let payload = cursor;

    let mut headers = Vec::new();
    while header_buf.has_remaining() {
        let name_len = header_buf.get_u8() as usize;
        let name_bytes = header_buf.copy_to_bytes(name_len);
        let name = String::from_utf8(name_bytes.to_vec()).map_err(|_| EventStreamError::InvalidHeaderName)?;
        let type_id = header_buf.get_u8();
        let value = HeaderValue::decode(type_id, &mut header_buf)?;
        headers.push((name, value));
    }

    Ok(DecodedMessage { headers, payload })
}
