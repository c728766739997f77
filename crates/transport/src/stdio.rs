//! Line-delimited framing for the stdio transport (spec §4.7 "MCP bridge"):
//! each JSON-RPC message is exactly one line of UTF-8 text terminated by
//! `\n`. Used to decode a child process's stdout and encode requests onto
//! its stdin.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug, thiserror::Error)]
pub enum LineCodecError {
    #[error("line exceeded maximum length of {max} bytes")]
    TooLong { max: usize },
    #[error("line was not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Frames a byte stream into newline-terminated lines, each expected to
/// hold one JSON-RPC message.
pub struct LineCodec {
    max_line_len: usize,
}

impl LineCodec {
    pub fn new(max_line_len: usize) -> Self {
        Self { max_line_len }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        // 16 MiB: generous for a tool-call payload, a backstop against a
        // misbehaving child process never emitting a newline.
        Self::new(16 * 1024 * 1024)
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = LineCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(newline_at) = src.iter().position(|b| *b == b'\n') else {
            if src.len() > self.max_line_len {
                return Err(LineCodecError::TooLong { max: self.max_line_len });
            }
            return Ok(None);
        };

        if newline_at > self.max_line_len {
            return Err(LineCodecError::TooLong { max: self.max_line_len });
        }

        let mut line = src.split_to(newline_at + 1);
        line.truncate(line.len() - 1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        let text = std::str::from_utf8(&line)?.to_string();
        Ok(Some(text))
    }
}

impl Encoder<String> for LineCodec {
    type Error = LineCodecError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 1);
        dst.put(item.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

/// Splits an already-buffered chunk into complete lines plus any trailing
/// partial line, for callers reading raw bytes rather than driving a
/// [`tokio_util::codec`] framed stream.
pub fn split_lines(buf: &mut BytesMut) -> Vec<Bytes> {
    let mut lines = Vec::new();
    while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
        let mut line = buf.split_to(pos + 1);
        line.truncate(line.len() - 1);
        lines.push(line.freeze());
    }
    lines
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_one_line_at_a_time() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"{\"a\":1}\n{\"b\":2"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("{\"a\":1}".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"}\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("{\"b\":2}".to_string()));
    }

    #[test]
    fn strips_trailing_carriage_return() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"hello\r\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn rejects_overlong_line() {
        let mut codec = LineCodec::new(4);
        let mut buf = BytesMut::from(&b"toolong\n"[..]);
        assert!(matches!(codec.decode(&mut buf), Err(LineCodecError::TooLong { max: 4 })));
    }

    #[test]
    fn encode_appends_newline() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::new();
        codec.encode("hi".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"hi\n");
    }
}
