//! The `EventFrame` contract (spec §3): an opaque unit of a streamed
//! response that wraps exactly one decoded message. The concrete binary
//! frame format (AWS event-stream prelude/headers/payload/CRC) lives in the
//! separate `eventstream` crate, which depends on this trait rather than
//! the other way around, so `transport` stays format-agnostic.

use bytes::Bytes;

/// One frame of a streamed response.
///
/// `unwrap` consumes the frame and yields its payload; frames that carry
/// only control information (e.g. a heartbeat) decode to an empty payload
/// rather than erroring, leaving it to the caller to decide whether an
/// empty frame is meaningful.
pub trait EventFrame: Send + 'static {
    fn unwrap(self) -> Bytes;
}

/// A minimal [`EventFrame`] that already holds its decoded payload; used by
/// transports (like stdio) that have no separate framing layer of their
/// own.
#[derive(Debug, Clone)]
pub struct OpaqueFrame(pub Bytes);

impl EventFrame for OpaqueFrame {
    fn unwrap(self) -> Bytes {
        self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn opaque_frame_unwraps_to_its_payload() {
        let frame = OpaqueFrame(Bytes::from_static(b"payload"));
        assert_eq!(frame.unwrap(), Bytes::from_static(b"payload"));
    }
}
