//! Transport-level building blocks (spec §3, §4.3, §6): the HTTP message
//! types the client and server pipelines exchange, the `DataStream` body
//! abstraction, a case-insensitive header multimap, line-delimited stdio
//! framing for the MCP bridge, and the `EventFrame` contract that the
//! `eventstream` crate implements concretely.

mod data_stream;
mod event_frame;
mod headers;
mod message;
pub mod stdio;

pub use data_stream::{ByteStream, DataStream};
pub use event_frame::{EventFrame, OpaqueFrame};
pub use headers::Headers;
pub use message::{HttpRequest, HttpResponse};
