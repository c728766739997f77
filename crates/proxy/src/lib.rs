//! Proxy service, MCP tool bridge, and stdio process runner (spec §4.7).
//!
//! Three independent pieces share this crate because all three sit
//! outside the core request/response pipeline proper, forwarding or
//! re-exposing operations rather than implementing them:
//!
//! - [`service`] turns a set of operations into a `server::Service` that
//!   forwards every call to an upstream endpoint through a `client::Pipeline`.
//! - [`mcp`] turns a set of services into tools callable over the MCP
//!   JSON-RPC 2.0 stdio protocol.
//! - [`stdio_bridge`] spawns and forwards bytes to/from a child process,
//!   the transport a `stdio`-flavored MCP tool server actually runs over.

pub mod config;
mod error;
mod mcp;
mod service;
mod stdio_bridge;

pub use config::{load as load_proxy_config, ProxyConfig};
pub use error::ProxyError;
pub use mcp::McpServer;
pub use service::build_proxy_service;
pub use stdio_bridge::{run as run_stdio_bridge, shutdown as shutdown_child};
