//! The server pipeline (spec §4.5): protocol-based routing, operation
//! invocation, CORS, and asynchronous orchestration with backpressure.
//!
//! Transport bytes arrive through `http` (an `axum` catch-all router);
//! `resolver` picks `(service, operation, protocol)`; `orchestrator` bounds
//! how many requests are in flight and runs each one through
//! deserialize → invoke → serialize; `cors` and `error` apply the
//! response-shaping rules the spec calls out separately.

mod cors;
mod error;
pub mod http;
mod orchestrator;
mod resolver;
mod route;
mod service;

pub use cors::apply_cors;
pub use error::ServerError;
pub use orchestrator::{Job, Orchestrator};
pub use resolver::{resolve, Resolved};
pub use route::Route;
pub use service::{Invocation, OperationHandler, RequestContext, Service, StaticService};
