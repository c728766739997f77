//! The dynamic, codec-agnostic value tree described in spec §3 (Document)
//! and §4.3, generalized per `doc::{AsNode, Node, Fields, Field}` so the
//! same redaction, equality, and serialization code paths work whether the
//! underlying representation is our own [`Value`] or a borrowed
//! `serde_json::Value`.

mod document;
mod equal;
mod json_impl;
mod node;
mod settings;
mod value;

pub use document::{Document, TypedSource};
pub use equal::equal;
pub use node::{AsNode, Field, Fields, Node};
pub use settings::{Settings, TimestampFormat};
pub use value::Value;
