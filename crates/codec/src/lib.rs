//! The serde kernel (spec §4.2): a schema-driven serializer/deserializer
//! contract plus three wire codecs — RpcV2 CBOR, multi-dialect JSON, and
//! HTTP binding — all operating over the dynamic [`document::Value`] tree
//! so a single `SerializableStruct` implementation round-trips through any
//! of them.

mod cbor;
mod error;
mod http_binding;
mod json;
mod redact;
mod traits;

pub use crate::cbor as rpcv2_cbor;
pub use crate::json as json_dialect;
pub use error::{Result, SerializationException};
pub use http_binding::{bind as http_bind, is_bound as http_is_bound, unbind as http_unbind, BoundRequest};
pub use redact::redact;
pub use traits::SerializableStruct;
