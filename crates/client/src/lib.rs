//! Interceptor-driven client call pipeline (spec §4.4): endpoint
//! resolution, auth scheme selection, identity resolution, protocol-specific
//! serialization, signing, transport, deserialization, and retry, plus the
//! pagination and waiter layers built on top of one call.

mod auth;
mod context;
mod endpoint;
mod error;
mod identity;
mod interceptor;
mod pagination;
mod pipeline;
mod protocol;
mod signer;
mod transport;
mod waiter;

pub use auth::{AuthSchemeOption, AuthSchemeResolver, ModeledAuthSchemeResolver};
pub use context::{well_known, Context, ContextKey};
pub use endpoint::{Endpoint, EndpointResolver, StaticEndpointResolver};
pub use error::CallError;
pub use identity::{Identity, IdentityResolver, IdentityResolverChain};
pub use interceptor::Interceptor;
pub use pagination::{PaginationConfig, Paginator};
pub use pipeline::Pipeline;
pub use protocol::{build_request, parse_response};
pub use signer::{BearerTokenSigner, Signer};
pub use transport::{ReqwestTransport, Transport};
pub use waiter::{AcceptorRule, AcceptorVerdict, Waiter, WaiterConfig, WaiterFailureException};
