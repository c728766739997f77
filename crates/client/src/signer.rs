use crate::context::Context;
use crate::error::CallError;
use crate::identity::Identity;
use transport::HttpRequest;

/// Signs a transport-level request in place, given the identity resolved
/// for the call's chosen auth scheme (spec §4.4 step 7). Implementations
/// MUST NOT reorder headers in a way that would invalidate a signature
/// computed over them — the pipeline only ever calls `sign` once per
/// attempt, after `modify_before_signing` has already run.
#[async_trait::async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, request: &mut HttpRequest, identity: &Identity, context: &Context) -> Result<(), CallError>;
}

/// A `Bearer <token>` signer for schemes whose identity is a plain string
/// token (the common case for an internal service-to-service call, or an
/// MCP-adjacent proxy forwarding a caller-supplied credential).
#[derive(Default)]
pub struct BearerTokenSigner;

#[async_trait::async_trait]
impl Signer for BearerTokenSigner {
    async fn sign(&self, request: &mut HttpRequest, identity: &Identity, _context: &Context) -> Result<(), CallError> {
        let token = identity
            .downcast::<String>()
            .ok_or_else(|| CallError::Signing("bearer signer requires a String identity".to_string()))?;
        request.set_header("authorization", &format!("Bearer {token}"));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http::Method;
    use schema::{AuthSchemeId, ShapeId};

    #[tokio::test]
    async fn bearer_signer_sets_the_authorization_header() {
        let mut req = HttpRequest::new(Method::POST, http::Uri::from_static("https://example.test"));
        let identity = Identity::new(AuthSchemeId(ShapeId::new("ex", "Bearer")), "abc123".to_string());
        BearerTokenSigner.sign(&mut req, &identity, &Context::new()).await.unwrap();
        assert_eq!(req.headers.first_value("authorization"), Some("Bearer abc123"));
    }
}
