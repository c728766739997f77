use crate::context::Context;
use crate::error::CallError;
use schema::AuthSchemeId;
use std::sync::Arc;

/// An opaque resolved identity: whatever a [`Signer`](crate::signer::Signer)
/// needs to produce a signature (credentials, a bearer token, a JWT).
/// Stored as an untyped payload since the concrete shape is scheme-specific
/// and the pipeline itself never inspects it — only the matching signer
/// does.
#[derive(Clone)]
pub struct Identity {
    scheme: AuthSchemeId,
    payload: Arc<dyn std::any::Any + Send + Sync>,
}

impl Identity {
    pub fn new<T: Send + Sync + 'static>(scheme: AuthSchemeId, payload: T) -> Self {
        Identity { scheme, payload: Arc::new(payload) }
    }

    pub fn scheme(&self) -> &AuthSchemeId {
        &self.scheme
    }

    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

/// One step of a [`IdentityResolverChain`]: resolves the identity for a
/// single auth scheme, or reports [`CallError::IdentityNotFound`] so the
/// chain falls through to the next resolver (spec §4.4 step 4).
#[async_trait::async_trait]
pub trait IdentityResolver: Send + Sync {
    fn scheme(&self) -> &AuthSchemeId;
    async fn resolve(&self, context: &Context) -> Result<Identity, CallError>;
}

/// Tries resolvers in order for a requested scheme; on
/// [`CallError::IdentityNotFound`] it falls through to the next matching
/// resolver, on any other failure it surfaces immediately (spec §4.4 step
/// 4, §8 scenario 6).
#[derive(Default)]
pub struct IdentityResolverChain {
    resolvers: Vec<Arc<dyn IdentityResolver>>,
}

impl IdentityResolverChain {
    pub fn new(resolvers: Vec<Arc<dyn IdentityResolver>>) -> Self {
        IdentityResolverChain { resolvers }
    }

    pub async fn resolve(&self, scheme: &AuthSchemeId, context: &Context) -> Result<Identity, CallError> {
        for resolver in self.resolvers.iter().filter(|r| r.scheme() == scheme) {
            match resolver.resolve(context).await {
                Ok(identity) => return Ok(identity),
                Err(CallError::IdentityNotFound { .. }) => continue,
                Err(other) => return Err(other),
            }
        }
        Err(CallError::IdentityNotFound { scheme: scheme.clone() })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use schema::ShapeId;

    struct Absent(AuthSchemeId);
    #[async_trait::async_trait]
    impl IdentityResolver for Absent {
        fn scheme(&self) -> &AuthSchemeId {
            &self.0
        }
        async fn resolve(&self, _context: &Context) -> Result<Identity, CallError> {
            Err(CallError::IdentityNotFound { scheme: self.0.clone() })
        }
    }

    struct Present(AuthSchemeId);
    #[async_trait::async_trait]
    impl IdentityResolver for Present {
        fn scheme(&self) -> &AuthSchemeId {
            &self.0
        }
        async fn resolve(&self, _context: &Context) -> Result<Identity, CallError> {
            Ok(Identity::new(self.0.clone(), "token".to_string()))
        }
    }

    #[tokio::test]
    async fn falls_through_to_the_next_resolver_on_not_found() {
        let scheme = AuthSchemeId(ShapeId::new("ex", "Scheme"));
        let chain = IdentityResolverChain::new(vec![
            Arc::new(Absent(scheme.clone())),
            Arc::new(Present(scheme.clone())),
        ]);
        let identity = chain.resolve(&scheme, &Context::new()).await.unwrap();
        assert_eq!(identity.downcast::<String>().unwrap(), "token");
    }

    #[tokio::test]
    async fn surfaces_not_found_when_the_whole_chain_is_exhausted() {
        let scheme = AuthSchemeId(ShapeId::new("ex", "Scheme"));
        let chain = IdentityResolverChain::new(vec![Arc::new(Absent(scheme.clone()))]);
        let err = chain.resolve(&scheme, &Context::new()).await.unwrap_err();
        assert!(matches!(err, CallError::IdentityNotFound { .. }));
    }
}
