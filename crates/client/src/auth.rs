use crate::context::Context;
use schema::AuthSchemeId;

/// One entry in an [`AuthSchemeResolver`]'s priority-ordered output (spec
/// §4.4 step 3).
#[derive(Debug, Clone)]
pub struct AuthSchemeOption {
    pub scheme: AuthSchemeId,
}

/// Returns a priority-ordered list of scheme options for an operation; the
/// pipeline picks the first one an [`crate::identity::IdentityResolverChain`]
/// and a configured signer both support (spec §4.4 step 3, GLOSSARY "Auth
/// scheme").
pub trait AuthSchemeResolver: Send + Sync {
    fn resolve(&self, operation: &schema::OperationSchema, context: &Context) -> Vec<AuthSchemeOption>;
}

/// Resolves to an operation's modeled `auth_schemes`, in the order the
/// operation schema lists them — the common case when a service doesn't
/// need request-content-dependent scheme selection.
#[derive(Default)]
pub struct ModeledAuthSchemeResolver;

impl AuthSchemeResolver for ModeledAuthSchemeResolver {
    fn resolve(&self, operation: &schema::OperationSchema, _context: &Context) -> Vec<AuthSchemeOption> {
        operation.auth_schemes.iter().map(|scheme| AuthSchemeOption { scheme: scheme.clone() }).collect()
    }
}
