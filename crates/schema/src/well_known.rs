//! Trait keys for the handful of traits the core itself interprets
//! (sensitivity, HTTP binding, modeled-error status codes). Model-specific
//! traits are interned ad hoc by whatever collaborator loads the model;
//! these are the ones the runtime core's own serde/server/client logic
//! branches on, so they're named once here instead of by string at each
//! call site.

use crate::traits::{TraitInterner, TraitKey};

#[derive(Clone)]
pub struct WellKnown {
    pub sensitive: TraitKey<()>,
    pub http_label: TraitKey<()>,
    pub http_query: TraitKey<String>,
    pub http_header: TraitKey<String>,
    pub http_prefix_headers: TraitKey<String>,
    pub http_payload: TraitKey<()>,
    pub http_error: TraitKey<u16>,
    pub json_name: TraitKey<String>,
    pub cors: TraitKey<CorsConfig>,
    pub error_fault: TraitKey<ErrorFault>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub origin: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFault {
    Client,
    Server,
}

impl WellKnown {
    pub(crate) fn build(interner: &TraitInterner) -> Self {
        WellKnown {
            sensitive: interner.intern("sensitive"),
            http_label: interner.intern("httpLabel"),
            http_query: interner.intern("httpQuery"),
            http_header: interner.intern("httpHeader"),
            http_prefix_headers: interner.intern("httpPrefixHeaders"),
            http_payload: interner.intern("httpPayload"),
            http_error: interner.intern("httpError"),
            json_name: interner.intern("jsonName"),
            cors: interner.intern("cors"),
            error_fault: interner.intern("errorFault"),
        }
    }
}

/// Builds the well-known trait keys interned against `interner`. Prefer
/// [`crate::Registry::well_known`], which caches the result per registry —
/// every [`Registry`](crate::Registry) owns its own [`TraitInterner`], so a
/// single process-wide cache would hand out indices from the wrong table.
pub fn well_known(interner: &TraitInterner) -> WellKnown {
    WellKnown::build(interner)
}
