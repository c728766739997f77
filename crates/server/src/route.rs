use std::sync::Arc;

use crate::service::Service;

/// Associates a path prefix (or a custom matcher) with a non-empty list of
/// candidate services (spec §4.5 "Routing"). The protocol resolver is
/// handed the candidates of whichever route matched a request's path.
pub struct Route {
    matcher: Matcher,
    pub services: Vec<Arc<dyn Service>>,
}

enum Matcher {
    Prefix(String),
    Custom(Box<dyn Fn(&http::Uri) -> bool + Send + Sync>),
}

impl Route {
    /// A route is non-empty by construction: panics if `services` is
    /// empty, since an empty candidate list can never successfully
    /// resolve and almost certainly indicates a configuration bug (spec
    /// §4.5: "a non-empty list of candidate services").
    pub fn prefix(prefix: impl Into<String>, services: Vec<Arc<dyn Service>>) -> Self {
        assert!(!services.is_empty(), "a route must have at least one candidate service");
        Route { matcher: Matcher::Prefix(prefix.into()), services }
    }

    pub fn custom(
        matcher: impl Fn(&http::Uri) -> bool + Send + Sync + 'static,
        services: Vec<Arc<dyn Service>>,
    ) -> Self {
        assert!(!services.is_empty(), "a route must have at least one candidate service");
        Route { matcher: Matcher::Custom(Box::new(matcher)), services }
    }

    pub fn matches(&self, uri: &http::Uri) -> bool {
        match &self.matcher {
            Matcher::Prefix(prefix) => uri.path().starts_with(prefix.as_str()),
            Matcher::Custom(f) => f(uri),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::service::{OperationHandler, Invocation, StaticService};
    use schema::{ErrorRegistry, Registry, ShapeId, ShapeKind};

    fn dummy_service() -> Arc<dyn Service> {
        let mut registry = Registry::new();
        let unit = registry
            .register(ShapeId::new("ex", "Unit"), ShapeKind::Structure, vec![], schema::TraitMap::new())
            .unwrap();
        registry.freeze().unwrap();
        let op = schema::OperationSchema {
            id: ShapeId::new("ex", "Ping"),
            service: ShapeId::new("ex", "Svc"),
            input: unit,
            output: unit,
            errors: ErrorRegistry::new(),
            http: None,
            auth_schemes: vec![],
            streaming_input: false,
            streaming_output: false,
            additional_input: None,
            proxy_of: None,
        };
        let handler = Arc::new(OperationHandler { schema: op, invocation: Invocation::Sync(Box::new(|i, _| Ok(i))) });
        Arc::new(StaticService::new(ShapeId::new("ex", "Svc"), Arc::new(registry), vec![handler]))
    }

    #[test]
    #[should_panic]
    fn a_route_cannot_have_zero_candidates() {
        Route::prefix("/service", vec![]);
    }

    #[test]
    fn prefix_route_matches_by_path_prefix() {
        let route = Route::prefix("/service", vec![dummy_service()]);
        assert!(route.matches(&http::Uri::from_static("/service/Svc/operation/Ping")));
        assert!(!route.matches(&http::Uri::from_static("/other")));
    }
}
