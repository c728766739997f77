use std::sync::Arc;
use std::time::Duration;

use document::Value;
use rand::Rng;
use schema::{OperationSchema, ProtocolKind};
use tokio::time::Instant;

use crate::context::Context;
use crate::error::CallError;
use crate::pipeline::Pipeline;

/// What one matching [`AcceptorRule`] decides for the current poll (spec
/// §4.4 "Waiter").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptorVerdict {
    Success,
    Failure,
    /// Matches but doesn't end the wait — present for acceptors that only
    /// exist to normalize the default retry behavior (e.g. "retry faster on
    /// this particular modeled exception").
    Retry,
}

/// A single acceptor: a predicate over the poll's outcome, paired with the
/// verdict it contributes when it matches (spec §4.4, GLOSSARY "Waiter").
/// Acceptors are evaluated in order each poll, but verdicts are *not*
/// first-match-wins — a matching `Failure` always trumps a matching
/// `Success` evaluated in the same step, regardless of declaration order.
pub struct AcceptorRule {
    pub verdict: AcceptorVerdict,
    pub matches: Arc<dyn Fn(Result<&Value, &CallError>) -> bool + Send + Sync>,
}

impl AcceptorRule {
    pub fn new(
        verdict: AcceptorVerdict,
        matches: impl Fn(Result<&Value, &CallError>) -> bool + Send + Sync + 'static,
    ) -> Self {
        AcceptorRule { verdict, matches: Arc::new(matches) }
    }
}

#[derive(Debug)]
pub struct WaiterFailureException {
    pub terminal_state: String,
    pub cause: Option<CallError>,
    pub timed_out: bool,
}

impl std::fmt::Display for WaiterFailureException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "waiter reached terminal state '{}'", self.terminal_state)?;
        if self.timed_out {
            write!(f, " (timed out)")?;
        }
        Ok(())
    }
}

impl std::error::Error for WaiterFailureException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WaiterConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub total_deadline: Duration,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        WaiterConfig {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
            total_deadline: Duration::from_secs(300),
        }
    }
}

/// Poll-until-acceptor engine (spec §4.4 "Waiter"): repeatedly calls one
/// operation until an acceptor declares success or failure, or the total
/// deadline elapses.
pub struct Waiter<'a> {
    pipeline: &'a Pipeline,
    operation: &'a OperationSchema,
    protocol: ProtocolKind,
    acceptors: Vec<AcceptorRule>,
    config: WaiterConfig,
}

impl<'a> Waiter<'a> {
    pub fn new(
        pipeline: &'a Pipeline,
        operation: &'a OperationSchema,
        protocol: ProtocolKind,
        acceptors: Vec<AcceptorRule>,
        config: WaiterConfig,
    ) -> Self {
        Waiter { pipeline, operation, protocol, acceptors, config }
    }

    /// Polls until an acceptor reaches a terminal verdict, or raises
    /// [`WaiterFailureException`] on a timeout or a matching `Failure`
    /// acceptor.
    pub async fn wait(&self, input: Value, context: Context) -> Result<Value, WaiterFailureException> {
        let deadline = Instant::now() + self.config.total_deadline;
        let mut attempt: u32 = 0;

        loop {
            if Instant::now() >= deadline {
                return Err(WaiterFailureException {
                    terminal_state: "deadline-exceeded".to_string(),
                    cause: None,
                    timed_out: true,
                });
            }

            attempt += 1;
            let result = self.pipeline.call(self.operation, self.protocol, input.clone(), context.clone()).await;
            let outcome: Result<&Value, &CallError> = result.as_ref().map_err(|e| e);

            let mut matched_failure = false;
            let mut matched_success = false;
            let mut matched_retry = false;
            for rule in &self.acceptors {
                if (rule.matches)(outcome) {
                    match rule.verdict {
                        AcceptorVerdict::Failure => matched_failure = true,
                        AcceptorVerdict::Success => matched_success = true,
                        AcceptorVerdict::Retry => matched_retry = true,
                    }
                }
            }

            if matched_failure {
                return Err(WaiterFailureException {
                    terminal_state: "failure-acceptor-matched".to_string(),
                    cause: result.err(),
                    timed_out: false,
                });
            }
            if matched_success {
                return result.map_err(|e| WaiterFailureException {
                    terminal_state: "success-acceptor-matched-on-error".to_string(),
                    cause: Some(e),
                    timed_out: false,
                });
            }
            let _ = matched_retry;

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(WaiterFailureException {
                    terminal_state: "deadline-exceeded".to_string(),
                    cause: result.err(),
                    timed_out: true,
                });
            }
            let delay = compute_jittered_delay(attempt, &self.config).min(remaining);
            tokio::time::sleep(delay).await;
        }
    }
}

/// Full-jitter exponential backoff: a uniformly random delay between zero
/// and the doubling-per-attempt ceiling, capped at `max_delay`.
fn compute_jittered_delay(attempt: u32, config: &WaiterConfig) -> Duration {
    let base = config.min_delay.as_secs_f64();
    let ceiling = (base * 2f64.powi(attempt.saturating_sub(1) as i32)).min(config.max_delay.as_secs_f64());
    let jittered = rand::thread_rng().gen_range(0.0..=ceiling.max(base));
    Duration::from_secs_f64(jittered)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::ModeledAuthSchemeResolver;
    use crate::endpoint::StaticEndpointResolver;
    use crate::identity::IdentityResolverChain;
    use crate::transport::Transport;
    use async_trait::async_trait;
    use fxhash::FxHashMap;
    use schema::{ErrorRegistry, Registry, ShapeId, ShapeKind};
    use std::sync::Mutex;
    use transport::{DataStream, HttpRequest, HttpResponse};

    struct ScriptedStatuses {
        statuses: Mutex<Vec<&'static str>>,
        registry: Arc<Registry>,
        output_schema: schema::SchemaRef,
    }

    #[async_trait]
    impl Transport for ScriptedStatuses {
        async fn send(&self, _request: HttpRequest, _timeout: Option<Duration>) -> Result<HttpResponse, CallError> {
            let status = {
                let mut statuses = self.statuses.lock().unwrap();
                if statuses.is_empty() { "BUILDING" } else { statuses.remove(0) }
            };
            let mut map = indexmap::IndexMap::new();
            map.insert("status".to_string(), Value::String(status.to_string()));
            let output = Value::Object(map);
            let bytes = codec::rpcv2_cbor::encode(&self.registry, self.output_schema, &output).unwrap();
            Ok(HttpResponse::new(http::StatusCode::OK).with_body(DataStream::Bytes(bytes.into())))
        }
    }

    fn status_operation(registry: &mut Registry) -> OperationSchema {
        let doc = registry
            .register(ShapeId::new("ex", "Status"), ShapeKind::Scalar(schema::Scalar::Document), vec![], schema::TraitMap::new())
            .unwrap();
        registry.freeze().unwrap();
        OperationSchema {
            id: ShapeId::new("ex", "DescribeThing"),
            service: ShapeId::new("ex", "ThingService"),
            input: doc,
            output: doc,
            errors: ErrorRegistry::new(),
            http: None,
            auth_schemes: vec![],
            streaming_input: false,
            streaming_output: false,
            additional_input: None,
            proxy_of: None,
        }
    }

    fn pipeline_with_statuses(registry: Arc<Registry>, op: &OperationSchema, statuses: Vec<&'static str>) -> Pipeline {
        let transport = Arc::new(ScriptedStatuses {
            statuses: Mutex::new(statuses),
            registry: registry.clone(),
            output_schema: op.output,
        });
        Pipeline {
            registry,
            endpoint_resolver: Arc::new(StaticEndpointResolver::new(http::Uri::from_static("https://example.test"))),
            auth_scheme_resolver: Arc::new(ModeledAuthSchemeResolver),
            identity_resolvers: IdentityResolverChain::new(vec![]),
            signers: FxHashMap::default(),
            interceptors: vec![],
            transport,
            retry: Arc::new(retry::TokenBucket::new(retry::TokenBucketConfig::default())),
        }
    }

    fn done_acceptor() -> AcceptorRule {
        AcceptorRule::new(AcceptorVerdict::Success, |outcome| {
            matches!(outcome, Ok(v) if v.as_object().and_then(|o| o.get("status")).and_then(Value::as_str) == Some("DONE"))
        })
    }

    #[tokio::test]
    async fn succeeds_once_the_success_acceptor_matches() {
        let mut registry = Registry::new();
        let op = status_operation(&mut registry);
        let registry = Arc::new(registry);
        let pipeline = pipeline_with_statuses(
            registry,
            &op,
            vec!["BUILDING", "BUILDING", "BUILDING", "DONE"],
        );

        let waiter = Waiter::new(
            &pipeline,
            &op,
            ProtocolKind::RpcV2Cbor,
            vec![done_acceptor()],
            WaiterConfig { min_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5), total_deadline: Duration::from_secs(5) },
        );

        let result = waiter.wait(Value::Object(indexmap::IndexMap::new()), Context::new()).await.unwrap();
        assert_eq!(result.as_object().unwrap().get("status").unwrap().as_str(), Some("DONE"));
    }

    #[tokio::test]
    async fn times_out_before_the_acceptor_ever_matches() {
        let mut registry = Registry::new();
        let op = status_operation(&mut registry);
        let registry = Arc::new(registry);
        let pipeline = pipeline_with_statuses(
            registry,
            &op,
            vec!["BUILDING", "BUILDING", "BUILDING", "DONE"],
        );

        let waiter = Waiter::new(
            &pipeline,
            &op,
            ProtocolKind::RpcV2Cbor,
            vec![done_acceptor()],
            WaiterConfig { min_delay: Duration::from_millis(50), max_delay: Duration::from_millis(50), total_deadline: Duration::from_millis(10) },
        );

        let err = waiter.wait(Value::Object(indexmap::IndexMap::new()), Context::new()).await.unwrap_err();
        assert!(err.timed_out);
    }

    #[tokio::test]
    async fn a_matching_failure_acceptor_trumps_a_matching_success_acceptor() {
        let mut registry = Registry::new();
        let op = status_operation(&mut registry);
        let registry = Arc::new(registry);
        let pipeline = pipeline_with_statuses(registry, &op, vec!["DONE"]);

        let acceptors = vec![
            done_acceptor(),
            AcceptorRule::new(AcceptorVerdict::Failure, |outcome| {
                matches!(outcome, Ok(v) if v.as_object().and_then(|o| o.get("status")).and_then(Value::as_str) == Some("DONE"))
            }),
        ];
        let waiter = Waiter::new(
            &pipeline,
            &op,
            ProtocolKind::RpcV2Cbor,
            acceptors,
            WaiterConfig { min_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5), total_deadline: Duration::from_secs(5) },
        );

        let err = waiter.wait(Value::Object(indexmap::IndexMap::new()), Context::new()).await.unwrap_err();
        assert_eq!(err.terminal_state, "failure-acceptor-matched");
        assert!(!err.timed_out);
    }
}
