use std::sync::Arc;
use std::time::Duration;

use document::Value;
use fxhash::FxHashMap;
use schema::{AuthSchemeId, OperationSchema, ProtocolKind, Registry};

use crate::auth::AuthSchemeResolver;
use crate::context::{well_known, Context};
use crate::endpoint::EndpointResolver;
use crate::error::CallError;
use crate::identity::IdentityResolverChain;
use crate::interceptor::Interceptor;
use crate::protocol;
use crate::signer::Signer;
use crate::transport::Transport;

/// The interceptor-driven client call pipeline (spec §4.4): executes one
/// API call through the strict, observable sequence of hooks and steps.
/// One `Pipeline` is shared across every call a client makes; it owns no
/// per-call mutable state — that all lives in the [`Context`] created
/// fresh for each [`Pipeline::call`].
pub struct Pipeline {
    pub registry: Arc<Registry>,
    pub endpoint_resolver: Arc<dyn EndpointResolver>,
    pub auth_scheme_resolver: Arc<dyn AuthSchemeResolver>,
    pub identity_resolvers: IdentityResolverChain,
    pub signers: FxHashMap<AuthSchemeId, Arc<dyn Signer>>,
    pub interceptors: Vec<Arc<dyn Interceptor>>,
    pub transport: Arc<dyn Transport>,
    pub retry: Arc<retry::TokenBucket>,
}

impl Pipeline {
    /// Executes `operation` over `protocol` with the given `input` and
    /// request-scoped `context` (spec §4.4). Retries re-enter at step 7
    /// (signing) with a refreshed retry token and computed backoff delay,
    /// per §4.4 step 11; each re-entry bumps `RETRY_ATTEMPT` (spec §5).
    pub async fn call(
        &self,
        operation: &OperationSchema,
        protocol: ProtocolKind,
        input: Value,
        context: Context,
    ) -> Result<Value, CallError> {
        for interceptor in &self.interceptors {
            interceptor.read_before_execution(&context).await?;
        }

        let scope = format!("{}.{}", operation.service.name(), operation.id.name());
        let (mut token, mut delay) = self.retry.acquire_initial_token(&scope);

        loop {
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            context.insert(well_known::RETRY_ATTEMPT, token.attempt());

            match self.attempt(operation, protocol, &input, &context).await {
                Ok(output) => {
                    self.retry.record_success(token);
                    return Ok(output);
                }
                Err(err) => {
                    let Some(retry_info) = err.retry_info().filter(|info| info.is_retryable) else {
                        return Err(err);
                    };
                    let (next_token, next_delay) =
                        self.retry.refresh_retry_token(token, &retry_info, retry_info.retry_after)?;
                    tracing::debug!(scope = %scope, attempt = next_token.attempt(), "retrying after failure: {err}");
                    token = next_token;
                    delay = next_delay;
                }
            }
        }
    }

    async fn attempt(
        &self,
        operation: &OperationSchema,
        protocol: ProtocolKind,
        input: &Value,
        context: &Context,
    ) -> Result<Value, CallError> {
        let endpoint = self.endpoint_resolver.resolve(operation, context, input).await?;

        let auth_options = self.auth_scheme_resolver.resolve(operation, context);
        let mut chosen: Option<(AuthSchemeId, Arc<dyn Signer>)> = None;
        for option in &auth_options {
            if let Some(signer) = self.signers.get(&option.scheme) {
                chosen = Some((option.scheme.clone(), signer.clone()));
                break;
            }
        }
        if !auth_options.is_empty() && chosen.is_none() {
            return Err(CallError::AuthSchemeUnavailable { operation: operation.id.clone() });
        }

        let signing = match chosen {
            Some((scheme, signer)) => Some((signer, self.identity_resolvers.resolve(&scheme, context).await?)),
            None => None,
        };

        let mut input = input.clone();
        for interceptor in &self.interceptors {
            interceptor.modify_before_serialization(&mut input, context).await?;
        }
        for interceptor in &self.interceptors {
            interceptor.read_before_serialization(&input, context).await?;
        }

        let mut request = protocol::build_request(&self.registry, operation, protocol, &endpoint, &input)?;

        for interceptor in &self.interceptors {
            interceptor.modify_before_signing(&mut request, context).await?;
        }
        if let Some((signer, identity)) = &signing {
            signer.sign(&mut request, identity, context).await?;
        }

        for interceptor in &self.interceptors {
            interceptor.modify_before_transmit(&mut request, context).await?;
        }
        for interceptor in &self.interceptors {
            interceptor.read_before_transmit(&request, context).await?;
        }

        let attempt_timeout = context.get(well_known::API_CALL_ATTEMPT_TIMEOUT);
        let mut response = self.transport.send(request, attempt_timeout).await?;

        for interceptor in &self.interceptors {
            interceptor.read_after_transmit(&response, context).await?;
        }
        for interceptor in &self.interceptors {
            interceptor.modify_before_deserialization(&mut response, context).await?;
        }

        let output = protocol::parse_response(&self.registry, operation, protocol, response).await?;

        for interceptor in &self.interceptors {
            interceptor.read_after_deserialization(&output, context).await?;
        }

        Ok(output)
    }
}
