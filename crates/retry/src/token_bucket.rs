use std::sync::Mutex;
use std::time::Duration;

use exponential_backoff::Backoff;
use fxhash::FxHashMap;

use crate::info::RetryInfo;

#[derive(Debug, thiserror::Error)]
pub enum TokenAcquisitionFailedException {
    #[error("retry budget exhausted for scope {scope:?} ({available} capacity remaining, {cost} required)")]
    InsufficientCapacity { scope: String, available: u32, cost: u32 },
    #[error("attempt limit ({max_attempts}) reached for scope {scope:?}")]
    AttemptsExhausted { scope: String, max_attempts: u32 },
}

/// A permit to make one attempt within a scope. Produced by
/// [`TokenBucket::acquire_initial_token`] or
/// [`TokenBucket::refresh_retry_token`]; consumed by exactly one of
/// `refresh_retry_token` (on a subsequent failure) or `record_success`.
///
/// `record_success` takes the token by value, so a caller cannot release
/// the same token's withdrawn capacity twice — the monotonic-attempt and
/// idempotent-success invariants (spec §9) hold by construction rather than
/// by a runtime check.
#[derive(Debug, Clone)]
pub struct RetryToken {
    scope: String,
    attempt: u32,
    withdrawn: u32,
}

impl RetryToken {
    /// The 1-based attempt number this token is about to make.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TokenBucketConfig {
    /// Capacity a scope starts with, and the ceiling `record_success` tops
    /// it back up to.
    pub max_capacity: u32,
    /// Capacity a transient-error retry withdraws.
    pub retry_cost: u32,
    /// Capacity a throttle retry withdraws. Throttles are assumed to
    /// reflect real backpressure, so they cost more than a transient
    /// network blip (spec §4.6 "throttles consume more budget").
    pub throttle_retry_cost: u32,
    /// Capacity `record_success` returns on top of the token's own
    /// withdrawal, letting a recovering scope's budget climb back up.
    pub success_increment: u32,
    /// Total attempts (including the first) a scope's call may make.
    pub max_attempts: u32,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self { max_capacity: 500, retry_cost: 5, throttle_retry_cost: 10, success_increment: 1, max_attempts: 3 }
    }
}

/// Per-scope retry capacity accounting plus backoff scheduling.
///
/// One `TokenBucket` is shared across every call a client makes; scopes
/// (typically `"{service}.{operation}"`) are created lazily on first use
/// and never removed, mirroring a long-lived process's call mix settling
/// into a stable set of scopes.
pub struct TokenBucket {
    config: TokenBucketConfig,
    capacity: Mutex<FxHashMap<String, u32>>,
    backoff: Backoff,
}

impl std::fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket").field("config", &self.config).finish()
    }
}

impl TokenBucket {
    pub fn new(config: TokenBucketConfig) -> Self {
        let backoff = Backoff::new(config.max_attempts, Duration::from_millis(50), Some(Duration::from_secs(20)));
        Self { config, capacity: Mutex::new(FxHashMap::default()), backoff }
    }

    /// The first attempt for a call is always free: there's no prior
    /// failure to account for yet, so no capacity is withdrawn and the
    /// delay before making it is zero.
    pub fn acquire_initial_token(&self, scope: &str) -> (RetryToken, Duration) {
        let mut capacity = self.capacity.lock().unwrap();
        capacity.entry(scope.to_string()).or_insert(self.config.max_capacity);
        (RetryToken { scope: scope.to_string(), attempt: 1, withdrawn: 0 }, Duration::ZERO)
    }

    /// Withdraws capacity for a retry following `failure`, and computes how
    /// long to wait before making it. Callers should only invoke this when
    /// `failure.is_retryable`; a non-retryable failure should be surfaced
    /// to the caller directly without consuming the token.
    pub fn refresh_retry_token(
        &self,
        token: RetryToken,
        failure: &RetryInfo,
        suggested_delay: Option<Duration>,
    ) -> Result<(RetryToken, Duration), TokenAcquisitionFailedException> {
        if token.attempt >= self.config.max_attempts {
            tracing::info!(scope = %token.scope, max_attempts = self.config.max_attempts, "giving up after maximum number of retries");
            return Err(TokenAcquisitionFailedException::AttemptsExhausted {
                scope: token.scope,
                max_attempts: self.config.max_attempts,
            });
        }

        let cost = if failure.is_throttle { self.config.throttle_retry_cost } else { self.config.retry_cost };

        let mut capacity = self.capacity.lock().unwrap();
        let available = *capacity.entry(token.scope.clone()).or_insert(self.config.max_capacity);
        if available < cost {
            tracing::warn!(scope = %token.scope, available, cost, "retry budget exhausted for scope");
            return Err(TokenAcquisitionFailedException::InsufficientCapacity {
                scope: token.scope,
                available,
                cost,
            });
        }
        capacity.insert(token.scope.clone(), available - cost);
        drop(capacity);

        let mut delay = self.backoff.next(token.attempt).unwrap_or(Duration::from_secs(20));
        if let Some(suggested) = failure.retry_after.or(suggested_delay) {
            delay = delay.max(suggested);
        }

        let refreshed = RetryToken {
            scope: token.scope,
            attempt: token.attempt + 1,
            withdrawn: token.withdrawn + cost,
        };
        Ok((refreshed, delay))
    }

    /// Releases a successful token's withdrawn capacity, plus a small
    /// top-up, back into its scope's bucket (capped at `max_capacity`).
    pub fn record_success(&self, token: RetryToken) {
        let mut capacity = self.capacity.lock().unwrap();
        let entry = capacity.entry(token.scope).or_insert(self.config.max_capacity);
        *entry = (*entry + token.withdrawn + self.config.success_increment).min(self.config.max_capacity);
    }
}
