use schema::ShapeId;

/// The client pipeline's single error type (spec §7, resolved per
/// SPEC_FULL §7: "the client pipeline wraps failures into a single
/// `client::CallError` enum carrying the taxonomy kind and retry
/// metadata"). Every fallible pipeline step returns this directly rather
/// than a step-specific error wrapped again at a higher layer.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("endpoint resolution failed: {0}")]
    EndpointResolution(String),

    #[error("no supported auth scheme for operation '{operation}'")]
    AuthSchemeUnavailable { operation: ShapeId },

    #[error("identity not found for scheme {scheme:?}")]
    IdentityNotFound { scheme: schema::AuthSchemeId },

    #[error("identity resolution failed: {0}")]
    IdentityResolution(String),

    #[error("interceptor hook '{hook}' failed: {message}")]
    Interceptor { hook: &'static str, message: String },

    #[error(transparent)]
    Serialization(#[from] codec::SerializationException),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("modeled error '{shape_id}'")]
    Modeled { shape_id: ShapeId, value: document::Value },

    #[error(transparent)]
    RetryExhausted(#[from] retry::TokenAcquisitionFailedException),

    #[error("call cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl CallError {
    /// What the retry engine should infer about this failure, if anything
    /// (spec §4.6). Transport errors are treated as transient-retryable;
    /// everything else either isn't a transport-layer failure or already
    /// carries no actionable retry signal.
    pub fn retry_info(&self) -> Option<retry::RetryInfo> {
        match self {
            CallError::Transport(_) => Some(retry::RetryInfo::transient()),
            CallError::Modeled { .. } => None,
            _ => None,
        }
    }
}
