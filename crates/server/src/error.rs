use schema::ShapeId;

/// The server pipeline's error taxonomy (spec §7): every fallible step on
/// the receive path returns one of these directly, per SPEC_FULL §7's
/// single-flat-enum convention (the same one `client::CallError` follows).
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The protocol resolver exhausted every candidate service without a
    /// match (spec §4.5 "Routing").
    #[error("no operation matched request {method} {uri}")]
    UnknownOperation { method: String, uri: String },

    /// A request claimed a protocol it didn't actually speak correctly —
    /// wrong content-type, missing required protocol header, malformed URI
    /// shape (spec §4.5 "Routing").
    #[error("malformed request: {0}")]
    MalformedHttp(String),

    #[error(transparent)]
    Serialization(#[from] codec::SerializationException),

    /// A handler raised a modeled exception; carries enough to serialize it
    /// back using the operation's error registry (spec §4.5, §7).
    /// `status_override` is the error shape's `@httpError` code, if any —
    /// resolved by the caller from the shape's traits, since this enum
    /// doesn't carry a registry reference of its own.
    #[error("modeled error '{shape_id}'")]
    Modeled {
        shape_id: ShapeId,
        fault: schema::ErrorFault,
        value: document::Value,
        status_override: Option<u16>,
    },

    #[error("internal server error: {0}")]
    Internal(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ServerError {
    /// Maps this error's taxonomy kind to an HTTP status, per §4.5's
    /// "Status code mapping": `@httpError` takes precedence, else
    /// client-side modeled errors map to 400, server-side to 500.
    pub fn status(&self) -> http::StatusCode {
        match self {
            ServerError::UnknownOperation { .. } => http::StatusCode::NOT_FOUND,
            ServerError::MalformedHttp(_) => http::StatusCode::BAD_REQUEST,
            ServerError::Serialization(_) => http::StatusCode::BAD_REQUEST,
            ServerError::Modeled { fault, status_override, .. } => match status_override {
                Some(code) => http::StatusCode::from_u16(*code).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR),
                None => match fault {
                    schema::ErrorFault::Client => http::StatusCode::BAD_REQUEST,
                    schema::ErrorFault::Server => http::StatusCode::INTERNAL_SERVER_ERROR,
                },
            },
            ServerError::Internal(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Cancelled => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn modeled_client_fault_maps_to_400() {
        let err = ServerError::Modeled {
            shape_id: ShapeId::new("ex", "BadInput"),
            fault: schema::ErrorFault::Client,
            value: document::Value::Null,
            status_override: None,
        };
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn modeled_server_fault_maps_to_500() {
        let err = ServerError::Modeled {
            shape_id: ShapeId::new("ex", "Overloaded"),
            fault: schema::ErrorFault::Server,
            value: document::Value::Null,
            status_override: None,
        };
        assert_eq!(err.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn http_error_trait_overrides_the_fault_default() {
        // A client-fault error with an explicit `@httpError(429)` should
        // report 429, not the generic 400 a client fault otherwise maps to.
        let err = ServerError::Modeled {
            shape_id: ShapeId::new("ex", "ThrottlingException"),
            fault: schema::ErrorFault::Client,
            value: document::Value::Null,
            status_override: Some(429),
        };
        assert_eq!(err.status(), http::StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn unknown_operation_maps_to_404() {
        let err = ServerError::UnknownOperation { method: "POST".into(), uri: "/x".into() };
        assert_eq!(err.status(), http::StatusCode::NOT_FOUND);
    }
}
