use std::time::Duration;

use crate::error::CallError;
use transport::{DataStream, HttpRequest, HttpResponse};

/// Sends one already-serialized, already-signed request and awaits its
/// response (spec §4.4 step 9). Kept as a trait so tests can swap in a
/// scripted responder without a real socket.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest, attempt_timeout: Option<Duration>) -> Result<HttpResponse, CallError>;
}

/// `reqwest`-backed transport (already in the teacher's dependency set and
/// used by `gazette`/`journal-client` for fragment fetches, per SPEC_FULL
/// §4 grounding) — process-wide, safe for concurrent use (spec §5 "Shared
/// resource policy"): `reqwest::Client` pools connections internally.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        ReqwestTransport::new(reqwest::Client::new())
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest, attempt_timeout: Option<Duration>) -> Result<HttpResponse, CallError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| CallError::Transport(e.to_string()))?;
        let mut builder = self.client.request(method, request.uri.to_string());
        for (name, values) in request.headers.iter() {
            for value in values {
                builder = builder.header(name, value);
            }
        }
        if let Some(timeout) = attempt_timeout {
            builder = builder.timeout(timeout);
        }

        let body = request.body.collect().await.map_err(|e| CallError::Transport(e.to_string()))?;
        if !body.is_empty() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await.map_err(|e| CallError::Transport(e.to_string()))?;
        let status = response.status();
        let mut headers = transport::Headers::new();
        for (name, value) in response.headers().iter() {
            if let Ok(value_str) = value.to_str() {
                headers.add_header(name.as_str(), value_str);
            }
        }
        let bytes = response.bytes().await.map_err(|e| CallError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, headers, body: DataStream::Bytes(bytes) })
    }
}
