//! Axum glue: wires the [`crate::orchestrator::Orchestrator`] behind a
//! catch-all `axum::Router` so the transport-level concerns (connection
//! handling, HTTP/1.1 vs HTTP/2) are the teacher's `axum` dependency's
//! job, and everything past "bytes arrived" is ours (spec §4.5).

use axum::body::Body;
use axum::extract::State;
use axum::response::Response;
use http_body_util::BodyExt;

use crate::orchestrator::Orchestrator;

/// Builds a router that forwards every request to `orchestrator`. The
/// orchestrator (via the protocol resolver) is what actually decides
/// whether a given method/path/header combination names a real operation;
/// this router doesn't pre-filter by path so a single server process can
/// host RpcV2 CBOR, AWS JSON, and restJson1 services side by side.
pub fn build_router(orchestrator: Orchestrator) -> axum::Router {
    axum::Router::new()
        .fallback(dispatch)
        .with_state(orchestrator)
}

async fn dispatch(State(orchestrator): State<Orchestrator>, request: axum::extract::Request) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return Response::builder()
                .status(http::StatusCode::BAD_REQUEST)
                .body(Body::from(format!("failed to read request body: {e}")))
                .expect("a status + string body is always a valid response");
        }
    };

    let mut headers = transport::Headers::new();
    for (name, value) in parts.headers.iter() {
        if let Ok(value) = value.to_str() {
            headers.add_header(name.as_str(), value);
        }
    }

    let mut request = transport::HttpRequest::new(parts.method, parts.uri);
    request.headers = headers;
    request.body = transport::DataStream::Bytes(bytes);

    let response = orchestrator.submit(request).await;

    let mut builder = Response::builder().status(response.status);
    for (name, values) in response.headers.iter() {
        for value in values {
            builder = builder.header(name, value);
        }
    }
    let body_bytes = response.body.collect().await.unwrap_or_default();
    builder
        .body(Body::from(body_bytes))
        .expect("a status + collected headers + byte body is always a valid response")
}
