//! HTTP message types (spec §3 "HTTP message"): an immutable request/response
//! pair used by the client and server pipelines, plus "modifiable" builder
//! methods interceptors use to mutate a message in place before it's sent or
//! after it's received.

use http::{Method, StatusCode, Uri};

use crate::data_stream::DataStream;
use crate::headers::Headers;

/// An outbound or inbound HTTP request.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: Headers,
    pub body: DataStream,
}

impl HttpRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri, headers: Headers::new(), body: DataStream::Empty }
    }

    pub fn with_body(mut self, body: DataStream) -> Self {
        self.body = body;
        self
    }

    /// Interceptors call this to mutate headers without rebuilding the
    /// request (spec §4.1 `modifyBeforeTransmit`).
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.set_header(name, value);
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.add_header(name, value);
    }
}

/// An HTTP response as received by the client, or produced by the server.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: Headers,
    pub body: DataStream,
}

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: Headers::new(), body: DataStream::Empty }
    }

    pub fn with_body(mut self, body: DataStream) -> Self {
        self.body = body;
        self
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.set_header(name, value);
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.add_header(name, value);
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn request_header_mutation_is_idempotent() {
        let mut req = HttpRequest::new(Method::GET, Uri::from_static("https://example.test/"));
        req.set_header("x-amz-target", "Widget.Get");
        req.set_header("x-amz-target", "Widget.Get");
        assert_eq!(req.headers.all_values("x-amz-target"), &["Widget.Get".to_string()]);
    }

    #[test]
    fn response_carries_body() {
        let resp = HttpResponse::new(StatusCode::OK).with_body(DataStream::Bytes(Bytes::from_static(b"{}")));
        assert!(resp.is_success());
        assert!(resp.body.is_replayable());
    }
}
