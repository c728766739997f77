//! CORS response headers (spec §4.5 "CORS", §8 scenario 2): applied only
//! when the service schema carries the `cors` trait and the request has an
//! `Origin` header.

use schema::CorsConfig;
use transport::HttpResponse;

/// Appends `Access-Control-Allow-*` headers to `response` if the service
/// carries the `cors` trait (already extracted into `cors` by the caller)
/// and the request carried an `Origin` header. `Access-Control-Allow-Origin`
/// reflects the request's origin when the configured value is `*` or
/// matches it case-insensitively in a comma-separated allow-list;
/// otherwise CORS headers are omitted entirely (the request simply isn't
/// from an allowed origin).
pub fn apply_cors(cors: &CorsConfig, request_origin: Option<&str>, response: &mut HttpResponse) {
    let Some(origin) = request_origin else { return };
    if !origin_allowed(&cors.origin, origin) {
        return;
    }

    response.set_header("access-control-allow-origin", origin);
    response.set_header("access-control-allow-methods", "GET, POST, PUT, DELETE, PATCH, OPTIONS");
    response.set_header("access-control-allow-headers", "*");
    response.set_header("access-control-max-age", "600");
}

fn origin_allowed(configured: &str, request_origin: &str) -> bool {
    if configured == "*" {
        return true;
    }
    configured
        .split(',')
        .any(|candidate| candidate.trim().eq_ignore_ascii_case(request_origin))
}
