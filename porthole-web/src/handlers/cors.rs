//! Permissive CORS for the loopback origins.
//!
//! The viewer runs on a different origin (a notebook server, an app
//! shell), so every response — errors included — carries the permissive
//! header set. `insert` overwrites, which keeps each header present
//! exactly once no matter which code path built the response.

use axum::http::{HeaderValue, header};
use axum::response::Response;

pub const ALLOW_METHODS: &str = "GET, OPTIONS, HEAD";
pub const ALLOW_HEADERS: &str = "Range";
pub const EXPOSE_HEADERS: &str = "Content-Range, Content-Length";

/// Response-mapping middleware attaching the CORS header set.
pub async fn apply(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSE_HEADERS),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response
}
