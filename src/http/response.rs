//! Fixed responses.
//!
//! # Responsibilities
//! - Produce the non-leaking error bodies clients see
//! - Map backend errors to appropriate HTTP status codes
//!
//! # Design Decisions
//! - Bodies never carry internal detail; that goes to the logs
//! - Backend timeouts result in 504 Gateway Timeout

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

pub const NOT_FOUND_BODY: &str = "404 - Not Found";
pub const FORBIDDEN_BODY: &str = "403 - Forbidden";
pub const TOO_MANY_REQUESTS_BODY: &str = "429 - Too Many Requests";
pub const BAD_GATEWAY_BODY: &str = "502 - Bad Gateway";
pub const GATEWAY_TIMEOUT_BODY: &str = "504 - Gateway Timeout";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Plain-text response with a fixed body.
pub fn text(status: StatusCode, body: &'static str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN))],
        body,
    )
        .into_response()
}

pub fn not_found() -> Response {
    text(StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

pub fn forbidden() -> Response {
    text(StatusCode::FORBIDDEN, FORBIDDEN_BODY)
}

pub fn bad_gateway() -> Response {
    text(StatusCode::BAD_GATEWAY, BAD_GATEWAY_BODY)
}

pub fn gateway_timeout() -> Response {
    text(StatusCode::GATEWAY_TIMEOUT, GATEWAY_TIMEOUT_BODY)
}

/// 429 with a `Retry-After` in whole seconds.
pub fn too_many_requests(retry_after_secs: u64) -> Response {
    let mut response = text(StatusCode::TOO_MANY_REQUESTS, TOO_MANY_REQUESTS_BODY);
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}

/// 301 to the given location. Falls back to 404 if it is not a valid header value.
pub fn moved_permanently(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => Response::builder()
            .status(StatusCode::MOVED_PERMANENTLY)
            .header(header::LOCATION, value)
            .body(Body::empty())
            .unwrap_or_else(|_| not_found()),
        Err(_) => not_found(),
    }
}
