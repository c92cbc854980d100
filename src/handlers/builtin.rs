//! Health, metrics and welcome responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::observability::metrics;

pub const WELCOME_PAGE: &str = r#"<html>
<head><title>Welcome to edge-gateway</title></head>
<body>
<h1>Welcome to edge-gateway</h1>
<p>If you see this page, the gateway is running successfully.</p>
<p>Configure it by editing <code>gateway.toml</code> or adding files to <code>conf.d/</code>.</p>
</body>
</html>
"#;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub fn health() -> Response {
    (StatusCode::OK, "OK").into_response()
}

pub fn welcome() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))],
        WELCOME_PAGE,
    )
        .into_response()
}

pub fn prometheus() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static(PROMETHEUS_CONTENT_TYPE))],
        metrics::render(),
    )
        .into_response()
}
