//! Request inspection helpers.
//!
//! # Responsibilities
//! - Determine the request ID (client-supplied or UUID v4)
//! - Extract routing-relevant information (host, client address)
//!
//! # Design Decisions
//! - Request ID assigned as early as possible for tracing
//! - HTTP/2 requests carry the host in the URI authority, not a Host header

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderName, Request};

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Return the incoming request ID or generate a new one.
pub fn request_id(req: &Request<Body>) -> String {
    req.headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Host as sent by the client (Host header, else URI authority), port included.
pub fn host(req: &Request<Body>) -> String {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_string()))
        .unwrap_or_default()
}

/// Peer address recorded by the listener.
pub fn client_addr(req: &Request<Body>) -> Option<SocketAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}
