//! Reverse-proxy terminal.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the route backend
//! - Strip hop-by-hop headers, set X-Forwarded-*
//! - Bound the backend call with a timeout and map failures to 502/504
//! - Abort a relayed body once the backend stops sending for that long
//!
//! # Design Decisions
//! - The client's Host header is forwarded unchanged
//! - Backend path and request path are joined with exactly one slash
//! - Response bodies are streamed, never buffered here

use std::io;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Uri, Version};
use axum::response::Response;
use futures_util::StreamExt;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::config::schema::TimeoutConfig;
use crate::routing::table::RouteRule;
use crate::security::headers::{set_forwarded, strip_hop_by_hop};

/// Error forwarding a request to a backend.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("cannot build upstream URI '{uri}'")]
    InvalidUri { uri: String },

    #[error("backend request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),
}

impl ProxyError {
    /// Label for the backend error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::InvalidUri { .. } => "uri",
            ProxyError::Upstream(e) if e.is_connect() => "connect",
            ProxyError::Upstream(_) => "upstream",
            ProxyError::Timeout(_) => "timeout",
        }
    }
}

/// Shared, pooled HTTP client for all proxy routes.
#[derive(Clone)]
pub struct ProxyClient {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl ProxyClient {
    /// Create a new client from the timeout settings.
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            timeout: Duration::from_secs(timeouts.backend_secs),
        }
    }

    /// Forward `req` to the route backend and relay its response.
    pub async fn forward(
        &self,
        route: &RouteRule,
        mut req: Request<Body>,
        client_ip: std::net::IpAddr,
        tls: bool,
        host: &str,
    ) -> Result<Response, ProxyError> {
        let uri = upstream_uri(&route.backend, req.uri())?;
        *req.uri_mut() = uri;
        *req.version_mut() = Version::HTTP_11;

        let headers = req.headers_mut();
        strip_hop_by_hop(headers);
        set_forwarded(headers, client_ip, tls, host);
        if !headers.contains_key(header::HOST) {
            if let Ok(value) = HeaderValue::from_str(host) {
                headers.insert(header::HOST, value);
            }
        }

        let response = tokio::time::timeout(self.timeout, self.client.request(req))
            .await
            .map_err(|_| ProxyError::Timeout(self.timeout))??;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, idle_bounded(Body::new(body), self.timeout)))
    }
}

/// Relay `body`, failing with `TimedOut` once no chunk arrives within `idle`.
pub fn idle_bounded(body: Body, idle: Duration) -> Body {
    let state = Some(body.into_data_stream());
    let stream = futures_util::stream::unfold(state, move |state| async move {
        let mut inner = state?;
        match tokio::time::timeout(idle, inner.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(inner))),
            Ok(Some(Err(e))) => Some((Err(io::Error::other(e)), None)),
            Ok(None) => None,
            Err(_) => Some((
                Err(io::Error::new(io::ErrorKind::TimedOut, "backend body stalled")),
                None,
            )),
        }
    });
    Body::from_stream(stream)
}

/// Join two paths with exactly one slash between them.
pub fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// Build the backend URI for an incoming request URI.
pub fn upstream_uri(backend: &Url, incoming: &Uri) -> Result<Uri, ProxyError> {
    let authority = &backend[url::Position::BeforeHost..url::Position::AfterPort];
    let path = join_paths(backend.path(), incoming.path());

    let query = match (backend.query().filter(|q| !q.is_empty()), incoming.query().filter(|q| !q.is_empty())) {
        (Some(a), Some(b)) => format!("?{}&{}", a, b),
        (Some(q), None) | (None, Some(q)) => format!("?{}", q),
        (None, None) => String::new(),
    };

    let uri = format!("{}://{}{}{}", backend.scheme(), authority, path, query);
    uri.parse::<Uri>()
        .map_err(|_| ProxyError::InvalidUri { uri })
}
