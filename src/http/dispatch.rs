//! Per-request entry point.
//!
//! # Responsibilities
//! - Load the active snapshot once per request
//! - Answer process-wide endpoints (/metrics, /health, welcome page)
//! - Resolve the virtual host and run the policy chain around the terminal
//!
//! # Design Decisions
//! - Exactly one response per request; every branch returns one
//! - An unmatched host gets a fixed 404 without running any stage
//! - The snapshot `Arc` is held until the response is built, so a reload
//!   in the middle of a request cannot mix tables

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::response::Response;

use crate::handlers::{builtin, GatewayTerminal};
use crate::http::request::{self, X_REQUEST_ID};
use crate::http::response;
use crate::http::state::GatewayState;
use crate::observability::metrics;
use crate::policy::{build_chain, PolicyChain, RequestContext};
use crate::routing::matcher::{resolve, Resolution};

const METRICS_PATH: &str = "/metrics";
const HEALTH_PATH: &str = "/health";

/// Top-level request handler for one listener.
#[derive(Clone)]
pub struct Dispatcher {
    state: GatewayState,
    chain: Arc<PolicyChain>,
    tls: bool,
}

impl Dispatcher {
    /// Create a dispatcher for the plaintext listener.
    pub fn new(state: GatewayState) -> Self {
        let terminal = Box::new(GatewayTerminal::new(state.proxy.clone()));
        let chain = build_chain(&state.settings, state.cache.clone(), terminal);
        Self {
            state,
            chain: Arc::new(chain),
            tls: false,
        }
    }

    /// Same dispatcher, marked as serving a TLS listener.
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Produce the response for one request.
    pub async fn dispatch(&self, req: Request<Body>) -> Response {
        let started = Instant::now();
        let snapshot = self.state.current();
        let request_id = request::request_id(&req);
        let path = req.uri().path();

        let mut response = if path == METRICS_PATH {
            builtin::prometheus()
        } else if snapshot.table.is_empty() {
            builtin::welcome()
        } else if path == HEALTH_PATH {
            builtin::health()
        } else {
            let host = request::host(&req);
            match resolve(&snapshot.table, &host, path) {
                Resolution::Unmatched => {
                    tracing::debug!(request_id = %request_id, host = %host, "No domain matched");
                    response::not_found()
                }
                Resolution::Matched { domain, target } => {
                    let remote = request::client_addr(&req)
                        .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)));
                    let ctx = RequestContext {
                        snapshot: snapshot.clone(),
                        domain,
                        target,
                        remote,
                        tls: self.tls,
                        host,
                        request_id: request_id.clone(),
                        started,
                    };
                    self.chain.run(&ctx, req).await
                }
            }
        };

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(X_REQUEST_ID.clone(), value);
        }
        metrics::record_request(response.status().as_u16(), started);
        response
    }
}
