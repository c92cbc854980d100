//! Terminal handlers.
//!
//! # Data Flow
//! ```text
//! PolicyChain (innermost)
//!     → GatewayTerminal, by resolved target:
//!         Route(i) → proxy.rs    (hyper-util client → backend)
//!         Static   → static_files.rs (tokio::fs stream)
//!         NotFound → 404
//!
//! Dispatcher (before any domain matching)
//!     → builtin.rs (/metrics, /health, welcome page)
//! ```

pub mod builtin;
pub mod proxy;
pub mod static_files;

pub use proxy::{ProxyClient, ProxyError};
pub use static_files::StaticError;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::http::response;
use crate::observability::metrics;
use crate::policy::chain::{RequestContext, Terminal};
use crate::routing::matcher::Target;

/// Routes a request to the handler its target names.
pub struct GatewayTerminal {
    proxy: ProxyClient,
}

impl GatewayTerminal {
    pub fn new(proxy: ProxyClient) -> Self {
        Self { proxy }
    }
}

impl Terminal for GatewayTerminal {
    fn call<'a>(&'a self, ctx: &'a RequestContext, req: Request<Body>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            match ctx.target {
                Target::Route(_) => {
                    let Some(route) = ctx.route() else {
                        return response::not_found();
                    };
                    match self
                        .proxy
                        .forward(route, req, ctx.remote.ip(), ctx.tls, &ctx.host)
                        .await
                    {
                        Ok(response) => response,
                        Err(e) => {
                            tracing::error!(
                                request_id = %ctx.request_id,
                                domain = %ctx.domain().name,
                                route = %route.pattern(),
                                backend = %route.backend,
                                error = %e,
                                "Backend request failed"
                            );
                            metrics::record_backend_error(e.kind());
                            match e {
                                ProxyError::Timeout(_) => response::gateway_timeout(),
                                _ => response::bad_gateway(),
                            }
                        }
                    }
                }
                Target::Static => match &ctx.domain().static_root {
                    Some(root) => static_files::serve(root, req.uri()).await,
                    None => response::not_found(),
                },
                Target::NotFound => response::not_found(),
            }
        })
    }
}
