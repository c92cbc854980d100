//! Plaintext listener gate: HTTPS redirects and plaintext routing.

use axum::body::Body;
use axum::http::{Request, Uri};
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::http::response;
use crate::policy::chain::{Next, PolicyStage, RequestContext};
use crate::routing::matcher::strip_port;

pub struct HttpsRedirectStage {
    /// Serve domains without the redirect flag on the plaintext listener.
    plaintext_routing: bool,
}

impl HttpsRedirectStage {
    pub fn new(plaintext_routing: bool) -> Self {
        Self { plaintext_routing }
    }
}

/// `https://host/path?query` with any port removed from the host.
pub fn https_location(host: &str, uri: &Uri) -> String {
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("https://{}{}", strip_port(host), target)
}

impl PolicyStage for HttpsRedirectStage {
    fn name(&self) -> &'static str {
        "https_redirect"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        req: Request<Body>,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if ctx.tls {
                return next.run(ctx, req).await;
            }
            if ctx.domain().redirect_to_https {
                let location = https_location(&ctx.host, req.uri());
                tracing::debug!(request_id = %ctx.request_id, location = %location, "Redirecting to HTTPS");
                return response::moved_permanently(&location);
            }
            if !self.plaintext_routing {
                return response::not_found();
            }
            next.run(ctx, req).await
        })
    }
}
