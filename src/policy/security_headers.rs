//! HSTS/CSP stamping stage.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::policy::chain::{Next, PolicyStage, RequestContext};
use crate::security::headers::apply_security_headers;

/// Stamps every response produced below this stage, error pages included.
pub struct SecurityHeadersStage;

impl PolicyStage for SecurityHeadersStage {
    fn name(&self) -> &'static str {
        "security_headers"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        req: Request<Body>,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let mut response = next.run(ctx, req).await;
            apply_security_headers(&ctx.domain().security, response.headers_mut());
            response
        })
    }
}
