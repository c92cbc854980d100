//! Outbound header overrides for proxy routes.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::policy::chain::{Next, PolicyStage, RequestContext};

pub struct HeaderInjectionStage;

impl PolicyStage for HeaderInjectionStage {
    fn name(&self) -> &'static str {
        "header_injection"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        mut req: Request<Body>,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if let Some(route) = ctx.route() {
                let headers = req.headers_mut();
                for (name, value) in &route.headers {
                    headers.insert(name.clone(), value.clone());
                }
            }
            next.run(ctx, req).await
        })
    }
}
