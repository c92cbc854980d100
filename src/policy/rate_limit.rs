//! Per-route rate limiting stage.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::http::response;
use crate::observability::metrics;
use crate::policy::chain::{Next, PolicyStage, RequestContext};
use crate::security::rate_limit::Decision;

pub struct RateLimitStage;

impl PolicyStage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        req: Request<Body>,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let Some(route) = ctx.route() else {
                return next.run(ctx, req).await;
            };

            let decision = ctx.snapshot.limiters.check(route);
            if let Decision::Limited { .. } = decision {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    route = %route.id,
                    client = %ctx.remote,
                    "Rate limit exceeded"
                );
                metrics::record_rate_limited(&route.id);
                return response::too_many_requests(decision.retry_after_secs());
            }
            next.run(ctx, req).await
        })
    }
}
