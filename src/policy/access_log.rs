//! Access logging stage.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::observability::logging::ACCESS_TARGET;
use crate::policy::chain::{Next, PolicyStage, RequestContext};

/// Emits one record per request under the `access` target.
pub struct AccessLogStage;

impl PolicyStage for AccessLogStage {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        req: Request<Body>,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let method = req.method().clone();
            let path = req.uri().path().to_string();

            let response = next.run(ctx, req).await;

            tracing::info!(
                target: ACCESS_TARGET,
                request_id = %ctx.request_id,
                domain = %ctx.domain().name,
                method = %method,
                path = %path,
                remote = %ctx.remote,
                status = response.status().as_u16(),
                latency_ms = ctx.started.elapsed().as_secs_f64() * 1000.0,
                "request"
            );
            response
        })
    }
}
