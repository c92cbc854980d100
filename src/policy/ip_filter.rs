//! Client IP allow/deny stage.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::http::response;
use crate::policy::chain::{Next, PolicyStage, RequestContext};
use crate::security::access_control::is_permitted;

pub struct IpFilterStage;

impl PolicyStage for IpFilterStage {
    fn name(&self) -> &'static str {
        "ip_filter"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        req: Request<Body>,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let client = ctx.remote.ip();
            if !is_permitted(&ctx.domain().security, client) {
                tracing::info!(
                    request_id = %ctx.request_id,
                    domain = %ctx.domain().name,
                    client = %client.to_canonical(),
                    "Client IP rejected"
                );
                return response::forbidden();
            }
            next.run(ctx, req).await
        })
    }
}
