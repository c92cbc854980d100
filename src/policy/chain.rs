//! Stage composition.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::http::state::Snapshot;
use crate::routing::matcher::Target;
use crate::routing::table::{DomainRule, RouteRule};

/// Everything a stage may need to know about the current request.
///
/// Built once per matched request by the dispatcher and never shared.
#[derive(Debug)]
pub struct RequestContext {
    pub snapshot: Arc<Snapshot>,
    pub domain: usize,
    pub target: Target,
    pub remote: SocketAddr,
    pub tls: bool,
    /// Host header as received, port included.
    pub host: String,
    pub request_id: String,
    pub started: Instant,
}

impl RequestContext {
    pub fn domain(&self) -> &DomainRule {
        &self.snapshot.table.domains[self.domain]
    }

    /// The matched route, if the target is a proxy route.
    pub fn route(&self) -> Option<&RouteRule> {
        match self.target {
            Target::Route(i) => self.domain().routes.get(i),
            Target::Static | Target::NotFound => None,
        }
    }
}

/// One step of the policy chain.
///
/// A stage either answers the request itself (short-circuit) or calls
/// `next.run` and may post-process the response.
pub trait PolicyStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        req: Request<Body>,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// The handler at the bottom of the chain.
pub trait Terminal: Send + Sync {
    fn call<'a>(&'a self, ctx: &'a RequestContext, req: Request<Body>) -> BoxFuture<'a, Response>;
}

/// The remainder of the chain below the current stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Box<dyn PolicyStage>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    /// Run the remaining stages and finally the terminal handler.
    pub fn run(self, ctx: &'a RequestContext, req: Request<Body>) -> BoxFuture<'a, Response> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.handle(
                ctx,
                req,
                Next {
                    stages: rest,
                    terminal: self.terminal,
                },
            ),
            None => self.terminal.call(ctx, req),
        }
    }
}

/// An ordered list of stages around a terminal handler.
pub struct PolicyChain {
    stages: Vec<Box<dyn PolicyStage>>,
    terminal: Box<dyn Terminal>,
}

impl PolicyChain {
    /// Create a new chain; stages run in the given order, outermost first.
    pub fn new(stages: Vec<Box<dyn PolicyStage>>, terminal: Box<dyn Terminal>) -> Self {
        Self { stages, terminal }
    }

    pub async fn run(&self, ctx: &RequestContext, req: Request<Body>) -> Response {
        Next {
            stages: &self.stages,
            terminal: self.terminal.as_ref(),
        }
        .run(ctx, req)
        .await
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}
