//! Request policy chain.
//!
//! # Data Flow
//! ```text
//! Dispatcher (domain matched)
//!     → ip_filter          403 if the client is not admitted
//!     → security_headers   HSTS/CSP on everything below
//!     → redirect           301 to https (plaintext listener only)
//!     → access_log         one record per request
//!     → compression        gzip/deflate on the way out
//!     → caching            HIT short-circuits, MISS is captured
//!     → rate_limit         429 when the route bucket is empty
//!     → header_injection   route overrides on the outbound request
//!     → Terminal           proxy | static | 404
//! ```
//!
//! # Design Decisions
//! - Stages are trait objects in an explicit ordered list, not tower layers,
//!   so the order is visible in one place
//! - Route-specific stages skip themselves when the target is not a route
//! - Compression sits outside caching, so stored bodies are always identity-encoded

pub mod access_log;
pub mod caching;
pub mod chain;
pub mod compression;
pub mod header_injection;
pub mod ip_filter;
pub mod rate_limit;
pub mod redirect;
pub mod security_headers;

pub use chain::{Next, PolicyChain, PolicyStage, RequestContext, Terminal};

use std::sync::Arc;

use crate::cache::ResponseCache;
use crate::http::state::GatewaySettings;

/// Assemble the stages in their fixed order around a terminal handler.
pub fn build_chain(
    settings: &GatewaySettings,
    cache: Arc<ResponseCache>,
    terminal: Box<dyn Terminal>,
) -> PolicyChain {
    let mut stages: Vec<Box<dyn PolicyStage>> = vec![
        Box::new(ip_filter::IpFilterStage),
        Box::new(security_headers::SecurityHeadersStage),
        Box::new(redirect::HttpsRedirectStage::new(settings.plaintext_routing)),
        Box::new(access_log::AccessLogStage),
    ];
    if settings.compression.enabled {
        stages.push(Box::new(compression::CompressionStage::new(
            settings.compression.level,
        )));
    }
    stages.push(Box::new(caching::CachingStage::new(cache)));
    stages.push(Box::new(rate_limit::RateLimitStage));
    stages.push(Box::new(header_injection::HeaderInjectionStage));

    PolicyChain::new(stages, terminal)
}
