//! Response cache.
//!
//! # Data Flow
//! ```text
//! GET/HEAD for a static or proxy target
//!     → policy::caching builds the key (METHOD host path?query)
//!     → store.rs lookup
//!         hit  → stored status/headers/body, X-Cache: HIT
//!         miss → downstream response captured, relayed, then stored
//!
//! Background:
//!     sweeper task → store.rs sweep() every sweep_interval_secs
//! ```
//!
//! # Design Decisions
//! - Entries are inserted only after the whole body is captured
//! - Last writer wins for concurrent misses on the same key
//! - Only identity-encoded 2xx bodies under the size cap are stored
//! - Responses with Set-Cookie, `no-store` or `private` are relayed uncached
//! - The whole cache is cleared when a new routing table goes live

pub mod store;

pub use store::{cache_key, CachedResponse, ResponseCache};

use std::sync::Arc;
use std::time::Duration;

use crate::lifecycle::Shutdown;

/// Periodically drop expired entries until shutdown.
pub async fn run_sweeper(cache: Arc<ResponseCache>, interval: Duration, shutdown: Shutdown) {
    let mut shutdown_rx = shutdown.subscribe();
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = cache.sweep();
                if removed > 0 {
                    tracing::debug!(removed, remaining = cache.len(), "Cache sweep");
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}
