//! Shared gateway state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;

use crate::cache::ResponseCache;
use crate::config::schema::{CompressionConfig, GatewayConfig};
use crate::handlers::ProxyClient;
use crate::routing::table::{RoutingError, RoutingTable};
use crate::security::rate_limit::RateLimiterRegistry;

static GENERATION: AtomicU64 = AtomicU64::new(1);

/// Everything that is replaced together on reload.
#[derive(Debug)]
pub struct Snapshot {
    pub table: RoutingTable,
    pub limiters: RateLimiterRegistry,
    pub loaded_at: Instant,
    /// Unique per snapshot; cached responses are tied to it.
    pub generation: u64,
}

impl Snapshot {
    /// Create a snapshot with fresh (full) rate limiter buckets.
    pub fn new(table: RoutingTable) -> Self {
        let limiters = RateLimiterRegistry::from_table(&table);
        Self {
            table,
            limiters,
            loaded_at: Instant::now(),
            generation: GENERATION.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// Settings fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// A TLS listener is configured.
    pub tls_enabled: bool,
    /// Full routing on the plaintext listener (configured, or forced when TLS is off).
    pub plaintext_routing: bool,
    pub compression: CompressionConfig,
    pub max_request_body_bytes: usize,
}

impl GatewaySettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let tls_enabled = config.server.tls_paths().is_some();
        Self {
            tls_enabled,
            plaintext_routing: config.server.plaintext_routing || !tls_enabled,
            compression: config.compression.clone(),
            max_request_body_bytes: config.server.max_request_body_bytes,
        }
    }
}

/// Application state injected into the dispatcher and admin API.
#[derive(Clone)]
pub struct GatewayState {
    pub snapshot: Arc<ArcSwap<Snapshot>>,
    pub cache: Arc<ResponseCache>,
    pub settings: Arc<GatewaySettings>,
    pub proxy: ProxyClient,
}

impl GatewayState {
    /// Build the initial state from a validated configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, RoutingError> {
        let table = RoutingTable::from_config(config)?;
        Ok(Self {
            snapshot: Arc::new(ArcSwap::from_pointee(Snapshot::new(table))),
            cache: Arc::new(ResponseCache::new(&config.cache)),
            settings: Arc::new(GatewaySettings::from_config(config)),
            proxy: ProxyClient::new(&config.timeouts),
        })
    }

    /// The snapshot in effect right now.
    pub fn current(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Atomically make `table` the active routing table.
    ///
    /// Rate limiter buckets start full again and cached responses are dropped,
    /// since they were produced under the previous table.
    pub fn install(&self, table: RoutingTable) {
        self.snapshot.store(Arc::new(Snapshot::new(table)));
        self.cache.clear();
    }
}
