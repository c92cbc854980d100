//! Live configuration reload.
//!
//! # Responsibilities
//! - Load, validate and compile a new routing table
//! - Refresh TLS material on the running listener
//! - Swap the snapshot atomically, or keep the old one on any failure
//!
//! # Design Decisions
//! - One reload at a time; concurrent triggers queue behind a mutex
//! - Every fallible step happens before the swap
//! - Server, cache and timeout sections are read once at startup; only
//!   domains and certificates change on reload

use std::path::Path;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::loader::{ConfigError, ConfigSource};
use crate::http::state::GatewayState;
use crate::net::tls::reload_tls_config;
use crate::observability::metrics;
use crate::routing::table::{RoutingError, RoutingTable};

/// Why a reload was refused.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("TLS reload failed: {0}")]
    Tls(#[from] std::io::Error),
}

/// What a successful reload installed.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadSummary {
    pub domains: usize,
    pub routes: usize,
}

/// Performs reloads for every trigger (signal, watcher, admin API).
#[derive(Clone)]
pub struct Reloader {
    source: ConfigSource,
    state: GatewayState,
    tls: Option<RustlsConfig>,
    lock: Arc<Mutex<()>>,
}

impl Reloader {
    /// Create a new reloader. `tls` is the running HTTPS listener's config, if any.
    pub fn new(source: ConfigSource, state: GatewayState, tls: Option<RustlsConfig>) -> Self {
        Self {
            source,
            state,
            tls,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Load and install the current configuration.
    pub async fn reload(&self) -> Result<ReloadSummary, ReloadError> {
        let _guard = self.lock.lock().await;

        match self.try_reload().await {
            Ok(summary) => {
                metrics::record_reload("success");
                tracing::info!(domains = summary.domains, routes = summary.routes, "Configuration reloaded");
                Ok(summary)
            }
            Err(e) => {
                metrics::record_reload("failure");
                tracing::error!(error = %e, "Reload failed. Keeping current configuration.");
                Err(e)
            }
        }
    }

    async fn try_reload(&self) -> Result<ReloadSummary, ReloadError> {
        let config = self.source.load()?;
        let table = RoutingTable::from_config(&config)?;

        match (&self.tls, config.server.tls_paths()) {
            (Some(tls), Some((cert, key))) => {
                reload_tls_config(tls, Path::new(cert), Path::new(key)).await?;
            }
            (None, Some(_)) => {
                tracing::warn!("TLS was configured after startup; restart to enable the HTTPS listener");
            }
            _ => {}
        }

        let summary = ReloadSummary {
            domains: table.len(),
            routes: table.routes().count(),
        };
        self.state.install(table);
        Ok(summary)
    }
}
