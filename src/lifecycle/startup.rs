//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize all subsystems in dependency order
//! - Start background tasks (cache sweeper, metrics upkeep, reload triggers)
//! - Bind listeners and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::admin;
use crate::cache;
use crate::config::loader::{ConfigError, ConfigSource};
use crate::config::schema::GatewayConfig;
use crate::config::watcher::{self, ConfigWatcher};
use crate::http::server::GatewayServer;
use crate::http::state::GatewayState;
use crate::lifecycle::reload::Reloader;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::net::tls::load_tls_config;
use crate::observability::{logging, metrics};
use crate::routing::table::RoutingError;

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(10);
const WATCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Fatal errors before or while serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("failed to load TLS material: {0}")]
    Tls(#[source] std::io::Error),

    #[error("server.{field}: invalid socket address '{value}'")]
    Address { field: &'static str, value: String },

    #[error("listener on {address} failed: {source}")]
    Serve {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("config watcher failed: {0}")]
    Watch(#[from] notify::Error),
}

/// Log configuration hazards that do not prevent startup.
pub fn warn_about(config: &GatewayConfig) {
    let tls = config.server.tls_paths().is_some();
    if !tls {
        tracing::warn!(
            address = %config.server.http_address,
            "No TLS certificate configured; serving all domains over plaintext HTTP"
        );
    }
    for domain in &config.domains {
        if domain.autocert && !tls {
            tracing::warn!(
                domain = %domain.domain,
                "autocert is set but certificates must be provisioned externally"
            );
        }
        if domain.redirect_to_https && !tls {
            tracing::warn!(domain = %domain.domain, "redirect_to_https without a TLS listener");
        }
    }
}

/// Run the gateway until a termination signal arrives.
pub async fn run(source: ConfigSource) -> Result<(), StartupError> {
    // 1. Configuration
    let config = source.load()?;

    // 2. Logging and metrics
    logging::init_logging(&config.logging);
    metrics::init_metrics();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %source.main.display(),
        domains = config.domains.len(),
        "edge-gateway starting"
    );
    warn_about(&config);

    // 3. State
    let state = GatewayState::from_config(&config)?;
    let tls = match config.server.tls_paths() {
        Some((cert, key)) => Some(
            load_tls_config(Path::new(cert), Path::new(key))
                .await
                .map_err(StartupError::Tls)?,
        ),
        None => None,
    };
    let shutdown = Shutdown::new();
    let reloader = Reloader::new(source.clone(), state.clone(), tls.clone());

    // 4. Background tasks
    if state.cache.enabled() {
        tokio::spawn(cache::run_sweeper(
            state.cache.clone(),
            Duration::from_secs(config.cache.sweep_interval_secs.max(1)),
            shutdown.clone(),
        ));
    }
    spawn_metrics_upkeep(shutdown.clone());
    signals::spawn_reload_handler(reloader.clone(), shutdown.clone());
    signals::spawn_termination_handler(shutdown.clone());

    // The watcher stops when dropped, so keep it for the life of `run`.
    let _watcher = if config.reload_on_change {
        Some(spawn_watch_reloader(&source, reloader.clone(), shutdown.clone())?)
    } else {
        None
    };

    // 5. Admin API
    if let Some(address) = &config.server.admin_address {
        let address: SocketAddr = address.parse().map_err(|_| StartupError::Address {
            field: "admin_address",
            value: address.clone(),
        })?;
        admin::spawn(
            address,
            state.clone(),
            reloader,
            config.server.admin_api_key.clone(),
            shutdown.clone(),
        );
    }

    // 6. Listeners
    let server = GatewayServer::new(&config, state, tls)?;
    server.run(shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn spawn_metrics_upkeep(shutdown: Shutdown) {
    let mut shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => metrics::run_upkeep(),
                _ = shutdown_rx.recv() => break,
            }
        }
    });
}

fn spawn_watch_reloader(
    source: &ConfigSource,
    reloader: Reloader,
    shutdown: Shutdown,
) -> Result<notify::RecommendedWatcher, StartupError> {
    let (config_watcher, mut rx) = ConfigWatcher::new(&source.main, source.conf_dir.as_deref());
    let handle = config_watcher.run()?;
    let mut shutdown_rx = shutdown.subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                triggered = watcher::debounce(&mut rx, WATCH_DEBOUNCE) => {
                    if triggered.is_none() {
                        break;
                    }
                    let _ = reloader.reload().await;
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    });

    Ok(handle)
}
