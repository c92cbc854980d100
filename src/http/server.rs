//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router that hands every request to the Dispatcher
//! - Wire up middleware (tracing, body limit, panic containment)
//! - Bind the plaintext and TLS listeners
//! - Drain in-flight requests on shutdown

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::schema::GatewayConfig;
use crate::http::dispatch::Dispatcher;
use crate::http::state::GatewayState;
use crate::lifecycle::startup::StartupError;
use crate::lifecycle::Shutdown;

/// Build the router for one listener.
pub fn build_router(dispatcher: Dispatcher) -> Router {
    let max_body = dispatcher.state().settings.max_request_body_bytes;
    Router::new()
        .fallback(gateway_handler)
        .with_state(dispatcher)
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

async fn gateway_handler(State(dispatcher): State<Dispatcher>, request: Request<Body>) -> Response {
    dispatcher.dispatch(request).await
}

/// Ask `handle` to drain once shutdown is triggered.
pub fn drain_on_shutdown(handle: Handle, shutdown: &Shutdown, grace: Duration) {
    let mut rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = rx.recv().await;
        tracing::info!(grace_secs = grace.as_secs(), "Draining connections");
        handle.graceful_shutdown(Some(grace));
    });
}

fn log_when_listening(handle: Handle, tls: bool) {
    tokio::spawn(async move {
        if let Some(address) = handle.listening().await {
            tracing::info!(address = %address, tls, "Listening for connections");
        }
    });
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::Address {
        field,
        value: value.to_string(),
    })
}

/// The plaintext and (optional) TLS listeners.
pub struct GatewayServer {
    state: GatewayState,
    http_address: SocketAddr,
    https_address: SocketAddr,
    tls: Option<RustlsConfig>,
    grace: Duration,
}

impl GatewayServer {
    /// Create a new server; `tls` enables the HTTPS listener.
    pub fn new(
        config: &GatewayConfig,
        state: GatewayState,
        tls: Option<RustlsConfig>,
    ) -> Result<Self, StartupError> {
        Ok(Self {
            state,
            http_address: parse_addr("http_address", &config.server.http_address)?,
            https_address: parse_addr("https_address", &config.server.https_address)?,
            tls,
            grace: Duration::from_secs(config.timeouts.shutdown_grace_secs),
        })
    }

    /// Serve until shutdown is triggered and in-flight requests have drained.
    pub async fn run(self, shutdown: Shutdown) -> Result<(), StartupError> {
        let dispatcher = Dispatcher::new(self.state.clone());

        let plain_handle = Handle::new();
        drain_on_shutdown(plain_handle.clone(), &shutdown, self.grace);
        log_when_listening(plain_handle.clone(), false);

        let plain_app = build_router(dispatcher.clone());
        let http_address = self.http_address;
        let plain = async move {
            axum_server::bind(http_address)
                .handle(plain_handle)
                .serve(plain_app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .map_err(|source| StartupError::Serve {
                    address: http_address,
                    source,
                })
        };

        match self.tls {
            Some(tls) => {
                let tls_handle = Handle::new();
                drain_on_shutdown(tls_handle.clone(), &shutdown, self.grace);
                log_when_listening(tls_handle.clone(), true);

                let tls_app = build_router(dispatcher.with_tls(true));
                let https_address = self.https_address;
                let secure = async move {
                    axum_server::bind_rustls(https_address, tls)
                        .handle(tls_handle)
                        .serve(tls_app.into_make_service_with_connect_info::<SocketAddr>())
                        .await
                        .map_err(|source| StartupError::Serve {
                            address: https_address,
                            source,
                        })
                };
                tokio::try_join!(plain, secure)?;
            }
            None => plain.await?,
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
