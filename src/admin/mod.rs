//! Admin API.
//!
//! Served on its own listener (`server.admin_address`):
//! - `GET /admin/status`  version, domain/route counts, cache size, snapshot age
//! - `POST /admin/reload` reload configuration now
//!
//! Every route sits behind bearer-token auth when `server.admin_api_key` is set.

pub mod auth;
pub mod handlers;

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use axum_server::Handle;

use self::auth::admin_auth_middleware;
use self::handlers::{get_status, post_reload};
use crate::http::server::drain_on_shutdown;
use crate::http::state::GatewayState;
use crate::lifecycle::reload::Reloader;
use crate::lifecycle::shutdown::Shutdown;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub gateway: GatewayState,
    pub reloader: Reloader,
    pub api_key: Option<String>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/reload", post(post_reload))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Serve the admin API in the background until shutdown.
pub fn spawn(
    address: SocketAddr,
    gateway: GatewayState,
    reloader: Reloader,
    api_key: Option<String>,
    shutdown: Shutdown,
) {
    if api_key.is_none() {
        tracing::warn!(address = %address, "Admin API has no api key configured");
    }
    let app = setup_admin_router(AdminState {
        gateway,
        reloader,
        api_key,
    });

    let handle = Handle::new();
    drain_on_shutdown(handle.clone(), &shutdown, Duration::from_secs(1));

    tokio::spawn(async move {
        tracing::info!(address = %address, "Admin API listening");
        if let Err(e) = axum_server::bind(address)
            .handle(handle)
            .serve(app.into_make_service())
            .await
        {
            tracing::error!(address = %address, error = %e, "Admin API stopped");
        }
    });
}
