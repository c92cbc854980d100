use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::lifecycle::reload::ReloadSummary;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub domains: usize,
    pub routes: usize,
    pub cache_entries: usize,
    pub seconds_since_reload: u64,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ReloadSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshot = state.gateway.current();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        domains: snapshot.table.len(),
        routes: snapshot.table.routes().count(),
        cache_entries: state.gateway.cache.len(),
        seconds_since_reload: snapshot.loaded_at.elapsed().as_secs(),
    })
}

pub async fn post_reload(State(state): State<AdminState>) -> (StatusCode, Json<ReloadResponse>) {
    tracing::info!("Reload requested via admin API");
    match state.reloader.reload().await {
        Ok(summary) => (
            StatusCode::OK,
            Json(ReloadResponse {
                status: "reloaded",
                summary: Some(summary),
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ReloadResponse {
                status: "failed",
                summary: None,
                error: Some(e.to_string()),
            }),
        ),
    }
}
