//! Health check handler.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub anchor_enabled: bool,
    pub panels_loaded: usize,
    pub chain_rate_budget_remaining: u32,
}

/// GET /health - liveness plus a summary of configured components
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "capsa-anchor",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        anchor_enabled: state.coordinator.is_some(),
        panels_loaded: state.panels.len(),
        chain_rate_budget_remaining: state.chain.rate_budget_remaining(),
    })
}
