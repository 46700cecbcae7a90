//! REST API routes.

use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers::{anchoring, audit, chain, classify, health};
use crate::server::AppState;

/// Build the application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Chain queries
        .route("/v1/chain/merkle-proof", post(chain::merkle_proof))
        .route("/v1/chain/tx-status", post(chain::tx_status))
        .route("/v1/chain/height", get(chain::chain_height))
        // Classification
        .route("/v1/classify/panels", get(classify::list_panels))
        .route("/v1/classify/panels/:panel_id/run", post(classify::run_panel))
        // Anchoring
        .route("/v1/anchor", post(anchoring::anchor_capsule))
        .route("/v1/anchor/status", get(anchoring::anchor_status))
        .route(
            "/v1/anchor/records/:record_id/temporal-proof",
            get(anchoring::temporal_proof),
        )
        // Audit log
        .route("/v1/audit/events", get(audit::list_events))
        .route("/v1/audit/decrypt", post(audit::decrypt_capsule))
        .route(
            "/v1/audit/records/:record_id/capsule",
            get(audit::decrypt_record),
        )
}
