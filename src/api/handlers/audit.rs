//! Audit log handlers: event listing/filtering and on-demand decryption.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::domain::{AuditCapsule, AuditEvent, AuditEventFilter};
use crate::server::AppState;

/// GET /v1/audit/events - filtered audit log, insertion order
pub async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<AuditEventFilter>,
) -> Json<Vec<AuditEvent>> {
    Json(state.audit.query(&filter).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptRequest {
    #[serde(default)]
    pub encrypted_hex: String,
}

/// Decryption outcome. Failures keep `success: false` with a
/// user-actionable message that distinguishes missing input, corrupted
/// data and an unavailable key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capsule: Option<AuditCapsule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /v1/audit/decrypt - recover a capsule from its anchored payload
pub async fn decrypt_capsule(
    State(state): State<AppState>,
    Json(request): Json<DecryptRequest>,
) -> Json<DecryptResponse> {
    match state.audit.decrypt_payload(&request.encrypted_hex).await {
        Ok(capsule) => Json(DecryptResponse {
            success: true,
            capsule: Some(capsule),
            error: None,
        }),
        Err(e) => Json(DecryptResponse {
            success: false,
            capsule: None,
            error: Some(e.to_string()),
        }),
    }
}

/// GET /v1/audit/records/:record_id/capsule - decrypt by record id
pub async fn decrypt_record(
    State(state): State<AppState>,
    axum::extract::Path(record_id): axum::extract::Path<String>,
) -> Result<Json<AuditCapsule>, ApiError> {
    match state.audit.decrypt_record(&record_id).await {
        Ok(capsule) => Ok(Json(capsule)),
        Err(crate::audit::AuditError::RecordNotFound(id)) => Err(ApiError::new(
            crate::api::error::ErrorCode::RecordNotFound,
            format!("no audit record with record id {id}"),
        )
        .with_resource_id(id)),
        Err(crate::audit::AuditError::Decrypt(e)) => Err(e.into()),
    }
}
