//! Classification handlers: panel discovery and rule-tree traversal.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::classify::{ClassificationSession, EngineError};
use crate::domain::{Answer, ClassificationResult};
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelListResponse {
    pub panels: Vec<String>,
}

/// GET /v1/classify/panels - registered panel ids
pub async fn list_panels(State(state): State<AppState>) -> Json<PanelListResponse> {
    Json(PanelListResponse {
        panels: state.panels.panel_ids(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Wire-form answers: "continue", "yes", "no", or a select-option id
    pub answers: Vec<String>,
}

/// POST /v1/classify/panels/:panel_id/run - replay answers to a result.
///
/// The same answers against the same panel version always yield an
/// identical decision path and result.
pub async fn run_panel(
    State(state): State<AppState>,
    Path(panel_id): Path<String>,
    Json(request): Json<RunRequest>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let panel = state
        .panels
        .get(&panel_id)
        .ok_or_else(|| EngineError::UnknownPanel(panel_id.clone()))?;

    let answers: Vec<Answer> = request.answers.iter().map(|s| Answer::parse(s)).collect();
    let result = ClassificationSession::run(panel, &answers)?;
    Ok(Json(result))
}
