//! Anchoring handlers: the verify → classify → bundle → anchor pipeline
//! and temporal-proof reads over anchored records.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::{ApiError, ErrorCode};
use crate::classify::ClassificationSession;
use crate::domain::{
    new_record_id, Answer, AnchoringResult, AuditEvent, AuditEventType, EvidenceFile, PublicTags,
    TemporalProof,
};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceUpload {
    pub filename: String,
    pub mimetype: String,
    /// File content, hex encoded; hashed once on receipt
    pub content_hex: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorRequest {
    /// Raw credential for the verification collaborator
    pub credential: Option<String>,
    pub lei: Option<String>,
    /// Panel to classify against, with the full answer sequence
    pub panel_id: Option<String>,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<EvidenceUpload>,
}

/// POST /v1/anchor - run the full pipeline and anchor the capsule.
///
/// 503 when the anchoring wallet is not configured.
pub async fn anchor_capsule(
    State(state): State<AppState>,
    Json(request): Json<AnchorRequest>,
) -> Result<Json<AnchoringResult>, ApiError> {
    let coordinator = state.coordinator.as_ref().ok_or_else(|| {
        ApiError::new(
            ErrorCode::AnchorNotConfigured,
            "anchoring is not configured; set ANCHOR_WALLET_KEY",
        )
    })?;

    let record_id = new_record_id();

    let verification = match &request.credential {
        Some(raw) => {
            let result = state.verifier.verify(raw).await;
            let mut event = AuditEvent::new(
                AuditEventType::CredentialVerified,
                record_id.clone(),
                if result.verified {
                    format!("credential verified via {}", result.verification_method)
                } else {
                    format!("credential rejected: {}", result.errors.join("; "))
                },
            );
            event.lei = request.lei.clone();
            event.said = result.credential.clone();
            state.audit.record(event).await;
            Some(result)
        }
        None => None,
    };

    let classification = match &request.panel_id {
        Some(panel_id) => {
            let panel = state
                .panels
                .get(panel_id)
                .ok_or_else(|| crate::classify::EngineError::UnknownPanel(panel_id.clone()))?;
            let answers: Vec<Answer> = request.answers.iter().map(|s| Answer::parse(s)).collect();
            let result = ClassificationSession::run(panel, &answers)?;
            state
                .audit
                .record(AuditEvent::new(
                    AuditEventType::ClassificationCompleted,
                    record_id.clone(),
                    format!("classified as {} via panel {}", result.classification, result.panel),
                ))
                .await;
            Some(result)
        }
        None => None,
    };

    let mut evidence = Vec::with_capacity(request.evidence.len());
    for upload in &request.evidence {
        let bytes = hex::decode(&upload.content_hex).map_err(|e| {
            ApiError::new(
                ErrorCode::InvalidFieldValue,
                format!("evidence {} contentHex is not hex: {e}", upload.filename),
            )
        })?;
        evidence.push(EvidenceFile::from_bytes(
            upload.filename.clone(),
            upload.mimetype.clone(),
            &bytes,
        ));
    }

    let capsule = state
        .builder
        .build(verification, classification, evidence, record_id.clone());
    let tags = PublicTags::for_capsule(&capsule, request.lei.clone());

    let said = capsule
        .verification
        .as_ref()
        .and_then(|v| v.credential.clone());
    let result = coordinator.anchor(&capsule, &tags).await;
    state
        .audit
        .record_anchoring(&record_id, &result, request.lei, said)
        .await;

    Ok(Json(result))
}

/// GET /v1/anchor/status - whether the anchoring path is configured
pub async fn anchor_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let configured = state.coordinator.is_some();
    Json(serde_json::json!({
        "anchorEnabled": configured,
        "message": if configured {
            "Anchoring wallet is configured and ready"
        } else {
            "Anchoring not configured. Set ANCHOR_WALLET_KEY"
        }
    }))
}

/// GET /v1/anchor/records/:record_id/temporal-proof
///
/// Answers "was this credential valid when anchored": decrypts the stored
/// payload for its verification outcome and combines it with a fresh
/// confirmation snapshot of the anchoring transaction.
pub async fn temporal_proof(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<TemporalProof>, ApiError> {
    let event = state.audit.anchoring_event(&record_id).await.ok_or_else(|| {
        ApiError::new(
            ErrorCode::RecordNotFound,
            format!("no anchoring record for record id {record_id}"),
        )
        .with_resource_id(record_id.clone())
    })?;

    let txid = event.txid.clone().ok_or_else(|| {
        ApiError::new(
            ErrorCode::RecordNotFound,
            format!("record {record_id} was never broadcast"),
        )
    })?;

    let capsule = match state.audit.decrypt_record(&record_id).await {
        Ok(capsule) => capsule,
        Err(crate::audit::AuditError::RecordNotFound(id)) => {
            return Err(
                ApiError::new(ErrorCode::RecordNotFound, format!("no audit record {id}"))
                    .with_resource_id(id),
            )
        }
        Err(crate::audit::AuditError::Decrypt(e)) => return Err(e.into()),
    };

    let verification = capsule.verification.ok_or_else(|| {
        ApiError::new(
            ErrorCode::RecordNotFound,
            format!("record {record_id} carries no verification result"),
        )
    })?;

    let (proof, height) = state.chain.check_confirmation(&txid).await?;
    let confirmation = state.tracker.confirmation(&txid, proof.as_ref(), height);

    Ok(Json(TemporalProof::assemble(verification, confirmation)))
}
