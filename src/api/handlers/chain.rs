//! Chain-query handlers: SPV proofs, transaction status, chain height.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::{missing_field, ApiError, ErrorCode};
use crate::chain::ChainError;
use crate::domain::MerkleProof;
use crate::server::AppState;

/// Pull a txid out of a JSON body, rejecting missing or non-string values
fn extract_txid(body: &serde_json::Value) -> Result<&str, ApiError> {
    body.get("txid")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| missing_field("txid"))
}

/// POST /v1/chain/merkle-proof - SPV proof for a transaction.
///
/// 404 with an error body both for unknown transactions and for known
/// transactions that have not entered a block yet; the two carry distinct
/// error codes.
pub async fn merkle_proof(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<MerkleProof>, ApiError> {
    let txid = extract_txid(&body)?;

    match state.chain.get_merkle_proof(txid).await? {
        Some(proof) => Ok(Json(proof)),
        None => Err(ApiError::new(
            ErrorCode::TxUnconfirmed,
            format!("transaction {txid} has not entered a block yet"),
        )
        .with_resource_id(txid.to_string())),
    }
}

/// Response for the tx-status endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxStatusResponse {
    pub confirmed: bool,
    pub confirmations: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
}

/// POST /v1/chain/tx-status - confirmation state for a transaction.
///
/// A transaction with no proof available reports
/// `{confirmed: false, confirmations: 0}`; pending is a state, not an
/// error.
pub async fn tx_status(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<TxStatusResponse>, ApiError> {
    let txid = extract_txid(&body)?;

    let (proof, height) = match state.chain.check_confirmation(txid).await {
        Ok(snapshot) => snapshot,
        Err(ChainError::TxNotFound(_)) => {
            return Ok(Json(TxStatusResponse {
                confirmed: false,
                confirmations: 0,
                block_height: None,
            }));
        }
        Err(e) => return Err(e.into()),
    };

    let status = state.tracker.status(proof.as_ref(), height);
    Ok(Json(TxStatusResponse {
        confirmed: status.is_confirmed(),
        confirmations: status.confirmations(),
        block_height: proof.map(|p| p.block_height),
    }))
}

#[derive(Debug, Serialize)]
pub struct ChainHeightResponse {
    pub height: u64,
}

/// GET /v1/chain/height - current best block height
pub async fn chain_height(
    State(state): State<AppState>,
) -> Result<Json<ChainHeightResponse>, ApiError> {
    let height = state.chain.current_height().await?;
    Ok(Json(ChainHeightResponse { height }))
}
