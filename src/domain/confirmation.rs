//! SPV proof and confirmation snapshot types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::VerificationResult;

/// One level of an SPV Merkle path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerklePathElement {
    /// Position of the sibling within its tree level
    pub offset: u64,
    /// Sibling hash, 64-hex display order
    pub hash: String,
}

/// SPV inclusion proof for an anchored transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    pub txid: String,
    /// Height of the block containing the transaction
    pub block_height: u64,
    /// Merkle root of that block, 64-hex display order
    pub merkle_root: String,
    /// Sibling hashes from leaf level upward
    pub path: Vec<MerklePathElement>,
    /// Leaf index of the transaction in the block
    pub index: u64,
}

impl MerkleProof {
    /// Check the path against the claimed root
    pub fn verify(&self) -> bool {
        let siblings: Vec<String> = self.path.iter().map(|e| e.hash.clone()).collect();
        crate::crypto::verify_merkle_path(&self.txid, self.index, &siblings, &self.merkle_root)
    }
}

/// Point-in-time confirmation snapshot for a transaction.
///
/// Recomputed on every poll from a fresh proof and height read; never
/// persisted as a source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockConfirmation {
    pub txid: String,
    /// 0 while the transaction has not entered a block
    pub block_height: u64,
    pub confirmations: u64,
    pub checked_at: DateTime<Utc>,
}

/// Answers "was this credential valid when anchored": the verification
/// outcome combined with the anchoring transaction's confirmation state.
/// Constructed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalProof {
    pub verification: VerificationResult,
    pub block_confirmation: BlockConfirmation,
    pub created_at: DateTime<Utc>,
}

impl TemporalProof {
    pub fn assemble(verification: VerificationResult, confirmation: BlockConfirmation) -> Self {
        Self {
            verification,
            block_confirmation: confirmation,
            created_at: Utc::now(),
        }
    }
}
