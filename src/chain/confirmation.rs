//! Confirmation math and the finality policy.
//!
//! A transaction is final once it sits under [`CONFIRMATION_THRESHOLD`]
//! blocks. The threshold reflects standard probabilistic-finality practice
//! for the target chain; it is a named policy constant, overridable only
//! through an explicit [`ConfirmationPolicy`], never scattered across
//! callers.

use chrono::Utc;
use serde::Serialize;

use crate::domain::{BlockConfirmation, MerkleProof};

/// Blocks on top of a transaction required for finality
pub const CONFIRMATION_THRESHOLD: u32 = 6;

/// Finality policy, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub threshold: u32,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            threshold: CONFIRMATION_THRESHOLD,
        }
    }
}

impl ConfirmationPolicy {
    /// Read an explicit override from CONFIRMATION_THRESHOLD, else default
    pub fn from_env() -> Self {
        let threshold = std::env::var("CONFIRMATION_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(CONFIRMATION_THRESHOLD);
        Self { threshold }
    }
}

/// Confirmation count for a transaction mined at `block_height` given the
/// current chain tip.
///
/// The block containing the transaction counts as the first confirmation.
/// A stale height read (`current_height < block_height`) clamps to 0
/// rather than going negative.
pub fn confirmations(block_height: u64, current_height: u64) -> u64 {
    if current_height < block_height {
        return 0;
    }
    current_height - block_height + 1
}

/// Finality state of a transaction at one poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TxStatus {
    /// No proof yet: the transaction has not entered a block
    Pending,
    /// Mined but under the finality threshold
    Confirming { confirmations: u64 },
    /// At or past the finality threshold
    Confirmed { confirmations: u64 },
}

impl TxStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, TxStatus::Confirmed { .. })
    }

    pub fn confirmations(&self) -> u64 {
        match self {
            TxStatus::Pending => 0,
            TxStatus::Confirming { confirmations } | TxStatus::Confirmed { confirmations } => {
                *confirmations
            }
        }
    }
}

/// Derives confirmation counts and finality from chain-query results.
///
/// Stateless apart from its policy: each check is one derivation over a
/// (proof, height) snapshot. It never schedules its own polling; callers
/// own their cadence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmationTracker {
    policy: ConfirmationPolicy,
}

impl ConfirmationTracker {
    pub fn new(policy: ConfirmationPolicy) -> Self {
        Self { policy }
    }

    pub fn threshold(&self) -> u32 {
        self.policy.threshold
    }

    /// Map a (proof, height) snapshot to a finality state
    pub fn status(&self, proof: Option<&MerkleProof>, current_height: u64) -> TxStatus {
        match proof {
            None => TxStatus::Pending,
            Some(proof) => {
                let n = confirmations(proof.block_height, current_height);
                if n >= u64::from(self.policy.threshold) {
                    TxStatus::Confirmed { confirmations: n }
                } else {
                    TxStatus::Confirming { confirmations: n }
                }
            }
        }
    }

    /// Build the point-in-time confirmation snapshot for a poll
    pub fn confirmation(
        &self,
        txid: &str,
        proof: Option<&MerkleProof>,
        current_height: u64,
    ) -> BlockConfirmation {
        let block_height = proof.map(|p| p.block_height).unwrap_or(0);
        let confirmations = proof
            .map(|p| confirmations(p.block_height, current_height))
            .unwrap_or(0);
        BlockConfirmation {
            txid: txid.to_string(),
            block_height,
            confirmations,
            checked_at: Utc::now(),
        }
    }
}
