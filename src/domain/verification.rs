//! Credential verification boundary types.
//!
//! The cryptographic verification of Autonomic-Identifier key-event logs is
//! an external collaborator; this module only defines the result shape the
//! rest of the pipeline consumes, plus the trait seam and a stub used until
//! a real verifier is wired in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of verifying a raw credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Whether the credential verified
    pub verified: bool,

    /// SAID of the verified credential, when verification succeeded
    pub credential: Option<String>,

    /// Jurisdiction extracted from the credential
    pub jurisdiction: Option<String>,

    /// Verification failures, empty on success
    pub errors: Vec<String>,

    /// Which method produced this result (e.g. "keri-acdc", "stub")
    pub verification_method: String,

    /// When verification ran
    pub timestamp: DateTime<Utc>,
}

/// Verification collaborator seam
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verify a raw credential string
    async fn verify(&self, raw_credential: &str) -> VerificationResult;
}

/// Placeholder verifier: accepts any non-empty credential and records that
/// no cryptographic verification happened.
pub struct StubVerifier;

#[async_trait]
impl CredentialVerifier for StubVerifier {
    async fn verify(&self, raw_credential: &str) -> VerificationResult {
        let raw = raw_credential.trim();
        if raw.is_empty() {
            return VerificationResult {
                verified: false,
                credential: None,
                jurisdiction: None,
                errors: vec!["empty credential".to_string()],
                verification_method: "stub".to_string(),
                timestamp: Utc::now(),
            };
        }

        VerificationResult {
            verified: true,
            credential: Some(crate::crypto::hash_string(raw)),
            jurisdiction: None,
            errors: Vec::new(),
            verification_method: "stub".to_string(),
            timestamp: Utc::now(),
        }
    }
}
