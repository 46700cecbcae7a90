//! The audit capsule: the canonical bundle of verification, classification
//! and evidence metadata that gets sealed and anchored.
//!
//! Canonical serialization is RFC 8785 JCS over the serde model, so an
//! identical logical capsule always produces identical bytes. The `version`
//! field discriminates schema variants; decoding dispatches on it instead
//! of assuming the latest shape.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ClassificationResult, VerificationResult};
use crate::crypto;

/// Current capsule schema version
pub const CAPSULE_VERSION: u32 = 1;

/// Public-tag `type` value for classification capsules
pub const CLASSIFICATION_TAG_TYPE: &str = "LEICCA-Classification";

/// Metadata of an uploaded evidence file.
///
/// The hash is computed once from the uploaded bytes and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceFile {
    pub filename: String,
    pub size: u64,
    pub mimetype: String,
    /// 64-hex SHA-256 of the file content
    pub hash: String,
    pub uploaded_at: DateTime<Utc>,
}

impl EvidenceFile {
    /// Build evidence metadata from uploaded bytes, hashing them once
    pub fn from_bytes(filename: impl Into<String>, mimetype: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            filename: filename.into(),
            size: bytes.len() as u64,
            mimetype: mimetype.into(),
            hash: crypto::hash_bytes(bytes),
            uploaded_at: Utc::now(),
        }
    }

    /// Truncated hash for display
    pub fn display_hash(&self) -> String {
        crypto::truncate_hash_default(&self.hash)
    }
}

/// Capsule bookkeeping fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleMetadata {
    pub timestamp: DateTime<Utc>,
    pub project: String,
    pub basket: String,
    /// Process-assigned id, generated once per classification session and
    /// stable for the life of the capsule
    pub record_id: String,
}

/// The canonical audit bundle.
///
/// Immutable once built; a later correction is a new capsule with a new
/// `record_id`, never a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditCapsule {
    pub version: u32,
    pub verification: Option<VerificationResult>,
    pub classification: Option<ClassificationResult>,
    pub evidence: Vec<EvidenceFile>,
    pub metadata: CapsuleMetadata,
}

/// Capsule encoding/decoding failures
#[derive(Debug, thiserror::Error)]
pub enum CapsuleError {
    #[error("capsule serialization failed: {0}")]
    Serialize(String),

    #[error("capsule payload is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("capsule payload has no version field")]
    MissingVersion,

    #[error("unsupported capsule version {0}")]
    UnsupportedVersion(u64),
}

impl AuditCapsule {
    /// Produce the canonical byte encoding (RFC 8785 JCS).
    ///
    /// This is the only encoding that gets sealed; decryption must
    /// reproduce it byte-for-byte for the round trip to validate.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CapsuleError> {
        let value = serde_json::to_value(self)?;
        let canonical = serde_json_canonicalizer::to_string(&value)
            .map_err(|e| CapsuleError::Serialize(e.to_string()))?;
        Ok(canonical.into_bytes())
    }

    /// Decode canonical bytes, dispatching on the version discriminator
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, CapsuleError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let version = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or(CapsuleError::MissingVersion)?;

        match version {
            1 => Ok(serde_json::from_value(value)?),
            other => Err(CapsuleError::UnsupportedVersion(other)),
        }
    }
}

/// Generate a fresh capsule record id
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// Non-sensitive metadata attached outside the encryption.
///
/// Carries only the identifiers needed for indexing; no capsule content is
/// duplicated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTags {
    #[serde(rename = "type")]
    pub tag_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lei: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
    pub record_id: String,
}

/// Tag defects that fail anchoring before encryption
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("public tag type must be {CLASSIFICATION_TAG_TYPE}, got {0}")]
    WrongType(String),

    #[error("public tags carry an empty record id")]
    EmptyRecordId,

    #[error("public tag timestamp is not RFC 3339: {0}")]
    BadTimestamp(String),
}

impl PublicTags {
    /// Derive indexing tags for a capsule
    pub fn for_capsule(capsule: &AuditCapsule, lei: Option<String>) -> Self {
        Self {
            tag_type: CLASSIFICATION_TAG_TYPE.to_string(),
            lei,
            jurisdiction: capsule
                .verification
                .as_ref()
                .and_then(|v| v.jurisdiction.clone()),
            timestamp: capsule
                .metadata
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            record_id: capsule.metadata.record_id.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), TagError> {
        if self.tag_type != CLASSIFICATION_TAG_TYPE {
            return Err(TagError::WrongType(self.tag_type.clone()));
        }
        if self.record_id.trim().is_empty() {
            return Err(TagError::EmptyRecordId);
        }
        if DateTime::parse_from_rfc3339(&self.timestamp).is_err() {
            return Err(TagError::BadTimestamp(self.timestamp.clone()));
        }
        Ok(())
    }
}

/// Result of one anchoring attempt.
///
/// `txid` is set only on broadcast success. `encrypted_hex` persists the
/// exact bytes anchored; later decryption replays these bytes, the capsule
/// is never reconstructed from the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchoringResult {
    pub success: bool,
    pub txid: Option<String>,
    pub basket: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_hex: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}

impl AnchoringResult {
    /// A failed attempt. Never carries a txid.
    pub fn failure(basket: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            txid: None,
            basket: basket.into(),
            timestamp: Utc::now(),
            block_number: None,
            confirmations: None,
            explorer_url: None,
            encrypted_hex: None,
            errors,
        }
    }

    /// A failure after encryption succeeded: keeps the sealed payload for
    /// a retry but still reports no txid.
    pub fn failure_with_payload(
        basket: impl Into<String>,
        encrypted_hex: String,
        errors: Vec<String>,
    ) -> Self {
        Self {
            encrypted_hex: Some(encrypted_hex),
            ..Self::failure(basket, errors)
        }
    }
}

/// Assembles audit capsules. Pure construction, no I/O.
#[derive(Debug, Clone)]
pub struct CapsuleBuilder {
    project: String,
    basket: String,
}

impl CapsuleBuilder {
    pub fn new(project: impl Into<String>, basket: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            basket: basket.into(),
        }
    }

    pub fn basket(&self) -> &str {
        &self.basket
    }

    /// Build a capsule at the current schema version
    pub fn build(
        &self,
        verification: Option<VerificationResult>,
        classification: Option<ClassificationResult>,
        evidence: Vec<EvidenceFile>,
        record_id: String,
    ) -> AuditCapsule {
        AuditCapsule {
            version: CAPSULE_VERSION,
            verification,
            classification,
            evidence,
            metadata: CapsuleMetadata {
                timestamp: Utc::now(),
                project: self.project.clone(),
                basket: self.basket.clone(),
                record_id,
            },
        }
    }
}
