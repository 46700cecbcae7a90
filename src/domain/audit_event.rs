//! Audit log entry types and pure filtering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle stages recorded in the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    CredentialVerified,
    ClassificationCompleted,
    CapsuleAnchored,
    CapsuleDecrypted,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditEventType::CredentialVerified => write!(f, "credential_verified"),
            AuditEventType::ClassificationCompleted => write!(f, "classification_completed"),
            AuditEventType::CapsuleAnchored => write!(f, "capsule_anchored"),
            AuditEventType::CapsuleDecrypted => write!(f, "capsule_decrypted"),
        }
    }
}

/// One append-only audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: Uuid,
    pub event_type: AuditEventType,
    /// Capsule record id this entry refers to
    pub reference_id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lei: Option<String>,
    /// SAID of the verified credential, when one was involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub said: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    /// Sealed capsule bytes for anchored entries; replayed for decryption
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_hex: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        event_type: AuditEventType,
        reference_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            reference_id: reference_id.into(),
            description: description.into(),
            lei: None,
            said: None,
            txid: None,
            encrypted_hex: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_lei(mut self, lei: impl Into<String>) -> Self {
        self.lei = Some(lei.into());
        self
    }

    pub fn with_said(mut self, said: impl Into<String>) -> Self {
        self.said = Some(said.into());
        self
    }

    pub fn with_txid(mut self, txid: impl Into<String>) -> Self {
        self.txid = Some(txid.into());
        self
    }

    pub fn with_encrypted_hex(mut self, hex: impl Into<String>) -> Self {
        self.encrypted_hex = Some(hex.into());
        self
    }
}

/// Query filters for the audit log
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEventFilter {
    /// Exact event type match
    pub event_type: Option<AuditEventType>,
    /// Inclusive lower bound
    pub date_start: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub date_end: Option<DateTime<Utc>>,
    /// Case-insensitive substring over reference id, description, LEI and
    /// SAID (OR across fields)
    pub search: Option<String>,
}

/// Apply a filter as a pure, order-preserving projection.
///
/// Never reorders or deduplicates events.
pub fn filter_events<'a>(events: &'a [AuditEvent], filter: &AuditEventFilter) -> Vec<&'a AuditEvent> {
    let needle = filter.search.as_ref().map(|s| s.to_lowercase());

    events
        .iter()
        .filter(|e| {
            if let Some(ref t) = filter.event_type {
                if e.event_type != *t {
                    return false;
                }
            }
            if let Some(start) = filter.date_start {
                if e.recorded_at < start {
                    return false;
                }
            }
            if let Some(end) = filter.date_end {
                if e.recorded_at > end {
                    return false;
                }
            }
            if let Some(ref needle) = needle {
                let matches = e.reference_id.to_lowercase().contains(needle)
                    || e.description.to_lowercase().contains(needle)
                    || e.lei
                        .as_ref()
                        .is_some_and(|l| l.to_lowercase().contains(needle))
                    || e.said
                        .as_ref()
                        .is_some_and(|s| s.to_lowercase().contains(needle));
                if !matches {
                    return false;
                }
            }
            true
        })
        .collect()
}
