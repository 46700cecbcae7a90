//! Audit log service.
//!
//! An append-only, in-memory event log over the lifecycle of each capsule:
//! verification, classification, anchoring, decryption. Insertion order is
//! chronological order; queries are pure projections. Decryption is served
//! by replaying the sealed payload stored with the anchoring event.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::anchor::{AnchoringCoordinator, DecryptError};
use crate::domain::{
    filter_events, AnchoringResult, AuditCapsule, AuditEvent, AuditEventFilter, AuditEventType,
};

/// Lookup failures distinct from decryption failures
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("no audit record with record id {0}")]
    RecordNotFound(String),

    #[error(transparent)]
    Decrypt(#[from] DecryptError),
}

pub struct AuditLogService {
    events: RwLock<Vec<AuditEvent>>,
    coordinator: Option<Arc<AnchoringCoordinator>>,
}

impl AuditLogService {
    pub fn new(coordinator: Option<Arc<AnchoringCoordinator>>) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            coordinator,
        }
    }

    /// Append one event. Writers hold the lock only for the push.
    pub async fn record(&self, event: AuditEvent) -> Uuid {
        let id = event.id;
        info!(event_type = %event.event_type, reference_id = %event.reference_id, "audit event recorded");
        self.events.write().await.push(event);
        id
    }

    /// Record an anchoring attempt against a capsule record
    pub async fn record_anchoring(
        &self,
        record_id: &str,
        result: &AnchoringResult,
        lei: Option<String>,
        said: Option<String>,
    ) -> Uuid {
        let description = if result.success {
            format!("capsule anchored in basket {}", result.basket)
        } else {
            format!("anchoring failed: {}", result.errors.join("; "))
        };

        let mut event = AuditEvent::new(AuditEventType::CapsuleAnchored, record_id, description);
        event.lei = lei;
        event.said = said;
        event.txid = result.txid.clone();
        event.encrypted_hex = result.encrypted_hex.clone();
        self.record(event).await
    }

    /// Snapshot of the full log, insertion order
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }

    /// Filtered snapshot; a pure, order-preserving projection
    pub async fn query(&self, filter: &AuditEventFilter) -> Vec<AuditEvent> {
        let events = self.events.read().await;
        filter_events(&events, filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Find the anchoring event for a capsule record
    pub async fn anchoring_event(&self, record_id: &str) -> Option<AuditEvent> {
        self.events
            .read()
            .await
            .iter()
            .rev()
            .find(|e| e.event_type == AuditEventType::CapsuleAnchored && e.reference_id == record_id)
            .cloned()
    }

    /// Decrypt a sealed payload on demand.
    ///
    /// Empty input is rejected here without touching the gateway; a
    /// missing wallet key is reported as key-unavailable, distinct from a
    /// corrupted payload.
    pub async fn decrypt_payload(&self, encrypted_hex: &str) -> Result<AuditCapsule, DecryptError> {
        if encrypted_hex.trim().is_empty() {
            return Err(DecryptError::EmptyInput);
        }
        let coordinator = self
            .coordinator
            .as_ref()
            .ok_or(DecryptError::KeyUnavailable)?;
        let capsule = coordinator.decrypt(encrypted_hex).await?;

        self.record(
            AuditEvent::new(
                AuditEventType::CapsuleDecrypted,
                capsule.metadata.record_id.clone(),
                "capsule decrypted on demand",
            ),
        )
        .await;

        Ok(capsule)
    }

    /// Decrypt the capsule anchored for a record id
    pub async fn decrypt_record(&self, record_id: &str) -> Result<AuditCapsule, AuditError> {
        let event = self
            .anchoring_event(record_id)
            .await
            .ok_or_else(|| AuditError::RecordNotFound(record_id.to_string()))?;
        let encrypted_hex = event.encrypted_hex.unwrap_or_default();
        Ok(self.decrypt_payload(&encrypted_hex).await?)
    }
}
