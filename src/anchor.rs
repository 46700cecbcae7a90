//! On-chain anchoring module.
//!
//! Orchestrates the encrypt → submit → record pipeline for audit capsules.
//! The cryptographic sealing and the transaction broadcast live behind the
//! [`AnchorGateway`] seam; the coordinator owns ordering and failure
//! reporting. A partial failure (sealed but not broadcast) keeps the
//! sealed payload for retry and never reports a txid.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::crypto::{self, EncryptionKey};
use crate::domain::{AnchoringResult, AuditCapsule, CapsuleError, PublicTags};

/// Failures inside the anchoring collaborator
#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    #[error("capsule encryption failed: {0}")]
    Encryption(String),

    #[error("transaction broadcast failed: {0}")]
    Broadcast(String),

    #[error("encrypted payload is not valid hex: {0}")]
    InvalidHex(String),

    #[error("encrypted payload is corrupted: {0}")]
    Corrupted(String),
}

/// Decryption failures, distinct so callers can present different
/// messages for each
#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[error("No encrypted data provided; the capsule can only be recovered by replaying its anchored payload")]
    EmptyInput,

    #[error("encrypted payload is corrupted or is not an audit capsule: {0}")]
    Corrupted(String),

    #[error("decryption key unavailable; configure the anchoring wallet to decrypt capsules")]
    KeyUnavailable,

    #[error("capsule uses an unsupported schema version {0}")]
    UnsupportedVersion(u64),
}

/// Encryption/broadcast collaborator boundary
#[async_trait]
pub trait AnchorGateway: Send + Sync {
    /// Seal canonical capsule bytes, returning hex for anchoring
    async fn encrypt(&self, plaintext: &[u8], tags: &PublicTags) -> Result<String, AnchorError>;

    /// Broadcast the sealed payload, returning the txid
    async fn submit(&self, encrypted_hex: &str) -> Result<String, AnchorError>;

    /// Open a sealed payload back into canonical capsule bytes
    async fn decrypt(&self, encrypted_hex: &str) -> Result<Vec<u8>, AnchorError>;
}

/// Anchoring configuration
#[derive(Debug, Clone)]
pub struct AnchorConfig {
    /// 64-hex AES-256 wallet key sealing capsule payloads
    pub wallet_key: EncryptionKey,
    /// Broadcast endpoint; None derives deterministic txids locally (dev)
    pub broadcast_url: Option<String>,
    /// Block-explorer base for result links
    pub explorer_base: Option<String>,
    /// Wallet basket the anchored records live in
    pub basket: String,
}

impl AnchorConfig {
    /// Load configuration from environment variables.
    ///
    /// `Ok(None)` when ANCHOR_WALLET_KEY is absent: the anchoring path is
    /// disabled and its routes report so. A key that is present but
    /// malformed is a configuration error surfaced immediately at startup,
    /// not deferred to the first anchoring attempt.
    pub fn from_env() -> Result<Option<Self>, crypto::EncryptionError> {
        let Ok(key_hex) = std::env::var("ANCHOR_WALLET_KEY") else {
            return Ok(None);
        };
        let wallet_key = crypto::key_from_hex(&key_hex)?;

        Ok(Some(Self {
            wallet_key,
            broadcast_url: std::env::var("ANCHOR_BROADCAST_URL").ok(),
            explorer_base: std::env::var("ANCHOR_EXPLORER_BASE").ok(),
            basket: std::env::var("ANCHOR_BASKET").unwrap_or_else(|_| "leicca-audit".to_string()),
        }))
    }
}

/// Local wallet gateway: AES-256-GCM sealing plus HTTP broadcast.
///
/// Without a broadcast URL the txid is derived deterministically from the
/// sealed payload (its double-SHA-256), matching how the chain would id a
/// transaction whose body is the payload.
pub struct WalletAnchorGateway {
    key: EncryptionKey,
    broadcast_url: Option<String>,
    http: reqwest::Client,
}

impl WalletAnchorGateway {
    pub fn new(config: &AnchorConfig) -> Self {
        Self {
            key: config.wallet_key,
            broadcast_url: config.broadcast_url.clone(),
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct BroadcastResponse {
    txid: String,
}

#[async_trait]
impl AnchorGateway for WalletAnchorGateway {
    async fn encrypt(&self, plaintext: &[u8], _tags: &PublicTags) -> Result<String, AnchorError> {
        let sealed = crypto::seal_capsule(&self.key, plaintext)
            .map_err(|e| AnchorError::Encryption(e.to_string()))?;
        Ok(hex::encode(sealed))
    }

    async fn submit(&self, encrypted_hex: &str) -> Result<String, AnchorError> {
        let payload =
            hex::decode(encrypted_hex).map_err(|e| AnchorError::InvalidHex(e.to_string()))?;

        match &self.broadcast_url {
            Some(url) => {
                let response = self
                    .http
                    .post(url)
                    .json(&serde_json::json!({ "hex": encrypted_hex }))
                    .send()
                    .await
                    .map_err(|e| AnchorError::Broadcast(e.to_string()))?;

                if !response.status().is_success() {
                    return Err(AnchorError::Broadcast(format!(
                        "broadcast endpoint returned status {}",
                        response.status()
                    )));
                }

                let body: BroadcastResponse = response
                    .json()
                    .await
                    .map_err(|e| AnchorError::Broadcast(format!("malformed response: {e}")))?;
                Ok(body.txid)
            }
            None => {
                let mut txid = crypto::double_sha256(&payload);
                txid.reverse();
                Ok(hex::encode(txid))
            }
        }
    }

    async fn decrypt(&self, encrypted_hex: &str) -> Result<Vec<u8>, AnchorError> {
        let sealed =
            hex::decode(encrypted_hex.trim()).map_err(|e| AnchorError::InvalidHex(e.to_string()))?;
        crypto::open_capsule(&self.key, &sealed).map_err(|e| AnchorError::Corrupted(e.to_string()))
    }
}

/// Orchestrates capsule anchoring and on-demand decryption
pub struct AnchoringCoordinator {
    gateway: Arc<dyn AnchorGateway>,
    basket: String,
    explorer_base: Option<String>,
}

impl AnchoringCoordinator {
    pub fn new(
        gateway: Arc<dyn AnchorGateway>,
        basket: impl Into<String>,
        explorer_base: Option<String>,
    ) -> Self {
        Self {
            gateway,
            basket: basket.into(),
            explorer_base,
        }
    }

    pub fn from_config(config: &AnchorConfig) -> Self {
        Self::new(
            Arc::new(WalletAnchorGateway::new(config)),
            config.basket.clone(),
            config.explorer_base.clone(),
        )
    }

    pub fn basket(&self) -> &str {
        &self.basket
    }

    fn explorer_url(&self, txid: &str) -> Option<String> {
        self.explorer_base
            .as_ref()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), txid))
    }

    /// Anchor a capsule: validate tags, canonicalize, seal, broadcast.
    ///
    /// Failures are reported inside the result rather than as an `Err`;
    /// every failure mode yields `success: false` with no txid.
    pub async fn anchor(&self, capsule: &AuditCapsule, tags: &PublicTags) -> AnchoringResult {
        if let Err(e) = tags.validate() {
            return AnchoringResult::failure(&self.basket, vec![e.to_string()]);
        }

        let canonical = match capsule.canonical_bytes() {
            Ok(bytes) => bytes,
            Err(e) => return AnchoringResult::failure(&self.basket, vec![e.to_string()]),
        };

        let encrypted_hex = match self.gateway.encrypt(&canonical, tags).await {
            Ok(hex) => hex,
            Err(e) => {
                warn!(record_id = %tags.record_id, error = %e, "capsule encryption failed");
                return AnchoringResult::failure(&self.basket, vec![e.to_string()]);
            }
        };

        let txid = match self.gateway.submit(&encrypted_hex).await {
            Ok(txid) => txid,
            Err(e) => {
                warn!(record_id = %tags.record_id, error = %e, "capsule broadcast failed");
                return AnchoringResult::failure_with_payload(
                    &self.basket,
                    encrypted_hex,
                    vec![e.to_string()],
                );
            }
        };

        info!(
            record_id = %tags.record_id,
            %txid,
            payload_bytes = encrypted_hex.len() / 2,
            "capsule anchored"
        );

        AnchoringResult {
            success: true,
            explorer_url: self.explorer_url(&txid),
            txid: Some(txid),
            basket: self.basket.clone(),
            timestamp: chrono::Utc::now(),
            block_number: None,
            confirmations: None,
            encrypted_hex: Some(encrypted_hex),
            errors: Vec::new(),
        }
    }

    /// Recover a capsule from its anchored payload.
    ///
    /// The empty-input case is decided here, before any collaborator call.
    pub async fn decrypt(&self, encrypted_hex: &str) -> Result<AuditCapsule, DecryptError> {
        if encrypted_hex.trim().is_empty() {
            return Err(DecryptError::EmptyInput);
        }

        let canonical = self
            .gateway
            .decrypt(encrypted_hex)
            .await
            .map_err(|e| DecryptError::Corrupted(e.to_string()))?;

        AuditCapsule::from_canonical_bytes(&canonical).map_err(|e| match e {
            CapsuleError::UnsupportedVersion(v) => DecryptError::UnsupportedVersion(v),
            other => DecryptError::Corrupted(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CapsuleBuilder, EvidenceFile};

    fn test_config() -> AnchorConfig {
        AnchorConfig {
            wallet_key: crypto::generate_key(),
            broadcast_url: None,
            explorer_base: Some("https://explorer.example".to_string()),
            basket: "test-basket".to_string(),
        }
    }

    fn test_capsule() -> AuditCapsule {
        CapsuleBuilder::new("leicca", "test-basket").build(
            None,
            None,
            vec![EvidenceFile::from_bytes("a.txt", "text/plain", b"bytes")],
            crate::domain::new_record_id(),
        )
    }

    /// Gateway that seals fine but cannot broadcast
    struct BrokenBroadcast {
        inner: WalletAnchorGateway,
    }

    #[async_trait]
    impl AnchorGateway for BrokenBroadcast {
        async fn encrypt(&self, plaintext: &[u8], tags: &PublicTags) -> Result<String, AnchorError> {
            self.inner.encrypt(plaintext, tags).await
        }

        async fn submit(&self, _encrypted_hex: &str) -> Result<String, AnchorError> {
            Err(AnchorError::Broadcast("connection refused".to_string()))
        }

        async fn decrypt(&self, encrypted_hex: &str) -> Result<Vec<u8>, AnchorError> {
            self.inner.decrypt(encrypted_hex).await
        }
    }

    #[tokio::test]
    async fn test_anchor_and_decrypt_roundtrip() {
        let coordinator = AnchoringCoordinator::from_config(&test_config());
        let capsule = test_capsule();
        let tags = PublicTags::for_capsule(&capsule, None);

        let result = coordinator.anchor(&capsule, &tags).await;
        assert!(result.success, "errors: {:?}", result.errors);
        assert!(result.txid.is_some());
        assert!(result
            .explorer_url
            .as_deref()
            .unwrap()
            .starts_with("https://explorer.example/tx/"));

        let recovered = coordinator
            .decrypt(result.encrypted_hex.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(recovered, capsule);
    }

    #[tokio::test]
    async fn test_invalid_tags_fail_before_encryption() {
        let coordinator = AnchoringCoordinator::from_config(&test_config());
        let capsule = test_capsule();
        let mut tags = PublicTags::for_capsule(&capsule, None);
        tags.record_id = String::new();

        let result = coordinator.anchor(&capsule, &tags).await;
        assert!(!result.success);
        assert!(result.txid.is_none());
        assert!(result.encrypted_hex.is_none());
    }

    #[tokio::test]
    async fn test_broadcast_failure_reports_no_txid() {
        let config = test_config();
        let coordinator = AnchoringCoordinator::new(
            Arc::new(BrokenBroadcast {
                inner: WalletAnchorGateway::new(&config),
            }),
            "test-basket",
            None,
        );
        let capsule = test_capsule();
        let tags = PublicTags::for_capsule(&capsule, None);

        let result = coordinator.anchor(&capsule, &tags).await;
        assert!(!result.success);
        assert!(result.txid.is_none());
        // The sealed payload is kept for retry
        assert!(result.encrypted_hex.is_some());
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_decrypt_empty_input_distinct() {
        let coordinator = AnchoringCoordinator::from_config(&test_config());
        assert!(matches!(
            coordinator.decrypt("   ").await.unwrap_err(),
            DecryptError::EmptyInput
        ));
    }

    #[tokio::test]
    async fn test_decrypt_corrupted_distinct() {
        let coordinator = AnchoringCoordinator::from_config(&test_config());
        assert!(matches!(
            coordinator.decrypt("not-hex!").await.unwrap_err(),
            DecryptError::Corrupted(_)
        ));
        assert!(matches!(
            coordinator.decrypt("deadbeef").await.unwrap_err(),
            DecryptError::Corrupted(_)
        ));
    }

    #[tokio::test]
    async fn test_deterministic_dev_txid() {
        let config = test_config();
        let gateway = WalletAnchorGateway::new(&config);
        let a = gateway.submit("deadbeef").await.unwrap();
        let b = gateway.submit("deadbeef").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
