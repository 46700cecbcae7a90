//! External chain-data source boundary.
//!
//! The source is rate-limited and may fail transiently; all access goes
//! through the shared [`crate::chain::ChainQueryCache`], never directly.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::domain::MerkleProof;

/// Chain query failures.
///
/// An unconfirmed transaction is NOT an error: `get_merkle_proof` reports
/// it as `Ok(None)`. `TxNotFound` means the chain has never seen the txid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("malformed txid: {0}")]
    InvalidTxid(String),

    #[error("transaction not found: {0}")]
    TxNotFound(String),

    #[error("chain data source unavailable: {0}")]
    Unavailable(String),

    #[error("chain query rate budget exhausted")]
    RateLimited,
}

/// Check the 64-hex txid shape before spending rate budget on it
pub fn validate_txid(txid: &str) -> Result<(), ChainError> {
    if txid.len() == 64 && txid.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ChainError::InvalidTxid(txid.to_string()))
    }
}

/// The external chain-data collaborator
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    /// Fetch the SPV proof for a transaction.
    ///
    /// `Ok(None)` means the transaction exists but has not entered a block
    /// yet, a normal state distinct from not-found and from failure.
    async fn merkle_proof(&self, txid: &str) -> Result<Option<MerkleProof>, ChainError>;

    /// Current best block height
    async fn chain_height(&self) -> Result<u64, ChainError>;
}

#[derive(Debug, Deserialize)]
struct HeightResponse {
    height: u64,
}

/// HTTP implementation against a WhatsOnChain-style REST API.
///
/// Expected endpoints:
/// - `GET {base}/tx/{txid}/proof` returns proof JSON, `null` while
///   unconfirmed, 404 when unknown
/// - `GET {base}/chain/height` returns `{"height": n}`
pub struct HttpChainSource {
    base_url: String,
    http: reqwest::Client,
}

impl HttpChainSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChainDataSource for HttpChainSource {
    async fn merkle_proof(&self, txid: &str) -> Result<Option<MerkleProof>, ChainError> {
        let url = format!("{}/tx/{}/proof", self.base_url, txid);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ChainError::TxNotFound(txid.to_string()));
        }
        if !response.status().is_success() {
            warn!(status = %response.status(), %url, "chain source returned error status");
            return Err(ChainError::Unavailable(format!(
                "proof request failed with status {}",
                response.status()
            )));
        }

        // The source answers `null` for known-but-unconfirmed transactions
        let proof: Option<MerkleProof> = response
            .json()
            .await
            .map_err(|e| ChainError::Unavailable(format!("malformed proof response: {e}")))?;
        Ok(proof)
    }

    async fn chain_height(&self) -> Result<u64, ChainError> {
        let url = format!("{}/chain/height", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChainError::Unavailable(format!(
                "height request failed with status {}",
                response.status()
            )));
        }

        let height: HeightResponse = response
            .json()
            .await
            .map_err(|e| ChainError::Unavailable(format!("malformed height response: {e}")))?;
        Ok(height.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_txid() {
        assert!(validate_txid(&"ab".repeat(32)).is_ok());
        assert!(validate_txid(&"AB".repeat(32)).is_ok());
        assert_eq!(
            validate_txid("abc"),
            Err(ChainError::InvalidTxid("abc".to_string()))
        );
        assert!(validate_txid(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let source = HttpChainSource::new("https://chain.example/v1/");
        assert_eq!(source.base_url, "https://chain.example/v1");
    }
}
