//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use capsa_anchor::anchor::{AnchorConfig, AnchoringCoordinator};
use capsa_anchor::audit::AuditLogService;
use capsa_anchor::chain::{
    ChainDataSource, ChainError, ChainQueryCache, ChainQueryConfig, ConfirmationPolicy,
    ConfirmationTracker,
};
use capsa_anchor::classify::PanelRegistry;
use capsa_anchor::domain::{
    CapsuleBuilder, MerkleProof, Node, NodeKind, Outcome, Panel, SelectOption, StubVerifier,
};
use capsa_anchor::server::AppState;

/// A txid that the scripted chain source recognizes
pub fn test_txid() -> String {
    "ab".repeat(32)
}

/// Chain source with scripted answers and call counters
pub struct ScriptedChainSource {
    pub proof: Option<MerkleProof>,
    pub height: u64,
    /// Report TxNotFound instead of answering
    pub unknown_tx: bool,
    pub proof_calls: AtomicUsize,
    pub height_calls: AtomicUsize,
    /// Artificial latency to force query overlap in coalescing tests
    pub delay_ms: u64,
}

impl ScriptedChainSource {
    pub fn confirmed_at(block_height: u64, height: u64) -> Self {
        Self {
            proof: Some(MerkleProof {
                txid: test_txid(),
                block_height,
                merkle_root: "cd".repeat(32),
                path: vec![],
                index: 0,
            }),
            height,
            unknown_tx: false,
            proof_calls: AtomicUsize::new(0),
            height_calls: AtomicUsize::new(0),
            delay_ms: 0,
        }
    }

    pub fn unconfirmed(height: u64) -> Self {
        Self {
            proof: None,
            ..Self::confirmed_at(0, height)
        }
    }

    pub fn unknown(height: u64) -> Self {
        Self {
            unknown_tx: true,
            ..Self::unconfirmed(height)
        }
    }
}

#[async_trait]
impl ChainDataSource for ScriptedChainSource {
    async fn merkle_proof(&self, txid: &str) -> Result<Option<MerkleProof>, ChainError> {
        self.proof_calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.unknown_tx {
            return Err(ChainError::TxNotFound(txid.to_string()));
        }
        Ok(self.proof.clone())
    }

    async fn chain_height(&self) -> Result<u64, ChainError> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.height)
    }
}

/// A small two-jurisdiction demo panel
pub fn demo_panel() -> Panel {
    Panel {
        id: "eu-entity".to_string(),
        jurisdiction_codes: vec!["DE".to_string(), "FR".to_string()],
        start_node_id: "start".to_string(),
        nodes: vec![
            Node {
                id: "start".to_string(),
                node_text: "Classification of the legal entity".to_string(),
                kind: NodeKind::Start {
                    continue_target: "form".to_string(),
                },
            },
            Node {
                id: "form".to_string(),
                node_text: "What is the entity's legal form?".to_string(),
                kind: NodeKind::Select {
                    select_options: vec![
                        SelectOption {
                            id: "corp".to_string(),
                            text: "Corporation".to_string(),
                            next_node_id: "regulated".to_string(),
                        },
                        SelectOption {
                            id: "fund".to_string(),
                            text: "Investment fund".to_string(),
                            next_node_id: "fund-end".to_string(),
                        },
                    ],
                },
            },
            Node {
                id: "regulated".to_string(),
                node_text: "Is the entity prudentially regulated?".to_string(),
                kind: NodeKind::Question {
                    yes_target: "fe-end".to_string(),
                    no_target: "nfe-end".to_string(),
                },
            },
            Node {
                id: "fund-end".to_string(),
                node_text: "Outcome".to_string(),
                kind: NodeKind::End {
                    outcome: Outcome {
                        classification: "FE-FUND".to_string(),
                        category: "Financial Entity".to_string(),
                        description: "Collective investment vehicle".to_string(),
                    },
                },
            },
            Node {
                id: "fe-end".to_string(),
                node_text: "Outcome".to_string(),
                kind: NodeKind::End {
                    outcome: Outcome {
                        classification: "FE-REG".to_string(),
                        category: "Financial Entity".to_string(),
                        description: "Prudentially regulated corporation".to_string(),
                    },
                },
            },
            Node {
                id: "nfe-end".to_string(),
                node_text: "Outcome".to_string(),
                kind: NodeKind::End {
                    outcome: Outcome {
                        classification: "NFE-IGE".to_string(),
                        category: "Non-Financial Entity".to_string(),
                        description: "Unregulated general entity".to_string(),
                    },
                },
            },
        ],
    }
}

/// Anchoring coordinator over a random local wallet key
pub fn test_coordinator() -> Arc<AnchoringCoordinator> {
    Arc::new(AnchoringCoordinator::from_config(&AnchorConfig {
        wallet_key: capsa_anchor::crypto::generate_key(),
        broadcast_url: None,
        explorer_base: Some("https://explorer.test".to_string()),
        basket: "test-basket".to_string(),
    }))
}

/// Full application state over a scripted chain source.
///
/// Uses a direct constructor, not the process-wide accessor, so tests stay
/// independent of each other.
pub fn test_state(source: Arc<ScriptedChainSource>, with_anchor: bool) -> AppState {
    let coordinator = with_anchor.then(test_coordinator);

    let mut panels = PanelRegistry::new();
    panels.insert(demo_panel()).unwrap();

    AppState {
        chain: Arc::new(ChainQueryCache::new(source, ChainQueryConfig::default())),
        tracker: Arc::new(ConfirmationTracker::new(ConfirmationPolicy::default())),
        audit: Arc::new(AuditLogService::new(coordinator.clone())),
        coordinator,
        panels: Arc::new(panels),
        builder: Arc::new(CapsuleBuilder::new("leicca", "test-basket")),
        verifier: Arc::new(StubVerifier),
    }
}

/// Router bound to a test state
pub fn test_app(state: AppState) -> axum::Router {
    capsa_anchor::api::router().with_state(state)
}
