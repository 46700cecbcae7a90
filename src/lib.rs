//! Capsa Anchor Library
//!
//! Tamper-evident, blockchain-anchored audit records for a legal-entity
//! verification-and-classification workflow: verify a credential, run a
//! jurisdiction rule tree, bundle the results with evidence hashes into a
//! canonical capsule, seal it and anchor it in a public ledger
//! transaction, then prove finality via SPV confirmations and decrypt the
//! bundle on demand.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (capsules, panels, proofs, audit events)
//! - [`crypto`] - Hashing, SPV Merkle verification, capsule sealing
//! - [`classify`] - Decision-tree classification engine and panel registry
//! - [`chain`] - Shared rate-limited chain-query cache and confirmation policy
//! - [`anchor`] - Anchoring coordinator and wallet gateway
//! - [`audit`] - Append-only audit log with on-demand decryption
//! - [`api`] - REST API routes
//! - [`telemetry`] - Tracing setup

pub mod anchor;
pub mod api;
pub mod audit;
pub mod chain;
pub mod classify;
pub mod crypto;
pub mod domain;
pub mod server;
pub mod telemetry;

// Re-export commonly used types
pub use chain::{
    ChainDataSource, ChainError, ChainQueryCache, ChainQueryConfig, ConfirmationPolicy,
    ConfirmationTracker, TxStatus, CONFIRMATION_THRESHOLD,
};
pub use domain::{
    AnchoringResult, AuditCapsule, AuditEvent, BlockConfirmation, CapsuleBuilder,
    ClassificationResult, EvidenceFile, MerkleProof, Panel, PublicTags, TemporalProof,
    VerificationResult, CAPSULE_VERSION,
};
