//! Chain-query cache behavior: singleton uniqueness, query coalescing,
//! rate budgeting and snapshot ordering.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use capsa_anchor::chain::{
    ChainDataSource, ChainError, ChainQueryCache, ChainQueryConfig,
};
use capsa_anchor::domain::MerkleProof;

use common::*;

/// Exactly one underlying instance, no matter how many tasks race the
/// first access. This is the only test in the binary that touches the
/// process-wide accessor.
#[tokio::test]
async fn test_singleton_accessor_constructs_once() {
    static CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            tokio::spawn(async {
                ChainQueryCache::shared_with(|| {
                    CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
                    ChainQueryCache::new(
                        Arc::new(ScriptedChainSource::confirmed_at(100, 105)),
                        ChainQueryConfig::default(),
                    )
                })
            })
        })
        .collect();

    let mut instances = Vec::new();
    for task in tasks {
        instances.push(task.await.unwrap());
    }

    assert_eq!(CONSTRUCTIONS.load(Ordering::SeqCst), 1);
    for instance in &instances[1..] {
        assert!(Arc::ptr_eq(&instances[0], instance));
    }
}

#[tokio::test]
async fn test_overlapping_identical_queries_spend_one_budget_slot() {
    // Slow source forces real overlap between the concurrent callers
    let source = Arc::new(ScriptedChainSource {
        delay_ms: 50,
        ..ScriptedChainSource::confirmed_at(100, 105)
    });
    let cache = Arc::new(ChainQueryCache::new(
        source.clone(),
        ChainQueryConfig::default(),
    ));

    let before = cache.rate_budget_remaining();
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_merkle_proof(&test_txid()).await })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_some());
    }

    assert_eq!(source.proof_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.rate_budget_remaining(), before - 1);
}

#[tokio::test]
async fn test_distinct_txids_do_not_coalesce() {
    let source = Arc::new(ScriptedChainSource::confirmed_at(100, 105));
    let cache = ChainQueryCache::new(source.clone(), ChainQueryConfig::default());

    cache.get_merkle_proof(&"ab".repeat(32)).await.unwrap();
    cache.get_merkle_proof(&"cd".repeat(32)).await.unwrap();
    assert_eq!(source.proof_calls.load(Ordering::SeqCst), 2);
}

/// Source that records the interleaving of proof and height calls.
struct OrderRecordingSource {
    calls: std::sync::Mutex<Vec<&'static str>>,
}

#[async_trait]
impl ChainDataSource for OrderRecordingSource {
    async fn merkle_proof(&self, txid: &str) -> Result<Option<MerkleProof>, ChainError> {
        self.calls.lock().unwrap().push("proof");
        Ok(Some(MerkleProof {
            txid: txid.to_string(),
            block_height: 100,
            merkle_root: "cd".repeat(32),
            path: vec![],
            index: 0,
        }))
    }

    async fn chain_height(&self) -> Result<u64, ChainError> {
        self.calls.lock().unwrap().push("height");
        Ok(105)
    }
}

#[tokio::test]
async fn test_confirmation_round_reads_proof_before_height() {
    let source = Arc::new(OrderRecordingSource {
        calls: std::sync::Mutex::new(Vec::new()),
    });
    let cache = ChainQueryCache::new(source.clone(), ChainQueryConfig::default());

    let (proof, height) = cache.check_confirmation(&test_txid()).await.unwrap();
    assert_eq!(proof.unwrap().block_height, 100);
    assert_eq!(height, 105);

    let calls = source.calls.lock().unwrap().clone();
    assert_eq!(calls, vec!["proof", "height"]);
}

#[tokio::test]
async fn test_rate_budget_exhaustion_is_typed() {
    let source = Arc::new(ScriptedChainSource::unconfirmed(105));
    let cache = ChainQueryCache::new(
        source,
        ChainQueryConfig {
            rate_budget: 2,
            ..Default::default()
        },
    );

    cache.get_merkle_proof(&test_txid()).await.unwrap();
    cache.current_height().await.unwrap();
    assert_eq!(
        cache.current_height().await.unwrap_err(),
        ChainError::RateLimited
    );
}

#[tokio::test]
async fn test_transport_failure_is_distinct_from_unconfirmed() {
    struct FailingSource;

    #[async_trait]
    impl ChainDataSource for FailingSource {
        async fn merkle_proof(&self, _txid: &str) -> Result<Option<MerkleProof>, ChainError> {
            Err(ChainError::Unavailable("connection reset".to_string()))
        }

        async fn chain_height(&self) -> Result<u64, ChainError> {
            Err(ChainError::Unavailable("connection reset".to_string()))
        }
    }

    let cache = ChainQueryCache::new(Arc::new(FailingSource), ChainQueryConfig::default());
    assert!(matches!(
        cache.get_merkle_proof(&test_txid()).await,
        Err(ChainError::Unavailable(_))
    ));
}
