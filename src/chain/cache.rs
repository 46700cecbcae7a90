//! Shared, rate-limited gateway to the external chain-data source.
//!
//! Exactly one [`ChainQueryCache`] lives per process; every caller obtains
//! it through the idempotent [`ChainQueryCache::shared`] accessor, so the
//! single rate limiter is never duplicated. Mined proofs are immutable and
//! cached with a TTL; unconfirmed answers are never cached. Concurrent
//! identical proof queries coalesce through a per-txid guard so the shared
//! rate budget is not spent redundantly.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::{validate_txid, ChainDataSource, ChainError, HttpChainSource, RateLimiter};
use crate::domain::MerkleProof;

// ============================================================================
// TTL LRU cache
// ============================================================================

/// A simple LRU cache with TTL support
pub struct LruCache<K, V> {
    max_entries: usize,
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    stats: CacheStats,
}

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    last_accessed: Instant,
}

/// Cache statistics
#[derive(Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries,
            ttl,
            entries: RwLock::new(HashMap::new()),
            stats: CacheStats::default(),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(key) {
            if entry.created_at.elapsed() > self.ttl {
                entries.remove(key);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            entry.last_accessed = Instant::now();
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Some(entry.value.clone());
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        let now = Instant::now();
        entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                last_accessed: now,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

// ============================================================================
// Chain query cache
// ============================================================================

/// Tuning knobs for the shared gateway
#[derive(Debug, Clone)]
pub struct ChainQueryConfig {
    /// Requests allowed per rate window
    pub rate_budget: u32,
    pub rate_window: Duration,
    pub proof_cache_entries: usize,
    pub proof_cache_ttl: Duration,
}

impl Default for ChainQueryConfig {
    fn default() -> Self {
        Self {
            rate_budget: 180,
            rate_window: Duration::from_secs(60),
            proof_cache_entries: 512,
            proof_cache_ttl: Duration::from_secs(600),
        }
    }
}

impl ChainQueryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rate_budget: std::env::var("CHAIN_RATE_BUDGET")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_budget),
            ..defaults
        }
    }
}

/// The single shared gateway to the chain-data source
pub struct ChainQueryCache {
    source: Arc<dyn ChainDataSource>,
    limiter: RateLimiter,
    proofs: LruCache<String, MerkleProof>,
    /// Per-txid guards coalescing concurrent identical proof queries
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

static SHARED: OnceLock<Arc<ChainQueryCache>> = OnceLock::new();

/// Default public chain API when CHAIN_API_URL is unset
const DEFAULT_CHAIN_API_URL: &str = "https://api.whatsonchain.com/v1/bsv/main";

impl ChainQueryCache {
    pub fn new(source: Arc<dyn ChainDataSource>, config: ChainQueryConfig) -> Self {
        Self {
            source,
            limiter: RateLimiter::new(config.rate_budget, config.rate_window),
            proofs: LruCache::new(config.proof_cache_entries, config.proof_cache_ttl),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide instance, lazily constructed from the environment.
    ///
    /// Construction races cannot create two instances: the first caller
    /// wins and every subsequent caller receives the same one.
    pub fn shared() -> Arc<Self> {
        Self::shared_with(|| {
            let base_url = std::env::var("CHAIN_API_URL")
                .unwrap_or_else(|_| DEFAULT_CHAIN_API_URL.to_string());
            Self::new(
                Arc::new(HttpChainSource::new(base_url)),
                ChainQueryConfig::from_env(),
            )
        })
    }

    /// [`ChainQueryCache::shared`] with a caller-supplied constructor for
    /// the first access. Used by server wiring and tests to control the
    /// underlying source; still guarantees a single instance.
    pub fn shared_with<F>(init: F) -> Arc<Self>
    where
        F: FnOnce() -> Self,
    {
        SHARED.get_or_init(|| Arc::new(init())).clone()
    }

    /// Resolve a txid to its SPV proof.
    ///
    /// `Ok(None)` means known-but-unconfirmed and is never cached; a mined
    /// proof is immutable and cached with a TTL. Overlapping identical
    /// queries serialize on a per-txid guard, so followers are answered
    /// from the cache the leader just filled.
    pub async fn get_merkle_proof(&self, txid: &str) -> Result<Option<MerkleProof>, ChainError> {
        validate_txid(txid)?;
        let key = txid.to_string();

        if let Some(proof) = self.proofs.get(&key).await {
            return Ok(Some(proof));
        }

        let guard = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let held = guard.lock().await;

        // A leader may have filled the cache while we waited
        let result = if let Some(proof) = self.proofs.get(&key).await {
            Ok(Some(proof))
        } else {
            match self.limiter.try_acquire() {
                Ok(()) => {
                    let fetched = self.source.merkle_proof(txid).await;
                    if let Ok(Some(ref proof)) = fetched {
                        debug!(%txid, block_height = proof.block_height, "caching merkle proof");
                        self.proofs.insert(key.clone(), proof.clone()).await;
                    }
                    fetched
                }
                Err(e) => Err(e),
            }
        };

        drop(held);
        drop(guard);
        let mut in_flight = self.in_flight.lock().await;
        if let Some(entry) = in_flight.get(&key) {
            // Last one out removes the guard
            if Arc::strong_count(entry) == 1 {
                in_flight.remove(&key);
            }
        }

        result
    }

    /// Current best block height, read fresh on every call.
    ///
    /// Height changes roughly every ten minutes, but confirmation math
    /// needs a live value; no caching here.
    pub async fn current_height(&self) -> Result<u64, ChainError> {
        self.limiter.try_acquire()?;
        self.source.chain_height().await
    }

    /// One confirmation-check round: proof first, then a fresh height, so
    /// the math never uses a height older than the proof being evaluated.
    pub async fn check_confirmation(
        &self,
        txid: &str,
    ) -> Result<(Option<MerkleProof>, u64), ChainError> {
        let proof = self.get_merkle_proof(txid).await?;
        let height = self.current_height().await?;
        Ok((proof, height))
    }

    /// Rate-budget slots left in the current window
    pub fn rate_budget_remaining(&self) -> u32 {
        self.limiter.remaining()
    }

    /// Proof cache statistics
    pub fn proof_cache_stats(&self) -> &CacheStats {
        self.proofs.stats()
    }
}
