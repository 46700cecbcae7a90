//! Chain-query layer: the shared rate-limited gateway to the external
//! chain-data source and the confirmation policy derived from it.

mod cache;
mod confirmation;
mod rate_limit;
mod source;

pub use cache::{CacheStats, ChainQueryCache, ChainQueryConfig, LruCache};
pub use confirmation::{
    confirmations, ConfirmationPolicy, ConfirmationTracker, TxStatus, CONFIRMATION_THRESHOLD,
};
pub use rate_limit::RateLimiter;
pub use source::{validate_txid, ChainDataSource, ChainError, HttpChainSource};
