//! Process-local cache of the active-snippet list.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 3600
//! ```
//!
//! Writers to the snippet store must call [`ActiveSnippetCache::invalidate`] after any
//! create, update, delete or activity toggle.

mod active;
mod config;
pub(crate) mod lock;

pub use active::{
    ActiveSnippetCache, METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_INVALIDATE_TOTAL,
    METRIC_CACHE_MISS_TOTAL,
};
pub use config::{CacheConfig, DEFAULT_TTL_SECS};
