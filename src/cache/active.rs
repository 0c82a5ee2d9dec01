use std::sync::{Arc, RwLock};
use std::time::Instant;

use metrics::counter;
use tracing::debug;

use crate::application::repos::{RepoError, SnippetsRepo};
use crate::domain::entities::Snippet;
use crate::domain::types::PublishStatus;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

pub const METRIC_CACHE_HIT_TOTAL: &str = "sniphook_cache_hit_total";
pub const METRIC_CACHE_MISS_TOTAL: &str = "sniphook_cache_miss_total";
pub const METRIC_CACHE_INVALIDATE_TOTAL: &str = "sniphook_cache_invalidate_total";

struct Entry {
    snippets: Arc<Vec<Snippet>>,
    stored_at: Instant,
}

#[derive(Default)]
struct Slot {
    /// Bumped by every invalidation. A load only publishes its result when the
    /// generation it started under is still current.
    generation: u64,
    entry: Option<Entry>,
}

/// Time-bounded cache of the active, published snippets in store order.
///
/// Constructed once per process and shared by reference between the dispatch path
/// and whatever writes to the store.
pub struct ActiveSnippetCache {
    repo: Arc<dyn SnippetsRepo>,
    config: CacheConfig,
    slot: RwLock<Slot>,
}

impl ActiveSnippetCache {
    pub fn new(repo: Arc<dyn SnippetsRepo>, config: CacheConfig) -> Self {
        Self {
            repo,
            config,
            slot: RwLock::new(Slot::default()),
        }
    }

    /// The active-snippet list, from cache when fresh.
    pub async fn get_active_snippets(&self) -> Result<Arc<Vec<Snippet>>, RepoError> {
        let generation = {
            let slot = rw_read(&self.slot, "get_active_snippets");
            if self.config.enabled
                && let Some(entry) = slot.entry.as_ref()
                && entry.stored_at.elapsed() < self.config.ttl
            {
                counter!(METRIC_CACHE_HIT_TOTAL).increment(1);
                return Ok(entry.snippets.clone());
            }
            slot.generation
        };

        counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
        let snippets = Arc::new(self.load().await?);

        if self.config.enabled {
            let mut slot = rw_write(&self.slot, "populate");
            if slot.generation == generation {
                slot.entry = Some(Entry {
                    snippets: snippets.clone(),
                    stored_at: Instant::now(),
                });
            } else {
                debug!(
                    target = "cache::active",
                    op = "populate",
                    result = "discarded",
                    "Cache invalidated during load; result not stored"
                );
            }
        }

        Ok(snippets)
    }

    /// Evict the cached list. Idempotent; every read that starts afterwards sees the store.
    pub fn invalidate(&self) {
        let mut slot = rw_write(&self.slot, "invalidate");
        slot.generation = slot.generation.wrapping_add(1);
        slot.entry = None;
        counter!(METRIC_CACHE_INVALIDATE_TOTAL).increment(1);
        debug!(
            target = "cache::active",
            op = "invalidate",
            generation = slot.generation,
            "Active-snippet cache invalidated"
        );
    }

    pub fn is_populated(&self) -> bool {
        rw_read(&self.slot, "is_populated").entry.is_some()
    }

    async fn load(&self) -> Result<Vec<Snippet>, RepoError> {
        let records = self.repo.list_published().await?;
        let snippets: Vec<Snippet> = records
            .iter()
            .filter(|record| record.status == PublishStatus::Publish && record.is_active())
            .map(|record| record.to_snippet())
            .collect();

        debug!(
            target = "cache::active",
            op = "load",
            records = records.len(),
            active = snippets.len(),
            "Loaded active snippets from store"
        );
        Ok(snippets)
    }
}
