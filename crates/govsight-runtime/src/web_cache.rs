//! In-memory TTL cache for web search results.
//!
//! Keyed by provider, query and result count. Expired entries are evicted
//! lazily on `get`. A zero TTL turns the cache into a passthrough.

use crate::web_search::SearchResults;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct CacheEntry {
    results: SearchResults,
    inserted_at: Instant,
}

/// Thread-safe search result cache.
pub struct SearchCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Cache key for a query. Case and surrounding whitespace are ignored.
    pub fn key(provider: &str, query: &str, max_results: usize) -> String {
        format!(
            "{provider}:{max_results}:{}",
            query.trim().to_lowercase()
        )
    }

    pub fn get(&self, key: &str) -> Option<SearchResults> {
        if self.ttl.is_zero() {
            return None;
        }
        let entry = self.entries.get(key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            drop(entry); // release the shard lock before removing
            self.entries.remove(key);
            None
        } else {
            Some(entry.results.clone())
        }
    }

    pub fn put(&self, key: String, results: SearchResults) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(
            key,
            CacheEntry {
                results,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry.
    pub fn evict_expired(&self) {
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() <= self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
