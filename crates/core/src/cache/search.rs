//! Search cache operations.
//!
//! Provides functions for caching and retrieving upstream search payloads.

use super::clock::{Clock, SystemClock};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Default lifetime of a cached search payload (5 minutes).
pub const DEFAULT_TTL_SECONDS: i64 = 300;

/// Cached search payload with its expiry deadline.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub payload: Value,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// An entry is dead once `now` is strictly past its deadline.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

/// Process-wide search cache.
///
/// Reads and writes never hold a guard across an await point; an upsert is a
/// single map insert, so two concurrent fills of the same key simply race and
/// the last one wins.
#[derive(Debug)]
pub struct SearchCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECONDS), Arc::new(SystemClock))
    }
}

impl SearchCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { entries: DashMap::new(), ttl, clock }
    }

    /// Cache key for a search request.
    pub fn key(query: &str, page: &str) -> String {
        format!("{query}::{page}")
    }

    /// Get a live cached payload.
    ///
    /// Returns None if the key doesn't exist or has expired.
    pub fn get(&self, query: &str, page: &str) -> Option<Value> {
        let key = Self::key(query, page);
        let now = self.clock.now();
        self.entries
            .get(&key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.payload.clone())
    }

    /// Get the full entry, live or not.
    #[cfg(test)]
    fn entry(&self, query: &str, page: &str) -> Option<CacheEntry> {
        self.entries.get(&Self::key(query, page)).map(|entry| entry.clone())
    }

    /// Insert or replace a cached payload, stamping a fresh deadline.
    pub fn put(&self, query: &str, page: &str, payload: Value) {
        let fetched_at = self.clock.now();
        let expires_at = fetched_at.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = CacheEntry { payload, fetched_at, expires_at };
        self.entries.insert(Self::key(query, page), entry);
    }

    /// Delete expired entries.
    ///
    /// Returns the number of deleted entries.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
