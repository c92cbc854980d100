//! In-memory response store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use bytes::Bytes;
use dashmap::DashMap;

use crate::config::schema::CacheConfig;

/// A fully captured response. Immutable once stored.
#[derive(Debug)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub inserted: Instant,
    /// Snapshot generation the response was produced under.
    pub generation: u64,
}

impl CachedResponse {
    /// Create a new entry stamped with the current time.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes, generation: u64) -> Self {
        Self {
            status,
            headers,
            body,
            inserted: Instant::now(),
            generation,
        }
    }

    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted) >= ttl
    }
}

/// Shared TTL cache keyed by `METHOD host path?query`.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, Arc<CachedResponse>>,
    enabled: bool,
    ttl: Duration,
    max_entry_bytes: usize,
}

impl ResponseCache {
    /// Create a new cache from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            enabled: config.enabled,
            ttl: Duration::from_secs(config.ttl_secs),
            max_entry_bytes: config.max_entry_bytes,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_entry_bytes(&self) -> usize {
        self.max_entry_bytes
    }

    /// Look up a live entry produced under `generation`.
    ///
    /// Expired entries and entries left over from an older routing table
    /// are removed on the way.
    pub fn get(&self, key: &str, generation: u64) -> Option<Arc<CachedResponse>> {
        let entry = self.entries.get(key).map(|e| Arc::clone(e.value()))?;
        if entry.generation != generation || entry.is_expired(self.ttl, Instant::now()) {
            self.entries
                .remove_if(key, |_, current| Arc::ptr_eq(current, &entry));
            return None;
        }
        Some(entry)
    }

    /// Store an entry, replacing any previous one for the key.
    pub fn insert(&self, key: String, response: CachedResponse) {
        self.entries.insert(key, Arc::new(response));
    }

    /// Remove all expired entries and return how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(self.ttl, now));
        before.saturating_sub(self.entries.len())
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the cache key for a request.
pub fn cache_key(method: &Method, host: &str, uri: &Uri) -> String {
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{} {}{}", method, host.to_ascii_lowercase(), target)
}
