//! Bounded TTL response cache.
//!
//! # Responsibilities
//! - Hold the last successful response per (backend, method, params) key
//! - Enforce per-method TTLs and the maximum entry count
//! - Never return an expired entry; never store an error response

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

use crate::cache::fingerprint;
use crate::config::schema::{CacheConfig, CacheFullPolicy};
use crate::protocol::{RpcRequest, RpcResponse};

#[derive(Debug, Clone)]
struct CacheEntry {
    response: RpcResponse,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Aggregate cache counters, exposed through the gateway stats snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub rejected: u64,
}

/// Thread-safe TTL cache for successful responses.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    // Insertions are serialized so the entry-count bound holds under
    // concurrent stores; lookups stay lock-free.
    insert_lock: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    rejected: AtomicU64,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            insert_lock: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// TTL for a method, if it is cacheable at all.
    fn ttl(&self, method: &str) -> Option<Duration> {
        match self.config.method_ttl_secs.get(method) {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(*secs)),
        }
    }

    /// Look up a fresh cached response. Expired entries are reclaimed here
    /// and reported as misses.
    pub fn lookup(&self, backend: &str, request: &RpcRequest) -> Option<RpcResponse> {
        self.ttl(&request.method)?;

        let key = fingerprint::cache_key(backend, &request.method, &request.params);
        match self.entries.get(&key) {
            Some(entry) if !entry.is_expired() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.response.clone())
            }
            Some(entry) => {
                drop(entry);
                self.entries.remove(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a successful response. No-op for error responses and
    /// non-cacheable methods.
    pub fn store(&self, backend: &str, request: &RpcRequest, response: &RpcResponse) {
        if response.is_error() {
            return;
        }
        let Some(ttl) = self.ttl(&request.method) else {
            return;
        };

        let key = fingerprint::cache_key(backend, &request.method, &request.params);
        let entry = CacheEntry {
            response: response.clone(),
            expires_at: Instant::now() + ttl,
        };

        let _guard = self.insert_lock.lock().unwrap_or_else(|e| e.into_inner());

        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_entries {
            match self.config.full_policy {
                CacheFullPolicy::RejectNew => {
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, "Cache full, rejecting insert");
                    return;
                }
                CacheFullPolicy::EvictNearestExpiry => {
                    if let Some(victim) = self
                        .entries
                        .iter()
                        .min_by_key(|e| e.value().expires_at)
                        .map(|e| e.key().clone())
                    {
                        self.entries.remove(&victim);
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(evicted = %victim, "Cache full, evicted nearest-expiry entry");
                    }
                }
            }
        }

        self.entries.insert(key, entry);
        self.insertions.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop every entry (administrative cleanup).
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
