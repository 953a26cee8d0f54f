//! Response cache for the remote yield service.
//!
//! The client depends on the `ResponseCache` trait so tests and callers can
//! inject their own store. `InMemoryResponseCache` is the default: a keyed
//! map with a TTL per entry and a bound on the number of entries.
//!
//! Eviction:
//! - lazily on read: an entry past `expires_at` is removed and reported absent
//! - eagerly on write: when the store is full and the key is new, the entry
//!   with the smallest `created_at` is removed first
//!
//! Every read-modify-write happens under one lock, and no lock is held
//! across an `.await`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::services::pvgis::RemoteServiceResponse;

/// Default maximum number of cached responses.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default time-to-live for a cached response (days).
pub const DEFAULT_TTL_DAYS: i64 = 30;

/// Upper bound accepted for a configured TTL (days).
pub const MAX_TTL_DAYS: i64 = 3650;

/// Key/value store for remote responses.
pub trait ResponseCache: Send + Sync + std::fmt::Debug {
    /// Live entry for `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> Option<RemoteServiceResponse>;

    /// Store `response` under `key` for `ttl`.
    fn set(&self, key: &str, response: RemoteServiceResponse, ttl: Duration);

    fn remove(&self, key: &str);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);

    /// Default TTL applied by the client when writing.
    fn default_ttl(&self) -> Duration;

    /// Maximum number of entries the store will hold.
    fn max_entries(&self) -> usize;
}

/// One cached remote response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub response: RemoteServiceResponse,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Insertion counter, breaks `created_at` ties when picking the oldest entry.
    #[serde(default)]
    pub sequence: u64,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Default)]
struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    next_sequence: u64,
}

/// Bounded in-memory cache with lazy TTL expiry.
#[derive(Debug)]
pub struct InMemoryResponseCache {
    store: RwLock<CacheStore>,
    max_entries: usize,
    default_ttl: Duration,
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, Duration::days(DEFAULT_TTL_DAYS))
    }
}

impl InMemoryResponseCache {
    /// `max_entries` of 0 is raised to 1.
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            store: RwLock::new(CacheStore::default()),
            max_entries: max_entries.max(1),
            default_ttl,
        }
    }

    // A poisoned lock only means another request panicked mid-operation;
    // every write leaves the map consistent, so keep serving it.
    fn read_store(&self) -> RwLockReadGuard<'_, CacheStore> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, CacheStore> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert with an explicit creation time.
    pub fn set_at(
        &self,
        key: &str,
        response: RemoteServiceResponse,
        ttl: Duration,
        now: DateTime<Utc>,
    ) {
        let mut store = self.write_store();

        if !store.entries.contains_key(key) && store.entries.len() >= self.max_entries {
            let oldest = store
                .entries
                .values()
                .min_by_key(|e| (e.created_at, e.sequence))
                .map(|e| e.key.clone());
            if let Some(oldest_key) = oldest {
                store.entries.remove(&oldest_key);
                tracing::debug!(
                    "Cache full ({}), evicted oldest entry {}",
                    self.max_entries,
                    oldest_key
                );
            }
        }

        let sequence = store.next_sequence;
        store.next_sequence += 1;
        store.entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                response,
                created_at: now,
                // A TTL past chrono's range never expires rather than overflowing.
                expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
                sequence,
            },
        );
    }

    /// Look up `key` as of `now`, removing it if expired.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<RemoteServiceResponse> {
        {
            let store = self.read_store();
            match store.entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired_at(now) => return Some(entry.response.clone()),
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock, a concurrent set may have refreshed it.
        let mut store = self.write_store();
        match store.entries.get(key) {
            Some(entry) if entry.is_expired_at(now) => {
                store.entries.remove(key);
                tracing::debug!("Cache entry {} expired, removed", key);
                None
            }
            Some(entry) => Some(entry.response.clone()),
            None => None,
        }
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self.read_store().entries.values().cloned().collect();
        entries.sort_by_key(|e| (e.created_at, e.sequence));
        entries
    }

    /// Write all live entries to `path` as JSON.
    pub fn save_snapshot(&self, path: &Path) -> std::io::Result<usize> {
        let now = Utc::now();
        let live: Vec<CacheEntry> = self
            .entries()
            .into_iter()
            .filter(|e| !e.is_expired_at(now))
            .collect();
        let json = serde_json::to_vec_pretty(&live)?;
        std::fs::write(path, json)?;
        Ok(live.len())
    }

    /// Build a cache from a snapshot written by `save_snapshot`.
    ///
    /// Expired entries are dropped; if the snapshot holds more live entries
    /// than `max_entries`, the oldest ones are evicted as they are replayed.
    pub fn load_snapshot(
        path: &Path,
        max_entries: usize,
        default_ttl: Duration,
    ) -> std::io::Result<Self> {
        let content = std::fs::read(path)?;
        let mut entries: Vec<CacheEntry> = serde_json::from_slice(&content)?;
        entries.sort_by_key(|e| (e.created_at, e.sequence));

        let cache = Self::new(max_entries, default_ttl);
        let now = Utc::now();
        for entry in entries.into_iter().filter(|e| !e.is_expired_at(now)) {
            let ttl = entry.expires_at - entry.created_at;
            cache.set_at(&entry.key, entry.response, ttl, entry.created_at);
        }
        Ok(cache)
    }
}

impl ResponseCache for InMemoryResponseCache {
    fn get(&self, key: &str) -> Option<RemoteServiceResponse> {
        self.get_at(key, Utc::now())
    }

    fn set(&self, key: &str, response: RemoteServiceResponse, ttl: Duration) {
        self.set_at(key, response, ttl, Utc::now());
    }

    fn remove(&self, key: &str) {
        self.write_store().entries.remove(key);
    }

    fn len(&self) -> usize {
        self.read_store().entries.len()
    }

    fn clear(&self) {
        self.write_store().entries.clear();
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn max_entries(&self) -> usize {
        self.max_entries
    }
}
