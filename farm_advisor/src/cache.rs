//! Lock-free, read-mostly cache for record listings.
//!
//! Readers load an `Arc<HashMap<..>>` snapshot with no locking; writers swap
//! in a new map with `ArcSwap::rcu`. Concurrent writers never corrupt readers;
//! when two fetches for the same key race, the last insert wins.
//!
//! Every invalidation bumps a generation counter. A fetch that started before
//! an invalidation still returns its result but does not cache it.
//!
//! Keys are request fingerprints built by [`CacheKey::new`]: table, owning
//! user and the serialized query shape. Entries carry their own time-to-live
//! and are judged against an injected [`Clock`].

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use arc_swap::ArcSwap;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::clock::Clock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new<Q: Serialize>(table: &str, user_id: &str, query: &Q) -> Self {
        let shape = serde_json::to_string(query).unwrap_or_default();
        Self(format!("{}{shape}", Self::scope(table, user_id)))
    }

    /// Prefix shared by every key of one user's listings of `table`.
    pub fn scope(table: &str, user_id: &str) -> String {
        format!("{table}:{user_id}:")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct Entry<V> {
    value: Arc<V>,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

impl<V> Clone for Entry<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            stored_at: self.stored_at,
            ttl: self.ttl,
        }
    }
}

impl<V> Entry<V> {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.stored_at < self.ttl
    }
}

type Snapshot<V> = HashMap<CacheKey, Entry<V>>;

pub struct QueryCache<V> {
    entries: ArcSwap<Snapshot<V>>,
    generation: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl<V> QueryCache<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: ArcSwap::from_pointee(HashMap::new()),
            generation: AtomicU64::new(0),
            clock,
        }
    }

    /// Returns the cached value if it is younger than its TTL.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<V>> {
        let snap = self.entries.load();
        let entry = snap.get(key)?;
        entry
            .is_fresh(self.clock.now())
            .then(|| Arc::clone(&entry.value))
    }

    /// Stores `value` under `key`, dropping any expired entries on the way.
    pub fn insert(&self, key: CacheKey, value: V, ttl: Duration) -> Arc<V> {
        self.store(key, value, ttl, None)
    }

    /// Cached value for `key`, or the result of `fetch` (stored on success).
    pub async fn get_or_try_insert<F, Fut, E>(&self, key: CacheKey, ttl: Duration, fetch: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(&key) {
            tracing::debug!(key = key.as_str(), "Query cache hit");
            return Ok(hit);
        }
        let started = self.generation.load(Ordering::SeqCst);
        let value = fetch().await?;
        Ok(self.store(key, value, ttl, Some(started)))
    }

    // With `expected` set, the entry is only stored if no invalidation ran
    // since that generation. The check sits inside `rcu` so a concurrent
    // invalidation either removes the entry or forces a retry that skips it.
    fn store(&self, key: CacheKey, value: V, ttl: Duration, expected: Option<u64>) -> Arc<V> {
        let now = self.clock.now();
        let entry = Entry {
            value: Arc::new(value),
            stored_at: now,
            ttl,
        };
        self.entries.rcu(|current| {
            if expected.is_some_and(|g| g != self.generation.load(Ordering::SeqCst)) {
                return (**current).clone();
            }
            let mut next: Snapshot<V> = current
                .iter()
                .filter(|(_, e)| e.is_fresh(now))
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect();
            next.insert(key.clone(), entry.clone());
            next
        });
        entry.value
    }

    /// Drops every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.rcu(|current| {
            current
                .iter()
                .filter(|(k, _)| !k.as_str().starts_with(prefix))
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect::<Snapshot<V>>()
        });
    }

    /// Drops one user's cached listings of `table`.
    pub fn invalidate(&self, table: &str, user_id: &str) {
        self.invalidate_prefix(&CacheKey::scope(table, user_id));
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.store(Arc::new(HashMap::new()));
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
