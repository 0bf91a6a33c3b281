use crate::models::{CachedEntity, EntityKind, Film, Person, SearchResultSet, StatsSnapshot};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{debug, info, warn};
use md5::{Digest, Md5};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Key/value port shared by the entity cache and the stats cache.
///
/// Every operation touches a single key and is atomic with respect to other
/// operations on that key. `add` only stores the value when the key is absent
/// or expired, and reports whether it did.
pub trait CacheStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<Value>;
    fn put(&self, key: &str, value: Value, ttl: Duration);
    fn has(&self, key: &str) -> bool;
    fn forget(&self, key: &str);
    fn add(&self, key: &str, value: Value, ttl: Duration) -> bool;
}

#[derive(Debug)]
struct StoreEntry {
    value: Value,
    expires_at: Instant,
}

// Fallback expiry for TTLs too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

impl StoreEntry {
    fn new(value: Value, ttl: Duration) -> Self {
        let now = Instant::now();

        Self {
            value,
            expires_at: now.checked_add(ttl).unwrap_or(now + FAR_FUTURE),
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
}

impl StoreStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;

        if total > 0 {
            self.hit_count as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// Process-local TTL store backed by a sharded concurrent map.
/// Expired entries are dropped lazily on access.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, StoreEntry>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> StoreStats {
        let expired_entries = self.entries.iter().filter(|e| e.is_expired()).count();

        StoreStats {
            total_entries: self.entries.len(),
            expired_entries,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let purged = before.saturating_sub(self.entries.len());

        if purged > 0 {
            debug!("Cache purged {purged} expired entries");
        }
        purged
    }

    /// Drops every entry, including the stats snapshot and its guard.
    pub fn flush(&self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        warn!("Cache flushed, {removed} entries removed");
        removed
    }
}

impl CacheStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                debug!("Cache HIT {key}");
                return Some(entry.value.clone());
            }
        }

        self.entries.remove_if(key, |_, entry| entry.is_expired());
        self.miss_count.fetch_add(1, Ordering::Relaxed);
        debug!("Cache MISS {key}");
        None
    }

    fn put(&self, key: &str, value: Value, ttl: Duration) {
        self.entries
            .insert(key.to_string(), StoreEntry::new(value, ttl));
        debug!("Cache PUT {key} (ttl {ttl:?})");
    }

    fn has(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    fn forget(&self, key: &str) {
        self.entries.remove(key);
        debug!("Cache FORGET {key}");
    }

    fn add(&self, key: &str, value: Value, ttl: Duration) -> bool {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(StoreEntry::new(value, ttl));
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoreEntry::new(value, ttl));
                true
            }
        }
    }
}

/// Trims and lowercases a search query. Used for cache keys, the upstream
/// filter parameter and the search log.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

fn decode<T: DeserializeOwned>(store: &dyn CacheStore, key: &str) -> Option<T> {
    let value = store.get(key)?;

    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("Dropping unreadable cache entry {key}: {e}");
            store.forget(key);
            None
        }
    }
}

fn encode<T: Serialize>(store: &dyn CacheStore, key: &str, value: &T, ttl: Duration) {
    match serde_json::to_value(value) {
        Ok(encoded) => store.put(key, encoded, ttl),
        Err(e) => warn!("Failed to encode cache entry {key}: {e}"),
    }
}

/// Read-through cache for catalog entities and search results.
#[derive(Debug, Clone)]
pub struct EntityCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl EntityCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// `person_42`, `film_3`
    pub fn entity_key(kind: EntityKind, id: u32) -> String {
        format!("{}_{id}", kind.as_str())
    }

    /// `search_people_<md5>`, `search_films_<md5>` over the normalized query
    pub fn search_key(kind: EntityKind, query: &str) -> String {
        let digest = Md5::digest(normalize_query(query).as_bytes());
        format!("search_{}_{}", kind.collection(), hex::encode(digest))
    }

    pub fn get_entity(&self, kind: EntityKind, id: u32) -> Option<CachedEntity> {
        let key = Self::entity_key(kind, id);
        let entity: CachedEntity = decode(self.store.as_ref(), &key)?;

        if entity.kind() != kind || entity.id() != id {
            warn!(
                "Cache entry {key} holds {} {}, discarding",
                entity.kind(),
                entity.id()
            );
            self.store.forget(&key);
            return None;
        }

        Some(entity)
    }

    pub fn get_person(&self, id: u32) -> Option<Person> {
        match self.get_entity(EntityKind::Person, id)? {
            CachedEntity::Person(person) => Some(person),
            CachedEntity::Film(_) => None,
        }
    }

    pub fn get_film(&self, id: u32) -> Option<Film> {
        match self.get_entity(EntityKind::Film, id)? {
            CachedEntity::Film(film) => Some(film),
            CachedEntity::Person(_) => None,
        }
    }

    pub fn put_entity(&self, entity: &CachedEntity) {
        let key = Self::entity_key(entity.kind(), entity.id());
        encode(self.store.as_ref(), &key, entity, self.ttl);
    }

    pub fn put_person(&self, person: &Person) {
        self.put_entity(&CachedEntity::Person(person.clone()));
    }

    pub fn put_film(&self, film: &Film) {
        self.put_entity(&CachedEntity::Film(film.clone()));
    }

    pub fn get_search(&self, kind: EntityKind, query: &str) -> Option<SearchResultSet> {
        decode(self.store.as_ref(), &Self::search_key(kind, query))
    }

    /// Degraded result sets are never stored.
    pub fn put_search(&self, kind: EntityKind, query: &str, results: &SearchResultSet) {
        if results.is_degraded() {
            return;
        }
        encode(
            self.store.as_ref(),
            &Self::search_key(kind, query),
            results,
            self.ttl,
        );
    }
}

pub const STATS_CACHE_KEY: &str = "stats_cache";
pub const STATS_CALCULATING_KEY: &str = "stats_cache_calculating";

/// Latest stats snapshot plus the "calculating" guard, as two independent
/// entries of the shared store.
#[derive(Debug, Clone)]
pub struct StatsCache {
    store: Arc<dyn CacheStore>,
    snapshot_ttl: Duration,
    calculating_ttl: Duration,
}

impl StatsCache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        snapshot_ttl: Duration,
        calculating_ttl: Duration,
    ) -> Self {
        Self {
            store,
            snapshot_ttl,
            calculating_ttl,
        }
    }

    pub fn get(&self) -> Option<StatsSnapshot> {
        decode(self.store.as_ref(), STATS_CACHE_KEY)
    }

    pub fn has(&self) -> bool {
        self.store.has(STATS_CACHE_KEY)
    }

    pub fn put(&self, snapshot: &StatsSnapshot) {
        encode(self.store.as_ref(), STATS_CACHE_KEY, snapshot, self.snapshot_ttl);
        info!(
            "Stats snapshot cached ({} searches, generated {})",
            snapshot.general.total_searches, snapshot.generated_at
        );
    }

    pub fn is_calculating(&self) -> bool {
        self.store.has(STATS_CALCULATING_KEY)
    }

    /// Sets the guard only if it is not already held.
    pub(crate) fn try_mark_calculating(&self) -> bool {
        self.store
            .add(STATS_CALCULATING_KEY, Value::Bool(true), self.calculating_ttl)
    }

    /// Sets or extends the guard unconditionally.
    pub(crate) fn mark_calculating(&self) {
        self.store
            .put(STATS_CALCULATING_KEY, Value::Bool(true), self.calculating_ttl);
    }

    pub(crate) fn mark_calculated(&self) {
        self.store.forget(STATS_CALCULATING_KEY);
    }
}
