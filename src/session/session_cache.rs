//! Single-flight cache of compiled query sessions.
//!
//! Cache key: (data source, entity set, join description, backend, dialect, page limits)
//! Cache value: `Arc<QuerySession>`, shared read-only by every caller
//!
//! At most one thread builds a given key. Concurrent requesters for the same key block on
//! that key's slot and reuse the result once it lands. A failed build leaves the slot empty,
//! so the next requester builds again. Entries are evicted least-recently-used once
//! `max_entries` is reached; a slot some caller still holds is never evicted, so the cache
//! may run over capacity while builds are in flight.
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::QuerySession;
use crate::config::CompilerConfig;
use crate::join_catalog::{
    DataSourceHandle, EntityRef, JoinCatalogError, JoinDescription, NodeLoader,
};
use crate::query_generator::{BackendKind, DialectKind, PageLimits};

/// Structural cache key. It carries every input of [`QuerySession::build`] except the
/// loader, so two keys are equal only when they would build the same session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub source: DataSourceHandle,
    pub entities: BTreeSet<EntityRef>,
    pub description: JoinDescription,
    pub backend: BackendKind,
    pub dialect: DialectKind,
    pub limits: PageLimits,
}

impl SessionKey {
    pub fn new(
        source: DataSourceHandle,
        description: JoinDescription,
        backend: BackendKind,
        dialect: DialectKind,
        limits: PageLimits,
    ) -> Self {
        let entities = description.entities().into_iter().cloned().collect();
        SessionKey {
            source,
            entities,
            description,
            backend,
            dialect,
            limits,
        }
    }
}

type Slot = Arc<Mutex<Option<Arc<QuerySession>>>>;

#[derive(Debug)]
struct CacheEntry {
    slot: Slot,
    last_accessed: u64,
}

impl CacheEntry {
    /// No caller holds the slot: nobody is building, waiting on or reading it
    fn is_idle(&self) -> bool {
        Arc::strong_count(&self.slot) == 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for SessionCacheConfig {
    fn default() -> Self {
        SessionCacheConfig {
            enabled: true,
            max_entries: 256,
        }
    }
}

impl From<&CompilerConfig> for SessionCacheConfig {
    fn from(config: &CompilerConfig) -> Self {
        SessionCacheConfig {
            enabled: config.cache_enabled,
            max_entries: config.cache_max_entries,
        }
    }
}

#[derive(Debug)]
pub struct SessionCache {
    entries: Mutex<HashMap<SessionKey, CacheEntry>>,
    config: SessionCacheConfig,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
    evictions: AtomicU64,
}

impl SessionCache {
    pub fn new(config: SessionCacheConfig) -> Self {
        SessionCache {
            entries: Mutex::new(HashMap::new()),
            config,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SessionCacheConfig::default())
    }

    /// Cache sized and switched by the compiler configuration
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(SessionCacheConfig::from(config))
    }

    pub fn config(&self) -> &SessionCacheConfig {
        &self.config
    }

    /// Return the cached session for `key`, building it with `build` if absent
    pub fn get_or_build<F, E>(&self, key: &SessionKey, build: F) -> Result<Arc<QuerySession>, E>
    where
        F: FnOnce() -> Result<QuerySession, E>,
    {
        if !self.config.enabled {
            self.builds.fetch_add(1, Ordering::Relaxed);
            return build().map(Arc::new);
        }

        let slot = self.slot_for(key);
        let mut guard = lock(&slot);
        if let Some(session) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(session));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(build()?);
        self.builds.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "built session for `{}` ({} backend, {}, source `{}`)",
            key.description.root,
            key.backend,
            key.dialect,
            key.source.name
        );
        *guard = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Return the cached session for `key`, loading its nodes through `loader` if absent
    pub fn get_or_load<L: NodeLoader + ?Sized>(
        &self,
        loader: &L,
        key: &SessionKey,
    ) -> Result<Arc<QuerySession>, JoinCatalogError> {
        self.get_or_build(key, || {
            QuerySession::build(
                loader,
                &key.source,
                &key.description,
                key.dialect,
                key.limits,
            )
        })
    }

    /// Cached session without building
    pub fn get(&self, key: &SessionKey) -> Option<Arc<QuerySession>> {
        if !self.config.enabled {
            return None;
        }
        let slot = {
            let entries = lock(&self.entries);
            Arc::clone(&entries.get(key)?.slot)
        };
        let session = lock(&slot).clone();
        if session.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        session
    }

    fn slot_for(&self, key: &SessionKey) -> Slot {
        let now = self.clock.fetch_add(1, Ordering::Relaxed);
        let mut entries = lock(&self.entries);
        if let Some(entry) = entries.get_mut(key) {
            entry.last_accessed = now;
            return Arc::clone(&entry.slot);
        }
        let capacity = self.config.max_entries.max(1);
        while entries.len() >= capacity {
            if !self.evict_lru(&mut entries) {
                log::debug!(
                    "session cache over capacity ({} entries): every slot is in use",
                    entries.len()
                );
                break;
            }
        }
        let slot: Slot = Arc::new(Mutex::new(None));
        entries.insert(
            key.clone(),
            CacheEntry {
                slot: Arc::clone(&slot),
                last_accessed: now,
            },
        );
        slot
    }

    /// Evict the least recently used idle entry. Returns false when every entry is in use.
    fn evict_lru(&self, entries: &mut HashMap<SessionKey, CacheEntry>) -> bool {
        let victim = entries
            .iter()
            .filter(|(_, entry)| entry.is_idle())
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone());
        match victim {
            Some(key) => {
                entries.remove(&key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                log::debug!("evicted session for `{}`", key.description.root);
                true
            }
            None => false,
        }
    }

    pub fn invalidate(&self, key: &SessionKey) {
        self.invalidate_where(|k| k == key);
    }

    /// Drop every session that involves `entity`, e.g. after its metadata changed
    pub fn invalidate_entity(&self, entity: &EntityRef) {
        self.invalidate_where(|key| key.entities.contains(entity));
    }

    pub fn clear(&self) {
        self.invalidate_where(|_| true);
    }

    /// Idle entries are removed outright. Busy ones keep their slot, so requesters still
    /// queue behind the running build, and are emptied once that build lands.
    fn invalidate_where<P: Fn(&SessionKey) -> bool>(&self, matches: P) {
        let busy: Vec<Slot> = {
            let mut entries = lock(&self.entries);
            let mut busy = Vec::new();
            entries.retain(|key, entry| {
                if !matches(key) {
                    return true;
                }
                if entry.is_idle() {
                    return false;
                }
                busy.push(Arc::clone(&entry.slot));
                true
            });
            busy
        };
        for slot in busy {
            *lock(&slot) = None;
        }
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: lock(&self.entries).len(),
            max_entries: self.config.max_entries,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub builds: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl CacheMetrics {
    /// Hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
