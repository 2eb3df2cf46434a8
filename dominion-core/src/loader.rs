//! Lazy-load cache over the territory store.
//!
//! A bounded, access-expiring cache of hydrated territories. Entries
//! are immutable snapshots behind `Arc`; mutation happens on the
//! registry, which invalidates here. The cache is purely derived state:
//! dropping it entirely loses nothing.
//!
//! Concurrent requests for the same missing key perform a single load:
//! the first requester initializes a per-key `OnceCell`, later
//! requesters await the same cell instead of issuing duplicate loads. A
//! failed load leaves the cell empty, so the next requester retries.

use crate::config::EngineConfig;
use crate::metrics::CacheStats;
use crate::state::TerritoryId;
use crate::storage::{StorageError, TerritoryStore};
use crate::territory::Territory;
use crate::time::Clock;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

struct ResidentEntry {
    territory: Arc<Territory>,
    last_access_nanos: AtomicU64,
}

type InFlightCell = Arc<OnceCell<Option<Arc<Territory>>>>;

/// Bounded read-through cache of hydrated territories.
pub struct TerritoryLoader<S> {
    store: Arc<S>,
    cache: DashMap<TerritoryId, ResidentEntry>,
    in_flight: DashMap<TerritoryId, InFlightCell>,
    max_entries: usize,
    idle_timeout_nanos: u64,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl<S: TerritoryStore> TerritoryLoader<S> {
    pub fn new(store: Arc<S>, config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            cache: DashMap::new(),
            in_flight: DashMap::new(),
            max_entries: config.territory_cache.max_entries,
            idle_timeout_nanos: config.territory_cache.idle_timeout_nanos,
            clock,
            stats: CacheStats::new(),
        }
    }

    /// Resident snapshot without touching storage. The hot-path
    /// accessor: never blocks on I/O.
    pub fn get_if_resident(&self, id: &TerritoryId) -> Option<Arc<Territory>> {
        match self.cache.get(id) {
            Some(entry) => {
                entry
                    .last_access_nanos
                    .store(self.clock.now_nanos(), Ordering::Relaxed);
                self.stats.record_hit();
                Some(entry.territory.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Snapshot of a territory, hydrating from the store on miss.
    /// Returns `None` for ids the store does not know.
    pub async fn get(&self, id: &TerritoryId) -> Result<Option<Arc<Territory>>, StorageError> {
        if let Some(resident) = self.get_if_resident(id) {
            return Ok(Some(resident));
        }

        let cell: InFlightCell = self
            .in_flight
            .entry(id.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let loaded = cell
            .get_or_try_init(|| async {
                let territory = self.store.load_territory(id).await?;
                Ok::<_, StorageError>(territory.map(Arc::new))
            })
            .await;

        match loaded {
            Ok(value) => {
                let value = value.clone();
                if let Some(territory) = &value {
                    self.admit(id.clone(), territory.clone());
                }
                self.in_flight.remove(id);
                Ok(value)
            }
            Err(e) => {
                // Leave the cache untouched; the empty cell is dropped
                // so the next requester retries the load.
                self.in_flight.remove(id);
                Err(e)
            }
        }
    }

    /// Fire-and-forget hydration of a list of ids. Already-resident ids
    /// are skipped; load failures are logged and do not abort the rest.
    pub async fn preload(&self, ids: &[TerritoryId]) {
        log::debug!("Pre-loading {} territories", ids.len());
        for id in ids {
            if self.cache.contains_key(id) {
                continue;
            }
            if let Err(e) = self.get(id).await {
                log::warn!("Pre-load of territory {id} failed: {e}");
            }
        }
    }

    /// Drop one territory's snapshot (called after registry mutation).
    pub fn invalidate(&self, id: &TerritoryId) {
        self.cache.remove(id);
    }

    pub fn invalidate_many(&self, ids: &[TerritoryId]) {
        for id in ids {
            self.invalidate(id);
        }
    }

    pub fn clear(&self) {
        let dropped = self.cache.len();
        self.cache.clear();
        self.stats.record_evictions(dropped as u64);
    }

    pub fn is_resident(&self, id: &TerritoryId) -> bool {
        self.cache.contains_key(id)
    }

    pub fn resident_count(&self) -> usize {
        self.cache.len()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn admit(&self, id: TerritoryId, territory: Arc<Territory>) {
        self.cache.insert(
            id,
            ResidentEntry {
                territory,
                last_access_nanos: AtomicU64::new(self.clock.now_nanos()),
            },
        );
        self.evict_as_needed();
    }

    /// Evict idle entries, then the least recently used until the cache
    /// fits its bound.
    fn evict_as_needed(&self) {
        let now = self.clock.now_nanos();
        let before = self.cache.len();
        self.cache.retain(|_, entry| {
            now.saturating_sub(entry.last_access_nanos.load(Ordering::Relaxed))
                < self.idle_timeout_nanos
        });

        if self.cache.len() > self.max_entries {
            let mut by_access: Vec<(TerritoryId, u64)> = self
                .cache
                .iter()
                .map(|e| (e.key().clone(), e.last_access_nanos.load(Ordering::Relaxed)))
                .collect();
            by_access.sort_by_key(|(_, access)| *access);
            let excess = self.cache.len() - self.max_entries;
            for (id, _) in by_access.into_iter().take(excess) {
                self.cache.remove(&id);
            }
        }

        self.stats
            .record_evictions(before.saturating_sub(self.cache.len()) as u64);
    }
}
