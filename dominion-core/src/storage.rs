//! Persistence boundary: async store traits and the transaction sink.
//!
//! The engine never assumes synchronous durability — every store call
//! returns a future, and a failed future must leave in-memory state
//! intact so the caller can retry or alert. Implementations (SQL,
//! key-value, whatever the host ships) live outside this crate;
//! [`MemoryStore`] is the in-process double used by tests and the sim
//! driver.

use crate::state::{PlayerData, PlayerId, TerritoryId};
use crate::territory::Territory;
use crate::time;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Infrastructure failure from a store backend.
///
/// `Clone` because a single failed load may be observed by several
/// concurrent requesters of the same key.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("storage backend error: {message}")]
    Backend { message: String },
    #[error("corrupt record for {key}: {message}")]
    CorruptRecord { key: String, message: String },
}

/// Async territory persistence.
pub trait TerritoryStore: Send + Sync {
    fn load_territory(
        &self,
        id: &TerritoryId,
    ) -> impl Future<Output = Result<Option<Territory>, StorageError>> + Send;

    fn save_territory(
        &self,
        territory: &Territory,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn delete_territory(
        &self,
        id: &TerritoryId,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Async player persistence.
pub trait PlayerStore: Send + Sync {
    fn load_player(
        &self,
        id: &PlayerId,
    ) -> impl Future<Output = Result<Option<PlayerData>, StorageError>> + Send;

    fn save_player(
        &self,
        player: &PlayerData,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Categories of treasury-affecting transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    SalaryPayment,
    ChunkUpkeep,
    /// Base tax collected from a member (towns) or a vassal treasury
    /// (regions).
    TaxCollection,
    PlayerDonation,
    Miscellaneous,
}

/// Amount recorded for a `ChunkUpkeep` entry when the territory could
/// not pay and shed chunks instead.
pub const UPKEEP_SHORTFALL_SENTINEL: f64 = -1.0;

/// One transaction-history line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub territory: TerritoryId,
    pub kind: TransactionKind,
    pub amount: f64,
    /// Counterparty (player id, rank id) when one exists.
    pub party: Option<String>,
    pub timestamp_ms: u64,
}

impl TransactionRecord {
    pub fn new(
        territory: TerritoryId,
        kind: TransactionKind,
        amount: f64,
        party: Option<String>,
    ) -> Self {
        Self {
            territory,
            kind,
            amount,
            party,
            timestamp_ms: time::epoch_ms(),
        }
    }
}

/// Fire-and-forget transaction history. Implementations typically queue
/// writes to the persistence backend; the engine never reads back
/// through this trait.
pub trait TransactionSink: Send + Sync {
    fn record(&self, record: TransactionRecord);
}

/// Sink retaining every record in memory, for tests and the sim driver.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<TransactionRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TransactionRecord> {
        self.records.lock().expect("sink poisoned").clone()
    }

    pub fn records_of_kind(&self, kind: TransactionKind) -> Vec<TransactionRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.kind == kind)
            .collect()
    }
}

impl TransactionSink for MemorySink {
    fn record(&self, record: TransactionRecord) {
        self.records.lock().expect("sink poisoned").push(record);
    }
}

/// In-memory store double. `set_failing(true)` makes every call return
/// a backend error, for exercising the failed-future path.
#[derive(Default)]
pub struct MemoryStore {
    territories: Mutex<FxHashMap<TerritoryId, Territory>>,
    players: Mutex<FxHashMap<PlayerId, PlayerData>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_territories(territories: impl IntoIterator<Item = Territory>) -> Self {
        let store = Self::new();
        {
            let mut map = store.territories.lock().expect("store poisoned");
            for territory in territories {
                map.insert(territory.id.clone(), territory);
            }
        }
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend {
                message: "simulated backend failure".to_string(),
            });
        }
        Ok(())
    }

    pub fn territory_count(&self) -> usize {
        self.territories.lock().expect("store poisoned").len()
    }
}

impl TerritoryStore for MemoryStore {
    async fn load_territory(
        &self,
        id: &TerritoryId,
    ) -> Result<Option<Territory>, StorageError> {
        self.check()?;
        Ok(self
            .territories
            .lock()
            .expect("store poisoned")
            .get(id)
            .cloned())
    }

    async fn save_territory(&self, territory: &Territory) -> Result<(), StorageError> {
        self.check()?;
        self.territories
            .lock()
            .expect("store poisoned")
            .insert(territory.id.clone(), territory.clone());
        Ok(())
    }

    async fn delete_territory(&self, id: &TerritoryId) -> Result<(), StorageError> {
        self.check()?;
        self.territories.lock().expect("store poisoned").remove(id);
        Ok(())
    }
}

impl PlayerStore for MemoryStore {
    async fn load_player(&self, id: &PlayerId) -> Result<Option<PlayerData>, StorageError> {
        self.check()?;
        Ok(self
            .players
            .lock()
            .expect("store poisoned")
            .get(id)
            .cloned())
    }

    async fn save_player(&self, player: &PlayerData) -> Result<(), StorageError> {
        self.check()?;
        self.players
            .lock()
            .expect("store poisoned")
            .insert(player.id.clone(), player.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        let town = Territory::new_town("t1", "Riverton", PlayerId::new("p1"));
        store.save_territory(&town).await.unwrap();

        let loaded = store
            .load_territory(&TerritoryId::new("t1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.name, "Riverton");

        store
            .delete_territory(&TerritoryId::new("t1"))
            .await
            .unwrap();
        assert!(store
            .load_territory(&TerritoryId::new("t1"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_failing_store_surfaces_errors() {
        let store = MemoryStore::new();
        store.set_failing(true);
        let result = store.load_territory(&TerritoryId::new("t1")).await;
        assert!(matches!(result, Err(StorageError::Backend { .. })));
    }

    #[test]
    fn test_memory_sink_filters_by_kind() {
        let sink = MemorySink::new();
        sink.record(TransactionRecord::new(
            TerritoryId::new("t1"),
            TransactionKind::ChunkUpkeep,
            UPKEEP_SHORTFALL_SENTINEL,
            None,
        ));
        sink.record(TransactionRecord::new(
            TerritoryId::new("t1"),
            TransactionKind::SalaryPayment,
            25.0,
            Some("p1".to_string()),
        ));
        assert_eq!(sink.records().len(), 2);
        let upkeep = sink.records_of_kind(TransactionKind::ChunkUpkeep);
        assert_eq!(upkeep.len(), 1);
        assert_eq!(upkeep[0].amount, UPKEEP_SHORTFALL_SENTINEL);
    }
}
