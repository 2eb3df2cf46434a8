//! # Dominion Core
//!
//! Territory & access-control engine for a persistent multiplayer
//! world: players organize into towns, towns into regions, and
//! territories enter diplomatic and vassal/overlord relationships.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌───────────────────┐      ┌──────────────┐
//! │ World events │─────▶│ PermissionService │─────▶│ allow / deny │
//! │ (host server)│      │  (TTL cache)      │      └──────────────┘
//! └──────────────┘      └─────────┬─────────┘
//!                                 │ miss
//!                       ┌─────────▼─────────┐      ┌──────────────┐
//!                       │ ChunkRegistry +   │◀─────│ Economy tick │
//!                       │ TerritoryRegistry │      │ (scheduled)  │
//!                       └─────────┬─────────┘      └──────────────┘
//!                                 │ not resident
//!                       ┌─────────▼─────────┐
//!                       │ TerritoryLoader   │──▶ TerritoryStore (async)
//!                       └───────────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Engine`] | Facade wiring registries, caches and observers |
//! | [`Territory`] | Town/region entity with ranks, treasury, diplomacy |
//! | [`ChunkRegistry`] | Concurrent chunk-ownership map and claim rules |
//! | [`PermissionService`] | Hot-path authorization with TTL cache |
//! | [`TerritoryLoader`] | Bounded lazy-load cache over the store |
//! | [`run_economy_cycle`] | Tax → salary → upkeep per territory |
//!
//! ## Concurrency model
//!
//! There is no global lock. Territory sub-components are immutable
//! values replaced wholesale, so readers observe pre- or post-mutation
//! state only. The permission cache, the lazy-load cache and the chunk
//! registry are the only structures mutated from arbitrary threads;
//! all three are lock-sharded maps whose entries are replaced, never
//! mutated in place. Anything that may touch storage returns a future;
//! `*_sync` / `*_resident` accessors never block on I/O.

pub mod access;
pub mod chunk;
pub mod claims;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod forts;
pub mod loader;
pub mod metrics;
pub mod relation;
pub mod state;
pub mod storage;
pub mod systems;
pub mod territory;
pub mod testing;
pub mod time;
pub mod upgrades;

pub use access::{can_player_act, PermissionCache, PermissionService};
pub use chunk::{Biome, ChunkAccess, ChunkPermissionType, ChunkPos, ChunkSettings, ClaimedChunk};
pub use claims::{can_claim_chunk, ChunkRegistry, ClaimDenial};
pub use config::EngineConfig;
pub use engine::{BudgetLine, Engine};
pub use error::{DomainError, ErrorCode};
pub use events::{EngineEvent, EngineObserver, EventLogObserver, ObserverError, ObserverRegistry};
pub use forts::{AttackRegistry, Fort, FortRegistry, PlannedAttack};
pub use loader::TerritoryLoader;
pub use metrics::{CacheStats, CycleSummary};
pub use relation::TerritoryRelation;
pub use state::{
    AttackId, FortId, PlayerData, PlayerId, PlayerRegistry, RankId, TerritoryId,
    TerritoryRegistry, WorldId,
};
pub use storage::{
    MemorySink, MemoryStore, PlayerStore, StorageError, TerritoryStore, TransactionKind,
    TransactionRecord, TransactionSink, UPKEEP_SHORTFALL_SENTINEL,
};
pub use systems::{execute_tasks, run_economy_cycle, UpkeepOutcome};
pub use territory::rank::{PermissionSet, Rank, RankPermission};
pub use territory::{Territory, TerritoryKind};
pub use time::{Clock, ManualClock, SystemClock};
pub use upgrades::{TierConfig, TierTable, UpgradeState};

#[cfg(test)]
mod claims_tests;
#[cfg(test)]
mod diplomacy_tests;
