//! Engine configuration with documented defaults.
//!
//! All tunables are collected here. Callers hold the config behind an
//! `Arc` and swap the whole snapshot on hot reload; the engine itself
//! never mutates it.

use crate::chunk::ChunkPermissionType;
use crate::upgrades::TierTable;
use serde::{Deserialize, Serialize};

/// Permission cache tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionCacheConfig {
    /// Entry lifetime in nanoseconds.
    ///
    /// 1–1.5 s balances freshness against hit rate; permission-relevant
    /// state rarely changes faster than a player can re-trigger events.
    pub ttl_nanos: u64,
    /// Soft cap; exceeding it on insert triggers a sweep of expired
    /// entries.
    pub max_entries: usize,
}

impl Default for PermissionCacheConfig {
    fn default() -> Self {
        Self {
            ttl_nanos: 1_000_000_000,
            max_entries: 5_000,
        }
    }
}

/// Territory lazy-load cache tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryCacheConfig {
    /// Maximum resident territories before LRU eviction.
    pub max_entries: usize,
    /// Idle time after which an entry is evicted, in nanoseconds.
    pub idle_timeout_nanos: u64,
}

impl Default for TerritoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 5_000,
            // 10 minutes
            idle_timeout_nanos: 600_000_000_000,
        }
    }
}

/// Economy cycle tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Upkeep charged per claimed chunk per cycle.
    pub upkeep_per_chunk: f64,
    /// On shortfall, at least this many border chunks are released
    /// (capped by the border-chunk count).
    pub min_chunks_unclaimed: u32,
    /// Probability that a given border chunk is released in the first,
    /// randomized pass of the shortfall policy.
    pub unclaim_probability: f64,
    /// Scheduling hint for the host: hours between economy cycles.
    /// The engine itself does not schedule.
    pub cycle_interval_hours: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            upkeep_per_chunk: 2.0,
            min_chunks_unclaimed: 3,
            unclaim_probability: 0.35,
            cycle_interval_hours: 24,
        }
    }
}

/// Claim rule tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimConfig {
    /// Chebyshev radius around foreign claims within which a chunk-less
    /// territory may not place its first claim.
    pub buffer_zone_radius: i32,
    /// When true, adjacency is never required (admin worlds).
    pub allow_non_adjacent: bool,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            buffer_zone_radius: 2,
            allow_non_adjacent: false,
        }
    }
}

/// Complete engine configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    pub permission_cache: PermissionCacheConfig,
    pub territory_cache: TerritoryCacheConfig,
    pub economy: EconomyConfig,
    pub claims: ClaimConfig,
    /// Upgrade tier tables per territory flavor.
    pub town_tiers: TierTable,
    pub region_tiers: TierTable,
    /// Permission types globally disabled by server policy; checks for
    /// these short-circuit to allow without touching the cache.
    pub disabled_permissions: Vec<ChunkPermissionType>,
}

impl EngineConfig {
    pub fn is_permission_disabled(&self, permission: ChunkPermissionType) -> bool {
        self.disabled_permissions.contains(&permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_default_ttl_is_one_second() {
        let config = EngineConfig::default();
        assert_eq!(config.permission_cache.ttl_nanos, 1_000_000_000);
    }

    #[test]
    fn test_disabled_permission_lookup() {
        let config = EngineConfig {
            disabled_permissions: vec![ChunkPermissionType::UseEntity],
            ..EngineConfig::default()
        };
        assert!(config.is_permission_disabled(ChunkPermissionType::UseEntity));
        assert!(!config.is_permission_disabled(ChunkPermissionType::BreakBlock));
    }
}
