//! Upgrade tiers gating claim capacity, claim cost and biome access.
//!
//! A territory holds an [`UpgradeState`] (its unlocked tier); the
//! per-tier numbers come from the configuration's [`TierTable`] so they
//! can be tuned without touching engine code.

use crate::chunk::Biome;
use serde::{Deserialize, Serialize};

/// Stats granted by one upgrade tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Maximum claimed chunks, `None` = unlimited.
    pub chunk_cap: Option<u32>,
    /// Treasury cost per claimed chunk.
    pub chunk_cost: f64,
    /// Biomes claimable at this tier.
    pub allowed_biomes: Vec<Biome>,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            chunk_cap: Some(16),
            chunk_cost: 10.0,
            allowed_biomes: vec![Biome::Plains, Biome::Forest],
        }
    }
}

/// Per-tier stat lookup, indexed by tier (tier 0 = first entry).
///
/// Requests past the last configured tier clamp to the last entry, so a
/// short table means "everything beyond is the max tier".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable(Vec<TierConfig>);

impl Default for TierTable {
    fn default() -> Self {
        Self(vec![
            TierConfig::default(),
            TierConfig {
                chunk_cap: Some(64),
                chunk_cost: 25.0,
                allowed_biomes: vec![
                    Biome::Plains,
                    Biome::Forest,
                    Biome::Desert,
                    Biome::Swamp,
                ],
            },
            TierConfig {
                chunk_cap: None,
                chunk_cost: 50.0,
                allowed_biomes: vec![
                    Biome::Plains,
                    Biome::Forest,
                    Biome::Desert,
                    Biome::Swamp,
                    Biome::Mountains,
                    Biome::Tundra,
                    Biome::Jungle,
                ],
            },
        ])
    }
}

impl TierTable {
    pub fn new(tiers: Vec<TierConfig>) -> Self {
        if tiers.is_empty() {
            return Self::default();
        }
        Self(tiers)
    }

    pub fn tier_count(&self) -> usize {
        self.0.len()
    }

    pub fn for_tier(&self, tier: u32) -> &TierConfig {
        let index = (tier as usize).min(self.0.len() - 1);
        &self.0[index]
    }
}

/// A territory's unlocked upgrade level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UpgradeState {
    tier: u32,
}

impl UpgradeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(&self) -> u32 {
        self.tier
    }

    pub fn level_up(&mut self) {
        self.tier += 1;
    }

    /// Whether a chunk of `biome` may be claimed at this tier.
    pub fn can_claim_biome(&self, biome: Biome, table: &TierTable) -> bool {
        table.for_tier(self.tier).allowed_biomes.contains(&biome)
    }

    /// Whether another claim fits under the tier's cap.
    pub fn can_claim_more(&self, claimed: u32, table: &TierTable) -> bool {
        match table.for_tier(self.tier).chunk_cap {
            Some(cap) => claimed < cap,
            None => true,
        }
    }

    pub fn chunk_cap(&self, table: &TierTable) -> Option<u32> {
        table.for_tier(self.tier).chunk_cap
    }

    pub fn claim_cost(&self, table: &TierTable) -> f64 {
        table.for_tier(self.tier).chunk_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_lookup_clamps_to_last() {
        let table = TierTable::default();
        let last = table.for_tier(99);
        assert_eq!(last.chunk_cap, None);
    }

    #[test]
    fn test_empty_table_falls_back_to_default() {
        let table = TierTable::new(vec![]);
        assert!(table.tier_count() > 0);
    }

    #[test]
    fn test_biome_and_cap_checks() {
        let table = TierTable::default();
        let mut state = UpgradeState::new();
        assert!(state.can_claim_biome(Biome::Plains, &table));
        assert!(!state.can_claim_biome(Biome::Mountains, &table));
        assert!(state.can_claim_more(15, &table));
        assert!(!state.can_claim_more(16, &table));

        state.level_up();
        state.level_up();
        assert!(state.can_claim_biome(Biome::Mountains, &table));
        assert!(state.can_claim_more(1_000_000, &table));
    }
}
