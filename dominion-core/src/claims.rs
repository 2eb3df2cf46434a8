//! Chunk-to-territory mapping and the spatial claim rules.
//!
//! The registry is lock-sharded (`DashMap`), so per-chunk operations
//! from different threads proceed independently: player claims and the
//! economy cycle's forced releases never need a cross-chunk
//! transaction, each cell's ownership being an independent unit.
//!
//! Claim validation evaluates a fixed rule pipeline and short-circuits
//! on the first failure; application (owner set + cost deduction) is
//! all-or-nothing and happens on the engine, after validation passes.

use crate::chunk::{Biome, ChunkPos, ChunkSettings, ClaimedChunk};
use crate::config::EngineConfig;
use crate::state::{PlayerId, TerritoryId};
use crate::territory::rank::RankPermission;
use crate::territory::Territory;
use crate::upgrades::TierTable;
use dashmap::{DashMap, DashSet};
use rand::Rng;
use rustc_hash::FxHashSet;

/// Why a claim was refused. Expected outcomes, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimDenial {
    /// The claiming territory is not loaded. Tolerated as a denial
    /// rather than an error: claim requests race against deletion.
    UnknownTerritory,
    /// Chunk flagged unclaimable by server policy.
    Blacklisted,
    /// Player lacks `ClaimChunk` in the claiming territory.
    MissingPermission,
    /// Chunk biome not unlocked at the territory's tier.
    BiomeNotAllowed,
    /// Tier chunk cap reached.
    ChunkCapReached { cap: u32 },
    /// Treasury cannot cover the claim cost.
    InsufficientFunds { required: f64, available: f64 },
    /// The chunk's own policy refused the transfer (already owned and
    /// no conquest credit against the owner).
    ChunkRefused,
    /// First claim would land inside a foreign buffer zone.
    InBufferZone { radius: i32 },
    /// Chunk is not 4-adjacent to any chunk the territory owns.
    NotAdjacent,
}

/// The tier table matching a territory's flavor.
pub(crate) fn tier_table_for<'a>(config: &'a EngineConfig, territory: &Territory) -> &'a TierTable {
    if territory.is_region() {
        &config.region_tiers
    } else {
        &config.town_tiers
    }
}

/// Concurrent chunk-ownership registry.
#[derive(Debug, Default)]
pub struct ChunkRegistry {
    chunks: DashMap<ChunkPos, ClaimedChunk>,
    /// Secondary index: territory -> owned chunk set.
    by_territory: DashMap<TerritoryId, FxHashSet<ChunkPos>>,
    /// Server-policy blacklist of unclaimable chunks.
    blacklist: DashSet<ChunkPos>,
}

impl ChunkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a chunk's biome without claiming it. Claimed cells keep
    /// their owner.
    pub fn set_biome(&self, pos: ChunkPos, biome: Biome) {
        self.chunks
            .entry(pos.clone())
            .or_insert_with(|| ClaimedChunk::wilderness(pos, biome))
            .biome = biome;
    }

    /// Snapshot of a cell; unknown positions read as plains wilderness.
    pub fn snapshot(&self, pos: &ChunkPos) -> ClaimedChunk {
        self.chunks
            .get(pos)
            .map(|c| c.clone())
            .unwrap_or_else(|| ClaimedChunk::wilderness(pos.clone(), Biome::Plains))
    }

    pub fn owner_of(&self, pos: &ChunkPos) -> Option<TerritoryId> {
        self.chunks.get(pos).and_then(|c| c.owner.clone())
    }

    pub fn is_claimed(&self, pos: &ChunkPos) -> bool {
        self.owner_of(pos).is_some()
    }

    pub fn claimed_count(&self, territory: &TerritoryId) -> u32 {
        self.by_territory
            .get(territory)
            .map(|set| set.len() as u32)
            .unwrap_or(0)
    }

    /// Owned chunks in deterministic order.
    pub fn chunks_of(&self, territory: &TerritoryId) -> Vec<ChunkPos> {
        let mut chunks: Vec<ChunkPos> = self
            .by_territory
            .get(territory)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        chunks.sort_by_key(|p| (p.world.clone(), p.x, p.z));
        chunks
    }

    pub fn total_claimed(&self) -> usize {
        self.by_territory.iter().map(|e| e.value().len()).sum()
    }

    // === Blacklist ===

    pub fn add_to_blacklist(&self, pos: ChunkPos) {
        self.blacklist.insert(pos);
    }

    pub fn remove_from_blacklist(&self, pos: &ChunkPos) {
        self.blacklist.remove(pos);
    }

    pub fn is_blacklisted(&self, pos: &ChunkPos) -> bool {
        self.blacklist.contains(pos)
    }

    // === Ownership transitions ===

    /// Point a cell at a new owner, stamping the owner's default
    /// settings. Returns the previous owner.
    pub fn assign_owner(
        &self,
        pos: ChunkPos,
        territory: TerritoryId,
        settings: ChunkSettings,
    ) -> Option<TerritoryId> {
        let previous = {
            let mut cell = self
                .chunks
                .entry(pos.clone())
                .or_insert_with(|| ClaimedChunk::wilderness(pos.clone(), Biome::Plains));
            let previous = cell.owner.replace(territory.clone());
            cell.settings = settings;
            previous
        };
        if let Some(previous_owner) = &previous {
            if let Some(mut set) = self.by_territory.get_mut(previous_owner) {
                set.remove(&pos);
            }
        }
        self.by_territory
            .entry(territory)
            .or_default()
            .insert(pos);
        previous
    }

    /// Clear a cell's owner, keeping the biome. Returns the previous
    /// owner, `None` when the cell was wilderness.
    pub fn unclaim(&self, pos: &ChunkPos) -> Option<TerritoryId> {
        let previous = {
            let mut cell = self.chunks.get_mut(pos)?;
            cell.owner.take()
        };
        if let Some(previous_owner) = &previous {
            if let Some(mut set) = self.by_territory.get_mut(previous_owner) {
                set.remove(pos);
            }
        }
        previous
    }

    /// Release every chunk a territory owns (territory deletion).
    pub fn unclaim_all(&self, territory: &TerritoryId) -> Vec<ChunkPos> {
        let owned = self.chunks_of(territory);
        for pos in &owned {
            self.unclaim(pos);
        }
        self.by_territory.remove(territory);
        owned
    }

    /// Per-chunk settings update, no-op on unknown cells.
    pub fn update_settings(&self, pos: &ChunkPos, update: impl FnOnce(&mut ChunkSettings)) {
        if let Some(mut cell) = self.chunks.get_mut(pos) {
            update(&mut cell.settings);
        }
    }

    // === Spatial queries ===

    /// Whether any 4-neighbor of `pos` is owned by `territory`.
    pub fn is_adjacent_owned(&self, pos: &ChunkPos, territory: &TerritoryId) -> bool {
        pos.neighbors()
            .iter()
            .any(|n| self.owner_of(n).as_ref() == Some(territory))
    }

    /// Whether `pos` falls inside the buffer zone of a foreign
    /// territory: some chunk within `radius` (Chebyshev) is owned by a
    /// territory other than `territory` or its overlord.
    pub fn is_in_buffer_zone(
        &self,
        pos: &ChunkPos,
        territory: &TerritoryId,
        overlord: Option<&TerritoryId>,
        radius: i32,
    ) -> bool {
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                let probe = ChunkPos::new(pos.world.clone(), pos.x + dx, pos.z + dz);
                if let Some(owner) = self.owner_of(&probe) {
                    if &owner != territory && Some(&owner) != overlord {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// The territory's frontier: owned chunks with at least one
    /// neighbor not owned by the same territory. Deterministic order.
    pub fn border_chunks(&self, territory: &TerritoryId) -> Vec<ChunkPos> {
        self.chunks_of(territory)
            .into_iter()
            .filter(|pos| {
                pos.neighbors()
                    .iter()
                    .any(|n| self.owner_of(n).as_ref() != Some(territory))
            })
            .collect()
    }

    /// Shortfall degradation: release border chunks, first
    /// probabilistically, then deterministically until `minimum` is met
    /// or the border is exhausted. Only border chunks are touched.
    /// Returns the released positions.
    pub fn force_release<R: Rng + ?Sized>(
        &self,
        territory: &TerritoryId,
        unclaim_probability: f64,
        minimum: u32,
        rng: &mut R,
    ) -> Vec<ChunkPos> {
        let border = self.border_chunks(territory);
        let mut released: Vec<ChunkPos> = Vec::new();

        for pos in &border {
            if rng.gen::<f64>() < unclaim_probability && self.unclaim(pos).is_some() {
                released.push(pos.clone());
            }
        }

        // Top-up pass: the probabilistic pass may fall short of the
        // configured minimum.
        if (released.len() as u32) < minimum {
            for pos in &border {
                if released.contains(pos) {
                    continue;
                }
                if self.unclaim(pos).is_some() {
                    released.push(pos.clone());
                }
                if released.len() as u32 >= minimum {
                    break;
                }
            }
        }

        released
    }
}

/// Claim validation pipeline, evaluated in order with short-circuit on
/// the first failing rule. Pure: no state is mutated, conquest credits
/// included.
pub fn can_claim_chunk(
    territory: &Territory,
    player: &PlayerId,
    pos: &ChunkPos,
    registry: &ChunkRegistry,
    config: &EngineConfig,
    ignore_adjacent: bool,
) -> Result<(), ClaimDenial> {
    // 1. Server policy.
    if registry.is_blacklisted(pos) {
        return Err(ClaimDenial::Blacklisted);
    }

    // 2. Player permission.
    if !territory.does_player_have_permission(player, RankPermission::ClaimChunk) {
        return Err(ClaimDenial::MissingPermission);
    }

    let chunk = registry.snapshot(pos);
    let tiers = tier_table_for(config, territory);

    // 3. Biome restriction for the current tier.
    if !territory.upgrades.can_claim_biome(chunk.biome, tiers) {
        return Err(ClaimDenial::BiomeNotAllowed);
    }

    // 4. Tier capacity.
    let claimed = registry.claimed_count(&territory.id);
    if !territory.upgrades.can_claim_more(claimed, tiers) {
        let cap = territory.upgrades.chunk_cap(tiers).unwrap_or(0);
        return Err(ClaimDenial::ChunkCapReached { cap });
    }

    // 5. Claim cost.
    let cost = territory.upgrades.claim_cost(tiers);
    if territory.balance() < cost {
        return Err(ClaimDenial::InsufficientFunds {
            required: cost,
            available: territory.balance(),
        });
    }

    // 6. The chunk's own policy: wilderness is free, a foreign owner
    // requires a conquest credit, re-claiming an owned chunk is refused.
    match &chunk.owner {
        None => {}
        Some(owner) if owner == &territory.id => return Err(ClaimDenial::ChunkRefused),
        Some(owner) => {
            if territory.enemy_claims_against(owner) == 0 {
                return Err(ClaimDenial::ChunkRefused);
            }
            // Conquered cells bypass the adjacency rules below.
            return Ok(());
        }
    }

    // 7. Adjacency / buffer zone.
    if ignore_adjacent || config.claims.allow_non_adjacent {
        return Ok(());
    }
    if claimed == 0 {
        if registry.is_in_buffer_zone(
            pos,
            &territory.id,
            territory.overlord.as_ref(),
            config.claims.buffer_zone_radius,
        ) {
            return Err(ClaimDenial::InBufferZone {
                radius: config.claims.buffer_zone_radius,
            });
        }
        return Ok(());
    }
    if !registry.is_adjacent_owned(pos, &territory.id) {
        return Err(ClaimDenial::NotAdjacent);
    }
    Ok(())
}
