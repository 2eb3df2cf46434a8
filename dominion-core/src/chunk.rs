//! Chunk coordinates, biomes and per-chunk access policy.
//!
//! A chunk is the claimable spatial unit. Ownership lives in the
//! [`crate::claims::ChunkRegistry`]; this module defines the value types
//! stored per cell and the access rules consulted on every world
//! interaction.

use crate::relation::TerritoryRelation;
use crate::state::{TerritoryId, WorldId};
use serde::{Deserialize, Serialize};

/// Identity of a chunk: world plus chunk-grid coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub world: WorldId,
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(world: WorldId, x: i32, z: i32) -> Self {
        Self { world, x, z }
    }

    /// The four edge-adjacent chunks in the same world.
    pub fn neighbors(&self) -> [ChunkPos; 4] {
        [
            ChunkPos::new(self.world.clone(), self.x + 1, self.z),
            ChunkPos::new(self.world.clone(), self.x - 1, self.z),
            ChunkPos::new(self.world.clone(), self.x, self.z + 1),
            ChunkPos::new(self.world.clone(), self.x, self.z - 1),
        ]
    }

    /// Chebyshev distance to another chunk, or `None` across worlds.
    pub fn distance_to(&self, other: &ChunkPos) -> Option<i32> {
        if self.world != other.world {
            return None;
        }
        Some((self.x - other.x).abs().max((self.z - other.z).abs()))
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{},{}", self.world, self.x, self.z)
    }
}

/// Biome of a chunk, restricting claims by upgrade tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    #[default]
    Plains,
    Forest,
    Desert,
    Mountains,
    Swamp,
    Tundra,
    Jungle,
    Ocean,
}

/// Kinds of world interaction gated by chunk policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkPermissionType {
    BreakBlock,
    PlaceBlock,
    Interact,
    OpenContainer,
    UseEntity,
}

impl ChunkPermissionType {
    pub const ALL: [ChunkPermissionType; 5] = [
        ChunkPermissionType::BreakBlock,
        ChunkPermissionType::PlaceBlock,
        ChunkPermissionType::Interact,
        ChunkPermissionType::OpenContainer,
        ChunkPermissionType::UseEntity,
    ];

    fn index(self) -> usize {
        match self {
            ChunkPermissionType::BreakBlock => 0,
            ChunkPermissionType::PlaceBlock => 1,
            ChunkPermissionType::Interact => 2,
            ChunkPermissionType::OpenContainer => 3,
            ChunkPermissionType::UseEntity => 4,
        }
    }
}

/// Who a chunk rule admits, from widest to narrowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkAccess {
    Everyone,
    Allies,
    #[default]
    Members,
    NoOne,
}

impl ChunkAccess {
    /// Cycle to the next access level (UI toggles walk this ring).
    pub fn next(self) -> ChunkAccess {
        match self {
            ChunkAccess::Everyone => ChunkAccess::Allies,
            ChunkAccess::Allies => ChunkAccess::Members,
            ChunkAccess::Members => ChunkAccess::NoOne,
            ChunkAccess::NoOne => ChunkAccess::Everyone,
        }
    }

    /// Whether a player with `relation` to the owner (membership included
    /// in the relation via `SelfRelation`) passes this rule.
    pub fn admits(self, relation: TerritoryRelation, is_member: bool) -> bool {
        match self {
            ChunkAccess::Everyone => true,
            ChunkAccess::Allies => is_member || relation.is_friendly(),
            ChunkAccess::Members => is_member,
            ChunkAccess::NoOne => false,
        }
    }
}

/// Per-chunk settings bundle: one access rule per permission type plus
/// grief toggles. Copied from the owning territory's defaults at claim
/// time and adjustable per chunk afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSettings {
    rules: [ChunkAccess; 5],
    pub pvp_enabled: bool,
    pub explosions_enabled: bool,
    pub fire_spread_enabled: bool,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            rules: [ChunkAccess::Members; 5],
            pvp_enabled: true,
            explosions_enabled: false,
            fire_spread_enabled: false,
        }
    }
}

impl ChunkSettings {
    pub fn rule(&self, permission: ChunkPermissionType) -> ChunkAccess {
        self.rules[permission.index()]
    }

    pub fn set_rule(&mut self, permission: ChunkPermissionType, access: ChunkAccess) {
        self.rules[permission.index()] = access;
    }

    /// Advance the rule for one permission type to the next access level.
    pub fn cycle_rule(&mut self, permission: ChunkPermissionType) {
        let next = self.rule(permission).next();
        self.set_rule(permission, next);
    }
}

/// A claimed (or claimable) chunk cell.
///
/// `owner == None` means wilderness: every action is allowed and the
/// settings bundle is inert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedChunk {
    pub pos: ChunkPos,
    pub owner: Option<TerritoryId>,
    pub biome: Biome,
    pub settings: ChunkSettings,
}

impl ClaimedChunk {
    pub fn wilderness(pos: ChunkPos, biome: Biome) -> Self {
        Self {
            pos,
            owner: None,
            biome,
            settings: ChunkSettings::default(),
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.owner.is_some()
    }

    /// Chunk-policy part of the authorization decision. War status is
    /// OR'ed in by the caller before this is consulted.
    pub fn allows_action(
        &self,
        relation: TerritoryRelation,
        is_member: bool,
        permission: ChunkPermissionType,
    ) -> bool {
        if self.owner.is_none() {
            return true;
        }
        self.settings.rule(permission).admits(relation, is_member)
    }

    /// Whether PvP can happen in this chunk at all.
    pub fn allows_pvp(&self) -> bool {
        self.owner.is_none() || self.settings.pvp_enabled
    }
}
