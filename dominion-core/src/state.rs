//! Identity types and the arena stores.
//!
//! Entities live in id-indexed registries and reference each other by id,
//! never by pointer: a territory stores its overlord's
//! [`TerritoryId`], a rank stores member [`PlayerId`]s, a chunk stores
//! its owner's id. Relationships are resolved through the stores at read
//! time, which keeps the object graph cycle-free and serialization
//! trivial.

use crate::relation::TerritoryRelation;
use crate::territory::Territory;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Stable identity of a town or region.
    TerritoryId
);
string_id!(
    /// Stable identity of a player (host-server UUID string).
    PlayerId
);
string_id!(
    /// Identity of a world (dimension) hosting chunks.
    WorldId
);
string_id!(
    /// Identity of a fort structure.
    FortId
);
string_id!(
    /// Identity of a planned attack.
    AttackId
);

/// Rank ids are unique within their territory and monotonically assigned.
pub type RankId = u32;

/// Per-player record: external-economy balance plus rank membership
/// pointers, one per territory the player belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerData {
    pub id: PlayerId,
    pub name: String,
    pub balance: f64,
    /// territory id -> rank id held there. A player holds at most one
    /// rank per territory.
    pub memberships: FxHashMap<TerritoryId, RankId>,
}

impl PlayerData {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: PlayerId::new(id),
            name: name.into(),
            balance: 0.0,
            memberships: FxHashMap::default(),
        }
    }

    pub fn rank_in(&self, territory: &TerritoryId) -> Option<RankId> {
        self.memberships.get(territory).copied()
    }

    pub fn is_member_of(&self, territory: &TerritoryId) -> bool {
        self.memberships.contains_key(territory)
    }
}

/// Arena of all loaded players.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerRegistry {
    players: FxHashMap<PlayerId, PlayerData>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, player: PlayerData) {
        self.players.insert(player.id.clone(), player);
    }

    pub fn get(&self, id: &PlayerId) -> Option<&PlayerData> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut PlayerData> {
        self.players.get_mut(id)
    }

    pub fn remove(&mut self, id: &PlayerId) -> Option<PlayerData> {
        self.players.remove(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerData> {
        self.players.values()
    }
}

/// Arena of all loaded territories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerritoryRegistry {
    territories: FxHashMap<TerritoryId, Territory>,
}

impl TerritoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, territory: Territory) {
        self.territories.insert(territory.id.clone(), territory);
    }

    pub fn get(&self, id: &TerritoryId) -> Option<&Territory> {
        self.territories.get(id)
    }

    pub fn get_mut(&mut self, id: &TerritoryId) -> Option<&mut Territory> {
        self.territories.get_mut(id)
    }

    pub fn contains(&self, id: &TerritoryId) -> bool {
        self.territories.contains_key(id)
    }

    pub fn remove(&mut self, id: &TerritoryId) -> Option<Territory> {
        self.territories.remove(id)
    }

    pub fn len(&self) -> usize {
        self.territories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Territory> {
        self.territories.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Territory> {
        self.territories.values_mut()
    }

    /// Territory ids in sorted order, for deterministic iteration.
    pub fn ids_sorted(&self) -> Vec<TerritoryId> {
        let mut ids: Vec<_> = self.territories.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Relation of `a` towards `b`, `Neutral` when either is unknown.
    pub fn relation_between(&self, a: &TerritoryId, b: &TerritoryId) -> TerritoryRelation {
        match self.get(a) {
            Some(territory) => territory.relation_with(b),
            None => TerritoryRelation::Neutral,
        }
    }

    /// All territories a player currently belongs to: direct memberships
    /// plus the overlord of each (a town member also counts as belonging
    /// to the town's region).
    pub fn territories_of_player(&self, player: &PlayerData) -> Vec<TerritoryId> {
        let mut result: Vec<TerritoryId> = Vec::new();
        for id in player.memberships.keys() {
            if !result.contains(id) && self.contains(id) {
                result.push(id.clone());
            }
            if let Some(overlord) = self.get(id).and_then(|t| t.overlord.clone()) {
                if !result.contains(&overlord) && self.contains(&overlord) {
                    result.push(overlord);
                }
            }
        }
        result.sort();
        result
    }

    /// Most hostile relation between `territory` and any territory the
    /// player belongs to. An empty membership set yields `Neutral`.
    pub fn worst_relation_with_player(
        &self,
        territory: &TerritoryId,
        player: &PlayerData,
    ) -> TerritoryRelation {
        let mut worst: Option<TerritoryRelation> = None;
        for other in self.territories_of_player(player) {
            let relation = self.relation_between(territory, &other);
            worst = Some(match worst {
                Some(current) => current.worst(relation),
                None => relation,
            });
        }
        worst.unwrap_or(TerritoryRelation::Neutral)
    }

    /// Most hostile relation across every pair of territories the two
    /// players belong to. Stateless players are `Neutral` to everyone.
    pub fn worst_relation_between_players(
        &self,
        a: &PlayerData,
        b: &PlayerData,
    ) -> TerritoryRelation {
        let mut worst: Option<TerritoryRelation> = None;
        for ta in self.territories_of_player(a) {
            for tb in self.territories_of_player(b) {
                let relation = self.relation_between(&ta, &tb);
                worst = Some(match worst {
                    Some(current) => current.worst(relation),
                    None => relation,
                });
            }
        }
        worst.unwrap_or(TerritoryRelation::Neutral)
    }
}
