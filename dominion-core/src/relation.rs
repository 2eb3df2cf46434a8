//! Diplomatic relation values between territories.
//!
//! Relations form a fixed set with a single hostility ordering used both
//! for proposal precedence and for "worst relation" aggregation. Only
//! [`TerritoryRelation::Ally`] and [`TerritoryRelation::Enemy`] are ever
//! stored; `SelfRelation`, `Overlord` and `Vassal` are computed from
//! identity and the overlord/vassal links, and `Neutral` is the default
//! for absent entries.

use serde::{Deserialize, Serialize};

/// Relation between two territories, from the point of view of one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerritoryRelation {
    /// The two ids refer to the same territory. Computed, never stored.
    SelfRelation,
    /// The other territory is this territory's overlord.
    Overlord,
    /// The other territory is a vassal of this territory.
    Vassal,
    Ally,
    Neutral,
    Enemy,
}

impl TerritoryRelation {
    /// Hostility rank: higher is more hostile.
    ///
    /// `Enemy > Neutral > Ally > Vassal > Overlord > SelfRelation`.
    /// Subordination links rank below an ordinary alliance because they
    /// imply a standing obligation, and identity is least hostile.
    pub fn hostility(&self) -> u8 {
        match self {
            TerritoryRelation::SelfRelation => 0,
            TerritoryRelation::Overlord => 1,
            TerritoryRelation::Vassal => 2,
            TerritoryRelation::Ally => 3,
            TerritoryRelation::Neutral => 4,
            TerritoryRelation::Enemy => 5,
        }
    }

    /// Whether this relation is strictly more hostile than `other`.
    pub fn is_superior_to(&self, other: TerritoryRelation) -> bool {
        self.hostility() > other.hostility()
    }

    /// Reduce two relations to the more hostile one.
    pub fn worst(self, other: TerritoryRelation) -> TerritoryRelation {
        if other.is_superior_to(self) {
            other
        } else {
            self
        }
    }

    /// Whether players under this relation may fight each other
    /// where the chunk itself allows PvP.
    pub fn allows_pvp(&self) -> bool {
        matches!(
            self,
            TerritoryRelation::Neutral | TerritoryRelation::Enemy
        )
    }

    /// Friendly relations share buffer-zone and access privileges.
    pub fn is_friendly(&self) -> bool {
        self.hostility() <= TerritoryRelation::Ally.hostility()
    }
}

impl std::fmt::Display for TerritoryRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TerritoryRelation::SelfRelation => "self",
            TerritoryRelation::Overlord => "overlord",
            TerritoryRelation::Vassal => "vassal",
            TerritoryRelation::Ally => "ally",
            TerritoryRelation::Neutral => "neutral",
            TerritoryRelation::Enemy => "enemy",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostility_order_is_total() {
        let order = [
            TerritoryRelation::SelfRelation,
            TerritoryRelation::Overlord,
            TerritoryRelation::Vassal,
            TerritoryRelation::Ally,
            TerritoryRelation::Neutral,
            TerritoryRelation::Enemy,
        ];
        for pair in order.windows(2) {
            assert!(pair[1].is_superior_to(pair[0]));
            assert!(!pair[0].is_superior_to(pair[1]));
        }
    }

    #[test]
    fn test_worst_picks_most_hostile() {
        assert_eq!(
            TerritoryRelation::Ally.worst(TerritoryRelation::Enemy),
            TerritoryRelation::Enemy
        );
        assert_eq!(
            TerritoryRelation::Neutral.worst(TerritoryRelation::Overlord),
            TerritoryRelation::Neutral
        );
        // Equal hostility keeps the left operand.
        assert_eq!(
            TerritoryRelation::Ally.worst(TerritoryRelation::Ally),
            TerritoryRelation::Ally
        );
    }

    #[test]
    fn test_pvp_rules() {
        assert!(TerritoryRelation::Enemy.allows_pvp());
        assert!(TerritoryRelation::Neutral.allows_pvp());
        assert!(!TerritoryRelation::Ally.allows_pvp());
        assert!(!TerritoryRelation::Vassal.allows_pvp());
        assert!(!TerritoryRelation::SelfRelation.allows_pvp());
    }
}
