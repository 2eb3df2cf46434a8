//! Fort structures and planned attacks.
//!
//! Forts are world structures owned by one territory and occupiable by
//! another; planned attacks pit attacker territories against defenders.
//! Both live in id-indexed registries; territories reference them by id
//! through their war component.

use crate::chunk::ChunkPos;
use crate::state::{AttackId, FortId, TerritoryId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fort {
    pub id: FortId,
    pub owner: TerritoryId,
    /// Enemy territory currently holding the fort, if any.
    pub occupier: Option<TerritoryId>,
    pub position: ChunkPos,
}

impl Fort {
    pub fn is_occupied(&self) -> bool {
        self.occupier.is_some()
    }

    /// The territory in effective control: the occupier when present,
    /// the owner otherwise.
    pub fn controller(&self) -> &TerritoryId {
        self.occupier.as_ref().unwrap_or(&self.owner)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FortRegistry {
    forts: FxHashMap<FortId, Fort>,
    next_id: u64,
}

impl FortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new fort at `position` for `owner`, returning its id.
    pub fn register(&mut self, position: ChunkPos, owner: TerritoryId) -> FortId {
        let id = FortId::new(format!("fort-{}", self.next_id));
        self.next_id += 1;
        self.forts.insert(
            id.clone(),
            Fort {
                id: id.clone(),
                owner,
                occupier: None,
                position,
            },
        );
        id
    }

    pub fn get(&self, id: &FortId) -> Option<&Fort> {
        self.forts.get(id)
    }

    pub fn delete(&mut self, id: &FortId) -> Option<Fort> {
        self.forts.remove(id)
    }

    pub fn len(&self) -> usize {
        self.forts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forts.is_empty()
    }

    /// Mark a fort as occupied by `occupier`. No-op on unknown forts.
    pub fn occupy(&mut self, id: &FortId, occupier: TerritoryId) {
        if let Some(fort) = self.forts.get_mut(id) {
            fort.occupier = Some(occupier);
        }
    }

    /// Return a fort to its owner's control. No-op on unknown forts.
    pub fn liberate(&mut self, id: &FortId) {
        if let Some(fort) = self.forts.get_mut(id) {
            fort.occupier = None;
        }
    }

    pub fn owned_by(&self, territory: &TerritoryId) -> Vec<FortId> {
        let mut ids: Vec<_> = self
            .forts
            .values()
            .filter(|f| &f.owner == territory)
            .map(|f| f.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn occupied_by(&self, territory: &TerritoryId) -> Vec<FortId> {
        let mut ids: Vec<_> = self
            .forts
            .values()
            .filter(|f| f.occupier.as_ref() == Some(territory))
            .map(|f| f.id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// A scheduled assault of one set of territories on another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAttack {
    pub id: AttackId,
    pub attackers: Vec<TerritoryId>,
    pub defenders: Vec<TerritoryId>,
}

impl PlannedAttack {
    pub fn involves(&self, territory: &TerritoryId) -> bool {
        self.attackers.contains(territory) || self.defenders.contains(territory)
    }

    /// Whether the two territories stand on opposite sides.
    pub fn opposes(&self, a: &TerritoryId, b: &TerritoryId) -> bool {
        (self.attackers.contains(a) && self.defenders.contains(b))
            || (self.attackers.contains(b) && self.defenders.contains(a))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttackRegistry {
    attacks: FxHashMap<AttackId, PlannedAttack>,
    next_id: u64,
}

impl AttackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        attackers: Vec<TerritoryId>,
        defenders: Vec<TerritoryId>,
    ) -> AttackId {
        let id = AttackId::new(format!("attack-{}", self.next_id));
        self.next_id += 1;
        self.attacks.insert(
            id.clone(),
            PlannedAttack {
                id: id.clone(),
                attackers,
                defenders,
            },
        );
        id
    }

    pub fn get(&self, id: &AttackId) -> Option<&PlannedAttack> {
        self.attacks.get(id)
    }

    pub fn remove(&mut self, id: &AttackId) -> Option<PlannedAttack> {
        self.attacks.remove(id)
    }

    pub fn len(&self) -> usize {
        self.attacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty()
    }

    /// Whether any pending attack puts `a` and `b` on opposite sides.
    pub fn are_opposed(&self, a: &TerritoryId, b: &TerritoryId) -> bool {
        self.attacks.values().any(|attack| attack.opposes(a, b))
    }

    pub fn attacks_involving(&self, territory: &TerritoryId) -> Vec<AttackId> {
        let mut ids: Vec<_> = self
            .attacks
            .values()
            .filter(|a| a.involves(territory))
            .map(|a| a.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Scrub a deleted territory from every pending attack. Attacks
    /// left with an empty side are dropped entirely.
    pub fn territory_deleted(&mut self, territory: &TerritoryId) {
        for attack in self.attacks.values_mut() {
            attack.attackers.retain(|t| t != territory);
            attack.defenders.retain(|t| t != territory);
        }
        self.attacks
            .retain(|_, a| !a.attackers.is_empty() && !a.defenders.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::WorldId;

    fn pos(x: i32, z: i32) -> ChunkPos {
        ChunkPos::new(WorldId::new("overworld"), x, z)
    }

    #[test]
    fn test_fort_lifecycle() {
        let mut forts = FortRegistry::new();
        let owner = TerritoryId::new("t1");
        let enemy = TerritoryId::new("t2");
        let id = forts.register(pos(0, 0), owner.clone());

        assert_eq!(forts.get(&id).unwrap().controller(), &owner);
        forts.occupy(&id, enemy.clone());
        assert_eq!(forts.get(&id).unwrap().controller(), &enemy);
        assert_eq!(forts.occupied_by(&enemy), vec![id.clone()]);
        forts.liberate(&id);
        assert!(!forts.get(&id).unwrap().is_occupied());
        forts.delete(&id);
        assert!(forts.get(&id).is_none());
    }

    #[test]
    fn test_attack_opposition() {
        let mut attacks = AttackRegistry::new();
        let a = TerritoryId::new("a");
        let b = TerritoryId::new("b");
        let c = TerritoryId::new("c");
        attacks.register(vec![a.clone()], vec![b.clone()]);

        assert!(attacks.are_opposed(&a, &b));
        assert!(attacks.are_opposed(&b, &a));
        assert!(!attacks.are_opposed(&a, &c));
    }

    #[test]
    fn test_territory_deleted_scrubs_attacks() {
        let mut attacks = AttackRegistry::new();
        let a = TerritoryId::new("a");
        let b = TerritoryId::new("b");
        let c = TerritoryId::new("c");
        let id = attacks.register(vec![a.clone(), c.clone()], vec![b.clone()]);

        attacks.territory_deleted(&c);
        assert!(attacks.get(&id).is_some());
        attacks.territory_deleted(&a);
        // Attacker side emptied: the attack evaporates.
        assert!(attacks.get(&id).is_none());
    }
}
