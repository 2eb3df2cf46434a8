//! War state: incoming attacks and fort holdings.
//!
//! Immutable component replaced wholesale on edit, like the other
//! territory sub-components. Holds ids only; the fort and attack
//! entities live in [`crate::forts`].

use crate::state::{AttackId, FortId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WarState {
    /// Attacks currently targeting this territory.
    incoming_attacks: im::Vector<AttackId>,
    /// Forts built and owned by this territory.
    forts: im::Vector<FortId>,
    /// Enemy forts this territory currently occupies.
    occupied_forts: im::Vector<FortId>,
}

impl WarState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incoming_attacks(&self) -> impl Iterator<Item = &AttackId> {
        self.incoming_attacks.iter()
    }

    pub fn has_incoming_attacks(&self) -> bool {
        !self.incoming_attacks.is_empty()
    }

    pub fn is_under_attack(&self, attack: &AttackId) -> bool {
        self.incoming_attacks.contains(attack)
    }

    pub fn with_attack(&self, attack: AttackId) -> WarState {
        let mut incoming_attacks = self.incoming_attacks.clone();
        incoming_attacks.push_back(attack);
        WarState {
            incoming_attacks,
            ..self.clone()
        }
    }

    pub fn without_attack(&self, attack: &AttackId) -> WarState {
        let incoming_attacks = self
            .incoming_attacks
            .iter()
            .filter(|id| *id != attack)
            .cloned()
            .collect();
        WarState {
            incoming_attacks,
            ..self.clone()
        }
    }

    pub fn forts(&self) -> impl Iterator<Item = &FortId> {
        self.forts.iter()
    }

    pub fn owns_fort(&self, fort: &FortId) -> bool {
        self.forts.contains(fort)
    }

    pub fn with_fort(&self, fort: FortId) -> WarState {
        let mut forts = self.forts.clone();
        forts.push_back(fort);
        WarState {
            forts,
            ..self.clone()
        }
    }

    pub fn without_fort(&self, fort: &FortId) -> WarState {
        let forts = self
            .forts
            .iter()
            .filter(|id| *id != fort)
            .cloned()
            .collect();
        WarState {
            forts,
            ..self.clone()
        }
    }

    pub fn occupied_forts(&self) -> impl Iterator<Item = &FortId> {
        self.occupied_forts.iter()
    }

    pub fn occupies_fort(&self, fort: &FortId) -> bool {
        self.occupied_forts.contains(fort)
    }

    pub fn with_occupied_fort(&self, fort: FortId) -> WarState {
        let mut occupied_forts = self.occupied_forts.clone();
        occupied_forts.push_back(fort);
        WarState {
            occupied_forts,
            ..self.clone()
        }
    }

    pub fn without_occupied_fort(&self, fort: &FortId) -> WarState {
        let occupied_forts = self
            .occupied_forts
            .iter()
            .filter(|id| *id != fort)
            .cloned()
            .collect();
        WarState {
            occupied_forts,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_add_remove() {
        let state = WarState::new()
            .with_attack(AttackId::new("a1"))
            .with_attack(AttackId::new("a2"));
        assert!(state.has_incoming_attacks());
        assert!(state.is_under_attack(&AttackId::new("a1")));
        let state = state.without_attack(&AttackId::new("a1"));
        assert!(!state.is_under_attack(&AttackId::new("a1")));
        assert!(state.is_under_attack(&AttackId::new("a2")));
    }

    #[test]
    fn test_fort_lists_are_independent() {
        let state = WarState::new()
            .with_fort(FortId::new("f1"))
            .with_occupied_fort(FortId::new("f2"));
        assert!(state.owns_fort(&FortId::new("f1")));
        assert!(!state.owns_fort(&FortId::new("f2")));
        assert!(state.occupies_fort(&FortId::new("f2")));
        let state = state.without_occupied_fort(&FortId::new("f2"));
        assert!(!state.occupies_fort(&FortId::new("f2")));
        assert!(state.owns_fort(&FortId::new("f1")));
    }
}
