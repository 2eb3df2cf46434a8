//! Diplomacy state: inbound proposals and stored relations.
//!
//! An immutable component replaced wholesale on edit. Internals use
//! `im` maps and vectors so a replaced copy shares structure with its
//! predecessor (O(1) clone for the registry's copy-on-write pattern).

use crate::relation::TerritoryRelation;
use crate::state::TerritoryId;
use serde::{Deserialize, Serialize};

/// A pending request for a relation change, keyed by its proposer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiplomacyProposal {
    pub proposer: TerritoryId,
    pub target: TerritoryId,
    pub wanted: TerritoryRelation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DiplomacyState {
    /// Inbound relation proposals keyed by proposer id. A second
    /// proposal from the same proposer replaces the first.
    proposals: im::HashMap<TerritoryId, DiplomacyProposal>,
    /// Inbound vassalization offers, in arrival order.
    overlord_proposals: im::Vector<TerritoryId>,
    /// Stored relations. Only `Ally` and `Enemy` are ever present;
    /// absence means `Neutral`.
    relations: im::HashMap<TerritoryId, TerritoryRelation>,
}

impl DiplomacyState {
    pub fn new() -> Self {
        Self::default()
    }

    // === Relation proposals ===

    pub fn proposal_from(&self, proposer: &TerritoryId) -> Option<&DiplomacyProposal> {
        self.proposals.get(proposer)
    }

    pub fn proposals(&self) -> impl Iterator<Item = &DiplomacyProposal> {
        self.proposals.values()
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    pub fn with_proposal(&self, proposal: DiplomacyProposal) -> DiplomacyState {
        let mut proposals = self.proposals.clone();
        proposals.insert(proposal.proposer.clone(), proposal);
        DiplomacyState {
            proposals,
            ..self.clone()
        }
    }

    pub fn without_proposal(&self, proposer: &TerritoryId) -> DiplomacyState {
        let mut proposals = self.proposals.clone();
        proposals.remove(proposer);
        DiplomacyState {
            proposals,
            ..self.clone()
        }
    }

    // === Vassalization proposals ===

    pub fn overlord_proposals(&self) -> impl Iterator<Item = &TerritoryId> {
        self.overlord_proposals.iter()
    }

    pub fn overlord_proposal_count(&self) -> usize {
        self.overlord_proposals.len()
    }

    pub fn has_overlord_proposal_from(&self, proposer: &TerritoryId) -> bool {
        self.overlord_proposals.contains(proposer)
    }

    pub fn with_overlord_proposal(&self, proposer: TerritoryId) -> DiplomacyState {
        let mut overlord_proposals = self.overlord_proposals.clone();
        overlord_proposals.push_back(proposer);
        DiplomacyState {
            overlord_proposals,
            ..self.clone()
        }
    }

    pub fn without_overlord_proposal(&self, proposer: &TerritoryId) -> DiplomacyState {
        let overlord_proposals = self
            .overlord_proposals
            .iter()
            .filter(|id| *id != proposer)
            .cloned()
            .collect();
        DiplomacyState {
            overlord_proposals,
            ..self.clone()
        }
    }

    // === Stored relations ===

    /// Stored relation towards a territory, `Neutral` when absent.
    pub fn relation_with(&self, territory: &TerritoryId) -> TerritoryRelation {
        self.relations
            .get(territory)
            .copied()
            .unwrap_or(TerritoryRelation::Neutral)
    }

    /// Replace the stored relation. Setting `Neutral` removes the entry.
    pub fn with_relation(
        &self,
        territory: TerritoryId,
        relation: TerritoryRelation,
    ) -> DiplomacyState {
        let mut relations = self.relations.clone();
        if relation == TerritoryRelation::Neutral {
            relations.remove(&territory);
        } else {
            relations.insert(territory, relation);
        }
        DiplomacyState {
            relations,
            ..self.clone()
        }
    }

    pub fn territories_with_relation(&self, relation: TerritoryRelation) -> Vec<TerritoryId> {
        let mut ids: Vec<_> = self
            .relations
            .iter()
            .filter(|(_, r)| **r == relation)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Drop every proposal and relation entry referencing `territory`
    /// (used when that territory is deleted).
    pub fn without_territory(&self, territory: &TerritoryId) -> DiplomacyState {
        let mut relations = self.relations.clone();
        relations.remove(territory);
        let mut proposals = self.proposals.clone();
        proposals.remove(territory);
        let overlord_proposals = self
            .overlord_proposals
            .iter()
            .filter(|id| *id != territory)
            .cloned()
            .collect();
        DiplomacyState {
            proposals,
            overlord_proposals,
            relations,
        }
    }
}
