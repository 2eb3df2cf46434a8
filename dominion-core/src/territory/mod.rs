//! The territory entity model: one entity, two flavors (town, region).
//!
//! A [`Territory`] owns its ranks and sub-components exclusively and
//! exposes operations that enforce invariants instead of letting
//! callers poke fields. Behavior that differs between flavors
//! dispatches on [`TerritoryKind`]. Anything touching a *second*
//! territory (diplomacy transitions, vassalage, deletion) lives on the
//! engine, which resolves ids through the registry.
//!
//! Invariant-violating requests from trusted internal callers (removing
//! a rank that does not exist, removing an absent overlord) are
//! tolerated as no-ops rather than errors.

pub mod cosmetics;
pub mod diplomacy;
pub mod rank;
pub mod tax;
pub mod treasury;
pub mod war;

use crate::chunk::ChunkSettings;
use crate::error::DomainError;
use crate::relation::TerritoryRelation;
use crate::state::{PlayerId, RankId, TerritoryId};
use crate::upgrades::UpgradeState;
use cosmetics::Cosmetics;
use diplomacy::{DiplomacyProposal, DiplomacyState};
use rank::{Rank, RankPermission};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tax::TaxSet;
use treasury::Treasury;
use war::WarState;

/// Flavor-specific payload of a territory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerritoryKind {
    /// A player-founded settlement with direct members.
    Town {
        leader: PlayerId,
        members: Vec<PlayerId>,
    },
    /// A federation of vassal towns. Its leader is the capital town's
    /// leader, resolved through the registry.
    Region { capital: Option<TerritoryId> },
}

/// A town or region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    pub created_at_ms: u64,
    pub kind: TerritoryKind,
    /// Weak reference: relation only, not ownership. Cleared when the
    /// referenced territory disappears.
    pub overlord: Option<TerritoryId>,
    /// Direct vassals (towns under a region, or subjugated territories).
    pub vassals: Vec<TerritoryId>,
    ranks: FxHashMap<RankId, Rank>,
    default_rank_id: RankId,
    pub treasury: Treasury,
    pub taxes: TaxSet,
    pub cosmetics: Cosmetics,
    pub diplomacy: DiplomacyState,
    pub war: WarState,
    /// Conquest credits earned against specific enemies. Entries at
    /// zero are removed eagerly.
    available_enemy_claims: FxHashMap<TerritoryId, u32>,
    pub upgrades: UpgradeState,
    /// Default settings bundle stamped onto newly claimed chunks.
    pub chunk_settings: ChunkSettings,
}

impl Territory {
    fn new(id: impl Into<String>, name: impl Into<String>, kind: TerritoryKind) -> Self {
        let mut territory = Self {
            id: TerritoryId::new(id),
            name: name.into(),
            created_at_ms: crate::time::epoch_ms(),
            kind,
            overlord: None,
            vassals: Vec::new(),
            ranks: FxHashMap::default(),
            default_rank_id: 0,
            treasury: Treasury::default(),
            taxes: TaxSet::default(),
            cosmetics: Cosmetics::default(),
            diplomacy: DiplomacyState::new(),
            war: WarState::new(),
            available_enemy_claims: FxHashMap::default(),
            upgrades: UpgradeState::new(),
            chunk_settings: ChunkSettings::default(),
        };
        let default_rank = territory.register_new_rank("default");
        territory.default_rank_id = default_rank;
        territory
    }

    /// Found a town; the founder becomes leader and joins the default
    /// rank. The caller is responsible for the matching player-side
    /// membership pointer.
    pub fn new_town(
        id: impl Into<String>,
        name: impl Into<String>,
        leader: PlayerId,
    ) -> Self {
        let mut town = Self::new(
            id,
            name,
            TerritoryKind::Town {
                leader: leader.clone(),
                members: vec![leader.clone()],
            },
        );
        let default_rank_id = town.default_rank_id;
        if let Some(rank) = town.ranks.get_mut(&default_rank_id) {
            rank.add_member(leader);
        }
        town
    }

    /// Found a region with no capital yet.
    pub fn new_region(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, TerritoryKind::Region { capital: None })
    }

    pub fn is_town(&self) -> bool {
        matches!(self.kind, TerritoryKind::Town { .. })
    }

    pub fn is_region(&self) -> bool {
        matches!(self.kind, TerritoryKind::Region { .. })
    }

    /// Position in the town < region hierarchy.
    pub fn hierarchy_rank(&self) -> u8 {
        match self.kind {
            TerritoryKind::Town { .. } => 0,
            TerritoryKind::Region { .. } => 1,
        }
    }

    pub fn can_have_vassals(&self) -> bool {
        self.is_region()
    }

    pub fn can_have_overlord(&self) -> bool {
        self.is_town()
    }

    pub fn rename(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
    }

    // === Membership ===

    /// Direct members. Regions have none; their population is the union
    /// of vassal towns, resolved through the registry.
    pub fn members(&self) -> &[PlayerId] {
        match &self.kind {
            TerritoryKind::Town { members, .. } => members,
            TerritoryKind::Region { .. } => &[],
        }
    }

    pub fn is_member(&self, player: &PlayerId) -> bool {
        self.members().contains(player)
    }

    pub fn leader(&self) -> Option<&PlayerId> {
        match &self.kind {
            TerritoryKind::Town { leader, .. } => Some(leader),
            TerritoryKind::Region { .. } => None,
        }
    }

    pub fn is_leader(&self, player: &PlayerId) -> bool {
        self.leader() == Some(player)
    }

    pub fn set_leader(&mut self, new_leader: PlayerId) {
        if let TerritoryKind::Town { leader, .. } = &mut self.kind {
            *leader = new_leader;
        }
    }

    pub fn capital(&self) -> Option<&TerritoryId> {
        match &self.kind {
            TerritoryKind::Region { capital } => capital.as_ref(),
            TerritoryKind::Town { .. } => None,
        }
    }

    /// Add a town member into the default rank. Returns the rank id the
    /// player landed in; no-op (returning the current rank) when the
    /// player is already a member.
    pub fn add_member(&mut self, player: PlayerId) -> RankId {
        if let Some(current) = self.rank_containing(&player).map(|r| r.id) {
            return current;
        }
        if let TerritoryKind::Town { members, .. } = &mut self.kind {
            members.push(player.clone());
        }
        let default_rank_id = self.default_rank_id;
        if let Some(rank) = self.ranks.get_mut(&default_rank_id) {
            rank.add_member(player);
        }
        default_rank_id
    }

    /// Remove a member and their rank back-reference. No-op for
    /// non-members.
    pub fn remove_member(&mut self, player: &PlayerId) {
        if let TerritoryKind::Town { members, .. } = &mut self.kind {
            members.retain(|m| m != player);
        }
        for rank in self.ranks.values_mut() {
            rank.remove_member(player);
        }
    }

    // === Ranks ===

    /// Register a new rank under the next unused id (`max + 1`, or 0
    /// when no rank exists). Name uniqueness is the caller's concern.
    pub fn register_new_rank(&mut self, name: impl Into<String>) -> RankId {
        let next_id = self
            .ranks
            .keys()
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);
        self.ranks.insert(next_id, Rank::new(next_id, name));
        next_id
    }

    /// Remove a rank, moving its members to the default rank. Removing
    /// the default rank or an unknown id is a no-op. Returns the moved
    /// members so the caller can fix their rank pointers.
    pub fn remove_rank(&mut self, rank_id: RankId) -> Vec<PlayerId> {
        if rank_id == self.default_rank_id || !self.ranks.contains_key(&rank_id) {
            return Vec::new();
        }
        let mut removed = self.ranks.remove(&rank_id).expect("checked above");
        let moved = removed.take_members();
        let default_rank_id = self.default_rank_id;
        if let Some(default_rank) = self.ranks.get_mut(&default_rank_id) {
            for player in &moved {
                default_rank.add_member(player.clone());
            }
        }
        moved
    }

    pub fn rank(&self, rank_id: RankId) -> Option<&Rank> {
        self.ranks.get(&rank_id)
    }

    pub fn rank_mut(&mut self, rank_id: RankId) -> Option<&mut Rank> {
        self.ranks.get_mut(&rank_id)
    }

    pub fn ranks(&self) -> impl Iterator<Item = &Rank> {
        self.ranks.values()
    }

    /// Ranks ordered highest level first.
    pub fn ranks_sorted(&self) -> Vec<&Rank> {
        let mut ranks: Vec<_> = self.ranks.values().collect();
        ranks.sort_by_key(|r| (std::cmp::Reverse(r.level()), r.id));
        ranks
    }

    pub fn rank_count(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_rank_name_used(&self, name: &str) -> bool {
        self.ranks.values().any(|r| r.name == name)
    }

    pub fn default_rank_id(&self) -> RankId {
        self.default_rank_id
    }

    /// Mark a rank as the default. Unknown ids are a no-op, preserving
    /// the invariant that the default rank always exists.
    pub fn set_default_rank(&mut self, rank_id: RankId) {
        if self.ranks.contains_key(&rank_id) {
            self.default_rank_id = rank_id;
        }
    }

    /// The rank currently holding `player`, if any.
    pub fn rank_containing(&self, player: &PlayerId) -> Option<&Rank> {
        self.ranks.values().find(|r| r.has_member(player))
    }

    /// Members ordered by rank level, highest first (display order).
    pub fn ordered_members(&self) -> Vec<PlayerId> {
        let mut members: Vec<(u8, PlayerId)> = Vec::new();
        for rank in self.ranks.values() {
            for member in rank.members() {
                members.push((rank.level(), member.clone()));
            }
        }
        members.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        members.into_iter().map(|(_, player)| player).collect()
    }

    /// Move a player to another rank. Atomic with respect to the
    /// player: they are never in zero or two ranks afterwards.
    pub fn move_player_to_rank(
        &mut self,
        player: &PlayerId,
        rank_id: RankId,
    ) -> Result<(), DomainError> {
        if !self.ranks.contains_key(&rank_id) {
            return Err(DomainError::RankNotFound {
                territory: self.id.clone(),
                rank_id,
            });
        }
        if self.rank_containing(player).is_none() {
            return Err(DomainError::NotAMember {
                territory: self.id.clone(),
                player: player.clone(),
            });
        }
        for rank in self.ranks.values_mut() {
            rank.remove_member(player);
        }
        self.ranks
            .get_mut(&rank_id)
            .expect("checked above")
            .add_member(player.clone());
        Ok(())
    }

    /// Leaders can do everything; everyone else is bound by their rank.
    /// Non-members have no permission, never an error.
    pub fn does_player_have_permission(
        &self,
        player: &PlayerId,
        permission: RankPermission,
    ) -> bool {
        if self.is_leader(player) {
            return true;
        }
        self.rank_containing(player)
            .map(|rank| rank.has_permission(permission))
            .unwrap_or(false)
    }

    // === Treasury ===

    pub fn balance(&self) -> f64 {
        self.treasury.balance()
    }

    pub fn add_to_balance(&mut self, amount: f64) -> Result<(), DomainError> {
        self.treasury = self.treasury.deposit(amount)?;
        Ok(())
    }

    pub fn remove_from_balance(&mut self, amount: f64) -> Result<(), DomainError> {
        self.treasury = self.treasury.withdraw(amount)?;
        Ok(())
    }

    // === Cosmetics ===

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.cosmetics = self.cosmetics.with_description(description);
    }

    pub fn set_icon(&mut self, icon: Option<String>) {
        self.cosmetics = self.cosmetics.with_icon(icon);
    }

    pub fn set_color(&mut self, color: u32) {
        self.cosmetics = self.cosmetics.with_color(color);
    }

    // === Diplomacy (local reads and component mutation) ===

    /// Relation towards another territory. Identity and hierarchy links
    /// short-circuit; otherwise the stored map decides, defaulting to
    /// `Neutral`.
    pub fn relation_with(&self, other: &TerritoryId) -> TerritoryRelation {
        if &self.id == other {
            return TerritoryRelation::SelfRelation;
        }
        if self.overlord.as_ref() == Some(other) {
            return TerritoryRelation::Overlord;
        }
        if self.vassals.contains(other) {
            return TerritoryRelation::Vassal;
        }
        self.diplomacy.relation_with(other)
    }

    pub fn is_vassal(&self, other: &TerritoryId) -> bool {
        self.vassals.contains(other)
    }

    pub fn has_overlord(&self) -> bool {
        self.overlord.is_some()
    }

    /// Record an inbound proposal, replacing any earlier proposal from
    /// the same proposer.
    pub fn record_proposal(&mut self, proposal: DiplomacyProposal) {
        self.diplomacy = self
            .diplomacy
            .without_proposal(&proposal.proposer)
            .with_proposal(proposal);
    }

    pub fn remove_proposal(&mut self, proposer: &TerritoryId) {
        self.diplomacy = self.diplomacy.without_proposal(proposer);
    }

    pub fn add_overlord_proposal(&mut self, proposer: TerritoryId) {
        self.diplomacy = self.diplomacy.with_overlord_proposal(proposer);
    }

    pub fn remove_overlord_proposal(&mut self, proposer: &TerritoryId) {
        self.diplomacy = self.diplomacy.without_overlord_proposal(proposer);
    }

    // === Conquest credits ===

    pub fn enemy_claims_against(&self, territory: &TerritoryId) -> u32 {
        self.available_enemy_claims
            .get(territory)
            .copied()
            .unwrap_or(0)
    }

    pub fn add_enemy_claims(&mut self, territory: TerritoryId, amount: u32) {
        if amount == 0 {
            return;
        }
        *self.available_enemy_claims.entry(territory).or_insert(0) += amount;
    }

    /// Consume one conquest credit against `territory`. Returns false
    /// when no credit is held. Exhausted entries are removed eagerly.
    pub fn consume_enemy_claim(&mut self, territory: &TerritoryId) -> bool {
        match self.available_enemy_claims.get_mut(territory) {
            Some(credits) if *credits > 0 => {
                *credits -= 1;
                if *credits == 0 {
                    self.available_enemy_claims.remove(territory);
                }
                true
            }
            _ => {
                self.available_enemy_claims.remove(territory);
                false
            }
        }
    }

    // === War component wrappers ===

    pub fn is_at_war(&self) -> bool {
        self.war.has_incoming_attacks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn town() -> Territory {
        Territory::new_town("t1", "Riverton", PlayerId::new("leader"))
    }

    #[test]
    fn test_new_town_has_default_rank_with_leader() {
        let town = town();
        let default_rank = town.rank(town.default_rank_id()).unwrap();
        assert_eq!(default_rank.name, "default");
        assert!(default_rank.has_member(&PlayerId::new("leader")));
        assert!(town.is_leader(&PlayerId::new("leader")));
    }

    #[test]
    fn test_register_new_rank_assigns_max_plus_one() {
        let mut town = town();
        let a = town.register_new_rank("guard");
        let b = town.register_new_rank("mayor");
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        town.remove_rank(a);
        // Id 1 is free again but 2 still exists, so the next id is 3.
        assert_eq!(town.register_new_rank("scribe"), 3);
    }

    #[test]
    fn test_remove_default_rank_is_noop() {
        let mut town = town();
        let default_id = town.default_rank_id();
        town.remove_rank(default_id);
        assert!(town.rank(default_id).is_some());
    }

    #[test]
    fn test_remove_rank_moves_members_to_default() {
        let mut town = town();
        let guard = town.register_new_rank("guard");
        town.add_member(PlayerId::new("p2"));
        town.move_player_to_rank(&PlayerId::new("p2"), guard).unwrap();
        let moved = town.remove_rank(guard);
        assert_eq!(moved, vec![PlayerId::new("p2")]);
        assert_eq!(
            town.rank_containing(&PlayerId::new("p2")).unwrap().id,
            town.default_rank_id()
        );
    }

    #[test]
    fn test_move_player_is_atomic() {
        let mut town = town();
        let guard = town.register_new_rank("guard");
        town.add_member(PlayerId::new("p2"));
        town.move_player_to_rank(&PlayerId::new("p2"), guard).unwrap();

        let holding: Vec<_> = town
            .ranks()
            .filter(|r| r.has_member(&PlayerId::new("p2")))
            .collect();
        assert_eq!(holding.len(), 1);
        assert_eq!(holding[0].id, guard);

        // Unknown rank leaves membership untouched.
        assert!(town.move_player_to_rank(&PlayerId::new("p2"), 99).is_err());
        assert_eq!(town.rank_containing(&PlayerId::new("p2")).unwrap().id, guard);
    }

    #[test]
    fn test_leader_has_every_permission() {
        let town = town();
        for permission in RankPermission::ALL {
            assert!(town.does_player_have_permission(&PlayerId::new("leader"), permission));
        }
        // Non-member: no permission, no panic.
        assert!(!town.does_player_have_permission(
            &PlayerId::new("stranger"),
            RankPermission::ClaimChunk
        ));
    }

    #[test]
    fn test_relation_short_circuits() {
        let mut town = town();
        town.overlord = Some(TerritoryId::new("region"));
        town.vassals.push(TerritoryId::new("minor"));
        assert_eq!(
            town.relation_with(&TerritoryId::new("t1")),
            TerritoryRelation::SelfRelation
        );
        assert_eq!(
            town.relation_with(&TerritoryId::new("region")),
            TerritoryRelation::Overlord
        );
        assert_eq!(
            town.relation_with(&TerritoryId::new("minor")),
            TerritoryRelation::Vassal
        );
        assert_eq!(
            town.relation_with(&TerritoryId::new("elsewhere")),
            TerritoryRelation::Neutral
        );
    }

    #[test]
    fn test_enemy_claims_floor_and_eager_removal() {
        let mut town = town();
        let enemy = TerritoryId::new("enemy");
        assert!(!town.consume_enemy_claim(&enemy));
        town.add_enemy_claims(enemy.clone(), 2);
        assert!(town.consume_enemy_claim(&enemy));
        assert_eq!(town.enemy_claims_against(&enemy), 1);
        assert!(town.consume_enemy_claim(&enemy));
        // Entry removed at zero; further consumption fails.
        assert_eq!(town.enemy_claims_against(&enemy), 0);
        assert!(!town.consume_enemy_claim(&enemy));
    }

    #[test]
    fn test_proposal_replace_is_idempotent() {
        let mut town = town();
        let proposer = TerritoryId::new("t2");
        town.record_proposal(DiplomacyProposal {
            proposer: proposer.clone(),
            target: town.id.clone(),
            wanted: TerritoryRelation::Ally,
        });
        town.record_proposal(DiplomacyProposal {
            proposer: proposer.clone(),
            target: town.id.clone(),
            wanted: TerritoryRelation::Enemy,
        });
        assert_eq!(town.diplomacy.proposal_count(), 1);
        assert_eq!(
            town.diplomacy.proposal_from(&proposer).unwrap().wanted,
            TerritoryRelation::Enemy
        );
    }
}
