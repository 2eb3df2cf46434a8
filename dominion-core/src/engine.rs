//! The engine facade: registries, caches and every transition that
//! spans more than one entity.
//!
//! Constructed once at startup and passed by reference to whatever owns
//! the request-handling loop — no global state. Single-entity reads go
//! straight through the public registry fields; mutations that must
//! stay consistent across entities (diplomacy, vassalage, claims,
//! deletion, the economy cycle) go through the methods here, which also
//! fire events and keep the permission cache honest.

use crate::access::PermissionService;
use crate::chunk::{ChunkPermissionType, ChunkPos};
use crate::claims::{can_claim_chunk, ChunkRegistry, ClaimDenial};
use crate::config::EngineConfig;
use crate::error::DomainError;
use crate::events::{EngineEvent, ObserverRegistry};
use crate::forts::{AttackRegistry, FortRegistry};
use crate::metrics::CycleSummary;
use crate::relation::TerritoryRelation;
use crate::state::{PlayerData, PlayerId, PlayerRegistry, RankId, TerritoryId, TerritoryRegistry};
use crate::storage::{TransactionKind, TransactionRecord, TransactionSink};
use crate::systems;
use crate::territory::diplomacy::DiplomacyProposal;
use crate::territory::Territory;
use crate::time::Clock;
use rand::Rng;
use std::sync::Arc;

/// One projected line of a territory's upcoming economy cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetLine {
    pub label: String,
    /// Positive = expected income, negative = expected cost.
    pub amount: f64,
}

/// The assembled engine.
pub struct Engine {
    pub territories: TerritoryRegistry,
    pub players: PlayerRegistry,
    pub claims: ChunkRegistry,
    pub forts: FortRegistry,
    pub attacks: AttackRegistry,
    pub config: Arc<EngineConfig>,
    pub observers: ObserverRegistry,
    pub permissions: PermissionService,
    pub sink: Arc<dyn TransactionSink>,
    clock: Arc<dyn Clock>,
}

impl Engine {
    pub fn new(
        config: Arc<EngineConfig>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn TransactionSink>,
    ) -> Self {
        let permissions = PermissionService::new(&config, clock.clone());
        Self {
            territories: TerritoryRegistry::new(),
            players: PlayerRegistry::new(),
            claims: ChunkRegistry::new(),
            forts: FortRegistry::new(),
            attacks: AttackRegistry::new(),
            config,
            observers: ObserverRegistry::new(),
            permissions,
            sink,
            clock,
        }
    }

    /// Swap in a fresh configuration snapshot. The permission cache is
    /// rebuilt with the new bounds — it is derived state, safe to drop.
    pub fn reload_config(&mut self, config: Arc<EngineConfig>) {
        self.permissions.rebuild_cache(&config, self.clock.clone());
        self.config = config;
        log::info!("Engine configuration reloaded");
    }

    // === Founding and membership ===

    pub fn add_player(&mut self, player: PlayerData) {
        self.players.insert(player);
    }

    /// Found a town led by an existing player.
    pub fn create_town(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        leader: &PlayerId,
    ) -> Result<TerritoryId, DomainError> {
        if self.players.get(leader).is_none() {
            return Err(DomainError::PlayerNotFound(leader.clone()));
        }
        let town = Territory::new_town(id, name, leader.clone());
        let town_id = town.id.clone();
        let default_rank = town.default_rank_id();
        self.territories.insert(town);
        if let Some(player) = self.players.get_mut(leader) {
            player.memberships.insert(town_id.clone(), default_rank);
        }
        self.permissions.cache().invalidate_player(leader);
        Ok(town_id)
    }

    pub fn create_region(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> TerritoryId {
        let region = Territory::new_region(id, name);
        let region_id = region.id.clone();
        self.territories.insert(region);
        region_id
    }

    /// Add a player to a town's default rank, both sides at once.
    pub fn join_town(
        &mut self,
        town_id: &TerritoryId,
        player_id: &PlayerId,
    ) -> Result<(), DomainError> {
        if self.players.get(player_id).is_none() {
            return Err(DomainError::PlayerNotFound(player_id.clone()));
        }
        let Some(town) = self.territories.get_mut(town_id) else {
            return Err(DomainError::TerritoryNotFound(town_id.clone()));
        };
        let rank_id = town.add_member(player_id.clone());
        if let Some(player) = self.players.get_mut(player_id) {
            player.memberships.insert(town_id.clone(), rank_id);
        }
        self.permissions.cache().invalidate_player(player_id);
        Ok(())
    }

    /// Remove a player from a town, both sides at once. No-op when the
    /// player was not a member.
    pub fn leave_town(&mut self, town_id: &TerritoryId, player_id: &PlayerId) {
        if let Some(town) = self.territories.get_mut(town_id) {
            town.remove_member(player_id);
        }
        if let Some(player) = self.players.get_mut(player_id) {
            player.memberships.remove(town_id);
        }
        self.permissions.cache().invalidate_player(player_id);
    }

    /// Move a player to another rank, keeping the player-side pointer
    /// in sync.
    pub fn set_player_rank(
        &mut self,
        territory_id: &TerritoryId,
        player_id: &PlayerId,
        rank_id: RankId,
    ) -> Result<(), DomainError> {
        let Some(territory) = self.territories.get_mut(territory_id) else {
            return Err(DomainError::TerritoryNotFound(territory_id.clone()));
        };
        territory.move_player_to_rank(player_id, rank_id)?;
        if let Some(player) = self.players.get_mut(player_id) {
            player.memberships.insert(territory_id.clone(), rank_id);
        }
        Ok(())
    }

    // === Claims ===

    /// Validate and apply a chunk claim. On success the owner pointer
    /// and the cost deduction land together; on denial nothing changes.
    pub fn claim_chunk(
        &mut self,
        territory_id: &TerritoryId,
        player: &PlayerId,
        pos: &ChunkPos,
        ignore_adjacent: bool,
    ) -> Result<(), ClaimDenial> {
        let Some(territory) = self.territories.get(territory_id) else {
            return Err(ClaimDenial::UnknownTerritory);
        };
        can_claim_chunk(
            territory,
            player,
            pos,
            &self.claims,
            &self.config,
            ignore_adjacent,
        )?;

        let cost = territory
            .upgrades
            .claim_cost(crate::claims::tier_table_for(&self.config, territory));
        let settings = territory.chunk_settings.clone();
        let previous_owner = self.claims.owner_of(pos);

        let territory = self
            .territories
            .get_mut(territory_id)
            .expect("territory checked above");
        if let Some(owner) = &previous_owner {
            // Validation passed, so a conquest credit is available.
            territory.consume_enemy_claim(owner);
        }
        territory
            .remove_from_balance(cost)
            .expect("claim cost is non-negative");
        self.claims
            .assign_owner(pos.clone(), territory_id.clone(), settings);
        self.permissions.cache().invalidate_chunk(pos);
        log::info!("{territory_id} claimed chunk {pos}");
        Ok(())
    }

    /// Release one claimed chunk on a player's request.
    pub fn unclaim_chunk(
        &mut self,
        territory_id: &TerritoryId,
        player: &PlayerId,
        pos: &ChunkPos,
    ) -> Result<(), ClaimDenial> {
        let Some(territory) = self.territories.get(territory_id) else {
            return Err(ClaimDenial::UnknownTerritory);
        };
        if !territory.does_player_have_permission(
            player,
            crate::territory::rank::RankPermission::UnclaimChunk,
        ) {
            return Err(ClaimDenial::MissingPermission);
        }
        if self.claims.owner_of(pos).as_ref() != Some(territory_id) {
            return Err(ClaimDenial::ChunkRefused);
        }
        self.claims.unclaim(pos);
        self.permissions.cache().invalidate_chunk(pos);
        Ok(())
    }

    /// Whether `territory` holds a conquest credit against the current
    /// owner of `pos`. Pure check; credits are consumed on claim.
    pub fn can_conquer_chunk(&self, territory_id: &TerritoryId, pos: &ChunkPos) -> bool {
        let Some(owner) = self.claims.owner_of(pos) else {
            return false;
        };
        self.territories
            .get(territory_id)
            .map(|t| t.enemy_claims_against(&owner) > 0)
            .unwrap_or(false)
    }

    // === Diplomacy ===

    /// Deliver a relation proposal, replacing any earlier one from the
    /// same proposer.
    pub fn receive_diplomatic_proposal(
        &mut self,
        proposer: &TerritoryId,
        target: &TerritoryId,
        wanted: TerritoryRelation,
    ) -> Result<(), DomainError> {
        if !self.territories.contains(proposer) {
            return Err(DomainError::TerritoryNotFound(proposer.clone()));
        }
        let Some(target_territory) = self.territories.get_mut(target) else {
            return Err(DomainError::TerritoryNotFound(target.clone()));
        };
        target_territory.record_proposal(DiplomacyProposal {
            proposer: proposer.clone(),
            target: target.clone(),
            wanted,
        });
        self.observers.notify(&EngineEvent::DiplomacyProposalReceived {
            proposer: proposer.clone(),
            target: target.clone(),
            wanted,
        });
        Ok(())
    }

    /// Explicitly reject (drop) a pending proposal. No-op when absent.
    pub fn reject_diplomatic_proposal(&mut self, proposer: &TerritoryId, target: &TerritoryId) {
        if let Some(territory) = self.territories.get_mut(target) {
            territory.remove_proposal(proposer);
        }
    }

    /// Accept a pending proposal: consume it and write the relation on
    /// both sides.
    pub fn accept_diplomatic_proposal(
        &mut self,
        proposer: &TerritoryId,
        target: &TerritoryId,
    ) -> Result<TerritoryRelation, DomainError> {
        let wanted = {
            let Some(territory) = self.territories.get(target) else {
                return Err(DomainError::TerritoryNotFound(target.clone()));
            };
            match territory.diplomacy.proposal_from(proposer) {
                Some(proposal) => proposal.wanted,
                None => {
                    return Err(DomainError::NoSuchProposal {
                        proposer: proposer.clone(),
                        target: target.clone(),
                    })
                }
            }
        };
        if let Some(territory) = self.territories.get_mut(target) {
            territory.remove_proposal(proposer);
        }
        self.set_relation(proposer, target, wanted)?;
        Ok(wanted)
    }

    /// Write a relation symmetrically on both territories and announce
    /// the change. Members of both sides get their cached permission
    /// decisions dropped.
    pub fn set_relation(
        &mut self,
        a: &TerritoryId,
        b: &TerritoryId,
        relation: TerritoryRelation,
    ) -> Result<(), DomainError> {
        if !self.territories.contains(a) {
            return Err(DomainError::TerritoryNotFound(a.clone()));
        }
        if !self.territories.contains(b) {
            return Err(DomainError::TerritoryNotFound(b.clone()));
        }
        let old = self.territories.relation_between(a, b);

        let members: Vec<PlayerId> = {
            let ta = self.territories.get(a).expect("checked above");
            let tb = self.territories.get(b).expect("checked above");
            ta.members().iter().chain(tb.members().iter()).cloned().collect()
        };
        {
            let ta = self.territories.get_mut(a).expect("checked above");
            ta.diplomacy = ta.diplomacy.with_relation(b.clone(), relation);
        }
        {
            let tb = self.territories.get_mut(b).expect("checked above");
            tb.diplomacy = tb.diplomacy.with_relation(a.clone(), relation);
        }
        for member in &members {
            self.permissions.cache().invalidate_player(member);
        }
        self.observers.notify(&EngineEvent::RelationChanged {
            a: a.clone(),
            b: b.clone(),
            old,
            new: relation,
        });
        Ok(())
    }

    // === Vassalage ===

    /// Deliver a vassalization offer from `proposer` to `target`.
    pub fn add_vassalisation_proposal(
        &mut self,
        proposer: &TerritoryId,
        target: &TerritoryId,
    ) -> Result<(), DomainError> {
        if !self.territories.contains(proposer) {
            return Err(DomainError::TerritoryNotFound(proposer.clone()));
        }
        let Some(territory) = self.territories.get_mut(target) else {
            return Err(DomainError::TerritoryNotFound(target.clone()));
        };
        territory.add_overlord_proposal(proposer.clone());
        self.observers.notify(&EngineEvent::VassalProposalReceived {
            proposer: proposer.clone(),
            target: target.clone(),
        });
        Ok(())
    }

    /// Accept a pending vassalization offer: one transition that
    /// consumes the proposal and links both sides. Concurrent accepts
    /// for the same vassal cannot interleave — the second sees
    /// `AlreadyHasOverlord`.
    pub fn accept_vassalisation(
        &mut self,
        vassal_id: &TerritoryId,
        overlord_id: &TerritoryId,
    ) -> Result<(), DomainError> {
        if !self.territories.contains(overlord_id) {
            return Err(DomainError::TerritoryNotFound(overlord_id.clone()));
        }
        {
            let Some(vassal) = self.territories.get(vassal_id) else {
                return Err(DomainError::TerritoryNotFound(vassal_id.clone()));
            };
            if vassal.has_overlord() {
                return Err(DomainError::AlreadyHasOverlord(vassal_id.clone()));
            }
            if !vassal.diplomacy.has_overlord_proposal_from(overlord_id) {
                return Err(DomainError::NoSuchProposal {
                    proposer: overlord_id.clone(),
                    target: vassal_id.clone(),
                });
            }
        }
        {
            let vassal = self.territories.get_mut(vassal_id).expect("checked above");
            vassal.remove_overlord_proposal(overlord_id);
            vassal.overlord = Some(overlord_id.clone());
        }
        {
            let overlord = self.territories.get_mut(overlord_id).expect("checked above");
            if !overlord.vassals.contains(vassal_id) {
                overlord.vassals.push(vassal_id.clone());
            }
        }
        self.observers.notify(&EngineEvent::VassalAccepted {
            vassal: vassal_id.clone(),
            overlord: overlord_id.clone(),
        });
        Ok(())
    }

    /// Sever a vassal from its overlord, both sides together. No-op
    /// when no overlord is set.
    pub fn remove_overlord(&mut self, vassal_id: &TerritoryId) {
        let Some(overlord_id) = self
            .territories
            .get(vassal_id)
            .and_then(|t| t.overlord.clone())
        else {
            return;
        };
        if let Some(vassal) = self.territories.get_mut(vassal_id) {
            vassal.overlord = None;
        }
        if let Some(overlord) = self.territories.get_mut(&overlord_id) {
            overlord.vassals.retain(|v| v != vassal_id);
        }
        self.observers.notify(&EngineEvent::OverlordRemoved {
            vassal: vassal_id.clone(),
            overlord: overlord_id,
        });
    }

    // === Deletion ===

    /// Dissolve a territory: release claims, sever vassal links both
    /// ways, hand forts back, purge diplomacy references, scrub pending
    /// attacks and drop memberships. Safe against partial prior
    /// deletion — every collection is iterated from a defensive copy.
    pub fn delete_territory(&mut self, id: &TerritoryId) {
        let Some(territory) = self.territories.get(id) else {
            return;
        };
        let vassals = territory.vassals.clone();
        let overlord = territory.overlord.clone();
        let members: Vec<PlayerId> = territory.members().to_vec();

        for pos in self.claims.unclaim_all(id) {
            self.permissions.cache().invalidate_chunk(&pos);
        }

        for vassal_id in vassals {
            if let Some(vassal) = self.territories.get_mut(&vassal_id) {
                if vassal.overlord.as_ref() == Some(id) {
                    vassal.overlord = None;
                }
            }
        }
        if let Some(overlord_id) = overlord {
            if let Some(overlord) = self.territories.get_mut(&overlord_id) {
                overlord.vassals.retain(|v| v != id);
            }
        }

        for fort_id in self.forts.occupied_by(id) {
            self.forts.liberate(&fort_id);
        }
        for fort_id in self.forts.owned_by(id) {
            if let Some(fort) = self.forts.delete(&fort_id) {
                if let Some(occupier_id) = fort.occupier {
                    if let Some(occupier) = self.territories.get_mut(&occupier_id) {
                        occupier.war = occupier.war.without_occupied_fort(&fort_id);
                    }
                }
            }
        }

        for other_id in self.territories.ids_sorted() {
            if &other_id == id {
                continue;
            }
            if let Some(other) = self.territories.get_mut(&other_id) {
                other.diplomacy = other.diplomacy.without_territory(id);
            }
        }
        self.attacks.territory_deleted(id);

        for member in &members {
            if let Some(player) = self.players.get_mut(member) {
                player.memberships.remove(id);
            }
            self.permissions.cache().invalidate_player(member);
        }

        self.territories.remove(id);
        self.permissions.cache().invalidate_territory();
        self.observers
            .notify(&EngineEvent::TerritoryDeleted { territory: id.clone() });
        log::info!("Territory {id} deleted");
    }

    // === Treasury ===

    /// Player-to-territory donation. Rejects non-positive amounts and
    /// insufficient player funds with a precise error.
    pub fn add_donation(
        &mut self,
        territory_id: &TerritoryId,
        player_id: &PlayerId,
        amount: f64,
    ) -> Result<(), DomainError> {
        if amount <= 0.0 {
            return Err(DomainError::NegativeAmount { amount });
        }
        let Some(player) = self.players.get(player_id) else {
            return Err(DomainError::PlayerNotFound(player_id.clone()));
        };
        if player.balance < amount {
            return Err(DomainError::InsufficientPlayerFunds {
                player: player_id.clone(),
                required: amount,
                available: player.balance,
            });
        }
        let Some(territory) = self.territories.get_mut(territory_id) else {
            return Err(DomainError::TerritoryNotFound(territory_id.clone()));
        };
        territory.add_to_balance(amount)?;
        if let Some(player) = self.players.get_mut(player_id) {
            player.balance -= amount;
        }
        self.sink.record(TransactionRecord::new(
            territory_id.clone(),
            TransactionKind::PlayerDonation,
            amount,
            Some(player_id.as_str().to_string()),
        ));
        Ok(())
    }

    /// Paid rename. Returns `false` (a denial, not an error) when the
    /// treasury cannot cover the fee.
    pub fn rename_territory_paid(
        &mut self,
        territory_id: &TerritoryId,
        cost: f64,
        new_name: &str,
    ) -> Result<bool, DomainError> {
        let Some(territory) = self.territories.get_mut(territory_id) else {
            return Err(DomainError::TerritoryNotFound(territory_id.clone()));
        };
        if territory.balance() < cost {
            return Ok(false);
        }
        territory.remove_from_balance(cost)?;
        territory.rename(new_name);
        self.sink.record(TransactionRecord::new(
            territory_id.clone(),
            TransactionKind::Miscellaneous,
            cost,
            None,
        ));
        Ok(true)
    }

    // === War scaffolding ===

    /// Schedule an attack; every defender's war component records it.
    pub fn plan_attack(
        &mut self,
        attackers: Vec<TerritoryId>,
        defenders: Vec<TerritoryId>,
    ) -> crate::state::AttackId {
        let attack_id = self.attacks.register(attackers, defenders.clone());
        for defender_id in &defenders {
            if let Some(defender) = self.territories.get_mut(defender_id) {
                defender.war = defender.war.with_attack(attack_id.clone());
            }
        }
        attack_id
    }

    /// Resolve (drop) a planned attack, scrubbing defender war lists.
    pub fn resolve_attack(&mut self, attack_id: &crate::state::AttackId) {
        let Some(attack) = self.attacks.remove(attack_id) else {
            return;
        };
        for defender_id in &attack.defenders {
            if let Some(defender) = self.territories.get_mut(defender_id) {
                defender.war = defender.war.without_attack(attack_id);
            }
        }
    }

    /// Build a fort for a territory, linking both sides.
    pub fn register_fort(&mut self, territory_id: &TerritoryId, position: ChunkPos) -> Option<crate::state::FortId> {
        if !self.territories.contains(territory_id) {
            return None;
        }
        let fort_id = self.forts.register(position, territory_id.clone());
        if let Some(territory) = self.territories.get_mut(territory_id) {
            territory.war = territory.war.with_fort(fort_id.clone());
        }
        Some(fort_id)
    }

    /// An attacker takes control of a fort.
    pub fn occupy_fort(&mut self, fort_id: &crate::state::FortId, occupier_id: &TerritoryId) {
        let Some(previous) = self.forts.get(fort_id).map(|f| f.occupier.clone()) else {
            return;
        };
        self.forts.occupy(fort_id, occupier_id.clone());
        if let Some(previous_occupier) = previous {
            if let Some(territory) = self.territories.get_mut(&previous_occupier) {
                territory.war = territory.war.without_occupied_fort(fort_id);
            }
        }
        if let Some(occupier) = self.territories.get_mut(occupier_id) {
            occupier.war = occupier.war.with_occupied_fort(fort_id.clone());
        }
    }

    /// Return a fort to its owner.
    pub fn liberate_fort(&mut self, fort_id: &crate::state::FortId) {
        let occupier = self.forts.get(fort_id).and_then(|f| f.occupier.clone());
        self.forts.liberate(fort_id);
        if let Some(occupier_id) = occupier {
            if let Some(territory) = self.territories.get_mut(&occupier_id) {
                territory.war = territory.war.without_occupied_fort(fort_id);
            }
        }
    }

    // === Economy ===

    /// Run one scheduled economy cycle and keep the permission cache
    /// consistent with any forced releases.
    pub fn run_economy_cycle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> CycleSummary {
        let (summary, outcomes) = systems::run_economy_cycle(
            &mut self.territories,
            &mut self.players,
            &self.claims,
            &self.config,
            self.sink.as_ref(),
            &self.observers,
            rng,
        );
        for outcome in &outcomes {
            for pos in &outcome.released {
                self.permissions.cache().invalidate_chunk(pos);
            }
        }
        summary
    }

    /// Projection of the next cycle's salary and upkeep lines, for
    /// budget display.
    pub fn budget_projection(&self, territory_id: &TerritoryId) -> Vec<BudgetLine> {
        let Some(territory) = self.territories.get(territory_id) else {
            return Vec::new();
        };
        let mut lines = Vec::new();
        for rank in territory.ranks_sorted() {
            if rank.salary != 0 && rank.member_count() > 0 {
                lines.push(BudgetLine {
                    label: format!("salary: {}", rank.name),
                    amount: -(rank.member_count() as f64 * rank.salary as f64),
                });
            }
        }
        let upkeep =
            self.claims.claimed_count(territory_id) as f64 * self.config.economy.upkeep_per_chunk;
        lines.push(BudgetLine {
            label: "chunk upkeep".to_string(),
            amount: -upkeep,
        });
        lines
    }

    // === Authorization ===

    /// Hot-path permission check; see
    /// [`PermissionService::can_player_act_sync`].
    pub fn can_player_act_sync(
        &self,
        player: &PlayerId,
        pos: &ChunkPos,
        permission: ChunkPermissionType,
    ) -> bool {
        self.permissions.can_player_act_sync(
            player,
            pos,
            permission,
            &self.config,
            &self.territories,
            &self.players,
            &self.claims,
            &self.attacks,
        )
    }

    pub fn can_pvp_happen(&self, attacker: &PlayerId, victim: &PlayerId, pos: &ChunkPos) -> bool {
        self.permissions.can_pvp_happen(
            attacker,
            victim,
            pos,
            &self.territories,
            &self.players,
            &self.claims,
        )
    }
}
