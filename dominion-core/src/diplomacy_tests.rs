//! Scenario tests for the diplomacy and hierarchy state machine,
//! including the relation-driven permission flows.

use crate::chunk::ChunkPermissionType;
use crate::engine::Engine;
use crate::error::DomainError;
use crate::events::EngineEvent;
use crate::relation::TerritoryRelation;
use crate::state::{PlayerId, TerritoryId};
use crate::testing::{default_chunk, RecordingObserver, WorldBuilder};

fn two_towns() -> Engine {
    WorldBuilder::new()
        .with_town("a", "Aldford", "leader_a")
        .with_town("b", "Brightwater", "leader_b")
        .build()
}

fn id(s: &str) -> TerritoryId {
    TerritoryId::new(s)
}

#[test]
fn test_alliance_proposal_accept_end_to_end() {
    let mut engine = two_towns();
    let recording = RecordingObserver::new();
    engine.observers.register(Box::new(recording.clone()));

    engine
        .receive_diplomatic_proposal(&id("a"), &id("b"), TerritoryRelation::Ally)
        .unwrap();

    // Exactly one entry, keyed by the proposer.
    let b = engine.territories.get(&id("b")).unwrap();
    assert_eq!(b.diplomacy.proposal_count(), 1);
    assert!(b.diplomacy.proposal_from(&id("a")).is_some());

    let accepted = engine.accept_diplomatic_proposal(&id("a"), &id("b")).unwrap();
    assert_eq!(accepted, TerritoryRelation::Ally);

    // Symmetric on both sides, proposal consumed.
    assert_eq!(
        engine.territories.relation_between(&id("a"), &id("b")),
        TerritoryRelation::Ally
    );
    assert_eq!(
        engine.territories.relation_between(&id("b"), &id("a")),
        TerritoryRelation::Ally
    );
    assert_eq!(
        engine
            .territories
            .get(&id("b"))
            .unwrap()
            .diplomacy
            .proposal_count(),
        0
    );

    // Events arrive in call order.
    let events = recording.events();
    assert!(matches!(
        events[0],
        EngineEvent::DiplomacyProposalReceived { .. }
    ));
    assert!(matches!(events[1], EngineEvent::RelationChanged { .. }));
}

#[test]
fn test_proposal_replace_keeps_latest_relation() {
    let mut engine = two_towns();
    engine
        .receive_diplomatic_proposal(&id("a"), &id("b"), TerritoryRelation::Ally)
        .unwrap();
    engine
        .receive_diplomatic_proposal(&id("a"), &id("b"), TerritoryRelation::Enemy)
        .unwrap();

    let b = engine.territories.get(&id("b")).unwrap();
    assert_eq!(b.diplomacy.proposal_count(), 1);
    assert_eq!(
        b.diplomacy.proposal_from(&id("a")).unwrap().wanted,
        TerritoryRelation::Enemy
    );
}

#[test]
fn test_accept_without_proposal_is_an_error() {
    let mut engine = two_towns();
    let result = engine.accept_diplomatic_proposal(&id("a"), &id("b"));
    assert!(matches!(result, Err(DomainError::NoSuchProposal { .. })));
}

#[test]
fn test_reject_drops_the_proposal() {
    let mut engine = two_towns();
    engine
        .receive_diplomatic_proposal(&id("a"), &id("b"), TerritoryRelation::Ally)
        .unwrap();
    engine.reject_diplomatic_proposal(&id("a"), &id("b"));
    assert_eq!(
        engine
            .territories
            .get(&id("b"))
            .unwrap()
            .diplomacy
            .proposal_count(),
        0
    );
    // Relation untouched.
    assert_eq!(
        engine.territories.relation_between(&id("a"), &id("b")),
        TerritoryRelation::Neutral
    );
}

#[test]
fn test_vassalization_links_both_sides_atomically() {
    let mut engine = WorldBuilder::new()
        .with_town("t1", "Riverton", "leader")
        .with_region("r1", "Northmarch")
        .build();
    let recording = RecordingObserver::new();
    engine.observers.register(Box::new(recording.clone()));

    engine.add_vassalisation_proposal(&id("r1"), &id("t1")).unwrap();
    assert!(engine
        .territories
        .get(&id("t1"))
        .unwrap()
        .diplomacy
        .has_overlord_proposal_from(&id("r1")));

    engine.accept_vassalisation(&id("t1"), &id("r1")).unwrap();

    // For all T, V: T.is_vassal(V) == (V.overlord == T).
    let region = engine.territories.get(&id("r1")).unwrap();
    let town = engine.territories.get(&id("t1")).unwrap();
    assert!(region.is_vassal(&id("t1")));
    assert_eq!(town.overlord.as_ref(), Some(&id("r1")));
    // Proposal consumed.
    assert_eq!(town.diplomacy.overlord_proposal_count(), 0);
    // Computed relations reflect the link.
    assert_eq!(town.relation_with(&id("r1")), TerritoryRelation::Overlord);
    assert_eq!(region.relation_with(&id("t1")), TerritoryRelation::Vassal);

    let events = recording.events();
    assert!(matches!(events[0], EngineEvent::VassalProposalReceived { .. }));
    assert!(matches!(events[1], EngineEvent::VassalAccepted { .. }));
}

#[test]
fn test_second_overlord_accept_is_rejected() {
    let mut engine = WorldBuilder::new()
        .with_town("t1", "Riverton", "leader")
        .with_region("r1", "Northmarch")
        .with_region("r2", "Southmarch")
        .build();
    engine.add_vassalisation_proposal(&id("r1"), &id("t1")).unwrap();
    engine.add_vassalisation_proposal(&id("r2"), &id("t1")).unwrap();

    engine.accept_vassalisation(&id("t1"), &id("r1")).unwrap();
    let second = engine.accept_vassalisation(&id("t1"), &id("r2"));
    assert!(matches!(second, Err(DomainError::AlreadyHasOverlord(_))));

    // No half-written link on the losing side.
    assert!(!engine.territories.get(&id("r2")).unwrap().is_vassal(&id("t1")));
}

#[test]
fn test_remove_overlord_consistent_and_idempotent() {
    let mut engine = WorldBuilder::new()
        .with_town("t1", "Riverton", "leader")
        .with_region("r1", "Northmarch")
        .with_vassal("r1", "t1")
        .build();

    engine.remove_overlord(&id("t1"));
    assert!(!engine.territories.get(&id("r1")).unwrap().is_vassal(&id("t1")));
    assert!(engine.territories.get(&id("t1")).unwrap().overlord.is_none());

    // No overlord set: a silent no-op.
    engine.remove_overlord(&id("t1"));
    assert!(engine.territories.get(&id("t1")).unwrap().overlord.is_none());
}

#[test]
fn test_worst_relation_spans_town_and_region() {
    let mut engine = WorldBuilder::new()
        .with_town("t1", "Riverton", "leader")
        .with_town("x", "Foeburg", "leader_x")
        .with_region("r1", "Northmarch")
        .with_vassal("r1", "t1")
        .build();

    // Foeburg is allied with the town but hostile to its region.
    engine
        .set_relation(&id("x"), &id("t1"), TerritoryRelation::Ally)
        .unwrap();
    engine
        .set_relation(&id("x"), &id("r1"), TerritoryRelation::Enemy)
        .unwrap();

    let player = engine.players.get(&PlayerId::new("leader")).unwrap().clone();
    let worst = engine
        .territories
        .worst_relation_with_player(&id("x"), &player);
    assert_eq!(worst, TerritoryRelation::Enemy);
}

#[test]
fn test_permission_cache_relation_change_scenario() {
    let mut engine = WorldBuilder::new()
        .with_town("x", "Foeburg", "leader_x")
        .with_town("p_town", "Elsewhere", "p")
        .with_claimed_square("x", 2)
        .build();
    let player = PlayerId::new("p");
    let target = default_chunk(1, 1);

    // Cache miss: chunk owned by a neutral town with member-only rules.
    assert!(!engine.can_player_act_sync(&player, &target, ChunkPermissionType::BreakBlock));
    assert_eq!(engine.permissions.cache().len(), 1);

    // Open the chunk rules to allies, then ally the towns; the stale
    // denial stays cached until the player is invalidated.
    engine.claims.update_settings(&target, |settings| {
        settings.set_rule(
            ChunkPermissionType::BreakBlock,
            crate::chunk::ChunkAccess::Allies,
        );
    });
    engine
        .set_relation(&id("x"), &id("p_town"), TerritoryRelation::Ally)
        .unwrap();
    // set_relation invalidated the members of both towns, so the next
    // check recomputes and allows.
    assert!(engine.can_player_act_sync(&player, &target, ChunkPermissionType::BreakBlock));
}

#[test]
fn test_war_overrides_chunk_policy() {
    let mut engine = WorldBuilder::new()
        .with_town("x", "Foeburg", "leader_x")
        .with_town("y", "Warton", "p")
        .with_claimed_square("x", 1)
        .build();
    let player = PlayerId::new("p");
    let target = default_chunk(0, 0);

    assert!(!engine.can_player_act_sync(&player, &target, ChunkPermissionType::BreakBlock));

    engine.plan_attack(vec![id("y")], vec![id("x")]);
    engine.permissions.cache().invalidate_player(&player);
    // At war: the attacker may grief regardless of chunk rules.
    assert!(engine.can_player_act_sync(&player, &target, ChunkPermissionType::BreakBlock));
}

#[test]
fn test_delete_territory_full_teardown() {
    let mut engine = WorldBuilder::new()
        .with_town("t1", "Riverton", "leader")
        .with_town("t2", "Brightwater", "leader_b")
        .with_region("r1", "Northmarch")
        .with_vassal("r1", "t1")
        .with_claimed_square("r1", 2)
        .build();
    let recording = RecordingObserver::new();
    engine.observers.register(Box::new(recording.clone()));

    // Seed state that must be purged.
    engine
        .set_relation(&id("r1"), &id("t2"), TerritoryRelation::Enemy)
        .unwrap();
    engine
        .receive_diplomatic_proposal(&id("r1"), &id("t2"), TerritoryRelation::Ally)
        .unwrap();
    let fort = engine.register_fort(&id("r1"), default_chunk(0, 0)).unwrap();
    engine.plan_attack(vec![id("t2")], vec![id("r1")]);

    engine.delete_territory(&id("r1"));

    assert!(engine.territories.get(&id("r1")).is_none());
    // Claims released.
    assert_eq!(engine.claims.claimed_count(&id("r1")), 0);
    // Vassal freed.
    assert!(engine.territories.get(&id("t1")).unwrap().overlord.is_none());
    // Diplomacy purged on survivors.
    let t2 = engine.territories.get(&id("t2")).unwrap();
    assert_eq!(t2.relation_with(&id("r1")), TerritoryRelation::Neutral);
    assert_eq!(t2.diplomacy.proposal_count(), 0);
    // Owned forts deleted, attacks scrubbed.
    assert!(engine.forts.get(&fort).is_none());
    assert!(engine.attacks.is_empty());
    assert!(recording
        .events()
        .contains(&EngineEvent::TerritoryDeleted { territory: id("r1") }));

    // Deleting again is a tolerated no-op.
    engine.delete_territory(&id("r1"));
}

#[test]
fn test_pvp_requires_chunk_and_relation_consent() {
    let mut engine = WorldBuilder::new()
        .with_town("x", "Foeburg", "p1")
        .with_town("y", "Warton", "p2")
        .with_claimed_square("x", 1)
        .build();
    let target = default_chunk(0, 0);

    // Neutral towns: PvP allowed where the chunk allows it.
    assert!(engine.can_pvp_happen(&PlayerId::new("p1"), &PlayerId::new("p2"), &target));

    engine
        .set_relation(&id("x"), &id("y"), TerritoryRelation::Ally)
        .unwrap();
    assert!(!engine.can_pvp_happen(&PlayerId::new("p1"), &PlayerId::new("p2"), &target));

    // Chunk-level PvP toggle wins over hostile relations.
    engine
        .set_relation(&id("x"), &id("y"), TerritoryRelation::Enemy)
        .unwrap();
    engine.claims.update_settings(&target, |settings| {
        settings.pvp_enabled = false;
    });
    assert!(!engine.can_pvp_happen(&PlayerId::new("p1"), &PlayerId::new("p2"), &target));
}
