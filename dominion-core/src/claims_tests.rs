//! Scenario tests for the claim pipeline: rule order, adjacency,
//! buffer zones, capacity, cost and conquest.

use crate::chunk::Biome;
use crate::claims::ClaimDenial;
use crate::config::{ClaimConfig, EngineConfig};
use crate::state::{PlayerId, TerritoryId};
use crate::testing::{default_chunk, WorldBuilder};
use crate::upgrades::{TierConfig, TierTable};

fn id(s: &str) -> TerritoryId {
    TerritoryId::new(s)
}

fn leader() -> PlayerId {
    PlayerId::new("leader")
}

fn funded_town() -> crate::engine::Engine {
    WorldBuilder::new()
        .with_town("a", "Aldford", "leader")
        .with_balance("a", 1_000.0)
        .build()
}

#[test]
fn test_first_claim_succeeds_outside_buffer_zones() {
    let mut engine = funded_town();
    engine
        .claim_chunk(&id("a"), &leader(), &default_chunk(0, 0), false)
        .unwrap();

    assert_eq!(
        engine.claims.owner_of(&default_chunk(0, 0)),
        Some(id("a"))
    );
    // Tier-0 cost deducted together with the ownership change.
    assert_eq!(engine.territories.get(&id("a")).unwrap().balance(), 990.0);
}

#[test]
fn test_first_claim_denied_inside_foreign_buffer_zone() {
    let mut engine = WorldBuilder::new()
        .with_town("a", "Aldford", "leader")
        .with_balance("a", 1_000.0)
        .with_town("b", "Brightwater", "leader_b")
        .with_claimed_square("b", 1)
        .build();

    // Default buffer radius is 2: chunk (2,0) is in range of b's (0,0).
    let denied = engine.claim_chunk(&id("a"), &leader(), &default_chunk(2, 0), false);
    assert_eq!(denied, Err(ClaimDenial::InBufferZone { radius: 2 }));
    // Nothing changed.
    assert_eq!(engine.claims.owner_of(&default_chunk(2, 0)), None);
    assert_eq!(engine.territories.get(&id("a")).unwrap().balance(), 1_000.0);

    // One chunk further out is fine.
    engine
        .claim_chunk(&id("a"), &leader(), &default_chunk(3, 0), false)
        .unwrap();
}

#[test]
fn test_subsequent_claims_require_adjacency() {
    let mut engine = funded_town();
    engine
        .claim_chunk(&id("a"), &leader(), &default_chunk(0, 0), false)
        .unwrap();

    let denied = engine.claim_chunk(&id("a"), &leader(), &default_chunk(2, 2), false);
    assert_eq!(denied, Err(ClaimDenial::NotAdjacent));

    engine
        .claim_chunk(&id("a"), &leader(), &default_chunk(1, 0), false)
        .unwrap();
    // Diagonal is not 4-adjacent.
    let diagonal = engine.claim_chunk(&id("a"), &leader(), &default_chunk(2, 1), false);
    assert_eq!(diagonal, Err(ClaimDenial::NotAdjacent));

    // `ignore_adjacent` skips rule 7 entirely.
    engine
        .claim_chunk(&id("a"), &leader(), &default_chunk(5, 5), true)
        .unwrap();
}

#[test]
fn test_claim_denied_without_permission() {
    let mut engine = WorldBuilder::new()
        .with_town("a", "Aldford", "leader")
        .with_balance("a", 1_000.0)
        .with_player("citizen", 0.0)
        .with_member("a", "citizen")
        .build();

    // Default rank has no permissions.
    let denied = engine.claim_chunk(
        &id("a"),
        &PlayerId::new("citizen"),
        &default_chunk(0, 0),
        false,
    );
    assert_eq!(denied, Err(ClaimDenial::MissingPermission));

    // Strangers are denied the same way, never a panic.
    let stranger = engine.claim_chunk(
        &id("a"),
        &PlayerId::new("stranger"),
        &default_chunk(0, 0),
        false,
    );
    assert_eq!(stranger, Err(ClaimDenial::MissingPermission));
}

#[test]
fn test_blacklist_beats_everything() {
    let mut engine = funded_town();
    engine.claims.add_to_blacklist(default_chunk(0, 0));
    let denied = engine.claim_chunk(&id("a"), &leader(), &default_chunk(0, 0), true);
    assert_eq!(denied, Err(ClaimDenial::Blacklisted));
}

#[test]
fn test_insufficient_funds_denial_carries_amounts() {
    let mut engine = WorldBuilder::new()
        .with_town("a", "Aldford", "leader")
        .with_balance("a", 3.0)
        .build();
    let denied = engine.claim_chunk(&id("a"), &leader(), &default_chunk(0, 0), false);
    assert_eq!(
        denied,
        Err(ClaimDenial::InsufficientFunds {
            required: 10.0,
            available: 3.0,
        })
    );
}

#[test]
fn test_chunk_cap_and_biome_follow_the_tier_table() {
    let config = EngineConfig {
        town_tiers: TierTable::new(vec![TierConfig {
            chunk_cap: Some(2),
            chunk_cost: 1.0,
            allowed_biomes: vec![Biome::Plains],
        }]),
        claims: ClaimConfig {
            buffer_zone_radius: 2,
            allow_non_adjacent: true,
        },
        ..EngineConfig::default()
    };
    let mut engine = WorldBuilder::new()
        .with_config(config)
        .with_town("a", "Aldford", "leader")
        .with_balance("a", 100.0)
        .build();

    engine.claims.set_biome(default_chunk(9, 9), Biome::Ocean);
    assert_eq!(
        engine.claim_chunk(&id("a"), &leader(), &default_chunk(9, 9), false),
        Err(ClaimDenial::BiomeNotAllowed)
    );

    engine
        .claim_chunk(&id("a"), &leader(), &default_chunk(0, 0), false)
        .unwrap();
    engine
        .claim_chunk(&id("a"), &leader(), &default_chunk(1, 0), false)
        .unwrap();
    assert_eq!(
        engine.claim_chunk(&id("a"), &leader(), &default_chunk(2, 0), false),
        Err(ClaimDenial::ChunkCapReached { cap: 2 })
    );
}

#[test]
fn test_conquest_consumes_exactly_one_credit() {
    let mut engine = WorldBuilder::new()
        .with_town("a", "Aldford", "leader")
        .with_balance("a", 1_000.0)
        .with_town("b", "Brightwater", "leader_b")
        .with_claimed_square("b", 2)
        .build();

    // No credit: the chunk's policy refuses the transfer.
    assert_eq!(
        engine.claim_chunk(&id("a"), &leader(), &default_chunk(0, 0), true),
        Err(ClaimDenial::ChunkRefused)
    );
    assert!(!engine.can_conquer_chunk(&id("a"), &default_chunk(0, 0)));

    engine
        .territories
        .get_mut(&id("a"))
        .unwrap()
        .add_enemy_claims(id("b"), 1);
    assert!(engine.can_conquer_chunk(&id("a"), &default_chunk(0, 0)));

    engine
        .claim_chunk(&id("a"), &leader(), &default_chunk(0, 0), true)
        .unwrap();
    assert_eq!(engine.claims.owner_of(&default_chunk(0, 0)), Some(id("a")));
    assert_eq!(engine.claims.claimed_count(&id("b")), 3);

    // The single credit is gone.
    assert_eq!(
        engine.claim_chunk(&id("a"), &leader(), &default_chunk(1, 0), true),
        Err(ClaimDenial::ChunkRefused)
    );
}

#[test]
fn test_unclaim_requires_permission_and_ownership() {
    let mut engine = funded_town();
    engine
        .claim_chunk(&id("a"), &leader(), &default_chunk(0, 0), false)
        .unwrap();

    assert_eq!(
        engine.unclaim_chunk(&id("a"), &PlayerId::new("stranger"), &default_chunk(0, 0)),
        Err(ClaimDenial::MissingPermission)
    );
    assert_eq!(
        engine.unclaim_chunk(&id("a"), &leader(), &default_chunk(5, 5)),
        Err(ClaimDenial::ChunkRefused)
    );

    engine
        .unclaim_chunk(&id("a"), &leader(), &default_chunk(0, 0))
        .unwrap();
    assert_eq!(engine.claims.owner_of(&default_chunk(0, 0)), None);
}
