//! Chunk upkeep billing with the shortfall degradation policy.
//!
//! `total = claimed_chunks * per_chunk_cost`. A territory that can pay
//! is debited and the deduction recorded; one that cannot sheds border
//! chunks through [`ChunkRegistry::force_release`] and records the
//! shortfall sentinel instead of a deduction. Chunk loss is destructive
//! and player-impacting, so it is announced through the observer layer
//! rather than failing silently.

use crate::chunk::ChunkPos;
use crate::claims::ChunkRegistry;
use crate::config::EngineConfig;
use crate::events::{EngineEvent, ObserverRegistry};
use crate::state::{TerritoryId, TerritoryRegistry};
use crate::storage::{
    TransactionKind, TransactionRecord, TransactionSink, UPKEEP_SHORTFALL_SENTINEL,
};
use rand::Rng;
use tracing::instrument;

/// Result of one territory's upkeep step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpkeepOutcome {
    /// Amount deducted; zero on shortfall.
    pub paid: f64,
    /// Chunks released by the shortfall policy; empty when paid.
    pub released: Vec<ChunkPos>,
}

/// Bill one territory for its claimed chunks.
#[allow(clippy::too_many_arguments)]
pub fn pay_chunk_upkeep<R: Rng + ?Sized>(
    id: &TerritoryId,
    territories: &mut TerritoryRegistry,
    claims: &ChunkRegistry,
    config: &EngineConfig,
    sink: &dyn TransactionSink,
    observers: &ObserverRegistry,
    rng: &mut R,
) -> UpkeepOutcome {
    let claimed = claims.claimed_count(id);
    let total_upkeep = claimed as f64 * config.economy.upkeep_per_chunk;
    let Some(territory) = territories.get_mut(id) else {
        return UpkeepOutcome::default();
    };

    if total_upkeep > territory.balance() {
        let released = claims.force_release(
            id,
            config.economy.unclaim_probability,
            config.economy.min_chunks_unclaimed,
            rng,
        );
        log::info!(
            "Upkeep shortfall for {id}: owed {total_upkeep:.2}, balance {:.2}, released {} chunks",
            territory.balance(),
            released.len()
        );
        sink.record(TransactionRecord::new(
            id.clone(),
            TransactionKind::ChunkUpkeep,
            UPKEEP_SHORTFALL_SENTINEL,
            None,
        ));
        observers.notify(&EngineEvent::ChunksLost {
            territory: id.clone(),
            count: released.len(),
        });
        return UpkeepOutcome {
            paid: 0.0,
            released,
        };
    }

    if territory.remove_from_balance(total_upkeep).is_err() {
        return UpkeepOutcome::default();
    }
    sink.record(TransactionRecord::new(
        id.clone(),
        TransactionKind::ChunkUpkeep,
        total_upkeep,
        None,
    ));
    UpkeepOutcome {
        paid: total_upkeep,
        released: Vec::new(),
    }
}

/// Run the upkeep step for every territory, in sorted order. Returns
/// per-territory outcomes for cache invalidation by the caller.
#[instrument(skip_all, name = "upkeep")]
pub fn run_upkeep_tick<R: Rng + ?Sized>(
    territories: &mut TerritoryRegistry,
    claims: &ChunkRegistry,
    config: &EngineConfig,
    sink: &dyn TransactionSink,
    observers: &ObserverRegistry,
    rng: &mut R,
) -> Vec<UpkeepOutcome> {
    territories
        .ids_sorted()
        .iter()
        .map(|id| pay_chunk_upkeep(id, territories, claims, config, sink, observers, rng))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySink;
    use crate::testing::WorldBuilder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_affordable_upkeep_is_deducted() {
        let world_id = TerritoryId::new("t1");
        let mut world = WorldBuilder::new()
            .with_town("t1", "Riverton", "leader")
            .with_balance("t1", 100.0)
            .with_claimed_square("t1", 2)
            .build();
        let sink = MemorySink::new();
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = pay_chunk_upkeep(
            &world_id,
            &mut world.territories,
            &world.claims,
            &world.config,
            &sink,
            &world.observers,
            &mut rng,
        );

        // 4 chunks * 2.0 default upkeep.
        assert_eq!(outcome.paid, 8.0);
        assert!(outcome.released.is_empty());
        assert_eq!(
            world.territories.get(&world_id).unwrap().balance(),
            92.0
        );
        let records = sink.records_of_kind(TransactionKind::ChunkUpkeep);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 8.0);
    }

    #[test]
    fn test_shortfall_releases_chunks_and_records_sentinel() {
        let world_id = TerritoryId::new("t1");
        let mut world = WorldBuilder::new()
            .with_town("t1", "Riverton", "leader")
            .with_balance("t1", 10.0)
            .with_claimed_square("t1", 4)
            .build();
        let sink = MemorySink::new();
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = pay_chunk_upkeep(
            &world_id,
            &mut world.territories,
            &world.claims,
            &world.config,
            &sink,
            &world.observers,
            &mut rng,
        );

        // 16 chunks * 2.0 = 32 > 10: shortfall.
        assert_eq!(outcome.paid, 0.0);
        assert!(
            outcome.released.len() >= world.config.economy.min_chunks_unclaimed as usize
        );
        // Balance untouched by the shortfall path.
        assert_eq!(world.territories.get(&world_id).unwrap().balance(), 10.0);
        let records = sink.records_of_kind(TransactionKind::ChunkUpkeep);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, UPKEEP_SHORTFALL_SENTINEL);
    }
}
