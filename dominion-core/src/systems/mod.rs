//! Economy simulation systems.
//!
//! The scheduled economy cycle runs three steps per territory in fixed
//! order: tax collection, salary disbursement, chunk upkeep. The order
//! is load-bearing: salaries are evaluated before upkeep, so a
//! territory can pay its ranks and still shed chunks in the same cycle
//! — intended degradation, not a bug.

pub mod salaries;
pub mod taxation;
pub mod upkeep;

pub use salaries::{pay_salaries, run_salary_tick};
pub use taxation::{collect_taxes, run_taxation_tick};
pub use upkeep::{pay_chunk_upkeep, run_upkeep_tick, UpkeepOutcome};

use crate::claims::ChunkRegistry;
use crate::config::EngineConfig;
use crate::events::ObserverRegistry;
use crate::metrics::CycleSummary;
use crate::state::{PlayerRegistry, TerritoryId, TerritoryRegistry};
use crate::storage::TransactionSink;
use rand::Rng;
use tracing::instrument;

/// Run one territory's full economy sequence: tax → salary → upkeep.
#[allow(clippy::too_many_arguments)]
pub fn execute_tasks<R: Rng + ?Sized>(
    id: &TerritoryId,
    territories: &mut TerritoryRegistry,
    players: &mut PlayerRegistry,
    claims: &ChunkRegistry,
    config: &EngineConfig,
    sink: &dyn TransactionSink,
    observers: &ObserverRegistry,
    rng: &mut R,
) -> UpkeepOutcome {
    collect_taxes(id, territories, players, sink);
    pay_salaries(id, territories, players, sink);
    pay_chunk_upkeep(id, territories, claims, config, sink, observers, rng)
}

/// Run one economy cycle over every territory.
///
/// Taxes run first for all territories (towns plan in parallel), then
/// salaries and upkeep per territory in sorted order. Each territory
/// still experiences the strict tax → salary → upkeep sequence.
/// Returns the cycle summary plus the released chunks, which the caller
/// must invalidate in the permission cache.
#[instrument(skip_all, name = "economy_cycle")]
#[allow(clippy::too_many_arguments)]
pub fn run_economy_cycle<R: Rng + ?Sized>(
    territories: &mut TerritoryRegistry,
    players: &mut PlayerRegistry,
    claims: &ChunkRegistry,
    config: &EngineConfig,
    sink: &dyn TransactionSink,
    observers: &ObserverRegistry,
    rng: &mut R,
) -> (CycleSummary, Vec<UpkeepOutcome>) {
    let mut summary = CycleSummary {
        territories_processed: territories.len(),
        ..CycleSummary::default()
    };

    summary.taxes_collected = run_taxation_tick(territories, players, sink);

    let mut outcomes = Vec::new();
    for id in territories.ids_sorted() {
        summary.salaries_paid += pay_salaries(&id, territories, players, sink);
        let outcome = pay_chunk_upkeep(&id, territories, claims, config, sink, observers, rng);
        summary.upkeep_paid += outcome.paid;
        if !outcome.released.is_empty() {
            summary.shortfalls += 1;
            summary.chunks_released += outcome.released.len();
        }
        outcomes.push(outcome);
    }

    log::debug!(
        "Economy cycle: {} territories, taxes {:.2}, salaries {:.2}, upkeep {:.2}, {} shortfalls",
        summary.territories_processed,
        summary.taxes_collected,
        summary.salaries_paid,
        summary.upkeep_paid,
        summary.shortfalls
    );
    (summary, outcomes)
}
