//! Tax collection, variant-specific.
//!
//! Towns charge their base tax to every member of every tax-paying
//! rank; members who cannot cover it are skipped (players never go into
//! debt). Regions charge their base tax to each vassal treasury, which
//! *may* go negative — territory debt is allowed. A negative base tax
//! works as a subsidy flowing the other way.

use crate::state::{PlayerId, PlayerRegistry, TerritoryId, TerritoryRegistry};
use crate::storage::{TransactionKind, TransactionRecord, TransactionSink};
use crate::territory::Territory;
use rayon::prelude::*;
use tracing::instrument;

/// One planned tax movement between a player and their town.
/// Negative amounts are subsidies paid out by the town.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TaxCharge {
    pub town: TerritoryId,
    pub player: PlayerId,
    pub amount: f64,
}

/// Compute a town's tax plan from a state snapshot (pure function).
pub(crate) fn plan_town_taxes(town: &Territory, players: &PlayerRegistry) -> Vec<TaxCharge> {
    let base_tax = town.taxes.base_tax();
    if base_tax == 0.0 {
        return Vec::new();
    }
    let mut charges = Vec::new();
    for rank in town.ranks() {
        if !rank.pays_taxes {
            continue;
        }
        for member in rank.members() {
            let Some(player) = players.get(member) else {
                log::warn!("Tax plan for {}: unknown player {member}", town.id);
                continue;
            };
            if base_tax > 0.0 && player.balance < base_tax {
                log::debug!(
                    "Tax plan for {}: {member} cannot pay {base_tax:.2}, skipped",
                    town.id
                );
                continue;
            }
            charges.push(TaxCharge {
                town: town.id.clone(),
                player: member.clone(),
                amount: base_tax,
            });
        }
    }
    charges
}

/// Apply planned charges, moving money and recording history. Returns
/// the net amount collected into treasuries.
pub(crate) fn apply_tax_charges(
    charges: &[TaxCharge],
    territories: &mut TerritoryRegistry,
    players: &mut PlayerRegistry,
    sink: &dyn TransactionSink,
) -> f64 {
    let mut collected = 0.0;
    for charge in charges {
        let Some(player) = players.get_mut(&charge.player) else {
            continue;
        };
        let Some(town) = territories.get_mut(&charge.town) else {
            continue;
        };
        if charge.amount >= 0.0 {
            player.balance -= charge.amount;
            if town.add_to_balance(charge.amount).is_err() {
                continue;
            }
        } else {
            let subsidy = -charge.amount;
            if town.remove_from_balance(subsidy).is_err() {
                continue;
            }
            player.balance += subsidy;
        }
        collected += charge.amount;
        sink.record(TransactionRecord::new(
            charge.town.clone(),
            TransactionKind::TaxCollection,
            charge.amount,
            Some(charge.player.as_str().to_string()),
        ));
    }
    collected
}

/// Collect a region's base tax from each vassal treasury.
pub(crate) fn collect_region_taxes(
    region_id: &TerritoryId,
    territories: &mut TerritoryRegistry,
    sink: &dyn TransactionSink,
) -> f64 {
    let Some(region) = territories.get(region_id) else {
        return 0.0;
    };
    let base_tax = region.taxes.base_tax();
    if base_tax == 0.0 {
        return 0.0;
    }
    let vassals: Vec<TerritoryId> = region.vassals.clone();

    let mut collected = 0.0;
    for vassal_id in vassals {
        let moved = if base_tax >= 0.0 {
            match territories.get_mut(&vassal_id) {
                Some(vassal) => vassal.remove_from_balance(base_tax).is_ok(),
                None => false,
            }
        } else {
            // Subsidy: the region funds its vassals.
            match territories.get_mut(&vassal_id) {
                Some(vassal) => vassal.add_to_balance(-base_tax).is_ok(),
                None => false,
            }
        };
        if !moved {
            continue;
        }
        if let Some(region) = territories.get_mut(region_id) {
            let applied = if base_tax >= 0.0 {
                region.add_to_balance(base_tax).is_ok()
            } else {
                region.remove_from_balance(-base_tax).is_ok()
            };
            if applied {
                collected += base_tax;
                sink.record(TransactionRecord::new(
                    region_id.clone(),
                    TransactionKind::TaxCollection,
                    base_tax,
                    Some(vassal_id.as_str().to_string()),
                ));
            }
        }
    }
    collected
}

/// Variant dispatch for a single territory's tax step.
pub fn collect_taxes(
    id: &TerritoryId,
    territories: &mut TerritoryRegistry,
    players: &mut PlayerRegistry,
    sink: &dyn TransactionSink,
) -> f64 {
    let Some(territory) = territories.get(id) else {
        return 0.0;
    };
    if territory.is_region() {
        collect_region_taxes(id, territories, sink)
    } else {
        let charges = plan_town_taxes(territory, players);
        apply_tax_charges(&charges, territories, players, sink)
    }
}

/// Run the tax step for every territory.
///
/// PHASE 1 computes town plans in parallel from the pre-cycle snapshot
/// (each plan touches only its own members, so plans are independent);
/// PHASE 2 applies them and runs region taxes sequentially in sorted
/// order for determinism.
#[instrument(skip_all, name = "taxation")]
pub fn run_taxation_tick(
    territories: &mut TerritoryRegistry,
    players: &mut PlayerRegistry,
    sink: &dyn TransactionSink,
) -> f64 {
    // PHASE 1: parallel planning over towns. Towns are sorted first so
    // the collected plans apply in deterministic order.
    let mut towns: Vec<&Territory> = territories.iter().filter(|t| t.is_town()).collect();
    towns.sort_by(|a, b| a.id.cmp(&b.id));
    let plans: Vec<Vec<TaxCharge>> = towns
        .par_iter()
        .map(|town| plan_town_taxes(town, players))
        .collect();

    // PHASE 2: sequential application.
    let mut collected = 0.0;
    for plan in &plans {
        collected += apply_tax_charges(plan, territories, players, sink);
    }
    for id in territories.ids_sorted() {
        let is_region = territories.get(&id).map(|t| t.is_region()).unwrap_or(false);
        if is_region {
            collected += collect_region_taxes(&id, territories, sink);
        }
    }
    collected
}
