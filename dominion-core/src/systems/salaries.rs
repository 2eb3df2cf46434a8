//! Salary disbursement.
//!
//! Per rank: `cost = member_count * salary`. A rank whose cost exceeds
//! the current balance is skipped entirely — no partial payment —
//! otherwise the cost is deducted once and every member is credited
//! individually, one history entry per member payment.

use crate::state::{PlayerRegistry, TerritoryId, TerritoryRegistry};
use crate::storage::{TransactionKind, TransactionRecord, TransactionSink};
use tracing::instrument;

/// Pay one territory's rank salaries. Returns the total deducted.
pub fn pay_salaries(
    id: &TerritoryId,
    territories: &mut TerritoryRegistry,
    players: &mut PlayerRegistry,
    sink: &dyn TransactionSink,
) -> f64 {
    let Some(territory) = territories.get(id) else {
        return 0.0;
    };

    // Snapshot rank payroll in id order; the balance evolves as ranks
    // are paid, so affordability is re-checked per rank.
    let mut payroll: Vec<(u32, i64, Vec<crate::state::PlayerId>)> = territory
        .ranks()
        .map(|rank| (rank.id, rank.salary, rank.members().to_vec()))
        .collect();
    payroll.sort_by_key(|(rank_id, _, _)| *rank_id);

    let mut total_paid = 0.0;
    for (rank_id, salary, members) in payroll {
        if salary == 0 || members.is_empty() {
            continue;
        }
        let cost = members.len() as f64 * salary as f64;
        let balance = territories.get(id).map(|t| t.balance()).unwrap_or(0.0);
        if cost > balance {
            log::debug!(
                "Salaries for {id}: rank {rank_id} costs {cost:.2} > balance {balance:.2}, skipped"
            );
            continue;
        }
        let Some(territory) = territories.get_mut(id) else {
            return total_paid;
        };
        if territory.remove_from_balance(cost).is_err() {
            continue;
        }
        total_paid += cost;
        for member in members {
            match players.get_mut(&member) {
                Some(player) => player.balance += salary as f64,
                None => {
                    log::warn!("Salaries for {id}: unknown player {member}");
                    continue;
                }
            }
            sink.record(TransactionRecord::new(
                id.clone(),
                TransactionKind::SalaryPayment,
                salary as f64,
                Some(member.as_str().to_string()),
            ));
        }
    }
    total_paid
}

/// Run the salary step for every territory, in sorted order.
#[instrument(skip_all, name = "salaries")]
pub fn run_salary_tick(
    territories: &mut TerritoryRegistry,
    players: &mut PlayerRegistry,
    sink: &dyn TransactionSink,
) -> f64 {
    let mut total = 0.0;
    for id in territories.ids_sorted() {
        total += pay_salaries(&id, territories, players, sink);
    }
    total
}
