//! Headless driver: builds a synthetic world and runs economy cycles.
//!
//! Useful for eyeballing economy pacing and cache behavior without a
//! live game server.

use anyhow::Result;
use clap::Parser;
use dominion_core::chunk::ChunkPos;
use dominion_core::engine::Engine;
use dominion_core::state::{PlayerData, PlayerId, TerritoryId, WorldId};
use dominion_core::storage::MemorySink;
use dominion_core::time::SystemClock;
use dominion_core::EngineConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of towns to generate
    #[arg(long, default_value_t = 8)]
    towns: usize,

    /// Players per town
    #[arg(long, default_value_t = 4)]
    players_per_town: usize,

    /// Claimed square side length per town
    #[arg(long, default_value_t = 4)]
    claims: i32,

    /// Starting treasury per town
    #[arg(long, default_value_t = 150.0)]
    balance: f64,

    /// Number of economy cycles to run
    #[arg(short, long, default_value_t = 10)]
    cycles: u32,

    /// RNG seed for the forced-release policy
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn build_world(args: &Args) -> Result<Engine> {
    let sink = Arc::new(MemorySink::new());
    let mut engine = Engine::new(
        Arc::new(EngineConfig::default()),
        Arc::new(SystemClock::new()),
        sink,
    );

    let world = WorldId::new("overworld");
    for t in 0..args.towns {
        let leader = PlayerId::new(format!("leader-{t}"));
        let mut leader_data = PlayerData::new(leader.as_str(), format!("Leader {t}"));
        leader_data.balance = 50.0;
        engine.add_player(leader_data);

        let town_id = engine.create_town(format!("town-{t}"), format!("Town {t}"), &leader)?;
        for p in 0..args.players_per_town {
            let player = PlayerId::new(format!("citizen-{t}-{p}"));
            let mut data = PlayerData::new(player.as_str(), format!("Citizen {t}-{p}"));
            data.balance = 20.0;
            engine.add_player(data);
            engine.join_town(&town_id, &player)?;
        }

        if let Some(town) = engine.territories.get_mut(&town_id) {
            town.treasury = town.treasury.with_balance(args.balance);
        }

        // Each town gets its own square, spaced out past any buffer zone.
        let origin_x = t as i32 * (args.claims + 8);
        let settings = engine
            .territories
            .get(&town_id)
            .map(|t| t.chunk_settings.clone())
            .unwrap_or_default();
        for x in 0..args.claims {
            for z in 0..args.claims {
                engine.claims.assign_owner(
                    ChunkPos::new(world.clone(), origin_x + x, z),
                    town_id.clone(),
                    settings.clone(),
                );
            }
        }
    }
    Ok(engine)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    log::info!("Starting dominion-sim...");

    let mut engine = build_world(&args)?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    log::info!(
        "World: {} territories, {} claimed chunks",
        engine.territories.len(),
        engine.claims.total_claimed()
    );

    for cycle in 1..=args.cycles {
        let summary = engine.run_economy_cycle(&mut rng);
        log::info!(
            "Cycle {cycle}: taxes {:.2} | salaries {:.2} | upkeep {:.2} | shortfalls {} | chunks lost {}",
            summary.taxes_collected,
            summary.salaries_paid,
            summary.upkeep_paid,
            summary.shortfalls,
            summary.chunks_released
        );
        let sample = TerritoryId::new("town-0");
        if let Some(town) = engine.territories.get(&sample) {
            log::info!(
                "  town-0 treasury: {:.2} | chunks: {}",
                town.balance(),
                engine.claims.claimed_count(&sample)
            );
        }
    }

    log::info!(
        "Simulation finished: {} chunks still claimed",
        engine.claims.total_claimed()
    );
    Ok(())
}
