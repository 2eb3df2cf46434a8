//! Fixtures for tests and the sim driver.

use crate::chunk::{ChunkPos, ChunkSettings};
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::state::{PlayerData, PlayerId, TerritoryId, WorldId};
use crate::storage::MemorySink;
use crate::territory::Territory;
use crate::time::ManualClock;
use std::sync::Arc;

/// Builder assembling an [`Engine`] with a manual clock and an
/// in-memory transaction sink.
pub struct WorldBuilder {
    config: EngineConfig,
    players: Vec<(String, f64)>,
    towns: Vec<(String, String, String)>,
    regions: Vec<(String, String)>,
    members: Vec<(String, String)>,
    vassals: Vec<(String, String)>,
    balances: Vec<(String, f64)>,
    claimed_squares: Vec<(String, i32)>,
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            players: Vec::new(),
            towns: Vec::new(),
            regions: Vec::new(),
            members: Vec::new(),
            vassals: Vec::new(),
            balances: Vec::new(),
            claimed_squares: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_player(mut self, id: &str, balance: f64) -> Self {
        self.players.push((id.to_string(), balance));
        self
    }

    pub fn with_town(mut self, id: &str, name: &str, leader: &str) -> Self {
        self.towns
            .push((id.to_string(), name.to_string(), leader.to_string()));
        self
    }

    pub fn with_region(mut self, id: &str, name: &str) -> Self {
        self.regions.push((id.to_string(), name.to_string()));
        self
    }

    pub fn with_member(mut self, town: &str, player: &str) -> Self {
        self.members.push((town.to_string(), player.to_string()));
        self
    }

    /// Link a vassal under an overlord directly, skipping the proposal
    /// flow.
    pub fn with_vassal(mut self, overlord: &str, vassal: &str) -> Self {
        self.vassals.push((overlord.to_string(), vassal.to_string()));
        self
    }

    pub fn with_balance(mut self, territory: &str, balance: f64) -> Self {
        self.balances.push((territory.to_string(), balance));
        self
    }

    /// Claim a `size`×`size` square of chunks at the origin of the
    /// default world for a territory.
    pub fn with_claimed_square(mut self, territory: &str, size: i32) -> Self {
        self.claimed_squares.push((territory.to_string(), size));
        self
    }

    pub fn build(self) -> Engine {
        let (engine, _, _) = self.build_with_parts();
        engine
    }

    /// Build, returning the clock and sink for direct manipulation.
    pub fn build_with_parts(self) -> (Engine, Arc<ManualClock>, Arc<MemorySink>) {
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(MemorySink::new());
        let mut engine = Engine::new(Arc::new(self.config), clock.clone(), sink.clone());

        for (id, balance) in &self.players {
            let mut player = PlayerData::new(id.clone(), id.clone());
            player.balance = *balance;
            engine.add_player(player);
        }
        for (id, name, leader) in &self.towns {
            let leader_id = PlayerId::new(leader.clone());
            if engine.players.get(&leader_id).is_none() {
                engine.add_player(PlayerData::new(leader.clone(), leader.clone()));
            }
            engine
                .create_town(id.clone(), name.clone(), &leader_id)
                .expect("builder town creation");
        }
        for (id, name) in &self.regions {
            let region = Territory::new_region(id.clone(), name.clone());
            engine.territories.insert(region);
        }
        for (town, player) in &self.members {
            engine
                .join_town(&TerritoryId::new(town.clone()), &PlayerId::new(player.clone()))
                .expect("builder membership");
        }
        for (overlord, vassal) in &self.vassals {
            let overlord_id = TerritoryId::new(overlord.clone());
            let vassal_id = TerritoryId::new(vassal.clone());
            if let Some(territory) = engine.territories.get_mut(&vassal_id) {
                territory.overlord = Some(overlord_id.clone());
            }
            if let Some(territory) = engine.territories.get_mut(&overlord_id) {
                territory.vassals.push(vassal_id);
            }
        }
        for (territory, balance) in &self.balances {
            if let Some(t) = engine.territories.get_mut(&TerritoryId::new(territory.clone())) {
                t.treasury = t.treasury.with_balance(*balance);
            }
        }
        for (territory, size) in &self.claimed_squares {
            let territory_id = TerritoryId::new(territory.clone());
            let settings = engine
                .territories
                .get(&territory_id)
                .map(|t| t.chunk_settings.clone())
                .unwrap_or_default();
            for x in 0..*size {
                for z in 0..*size {
                    engine.claims.assign_owner(
                        default_chunk(x, z),
                        territory_id.clone(),
                        settings.clone(),
                    );
                }
            }
        }

        (engine, clock, sink)
    }
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A chunk position in the default test world.
pub fn default_chunk(x: i32, z: i32) -> ChunkPos {
    ChunkPos::new(WorldId::new("overworld"), x, z)
}

/// Observer retaining every event, for asserting delivery and order.
#[derive(Default)]
pub struct RecordingObserver {
    events: std::sync::Mutex<Vec<crate::events::EngineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<crate::events::EngineEvent> {
        self.events.lock().expect("recording poisoned").clone()
    }
}

impl crate::events::EngineObserver for Arc<RecordingObserver> {
    fn on_event(
        &self,
        event: &crate::events::EngineEvent,
    ) -> Result<(), crate::events::ObserverError> {
        self.events
            .lock()
            .expect("recording poisoned")
            .push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Default settings bundle, re-exported for terse test setup.
pub fn default_settings() -> ChunkSettings {
    ChunkSettings::default()
}
