//! High-frequency authorization: the permission cache and the checks
//! in front of it.
//!
//! Every world-interaction event funnels through here, so the layout is
//! tuned for the hot path: lock-free reads from a sharded map, record
//! keys with chunk granularity, and a short TTL instead of precise
//! cross-invalidation. Disabled permission types and sudo players skip
//! the cache entirely.
//!
//! Two check shapes exist: [`PermissionService::can_player_act_sync`]
//! for contexts that cannot suspend (it only ever reads resident
//! in-memory state), and [`can_player_act`] which may hydrate the
//! owning territory through the lazy loader first.

use crate::chunk::{ChunkPermissionType, ChunkPos, ClaimedChunk};
use crate::claims::ChunkRegistry;
use crate::config::EngineConfig;
use crate::forts::AttackRegistry;
use crate::loader::TerritoryLoader;
use crate::metrics::CacheStats;
use crate::relation::TerritoryRelation;
use crate::state::{PlayerData, PlayerId, PlayerRegistry, TerritoryRegistry, WorldId};
use crate::storage::{StorageError, TerritoryStore};
use crate::territory::Territory;
use crate::time::Clock;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;

/// Immutable key for cache lookups: player, chunk coordinates, world
/// and permission type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PermissionKey {
    player: PlayerId,
    chunk_x: i32,
    chunk_z: i32,
    world: WorldId,
    permission: ChunkPermissionType,
}

impl PermissionKey {
    fn new(player: &PlayerId, pos: &ChunkPos, permission: ChunkPermissionType) -> Self {
        Self {
            player: player.clone(),
            chunk_x: pos.x,
            chunk_z: pos.z,
            world: pos.world.clone(),
            permission,
        }
    }
}

/// Cached decision with its creation timestamp. Entries are immutable
/// once written; refreshes replace the whole value.
#[derive(Debug, Clone, Copy)]
struct CachedDecision {
    allowed: bool,
    created_nanos: u64,
}

/// Concurrent TTL cache for authorization decisions.
pub struct PermissionCache {
    cache: DashMap<PermissionKey, CachedDecision>,
    ttl_nanos: u64,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl PermissionCache {
    pub fn new(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: DashMap::with_capacity(config.permission_cache.max_entries),
            ttl_nanos: config.permission_cache.ttl_nanos,
            max_entries: config.permission_cache.max_entries,
            clock,
            stats: CacheStats::new(),
        }
    }

    /// Cached result, `None` when absent or expired. Expired entries
    /// are removed on read.
    pub fn get_cached(
        &self,
        player: &PlayerId,
        pos: &ChunkPos,
        permission: ChunkPermissionType,
    ) -> Option<bool> {
        let key = PermissionKey::new(player, pos, permission);
        let decision = match self.cache.get(&key) {
            Some(entry) => *entry,
            None => {
                self.stats.record_miss();
                return None;
            }
        };
        if self.clock.now_nanos().saturating_sub(decision.created_nanos) >= self.ttl_nanos {
            self.cache.remove(&key);
            self.stats.record_miss();
            return None;
        }
        self.stats.record_hit();
        Some(decision.allowed)
    }

    /// Cache a computed decision with a fresh timestamp.
    pub fn insert(
        &self,
        player: &PlayerId,
        pos: &ChunkPos,
        permission: ChunkPermissionType,
        allowed: bool,
    ) {
        let key = PermissionKey::new(player, pos, permission);
        self.cache.insert(
            key,
            CachedDecision {
                allowed,
                created_nanos: self.clock.now_nanos(),
            },
        );
        if self.cache.len() > self.max_entries {
            self.sweep_expired();
        }
    }

    /// All cached decisions for one player. Called on town join/leave
    /// and relation changes.
    pub fn invalidate_player(&self, player: &PlayerId) {
        self.cache.retain(|key, _| &key.player != player);
    }

    /// All cached decisions for one chunk. Called on ownership change.
    pub fn invalidate_chunk(&self, pos: &ChunkPos) {
        self.cache
            .retain(|key, _| key.chunk_x != pos.x || key.chunk_z != pos.z || key.world != pos.world);
    }

    /// Territory-level invalidation. The cache keeps no territory→chunk
    /// index, so this degrades to a size-triggered sweep; stale entries
    /// beyond that age out within one TTL.
    pub fn invalidate_territory(&self) {
        if self.cache.len() > self.max_entries / 2 {
            self.sweep_expired();
        }
    }

    pub fn clear(&self) {
        let dropped = self.cache.len();
        self.cache.clear();
        self.stats.record_evictions(dropped as u64);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn sweep_expired(&self) {
        let now = self.clock.now_nanos();
        let before = self.cache.len();
        self.cache
            .retain(|_, decision| now.saturating_sub(decision.created_nanos) < self.ttl_nanos);
        self.stats
            .record_evictions(before.saturating_sub(self.cache.len()) as u64);
    }
}

/// The full authorization computation, given whatever is known about
/// the chunk's owner. Unknown owners and unknown players default to
/// allow, matching the engine's "never block on missing data" policy
/// for world events.
fn compute_decision(
    owner: Option<&Territory>,
    player: Option<&PlayerData>,
    chunk: &ClaimedChunk,
    permission: ChunkPermissionType,
    territories: &TerritoryRegistry,
    attacks: &AttackRegistry,
) -> bool {
    let Some(owner) = owner else {
        return true;
    };
    let Some(player) = player else {
        return true;
    };
    let is_member = player.is_member_of(&owner.id);
    let player_territories = territories.territories_of_player(player);
    let at_war = player_territories
        .iter()
        .any(|t| attacks.are_opposed(t, &owner.id));
    let mut relation: Option<TerritoryRelation> = None;
    for t in &player_territories {
        let r = owner.relation_with(t);
        relation = Some(match relation {
            Some(current) => current.worst(r),
            None => r,
        });
    }
    let relation = relation.unwrap_or(TerritoryRelation::Neutral);
    at_war || chunk.allows_action(relation, is_member, permission)
}

/// Authorization front-end owning the cache and sudo list.
pub struct PermissionService {
    cache: PermissionCache,
    sudo_players: DashSet<PlayerId>,
}

impl PermissionService {
    pub fn new(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: PermissionCache::new(config, clock),
            sudo_players: DashSet::new(),
        }
    }

    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// Replace the cache with one built from a fresh config snapshot.
    /// The sudo list survives; cached decisions do not.
    pub fn rebuild_cache(&mut self, config: &EngineConfig, clock: Arc<dyn Clock>) {
        self.cache = PermissionCache::new(config, clock);
    }

    pub fn set_sudo(&self, player: PlayerId, enabled: bool) {
        if enabled {
            self.sudo_players.insert(player);
        } else {
            self.sudo_players.remove(&player);
        }
    }

    pub fn is_sudo(&self, player: &PlayerId) -> bool {
        self.sudo_players.contains(player)
    }

    /// Synchronous permission check for hot-path event handlers.
    ///
    /// Never touches storage: the decision is computed from resident
    /// state only. A chunk owned by a territory that is not loaded
    /// reads as unowned, which fails open — the same trade the cache
    /// TTL already makes.
    #[allow(clippy::too_many_arguments)]
    pub fn can_player_act_sync(
        &self,
        player: &PlayerId,
        pos: &ChunkPos,
        permission: ChunkPermissionType,
        config: &EngineConfig,
        territories: &TerritoryRegistry,
        players: &PlayerRegistry,
        claims: &ChunkRegistry,
        attacks: &AttackRegistry,
    ) -> bool {
        if config.is_permission_disabled(permission) {
            return true;
        }
        if self.is_sudo(player) {
            return true;
        }
        if let Some(cached) = self.cache.get_cached(player, pos, permission) {
            return cached;
        }

        let chunk = claims.snapshot(pos);
        let owner = chunk.owner.as_ref().and_then(|id| territories.get(id));
        let result = compute_decision(
            owner,
            players.get(player),
            &chunk,
            permission,
            territories,
            attacks,
        );
        self.cache.insert(player, pos, permission, result);
        result
    }

    /// Whether two players may fight at `pos`: the chunk must allow PvP
    /// and the players' worst mutual relation must permit it.
    pub fn can_pvp_happen(
        &self,
        attacker: &PlayerId,
        victim: &PlayerId,
        pos: &ChunkPos,
        territories: &TerritoryRegistry,
        players: &PlayerRegistry,
        claims: &ChunkRegistry,
    ) -> bool {
        let chunk = claims.snapshot(pos);
        if !chunk.allows_pvp() {
            return false;
        }
        match (players.get(attacker), players.get(victim)) {
            (Some(a), Some(b)) => territories.worst_relation_between_players(a, b).allows_pvp(),
            _ => true,
        }
    }
}

/// Blocking-tolerant permission check: hydrates the owning territory
/// through the lazy loader when it is not resident, then decides.
///
/// Storage failures surface as a failed future; the cache is left
/// untouched in that case.
#[allow(clippy::too_many_arguments)]
pub async fn can_player_act<S: TerritoryStore>(
    service: &PermissionService,
    loader: &TerritoryLoader<S>,
    player: &PlayerId,
    pos: &ChunkPos,
    permission: ChunkPermissionType,
    config: &EngineConfig,
    territories: &TerritoryRegistry,
    players: &PlayerRegistry,
    claims: &ChunkRegistry,
    attacks: &AttackRegistry,
) -> Result<bool, StorageError> {
    if config.is_permission_disabled(permission) {
        return Ok(true);
    }
    if service.is_sudo(player) {
        return Ok(true);
    }
    if let Some(cached) = service.cache.get_cached(player, pos, permission) {
        return Ok(cached);
    }

    let chunk = claims.snapshot(pos);
    let hydrated = match &chunk.owner {
        Some(id) if territories.get(id).is_none() => loader.get(id).await?,
        _ => None,
    };
    let owner = chunk
        .owner
        .as_ref()
        .and_then(|id| territories.get(id))
        .or(hydrated.as_deref());
    let result = compute_decision(
        owner,
        players.get(player),
        &chunk,
        permission,
        territories,
        attacks,
    );
    service.cache.insert(player, pos, permission, result);
    Ok(result)
}
