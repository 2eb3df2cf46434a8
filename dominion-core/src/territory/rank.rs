//! Ranks: named permission bundles with a hierarchy level.
//!
//! Permissions are stored as a bitmask via [`PermissionSet`].
//! Zero-allocation, O(1) operations; the enum has far fewer than 32
//! members so `u32` leaves comfortable headroom.

use crate::state::{PlayerId, RankId};
use serde::{Deserialize, Serialize};

/// Actions a rank can be granted within its territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankPermission {
    ClaimChunk,
    UnclaimChunk,
    ManageClaimSettings,
    UpgradeTerritory,
    ManageRelations,
    InvitePlayer,
    KickPlayer,
    ManageRanks,
    ManageWar,
    ManageTaxes,
}

impl RankPermission {
    pub const ALL: [RankPermission; 10] = [
        RankPermission::ClaimChunk,
        RankPermission::UnclaimChunk,
        RankPermission::ManageClaimSettings,
        RankPermission::UpgradeTerritory,
        RankPermission::ManageRelations,
        RankPermission::InvitePlayer,
        RankPermission::KickPlayer,
        RankPermission::ManageRanks,
        RankPermission::ManageWar,
        RankPermission::ManageTaxes,
    ];

    fn as_mask(self) -> u32 {
        1 << (self as u32)
    }
}

/// Bitmask storage for a rank's granted permissions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionSet(pub u32);

impl PermissionSet {
    #[inline]
    pub fn contains(&self, permission: RankPermission) -> bool {
        self.0 & permission.as_mask() != 0
    }

    #[inline]
    pub fn insert(&mut self, permission: RankPermission) {
        self.0 |= permission.as_mask();
    }

    #[inline]
    pub fn remove(&mut self, permission: RankPermission) {
        self.0 &= !permission.as_mask();
    }

    /// Grant if absent, revoke if present.
    pub fn toggle(&mut self, permission: RankPermission) {
        if self.contains(permission) {
            self.remove(permission);
        } else {
            self.insert(permission);
        }
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Lowest and highest hierarchy levels.
pub const MIN_RANK_LEVEL: u8 = 1;
pub const MAX_RANK_LEVEL: u8 = 5;

/// A rank within a territory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rank {
    pub id: RankId,
    pub name: String,
    /// Hierarchy level, 1 (lowest) to 5 (highest), strictly ordered.
    level: u8,
    pub permissions: PermissionSet,
    /// Paid to each member once per economy cycle when nonzero.
    pub salary: i64,
    pub pays_taxes: bool,
    /// Back-reference: members currently holding this rank.
    members: Vec<PlayerId>,
    /// Optional icon identifier resolved by the presentation layer.
    pub icon: Option<String>,
}

impl Rank {
    pub fn new(id: RankId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            level: MIN_RANK_LEVEL,
            permissions: PermissionSet::default(),
            salary: 0,
            pays_taxes: true,
            members: Vec::new(),
            icon: None,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn increment_level(&mut self) {
        self.level = (self.level + 1).min(MAX_RANK_LEVEL);
    }

    pub fn decrement_level(&mut self) {
        self.level = self.level.saturating_sub(1).max(MIN_RANK_LEVEL);
    }

    pub fn is_superior_to(&self, other: &Rank) -> bool {
        self.level > other.level
    }

    pub fn has_permission(&self, permission: RankPermission) -> bool {
        self.permissions.contains(permission)
    }

    pub fn members(&self) -> &[PlayerId] {
        &self.members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn has_member(&self, player: &PlayerId) -> bool {
        self.members.contains(player)
    }

    pub fn add_member(&mut self, player: PlayerId) {
        if !self.members.contains(&player) {
            self.members.push(player);
        }
    }

    pub fn remove_member(&mut self, player: &PlayerId) {
        self.members.retain(|m| m != player);
    }

    /// Drain all members, returning them (used when a rank is removed).
    pub fn take_members(&mut self) -> Vec<PlayerId> {
        std::mem::take(&mut self.members)
    }

    pub fn toggle_pays_taxes(&mut self) {
        self.pays_taxes = !self.pays_taxes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_set_operations() {
        let mut set = PermissionSet::default();
        assert!(set.is_empty());
        set.insert(RankPermission::ClaimChunk);
        set.insert(RankPermission::ManageWar);
        assert!(set.contains(RankPermission::ClaimChunk));
        assert!(!set.contains(RankPermission::KickPlayer));
        assert_eq!(set.count(), 2);
        set.toggle(RankPermission::ClaimChunk);
        assert!(!set.contains(RankPermission::ClaimChunk));
        set.toggle(RankPermission::KickPlayer);
        assert!(set.contains(RankPermission::KickPlayer));
    }

    #[test]
    fn test_level_clamps_at_bounds() {
        let mut rank = Rank::new(0, "citizen");
        rank.decrement_level();
        assert_eq!(rank.level(), MIN_RANK_LEVEL);
        for _ in 0..10 {
            rank.increment_level();
        }
        assert_eq!(rank.level(), MAX_RANK_LEVEL);
    }

    #[test]
    fn test_member_list_has_no_duplicates() {
        let mut rank = Rank::new(0, "citizen");
        rank.add_member(PlayerId::new("p1"));
        rank.add_member(PlayerId::new("p1"));
        assert_eq!(rank.member_count(), 1);
        rank.remove_member(&PlayerId::new("p1"));
        assert!(rank.members().is_empty());
    }

    #[test]
    fn test_superiority_compares_levels() {
        let mut mayor = Rank::new(1, "mayor");
        mayor.increment_level();
        let citizen = Rank::new(0, "citizen");
        assert!(mayor.is_superior_to(&citizen));
        assert!(!citizen.is_superior_to(&mayor));
        assert!(!citizen.is_superior_to(&citizen.clone()));
    }
}
