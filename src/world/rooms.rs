//! Rooms and room roles
//!
//! Jobs never ask for a room kind directly. They ask for a role (gold
//! storage, prisoner holding, research) and any room kind providing that
//! role will do. The registry keeps the capacity counters the job and
//! digger logic consult.

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{DungeonError, Result};
use crate::core::types::{CreatureId, PlayerId, RoomId, SlabCoord, SubtileCoord};
use crate::world::map::{DungeonMap, SlabKind};

/// Set of abstract room capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RoomRole(pub u32);

impl RoomRole {
    pub const NONE: RoomRole = RoomRole(0);
    pub const KEEPER_STORAGE: RoomRole = RoomRole(1 << 0);
    pub const GOLD_STORAGE: RoomRole = RoomRole(1 << 1);
    pub const RESEARCH: RoomRole = RoomRole(1 << 2);
    pub const POWERS_STORAGE: RoomRole = RoomRole(1 << 3);
    pub const MANUFACTURE: RoomRole = RoomRole(1 << 4);
    pub const CRATES_STORAGE: RoomRole = RoomRole(1 << 5);
    pub const TRAINING: RoomRole = RoomRole(1 << 6);
    pub const PRISON: RoomRole = RoomRole(1 << 7);
    pub const TORTURE: RoomRole = RoomRole(1 << 8);
    pub const DEAD_STORAGE: RoomRole = RoomRole(1 << 9);
    pub const LAIR: RoomRole = RoomRole(1 << 10);
    pub const FOOD: RoomRole = RoomRole(1 << 11);
    pub const SCAVENGE: RoomRole = RoomRole(1 << 12);
    pub const TEMPLE: RoomRole = RoomRole(1 << 13);
    pub const BARRACKS: RoomRole = RoomRole(1 << 14);
    pub const GUARD: RoomRole = RoomRole(1 << 15);
    pub const ENTRANCE: RoomRole = RoomRole(1 << 16);

    pub fn contains(self, other: RoomRole) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: RoomRole) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Parse a role name, as written in rule files
    pub fn from_name(name: &str) -> Option<Self> {
        let role = match name {
            "None" => RoomRole::NONE,
            "KeeperStorage" => RoomRole::KEEPER_STORAGE,
            "GoldStorage" => RoomRole::GOLD_STORAGE,
            "Research" => RoomRole::RESEARCH,
            "PowersStorage" => RoomRole::POWERS_STORAGE,
            "Manufacture" => RoomRole::MANUFACTURE,
            "CratesStorage" => RoomRole::CRATES_STORAGE,
            "Training" => RoomRole::TRAINING,
            "Prison" => RoomRole::PRISON,
            "Torture" => RoomRole::TORTURE,
            "DeadStorage" => RoomRole::DEAD_STORAGE,
            "Lair" => RoomRole::LAIR,
            "Food" => RoomRole::FOOD,
            "Scavenge" => RoomRole::SCAVENGE,
            "Temple" => RoomRole::TEMPLE,
            "Barracks" => RoomRole::BARRACKS,
            "Guard" => RoomRole::GUARD,
            "Entrance" => RoomRole::ENTRANCE,
            _ => return None,
        };
        Some(role)
    }
}

impl std::ops::BitOr for RoomRole {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        RoomRole(self.0 | rhs.0)
    }
}

/// Concrete room kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomKind {
    DungeonHeart,
    Entrance,
    Treasury,
    Library,
    Prison,
    Torture,
    Training,
    Workshop,
    Scavenger,
    Temple,
    Graveyard,
    Barracks,
    Garden,
    Lair,
    GuardPost,
}

impl RoomKind {
    pub const ALL: [RoomKind; 15] = [
        RoomKind::DungeonHeart,
        RoomKind::Entrance,
        RoomKind::Treasury,
        RoomKind::Library,
        RoomKind::Prison,
        RoomKind::Torture,
        RoomKind::Training,
        RoomKind::Workshop,
        RoomKind::Scavenger,
        RoomKind::Temple,
        RoomKind::Graveyard,
        RoomKind::Barracks,
        RoomKind::Garden,
        RoomKind::Lair,
        RoomKind::GuardPost,
    ];

    /// First kind providing the role, used to name the room a player lacks
    pub fn for_role(role: RoomRole) -> Option<RoomKind> {
        Self::ALL.iter().copied().find(|kind| kind.roles().intersects(role))
    }

    pub fn roles(self) -> RoomRole {
        match self {
            RoomKind::DungeonHeart => RoomRole::KEEPER_STORAGE,
            RoomKind::Entrance => RoomRole::ENTRANCE,
            RoomKind::Treasury => RoomRole::GOLD_STORAGE,
            RoomKind::Library => RoomRole::RESEARCH | RoomRole::POWERS_STORAGE,
            RoomKind::Prison => RoomRole::PRISON,
            RoomKind::Torture => RoomRole::TORTURE,
            RoomKind::Training => RoomRole::TRAINING,
            RoomKind::Workshop => RoomRole::MANUFACTURE | RoomRole::CRATES_STORAGE,
            RoomKind::Scavenger => RoomRole::SCAVENGE,
            RoomKind::Temple => RoomRole::TEMPLE,
            RoomKind::Graveyard => RoomRole::DEAD_STORAGE,
            RoomKind::Barracks => RoomRole::BARRACKS,
            RoomKind::Garden => RoomRole::FOOD,
            RoomKind::Lair => RoomRole::LAIR,
            RoomKind::GuardPost => RoomRole::GUARD,
        }
    }

    /// Room kinds storing items measure their free space in items, not occupants
    fn item_capacity_per_slab(self) -> u32 {
        match self {
            RoomKind::Library | RoomKind::Workshop => 1,
            RoomKind::Graveyard => 2,
            _ => 0,
        }
    }

    fn occupants_per_slab(self) -> u32 {
        match self {
            RoomKind::Treasury | RoomKind::DungeonHeart | RoomKind::Graveyard => 0,
            RoomKind::Lair => 2,
            _ => 1,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "DungeonHeart" => RoomKind::DungeonHeart,
            "Entrance" => RoomKind::Entrance,
            "Treasury" => RoomKind::Treasury,
            "Library" => RoomKind::Library,
            "Prison" => RoomKind::Prison,
            "Torture" => RoomKind::Torture,
            "Training" => RoomKind::Training,
            "Workshop" => RoomKind::Workshop,
            "Scavenger" => RoomKind::Scavenger,
            "Temple" => RoomKind::Temple,
            "Graveyard" => RoomKind::Graveyard,
            "Barracks" => RoomKind::Barracks,
            "Garden" => RoomKind::Garden,
            "Lair" => RoomKind::Lair,
            "GuardPost" => RoomKind::GuardPost,
            _ => return None,
        };
        Some(kind)
    }
}

/// Whether a room kind provides the given role
pub fn room_role_matches(kind: RoomKind, role: RoomRole) -> bool {
    kind.roles().intersects(role)
}

/// Which part of a room a job works in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkArea {
    Whole,
    Border,
    Center,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    pub owner: PlayerId,
    pub slabs: Vec<SlabCoord>,
    /// Occupants for work rooms and lairs, gold for treasuries
    pub total_capacity: u32,
    pub used_capacity: u32,
    /// Books, crates or corpses stored
    pub total_items: u32,
    pub used_items: u32,
    pub occupants: Vec<CreatureId>,
    pub exists: bool,
}

impl Room {
    pub fn has_spare_capacity(&self, needed: u32) -> bool {
        self.used_capacity + needed <= self.total_capacity
    }

    pub fn has_spare_item_capacity(&self) -> bool {
        self.used_items < self.total_items
    }

    /// Middle subtile of the room's first slab
    pub fn center(&self) -> SubtileCoord {
        let count = self.slabs.len().max(1) as i32;
        let sx: i32 = self.slabs.iter().map(|s| s.x).sum();
        let sy: i32 = self.slabs.iter().map(|s| s.y).sum();
        let mean = SlabCoord::new(sx / count, sy / count);
        // The mean may fall outside an irregular room
        if self.slabs.contains(&mean) {
            mean.center()
        } else {
            self.slabs.first().map(|s| s.center()).unwrap_or_default()
        }
    }

    pub fn contains_slab(&self, slab: SlabCoord) -> bool {
        self.slabs.contains(&slab)
    }

    /// Slabs touching a non-room slab
    pub fn border_slabs(&self) -> impl Iterator<Item = SlabCoord> + '_ {
        self.slabs.iter().copied().filter(move |s| s.around().any(|n| !self.slabs.contains(&n)))
    }

    /// Slabs surrounded by the room on all sides
    pub fn center_slabs(&self) -> impl Iterator<Item = SlabCoord> + '_ {
        self.slabs.iter().copied().filter(move |s| s.around().all(|n| self.slabs.contains(&n)))
    }

    /// A subtile to work at in the requested area; `seed` picks among candidates
    pub fn work_position(&self, area: WorkArea, seed: u32) -> Option<SubtileCoord> {
        let candidates: Vec<SlabCoord> = match area {
            WorkArea::Whole => self.slabs.clone(),
            WorkArea::Border => self.border_slabs().collect(),
            WorkArea::Center => self.center_slabs().collect(),
        };
        // Small rooms have no center; fall back to any slab
        let candidates = if candidates.is_empty() { self.slabs.clone() } else { candidates };
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[seed as usize % candidates.len()].center())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomRegistry {
    rooms: Vec<Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a room over the given slabs, turning them into room floor
    pub fn create_room(
        &mut self,
        map: &mut DungeonMap,
        kind: RoomKind,
        owner: PlayerId,
        slabs: &[SlabCoord],
        config: &SimulationConfig,
    ) -> Result<RoomId> {
        if slabs.is_empty() {
            return Err(DungeonError::Config(format!("{:?} needs at least one slab", kind)));
        }
        let id = RoomId::new(self.rooms.len() as u32);
        for slab in slabs {
            map.set_slab(*slab, SlabKind::RoomFloor, owner)?;
            if let Some(cell) = map.get_mut(*slab) {
                cell.room = Some(id);
            }
        }
        let n = slabs.len() as u32;
        let total_capacity = match kind {
            RoomKind::Treasury => n * config.gold_per_treasury_slab,
            _ => n * kind.occupants_per_slab(),
        };
        self.rooms.push(Room {
            id,
            kind,
            owner,
            slabs: slabs.to_vec(),
            total_capacity,
            used_capacity: 0,
            total_items: n * kind.item_capacity_per_slab(),
            used_items: 0,
            occupants: Vec::new(),
            exists: true,
        });
        tracing::debug!("Created {:?} {:?} for player {} with {} slabs", kind, id, owner.0, n);
        Ok(id)
    }

    pub fn get(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.index()).filter(|r| r.exists)
    }

    pub fn get_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id.index()).filter(|r| r.exists)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter().filter(|r| r.exists)
    }

    /// Rooms of a player providing the role
    pub fn rooms_of_role(&self, player: PlayerId, role: RoomRole) -> impl Iterator<Item = &Room> {
        self.iter().filter(move |r| r.owner == player && room_role_matches(r.kind, role))
    }

    pub fn player_has_room_of_role(&self, player: PlayerId, role: RoomRole) -> bool {
        self.rooms_of_role(player, role).next().is_some()
    }

    pub fn room_of_role_with_capacity(&self, player: PlayerId, role: RoomRole, needed: u32) -> Option<RoomId> {
        self.rooms_of_role(player, role).find(|r| r.has_spare_capacity(needed)).map(|r| r.id)
    }

    pub fn room_of_role_with_used_capacity(&self, player: PlayerId, role: RoomRole) -> Option<RoomId> {
        self.rooms_of_role(player, role).find(|r| r.used_capacity > 0).map(|r| r.id)
    }

    /// Closest room of the role with room for `needed` more
    pub fn nearest_room_of_role_with_capacity(
        &self,
        player: PlayerId,
        role: RoomRole,
        from: SubtileCoord,
        needed: u32,
    ) -> Option<RoomId> {
        self.rooms_of_role(player, role)
            .filter(|r| r.has_spare_capacity(needed))
            .min_by_key(|r| r.center().distance(&from))
            .map(|r| r.id)
    }

    /// Closest room of the role with space for one more stored item
    pub fn nearest_room_of_role_with_item_capacity(
        &self,
        player: PlayerId,
        role: RoomRole,
        from: SubtileCoord,
    ) -> Option<RoomId> {
        self.rooms_of_role(player, role)
            .filter(|r| r.has_spare_item_capacity())
            .min_by_key(|r| r.center().distance(&from))
            .map(|r| r.id)
    }

    pub fn add_occupant(&mut self, room: RoomId, creature: CreatureId) -> bool {
        match self.get_mut(room) {
            Some(r) if r.has_spare_capacity(1) => {
                if !r.occupants.contains(&creature) {
                    r.occupants.push(creature);
                    r.used_capacity += 1;
                }
                true
            }
            _ => false,
        }
    }

    pub fn remove_occupant(&mut self, room: RoomId, creature: CreatureId) {
        if let Some(r) = self.get_mut(room) {
            if let Some(pos) = r.occupants.iter().position(|c| *c == creature) {
                r.occupants.swap_remove(pos);
                r.used_capacity = r.used_capacity.saturating_sub(1);
            }
        }
    }

    /// Store gold in a treasury. Returns the amount that fit.
    pub fn store_gold(&mut self, room: RoomId, amount: u32) -> u32 {
        match self.get_mut(room) {
            Some(r) => {
                let stored = amount.min(r.total_capacity.saturating_sub(r.used_capacity));
                r.used_capacity += stored;
                stored
            }
            None => 0,
        }
    }

    /// Take gold out of a treasury. Returns the amount taken.
    pub fn take_gold(&mut self, room: RoomId, amount: u32) -> u32 {
        match self.get_mut(room) {
            Some(r) => {
                let taken = amount.min(r.used_capacity);
                r.used_capacity -= taken;
                taken
            }
            None => 0,
        }
    }

    pub fn store_item(&mut self, room: RoomId) -> bool {
        match self.get_mut(room) {
            Some(r) if r.has_spare_item_capacity() => {
                r.used_items += 1;
                true
            }
            _ => false,
        }
    }

    pub fn remove_item(&mut self, room: RoomId) {
        if let Some(r) = self.get_mut(room) {
            r.used_items = r.used_items.saturating_sub(1);
        }
    }

    /// Strip one slab off a room, leaving claimed floor behind. Returns true
    /// when that was the last slab and the room is gone.
    pub fn remove_slab(&mut self, map: &mut DungeonMap, room: RoomId, slab: SlabCoord) -> Result<bool> {
        let Some(r) = self.get_mut(room) else {
            return Err(DungeonError::RoomNotFound(room));
        };
        let Some(pos) = r.slabs.iter().position(|s| *s == slab) else {
            return Ok(false);
        };
        r.slabs.swap_remove(pos);
        let per_slab = match r.kind {
            RoomKind::Treasury => 0,
            kind => kind.occupants_per_slab(),
        };
        r.total_capacity = r.total_capacity.saturating_sub(per_slab);
        r.total_items = r.total_items.saturating_sub(r.kind.item_capacity_per_slab());
        r.used_items = r.used_items.min(r.total_items);
        let gone = r.slabs.is_empty();
        if gone {
            r.exists = false;
            r.occupants.clear();
            r.used_capacity = 0;
        }
        let owner = r.owner;
        map.set_slab(slab, SlabKind::Claimed, owner)?;
        Ok(gone)
    }

    /// Gold stored in all treasuries of a player
    pub fn stored_gold(&self, player: PlayerId) -> u32 {
        self.rooms_of_role(player, RoomRole::GOLD_STORAGE).map(|r| r.used_capacity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: i32, y0: i32, size: i32) -> Vec<SlabCoord> {
        let mut slabs = Vec::new();
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                slabs.push(SlabCoord::new(x, y));
            }
        }
        slabs
    }

    #[test]
    fn test_role_lookup_through_kind() {
        assert!(room_role_matches(RoomKind::Library, RoomRole::RESEARCH));
        assert!(room_role_matches(RoomKind::Library, RoomRole::POWERS_STORAGE));
        assert!(!room_role_matches(RoomKind::Treasury, RoomRole::RESEARCH));
    }

    #[test]
    fn test_treasury_capacity_is_gold() {
        let config = SimulationConfig::default();
        let mut map = DungeonMap::new(10, 10).unwrap();
        let mut rooms = RoomRegistry::new();
        let me = PlayerId::new(0);
        let id = rooms.create_room(&mut map, RoomKind::Treasury, me, &square(2, 2, 2), &config).unwrap();

        assert_eq!(rooms.get(id).unwrap().total_capacity, 4 * config.gold_per_treasury_slab);
        assert_eq!(rooms.store_gold(id, 5000), 4000, "gold beyond capacity does not fit");
        assert!(rooms.room_of_role_with_capacity(me, RoomRole::GOLD_STORAGE, 1).is_none());
        assert_eq!(map.room_at(SlabCoord::new(3, 3)), Some(id));
    }

    #[test]
    fn test_border_and_center_slabs() {
        let config = SimulationConfig::default();
        let mut map = DungeonMap::new(10, 10).unwrap();
        let mut rooms = RoomRegistry::new();
        let id = rooms
            .create_room(&mut map, RoomKind::Training, PlayerId::new(0), &square(2, 2, 3), &config)
            .unwrap();
        let room = rooms.get(id).unwrap();
        assert_eq!(room.border_slabs().count(), 8);
        assert_eq!(room.center_slabs().collect::<Vec<_>>(), vec![SlabCoord::new(3, 3)]);
        assert_eq!(room.work_position(WorkArea::Center, 7), Some(SlabCoord::new(3, 3).center()));
    }

    #[test]
    fn test_occupants_respect_capacity() {
        let config = SimulationConfig::default();
        let mut map = DungeonMap::new(10, 10).unwrap();
        let mut rooms = RoomRegistry::new();
        let id = rooms
            .create_room(&mut map, RoomKind::Training, PlayerId::new(0), &[SlabCoord::new(2, 2)], &config)
            .unwrap();
        assert!(rooms.add_occupant(id, CreatureId::new(1)));
        assert!(!rooms.add_occupant(id, CreatureId::new(2)), "one slab holds one trainee");
        rooms.remove_occupant(id, CreatureId::new(1));
        assert!(rooms.add_occupant(id, CreatureId::new(2)));
    }
}
