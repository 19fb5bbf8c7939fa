//! Slab grid of the dungeon
//!
//! Each slab covers 3x3 subtiles. Slabs carry their terrain kind, their
//! owner, an optional room link and a per-player "revealed" mask.

use serde::{Deserialize, Serialize};

use crate::core::error::{DungeonError, Result};
use crate::core::types::{PlayerId, RoomId, SlabCoord, SubtileCoord, PLAYERS_COUNT};

/// Terrain kind of a slab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlabKind {
    /// Impenetrable rock
    Rock,
    /// Gold seam, mined out when dug
    Gold,
    /// Gem seam, mined forever
    Gems,
    /// Soft earth which can be dug
    Earth,
    /// Earth with a torch, still diggable
    TorchDirt,
    /// Reinforced wall of a keeper
    Wall,
    /// Unclaimed floor
    Path,
    /// Claimed floor
    Claimed,
    /// Floor belonging to a room
    RoomFloor,
    Door,
    Lava,
    Water,
}

impl SlabKind {
    /// Solid slabs block movement
    pub fn is_filled(self) -> bool {
        matches!(
            self,
            SlabKind::Rock | SlabKind::Gold | SlabKind::Gems | SlabKind::Earth | SlabKind::TorchDirt | SlabKind::Wall
        )
    }

    /// Slabs a digger may be ordered to dig or mine
    pub fn is_diggable(self) -> bool {
        matches!(self, SlabKind::Gold | SlabKind::Gems | SlabKind::Earth | SlabKind::TorchDirt)
    }

    /// Slabs holding treasure
    pub fn is_valuable(self) -> bool {
        matches!(self, SlabKind::Gold | SlabKind::Gems)
    }

    /// Slabs which never disappear when dug
    pub fn is_indestructible(self) -> bool {
        matches!(self, SlabKind::Rock | SlabKind::Gems)
    }

    /// Earth which can be reinforced into a wall
    pub fn is_friable_dirt(self) -> bool {
        matches!(self, SlabKind::Earth | SlabKind::TorchDirt)
    }

    /// Floor a creature can safely stand on
    pub fn is_safe_land(self) -> bool {
        matches!(self, SlabKind::Path | SlabKind::Claimed | SlabKind::RoomFloor | SlabKind::Door)
    }

    pub fn is_passable(self) -> bool {
        !self.is_filled() && self != SlabKind::Lava
    }
}

/// One slab of the map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slab {
    pub kind: SlabKind,
    pub owner: PlayerId,
    pub room: Option<RoomId>,
    /// Bit `n` set when player `n` has seen this slab
    pub revealed: u8,
    /// Remaining work before the slab is dug, converted or reinforced
    pub health: i32,
}

impl Slab {
    fn new(kind: SlabKind) -> Self {
        Self { kind, owner: PlayerId::NEUTRAL, room: None, revealed: 0, health: 0 }
    }
}

/// The slab grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DungeonMap {
    width: i32,
    height: i32,
    slabs: Vec<Slab>,
}

impl DungeonMap {
    /// A map of the given size (in slabs) filled with earth and rimmed with rock
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width < 3 || height < 3 {
            return Err(DungeonError::Config(format!("map size {}x{} is too small", width, height)));
        }
        let mut slabs = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                slabs.push(Slab::new(if border { SlabKind::Rock } else { SlabKind::Earth }));
            }
        }
        Ok(Self { width, height, slabs })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, slab: SlabCoord) -> bool {
        slab.x >= 0 && slab.y >= 0 && slab.x < self.width && slab.y < self.height
    }

    fn index(&self, slab: SlabCoord) -> Option<usize> {
        if self.in_bounds(slab) {
            Some((slab.y * self.width + slab.x) as usize)
        } else {
            None
        }
    }

    pub fn get(&self, slab: SlabCoord) -> Option<&Slab> {
        self.index(slab).map(|i| &self.slabs[i])
    }

    pub fn get_mut(&mut self, slab: SlabCoord) -> Option<&mut Slab> {
        self.index(slab).map(move |i| &mut self.slabs[i])
    }

    /// Every slab coordinate, row by row
    pub fn coords(&self) -> impl Iterator<Item = SlabCoord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| SlabCoord::new(x, y)))
    }

    /// Kind of the slab; out-of-bounds slabs read as rock
    pub fn kind(&self, slab: SlabCoord) -> SlabKind {
        self.get(slab).map(|s| s.kind).unwrap_or(SlabKind::Rock)
    }

    pub fn owner(&self, slab: SlabCoord) -> PlayerId {
        self.get(slab).map(|s| s.owner).unwrap_or(PlayerId::NEUTRAL)
    }

    pub fn room_at(&self, slab: SlabCoord) -> Option<RoomId> {
        self.get(slab).and_then(|s| s.room)
    }

    /// Change a slab, resetting its work counter
    pub fn set_slab(&mut self, slab: SlabCoord, kind: SlabKind, owner: PlayerId) -> Result<()> {
        let cell = self.get_mut(slab).ok_or(DungeonError::OutOfBounds(slab.x, slab.y))?;
        cell.kind = kind;
        cell.owner = owner;
        cell.health = 0;
        if kind != SlabKind::RoomFloor {
            cell.room = None;
        }
        Ok(())
    }

    pub fn is_revealed(&self, player: PlayerId, slab: SlabCoord) -> bool {
        if player.index() >= PLAYERS_COUNT {
            return false;
        }
        self.get(slab).map(|s| s.revealed & (1 << player.0) != 0).unwrap_or(false)
    }

    pub fn reveal(&mut self, player: PlayerId, slab: SlabCoord) {
        if let Some(cell) = self.get_mut(slab) {
            cell.revealed |= 1 << player.0;
        }
    }

    pub fn reveal_all(&mut self, player: PlayerId) {
        for cell in &mut self.slabs {
            cell.revealed |= 1 << player.0;
        }
    }

    pub fn is_passable(&self, stl: SubtileCoord) -> bool {
        self.kind(stl.slab()).is_passable()
    }

    /// Whether the slab is safe land owned by the player
    pub fn is_players_land(&self, player: PlayerId, slab: SlabCoord) -> bool {
        self.get(slab).map(|s| s.owner == player && s.kind.is_safe_land()).unwrap_or(false)
    }

    /// Whether the slab touches land owned by the player
    pub fn slab_by_players_land(&self, player: PlayerId, slab: SlabCoord) -> bool {
        slab.around().any(|side| self.is_players_land(player, side))
    }

    /// Whether any orthogonal neighbour is open floor to dig from
    pub fn block_has_diggable_side(&self, slab: SlabCoord) -> bool {
        slab.around().any(|side| self.kind(side).is_safe_land())
    }

    /// Whether a worker may stand on this subtile to dig
    pub fn valid_dig_position(&self, player: PlayerId, stl: SubtileCoord) -> bool {
        let slab = stl.slab();
        let kind = self.kind(slab);
        if !kind.is_safe_land() {
            return false;
        }
        // Enemy doors are not a place to stand on
        !(kind == SlabKind::Door && self.owner(slab) != player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_map_is_rimmed_with_rock() {
        let map = DungeonMap::new(8, 6).unwrap();
        assert_eq!(map.kind(SlabCoord::new(0, 3)), SlabKind::Rock);
        assert_eq!(map.kind(SlabCoord::new(3, 3)), SlabKind::Earth);
        assert_eq!(map.kind(SlabCoord::new(-1, 3)), SlabKind::Rock, "outside reads as rock");
        assert!(DungeonMap::new(2, 10).is_err());
    }

    #[test]
    fn test_players_land_and_diggable_side() {
        let mut map = DungeonMap::new(8, 8).unwrap();
        let me = PlayerId::new(0);
        map.set_slab(SlabCoord::new(3, 3), SlabKind::Claimed, me).unwrap();

        assert!(map.is_players_land(me, SlabCoord::new(3, 3)));
        assert!(map.slab_by_players_land(me, SlabCoord::new(3, 4)));
        assert!(!map.slab_by_players_land(me, SlabCoord::new(5, 5)));
        assert!(map.block_has_diggable_side(SlabCoord::new(4, 3)));
        assert!(!map.block_has_diggable_side(SlabCoord::new(6, 6)));
    }

    #[test]
    fn test_reveal_is_per_player() {
        let mut map = DungeonMap::new(5, 5).unwrap();
        let slab = SlabCoord::new(2, 2);
        map.reveal(PlayerId::new(1), slab);
        assert!(map.is_revealed(PlayerId::new(1), slab));
        assert!(!map.is_revealed(PlayerId::new(0), slab));
    }
}
