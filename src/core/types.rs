//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Game turn counter (simulation time unit)
pub type Tick = u64;

/// Number of subtiles along one side of a slab
pub const STL_PER_SLAB: i32 = 3;

/// Number of player slots, keepers plus the hero and neutral players
pub const PLAYERS_COUNT: usize = 6;

/// The four orthogonal neighbours, clockwise from north
pub const SMALL_AROUND: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Player identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// The invading heroes
    pub const HERO: PlayerId = PlayerId(4);
    /// Unowned creatures and things
    pub const NEUTRAL: PlayerId = PlayerId(5);

    pub fn new(id: u8) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_neutral(self) -> bool {
        self == Self::NEUTRAL
    }

    pub fn is_hero(self) -> bool {
        self == Self::HERO
    }

    /// Keepers are the players which own a dungeon heart and diggers
    pub fn is_keeper(self) -> bool {
        self.0 < Self::HERO.0
    }

    /// Whether the two players are allied. Each player is its own ally;
    /// the neutral player is nobody's enemy.
    pub fn is_ally_or_self(self, other: PlayerId) -> bool {
        self == other
    }

    pub fn is_enemy(self, other: PlayerId) -> bool {
        !self.is_ally_or_self(other) && !self.is_neutral() && !other.is_neutral()
    }
}

/// Creature identifier (index into the creature store)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreatureId(pub u32);

impl CreatureId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Thing identifier (gold, books, crates, corpses, traps)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThingId(pub u32);

impl ThingId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Room identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u32);

impl RoomId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Creature model identifier (index into the model registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub u16);

impl ModelId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Position on the subtile grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubtileCoord {
    pub x: i32,
    pub y: i32,
}

impl SubtileCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Slab containing this subtile
    pub fn slab(&self) -> SlabCoord {
        SlabCoord::new(self.x.div_euclid(STL_PER_SLAB), self.y.div_euclid(STL_PER_SLAB))
    }

    /// Chessboard distance; movement in this world is eight-directional
    pub fn distance(&self, other: &Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl std::ops::Add for SubtileCoord {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for SubtileCoord {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

/// Position on the slab grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlabCoord {
    pub x: i32,
    pub y: i32,
}

impl SlabCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The middle subtile of this slab
    pub fn center(&self) -> SubtileCoord {
        SubtileCoord::new(self.x * STL_PER_SLAB + 1, self.y * STL_PER_SLAB + 1)
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Orthogonal neighbours in `SMALL_AROUND` order
    pub fn around(&self) -> impl Iterator<Item = SlabCoord> + '_ {
        SMALL_AROUND.iter().map(move |(dx, dy)| self.offset(*dx, *dy))
    }
}

/// Index into `SMALL_AROUND` of the slab side nearest to a position
pub fn nearest_side_of_slab(slab: SlabCoord, from: SubtileCoord) -> usize {
    let center = slab.center();
    let dx = center.x - from.x;
    let dy = center.y - from.y;
    if dy.abs() > dx.abs() {
        if dy > 0 {
            0
        } else {
            2
        }
    } else if dx > 0 {
        3
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtile_to_slab() {
        assert_eq!(SubtileCoord::new(0, 0).slab(), SlabCoord::new(0, 0));
        assert_eq!(SubtileCoord::new(5, 7).slab(), SlabCoord::new(1, 2));
        assert_eq!(SlabCoord::new(1, 2).center(), SubtileCoord::new(4, 7));
    }

    #[test]
    fn test_chessboard_distance() {
        let a = SubtileCoord::new(1, 1);
        let b = SubtileCoord::new(4, 9);
        assert_eq!(a.distance(&b), 8);
        assert_eq!(b.distance(&a), 8);
    }

    #[test]
    fn test_nearest_side_points_at_approach() {
        let slab = SlabCoord::new(5, 5);
        // Approaching from the north picks the north side
        let side = nearest_side_of_slab(slab, SubtileCoord::new(16, 2));
        assert_eq!(SMALL_AROUND[side], (0, -1));
        // Approaching from the east picks the east side
        let side = nearest_side_of_slab(slab, SubtileCoord::new(30, 16));
        assert_eq!(SMALL_AROUND[side], (1, 0));
    }

    #[test]
    fn test_player_relations() {
        let keeper = PlayerId::new(0);
        let rival = PlayerId::new(1);
        assert!(keeper.is_enemy(rival));
        assert!(keeper.is_enemy(PlayerId::HERO));
        assert!(!keeper.is_enemy(PlayerId::NEUTRAL));
        assert!(keeper.is_keeper());
        assert!(!PlayerId::HERO.is_keeper());
    }
}
