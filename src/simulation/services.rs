//! External collaborators of the creature core
//!
//! Navigation, the economy and the event layer are consumed through narrow
//! traits. The default implementations are small but complete enough to run
//! a headless dungeon: a grid A* navigator, a treasury-backed economy and
//! the recording event log.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashMap;

use crate::core::types::{PlayerId, SubtileCoord};
use crate::entity::creature::Creature;
use crate::simulation::events::{EventLog, EventSink};
use crate::world::dungeon::Dungeon;
use crate::world::map::DungeonMap;
use crate::world::rooms::RoomRole;
use crate::world::World;

/// Decides reachability and the next step of a walk
pub trait Navigator {
    fn can_navigate_to(&self, map: &DungeonMap, from: SubtileCoord, to: SubtileCoord) -> bool;

    /// Next subtile on the way, `None` when there is no route
    fn next_step(&self, map: &DungeonMap, from: SubtileCoord, to: SubtileCoord) -> Option<SubtileCoord>;
}

/// Kinds of work output a room job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkKind {
    Research,
    Manufacture,
    Scavenge,
    Training,
}

/// Money and work points of the keepers
pub trait Economy {
    /// Gold stored in treasuries plus gold held off the map
    fn available_money(&self, world: &World, player: PlayerId) -> i64;

    /// Take the whole amount, treasuries first; nothing is taken if it cannot be paid
    fn take_money(&self, world: &mut World, player: PlayerId, amount: u32) -> bool;

    /// Wage due to the creature on a pay day
    fn creature_pay(&self, world: &World, creature: &Creature) -> u32;

    /// Cost of one training session
    fn training_cost(&self, world: &World, creature: &Creature) -> u32;

    fn add_work_points(&self, dungeon: &mut Dungeon, kind: WorkKind, points: u64);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PathNode {
    stl: SubtileCoord,
    f_cost: i32,
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other.f_cost.cmp(&self.f_cost)
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const NEIGHBOURS: [(i32, i32); 8] = [(0, -1), (1, -1), (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1)];

/// Eight-directional A* over passable subtiles
#[derive(Debug, Clone)]
pub struct GridNavigator {
    /// Searches giving up after this many expanded nodes report no route
    pub max_nodes: usize,
}

impl Default for GridNavigator {
    fn default() -> Self {
        Self { max_nodes: 20_000 }
    }
}

impl GridNavigator {
    fn in_map(map: &DungeonMap, stl: SubtileCoord) -> bool {
        map.in_bounds(stl.slab()) && stl.x >= 0 && stl.y >= 0
    }

    /// Diagonal steps may not cut the corner of a solid slab
    fn can_step(map: &DungeonMap, from: SubtileCoord, dx: i32, dy: i32) -> bool {
        let to = from.offset(dx, dy);
        if !Self::in_map(map, to) || !map.is_passable(to) {
            return false;
        }
        if dx != 0 && dy != 0 {
            return map.is_passable(from.offset(dx, 0)) && map.is_passable(from.offset(0, dy));
        }
        true
    }

    /// Full route from `start` to `goal`, both included
    pub fn find_path(&self, map: &DungeonMap, start: SubtileCoord, goal: SubtileCoord) -> Option<Vec<SubtileCoord>> {
        if start == goal {
            return Some(vec![start]);
        }
        if !Self::in_map(map, goal) || !map.is_passable(goal) {
            return None;
        }

        let mut open_set = BinaryHeap::new();
        let mut came_from: AHashMap<SubtileCoord, SubtileCoord> = AHashMap::new();
        let mut g_scores: AHashMap<SubtileCoord, i32> = AHashMap::new();
        g_scores.insert(start, 0);
        open_set.push(PathNode { stl: start, f_cost: start.distance(&goal) });

        let mut expanded = 0;
        while let Some(current) = open_set.pop() {
            if current.stl == goal {
                return Some(reconstruct_path(&came_from, goal));
            }
            expanded += 1;
            if expanded > self.max_nodes {
                tracing::debug!("Route search from ({}, {}) gave up", start.x, start.y);
                return None;
            }
            let current_g = g_scores.get(&current.stl).copied().unwrap_or(i32::MAX);
            for (dx, dy) in NEIGHBOURS {
                if !Self::can_step(map, current.stl, dx, dy) {
                    continue;
                }
                let neighbor = current.stl.offset(dx, dy);
                let tentative_g = current_g + 1;
                if tentative_g < g_scores.get(&neighbor).copied().unwrap_or(i32::MAX) {
                    came_from.insert(neighbor, current.stl);
                    g_scores.insert(neighbor, tentative_g);
                    open_set.push(PathNode { stl: neighbor, f_cost: tentative_g + neighbor.distance(&goal) });
                }
            }
        }
        None
    }
}

fn reconstruct_path(came_from: &AHashMap<SubtileCoord, SubtileCoord>, mut current: SubtileCoord) -> Vec<SubtileCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

impl Navigator for GridNavigator {
    fn can_navigate_to(&self, map: &DungeonMap, from: SubtileCoord, to: SubtileCoord) -> bool {
        self.find_path(map, from, to).is_some()
    }

    fn next_step(&self, map: &DungeonMap, from: SubtileCoord, to: SubtileCoord) -> Option<SubtileCoord> {
        let path = self.find_path(map, from, to)?;
        path.get(1).copied().or(Some(from))
    }
}

/// Economy backed by treasury rooms and the off-map purse
#[derive(Debug, Clone, Default)]
pub struct TreasuryEconomy;

impl Economy for TreasuryEconomy {
    fn available_money(&self, world: &World, player: PlayerId) -> i64 {
        let offmap = world.dungeon(player).map(|d| d.offmap_money).unwrap_or(0);
        world.rooms.stored_gold(player) as i64 + offmap
    }

    fn take_money(&self, world: &mut World, player: PlayerId, amount: u32) -> bool {
        if self.available_money(world, player) < amount as i64 {
            return false;
        }
        let treasuries: Vec<_> = world.rooms.rooms_of_role(player, RoomRole::GOLD_STORAGE).map(|r| r.id).collect();
        let mut left = amount;
        for room in treasuries {
            if left == 0 {
                break;
            }
            left -= world.rooms.take_gold(room, left);
        }
        if left > 0 {
            if let Some(dungeon) = world.dungeon_mut(player) {
                dungeon.offmap_money -= left as i64;
            }
        }
        true
    }

    fn creature_pay(&self, world: &World, creature: &Creature) -> u32 {
        let base = world.models.get(creature.model).pay;
        // Wages grow by a tenth per experience level above the first
        base + base * creature.exp_level.saturating_sub(1) as u32 / 10
    }

    fn training_cost(&self, world: &World, creature: &Creature) -> u32 {
        world.models.get(creature.model).training_cost
    }

    fn add_work_points(&self, dungeon: &mut Dungeon, kind: WorkKind, points: u64) {
        match kind {
            WorkKind::Research => dungeon.research_points += points,
            WorkKind::Manufacture => dungeon.manufacture_points += points,
            WorkKind::Scavenge => dungeon.scavenge_points += points,
            WorkKind::Training => dungeon.training_spent += points,
        }
    }
}

/// The collaborators a simulation context talks to
pub struct Services {
    pub navigator: Box<dyn Navigator>,
    pub economy: Box<dyn Economy>,
    pub events: Box<dyn EventSink>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            navigator: Box::new(GridNavigator::default()),
            economy: Box::new(TreasuryEconomy),
            events: Box::new(EventLog::new()),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::SlabCoord;
    use crate::world::map::SlabKind;
    use crate::world::rooms::RoomKind;

    fn corridor() -> DungeonMap {
        let mut map = DungeonMap::new(10, 5).unwrap();
        for x in 1..9 {
            map.set_slab(SlabCoord::new(x, 2), SlabKind::Path, PlayerId::NEUTRAL).unwrap();
        }
        map
    }

    #[test]
    fn test_path_follows_open_floor() {
        let map = corridor();
        let nav = GridNavigator::default();
        let from = SlabCoord::new(1, 2).center();
        let to = SlabCoord::new(8, 2).center();
        let path = nav.find_path(&map, from, to).expect("corridor is open");
        assert_eq!(path.first(), Some(&from));
        assert_eq!(path.last(), Some(&to));
        assert!(path.iter().all(|stl| map.is_passable(*stl)));
        assert_eq!(path.len() as i32 - 1, from.distance(&to));
    }

    #[test]
    fn test_no_route_into_rock() {
        let map = corridor();
        let nav = GridNavigator::default();
        assert!(!nav.can_navigate_to(&map, SlabCoord::new(1, 2).center(), SlabCoord::new(4, 4).center()));
        assert_eq!(nav.next_step(&map, SlabCoord::new(1, 2).center(), SlabCoord::new(4, 0).center()), None);
    }

    #[test]
    fn test_take_money_uses_treasury_then_purse() {
        let mut world = World::new(10, 10).unwrap();
        let me = PlayerId::new(0);
        let room = world
            .rooms
            .create_room(&mut world.map, RoomKind::Treasury, me, &[SlabCoord::new(3, 3)], &SimulationConfig::default())
            .unwrap();
        world.rooms.store_gold(room, 100);
        world.dungeons[0].offmap_money = 50;
        let economy = TreasuryEconomy;

        assert!(!economy.take_money(&mut world, me, 200), "cannot pay more than available");
        assert_eq!(economy.available_money(&world, me), 150);
        assert!(economy.take_money(&mut world, me, 120));
        assert_eq!(world.rooms.stored_gold(me), 0);
        assert_eq!(world.dungeons[0].offmap_money, 30);
    }
}
