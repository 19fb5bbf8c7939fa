//! Per-player dungeon record
//!
//! Everything the scheduler keeps per keeper: money, the list of slabs the
//! player has marked for digging, the digger task stack and a few counters.

use serde::{Deserialize, Serialize};

use crate::core::types::{PlayerId, SlabCoord, SubtileCoord, Tick};
use crate::digger::stack::DiggerStack;

/// Kind of a player-marked dig task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigTaskKind {
    Dig,
    MineGold,
    MineGems,
}

/// A slab the player has tagged for digging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapTask {
    pub kind: DigTaskKind,
    /// Center subtile of the tagged slab
    pub stl: SubtileCoord,
}

/// Behavior switches a keeper sets for its creatures
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tendencies {
    /// Knocked-out enemies are taken prisoner instead of killed
    pub imprison: bool,
    /// Creatures flee combat when badly hurt
    pub flee: bool,
}

impl Default for Tendencies {
    fn default() -> Self {
        Self { imprison: true, flee: false }
    }
}

/// Counters for the end-of-level summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelStats {
    pub gold_mined: u64,
    pub slabs_dug: u32,
    pub slabs_claimed: u32,
    pub slabs_converted: u32,
    pub walls_reinforced: u32,
    pub salaries_paid: u64,
    pub creatures_left: u32,
    pub rooms_destroyed: u32,
    pub creatures_annoyed: u32,
    /// Idle diggers which found nothing at all to do
    pub promises_broken: u32,
    pub traps_armed: u32,
    pub items_stored: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dungeon {
    pub owner: PlayerId,
    /// Subtile of the dungeon heart, the root of the territory flood fill
    pub heart: Option<SubtileCoord>,
    /// Gold held outside of treasuries
    pub offmap_money: i64,
    pub task_list: Vec<MapTask>,
    pub digger_stack: DiggerStack,
    /// Turn of the last digger stack rebuild; also its version number.
    /// `None` until the first rebuild.
    pub digger_stack_update_turn: Option<Tick>,
    pub research_points: u64,
    pub manufacture_points: u64,
    pub scavenge_points: u64,
    pub training_spent: u64,
    pub tendencies: Tendencies,
    /// The player slot takes part in the level
    pub in_play: bool,
    /// The keeper has lost its heart
    pub lost: bool,
    /// Turn of the last pay day
    pub last_pay_day: Tick,
    pub stats: LevelStats,
}

impl Dungeon {
    pub fn new(owner: PlayerId) -> Self {
        Self {
            owner,
            heart: None,
            offmap_money: 0,
            task_list: Vec::new(),
            digger_stack: DiggerStack::new(),
            digger_stack_update_turn: None,
            research_points: 0,
            manufacture_points: 0,
            scavenge_points: 0,
            training_spent: 0,
            tendencies: Tendencies::default(),
            in_play: true,
            lost: false,
            last_pay_day: 0,
            stats: LevelStats::default(),
        }
    }

    /// Tag a slab for digging; tagging twice is a no-op
    pub fn add_dig_task(&mut self, slab: SlabCoord, kind: DigTaskKind) {
        let stl = slab.center();
        if self.find_dig_task(stl).is_none() {
            self.task_list.push(MapTask { kind, stl });
        }
    }

    /// Index of the task tagged on the slab of the given subtile
    pub fn find_dig_task(&self, stl: SubtileCoord) -> Option<usize> {
        let slab = stl.slab();
        self.task_list.iter().position(|t| t.stl.slab() == slab)
    }

    pub fn dig_task(&self, idx: usize) -> Option<&MapTask> {
        self.task_list.get(idx)
    }

    pub fn remove_dig_task(&mut self, stl: SubtileCoord) {
        if let Some(idx) = self.find_dig_task(stl) {
            self.task_list.swap_remove(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dig_tasks_are_per_slab() {
        let mut dungeon = Dungeon::new(PlayerId::new(0));
        dungeon.add_dig_task(SlabCoord::new(4, 4), DigTaskKind::Dig);
        dungeon.add_dig_task(SlabCoord::new(4, 4), DigTaskKind::Dig);
        assert_eq!(dungeon.task_list.len(), 1);

        // Any subtile of the slab finds it
        assert_eq!(dungeon.find_dig_task(SubtileCoord::new(12, 14)), Some(0));
        dungeon.remove_dig_task(SubtileCoord::new(14, 12));
        assert!(dungeon.task_list.is_empty());
    }
}
