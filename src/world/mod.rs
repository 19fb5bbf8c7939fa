//! The game world the creature core operates on
//!
//! Map, things, rooms, per-player dungeon records and creatures, plus the
//! static creature models and job table they are interpreted with.

pub mod dungeon;
pub mod map;
pub mod rooms;
pub mod things;

use serde::{Deserialize, Serialize};

use crate::core::error::{DungeonError, Result};
use crate::core::types::{PlayerId, PLAYERS_COUNT};
use crate::entity::model::CreatureModels;
use crate::entity::store::CreatureStore;
use crate::jobs::registry::JobTable;

pub use dungeon::{DigTaskKind, Dungeon, LevelStats, MapTask, Tendencies};
pub use map::{DungeonMap, Slab, SlabKind};
pub use rooms::{Room, RoomKind, RoomRegistry, RoomRole, WorkArea};
pub use things::{Thing, ThingKind, ThingStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub map: DungeonMap,
    pub things: ThingStore,
    pub rooms: RoomRegistry,
    pub dungeons: Vec<Dungeon>,
    pub creatures: CreatureStore,
    pub models: CreatureModels,
    pub jobs: JobTable,
}

impl World {
    /// An earth-filled map of the given size in slabs, with default models and jobs
    pub fn new(width: i32, height: i32) -> Result<Self> {
        Ok(Self {
            map: DungeonMap::new(width, height)?,
            things: ThingStore::new(),
            rooms: RoomRegistry::new(),
            dungeons: (0..PLAYERS_COUNT).map(|p| Dungeon::new(PlayerId::new(p as u8))).collect(),
            creatures: CreatureStore::new(),
            models: CreatureModels::default(),
            jobs: JobTable::default(),
        })
    }

    pub fn dungeon(&self, player: PlayerId) -> Option<&Dungeon> {
        self.dungeons.get(player.index())
    }

    pub fn dungeon_mut(&mut self, player: PlayerId) -> Option<&mut Dungeon> {
        self.dungeons.get_mut(player.index())
    }

    pub fn try_dungeon_mut(&mut self, player: PlayerId) -> Result<&mut Dungeon> {
        self.dungeons
            .get_mut(player.index())
            .ok_or_else(|| DungeonError::Config(format!("player {} has no dungeon", player.0)))
    }

    pub fn player_exists(&self, player: PlayerId) -> bool {
        self.dungeon(player).map(|d| d.in_play).unwrap_or(false)
    }

    pub fn player_lost(&self, player: PlayerId) -> bool {
        self.dungeon(player).map(|d| d.lost).unwrap_or(false)
    }
}
