//! Creature storage and per-player lists
//!
//! Creatures live in one vector indexed by `CreatureId`. Each player keeps
//! two singly linked lists threaded through `Creature::next_in_list`: one
//! for special diggers and one for everybody else. Walks are capped at the
//! number of stored creatures so that a corrupted link cannot hang a tick.

use serde::{Deserialize, Serialize};

use crate::core::error::{DungeonError, Result};
use crate::core::stats::{ErrorStatKind, ErrorStats};
use crate::core::types::{CreatureId, ModelId, PlayerId, SubtileCoord, PLAYERS_COUNT};
use crate::entity::creature::Creature;

/// Which per-player list a creature is threaded on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatureList {
    Creatures,
    Diggers,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatureStore {
    creatures: Vec<Creature>,
    creature_heads: [Option<CreatureId>; PLAYERS_COUNT],
    digger_heads: [Option<CreatureId>; PLAYERS_COUNT],
}

impl CreatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a creature and link it at the end of its owner's list
    pub fn spawn(
        &mut self,
        model: ModelId,
        owner: PlayerId,
        pos: SubtileCoord,
        is_digger: bool,
        stats: &ErrorStats,
    ) -> Result<CreatureId> {
        if owner.index() >= PLAYERS_COUNT {
            return Err(DungeonError::Config(format!("player {} does not exist", owner.0)));
        }
        let id = CreatureId::new(self.creatures.len() as u32);
        self.creatures.push(Creature::new(id, model, owner, pos, is_digger));
        self.link(id, stats);
        Ok(id)
    }

    pub fn get(&self, id: CreatureId) -> Option<&Creature> {
        self.creatures.get(id.index()).filter(|c| c.alive)
    }

    pub fn get_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.creatures.get_mut(id.index()).filter(|c| c.alive)
    }

    /// Living creatures in id order
    pub fn iter(&self) -> impl Iterator<Item = &Creature> {
        self.creatures.iter().filter(|c| c.alive)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn head_mut(&mut self, player: PlayerId, list: CreatureList) -> &mut Option<CreatureId> {
        match list {
            CreatureList::Creatures => &mut self.creature_heads[player.index()],
            CreatureList::Diggers => &mut self.digger_heads[player.index()],
        }
    }

    fn head(&self, player: PlayerId, list: CreatureList) -> Option<CreatureId> {
        if player.index() >= PLAYERS_COUNT {
            return None;
        }
        match list {
            CreatureList::Creatures => self.creature_heads[player.index()],
            CreatureList::Diggers => self.digger_heads[player.index()],
        }
    }

    fn list_of(creature: &Creature) -> CreatureList {
        if creature.is_digger {
            CreatureList::Diggers
        } else {
            CreatureList::Creatures
        }
    }

    /// Members of one list, in link order
    pub fn walk(&self, player: PlayerId, list: CreatureList, stats: &ErrorStats) -> Vec<CreatureId> {
        let cap = self.creatures.len();
        let mut out = Vec::new();
        let mut steps = 0;
        let mut next = self.head(player, list);
        while let Some(id) = next {
            if steps >= cap {
                tracing::error!("Infinite loop detected walking creature list of player {}", player.0);
                stats.inc(ErrorStatKind::ListWalkCorrupted);
                break;
            }
            let Some(creature) = self.creatures.get(id.index()) else {
                tracing::error!("Creature list of player {} links to missing creature {}", player.0, id.0);
                stats.inc(ErrorStatKind::DanglingReference);
                break;
            };
            steps += 1;
            if creature.alive {
                out.push(id);
            }
            next = creature.next_in_list;
        }
        out
    }

    pub fn player_creatures(&self, player: PlayerId, stats: &ErrorStats) -> Vec<CreatureId> {
        self.walk(player, CreatureList::Creatures, stats)
    }

    pub fn player_diggers(&self, player: PlayerId, stats: &ErrorStats) -> Vec<CreatureId> {
        self.walk(player, CreatureList::Diggers, stats)
    }

    /// Every creature of the player, diggers first
    pub fn player_all(&self, player: PlayerId, stats: &ErrorStats) -> Vec<CreatureId> {
        let mut all = self.player_diggers(player, stats);
        all.extend(self.player_creatures(player, stats));
        all
    }

    fn link(&mut self, id: CreatureId, stats: &ErrorStats) {
        let Some(creature) = self.creatures.get(id.index()) else {
            return;
        };
        let (owner, list) = (creature.owner, Self::list_of(creature));
        let members = self.walk(owner, list, stats);
        match members.last() {
            Some(last) => self.creatures[last.index()].next_in_list = Some(id),
            None => *self.head_mut(owner, list) = Some(id),
        }
        self.creatures[id.index()].next_in_list = None;
    }

    fn unlink(&mut self, id: CreatureId) {
        let Some(creature) = self.creatures.get(id.index()) else {
            return;
        };
        let (owner, list, after) = (creature.owner, Self::list_of(creature), creature.next_in_list);
        if self.head(owner, list) == Some(id) {
            *self.head_mut(owner, list) = after;
        } else if let Some(prev) = self.creatures.iter().position(|c| c.next_in_list == Some(id)) {
            self.creatures[prev].next_in_list = after;
        }
        self.creatures[id.index()].next_in_list = None;
    }

    /// Remove a creature from the game
    pub fn kill(&mut self, id: CreatureId) {
        if self.get(id).is_none() {
            return;
        }
        self.unlink(id);
        self.creatures[id.index()].alive = false;
        tracing::debug!("Creature {} removed", id.0);
    }

    /// Hand a creature over to another player
    pub fn change_owner(&mut self, id: CreatureId, new_owner: PlayerId, stats: &ErrorStats) {
        if self.get(id).is_none() || new_owner.index() >= PLAYERS_COUNT {
            return;
        }
        self.unlink(id);
        self.creatures[id.index()].owner = new_owner;
        self.link(id, stats);
    }

    /// Break a link on purpose; used to exercise the walk guard
    #[cfg(test)]
    pub(crate) fn corrupt_link(&mut self, from: CreatureId, to: CreatureId) {
        self.creatures[from.index()].next_in_list = Some(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(store: &mut CreatureStore, owner: u8, digger: bool) -> CreatureId {
        store
            .spawn(ModelId(0), PlayerId::new(owner), SubtileCoord::new(4, 4), digger, &ErrorStats::new())
            .unwrap()
    }

    #[test]
    fn test_lists_are_per_player_and_class() {
        let mut store = CreatureStore::new();
        let a = spawn(&mut store, 0, false);
        let b = spawn(&mut store, 0, true);
        let c = spawn(&mut store, 0, false);
        let d = spawn(&mut store, 1, false);
        let stats = ErrorStats::new();

        assert_eq!(store.player_creatures(PlayerId::new(0), &stats), vec![a, c]);
        assert_eq!(store.player_diggers(PlayerId::new(0), &stats), vec![b]);
        assert_eq!(store.player_creatures(PlayerId::new(1), &stats), vec![d]);
        assert_eq!(store.player_all(PlayerId::new(0), &stats), vec![b, a, c]);
    }

    #[test]
    fn test_kill_and_change_owner_relink() {
        let mut store = CreatureStore::new();
        let a = spawn(&mut store, 0, false);
        let b = spawn(&mut store, 0, false);
        let c = spawn(&mut store, 0, false);
        let stats = ErrorStats::new();

        store.kill(b);
        assert_eq!(store.player_creatures(PlayerId::new(0), &stats), vec![a, c]);
        store.change_owner(a, PlayerId::new(2), &stats);
        assert_eq!(store.player_creatures(PlayerId::new(0), &stats), vec![c]);
        assert_eq!(store.player_creatures(PlayerId::new(2), &stats), vec![a]);
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_cyclic_list_walk_is_capped() {
        let mut store = CreatureStore::new();
        let a = spawn(&mut store, 0, false);
        let b = spawn(&mut store, 0, false);
        store.corrupt_link(b, a);
        let stats = ErrorStats::new();

        let walked = store.player_creatures(PlayerId::new(0), &stats);
        assert_eq!(walked.len(), 2, "walk stops at the store size");
        assert_eq!(stats.get(ErrorStatKind::ListWalkCorrupted), 1);
    }

    #[test]
    fn test_spawn_rejects_unknown_player() {
        let mut store = CreatureStore::new();
        let result = store.spawn(ModelId(0), PlayerId::new(9), SubtileCoord::new(1, 1), false, &ErrorStats::new());
        assert!(result.is_err());
    }
}
