//! The per-player digger task stack
//!
//! A bounded list of `(subtile, task)` entries rebuilt wholesale by the
//! discovery passes. Entries are never removed between rebuilds; a stale
//! entry is cancelled in place by setting its kind to `None`. Reinforcement
//! candidates found during the territory flood fill are collected on a
//! separate list and appended after every other pass.

use serde::{Deserialize, Serialize};

use crate::core::types::SubtileCoord;

/// Kind of labor a stack entry stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiggerTaskKind {
    /// Cancelled entry, skipped by the scan
    None,
    ImproveDungeon,
    ConvertDungeon,
    ReinforceWall,
    PickUpUnconscious,
    SaveUnconscious,
    PickUpCorpse,
    PickUpSpellbook,
    PickUpCrateToArm,
    PickUpCrateForWorkshop,
    PickUpGoldPile,
    DigOrMine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiggerStackEntry {
    pub stl: SubtileCoord,
    pub kind: DiggerTaskKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiggerStack {
    entries: Vec<DiggerStackEntry>,
    reinforce: Vec<DiggerStackEntry>,
    /// Set once per rebuild when an entry was refused
    overflowed: bool,
}

impl DiggerStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DiggerStackEntry] {
        &self.entries
    }

    pub fn get(&self, pos: usize) -> Option<&DiggerStackEntry> {
        self.entries.get(pos)
    }

    /// Cancel an entry in place
    pub fn cancel(&mut self, pos: usize) {
        if let Some(entry) = self.entries.get_mut(pos) {
            entry.kind = DiggerTaskKind::None;
        }
    }

    /// Forget all entries and collected reinforcements
    pub fn clear(&mut self) {
        self.entries.clear();
        self.reinforce.clear();
        self.overflowed = false;
    }

    /// Append an entry unless the stack is full. Returns whether there is
    /// still room for more afterwards.
    pub fn add(&mut self, stl: SubtileCoord, kind: DiggerTaskKind, capacity: usize) -> bool {
        if self.entries.len() >= capacity {
            if !self.overflowed {
                tracing::warn!("Digger stack is full ({} entries), dropping {:?} task", capacity, kind);
                self.overflowed = true;
            }
            return false;
        }
        self.entries.push(DiggerStackEntry { stl, kind });
        self.entries.len() < capacity
    }

    /// Whether an entry was refused since the last rebuild
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn find_using_pos(&self, stl: SubtileCoord, kind: DiggerTaskKind) -> Option<usize> {
        self.entries.iter().position(|e| e.stl == stl && e.kind == kind)
    }

    pub fn find_starting_at(&self, kind: DiggerTaskKind, start: usize) -> Option<usize> {
        (start..self.entries.len()).find(|&i| self.entries[i].kind == kind)
    }

    /// First live entry of any kind but `excluded`, from `start` on
    pub fn find_task_other_than_starting_at(&self, excluded: DiggerTaskKind, start: usize) -> Option<usize> {
        (start..self.entries.len()).find(|&i| {
            let kind = self.entries[i].kind;
            kind != excluded && kind != DiggerTaskKind::None
        })
    }

    pub fn reinforce_candidates(&self) -> &[DiggerStackEntry] {
        &self.reinforce
    }

    /// Record a reinforcement candidate. Candidates share the stack capacity
    /// with the entries already added.
    pub fn add_reinforce_candidate(&mut self, stl: SubtileCoord, capacity: usize) -> bool {
        if !self.reinforce_has_room(capacity) {
            return false;
        }
        self.reinforce.push(DiggerStackEntry { stl, kind: DiggerTaskKind::ReinforceWall });
        true
    }

    pub fn reinforce_has_room(&self, capacity: usize) -> bool {
        self.reinforce.len() < capacity.saturating_sub(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stl(x: i32) -> SubtileCoord {
        SubtileCoord::new(x, 1)
    }

    #[test]
    fn test_add_refuses_past_capacity() {
        let mut stack = DiggerStack::new();
        assert!(stack.add(stl(1), DiggerTaskKind::DigOrMine, 2));
        assert!(!stack.add(stl(2), DiggerTaskKind::DigOrMine, 2), "last slot reports no more room");
        assert!(!stack.add(stl(3), DiggerTaskKind::DigOrMine, 2));
        assert_eq!(stack.len(), 2);
        assert!(stack.overflowed());
    }

    #[test]
    fn test_cancelled_entries_are_skipped_by_searches() {
        let mut stack = DiggerStack::new();
        stack.add(stl(1), DiggerTaskKind::ReinforceWall, 8);
        stack.add(stl(2), DiggerTaskKind::PickUpGoldPile, 8);
        stack.add(stl(3), DiggerTaskKind::ReinforceWall, 8);

        assert_eq!(stack.find_task_other_than_starting_at(DiggerTaskKind::ReinforceWall, 0), Some(1));
        stack.cancel(1);
        assert_eq!(stack.find_task_other_than_starting_at(DiggerTaskKind::ReinforceWall, 0), None);
        assert_eq!(stack.find_starting_at(DiggerTaskKind::ReinforceWall, 1), Some(2));
        assert_eq!(stack.find_using_pos(stl(2), DiggerTaskKind::PickUpGoldPile), None);
    }

    #[test]
    fn test_reinforce_candidates_share_capacity() {
        let mut stack = DiggerStack::new();
        stack.add(stl(1), DiggerTaskKind::DigOrMine, 4);
        stack.add(stl(2), DiggerTaskKind::DigOrMine, 4);
        assert!(stack.add_reinforce_candidate(stl(5), 4));
        assert!(stack.add_reinforce_candidate(stl(6), 4));
        assert!(!stack.add_reinforce_candidate(stl(7), 4));
        stack.clear();
        assert!(stack.reinforce_candidates().is_empty());
    }
}
