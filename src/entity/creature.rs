//! The creature record
//!
//! Everything the state machine, the job assigner and the digger scheduler
//! read or write about one creature. State numbers are stored raw so that a
//! corrupted value can be detected and degraded instead of trusted.

use serde::{Deserialize, Serialize};

use crate::core::types::{CreatureId, ModelId, PlayerId, RoomId, SubtileCoord, ThingId, Tick};
use crate::jobs::registry::Job;
use crate::states::ids::CreatureStateId;

/// State pair put aside while a creature is cowering from a slap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    pub active: u16,
    pub continue_state: u16,
}

/// Reasons a creature can be annoyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AngerReason {
    NotPaid,
    Hungry,
    NoLair,
    Slapped,
    /// Told to do a job it will not do
    Rejected,
    Other,
}

impl AngerReason {
    pub const ALL: [AngerReason; 6] = [
        AngerReason::NotPaid,
        AngerReason::Hungry,
        AngerReason::NoLair,
        AngerReason::Slapped,
        AngerReason::Rejected,
        AngerReason::Other,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Per-reason annoyance counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mood {
    annoyance: [i32; 6],
}

impl Mood {
    pub fn annoy(&mut self, reason: AngerReason, amount: i32) {
        let value = &mut self.annoyance[reason.index()];
        *value = (*value + amount).max(0);
    }

    pub fn calm(&mut self, reason: AngerReason) {
        self.annoyance[reason.index()] = 0;
    }

    pub fn annoyance(&self, reason: AngerReason) -> i32 {
        self.annoyance[reason.index()]
    }

    /// The strongest grudge
    pub fn peak(&self) -> i32 {
        self.annoyance.iter().copied().max().unwrap_or(0)
    }

    pub fn is_angry(&self, level: i32) -> bool {
        level > 0 && self.peak() >= level
    }

    pub fn is_livid(&self, level: i32) -> bool {
        level > 0 && self.peak() >= level * 2
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureFlags {
    /// Possessed or otherwise steered by the player
    pub controlled: bool,
    pub chicken: bool,
    /// Held in the keeper's hand
    pub picked_up: bool,
    pub called_to_arms: bool,
    /// The keeper's computer assistant may not move this creature
    pub no_comp_control: bool,
    pub mad_killing: bool,
    pub dying: bool,
}

/// Category of the last labor a digger performed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LastDidJob {
    #[default]
    None,
    DigOrMine,
    ConvImprDungeon,
    ReinforceWallUnprompted,
    ReinforceWallAssigned,
    /// Hauling or room work handed out by the job table
    NonDiggerTask,
}

/// Digger-only bookkeeping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiggerControl {
    /// Cursor into the owner's task stack
    pub stack_pos: usize,
    /// Stack version the cursor belongs to
    pub stack_update_turn: Option<Tick>,
    /// Index into the owner's dig task list
    pub task_idx: Option<usize>,
    /// Slab being dug, as its center subtile
    pub task_stl: Option<SubtileCoord>,
    /// Subtile being improved, converted or reinforced
    pub working_stl: Option<SubtileCoord>,
    pub last_did_job: LastDidJob,
    pub task_repeats: u32,
    pub consecutive_reinforcements: u32,
}

/// Periodic check timestamps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatureTimers {
    pub job_secondary_check_turn: Tick,
    pub job_primary_check_turn: Tick,
    pub job_assigned_check_turn: Tick,
    /// Last "should the carried gold go home" check
    pub tasks_check_turn: Tick,
    /// Turn the creature last became idle
    pub idle_start_turn: Tick,
    pub last_eat_turn: Tick,
    pub last_paid_turn: Tick,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creature {
    pub id: CreatureId,
    pub model: ModelId,
    pub owner: PlayerId,
    pub pos: SubtileCoord,
    pub exp_level: u8,
    pub is_digger: bool,
    pub alive: bool,
    /// Link of the owner's creature or digger list
    pub next_in_list: Option<CreatureId>,

    pub active_state: u16,
    pub continue_state: u16,
    pub saved_state: Option<SavedState>,
    pub flags: CreatureFlags,

    /// Job retried whenever the creature is idle
    pub job_assigned: Job,
    /// Destination of the current move
    pub moveto_pos: Option<SubtileCoord>,
    pub target_room: Option<RoomId>,
    /// Room the creature currently occupies a place in
    pub work_room: Option<RoomId>,
    pub lair_room: Option<RoomId>,

    pub gold_carried: u32,
    /// Wages due but not yet collected
    pub paydays_owed: u32,
    pub mood: Mood,
    pub timers: CreatureTimers,
    pub digger: DiggerControl,

    pub pickup_object: Option<ThingId>,
    pub pickup_creature: Option<CreatureId>,
    pub arming_thing: Option<ThingId>,
    /// Creature carrying this one away
    pub dragged_by: Option<CreatureId>,
    pub combat_target: Option<CreatureId>,
    pub group_leader: Option<CreatureId>,
    pub persuade_targets: Vec<CreatureId>,

    /// Turns left in timed states
    pub countdown: u32,
    /// Idle loops in a row without anything to do
    pub idle_failures: u32,
}

impl Creature {
    pub fn new(id: CreatureId, model: ModelId, owner: PlayerId, pos: SubtileCoord, is_digger: bool) -> Self {
        Self {
            id,
            model,
            owner,
            pos,
            exp_level: 1,
            is_digger,
            alive: true,
            next_in_list: None,
            active_state: CreatureStateId::Unused.raw(),
            continue_state: CreatureStateId::Unused.raw(),
            saved_state: None,
            flags: CreatureFlags::default(),
            job_assigned: Job::NULL,
            moveto_pos: None,
            target_room: None,
            work_room: None,
            lair_room: None,
            gold_carried: 0,
            paydays_owed: 0,
            mood: Mood::default(),
            timers: CreatureTimers::default(),
            digger: DiggerControl::default(),
            pickup_object: None,
            pickup_creature: None,
            arming_thing: None,
            dragged_by: None,
            combat_target: None,
            group_leader: None,
            persuade_targets: Vec::new(),
            countdown: 0,
            idle_failures: 0,
        }
    }

    /// Active state, if the stored number is a valid one
    pub fn active(&self) -> Option<CreatureStateId> {
        CreatureStateId::from_raw(self.active_state)
    }

    pub fn continuing(&self) -> Option<CreatureStateId> {
        CreatureStateId::from_raw(self.continue_state)
    }

    pub fn is_in_state(&self, state: CreatureStateId) -> bool {
        self.active_state == state.raw()
    }

    /// Whether the creature can take part in anything at all
    pub fn is_active(&self) -> bool {
        self.alive && !self.flags.picked_up && !self.flags.dying && !self.is_in_state(CreatureStateId::CreatureUnconscious)
    }

    pub fn is_unconscious(&self) -> bool {
        self.alive && self.is_in_state(CreatureStateId::CreatureUnconscious)
    }

    pub fn is_being_dragged(&self) -> bool {
        self.dragged_by.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_livid_is_twice_angry() {
        let mut mood = Mood::default();
        mood.annoy(AngerReason::NotPaid, 150);
        assert!(mood.is_angry(100));
        assert!(!mood.is_livid(100), "150 is angry but not livid at level 100");
        mood.annoy(AngerReason::NotPaid, 50);
        assert!(mood.is_livid(100));
        assert!(!mood.is_angry(0), "a zero level disables anger");
    }

    #[test]
    fn test_annoyance_never_goes_negative() {
        let mut mood = Mood::default();
        mood.annoy(AngerReason::Hungry, -20);
        assert_eq!(mood.annoyance(AngerReason::Hungry), 0);
        mood.annoy(AngerReason::Hungry, 30);
        mood.calm(AngerReason::Hungry);
        assert_eq!(mood.peak(), 0);
    }

    #[test]
    fn test_new_creature_is_in_unused_state() {
        let creature = Creature::new(CreatureId::new(3), ModelId(0), PlayerId::new(0), SubtileCoord::new(4, 4), true);
        assert_eq!(creature.active(), Some(CreatureStateId::Unused));
        assert!(creature.is_active());
        assert_eq!(creature.digger.last_did_job, LastDidJob::None);
    }
}
