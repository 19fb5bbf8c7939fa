//! Simulation configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other. Defaults reproduce the tuning of
//! the classic dungeon-keeper creature scheduler.

use serde::{Deserialize, Serialize};

use crate::core::types::Tick;

/// Configuration for the creature and digger systems
///
/// These values have been tuned to produce good emergent behavior.
/// Changing them will affect gameplay pacing and feel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === DIGGER SCHEDULER ===
    /// Fixed capacity of every player's digger task stack
    ///
    /// Discovery passes take fractions of this value as their quotas, so
    /// raising it scales every pass proportionally.
    pub digger_task_max_count: usize,

    /// Minimum turns between two rebuilds of a player's digger stack
    ///
    /// All workers of a player observe the same stack version for at least
    /// this long, which keeps their cursors meaningful.
    pub digger_stack_rebuild_interval: Tick,

    /// Tie-break margin (subtiles) for the position claim
    ///
    /// A worker already heading to a tile keeps it even if a newcomer is up
    /// to this much closer. Prevents work from being reshuffled constantly.
    pub claim_margin_subtiles: i32,

    /// Turns between two "should I bring my gold home" checks of a digger
    pub tasks_check_interval: Tick,

    /// Reinforcement tasks are only appended while the stack is shorter than this
    pub reinforce_stack_fill_limit: usize,

    /// Search radius (subtiles) of the "continue what I did" area scans
    pub last_did_search_distance: i32,

    /// One-in-N chance of a digger on repeated gem digging resetting its cursor
    pub gem_dig_reset_chance: u32,

    /// One-in-N chance per idle check that a digger takes a toking break
    pub imp_toking_chance: u32,

    /// Length of a toking break (turns)
    pub imp_toking_turns: u32,

    // === DIGGER WORK ===
    /// Turns of digging needed to remove one dirt or gold slab
    pub dig_work_turns: u32,

    /// Gold produced by each turn of mining a gold or gem slab
    pub gold_mined_per_turn: u32,

    /// Turns needed to turn a path slab into claimed floor
    pub improve_work_turns: u32,

    /// Turns needed to convert an enemy claimed slab
    pub convert_work_turns: u32,

    /// Turns needed to reinforce one earth wall
    pub reinforce_work_turns: u32,

    /// Gold a single treasury slab can store
    pub gold_per_treasury_slab: u32,

    // === JOBS ===
    /// Minimum turns between two secondary job attempts
    pub secondary_job_interval: Tick,

    /// Whether creatures refuse jobs listed in their "will not do" set
    ///
    /// Disabling it makes every creature obedient.
    pub job_disobedience_enabled: bool,

    /// Diggers drag unconscious own creatures back to their lairs
    pub drag_unconscious_to_lair: bool,

    /// Countdown set when a position job fails with `SET_STATE_ON_FAIL`
    pub moan_countdown: u32,

    /// Corpse hauling is skipped when an enemy is within this many slabs
    pub corpse_enemy_safety_slabs: i32,

    // === MOOD ===
    /// Livid creatures look for an anger job when
    /// `(turn + creature_index) & anger_check_mask == 0`
    ///
    /// With 0x3F each livid creature re-evaluates once every 64 turns,
    /// staggered across creatures by their index.
    pub anger_check_mask: u64,

    /// Experience level above which a creature can persuade others to leave
    pub persuade_min_level: u8,

    // === CREATURE NEEDS AND TIMERS ===
    /// Turns a slapped creature spends cowering before resuming
    pub slap_cower_turns: u32,

    /// Turns a creature stays knocked out
    pub unconscious_turns: u32,

    /// Turns of healing sleep in a lair
    pub sleep_turns: u32,

    /// Turns a creature works in a room before reconsidering its options
    pub work_session_turns: u32,

    /// Turns between two pay days
    pub pay_day_interval: Tick,

    /// Turns after eating before a creature gets hungry again
    pub hunger_interval: Tick,

    /// Turns spent eating in a garden
    pub eat_turns: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            // Digger scheduler (quotas are fractions of the capacity)
            digger_task_max_count: 64,
            digger_stack_rebuild_interval: 128,
            claim_margin_subtiles: 6,
            tasks_check_interval: 128,
            reinforce_stack_fill_limit: 32,
            last_did_search_distance: 28,
            gem_dig_reset_chance: 20,
            imp_toking_chance: 64,
            imp_toking_turns: 40,

            // Digger work
            dig_work_turns: 12,
            gold_mined_per_turn: 40,
            improve_work_turns: 6,
            convert_work_turns: 10,
            reinforce_work_turns: 10,
            gold_per_treasury_slab: 1000,

            // Jobs
            secondary_job_interval: 128,
            job_disobedience_enabled: true,
            drag_unconscious_to_lair: false,
            moan_countdown: 50,
            corpse_enemy_safety_slabs: 10,

            // Mood
            anger_check_mask: 0x3F,
            persuade_min_level: 5,

            // Needs and timers
            slap_cower_turns: 16,
            unconscious_turns: 600,
            sleep_turns: 200,
            work_session_turns: 400,
            pay_day_interval: 10_000,
            hunger_interval: 3_000,
            eat_turns: 40,
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quota for a discovery pass, as `numerator / denominator` of the stack capacity
    pub fn stack_quota(&self, numerator: usize, denominator: usize) -> usize {
        self.digger_task_max_count * numerator / denominator
    }

    pub fn validate(&self) -> Result<(), String> {
        // The smallest quota (1/64) must still allow one entry
        if self.digger_task_max_count < 64 {
            return Err(format!(
                "digger_task_max_count ({}) should be at least 64",
                self.digger_task_max_count
            ));
        }

        if self.reinforce_stack_fill_limit > self.digger_task_max_count {
            return Err(format!(
                "reinforce_stack_fill_limit ({}) should be <= digger_task_max_count ({})",
                self.reinforce_stack_fill_limit, self.digger_task_max_count
            ));
        }

        // The anger mask must be of the form 2^n - 1 to stagger checks evenly
        if (self.anger_check_mask + 1) & self.anger_check_mask != 0 {
            return Err(format!(
                "anger_check_mask ({:#x}) should be one less than a power of two",
                self.anger_check_mask
            ));
        }

        if self.digger_stack_rebuild_interval == 0 || self.secondary_job_interval == 0 {
            return Err("Check intervals must be positive".into());
        }

        if self.gem_dig_reset_chance == 0 || self.imp_toking_chance == 0 {
            return Err("Random chances must be positive".into());
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<SimulationConfig> = OnceLock::new();

pub fn config() -> &'static SimulationConfig {
    CONFIG.get_or_init(SimulationConfig::default)
}

pub fn set_config(config: SimulationConfig) -> Result<(), SimulationConfig> {
    CONFIG.set(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_quota_fractions() {
        let config = SimulationConfig::default();
        assert_eq!(config.stack_quota(5, 8), 40);
        assert_eq!(config.stack_quota(1, 64), 1);
        assert_eq!(config.stack_quota(1, 4) - 1, 15);
    }

    #[test]
    fn test_rejects_uneven_anger_mask() {
        let config = SimulationConfig { anger_check_mask: 0x30, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
