//! Property tests for the state table, the transition rule and the job
//! preference scan

use dungeon_creatures::core::stats::{ErrorStatKind, ErrorStats};
use dungeon_creatures::jobs::assign::preference_order;
use dungeon_creatures::jobs::{Job, JobTable};
use dungeon_creatures::states::ids::CREATURE_STATES_COUNT;
use dungeon_creatures::states::machine::transition_allowed;
use dungeon_creatures::states::table::state_table;
use dungeon_creatures::states::{state_info, state_info_raw, CreatureStateId, StateCategory};
use proptest::prelude::*;

fn any_state() -> impl Strategy<Value = CreatureStateId> {
    (0..CreatureStateId::ALL.len()).prop_map(|idx| CreatureStateId::ALL[idx])
}

/// States that can only be left for a target overriding the transition gate
fn transitional_state() -> impl Strategy<Value = CreatureStateId> {
    let states: Vec<CreatureStateId> = CreatureStateId::ALL.iter().copied().filter(|s| state_info(*s).transition).collect();
    prop::sample::select(states)
}

#[test]
fn test_state_names_round_trip_through_lookup() {
    for state in CreatureStateId::ALL {
        assert_eq!(CreatureStateId::from_name(state.name()), Some(*state));
    }
    assert_eq!(state_table().len(), CREATURE_STATES_COUNT);
}

#[test]
fn test_default_table_validates() {
    let jobs = JobTable::default();
    assert!(jobs.validate().is_ok(), "built-in jobs should be consistent");
    assert!(jobs.count() > 1);
}

proptest! {
    #[test]
    fn test_stored_state_numbers_never_panic(raw in any::<u16>()) {
        let stats = ErrorStats::new();
        let descriptor = state_info_raw(raw, &stats);
        if (raw as usize) < CREATURE_STATES_COUNT {
            prop_assert_eq!(descriptor.id.raw(), raw);
            prop_assert_eq!(stats.get(ErrorStatKind::StateOutOfRange), 0);
        } else {
            prop_assert!(descriptor.is_invalid());
            prop_assert_eq!(stats.get(ErrorStatKind::StateOutOfRange), 1);
        }
    }

    #[test]
    fn test_controlled_creatures_only_go_idle(current in any_state(), next in any_state()) {
        let allowed = transition_allowed(state_info(current), state_info(next), true);
        if state_info(next).category != StateCategory::Idle {
            prop_assert!(!allowed, "{} -> {} while controlled", current, next);
        }
    }

    #[test]
    fn test_captive_states_hold_unless_overridden(current in any_state(), next in any_state()) {
        let (from, to) = (state_info(current), state_info(next));
        let door_exception = from.door_fight_exception && to.category == StateCategory::FightDoor;
        if from.captive && !to.overrides.captive && !door_exception {
            prop_assert!(!transition_allowed(from, to, false), "{} should hold against {}", current, next);
        }
    }

    #[test]
    fn test_transitional_states_hold_unless_overridden(current in transitional_state(), next in any_state()) {
        let (from, to) = (state_info(current), state_info(next));
        let allowed = transition_allowed(from, to, false);
        if to.overrides.transition {
            let rest = (!from.captive || to.overrides.captive) && to.overrides.overrides(from.category);
            prop_assert_eq!(allowed, rest, "{} -> {} passes the gate", current, next);
        } else {
            prop_assert!(!allowed, "{} should hold against {}", current, next);
        }
    }

    #[test]
    fn test_preference_scan_visits_each_job_once(bits in any::<u32>(), start in 0usize..40, count in 1usize..33) {
        let jobs = Job(bits as u64);
        let visited: Vec<Job> = preference_order(count, start, jobs).collect();
        let expected = (1..count).filter(|idx| jobs.contains(Job::from_index(*idx))).count();
        prop_assert_eq!(visited.len(), expected);
        for job in &visited {
            prop_assert!(jobs.contains(*job));
            prop_assert!(!job.is_null());
        }
        let mut indices: Vec<usize> = visited.iter().map(|j| j.index()).collect();
        indices.sort_unstable();
        indices.dedup();
        prop_assert_eq!(indices.len(), visited.len(), "no job is tried twice");
    }

    #[test]
    fn test_preference_scan_starts_at_the_random_row(bits in 1u32.., start in 1usize..24) {
        let jobs = Job(bits as u64);
        let count = 24;
        let first = preference_order(count, start, jobs).next();
        let expected = (0..count)
            .map(|i| (start + i) % count)
            .find(|idx| *idx != 0 && jobs.contains(Job::from_index(*idx)))
            .map(Job::from_index);
        prop_assert_eq!(first, expected);
    }
}
