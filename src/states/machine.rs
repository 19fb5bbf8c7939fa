//! Creature state transitions
//!
//! Two ways into a state exist. `set_state` is the internal one: the engine
//! itself forces the change (arrival, end of a countdown) and no precedence
//! check is made. `request_state` is the external one: a behavior decision
//! wants the change, so it must pass `can_change_from_state_to` first and
//! the abandoned state is cleaned up.
//!
//! A creature in a move state is judged by the state it is moving towards,
//! and one cowering from a slap by the state it was in before.

use crate::core::types::{CreatureId, SubtileCoord};
use crate::entity::creature::{AngerReason, SavedState};
use crate::simulation::context::SimulationContext;
use crate::states::cleanup::{leave_work_room, run_cleanup};
use crate::states::ids::CreatureStateId;
use crate::states::table::{state_info, state_info_raw, StateCategory, StateDescriptor};

/// Stored state number, resolving a move to the state it continues with
pub fn state_besides_move(ctx: &SimulationContext, id: CreatureId) -> u16 {
    let Some(creature) = ctx.creature(id) else {
        return CreatureStateId::Unused.raw();
    };
    if state_info_raw(creature.active_state, &ctx.stats).category == StateCategory::Move {
        creature.continue_state
    } else {
        creature.active_state
    }
}

/// Like `state_besides_move`, also looking through a slap interruption
pub fn state_besides_interruptions(ctx: &SimulationContext, id: CreatureId) -> u16 {
    let Some(creature) = ctx.creature(id) else {
        return CreatureStateId::Unused.raw();
    };
    let (mut active, mut continuing) = (creature.active_state, creature.continue_state);
    if active == CreatureStateId::CreatureSlapCowers.raw() {
        if let Some(saved) = creature.saved_state {
            active = saved.active;
            continuing = saved.continue_state;
        }
    }
    if state_info_raw(active, &ctx.stats).category == StateCategory::Move {
        continuing
    } else {
        active
    }
}

/// Descriptor judged by precedence and cleanup
pub fn effective_state_descriptor(ctx: &SimulationContext, id: CreatureId) -> &'static StateDescriptor {
    state_info_raw(state_besides_move(ctx, id), &ctx.stats)
}

pub fn creature_state_category(ctx: &SimulationContext, id: CreatureId) -> StateCategory {
    effective_state_descriptor(ctx, id).category
}

/// Whether the creature, working on its current state, may switch to `next`
pub fn can_change_from_state_to(ctx: &SimulationContext, id: CreatureId, next: CreatureStateId) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let active = state_info_raw(creature.active_state, &ctx.stats);
    let current = effective_state_descriptor(ctx, id);
    let next = state_info(next);
    transition_allowed_from(active, current, next, creature.flags.controlled)
}

/// The precedence rule itself, for a creature not on the move
pub fn transition_allowed(current: &StateDescriptor, next: &StateDescriptor, controlled: bool) -> bool {
    transition_allowed_from(current, current, next, controlled)
}

/// The precedence rule. `active` is the stored state, `current` the one
/// it resolves to through a move. Only the stored state grants the door
/// fight exception.
pub fn transition_allowed_from(
    active: &StateDescriptor,
    current: &StateDescriptor,
    next: &StateDescriptor,
    controlled: bool,
) -> bool {
    if controlled && next.category != StateCategory::Idle {
        return false;
    }
    if active.door_fight_exception && next.category == StateCategory::FightDoor {
        return true;
    }
    if current.transition && !next.overrides.transition {
        return false;
    }
    if current.captive && !next.overrides.captive {
        return false;
    }
    next.overrides.overrides(current.category)
}

/// Internal transition; no precedence check and no cleanup
pub fn set_state(ctx: &mut SimulationContext, id: CreatureId, state: CreatureStateId) -> bool {
    let Some(creature) = ctx.creature_mut(id) else {
        return false;
    };
    creature.active_state = state.raw();
    creature.continue_state = CreatureStateId::Unused.raw();
    true
}

/// Run the cleanup of the state being abandoned, if it has one
pub fn abandon_current_state(ctx: &mut SimulationContext, id: CreatureId) {
    if let Some(kind) = effective_state_descriptor(ctx, id).cleanup {
        run_cleanup(ctx, id, kind);
    }
}

/// Clean up and enter a state, forgetting the target and work rooms
pub fn initialise_state(ctx: &mut SimulationContext, id: CreatureId, state: CreatureStateId) -> bool {
    if ctx.creature(id).is_none() {
        return false;
    }
    abandon_current_state(ctx, id);
    leave_work_room(ctx, id);
    let Some(creature) = ctx.creature_mut(id) else {
        return false;
    };
    creature.active_state = state.raw();
    creature.continue_state = CreatureStateId::Unused.raw();
    creature.target_room = None;
    creature.moveto_pos = None;
    true
}

/// External transition; refused when precedence does not allow it
pub fn request_state(ctx: &mut SimulationContext, id: CreatureId, state: CreatureStateId) -> bool {
    if !can_change_from_state_to(ctx, id, state) {
        tracing::trace!("Creature {} may not change to {}", id.0, state);
        return false;
    }
    initialise_state(ctx, id, state)
}

/// Default state for the creature's class and owner
pub fn start_state_for(ctx: &SimulationContext, id: CreatureId) -> CreatureStateId {
    let Some(creature) = ctx.creature(id) else {
        return CreatureStateId::Unused;
    };
    let model = ctx.world.models.get(creature.model);
    if creature.flags.controlled {
        CreatureStateId::ManualControl
    } else if creature.flags.chicken {
        CreatureStateId::CreaturePretendChickenSetupMove
    } else if creature.owner.is_neutral() {
        CreatureStateId::CreatureDormant
    } else if creature.owner.is_hero() {
        model.good_start_state
    } else if !ctx.world.player_exists(creature.owner) {
        CreatureStateId::CreatureDormant
    } else if ctx.world.player_lost(creature.owner) && !creature.is_digger {
        CreatureStateId::LeavesBecauseOwnerLost
    } else {
        model.evil_start_state
    }
}

/// Drop whatever the creature was doing and return to its default state
pub fn set_start_state(ctx: &mut SimulationContext, id: CreatureId) {
    let state = start_state_for(ctx, id);
    initialise_state(ctx, id, state);
    let turn = ctx.turn;
    if let Some(creature) = ctx.creature_mut(id) {
        creature.timers.idle_start_turn = turn;
        creature.countdown = 0;
    }
}

/// Start walking to `pos`, entering `then` on arrival. Fails when there is
/// no route.
pub fn move_to(ctx: &mut SimulationContext, id: CreatureId, pos: SubtileCoord, then: CreatureStateId) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let from = creature.pos;
    if !ctx.services.navigator.can_navigate_to(&ctx.world.map, from, pos) {
        return false;
    }
    let dragging = creature.pickup_creature.is_some() || ctx.world.things.dragged_by(id).is_some();
    let move_state = if dragging {
        CreatureStateId::MoveBackwardsToPosition
    } else {
        CreatureStateId::MoveToPosition
    };
    let Some(creature) = ctx.creature_mut(id) else {
        return false;
    };
    creature.active_state = move_state.raw();
    creature.continue_state = then.raw();
    creature.moveto_pos = Some(pos);
    true
}

/// Move to a random passable subtile next to the creature
pub fn move_somewhere_adjacent(ctx: &mut SimulationContext, id: CreatureId, then: CreatureStateId) -> bool {
    let Some(from) = ctx.creature(id).map(|c| c.pos) else {
        return false;
    };
    let start = ctx.random(8) as usize;
    for step in 0..8 {
        let (dx, dy) = ADJACENT[(start + step) % 8];
        let pos = from.offset(dx, dy);
        if ctx.world.map.is_passable(pos) && move_to(ctx, id, pos, then) {
            return true;
        }
    }
    false
}

const ADJACENT: [(i32, i32); 8] = [(0, -1), (1, -1), (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1)];

/// Interrupt the creature with a slap; it resumes its state afterwards
pub fn slap_creature(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let cower_turns = ctx.config.slap_cower_turns;
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let annoy = ctx.world.models.get(creature.model).annoy_slapped;
    if creature.is_in_state(CreatureStateId::CreatureSlapCowers) {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.countdown = cower_turns;
            creature.mood.annoy(AngerReason::Slapped, annoy);
        }
        return true;
    }
    if !can_change_from_state_to(ctx, id, CreatureStateId::CreatureSlapCowers) {
        return false;
    }
    let Some(creature) = ctx.creature_mut(id) else {
        return false;
    };
    creature.saved_state = Some(SavedState { active: creature.active_state, continue_state: creature.continue_state });
    creature.active_state = CreatureStateId::CreatureSlapCowers.raw();
    creature.continue_state = CreatureStateId::Unused.raw();
    creature.countdown = cower_turns;
    creature.mood.annoy(AngerReason::Slapped, annoy);
    true
}

/// Return from a slap interruption to the saved state
pub fn restore_saved_state(ctx: &mut SimulationContext, id: CreatureId) {
    let saved = ctx.creature_mut(id).and_then(|c| c.saved_state.take());
    match saved {
        Some(saved) => {
            if let Some(creature) = ctx.creature_mut(id) {
                creature.active_state = saved.active;
                creature.continue_state = saved.continue_state;
            }
        }
        None => set_start_state(ctx, id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{ModelId, PlayerId, SlabCoord};
    use crate::world::map::SlabKind;
    use crate::world::World;

    fn context() -> SimulationContext {
        let mut world = World::new(10, 10).unwrap();
        for y in 2..8 {
            for x in 2..8 {
                world.map.set_slab(SlabCoord::new(x, y), SlabKind::Claimed, PlayerId::new(0)).unwrap();
            }
        }
        SimulationContext::new(world, SimulationConfig::default(), 7).unwrap()
    }

    fn warlock(ctx: &mut SimulationContext, owner: PlayerId) -> CreatureId {
        let model = ctx.world.models.by_name("WARLOCK").unwrap();
        ctx.spawn_creature(model, owner, SlabCoord::new(4, 4).center()).unwrap()
    }

    #[test]
    fn test_start_state_depends_on_owner() {
        let mut ctx = context();
        let evil = warlock(&mut ctx, PlayerId::new(0));
        let hero = warlock(&mut ctx, PlayerId::HERO);
        let neutral = warlock(&mut ctx, PlayerId::NEUTRAL);
        let imp = ctx.spawn_creature(ModelId(0), PlayerId::new(0), SlabCoord::new(3, 3).center()).unwrap();

        assert_eq!(ctx.creature(evil).unwrap().active(), Some(CreatureStateId::CreatureDoingNothing));
        assert_eq!(ctx.creature(hero).unwrap().active(), Some(CreatureStateId::GoodDoingNothing));
        assert_eq!(ctx.creature(neutral).unwrap().active(), Some(CreatureStateId::CreatureDormant));
        assert_eq!(ctx.creature(imp).unwrap().active(), Some(CreatureStateId::ImpDoingNothing));

        ctx.world.dungeons[0].lost = true;
        set_start_state(&mut ctx, evil);
        set_start_state(&mut ctx, imp);
        assert_eq!(ctx.creature(evil).unwrap().active(), Some(CreatureStateId::LeavesBecauseOwnerLost));
        assert_eq!(
            ctx.creature(imp).unwrap().active(),
            Some(CreatureStateId::ImpDoingNothing),
            "diggers keep working for a lost keeper"
        );
    }

    #[test]
    fn test_creature_of_absent_keeper_lies_dormant() {
        let mut ctx = context();
        ctx.world.dungeons[2].in_play = false;
        let stray = warlock(&mut ctx, PlayerId::new(2));
        assert_eq!(ctx.creature(stray).unwrap().active(), Some(CreatureStateId::CreatureDormant));
    }

    #[test]
    fn test_door_fight_exception_needs_the_stored_state() {
        let mut held = *state_info(CreatureStateId::GoodArrivedAtAttackRoom);
        held.captive = true;
        let door = state_info(CreatureStateId::CreatureDoorCombat);
        let moving = state_info(CreatureStateId::MoveToPosition);

        assert!(transition_allowed(&held, door, false), "a sabotage state may always fight a door");
        assert!(
            !transition_allowed_from(moving, &held, door, false),
            "walking towards the sabotage state grants no exception"
        );
    }

    #[test]
    fn test_controlled_creature_only_enters_idle_states() {
        let mut ctx = context();
        let id = warlock(&mut ctx, PlayerId::new(0));
        ctx.creature_mut(id).unwrap().flags.controlled = true;
        assert!(!can_change_from_state_to(&ctx, id, CreatureStateId::CreatureLeavingDungeon));
        assert!(can_change_from_state_to(&ctx, id, CreatureStateId::ManualControl));
    }

    #[test]
    fn test_move_is_judged_by_continue_state() {
        let mut ctx = context();
        let id = warlock(&mut ctx, PlayerId::new(0));
        assert!(move_to(&mut ctx, id, SlabCoord::new(6, 6).center(), CreatureStateId::CreatureSleep));
        assert_eq!(state_besides_move(&ctx, id), CreatureStateId::CreatureSleep.raw());
        assert_eq!(creature_state_category(&ctx, id), StateCategory::Sleep);
        // Sleep can only be interrupted by states overriding it
        assert!(!can_change_from_state_to(&ctx, id, CreatureStateId::Training));
        assert!(can_change_from_state_to(&ctx, id, CreatureStateId::CreatureLeavingDungeon));
    }

    #[test]
    fn test_request_state_is_refused_by_captive_gate() {
        let mut ctx = context();
        let id = warlock(&mut ctx, PlayerId::new(0));
        set_state(&mut ctx, id, CreatureStateId::CreatureInPrison);
        assert!(!request_state(&mut ctx, id, CreatureStateId::CreatureLeavingDungeon));
        assert!(ctx.creature(id).unwrap().is_in_state(CreatureStateId::CreatureInPrison));
        assert!(request_state(&mut ctx, id, CreatureStateId::CreatureSlapCowers), "slap overrides captivity");
    }

    #[test]
    fn test_slap_saves_and_restores_state() {
        let mut ctx = context();
        let id = warlock(&mut ctx, PlayerId::new(0));
        assert!(move_to(&mut ctx, id, SlabCoord::new(6, 6).center(), CreatureStateId::AtResearchRoom));
        assert!(slap_creature(&mut ctx, id));

        let creature = ctx.creature(id).unwrap();
        assert!(creature.is_in_state(CreatureStateId::CreatureSlapCowers));
        assert_eq!(creature.continue_state, CreatureStateId::Unused.raw());
        assert_eq!(state_besides_interruptions(&ctx, id), CreatureStateId::AtResearchRoom.raw());

        restore_saved_state(&mut ctx, id);
        let creature = ctx.creature(id).unwrap();
        assert!(creature.is_in_state(CreatureStateId::MoveToPosition));
        assert_eq!(creature.continue_state, CreatureStateId::AtResearchRoom.raw());
        assert!(creature.saved_state.is_none());
    }

    #[test]
    fn test_corrupted_state_number_degrades() {
        let mut ctx = context();
        let id = warlock(&mut ctx, PlayerId::new(0));
        ctx.creature_mut(id).unwrap().active_state = 999;
        assert_eq!(creature_state_category(&ctx, id), StateCategory::Idle);
        assert!(ctx.stats.get(crate::core::stats::ErrorStatKind::StateOutOfRange) > 0);
    }
}
