//! Cleanup run when a state is abandoned before it completes

use crate::core::types::CreatureId;
use crate::simulation::context::SimulationContext;
use crate::states::table::CleanupKind;

pub fn run_cleanup(ctx: &mut SimulationContext, id: CreatureId, kind: CleanupKind) {
    tracing::trace!("Creature {} cleanup {:?}", id.0, kind);
    match kind {
        CleanupKind::LeaveRoom => leave_work_room(ctx, id),
        CleanupKind::DropDragged => drop_dragged(ctx, id),
        CleanupKind::StopDiggerWork => {
            if let Some(creature) = ctx.creature_mut(id) {
                creature.digger.working_stl = None;
                creature.digger.task_stl = None;
            }
        }
        CleanupKind::StopCombat => {
            if let Some(creature) = ctx.creature_mut(id) {
                creature.combat_target = None;
            }
        }
        CleanupKind::StopPersuade => stop_persuading(ctx, id),
        CleanupKind::DiscardSaved => {
            if let Some(creature) = ctx.creature_mut(id) {
                creature.saved_state = None;
            }
        }
    }
}

/// Give up the place held in the work room
pub fn leave_work_room(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(room) = ctx.creature_mut(id).and_then(|c| c.work_room.take()) else {
        return;
    };
    ctx.world.rooms.remove_occupant(room, id);
}

/// Put down the carried thing or body where the creature stands
pub fn drop_dragged(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature_mut(id) else {
        return;
    };
    let pos = creature.pos;
    let object = creature.pickup_object.take();
    let body = creature.pickup_creature.take();
    creature.arming_thing = None;

    if let Some(thing) = object {
        if ctx.world.things.get(thing).map(|t| t.dragged_by == Some(id)).unwrap_or(false) {
            ctx.world.things.drop_at(thing, pos);
        }
    }
    if let Some(body) = body {
        if let Some(victim) = ctx.creature_mut(body) {
            if victim.dragged_by == Some(id) {
                victim.dragged_by = None;
                victim.pos = pos;
            }
        }
    }
}

fn stop_persuading(ctx: &mut SimulationContext, id: CreatureId) {
    let targets = ctx.creature_mut(id).map(|c| std::mem::take(&mut c.persuade_targets)).unwrap_or_default();
    for target in targets {
        if let Some(follower) = ctx.creature_mut(target) {
            if follower.group_leader == Some(id) {
                follower.group_leader = None;
            }
        }
    }
}

/// Leave the group the creature follows, and release its own followers
pub fn leave_group(ctx: &mut SimulationContext, id: CreatureId) {
    if let Some(creature) = ctx.creature_mut(id) {
        creature.group_leader = None;
    }
    let followers: Vec<CreatureId> =
        ctx.world.creatures.iter().filter(|c| c.group_leader == Some(id)).map(|c| c.id).collect();
    for follower in followers {
        if let Some(creature) = ctx.creature_mut(follower) {
            creature.group_leader = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{PlayerId, SlabCoord, SubtileCoord};
    use crate::world::map::SlabKind;
    use crate::world::things::ThingKind;
    use crate::world::World;

    fn context() -> SimulationContext {
        let mut world = World::new(8, 8).unwrap();
        for x in 2..6 {
            world.map.set_slab(SlabCoord::new(x, 3), SlabKind::Claimed, PlayerId::new(0)).unwrap();
        }
        SimulationContext::new(world, SimulationConfig::default(), 1).unwrap()
    }

    #[test]
    fn test_drop_dragged_puts_thing_down_here() {
        let mut ctx = context();
        let imp = ctx.spawn_creature(crate::core::types::ModelId(0), PlayerId::new(0), SubtileCoord::new(10, 10)).unwrap();
        let book = ctx.world.things.spawn(ThingKind::Spellbook { power: 1 }, PlayerId::NEUTRAL, SubtileCoord::new(7, 10));
        ctx.world.things.get_mut(book).unwrap().dragged_by = Some(imp);
        ctx.creature_mut(imp).unwrap().pickup_object = Some(book);

        run_cleanup(&mut ctx, imp, CleanupKind::DropDragged);
        let thing = ctx.world.things.get(book).unwrap();
        assert!(thing.dragged_by.is_none());
        assert_eq!(thing.pos, SubtileCoord::new(10, 10));
        assert!(ctx.creature(imp).unwrap().pickup_object.is_none());
    }
}
