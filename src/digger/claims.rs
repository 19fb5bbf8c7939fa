//! Implicit claims between diggers of one keeper
//!
//! Nothing reserves a task. A digger backs off when a colleague is already
//! heading to the same subtile from about as close, or when another digger
//! is carrying the object it wanted.

use crate::core::types::{CreatureId, PlayerId, SubtileCoord, ThingId};
use crate::simulation::context::SimulationContext;
use crate::states::ids::CreatureStateId;
use crate::states::machine::state_besides_interruptions;

/// Whether another digger of the same owner will get to `stl` first.
///
/// A colleague moving to the same subtile wins when it is no farther away,
/// or farther by at most the configured margin.
pub fn will_soon_be_working_at(ctx: &SimulationContext, id: CreatureId, stl: SubtileCoord) -> bool {
    let Some(me) = ctx.creature(id) else {
        return false;
    };
    let my_distance = me.pos.distance(&stl);
    let margin = ctx.config.claim_margin_subtiles;
    for other_id in ctx.world.creatures.player_diggers(me.owner, &ctx.stats) {
        if other_id == id {
            continue;
        }
        let Some(other) = ctx.creature(other_id) else {
            continue;
        };
        if !other.is_active() || other.moveto_pos != Some(stl) {
            continue;
        }
        let other_distance = other.pos.distance(&stl);
        if other_distance <= my_distance || other_distance - my_distance <= margin {
            tracing::trace!("Digger {} leaves ({}, {}) to digger {}", id.0, stl.x, stl.y, other_id.0);
            return true;
        }
    }
    false
}

const FETCHING_STATES: [CreatureStateId; 4] = [
    CreatureStateId::CreaturePicksUpTrapObject,
    CreatureStateId::CreatureArmsTrap,
    CreatureStateId::CreaturePicksUpCrateForWorkshop,
    CreatureStateId::CreaturePicksUpSpellObject,
];

const ARMING_STATES: [CreatureStateId; 2] =
    [CreatureStateId::CreaturePicksUpTrapObject, CreatureStateId::CreatureArmsTrap];

fn in_any_state(ctx: &SimulationContext, id: CreatureId, states: &[CreatureStateId]) -> bool {
    let state = state_besides_interruptions(ctx, id);
    states.iter().any(|s| s.raw() == state)
}

/// Whether one of the player's diggers is already on its way for the thing
pub fn will_soon_be_getting_object(ctx: &SimulationContext, player: PlayerId, thing: ThingId) -> bool {
    ctx.world.creatures.player_diggers(player, &ctx.stats).into_iter().any(|digger| {
        ctx.creature(digger).map(|c| c.pickup_object == Some(thing)).unwrap_or(false)
            && in_any_state(ctx, digger, &FETCHING_STATES)
    })
}

/// Whether a digger of the trap's owner is bringing a crate to re-arm it
pub fn will_soon_be_arming_trap(ctx: &SimulationContext, trap: ThingId) -> bool {
    let Some(owner) = ctx.world.things.get(trap).map(|t| t.owner) else {
        return false;
    };
    ctx.world.creatures.player_diggers(owner, &ctx.stats).into_iter().any(|digger| {
        ctx.creature(digger).map(|c| c.arming_thing == Some(trap)).unwrap_or(false)
            && in_any_state(ctx, digger, &ARMING_STATES)
    })
}

/// Whether a creature other than `id` stands on the slab of `stl` doing `state`
pub fn someone_else_working_on_slab(
    ctx: &SimulationContext,
    id: CreatureId,
    stl: SubtileCoord,
    state: CreatureStateId,
) -> bool {
    let slab = stl.slab();
    ctx.world
        .creatures
        .iter()
        .any(|c| c.id != id && c.alive && c.pos.slab() == slab && c.is_in_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{ModelId, SlabCoord};
    use crate::world::map::SlabKind;
    use crate::world::things::ThingKind;
    use crate::world::World;

    fn context() -> SimulationContext {
        let mut world = World::new(20, 8).unwrap();
        for x in 1..19 {
            for y in 2..6 {
                world.map.set_slab(SlabCoord::new(x, y), SlabKind::Claimed, PlayerId::new(0)).unwrap();
            }
        }
        SimulationContext::new(world, SimulationConfig::default(), 3).unwrap()
    }

    fn imp_at(ctx: &mut SimulationContext, x: i32) -> CreatureId {
        ctx.spawn_creature(ModelId(0), PlayerId::new(0), SubtileCoord::new(x, 10)).unwrap()
    }

    #[test]
    fn test_closer_colleague_wins_beyond_margin() {
        let mut ctx = context();
        let target = SubtileCoord::new(4, 10);
        let near = imp_at(&mut ctx, 7);
        let far = imp_at(&mut ctx, 40);
        ctx.creature_mut(near).unwrap().moveto_pos = Some(target);

        assert!(will_soon_be_working_at(&ctx, far, target), "the far digger backs off");

        ctx.creature_mut(near).unwrap().moveto_pos = None;
        ctx.creature_mut(far).unwrap().moveto_pos = Some(target);
        assert!(!will_soon_be_working_at(&ctx, near, target), "the near digger takes over from a far one");
    }

    #[test]
    fn test_margin_lets_slightly_farther_colleague_keep_claim() {
        let mut ctx = context();
        let target = SubtileCoord::new(4, 10);
        let me = imp_at(&mut ctx, 10);
        let other = imp_at(&mut ctx, 14);
        ctx.creature_mut(other).unwrap().moveto_pos = Some(target);
        assert!(will_soon_be_working_at(&ctx, me, target), "a 4 subtile lead is inside the margin");
    }

    #[test]
    fn test_inactive_colleague_holds_no_claim() {
        let mut ctx = context();
        let target = SubtileCoord::new(4, 10);
        let me = imp_at(&mut ctx, 30);
        let other = imp_at(&mut ctx, 5);
        let creature = ctx.creature_mut(other).unwrap();
        creature.moveto_pos = Some(target);
        creature.flags.picked_up = true;
        assert!(!will_soon_be_working_at(&ctx, me, target));
    }

    #[test]
    fn test_object_claim_requires_fetching_state() {
        let mut ctx = context();
        let me = PlayerId::new(0);
        let book = ctx.world.things.spawn(ThingKind::Spellbook { power: 2 }, PlayerId::NEUTRAL, SubtileCoord::new(20, 10));
        let imp = imp_at(&mut ctx, 5);
        ctx.creature_mut(imp).unwrap().pickup_object = Some(book);
        assert!(!will_soon_be_getting_object(&ctx, me, book), "an idle digger does not hold the claim");

        assert!(crate::states::machine::move_to(
            &mut ctx,
            imp,
            SubtileCoord::new(20, 10),
            CreatureStateId::CreaturePicksUpSpellObject
        ));
        assert!(will_soon_be_getting_object(&ctx, me, book));
    }
}
