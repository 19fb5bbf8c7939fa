//! Integration tests for digger labor
//!
//! These tests drive diggers through whole ticks:
//! - A loose gold pile ends up in the treasury, at once when it fills the
//!   digger's purse and at the next periodic check otherwise
//! - A farther digger leaves a task to a closer colleague
//! - The task stack never grows past its capacity

use dungeon_creatures::core::config::SimulationConfig;
use dungeon_creatures::core::types::{CreatureId, ModelId, PlayerId, SlabCoord};
use dungeon_creatures::digger::{check_out_imp_stack, imp_stack_update, DiggerStack, DiggerTaskKind};
use dungeon_creatures::simulation::context::SimulationContext;
use dungeon_creatures::simulation::tick::run_simulation_tick;
use dungeon_creatures::world::{RoomKind, SlabKind, ThingKind, World};
use proptest::prelude::*;

const KEEPER: PlayerId = PlayerId(0);
const IMP: ModelId = ModelId(0);

fn dungeon() -> SimulationContext {
    let mut world = World::new(24, 12).unwrap();
    for y in 2..10 {
        for x in 2..22 {
            world.map.set_slab(SlabCoord::new(x, y), SlabKind::Claimed, KEEPER).unwrap();
        }
    }
    world.map.reveal_all(KEEPER);
    world.dungeons[0].heart = Some(SlabCoord::new(3, 3).center());
    let config = SimulationConfig::default();
    world
        .rooms
        .create_room(&mut world.map, RoomKind::Treasury, KEEPER, &[SlabCoord::new(4, 7), SlabCoord::new(5, 7)], &config)
        .unwrap();
    SimulationContext::new(world, config, 17).unwrap()
}

fn imp_at(ctx: &mut SimulationContext, slab: SlabCoord) -> CreatureId {
    ctx.spawn_creature(IMP, KEEPER, slab.center()).unwrap()
}

#[test]
fn test_gold_pile_reaches_the_treasury() {
    let mut ctx = dungeon();
    let hold = ctx.world.models.get(IMP).gold_hold;
    ctx.world.things.spawn(ThingKind::GoldPile { gold: hold }, PlayerId::NEUTRAL, SlabCoord::new(16, 5).center());
    let imp = imp_at(&mut ctx, SlabCoord::new(10, 5));

    let mut turns = 0;
    while ctx.world.rooms.stored_gold(KEEPER) == 0 && turns < 3000 {
        run_simulation_tick(&mut ctx);
        turns += 1;
    }

    assert_eq!(ctx.world.rooms.stored_gold(KEEPER), hold, "the whole pile should be stored, waited {} turns", turns);
    assert_eq!(ctx.creature(imp).unwrap().gold_carried, 0);
    assert!(ctx.world.things.iter().all(|t| !t.kind.is_gold_pile()), "the pile is used up");
}

#[test]
fn test_small_pile_waits_for_the_treasury_check() {
    let mut ctx = dungeon();
    let hold = ctx.world.models.get(IMP).gold_hold;
    let gold = hold / 5;
    ctx.world.things.spawn(ThingKind::GoldPile { gold }, PlayerId::NEUTRAL, SlabCoord::new(16, 5).center());
    let imp = imp_at(&mut ctx, SlabCoord::new(10, 5));
    let interval = ctx.config.tasks_check_interval;

    let mut turns = 0;
    while ctx.world.rooms.stored_gold(KEEPER) == 0 && turns < 3000 {
        run_simulation_tick(&mut ctx);
        turns += 1;
        if turns == interval {
            assert_eq!(
                ctx.creature(imp).unwrap().gold_carried,
                gold,
                "a digger with room in its purse keeps the gold until the periodic check"
            );
        }
    }

    assert!(turns > interval, "stored after {} turns, before the first check", turns);
    assert_eq!(ctx.world.rooms.stored_gold(KEEPER), gold);
    assert_eq!(ctx.creature(imp).unwrap().gold_carried, 0);
}

#[test]
fn test_farther_digger_backs_off() {
    let mut ctx = dungeon();
    let pile = SlabCoord::new(16, 5).center();
    ctx.world.things.spawn(ThingKind::GoldPile { gold: 50 }, PlayerId::NEUTRAL, pile);
    assert!(imp_stack_update(&mut ctx, KEEPER));
    let stack = &ctx.world.dungeons[0].digger_stack;
    assert!(stack.find_using_pos(pile, DiggerTaskKind::PickUpGoldPile).is_some());

    let near = imp_at(&mut ctx, SlabCoord::new(14, 5));
    let far = imp_at(&mut ctx, SlabCoord::new(3, 8));
    assert!(check_out_imp_stack(&mut ctx, near), "the near digger takes the pile");
    assert_eq!(ctx.creature(near).unwrap().moveto_pos, Some(pile));

    check_out_imp_stack(&mut ctx, far);
    assert_ne!(ctx.creature(far).unwrap().moveto_pos, Some(pile), "the far digger leaves the pile alone");
    assert!(
        ctx.world.dungeons[0].digger_stack.find_using_pos(pile, DiggerTaskKind::PickUpGoldPile).is_some(),
        "a skipped entry stays on the stack"
    );
}

#[test]
fn test_stack_rebuild_waits_for_its_interval() {
    let mut ctx = dungeon();
    ctx.turn = 10;
    assert!(imp_stack_update(&mut ctx, KEEPER));
    let interval = ctx.config.digger_stack_rebuild_interval;
    ctx.turn = 10 + interval - 1;
    assert!(!imp_stack_update(&mut ctx, KEEPER));
    ctx.turn = 10 + interval;
    assert!(imp_stack_update(&mut ctx, KEEPER));
}

#[test]
fn test_rebuild_restarts_digger_cursor() {
    let mut ctx = dungeon();
    ctx.world.things.spawn(ThingKind::GoldPile { gold: 50 }, PlayerId::NEUTRAL, SlabCoord::new(16, 5).center());
    imp_stack_update(&mut ctx, KEEPER);
    let imp = imp_at(&mut ctx, SlabCoord::new(14, 5));
    check_out_imp_stack(&mut ctx, imp);
    assert!(ctx.creature(imp).unwrap().digger.stack_pos > 0);

    ctx.turn += ctx.config.digger_stack_rebuild_interval;
    imp_stack_update(&mut ctx, KEEPER);
    let creature = ctx.creature(imp).unwrap();
    assert_ne!(
        creature.digger.stack_update_turn, ctx.world.dungeons[0].digger_stack_update_turn,
        "the cursor belongs to the old stack until the next checkout"
    );

    check_out_imp_stack(&mut ctx, imp);
    let creature = ctx.creature(imp).unwrap();
    assert_eq!(creature.digger.stack_update_turn, ctx.world.dungeons[0].digger_stack_update_turn);
}

proptest! {
    #[test]
    fn test_stack_never_exceeds_capacity(capacity in 1usize..80, adds in 0usize..200) {
        let mut stack = DiggerStack::new();
        for n in 0..adds {
            let stl = SlabCoord::new(n as i32 % 50, n as i32 / 50).center();
            let room_left = stack.add(stl, DiggerTaskKind::DigOrMine, capacity);
            prop_assert_eq!(room_left, stack.len() < capacity);
        }
        prop_assert_eq!(stack.len(), adds.min(capacity));
        prop_assert_eq!(stack.overflowed(), adds > capacity);
    }

    #[test]
    fn test_cancelled_entries_are_skipped(len in 1usize..40, cancel in 0usize..40) {
        let mut stack = DiggerStack::new();
        for n in 0..len {
            stack.add(SlabCoord::new(n as i32, 0).center(), DiggerTaskKind::ReinforceWall, 64);
        }
        stack.cancel(cancel);
        let found = stack.find_task_other_than_starting_at(DiggerTaskKind::DigOrMine, 0);
        let expected = if cancel == 0 && len > 1 { Some(1) } else if cancel == 0 { None } else { Some(0) };
        prop_assert_eq!(found, expected);
        prop_assert_eq!(stack.len(), len, "cancelling never shrinks the stack");
    }
}
