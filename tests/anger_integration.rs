//! Integration tests for angry creatures
//!
//! A creature whose grudge passes twice its model's annoy level acts on it
//! at its next anger check, and the tick reports what it did.

use dungeon_creatures::core::config::SimulationConfig;
use dungeon_creatures::core::types::{CreatureId, ModelId, PlayerId, SlabCoord};
use dungeon_creatures::entity::AngerReason;
use dungeon_creatures::jobs::{find_and_perform_anger_job, AngerJobs};
use dungeon_creatures::simulation::context::SimulationContext;
use dungeon_creatures::simulation::tick::{run_simulation_tick, SimulationEvent};
use dungeon_creatures::states::{creature_state_category, StateCategory};
use dungeon_creatures::world::{RoomKind, SlabKind, World};
use proptest::prelude::*;

const KEEPER: PlayerId = PlayerId(0);

fn dungeon() -> SimulationContext {
    seeded_dungeon(23)
}

fn seeded_dungeon(seed: u64) -> SimulationContext {
    let mut world = World::new(24, 12).unwrap();
    for y in 2..10 {
        for x in 2..22 {
            world.map.set_slab(SlabCoord::new(x, y), SlabKind::Claimed, KEEPER).unwrap();
        }
    }
    let config = SimulationConfig::default();
    world.rooms.create_room(&mut world.map, RoomKind::Entrance, KEEPER, &[SlabCoord::new(20, 8)], &config).unwrap();
    SimulationContext::new(world, config, seed).unwrap()
}

/// A warlock who only ever walks out when angry
fn quitter(ctx: &mut SimulationContext) -> CreatureId {
    warlock_with(ctx, AngerJobs::LEAVE_DUNGEON)
}

fn warlock_with(ctx: &mut SimulationContext, jobs: AngerJobs) -> CreatureId {
    let model = ctx.world.models.by_name("WARLOCK").unwrap();
    let mut warlock = ctx.world.models.get(model).clone();
    warlock.jobs_anger = jobs;
    let model: ModelId = ctx.world.models.insert(warlock);
    ctx.spawn_creature(model, KEEPER, SlabCoord::new(3, 3).center()).unwrap()
}

/// Put the clock one turn before the creature's next anger check
fn before_anger_check(ctx: &mut SimulationContext, id: CreatureId) {
    let mask = ctx.config.anger_check_mask;
    let mut turn = 1;
    while (turn + id.0 as u64) & mask != 0 {
        turn += 1;
    }
    ctx.turn = turn - 1;
}

fn make_livid(ctx: &mut SimulationContext, id: CreatureId) {
    let level = ctx.world.models.get(ctx.creature(id).unwrap().model).annoy_level;
    ctx.creature_mut(id).unwrap().mood.annoy(AngerReason::NotPaid, level * 2);
}

#[test]
fn test_livid_creature_heads_for_the_exit() {
    let mut ctx = dungeon();
    let id = quitter(&mut ctx);
    make_livid(&mut ctx, id);
    before_anger_check(&mut ctx, id);

    let events = run_simulation_tick(&mut ctx);
    assert!(
        events.iter().any(|e| matches!(e, SimulationEvent::AngerJobStarted { creature, .. } if *creature == id)),
        "expected an anger job, got {:?}",
        events
    );
    assert_eq!(creature_state_category(&ctx, id), StateCategory::AngerJob);
}

#[test]
fn test_angry_but_not_livid_creature_stays() {
    let mut ctx = dungeon();
    let id = quitter(&mut ctx);
    let level = ctx.world.models.get(ctx.creature(id).unwrap().model).annoy_level;
    ctx.creature_mut(id).unwrap().mood.annoy(AngerReason::NotPaid, level * 2 - 1);
    before_anger_check(&mut ctx, id);

    let events = run_simulation_tick(&mut ctx);
    assert!(!events.iter().any(|e| matches!(e, SimulationEvent::AngerJobStarted { .. })));
    assert_ne!(creature_state_category(&ctx, id), StateCategory::AngerJob);
}

#[test]
fn test_livid_creature_waits_for_its_check_turn() {
    let mut ctx = dungeon();
    let id = quitter(&mut ctx);
    make_livid(&mut ctx, id);
    before_anger_check(&mut ctx, id);
    ctx.turn += 1;

    let events = run_simulation_tick(&mut ctx);
    assert!(!events.iter().any(|e| matches!(e, SimulationEvent::AngerJobStarted { .. })));
}

#[test]
fn test_leaving_creature_is_gone_and_counted() {
    let mut ctx = dungeon();
    let id = quitter(&mut ctx);
    make_livid(&mut ctx, id);
    before_anger_check(&mut ctx, id);

    let mut left = false;
    for _ in 0..2000 {
        let events = run_simulation_tick(&mut ctx);
        if events.contains(&SimulationEvent::CreatureLeft { creature: id, owner: KEEPER, tick: ctx.turn }) {
            left = true;
            break;
        }
    }
    assert!(left, "the warlock should reach the entrance and leave");
    assert!(ctx.creature(id).is_none());
    assert_eq!(ctx.world.dungeons[0].stats.creatures_left, 1);
}

proptest! {
    #[test]
    fn test_anger_scan_settles_on_a_job_that_can_start(seed in any::<u64>(), others in 0u32..512) {
        // Leaving is always possible here, so some anger job must start
        // whichever bit the scan begins at
        let mut ctx = seeded_dungeon(seed);
        let jobs = AngerJobs(others) | AngerJobs::LEAVE_DUNGEON;
        let id = warlock_with(&mut ctx, jobs);

        prop_assert!(find_and_perform_anger_job(&mut ctx, id), "jobs {:?}", jobs);
        prop_assert_eq!(creature_state_category(&ctx, id), StateCategory::AngerJob);
    }
}
