//! Continuing with more of the same
//!
//! A digger which just finished a piece of labor first looks for the same
//! kind of work right next to it, then for the nearest such stack entry.
//! Only when nothing similar is left does it go back to the stack scan.

use crate::core::types::{CreatureId, SlabCoord, SubtileCoord, SMALL_AROUND};
use crate::digger::claims::will_soon_be_working_at;
use crate::digger::discovery::imp_stack_update;
use crate::digger::places::{
    check_place_to_convert, check_place_to_pretty, check_place_to_reinforce, dig_position,
    uncrowded_reinforce_position,
};
use crate::digger::stack::DiggerTaskKind;
use crate::entity::creature::LastDidJob;
use crate::jobs::assign::{creature_can_do_job_for_player, send_creature_to_job_for_player, JobCheckFlags};
use crate::simulation::context::SimulationContext;
use crate::states::ids::CreatureStateId;
use crate::states::machine;
use crate::world::dungeon::DigTaskKind;

/// Undug slabs farther than this from the last dig are left to the stack scan
const UNDUG_AREA_DISTANCE: i32 = 24;

/// The eight slabs around a slab, clockwise from north
const RING: [(i32, i32); 8] = [(0, -1), (1, -1), (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1)];

fn ring(slab: SlabCoord) -> impl Iterator<Item = SlabCoord> {
    RING.into_iter().map(move |(dx, dy)| slab.offset(dx, dy))
}

/// Whether the digger is working a gem seam
pub fn is_digging_indestructible_place(ctx: &SimulationContext, id: CreatureId) -> bool {
    ctx.creature(id)
        .and_then(|c| c.digger.task_stl)
        .map(|stl| ctx.world.map.kind(stl.slab()).is_indestructible())
        .unwrap_or(false)
}

/// Head for the tagged slab, standing at a free dig position
fn go_dig(ctx: &mut SimulationContext, id: CreatureId, task_stl: SubtileCoord) -> bool {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    let Some((idx, task)) = ctx
        .world
        .dungeon(owner)
        .and_then(|d| d.find_dig_task(task_stl).and_then(|idx| d.dig_task(idx).map(|t| (idx, *t))))
    else {
        return false;
    };
    let Some(pos) = dig_position(ctx, id, task.stl) else {
        return false;
    };
    let arrive = match task.kind {
        DigTaskKind::MineGold => CreatureStateId::ImpArrivesAtMineGold,
        _ => CreatureStateId::ImpArrivesAtDigDirt,
    };
    if !machine::move_to(ctx, id, pos, arrive) {
        return false;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.digger.task_idx = Some(idx);
        creature.digger.task_stl = Some(task.stl);
    }
    true
}

/// A tagged slab right next to the one just dug
pub fn check_out_undug_place(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(task_stl) = ctx.creature(id).and_then(|c| c.digger.task_stl) else {
        return false;
    };
    let slab = task_stl.slab();
    let start = ctx.random(SMALL_AROUND.len() as u32) as usize;
    for i in 0..SMALL_AROUND.len() {
        let (dx, dy) = SMALL_AROUND[(start + i) % SMALL_AROUND.len()];
        let next = slab.offset(dx, dy).center();
        if will_soon_be_working_at(ctx, id, next) {
            continue;
        }
        if go_dig(ctx, id, next) {
            return true;
        }
    }
    false
}

/// Nearest dig entry on the stack close to the last dig, gem seams excluded
pub fn check_out_undug_area(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let owner = creature.owner;
    let from = creature.digger.task_stl.unwrap_or(creature.pos);
    let Some(dungeon) = ctx.world.dungeon(owner) else {
        return false;
    };
    let best = dungeon
        .digger_stack
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind == DiggerTaskKind::DigOrMine)
        .filter(|(_, e)| !ctx.world.map.kind(e.stl.slab()).is_indestructible())
        .map(|(i, e)| (i, e.stl, e.stl.distance(&from)))
        .filter(|(_, _, d)| *d < UNDUG_AREA_DISTANCE)
        .min_by_key(|(_, _, d)| *d);
    let Some((pos, stl, _)) = best else {
        return false;
    };
    if dungeon.find_dig_task(stl).is_none() {
        if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
            dungeon.digger_stack.cancel(pos);
        }
        return false;
    }
    if will_soon_be_working_at(ctx, id, stl) {
        return false;
    }
    go_dig(ctx, id, stl)
}

fn check_out_ring_place(
    ctx: &mut SimulationContext,
    id: CreatureId,
    check: fn(&SimulationContext, CreatureId, SlabCoord) -> bool,
    arrive: CreatureStateId,
) -> bool {
    let Some(slab) = ctx.creature(id).map(|c| c.pos.slab()) else {
        return false;
    };
    for next in ring(slab) {
        let stl = next.center();
        if !check(ctx, id, next) || will_soon_be_working_at(ctx, id, stl) {
            continue;
        }
        if machine::move_to(ctx, id, stl, arrive) {
            return true;
        }
    }
    false
}

/// Enemy floor right next to the digger
pub fn check_out_unconverted_place(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    check_out_ring_place(ctx, id, check_place_to_convert, CreatureStateId::ImpArrivesAtConvertDungeon)
}

/// Unclaimed path right next to the digger
pub fn check_out_unprettied_place(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    check_out_ring_place(ctx, id, check_place_to_pretty, CreatureStateId::ImpArrivesAtImproveDungeon)
}

/// Nearest stack entry of the given kinds within the search distance
fn nearest_entry(ctx: &SimulationContext, id: CreatureId, kinds: &[DiggerTaskKind]) -> Option<(usize, DiggerTaskKind, SubtileCoord)> {
    let creature = ctx.creature(id)?;
    let range = ctx.config.last_did_search_distance;
    let dungeon = ctx.world.dungeon(creature.owner)?;
    dungeon
        .digger_stack
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, e)| kinds.contains(&e.kind))
        .map(|(i, e)| (i, e.kind, e.stl, e.stl.distance(&creature.pos)))
        .filter(|(_, _, _, d)| *d < range)
        .min_by_key(|(_, _, _, d)| *d)
        .map(|(i, kind, stl, _)| (i, kind, stl))
}

fn cancel_entry(ctx: &mut SimulationContext, id: CreatureId, pos: usize) {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return;
    };
    if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
        dungeon.digger_stack.cancel(pos);
    }
}

/// Nearest improve or convert entry on the stack
pub fn check_out_unprettied_or_unconverted_area(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let kinds = [DiggerTaskKind::ImproveDungeon, DiggerTaskKind::ConvertDungeon];
    let Some((pos, kind, stl)) = nearest_entry(ctx, id, &kinds) else {
        return false;
    };
    let (valid, arrive) = match kind {
        DiggerTaskKind::ImproveDungeon => {
            (check_place_to_pretty(ctx, id, stl.slab()), CreatureStateId::ImpArrivesAtImproveDungeon)
        }
        _ => (check_place_to_convert(ctx, id, stl.slab()), CreatureStateId::ImpArrivesAtConvertDungeon),
    };
    if !valid {
        cancel_entry(ctx, id, pos);
        return false;
    }
    if will_soon_be_working_at(ctx, id, stl) {
        return false;
    }
    machine::move_to(ctx, id, stl, arrive)
}

fn go_reinforce(ctx: &mut SimulationContext, id: CreatureId, wall: SubtileCoord) -> bool {
    let Some(pos) = uncrowded_reinforce_position(ctx, id, wall) else {
        return false;
    };
    if !machine::move_to(ctx, id, pos, CreatureStateId::ImpArrivesAtReinforce) {
        return false;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.digger.working_stl = Some(wall);
    }
    true
}

/// Earth next to the wall just reinforced
pub fn check_out_unreinforced_place(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let owner = creature.owner;
    let slab = creature.digger.working_stl.unwrap_or(creature.pos).slab();
    for next in ring(slab) {
        if check_place_to_reinforce(ctx, owner, next) && go_reinforce(ctx, id, next.center()) {
            return true;
        }
    }
    false
}

/// Nearest reinforce entry on the stack
pub fn check_out_unreinforced_area(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    let Some((pos, _, stl)) = nearest_entry(ctx, id, &[DiggerTaskKind::ReinforceWall]) else {
        return false;
    };
    if !check_place_to_reinforce(ctx, owner, stl.slab()) {
        cancel_entry(ctx, id, pos);
        return false;
    }
    go_reinforce(ctx, id, stl)
}

fn bump_repeats(ctx: &mut SimulationContext, id: CreatureId) {
    if let Some(creature) = ctx.creature_mut(id) {
        creature.digger.task_repeats += 1;
    }
}

fn last_did_dig_or_mine(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    let repeats = ctx.creature(id).map(|c| c.digger.task_repeats).unwrap_or(0);
    if is_digging_indestructible_place(ctx, id) && repeats != 0 {
        // Gem seams never run out; every so often look at the rest of the stack
        let one_in = ctx.config.gem_dig_reset_chance;
        let (len, version) = ctx
            .world
            .dungeon(owner)
            .map(|d| (d.digger_stack.len(), d.digger_stack_update_turn))
            .unwrap_or((0, None));
        if ctx.chance(one_in) && repeats % 5 == 0 && len > 1 {
            let cursor = ctx.random(len as u32) as usize;
            if let Some(creature) = ctx.creature_mut(id) {
                creature.digger.stack_pos = cursor;
                creature.digger.stack_update_turn = version;
            }
            tracing::trace!("Digger {} leaves the gem seam for stack entry {}", id.0, cursor);
            return false;
        }
    }
    if check_out_undug_place(ctx, id) || check_out_undug_area(ctx, id) {
        bump_repeats(ctx, id);
        return true;
    }
    if check_out_unconverted_place(ctx, id) || check_out_unprettied_place(ctx, id) {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.digger.task_repeats = 0;
            creature.digger.last_did_job = LastDidJob::ConvImprDungeon;
        }
        return true;
    }
    imp_stack_update(ctx, owner);
    if check_out_unprettied_or_unconverted_area(ctx, id) {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.digger.task_repeats = 0;
            creature.digger.last_did_job = LastDidJob::ConvImprDungeon;
        }
        return true;
    }
    false
}

fn last_did_conv_impr(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    if check_out_unconverted_place(ctx, id) || check_out_unprettied_place(ctx, id) {
        bump_repeats(ctx, id);
        return true;
    }
    imp_stack_update(ctx, owner);
    if check_out_unprettied_or_unconverted_area(ctx, id) {
        bump_repeats(ctx, id);
        return true;
    }
    if check_out_undug_area(ctx, id) {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.digger.task_repeats = 0;
            creature.digger.last_did_job = LastDidJob::DigOrMine;
        }
        return true;
    }
    false
}

fn last_did_reinforce_unprompted(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    imp_stack_update(ctx, owner);
    let version = ctx.creature(id).and_then(|c| c.digger.stack_update_turn);
    let other_work = ctx
        .world
        .dungeon(owner)
        .map(|d| {
            d.digger_stack_update_turn != version
                && d.digger_stack.find_task_other_than_starting_at(DiggerTaskKind::ReinforceWall, 0).is_some()
        })
        .unwrap_or(false);
    if other_work {
        // A fresh stack has something better than walls
        return false;
    }
    continue_reinforcing(ctx, id, LastDidJob::ReinforceWallUnprompted)
}

fn continue_reinforcing(ctx: &mut SimulationContext, id: CreatureId, last: LastDidJob) -> bool {
    if !(check_out_unreinforced_place(ctx, id) || check_out_unreinforced_area(ctx, id)) {
        return false;
    }
    bump_repeats(ctx, id);
    if let Some(creature) = ctx.creature_mut(id) {
        creature.digger.last_did_job = last;
    }
    true
}

fn last_did_non_digger_task(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some((owner, job)) = ctx.creature(id).map(|c| (c.owner, c.job_assigned)) else {
        return false;
    };
    if job.is_null() {
        return false;
    }
    if creature_can_do_job_for_player(ctx, id, owner, job, JobCheckFlags::NONE)
        && send_creature_to_job_for_player(ctx, id, owner, job)
    {
        let turn = ctx.turn;
        if let Some(creature) = ctx.creature_mut(id) {
            creature.timers.job_assigned_check_turn = turn;
        }
        return true;
    }
    false
}

/// Pick up more of the labor the digger did last. When there is none the
/// record is cleared and false returned.
pub fn check_out_imp_last_did(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(last) = ctx.creature(id).map(|c| c.digger.last_did_job) else {
        return false;
    };
    let found = match last {
        LastDidJob::None => return false,
        LastDidJob::DigOrMine => last_did_dig_or_mine(ctx, id),
        LastDidJob::ConvImprDungeon => last_did_conv_impr(ctx, id),
        LastDidJob::ReinforceWallUnprompted => last_did_reinforce_unprompted(ctx, id),
        LastDidJob::ReinforceWallAssigned => continue_reinforcing(ctx, id, LastDidJob::ReinforceWallAssigned),
        LastDidJob::NonDiggerTask => last_did_non_digger_task(ctx, id),
    };
    if !found {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.digger.task_repeats = 0;
            creature.digger.last_did_job = LastDidJob::None;
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{ModelId, PlayerId};
    use crate::world::map::SlabKind;
    use crate::world::World;

    fn context() -> SimulationContext {
        let mut world = World::new(16, 10).unwrap();
        for y in 2..8 {
            for x in 2..14 {
                world.map.set_slab(SlabCoord::new(x, y), SlabKind::Claimed, PlayerId::new(0)).unwrap();
            }
        }
        world.map.reveal_all(PlayerId::new(0));
        world.dungeons[0].heart = Some(SlabCoord::new(4, 4).center());
        SimulationContext::new(world, SimulationConfig::default(), 11).unwrap()
    }

    fn imp_at(ctx: &mut SimulationContext, slab: SlabCoord) -> CreatureId {
        ctx.spawn_creature(ModelId(0), PlayerId::new(0), slab.center()).unwrap()
    }

    #[test]
    fn test_nothing_done_nothing_continued() {
        let mut ctx = context();
        let id = imp_at(&mut ctx, SlabCoord::new(5, 5));
        assert!(!check_out_imp_last_did(&mut ctx, id));
    }

    #[test]
    fn test_digging_continues_next_door() {
        let mut ctx = context();
        let id = imp_at(&mut ctx, SlabCoord::new(6, 2));
        // The slab north of (6, 2) was just dug; its neighbour is tagged
        ctx.world.map.set_slab(SlabCoord::new(6, 1), SlabKind::Path, PlayerId::NEUTRAL).unwrap();
        ctx.world.dungeons[0].add_dig_task(SlabCoord::new(7, 1), DigTaskKind::Dig);
        let creature = ctx.creature_mut(id).unwrap();
        creature.digger.last_did_job = LastDidJob::DigOrMine;
        creature.digger.task_stl = Some(SlabCoord::new(6, 1).center());

        assert!(check_out_imp_last_did(&mut ctx, id));
        let creature = ctx.creature(id).unwrap();
        assert_eq!(creature.digger.task_stl, Some(SlabCoord::new(7, 1).center()));
        assert_eq!(creature.digger.task_repeats, 1);
        assert_eq!(creature.continue_state, CreatureStateId::ImpArrivesAtDigDirt.raw());
    }

    #[test]
    fn test_claiming_switches_to_nearby_enemy_floor() {
        let mut ctx = context();
        let id = imp_at(&mut ctx, SlabCoord::new(6, 5));
        ctx.world.map.set_slab(SlabCoord::new(7, 5), SlabKind::Claimed, PlayerId::new(1)).unwrap();
        ctx.creature_mut(id).unwrap().digger.last_did_job = LastDidJob::ConvImprDungeon;

        assert!(check_out_imp_last_did(&mut ctx, id));
        let creature = ctx.creature(id).unwrap();
        assert_eq!(creature.moveto_pos, Some(SlabCoord::new(7, 5).center()));
        assert_eq!(creature.continue_state, CreatureStateId::ImpArrivesAtConvertDungeon.raw());
        assert_eq!(creature.digger.last_did_job, LastDidJob::ConvImprDungeon);
    }

    #[test]
    fn test_failure_clears_the_record() {
        let mut ctx = context();
        let id = imp_at(&mut ctx, SlabCoord::new(6, 5));
        let creature = ctx.creature_mut(id).unwrap();
        creature.digger.last_did_job = LastDidJob::ConvImprDungeon;
        creature.digger.task_repeats = 3;

        assert!(!check_out_imp_last_did(&mut ctx, id));
        let creature = ctx.creature(id).unwrap();
        assert_eq!(creature.digger.last_did_job, LastDidJob::None);
        assert_eq!(creature.digger.task_repeats, 0);
    }

    #[test]
    fn test_reinforcing_moves_along_the_wall() {
        let mut ctx = context();
        let id = imp_at(&mut ctx, SlabCoord::new(6, 2));
        let creature = ctx.creature_mut(id).unwrap();
        creature.digger.last_did_job = LastDidJob::ReinforceWallAssigned;
        creature.digger.working_stl = Some(SlabCoord::new(6, 1).center());

        assert!(check_out_imp_last_did(&mut ctx, id));
        let creature = ctx.creature(id).unwrap();
        assert_eq!(creature.continue_state, CreatureStateId::ImpArrivesAtReinforce.raw());
        let wall = creature.digger.working_stl.unwrap().slab();
        assert_eq!(wall.y, 1, "the next wall is on the same edge");
        assert_ne!(wall, SlabCoord::new(6, 1));
    }

    #[test]
    fn test_reinforcing_counts_repeats_and_keeps_its_record() {
        let mut ctx = context();
        let id = imp_at(&mut ctx, SlabCoord::new(6, 2));
        let creature = ctx.creature_mut(id).unwrap();
        creature.digger.last_did_job = LastDidJob::ReinforceWallAssigned;
        creature.digger.working_stl = Some(SlabCoord::new(6, 1).center());
        creature.digger.task_repeats = 2;

        assert!(check_out_imp_last_did(&mut ctx, id));
        let creature = ctx.creature(id).unwrap();
        assert_eq!(creature.digger.task_repeats, 3, "each wall in a row counts as a repeat");
        assert_eq!(creature.digger.last_did_job, LastDidJob::ReinforceWallAssigned);
    }
}
