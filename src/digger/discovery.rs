//! Rebuilding a keeper's digger task stack
//!
//! The stack is thrown away and rebuilt from the world at most once every
//! `digger_stack_rebuild_interval` turns. Passes run in a fixed order, each
//! limited to a share of the stack capacity, so that early passes get
//! priority but cannot starve the later ones. Reinforcement candidates
//! found by the territory flood fill are appended last.

use std::collections::VecDeque;

use ahash::AHashSet;

use crate::core::stats::ErrorStatKind;
use crate::core::types::{PlayerId, SlabCoord, SubtileCoord, SMALL_AROUND};
use crate::digger::places::{check_place_to_reinforce, thing_can_be_picked_to_place_in_player_room_of_role};
use crate::digger::stack::{DiggerStack, DiggerTaskKind};
use crate::simulation::context::SimulationContext;
use crate::world::map::SlabKind;
use crate::world::rooms::RoomRole;
use crate::world::things::ThingKind;

/// Rebuild the player's stack unless it was rebuilt recently. Returns
/// whether a rebuild happened.
pub fn imp_stack_update(ctx: &mut SimulationContext, player: PlayerId) -> bool {
    let turn = ctx.turn;
    let interval = ctx.config.digger_stack_rebuild_interval;
    let Some(dungeon) = ctx.world.dungeon_mut(player) else {
        return false;
    };
    if let Some(last) = dungeon.digger_stack_update_turn {
        if turn.saturating_sub(last) < interval {
            return false;
        }
    }
    let mut stack = std::mem::take(&mut dungeon.digger_stack);
    stack.clear();
    dungeon.digger_stack_update_turn = Some(turn);

    build_stack(ctx, player, &mut stack);

    if stack.overflowed() {
        ctx.stats.inc(ErrorStatKind::DiggerStackOverflow);
    }
    tracing::debug!(
        "Digger stack of player {} rebuilt with {} tasks at turn {}",
        player.0,
        stack.len(),
        turn
    );
    if let Some(dungeon) = ctx.world.dungeon_mut(player) {
        dungeon.digger_stack = stack;
    }
    true
}

fn build_stack(ctx: &mut SimulationContext, player: PlayerId, stack: &mut DiggerStack) {
    let share = |ctx: &SimulationContext, n, d| Quota(ctx.config.stack_quota(n, d));

    if ctx.config.drag_unconscious_to_lair {
        add_unsaved_unconscious_creatures(ctx, player, stack, share(ctx, 5, 8));
    }
    let fourth = ctx.config.stack_quota(1, 4).saturating_sub(1);
    add_unclaimed_unconscious_bodies(ctx, player, stack, Quota(fourth));
    add_unclaimed_dead_bodies(ctx, player, stack, Quota(fourth));
    add_unclaimed_spells(ctx, player, stack, Quota(fourth));
    add_empty_traps(ctx, player, stack, share(ctx, 1, 6));
    add_pretty_and_convert(ctx, player, stack, share(ctx, 1, 64));
    let sixteenth = ctx.config.stack_quota(1, 16).saturating_sub(1);
    add_undug(ctx, player, stack, Quota(sixteenth));
    add_gold_to_pickup(ctx, player, stack, share(ctx, 1, 64));
    add_gems_to_mine(ctx, player, stack, share(ctx, 5, 8));
    add_unclaimed_crates(ctx, player, stack, share(ctx, 1, 4));
    add_undug(ctx, player, stack, share(ctx, 5, 8));
    add_pretty_and_convert(ctx, player, stack, share(ctx, 5, 8));
    add_gold_to_pickup(ctx, player, stack, share(ctx, 1, 3));
    add_reinforce(ctx, stack);
}

/// Entries one pass may still add
struct Quota(usize);

impl Quota {
    fn exhausted(&self) -> bool {
        self.0 == 0
    }

    /// Add an entry on the pass's account. False when the stack is full.
    fn add(&mut self, stack: &mut DiggerStack, stl: SubtileCoord, kind: DiggerTaskKind, capacity: usize) -> bool {
        self.0 = self.0.saturating_sub(1);
        stack.add(stl, kind, capacity)
    }
}

fn add_unsaved_unconscious_creatures(ctx: &SimulationContext, player: PlayerId, stack: &mut DiggerStack, mut quota: Quota) {
    let capacity = ctx.config.digger_task_max_count;
    for id in ctx.world.creatures.player_creatures(player, &ctx.stats) {
        if quota.exhausted() {
            return;
        }
        let Some(creature) = ctx.creature(id) else {
            continue;
        };
        if !creature.is_unconscious() || creature.is_being_dragged() || creature.lair_room.is_none() {
            continue;
        }
        if !ctx.world.map.is_revealed(player, creature.pos.slab()) {
            continue;
        }
        if !quota.add(stack, creature.pos, DiggerTaskKind::SaveUnconscious, capacity) {
            return;
        }
    }
}

fn add_unclaimed_unconscious_bodies(ctx: &SimulationContext, player: PlayerId, stack: &mut DiggerStack, mut quota: Quota) {
    let imprison = ctx.world.dungeon(player).map(|d| d.tendencies.imprison).unwrap_or(false);
    if !imprison || !ctx.world.rooms.player_has_room_of_role(player, RoomRole::PRISON) {
        return;
    }
    let capacity = ctx.config.digger_task_max_count;
    for creature in ctx.world.creatures.iter() {
        if quota.exhausted() {
            return;
        }
        if !player.is_enemy(creature.owner) || !creature.is_unconscious() || creature.is_being_dragged() {
            continue;
        }
        if !ctx.world.map.is_revealed(player, creature.pos.slab()) {
            continue;
        }
        if ctx.world.rooms.room_of_role_with_capacity(player, RoomRole::PRISON, 1).is_none() {
            tracing::debug!("Player {} has no prison space for captives", player.0);
            return;
        }
        if !quota.add(stack, creature.pos, DiggerTaskKind::PickUpUnconscious, capacity) {
            return;
        }
    }
}

fn add_unclaimed_dead_bodies(ctx: &SimulationContext, player: PlayerId, stack: &mut DiggerStack, mut quota: Quota) {
    if !ctx.world.rooms.player_has_room_of_role(player, RoomRole::DEAD_STORAGE) {
        return;
    }
    let capacity = ctx.config.digger_task_max_count;
    for thing in ctx.world.things.iter() {
        if quota.exhausted() {
            return;
        }
        if !thing.kind.is_collectable_corpse() || !thing.is_on_floor() {
            continue;
        }
        if !ctx.world.map.is_revealed(player, thing.pos.slab()) {
            continue;
        }
        let has_space = ctx.world.rooms.rooms_of_role(player, RoomRole::DEAD_STORAGE).any(|r| r.has_spare_item_capacity());
        if !has_space {
            return;
        }
        if !quota.add(stack, thing.pos, DiggerTaskKind::PickUpCorpse, capacity) {
            return;
        }
    }
}

fn add_unclaimed_spells(ctx: &SimulationContext, player: PlayerId, stack: &mut DiggerStack, mut quota: Quota) {
    if !ctx.world.rooms.player_has_room_of_role(player, RoomRole::POWERS_STORAGE) {
        return;
    }
    let capacity = ctx.config.digger_task_max_count;
    for thing in ctx.world.things.iter() {
        if quota.exhausted() {
            return;
        }
        if !thing.kind.is_spell_object()
            || !thing_can_be_picked_to_place_in_player_room_of_role(ctx, thing, player, RoomRole::POWERS_STORAGE, false)
        {
            continue;
        }
        let has_space = ctx.world.rooms.rooms_of_role(player, RoomRole::POWERS_STORAGE).any(|r| r.has_spare_item_capacity());
        if !has_space {
            tracing::debug!("Player {} has no library space for spells", player.0);
            return;
        }
        if !quota.add(stack, thing.pos, DiggerTaskKind::PickUpSpellbook, capacity) {
            return;
        }
    }
}

/// For every spent own trap, the first matching crate lying on own ground
fn add_empty_traps(ctx: &SimulationContext, player: PlayerId, stack: &mut DiggerStack, mut quota: Quota) {
    let capacity = ctx.config.digger_task_max_count;
    let spent: Vec<u8> = ctx
        .world
        .things
        .iter()
        .filter(|t| t.owner == player)
        .filter_map(|t| match t.kind {
            ThingKind::Trap { trap_model, shots: 0 } => Some(trap_model),
            _ => None,
        })
        .collect();
    for model in spent {
        if quota.exhausted() {
            return;
        }
        let crate_pos = ctx
            .world
            .things
            .iter()
            .filter(|t| t.is_on_floor() && matches!(t.kind, ThingKind::TrapCrate { trap_model } if trap_model == model))
            .filter(|t| ctx.world.map.owner(t.pos.slab()) == player && ctx.world.map.is_revealed(player, t.pos.slab()))
            .map(|t| t.pos)
            .find(|pos| stack.find_using_pos(*pos, DiggerTaskKind::PickUpCrateToArm).is_none());
        if let Some(pos) = crate_pos {
            if !quota.add(stack, pos, DiggerTaskKind::PickUpCrateToArm, capacity) {
                return;
            }
        }
    }
}

/// Flood fill the player's territory from the heart. Unclaimed path next to
/// the territory is improved, enemy floor converted, and earth bordering it
/// becomes a reinforcement candidate.
fn add_pretty_and_convert(ctx: &mut SimulationContext, player: PlayerId, stack: &mut DiggerStack, mut quota: Quota) {
    let Some(heart) = ctx.world.dungeon(player).and_then(|d| d.heart) else {
        tracing::warn!("Player {} has no dungeon heart to search territory from", player.0);
        return;
    };
    let capacity = ctx.config.digger_task_max_count;
    let start_side = ctx.random(SMALL_AROUND.len() as u32) as usize;

    let base = heart.slab();
    let mut visited: AHashSet<SlabCoord> = AHashSet::new();
    let mut queue: VecDeque<SlabCoord> = VecDeque::new();
    visited.insert(base);
    queue.push_back(base);

    while let Some(slab) = queue.pop_front() {
        let mut is_border = [false; 4];
        for i in 0..SMALL_AROUND.len() {
            let side = (start_side + i) % SMALL_AROUND.len();
            let (dx, dy) = SMALL_AROUND[side];
            let next = slab.offset(dx, dy);
            if !ctx.world.map.in_bounds(next) {
                is_border[side] = true;
                continue;
            }
            let kind = ctx.world.map.kind(next);
            if kind.is_filled() {
                is_border[side] = true;
                if visited.insert(next) {
                    consider_reinforce(ctx, player, stack, next, capacity);
                }
                continue;
            }
            if !visited.insert(next) {
                continue;
            }
            queue.push_back(next);
            if quota.exhausted() {
                continue;
            }
            let map = &ctx.world.map;
            if kind == SlabKind::Path && map.is_revealed(player, next) && map.slab_by_players_land(player, next) {
                if stack.find_using_pos(next.center(), DiggerTaskKind::ImproveDungeon).is_none()
                    && !quota.add(stack, next.center(), DiggerTaskKind::ImproveDungeon, capacity)
                {
                    return;
                }
            } else if matches!(kind, SlabKind::Claimed | SlabKind::RoomFloor)
                && map.owner(next).is_enemy(player)
                && map.is_revealed(player, next)
                && stack.find_using_pos(next.center(), DiggerTaskKind::ConvertDungeon).is_none()
                && !quota.add(stack, next.center(), DiggerTaskKind::ConvertDungeon, capacity)
            {
                return;
            }
        }
        // Corners between two border sides close off the room diagonally
        for side in 0..SMALL_AROUND.len() {
            let other = (side + 1) % SMALL_AROUND.len();
            if !is_border[side] || !is_border[other] {
                continue;
            }
            let (ax, ay) = SMALL_AROUND[side];
            let (bx, by) = SMALL_AROUND[other];
            let corner = slab.offset(ax + bx, ay + by);
            if ctx.world.map.kind(corner).is_filled() && visited.insert(corner) {
                consider_reinforce(ctx, player, stack, corner, capacity);
            }
        }
        if quota.exhausted() && !stack.reinforce_has_room(capacity) {
            return;
        }
    }
}

fn consider_reinforce(ctx: &SimulationContext, player: PlayerId, stack: &mut DiggerStack, slab: SlabCoord, capacity: usize) {
    if !stack.reinforce_has_room(capacity) {
        return;
    }
    let center = slab.center();
    if stack.reinforce_candidates().iter().any(|e| e.stl == center) {
        return;
    }
    if check_place_to_reinforce(ctx, player, slab) {
        stack.add_reinforce_candidate(center, capacity);
    }
}

/// Tagged slabs which are not gem seams and can be reached
fn add_undug(ctx: &SimulationContext, player: PlayerId, stack: &mut DiggerStack, mut quota: Quota) {
    let Some(dungeon) = ctx.world.dungeon(player) else {
        return;
    };
    let capacity = ctx.config.digger_task_max_count;
    for task in &dungeon.task_list {
        if quota.exhausted() {
            return;
        }
        let slab = task.stl.slab();
        let kind = ctx.world.map.kind(slab);
        if !kind.is_diggable() || kind.is_indestructible() || !ctx.world.map.block_has_diggable_side(slab) {
            continue;
        }
        if stack.find_using_pos(task.stl, DiggerTaskKind::DigOrMine).is_some() {
            continue;
        }
        if !quota.add(stack, task.stl, DiggerTaskKind::DigOrMine, capacity) {
            return;
        }
    }
}

fn add_gems_to_mine(ctx: &SimulationContext, player: PlayerId, stack: &mut DiggerStack, mut quota: Quota) {
    let Some(dungeon) = ctx.world.dungeon(player) else {
        return;
    };
    let capacity = ctx.config.digger_task_max_count;
    for task in &dungeon.task_list {
        if quota.exhausted() {
            return;
        }
        let slab = task.stl.slab();
        let kind = ctx.world.map.kind(slab);
        if !kind.is_diggable() || !kind.is_indestructible() {
            continue;
        }
        if !ctx.world.map.is_revealed(player, slab) || !ctx.world.map.block_has_diggable_side(slab) {
            continue;
        }
        if stack.find_using_pos(task.stl, DiggerTaskKind::DigOrMine).is_some() {
            continue;
        }
        if !quota.add(stack, task.stl, DiggerTaskKind::DigOrMine, capacity) {
            return;
        }
    }
}

/// Loose gold on own or neutral ground, while a treasury has space
fn add_gold_to_pickup(ctx: &SimulationContext, player: PlayerId, stack: &mut DiggerStack, mut quota: Quota) {
    if ctx.world.rooms.room_of_role_with_capacity(player, RoomRole::GOLD_STORAGE, 1).is_none() {
        return;
    }
    let capacity = ctx.config.digger_task_max_count;
    for thing in ctx.world.things.iter() {
        if quota.exhausted() {
            return;
        }
        if !thing.kind.is_gold_pile() || !thing.is_on_floor() {
            continue;
        }
        let slab = thing.pos.slab();
        let slab_owner = ctx.world.map.owner(slab);
        if !ctx.world.map.is_revealed(player, slab) || !(slab_owner == player || slab_owner.is_neutral()) {
            continue;
        }
        if stack.find_using_pos(thing.pos, DiggerTaskKind::PickUpGoldPile).is_some() {
            continue;
        }
        if !quota.add(stack, thing.pos, DiggerTaskKind::PickUpGoldPile, capacity) {
            return;
        }
    }
}

fn add_unclaimed_crates(ctx: &SimulationContext, player: PlayerId, stack: &mut DiggerStack, mut quota: Quota) {
    if !ctx.world.rooms.player_has_room_of_role(player, RoomRole::CRATES_STORAGE) {
        return;
    }
    let capacity = ctx.config.digger_task_max_count;
    for thing in ctx.world.things.iter() {
        if quota.exhausted() {
            return;
        }
        if !thing.kind.is_workshop_crate()
            || !thing_can_be_picked_to_place_in_player_room_of_role(ctx, thing, player, RoomRole::CRATES_STORAGE, false)
        {
            continue;
        }
        let has_space = ctx.world.rooms.rooms_of_role(player, RoomRole::CRATES_STORAGE).any(|r| r.has_spare_item_capacity());
        if !has_space {
            tracing::debug!("Player {} has no workshop space for crates", player.0);
            return;
        }
        if !quota.add(stack, thing.pos, DiggerTaskKind::PickUpCrateForWorkshop, capacity) {
            return;
        }
    }
}

/// Append collected reinforcement candidates while the stack is short
fn add_reinforce(ctx: &SimulationContext, stack: &mut DiggerStack) {
    let capacity = ctx.config.digger_task_max_count;
    let fill_limit = ctx.config.reinforce_stack_fill_limit;
    let candidates: Vec<_> = stack.reinforce_candidates().to_vec();
    for entry in candidates {
        if stack.len() >= fill_limit {
            break;
        }
        stack.add(entry.stl, DiggerTaskKind::ReinforceWall, capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::world::dungeon::DigTaskKind;
    use crate::world::rooms::RoomKind;
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

    fn kinds(ctx: &SimulationContext) -> Vec<DiggerTaskKind> {
        ctx.world.dungeons[0].digger_stack.entries().iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_rebuild_is_rate_limited() {
        let mut ctx = context();
        let me = PlayerId::new(0);
        ctx.turn = 5;
        assert!(imp_stack_update(&mut ctx, me), "first call always rebuilds");
        ctx.turn = 5 + 127;
        assert!(!imp_stack_update(&mut ctx, me));
        ctx.turn = 5 + 128;
        assert!(imp_stack_update(&mut ctx, me));
        assert_eq!(ctx.world.dungeons[0].digger_stack_update_turn, Some(133));
    }

    #[test]
    fn test_dig_tasks_and_gold_are_found() {
        let mut ctx = context();
        let me = PlayerId::new(0);
        let config = ctx.config.clone();
        ctx.world.rooms.create_room(&mut ctx.world.map, RoomKind::Treasury, me, &[SlabCoord::new(10, 6)], &config).unwrap();
        ctx.world.dungeons[0].add_dig_task(SlabCoord::new(6, 1), DigTaskKind::Dig);
        ctx.world.things.spawn(ThingKind::GoldPile { gold: 100 }, PlayerId::NEUTRAL, SlabCoord::new(7, 5).center());

        imp_stack_update(&mut ctx, me);
        let kinds = kinds(&ctx);
        assert!(kinds.contains(&DiggerTaskKind::DigOrMine));
        assert!(kinds.contains(&DiggerTaskKind::PickUpGoldPile));
        let stack = &ctx.world.dungeons[0].digger_stack;
        assert_eq!(
            stack.entries().iter().filter(|e| e.kind == DiggerTaskKind::DigOrMine).count(),
            1,
            "a tagged slab is listed once"
        );
    }

    #[test]
    fn test_gold_ignored_without_treasury() {
        let mut ctx = context();
        ctx.world.things.spawn(ThingKind::GoldPile { gold: 100 }, PlayerId::NEUTRAL, SlabCoord::new(7, 5).center());
        imp_stack_update(&mut ctx, PlayerId::new(0));
        assert!(!kinds(&ctx).contains(&DiggerTaskKind::PickUpGoldPile));
    }

    #[test]
    fn test_earth_bordering_territory_is_reinforced_last() {
        let mut ctx = context();
        ctx.world.dungeons[0].add_dig_task(SlabCoord::new(6, 1), DigTaskKind::Dig);
        imp_stack_update(&mut ctx, PlayerId::new(0));
        let kinds = kinds(&ctx);
        assert_eq!(kinds.first(), Some(&DiggerTaskKind::DigOrMine));
        assert!(kinds.len() > 1);
        assert!(kinds[1..].iter().all(|k| *k == DiggerTaskKind::ReinforceWall));
        assert!(kinds.len() <= ctx.config.reinforce_stack_fill_limit);
        let stack = &ctx.world.dungeons[0].digger_stack;
        assert!(
            stack.entries().iter().all(|e| e.stl != SlabCoord::new(6, 1).center() || e.kind == DiggerTaskKind::DigOrMine),
            "tagged earth is not reinforced"
        );
    }

    #[test]
    fn test_unclaimed_path_and_enemy_floor() {
        let mut ctx = context();
        ctx.world.map.set_slab(SlabCoord::new(8, 4), SlabKind::Path, PlayerId::NEUTRAL).unwrap();
        ctx.world.map.set_slab(SlabCoord::new(8, 5), SlabKind::Claimed, PlayerId::new(1)).unwrap();
        imp_stack_update(&mut ctx, PlayerId::new(0));
        let stack = &ctx.world.dungeons[0].digger_stack;
        assert!(stack.find_using_pos(SlabCoord::new(8, 4).center(), DiggerTaskKind::ImproveDungeon).is_some());
        assert!(stack.find_using_pos(SlabCoord::new(8, 5).center(), DiggerTaskKind::ConvertDungeon).is_some());
    }

    #[test]
    fn test_overflow_is_counted() {
        let mut ctx = context();
        ctx.config.digger_task_max_count = 4;
        for x in 2..14 {
            ctx.world.dungeons[0].add_dig_task(SlabCoord::new(x, 1), DigTaskKind::Dig);
        }
        imp_stack_update(&mut ctx, PlayerId::new(0));
        assert_eq!(ctx.world.dungeons[0].digger_stack.len(), 4);
        assert_eq!(ctx.stats.get(ErrorStatKind::DiggerStackOverflow), 1);
    }
}
