//! A digger picking its next task off the stack
//!
//! Each digger keeps a cursor into its owner's stack and the stack version
//! (rebuild turn) the cursor belongs to. After a rebuild the cursor starts
//! over. Every entry is checked again against the world before the digger
//! commits to it; entries found stale are cancelled in place.

use crate::core::types::{CreatureId, SubtileCoord};
use crate::digger::claims::{will_soon_be_getting_object, will_soon_be_working_at};
use crate::digger::discovery::imp_stack_update;
use crate::digger::places::{
    check_place_to_convert, check_place_to_pretty, check_place_to_reinforce, corpse_to_pick_at, crate_to_pick_at,
    dig_position, empty_trap_for_crate, enemies_near, gold_pile_at, spell_to_pick_at, unconscious_at,
    uncrowded_reinforce_position,
};
use crate::digger::stack::{DiggerStackEntry, DiggerTaskKind};
use crate::entity::creature::LastDidJob;
use crate::simulation::context::SimulationContext;
use crate::simulation::events::{EventKind, GameMessage};
use crate::states::ids::CreatureStateId;
use crate::states::machine;
use crate::world::dungeon::DigTaskKind;
use crate::world::rooms::{RoomKind, RoomRole, WorkArea};
use crate::world::things::ThingKind;

/// Outcome of trying one stack entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCheckout {
    /// The digger is on its way
    Assigned,
    /// The entry no longer makes sense and is cancelled
    Invalid,
    /// Not for this digger right now; the entry stays
    Skip,
}

/// Walk the owner's stack from the digger's cursor and take the first
/// entry that works out
pub fn check_out_imp_stack(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    let Some(version) = ctx.world.dungeon(owner).map(|d| d.digger_stack_update_turn) else {
        return false;
    };
    if let Some(creature) = ctx.creature_mut(id) {
        if creature.digger.stack_update_turn != version {
            creature.digger.stack_update_turn = version;
            creature.digger.stack_pos = 0;
        }
    }
    loop {
        let Some(pos) = ctx.creature(id).map(|c| c.digger.stack_pos) else {
            return false;
        };
        let Some(entry) = ctx.world.dungeon(owner).and_then(|d| d.digger_stack.get(pos)).copied() else {
            return false;
        };
        if let Some(creature) = ctx.creature_mut(id) {
            creature.digger.stack_pos = pos + 1;
        }
        match check_out_stack_entry(ctx, id, entry) {
            TaskCheckout::Assigned => {
                tracing::trace!("Digger {} took {:?} at ({}, {})", id.0, entry.kind, entry.stl.x, entry.stl.y);
                return true;
            }
            TaskCheckout::Invalid => {
                tracing::trace!("Digger {} cancels stale {:?} entry {}", id.0, entry.kind, pos);
                if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
                    dungeon.digger_stack.cancel(pos);
                }
            }
            TaskCheckout::Skip => {}
        }
    }
}

fn check_out_stack_entry(ctx: &mut SimulationContext, id: CreatureId, entry: DiggerStackEntry) -> TaskCheckout {
    match entry.kind {
        DiggerTaskKind::None => TaskCheckout::Skip,
        DiggerTaskKind::ImproveDungeon => check_out_improve_dungeon(ctx, id, entry.stl),
        DiggerTaskKind::ConvertDungeon => check_out_convert_dungeon(ctx, id, entry.stl),
        DiggerTaskKind::ReinforceWall => check_out_reinforce_wall(ctx, id, entry.stl),
        DiggerTaskKind::PickUpUnconscious => check_out_pickup_unconscious(ctx, id, entry.stl),
        DiggerTaskKind::SaveUnconscious => check_out_save_unconscious(ctx, id, entry.stl),
        DiggerTaskKind::PickUpCorpse => check_out_pickup_corpse(ctx, id, entry.stl),
        DiggerTaskKind::PickUpSpellbook => check_out_pickup_spellbook(ctx, id, entry.stl),
        DiggerTaskKind::PickUpCrateToArm => check_out_pickup_crate_to_arm(ctx, id, entry.stl),
        DiggerTaskKind::PickUpCrateForWorkshop => check_out_pickup_crate_for_workshop(ctx, id, entry.stl),
        DiggerTaskKind::PickUpGoldPile => check_out_pickup_gold_pile(ctx, id, entry.stl),
        DiggerTaskKind::DigOrMine => check_out_dig_or_mine(ctx, id, entry.stl),
    }
}

fn set_last_did(ctx: &mut SimulationContext, id: CreatureId, last: LastDidJob) {
    if let Some(creature) = ctx.creature_mut(id) {
        creature.digger.last_did_job = last;
    }
}

fn check_out_improve_dungeon(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord) -> TaskCheckout {
    if !check_place_to_pretty(ctx, id, stl.slab()) {
        return TaskCheckout::Invalid;
    }
    if will_soon_be_working_at(ctx, id, stl) {
        return TaskCheckout::Skip;
    }
    if !machine::move_to(ctx, id, stl, CreatureStateId::ImpArrivesAtImproveDungeon) {
        return TaskCheckout::Skip;
    }
    set_last_did(ctx, id, LastDidJob::ConvImprDungeon);
    TaskCheckout::Assigned
}

fn check_out_convert_dungeon(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord) -> TaskCheckout {
    if !check_place_to_convert(ctx, id, stl.slab()) {
        return TaskCheckout::Invalid;
    }
    if will_soon_be_working_at(ctx, id, stl) {
        return TaskCheckout::Skip;
    }
    if !machine::move_to(ctx, id, stl, CreatureStateId::ImpArrivesAtConvertDungeon) {
        return TaskCheckout::Skip;
    }
    set_last_did(ctx, id, LastDidJob::ConvImprDungeon);
    TaskCheckout::Assigned
}

/// Whether it is time for the periodic "take the gold home" check, and if
/// so run it
fn periodic_treasury_check(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let turn = ctx.turn;
    let interval = ctx.config.tasks_check_interval;
    let Some(last) = ctx.creature(id).map(|c| c.timers.tasks_check_turn) else {
        return false;
    };
    if turn.saturating_sub(last) <= interval {
        return false;
    }
    has_money_for_treasure_room(ctx, id);
    if let Some(creature) = ctx.creature_mut(id) {
        creature.timers.tasks_check_turn = turn;
    }
    true
}

fn check_out_reinforce_wall(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord) -> TaskCheckout {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return TaskCheckout::Skip;
    };
    let turn = ctx.turn;
    let interval = ctx.config.tasks_check_interval;
    let due = ctx.creature(id).map(|c| turn.saturating_sub(c.timers.tasks_check_turn) > interval).unwrap_or(false);
    if due {
        // Look at this entry again after the treasury check
        if let Some(creature) = ctx.creature_mut(id) {
            creature.digger.stack_pos = creature.digger.stack_pos.saturating_sub(1);
        }
        periodic_treasury_check(ctx, id);
        return TaskCheckout::Assigned;
    }
    if !check_place_to_reinforce(ctx, owner, stl.slab()) {
        return TaskCheckout::Invalid;
    }
    let Some(pos) = uncrowded_reinforce_position(ctx, id, stl) else {
        return TaskCheckout::Invalid;
    };
    if !machine::move_to(ctx, id, pos, CreatureStateId::ImpArrivesAtReinforce) {
        return TaskCheckout::Skip;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.digger.working_stl = Some(stl);
        creature.digger.consecutive_reinforcements = 0;
        creature.digger.last_did_job = LastDidJob::ReinforceWallUnprompted;
    }
    TaskCheckout::Assigned
}

fn check_out_pickup_unconscious(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord) -> TaskCheckout {
    let Some(creature) = ctx.creature(id) else {
        return TaskCheckout::Skip;
    };
    let (owner, from) = (creature.owner, creature.pos);
    let imprison = ctx.world.dungeon(owner).map(|d| d.tendencies.imprison).unwrap_or(false);
    if !imprison || !ctx.world.rooms.player_has_room_of_role(owner, RoomRole::PRISON) {
        return TaskCheckout::Skip;
    }
    let Some(victim) = unconscious_at(ctx, owner, stl, false) else {
        return TaskCheckout::Invalid;
    };
    if will_soon_be_working_at(ctx, id, stl) {
        return TaskCheckout::Skip;
    }
    if ctx.world.rooms.nearest_room_of_role_with_capacity(owner, RoomRole::PRISON, from, 1).is_none() {
        let turn = ctx.turn;
        ctx.services.events.output_message(turn, owner, GameMessage::RoomTooSmall(RoomKind::Prison));
        return TaskCheckout::Invalid;
    }
    if !machine::move_to(ctx, id, stl, CreatureStateId::CreaturePickUpUnconsciousBody) {
        return TaskCheckout::Skip;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.pickup_creature = Some(victim);
    }
    TaskCheckout::Assigned
}

fn check_out_save_unconscious(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord) -> TaskCheckout {
    if !ctx.config.drag_unconscious_to_lair {
        return TaskCheckout::Skip;
    }
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return TaskCheckout::Skip;
    };
    let Some(victim) = unconscious_at(ctx, owner, stl, true) else {
        return TaskCheckout::Invalid;
    };
    if ctx.creature(victim).and_then(|c| c.lair_room).is_none() {
        return TaskCheckout::Invalid;
    }
    if will_soon_be_working_at(ctx, id, stl) {
        return TaskCheckout::Skip;
    }
    if !machine::move_to(ctx, id, stl, CreatureStateId::CreaturePickUpUnconsciousBody) {
        return TaskCheckout::Skip;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.pickup_creature = Some(victim);
    }
    TaskCheckout::Assigned
}

fn check_out_pickup_corpse(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord) -> TaskCheckout {
    let Some(creature) = ctx.creature(id) else {
        return TaskCheckout::Skip;
    };
    let (owner, from) = (creature.owner, creature.pos);
    if !ctx.world.rooms.player_has_room_of_role(owner, RoomRole::DEAD_STORAGE) {
        return TaskCheckout::Skip;
    }
    let Some(corpse) = corpse_to_pick_at(ctx, owner, stl) else {
        return TaskCheckout::Invalid;
    };
    if will_soon_be_working_at(ctx, id, stl) {
        return TaskCheckout::Skip;
    }
    if ctx.world.rooms.nearest_room_of_role_with_item_capacity(owner, RoomRole::DEAD_STORAGE, from).is_none() {
        let turn = ctx.turn;
        ctx.services.events.create_event(turn, stl, EventKind::GraveyardFull, owner);
        return TaskCheckout::Invalid;
    }
    let safety = ctx.config.corpse_enemy_safety_slabs;
    if enemies_near(ctx, owner, stl, safety) {
        return TaskCheckout::Skip;
    }
    if !machine::move_to(ctx, id, stl, CreatureStateId::CreaturePicksUpCorpse) {
        return TaskCheckout::Skip;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.pickup_object = Some(corpse);
    }
    TaskCheckout::Assigned
}

fn check_out_pickup_spellbook(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord) -> TaskCheckout {
    let Some(creature) = ctx.creature(id) else {
        return TaskCheckout::Skip;
    };
    let (owner, from) = (creature.owner, creature.pos);
    if !ctx.world.rooms.player_has_room_of_role(owner, RoomRole::POWERS_STORAGE) {
        return TaskCheckout::Skip;
    }
    if ctx.world.map.owner(stl.slab()) != owner {
        return TaskCheckout::Invalid;
    }
    let Some(book) = spell_to_pick_at(ctx, owner, stl) else {
        return TaskCheckout::Invalid;
    };
    if will_soon_be_working_at(ctx, id, stl) || will_soon_be_getting_object(ctx, owner, book) {
        return TaskCheckout::Skip;
    }
    if ctx.world.rooms.nearest_room_of_role_with_item_capacity(owner, RoomRole::POWERS_STORAGE, from).is_none() {
        let turn = ctx.turn;
        ctx.services.events.create_event(turn, stl, EventKind::LibraryFull, owner);
        return TaskCheckout::Invalid;
    }
    if !machine::move_to(ctx, id, stl, CreatureStateId::CreaturePicksUpSpellObject) {
        return TaskCheckout::Skip;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.pickup_object = Some(book);
    }
    TaskCheckout::Assigned
}

fn check_out_pickup_crate_to_arm(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord) -> TaskCheckout {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return TaskCheckout::Skip;
    };
    let mut nth = 0;
    let found = loop {
        let Some(crate_id) = crate_to_pick_at(ctx, owner, stl, true, nth) else {
            break None;
        };
        nth += 1;
        let Some(ThingKind::TrapCrate { trap_model }) = ctx.world.things.get(crate_id).map(|t| t.kind) else {
            continue;
        };
        if let Some(trap) = empty_trap_for_crate(ctx, owner, trap_model) {
            break Some((crate_id, trap));
        }
    };
    let Some((crate_id, trap)) = found else {
        return TaskCheckout::Invalid;
    };
    if will_soon_be_working_at(ctx, id, stl) || will_soon_be_getting_object(ctx, owner, crate_id) {
        return TaskCheckout::Skip;
    }
    if !machine::move_to(ctx, id, stl, CreatureStateId::CreaturePicksUpTrapObject) {
        return TaskCheckout::Skip;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.pickup_object = Some(crate_id);
        creature.arming_thing = Some(trap);
    }
    TaskCheckout::Assigned
}

fn check_out_pickup_crate_for_workshop(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord) -> TaskCheckout {
    let Some(creature) = ctx.creature(id) else {
        return TaskCheckout::Skip;
    };
    let (owner, from) = (creature.owner, creature.pos);
    if !ctx.world.rooms.player_has_room_of_role(owner, RoomRole::CRATES_STORAGE) {
        return TaskCheckout::Skip;
    }
    let Some(crate_id) = crate_to_pick_at(ctx, owner, stl, false, 0) else {
        return TaskCheckout::Invalid;
    };
    if will_soon_be_working_at(ctx, id, stl) || will_soon_be_getting_object(ctx, owner, crate_id) {
        return TaskCheckout::Skip;
    }
    if ctx.world.rooms.nearest_room_of_role_with_item_capacity(owner, RoomRole::CRATES_STORAGE, from).is_none() {
        let turn = ctx.turn;
        ctx.services.events.create_event(turn, stl, EventKind::WorkshopFull, owner);
        return TaskCheckout::Invalid;
    }
    if !machine::move_to(ctx, id, stl, CreatureStateId::CreaturePicksUpCrateForWorkshop) {
        return TaskCheckout::Skip;
    }
    let found = match ctx.world.things.get(crate_id).map(|t| t.kind) {
        Some(ThingKind::DoorCrate { .. }) => EventKind::DoorCrateFound,
        _ => EventKind::TrapCrateFound,
    };
    let turn = ctx.turn;
    ctx.services.events.create_event(turn, stl, found, owner);
    if let Some(creature) = ctx.creature_mut(id) {
        creature.pickup_object = Some(crate_id);
    }
    TaskCheckout::Assigned
}

fn check_out_pickup_gold_pile(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord) -> TaskCheckout {
    let Some(creature) = ctx.creature(id) else {
        return TaskCheckout::Skip;
    };
    let gold_hold = ctx.world.models.get(creature.model).gold_hold;
    if creature.gold_carried >= gold_hold {
        periodic_treasury_check(ctx, id);
        return TaskCheckout::Assigned;
    }
    if gold_pile_at(ctx, stl).is_none() {
        return TaskCheckout::Invalid;
    }
    if will_soon_be_working_at(ctx, id, stl) {
        return TaskCheckout::Skip;
    }
    if !machine::move_to(ctx, id, stl, CreatureStateId::ImpPicksUpGoldPile) {
        return TaskCheckout::Skip;
    }
    TaskCheckout::Assigned
}

fn check_out_dig_or_mine(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord) -> TaskCheckout {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return TaskCheckout::Skip;
    };
    let Some((task_idx, task)) = ctx
        .world
        .dungeon(owner)
        .and_then(|d| d.find_dig_task(stl).and_then(|idx| d.dig_task(idx).map(|t| (idx, *t))))
    else {
        return TaskCheckout::Invalid;
    };
    let Some(pos) = dig_position(ctx, id, task.stl) else {
        return TaskCheckout::Invalid;
    };
    let arrive = match task.kind {
        DigTaskKind::MineGold => CreatureStateId::ImpArrivesAtMineGold,
        _ => CreatureStateId::ImpArrivesAtDigDirt,
    };
    if !machine::move_to(ctx, id, pos, arrive) {
        return TaskCheckout::Skip;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.digger.task_idx = Some(task_idx);
        creature.digger.task_stl = Some(task.stl);
        creature.digger.last_did_job = LastDidJob::DigOrMine;
    }
    TaskCheckout::Assigned
}

/// Send a digger carrying gold to the nearest treasury with space. Tells
/// the player when there is none.
pub fn has_money_for_treasure_room(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    if creature.gold_carried == 0 {
        return false;
    }
    let (owner, from) = (creature.owner, creature.pos);
    let Some(room) = ctx.world.rooms.nearest_room_of_role_with_capacity(owner, RoomRole::GOLD_STORAGE, from, 1) else {
        let turn = ctx.turn;
        let message = if ctx.world.rooms.player_has_room_of_role(owner, RoomRole::GOLD_STORAGE) {
            GameMessage::RoomTooSmall(RoomKind::Treasury)
        } else {
            GameMessage::RoomNeeded(RoomKind::Treasury)
        };
        ctx.services.events.output_message(turn, owner, message);
        return false;
    };
    let seed = ctx.random(u32::MAX);
    let Some(pos) = ctx.world.rooms.get(room).and_then(|r| r.work_position(WorkArea::Whole, seed)) else {
        return false;
    };
    if !machine::move_to(ctx, id, pos, CreatureStateId::ImpDropsGold) {
        return false;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.target_room = Some(room);
    }
    true
}

/// Rebuild the stack if due, then look for work on it
pub fn check_out_available_imp_tasks(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    imp_stack_update(ctx, owner);
    if check_out_imp_stack(ctx, id) {
        return true;
    }
    periodic_treasury_check(ctx, id)
}

/// Now and then an idle digger takes a short break
pub fn check_out_imp_tokes(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let one_in = ctx.config.imp_toking_chance;
    if !ctx.chance(one_in) {
        return false;
    }
    machine::set_state(ctx, id, CreatureStateId::ImpToking);
    let turns = ctx.config.imp_toking_turns;
    if let Some(creature) = ctx.creature_mut(id) {
        creature.continue_state = CreatureStateId::ImpDoingNothing.raw();
        creature.countdown = turns;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{ModelId, PlayerId, SlabCoord};
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

    fn imp(ctx: &mut SimulationContext) -> CreatureId {
        ctx.spawn_creature(ModelId(0), PlayerId::new(0), SlabCoord::new(3, 3).center()).unwrap()
    }

    fn treasury(ctx: &mut SimulationContext) -> crate::core::types::RoomId {
        let config = ctx.config.clone();
        ctx.world
            .rooms
            .create_room(&mut ctx.world.map, RoomKind::Treasury, PlayerId::new(0), &[SlabCoord::new(10, 6)], &config)
            .unwrap()
    }

    #[test]
    fn test_gold_pile_is_checked_out() {
        let mut ctx = context();
        treasury(&mut ctx);
        let gold = SlabCoord::new(7, 5).center();
        ctx.world.things.spawn(ThingKind::GoldPile { gold: 100 }, PlayerId::NEUTRAL, gold);
        let id = imp(&mut ctx);

        assert!(check_out_available_imp_tasks(&mut ctx, id));
        let creature = ctx.creature(id).unwrap();
        assert!(creature.is_in_state(CreatureStateId::MoveToPosition));
        assert_eq!(creature.continue_state, CreatureStateId::ImpPicksUpGoldPile.raw());
        assert_eq!(creature.moveto_pos, Some(gold));
    }

    #[test]
    fn test_stale_entry_is_cancelled_and_scan_continues() {
        let mut ctx = context();
        treasury(&mut ctx);
        let first = SlabCoord::new(7, 5).center();
        let second = SlabCoord::new(8, 5).center();
        let pile = ctx.world.things.spawn(ThingKind::GoldPile { gold: 100 }, PlayerId::NEUTRAL, first);
        ctx.world.things.spawn(ThingKind::GoldPile { gold: 100 }, PlayerId::NEUTRAL, second);
        imp_stack_update(&mut ctx, PlayerId::new(0));
        ctx.world.things.remove(pile);

        let id = imp(&mut ctx);
        assert!(check_out_imp_stack(&mut ctx, id));
        assert_eq!(ctx.creature(id).unwrap().moveto_pos, Some(second));
        let stack = &ctx.world.dungeons[0].digger_stack;
        assert_eq!(stack.find_using_pos(first, DiggerTaskKind::PickUpGoldPile), None, "stale entry cancelled");
    }

    #[test]
    fn test_claimed_entry_is_skipped_not_cancelled() {
        let mut ctx = context();
        treasury(&mut ctx);
        let gold = SlabCoord::new(7, 5).center();
        ctx.world.things.spawn(ThingKind::GoldPile { gold: 100 }, PlayerId::NEUTRAL, gold);
        let first = imp(&mut ctx);
        let second = imp(&mut ctx);

        assert!(check_out_available_imp_tasks(&mut ctx, first));
        check_out_imp_stack(&mut ctx, second);
        assert_ne!(ctx.creature(second).unwrap().moveto_pos, Some(gold), "the gold is claimed by the first digger");
        let stack = &ctx.world.dungeons[0].digger_stack;
        assert!(stack.find_using_pos(gold, DiggerTaskKind::PickUpGoldPile).is_some());
    }

    #[test]
    fn test_cursor_resets_after_rebuild() {
        let mut ctx = context();
        let id = imp(&mut ctx);
        imp_stack_update(&mut ctx, PlayerId::new(0));
        ctx.creature_mut(id).unwrap().digger.stack_pos = 40;
        ctx.turn = 200;
        imp_stack_update(&mut ctx, PlayerId::new(0));
        check_out_imp_stack(&mut ctx, id);
        let creature = ctx.creature(id).unwrap();
        assert_eq!(creature.digger.stack_update_turn, Some(200));
        assert!(creature.digger.stack_pos <= ctx.world.dungeons[0].digger_stack.len());
    }

    #[test]
    fn test_dig_task_sets_digger_bookkeeping() {
        let mut ctx = context();
        let slab = SlabCoord::new(6, 1);
        ctx.world.dungeons[0].add_dig_task(slab, DigTaskKind::Dig);
        let id = imp(&mut ctx);
        assert!(check_out_available_imp_tasks(&mut ctx, id));
        let creature = ctx.creature(id).unwrap();
        assert_eq!(creature.continue_state, CreatureStateId::ImpArrivesAtDigDirt.raw());
        assert_eq!(creature.digger.task_stl, Some(slab.center()));
        assert_eq!(creature.digger.last_did_job, LastDidJob::DigOrMine);
        assert_eq!(creature.moveto_pos, Some(slab.center().offset(0, 2)));
    }

    #[test]
    fn test_no_treasury_tells_player() {
        let mut ctx = context();
        let id = imp(&mut ctx);
        ctx.creature_mut(id).unwrap().gold_carried = 200;
        assert!(!has_money_for_treasure_room(&mut ctx, id));
        assert!(ctx.services.events.has_message(PlayerId::new(0), GameMessage::RoomNeeded(RoomKind::Treasury)));

        let room = treasury(&mut ctx);
        assert!(has_money_for_treasure_room(&mut ctx, id));
        let creature = ctx.creature(id).unwrap();
        assert_eq!(creature.continue_state, CreatureStateId::ImpDropsGold.raw());
        assert_eq!(creature.target_room, Some(room));
    }
}
