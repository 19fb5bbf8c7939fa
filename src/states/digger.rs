//! Per-tick behavior of the digger states
//!
//! A digger walks to its task through a move state and then lands in one
//! of the "arrives at" states below. Those check the task once more and
//! switch to the matching work state, which counts down and changes the
//! slab. Whatever the outcome, the digger then goes to `ImpLastDidJob` to
//! look for more of the same labor nearby.

use crate::core::types::{CreatureId, PlayerId, SlabCoord, ThingId};
use crate::digger::places::{check_place_to_convert, check_place_to_pretty, check_place_to_reinforce};
use crate::digger::{check_out_available_imp_tasks, check_out_imp_last_did, check_out_imp_tokes, has_money_for_treasure_room};
use crate::simulation::context::SimulationContext;
use crate::simulation::events::EventKind;
use crate::states::cleanup::drop_dragged;
use crate::states::ids::CreatureStateId;
use crate::states::machine;
use crate::world::map::SlabKind;
use crate::world::rooms::{RoomRole, WorkArea};
use crate::world::things::ThingKind;

/// Shots loaded into a trap when it is armed from a crate
pub const ARMED_TRAP_SHOTS: u32 = 1;

fn last_did_job(ctx: &mut SimulationContext, id: CreatureId) {
    machine::set_state(ctx, id, CreatureStateId::ImpLastDidJob);
}

fn owner_of(ctx: &SimulationContext, id: CreatureId) -> Option<PlayerId> {
    ctx.creature(id).map(|c| c.owner)
}

pub(crate) fn imp_doing_nothing(ctx: &mut SimulationContext, id: CreatureId) {
    if check_out_imp_last_did(ctx, id) || check_out_available_imp_tasks(ctx, id) || check_out_imp_tokes(ctx, id) {
        return;
    }
    if let Some(owner) = owner_of(ctx, id) {
        if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
            dungeon.stats.promises_broken += 1;
        }
    }
    machine::move_somewhere_adjacent(ctx, id, CreatureStateId::ImpDoingNothing);
}

/// Slab the digger is digging, while its tag and terrain still allow it
fn current_dig_slab(ctx: &SimulationContext, id: CreatureId) -> Option<SlabCoord> {
    let creature = ctx.creature(id)?;
    let task_stl = creature.digger.task_stl?;
    let dungeon = ctx.world.dungeon(creature.owner)?;
    dungeon.find_dig_task(task_stl)?;
    let slab = task_stl.slab();
    ctx.world.map.kind(slab).is_diggable().then_some(slab)
}

pub(crate) fn imp_arrives_at_dig_or_mine(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(slab) = current_dig_slab(ctx, id) else {
        tracing::trace!("Digger {} arrived at a dig task which is gone", id.0);
        last_did_job(ctx, id);
        return;
    };
    let next = if ctx.world.map.kind(slab).is_valuable() {
        CreatureStateId::ImpMinesGold
    } else {
        CreatureStateId::ImpDigsDirt
    };
    machine::set_state(ctx, id, next);
}

pub(crate) fn imp_digs_mines(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(slab) = current_dig_slab(ctx, id) else {
        last_did_job(ctx, id);
        return;
    };
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, model) = (creature.owner, creature.model);
    let gold_hold = ctx.world.models.get(model).gold_hold;
    let kind = ctx.world.map.kind(slab);
    let health = match ctx.world.map.get_mut(slab) {
        Some(cell) => {
            cell.health += 1;
            cell.health
        }
        None => return,
    };

    if kind.is_valuable() {
        let per_turn = ctx.config.gold_mined_per_turn;
        let (mined, full) = match ctx.creature_mut(id) {
            Some(creature) => {
                let mined = per_turn.min(gold_hold.saturating_sub(creature.gold_carried));
                creature.gold_carried += mined;
                (mined, creature.gold_carried >= gold_hold)
            }
            None => return,
        };
        if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
            dungeon.stats.gold_mined += mined as u64;
        }
        if full && has_money_for_treasure_room(ctx, id) {
            return;
        }
    }

    if health < ctx.config.dig_work_turns as i32 {
        return;
    }
    if kind.is_indestructible() {
        // Gem seams are never used up; keep mining the same face
        if let Some(cell) = ctx.world.map.get_mut(slab) {
            cell.health = 0;
        }
        if let Some(creature) = ctx.creature_mut(id) {
            creature.digger.task_repeats += 1;
        }
        return;
    }
    if let Err(err) = ctx.world.map.set_slab(slab, SlabKind::Path, PlayerId::NEUTRAL) {
        tracing::warn!("Digger {} could not finish slab ({}, {}): {}", id.0, slab.x, slab.y, err);
        last_did_job(ctx, id);
        return;
    }
    ctx.world.map.reveal(owner, slab);
    if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
        dungeon.remove_dig_task(slab.center());
        dungeon.stats.slabs_dug += 1;
    }
    tracing::debug!("Digger {} dug out ({}, {})", id.0, slab.x, slab.y);
    last_did_job(ctx, id);
}

pub(crate) fn imp_drops_gold(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, pos, carried) = (creature.owner, creature.pos, creature.gold_carried);
    let room = creature.target_room.filter(|r| {
        ctx.world
            .rooms
            .get(*r)
            .map(|room| room.owner == owner && room.kind.roles().intersects(RoomRole::GOLD_STORAGE))
            .unwrap_or(false)
    });
    let Some(room) = room else {
        machine::set_start_state(ctx, id);
        return;
    };
    let stored = ctx.world.rooms.store_gold(room, carried);
    let left = match ctx.creature_mut(id) {
        Some(creature) => {
            creature.gold_carried -= stored;
            creature.target_room = None;
            creature.gold_carried
        }
        None => return,
    };
    tracing::debug!("Digger {} stored {} gold", id.0, stored);
    if left > 0 {
        let turn = ctx.turn;
        ctx.services.events.create_event(turn, pos, EventKind::TreasuryRoomFull, owner);
        if has_money_for_treasure_room(ctx, id) {
            return;
        }
    }
    last_did_job(ctx, id);
}

pub(crate) fn imp_last_did_job(ctx: &mut SimulationContext, id: CreatureId) {
    if !check_out_imp_last_did(ctx, id) {
        machine::set_start_state(ctx, id);
    }
}

/// Enter a work state on the slab under the digger, counting down `turns`
fn start_slab_work(ctx: &mut SimulationContext, id: CreatureId, state: CreatureStateId, turns: u32) {
    machine::set_state(ctx, id, state);
    if let Some(creature) = ctx.creature_mut(id) {
        if creature.digger.working_stl.is_none() {
            creature.digger.working_stl = Some(creature.pos.slab().center());
        }
        creature.countdown = turns;
    }
}

/// One turn of slab work; true when the countdown has just run out
fn slab_work_done(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    match ctx.creature_mut(id) {
        Some(creature) => {
            creature.countdown = creature.countdown.saturating_sub(1);
            creature.countdown == 0
        }
        None => false,
    }
}

fn finish_slab_work(ctx: &mut SimulationContext, id: CreatureId) {
    if let Some(creature) = ctx.creature_mut(id) {
        creature.digger.working_stl = None;
    }
    last_did_job(ctx, id);
}

fn own_slab(ctx: &SimulationContext, id: CreatureId) -> Option<SlabCoord> {
    ctx.creature(id).map(|c| c.pos.slab())
}

pub(crate) fn imp_arrives_at_improve_dungeon(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(slab) = own_slab(ctx, id) else {
        return;
    };
    if !check_place_to_pretty(ctx, id, slab) {
        last_did_job(ctx, id);
        return;
    }
    let turns = ctx.config.improve_work_turns;
    if let Some(creature) = ctx.creature_mut(id) {
        creature.digger.working_stl = Some(slab.center());
    }
    start_slab_work(ctx, id, CreatureStateId::ImpImprovesDungeon, turns);
}

pub(crate) fn imp_improves_dungeon(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(slab) = own_slab(ctx, id) else {
        return;
    };
    if !check_place_to_pretty(ctx, id, slab) {
        finish_slab_work(ctx, id);
        return;
    }
    if !slab_work_done(ctx, id) {
        return;
    }
    let Some(owner) = owner_of(ctx, id) else {
        return;
    };
    match ctx.world.map.set_slab(slab, SlabKind::Claimed, owner) {
        Ok(()) => {
            if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
                dungeon.stats.slabs_claimed += 1;
            }
        }
        Err(err) => tracing::warn!("Digger {} could not claim ({}, {}): {}", id.0, slab.x, slab.y, err),
    }
    finish_slab_work(ctx, id);
}

pub(crate) fn imp_arrives_at_convert_dungeon(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(slab) = own_slab(ctx, id) else {
        return;
    };
    if !check_place_to_convert(ctx, id, slab) {
        last_did_job(ctx, id);
        return;
    }
    let victim = ctx.world.map.owner(slab);
    if ctx.world.map.room_at(slab).is_some() {
        let turn = ctx.turn;
        ctx.services.events.create_event(turn, slab.center(), EventKind::RoomUnderAttack, victim);
    }
    let turns = ctx.config.convert_work_turns;
    if let Some(creature) = ctx.creature_mut(id) {
        creature.digger.working_stl = Some(slab.center());
    }
    start_slab_work(ctx, id, CreatureStateId::ImpConvertsDungeon, turns);
}

pub(crate) fn imp_converts_dungeon(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(slab) = own_slab(ctx, id) else {
        return;
    };
    if !check_place_to_convert(ctx, id, slab) {
        finish_slab_work(ctx, id);
        return;
    }
    if !slab_work_done(ctx, id) {
        return;
    }
    let Some(owner) = owner_of(ctx, id) else {
        return;
    };
    if let Some(room) = ctx.world.map.room_at(slab) {
        match ctx.world.rooms.remove_slab(&mut ctx.world.map, room, slab) {
            Ok(true) => tracing::info!("Room {} of player {} was lost to conversion", room.0, ctx.world.map.owner(slab).0),
            Ok(false) => {}
            Err(err) => tracing::warn!("Converted slab had a broken room link: {}", err),
        }
    }
    match ctx.world.map.set_slab(slab, SlabKind::Claimed, owner) {
        Ok(()) => {
            if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
                dungeon.stats.slabs_converted += 1;
            }
        }
        Err(err) => tracing::warn!("Digger {} could not convert ({}, {}): {}", id.0, slab.x, slab.y, err),
    }
    finish_slab_work(ctx, id);
}

fn reinforced_wall(ctx: &SimulationContext, id: CreatureId) -> Option<SlabCoord> {
    let creature = ctx.creature(id)?;
    let wall = creature.digger.working_stl?.slab();
    check_place_to_reinforce(ctx, creature.owner, wall).then_some(wall)
}

pub(crate) fn imp_arrives_at_reinforce(ctx: &mut SimulationContext, id: CreatureId) {
    if reinforced_wall(ctx, id).is_none() {
        finish_slab_work(ctx, id);
        return;
    }
    let turns = ctx.config.reinforce_work_turns;
    start_slab_work(ctx, id, CreatureStateId::ImpReinforces, turns);
}

pub(crate) fn imp_reinforces(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(wall) = reinforced_wall(ctx, id) else {
        finish_slab_work(ctx, id);
        return;
    };
    if !slab_work_done(ctx, id) {
        return;
    }
    let Some(owner) = owner_of(ctx, id) else {
        return;
    };
    match ctx.world.map.set_slab(wall, SlabKind::Wall, owner) {
        Ok(()) => {
            if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
                dungeon.stats.walls_reinforced += 1;
            }
            if let Some(creature) = ctx.creature_mut(id) {
                creature.digger.consecutive_reinforcements += 1;
            }
        }
        Err(err) => tracing::warn!("Digger {} could not reinforce ({}, {}): {}", id.0, wall.x, wall.y, err),
    }
    // The next wall is chosen from this one
    if let Some(creature) = ctx.creature_mut(id) {
        creature.digger.working_stl = Some(wall.center());
    }
    last_did_job(ctx, id);
}

pub(crate) fn imp_picks_up_gold_pile(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (pos, carried) = (creature.pos, creature.gold_carried);
    let gold_hold = ctx.world.models.get(creature.model).gold_hold;
    let taken = ctx.world.things.take_gold_at(pos, gold_hold.saturating_sub(carried));
    let full = match ctx.creature_mut(id) {
        Some(creature) => {
            creature.gold_carried += taken;
            creature.gold_carried >= gold_hold
        }
        None => return,
    };
    tracing::trace!("Digger {} picked up {} gold", id.0, taken);
    if full && has_money_for_treasure_room(ctx, id) {
        return;
    }
    last_did_job(ctx, id);
}

pub(crate) fn imp_toking(ctx: &mut SimulationContext, id: CreatureId) {
    if slab_work_done(ctx, id) {
        machine::set_start_state(ctx, id);
    }
}

/// Lift the thing the digger was sent for, if it is still lying there
fn pick_up_object(ctx: &mut SimulationContext, id: CreatureId) -> Option<ThingId> {
    let creature = ctx.creature(id)?;
    let (pos, thing_id) = (creature.pos, creature.pickup_object?);
    let thing = ctx.world.things.get(thing_id)?;
    if !thing.is_on_floor() || thing.pos.slab() != pos.slab() {
        return None;
    }
    // Taking a thing out of the room which stores it frees a place
    let stored_in = ctx.world.map.room_at(thing.pos.slab()).filter(|room| {
        ctx.world
            .rooms
            .get(*room)
            .map(|r| thing.kind.is_room_inventory(r.kind.roles()))
            .unwrap_or(false)
    });
    if let Some(room) = stored_in {
        ctx.world.rooms.remove_item(room);
    }
    let thing = ctx.world.things.get_mut(thing_id)?;
    thing.dragged_by = Some(id);
    thing.pos = pos;
    Some(thing_id)
}

fn forget_pickup(ctx: &mut SimulationContext, id: CreatureId) {
    if let Some(creature) = ctx.creature_mut(id) {
        creature.pickup_object = None;
        creature.pickup_creature = None;
        creature.arming_thing = None;
    }
    machine::set_start_state(ctx, id);
}

/// Head for the nearest room of the role with space for one more item
fn carry_to_room(ctx: &mut SimulationContext, id: CreatureId, role: RoomRole, then: CreatureStateId, full: EventKind) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, from) = (creature.owner, creature.pos);
    let room = ctx.world.rooms.nearest_room_of_role_with_item_capacity(owner, role, from);
    let seed = ctx.random(u32::MAX);
    let target = room.and_then(|room| {
        ctx.world.rooms.get(room).and_then(|r| r.work_position(WorkArea::Whole, seed)).map(|pos| (room, pos))
    });
    if let Some((room, pos)) = target {
        if machine::move_to(ctx, id, pos, then) {
            if let Some(creature) = ctx.creature_mut(id) {
                creature.target_room = Some(room);
            }
            return;
        }
    }
    let turn = ctx.turn;
    ctx.services.events.create_event(turn, from, full, owner);
    drop_dragged(ctx, id);
    machine::set_start_state(ctx, id);
}

fn pick_up_for_room(ctx: &mut SimulationContext, id: CreatureId, role: RoomRole, then: CreatureStateId, full: EventKind) {
    if pick_up_object(ctx, id).is_none() {
        forget_pickup(ctx, id);
        return;
    }
    carry_to_room(ctx, id, role, then, full);
}

pub(crate) fn picks_up_spell_object(ctx: &mut SimulationContext, id: CreatureId) {
    pick_up_for_room(
        ctx,
        id,
        RoomRole::POWERS_STORAGE,
        CreatureStateId::CreatureDropsSpellObjectInLibrary,
        EventKind::LibraryFull,
    );
}

pub(crate) fn picks_up_crate_for_workshop(ctx: &mut SimulationContext, id: CreatureId) {
    pick_up_for_room(
        ctx,
        id,
        RoomRole::CRATES_STORAGE,
        CreatureStateId::CreatureDropsCrateInWorkshop,
        EventKind::WorkshopFull,
    );
}

pub(crate) fn picks_up_corpse(ctx: &mut SimulationContext, id: CreatureId) {
    pick_up_for_room(
        ctx,
        id,
        RoomRole::DEAD_STORAGE,
        CreatureStateId::CreatureDropsCorpseInGraveyard,
        EventKind::GraveyardFull,
    );
}

/// Put the carried thing down in the target room as stored inventory
fn drop_in_room(ctx: &mut SimulationContext, id: CreatureId, role: RoomRole, then: CreatureStateId, full: EventKind) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, pos, thing, room) = (creature.owner, creature.pos, creature.pickup_object, creature.target_room);
    let Some(thing) = thing.filter(|t| ctx.world.things.get(*t).map(|t| t.dragged_by == Some(id)).unwrap_or(false)) else {
        forget_pickup(ctx, id);
        return;
    };
    let in_room = room.filter(|r| {
        ctx.world
            .rooms
            .get(*r)
            .map(|r| r.owner == owner && r.contains_slab(pos.slab()))
            .unwrap_or(false)
    });
    let Some(room) = in_room else {
        drop_dragged(ctx, id);
        machine::set_start_state(ctx, id);
        return;
    };
    if !ctx.world.rooms.store_item(room) {
        // Filled up on the way; try another room
        carry_to_room(ctx, id, role, then, full);
        return;
    }
    ctx.world.things.drop_at(thing, pos);
    if let Some(stored) = ctx.world.things.get_mut(thing) {
        stored.owner = owner;
        if let ThingKind::Corpse { laid_to_rest, .. } = &mut stored.kind {
            *laid_to_rest = true;
        }
    }
    if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
        dungeon.stats.items_stored += 1;
    }
    tracing::debug!("Creature {} stored thing {} in room {}", id.0, thing.0, room.0);
    if let Some(creature) = ctx.creature_mut(id) {
        creature.pickup_object = None;
    }
    machine::set_start_state(ctx, id);
}

pub(crate) fn drops_spell_object_in_library(ctx: &mut SimulationContext, id: CreatureId) {
    drop_in_room(
        ctx,
        id,
        RoomRole::POWERS_STORAGE,
        CreatureStateId::CreatureDropsSpellObjectInLibrary,
        EventKind::LibraryFull,
    );
}

pub(crate) fn drops_crate_in_workshop(ctx: &mut SimulationContext, id: CreatureId) {
    drop_in_room(
        ctx,
        id,
        RoomRole::CRATES_STORAGE,
        CreatureStateId::CreatureDropsCrateInWorkshop,
        EventKind::WorkshopFull,
    );
}

pub(crate) fn drops_corpse_in_graveyard(ctx: &mut SimulationContext, id: CreatureId) {
    drop_in_room(
        ctx,
        id,
        RoomRole::DEAD_STORAGE,
        CreatureStateId::CreatureDropsCorpseInGraveyard,
        EventKind::GraveyardFull,
    );
}

/// Trap the carried crate can re-arm: same model, out of shots
fn trap_to_arm(ctx: &SimulationContext, crate_id: ThingId, trap: ThingId) -> bool {
    let Some(ThingKind::TrapCrate { trap_model }) = ctx.world.things.get(crate_id).map(|t| t.kind) else {
        return false;
    };
    matches!(
        ctx.world.things.get(trap).filter(|t| t.exists).map(|t| t.kind),
        Some(ThingKind::Trap { trap_model: model, shots: 0 }) if model == trap_model
    )
}

pub(crate) fn picks_up_trap_object(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(crate_id) = pick_up_object(ctx, id) else {
        forget_pickup(ctx, id);
        return;
    };
    let target = ctx
        .creature(id)
        .and_then(|c| c.arming_thing)
        .filter(|trap| trap_to_arm(ctx, crate_id, *trap))
        .and_then(|trap| ctx.world.things.get(trap).map(|t| t.pos));
    match target {
        Some(pos) if machine::move_to(ctx, id, pos, CreatureStateId::CreatureArmsTrap) => {}
        _ => {
            drop_dragged(ctx, id);
            machine::set_start_state(ctx, id);
        }
    }
}

pub(crate) fn arms_trap(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, crate_id, trap) = (creature.owner, creature.pickup_object, creature.arming_thing);
    let (Some(crate_id), Some(trap)) = (crate_id, trap) else {
        forget_pickup(ctx, id);
        return;
    };
    if !trap_to_arm(ctx, crate_id, trap) {
        drop_dragged(ctx, id);
        machine::set_start_state(ctx, id);
        return;
    }
    if let Some(ThingKind::Trap { shots, .. }) = ctx.world.things.get_mut(trap).map(|t| &mut t.kind) {
        *shots = ARMED_TRAP_SHOTS;
    }
    ctx.world.things.remove(crate_id);
    if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
        dungeon.stats.traps_armed += 1;
    }
    tracing::debug!("Creature {} armed trap {}", id.0, trap.0);
    if let Some(creature) = ctx.creature_mut(id) {
        creature.pickup_object = None;
        creature.arming_thing = None;
    }
    machine::set_start_state(ctx, id);
}

pub(crate) fn pick_up_unconscious_body(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, pos) = (creature.owner, creature.pos);
    let victim = creature.pickup_creature.filter(|v| {
        ctx.creature(*v)
            .map(|c| c.is_unconscious() && !c.is_being_dragged() && c.pos.slab() == pos.slab())
            .unwrap_or(false)
    });
    let Some(victim) = victim else {
        forget_pickup(ctx, id);
        return;
    };
    let Some(victim_owner) = ctx.creature(victim).map(|c| c.owner) else {
        return;
    };
    let room = if victim_owner == owner {
        ctx.creature(victim).and_then(|c| c.lair_room).filter(|r| ctx.world.rooms.get(*r).is_some())
    } else {
        ctx.world.rooms.nearest_room_of_role_with_capacity(owner, RoomRole::PRISON, pos, 1)
    };
    let seed = ctx.random(u32::MAX);
    let target = room.and_then(|r| ctx.world.rooms.get(r).and_then(|room| room.work_position(WorkArea::Whole, seed)));
    let (Some(room), Some(target)) = (room, target) else {
        if victim_owner != owner {
            let turn = ctx.turn;
            ctx.services.events.create_event(turn, pos, EventKind::PrisonFull, owner);
        }
        forget_pickup(ctx, id);
        return;
    };
    if let Some(body) = ctx.creature_mut(victim) {
        body.dragged_by = Some(id);
        body.pos = pos;
    }
    if !machine::move_to(ctx, id, target, CreatureStateId::CreatureDropBodyInPrison) {
        drop_dragged(ctx, id);
        machine::set_start_state(ctx, id);
        return;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.target_room = Some(room);
    }
}

/// Put the carried body down: enemies become prisoners, own creatures are
/// left to recover in their lair
pub(crate) fn drop_body_in_prison(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, room, victim) = (creature.owner, creature.target_room, creature.pickup_creature);
    let Some(victim) = victim else {
        machine::set_start_state(ctx, id);
        return;
    };
    let prison = room.filter(|r| {
        ctx.world
            .rooms
            .get(*r)
            .map(|room| room.kind.roles().intersects(RoomRole::PRISON) && room.owner == owner)
            .unwrap_or(false)
    });
    drop_dragged(ctx, id);
    let enemy = ctx.creature(victim).map(|c| c.owner.is_enemy(owner)).unwrap_or(false);
    if let (Some(prison), true) = (prison, enemy) {
        if ctx.world.rooms.add_occupant(prison, victim) {
            if let Some(body) = ctx.creature_mut(victim) {
                body.work_room = Some(prison);
                body.countdown = 0;
            }
            machine::set_state(ctx, victim, CreatureStateId::CreatureInPrison);
            tracing::debug!("Creature {} locked up creature {}", id.0, victim.0);
        } else {
            let turn = ctx.turn;
            let pos = ctx.creature(id).map(|c| c.pos).unwrap_or_default();
            ctx.services.events.create_event(turn, pos, EventKind::PrisonFull, owner);
        }
    }
    machine::set_start_state(ctx, id);
}
