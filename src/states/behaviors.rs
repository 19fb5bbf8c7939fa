//! Per-tick state processing
//!
//! `process_creature_state` looks up the descriptor of the creature's
//! active state and runs its behavior. Behaviors never fail: whatever they
//! find broken sends the creature back to its start state.

use crate::core::stats::ErrorStatKind;
use crate::core::types::{CreatureId, PlayerId, RoomId, SlabCoord, SubtileCoord};
use crate::entity::creature::AngerReason;
use crate::jobs::anger::is_damageable_wall;
use crate::jobs::assign::{
    attempt_assigned_job, attempt_job_preference, creature_can_do_job_near_position, creature_try_doing_secondary_job,
    send_creature_to_job_near_position, JobCheckFlags, MAX_EXP_LEVEL,
};
use crate::jobs::registry::{Job, JobFlags};
use crate::simulation::context::SimulationContext;
use crate::simulation::events::GameMessage;
use crate::simulation::services::WorkKind;
use crate::states::ids::CreatureStateId;
use crate::states::table::{state_info_raw, MoveCheckKind, StateBehavior, StateCategory};
use crate::states::{anger, digger, machine};
use crate::world::rooms::{RoomRole, WorkArea};

/// Idle turns without finding anything before the creature starts moaning
pub const IDLE_FAILURES_BEFORE_MOAN: u32 = 16;

/// How close a follower keeps to its leader, in subtiles
const FOLLOW_DISTANCE: i32 = 2;

fn is_digger_behavior(behavior: StateBehavior) -> bool {
    use StateBehavior as B;
    matches!(
        behavior,
        B::ImpDoingNothing
            | B::ImpArrivesAtDigOrMine
            | B::ImpDigsMines
            | B::ImpDropsGold
            | B::ImpLastDidJob
            | B::ImpArrivesAtImproveDungeon
            | B::ImpImprovesDungeon
            | B::ImpArrivesAtConvertDungeon
            | B::ImpConvertsDungeon
            | B::ImpArrivesAtReinforce
            | B::ImpReinforces
            | B::ImpPicksUpGoldPile
            | B::ImpToking
    )
}

/// Run one turn of the creature's active state
pub fn process_creature_state(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    if creature.flags.picked_up || creature.flags.dying {
        return;
    }
    let is_digger = creature.is_digger;
    let descriptor = state_info_raw(creature.active_state, &ctx.stats);
    let behavior = descriptor.behavior;

    if is_digger_behavior(behavior) && !is_digger {
        tracing::warn!("Creature {} is not a digger but is in {}", id.0, descriptor.id);
        ctx.stats.inc(ErrorStatKind::WrongCreatureClass);
        machine::set_start_state(ctx, id);
        return;
    }

    use StateBehavior as B;
    match behavior {
        B::Null => {
            tracing::trace!("Creature {} rests in an invalid state", id.0);
            machine::set_start_state(ctx, id);
        }
        B::Passive => check_fight_target(ctx, id, descriptor.category),
        B::Dormant => {}
        B::Countdown => countdown_to_start(ctx, id),
        B::Move => process_move(ctx, id),

        B::ImpDoingNothing => digger::imp_doing_nothing(ctx, id),
        B::ImpArrivesAtDigOrMine => digger::imp_arrives_at_dig_or_mine(ctx, id),
        B::ImpDigsMines => digger::imp_digs_mines(ctx, id),
        B::ImpDropsGold => digger::imp_drops_gold(ctx, id),
        B::ImpLastDidJob => digger::imp_last_did_job(ctx, id),
        B::ImpArrivesAtImproveDungeon => digger::imp_arrives_at_improve_dungeon(ctx, id),
        B::ImpImprovesDungeon => digger::imp_improves_dungeon(ctx, id),
        B::ImpArrivesAtConvertDungeon => digger::imp_arrives_at_convert_dungeon(ctx, id),
        B::ImpConvertsDungeon => digger::imp_converts_dungeon(ctx, id),
        B::ImpArrivesAtReinforce => digger::imp_arrives_at_reinforce(ctx, id),
        B::ImpReinforces => digger::imp_reinforces(ctx, id),
        B::ImpPicksUpGoldPile => digger::imp_picks_up_gold_pile(ctx, id),
        B::ImpToking => digger::imp_toking(ctx, id),
        B::PicksUpTrapObject => digger::picks_up_trap_object(ctx, id),
        B::ArmsTrap => digger::arms_trap(ctx, id),
        B::PicksUpCrateForWorkshop => digger::picks_up_crate_for_workshop(ctx, id),
        B::DropsCrateInWorkshop => digger::drops_crate_in_workshop(ctx, id),
        B::PicksUpSpellObject => digger::picks_up_spell_object(ctx, id),
        B::DropsSpellObjectInLibrary => digger::drops_spell_object_in_library(ctx, id),
        B::PicksUpCorpse => digger::picks_up_corpse(ctx, id),
        B::DropsCorpseInGraveyard => digger::drops_corpse_in_graveyard(ctx, id),
        B::PickUpUnconsciousBody => digger::pick_up_unconscious_body(ctx, id),
        B::DropBodyInPrison => digger::drop_body_in_prison(ctx, id),

        B::PersonIdle => person_idle(ctx, id),
        B::GoodIdle => good_idle(ctx, id),
        B::PretendChicken => pretend_chicken(ctx, id),
        B::Patrol => patrol(ctx, id),
        B::ToGarden => to_garden(ctx, id),
        B::ArrivedAtGarden => arrived_at_garden(ctx, id),
        B::Eating => eating(ctx, id),
        B::WantsAHome | B::ChooseLairSite => wants_a_home(ctx, id),
        B::AtNewLair => at_new_lair(ctx, id),
        B::GoingHomeToSleep => going_home_to_sleep(ctx, id),
        B::AtLairToSleep => at_lair_to_sleep(ctx, id),
        B::Sleep | B::Sulking => countdown_to_start(ctx, id),
        B::SulkHeadForLair => sulk_head_for_lair(ctx, id),
        B::ArriveAtWorkRoom => arrive_at_work_room(ctx, id),
        B::WorkInRoom => work_in_room(ctx, id),
        B::ArrivedAtPrison => arrived_at_prison(ctx, id),
        B::InPrison => in_prison(ctx, id),
        B::WantsSalary => wants_salary(ctx, id),
        B::TakeSalary => take_salary(ctx, id),
        B::SlapCowers => slap_cowers(ctx, id),
        B::Unconscious => unconscious(ctx, id),
        B::SetWorkRoomBasedOnPosition => set_work_room_based_on_position(ctx, id),
        B::SeekTheEnemy => seek_the_enemy(ctx, id),
        B::ExploreDungeon => explore_dungeon(ctx, id),
        B::FreezePrisoners => freeze_prisoners(ctx, id),
        B::FollowLeader => follow_leader(ctx, id),
        B::AtCallToArms => at_call_to_arms(ctx, id),

        B::KillCreatures => anger::kill_creatures(ctx, id, false),
        B::MadKillingPsycho => anger::kill_creatures(ctx, id, true),
        B::VandaliseRooms => anger::vandalise_rooms(ctx, id),
        B::StealGold => anger::steal_gold(ctx, id),
        B::DamageWalls => anger::damage_walls(ctx, id),
        B::LeavingDungeon => anger::leaving_dungeon(ctx, id),
        B::Leaves => anger::creature_leaves(ctx, id),
        B::Persuade => anger::persuade(ctx, id),
    }
}

/// Knock the creature out for the configured time
pub fn make_unconscious(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    if !machine::request_state(ctx, id, CreatureStateId::CreatureUnconscious) {
        return false;
    }
    let turns = ctx.config.unconscious_turns;
    if let Some(creature) = ctx.creature_mut(id) {
        creature.countdown = turns;
    }
    true
}

/// Counts down; true once the countdown has run out
pub(crate) fn tick_countdown(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    match ctx.creature_mut(id) {
        Some(creature) => {
            creature.countdown = creature.countdown.saturating_sub(1);
            creature.countdown == 0
        }
        None => false,
    }
}

fn countdown_to_start(ctx: &mut SimulationContext, id: CreatureId) {
    if tick_countdown(ctx, id) {
        machine::set_start_state(ctx, id);
    }
}

/// Session countdown for states entered without one: the first turn arms
/// it, later turns run it down. True once the session is over.
pub(crate) fn session_over(ctx: &mut SimulationContext, id: CreatureId, turns: u32) -> bool {
    let Some(creature) = ctx.creature_mut(id) else {
        return false;
    };
    if creature.countdown == 0 {
        creature.countdown = turns.max(1);
        return false;
    }
    creature.countdown -= 1;
    creature.countdown == 0
}

fn check_fight_target(ctx: &mut SimulationContext, id: CreatureId, category: StateCategory) {
    if category != StateCategory::FightCreature {
        return;
    }
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let pos = creature.pos;
    let valid = creature
        .combat_target
        .and_then(|t| ctx.creature(t))
        .map(|t| t.is_active() && t.pos.distance(&pos) <= crate::core::types::STL_PER_SLAB)
        .unwrap_or(false);
    if !valid {
        tracing::trace!("Creature {} lost its opponent", id.0);
        machine::set_start_state(ctx, id);
    }
}

fn room_of_role_owned(ctx: &SimulationContext, room: Option<RoomId>, owner: PlayerId, role: RoomRole) -> Option<RoomId> {
    room.filter(|r| {
        ctx.world
            .rooms
            .get(*r)
            .map(|room| room.owner == owner && room.kind.roles().intersects(role))
            .unwrap_or(false)
    })
}

fn move_check_passes(ctx: &SimulationContext, id: CreatureId, check: MoveCheckKind) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let owner = creature.owner;
    match check {
        MoveCheckKind::OnHeadForRoom => creature
            .target_room
            .and_then(|r| ctx.world.rooms.get(r))
            .map(|room| room.owner == owner)
            .unwrap_or(false),
        MoveCheckKind::StillDragging => {
            let thing = creature
                .pickup_object
                .and_then(|t| ctx.world.things.get(t))
                .map(|t| t.dragged_by == Some(id))
                .unwrap_or(false);
            let body = creature
                .pickup_creature
                .and_then(|v| ctx.creature(v))
                .map(|v| v.dragged_by == Some(id))
                .unwrap_or(false);
            thing || body
        }
        MoveCheckKind::CanDamageWall => creature
            .moveto_pos
            .map(|pos| pos.slab().around().any(|side| is_damageable_wall(ctx, side)))
            .unwrap_or(false),
        MoveCheckKind::NearEntrance => ctx.world.rooms.player_has_room_of_role(owner, RoomRole::ENTRANCE),
        MoveCheckKind::WaitAtDoorForWage => ctx.world.rooms.player_has_room_of_role(owner, RoomRole::GOLD_STORAGE),
    }
}

fn arrive(ctx: &mut SimulationContext, id: CreatureId) {
    if let Some(creature) = ctx.creature_mut(id) {
        creature.active_state = creature.continue_state;
        creature.continue_state = CreatureStateId::Unused.raw();
        creature.moveto_pos = None;
    }
}

/// Move the creature one subtile, together with what it drags
fn step_to(ctx: &mut SimulationContext, id: CreatureId, next: SubtileCoord) {
    let Some(creature) = ctx.creature_mut(id) else {
        return;
    };
    creature.pos = next;
    let (thing, body) = (creature.pickup_object, creature.pickup_creature);
    if let Some(thing) = thing.and_then(|t| ctx.world.things.get_mut(t)) {
        if thing.dragged_by == Some(id) {
            thing.pos = next;
        }
    }
    if let Some(victim) = body.and_then(|v| ctx.creature_mut(v)) {
        if victim.dragged_by == Some(id) {
            victim.pos = next;
        }
    }
}

fn process_move(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (pos, continuing) = (creature.pos, creature.continue_state);
    let Some(target) = creature.moveto_pos else {
        machine::set_start_state(ctx, id);
        return;
    };
    if let Some(check) = state_info_raw(continuing, &ctx.stats).move_check {
        if !move_check_passes(ctx, id, check) {
            tracing::debug!("Creature {} gave up walking, {:?} failed", id.0, check);
            machine::set_start_state(ctx, id);
            return;
        }
    }
    if pos == target {
        arrive(ctx, id);
        return;
    }
    let Some(next) = ctx.services.navigator.next_step(&ctx.world.map, pos, target) else {
        tracing::debug!("Creature {} has no route to ({}, {})", id.0, target.x, target.y);
        machine::set_start_state(ctx, id);
        return;
    };
    step_to(ctx, id, next);
    if next == target {
        arrive(ctx, id);
    }
}

fn nearest_room(ctx: &SimulationContext, owner: PlayerId, role: RoomRole, from: SubtileCoord) -> Option<RoomId> {
    ctx.world
        .rooms
        .rooms_of_role(owner, role)
        .min_by_key(|r| r.center().distance(&from))
        .map(|r| r.id)
}

/// Walk into the room, remembering it as the target
pub(crate) fn head_for_room(ctx: &mut SimulationContext, id: CreatureId, room: RoomId, then: CreatureStateId) -> bool {
    let seed = ctx.random(u32::MAX);
    let Some(pos) = ctx.world.rooms.get(room).and_then(|r| r.work_position(WorkArea::Whole, seed)) else {
        return false;
    };
    if !machine::move_to(ctx, id, pos, then) {
        return false;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.target_room = Some(room);
    }
    true
}

fn inside_room(ctx: &SimulationContext, id: CreatureId, room: RoomId) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    ctx.world.rooms.get(room).map(|r| r.contains_slab(creature.pos.slab())).unwrap_or(false)
}

fn valid_lair(ctx: &SimulationContext, id: CreatureId) -> Option<RoomId> {
    let creature = ctx.creature(id)?;
    room_of_role_owned(ctx, creature.lair_room, creature.owner, RoomRole::LAIR)
}

fn person_idle(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, model, turn) = (creature.owner, creature.model, ctx.turn);
    let model = ctx.world.models.get(model);
    let (lair_size, annoy_level, primary) = (model.lair_size, model.annoy_level, model.job_primary);
    let owed = creature.paydays_owed > 0;
    let hungry = turn.saturating_sub(creature.timers.last_eat_turn) > ctx.config.hunger_interval;
    let angry = creature.mood.is_angry(annoy_level);
    let lair = valid_lair(ctx, id);
    let rooms = &ctx.world.rooms;

    if owed && rooms.player_has_room_of_role(owner, RoomRole::GOLD_STORAGE) {
        if machine::request_state(ctx, id, CreatureStateId::CreatureWantsSalary) {
            return;
        }
    } else if hungry && rooms.player_has_room_of_role(owner, RoomRole::FOOD) {
        if machine::request_state(ctx, id, CreatureStateId::CreatureToGarden) {
            return;
        }
    } else if lair_size > 0
        && lair.is_none()
        && rooms.room_of_role_with_capacity(owner, RoomRole::LAIR, 1).is_some()
    {
        if machine::request_state(ctx, id, CreatureStateId::CreatureWantsAHome) {
            return;
        }
    } else if angry && lair.is_some() && machine::request_state(ctx, id, CreatureStateId::PersonSulkHeadForLair) {
        return;
    }

    if attempt_assigned_job(ctx, id) || attempt_job_preference(ctx, id, primary) || creature_try_doing_secondary_job(ctx, id)
    {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.idle_failures = 0;
        }
        return;
    }

    let moan_turns = ctx.config.moan_countdown;
    let failures = match ctx.creature_mut(id) {
        Some(creature) => {
            creature.idle_failures += 1;
            creature.idle_failures
        }
        None => return,
    };
    if failures >= IDLE_FAILURES_BEFORE_MOAN {
        machine::set_state(ctx, id, CreatureStateId::CreatureCannotFindAnythingToDo);
        if let Some(creature) = ctx.creature_mut(id) {
            creature.idle_failures = 0;
            creature.countdown = moan_turns;
        }
        return;
    }
    machine::move_somewhere_adjacent(ctx, id, CreatureStateId::CreatureDoingNothing);
}

/// Nearest living creature matching the filter
fn nearest_creature(
    ctx: &SimulationContext,
    id: CreatureId,
    filter: impl Fn(&crate::entity::creature::Creature) -> bool,
) -> Option<(CreatureId, SubtileCoord)> {
    let from = ctx.creature(id)?.pos;
    ctx.world
        .creatures
        .iter()
        .filter(|c| c.id != id && c.is_active() && filter(c))
        .min_by_key(|c| c.pos.distance(&from))
        .map(|c| (c.id, c.pos))
}

fn nearest_enemy(ctx: &SimulationContext, id: CreatureId) -> Option<(CreatureId, SubtileCoord)> {
    let owner = ctx.creature(id)?.owner;
    nearest_creature(ctx, id, |c| owner.is_enemy(c.owner))
}

fn good_idle(ctx: &mut SimulationContext, id: CreatureId) {
    if nearest_enemy(ctx, id).is_some() {
        machine::set_state(ctx, id, CreatureStateId::SeekTheEnemy);
        return;
    }
    let state = ctx.creature(id).and_then(|c| c.active()).unwrap_or(CreatureStateId::GoodDoingNothing);
    machine::move_somewhere_adjacent(ctx, id, state);
}

fn pretend_chicken(ctx: &mut SimulationContext, id: CreatureId) {
    if !ctx.creature(id).map(|c| c.flags.chicken).unwrap_or(false) {
        machine::set_start_state(ctx, id);
        return;
    }
    machine::move_somewhere_adjacent(ctx, id, CreatureStateId::CreaturePretendChickenMove);
}

fn patrol(ctx: &mut SimulationContext, id: CreatureId) {
    let turns = ctx.config.work_session_turns;
    if session_over(ctx, id, turns) {
        machine::set_start_state(ctx, id);
        return;
    }
    if ctx.chance(4) {
        machine::move_somewhere_adjacent(ctx, id, CreatureStateId::Patrolling);
    }
}

fn to_garden(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, pos) = (creature.owner, creature.pos);
    if let Some(room) = ctx.world.map.room_at(pos.slab()).filter(|r| room_of_role_owned(ctx, Some(*r), owner, RoomRole::FOOD).is_some()) {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.target_room = Some(room);
        }
        machine::set_state(ctx, id, CreatureStateId::CreatureArrivedAtGarden);
        return;
    }
    let reached = nearest_room(ctx, owner, RoomRole::FOOD, pos)
        .map(|room| head_for_room(ctx, id, room, CreatureStateId::CreatureArrivedAtGarden))
        .unwrap_or(false);
    if !reached {
        machine::set_start_state(ctx, id);
    }
}

fn arrived_at_garden(ctx: &mut SimulationContext, id: CreatureId) {
    let turns = ctx.config.eat_turns;
    machine::set_state(ctx, id, CreatureStateId::CreatureEatingAtGarden);
    if let Some(creature) = ctx.creature_mut(id) {
        creature.countdown = turns;
    }
}

fn eating(ctx: &mut SimulationContext, id: CreatureId) {
    if !tick_countdown(ctx, id) {
        return;
    }
    let turn = ctx.turn;
    if let Some(creature) = ctx.creature_mut(id) {
        creature.timers.last_eat_turn = turn;
        creature.mood.calm(AngerReason::Hungry);
    }
    machine::set_start_state(ctx, id);
}

pub(crate) fn annoy(ctx: &mut SimulationContext, id: CreatureId, reason: AngerReason) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let owner = creature.owner;
    let model = ctx.world.models.get(creature.model);
    let amount = match reason {
        AngerReason::NotPaid => model.annoy_not_paid,
        AngerReason::Hungry => model.annoy_hungry,
        AngerReason::NoLair => model.annoy_no_lair,
        AngerReason::Slapped => model.annoy_slapped,
        AngerReason::Rejected => model.annoy_will_not_do_job,
        AngerReason::Other => 1,
    };
    if amount <= 0 {
        return;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.mood.annoy(reason, amount);
    }
    if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
        dungeon.stats.creatures_annoyed += 1;
    }
}

fn wants_a_home(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, pos) = (creature.owner, creature.pos);
    let found = ctx
        .world
        .rooms
        .nearest_room_of_role_with_capacity(owner, RoomRole::LAIR, pos, 1)
        .map(|room| head_for_room(ctx, id, room, CreatureStateId::CreatureAtNewLair))
        .unwrap_or(false);
    if !found {
        tracing::debug!("Creature {} found no place for a lair", id.0);
        annoy(ctx, id, AngerReason::NoLair);
        machine::set_start_state(ctx, id);
    }
}

fn at_new_lair(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, old) = (creature.owner, creature.lair_room);
    let room = room_of_role_owned(ctx, creature.target_room, owner, RoomRole::LAIR).filter(|r| inside_room(ctx, id, *r));
    let Some(room) = room else {
        machine::set_start_state(ctx, id);
        return;
    };
    if let Some(old) = old.filter(|old| *old != room) {
        ctx.world.rooms.remove_occupant(old, id);
    }
    if ctx.world.rooms.add_occupant(room, id) {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.lair_room = Some(room);
            creature.mood.calm(AngerReason::NoLair);
        }
        tracing::debug!("Creature {} made its lair in room {}", id.0, room.0);
    } else {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.lair_room = None;
        }
        annoy(ctx, id, AngerReason::NoLair);
    }
    machine::set_start_state(ctx, id);
}

fn going_home_to_sleep(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(lair) = valid_lair(ctx, id) else {
        machine::set_start_state(ctx, id);
        return;
    };
    if inside_room(ctx, id, lair) {
        machine::set_state(ctx, id, CreatureStateId::AtLairToSleep);
        return;
    }
    if !head_for_room(ctx, id, lair, CreatureStateId::AtLairToSleep) {
        machine::set_start_state(ctx, id);
    }
}

fn at_lair_to_sleep(ctx: &mut SimulationContext, id: CreatureId) {
    let turns = ctx.config.sleep_turns;
    machine::set_state(ctx, id, CreatureStateId::CreatureSleep);
    if let Some(creature) = ctx.creature_mut(id) {
        creature.countdown = turns;
    }
}

fn sulk_head_for_lair(ctx: &mut SimulationContext, id: CreatureId) {
    let turns = ctx.config.sleep_turns;
    let Some(lair) = valid_lair(ctx, id) else {
        machine::set_start_state(ctx, id);
        return;
    };
    if let Some(creature) = ctx.creature_mut(id) {
        creature.countdown = turns;
    }
    if inside_room(ctx, id, lair) {
        machine::set_state(ctx, id, CreatureStateId::PersonSulkAtLair);
    } else if !head_for_room(ctx, id, lair, CreatureStateId::PersonSulkAtLair) {
        machine::set_start_state(ctx, id);
    }
}

fn work_kind(job: Job) -> Option<WorkKind> {
    match job {
        Job::RESEARCH => Some(WorkKind::Research),
        Job::MANUFACTURE => Some(WorkKind::Manufacture),
        Job::SCAVENGE => Some(WorkKind::Scavenge),
        _ => None,
    }
}

/// Pay for one training session; false when the keeper cannot afford it
fn charge_training(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let owner = creature.owner;
    let cost = ctx.services.economy.training_cost(&ctx.world, creature);
    if cost == 0 {
        return true;
    }
    if !ctx.services.economy.take_money(&mut ctx.world, owner, cost) {
        let turn = ctx.turn;
        ctx.services.events.output_message(turn, owner, GameMessage::NotEnoughGold);
        tracing::debug!("Player {} cannot afford training creature {}", owner.0, id.0);
        return false;
    }
    if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
        ctx.services.economy.add_work_points(dungeon, WorkKind::Training, cost as u64);
    }
    true
}

fn arrive_at_work_room(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let Some(state) = creature.active() else {
        return;
    };
    let (pos, owner, work_room) = (creature.pos, creature.owner, creature.work_room);
    let job = ctx.world.jobs.job_for_state(state);
    let cfg = ctx.world.jobs.config(job);
    let (work_state, role) = (cfg.continue_state, cfg.room_role);
    let room = ctx.world.map.room_at(pos.slab()).filter(|r| {
        ctx.world.rooms.get(*r).map(|room| room.kind.roles().intersects(role)).unwrap_or(false)
    });
    let Some(room) = room.filter(|_| work_state != CreatureStateId::Unused) else {
        tracing::debug!("Creature {} arrived for {} outside a fitting room", id.0, state);
        machine::set_start_state(ctx, id);
        return;
    };
    if work_room.is_some() && work_room != Some(room) {
        crate::states::cleanup::leave_work_room(ctx, id);
    }
    if !ctx.world.rooms.add_occupant(room, id) {
        if let Some(kind) = ctx.world.rooms.get(room).map(|r| r.kind) {
            let turn = ctx.turn;
            ctx.services.events.output_message(turn, owner, GameMessage::RoomTooSmall(kind));
        }
        machine::set_start_state(ctx, id);
        return;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.work_room = Some(room);
    }
    if job == Job::TRAIN && !charge_training(ctx, id) {
        machine::set_start_state(ctx, id);
        return;
    }
    let turns = ctx.config.work_session_turns;
    machine::set_state(ctx, id, work_state);
    if let Some(creature) = ctx.creature_mut(id) {
        creature.countdown = turns;
    }
    tracing::debug!("Creature {} started {} in room {}", id.0, ctx.world.jobs.code_name(job), room.0);
}

fn work_in_room(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let Some(state) = creature.active() else {
        return;
    };
    let owner = creature.owner;
    let model = ctx.world.models.get(creature.model);
    let job = ctx.world.jobs.job_for_state(state);
    let room = creature.work_room.filter(|r| inside_room(ctx, id, *r));
    let Some(room) = room else {
        machine::set_start_state(ctx, id);
        return;
    };
    let points = match job {
        Job::RESEARCH => model.research_value,
        Job::MANUFACTURE => model.manufacture_value,
        Job::SCAVENGE => model.scavenge_value,
        _ => 0,
    };
    if let (Some(kind), true) = (work_kind(job), points > 0) {
        if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
            ctx.services.economy.add_work_points(dungeon, kind, points as u64);
        }
    }
    if !tick_countdown(ctx, id) {
        return;
    }

    match job {
        Job::TRAIN => {
            let level = match ctx.creature_mut(id) {
                Some(creature) => {
                    creature.exp_level = (creature.exp_level + 1).min(MAX_EXP_LEVEL);
                    creature.exp_level
                }
                None => return,
            };
            tracing::info!("Creature {} trained to level {}", id.0, level);
            if level >= MAX_EXP_LEVEL || !charge_training(ctx, id) {
                machine::set_start_state(ctx, id);
                return;
            }
            let turns = ctx.config.work_session_turns;
            if let Some(creature) = ctx.creature_mut(id) {
                creature.countdown = turns;
            }
        }
        Job::PAINFUL_TORTURE => {
            let Some(keeper) = ctx.world.rooms.get(room).map(|r| r.owner) else {
                return;
            };
            tracing::info!("Creature {} broke under torture and joins player {}", id.0, keeper.0);
            machine::set_start_state(ctx, id);
            ctx.world.creatures.change_owner(id, keeper, &ctx.stats);
            if let Some(creature) = ctx.creature_mut(id) {
                for reason in AngerReason::ALL {
                    creature.mood.calm(reason);
                }
                creature.lair_room = None;
            }
            machine::set_start_state(ctx, id);
        }
        _ => {
            if matches!(job, Job::KINKY_TORTURE | Job::TEMPLE_PRAY) {
                if let Some(creature) = ctx.creature_mut(id) {
                    for reason in AngerReason::ALL {
                        creature.mood.calm(reason);
                    }
                }
            }
            if valid_lair(ctx, id).is_some() {
                machine::initialise_state(ctx, id, CreatureStateId::CreatureGoingHomeToSleep);
            } else {
                machine::set_start_state(ctx, id);
            }
        }
    }
}

fn arrived_at_prison(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(pos) = ctx.creature(id).map(|c| c.pos) else {
        return;
    };
    let prison = ctx.world.map.room_at(pos.slab()).filter(|r| {
        ctx.world.rooms.get(*r).map(|room| room.kind.roles().intersects(RoomRole::PRISON)).unwrap_or(false)
    });
    match prison {
        Some(room) if ctx.world.rooms.add_occupant(room, id) => {
            if let Some(creature) = ctx.creature_mut(id) {
                creature.work_room = Some(room);
            }
            machine::set_state(ctx, id, CreatureStateId::CreatureInPrison);
        }
        _ => machine::set_start_state(ctx, id),
    }
}

fn in_prison(ctx: &mut SimulationContext, id: CreatureId) {
    let held = ctx
        .creature(id)
        .and_then(|c| c.work_room)
        .and_then(|r| ctx.world.rooms.get(r))
        .map(|r| r.kind.roles().intersects(RoomRole::PRISON))
        .unwrap_or(false);
    if !held {
        tracing::debug!("Creature {} walks out of a prison which is gone", id.0);
        machine::set_start_state(ctx, id);
    }
}

fn wants_salary(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, pos) = (creature.owner, creature.pos);
    let here = room_of_role_owned(ctx, ctx.world.map.room_at(pos.slab()), owner, RoomRole::GOLD_STORAGE);
    if let Some(room) = here {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.target_room = Some(room);
        }
        machine::set_state(ctx, id, CreatureStateId::CreatureTakeSalary);
        return;
    }
    let moving = nearest_room(ctx, owner, RoomRole::GOLD_STORAGE, pos)
        .map(|room| head_for_room(ctx, id, room, CreatureStateId::CreatureWantsSalary))
        .unwrap_or(false);
    if !moving {
        machine::set_start_state(ctx, id);
    }
}

fn take_salary(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let owner = creature.owner;
    let pay = ctx.services.economy.creature_pay(&ctx.world, creature);
    let turn = ctx.turn;
    if ctx.services.economy.take_money(&mut ctx.world, owner, pay) {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.paydays_owed = creature.paydays_owed.saturating_sub(1);
            creature.timers.last_paid_turn = turn;
            creature.mood.calm(AngerReason::NotPaid);
        }
        if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
            dungeon.stats.salaries_paid += pay as u64;
        }
        tracing::debug!("Creature {} took {} gold of salary", id.0, pay);
    } else {
        ctx.services.events.output_message(turn, owner, GameMessage::NotEnoughGold);
        annoy(ctx, id, AngerReason::NotPaid);
        if let Some(creature) = ctx.creature_mut(id) {
            creature.paydays_owed = 0;
        }
    }
    machine::set_start_state(ctx, id);
}

fn slap_cowers(ctx: &mut SimulationContext, id: CreatureId) {
    if tick_countdown(ctx, id) {
        machine::restore_saved_state(ctx, id);
    }
}

fn unconscious(ctx: &mut SimulationContext, id: CreatureId) {
    if ctx.creature(id).map(|c| c.is_being_dragged()).unwrap_or(true) {
        return;
    }
    countdown_to_start(ctx, id);
}

fn set_work_room_based_on_position(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let pos = creature.pos;
    let model = ctx.world.models.get(creature.model);
    let has_jobs = model.job_primary | model.job_secondary;
    let job = ctx
        .world
        .map
        .room_at(pos.slab())
        .and_then(|r| ctx.world.rooms.get(r))
        .map(|room| ctx.world.jobs.job_for_room_role(room.kind.roles(), JobFlags::HUMAN_DROP, has_jobs))
        .unwrap_or(Job::NULL);
    if !job.is_null()
        && creature_can_do_job_near_position(ctx, id, pos, job, JobCheckFlags::NONE)
        && send_creature_to_job_near_position(ctx, id, pos, job)
    {
        return;
    }
    machine::set_start_state(ctx, id);
}

fn seek_the_enemy(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(pos) = ctx.creature(id).map(|c| c.pos) else {
        return;
    };
    let Some((enemy, enemy_pos)) = nearest_enemy(ctx, id) else {
        machine::set_start_state(ctx, id);
        return;
    };
    if pos.distance(&enemy_pos) <= 1 {
        machine::set_state(ctx, id, CreatureStateId::CreatureInCombat);
        if let Some(creature) = ctx.creature_mut(id) {
            creature.combat_target = Some(enemy);
        }
        return;
    }
    if !machine::move_to(ctx, id, enemy_pos, CreatureStateId::SeekTheEnemy) {
        machine::set_start_state(ctx, id);
    }
}

/// Candidates the explorer tries to reach, nearest first
const EXPLORE_ATTEMPTS: usize = 8;

fn explore_dungeon(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, pos) = (creature.owner, creature.pos);
    let here = pos.slab();
    for dy in -1..=1 {
        for dx in -1..=1 {
            ctx.world.map.reveal(owner, here.offset(dx, dy));
        }
    }
    let mut unexplored: Vec<SlabCoord> = ctx
        .world
        .map
        .coords()
        .filter(|slab| !ctx.world.map.is_revealed(owner, *slab) && ctx.world.map.kind(*slab).is_passable())
        .collect();
    unexplored.sort_by_key(|slab| slab.center().distance(&pos));
    for slab in unexplored.into_iter().take(EXPLORE_ATTEMPTS) {
        if machine::move_to(ctx, id, slab.center(), CreatureStateId::CreatureExploreDungeon) {
            return;
        }
    }
    tracing::debug!("Creature {} has nothing left to explore", id.0);
    machine::set_start_state(ctx, id);
}

fn freeze_prisoners(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return;
    };
    let Some(prison) = ctx.world.rooms.room_of_role_with_used_capacity(owner, RoomRole::PRISON) else {
        machine::set_start_state(ctx, id);
        return;
    };
    if !inside_room(ctx, id, prison) {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.countdown = 0;
        }
        if !head_for_room(ctx, id, prison, CreatureStateId::CreatureFreezePrisoners) {
            machine::set_start_state(ctx, id);
        }
        return;
    }
    let turns = ctx.config.work_session_turns;
    if session_over(ctx, id, turns) {
        machine::set_start_state(ctx, id);
    }
}

fn follow_leader(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let pos = creature.pos;
    let leader = creature.group_leader.and_then(|l| ctx.creature(l)).filter(|l| l.is_active()).map(|l| l.pos);
    let Some(leader_pos) = leader else {
        if let Some(creature) = ctx.creature_mut(id) {
            creature.group_leader = None;
        }
        machine::set_start_state(ctx, id);
        return;
    };
    if pos.distance(&leader_pos) > FOLLOW_DISTANCE {
        machine::move_to(ctx, id, leader_pos, CreatureStateId::CreatureFollowLeader);
    }
}

fn at_call_to_arms(ctx: &mut SimulationContext, id: CreatureId) {
    if !ctx.creature(id).map(|c| c.flags.called_to_arms).unwrap_or(false) {
        machine::set_start_state(ctx, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::ModelId;
    use crate::world::map::SlabKind;
    use crate::world::rooms::RoomKind;
    use crate::world::World;

    const WARLOCK: ModelId = ModelId(1);
    const ORC: ModelId = ModelId(3);

    fn context() -> SimulationContext {
        let mut world = World::new(16, 10).unwrap();
        for y in 2..8 {
            for x in 2..14 {
                world.map.set_slab(SlabCoord::new(x, y), SlabKind::Claimed, PlayerId::new(0)).unwrap();
            }
        }
        world.map.reveal_all(PlayerId::new(0));
        SimulationContext::new(world, SimulationConfig::default(), 11).unwrap()
    }

    fn room(ctx: &mut SimulationContext, kind: RoomKind, slabs: &[SlabCoord]) -> RoomId {
        let config = ctx.config.clone();
        ctx.world.rooms.create_room(&mut ctx.world.map, kind, PlayerId::new(0), slabs, &config).unwrap()
    }

    fn run_until(ctx: &mut SimulationContext, id: CreatureId, state: CreatureStateId, limit: usize) -> bool {
        for _ in 0..limit {
            if ctx.creature(id).map(|c| c.is_in_state(state)).unwrap_or(false) {
                return true;
            }
            process_creature_state(ctx, id);
        }
        false
    }

    #[test]
    fn test_move_arrives_in_continue_state() {
        let mut ctx = context();
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(3, 3).center()).unwrap();
        let target = SlabCoord::new(6, 3).center();
        assert!(machine::move_to(&mut ctx, id, target, CreatureStateId::CreatureBeHappy));
        assert!(run_until(&mut ctx, id, CreatureStateId::CreatureBeHappy, 20), "walk should end on arrival");
        let creature = ctx.creature(id).unwrap();
        assert_eq!(creature.pos, target);
        assert!(creature.moveto_pos.is_none());
    }

    #[test]
    fn test_move_to_lost_room_gives_up() {
        let mut ctx = context();
        let library = room(&mut ctx, RoomKind::Library, &[SlabCoord::new(10, 5)]);
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(3, 3).center()).unwrap();
        assert!(machine::move_to(&mut ctx, id, SlabCoord::new(10, 5).center(), CreatureStateId::AtResearchRoom));
        ctx.creature_mut(id).unwrap().target_room = Some(library);
        ctx.world.rooms.remove_slab(&mut ctx.world.map, library, SlabCoord::new(10, 5)).unwrap();

        process_creature_state(&mut ctx, id);
        let creature = ctx.creature(id).unwrap();
        assert!(creature.is_in_state(CreatureStateId::CreatureDoingNothing), "the walk is abandoned");
    }

    #[test]
    fn test_digger_state_on_non_digger_is_counted() {
        let mut ctx = context();
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(3, 3).center()).unwrap();
        machine::set_state(&mut ctx, id, CreatureStateId::ImpDigsDirt);
        process_creature_state(&mut ctx, id);
        assert_eq!(ctx.stats.get(ErrorStatKind::WrongCreatureClass), 1);
        assert!(ctx.creature(id).unwrap().is_in_state(CreatureStateId::CreatureDoingNothing));
    }

    #[test]
    fn test_corrupted_state_falls_back() {
        let mut ctx = context();
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(3, 3).center()).unwrap();
        ctx.creature_mut(id).unwrap().active_state = 9_999;
        process_creature_state(&mut ctx, id);
        assert!(ctx.stats.get(ErrorStatKind::StateOutOfRange) >= 1);
        assert!(ctx.creature(id).unwrap().is_in_state(CreatureStateId::CreatureDoingNothing));
    }

    #[test]
    fn test_research_session_adds_points() {
        let mut ctx = context();
        let slab = SlabCoord::new(8, 4);
        let library = room(&mut ctx, RoomKind::Library, &[slab]);
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), slab.center()).unwrap();
        machine::set_state(&mut ctx, id, CreatureStateId::AtResearchRoom);

        process_creature_state(&mut ctx, id);
        let creature = ctx.creature(id).unwrap();
        assert!(creature.is_in_state(CreatureStateId::Researching));
        assert_eq!(creature.work_room, Some(library));
        assert!(ctx.world.rooms.get(library).unwrap().occupants.contains(&id));

        process_creature_state(&mut ctx, id);
        process_creature_state(&mut ctx, id);
        assert_eq!(ctx.world.dungeons[0].research_points, 2 * ctx.world.models.get(WARLOCK).research_value as u64);
    }

    #[test]
    fn test_training_without_money_stops() {
        let mut ctx = context();
        let slab = SlabCoord::new(8, 4);
        room(&mut ctx, RoomKind::Training, &[slab]);
        let id = ctx.spawn_creature(ORC, PlayerId::new(0), slab.center()).unwrap();
        machine::set_state(&mut ctx, id, CreatureStateId::AtTrainingRoom);

        process_creature_state(&mut ctx, id);
        assert!(ctx.creature(id).unwrap().is_in_state(CreatureStateId::CreatureDoingNothing));
        assert!(ctx.services.events.has_message(PlayerId::new(0), GameMessage::NotEnoughGold));
        assert!(ctx.creature(id).unwrap().work_room.is_none(), "the room place is given back");
    }

    #[test]
    fn test_training_session_raises_level() {
        let mut ctx = context();
        let slab = SlabCoord::new(8, 4);
        room(&mut ctx, RoomKind::Training, &[slab]);
        ctx.world.dungeons[0].offmap_money = 1_000;
        ctx.config.work_session_turns = 3;
        let id = ctx.spawn_creature(ORC, PlayerId::new(0), slab.center()).unwrap();
        machine::set_state(&mut ctx, id, CreatureStateId::AtTrainingRoom);

        for _ in 0..4 {
            process_creature_state(&mut ctx, id);
        }
        let cost = ctx.world.models.get(ORC).training_cost as i64;
        assert_eq!(ctx.creature(id).unwrap().exp_level, 2);
        assert_eq!(ctx.world.dungeons[0].offmap_money, 1_000 - 2 * cost, "each session is paid up front");
        assert!(ctx.creature(id).unwrap().is_in_state(CreatureStateId::Training));
    }

    #[test]
    fn test_salary_taken_in_treasury() {
        let mut ctx = context();
        let slab = SlabCoord::new(5, 5);
        let treasury = room(&mut ctx, RoomKind::Treasury, &[slab]);
        ctx.world.rooms.store_gold(treasury, 500);
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), slab.center()).unwrap();
        ctx.creature_mut(id).unwrap().paydays_owed = 1;

        assert!(run_until(&mut ctx, id, CreatureStateId::CreatureTakeSalary, 10));
        process_creature_state(&mut ctx, id);
        let pay = ctx.world.models.get(WARLOCK).pay;
        assert_eq!(ctx.creature(id).unwrap().paydays_owed, 0);
        assert_eq!(ctx.world.rooms.stored_gold(PlayerId::new(0)), 500 - pay);
        assert_eq!(ctx.world.dungeons[0].stats.salaries_paid, pay as u64);
    }

    #[test]
    fn test_unpaid_creature_is_annoyed() {
        let mut ctx = context();
        let slab = SlabCoord::new(5, 5);
        room(&mut ctx, RoomKind::Treasury, &[slab]);
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), slab.center()).unwrap();
        ctx.creature_mut(id).unwrap().paydays_owed = 1;

        assert!(run_until(&mut ctx, id, CreatureStateId::CreatureTakeSalary, 10));
        process_creature_state(&mut ctx, id);
        let creature = ctx.creature(id).unwrap();
        assert!(creature.mood.annoyance(AngerReason::NotPaid) > 0);
        assert_eq!(creature.paydays_owed, 0);
        assert!(ctx.services.events.has_message(PlayerId::new(0), GameMessage::NotEnoughGold));
    }

    #[test]
    fn test_countdown_state_returns_to_start() {
        let mut ctx = context();
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(3, 3).center()).unwrap();
        machine::set_state(&mut ctx, id, CreatureStateId::CreatureRoar);
        ctx.creature_mut(id).unwrap().countdown = 3;
        process_creature_state(&mut ctx, id);
        process_creature_state(&mut ctx, id);
        assert!(ctx.creature(id).unwrap().is_in_state(CreatureStateId::CreatureRoar));
        process_creature_state(&mut ctx, id);
        assert!(ctx.creature(id).unwrap().is_in_state(CreatureStateId::CreatureDoingNothing));
    }

    #[test]
    fn test_slap_resumes_previous_work() {
        let mut ctx = context();
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(3, 3).center()).unwrap();
        machine::set_state(&mut ctx, id, CreatureStateId::PatrolHere);
        assert!(machine::slap_creature(&mut ctx, id));
        for _ in 0..ctx.config.slap_cower_turns {
            process_creature_state(&mut ctx, id);
        }
        assert!(ctx.creature(id).unwrap().is_in_state(CreatureStateId::PatrolHere));
    }

    #[test]
    fn test_dragged_body_stays_unconscious() {
        let mut ctx = context();
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(3, 3).center()).unwrap();
        ctx.config.unconscious_turns = 2;
        assert!(make_unconscious(&mut ctx, id));
        ctx.creature_mut(id).unwrap().dragged_by = Some(CreatureId::new(99));
        for _ in 0..5 {
            process_creature_state(&mut ctx, id);
        }
        assert!(ctx.creature(id).unwrap().is_unconscious());
        ctx.creature_mut(id).unwrap().dragged_by = None;
        process_creature_state(&mut ctx, id);
        process_creature_state(&mut ctx, id);
        assert!(!ctx.creature(id).unwrap().is_unconscious());
    }

    #[test]
    fn test_idle_creature_without_work_moans_eventually() {
        let mut ctx = context();
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(6, 4).center()).unwrap();
        let mut moaned = false;
        for _ in 0..200 {
            process_creature_state(&mut ctx, id);
            if ctx.creature(id).unwrap().is_in_state(CreatureStateId::CreatureCannotFindAnythingToDo) {
                moaned = true;
                break;
            }
        }
        assert!(moaned, "a creature with no rooms should give up and moan");
    }

    #[test]
    fn test_new_lair_is_taken() {
        let mut ctx = context();
        let slab = SlabCoord::new(9, 6);
        let lair = room(&mut ctx, RoomKind::Lair, &[slab]);
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(3, 3).center()).unwrap();
        machine::set_state(&mut ctx, id, CreatureStateId::CreatureWantsAHome);

        assert!(run_until(&mut ctx, id, CreatureStateId::CreatureAtNewLair, 40));
        process_creature_state(&mut ctx, id);
        assert_eq!(ctx.creature(id).unwrap().lair_room, Some(lair));
        assert!(ctx.world.rooms.get(lair).unwrap().occupants.contains(&id));
    }
}
