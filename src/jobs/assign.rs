//! Job eligibility and assignment
//!
//! Two pipelines share the job table. The player pipeline asks whether a
//! creature may serve a player with a job at all, then sends it to the
//! nearest suitable room. The position pipeline asks the same for one map
//! subtile, which is what happens when a creature is dropped somewhere, and
//! starts the job right there.

use crate::core::types::{CreatureId, PlayerId, SubtileCoord};
use crate::entity::creature::{AngerReason, Creature, LastDidJob};
use crate::jobs::registry::{CoordsAssign, CoordsCheck, Job, JobFlags, PlayerAssign, PlayerCheck};
use crate::simulation::context::SimulationContext;
use crate::simulation::events::{EventKind, EventRecord, GameMessage};
use crate::states::cleanup::{leave_group, leave_work_room};
use crate::states::ids::CreatureStateId;
use crate::states::machine;
use crate::world::rooms::{RoomKind, WorkArea};

/// Experience level past which no training helps
pub const MAX_EXP_LEVEL: u8 = 10;

/// Side effects allowed when a check fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobCheckFlags(pub u8);

impl JobCheckFlags {
    pub const NONE: JobCheckFlags = JobCheckFlags(0);
    /// Tell the player which room is missing or too small
    pub const PLAY_MSG_ON_FAIL: JobCheckFlags = JobCheckFlags(1 << 0);
    /// Make a refusing creature moan about it
    pub const SET_STATE_ON_FAIL: JobCheckFlags = JobCheckFlags(1 << 1);

    pub fn contains(self, other: JobCheckFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for JobCheckFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        JobCheckFlags(self.0 | rhs.0)
    }
}

pub fn creature_has_job(ctx: &SimulationContext, creature: &Creature, job: Job) -> bool {
    let model = ctx.world.models.get(creature.model);
    (model.job_primary | model.job_secondary).intersects(job)
}

pub fn creature_dislikes_job(ctx: &SimulationContext, creature: &Creature, job: Job) -> bool {
    ctx.world.models.get(creature.model).jobs_not_do.intersects(job)
}

/// Refusal of disliked jobs, unless disobedience is switched off
pub fn creature_will_reject_job(ctx: &SimulationContext, creature: &Creature, job: Job) -> bool {
    ctx.config.job_disobedience_enabled && creature_dislikes_job(ctx, creature, job)
}

fn is_correct_owner(creature: &Creature, owner: PlayerId, flags: JobFlags) -> bool {
    if creature.owner == owner {
        if creature.is_digger {
            flags.contains(JobFlags::OWNED_DIGGERS)
        } else {
            flags.contains(JobFlags::OWNED_CREATURES)
        }
    } else if creature.is_digger {
        flags.contains(JobFlags::ENEMY_DIGGERS)
    } else {
        flags.contains(JobFlags::ENEMY_CREATURES)
    }
}

pub fn is_correct_owner_to_perform_job(ctx: &SimulationContext, creature: &Creature, player: PlayerId, job: Job) -> bool {
    is_correct_owner(creature, player, ctx.world.jobs.flags(job))
}

/// Whether the subtile holds the right room and belongs to the right keeper
pub fn is_correct_position_to_perform_job(
    ctx: &SimulationContext,
    creature: &Creature,
    stl: SubtileCoord,
    job: Job,
) -> bool {
    let slab = stl.slab();
    let role = ctx.world.jobs.room_role(job);
    if !role.is_none() {
        let Some(room) = ctx.world.map.room_at(slab).and_then(|r| ctx.world.rooms.get(r)) else {
            return false;
        };
        if !room.kind.roles().intersects(role) {
            return false;
        }
    }
    is_correct_owner(creature, ctx.world.map.owner(slab), ctx.world.jobs.flags(job))
}

fn creature_can_be_trained(creature: &Creature) -> bool {
    creature.exp_level < MAX_EXP_LEVEL
}

fn player_can_afford_to_train(ctx: &SimulationContext, creature: &Creature) -> bool {
    let cost = ctx.services.economy.training_cost(&ctx.world, creature);
    ctx.services.economy.available_money(&ctx.world, creature.owner) >= cost as i64
}

fn find_fight_event(ctx: &SimulationContext, player: PlayerId, kind: EventKind) -> Option<EventRecord> {
    let event = ctx.services.events.find_event(player, kind);
    // A heart under attack counts as a fight too
    let event = match (event, kind) {
        (None, EventKind::EnemyFight) => ctx.services.events.find_event(player, EventKind::HeartAttacked),
        (event, _) => event,
    };
    event.cloned()
}

fn player_check(ctx: &SimulationContext, creature: &Creature, check: PlayerCheck) -> bool {
    let model = ctx.world.models.get(creature.model);
    match check {
        PlayerCheck::Always => true,
        PlayerCheck::Training => creature_can_be_trained(creature) && player_can_afford_to_train(ctx, creature),
        PlayerCheck::Research => model.research_value > 0,
        PlayerCheck::Manufacturing => model.manufacture_value > 0,
        PlayerCheck::Scavenging => {
            let pay = ctx.services.economy.creature_pay(&ctx.world, creature);
            model.scavenge_value > 0 && ctx.services.economy.available_money(&ctx.world, creature.owner) >= pay as i64
        }
        PlayerCheck::FreezePrisoners => ctx
            .world
            .rooms
            .room_of_role_with_used_capacity(creature.owner, crate::world::rooms::RoomRole::PRISON)
            .is_some(),
        PlayerCheck::JoinFight => find_fight_event(ctx, creature.owner, EventKind::EnemyFight).is_some(),
        PlayerCheck::Barracking => {
            let active = ctx
                .world
                .creatures
                .player_creatures(creature.owner, &ctx.stats)
                .into_iter()
                .filter(|c| ctx.creature(*c).map(|c| c.is_active()).unwrap_or(false))
                .count();
            active > 1
        }
    }
}

fn room_message(ctx: &mut SimulationContext, player: PlayerId, kind: Option<RoomKind>, message: fn(RoomKind) -> GameMessage) {
    if let Some(kind) = kind {
        let turn = ctx.turn;
        ctx.services.events.output_message(turn, player, message(kind));
    }
}

/// Whether the creature can do the job for the player, wherever it is
pub fn creature_can_do_job_for_player(
    ctx: &mut SimulationContext,
    id: CreatureId,
    player: PlayerId,
    job: Job,
    flags: JobCheckFlags,
) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let name = ctx.world.jobs.code_name(job);
    if creature_will_reject_job(ctx, creature, job) {
        tracing::trace!("Creature {} will not do {}", id.0, name);
        return false;
    }
    if !is_correct_owner_to_perform_job(ctx, creature, player, job) {
        tracing::trace!("Creature {} has the wrong owner for {}", id.0, name);
        return false;
    }
    let cfg = ctx.world.jobs.config(job);
    if creature.flags.chicken && !cfg.flags.contains(JobFlags::ALLOW_CHICKENIZED) {
        return false;
    }
    let Some(check) = cfg.player_check else {
        tracing::warn!("Job {} has no player check", name);
        ctx.stats.inc(crate::core::stats::ErrorStatKind::MissingJobCallback);
        return false;
    };
    if !player_check(ctx, creature, check) {
        tracing::trace!("Creature {} failed the {:?} check for {}", id.0, check, name);
        return false;
    }

    let role = cfg.room_role;
    if role.is_none() {
        return true;
    }
    let needs_capacity = cfg.flags.contains(JobFlags::NEEDS_CAPACITY);
    let lair_size = ctx.world.models.get(creature.model).lair_size;
    if !ctx.world.rooms.player_has_room_of_role(player, role) {
        tracing::debug!("Player {} has no room for {}", player.0, name);
        if flags.contains(JobCheckFlags::PLAY_MSG_ON_FAIL) {
            room_message(ctx, player, RoomKind::for_role(role), GameMessage::RoomNeeded);
        }
        return false;
    }
    if needs_capacity {
        let needed = ctx.world.jobs.required_room_capacity(job, lair_size).max(1);
        if ctx.world.rooms.room_of_role_with_capacity(player, role, needed).is_none() {
            tracing::debug!("Player {} has no spare room capacity for {}", player.0, name);
            if flags.contains(JobCheckFlags::PLAY_MSG_ON_FAIL) {
                room_message(ctx, player, RoomKind::for_role(role), GameMessage::RoomTooSmall);
            }
            return false;
        }
    }
    true
}

fn work_area_for(flags: JobFlags) -> WorkArea {
    match (flags.contains(JobFlags::ON_AREA_BORDER), flags.contains(JobFlags::ON_AREA_CENTER)) {
        (true, false) => WorkArea::Border,
        (false, true) => WorkArea::Center,
        (true, true) => WorkArea::Whole,
        (false, false) => {
            tracing::warn!("Job without a room area preference, using the whole room");
            WorkArea::Whole
        }
    }
}

/// Drop whatever the creature does now and walk into the room to start the job
fn setup_move_for_job_in_room(
    ctx: &mut SimulationContext,
    id: CreatureId,
    room: crate::core::types::RoomId,
    job: Job,
    then: CreatureStateId,
) -> bool {
    let area = work_area_for(ctx.world.jobs.flags(job));
    let seed = ctx.random(u32::MAX);
    let Some(pos) = ctx.world.rooms.get(room).and_then(|r| r.work_position(area, seed)) else {
        return false;
    };
    let Some(from) = ctx.creature(id).map(|c| c.pos) else {
        return false;
    };
    if !ctx.services.navigator.can_navigate_to(&ctx.world.map, from, pos) {
        return false;
    }
    machine::abandon_current_state(ctx, id);
    leave_work_room(ctx, id);
    if !machine::move_to(ctx, id, pos, then) {
        return false;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.target_room = Some(room);
    }
    true
}

fn assign_for_player(ctx: &mut SimulationContext, id: CreatureId, job: Job, assign: PlayerAssign) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let (owner, from) = (creature.owner, creature.pos);
    let lair_size = ctx.world.models.get(creature.model).lair_size;
    let cfg = ctx.world.jobs.config(job);
    let (role, initial, event_kind) = (cfg.room_role, cfg.initial_state, cfg.event_kind);
    match assign {
        PlayerAssign::WorkInRoom => {
            let needed = if cfg.flags.contains(JobFlags::NEEDS_CAPACITY) {
                ctx.world.jobs.required_room_capacity(job, lair_size).max(1)
            } else {
                0
            };
            let Some(room) = ctx.world.rooms.nearest_room_of_role_with_capacity(owner, role, from, needed) else {
                return false;
            };
            if initial == CreatureStateId::Unused {
                tracing::error!("Job {} has no state to arrive in", ctx.world.jobs.code_name(job));
                return false;
            }
            setup_move_for_job_in_room(ctx, id, room, job, initial)
        }
        PlayerAssign::InStateOnRoomContent => {
            if ctx.world.rooms.room_of_role_with_used_capacity(owner, role).is_none() {
                tracing::warn!("No occupied room for {} by creature {}", ctx.world.jobs.code_name(job), id.0);
                return false;
            }
            machine::initialise_state(ctx, id, initial)
        }
        PlayerAssign::MoveToEvent => {
            let Some(event) = event_kind.and_then(|kind| find_fight_event(ctx, owner, kind)) else {
                tracing::warn!("No event to perform {} by creature {}", ctx.world.jobs.code_name(job), id.0);
                return false;
            };
            if !ctx.services.navigator.can_navigate_to(&ctx.world.map, from, event.pos) {
                return false;
            }
            machine::abandon_current_state(ctx, id);
            leave_work_room(ctx, id);
            machine::move_to(ctx, id, event.pos, initial)
        }
        PlayerAssign::InStateInternal => machine::initialise_state(ctx, id, initial),
    }
}

/// Control and group bookkeeping after a job was started
fn job_started(ctx: &mut SimulationContext, id: CreatureId, job: Job) {
    let flags = ctx.world.jobs.flags(job);
    if let Some(creature) = ctx.creature_mut(id) {
        creature.flags.no_comp_control = flags.contains(JobFlags::NO_SELF_CONTROL);
    }
    if flags.contains(JobFlags::NO_GROUPS) {
        leave_group(ctx, id);
    }
}

/// Start the job for the player; eligibility must have been checked
pub fn send_creature_to_job_for_player(ctx: &mut SimulationContext, id: CreatureId, player: PlayerId, job: Job) -> bool {
    let Some(assign) = ctx.world.jobs.config(job).player_assign else {
        tracing::error!("Job {} has no player assignment", ctx.world.jobs.code_name(job));
        ctx.stats.inc(crate::core::stats::ErrorStatKind::MissingJobCallback);
        return false;
    };
    tracing::debug!("Sending creature {} to {} for player {}", id.0, ctx.world.jobs.code_name(job), player.0);
    if !assign_for_player(ctx, id, job, assign) {
        return false;
    }
    job_started(ctx, id, job);
    true
}

fn coords_check(ctx: &SimulationContext, creature: &Creature, stl: SubtileCoord, check: CoordsCheck) -> bool {
    let model = ctx.world.models.get(creature.model);
    match check {
        CoordsCheck::Always => true,
        CoordsCheck::Research => model.research_value > 0,
        CoordsCheck::Training => creature_can_be_trained(creature),
        CoordsCheck::Manufacturing => model.manufacture_value > 0,
        CoordsCheck::Scavenging => model.scavenge_value > 0,
        CoordsCheck::PlaceInVault => creature.gold_carried > 0,
        CoordsCheck::TakeSalary => {
            let Some(room) = ctx.world.map.room_at(stl.slab()).and_then(|r| ctx.world.rooms.get(r)) else {
                return false;
            };
            // Only an empty treasury needs a closer look at the purse
            if room.used_capacity > 0 {
                return true;
            }
            let offmap = ctx.world.dungeon(creature.owner).map(|d| d.offmap_money).unwrap_or(0);
            offmap >= ctx.services.economy.creature_pay(&ctx.world, creature) as i64
        }
        CoordsCheck::TakeSleep => !matches!(
            creature.active(),
            Some(CreatureStateId::CreatureSleep | CreatureStateId::AtLairToSleep)
        ),
    }
}

/// Whether the creature can do the job at the given subtile
pub fn creature_can_do_job_near_position(
    ctx: &mut SimulationContext,
    id: CreatureId,
    stl: SubtileCoord,
    job: Job,
    flags: JobCheckFlags,
) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let model = ctx.world.models.get(creature.model);
    let (annoy, lair_size) = (model.annoy_will_not_do_job, model.lair_size);
    if creature_will_reject_job(ctx, creature, job) {
        tracing::debug!("Creature {} refuses {} at ({}, {})", id.0, ctx.world.jobs.code_name(job), stl.x, stl.y);
        if flags.contains(JobCheckFlags::SET_STATE_ON_FAIL) {
            let moan = ctx.config.moan_countdown;
            if let Some(creature) = ctx.creature_mut(id) {
                creature.mood.annoy(AngerReason::Rejected, annoy);
            }
            machine::initialise_state(ctx, id, CreatureStateId::CreatureMoan);
            if let Some(creature) = ctx.creature_mut(id) {
                creature.countdown = moan;
            }
        }
        return false;
    }
    let cfg = ctx.world.jobs.config(job);
    if creature.flags.chicken && !cfg.flags.contains(JobFlags::ALLOW_CHICKENIZED) {
        return false;
    }
    if !is_correct_position_to_perform_job(ctx, creature, stl, job) {
        tracing::trace!("Wrong place for {} at ({}, {})", cfg.name, stl.x, stl.y);
        return false;
    }
    let Some(check) = cfg.coords_check else {
        tracing::debug!("Job {} cannot be started at a position", cfg.name);
        return false;
    };
    if !coords_check(ctx, creature, stl, check) {
        return false;
    }
    if cfg.flags.contains(JobFlags::NEEDS_CAPACITY) {
        let needed = ctx.world.jobs.required_room_capacity(job, lair_size);
        let Some(room) = ctx.world.map.room_at(stl.slab()).and_then(|r| ctx.world.rooms.get(r)) else {
            return false;
        };
        // Creatures already inside count as fitting
        if !room.occupants.contains(&id) && !room.has_spare_capacity(needed) {
            let (owner, kind) = (room.owner, room.kind);
            if flags.contains(JobCheckFlags::PLAY_MSG_ON_FAIL) {
                room_message(ctx, owner, Some(kind), GameMessage::RoomTooSmall);
            }
            return false;
        }
    }
    true
}

fn assign_near_position(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord, job: Job, assign: CoordsAssign) -> bool {
    let initial = ctx.world.jobs.config(job).initial_state;
    let room = ctx.world.map.room_at(stl.slab()).filter(|r| ctx.world.rooms.get(*r).is_some());
    match assign {
        CoordsAssign::WorkInRoom | CoordsAssign::WorkInRoomAndCure => {
            let Some(room) = room else {
                return false;
            };
            if initial == CreatureStateId::Unused {
                tracing::error!("Job {} has no state to arrive in", ctx.world.jobs.code_name(job));
                return false;
            }
            if !setup_move_for_job_in_room(ctx, id, room, job, initial) {
                tracing::warn!("Creature {} could not move in room to do {}", id.0, ctx.world.jobs.code_name(job));
                return false;
            }
            if let Some(creature) = ctx.creature_mut(id) {
                if assign == CoordsAssign::WorkInRoomAndCure {
                    creature.flags.chicken = false;
                }
                if creature.is_digger {
                    creature.digger.task_repeats = 0;
                    creature.job_assigned = job;
                    creature.digger.last_did_job = LastDidJob::NonDiggerTask;
                }
            }
            true
        }
        CoordsAssign::SleepInLair => {
            let Some(room) = room else {
                return false;
            };
            let own_lair = ctx.creature(id).map(|c| c.lair_room == Some(room)).unwrap_or(false);
            let then = if own_lair {
                CreatureStateId::CreatureGoingHomeToSleep
            } else {
                CreatureStateId::CreatureChangeLair
            };
            setup_move_for_job_in_room(ctx, id, room, job, then)
        }
        CoordsAssign::InStateInternal => machine::initialise_state(ctx, id, initial),
    }
}

/// Start the job at the subtile; eligibility must have been checked
pub fn send_creature_to_job_near_position(ctx: &mut SimulationContext, id: CreatureId, stl: SubtileCoord, job: Job) -> bool {
    let Some(assign) = ctx.world.jobs.config(job).coords_assign else {
        tracing::error!("Job {} has no position assignment", ctx.world.jobs.code_name(job));
        ctx.stats.inc(crate::core::stats::ErrorStatKind::MissingJobCallback);
        return false;
    };
    if !assign_near_position(ctx, id, stl, job, assign) {
        return false;
    }
    job_started(ctx, id, job);
    true
}

/// Order in which the preference scan visits jobs: every table row once,
/// starting at `start`, skipping the empty row and jobs not in `jobs`
pub fn preference_order(table_count: usize, start: usize, jobs: Job) -> impl Iterator<Item = Job> {
    (0..table_count)
        .map(move |i| (start + i) % table_count.max(1))
        .filter(|idx| *idx != 0)
        .map(Job::from_index)
        .filter(move |job| jobs.contains(*job))
}

/// Try the preferred jobs round-robin from a random row
pub fn attempt_job_preference(ctx: &mut SimulationContext, id: CreatureId, jobs: Job) -> bool {
    let count = ctx.world.jobs.count();
    if count < 1 {
        return false;
    }
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    let start = ctx.random(count as u32) as usize;
    for job in preference_order(count, start, jobs) {
        if creature_can_do_job_for_player(ctx, id, owner, job, JobCheckFlags::NONE)
            && send_creature_to_job_for_player(ctx, id, owner, job)
        {
            return true;
        }
    }
    false
}

/// Weighted pick among the secondary jobs, with a rare visit to the temple
pub fn attempt_job_secondary_preference(ctx: &mut SimulationContext, id: CreatureId, jobs: Job) -> bool {
    let buckets = jobs.count();
    if buckets == 0 {
        return false;
    }
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    let select_val = ctx.random(512);
    let select_delta = 512 / buckets;
    let mut select_curr = select_delta;
    for idx in 1..ctx.world.jobs.count() {
        let job = Job::from_index(idx);
        if !jobs.contains(job) {
            continue;
        }
        if select_val <= select_curr {
            select_curr += select_delta;
        } else if creature_can_do_job_for_player(ctx, id, owner, job, JobCheckFlags::NONE)
            && send_creature_to_job_for_player(ctx, id, owner, job)
        {
            return true;
        }
    }
    if ctx.random(100) == 0 {
        let job = Job::TEMPLE_PRAY;
        if creature_can_do_job_for_player(ctx, id, owner, job, JobCheckFlags::NONE)
            && send_creature_to_job_for_player(ctx, id, owner, job)
        {
            return ctx.creature(id).map(|c| !creature_dislikes_job(ctx, c, job)).unwrap_or(false);
        }
    }
    false
}

/// Secondary jobs are considered at most once per interval
pub fn creature_try_doing_secondary_job(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let interval = ctx.config.secondary_job_interval;
    let turn = ctx.turn;
    let Some(creature) = ctx.creature_mut(id) else {
        return false;
    };
    if turn.saturating_sub(creature.timers.job_secondary_check_turn) <= interval {
        return false;
    }
    creature.timers.job_secondary_check_turn = turn;
    let model = creature.model;
    let jobs = ctx.world.models.get(model).job_secondary;
    attempt_job_secondary_preference(ctx, id, jobs)
}

/// Remember a job the creature keeps returning to when idle
pub fn set_creature_assigned_job(ctx: &mut SimulationContext, id: CreatureId, job: Job) {
    if let Some(creature) = ctx.creature_mut(id) {
        creature.job_assigned = job;
    }
}

/// Retry the remembered job, forgetting it once it can no longer be done
pub fn attempt_assigned_job(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let (job, owner) = (creature.job_assigned, creature.owner);
    if job.is_null() {
        return false;
    }
    if ctx.world.jobs.config(job).player_assign.is_none() {
        return false;
    }
    if creature_can_do_job_for_player(ctx, id, owner, job, JobCheckFlags::NONE)
        && send_creature_to_job_for_player(ctx, id, owner, job)
    {
        return true;
    }
    set_creature_assigned_job(ctx, id, Job::NULL);
    false
}
