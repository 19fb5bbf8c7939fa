//! Jobs an angry creature turns to
//!
//! A livid creature picks one of the anger jobs of its model, starting at a
//! random one among those set, and performs the first one that can be
//! started. Each attempt checks first that the creature may leave its
//! current state for the anger state.

use serde::{Deserialize, Serialize};

use crate::core::types::{CreatureId, PlayerId, SubtileCoord, PLAYERS_COUNT};
use crate::entity::creature::{AngerReason, Creature};
use crate::jobs::registry::Job;
use crate::simulation::context::SimulationContext;
use crate::simulation::events::GameMessage;
use crate::states::ids::CreatureStateId;
use crate::states::machine::{self, can_change_from_state_to, creature_state_category, request_state};
use crate::states::table::StateCategory;
use crate::world::rooms::{RoomKind, RoomRole, WorkArea};

/// Set of anger jobs; bit order is the dispatch order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AngerJobs(pub u32);

impl AngerJobs {
    pub const NONE: AngerJobs = AngerJobs(0);
    pub const KILL_CREATURES: AngerJobs = AngerJobs(1 << 0);
    pub const DESTROY_ROOMS: AngerJobs = AngerJobs(1 << 1);
    pub const LEAVE_DUNGEON: AngerJobs = AngerJobs(1 << 2);
    pub const STEAL_GOLD: AngerJobs = AngerJobs(1 << 3);
    pub const DAMAGE_WALLS: AngerJobs = AngerJobs(1 << 4);
    pub const MAD_PSYCHO: AngerJobs = AngerJobs(1 << 5);
    pub const PERSUADE: AngerJobs = AngerJobs(1 << 6);
    pub const JOIN_ENEMY: AngerJobs = AngerJobs(1 << 7);
    pub const KILL_DIGGERS: AngerJobs = AngerJobs(1 << 8);

    /// Number of dispatch slots
    pub const COUNT: u32 = 9;

    pub fn contains(self, other: AngerJobs) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn from_slot(slot: u32) -> AngerJobs {
        AngerJobs(1 << slot)
    }

    pub fn from_name(name: &str) -> Option<AngerJobs> {
        let job = match name.to_ascii_uppercase().as_str() {
            "KILL_CREATURES" => AngerJobs::KILL_CREATURES,
            "DESTROY_ROOMS" => AngerJobs::DESTROY_ROOMS,
            "LEAVE_DUNGEON" => AngerJobs::LEAVE_DUNGEON,
            "STEAL_GOLD" => AngerJobs::STEAL_GOLD,
            "DAMAGE_WALLS" => AngerJobs::DAMAGE_WALLS,
            "MAD_PSYCHO" => AngerJobs::MAD_PSYCHO,
            "PERSUADE" => AngerJobs::PERSUADE,
            "JOIN_ENEMY" => AngerJobs::JOIN_ENEMY,
            "KILL_DIGGERS" => AngerJobs::KILL_DIGGERS,
            _ => return None,
        };
        Some(job)
    }
}

impl std::ops::BitOr for AngerJobs {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        AngerJobs(self.0 | rhs.0)
    }
}

/// Persuaders lead at most this many followers out
const MAX_PERSUADED: usize = 5;

/// Whether nothing holds the creature back from acting on its anger
pub fn creature_free_for_anger_job(creature: &Creature) -> bool {
    !creature.flags.called_to_arms && !creature.flags.chicken && !creature.flags.picked_up && !creature.flags.controlled
}

/// A walkable spot inside the nearest entrance of the creature's owner
pub(crate) fn entrance_position(ctx: &mut SimulationContext, id: CreatureId) -> Option<SubtileCoord> {
    let creature = ctx.creature(id)?;
    let (owner, from) = (creature.owner, creature.pos);
    let role = ctx.world.jobs.room_role(Job::EXEMPT);
    let room = ctx
        .world
        .rooms
        .rooms_of_role(owner, if role.is_none() { RoomRole::ENTRANCE } else { role })
        .min_by_key(|r| r.center().distance(&from))
        .map(|r| r.id)?;
    let seed = ctx.random(u32::MAX);
    ctx.world.rooms.get(room)?.work_position(WorkArea::Whole, seed)
}

fn reachable(ctx: &SimulationContext, id: CreatureId, pos: SubtileCoord) -> bool {
    ctx.creature(id)
        .map(|c| ctx.services.navigator.can_navigate_to(&ctx.world.map, c.pos, pos))
        .unwrap_or(false)
}

fn message(ctx: &mut SimulationContext, player: PlayerId, message: GameMessage) {
    let turn = ctx.turn;
    ctx.services.events.output_message(turn, player, message);
}

fn attempt_kill_creatures(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    request_state(ctx, id, CreatureStateId::CreatureKillCreatures)
}

fn attempt_kill_diggers(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    if !can_change_from_state_to(ctx, id, CreatureStateId::CreatureKillCreatures) {
        return false;
    }
    let victim = ctx
        .world
        .creatures
        .player_diggers(owner, &ctx.stats)
        .into_iter()
        .find(|d| *d != id && ctx.creature(*d).map(|c| c.is_active()).unwrap_or(false));
    let Some(victim) = victim else {
        return false;
    };
    if !request_state(ctx, id, CreatureStateId::CreatureKillCreatures) {
        return false;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.combat_target = Some(victim);
    }
    true
}

fn attempt_destroy_rooms(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    if !can_change_from_state_to(ctx, id, CreatureStateId::CreatureVandaliseRooms) {
        return false;
    }
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let (owner, from) = (creature.owner, creature.pos);
    let room = ctx
        .world
        .rooms
        .iter()
        .filter(|r| r.owner == owner && !matches!(r.kind, RoomKind::DungeonHeart | RoomKind::Entrance))
        .min_by_key(|r| r.center().distance(&from))
        .map(|r| r.id);
    let Some(room) = room else {
        return false;
    };
    let seed = ctx.random(u32::MAX);
    let Some(pos) = ctx.world.rooms.get(room).and_then(|r| r.work_position(WorkArea::Whole, seed)) else {
        return false;
    };
    if !reachable(ctx, id, pos) {
        return false;
    }
    if !request_state(ctx, id, CreatureStateId::CreatureVandaliseRooms) {
        return false;
    }
    if !machine::move_to(ctx, id, pos, CreatureStateId::CreatureVandaliseRooms) {
        return false;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.target_room = Some(room);
    }
    message(ctx, owner, GameMessage::CreatureDestroysRooms);
    true
}

fn attempt_steal_gold(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let gold_hold = ctx.world.models.get(creature.model).gold_hold;
    if creature.gold_carried >= gold_hold {
        return false;
    }
    if !can_change_from_state_to(ctx, id, CreatureStateId::CreatureStealGold) {
        return false;
    }
    let (owner, from) = (creature.owner, creature.pos);
    let room = ctx
        .world
        .rooms
        .rooms_of_role(owner, RoomRole::GOLD_STORAGE)
        .filter(|r| r.used_capacity > 0)
        .min_by_key(|r| r.center().distance(&from))
        .map(|r| r.id);
    let Some(room) = room else {
        return false;
    };
    let seed = ctx.random(u32::MAX);
    let Some(pos) = ctx.world.rooms.get(room).and_then(|r| r.work_position(WorkArea::Whole, seed)) else {
        return false;
    };
    if !reachable(ctx, id, pos) {
        return false;
    }
    if !request_state(ctx, id, CreatureStateId::CreatureStealGold) {
        return false;
    }
    if !machine::move_to(ctx, id, pos, CreatureStateId::CreatureSearchForGoldToStealInRoom1) {
        return false;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.target_room = Some(room);
    }
    true
}

/// Walk to the nearest entrance and leave the dungeon through it
pub fn attempt_leave_dungeon(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    if !can_change_from_state_to(ctx, id, CreatureStateId::CreatureLeavingDungeon) {
        return false;
    }
    let Some(pos) = entrance_position(ctx, id) else {
        return false;
    };
    if !reachable(ctx, id, pos) {
        return false;
    }
    if !request_state(ctx, id, CreatureStateId::CreatureLeavingDungeon) {
        return false;
    }
    if !machine::move_to(ctx, id, pos, CreatureStateId::CreatureLeaves) {
        return false;
    }
    if let Some(owner) = ctx.creature(id).map(|c| c.owner) {
        message(ctx, owner, GameMessage::CreatureLeaving);
    }
    true
}

/// Own floor next to a wall that can be battered
fn damage_walls_position(ctx: &mut SimulationContext, owner: PlayerId) -> Option<SubtileCoord> {
    let candidates: Vec<SubtileCoord> = ctx
        .world
        .map
        .coords()
        .filter(|slab| ctx.world.map.is_players_land(owner, *slab))
        .filter(|slab| slab.around().any(|side| is_damageable_wall(ctx, side)))
        .map(|slab| slab.center())
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let pick = ctx.random(candidates.len() as u32) as usize;
    candidates.get(pick).copied()
}

pub(crate) fn is_damageable_wall(ctx: &SimulationContext, slab: crate::core::types::SlabCoord) -> bool {
    let kind = ctx.world.map.kind(slab);
    kind.is_filled() && !kind.is_indestructible()
}

fn attempt_damage_walls(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    if !can_change_from_state_to(ctx, id, CreatureStateId::CreatureAttemptToDamageWalls) {
        return false;
    }
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    let Some(pos) = damage_walls_position(ctx, owner) else {
        return false;
    };
    if !reachable(ctx, id, pos) {
        return false;
    }
    if !request_state(ctx, id, CreatureStateId::CreatureAttemptToDamageWalls) {
        return false;
    }
    if !machine::move_to(ctx, id, pos, CreatureStateId::CreatureAttemptToDamageWalls) {
        return false;
    }
    message(ctx, owner, GameMessage::CreatureDestroysRooms);
    true
}

fn attempt_mad_psycho(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    if !request_state(ctx, id, CreatureStateId::MadKillingPsycho) {
        return false;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.flags.mad_killing = true;
    }
    true
}

fn start_persuading(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    if creature.exp_level <= ctx.config.persuade_min_level {
        return false;
    }
    if !can_change_from_state_to(ctx, id, CreatureStateId::CreaturePersuade) {
        return false;
    }
    let (owner, level) = (creature.owner, creature.exp_level);
    let active = ctx
        .world
        .creatures
        .player_creatures(owner, &ctx.stats)
        .into_iter()
        .filter(|c| ctx.creature(*c).map(|c| c.is_active()).unwrap_or(false))
        .count();
    let limit = active.saturating_sub(1).min(MAX_PERSUADED);
    if limit == 0 {
        return false;
    }
    let count = ctx.random(limit as u32) as usize + 1;
    if !request_state(ctx, id, CreatureStateId::CreaturePersuade) {
        return false;
    }

    let candidates: Vec<CreatureId> = ctx
        .world
        .creatures
        .player_creatures(owner, &ctx.stats)
        .into_iter()
        .filter(|c| *c != id)
        .filter(|c| ctx.creature(*c).map(|c| c.is_active() && c.exp_level < level).unwrap_or(false))
        .take(count)
        .collect();
    let mut followers = Vec::with_capacity(candidates.len());
    for follower in candidates {
        if request_state(ctx, follower, CreatureStateId::CreatureFollowLeader) {
            if let Some(creature) = ctx.creature_mut(follower) {
                creature.group_leader = Some(id);
            }
            followers.push(follower);
        }
    }
    tracing::debug!("Creature {} persuaded {} followers", id.0, followers.len());
    if let Some(creature) = ctx.creature_mut(id) {
        creature.persuade_targets = followers;
    }
    message(ctx, owner, GameMessage::CreaturePersuaded);
    true
}

/// Persuade followers to leave together; a persuader who cannot start
/// leaves alone instead
fn attempt_persuade(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    if start_persuading(ctx, id) {
        return true;
    }
    attempt_leave_dungeon(ctx, id)
}

/// Defect to a random other keeper. Always reports failure, so the search
/// for an anger job goes on.
fn attempt_join_enemy(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    let (owner, from) = (creature.owner, creature.pos);
    let start = ctx.random(PLAYERS_COUNT as u32) as usize;
    for step in 0..PLAYERS_COUNT {
        let player = PlayerId::new(((start + step) % PLAYERS_COUNT) as u8);
        if player.is_neutral() || player == owner {
            continue;
        }
        let Some(dungeon) = ctx.world.dungeon(player) else {
            continue;
        };
        if dungeon.lost || !dungeon.in_play {
            continue;
        }
        let Some(heart) = dungeon.heart else {
            continue;
        };
        if !ctx.services.navigator.can_navigate_to(&ctx.world.map, from, heart) {
            continue;
        }
        tracing::info!("Creature {} of player {} joins player {}", id.0, owner.0, player.0);
        ctx.world.creatures.change_owner(id, player, &ctx.stats);
        if let Some(creature) = ctx.creature_mut(id) {
            for reason in AngerReason::ALL {
                creature.mood.calm(reason);
            }
        }
        message(ctx, owner, GameMessage::CreatureJoinedEnemy);
        machine::set_start_state(ctx, id);
        break;
    }
    false
}

/// Try one anger job
pub fn attempt_anger_job(ctx: &mut SimulationContext, id: CreatureId, job: AngerJobs) -> bool {
    match job {
        AngerJobs::KILL_CREATURES => attempt_kill_creatures(ctx, id),
        AngerJobs::DESTROY_ROOMS => attempt_destroy_rooms(ctx, id),
        AngerJobs::LEAVE_DUNGEON => attempt_leave_dungeon(ctx, id),
        AngerJobs::STEAL_GOLD => attempt_steal_gold(ctx, id),
        AngerJobs::DAMAGE_WALLS => attempt_damage_walls(ctx, id),
        AngerJobs::MAD_PSYCHO => attempt_mad_psycho(ctx, id),
        AngerJobs::PERSUADE => attempt_persuade(ctx, id),
        AngerJobs::JOIN_ENEMY => attempt_join_enemy(ctx, id),
        AngerJobs::KILL_DIGGERS => attempt_kill_diggers(ctx, id),
        _ => false,
    }
}

/// Start one of the model's anger jobs, beginning at a random set bit
pub fn find_and_perform_anger_job(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(jobs) = ctx.creature(id).map(|c| ctx.world.models.get(c.model).jobs_anger) else {
        return false;
    };
    let set = jobs.count();
    if set == 0 {
        return false;
    }
    // Slot of the n-th set bit
    let n = ctx.random(set) + 1;
    let mut seen = 0;
    let mut slot = 0;
    for k in 0..AngerJobs::COUNT {
        if jobs.contains(AngerJobs::from_slot(k)) {
            seen += 1;
            if seen == n {
                slot = k;
                break;
            }
        }
    }
    for _ in 0..AngerJobs::COUNT {
        let job = AngerJobs::from_slot(slot);
        if jobs.contains(job) && attempt_anger_job(ctx, id, job) {
            tracing::debug!("Creature {} started anger job {:?}", id.0, job);
            return true;
        }
        slot = (slot + 1) % AngerJobs::COUNT;
    }
    false
}

/// Periodic anger check; returns true when an anger job was started
pub fn process_anger_check(ctx: &mut SimulationContext, id: CreatureId) -> bool {
    let Some(creature) = ctx.creature(id) else {
        return false;
    };
    if creature_state_category(ctx, id) == StateCategory::AngerJob {
        return false;
    }
    let level = ctx.world.models.get(creature.model).annoy_level;
    if !creature.mood.is_livid(level) || !creature_free_for_anger_job(creature) {
        return false;
    }
    if (ctx.turn + id.0 as u64) & ctx.config.anger_check_mask != 0 {
        return false;
    }
    find_and_perform_anger_job(ctx, id)
}
