//! Place and object checks shared by discovery and checkout
//!
//! Discovery uses these to decide what goes on the stack; checkout repeats
//! them because the world may have changed since the stack was built.

use crate::core::types::{nearest_side_of_slab, CreatureId, PlayerId, SlabCoord, SubtileCoord, ThingId, SMALL_AROUND};
use crate::digger::claims::{someone_else_working_on_slab, will_soon_be_arming_trap, will_soon_be_working_at};
use crate::simulation::context::SimulationContext;
use crate::states::ids::CreatureStateId;
use crate::world::map::SlabKind;
use crate::world::rooms::{room_role_matches, RoomRole};
use crate::world::things::{Thing, ThingKind};

/// Whether a digger of `player` should carry the thing to a room of `role`.
///
/// Neutral things may be taken from anywhere but enemy ground, own things
/// from neutral ground, and enemy things only once they lie on own ground.
/// Own things already on own ground only move when `allow_stored` is set or
/// they are not yet inside a room of the role.
pub fn thing_can_be_picked_to_place_in_player_room_of_role(
    ctx: &SimulationContext,
    thing: &Thing,
    player: PlayerId,
    role: RoomRole,
    allow_stored: bool,
) -> bool {
    if !thing.kind.is_room_inventory(role) || !thing.is_on_floor() {
        return false;
    }
    let slab = thing.pos.slab();
    if !ctx.world.map.is_revealed(player, slab) {
        return false;
    }
    let slab_owner = ctx.world.map.owner(slab);
    if thing.owner.is_neutral() {
        slab_owner.is_neutral() || slab_owner == player
    } else if thing.owner == player {
        if slab_owner.is_neutral() {
            return true;
        }
        if slab_owner != player {
            return false;
        }
        if allow_stored {
            return true;
        }
        let stored = ctx
            .world
            .map
            .room_at(slab)
            .and_then(|room| ctx.world.rooms.get(room))
            .map(|room| room_role_matches(room.kind, role))
            .unwrap_or(false);
        !stored
    } else {
        slab_owner == player
    }
}

/// Unclaimed path next to the player's land, nobody improving it yet
pub fn check_place_to_pretty(ctx: &SimulationContext, id: CreatureId, slab: SlabCoord) -> bool {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    let map = &ctx.world.map;
    map.kind(slab) == SlabKind::Path
        && map.is_revealed(owner, slab)
        && map.slab_by_players_land(owner, slab)
        && !someone_else_working_on_slab(ctx, id, slab.center(), CreatureStateId::ImpImprovesDungeon)
}

/// Whether the slab is claimed floor of a player who may be converted from
pub fn player_can_claim_slab(ctx: &SimulationContext, player: PlayerId, slab: SlabCoord) -> bool {
    let map = &ctx.world.map;
    matches!(map.kind(slab), SlabKind::Claimed | SlabKind::RoomFloor)
        && map.owner(slab).is_enemy(player)
        && map.slab_by_players_land(player, slab)
}

/// Enemy floor next to the player's land, nobody converting it yet
pub fn check_place_to_convert(ctx: &SimulationContext, id: CreatureId, slab: SlabCoord) -> bool {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return false;
    };
    ctx.world.map.is_revealed(owner, slab)
        && player_can_claim_slab(ctx, owner, slab)
        && !someone_else_working_on_slab(ctx, id, slab.center(), CreatureStateId::ImpConvertsDungeon)
}

/// Earth next to the player's land which nobody tagged for digging
pub fn check_place_to_reinforce(ctx: &SimulationContext, player: PlayerId, slab: SlabCoord) -> bool {
    let map = &ctx.world.map;
    if !map.kind(slab).is_friable_dirt() || !map.is_revealed(player, slab) || !map.slab_by_players_land(player, slab) {
        return false;
    }
    ctx.world.dungeon(player).map(|d| d.find_dig_task(slab.center()).is_none()).unwrap_or(false)
}

/// Free subtile next to the wall to reinforce it from, nearest side first
pub fn uncrowded_reinforce_position(ctx: &SimulationContext, id: CreatureId, wall: SubtileCoord) -> Option<SubtileCoord> {
    let creature = ctx.creature(id)?;
    let slab = wall.slab();
    let center = slab.center();
    let start = nearest_side_of_slab(slab, creature.pos);
    for n in 0..SMALL_AROUND.len() {
        let (dx, dy) = SMALL_AROUND[(start + n) % SMALL_AROUND.len()];
        let pos = center.offset(2 * dx, 2 * dy);
        if !ctx.world.map.is_players_land(creature.owner, pos.slab()) {
            continue;
        }
        if someone_else_working_on_slab(ctx, id, pos, CreatureStateId::ImpReinforces) {
            continue;
        }
        if will_soon_be_working_at(ctx, id, pos) {
            continue;
        }
        if ctx.services.navigator.can_navigate_to(&ctx.world.map, creature.pos, pos) {
            return Some(pos);
        }
    }
    None
}

const DIG_POS_SHIFT: [i32; 3] = [0, -1, 1];

fn someone_digging_at(ctx: &SimulationContext, id: CreatureId, pos: SubtileCoord) -> bool {
    ctx.world.creatures.iter().any(|c| {
        c.id != id
            && c.alive
            && c.pos == pos
            && (c.is_in_state(CreatureStateId::ImpDigsDirt) || c.is_in_state(CreatureStateId::ImpMinesGold))
    })
}

/// Subtile to stand on while digging the slab of `task_stl`.
///
/// Sides are tried nearest first. On each side the middle subtile is
/// preferred, then its two neighbours along the slab edge.
pub fn dig_position(ctx: &SimulationContext, id: CreatureId, task_stl: SubtileCoord) -> Option<SubtileCoord> {
    let creature = ctx.creature(id)?;
    let slab = task_stl.slab();
    if !ctx.world.map.block_has_diggable_side(slab) {
        return None;
    }
    let center = slab.center();
    let start = nearest_side_of_slab(slab, creature.pos);
    let sides = SMALL_AROUND.len();
    for i in 0..sides {
        let n = (start + i) % sides;
        let (dx, dy) = SMALL_AROUND[n];
        let base = center.offset(2 * dx, 2 * dy);
        if !ctx.world.map.valid_dig_position(creature.owner, base) {
            continue;
        }
        for shift in DIG_POS_SHIFT {
            let (sx, sy) = SMALL_AROUND[(n as i32 + shift).rem_euclid(sides as i32) as usize];
            let pos = if shift == 0 { base } else { base.offset(sx, sy) };
            if !ctx.world.map.valid_dig_position(creature.owner, pos) {
                continue;
            }
            if someone_digging_at(ctx, id, pos) || will_soon_be_working_at(ctx, id, pos) {
                continue;
            }
            if ctx.services.navigator.can_navigate_to(&ctx.world.map, creature.pos, pos) {
                return Some(pos);
            }
        }
    }
    None
}

/// Loose gold lying exactly on the subtile
pub fn gold_pile_at(ctx: &SimulationContext, stl: SubtileCoord) -> Option<ThingId> {
    ctx.world.things.at_subtile(stl).find(|t| t.kind.is_gold_pile()).map(|t| t.id)
}

/// A spell the player may take to a library
pub fn spell_to_pick_at(ctx: &SimulationContext, player: PlayerId, stl: SubtileCoord) -> Option<ThingId> {
    ctx.world
        .things
        .at_subtile(stl)
        .find(|t| {
            t.kind.is_spell_object()
                && thing_can_be_picked_to_place_in_player_room_of_role(ctx, t, player, RoomRole::POWERS_STORAGE, false)
        })
        .map(|t| t.id)
}

/// The `nth` crate at the subtile which the player may haul to a workshop
pub fn crate_to_pick_at(
    ctx: &SimulationContext,
    player: PlayerId,
    stl: SubtileCoord,
    allow_stored: bool,
    nth: usize,
) -> Option<ThingId> {
    ctx.world
        .things
        .at_subtile(stl)
        .filter(|t| {
            t.kind.is_workshop_crate()
                && thing_can_be_picked_to_place_in_player_room_of_role(
                    ctx,
                    t,
                    player,
                    RoomRole::CRATES_STORAGE,
                    allow_stored,
                )
        })
        .nth(nth)
        .map(|t| t.id)
}

/// A corpse at the subtile still worth a graveyard
pub fn corpse_to_pick_at(ctx: &SimulationContext, player: PlayerId, stl: SubtileCoord) -> Option<ThingId> {
    ctx.world
        .things
        .at_subtile(stl)
        .find(|t| t.kind.is_collectable_corpse() && ctx.world.map.is_revealed(player, t.pos.slab()))
        .map(|t| t.id)
}

/// Unconscious creature at the subtile nobody is dragging yet. With `own`
/// the creature must belong to `player`, otherwise to one of its enemies.
pub fn unconscious_at(ctx: &SimulationContext, player: PlayerId, stl: SubtileCoord, own: bool) -> Option<CreatureId> {
    ctx.world
        .creatures
        .iter()
        .find(|c| {
            c.pos == stl
                && c.is_unconscious()
                && !c.is_being_dragged()
                && if own { c.owner == player } else { player.is_enemy(c.owner) }
        })
        .map(|c| c.id)
}

/// An own spent trap of the model nobody is re-arming yet
pub fn empty_trap_for_crate(ctx: &SimulationContext, player: PlayerId, model: u8) -> Option<ThingId> {
    ctx.world
        .things
        .iter()
        .find(|t| {
            t.owner == player
                && matches!(t.kind, ThingKind::Trap { trap_model, shots: 0 } if trap_model == model)
                && !will_soon_be_arming_trap(ctx, t.id)
        })
        .map(|t| t.id)
}

/// Whether an enemy creature is within `slabs` slabs of the position
pub fn enemies_near(ctx: &SimulationContext, player: PlayerId, pos: SubtileCoord, slabs: i32) -> bool {
    let range = slabs * crate::core::types::STL_PER_SLAB;
    ctx.world
        .creatures
        .iter()
        .any(|c| c.is_active() && player.is_enemy(c.owner) && c.pos.distance(&pos) <= range)
}
