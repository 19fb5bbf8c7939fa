//! Anger job behaviors: what a livid creature does once it has picked a job

use crate::core::types::{CreatureId, PlayerId, SubtileCoord};
use crate::jobs::anger::{attempt_leave_dungeon, entrance_position, is_damageable_wall};
use crate::simulation::context::SimulationContext;
use crate::states::behaviors::head_for_room;
use crate::states::cleanup::{drop_dragged, leave_work_room, run_cleanup};
use crate::states::ids::CreatureStateId;
use crate::states::machine;
use crate::states::table::CleanupKind;
use crate::world::map::SlabKind;
use crate::world::rooms::RoomRole;

/// Attack a creature: the current opponent, or the nearest one. Ordinary
/// killers pick on their own side, psychos on anybody.
pub(crate) fn kill_creatures(ctx: &mut SimulationContext, id: CreatureId, psycho: bool) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, pos, current) = (creature.owner, creature.pos, creature.combat_target);
    let current = current.and_then(|t| ctx.creature(t)).filter(|t| t.is_active()).map(|t| (t.id, t.pos));
    let target = current.or_else(|| {
        ctx.world
            .creatures
            .iter()
            .filter(|c| c.id != id && c.is_active() && (psycho || c.owner == owner))
            .min_by_key(|c| c.pos.distance(&pos))
            .map(|c| (c.id, c.pos))
    });
    let Some((victim, victim_pos)) = target else {
        machine::set_start_state(ctx, id);
        return;
    };

    if pos.distance(&victim_pos) <= 1 {
        machine::set_state(ctx, id, CreatureStateId::CreatureInCombat);
        if let Some(creature) = ctx.creature_mut(id) {
            creature.combat_target = Some(victim);
        }
        tracing::debug!("Creature {} attacks creature {}", id.0, victim.0);
        return;
    }
    let state = if psycho { CreatureStateId::MadKillingPsycho } else { CreatureStateId::CreatureKillCreatures };
    if !machine::move_to(ctx, id, victim_pos, state) {
        machine::set_start_state(ctx, id);
        return;
    }
    if let Some(creature) = ctx.creature_mut(id) {
        creature.combat_target = Some(victim);
    }
}

pub(crate) fn vandalise_rooms(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, pos) = (creature.owner, creature.pos);
    let Some(room) = creature.target_room.filter(|r| ctx.world.rooms.get(*r).is_some()) else {
        machine::set_start_state(ctx, id);
        return;
    };
    let slab = pos.slab();
    if ctx.world.map.room_at(slab) != Some(room) {
        if !head_for_room(ctx, id, room, CreatureStateId::CreatureVandaliseRooms) {
            machine::set_start_state(ctx, id);
        }
        return;
    }

    let work = ctx.config.dig_work_turns as i32;
    let battered = match ctx.world.map.get_mut(slab) {
        Some(cell) => {
            cell.health += 1;
            cell.health >= work
        }
        None => false,
    };
    if !battered {
        return;
    }
    match ctx.world.rooms.remove_slab(&mut ctx.world.map, room, slab) {
        Ok(true) => {
            tracing::info!("Creature {} destroyed room {}", id.0, room.0);
            if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
                dungeon.stats.rooms_destroyed += 1;
            }
            machine::set_start_state(ctx, id);
        }
        Ok(false) => {
            if !head_for_room(ctx, id, room, CreatureStateId::CreatureVandaliseRooms) {
                machine::set_start_state(ctx, id);
            }
        }
        Err(err) => {
            tracing::warn!("Creature {} could not wreck ({}, {}): {}", id.0, slab.x, slab.y, err);
            machine::set_start_state(ctx, id);
        }
    }
}

/// Grab gold from the target treasury, then run for the exit
pub(crate) fn steal_gold(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    let (owner, pos, carried) = (creature.owner, creature.pos, creature.gold_carried);
    let hold = ctx.world.models.get(creature.model).gold_hold;
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
    if ctx.world.map.room_at(pos.slab()) != Some(room) {
        if !head_for_room(ctx, id, room, CreatureStateId::CreatureStealGold) {
            machine::set_start_state(ctx, id);
        }
        return;
    }

    let taken = ctx.world.rooms.take_gold(room, hold.saturating_sub(carried));
    if let Some(creature) = ctx.creature_mut(id) {
        creature.gold_carried += taken;
    }
    tracing::info!("Creature {} stole {} gold from player {}", id.0, taken, owner.0);
    machine::set_start_state(ctx, id);
    attempt_leave_dungeon(ctx, id);
}

/// Batter an adjacent wall until it crumbles into path
pub(crate) fn damage_walls(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(pos) = ctx.creature(id).map(|c| c.pos) else {
        return;
    };
    let Some(wall) = pos.slab().around().find(|side| is_damageable_wall(ctx, *side)) else {
        machine::set_start_state(ctx, id);
        return;
    };
    let work = ctx.config.dig_work_turns as i32;
    let crumbled = match ctx.world.map.get_mut(wall) {
        Some(cell) => {
            cell.health += 1;
            cell.health >= work
        }
        None => false,
    };
    if crumbled {
        tracing::debug!("Creature {} broke through ({}, {})", id.0, wall.x, wall.y);
        if let Err(err) = ctx.world.map.set_slab(wall, SlabKind::Path, PlayerId::NEUTRAL) {
            tracing::warn!("Wall at ({}, {}) could not be broken: {}", wall.x, wall.y, err);
            machine::set_start_state(ctx, id);
        }
    }
}

fn walk_out(ctx: &mut SimulationContext, id: CreatureId) -> Option<SubtileCoord> {
    let pos = entrance_position(ctx, id)?;
    machine::move_to(ctx, id, pos, CreatureStateId::CreatureLeaves).then_some(pos)
}

pub(crate) fn leaving_dungeon(ctx: &mut SimulationContext, id: CreatureId) {
    if walk_out(ctx, id).is_none() {
        creature_leaves(ctx, id);
    }
}

/// Remove the creature and everyone following it from the dungeon
pub(crate) fn creature_leaves(ctx: &mut SimulationContext, id: CreatureId) {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return;
    };
    let mut leaving: Vec<CreatureId> =
        ctx.world.creatures.iter().filter(|c| c.group_leader == Some(id)).map(|c| c.id).collect();
    leaving.push(id);

    for creature in leaving {
        drop_dragged(ctx, creature);
        leave_work_room(ctx, creature);
        if let Some(lair) = ctx.creature_mut(creature).and_then(|c| c.lair_room.take()) {
            ctx.world.rooms.remove_occupant(lair, creature);
        }
        ctx.world.creatures.kill(creature);
        if let Some(dungeon) = ctx.world.dungeon_mut(owner) {
            dungeon.stats.creatures_left += 1;
        }
        tracing::info!("Creature {} left the dungeon of player {}", creature.0, owner.0);
    }
}

pub(crate) fn persuade(ctx: &mut SimulationContext, id: CreatureId) {
    if walk_out(ctx, id).is_some() {
        return;
    }
    run_cleanup(ctx, id, CleanupKind::StopPersuade);
    machine::set_start_state(ctx, id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{ModelId, RoomId, SlabCoord};
    use crate::states::behaviors::process_creature_state;
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
        SimulationContext::new(world, SimulationConfig::default(), 5).unwrap()
    }

    fn room(ctx: &mut SimulationContext, kind: RoomKind, slab: SlabCoord) -> RoomId {
        let config = ctx.config.clone();
        ctx.world.rooms.create_room(&mut ctx.world.map, kind, PlayerId::new(0), &[slab], &config).unwrap()
    }

    #[test]
    fn test_vandal_wrecks_room() {
        let mut ctx = context();
        ctx.config.dig_work_turns = 3;
        let slab = SlabCoord::new(6, 4);
        let library = room(&mut ctx, RoomKind::Library, slab);
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), slab.center()).unwrap();
        machine::set_state(&mut ctx, id, CreatureStateId::CreatureVandaliseRooms);
        ctx.creature_mut(id).unwrap().target_room = Some(library);

        for _ in 0..3 {
            process_creature_state(&mut ctx, id);
        }
        assert!(ctx.world.rooms.get(library).is_none(), "the only slab was wrecked");
        assert_eq!(ctx.world.map.kind(slab), SlabKind::Claimed);
        assert_eq!(ctx.world.dungeons[0].stats.rooms_destroyed, 1);
        assert!(ctx.creature(id).unwrap().is_in_state(CreatureStateId::CreatureDoingNothing));
    }

    #[test]
    fn test_thief_grabs_gold_and_heads_out() {
        let mut ctx = context();
        let slab = SlabCoord::new(5, 5);
        let treasury = room(&mut ctx, RoomKind::Treasury, slab);
        ctx.world.rooms.store_gold(treasury, 300);
        room(&mut ctx, RoomKind::Entrance, SlabCoord::new(12, 6));
        let id = ctx.spawn_creature(ORC, PlayerId::new(0), slab.center()).unwrap();
        machine::set_state(&mut ctx, id, CreatureStateId::CreatureStealGold);
        ctx.creature_mut(id).unwrap().target_room = Some(treasury);

        process_creature_state(&mut ctx, id);
        let hold = ctx.world.models.get(ORC).gold_hold;
        let creature = ctx.creature(id).unwrap();
        assert_eq!(creature.gold_carried, hold);
        assert_eq!(ctx.world.rooms.stored_gold(PlayerId::new(0)), 300 - hold);
        assert_eq!(creature.continuing(), Some(CreatureStateId::CreatureLeaves), "the thief walks to the exit");
    }

    #[test]
    fn test_leader_takes_followers_along() {
        let mut ctx = context();
        let leader = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(4, 4).center()).unwrap();
        let follower = ctx.spawn_creature(ORC, PlayerId::new(0), SlabCoord::new(5, 4).center()).unwrap();
        ctx.creature_mut(follower).unwrap().group_leader = Some(leader);
        machine::set_state(&mut ctx, leader, CreatureStateId::CreatureLeaves);

        process_creature_state(&mut ctx, leader);
        assert!(ctx.creature(leader).is_none());
        assert!(ctx.creature(follower).is_none());
        assert_eq!(ctx.world.dungeons[0].stats.creatures_left, 2);
    }

    #[test]
    fn test_wall_crumbles_to_path() {
        let mut ctx = context();
        ctx.config.dig_work_turns = 2;
        let here = SlabCoord::new(2, 2);
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), here.center()).unwrap();
        machine::set_state(&mut ctx, id, CreatureStateId::CreatureAttemptToDamageWalls);

        process_creature_state(&mut ctx, id);
        process_creature_state(&mut ctx, id);
        let broken = here.around().filter(|s| ctx.world.map.kind(*s) == SlabKind::Path).count();
        assert_eq!(broken, 1, "exactly one wall should have given way");
    }

    #[test]
    fn test_psycho_attacks_anyone_adjacent() {
        let mut ctx = context();
        let psycho = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SubtileCoord::new(12, 12)).unwrap();
        let victim = ctx.spawn_creature(ORC, PlayerId::new(1), SubtileCoord::new(13, 12)).unwrap();
        machine::set_state(&mut ctx, psycho, CreatureStateId::MadKillingPsycho);

        process_creature_state(&mut ctx, psycho);
        let creature = ctx.creature(psycho).unwrap();
        assert!(creature.is_in_state(CreatureStateId::CreatureInCombat));
        assert_eq!(creature.combat_target, Some(victim));
    }

    #[test]
    fn test_persuader_without_exit_gives_up() {
        let mut ctx = context();
        let leader = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(4, 4).center()).unwrap();
        let follower = ctx.spawn_creature(ORC, PlayerId::new(0), SlabCoord::new(5, 4).center()).unwrap();
        machine::set_state(&mut ctx, leader, CreatureStateId::CreaturePersuade);
        ctx.creature_mut(follower).unwrap().group_leader = Some(leader);
        ctx.creature_mut(leader).unwrap().persuade_targets = vec![follower];

        process_creature_state(&mut ctx, leader);
        assert!(ctx.creature(follower).unwrap().group_leader.is_none());
        assert!(ctx.creature(leader).unwrap().is_in_state(CreatureStateId::CreatureDoingNothing));
    }
}
