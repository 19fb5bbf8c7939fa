//! Tick system - advances the dungeon one turn
//!
//! Each tick: pay day bookkeeping, then every living creature in store
//! order gets its needs checked, its anger checked and its active state
//! processed. Whatever changed is reported back as `SimulationEvent`s.

use serde::Serialize;

use crate::core::types::{CreatureId, PlayerId, Tick};
use crate::entity::creature::AngerReason;
use crate::jobs::anger::process_anger_check;
use crate::simulation::context::SimulationContext;
use crate::states::behaviors::{annoy, process_creature_state};
use crate::states::ids::CreatureStateId;

/// Events generated during a simulation tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SimulationEvent {
    /// A creature ended the tick in a different state than it started in
    StateChanged {
        creature: CreatureId,
        from: CreatureStateId,
        to: CreatureStateId,
        tick: Tick,
    },
    /// The anger check sent a livid creature off on an anger job
    AngerJobStarted {
        creature: CreatureId,
        state: CreatureStateId,
        tick: Tick,
    },
    /// A creature walked out of its keeper's dungeon
    CreatureLeft {
        creature: CreatureId,
        owner: PlayerId,
        tick: Tick,
    },
    /// Wages fell due for the keeper's creatures
    PayDay {
        player: PlayerId,
        creatures: usize,
        tick: Tick,
    },
}

/// Run one turn of the simulation
pub fn run_simulation_tick(ctx: &mut SimulationContext) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    ctx.turn += 1;

    let interval = ctx.config.pay_day_interval;
    if interval > 0 && ctx.turn % interval == 0 {
        pay_day(ctx, &mut events);
    }

    let ids: Vec<CreatureId> = ctx.world.creatures.iter().map(|c| c.id).collect();
    for id in ids {
        process_creature(ctx, id, &mut events);
    }
    events
}

fn state_of(ctx: &SimulationContext, id: CreatureId) -> CreatureStateId {
    ctx.creature(id).and_then(|c| c.active()).unwrap_or_default()
}

fn process_creature(ctx: &mut SimulationContext, id: CreatureId, events: &mut Vec<SimulationEvent>) {
    let Some(owner) = ctx.creature(id).map(|c| c.owner) else {
        return;
    };
    let tick = ctx.turn;
    let from = state_of(ctx, id);

    update_hunger(ctx, id);
    if process_anger_check(ctx, id) {
        let state = state_of(ctx, id);
        tracing::debug!("Creature {} lost its temper and went for {}", id.0, state);
        events.push(SimulationEvent::AngerJobStarted { creature: id, state, tick });
    }
    if ctx.creature(id).is_some() {
        process_creature_state(ctx, id);
    }

    if ctx.creature(id).is_none() {
        events.push(SimulationEvent::CreatureLeft { creature: id, owner, tick });
        return;
    }
    let to = state_of(ctx, id);
    if to != from {
        events.push(SimulationEvent::StateChanged { creature: id, from, to, tick });
    }
}

/// Annoy a creature once every hunger interval it goes without food
fn update_hunger(ctx: &mut SimulationContext, id: CreatureId) {
    let interval = ctx.config.hunger_interval;
    let Some(creature) = ctx.creature(id) else {
        return;
    };
    if creature.is_digger || interval == 0 {
        return;
    }
    let starving = ctx.turn.saturating_sub(creature.timers.last_eat_turn);
    if starving >= interval && starving % interval == 0 {
        annoy(ctx, id, AngerReason::Hungry);
    }
}

fn pay_day(ctx: &mut SimulationContext, events: &mut Vec<SimulationEvent>) {
    let tick = ctx.turn;
    let players: Vec<PlayerId> = ctx.world.dungeons.iter().filter(|d| !d.lost).map(|d| d.owner).collect();
    for player in players {
        if let Some(dungeon) = ctx.world.dungeon_mut(player) {
            dungeon.last_pay_day = tick;
        }
        let mut paid = 0;
        for id in ctx.world.creatures.player_creatures(player, &ctx.stats) {
            let Some(creature) = ctx.creature(id) else {
                continue;
            };
            if creature.is_digger || ctx.world.models.get(creature.model).pay == 0 {
                continue;
            }
            if creature.paydays_owed > 0 {
                annoy(ctx, id, AngerReason::NotPaid);
            }
            if let Some(creature) = ctx.creature_mut(id) {
                creature.paydays_owed += 1;
            }
            paid += 1;
        }
        if paid > 0 {
            tracing::info!("Pay day for player {}: {} creatures expect wages", player.0, paid);
            events.push(SimulationEvent::PayDay { player, creatures: paid, tick });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{ModelId, SlabCoord};
    use crate::world::map::SlabKind;
    use crate::world::World;

    const IMP: ModelId = ModelId(0);
    const WARLOCK: ModelId = ModelId(1);

    fn context() -> SimulationContext {
        let mut world = World::new(12, 8).unwrap();
        for y in 2..6 {
            for x in 2..10 {
                world.map.set_slab(SlabCoord::new(x, y), SlabKind::Claimed, PlayerId::new(0)).unwrap();
            }
        }
        SimulationContext::new(world, SimulationConfig::default(), 9).unwrap()
    }

    #[test]
    fn test_tick_advances_turn() {
        let mut ctx = context();
        run_simulation_tick(&mut ctx);
        run_simulation_tick(&mut ctx);
        assert_eq!(ctx.turn, 2);
    }

    #[test]
    fn test_pay_day_skips_diggers() {
        let mut ctx = context();
        ctx.config.pay_day_interval = 1;
        let imp = ctx.spawn_creature(IMP, PlayerId::new(0), SlabCoord::new(3, 3).center()).unwrap();
        let warlock = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(6, 3).center()).unwrap();

        let events = run_simulation_tick(&mut ctx);
        assert!(events.contains(&SimulationEvent::PayDay { player: PlayerId::new(0), creatures: 1, tick: 1 }));
        assert_eq!(ctx.creature(imp).unwrap().paydays_owed, 0);
        assert_eq!(ctx.creature(warlock).unwrap().paydays_owed, 1, "no treasury, so the wage stays owed");
    }

    #[test]
    fn test_second_missed_pay_day_annoys() {
        let mut ctx = context();
        ctx.config.pay_day_interval = 1;
        let warlock = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(6, 3).center()).unwrap();
        run_simulation_tick(&mut ctx);
        assert_eq!(ctx.creature(warlock).unwrap().mood.annoyance(AngerReason::NotPaid), 0);
        run_simulation_tick(&mut ctx);
        assert!(ctx.creature(warlock).unwrap().mood.annoyance(AngerReason::NotPaid) > 0);
    }

    #[test]
    fn test_leaving_creature_is_reported() {
        let mut ctx = context();
        let id = ctx.spawn_creature(WARLOCK, PlayerId::new(0), SlabCoord::new(6, 3).center()).unwrap();
        crate::states::machine::set_state(&mut ctx, id, CreatureStateId::CreatureLeaves);
        let events = run_simulation_tick(&mut ctx);
        assert!(events.contains(&SimulationEvent::CreatureLeft { creature: id, owner: PlayerId::new(0), tick: 1 }));
        assert!(ctx.creature(id).is_none());
    }
}
