//! Simulation context
//!
//! Owns everything a creature tick may touch. Every tick entry point and
//! every state handler takes `&mut SimulationContext`; there is no hidden
//! global state besides the read-only default config.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::error::{DungeonError, Result};
use crate::core::stats::ErrorStats;
use crate::core::types::{CreatureId, ModelId, PlayerId, SubtileCoord, Tick};
use crate::entity::creature::Creature;
use crate::simulation::services::Services;
use crate::states::machine;
use crate::world::World;

#[derive(Debug)]
pub struct SimulationContext {
    pub turn: Tick,
    pub rng: ChaCha8Rng,
    pub world: World,
    pub services: Services,
    pub stats: ErrorStats,
    pub config: SimulationConfig,
}

impl SimulationContext {
    /// A context with the default services
    pub fn new(world: World, config: SimulationConfig, seed: u64) -> Result<Self> {
        Self::with_services(world, config, seed, Services::default())
    }

    pub fn with_services(world: World, config: SimulationConfig, seed: u64, services: Services) -> Result<Self> {
        config.validate().map_err(DungeonError::Config)?;
        world.jobs.validate()?;
        Ok(Self {
            turn: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            world,
            services,
            stats: ErrorStats::new(),
            config,
        })
    }

    /// Uniform integer in `0..n`; 0 when `n` is 0
    pub fn random(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }

    /// True once in `one_in` calls on average
    pub fn chance(&mut self, one_in: u32) -> bool {
        one_in > 0 && self.random(one_in) == 0
    }

    pub fn creature(&self, id: CreatureId) -> Option<&Creature> {
        self.world.creatures.get(id)
    }

    pub fn creature_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.world.creatures.get_mut(id)
    }

    /// Spawn a creature and put it into its start state
    pub fn spawn_creature(&mut self, model: ModelId, owner: PlayerId, pos: SubtileCoord) -> Result<CreatureId> {
        let is_digger = self.world.models.try_get(model)?.is_digger;
        if !self.world.map.in_bounds(pos.slab()) {
            return Err(DungeonError::OutOfBounds(pos.x, pos.y));
        }
        let id = self.world.creatures.spawn(model, owner, pos, is_digger, &self.stats)?;
        if let Some(creature) = self.world.creatures.get_mut(id) {
            creature.timers.job_secondary_check_turn = self.turn;
            creature.timers.last_eat_turn = self.turn;
            creature.timers.last_paid_turn = self.turn;
            creature.timers.idle_start_turn = self.turn;
        }
        machine::set_start_state(self, id);
        tracing::debug!("Spawned {} {} for player {}", self.world.models.get(model).name, id.0, owner.0);
        Ok(id)
    }
}
