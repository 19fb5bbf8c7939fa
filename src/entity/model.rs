//! Creature models
//!
//! A model is the static description shared by every creature of a kind:
//! which jobs it likes, refuses or turns to when angry, where it starts,
//! what it costs and how much work it produces.

use serde::{Deserialize, Serialize};

use crate::core::error::{DungeonError, Result};
use crate::core::types::ModelId;
use crate::jobs::anger::AngerJobs;
use crate::jobs::registry::Job;
use crate::states::ids::CreatureStateId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatureModel {
    pub name: String,
    /// Special diggers are driven by the task stack
    pub is_digger: bool,

    pub job_primary: Job,
    pub job_secondary: Job,
    pub jobs_not_do: Job,
    pub jobs_anger: AngerJobs,

    /// Start state when owned by the heroes
    pub good_start_state: CreatureStateId,
    /// Start state when owned by a keeper
    pub evil_start_state: CreatureStateId,

    /// Gold carried before heading for a treasury
    pub gold_hold: u32,
    pub pay: u32,
    /// Gold charged per training session
    pub training_cost: u32,
    pub research_value: u32,
    pub manufacture_value: u32,
    pub scavenge_value: u32,
    /// Capacity taken in a lair
    pub lair_size: u32,

    /// Annoyance at which the creature is angry; livid at twice that
    pub annoy_level: i32,
    pub annoy_will_not_do_job: i32,
    pub annoy_not_paid: i32,
    pub annoy_hungry: i32,
    pub annoy_no_lair: i32,
    pub annoy_slapped: i32,
}

impl CreatureModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_digger: false,
            job_primary: Job::NULL,
            job_secondary: Job::NULL,
            jobs_not_do: Job::NULL,
            jobs_anger: AngerJobs::NONE,
            good_start_state: CreatureStateId::GoodDoingNothing,
            evil_start_state: CreatureStateId::CreatureDoingNothing,
            gold_hold: 100,
            pay: 50,
            training_cost: 20,
            research_value: 1,
            manufacture_value: 1,
            scavenge_value: 1,
            lair_size: 1,
            annoy_level: 1000,
            annoy_will_not_do_job: 100,
            annoy_not_paid: 300,
            annoy_hungry: 20,
            annoy_no_lair: 10,
            annoy_slapped: 100,
        }
    }

    fn digger(name: &str) -> Self {
        Self {
            is_digger: true,
            job_primary: Job::DIG,
            jobs_not_do: Job::TRAIN | Job::RESEARCH,
            good_start_state: CreatureStateId::ImpDoingNothing,
            evil_start_state: CreatureStateId::ImpDoingNothing,
            gold_hold: 500,
            pay: 0,
            lair_size: 0,
            annoy_level: 0,
            ..Self::new(name)
        }
    }
}

/// Registry of creature models, indexed by `ModelId`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatureModels {
    models: Vec<CreatureModel>,
    fallback: CreatureModel,
}

impl Default for CreatureModels {
    fn default() -> Self {
        let mut warlock = CreatureModel::new("WARLOCK");
        warlock.job_primary = Job::RESEARCH;
        warlock.job_secondary = Job::TRAIN | Job::TEMPLE_PRAY;
        warlock.jobs_not_do = Job::MANUFACTURE;
        warlock.jobs_anger = AngerJobs::LEAVE_DUNGEON | AngerJobs::DESTROY_ROOMS;
        warlock.research_value = 3;
        warlock.pay = 100;

        let mut troll = CreatureModel::new("TROLL");
        troll.job_primary = Job::MANUFACTURE;
        troll.job_secondary = Job::TRAIN | Job::GUARD;
        troll.jobs_anger = AngerJobs::KILL_CREATURES | AngerJobs::DAMAGE_WALLS;
        troll.manufacture_value = 3;

        let mut orc = CreatureModel::new("ORC");
        orc.job_primary = Job::TRAIN;
        orc.job_secondary = Job::BARRACK | Job::GUARD | Job::SEEK_THE_ENEMY;
        orc.jobs_anger = AngerJobs::STEAL_GOLD | AngerJobs::LEAVE_DUNGEON | AngerJobs::KILL_DIGGERS;
        orc.training_cost = 30;

        let mut mistress = CreatureModel::new("DARK_MISTRESS");
        mistress.job_primary = Job::TRAIN;
        mistress.job_secondary = Job::KINKY_TORTURE | Job::SCAVENGE;
        mistress.jobs_anger = AngerJobs::PERSUADE | AngerJobs::MAD_PSYCHO | AngerJobs::JOIN_ENEMY;
        mistress.pay = 150;

        Self {
            models: vec![CreatureModel::digger("IMP"), warlock, troll, orc, mistress],
            fallback: CreatureModel::new("NOBODY"),
        }
    }
}

impl CreatureModels {
    /// A registry without any models
    pub fn empty() -> Self {
        Self { models: Vec::new(), fallback: CreatureModel::new("NOBODY") }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// The model; unknown ids get a harmless placeholder
    pub fn get(&self, id: ModelId) -> &CreatureModel {
        match self.models.get(id.index()) {
            Some(model) => model,
            None => {
                tracing::warn!("Creature model {} does not exist", id.0);
                &self.fallback
            }
        }
    }

    pub fn try_get(&self, id: ModelId) -> Result<&CreatureModel> {
        self.models.get(id.index()).ok_or(DungeonError::ModelNotFound(id))
    }

    pub fn by_name(&self, name: &str) -> Option<ModelId> {
        self.models
            .iter()
            .position(|m| m.name.eq_ignore_ascii_case(name))
            .map(|idx| ModelId(idx as u16))
    }

    /// Add a model, replacing one of the same name
    pub fn insert(&mut self, model: CreatureModel) -> ModelId {
        if let Some(id) = self.by_name(&model.name) {
            self.models[id.index()] = model;
            return id;
        }
        self.models.push(model);
        ModelId((self.models.len() - 1) as u16)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &CreatureModel)> {
        self.models.iter().enumerate().map(|(idx, m)| (ModelId(idx as u16), m))
    }
}
