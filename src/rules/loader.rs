//! Load creature rules from TOML files
//!
//! A rules file may hold a `[config]` table, `[[job]]` rows and
//! `[[creature]]` models. Anything a file leaves out keeps its built-in
//! value; job rows, when present, replace the whole job table.

use std::fs;
use std::path::Path;

use crate::core::config::SimulationConfig;
use crate::core::error::{DungeonError, Result};
use crate::entity::model::CreatureModel;
use crate::jobs::anger::AngerJobs;
use crate::jobs::registry::{CoordsAssign, CoordsCheck, Job, JobConfig, JobFlags, JobTable, PlayerAssign, PlayerCheck};
use crate::simulation::events::EventKind;
use crate::states::ids::CreatureStateId;
use crate::world::rooms::RoomRole;
use crate::world::World;

/// Load a rules file into the config and the world's job table and models
pub fn load_rules(path: &Path, config: &mut SimulationConfig, world: &mut World) -> Result<()> {
    let content = fs::read_to_string(path)?;
    parse_rules(&content, config, world)?;
    tracing::info!("Loaded rules from {}", path.display());
    Ok(())
}

/// Parse rules text; nothing is changed when any part of it is invalid
pub fn parse_rules(content: &str, config: &mut SimulationConfig, world: &mut World) -> Result<()> {
    let toml: toml::Value = content.parse()?;

    let new_config = match toml.get("config") {
        Some(table) => parse_config(table, config)?,
        None => config.clone(),
    };
    new_config.validate().map_err(DungeonError::Config)?;

    let jobs = match toml.get("job").and_then(|v| v.as_array()) {
        Some(rows) => {
            let mut table = JobTable::empty();
            for row in rows {
                table.push(parse_job(row)?)?;
            }
            table.validate()?;
            tracing::debug!("Job table replaced by {} rows", table.count() - 1);
            table
        }
        None => world.jobs.clone(),
    };

    let mut models = world.models.clone();
    if let Some(rows) = toml.get("creature").and_then(|v| v.as_array()) {
        for row in rows {
            let model = parse_creature(row, &models, &jobs)?;
            tracing::debug!("Creature model {} defined", model.name);
            models.insert(model);
        }
    }

    *config = new_config;
    world.jobs = jobs;
    world.models = models;
    Ok(())
}

fn config_error(what: impl Into<String>) -> DungeonError {
    DungeonError::Config(what.into())
}

fn parse_config(value: &toml::Value, base: &SimulationConfig) -> Result<SimulationConfig> {
    let overrides = value.as_table().ok_or_else(|| config_error("[config] must be a table"))?;
    let mut merged = toml::Value::try_from(base).map_err(|e| config_error(e.to_string()))?;
    let fields = merged.as_table_mut().ok_or_else(|| config_error("config does not serialize to a table"))?;
    for (key, v) in overrides {
        if !fields.contains_key(key) {
            return Err(config_error(format!("unknown config field '{}'", key)));
        }
        fields.insert(key.clone(), v.clone());
    }
    Ok(merged.try_into::<SimulationConfig>()?)
}

fn str_field<'a>(row: &'a toml::Value, key: &str) -> Option<&'a str> {
    row.get(key).and_then(|v| v.as_str())
}

fn names<'a>(row: &'a toml::Value, key: &str, owner: &str) -> Result<Vec<&'a str>> {
    let Some(value) = row.get(key) else {
        return Ok(Vec::new());
    };
    let list = value.as_array().ok_or_else(|| config_error(format!("{}: '{}' must be a list of names", owner, key)))?;
    list.iter()
        .map(|v| v.as_str().ok_or_else(|| config_error(format!("{}: '{}' must be a list of names", owner, key))))
        .collect()
}

fn state(row: &toml::Value, key: &str, default: CreatureStateId) -> Result<CreatureStateId> {
    match str_field(row, key) {
        Some(name) => CreatureStateId::from_name(name).ok_or_else(|| DungeonError::UnknownState(name.to_string())),
        None => Ok(default),
    }
}

fn uint(row: &toml::Value, key: &str, default: u32, owner: &str) -> Result<u32> {
    match row.get(key) {
        Some(v) => v
            .as_integer()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| config_error(format!("{}: '{}' must be a non-negative integer", owner, key))),
        None => Ok(default),
    }
}

fn int(row: &toml::Value, key: &str, default: i32, owner: &str) -> Result<i32> {
    match row.get(key) {
        Some(v) => v
            .as_integer()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| config_error(format!("{}: '{}' must be an integer", owner, key))),
        None => Ok(default),
    }
}

fn strategy<T>(row: &toml::Value, key: &str, parse: fn(&str) -> Result<Option<T>>) -> Result<Option<T>> {
    match str_field(row, key) {
        Some(name) => parse(name),
        None => Ok(None),
    }
}

fn parse_job(row: &toml::Value) -> Result<JobConfig> {
    let name = str_field(row, "name").ok_or_else(|| config_error("job row missing name"))?;

    let mut room_role = RoomRole::NONE;
    for role in names(row, "room_role", name)? {
        room_role = room_role
            | RoomRole::from_name(role).ok_or_else(|| config_error(format!("{}: unknown room role '{}'", name, role)))?;
    }
    let mut flags = JobFlags::NONE;
    for flag in names(row, "properties", name)? {
        flags = flags
            | JobFlags::from_name(flag).ok_or_else(|| config_error(format!("{}: unknown job property '{}'", name, flag)))?;
    }
    let event_kind = match str_field(row, "event") {
        Some(event) => {
            Some(EventKind::from_name(event).ok_or_else(|| config_error(format!("{}: unknown event '{}'", name, event)))?)
        }
        None => None,
    };

    Ok(JobConfig {
        name: name.to_string(),
        room_role,
        event_kind,
        flags,
        initial_state: state(row, "initial_state", CreatureStateId::Unused)?,
        continue_state: state(row, "continue_state", CreatureStateId::Unused)?,
        player_check: strategy(row, "player_check", PlayerCheck::parse)?,
        player_assign: strategy(row, "player_assign", PlayerAssign::parse)?,
        coords_check: strategy(row, "coords_check", CoordsCheck::parse)?,
        coords_assign: strategy(row, "coords_assign", CoordsAssign::parse)?,
    })
}

fn job_set(row: &toml::Value, key: &str, jobs: &JobTable, default: Job, owner: &str) -> Result<Job> {
    if row.get(key).is_none() {
        return Ok(default);
    }
    jobs.parse_set(&names(row, key, owner)?)
}

fn parse_creature(
    row: &toml::Value,
    models: &crate::entity::model::CreatureModels,
    jobs: &JobTable,
) -> Result<CreatureModel> {
    let name = str_field(row, "name").ok_or_else(|| config_error("creature row missing name"))?;
    let base = match models.by_name(name) {
        Some(id) => models.get(id).clone(),
        None => CreatureModel::new(name),
    };

    let jobs_anger = if row.get("anger_jobs").is_some() {
        let mut set = AngerJobs::NONE;
        for job in names(row, "anger_jobs", name)? {
            set = set
                | AngerJobs::from_name(job).ok_or_else(|| config_error(format!("{}: unknown anger job '{}'", name, job)))?;
        }
        set
    } else {
        base.jobs_anger
    };
    let is_digger = match row.get("digger") {
        Some(v) => v.as_bool().ok_or_else(|| config_error(format!("{}: 'digger' must be true or false", name)))?,
        None => base.is_digger,
    };

    Ok(CreatureModel {
        name: base.name.clone(),
        is_digger,
        job_primary: job_set(row, "primary_jobs", jobs, base.job_primary, name)?,
        job_secondary: job_set(row, "secondary_jobs", jobs, base.job_secondary, name)?,
        jobs_not_do: job_set(row, "not_do_jobs", jobs, base.jobs_not_do, name)?,
        jobs_anger,
        good_start_state: state(row, "good_start_state", base.good_start_state)?,
        evil_start_state: state(row, "evil_start_state", base.evil_start_state)?,
        gold_hold: uint(row, "gold_hold", base.gold_hold, name)?,
        pay: uint(row, "pay", base.pay, name)?,
        training_cost: uint(row, "training_cost", base.training_cost, name)?,
        research_value: uint(row, "research_value", base.research_value, name)?,
        manufacture_value: uint(row, "manufacture_value", base.manufacture_value, name)?,
        scavenge_value: uint(row, "scavenge_value", base.scavenge_value, name)?,
        lair_size: uint(row, "lair_size", base.lair_size, name)?,
        annoy_level: int(row, "annoy_level", base.annoy_level, name)?,
        annoy_will_not_do_job: int(row, "annoy_will_not_do_job", base.annoy_will_not_do_job, name)?,
        annoy_not_paid: int(row, "annoy_not_paid", base.annoy_not_paid, name)?,
        annoy_hungry: int(row, "annoy_hungry", base.annoy_hungry, name)?,
        annoy_no_lair: int(row, "annoy_no_lair", base.annoy_no_lair, name)?,
        annoy_slapped: int(row, "annoy_slapped", base.annoy_slapped, name)?,
    })
}
