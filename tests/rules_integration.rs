//! Integration tests for rule files and the jobs they describe

use std::path::PathBuf;

use dungeon_creatures::core::config::SimulationConfig;
use dungeon_creatures::core::error::DungeonError;
use dungeon_creatures::core::types::{PlayerId, SlabCoord};
use dungeon_creatures::jobs::{creature_can_do_job_for_player, send_creature_to_job_for_player, Job, JobCheckFlags};
use dungeon_creatures::rules::load_rules;
use dungeon_creatures::simulation::context::SimulationContext;
use dungeon_creatures::world::{RoomKind, SlabKind, World};

const KEEPER: PlayerId = PlayerId(0);

fn rules_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("dungeon_creatures_{}_{}.toml", name, std::process::id()));
    std::fs::write(&path, content).unwrap();
    path
}

fn claimed_world() -> World {
    let mut world = World::new(16, 12).unwrap();
    for y in 2..10 {
        for x in 2..14 {
            world.map.set_slab(SlabCoord::new(x, y), SlabKind::Claimed, KEEPER).unwrap();
        }
    }
    world
}

#[test]
fn test_loaded_creature_trains_only_when_affordable() {
    let path = rules_file(
        "gargoyle",
        r#"
            [config]
            moan_countdown = 30

            [[creature]]
            name = "GARGOYLE"
            primary_jobs = ["TRAIN"]
            training_cost = 500
        "#,
    );
    let mut config = SimulationConfig::default();
    let mut world = claimed_world();
    load_rules(&path, &mut config, &mut world).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(config.moan_countdown, 30);

    let slabs = [SlabCoord::new(8, 6), SlabCoord::new(9, 6), SlabCoord::new(8, 7), SlabCoord::new(9, 7)];
    let training = world.rooms.create_room(&mut world.map, RoomKind::Training, KEEPER, &slabs, &config).unwrap();
    let model = world.models.by_name("GARGOYLE").unwrap();
    let mut ctx = SimulationContext::new(world, config, 31).unwrap();
    let id = ctx.spawn_creature(model, KEEPER, SlabCoord::new(3, 3).center()).unwrap();

    assert!(
        !creature_can_do_job_for_player(&mut ctx, id, KEEPER, Job::TRAIN, JobCheckFlags::NONE),
        "an empty purse cannot pay for training"
    );
    ctx.world.dungeons[0].offmap_money = 500;
    assert!(creature_can_do_job_for_player(&mut ctx, id, KEEPER, Job::TRAIN, JobCheckFlags::NONE));
    assert!(send_creature_to_job_for_player(&mut ctx, id, KEEPER, Job::TRAIN));
    assert_eq!(ctx.creature(id).unwrap().target_room, Some(training));
}

#[test]
fn test_missing_rules_file_is_an_io_error() {
    let mut config = SimulationConfig::default();
    let mut world = World::new(8, 8).unwrap();
    let path = std::env::temp_dir().join("dungeon_creatures_does_not_exist.toml");
    let err = load_rules(&path, &mut config, &mut world).unwrap_err();
    assert!(matches!(err, DungeonError::IoError(_)), "got {:?}", err);
}

#[test]
fn test_broken_toml_is_reported() {
    let path = rules_file("broken", "[[creature]\nname = ");
    let mut config = SimulationConfig::default();
    let mut world = World::new(8, 8).unwrap();
    let err = load_rules(&path, &mut config, &mut world).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, DungeonError::TomlError(_)), "got {:?}", err);
}
