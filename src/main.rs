//! Dungeon Creatures - headless runner
//!
//! Builds a small demo dungeon, runs the creature simulation for a number
//! of turns and prints what happened as text or JSON.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ahash::AHashMap;
use clap::Parser;
use serde::Serialize;

use dungeon_creatures::core::config::SimulationConfig;
use dungeon_creatures::core::error::Result;
use dungeon_creatures::core::stats::ErrorStatKind;
use dungeon_creatures::core::types::{ModelId, PlayerId, SlabCoord};
use dungeon_creatures::rules::load_rules;
use dungeon_creatures::simulation::context::SimulationContext;
use dungeon_creatures::simulation::tick::{run_simulation_tick, SimulationEvent};
use dungeon_creatures::world::{DigTaskKind, LevelStats, RoomKind, SlabKind, ThingKind, World};

/// Headless creature simulation
#[derive(Parser, Debug)]
#[command(name = "dungeon-creatures")]
#[command(about = "Run the creature and digger simulation on a demo dungeon")]
struct Args {
    /// Number of turns to simulate
    #[arg(long, short = 't', default_value_t = 2000)]
    ticks: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// TOML rules file with config, job and creature overrides
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    format: String,

    /// Number of diggers in the demo dungeon
    #[arg(long, default_value_t = 4)]
    diggers: u32,
}

#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    turns: u64,
    creatures_alive: usize,
    states: BTreeMap<String, usize>,
    events: BTreeMap<&'static str, usize>,
    stats: LevelStats,
    gold_in_treasury: u32,
    offmap_money: i64,
    research_points: u64,
    digger_stack_len: usize,
    dig_tasks_left: usize,
    anomalies: BTreeMap<String, u32>,
}

const KEEPER: PlayerId = PlayerId(0);
const IMP: ModelId = ModelId(0);
const WORKERS: [(ModelId, u32); 3] = [(ModelId(1), 2), (ModelId(2), 1), (ModelId(3), 2)];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dungeon_creatures=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let mut config = SimulationConfig::default();
    let mut world = World::new(40, 30)?;
    if let Some(path) = &args.rules {
        load_rules(path, &mut config, &mut world)?;
    }
    build_demo_dungeon(&mut world, &config)?;

    let mut ctx = SimulationContext::new(world, config, seed)?;
    populate(&mut ctx, args.diggers)?;
    tracing::info!("Running {} turns with seed {}", args.ticks, seed);

    let mut event_counts: AHashMap<&'static str, usize> = AHashMap::new();
    for _ in 0..args.ticks {
        for event in run_simulation_tick(&mut ctx) {
            *event_counts.entry(event_name(&event)).or_insert(0) += 1;
        }
    }

    let summary = summarize(&ctx, seed, event_counts);
    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_text(&summary);
    }
    Ok(())
}

fn rect(x0: i32, y0: i32, w: i32, h: i32) -> Vec<SlabCoord> {
    (y0..y0 + h).flat_map(|y| (x0..x0 + w).map(move |x| SlabCoord::new(x, y))).collect()
}

/// Claimed core with the usual rooms, surrounded by earth with gold seams
/// and some loose gold lying around
fn build_demo_dungeon(world: &mut World, config: &SimulationConfig) -> Result<()> {
    for slab in rect(4, 4, 20, 14) {
        world.map.set_slab(slab, SlabKind::Claimed, KEEPER)?;
    }
    world.map.reveal_all(KEEPER);

    let rooms = [
        (RoomKind::DungeonHeart, rect(5, 5, 3, 3)),
        (RoomKind::Treasury, rect(10, 5, 3, 3)),
        (RoomKind::Library, rect(15, 5, 3, 3)),
        (RoomKind::Lair, rect(5, 11, 3, 3)),
        (RoomKind::Training, rect(10, 11, 3, 3)),
        (RoomKind::Garden, rect(15, 11, 3, 2)),
        (RoomKind::Entrance, rect(21, 15, 1, 1)),
    ];
    let mut treasury = None;
    for (kind, slabs) in rooms {
        let id = world.rooms.create_room(&mut world.map, kind, KEEPER, &slabs, config)?;
        if kind == RoomKind::Treasury {
            treasury = Some(id);
        }
    }
    if let Some(treasury) = treasury {
        world.rooms.store_gold(treasury, 1_500);
    }

    for slab in rect(26, 6, 2, 4) {
        world.map.set_slab(slab, SlabKind::Gold, PlayerId::NEUTRAL)?;
    }
    let dungeon = world.try_dungeon_mut(KEEPER)?;
    dungeon.heart = Some(SlabCoord::new(6, 6).center());
    dungeon.offmap_money = 2_000;
    for slab in rect(24, 8, 2, 3) {
        dungeon.add_dig_task(slab, DigTaskKind::Dig);
    }
    for slab in rect(26, 6, 2, 4) {
        dungeon.add_dig_task(slab, DigTaskKind::MineGold);
    }

    for (x, y, gold) in [(20, 8, 250), (8, 16, 120), (22, 5, 400)] {
        world.things.spawn(ThingKind::GoldPile { gold }, PlayerId::NEUTRAL, SlabCoord::new(x, y).center());
    }
    Ok(())
}

fn populate(ctx: &mut SimulationContext, diggers: u32) -> Result<()> {
    for n in 0..diggers as i32 {
        ctx.spawn_creature(IMP, KEEPER, SlabCoord::new(8 + n % 4, 9).center())?;
    }
    let mut x = 13;
    for (model, count) in WORKERS {
        for _ in 0..count {
            ctx.spawn_creature(model, KEEPER, SlabCoord::new(x, 16).center())?;
            x += 1;
        }
    }
    Ok(())
}

fn event_name(event: &SimulationEvent) -> &'static str {
    match event {
        SimulationEvent::StateChanged { .. } => "state_changed",
        SimulationEvent::AngerJobStarted { .. } => "anger_job_started",
        SimulationEvent::CreatureLeft { .. } => "creature_left",
        SimulationEvent::PayDay { .. } => "pay_day",
    }
}

fn summarize(ctx: &SimulationContext, seed: u64, events: AHashMap<&'static str, usize>) -> RunSummary {
    let mut states = BTreeMap::new();
    for creature in ctx.world.creatures.iter() {
        let name = creature.active().map(|s| s.name().to_string()).unwrap_or_else(|| "Invalid".into());
        *states.entry(name).or_insert(0) += 1;
    }
    let anomalies = [
        ErrorStatKind::StateOutOfRange,
        ErrorStatKind::MissingJobCallback,
        ErrorStatKind::ListWalkCorrupted,
        ErrorStatKind::DiggerStackOverflow,
        ErrorStatKind::WrongCreatureClass,
        ErrorStatKind::DanglingReference,
    ]
    .into_iter()
    .map(|kind| (format!("{:?}", kind), ctx.stats.get(kind)))
    .filter(|(_, n)| *n > 0)
    .collect();
    let dungeon = ctx.world.dungeon(KEEPER);

    RunSummary {
        seed,
        turns: ctx.turn,
        creatures_alive: ctx.world.creatures.iter().count(),
        states,
        events: events.into_iter().collect(),
        stats: dungeon.map(|d| d.stats.clone()).unwrap_or_default(),
        gold_in_treasury: ctx.world.rooms.stored_gold(KEEPER),
        offmap_money: dungeon.map(|d| d.offmap_money).unwrap_or(0),
        research_points: dungeon.map(|d| d.research_points).unwrap_or(0),
        digger_stack_len: dungeon.map(|d| d.digger_stack.len()).unwrap_or(0),
        dig_tasks_left: dungeon.map(|d| d.task_list.len()).unwrap_or(0),
        anomalies,
    }
}

fn print_text(summary: &RunSummary) {
    println!("=== DUNGEON CREATURES ===");
    println!("Seed {} ran {} turns, {} creatures alive", summary.seed, summary.turns, summary.creatures_alive);
    println!();
    println!("Creature states:");
    for (state, count) in &summary.states {
        println!("  {:<40} {}", state, count);
    }
    println!();
    println!("Events:");
    for (event, count) in &summary.events {
        println!("  {:<40} {}", event, count);
    }
    println!();
    let stats = &summary.stats;
    println!("Gold mined {}, slabs dug {}, claimed {}", stats.gold_mined, stats.slabs_dug, stats.slabs_claimed);
    println!("Walls reinforced {}, salaries paid {}", stats.walls_reinforced, stats.salaries_paid);
    println!("Creatures left {}, rooms destroyed {}", stats.creatures_left, stats.rooms_destroyed);
    println!(
        "Treasury {} gold, {} off the map, {} research points",
        summary.gold_in_treasury, summary.offmap_money, summary.research_points
    );
    println!("Digger stack holds {}, {} dig tasks left", summary.digger_stack_len, summary.dig_tasks_left);
    if !summary.anomalies.is_empty() {
        println!();
        println!("Anomalies:");
        for (kind, count) in &summary.anomalies {
            println!("  {:<40} {}", kind, count);
        }
    }
}
