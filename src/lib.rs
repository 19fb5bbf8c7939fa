//! Dungeon Creatures - creature behavior core of a dungeon-keeper simulation
//!
//! Per-creature state machine, job assignment, anger jobs and the digger
//! task stack, run against a small in-memory dungeon world.

pub mod core;
pub mod digger;
pub mod entity;
pub mod jobs;
pub mod rules;
pub mod simulation;
pub mod states;
pub mod world;
