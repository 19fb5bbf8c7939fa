use thiserror::Error;

use crate::core::types::{CreatureId, ModelId, RoomId, ThingId};

#[derive(Error, Debug)]
pub enum DungeonError {
    #[error("Creature not found: {0:?}")]
    CreatureNotFound(CreatureId),

    #[error("Room not found: {0:?}")]
    RoomNotFound(RoomId),

    #[error("Thing not found: {0:?}")]
    ThingNotFound(ThingId),

    #[error("Creature model not found: {0:?}")]
    ModelNotFound(ModelId),

    #[error("Unknown creature state: {0}")]
    UnknownState(String),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Position out of map bounds: ({0}, {1})")]
    OutOfBounds(i32, i32),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, DungeonError>;
