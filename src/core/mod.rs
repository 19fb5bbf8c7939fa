pub mod config;
pub mod error;
pub mod stats;
pub mod types;

pub use config::SimulationConfig;
pub use error::{DungeonError, Result};
pub use stats::{ErrorStatKind, ErrorStats};
