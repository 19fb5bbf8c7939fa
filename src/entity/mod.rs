//! Creatures and their static models

pub mod creature;
pub mod model;
pub mod store;

pub use creature::{AngerReason, Creature, CreatureFlags, DiggerControl, LastDidJob, Mood, SavedState};
pub use model::{CreatureModel, CreatureModels};
pub use store::{CreatureList, CreatureStore};
