//! Runtime creature rules loaded from TOML

mod loader;

pub use loader::{load_rules, parse_rules};
