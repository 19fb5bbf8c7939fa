//! Simulation driver: the context every tick runs against, the external
//! services it talks to, and the tick loop itself

pub mod context;
pub mod events;
pub mod services;
pub mod tick;

pub use context::SimulationContext;
pub use events::{EventKind, EventLog, EventSink, GameMessage};
pub use services::{Economy, GridNavigator, Navigator, Services, TreasuryEconomy, WorkKind};
pub use tick::{run_simulation_tick, SimulationEvent};
