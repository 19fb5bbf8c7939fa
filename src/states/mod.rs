//! The creature state machine: state ids, the descriptor table, transitions
//! and the per-tick behaviors

pub mod anger;
pub mod behaviors;
pub mod cleanup;
pub mod digger;
pub mod ids;
pub mod machine;
pub mod table;

pub use behaviors::{make_unconscious, process_creature_state};
pub use ids::CreatureStateId;
pub use machine::{
    can_change_from_state_to, creature_state_category, initialise_state, move_to, request_state, restore_saved_state,
    set_start_state, set_state, slap_creature,
};
pub use table::{state_info, state_info_raw, StateBehavior, StateCategory, StateDescriptor};
