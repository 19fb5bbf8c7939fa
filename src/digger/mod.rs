//! Digger labor: the per-player task stack, how it is filled, and how a
//! digger picks its next job from it

pub mod claims;
pub mod discovery;
pub mod last_did;
pub mod places;
pub mod stack;
pub mod worker;

pub use discovery::imp_stack_update;
pub use last_did::check_out_imp_last_did;
pub use stack::{DiggerStack, DiggerStackEntry, DiggerTaskKind};
pub use worker::{
    check_out_available_imp_tasks, check_out_imp_stack, check_out_imp_tokes, has_money_for_treasure_room,
};
