//! Jobs: the table, the assigner and the anger jobs

pub mod anger;
pub mod assign;
pub mod registry;

pub use anger::{find_and_perform_anger_job, AngerJobs};
pub use assign::{
    attempt_job_preference, attempt_job_secondary_preference, creature_can_do_job_for_player,
    creature_can_do_job_near_position, send_creature_to_job_for_player, send_creature_to_job_near_position,
    JobCheckFlags,
};
pub use registry::{Job, JobConfig, JobFlags, JobTable};
