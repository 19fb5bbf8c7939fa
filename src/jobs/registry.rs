//! Job definitions
//!
//! A job is one bit of a 64-bit set. Row `i` of the job table describes the
//! job `1 << (i - 1)`; row 0 is the empty job and doubles as the fallback
//! for unknown bits. Each row names the room role the job needs, its
//! assignment flags, the states it starts in and which of the four
//! eligibility/assignment strategies apply. A strategy left as `None` means
//! the job cannot be handed out that way.

use serde::{Deserialize, Serialize};

use crate::core::error::{DungeonError, Result};
use crate::simulation::events::EventKind;
use crate::states::ids::CreatureStateId;
use crate::world::rooms::RoomRole;

/// A set of jobs; assignment always works on a single bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Job(pub u64);

impl Job {
    pub const NULL: Job = Job(0);
    pub const TUNNEL: Job = Job(1 << 0);
    pub const DIG: Job = Job(1 << 1);
    pub const RESEARCH: Job = Job(1 << 2);
    pub const TRAIN: Job = Job(1 << 3);
    pub const MANUFACTURE: Job = Job(1 << 4);
    pub const SCAVENGE: Job = Job(1 << 5);
    pub const KINKY_TORTURE: Job = Job(1 << 6);
    pub const JOIN_FIGHT: Job = Job(1 << 7);
    pub const SEEK_THE_ENEMY: Job = Job(1 << 8);
    pub const GUARD: Job = Job(1 << 9);
    pub const GROUP: Job = Job(1 << 10);
    pub const BARRACK: Job = Job(1 << 11);
    pub const TEMPLE_PRAY: Job = Job(1 << 12);
    pub const FREEZE_PRISONERS: Job = Job(1 << 13);
    pub const EXPLORE: Job = Job(1 << 14);
    pub const EXEMPT: Job = Job(1 << 15);
    pub const TEMPLE_SACRIFICE: Job = Job(1 << 16);
    pub const PAINFUL_TORTURE: Job = Job(1 << 17);
    pub const CAPTIVITY: Job = Job(1 << 18);
    pub const PLACE_IN_VAULT: Job = Job(1 << 19);
    pub const TAKE_SALARY: Job = Job(1 << 20);
    pub const TAKE_FEED: Job = Job(1 << 21);
    pub const TAKE_SLEEP: Job = Job(1 << 22);

    /// The job described by table row `index`
    pub fn from_index(index: usize) -> Job {
        if index == 0 || index > 64 {
            Job::NULL
        } else {
            Job(1u64 << (index - 1))
        }
    }

    /// Table row of the lowest job in the set; 0 for the empty set
    pub fn index(self) -> usize {
        if self.0 == 0 {
            0
        } else {
            self.0.trailing_zeros() as usize + 1
        }
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, job: Job) -> bool {
        job.0 != 0 && self.0 & job.0 == job.0
    }

    pub fn intersects(self, other: Job) -> bool {
        self.0 & other.0 != 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Single-bit jobs of the set, lowest first
    pub fn iter(self) -> impl Iterator<Item = Job> {
        (0..64).map(|bit| Job(1u64 << bit)).filter(move |job| self.intersects(*job))
    }
}

impl std::ops::BitOr for Job {
    type Output = Job;
    fn bitor(self, rhs: Job) -> Job {
        Job(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Job {
    fn bitor_assign(&mut self, rhs: Job) {
        self.0 |= rhs.0;
    }
}

/// Assignment and work flags of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct JobFlags(pub u32);

impl JobFlags {
    pub const NONE: JobFlags = JobFlags(0);
    pub const HUMAN_DROP: JobFlags = JobFlags(1 << 0);
    pub const COMPUTER_DROP: JobFlags = JobFlags(1 << 1);
    pub const CREATURE_INIT: JobFlags = JobFlags(1 << 2);
    pub const AREA_WITHIN_ROOM: JobFlags = JobFlags(1 << 3);
    pub const AREA_OUTSIDE_ROOM: JobFlags = JobFlags(1 << 4);
    pub const ON_AREA_BORDER: JobFlags = JobFlags(1 << 5);
    pub const ON_AREA_CENTER: JobFlags = JobFlags(1 << 6);
    pub const OWNED_CREATURES: JobFlags = JobFlags(1 << 7);
    pub const ENEMY_CREATURES: JobFlags = JobFlags(1 << 8);
    pub const OWNED_DIGGERS: JobFlags = JobFlags(1 << 9);
    pub const ENEMY_DIGGERS: JobFlags = JobFlags(1 << 10);
    pub const ONE_TIME: JobFlags = JobFlags(1 << 11);
    pub const NEEDS_HAVE_JOB: JobFlags = JobFlags(1 << 12);
    pub const WORK_BORDER: JobFlags = JobFlags(1 << 13);
    pub const WORK_CENTER: JobFlags = JobFlags(1 << 14);
    pub const NEEDS_CAPACITY: JobFlags = JobFlags(1 << 15);
    pub const NO_SELF_CONTROL: JobFlags = JobFlags(1 << 16);
    pub const NO_GROUPS: JobFlags = JobFlags(1 << 17);
    pub const ALLOW_CHICKENIZED: JobFlags = JobFlags(1 << 18);

    pub const WHOLE_AREA: JobFlags = JobFlags(Self::ON_AREA_BORDER.0 | Self::ON_AREA_CENTER.0);
    pub const WORK_WHOLE_AREA: JobFlags = JobFlags(Self::WORK_BORDER.0 | Self::WORK_CENTER.0);

    pub fn contains(self, other: JobFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: JobFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// Parse a flag name as written in rule files
    pub fn from_name(name: &str) -> Option<JobFlags> {
        let flags = match name {
            "HUMAN_DROP" => Self::HUMAN_DROP,
            "COMPUTER_DROP" => Self::COMPUTER_DROP,
            "CREATURE_INIT" => Self::CREATURE_INIT,
            "AREA_WITHIN_ROOM" => Self::AREA_WITHIN_ROOM,
            "AREA_OUTSIDE_ROOM" => Self::AREA_OUTSIDE_ROOM,
            "BORDER_ONLY" => Self::ON_AREA_BORDER,
            "CENTER_ONLY" => Self::ON_AREA_CENTER,
            "WHOLE_AREA" => Self::WHOLE_AREA,
            "OWNED_CREATURES" => Self::OWNED_CREATURES,
            "ENEMY_CREATURES" => Self::ENEMY_CREATURES,
            "OWNED_DIGGERS" => Self::OWNED_DIGGERS,
            "ENEMY_DIGGERS" => Self::ENEMY_DIGGERS,
            "ONE_TIME" => Self::ONE_TIME,
            "NEEDS_HAVE_JOB" => Self::NEEDS_HAVE_JOB,
            "WORK_BORDER_ONLY" => Self::WORK_BORDER,
            "WORK_CENTER_ONLY" => Self::WORK_CENTER,
            "WORK_WHOLE_AREA" => Self::WORK_WHOLE_AREA,
            "NEEDS_CAPACITY" => Self::NEEDS_CAPACITY,
            "NO_SELF_CONTROL" => Self::NO_SELF_CONTROL,
            "NO_GROUPS" => Self::NO_GROUPS,
            "ALLOW_CHICKENIZED" => Self::ALLOW_CHICKENIZED,
            _ => return None,
        };
        Some(flags)
    }
}

impl std::ops::BitOr for JobFlags {
    type Output = JobFlags;
    fn bitor(self, rhs: JobFlags) -> JobFlags {
        JobFlags(self.0 | rhs.0)
    }
}

/// Player-scoped eligibility checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerCheck {
    Always,
    Training,
    Research,
    Manufacturing,
    Scavenging,
    FreezePrisoners,
    JoinFight,
    Barracking,
}

/// Player-scoped assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAssign {
    WorkInRoom,
    InStateOnRoomContent,
    MoveToEvent,
    InStateInternal,
}

/// Position-scoped eligibility checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordsCheck {
    Always,
    Research,
    Training,
    Manufacturing,
    Scavenging,
    PlaceInVault,
    TakeSalary,
    TakeSleep,
}

/// Position-scoped assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordsAssign {
    WorkInRoom,
    WorkInRoomAndCure,
    SleepInLair,
    InStateInternal,
}

fn parse_strategy<T>(name: &str, table: &[(&str, T)]) -> Result<Option<T>>
where
    T: Copy,
{
    if name == "none" {
        return Ok(None);
    }
    table
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| Some(*v))
        .ok_or_else(|| DungeonError::Config(format!("unknown job function '{}'", name)))
}

impl PlayerCheck {
    pub fn parse(name: &str) -> Result<Option<Self>> {
        parse_strategy(
            name,
            &[
                ("can_do_job_always", PlayerCheck::Always),
                ("can_do_training", PlayerCheck::Training),
                ("can_do_research", PlayerCheck::Research),
                ("can_do_manufacturing", PlayerCheck::Manufacturing),
                ("can_do_scavenging", PlayerCheck::Scavenging),
                ("can_freeze_prisoners", PlayerCheck::FreezePrisoners),
                ("can_join_fight", PlayerCheck::JoinFight),
                ("can_do_barracking", PlayerCheck::Barracking),
            ],
        )
    }
}

impl PlayerAssign {
    pub fn parse(name: &str) -> Result<Option<Self>> {
        parse_strategy(
            name,
            &[
                ("work_in_room", PlayerAssign::WorkInRoom),
                ("in_state_on_room_content", PlayerAssign::InStateOnRoomContent),
                ("move_to_event", PlayerAssign::MoveToEvent),
                ("in_state_internal", PlayerAssign::InStateInternal),
            ],
        )
    }
}

impl CoordsCheck {
    pub fn parse(name: &str) -> Result<Option<Self>> {
        parse_strategy(
            name,
            &[
                ("can_do_job_always", CoordsCheck::Always),
                ("can_do_research", CoordsCheck::Research),
                ("can_do_training", CoordsCheck::Training),
                ("can_do_manufacturing", CoordsCheck::Manufacturing),
                ("can_do_scavenging", CoordsCheck::Scavenging),
                ("can_place_in_vault", CoordsCheck::PlaceInVault),
                ("can_take_salary", CoordsCheck::TakeSalary),
                ("can_take_sleep", CoordsCheck::TakeSleep),
            ],
        )
    }
}

impl CoordsAssign {
    pub fn parse(name: &str) -> Result<Option<Self>> {
        parse_strategy(
            name,
            &[
                ("work_in_room", CoordsAssign::WorkInRoom),
                ("work_in_room_and_cure", CoordsAssign::WorkInRoomAndCure),
                ("sleep_in_lair", CoordsAssign::SleepInLair),
                ("in_state_internal", CoordsAssign::InStateInternal),
            ],
        )
    }
}

/// One row of the job table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub room_role: RoomRole,
    /// Event the job moves towards, for event-driven jobs
    pub event_kind: Option<EventKind>,
    pub flags: JobFlags,
    /// State entered when the job starts, or on arrival for room jobs
    pub initial_state: CreatureStateId,
    /// State the job settles into once started
    pub continue_state: CreatureStateId,
    pub player_check: Option<PlayerCheck>,
    pub player_assign: Option<PlayerAssign>,
    pub coords_check: Option<CoordsCheck>,
    pub coords_assign: Option<CoordsAssign>,
}

impl JobConfig {
    fn null() -> Self {
        Self {
            name: "NULL".to_string(),
            room_role: RoomRole::NONE,
            event_kind: None,
            flags: JobFlags::NONE,
            initial_state: CreatureStateId::Unused,
            continue_state: CreatureStateId::Unused,
            player_check: None,
            player_assign: None,
            coords_check: None,
            coords_assign: None,
        }
    }
}

/// Flags shared by the ordinary work-in-room jobs
const ROOM_WORK: JobFlags = JobFlags(
    JobFlags::HUMAN_DROP.0
        | JobFlags::COMPUTER_DROP.0
        | JobFlags::AREA_WITHIN_ROOM.0
        | JobFlags::WHOLE_AREA.0
        | JobFlags::OWNED_CREATURES.0
        | JobFlags::NEEDS_HAVE_JOB.0
        | JobFlags::NEEDS_CAPACITY.0
        | JobFlags::WORK_WHOLE_AREA.0,
);

/// Flags of the personal needs served by dropping a creature in a room
const NEEDS_DROP: JobFlags = JobFlags(
    JobFlags::HUMAN_DROP.0 | JobFlags::AREA_WITHIN_ROOM.0 | JobFlags::WHOLE_AREA.0 | JobFlags::OWNED_CREATURES.0,
);

/// The job table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTable {
    jobs: Vec<JobConfig>,
}

impl Default for JobTable {
    fn default() -> Self {
        Self { jobs: default_jobs() }
    }
}

impl JobTable {
    /// A table holding only the empty job, to be filled from rule files
    pub fn empty() -> Self {
        Self { jobs: vec![JobConfig::null()] }
    }

    /// Number of rows, the empty job included
    pub fn count(&self) -> usize {
        self.jobs.len()
    }

    pub fn rows(&self) -> &[JobConfig] {
        &self.jobs
    }

    /// Append a row; returns the job it defines
    pub fn push(&mut self, config: JobConfig) -> Result<Job> {
        if self.jobs.len() > 64 {
            return Err(DungeonError::Config("at most 64 jobs can be defined".into()));
        }
        if self.job_by_name(&config.name).is_some() {
            return Err(DungeonError::Config(format!("job '{}' defined twice", config.name)));
        }
        self.jobs.push(config);
        Ok(Job::from_index(self.jobs.len() - 1))
    }

    /// Row of the lowest bit of the job; unknown jobs get the empty row
    pub fn config(&self, job: Job) -> &JobConfig {
        self.jobs.get(job.index()).unwrap_or(&self.jobs[0])
    }

    pub fn room_role(&self, job: Job) -> RoomRole {
        self.config(job).room_role
    }

    pub fn flags(&self, job: Job) -> JobFlags {
        self.config(job).flags
    }

    pub fn code_name(&self, job: Job) -> &str {
        &self.config(job).name
    }

    pub fn job_by_name(&self, name: &str) -> Option<Job> {
        self.jobs
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, cfg)| cfg.name.eq_ignore_ascii_case(name))
            .map(|(idx, _)| Job::from_index(idx))
    }

    /// Parse a list of job names into a set
    pub fn parse_set(&self, names: &[&str]) -> Result<Job> {
        let mut set = Job::NULL;
        for name in names {
            set |= self.job_by_name(name).ok_or_else(|| DungeonError::UnknownJob(name.to_string()))?;
        }
        Ok(set)
    }

    /// First job having all `required` flags which can be done in a room of
    /// the role (or anywhere, for outside-room jobs)
    pub fn job_for_room_role(&self, role: RoomRole, required: JobFlags, has_jobs: Job) -> Job {
        for (idx, cfg) in self.jobs.iter().enumerate().skip(1) {
            if !cfg.flags.contains(required) {
                continue;
            }
            let job = Job::from_index(idx);
            if cfg.flags.contains(JobFlags::NEEDS_HAVE_JOB) && !has_jobs.contains(job) {
                continue;
            }
            if cfg.room_role.intersects(role) || cfg.flags.contains(JobFlags::AREA_OUTSIDE_ROOM) {
                return job;
            }
        }
        Job::NULL
    }

    /// Job a creature in the given state is working on
    pub fn job_for_state(&self, state: CreatureStateId) -> Job {
        use CreatureStateId as S;
        if state == S::Unused {
            return Job::NULL;
        }
        if let Some(idx) = self
            .jobs
            .iter()
            .position(|cfg| cfg.initial_state == state || cfg.continue_state == state)
        {
            return Job::from_index(idx);
        }
        match state {
            S::CreatureEat | S::CreatureEatingAtGarden | S::CreatureToGarden | S::CreatureArrivedAtGarden => {
                Job::TAKE_FEED
            }
            S::CreatureWantsSalary | S::CreatureTakeSalary => Job::TAKE_SALARY,
            S::CreatureSleep
            | S::CreatureGoingHomeToSleep
            | S::AtLairToSleep
            | S::CreatureChooseRoomForLairSite
            | S::CreatureAtNewLair
            | S::CreatureWantsAHome
            | S::CreatureChangeLair
            | S::CreatureAtChangedLair => Job::TAKE_SLEEP,
            _ => Job::NULL,
        }
    }

    /// Occupant capacity a job needs in its room
    pub fn required_room_capacity(&self, job: Job, lair_size: u32) -> u32 {
        let cfg = self.config(job);
        if cfg.room_role.is_none() {
            tracing::warn!("Job {} needs capacity but has no related room role", cfg.name);
            return 0;
        }
        if cfg.room_role.intersects(RoomRole::LAIR) {
            return lair_size;
        }
        if cfg.flags.contains(JobFlags::NEEDS_CAPACITY) {
            1
        } else {
            0
        }
    }

    /// Sanity checks run after loading rule files
    pub fn validate(&self) -> Result<()> {
        for cfg in self.jobs.iter().skip(1) {
            if cfg.flags.contains(JobFlags::NEEDS_HAVE_JOB | JobFlags::ONE_TIME) {
                return Err(DungeonError::Config(format!(
                    "job {} cannot be both one-time and needing the creature to have it",
                    cfg.name
                )));
            }
            if cfg.player_assign == Some(PlayerAssign::MoveToEvent) && cfg.event_kind.is_none() {
                return Err(DungeonError::Config(format!("job {} moves to an event but names none", cfg.name)));
            }
        }
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn row(
    name: &str,
    room_role: RoomRole,
    flags: JobFlags,
    initial_state: CreatureStateId,
    continue_state: CreatureStateId,
    player: (Option<PlayerCheck>, Option<PlayerAssign>),
    coords: (Option<CoordsCheck>, Option<CoordsAssign>),
) -> JobConfig {
    JobConfig {
        name: name.to_string(),
        room_role,
        event_kind: None,
        flags,
        initial_state,
        continue_state,
        player_check: player.0,
        player_assign: player.1,
        coords_check: coords.0,
        coords_assign: coords.1,
    }
}

fn default_jobs() -> Vec<JobConfig> {
    use CoordsAssign as CA;
    use CoordsCheck as CC;
    use CreatureStateId as S;
    use JobFlags as F;
    use PlayerAssign as PA;
    use PlayerCheck as PC;
    use RoomRole as R;

    let none = (None, None);
    let mut jobs = vec![
        JobConfig::null(),
        row("TUNNEL", R::NONE, F::NONE, S::Tunnelling, S::Unused, none, (None, None)),
        row(
            "DIG",
            R::NONE,
            F::HUMAN_DROP | F::COMPUTER_DROP | F::AREA_OUTSIDE_ROOM | F::WHOLE_AREA | F::OWNED_DIGGERS,
            S::ImpDoingNothing,
            S::Unused,
            none,
            (Some(CC::Always), Some(CA::InStateInternal)),
        ),
        row(
            "RESEARCH",
            R::RESEARCH,
            ROOM_WORK,
            S::AtResearchRoom,
            S::Researching,
            (Some(PC::Research), Some(PA::WorkInRoom)),
            (Some(CC::Research), Some(CA::WorkInRoom)),
        ),
        row(
            "TRAIN",
            R::TRAINING,
            ROOM_WORK,
            S::AtTrainingRoom,
            S::Training,
            (Some(PC::Training), Some(PA::WorkInRoom)),
            (Some(CC::Training), Some(CA::WorkInRoom)),
        ),
        row(
            "MANUFACTURE",
            R::MANUFACTURE,
            ROOM_WORK,
            S::AtWorkshopRoom,
            S::Manufacturing,
            (Some(PC::Manufacturing), Some(PA::WorkInRoom)),
            (Some(CC::Manufacturing), Some(CA::WorkInRoom)),
        ),
        row(
            "SCAVENGE",
            R::SCAVENGE,
            ROOM_WORK,
            S::AtScavengerRoom,
            S::Scavengering,
            (Some(PC::Scavenging), Some(PA::WorkInRoom)),
            (Some(CC::Scavenging), Some(CA::WorkInRoom)),
        ),
        row(
            "KINKY_TORTURE",
            R::TORTURE,
            ROOM_WORK,
            S::AtKinkyTortureRoom,
            S::KinkyTorturing,
            (Some(PC::Always), Some(PA::WorkInRoom)),
            (Some(CC::Always), Some(CA::WorkInRoom)),
        ),
        row(
            "JOIN_FIGHT",
            R::NONE,
            F::OWNED_CREATURES,
            S::SeekTheEnemy,
            S::Unused,
            (Some(PC::JoinFight), Some(PA::MoveToEvent)),
            (None, None),
        ),
        row(
            "SEEK_THE_ENEMY",
            R::NONE,
            F::HUMAN_DROP | F::AREA_OUTSIDE_ROOM | F::WHOLE_AREA | F::OWNED_CREATURES | F::NEEDS_HAVE_JOB,
            S::SeekTheEnemy,
            S::Unused,
            (Some(PC::Always), Some(PA::InStateInternal)),
            (Some(CC::Always), Some(CA::InStateInternal)),
        ),
        row(
            "GUARD",
            R::GUARD,
            ROOM_WORK | F::NO_GROUPS,
            S::AtGuardPostRoom,
            S::Guarding,
            (Some(PC::Always), Some(PA::WorkInRoom)),
            (Some(CC::Always), Some(CA::WorkInRoom)),
        ),
        row("GROUP", R::NONE, F::OWNED_CREATURES, S::CreatureFollowLeader, S::Unused, none, (None, None)),
        row(
            "BARRACK",
            R::BARRACKS,
            ROOM_WORK,
            S::AtBarrackRoom,
            S::Barracking,
            (Some(PC::Barracking), Some(PA::WorkInRoom)),
            (Some(CC::Always), Some(CA::WorkInRoom)),
        ),
        row(
            "TEMPLE_PRAY",
            R::TEMPLE,
            F::HUMAN_DROP | F::AREA_WITHIN_ROOM | F::WHOLE_AREA | F::OWNED_CREATURES | F::NEEDS_CAPACITY,
            S::AtTemple,
            S::PrayingInTemple,
            (Some(PC::Always), Some(PA::WorkInRoom)),
            (Some(CC::Always), Some(CA::WorkInRoomAndCure)),
        ),
        row(
            "FREEZE_PRISONERS",
            R::PRISON,
            F::OWNED_CREATURES | F::NEEDS_HAVE_JOB,
            S::CreatureFreezePrisoners,
            S::Unused,
            (Some(PC::FreezePrisoners), Some(PA::InStateOnRoomContent)),
            (None, None),
        ),
        row(
            "EXPLORE",
            R::NONE,
            F::HUMAN_DROP | F::AREA_OUTSIDE_ROOM | F::WHOLE_AREA | F::OWNED_CREATURES | F::NEEDS_HAVE_JOB,
            S::CreatureExploreDungeon,
            S::Unused,
            (Some(PC::Always), Some(PA::InStateInternal)),
            (Some(CC::Always), Some(CA::InStateInternal)),
        ),
        row("EXEMPT", R::ENTRANCE, F::NONE, S::CreatureExempt, S::Unused, none, (None, None)),
        row(
            "TEMPLE_SACRIFICE",
            R::TEMPLE,
            F::HUMAN_DROP | F::AREA_WITHIN_ROOM | F::ON_AREA_CENTER | F::OWNED_CREATURES | F::ENEMY_CREATURES,
            S::CreatureSacrifice,
            S::Unused,
            none,
            (Some(CC::Always), Some(CA::InStateInternal)),
        ),
        row(
            "PAINFUL_TORTURE",
            R::TORTURE,
            F::HUMAN_DROP | F::AREA_WITHIN_ROOM | F::WHOLE_AREA | F::ENEMY_CREATURES | F::NEEDS_CAPACITY,
            S::AtTortureRoom,
            S::Torturing,
            none,
            (Some(CC::Always), Some(CA::WorkInRoom)),
        ),
        row(
            "CAPTIVITY",
            R::PRISON,
            F::HUMAN_DROP | F::AREA_WITHIN_ROOM | F::WHOLE_AREA | F::ENEMY_CREATURES | F::NEEDS_CAPACITY,
            S::CreatureArrivedAtPrison,
            S::CreatureInPrison,
            none,
            (Some(CC::Always), Some(CA::WorkInRoom)),
        ),
        row(
            "PLACE_IN_VAULT",
            R::GOLD_STORAGE,
            NEEDS_DROP | F::OWNED_DIGGERS,
            S::ImpDropsGold,
            S::Unused,
            none,
            (Some(CC::PlaceInVault), Some(CA::InStateInternal)),
        ),
        row(
            "TAKE_SALARY",
            R::GOLD_STORAGE,
            NEEDS_DROP,
            S::CreatureTakeSalary,
            S::Unused,
            none,
            (Some(CC::TakeSalary), Some(CA::InStateInternal)),
        ),
        row(
            "TAKE_FEED",
            R::FOOD,
            NEEDS_DROP,
            S::CreatureArrivedAtGarden,
            S::CreatureEat,
            none,
            (Some(CC::Always), Some(CA::WorkInRoom)),
        ),
        row(
            "TAKE_SLEEP",
            R::LAIR,
            NEEDS_DROP | F::NEEDS_CAPACITY,
            S::AtLairToSleep,
            S::CreatureSleep,
            none,
            (Some(CC::TakeSleep), Some(CA::SleepInLair)),
        ),
    ];
    jobs[Job::JOIN_FIGHT.index()].event_kind = Some(EventKind::EnemyFight);
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_and_bit_agree() {
        assert_eq!(Job::from_index(1), Job::TUNNEL);
        assert_eq!(Job::TRAIN.index(), 4);
        assert_eq!(Job::NULL.index(), 0);
        assert_eq!((Job::TRAIN | Job::RESEARCH).index(), Job::RESEARCH.index(), "lowest bit wins");
    }

    #[test]
    fn test_default_table_rows_match_constants() {
        let table = JobTable::default();
        assert_eq!(table.count(), 24, "23 jobs plus the empty row");
        assert_eq!(table.code_name(Job::TRAIN), "TRAIN");
        assert_eq!(table.code_name(Job::TAKE_SLEEP), "TAKE_SLEEP");
        assert_eq!(table.room_role(Job::RESEARCH), RoomRole::RESEARCH);
        assert_eq!(table.job_by_name("temple_pray"), Some(Job::TEMPLE_PRAY));
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_unknown_bits_fall_back_to_empty_row() {
        let table = JobTable::default();
        let cfg = table.config(Job(1 << 40));
        assert_eq!(cfg.name, "NULL");
        assert!(cfg.player_check.is_none());
    }

    #[test]
    fn test_job_for_room_role_respects_have_job() {
        let table = JobTable::default();
        let flags = JobFlags::AREA_WITHIN_ROOM | JobFlags::OWNED_CREATURES;
        assert_eq!(table.job_for_room_role(RoomRole::TRAINING, flags, Job::TRAIN), Job::TRAIN);
        assert_eq!(
            table.job_for_room_role(RoomRole::TRAINING, flags, Job::RESEARCH),
            Job::NULL,
            "training needs the creature to have the job"
        );
        assert_eq!(table.job_for_room_role(RoomRole::LAIR, flags, Job::NULL), Job::TAKE_SLEEP);
    }

    #[test]
    fn test_job_for_state_covers_needs() {
        let table = JobTable::default();
        assert_eq!(table.job_for_state(CreatureStateId::Training), Job::TRAIN);
        assert_eq!(table.job_for_state(CreatureStateId::CreatureWantsSalary), Job::TAKE_SALARY);
        assert_eq!(table.job_for_state(CreatureStateId::CreatureChangeLair), Job::TAKE_SLEEP);
        assert_eq!(table.job_for_state(CreatureStateId::Unused), Job::NULL);
    }

    #[test]
    fn test_parse_set_rejects_unknown_names() {
        let table = JobTable::default();
        assert_eq!(table.parse_set(&["TRAIN", "GUARD"]).unwrap(), Job::TRAIN | Job::GUARD);
        assert!(table.parse_set(&["FLY"]).is_err());
    }
}
