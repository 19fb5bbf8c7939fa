//! The creature state table
//!
//! One immutable descriptor per `CreatureStateId`, built once on first use.
//! A descriptor names the tick behavior, the optional cleanup run when the
//! state is abandoned early, the optional check run while the creature is
//! still walking towards the state, the state category and the override
//! capabilities which decide what may interrupt what.

use std::sync::OnceLock;

use crate::core::stats::{ErrorStatKind, ErrorStats};
use crate::states::ids::{CreatureStateId, CREATURE_STATES_COUNT};

/// Coarse classification of a state, used by the precedence rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateCategory {
    Idle = 0,
    Work = 1,
    OwnNeeds = 2,
    Sleep = 3,
    Feed = 4,
    FightCreature = 5,
    Move = 6,
    GetsSalary = 7,
    Escape = 8,
    Unconscious = 9,
    AngerJob = 10,
    FightDoor = 11,
    FightObject = 12,
    Called2Arms = 13,
    Follow = 14,
}

/// Simplified state shown on the creatures panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiJob {
    Idle,
    Working,
    Fighting,
}

impl StateCategory {
    pub fn gui_job(self) -> GuiJob {
        match self {
            StateCategory::Work | StateCategory::Escape | StateCategory::Called2Arms | StateCategory::Follow => {
                GuiJob::Working
            }
            StateCategory::FightCreature | StateCategory::FightDoor | StateCategory::FightObject => GuiJob::Fighting,
            _ => GuiJob::Idle,
        }
    }
}

/// Which categories of current state a target state is allowed to replace
///
/// `captive` and `transition` are the two gates set on the *current* state:
/// a captive or transitional state can only be left for a target that
/// explicitly overrides that gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverrideCapabilities {
    pub feed: bool,
    pub own_needs: bool,
    pub sleep: bool,
    pub fight_creature: bool,
    pub gets_salary: bool,
    pub captive: bool,
    pub transition: bool,
    pub escape: bool,
    pub unconscious: bool,
    pub anger_job: bool,
    pub fight_object: bool,
    pub fight_door: bool,
    pub call_to_arms: bool,
    pub follow: bool,
}

impl OverrideCapabilities {
    pub const NONE: Self = Self {
        feed: false,
        own_needs: false,
        sleep: false,
        fight_creature: false,
        gets_salary: false,
        captive: false,
        transition: false,
        escape: false,
        unconscious: false,
        anger_job: false,
        fight_object: false,
        fight_door: false,
        call_to_arms: false,
        follow: false,
    };

    pub const ALL: Self = Self {
        feed: true,
        own_needs: true,
        sleep: true,
        fight_creature: true,
        gets_salary: true,
        captive: true,
        transition: true,
        escape: true,
        unconscious: true,
        anger_job: true,
        fight_object: true,
        fight_door: true,
        call_to_arms: true,
        follow: true,
    };

    /// Everything but the captive and transition gates
    pub const URGENT: Self = Self { captive: false, transition: false, ..Self::ALL };

    /// Fighting may not interrupt fleeing or being knocked out
    pub const COMBAT: Self = Self { escape: false, unconscious: false, ..Self::URGENT };

    /// Personal needs only pull a creature out of following its leader
    pub const NEEDS: Self = Self { follow: true, ..Self::NONE };

    /// Anger jobs abandon needs and followers
    pub const ANGER: Self = Self {
        own_needs: true,
        sleep: true,
        feed: true,
        gets_salary: true,
        follow: true,
        ..Self::NONE
    };

    pub const CALL_TO_ARMS: Self = Self { anger_job: false, ..Self::ANGER };

    /// Whether this target may replace a state of the given category.
    /// Categories without an override flag can always be replaced.
    pub fn overrides(&self, category: StateCategory) -> bool {
        match category {
            StateCategory::OwnNeeds => self.own_needs,
            StateCategory::Sleep => self.sleep,
            StateCategory::Feed => self.feed,
            StateCategory::FightCreature => self.fight_creature,
            StateCategory::GetsSalary => self.gets_salary,
            StateCategory::Escape => self.escape,
            StateCategory::Unconscious => self.unconscious,
            StateCategory::AngerJob => self.anger_job,
            StateCategory::FightDoor => self.fight_door,
            StateCategory::FightObject => self.fight_object,
            StateCategory::Called2Arms => self.call_to_arms,
            StateCategory::Follow => self.follow,
            StateCategory::Idle | StateCategory::Work | StateCategory::Move => true,
        }
    }
}

/// Per-tick behavior of a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateBehavior {
    /// Nothing to do; the state is driven from outside the core
    Passive,
    /// Invalid resting place; the creature is sent back to its start state
    Null,
    /// Timed emote or transition; start state when the countdown ends
    Countdown,
    Move,

    // Digger behaviors
    ImpDoingNothing,
    ImpArrivesAtDigOrMine,
    ImpDigsMines,
    ImpDropsGold,
    ImpLastDidJob,
    ImpArrivesAtImproveDungeon,
    ImpImprovesDungeon,
    ImpArrivesAtConvertDungeon,
    ImpConvertsDungeon,
    ImpArrivesAtReinforce,
    ImpReinforces,
    ImpPicksUpGoldPile,
    ImpToking,
    PicksUpTrapObject,
    ArmsTrap,
    PicksUpCrateForWorkshop,
    DropsCrateInWorkshop,
    PicksUpSpellObject,
    DropsSpellObjectInLibrary,
    PicksUpCorpse,
    DropsCorpseInGraveyard,
    PickUpUnconsciousBody,
    DropBodyInPrison,

    // Ordinary creatures
    PersonIdle,
    GoodIdle,
    Dormant,
    PretendChicken,
    Patrol,
    ToGarden,
    ArrivedAtGarden,
    Eating,
    WantsAHome,
    ChooseLairSite,
    AtNewLair,
    GoingHomeToSleep,
    AtLairToSleep,
    Sleep,
    SulkHeadForLair,
    Sulking,
    ArriveAtWorkRoom,
    WorkInRoom,
    ArrivedAtPrison,
    InPrison,
    WantsSalary,
    TakeSalary,
    SlapCowers,
    Unconscious,
    SetWorkRoomBasedOnPosition,
    SeekTheEnemy,
    ExploreDungeon,
    FreezePrisoners,
    FollowLeader,
    AtCallToArms,

    // Anger jobs
    KillCreatures,
    VandaliseRooms,
    StealGold,
    DamageWalls,
    LeavingDungeon,
    Leaves,
    MadKillingPsycho,
    Persuade,
}

/// Cleanup run when a state is abandoned before it completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupKind {
    /// Leave the room the creature is working in
    LeaveRoom,
    /// Put down whatever is being dragged
    DropDragged,
    /// Stop the current digger action and forget the worked tile
    StopDiggerWork,
    /// Forget the combat target
    StopCombat,
    /// Forget the persuasion targets
    StopPersuade,
    /// Forget the saved state of a slap interruption
    DiscardSaved,
}

/// Check run each turn while walking towards a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveCheckKind {
    /// The target room must still exist and belong to the creature's owner
    OnHeadForRoom,
    /// The dragged thing must still be held
    StillDragging,
    /// The destination slab must still be a wall
    CanDamageWall,
    /// Leaving is only possible while an entrance exists
    NearEntrance,
    /// The treasury must still exist to be paid at
    WaitAtDoorForWage,
}

/// Immutable description of one state
#[derive(Debug, Clone, Copy)]
pub struct StateDescriptor {
    pub id: CreatureStateId,
    pub behavior: StateBehavior,
    pub cleanup: Option<CleanupKind>,
    pub move_check: Option<MoveCheckKind>,
    pub category: StateCategory,
    pub overrides: OverrideCapabilities,
    /// Can only be left for targets overriding the captive gate
    pub captive: bool,
    /// Can only be left for targets overriding the transition gate
    pub transition: bool,
    /// Sabotage states may always turn into a door fight
    pub door_fight_exception: bool,
}

impl StateDescriptor {
    fn new(id: CreatureStateId, behavior: StateBehavior, category: StateCategory) -> Self {
        Self {
            id,
            behavior,
            cleanup: None,
            move_check: None,
            category,
            overrides: OverrideCapabilities::NONE,
            captive: false,
            transition: false,
            door_fight_exception: false,
        }
    }

    fn cleanup(mut self, cleanup: CleanupKind) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    fn check(mut self, check: MoveCheckKind) -> Self {
        self.move_check = Some(check);
        self
    }

    fn overrides(mut self, overrides: OverrideCapabilities) -> Self {
        self.overrides = overrides;
        self
    }

    fn captive(mut self) -> Self {
        self.captive = true;
        self
    }

    fn transition(mut self) -> Self {
        self.transition = true;
        self
    }

    fn door_fight_exception(mut self) -> Self {
        self.door_fight_exception = true;
        self
    }

    /// Whether this is the neutral fallback descriptor
    pub fn is_invalid(&self) -> bool {
        self.id == CreatureStateId::Unused
    }
}

static STATE_TABLE: OnceLock<Vec<StateDescriptor>> = OnceLock::new();

/// The whole table, indexed by state id
pub fn state_table() -> &'static [StateDescriptor] {
    STATE_TABLE.get_or_init(build_state_table)
}

/// Descriptor of a valid state id
pub fn state_info(id: CreatureStateId) -> &'static StateDescriptor {
    &state_table()[id as usize]
}

/// Descriptor of a stored state number; out-of-range numbers degrade to state 0
pub fn state_info_raw(raw: u16, stats: &ErrorStats) -> &'static StateDescriptor {
    let table = state_table();
    match table.get(raw as usize) {
        Some(descriptor) => descriptor,
        None => {
            tracing::warn!("Creature state {} is out of range, using state 0", raw);
            stats.inc(ErrorStatKind::StateOutOfRange);
            &table[0]
        }
    }
}

fn build_state_table() -> Vec<StateDescriptor> {
    use CleanupKind as C;
    use CreatureStateId as S;
    use MoveCheckKind as M;
    use OverrideCapabilities as O;
    use StateBehavior as B;
    use StateCategory as T;

    let e = StateDescriptor::new;
    let table = vec![
        e(S::Unused, B::Null, T::Idle),
        e(S::ImpDoingNothing, B::ImpDoingNothing, T::Idle),
        e(S::ImpArrivesAtDigDirt, B::ImpArrivesAtDigOrMine, T::Work).cleanup(C::StopDiggerWork),
        e(S::ImpArrivesAtMineGold, B::ImpArrivesAtDigOrMine, T::Work).cleanup(C::StopDiggerWork),
        e(S::ImpDigsDirt, B::ImpDigsMines, T::Work).cleanup(C::StopDiggerWork),
        e(S::ImpMinesGold, B::ImpDigsMines, T::Work).cleanup(C::StopDiggerWork),
        e(S::Null6, B::Null, T::Idle),
        e(S::ImpDropsGold, B::ImpDropsGold, T::Work),
        e(S::ImpLastDidJob, B::ImpLastDidJob, T::Idle),
        e(S::ImpArrivesAtImproveDungeon, B::ImpArrivesAtImproveDungeon, T::Work).cleanup(C::StopDiggerWork),
        e(S::ImpImprovesDungeon, B::ImpImprovesDungeon, T::Work).cleanup(C::StopDiggerWork),
        e(S::CreaturePicksUpTrapObject, B::PicksUpTrapObject, T::Work),
        e(S::CreatureArmsTrap, B::ArmsTrap, T::Work).cleanup(C::DropDragged).check(M::StillDragging),
        e(S::CreaturePicksUpCrateForWorkshop, B::PicksUpCrateForWorkshop, T::Work),
        e(S::MoveToPosition, B::Move, T::Move),
        e(S::Null15, B::Null, T::Idle),
        e(S::CreatureDropsCrateInWorkshop, B::DropsCrateInWorkshop, T::Work)
            .cleanup(C::DropDragged)
            .check(M::StillDragging),
        e(S::CreatureDoingNothing, B::PersonIdle, T::Idle),
        e(S::CreatureToGarden, B::ToGarden, T::Feed).overrides(O::NEEDS).check(M::OnHeadForRoom),
        e(S::CreatureArrivedAtGarden, B::ArrivedAtGarden, T::Feed).overrides(O::NEEDS).cleanup(C::LeaveRoom),
        e(S::CreatureWantsAHome, B::WantsAHome, T::OwnNeeds).overrides(O::NEEDS),
        e(S::CreatureChooseRoomForLairSite, B::ChooseLairSite, T::OwnNeeds).overrides(O::NEEDS),
        e(S::CreatureAtNewLair, B::AtNewLair, T::OwnNeeds).overrides(O::NEEDS),
        e(S::PersonSulkHeadForLair, B::SulkHeadForLair, T::OwnNeeds).overrides(O::NEEDS),
        e(S::PersonSulkAtLair, B::Sulking, T::OwnNeeds).overrides(O::NEEDS),
        e(S::CreatureGoingHomeToSleep, B::GoingHomeToSleep, T::Sleep).overrides(O::NEEDS).check(M::OnHeadForRoom),
        e(S::CreatureSleep, B::Sleep, T::Sleep).overrides(O::NEEDS).cleanup(C::LeaveRoom),
        e(S::Null27, B::Null, T::Idle),
        e(S::Tunnelling, B::Passive, T::Work),
        e(S::Null29, B::Null, T::Idle),
        e(S::AtResearchRoom, B::ArriveAtWorkRoom, T::Work).check(M::OnHeadForRoom),
        e(S::Researching, B::WorkInRoom, T::Work).cleanup(C::LeaveRoom),
        e(S::AtTrainingRoom, B::ArriveAtWorkRoom, T::Work).check(M::OnHeadForRoom),
        e(S::Training, B::WorkInRoom, T::Work).cleanup(C::LeaveRoom),
        e(S::GoodDoingNothing, B::GoodIdle, T::Idle),
        e(S::GoodReturnsToStart, B::Passive, T::Idle),
        e(S::GoodBackAtStart, B::Passive, T::Idle),
        e(S::GoodDropsGold, B::Passive, T::Work),
        e(S::InPowerHand, B::Passive, T::Idle).overrides(O::ALL).transition(),
        e(S::ArriveAtCallToArms, B::AtCallToArms, T::Called2Arms).overrides(O::CALL_TO_ARMS),
        e(S::CreatureArrivedAtPrison, B::ArrivedAtPrison, T::Idle).captive(),
        e(S::CreatureInPrison, B::InPrison, T::Idle).captive().cleanup(C::LeaveRoom),
        e(S::AtTortureRoom, B::ArriveAtWorkRoom, T::Idle).captive(),
        e(S::Torturing, B::WorkInRoom, T::Idle).captive().cleanup(C::LeaveRoom),
        e(S::AtWorkshopRoom, B::ArriveAtWorkRoom, T::Work).check(M::OnHeadForRoom),
        e(S::Manufacturing, B::WorkInRoom, T::Work).cleanup(C::LeaveRoom),
        e(S::AtScavengerRoom, B::ArriveAtWorkRoom, T::Work).check(M::OnHeadForRoom),
        e(S::Scavengering, B::WorkInRoom, T::Work).cleanup(C::LeaveRoom),
        e(S::CreatureDormant, B::Dormant, T::Idle),
        e(S::CreatureInCombat, B::Passive, T::FightCreature).overrides(O::COMBAT).cleanup(C::StopCombat),
        e(S::CreatureLeavingDungeon, B::LeavingDungeon, T::AngerJob).overrides(O::ANGER).check(M::NearEntrance),
        e(S::CreatureLeaves, B::Leaves, T::AngerJob).overrides(O::ANGER).transition(),
        e(S::CreatureInHoldAudience, B::Passive, T::Idle),
        e(S::PatrolHere, B::Patrol, T::Work),
        e(S::Patrolling, B::Patrol, T::Work),
        e(S::Null55, B::Null, T::Idle),
        e(S::Null56, B::Null, T::Idle),
        e(S::Null57, B::Null, T::Idle),
        e(S::Null58, B::Null, T::Idle),
        e(S::CreatureKillCreatures, B::KillCreatures, T::AngerJob).overrides(O::ANGER),
        e(S::Null60, B::Null, T::Idle),
        e(S::PersonSulking, B::Sulking, T::OwnNeeds).overrides(O::NEEDS),
        e(S::Null62, B::Null, T::Idle),
        e(S::Null63, B::Null, T::Idle),
        e(S::AtBarrackRoom, B::ArriveAtWorkRoom, T::Work).check(M::OnHeadForRoom),
        e(S::Barracking, B::WorkInRoom, T::Work).cleanup(C::LeaveRoom),
        e(S::CreatureSlapCowers, B::SlapCowers, T::Idle).overrides(O::ALL).cleanup(C::DiscardSaved),
        e(S::CreatureUnconscious, B::Unconscious, T::Unconscious).overrides(O::ALL),
        e(S::CreaturePickUpUnconsciousBody, B::PickUpUnconsciousBody, T::Work),
        e(S::ImpToking, B::ImpToking, T::Idle),
        e(S::ImpPicksUpGoldPile, B::ImpPicksUpGoldPile, T::Work),
        e(S::MoveBackwardsToPosition, B::Move, T::Move),
        e(S::CreatureDropBodyInPrison, B::DropBodyInPrison, T::Work)
            .cleanup(C::DropDragged)
            .check(M::StillDragging),
        e(S::ImpArrivesAtConvertDungeon, B::ImpArrivesAtConvertDungeon, T::Work).cleanup(C::StopDiggerWork),
        e(S::ImpConvertsDungeon, B::ImpConvertsDungeon, T::Work).cleanup(C::StopDiggerWork),
        e(S::CreatureWantsSalary, B::WantsSalary, T::GetsSalary).overrides(O::NEEDS).check(M::WaitAtDoorForWage),
        e(S::CreatureTakeSalary, B::TakeSalary, T::GetsSalary).overrides(O::NEEDS),
        e(S::TunnellerDoingNothing, B::GoodIdle, T::Idle),
        e(S::CreatureObjectCombat, B::Passive, T::FightObject).overrides(O::COMBAT).cleanup(C::StopCombat),
        e(S::Null79, B::Null, T::Idle),
        e(S::CreatureChangeLair, B::WantsAHome, T::OwnNeeds).overrides(O::NEEDS),
        e(S::ImpBirth, B::Countdown, T::Idle).transition(),
        e(S::AtTemple, B::ArriveAtWorkRoom, T::Work).check(M::OnHeadForRoom),
        e(S::PrayingInTemple, B::WorkInRoom, T::Work).cleanup(C::LeaveRoom),
        e(S::Null84, B::Null, T::Idle),
        e(S::CreatureFollowLeader, B::FollowLeader, T::Follow),
        e(S::CreatureDoorCombat, B::Passive, T::FightDoor).overrides(O::COMBAT).cleanup(C::StopCombat),
        e(S::CreatureCombatFlee, B::Passive, T::Escape).overrides(O::URGENT),
        e(S::CreatureSacrifice, B::Passive, T::Work),
        e(S::AtLairToSleep, B::AtLairToSleep, T::Sleep).overrides(O::NEEDS),
        e(S::CreatureExempt, B::Passive, T::Idle),
        e(S::CreatureBeingDropped, B::Countdown, T::Idle).overrides(O::ALL).transition(),
        e(S::CreatureBeingSacrificed, B::Passive, T::Idle).overrides(O::ALL).captive().transition(),
        e(S::CreatureScavengedDisappear, B::Countdown, T::Idle).overrides(O::ALL).transition(),
        e(S::CreatureScavengedReappear, B::Countdown, T::Idle).overrides(O::ALL).transition(),
        e(S::CreatureBeingSummoned, B::Countdown, T::Idle).overrides(O::ALL).transition(),
        e(S::CreatureHeroEntering, B::Countdown, T::Idle).transition(),
        e(S::ImpArrivesAtReinforce, B::ImpArrivesAtReinforce, T::Work).cleanup(C::StopDiggerWork),
        e(S::ImpReinforces, B::ImpReinforces, T::Work).cleanup(C::StopDiggerWork),
        e(S::ArriveAtAlarm, B::AtCallToArms, T::Called2Arms).overrides(O::CALL_TO_ARMS),
        e(S::CreaturePicksUpSpellObject, B::PicksUpSpellObject, T::Work),
        e(S::CreatureDropsSpellObjectInLibrary, B::DropsSpellObjectInLibrary, T::Work)
            .cleanup(C::DropDragged)
            .check(M::StillDragging),
        e(S::CreaturePicksUpCorpse, B::PicksUpCorpse, T::Work),
        e(S::CreatureDropsCorpseInGraveyard, B::DropsCorpseInGraveyard, T::Work)
            .cleanup(C::DropDragged)
            .check(M::StillDragging),
        e(S::AtGuardPostRoom, B::ArriveAtWorkRoom, T::Work).check(M::OnHeadForRoom),
        e(S::Guarding, B::WorkInRoom, T::Work).cleanup(C::LeaveRoom),
        e(S::CreatureEat, B::Eating, T::Feed).overrides(O::NEEDS),
        e(S::CreatureEvacuateRoom, B::Passive, T::OwnNeeds),
        e(S::CreatureWaitAtTreasureRoomDoor, B::Countdown, T::GetsSalary).overrides(O::NEEDS),
        e(S::AtKinkyTortureRoom, B::ArriveAtWorkRoom, T::Work).check(M::OnHeadForRoom),
        e(S::KinkyTorturing, B::WorkInRoom, T::Work).cleanup(C::LeaveRoom),
        e(S::MadKillingPsycho, B::MadKillingPsycho, T::AngerJob).overrides(O::ANGER),
        e(S::CreatureSearchForGoldToStealInRoom1, B::StealGold, T::AngerJob).overrides(O::ANGER),
        e(S::CreatureVandaliseRooms, B::VandaliseRooms, T::AngerJob).overrides(O::ANGER),
        e(S::CreatureStealGold, B::StealGold, T::AngerJob).overrides(O::ANGER),
        e(S::SeekTheEnemy, B::SeekTheEnemy, T::Work),
        e(S::AlreadyAtCallToArms, B::AtCallToArms, T::Called2Arms).overrides(O::CALL_TO_ARMS),
        e(S::CreatureDamageWalls, B::DamageWalls, T::AngerJob).overrides(O::ANGER).check(M::CanDamageWall),
        e(S::CreatureAttemptToDamageWalls, B::DamageWalls, T::AngerJob)
            .overrides(O::ANGER)
            .check(M::CanDamageWall),
        e(S::CreaturePersuade, B::Persuade, T::AngerJob).overrides(O::ANGER).cleanup(C::StopPersuade),
        e(S::CreatureChangeToChicken, B::Countdown, T::Idle).overrides(O::ALL).transition(),
        e(S::CreatureChangeFromChicken, B::Countdown, T::Idle).overrides(O::ALL).transition(),
        e(S::ManualControl, B::Passive, T::Idle).overrides(O::ALL),
        e(S::CreatureCannotFindAnythingToDo, B::Countdown, T::Idle),
        e(S::CreaturePiss, B::Countdown, T::Idle),
        e(S::CreatureRoar, B::Countdown, T::Idle),
        e(S::CreatureAtChangedLair, B::AtNewLair, T::OwnNeeds).overrides(O::NEEDS),
        e(S::CreatureBeHappy, B::Countdown, T::Idle),
        e(S::GoodLeaveThroughExitDoor, B::Passive, T::Idle),
        e(S::GoodWaitInExitDoor, B::Passive, T::Idle),
        e(S::GoodAttackRoom1, B::Passive, T::Work),
        e(S::CreatureSearchForGoldToStealInRoom2, B::StealGold, T::AngerJob).overrides(O::ANGER),
        e(S::GoodAttackRoom2, B::Passive, T::Work),
        e(S::CreaturePretendChickenSetupMove, B::PretendChicken, T::Idle),
        e(S::CreaturePretendChickenMove, B::PretendChicken, T::Idle),
        e(S::CreatureAttackRooms, B::VandaliseRooms, T::AngerJob).overrides(O::ANGER),
        e(S::CreatureFreezePrisoners, B::FreezePrisoners, T::Work),
        e(S::CreatureExploreDungeon, B::ExploreDungeon, T::Work),
        e(S::CreatureEatingAtGarden, B::Eating, T::Feed).overrides(O::NEEDS).cleanup(C::LeaveRoom),
        e(S::LeavesBecauseOwnerLost, B::LeavingDungeon, T::Idle).overrides(O::URGENT),
        e(S::CreatureMoan, B::Countdown, T::Idle),
        e(S::CreatureSetWorkRoomBasedOnPosition, B::SetWorkRoomBasedOnPosition, T::Idle),
        e(S::CreatureBeingScavenged, B::Countdown, T::Idle).transition(),
        e(S::CreatureEscapingDeath, B::Passive, T::Escape).overrides(O::URGENT).transition(),
        e(S::CreaturePresentToDungeonHeart, B::Countdown, T::Idle),
        e(S::CreatureSearchForSpellToStealInRoom, B::Passive, T::AngerJob).overrides(O::ANGER),
        e(S::CreatureStealSpell, B::Passive, T::AngerJob).overrides(O::ANGER),
        e(S::GoodArrivedAtAttackRoom, B::Passive, T::Work).door_fight_exception(),
        e(S::CreatureGoingToSafetyForToking, B::Passive, T::OwnNeeds).overrides(O::NEEDS),
    ];
    debug_assert_eq!(table.len(), CREATURE_STATES_COUNT);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_complete_and_ordered() {
        let table = state_table();
        assert_eq!(table.len(), CREATURE_STATES_COUNT);
        for (idx, descriptor) in table.iter().enumerate() {
            assert_eq!(
                descriptor.id.raw() as usize,
                idx,
                "descriptor for {} is at index {}",
                descriptor.id,
                idx
            );
        }
    }

    #[test]
    fn test_out_of_range_falls_back_to_state_zero() {
        let stats = ErrorStats::new();
        let descriptor = state_info_raw(500, &stats);
        assert!(descriptor.is_invalid());
        assert_eq!(stats.get(ErrorStatKind::StateOutOfRange), 1);

        let descriptor = state_info_raw(CreatureStateId::CreatureSleep.raw(), &stats);
        assert_eq!(descriptor.id, CreatureStateId::CreatureSleep);
        assert_eq!(stats.get(ErrorStatKind::StateOutOfRange), 1);
    }

    #[test]
    fn test_only_move_states_have_move_category() {
        for descriptor in state_table() {
            assert_eq!(
                descriptor.category == StateCategory::Move,
                descriptor.id.is_move(),
                "{} has inconsistent move category",
                descriptor.id
            );
        }
    }

    #[test]
    fn test_override_categories_without_flags_always_pass() {
        let none = OverrideCapabilities::NONE;
        assert!(none.overrides(StateCategory::Idle));
        assert!(none.overrides(StateCategory::Work));
        assert!(!none.overrides(StateCategory::Sleep));
        assert!(OverrideCapabilities::ANGER.overrides(StateCategory::Sleep));
        assert!(!OverrideCapabilities::ANGER.overrides(StateCategory::FightCreature));
    }
}
