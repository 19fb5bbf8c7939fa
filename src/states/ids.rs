//! Creature state identifiers
//!
//! The numbering is persistent: save games and scripts store states as
//! plain integers, so variants must never be reordered.

use serde::{Deserialize, Serialize};

macro_rules! creature_states {
    ($($name:ident = $idx:expr,)*) => {
        /// Identifier of one behavior state in the creature state table
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u16)]
        pub enum CreatureStateId {
            $($name = $idx,)*
        }

        impl CreatureStateId {
            /// Every state, indexed by its numeric id
            pub const ALL: &'static [CreatureStateId] = &[$(CreatureStateId::$name,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(CreatureStateId::$name => stringify!($name),)*
                }
            }

            /// Look up a state by its name, as written in rule files
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($name) => Some(CreatureStateId::$name),)*
                    _ => None,
                }
            }
        }
    };
}

creature_states! {
    Unused = 0,
    ImpDoingNothing = 1,
    ImpArrivesAtDigDirt = 2,
    ImpArrivesAtMineGold = 3,
    ImpDigsDirt = 4,
    ImpMinesGold = 5,
    Null6 = 6,
    ImpDropsGold = 7,
    ImpLastDidJob = 8,
    ImpArrivesAtImproveDungeon = 9,
    ImpImprovesDungeon = 10,
    CreaturePicksUpTrapObject = 11,
    CreatureArmsTrap = 12,
    CreaturePicksUpCrateForWorkshop = 13,
    MoveToPosition = 14,
    Null15 = 15,
    CreatureDropsCrateInWorkshop = 16,
    CreatureDoingNothing = 17,
    CreatureToGarden = 18,
    CreatureArrivedAtGarden = 19,
    CreatureWantsAHome = 20,
    CreatureChooseRoomForLairSite = 21,
    CreatureAtNewLair = 22,
    PersonSulkHeadForLair = 23,
    PersonSulkAtLair = 24,
    CreatureGoingHomeToSleep = 25,
    CreatureSleep = 26,
    Null27 = 27,
    Tunnelling = 28,
    Null29 = 29,
    AtResearchRoom = 30,
    Researching = 31,
    AtTrainingRoom = 32,
    Training = 33,
    GoodDoingNothing = 34,
    GoodReturnsToStart = 35,
    GoodBackAtStart = 36,
    GoodDropsGold = 37,
    InPowerHand = 38,
    ArriveAtCallToArms = 39,
    CreatureArrivedAtPrison = 40,
    CreatureInPrison = 41,
    AtTortureRoom = 42,
    Torturing = 43,
    AtWorkshopRoom = 44,
    Manufacturing = 45,
    AtScavengerRoom = 46,
    Scavengering = 47,
    CreatureDormant = 48,
    CreatureInCombat = 49,
    CreatureLeavingDungeon = 50,
    CreatureLeaves = 51,
    CreatureInHoldAudience = 52,
    PatrolHere = 53,
    Patrolling = 54,
    Null55 = 55,
    Null56 = 56,
    Null57 = 57,
    Null58 = 58,
    CreatureKillCreatures = 59,
    Null60 = 60,
    PersonSulking = 61,
    Null62 = 62,
    Null63 = 63,
    AtBarrackRoom = 64,
    Barracking = 65,
    CreatureSlapCowers = 66,
    CreatureUnconscious = 67,
    CreaturePickUpUnconsciousBody = 68,
    ImpToking = 69,
    ImpPicksUpGoldPile = 70,
    MoveBackwardsToPosition = 71,
    CreatureDropBodyInPrison = 72,
    ImpArrivesAtConvertDungeon = 73,
    ImpConvertsDungeon = 74,
    CreatureWantsSalary = 75,
    CreatureTakeSalary = 76,
    TunnellerDoingNothing = 77,
    CreatureObjectCombat = 78,
    Null79 = 79,
    CreatureChangeLair = 80,
    ImpBirth = 81,
    AtTemple = 82,
    PrayingInTemple = 83,
    Null84 = 84,
    CreatureFollowLeader = 85,
    CreatureDoorCombat = 86,
    CreatureCombatFlee = 87,
    CreatureSacrifice = 88,
    AtLairToSleep = 89,
    CreatureExempt = 90,
    CreatureBeingDropped = 91,
    CreatureBeingSacrificed = 92,
    CreatureScavengedDisappear = 93,
    CreatureScavengedReappear = 94,
    CreatureBeingSummoned = 95,
    CreatureHeroEntering = 96,
    ImpArrivesAtReinforce = 97,
    ImpReinforces = 98,
    ArriveAtAlarm = 99,
    CreaturePicksUpSpellObject = 100,
    CreatureDropsSpellObjectInLibrary = 101,
    CreaturePicksUpCorpse = 102,
    CreatureDropsCorpseInGraveyard = 103,
    AtGuardPostRoom = 104,
    Guarding = 105,
    CreatureEat = 106,
    CreatureEvacuateRoom = 107,
    CreatureWaitAtTreasureRoomDoor = 108,
    AtKinkyTortureRoom = 109,
    KinkyTorturing = 110,
    MadKillingPsycho = 111,
    CreatureSearchForGoldToStealInRoom1 = 112,
    CreatureVandaliseRooms = 113,
    CreatureStealGold = 114,
    SeekTheEnemy = 115,
    AlreadyAtCallToArms = 116,
    CreatureDamageWalls = 117,
    CreatureAttemptToDamageWalls = 118,
    CreaturePersuade = 119,
    CreatureChangeToChicken = 120,
    CreatureChangeFromChicken = 121,
    ManualControl = 122,
    CreatureCannotFindAnythingToDo = 123,
    CreaturePiss = 124,
    CreatureRoar = 125,
    CreatureAtChangedLair = 126,
    CreatureBeHappy = 127,
    GoodLeaveThroughExitDoor = 128,
    GoodWaitInExitDoor = 129,
    GoodAttackRoom1 = 130,
    CreatureSearchForGoldToStealInRoom2 = 131,
    GoodAttackRoom2 = 132,
    CreaturePretendChickenSetupMove = 133,
    CreaturePretendChickenMove = 134,
    CreatureAttackRooms = 135,
    CreatureFreezePrisoners = 136,
    CreatureExploreDungeon = 137,
    CreatureEatingAtGarden = 138,
    LeavesBecauseOwnerLost = 139,
    CreatureMoan = 140,
    CreatureSetWorkRoomBasedOnPosition = 141,
    CreatureBeingScavenged = 142,
    CreatureEscapingDeath = 143,
    CreaturePresentToDungeonHeart = 144,
    CreatureSearchForSpellToStealInRoom = 145,
    CreatureStealSpell = 146,
    GoodArrivedAtAttackRoom = 147,
    CreatureGoingToSafetyForToking = 148,
}

/// Number of states in the table
pub const CREATURE_STATES_COUNT: usize = 149;

impl CreatureStateId {
    /// Convert a stored integer back to a state, if it is in range
    pub fn from_raw(raw: u16) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    pub fn raw(self) -> u16 {
        self as u16
    }

    /// The transient movement states, which resolve to their continue state
    pub fn is_move(self) -> bool {
        matches!(self, CreatureStateId::MoveToPosition | CreatureStateId::MoveBackwardsToPosition)
    }
}

impl Default for CreatureStateId {
    fn default() -> Self {
        CreatureStateId::Unused
    }
}

impl std::fmt::Display for CreatureStateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_indexed_by_id() {
        assert_eq!(CreatureStateId::ALL.len(), CREATURE_STATES_COUNT);
        for (idx, state) in CreatureStateId::ALL.iter().enumerate() {
            assert_eq!(state.raw() as usize, idx, "{} stored at wrong index", state);
        }
    }

    #[test]
    fn test_from_raw_rejects_out_of_range() {
        assert_eq!(CreatureStateId::from_raw(70), Some(CreatureStateId::ImpPicksUpGoldPile));
        assert_eq!(CreatureStateId::from_raw(149), None);
        assert_eq!(CreatureStateId::from_raw(u16::MAX), None);
    }

    #[test]
    fn test_names_round_trip_through_lookup() {
        assert_eq!(
            CreatureStateId::from_name("CreatureDoingNothing"),
            Some(CreatureStateId::CreatureDoingNothing)
        );
        assert_eq!(CreatureStateId::from_name("NoSuchState"), None);
    }
}
