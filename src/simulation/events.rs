//! Player-facing events and messages
//!
//! The core never renders anything. It reports what happened through an
//! `EventSink`, and the default sink simply records everything so that
//! tests and the headless runner can inspect it.

use serde::{Deserialize, Serialize};

use crate::core::types::{PlayerId, SubtileCoord, Tick};
use crate::world::rooms::RoomKind;

/// Map events a keeper is alerted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Own creatures are fighting an enemy
    EnemyFight,
    /// The dungeon heart is under attack
    HeartAttacked,
    /// An enemy digger is converting one of the rooms
    RoomUnderAttack,
    TreasuryRoomFull,
    PrisonFull,
    GraveyardFull,
    LibraryFull,
    WorkshopFull,
    /// A digger found a trap crate and is bringing it home
    TrapCrateFound,
    DoorCrateFound,
    /// A room needed by a job cannot be reached or does not exist
    NoRoomOfRole,
}

impl EventKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "EnemyFight" => EventKind::EnemyFight,
            "HeartAttacked" => EventKind::HeartAttacked,
            "RoomUnderAttack" => EventKind::RoomUnderAttack,
            "TreasuryRoomFull" => EventKind::TreasuryRoomFull,
            "PrisonFull" => EventKind::PrisonFull,
            "GraveyardFull" => EventKind::GraveyardFull,
            "LibraryFull" => EventKind::LibraryFull,
            "WorkshopFull" => EventKind::WorkshopFull,
            "TrapCrateFound" => EventKind::TrapCrateFound,
            "DoorCrateFound" => EventKind::DoorCrateFound,
            "NoRoomOfRole" => EventKind::NoRoomOfRole,
            _ => return None,
        };
        Some(kind)
    }
}

/// Spoken or printed notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMessage {
    RoomNeeded(RoomKind),
    RoomTooSmall(RoomKind),
    NoMoreResearch,
    CreatureDestroysRooms,
    CreatureLeaving,
    CreaturePersuaded,
    CreatureJoinedEnemy,
    NotEnoughGold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub turn: Tick,
    pub kind: EventKind,
    pub player: PlayerId,
    pub pos: SubtileCoord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub turn: Tick,
    pub player: PlayerId,
    pub message: GameMessage,
}

/// Receiver of events and messages raised by the creature core
pub trait EventSink {
    fn output_message(&mut self, turn: Tick, player: PlayerId, message: GameMessage);

    /// Create an event, or refresh an existing one of the same kind nearby
    fn create_event(&mut self, turn: Tick, pos: SubtileCoord, kind: EventKind, player: PlayerId);

    /// Most recent live event of the kind for the player
    fn find_event(&self, player: PlayerId, kind: EventKind) -> Option<&EventRecord>;

    /// Whether the message was ever sent to the player
    fn has_message(&self, player: PlayerId, message: GameMessage) -> bool;

    /// Number of live events of the kind, over all players
    fn event_count(&self, kind: EventKind) -> usize;
}

/// Distance (subtiles) within which a new event refreshes an old one
const EVENT_MERGE_DISTANCE: i32 = 15;

/// Recording sink
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    pub events: Vec<EventRecord>,
    pub messages: Vec<MessageRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for EventLog {
    fn output_message(&mut self, turn: Tick, player: PlayerId, message: GameMessage) {
        tracing::debug!("Message for player {}: {:?}", player.0, message);
        self.messages.push(MessageRecord { turn, player, message });
    }

    fn create_event(&mut self, turn: Tick, pos: SubtileCoord, kind: EventKind, player: PlayerId) {
        if let Some(existing) = self
            .events
            .iter_mut()
            .find(|e| e.kind == kind && e.player == player && e.pos.distance(&pos) <= EVENT_MERGE_DISTANCE)
        {
            existing.turn = turn;
            existing.pos = pos;
            return;
        }
        tracing::debug!("Event {:?} for player {} at ({}, {})", kind, player.0, pos.x, pos.y);
        self.events.push(EventRecord { turn, kind, player, pos });
    }

    fn find_event(&self, player: PlayerId, kind: EventKind) -> Option<&EventRecord> {
        self.events.iter().rev().find(|e| e.player == player && e.kind == kind)
    }

    fn has_message(&self, player: PlayerId, message: GameMessage) -> bool {
        self.messages.iter().any(|m| m.player == player && m.message == message)
    }

    fn event_count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearby_events_are_merged() {
        let mut log = EventLog::new();
        let me = PlayerId::new(0);
        log.create_event(1, SubtileCoord::new(10, 10), EventKind::EnemyFight, me);
        log.create_event(5, SubtileCoord::new(12, 11), EventKind::EnemyFight, me);
        log.create_event(6, SubtileCoord::new(60, 60), EventKind::EnemyFight, me);
        assert_eq!(log.event_count(EventKind::EnemyFight), 2, "close events refresh, far ones are new");
        assert_eq!(log.find_event(me, EventKind::EnemyFight).map(|e| e.turn), Some(6));
        assert!(log.find_event(PlayerId::new(1), EventKind::EnemyFight).is_none());
    }
}
