//! Objects lying around the dungeon
//!
//! Gold, spellbooks, crates, corpses and traps. Ids are stable indices;
//! removed things keep their slot with `exists == false`.

use serde::{Deserialize, Serialize};

use crate::core::types::{CreatureId, PlayerId, SubtileCoord, ThingId};
use crate::world::rooms::RoomRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThingKind {
    /// Loose gold on the floor
    GoldPile { gold: u32 },
    /// A spell which belongs in a library
    Spellbook { power: u8 },
    /// A special box which belongs in a library
    SpecialBox { box_kind: u8 },
    /// A boxed trap, used to arm an empty trap or stored in a workshop
    TrapCrate { trap_model: u8 },
    /// A boxed door, stored in a workshop
    DoorCrate { door_model: u8 },
    Corpse { laid_to_rest: bool, rottable: bool },
    /// An armed or spent trap; `shots == 0` means it needs re-arming
    Trap { trap_model: u8, shots: u32 },
}

impl ThingKind {
    pub fn is_gold_pile(&self) -> bool {
        matches!(self, ThingKind::GoldPile { .. })
    }

    pub fn is_spell_object(&self) -> bool {
        matches!(self, ThingKind::Spellbook { .. } | ThingKind::SpecialBox { .. })
    }

    pub fn is_workshop_crate(&self) -> bool {
        matches!(self, ThingKind::TrapCrate { .. } | ThingKind::DoorCrate { .. })
    }

    pub fn is_corpse(&self) -> bool {
        matches!(self, ThingKind::Corpse { .. })
    }

    pub fn is_trap_crate(&self) -> bool {
        matches!(self, ThingKind::TrapCrate { .. })
    }

    /// Whether a room of the role is where this thing is stored
    pub fn is_room_inventory(&self, role: RoomRole) -> bool {
        match self {
            ThingKind::Spellbook { .. } | ThingKind::SpecialBox { .. } => role.intersects(RoomRole::POWERS_STORAGE),
            ThingKind::TrapCrate { .. } | ThingKind::DoorCrate { .. } => role.intersects(RoomRole::CRATES_STORAGE),
            ThingKind::Corpse { .. } => role.intersects(RoomRole::DEAD_STORAGE),
            ThingKind::GoldPile { .. } => role.intersects(RoomRole::GOLD_STORAGE),
            ThingKind::Trap { .. } => false,
        }
    }

    /// A corpse which may still be hauled to a graveyard
    pub fn is_collectable_corpse(&self) -> bool {
        matches!(self, ThingKind::Corpse { laid_to_rest: false, rottable: true })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thing {
    pub id: ThingId,
    pub kind: ThingKind,
    pub owner: PlayerId,
    pub pos: SubtileCoord,
    /// Creature currently carrying this thing
    pub dragged_by: Option<CreatureId>,
    pub exists: bool,
}

impl Thing {
    /// Lying on the floor, free to be taken
    pub fn is_on_floor(&self) -> bool {
        self.exists && self.dragged_by.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThingStore {
    things: Vec<Thing>,
}

impl ThingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, kind: ThingKind, owner: PlayerId, pos: SubtileCoord) -> ThingId {
        let id = ThingId::new(self.things.len() as u32);
        self.things.push(Thing { id, kind, owner, pos, dragged_by: None, exists: true });
        id
    }

    pub fn get(&self, id: ThingId) -> Option<&Thing> {
        self.things.get(id.index()).filter(|t| t.exists)
    }

    pub fn get_mut(&mut self, id: ThingId) -> Option<&mut Thing> {
        self.things.get_mut(id.index()).filter(|t| t.exists)
    }

    pub fn remove(&mut self, id: ThingId) {
        if let Some(thing) = self.things.get_mut(id.index()) {
            thing.exists = false;
            thing.dragged_by = None;
        }
    }

    /// Existing things, in spawn order
    pub fn iter(&self) -> impl Iterator<Item = &Thing> {
        self.things.iter().filter(|t| t.exists)
    }

    /// Existing things lying on the given subtile
    pub fn at_subtile(&self, stl: SubtileCoord) -> impl Iterator<Item = &Thing> {
        self.iter().filter(move |t| t.pos == stl && t.dragged_by.is_none())
    }

    /// Existing things lying anywhere on the slab of the given subtile
    pub fn on_slab_of(&self, stl: SubtileCoord) -> impl Iterator<Item = &Thing> {
        let slab = stl.slab();
        self.iter().filter(move |t| t.pos.slab() == slab && t.dragged_by.is_none())
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Total gold lying in piles on the given subtile
    pub fn gold_at(&self, stl: SubtileCoord) -> u32 {
        self.at_subtile(stl)
            .map(|t| match t.kind {
                ThingKind::GoldPile { gold } => gold,
                _ => 0,
            })
            .sum()
    }

    /// Take up to `limit` gold from the piles on a subtile, deleting
    /// emptied piles. Returns the amount taken.
    pub fn take_gold_at(&mut self, stl: SubtileCoord, limit: u32) -> u32 {
        let mut taken = 0;
        for thing in self.things.iter_mut().filter(|t| t.exists && t.pos == stl && t.dragged_by.is_none()) {
            if taken >= limit {
                break;
            }
            if let ThingKind::GoldPile { gold } = &mut thing.kind {
                let part = (*gold).min(limit - taken);
                *gold -= part;
                taken += part;
                if *gold == 0 {
                    thing.exists = false;
                }
            }
        }
        taken
    }

    /// Put a carried thing down at the given place
    pub fn drop_at(&mut self, id: ThingId, pos: SubtileCoord) {
        if let Some(thing) = self.get_mut(id) {
            thing.dragged_by = None;
            thing.pos = pos;
        }
    }

    /// Thing carried by the given creature, if any
    pub fn dragged_by(&self, creature: CreatureId) -> Option<&Thing> {
        self.iter().find(|t| t.dragged_by == Some(creature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_gold_spans_piles() {
        let mut things = ThingStore::new();
        let stl = SubtileCoord::new(4, 4);
        let a = things.spawn(ThingKind::GoldPile { gold: 100 }, PlayerId::NEUTRAL, stl);
        let b = things.spawn(ThingKind::GoldPile { gold: 300 }, PlayerId::NEUTRAL, stl);

        assert_eq!(things.gold_at(stl), 400);
        let taken = things.take_gold_at(stl, 250);
        assert_eq!(taken, 250);
        assert!(things.get(a).is_none(), "first pile is emptied and removed");
        assert!(matches!(things.get(b).unwrap().kind, ThingKind::GoldPile { gold: 150 }));
    }

    #[test]
    fn test_removed_things_are_invisible() {
        let mut things = ThingStore::new();
        let id = things.spawn(ThingKind::Spellbook { power: 3 }, PlayerId::NEUTRAL, SubtileCoord::new(1, 1));
        things.remove(id);
        assert!(things.get(id).is_none());
        assert_eq!(things.count(), 0);
    }
}
