//! Storage for the waiting slot and the room table

use std::collections::HashMap;

use crate::game::{Room, RoomId, SessionId};

/// Backing store for matchmaking state.
///
/// Only the in-memory store exists today; a shared store would implement the
/// same contract. Implementations must keep the session → room index in step
/// with the room table.
pub trait MatchStore: Send + 'static {
    /// Session currently parked in the waiting slot
    fn waiting(&self) -> Option<SessionId>;

    fn set_waiting(&mut self, session: Option<SessionId>);

    fn insert_room(&mut self, room: Room);

    fn room(&self, id: &RoomId) -> Option<&Room>;

    fn room_mut(&mut self, id: &RoomId) -> Option<&mut Room>;

    fn remove_room(&mut self, id: &RoomId) -> Option<Room>;

    /// Room the session is a member of, if any
    fn room_of(&self, session: SessionId) -> Option<RoomId>;

    fn room_count(&self) -> usize;
}

/// Process-memory store, lost on restart
#[derive(Debug, Default)]
pub struct InMemoryStore {
    waiting: Option<SessionId>,
    rooms: HashMap<RoomId, Room>,
    memberships: HashMap<SessionId, RoomId>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchStore for InMemoryStore {
    fn waiting(&self) -> Option<SessionId> {
        self.waiting
    }

    fn set_waiting(&mut self, session: Option<SessionId>) {
        self.waiting = session;
    }

    fn insert_room(&mut self, room: Room) {
        let id = room.id();
        for player in room.players() {
            self.memberships.insert(player, id);
        }
        self.rooms.insert(id, room);
    }

    fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    fn room_mut(&mut self, id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    fn remove_room(&mut self, id: &RoomId) -> Option<Room> {
        let room = self.rooms.remove(id)?;
        for player in room.players() {
            // Only drop the index entry if it still points at this room
            if self.memberships.get(&player) == Some(id) {
                self.memberships.remove(&player);
            }
        }
        Some(room)
    }

    fn room_of(&self, session: SessionId) -> Option<RoomId> {
        self.memberships.get(&session).copied()
    }

    fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_follows_room_table() {
        let mut store = InMemoryStore::new();
        let a = SessionId::new();
        let b = SessionId::new();
        let room = Room::new(a, b);
        let id = room.id();

        store.insert_room(room);
        assert_eq!(store.room_of(a), Some(id));
        assert_eq!(store.room_of(b), Some(id));
        assert_eq!(store.room_count(), 1);

        assert!(store.remove_room(&id).is_some());
        assert_eq!(store.room_of(a), None);
        assert_eq!(store.room_count(), 0);
        assert!(store.remove_room(&id).is_none());
    }

    #[test]
    fn test_waiting_slot() {
        let mut store = InMemoryStore::new();
        assert_eq!(store.waiting(), None);

        let a = SessionId::new();
        store.set_waiting(Some(a));
        assert_eq!(store.waiting(), Some(a));

        store.set_waiting(None);
        assert_eq!(store.waiting(), None);
    }
}
