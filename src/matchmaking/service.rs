//! Matchmaking service - owns the waiting slot and the room table

use tracing::{debug, info};

use crate::game::room::MoveProgress;
use crate::game::{Move, Room, RoomId, SessionId};

use super::store::{InMemoryStore, MatchStore};

/// Where a queue request left the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueStatus {
    /// Parked in the waiting slot
    Waiting,
    /// Paired with the previously waiting session
    Matched {
        room_id: RoomId,
        players: [SessionId; 2],
    },
}

/// A room dissolved because one member left it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    pub room_id: RoomId,
    /// Member still connected, to be told the opponent left
    pub remaining: SessionId,
}

/// Result of a join-queue request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Room the caller was in before re-queuing, now dissolved
    pub left: Option<Departure>,
    pub status: QueueStatus,
}

/// Matchmaking service
///
/// Holds at most one waiting session. All mutation goes through `&mut self`;
/// the coordinator task is the sole owner.
pub struct MatchmakingService<S: MatchStore = InMemoryStore> {
    store: S,
}

impl MatchmakingService<InMemoryStore> {
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }
}

impl<S: MatchStore> MatchmakingService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Pair `session` with the waiting session, or park it as the waiting one
    pub fn request_match(&mut self, session: SessionId) -> JoinOutcome {
        // A waiting session must never also sit in a room
        let left = self.leave_room(session);

        let status = match self.store.waiting() {
            Some(waiting) if waiting != session => {
                self.store.set_waiting(None);

                let room = Room::new(waiting, session);
                let room_id = room.id();
                let players = room.players();
                self.store.insert_room(room);

                info!(
                    room_id = %room_id,
                    first = %waiting,
                    second = %session,
                    active_rooms = self.store.room_count(),
                    "Paired players"
                );

                QueueStatus::Matched { room_id, players }
            }
            _ => {
                self.store.set_waiting(Some(session));
                info!(session_id = %session, "Waiting for opponent");
                QueueStatus::Waiting
            }
        };

        JoinOutcome { left, status }
    }

    /// Clear the waiting slot if it holds `session`
    pub fn release(&mut self, session: SessionId) -> bool {
        if self.store.waiting() == Some(session) {
            self.store.set_waiting(None);
            debug!(session_id = %session, "Released waiting slot");
            true
        } else {
            false
        }
    }

    /// Dissolve the room `session` belongs to
    pub fn leave_room(&mut self, session: SessionId) -> Option<Departure> {
        let room_id = self.store.room_of(session)?;
        let room = self.store.remove_room(&room_id)?;
        let remaining = room.opponent_of(session)?;

        info!(
            room_id = %room_id,
            session_id = %session,
            rounds_played = room.rounds_played(),
            "Room dissolved"
        );

        Some(Departure { room_id, remaining })
    }

    /// Record a move; `None` when the room is gone or `session` is not in it
    pub fn submit_move(
        &mut self,
        room_id: &RoomId,
        session: SessionId,
        mv: Move,
    ) -> Option<MoveProgress> {
        let Some(room) = self.store.room_mut(room_id) else {
            debug!(room_id = %room_id, session_id = %session, "Move for unknown room ignored");
            return None;
        };

        let progress = room.record_move(session, mv);
        match &progress {
            Some(MoveProgress::Resolved(summary)) => {
                info!(
                    room_id = %room_id,
                    round = summary.round,
                    winner = ?summary.outcome.winner(),
                    "Round resolved"
                );
            }
            Some(MoveProgress::AwaitingOpponent { .. }) => {
                debug!(room_id = %room_id, session_id = %session, "Move recorded");
            }
            None => {
                debug!(room_id = %room_id, session_id = %session, "Move from non-member ignored");
            }
        }
        progress
    }

    /// Clear the current round; returns both players to notify
    pub fn request_rematch(
        &mut self,
        room_id: &RoomId,
        session: SessionId,
    ) -> Option<[SessionId; 2]> {
        let room = self.store.room_mut(room_id)?;
        if !room.contains(session) {
            debug!(room_id = %room_id, session_id = %session, "Rematch from non-member ignored");
            return None;
        }

        room.reset_round();
        debug!(room_id = %room_id, session_id = %session, "Round restarted");
        Some(room.players())
    }

    /// Members to relay a chat line to, if `sender` belongs to the room
    pub fn chat_recipients(&self, room_id: &RoomId, sender: SessionId) -> Option<[SessionId; 2]> {
        self.store
            .room(room_id)
            .filter(|room| room.contains(sender))
            .map(Room::players)
    }

    pub fn waiting(&self) -> Option<SessionId> {
        self.store.waiting()
    }

    pub fn active_rooms(&self) -> usize {
        self.store.room_count()
    }

    #[cfg(test)]
    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.store.room(room_id)
    }
}
