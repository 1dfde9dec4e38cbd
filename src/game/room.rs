//! Two-player rooms and per-round move bookkeeping

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::moves::{resolve_round, Move, RoundOutcome};
use super::SessionId;

/// Room key built from both member ids in canonical (sorted) order.
///
/// Serialized as a two element array of session ids. Deserialization
/// canonicalizes, so either member order names the same room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[SessionId; 2]")]
pub struct RoomId(SessionId, SessionId);

impl RoomId {
    pub fn new(a: SessionId, b: SessionId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    pub fn members(&self) -> [SessionId; 2] {
        [self.0, self.1]
    }
}

impl From<[SessionId; 2]> for RoomId {
    fn from([a, b]: [SessionId; 2]) -> Self {
        Self::new(a, b)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.0, self.1)
    }
}

/// Both moves of a finished round and who won
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    /// 1-based number of this round within the room
    pub round: u32,
    pub moves: BTreeMap<SessionId, Move>,
    pub outcome: RoundOutcome,
}

/// What happened after a move was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveProgress {
    /// Opponent has not moved yet this round
    AwaitingOpponent { opponent: SessionId },
    /// Both moves are in and the round was resolved
    Resolved(RoundSummary),
}

/// A pairing of exactly two sessions
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    /// Pairing order: `[waiting, joiner]`
    players: [SessionId; 2],
    moves: HashMap<SessionId, Move>,
    rounds_played: u32,
}

impl Room {
    pub fn new(first: SessionId, second: SessionId) -> Self {
        debug_assert_ne!(first, second, "a room needs two distinct sessions");
        Self {
            id: RoomId::new(first, second),
            players: [first, second],
            moves: HashMap::new(),
            rounds_played: 0,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn players(&self) -> [SessionId; 2] {
        self.players
    }

    pub fn contains(&self, session: SessionId) -> bool {
        self.players.contains(&session)
    }

    pub fn opponent_of(&self, session: SessionId) -> Option<SessionId> {
        match self.players {
            [a, b] if a == session => Some(b),
            [a, b] if b == session => Some(a),
            _ => None,
        }
    }

    /// Moves recorded so far in the current round
    #[cfg(test)]
    pub fn moves(&self) -> &HashMap<SessionId, Move> {
        &self.moves
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    /// Record `mv` for `session`, resolving the round once both are in.
    ///
    /// Returns `None` when `session` is not a member; nothing is recorded.
    pub fn record_move(&mut self, session: SessionId, mv: Move) -> Option<MoveProgress> {
        let opponent = self.opponent_of(session)?;
        self.moves.insert(session, mv);

        let Some(&opponent_move) = self.moves.get(&opponent) else {
            return Some(MoveProgress::AwaitingOpponent { opponent });
        };

        let [a, b] = self.players;
        let (a_move, b_move) = if a == session {
            (mv, opponent_move)
        } else {
            (opponent_move, mv)
        };

        let outcome = resolve_round((a, a_move), (b, b_move));
        self.rounds_played += 1;
        let moves = self.moves.drain().collect();

        Some(MoveProgress::Resolved(RoundSummary {
            round: self.rounds_played,
            moves,
            outcome,
        }))
    }

    /// Discard any moves of the current round
    pub fn reset_round(&mut self) {
        self.moves.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_is_order_independent() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_eq!(RoomId::new(a, b), RoomId::new(b, a));
        assert!(RoomId::new(a, b).members().contains(&a));
    }

    #[test]
    fn test_room_id_wire_roundtrip_canonicalizes() {
        let a = SessionId::new();
        let b = SessionId::new();
        let id = RoomId::new(a, b);

        let reversed = serde_json::json!([id.members()[1], id.members()[0]]);
        let parsed: RoomId = serde_json::from_value(reversed).unwrap();
        assert_eq!(parsed, id);

        let encoded = serde_json::to_value(id).unwrap();
        assert!(encoded.is_array());
    }

    #[test]
    fn test_first_move_awaits_opponent() {
        let a = SessionId::new();
        let b = SessionId::new();
        let mut room = Room::new(a, b);

        let progress = room.record_move(a, Move::Rock).unwrap();
        assert_eq!(progress, MoveProgress::AwaitingOpponent { opponent: b });
        assert_eq!(room.moves().len(), 1);
    }

    #[test]
    fn test_second_move_resolves_and_clears() {
        let a = SessionId::new();
        let b = SessionId::new();
        let mut room = Room::new(a, b);

        room.record_move(a, Move::Rock).unwrap();
        let Some(MoveProgress::Resolved(summary)) = room.record_move(b, Move::Scissors) else {
            panic!("round should resolve");
        };

        assert_eq!(summary.outcome, RoundOutcome::Winner(a));
        assert_eq!(summary.round, 1);
        assert_eq!(summary.moves[&a], Move::Rock);
        assert_eq!(summary.moves[&b], Move::Scissors);
        assert!(room.moves().is_empty());
    }

    #[test]
    fn test_overwrite_before_opponent_moves() {
        let a = SessionId::new();
        let b = SessionId::new();
        let mut room = Room::new(a, b);

        room.record_move(a, Move::Rock).unwrap();
        room.record_move(a, Move::Paper).unwrap();
        let Some(MoveProgress::Resolved(summary)) = room.record_move(b, Move::Rock) else {
            panic!("round should resolve");
        };
        assert_eq!(summary.outcome, RoundOutcome::Winner(a));
    }

    #[test]
    fn test_outsider_move_ignored() {
        let mut room = Room::new(SessionId::new(), SessionId::new());
        assert!(room.record_move(SessionId::new(), Move::Paper).is_none());
        assert!(room.moves().is_empty());
    }

    #[test]
    fn test_rounds_counted_and_reset() {
        let a = SessionId::new();
        let b = SessionId::new();
        let mut room = Room::new(a, b);

        for _ in 0..2 {
            room.record_move(a, Move::Paper).unwrap();
            room.record_move(b, Move::Paper).unwrap();
        }
        assert_eq!(room.rounds_played(), 2);

        room.record_move(b, Move::Rock).unwrap();
        room.reset_round();
        assert!(room.moves().is_empty());
    }
}
