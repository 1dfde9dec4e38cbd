//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::{Move, RoomId, SessionId};

/// Text sent with the opponent-moved nudge
pub const OPPONENT_MOVED_TEXT: &str = "Your opponent has chosen. Make your move!";

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Ask to be paired with an opponent
    JoinQueue,

    /// Submit a move for the current round
    SubmitMove {
        room_id: RoomId,
        #[serde(rename = "move")]
        mv: Move,
    },

    /// Restart the round for both players
    RequestRematch { room_id: RoomId },

    /// Relay a chat line to the room
    ChatMessage { room_id: RoomId, message: String },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        session_id: SessionId,
        server_time: u64,
    },

    /// No opponent yet
    Waiting,

    /// Room formed
    Matched {
        room_id: RoomId,
        players: [SessionId; 2],
    },

    /// Opponent has moved this round
    OpponentMoved { message: String },

    /// Both moves are in
    RoundResult {
        round: u32,
        moves: BTreeMap<SessionId, Move>,
        /// `None` on a draw
        winner: Option<SessionId>,
    },

    /// Round state cleared
    NewRound,

    /// Relayed chat line
    ChatMessage { sender: SessionId, message: String },

    /// Room dissolved because the opponent left
    OpponentLeft,

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
