//! Hand gestures and the dominance table

use std::fmt;

use serde::{Deserialize, Serialize};

use super::SessionId;

/// A move a player can submit for a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    #[cfg(test)]
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// The move this one defeats
    pub fn beats(self) -> Move {
        match self {
            Move::Rock => Move::Scissors,
            Move::Scissors => Move::Paper,
            Move::Paper => Move::Rock,
        }
    }

    pub fn defeats(self, other: Move) -> bool {
        self.beats() == other
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Rock => "rock",
            Move::Paper => "paper",
            Move::Scissors => "scissors",
        };
        f.write_str(name)
    }
}

/// Result of one resolved round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Draw,
    Winner(SessionId),
}

impl RoundOutcome {
    /// Winning session, `None` on a draw
    pub fn winner(&self) -> Option<SessionId> {
        match self {
            RoundOutcome::Draw => None,
            RoundOutcome::Winner(id) => Some(*id),
        }
    }
}

/// Decide a round between two submitted moves.
///
/// Pure: depends only on the two moves, never on which arrived first.
pub fn resolve_round(a: (SessionId, Move), b: (SessionId, Move)) -> RoundOutcome {
    let (a_id, a_move) = a;
    let (b_id, b_move) = b;

    if a_move == b_move {
        RoundOutcome::Draw
    } else if a_move.defeats(b_move) {
        RoundOutcome::Winner(a_id)
    } else {
        RoundOutcome::Winner(b_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominance_cycle() {
        assert!(Move::Rock.defeats(Move::Scissors));
        assert!(Move::Scissors.defeats(Move::Paper));
        assert!(Move::Paper.defeats(Move::Rock));

        assert!(!Move::Scissors.defeats(Move::Rock));
        assert!(!Move::Paper.defeats(Move::Scissors));
        assert!(!Move::Rock.defeats(Move::Paper));
    }

    #[test]
    fn test_equal_moves_draw() {
        let a = SessionId::new();
        let b = SessionId::new();
        for mv in Move::ALL {
            assert_eq!(resolve_round((a, mv), (b, mv)), RoundOutcome::Draw);
        }
    }

    #[test]
    fn test_winner_independent_of_argument_order() {
        let a = SessionId::new();
        let b = SessionId::new();

        for x in Move::ALL {
            for y in Move::ALL {
                if x == y {
                    continue;
                }
                let forward = resolve_round((a, x), (b, y));
                let reversed = resolve_round((b, y), (a, x));

                assert!(forward.winner().is_some());
                assert_eq!(forward, reversed);
            }
        }
    }

    #[test]
    fn test_move_wire_names() {
        assert_eq!(serde_json::to_string(&Move::Scissors).unwrap(), "\"scissors\"");
        let parsed: Move = serde_json::from_str("\"rock\"").unwrap();
        assert_eq!(parsed, Move::Rock);
        assert!(serde_json::from_str::<Move>("\"lizard\"").is_err());
    }
}
