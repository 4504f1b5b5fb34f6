//! Request rejections reported back to players.

use derive_more::{Display, Error};
use fourfold_board::MoveError;

/// Why the registry refused a request. Nothing is mutated when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum Rejection {
    /// Display name is blank.
    #[display("display name must not be empty")]
    InvalidName,
    /// Display name belongs to the scripted opponent.
    #[display("display name '{}' is reserved", _0)]
    NameReserved(#[error(not(source))] String),
    /// Identity is already seated in a session.
    #[display("already playing in a session")]
    AlreadyInSession,
    /// Identity is already waiting for a partner.
    #[display("already waiting for a match")]
    AlreadyQueued,
    /// No session with that id (it may have been cleaned up).
    #[display("session not found")]
    SessionNotFound,
    /// Identity does not hold a seat in that session.
    #[display("not a player in this session")]
    NotInSession,
    /// No reconnection is pending for that identity and session.
    #[display("no pending rejoin for this session")]
    NoPendingRejoin,
    /// The connection already speaks for another display name.
    #[display("connection already joined as '{}'", _0)]
    AlreadyJoined(#[error(not(source))] String),
    /// The game engine refused the move.
    #[display("invalid move: {}", _0)]
    InvalidMove(MoveError),
}

impl From<MoveError> for Rejection {
    fn from(err: MoveError) -> Self {
        Self::InvalidMove(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fourfold_board::Color;

    #[test]
    fn test_move_error_converts() {
        let rejection: Rejection = MoveError::NotYourTurn(Color::Red).into();
        assert_eq!(rejection.to_string(), "invalid move: not your turn, red to move");
    }

    #[test]
    fn test_reserved_name_message() {
        let rejection = Rejection::NameReserved("Bot".to_string());
        assert_eq!(rejection.to_string(), "display name 'Bot' is reserved");
    }

    #[test]
    fn test_already_joined_names_bound_identity() {
        let rejection = Rejection::AlreadyJoined("alice".to_string());
        assert_eq!(rejection.to_string(), "connection already joined as 'alice'");
    }
}
