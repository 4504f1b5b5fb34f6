//! Messages exchanged with connected players.
//!
//! The registry only ever produces [`ServerMessage`]s and pushes them down a
//! [`PlayerHandle`]. [`ClientMessage`] is parsed by the transport layer, which
//! hands the registry already-validated arguments.

use fourfold_board::{Board, Color, GameStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Unique identifier for a game session.
pub type SessionId = String;

/// Outbound channel to one connected player.
pub type PlayerHandle = mpsc::UnboundedSender<ServerMessage>;

/// Notification sent from the server to a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Queued with no partner yet.
    #[serde(rename_all = "camelCase")]
    Waiting {
        /// Seconds until the bot takes the other seat.
        time_left_secs: u64,
    },
    /// A session started.
    #[serde(rename_all = "camelCase")]
    MatchStarted {
        /// Session the player now belongs to.
        session_id: SessionId,
        /// The player's seat color.
        your_color: Color,
        /// Color to move.
        turn: Color,
        /// Initial board.
        board: Board,
        /// Opponent display name.
        opponent_name: String,
    },
    /// A move was applied.
    #[serde(rename_all = "camelCase")]
    BoardUpdated {
        /// Board after the move.
        board: Board,
        /// Color to move next.
        turn: Color,
        /// Status after the move.
        outcome: GameStatus,
    },
    /// Reconnection accepted; carries the full current state.
    #[serde(rename_all = "camelCase")]
    RejoinSucceeded {
        /// Session rejoined.
        session_id: SessionId,
        /// The player's seat color.
        your_color: Color,
        /// Color to move.
        turn: Color,
        /// Current board.
        board: Board,
        /// Opponent display name.
        opponent_name: String,
    },
    /// The opponent lost their connection.
    #[serde(rename_all = "camelCase")]
    OpponentDisconnected {
        /// Seconds the opponent has to come back.
        grace_seconds_left: u64,
    },
    /// The opponent came back within the grace window.
    OpponentReconnected,
    /// The opponent forfeited.
    #[serde(rename_all = "camelCase")]
    WonByForfeit {
        /// Color declared the winner.
        winning_color: Color,
    },
    /// A request was refused; nothing changed.
    Rejected {
        /// Human-readable reason.
        reason: String,
    },
}

/// Request sent from a player to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Enter the matchmaking queue.
    Join {
        /// Display name.
        name: String,
    },
    /// Drop a disc.
    #[serde(rename_all = "camelCase")]
    Move {
        /// Session the move belongs to.
        session_id: SessionId,
        /// Column index (0-6).
        column: usize,
    },
    /// Reclaim a seat after a dropped connection.
    #[serde(rename_all = "camelCase")]
    Rejoin {
        /// Display name.
        name: String,
        /// Session to rejoin.
        session_id: SessionId,
    },
    /// Quit the queue or the current session.
    Leave,
}

/// Sends `message` down `handle`, logging instead of failing when the
/// receiving side is gone.
pub(crate) fn notify(handle: &PlayerHandle, message: ServerMessage) {
    if let Err(e) = handle.send(message) {
        debug!(message = ?e.0, "Player channel closed, dropping notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_move_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"move","sessionId":"abc","column":3}"#)
                .expect("Parse failed");
        assert_eq!(
            msg,
            ClientMessage::Move {
                session_id: "abc".to_string(),
                column: 3
            }
        );
    }

    #[test]
    fn test_client_leave_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"leave"}"#).expect("Parse failed");
        assert_eq!(msg, ClientMessage::Leave);
    }

    #[test]
    fn test_server_message_tags() {
        let json = serde_json::to_value(ServerMessage::WonByForfeit {
            winning_color: Color::Yellow,
        })
        .expect("Serialize failed");
        assert_eq!(json["type"], "wonByForfeit");
        assert_eq!(json["winningColor"], "yellow");

        let json = serde_json::to_value(ServerMessage::Waiting { time_left_secs: 10 })
            .expect("Serialize failed");
        assert_eq!(json["type"], "waiting");
        assert_eq!(json["timeLeftSecs"], 10);
    }

    #[test]
    fn test_notify_on_closed_channel_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        notify(&tx, ServerMessage::OpponentReconnected);
    }
}
