//! Analytics event publishing.
//!
//! The registry treats publishing as fire-and-forget: calls run on their own
//! task and failures are logged, never surfaced to players.

use async_trait::async_trait;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Winner field value used when a game ended in a draw.
pub const DRAW_SENTINEL: &str = "draw";

/// Lifecycle event for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A session was created.
    Started {
        /// Session id.
        session_id: String,
        /// Red seat name.
        first_mover: String,
        /// Yellow seat name.
        second_mover: String,
    },
    /// A session reached a terminal outcome through play.
    Ended {
        /// Session id.
        session_id: String,
        /// Red seat name.
        first_mover: String,
        /// Yellow seat name.
        second_mover: String,
        /// Winner name, or [`DRAW_SENTINEL`].
        winner: String,
        /// Discs placed.
        move_count: u32,
        /// Seconds from start to finish.
        duration_secs: f64,
    },
    /// A session was abandoned by a player.
    Forfeited {
        /// Session id.
        session_id: String,
        /// Player who left or timed out.
        forfeited_by: String,
        /// Player who remained.
        winner: String,
    },
}

/// Event publishing failure.
#[derive(Debug, Clone, Display, Error)]
#[display("Publish error: {}", message)]
pub struct PublishError {
    /// Error message.
    pub message: String,
}

impl PublishError {
    /// Creates a new publish error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Sink for session lifecycle events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one event.
    async fn publish(&self, event: GameEvent) -> Result<(), PublishError>;

    /// Publishes a session start.
    async fn publish_started(
        &self,
        session_id: &str,
        first_mover: &str,
        second_mover: &str,
    ) -> Result<(), PublishError> {
        self.publish(GameEvent::Started {
            session_id: session_id.to_string(),
            first_mover: first_mover.to_string(),
            second_mover: second_mover.to_string(),
        })
        .await
    }

    /// Publishes a natural session end. `winner` is `None` for a draw.
    async fn publish_ended(
        &self,
        session_id: &str,
        first_mover: &str,
        second_mover: &str,
        winner: Option<&str>,
        move_count: u32,
        duration_secs: f64,
    ) -> Result<(), PublishError> {
        self.publish(GameEvent::Ended {
            session_id: session_id.to_string(),
            first_mover: first_mover.to_string(),
            second_mover: second_mover.to_string(),
            winner: winner.unwrap_or(DRAW_SENTINEL).to_string(),
            move_count,
            duration_secs,
        })
        .await
    }

    /// Publishes a forfeit.
    async fn publish_forfeited(
        &self,
        session_id: &str,
        forfeited_by: &str,
        winner: &str,
    ) -> Result<(), PublishError> {
        self.publish(GameEvent::Forfeited {
            session_id: session_id.to_string(),
            forfeited_by: forfeited_by.to_string(),
            winner: winner.to_string(),
        })
        .await
    }
}

/// Writes every event as a JSON line on the `fourfold::events` target.
#[derive(Debug, Clone, Default)]
pub struct TracingPublisher;

#[async_trait]
impl EventPublisher for TracingPublisher {
    #[instrument(skip(self, event))]
    async fn publish(&self, event: GameEvent) -> Result<(), PublishError> {
        let json = serde_json::to_string(&event)
            .map_err(|e| PublishError::new(format!("Failed to encode event: {}", e)))?;
        info!(target: "fourfold::events", event = %json, "Game event");
        Ok(())
    }
}
