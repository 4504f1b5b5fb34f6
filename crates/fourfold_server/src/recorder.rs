//! Persistence of completed games.

use async_trait::async_trait;
use derive_new::new;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::db::{DbError, GameRepository};

/// Result of a naturally completed session.
#[derive(Debug, Clone, PartialEq, Serialize, new)]
pub struct CompletedGame {
    /// Session id.
    pub session_id: String,
    /// Red seat name.
    pub first_mover: String,
    /// Yellow seat name.
    pub second_mover: String,
    /// Winner name, `None` for a draw.
    pub winner: Option<String>,
    /// Discs placed.
    pub move_count: u32,
    /// Seconds from start to finish.
    pub duration_secs: f64,
}

/// Store for completed game results.
#[async_trait]
pub trait GameRecorder: Send + Sync {
    /// Persists one completed game.
    async fn record_completed_game(&self, game: CompletedGame) -> Result<(), DbError>;
}

/// Recorder that discards every result.
#[derive(Debug, Clone, Default)]
pub struct NullRecorder;

#[async_trait]
impl GameRecorder for NullRecorder {
    async fn record_completed_game(&self, game: CompletedGame) -> Result<(), DbError> {
        debug!(session_id = %game.session_id, "Persistence disabled, dropping result");
        Ok(())
    }
}

#[async_trait]
impl GameRecorder for GameRepository {
    #[instrument(skip(self, game), fields(session_id = %game.session_id))]
    async fn record_completed_game(&self, game: CompletedGame) -> Result<(), DbError> {
        let repo = self.clone();
        let rows = tokio::task::spawn_blocking(move || repo.record_match(&game))
            .await
            .map_err(|e| DbError::new(format!("Recording task failed: {}", e)))??;
        info!(rows = rows.len(), "Completed game persisted");
        Ok(())
    }
}
