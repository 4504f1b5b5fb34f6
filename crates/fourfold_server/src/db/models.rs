//! Database models and domain types.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::Serialize;
use tracing::instrument;

use crate::db::{DbError, schema};

/// Value stored in `game_stats.game_type` for every row this server writes.
pub const GAME_TYPE: &str = "connect_four";

/// User profile database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::users)]
pub struct User {
    id: i32,
    display_name: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable user model for creating new users.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::users)]
pub(crate) struct NewUser {
    display_name: String,
}

/// Game statistics database model, one row per player per finished game.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::game_stats)]
#[diesel(belongs_to(User))]
pub struct GameStat {
    id: i32,
    user_id: i32,
    opponent_name: String,
    game_type: String,
    outcome: String,
    played_at: NaiveDateTime,
    moves_count: i32,
    session_id: String,
    duration_secs: f64,
}

impl GameStat {
    /// Parses the stored outcome string into a [`GameOutcome`] enum.
    #[instrument(skip(self), fields(outcome = %self.outcome))]
    pub fn parse_outcome(&self) -> Result<GameOutcome, DbError> {
        GameOutcome::from_db_string(self.outcome())
    }
}

/// Insertable game stat model for recording new game results.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::game_stats)]
pub struct NewGameStat {
    user_id: i32,
    opponent_name: String,
    game_type: String,
    outcome: String,
    moves_count: i32,
    session_id: String,
    duration_secs: f64,
}

/// Game outcome from one player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameOutcome {
    /// Player won the game.
    Win,
    /// Player lost the game.
    Loss,
    /// Game ended in a draw.
    Draw,
}

impl GameOutcome {
    /// Outcome for `player` given the winner's name (`None` for a draw).
    pub fn for_player(player: &str, winner: Option<&str>) -> Self {
        match winner {
            None => Self::Draw,
            Some(name) if name == player => Self::Win,
            Some(_) => Self::Loss,
        }
    }

    /// Converts outcome to the string stored in the database.
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Loss => "loss",
            Self::Draw => "draw",
        }
    }

    /// Parses outcome from the string stored in the database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the string is not a valid outcome value.
    #[instrument(skip(s), fields(s = %s))]
    pub fn from_db_string(s: &str) -> Result<Self, DbError> {
        match s {
            "win" => Ok(Self::Win),
            "loss" => Ok(Self::Loss),
            "draw" => Ok(Self::Draw),
            _ => Err(DbError::new(format!("Invalid outcome: '{}'", s))),
        }
    }
}

/// Aggregated statistics for a user.
#[derive(Debug, Clone, Copy, PartialEq, Getters, Serialize)]
pub struct AggregatedStats {
    total_games: i32,
    wins: i32,
    losses: i32,
    draws: i32,
}

impl AggregatedStats {
    /// Creates new aggregated statistics.
    pub fn new(total_games: i32, wins: i32, losses: i32, draws: i32) -> Self {
        Self {
            total_games,
            wins,
            losses,
            draws,
        }
    }

    /// Calculates win rate as a percentage (0.0-100.0).
    pub fn win_rate(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            (self.wins as f64 / self.total_games as f64) * 100.0
        }
    }
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, new)]
pub struct LeaderboardEntry {
    display_name: String,
    stats: AggregatedStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_for_player() {
        assert_eq!(GameOutcome::for_player("alice", Some("alice")), GameOutcome::Win);
        assert_eq!(GameOutcome::for_player("bob", Some("alice")), GameOutcome::Loss);
        assert_eq!(GameOutcome::for_player("bob", None), GameOutcome::Draw);
    }

    #[test]
    fn test_win_rate() {
        assert_eq!(AggregatedStats::new(0, 0, 0, 0).win_rate(), 0.0);
        assert!((AggregatedStats::new(4, 1, 2, 1).win_rate() - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_invalid_outcome_string() {
        assert!(GameOutcome::from_db_string("forfeit").is_err());
    }
}
