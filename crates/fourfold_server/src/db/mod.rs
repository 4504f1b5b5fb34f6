//! Database persistence layer for player profiles and game statistics.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::DbError;
pub use models::{AggregatedStats, GAME_TYPE, GameOutcome, GameStat, LeaderboardEntry, NewGameStat, User};
pub use repository::GameRepository;
