//! Database repository for game statistics and player profiles.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument, warn};

use super::models::NewUser;
use crate::db::{
    AggregatedStats, DbError, GAME_TYPE, GameOutcome, GameStat, LeaderboardEntry, NewGameStat,
    User, schema,
};
use crate::recorder::CompletedGame;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database repository for user and game operations.
#[derive(Debug, Clone)]
pub struct GameRepository {
    db_path: String,
}

impl GameRepository {
    /// Creates a new repository for the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path must not be empty"));
        }
        info!(path = %db_path, "Creating GameRepository");
        Ok(Self { db_path })
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    /// Applies any pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    fn insert_user(conn: &mut SqliteConnection, display_name: String) -> Result<User, DbError> {
        debug!(display_name = %display_name, "Creating user");
        let user = diesel::insert_into(schema::users::table)
            .values(&NewUser::new(display_name))
            .returning(User::as_returning())
            .get_result(conn)?;

        info!(user_id = user.id(), display_name = %user.display_name(), "User created");
        Ok(user)
    }

    fn find_user(conn: &mut SqliteConnection, display_name: &str) -> Result<Option<User>, DbError> {
        let user = schema::users::table
            .filter(schema::users::display_name.eq(display_name))
            .select(User::as_select())
            .first::<User>(conn)
            .optional()?;
        Ok(user)
    }

    fn find_or_create_user(conn: &mut SqliteConnection, display_name: &str) -> Result<User, DbError> {
        match Self::find_user(conn, display_name)? {
            Some(user) => Ok(user),
            None => Self::insert_user(conn, display_name.to_string()),
        }
    }

    /// Gets a user by display name. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_user_by_name(&self, display_name: &str) -> Result<Option<User>, DbError> {
        debug!(display_name = %display_name, "Looking up user by name");
        let mut conn = self.connection()?;
        let user = Self::find_user(&mut conn, display_name)?;

        if let Some(ref u) = user {
            debug!(user_id = u.id(), "User found");
        } else {
            debug!("User not found");
        }

        Ok(user)
    }

    fn insert_stat(conn: &mut SqliteConnection, stat: NewGameStat) -> Result<GameStat, DbError> {
        debug!("Recording game result");
        let game_stat = diesel::insert_into(schema::game_stats::table)
            .values(&stat)
            .returning(GameStat::as_returning())
            .get_result(conn)?;

        info!(
            stat_id = game_stat.id(),
            user_id = game_stat.user_id(),
            outcome = %game_stat.outcome(),
            "Game result recorded"
        );
        Ok(game_stat)
    }

    /// Records a finished match: one row per seat, creating profiles on first sight.
    ///
    /// Both rows are written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs; nothing is written then.
    #[instrument(skip(self, game), fields(session_id = %game.session_id))]
    pub fn record_match(&self, game: &CompletedGame) -> Result<Vec<GameStat>, DbError> {
        let mut conn = self.connection()?;
        conn.transaction::<_, DbError, _>(|conn| {
            let seats = [
                (&game.first_mover, &game.second_mover),
                (&game.second_mover, &game.first_mover),
            ];
            let mut rows = Vec::with_capacity(seats.len());
            for (player, opponent) in seats {
                let user = Self::find_or_create_user(conn, player)?;
                let outcome = GameOutcome::for_player(player, game.winner.as_deref());
                let stat = NewGameStat::new(
                    *user.id(),
                    opponent.clone(),
                    GAME_TYPE.to_string(),
                    outcome.to_db_string().to_string(),
                    i32::try_from(game.move_count).unwrap_or(i32::MAX),
                    game.session_id.clone(),
                    game.duration_secs,
                );
                rows.push(Self::insert_stat(conn, stat)?);
            }
            Ok(rows)
        })
    }

    /// Gets all game stats for a user, ordered most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_user_stats(&self, user_id: i32) -> Result<Vec<GameStat>, DbError> {
        debug!(user_id = %user_id, "Loading user stats");
        let mut conn = self.connection()?;

        let stats = schema::game_stats::table
            .filter(schema::game_stats::user_id.eq(user_id))
            .order((schema::game_stats::played_at.desc(), schema::game_stats::id.desc()))
            .select(GameStat::as_select())
            .load::<GameStat>(&mut conn)?;

        info!(user_id = %user_id, count = stats.len(), "User stats loaded");
        Ok(stats)
    }

    /// Gets aggregated win/loss/draw counts for a user.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_aggregated_stats(&self, user_id: i32) -> Result<AggregatedStats, DbError> {
        debug!(user_id = %user_id, "Computing aggregated stats");
        let mut conn = self.connection()?;

        let stats = schema::game_stats::table
            .filter(schema::game_stats::user_id.eq(user_id))
            .select(GameStat::as_select())
            .load::<GameStat>(&mut conn)?;

        Ok(aggregate(&stats))
    }

    /// Ranks every user by wins, then win rate, then name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, DbError> {
        let mut conn = self.connection()?;

        let users = schema::users::table
            .select(User::as_select())
            .load::<User>(&mut conn)?;
        let stats = schema::game_stats::table
            .select(GameStat::as_select())
            .load::<GameStat>(&mut conn)?;

        let mut by_user: HashMap<i32, Vec<GameStat>> = HashMap::new();
        for stat in stats {
            by_user.entry(*stat.user_id()).or_default().push(stat);
        }

        let mut entries: Vec<LeaderboardEntry> = users
            .into_iter()
            .map(|user| {
                let games = by_user.remove(user.id()).unwrap_or_default();
                LeaderboardEntry::new(user.display_name().clone(), aggregate(&games))
            })
            .collect();

        entries.sort_by(|a, b| {
            b.stats()
                .wins()
                .cmp(a.stats().wins())
                .then_with(|| b.stats().win_rate().total_cmp(&a.stats().win_rate()))
                .then_with(|| a.display_name().cmp(b.display_name()))
        });
        entries.truncate(limit);

        info!(count = entries.len(), "Leaderboard computed");
        Ok(entries)
    }
}

/// Tallies wins, losses and draws across `stats`.
fn aggregate(stats: &[GameStat]) -> AggregatedStats {
    let mut wins = 0;
    let mut losses = 0;
    let mut draws = 0;

    for stat in stats {
        match stat.parse_outcome() {
            Ok(GameOutcome::Win) => wins += 1,
            Ok(GameOutcome::Loss) => losses += 1,
            Ok(GameOutcome::Draw) => draws += 1,
            Err(e) => warn!(stat_id = stat.id(), error = %e, "Unknown outcome value"),
        }
    }

    AggregatedStats::new(stats.len() as i32, wins, losses, draws)
}
