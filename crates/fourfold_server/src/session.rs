//! One active match between two seats.

use crate::error::Rejection;
use crate::protocol::{PlayerHandle, SessionId};
use fourfold_board::{Board, Color, Game, GameStatus, Placement};
use serde::Serialize;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// One of the two participant slots in a session.
#[derive(Debug, Clone)]
pub struct Seat {
    /// Display name.
    pub name: String,
    /// Outbound channel; `None` for the bot or while disconnected.
    pub handle: Option<PlayerHandle>,
    /// Seat color.
    pub color: Color,
    /// Whether moves for this seat come from the heuristic.
    pub is_bot: bool,
}

impl Seat {
    /// Creates a seat for a connected human.
    pub fn human(name: impl Into<String>, handle: PlayerHandle, color: Color) -> Self {
        Self {
            name: name.into(),
            handle: Some(handle),
            color,
            is_bot: false,
        }
    }

    /// Creates a seat for the scripted opponent.
    pub fn bot(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            handle: None,
            color,
            is_bot: true,
        }
    }
}

/// Read-only view of a session, detached from the registry lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Session id.
    pub session_id: SessionId,
    /// Red seat name.
    pub red: String,
    /// Yellow seat name.
    pub yellow: String,
    /// Current board.
    pub board: Board,
    /// Color to move.
    pub turn: Color,
    /// Current status.
    pub status: GameStatus,
    /// Discs placed so far.
    pub move_count: u32,
}

/// A game session with two seats.
#[derive(Debug)]
pub struct GameSession {
    id: SessionId,
    game: Game,
    red: Seat,
    yellow: Seat,
    started_at: Instant,
    pub(crate) bot_timer: Option<AbortHandle>,
    pub(crate) cleanup_timer: Option<AbortHandle>,
}

impl GameSession {
    /// Creates a new session. Seat colors are forced to match their slot.
    #[instrument(skip(red, yellow), fields(red = %red.name, yellow = %yellow.name))]
    pub fn new(id: SessionId, mut red: Seat, mut yellow: Seat) -> Self {
        info!(session_id = %id, "Creating new game session");
        red.color = Color::Red;
        yellow.color = Color::Yellow;
        Self {
            id,
            game: Game::new(),
            red,
            yellow,
            started_at: Instant::now(),
            bot_timer: None,
            cleanup_timer: None,
        }
    }

    /// Session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The game state.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Seat holding `color`.
    pub fn seat(&self, color: Color) -> &Seat {
        match color {
            Color::Red => &self.red,
            Color::Yellow => &self.yellow,
        }
    }

    /// Mutable seat holding `color`.
    pub fn seat_mut(&mut self, color: Color) -> &mut Seat {
        match color {
            Color::Red => &mut self.red,
            Color::Yellow => &mut self.yellow,
        }
    }

    /// Both seats, Red first.
    pub fn seats(&self) -> [&Seat; 2] {
        [&self.red, &self.yellow]
    }

    /// Seat held by `name`, if any.
    pub fn seat_of(&self, name: &str) -> Option<&Seat> {
        self.seats().into_iter().find(|seat| seat.name == name)
    }

    /// The seat facing `name`, if `name` is seated here.
    pub fn opponent_of(&self, name: &str) -> Option<&Seat> {
        self.seat_of(name)
            .map(|seat| self.seat(seat.color.opponent()))
    }

    /// Seat whose move is expected.
    pub fn seat_on_turn(&self) -> &Seat {
        self.seat(self.game.turn())
    }

    /// Makes a move for the seat held by `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection`] with the session untouched when `name` holds no
    /// seat, it is not that seat's turn, or the column cannot take a disc.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn make_move(&mut self, name: &str, column: usize) -> Result<Placement, Rejection> {
        let color = self
            .seat_of(name)
            .map(|seat| seat.color)
            .ok_or_else(|| {
                warn!(player = name, "Unknown player attempted move");
                Rejection::NotInSession
            })?;
        self.play(color, column)
    }

    /// Makes a move for the seat holding `color`.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::InvalidMove`] with the session untouched when the
    /// game engine refuses the placement.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn play(&mut self, color: Color, column: usize) -> Result<Placement, Rejection> {
        let placement = self.game.apply_move(column, color).map_err(|e| {
            warn!(%color, column, error = %e, "Invalid move");
            Rejection::from(e)
        })?;

        info!(
            %color,
            column,
            row = placement.row,
            moves = self.game.move_count(),
            status = ?self.game.status(),
            "Move completed successfully"
        );
        Ok(placement)
    }

    /// Whether the game is still accepting moves.
    pub fn is_in_progress(&self) -> bool {
        self.game.status() == GameStatus::InProgress
    }

    /// Name of the winner, or `None` for a draw or an unfinished game.
    pub fn winner_name(&self) -> Option<&str> {
        match self.game.status() {
            GameStatus::Won(color) => Some(self.seat(color).name.as_str()),
            GameStatus::InProgress | GameStatus::Draw => None,
        }
    }

    /// Seconds elapsed since the session started, sampled now.
    pub fn duration_seconds(&self) -> f64 {
        let secs = self.started_at.elapsed().as_secs_f64();
        debug!(session_id = %self.id, secs, "Sampled session duration");
        secs
    }

    /// Copies out the observable state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            red: self.red.name.clone(),
            yellow: self.yellow.name.clone(),
            board: *self.game.board(),
            turn: self.game.turn(),
            status: self.game.status(),
            move_count: self.game.move_count(),
        }
    }

    /// Cancels any pending bot move and cleanup timers.
    pub(crate) fn cancel_timers(&mut self) {
        if let Some(timer) = self.bot_timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.cleanup_timer.take() {
            timer.abort();
        }
    }
}
