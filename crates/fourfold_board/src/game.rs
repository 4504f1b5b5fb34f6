//! Turn and outcome state machine for one Connect Four match.

use crate::rules::{is_full, is_winning_placement};
use crate::types::{Board, COLUMNS, Color, DropError};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Current status of the game.
///
/// `InProgress` is the only non-terminal state; once a game leaves it, it
/// never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Moves are still being accepted.
    InProgress,
    /// The given color connected four.
    Won(Color),
    /// The board filled up with no winner.
    Draw,
}

impl GameStatus {
    /// Whether the game has ended.
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }
}

/// Errors that can occur when applying a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum MoveError {
    /// The game already reached a terminal outcome.
    #[display("game is already over")]
    GameOver,
    /// The mover's color does not hold the turn.
    #[display("not your turn, {} to move", _0)]
    NotYourTurn(#[error(not(source))] Color),
    /// Column index is not on the board.
    #[display("column {} is out of range (0-{})", _0, COLUMNS - 1)]
    ColumnOutOfRange(#[error(not(source))] usize),
    /// Column has no empty cell left.
    #[display("column {} is full", _0)]
    ColumnFull(#[error(not(source))] usize),
}

impl From<DropError> for MoveError {
    fn from(err: DropError) -> Self {
        match err {
            DropError::OutOfRange(column) => MoveError::ColumnOutOfRange(column),
            DropError::Full(column) => MoveError::ColumnFull(column),
        }
    }
}

/// Where an accepted disc landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Row the disc landed in (0 is the top).
    pub row: usize,
    /// Column the disc was dropped into.
    pub column: usize,
    /// Color of the disc.
    pub color: Color,
}

/// Connect Four game engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    board: Board,
    turn: Color,
    status: GameStatus,
    move_count: u32,
}

impl Game {
    /// Creates a new game with Red to move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            turn: Color::Red,
            status: GameStatus::InProgress,
            move_count: 0,
        }
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the color whose move is expected.
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// Returns the game status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Total discs placed so far.
    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    /// Drops a `color` disc into `column`.
    ///
    /// On success the win check runs first, then the fullness check; only
    /// when neither ends the game does the turn pass to the other color.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError`] and leaves the game untouched when the game is
    /// over, `color` does not hold the turn, or the column cannot take a disc.
    #[instrument(skip(self), fields(turn = %self.turn, moves = self.move_count))]
    pub fn apply_move(&mut self, column: usize, color: Color) -> Result<Placement, MoveError> {
        if self.status.is_terminal() {
            return Err(MoveError::GameOver);
        }
        if color != self.turn {
            return Err(MoveError::NotYourTurn(self.turn));
        }

        let row = self.board.drop_disc(column, color)?;
        self.move_count += 1;

        if is_winning_placement(&self.board, row, column, color) {
            self.status = GameStatus::Won(color);
        } else if is_full(&self.board) {
            self.status = GameStatus::Draw;
        } else {
            self.turn = color.opponent();
        }

        debug!(row, column, status = ?self.status, "Move applied");
        Ok(Placement { row, column, color })
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ROWS;

    /// Alternating column sequence that fills the board without four in a row.
    pub(crate) const DRAW_SEQUENCE: [usize; 42] = [
        0, 1, 0, 1, 0, 1, 1, 0, 1, 0, 1, 0, 2, 3, 2, 3, 2, 3, 3, 2, 3, 2, 3, 2, 4, 5, 4, 5,
        4, 5, 5, 4, 5, 4, 5, 4, 6, 6, 6, 6, 6, 6,
    ];

    fn play(game: &mut Game, columns: &[usize]) {
        for &column in columns {
            let color = game.turn();
            game.apply_move(column, color).expect("Valid move");
        }
    }

    #[test]
    fn test_bottom_row_win_on_seventh_move() {
        let mut game = Game::new();
        play(&mut game, &[0, 0, 1, 1, 2, 2]);
        assert_eq!(game.status(), GameStatus::InProgress);

        let placement = game.apply_move(3, Color::Red).expect("Valid move");
        assert_eq!(placement.row, ROWS - 1);
        assert_eq!(game.status(), GameStatus::Won(Color::Red));
        assert_eq!(game.move_count(), 7);
    }

    #[test]
    fn test_wrong_color_rejected_without_change() {
        let mut game = Game::new();
        let before = game.clone();
        let result = game.apply_move(3, Color::Yellow);
        assert_eq!(result, Err(MoveError::NotYourTurn(Color::Red)));
        assert_eq!(game, before);
    }

    #[test]
    fn test_full_column_rejected_without_change() {
        let mut game = Game::new();
        play(&mut game, &[5, 5, 5, 5, 5, 5]);
        let before = game.clone();
        let turn = game.turn();
        assert_eq!(game.apply_move(5, turn), Err(MoveError::ColumnFull(5)));
        assert_eq!(game.apply_move(9, turn), Err(MoveError::ColumnOutOfRange(9)));
        assert_eq!(game, before);
    }

    #[test]
    fn test_no_moves_after_win() {
        let mut game = Game::new();
        play(&mut game, &[0, 1, 0, 1, 0, 1, 0]);
        assert_eq!(game.status(), GameStatus::Won(Color::Red));
        assert_eq!(game.apply_move(2, Color::Yellow), Err(MoveError::GameOver));
        assert_eq!(game.move_count(), 7);
    }

    #[test]
    fn test_full_board_without_four_is_draw() {
        let mut game = Game::new();
        let (last, rest) = DRAW_SEQUENCE.split_last().expect("Non-empty sequence");
        play(&mut game, rest);
        assert_eq!(game.status(), GameStatus::InProgress);

        let color = game.turn();
        game.apply_move(*last, color).expect("Valid move");
        assert_eq!(game.status(), GameStatus::Draw);
        assert_eq!(game.move_count(), 42);
    }

    #[test]
    fn test_turn_alternates() {
        let mut game = Game::new();
        assert_eq!(game.turn(), Color::Red);
        game.apply_move(3, Color::Red).expect("Valid move");
        assert_eq!(game.turn(), Color::Yellow);
        game.apply_move(3, Color::Yellow).expect("Valid move");
        assert_eq!(game.turn(), Color::Red);
    }
}
