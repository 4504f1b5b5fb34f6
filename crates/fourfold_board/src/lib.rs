//! Pure Connect Four game logic.
//!
//! This crate has no I/O and no async: it owns the board, the rules for
//! detecting four in a row, the turn/outcome state machine, and the one-ply
//! heuristic that drives the scripted opponent.
//!
//! # Example
//!
//! ```
//! use fourfold_board::{Color, Game, GameStatus};
//!
//! let mut game = Game::new();
//! for column in [0, 0, 1, 1, 2, 2, 3] {
//!     let color = game.turn();
//!     game.apply_move(column, color).expect("legal move");
//! }
//! assert_eq!(game.status(), GameStatus::Won(Color::Red));
//! assert_eq!(game.move_count(), 7);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod game;
pub mod heuristic;
pub mod rules;
mod types;

pub use game::{Game, GameStatus, MoveError, Placement};
pub use types::{Board, CENTER_COLUMN, COLUMNS, Cell, Color, DropError, ROWS, WIN_LENGTH};
