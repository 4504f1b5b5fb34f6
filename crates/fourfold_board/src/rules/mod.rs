//! Game rules for Connect Four.
//!
//! Pure functions over a [`Board`](crate::Board). Rules are kept apart from
//! board storage so the game state machine and the opponent heuristic share
//! one definition of "four in a row".

pub mod draw;
pub mod win;

pub use draw::is_full;
pub use win::{Axis, axes_with_run, contiguous_run, is_winning_placement};
