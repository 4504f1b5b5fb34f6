//! Draw detection logic for Connect Four.

use crate::{Board, Cell};
use tracing::instrument;

/// Checks if the board is full (no empty cell in the top row).
///
/// Only meaningful after the win check for the same move has come back
/// negative: a full board with no winner is a draw.
#[instrument(skip(board))]
pub fn is_full(board: &Board) -> bool {
    board.rows()[0].iter().all(|cell| *cell != Cell::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{COLUMNS, Color, ROWS};

    #[test]
    fn test_empty_board_not_full() {
        assert!(!is_full(&Board::new()));
    }

    #[test]
    fn test_partial_board_not_full() {
        let mut board = Board::new();
        for _ in 0..ROWS {
            board.drop_disc(0, Color::Red).expect("Drop failed");
        }
        assert!(!is_full(&board));
    }

    #[test]
    fn test_full_board() {
        let mut board = Board::new();
        for column in 0..COLUMNS {
            for row in 0..ROWS {
                let color = if (row + column) % 2 == 0 {
                    Color::Red
                } else {
                    Color::Yellow
                };
                board.drop_disc(column, color).expect("Drop failed");
            }
        }
        assert!(is_full(&board));
    }
}
