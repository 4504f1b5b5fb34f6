//! Win detection logic for Connect Four.

use crate::{Board, COLUMNS, Cell, Color, ROWS, WIN_LENGTH};
use tracing::instrument;

/// One of the four lines a run of discs can lie on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Left to right.
    Horizontal,
    /// Top to bottom.
    Vertical,
    /// Top-left to bottom-right.
    Diagonal,
    /// Bottom-left to top-right.
    AntiDiagonal,
}

impl Axis {
    /// All four axes in evaluation order.
    pub const ALL: [Axis; 4] = [
        Axis::Horizontal,
        Axis::Vertical,
        Axis::Diagonal,
        Axis::AntiDiagonal,
    ];

    /// Row and column step for walking the axis in its positive direction.
    fn step(self) -> (isize, isize) {
        match self {
            Axis::Horizontal => (0, 1),
            Axis::Vertical => (1, 0),
            Axis::Diagonal => (1, 1),
            Axis::AntiDiagonal => (-1, 1),
        }
    }
}

/// Counts same-color cells walking from `(row, column)` by `(dr, dc)`,
/// excluding the starting cell.
fn walk(board: &Board, row: usize, column: usize, color: Color, dr: isize, dc: isize) -> usize {
    let mut count = 0;
    let mut r = row as isize + dr;
    let mut c = column as isize + dc;
    while (0..ROWS as isize).contains(&r) && (0..COLUMNS as isize).contains(&c) {
        if board.get(r as usize, c as usize) != Some(Cell::Occupied(color)) {
            break;
        }
        count += 1;
        r += dr;
        c += dc;
    }
    count
}

/// Length of the contiguous `color` run through `(row, column)` along `axis`.
///
/// Both directions are summed and the starting cell is counted once. Returns
/// zero when the starting cell does not hold `color`.
pub fn contiguous_run(board: &Board, row: usize, column: usize, color: Color, axis: Axis) -> usize {
    if board.get(row, column) != Some(Cell::Occupied(color)) {
        return 0;
    }
    let (dr, dc) = axis.step();
    1 + walk(board, row, column, color, dr, dc) + walk(board, row, column, color, -dr, -dc)
}

/// Number of axes through `(row, column)` holding a `color` run of at least `min_len`.
pub fn axes_with_run(board: &Board, row: usize, column: usize, color: Color, min_len: usize) -> usize {
    Axis::ALL
        .iter()
        .filter(|&&axis| contiguous_run(board, row, column, color, axis) >= min_len)
        .count()
}

/// Checks whether the disc just placed at `(row, column)` completes four in a row.
#[instrument(skip(board))]
pub fn is_winning_placement(board: &Board, row: usize, column: usize, color: Color) -> bool {
    Axis::ALL
        .iter()
        .any(|&axis| contiguous_run(board, row, column, color, axis) >= WIN_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(discs: &[(usize, Color)]) -> Board {
        let mut board = Board::new();
        for &(column, color) in discs {
            board.drop_disc(column, color).expect("Drop failed");
        }
        board
    }

    #[test]
    fn test_horizontal_win_counts_both_directions() {
        // Placed disc in the middle of the run: R R _ R, then fill the gap.
        let mut board = board_with(&[(0, Color::Red), (1, Color::Red), (3, Color::Red)]);
        let row = board.drop_disc(2, Color::Red).expect("Drop failed");
        assert!(is_winning_placement(&board, row, 2, Color::Red));
        assert_eq!(contiguous_run(&board, row, 2, Color::Red, Axis::Horizontal), 4);
    }

    #[test]
    fn test_three_is_not_a_win() {
        let board = board_with(&[(0, Color::Red), (1, Color::Red), (2, Color::Red)]);
        assert!(!is_winning_placement(&board, ROWS - 1, 2, Color::Red));
        assert_eq!(axes_with_run(&board, ROWS - 1, 2, Color::Red, 3), 1);
    }

    #[test]
    fn test_vertical_win() {
        let board = board_with(&[(4, Color::Yellow); 4]);
        assert!(is_winning_placement(&board, ROWS - 4, 4, Color::Yellow));
        assert!(!is_winning_placement(&board, ROWS - 4, 4, Color::Red));
    }

    #[test]
    fn test_diagonal_win() {
        // Staircase rising to the right: R at (5,0), (4,1), (3,2), (2,3).
        let board = board_with(&[
            (0, Color::Red),
            (1, Color::Yellow),
            (1, Color::Red),
            (2, Color::Yellow),
            (2, Color::Yellow),
            (2, Color::Red),
            (3, Color::Yellow),
            (3, Color::Yellow),
            (3, Color::Yellow),
            (3, Color::Red),
        ]);
        assert_eq!(contiguous_run(&board, 2, 3, Color::Red, Axis::AntiDiagonal), 4);
        assert!(is_winning_placement(&board, 2, 3, Color::Red));
    }

    #[test]
    fn test_falling_diagonal_win() {
        // R at (2,0), (3,1), (4,2), (5,3).
        let board = board_with(&[
            (3, Color::Red),
            (2, Color::Yellow),
            (2, Color::Red),
            (1, Color::Yellow),
            (1, Color::Yellow),
            (1, Color::Red),
            (0, Color::Yellow),
            (0, Color::Yellow),
            (0, Color::Yellow),
            (0, Color::Red),
        ]);
        assert_eq!(contiguous_run(&board, 2, 0, Color::Red, Axis::Diagonal), 4);
        assert!(is_winning_placement(&board, 5, 3, Color::Red));
    }

    #[test]
    fn test_empty_cell_has_no_run() {
        let board = Board::new();
        assert_eq!(contiguous_run(&board, 0, 0, Color::Red, Axis::Horizontal), 0);
        assert!(!is_winning_placement(&board, 0, 0, Color::Red));
    }
}
