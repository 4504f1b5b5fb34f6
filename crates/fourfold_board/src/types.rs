//! Core domain types for Connect Four.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Number of rows on the board. Row 0 is the top.
pub const ROWS: usize = 6;

/// Number of columns on the board.
pub const COLUMNS: usize = 7;

/// Column the positional score is centred on.
pub const CENTER_COLUMN: usize = COLUMNS / 2;

/// Contiguous discs needed to win.
pub const WIN_LENGTH: usize = 4;

/// Seat color. Red always opens a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Color {
    /// First mover.
    Red,
    /// Second mover.
    Yellow,
}

impl Color {
    /// Returns the other seat's color.
    pub fn opponent(self) -> Self {
        match self {
            Color::Red => Color::Yellow,
            Color::Yellow => Color::Red,
        }
    }
}

/// A single cell on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    /// No disc.
    Empty,
    /// Holds a disc of the given color.
    Occupied(Color),
}

/// Reasons a disc cannot be dropped into a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum DropError {
    /// Column index is not on the board.
    #[display("column {} is out of range (0-{})", _0, COLUMNS - 1)]
    OutOfRange(#[error(not(source))] usize),
    /// Column has no empty cell left.
    #[display("column {} is full", _0)]
    Full(#[error(not(source))] usize),
}

/// 6x7 Connect Four grid with gravity semantics.
///
/// The board is `Copy` so speculative evaluation can always work on a
/// scratch copy instead of mutating and restoring the live grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Cells in row-major order, row 0 at the top.
    cells: [[Cell; COLUMNS]; ROWS],
}

impl Board {
    /// Creates a new empty board.
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; COLUMNS]; ROWS],
        }
    }

    /// Gets the cell at the given position, or `None` when off the board.
    pub fn get(&self, row: usize, column: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(column)).copied()
    }

    /// Returns all rows, top first.
    pub fn rows(&self) -> &[[Cell; COLUMNS]; ROWS] {
        &self.cells
    }

    /// Checks whether a disc can still be dropped into `column`.
    pub fn is_playable(&self, column: usize) -> bool {
        column < COLUMNS && self.cells[0][column] == Cell::Empty
    }

    /// Returns the row a disc dropped into `column` would land in.
    pub fn landing_row(&self, column: usize) -> Option<usize> {
        if column >= COLUMNS {
            return None;
        }
        (0..ROWS)
            .rev()
            .find(|&row| self.cells[row][column] == Cell::Empty)
    }

    /// Columns that are not yet full, in natural order.
    pub fn playable_columns(&self) -> impl Iterator<Item = usize> + '_ {
        (0..COLUMNS).filter(|&column| self.is_playable(column))
    }

    /// Drops a disc into `column`. Returns the row it landed in.
    ///
    /// This is the only way a cell changes from empty to occupied.
    ///
    /// # Errors
    ///
    /// Returns [`DropError`] when the column is off the board or full.
    pub fn drop_disc(&mut self, column: usize, color: Color) -> Result<usize, DropError> {
        if column >= COLUMNS {
            return Err(DropError::OutOfRange(column));
        }
        let row = self.landing_row(column).ok_or(DropError::Full(column))?;
        self.cells[row][column] = Cell::Occupied(color);
        Ok(row)
    }

    /// Number of discs on the board.
    pub fn disc_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| **cell != Cell::Empty)
            .count()
    }

    /// Formats the board as a human-readable grid.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in &self.cells {
            for cell in row {
                result.push(match cell {
                    Cell::Empty => '.',
                    Cell::Occupied(Color::Red) => 'R',
                    Cell::Occupied(Color::Yellow) => 'Y',
                });
            }
            result.push('\n');
        }
        result.push_str("0123456");
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disc_falls_to_bottom() {
        let mut board = Board::new();
        let row = board.drop_disc(3, Color::Red).expect("Column is empty");
        assert_eq!(row, ROWS - 1);
        assert_eq!(board.get(ROWS - 1, 3), Some(Cell::Occupied(Color::Red)));
    }

    #[test]
    fn test_discs_stack() {
        let mut board = Board::new();
        board.drop_disc(0, Color::Red).expect("Drop failed");
        let row = board.drop_disc(0, Color::Yellow).expect("Drop failed");
        assert_eq!(row, ROWS - 2);
    }

    #[test]
    fn test_full_column_rejected() {
        let mut board = Board::new();
        for i in 0..ROWS {
            let color = if i % 2 == 0 { Color::Red } else { Color::Yellow };
            board.drop_disc(6, color).expect("Drop failed");
        }
        assert!(!board.is_playable(6));
        assert_eq!(board.drop_disc(6, Color::Red), Err(DropError::Full(6)));
        assert_eq!(board.disc_count(), ROWS);
    }

    #[test]
    fn test_out_of_range_column() {
        let mut board = Board::new();
        assert_eq!(
            board.drop_disc(COLUMNS, Color::Red),
            Err(DropError::OutOfRange(COLUMNS))
        );
        assert_eq!(board.landing_row(COLUMNS), None);
        assert_eq!(board.get(0, COLUMNS), None);
    }

    #[test]
    fn test_playable_columns_skip_full() {
        let mut board = Board::new();
        for _ in 0..ROWS {
            board.drop_disc(2, Color::Red).expect("Drop failed");
        }
        let playable: Vec<_> = board.playable_columns().collect();
        assert_eq!(playable, vec![0, 1, 3, 4, 5, 6]);
    }

    #[test]
    fn test_display_marks_discs() {
        let mut board = Board::new();
        board.drop_disc(0, Color::Red).expect("Drop failed");
        board.drop_disc(1, Color::Yellow).expect("Drop failed");
        let text = board.display();
        assert!(text.contains("RY....."));
    }

    #[test]
    fn test_color_serializes_lowercase() {
        let json = serde_json::to_string(&Color::Yellow).expect("Serialize failed");
        assert_eq!(json, "\"yellow\"");
        assert_eq!(Color::Red.to_string(), "red");
        assert_eq!(Color::Red.opponent(), Color::Yellow);
    }
}
