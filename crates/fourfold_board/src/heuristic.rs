//! One-ply move selection for the scripted opponent.
//!
//! Priority order over the playable columns:
//!
//! 1. play a column that wins immediately;
//! 2. otherwise block a column where the opponent would win;
//! 3. otherwise take the best static score (centre preference plus
//!    offensive and defensive run counts through the landing cell).
//!
//! Every trial move is made on a copy of the board. Ties always go to the
//! lowest column index.
//!
//! The defensive term counts opponent runs through the bot's own landing
//! cell with that cell recoloured. It approximates "how much does this cell
//! deny the opponent" and is not an exact threat detector.

use crate::rules::{axes_with_run, is_winning_placement};
use crate::types::{Board, CENTER_COLUMN, Color};
use tracing::{debug, instrument};

/// Weight per column of distance from the centre.
const POSITION_WEIGHT: i32 = 10;

/// Weight per axis where the bot would hold three or more in a row.
const OFFENSE_WEIGHT: i32 = 50;

/// Weight per axis where the opponent would hold three or more in a row.
const DEFENSE_WEIGHT: i32 = 30;

/// Run length that counts towards the offense and defense terms.
const THREAT_LENGTH: usize = 3;

/// Returns the column `color` wins with by playing it, if any.
fn winning_column(board: &Board, color: Color) -> Option<usize> {
    board.playable_columns().find(|&column| {
        let mut scratch = *board;
        match scratch.drop_disc(column, color) {
            Ok(row) => is_winning_placement(&scratch, row, column, color),
            Err(_) => false,
        }
    })
}

/// Static score for dropping a `color` disc into `column`.
///
/// Returns `None` when the column cannot take a disc.
pub fn score_column(board: &Board, column: usize, color: Color) -> Option<i32> {
    let mut scratch = *board;
    let row = scratch.drop_disc(column, color).ok()?;

    let distance = column.abs_diff(CENTER_COLUMN) as i32;
    let positional = (CENTER_COLUMN as i32 - distance) * POSITION_WEIGHT;

    let offense = axes_with_run(&scratch, row, column, color, THREAT_LENGTH) as i32;

    let mut denied = *board;
    denied.drop_disc(column, color.opponent()).ok()?;
    let defense = axes_with_run(&denied, row, column, color.opponent(), THREAT_LENGTH) as i32;

    Some(positional + offense * OFFENSE_WEIGHT + defense * DEFENSE_WEIGHT)
}

/// Picks the column the scripted opponent playing `color` should drop into.
///
/// Returns `None` when the board has no playable column.
#[instrument(skip(board), fields(discs = board.disc_count()))]
pub fn choose_column(board: &Board, color: Color) -> Option<usize> {
    let playable: Vec<usize> = board.playable_columns().collect();
    match playable.as_slice() {
        [] => return None,
        [only] => return Some(*only),
        _ => {}
    }

    if let Some(column) = winning_column(board, color) {
        debug!(column, "Taking winning column");
        return Some(column);
    }

    if let Some(column) = winning_column(board, color.opponent()) {
        debug!(column, "Blocking opponent");
        return Some(column);
    }

    let mut best: Option<(usize, i32)> = None;
    for &column in &playable {
        let Some(score) = score_column(board, column, color) else {
            continue;
        };
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((column, score));
        }
    }

    debug!(choice = ?best, "Chose highest scoring column");
    best.map(|(column, _)| column)
}
