//! Tie detection.

use super::super::{Board, Cell};
use super::win::detect_winner;
use tracing::instrument;

/// Checks if the board is full (no empty cell).
#[instrument]
pub fn is_full(board: &Board) -> bool {
    board.cells().iter().all(|c| *c != Cell::Empty)
}

/// A full board with no completed line.
///
/// Winner detection runs first, so a full board that also holds a line is
/// never a tie.
#[instrument]
pub fn is_tie(board: &Board) -> bool {
    is_full(board) && detect_winner(board).is_none()
}
