//! Win detection.

use super::super::{Board, Cell, Symbol};
use tracing::instrument;

/// The eight index triples that win: rows, then columns, then diagonals.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// A completed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Win {
    /// Symbol occupying the line.
    pub symbol: Symbol,
    /// The winning triple, one of [`WINNING_LINES`].
    pub line: [usize; 3],
}

/// Returns the first line in [`WINNING_LINES`] order held entirely by one
/// symbol.
#[instrument]
pub fn detect_winner(board: &Board) -> Option<Win> {
    WINNING_LINES.iter().find_map(|&line| {
        let [a, b, c] = line;
        match board.get(a)? {
            Cell::Occupied(symbol)
                if board.get(b) == Some(Cell::Occupied(symbol))
                    && board.get(c) == Some(Cell::Occupied(symbol)) =>
            {
                Some(Win { symbol, line })
            }
            _ => None,
        }
    })
}
