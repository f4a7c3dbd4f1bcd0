//! Rules for Pink Sesame.
//!
//! Pure functions evaluating a board snapshot. Both play modes route every
//! rule decision through here, so local and remote matches can never
//! disagree about a result.

pub mod tie;
pub mod win;

pub use tie::{is_full, is_tie};
pub use win::{WINNING_LINES, Win, detect_winner};

use super::types::{Board, Outcome};
use tracing::instrument;

/// Returns true iff `index` is on the board and its cell is empty.
#[instrument(skip(board))]
pub fn is_legal_move(board: &Board, index: usize) -> bool {
    board.is_empty(index)
}

/// Evaluates a board: winner first, then tie, otherwise still open.
#[instrument(skip(board))]
pub fn evaluate(board: &Board) -> Option<Outcome> {
    if let Some(win) = detect_winner(board) {
        Some(Outcome::Winner(win.symbol))
    } else if is_full(board) {
        Some(Outcome::Tie)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    #[test]
    fn test_legal_move_bounds() {
        let board = Board::new();
        assert!(is_legal_move(&board, 0));
        assert!(is_legal_move(&board, 8));
        assert!(!is_legal_move(&board, 9));
        assert!(!is_legal_move(&board, usize::MAX));
    }

    #[test]
    fn test_legal_move_occupied() {
        let board = Board::new().with_mark(3, Symbol::Sms).unwrap();
        assert!(!is_legal_move(&board, 3));
        assert!(is_legal_move(&board, 4));
    }

    #[test]
    fn test_evaluate_open_board() {
        assert_eq!(evaluate(&Board::new()), None);
    }
}
