//! Pink Sesame rules engine.
//!
//! Board types and the pure rule functions shared by every play mode:
//! move legality, win detection and tie detection on a 3x3 board with the
//! two symbols PP and SMS.
//!
//! # Example
//!
//! ```
//! use pink_sesame_rules::{Board, Outcome, Symbol, evaluate, detect_winner};
//!
//! let board = [0, 1, 2]
//!     .into_iter()
//!     .fold(Board::new(), |b, i| b.with_mark(i, Symbol::Pp).unwrap());
//! assert_eq!(detect_winner(&board).map(|w| w.line), Some([0, 1, 2]));
//! assert_eq!(evaluate(&board), Some(Outcome::Winner(Symbol::Pp)));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod position;
mod rules;
mod types;

pub use position::Position;
pub use rules::{WINNING_LINES, Win, detect_winner, evaluate, is_full, is_legal_move, is_tie};
pub use types::{Board, CELL_COUNT, Cell, LabelError, Outcome, Symbol};
