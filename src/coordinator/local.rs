//! Same-device match: one client plays both symbols.

use super::error::RejectReason;
use derive_new::new;
use pink_sesame_rules::{Board, CELL_COUNT, Outcome, Symbol, detect_winner, is_full, is_legal_move};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Where a match stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Moves are accepted.
    InProgress,
    /// A symbol completed a line.
    Won(Symbol),
    /// Board filled with no line.
    Tied,
}

impl MatchStatus {
    /// The terminal outcome, if the match has ended.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            MatchStatus::InProgress => None,
            MatchStatus::Won(symbol) => Some(Outcome::Winner(symbol)),
            MatchStatus::Tied => Some(Outcome::Tie),
        }
    }
}

impl From<Option<Outcome>> for MatchStatus {
    fn from(outcome: Option<Outcome>) -> Self {
        match outcome {
            None => MatchStatus::InProgress,
            Some(Outcome::Winner(symbol)) => MatchStatus::Won(symbol),
            Some(Outcome::Tie) => MatchStatus::Tied,
        }
    }
}

/// What an accepted local move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct Placement {
    /// Cell that was filled.
    pub index: usize,
    /// Mark placed.
    pub symbol: Symbol,
    /// Status after the move.
    pub status: MatchStatus,
    /// Winning triple when the move won.
    pub line: Option<[usize; 3]>,
}

/// Local turn-alternating state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMatch {
    board: Board,
    turn: Symbol,
    status: MatchStatus,
    winning_line: Option<[usize; 3]>,
}

impl LocalMatch {
    /// A fresh match: empty board, PP to move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            turn: Symbol::Pp,
            status: MatchStatus::InProgress,
            winning_line: None,
        }
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Symbol to move (the last mover once the match has ended).
    pub fn turn(&self) -> Symbol {
        self.turn
    }

    /// Current status.
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Winning triple once won.
    pub fn winning_line(&self) -> Option<[usize; 3]> {
        self.winning_line
    }

    /// Places the current symbol at `index`.
    ///
    /// Ignored (state untouched) when the match is over or the cell is not
    /// playable.
    #[instrument(skip(self), fields(turn = %self.turn))]
    pub fn apply_move(&mut self, index: usize) -> Result<Placement, RejectReason> {
        if self.status != MatchStatus::InProgress {
            debug!("Move after match end ignored");
            return Err(RejectReason::MatchOver);
        }
        if !is_legal_move(&self.board, index) {
            debug!("Illegal move ignored");
            return Err(if index >= CELL_COUNT {
                RejectReason::OutOfRange
            } else {
                RejectReason::Occupied
            });
        }

        let symbol = self.turn;
        self.board = self
            .board
            .with_mark(index, symbol)
            .ok_or(RejectReason::OutOfRange)?;

        if let Some(win) = detect_winner(&self.board) {
            self.status = MatchStatus::Won(win.symbol);
            self.winning_line = Some(win.line);
            info!(winner = %win.symbol, line = ?win.line, "Match won");
        } else if is_full(&self.board) {
            self.status = MatchStatus::Tied;
            info!("Match tied");
        } else {
            self.turn = symbol.opponent();
        }

        Ok(Placement::new(index, symbol, self.status, self.winning_line))
    }

    /// Returns to the starting state from anywhere.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        *self = Self::new();
        debug!("Local match reset");
    }
}

impl Default for LocalMatch {
    fn default() -> Self {
        Self::new()
    }
}
