//! Core domain types for the Pink Sesame board.

use serde::{Deserialize, Serialize};

/// Number of cells on the board.
pub const CELL_COUNT: usize = 9;

/// A player's mark.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    strum::EnumIter,
)]
pub enum Symbol {
    /// Player PP (always moves first).
    #[serde(rename = "PP")]
    #[display("PP")]
    Pp,
    /// Player SMS (moves second).
    #[serde(rename = "SMS")]
    #[display("SMS")]
    Sms,
}

impl Symbol {
    /// Returns the other symbol.
    pub fn opponent(self) -> Self {
        match self {
            Symbol::Pp => Symbol::Sms,
            Symbol::Sms => Symbol::Pp,
        }
    }

    /// Wire label of this symbol.
    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::Pp => "PP",
            Symbol::Sms => "SMS",
        }
    }

    /// Parses a wire label (`"PP"` or `"SMS"`).
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "PP" => Some(Symbol::Pp),
            "SMS" => Some(Symbol::Sms),
            _ => None,
        }
    }
}

/// Error raised when a wire string is not a recognised cell or outcome.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Unrecognised label: {:?}", label)]
pub struct LabelError {
    /// The rejected label.
    pub label: String,
}

/// A cell on the board.
///
/// On the wire a cell is a plain string: `""` when empty, otherwise the
/// symbol's label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Cell {
    /// Nobody has played here.
    #[default]
    Empty,
    /// Cell holds a mark.
    Occupied(Symbol),
}

impl Cell {
    /// Returns the symbol in this cell, if any.
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(symbol) => Some(symbol),
        }
    }
}

impl From<Cell> for String {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Empty => String::new(),
            Cell::Occupied(symbol) => symbol.as_str().to_string(),
        }
    }
}

impl TryFrom<String> for Cell {
    type Error = LabelError;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        if label.is_empty() {
            return Ok(Cell::Empty);
        }
        Symbol::from_label(&label)
            .map(Cell::Occupied)
            .ok_or(LabelError { label })
    }
}

/// 3x3 board, row-major (0,1,2 is the top row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a board from explicit cells.
    pub fn from_cells(cells: [Cell; CELL_COUNT]) -> Self {
        Self { cells }
    }

    /// Gets the cell at `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Returns true if `index` is on the board and unoccupied.
    pub fn is_empty(&self, index: usize) -> bool {
        matches!(self.get(index), Some(Cell::Empty))
    }

    /// Returns a copy of this board with `symbol` placed at `index`.
    ///
    /// Returns `None` when `index` is out of range. Occupancy is not checked;
    /// callers consult [`crate::is_legal_move`] first.
    pub fn with_mark(&self, index: usize, symbol: Symbol) -> Option<Self> {
        let mut next = *self;
        *next.cells.get_mut(index)? = Cell::Occupied(symbol);
        Some(next)
    }

    /// All cells in index order.
    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    /// Returns true when every cell is empty.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| *c == Cell::Empty)
    }

    /// Formats the board as a human-readable grid; free cells show their index.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..3 {
            for col in 0..3 {
                let index = row * 3 + col;
                let label = match self.cells[index] {
                    Cell::Empty => index.to_string(),
                    Cell::Occupied(symbol) => symbol.to_string(),
                };
                result.push_str(&format!("{:^5}", label));
                if col < 2 {
                    result.push('|');
                }
            }
            if row < 2 {
                result.push_str("\n-----+-----+-----\n");
            }
        }
        result
    }
}

/// How a finished match ended.
///
/// On the wire an outcome is `"PP"`, `"SMS"` or `"tie"`; an unfinished match
/// carries `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Outcome {
    /// A symbol completed a line.
    Winner(Symbol),
    /// Board filled with no line completed.
    Tie,
}

impl Outcome {
    /// Returns the winner if there is one.
    pub fn winner(&self) -> Option<Symbol> {
        match self {
            Outcome::Winner(symbol) => Some(*symbol),
            Outcome::Tie => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Winner(symbol) => write!(f, "Player {} wins", symbol),
            Outcome::Tie => write!(f, "It's a tie"),
        }
    }
}

impl From<Outcome> for String {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Winner(symbol) => symbol.as_str().to_string(),
            Outcome::Tie => "tie".to_string(),
        }
    }
}

impl TryFrom<String> for Outcome {
    type Error = LabelError;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        if label == "tie" {
            return Ok(Outcome::Tie);
        }
        Symbol::from_label(&label)
            .map(Outcome::Winner)
            .ok_or(LabelError { label })
    }
}
