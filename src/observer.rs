//! Presentation hooks.
//!
//! The coordinator never renders anything itself; it reports what changed
//! through a [`MatchObserver`]. Every method has an empty default so a
//! front-end only implements what it draws.

use pink_sesame_rules::{Outcome, Symbol};
use tracing::{info, instrument};

/// Receives match changes for display.
pub trait MatchObserver: Send + Sync {
    /// A cell now holds `symbol`.
    fn on_cell_changed(&self, _index: usize, _symbol: Symbol) {}

    /// It is now `symbol`'s move.
    fn on_turn_changed(&self, _symbol: Symbol) {}

    /// The match ended. `line` is the winning triple, if there is one.
    fn on_match_ended(&self, _outcome: Outcome, _line: Option<[usize; 3]>) {}

    /// The match returned to its starting state.
    fn on_reset(&self) {}

    /// The second player entered the room.
    fn on_opponent_joined(&self) {}
}

/// One observable change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// See [`MatchObserver::on_cell_changed`].
    CellChanged {
        /// Cell index (0-8).
        index: usize,
        /// Mark now in the cell.
        symbol: Symbol,
    },
    /// See [`MatchObserver::on_turn_changed`].
    TurnChanged(Symbol),
    /// See [`MatchObserver::on_match_ended`].
    MatchEnded {
        /// How the match ended.
        outcome: Outcome,
        /// Winning triple, if any.
        line: Option<[usize; 3]>,
    },
    /// See [`MatchObserver::on_reset`].
    Reset,
    /// See [`MatchObserver::on_opponent_joined`].
    OpponentJoined,
}

impl MatchEvent {
    /// Forwards this event to the matching observer method.
    pub fn dispatch(&self, observer: &dyn MatchObserver) {
        match *self {
            MatchEvent::CellChanged { index, symbol } => observer.on_cell_changed(index, symbol),
            MatchEvent::TurnChanged(symbol) => observer.on_turn_changed(symbol),
            MatchEvent::MatchEnded { outcome, line } => observer.on_match_ended(outcome, line),
            MatchEvent::Reset => observer.on_reset(),
            MatchEvent::OpponentJoined => observer.on_opponent_joined(),
        }
    }
}

/// Observer that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl MatchObserver for TracingObserver {
    #[instrument(skip(self))]
    fn on_cell_changed(&self, index: usize, symbol: Symbol) {
        info!(index, %symbol, "Cell changed");
    }

    #[instrument(skip(self))]
    fn on_turn_changed(&self, symbol: Symbol) {
        info!(%symbol, "Turn changed");
    }

    #[instrument(skip(self))]
    fn on_match_ended(&self, outcome: Outcome, line: Option<[usize; 3]>) {
        info!(%outcome, ?line, "Match ended");
    }

    #[instrument(skip(self))]
    fn on_reset(&self) {
        info!("Match reset");
    }

    #[instrument(skip(self))]
    fn on_opponent_joined(&self) {
        info!("Opponent joined");
    }
}
