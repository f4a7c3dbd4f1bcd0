//! Room synchronization protocol.
//!
//! A remote client keeps a [`Projection`] of the last room record it saw.
//! The record itself stays in the store. The projection is written by the
//! notification listener and by this client's own accepted moves; move
//! submission reads the store afresh instead of trusting it.

use super::error::{MoveOutcome, RejectReason};
use super::local::MatchStatus;
use crate::observer::{MatchEvent, MatchObserver};
use crate::room::{PlayerId, RoomCode, RoomPatch, RoomRecord};
use crate::store::{RoomStore, StoreError, Subscription};
use pink_sesame_rules::{Board, CELL_COUNT, Outcome, Symbol, detect_winner, evaluate, is_legal_move};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

/// A client's cached view of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Projection {
    pub(crate) board: Board,
    pub(crate) turn: Symbol,
    pub(crate) active: bool,
    pub(crate) result: Option<Outcome>,
    pub(crate) guest: Option<PlayerId>,
    pub(crate) version: u64,
    pub(crate) subscribed: bool,
    end_reported: bool,
}

impl Projection {
    /// Starting view before the first notification arrives.
    pub(crate) fn new() -> Self {
        Self {
            board: Board::new(),
            turn: Symbol::Pp,
            active: true,
            result: None,
            guest: None,
            version: 0,
            subscribed: true,
            end_reported: false,
        }
    }

    /// `active && turn == role`.
    pub(crate) fn is_my_turn(&self, role: Symbol) -> bool {
        self.active && self.turn == role
    }

    pub(crate) fn status(&self) -> MatchStatus {
        MatchStatus::from(self.result)
    }

    /// Winning triple recomputed from the board, when the result is a win.
    pub(crate) fn winning_line(&self) -> Option<[usize; 3]> {
        let winner = self.result?.winner()?;
        detect_winner(&self.board)
            .filter(|w| w.symbol == winner)
            .map(|w| w.line)
    }

    /// Folds a delivered record into the view and returns what changed.
    ///
    /// Records older than the one already applied are ignored, and applying
    /// the same record twice yields no events. The end of a match is
    /// reported once per transition into the inactive state.
    #[instrument(skip(self, record), fields(version = record.version))]
    pub(crate) fn apply(&mut self, record: &RoomRecord, role: Symbol) -> Vec<MatchEvent> {
        if record.version != 0 && record.version <= self.version {
            debug!(seen = self.version, "Ignoring stale room record");
            return Vec::new();
        }
        let events = self.fold(record, role);
        self.version = record.version;
        events
    }

    /// Folds this client's own accepted write into the view ahead of the
    /// feed.
    ///
    /// `written` is the record the move was checked against with the move
    /// applied, so it still carries that read's version. Feed records at or
    /// below it predate the write and are ignored from here on; the echo of
    /// the write itself then changes nothing.
    #[instrument(skip(self, written), fields(based_on = written.version))]
    pub(crate) fn apply_own_write(
        &mut self,
        written: &RoomRecord,
        role: Symbol,
    ) -> Vec<MatchEvent> {
        let events = self.fold(written, role);
        self.version = self.version.max(written.version);
        events
    }

    fn fold(&mut self, record: &RoomRecord, role: Symbol) -> Vec<MatchEvent> {
        let mut events = Vec::new();

        let reset = record.board.is_blank() && !self.board.is_blank();
        if reset {
            events.push(MatchEvent::Reset);
        } else {
            for index in 0..CELL_COUNT {
                let now = record.board.get(index);
                if now != self.board.get(index)
                    && let Some(symbol) = now.and_then(|c| c.symbol())
                {
                    events.push(MatchEvent::CellChanged { index, symbol });
                }
            }
        }

        if role == Symbol::Pp && self.guest.is_none() && record.guest.is_some() {
            events.push(MatchEvent::OpponentJoined);
        }

        if record.active && (reset || record.turn != self.turn) {
            events.push(MatchEvent::TurnChanged(record.turn));
        }

        self.board = record.board;
        self.turn = record.turn;
        self.active = record.active;
        self.result = record.result;
        self.guest = record.guest.clone();

        if self.active {
            self.end_reported = false;
        } else if !self.end_reported {
            match self.result {
                Some(outcome) => {
                    events.push(MatchEvent::MatchEnded {
                        outcome,
                        line: self.winning_line(),
                    });
                    self.end_reported = true;
                }
                None => warn!("Inactive room record without a result"),
            }
        }

        events
    }
}

/// Shared handle to a projection.
pub(crate) type SharedProjection = Arc<Mutex<Projection>>;

pub(crate) fn lock(projection: &SharedProjection) -> std::sync::MutexGuard<'_, Projection> {
    projection.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of checking a move against the stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Submitted {
    /// The move was written; holds the record as the move left it.
    Written(RoomRecord),
    /// The stored record does not allow the move.
    Rejected(RejectReason),
}

/// Reads the authoritative record, checks the move against it and writes
/// the resulting state back.
///
/// The stored turn must belong to `role`. Read and write are separate store
/// calls, so two submissions for the same role that both read before either
/// writes will both succeed and the later write wins.
pub async fn submit_move(
    store: &dyn RoomStore,
    code: &RoomCode,
    role: Symbol,
    index: usize,
) -> Result<MoveOutcome, StoreError> {
    Ok(match write_move(store, code, role, index).await? {
        Submitted::Written(_) => MoveOutcome::Accepted,
        Submitted::Rejected(reason) => MoveOutcome::Rejected(reason),
    })
}

#[instrument(skip(store), fields(room = %code, role = %role))]
pub(crate) async fn write_move(
    store: &dyn RoomStore,
    code: &RoomCode,
    role: Symbol,
    index: usize,
) -> Result<Submitted, StoreError> {
    let Some(mut record) = store.read(code).await? else {
        warn!("Room vanished before move");
        return Ok(Submitted::Rejected(RejectReason::NotInRoom));
    };
    if !record.active {
        debug!("Room already finished");
        return Ok(Submitted::Rejected(RejectReason::MatchOver));
    }
    if record.turn != role {
        debug!(turn = %record.turn, "Stored turn belongs to the opponent");
        return Ok(Submitted::Rejected(RejectReason::NotYourTurn));
    }
    if !is_legal_move(&record.board, index) {
        debug!("Cell not playable in authoritative board");
        let reason = if index >= CELL_COUNT {
            RejectReason::OutOfRange
        } else {
            RejectReason::Occupied
        };
        return Ok(Submitted::Rejected(reason));
    }
    let Some(board) = record.board.with_mark(index, role) else {
        return Ok(Submitted::Rejected(RejectReason::OutOfRange));
    };

    let result = evaluate(&board);
    let patch = RoomPatch::after_move(board, role.opponent(), result);
    store.update(code, patch.clone()).await?;
    patch.apply_to(&mut record);
    info!(?result, "Move written");
    Ok(Submitted::Written(record))
}

/// Applies every delivered record to `projection` until the feed closes or
/// `stop` fires, then hands the subscription back to the store.
pub(crate) async fn listen(
    store: Arc<dyn RoomStore>,
    mut subscription: Subscription,
    projection: SharedProjection,
    role: Symbol,
    observer: Arc<dyn MatchObserver>,
    mut stop: oneshot::Receiver<()>,
) {
    let code = subscription.code().clone();
    debug!(room = %code, "Listening for room changes");
    let stopped = loop {
        tokio::select! {
            _ = &mut stop => break true,
            delivered = subscription.recv() => match delivered {
                Some(record) => {
                    let events = lock(&projection).apply(&record, role);
                    for event in &events {
                        event.dispatch(observer.as_ref());
                    }
                }
                None => break false,
            },
        }
    };

    if stopped {
        debug!(room = %code, "Listener stopped");
        store.unsubscribe(subscription).await;
    } else {
        warn!(room = %code, "Room feed closed; moves are frozen");
        lock(&projection).subscribed = false;
    }
}
