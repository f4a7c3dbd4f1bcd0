//! Coordinator results and errors.

use crate::room::RoomCode;
use crate::store::StoreError;
use derive_more::{Display, Error};

/// Why a move was ignored.
///
/// Rejections model a disabled board rather than a user mistake, so they are
/// reported as values and never as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RejectReason {
    /// Index is not 0-8.
    #[display("cell is off the board")]
    OutOfRange,
    /// Cell already holds a mark.
    #[display("cell is taken")]
    Occupied,
    /// Match has already ended.
    #[display("match is over")]
    MatchOver,
    /// It is the other player's move.
    #[display("not your turn")]
    NotYourTurn,
    /// An earlier move has not resolved yet.
    #[display("a move is already being submitted")]
    MoveInFlight,
    /// A remote move was attempted without being in a room, or the room
    /// record has disappeared.
    #[display("not in a room")]
    NotInRoom,
    /// A local move was attempted while in a room.
    #[display("local moves are disabled in a room")]
    WrongMode,
}

/// Result of a move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MoveOutcome {
    /// The move was applied (local) or written (remote).
    #[display("accepted")]
    Accepted,
    /// The move was ignored.
    #[display("rejected: {}", _0)]
    Rejected(RejectReason),
}

impl MoveOutcome {
    /// True when the move took effect.
    pub fn is_accepted(&self) -> bool {
        matches!(self, MoveOutcome::Accepted)
    }
}

impl From<RejectReason> for MoveOutcome {
    fn from(reason: RejectReason) -> Self {
        MoveOutcome::Rejected(reason)
    }
}

/// Failures of room operations. All are recoverable.
#[derive(Debug, Clone, Display, Error)]
pub enum MatchError {
    /// Input was not a six-character alphanumeric code.
    #[display("Please enter a valid 6-character room code (got {:?})", _0)]
    InvalidRoomCode(#[error(not(source))] String),
    /// No room exists under the code.
    #[display("Room {} not found", _0)]
    RoomNotFound(#[error(not(source))] RoomCode),
    /// The room already has two players.
    #[display("Room {} is full", _0)]
    RoomFull(#[error(not(source))] RoomCode),
    /// The store could not complete an operation.
    #[display("Connection problem, please retry: {}", _0)]
    Transport(StoreError),
    /// No store is configured; only local play is possible.
    #[display("Online play is not available, use a local game")]
    RemoteUnavailable,
}

impl From<StoreError> for MatchError {
    fn from(err: StoreError) -> Self {
        MatchError::Transport(err)
    }
}
