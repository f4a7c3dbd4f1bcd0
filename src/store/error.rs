//! Store error types.

use crate::room::RoomCode;
use derive_more::{Display, Error};
use tracing::instrument;

/// What went wrong talking to a room store.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum StoreErrorKind {
    /// The backend could not be reached or timed out.
    #[display("store unreachable: {}", _0)]
    Unreachable(String),
    /// The backend refused the operation.
    #[display("operation rejected: {}", _0)]
    Rejected(String),
    /// An update targeted a room that does not exist.
    #[display("no room at {}", _0)]
    MissingRoom(RoomCode),
    /// The backend returned data that could not be decoded.
    #[display("malformed record: {}", _0)]
    Decode(String),
    /// Change notifications stopped arriving.
    #[display("subscription closed")]
    SubscriptionClosed,
}

/// Store error with location tracking.
///
/// Every store error is retryable; none of them invalidates the room.
#[derive(Debug, Clone, Display, Error)]
#[display("Store error: {} at {}:{}", kind, file, line)]
pub struct StoreError {
    /// Error category.
    pub kind: StoreErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new store error with caller location tracking.
    #[track_caller]
    #[instrument]
    pub fn new(kind: StoreErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::new(StoreErrorKind::Decode(err.to_string()))
        } else {
            Self::new(StoreErrorKind::Unreachable(err.to_string()))
        }
    }
}
