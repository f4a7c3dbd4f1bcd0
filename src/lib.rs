//! Pink Sesame - two-player tic-tac-toe, locally or across a shared room.
//!
//! # Architecture
//!
//! - **Rules**: board types and pure rule functions (`pink_sesame_rules`)
//! - **Coordinator**: one client's match, local or room-backed
//! - **Store**: the room store contract plus in-memory and HTTP backends
//! - **Observer**: presentation hooks fired on every visible change
//!
//! # Example
//!
//! ```
//! use pink_sesame::{MatchCoordinator, MatchStatus, TracingObserver};
//! use pink_sesame::rules::Symbol;
//! use std::sync::Arc;
//!
//! let mut game = MatchCoordinator::local_only(Arc::new(TracingObserver));
//! for index in [0, 4, 1, 5, 2] {
//!     game.apply_move(index);
//! }
//! assert_eq!(*game.view().status(), MatchStatus::Won(Symbol::Pp));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod coordinator;
mod observer;
mod room;
mod store;

/// Re-export of the rules crate.
pub use pink_sesame_rules as rules;

// Crate-level exports - Configuration
pub use config::{Config, ConfigError, STORE_URL_ENV};

// Crate-level exports - Coordination
pub use coordinator::{
    LocalMatch, MatchCoordinator, MatchError, MatchStatus, MatchView, ModeKind, MoveOutcome,
    Placement, RejectReason, submit_move,
};

// Crate-level exports - Presentation
pub use observer::{MatchEvent, MatchObserver, TracingObserver};

// Crate-level exports - Rooms
pub use room::{PlayerId, ROOM_CODE_LEN, RoomCode, RoomPatch, RoomRecord};

// Crate-level exports - Stores
pub use store::{
    HttpStore, MemoryStore, RoomStore, StoreError, StoreErrorKind, Subscription, router,
};
