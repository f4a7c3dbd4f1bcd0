//! Match coordination for local and room-based play.
//!
//! [`MatchCoordinator`] owns one client's match. In local mode it runs the
//! turn-alternating state machine directly; in a room it projects the shared
//! record and submits moves through the store. Both modes evaluate boards
//! with the same rules crate.

mod error;
mod local;
mod remote;

pub use error::{MatchError, MoveOutcome, RejectReason};
pub use local::{LocalMatch, MatchStatus, Placement};
pub use remote::submit_move;

use crate::observer::{MatchEvent, MatchObserver};
use crate::room::{PlayerId, RoomCode, RoomPatch, RoomRecord};
use crate::store::{RoomStore, StoreError, StoreErrorKind, Subscription};
use derive_getters::Getters;
use pink_sesame_rules::{Board, CELL_COUNT, Symbol};
use remote::{Projection, SharedProjection, Submitted, lock, write_move};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Which kind of match a coordinator is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    /// Both symbols played on this device.
    Local,
    /// One symbol played through a shared room.
    Remote,
}

/// Snapshot of a coordinator's match for display.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct MatchView {
    /// Current board.
    board: Board,
    /// Symbol to move.
    turn: Symbol,
    /// Where the match stands.
    status: MatchStatus,
    /// False once the match has ended.
    active: bool,
    /// Winning triple once won.
    winning_line: Option<[usize; 3]>,
    /// Local or remote.
    mode: ModeKind,
    /// Symbol this client plays in a room.
    role: Option<Symbol>,
    /// Room this client is in.
    room: Option<RoomCode>,
    /// True when this client may move now.
    is_my_turn: bool,
    /// True once both room slots are filled (always true locally).
    opponent_joined: bool,
}

struct RemoteSession {
    store: Arc<dyn RoomStore>,
    code: RoomCode,
    role: Symbol,
    projection: SharedProjection,
    in_flight: AtomicBool,
    stop: Option<oneshot::Sender<()>>,
    listener: JoinHandle<()>,
}

enum Mode {
    Local(LocalMatch),
    Remote(RemoteSession),
}

/// Clears the in-flight flag when a submission finishes or is cancelled.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One client's match.
pub struct MatchCoordinator {
    store: Option<Arc<dyn RoomStore>>,
    observer: Arc<dyn MatchObserver>,
    player_id: PlayerId,
    mode: Mode,
}

impl std::fmt::Debug for MatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchCoordinator")
            .field("player_id", &self.player_id)
            .field("remote_available", &self.store.is_some())
            .field("view", &self.view())
            .finish()
    }
}

impl MatchCoordinator {
    /// Creates a coordinator in local mode.
    ///
    /// Without a `store` every room operation fails with
    /// [`MatchError::RemoteUnavailable`].
    #[instrument(skip_all, fields(remote_available = store.is_some()))]
    pub fn new(store: Option<Arc<dyn RoomStore>>, observer: Arc<dyn MatchObserver>) -> Self {
        let player_id = PlayerId::generate();
        info!(%player_id, "Creating match coordinator");
        Self {
            store,
            observer,
            player_id,
            mode: Mode::Local(LocalMatch::new()),
        }
    }

    /// Creates a coordinator that can only play locally.
    pub fn local_only(observer: Arc<dyn MatchObserver>) -> Self {
        Self::new(None, observer)
    }

    /// This client's identity in rooms.
    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    /// Current match as this client sees it.
    pub fn view(&self) -> MatchView {
        match &self.mode {
            Mode::Local(game) => MatchView {
                board: *game.board(),
                turn: game.turn(),
                status: game.status(),
                active: game.status() == MatchStatus::InProgress,
                winning_line: game.winning_line(),
                mode: ModeKind::Local,
                role: None,
                room: None,
                is_my_turn: game.status() == MatchStatus::InProgress,
                opponent_joined: true,
            },
            Mode::Remote(session) => {
                let p = lock(&session.projection);
                MatchView {
                    board: p.board,
                    turn: p.turn,
                    status: p.status(),
                    active: p.active,
                    winning_line: p.winning_line(),
                    mode: ModeKind::Remote,
                    role: Some(session.role),
                    room: Some(session.code.clone()),
                    is_my_turn: p.is_my_turn(session.role),
                    opponent_joined: session.role == Symbol::Sms || p.guest.is_some(),
                }
            }
        }
    }

    /// True when this client may move now.
    pub fn is_my_turn(&self) -> bool {
        match &self.mode {
            Mode::Local(game) => game.status() == MatchStatus::InProgress,
            Mode::Remote(session) => lock(&session.projection).is_my_turn(session.role),
        }
    }

    /// Leaves any room and starts a fresh local match.
    #[instrument(skip(self))]
    pub fn start_local(&mut self) {
        if let Some(listener) = self.detach() {
            // The listener unsubscribes by itself once its stop signal fires.
            drop(listener);
        }
        self.mode = Mode::Local(LocalMatch::new());
        self.emit(&[MatchEvent::Reset, MatchEvent::TurnChanged(Symbol::Pp)]);
        info!("Local match started");
    }

    /// Plays the current symbol at `index` in a local match.
    #[instrument(skip(self))]
    pub fn apply_move(&mut self, index: usize) -> MoveOutcome {
        let Mode::Local(game) = &mut self.mode else {
            debug!("Local move while in a room ignored");
            return MoveOutcome::Rejected(RejectReason::WrongMode);
        };

        let placement = match game.apply_move(index) {
            Ok(placement) => placement,
            Err(reason) => return MoveOutcome::Rejected(reason),
        };
        let next_turn = game.turn();

        let mut events = vec![MatchEvent::CellChanged {
            index: placement.index,
            symbol: placement.symbol,
        }];
        match placement.status.outcome() {
            Some(outcome) => events.push(MatchEvent::MatchEnded {
                outcome,
                line: placement.line,
            }),
            None => events.push(MatchEvent::TurnChanged(next_turn)),
        }
        self.emit(&events);
        MoveOutcome::Accepted
    }

    /// Restarts a local match from any state. Does nothing in a room; use
    /// [`MatchCoordinator::new_game`] there.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        let Mode::Local(game) = &mut self.mode else {
            debug!("Local reset while in a room ignored");
            return;
        };
        game.reset();
        self.emit(&[MatchEvent::Reset, MatchEvent::TurnChanged(Symbol::Pp)]);
    }

    /// Starts the next match in whichever mode is active.
    ///
    /// In a room this rewrites the shared record to its starting state while
    /// keeping both players; every client sees the reset through its feed.
    #[instrument(skip(self))]
    pub async fn new_game(&mut self) -> Result<(), MatchError> {
        if matches!(self.mode, Mode::Local(_)) {
            self.reset();
            return Ok(());
        }
        let Mode::Remote(session) = &self.mode else {
            return Ok(());
        };
        session
            .store
            .update(&session.code, RoomPatch::restart())
            .await?;
        info!(room = %session.code, "Room restarted");
        Ok(())
    }

    /// Creates a room, plays PP in it and starts following it.
    #[instrument(skip(self))]
    pub async fn create_room(&mut self) -> Result<RoomCode, MatchError> {
        let store = self.remote_store()?;
        let code = RoomCode::generate();

        store
            .create(&code, RoomRecord::new(self.player_id.clone()))
            .await?;
        let subscription = store.subscribe(&code).await?;

        self.attach(store, code.clone(), Symbol::Pp, subscription);
        info!(room = %code, "Room created");
        Ok(code)
    }

    /// Joins the room named by `input` as SMS.
    ///
    /// # Errors
    ///
    /// [`MatchError::InvalidRoomCode`] before any store access when `input`
    /// is not six letters or digits; [`MatchError::RoomNotFound`] or
    /// [`MatchError::RoomFull`] from the room's current state.
    #[instrument(skip(self))]
    pub async fn join_room(&mut self, input: &str) -> Result<RoomCode, MatchError> {
        let store = self.remote_store()?;
        let code = RoomCode::parse(input).ok_or_else(|| {
            warn!(input, "Rejected malformed room code");
            MatchError::InvalidRoomCode(input.to_string())
        })?;

        let Some(record) = store.read(&code).await? else {
            warn!(room = %code, "Room not found");
            return Err(MatchError::RoomNotFound(code));
        };
        if record.is_full() {
            warn!(room = %code, "Room is full");
            return Err(MatchError::RoomFull(code));
        }

        store
            .update(&code, RoomPatch::join(self.player_id.clone()))
            .await?;
        let subscription = store.subscribe(&code).await?;

        self.attach(store, code.clone(), Symbol::Sms, subscription);
        info!(room = %code, "Joined room");
        Ok(code)
    }

    /// Submits a move in the current room.
    ///
    /// Gated on this client's projection: when it is not this client's turn,
    /// the match is over, or a previous move is still in flight, the call is
    /// rejected without touching the store. Otherwise the move is checked
    /// against a fresh read of the room and written back, and the written
    /// state is folded into the projection before this returns, so the turn
    /// has already passed to the opponent.
    #[instrument(skip(self))]
    pub async fn attempt_move(&self, index: usize) -> Result<MoveOutcome, MatchError> {
        let Mode::Remote(session) = &self.mode else {
            debug!("Remote move outside a room ignored");
            return Ok(MoveOutcome::Rejected(RejectReason::NotInRoom));
        };

        {
            let projection = lock(&session.projection);
            if !projection.subscribed {
                return Err(StoreError::new(StoreErrorKind::SubscriptionClosed).into());
            }
            if !projection.active {
                return Ok(MoveOutcome::Rejected(RejectReason::MatchOver));
            }
            if projection.turn != session.role {
                debug!(turn = %projection.turn, "Not this client's turn");
                return Ok(MoveOutcome::Rejected(RejectReason::NotYourTurn));
            }
        }
        if index >= CELL_COUNT {
            return Ok(MoveOutcome::Rejected(RejectReason::OutOfRange));
        }
        if session.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Move already in flight");
            return Ok(MoveOutcome::Rejected(RejectReason::MoveInFlight));
        }
        let _in_flight = InFlight(&session.in_flight);

        match write_move(session.store.as_ref(), &session.code, session.role, index).await? {
            Submitted::Written(record) => {
                let events = lock(&session.projection).apply_own_write(&record, session.role);
                self.emit(&events);
                Ok(MoveOutcome::Accepted)
            }
            Submitted::Rejected(reason) => {
                warn!(%reason, "Room rejected move");
                Ok(MoveOutcome::Rejected(reason))
            }
        }
    }

    /// Re-opens the room feed after it closed.
    ///
    /// Does nothing when the feed is still live or when not in a room.
    #[instrument(skip(self))]
    pub async fn reconnect(&mut self) -> Result<(), MatchError> {
        let Mode::Remote(session) = &mut self.mode else {
            return Ok(());
        };
        if lock(&session.projection).subscribed {
            return Ok(());
        }

        let subscription = session.store.subscribe(&session.code).await?;
        lock(&session.projection).subscribed = true;
        let (stop, listener) = spawn_listener(
            session.store.clone(),
            subscription,
            session.projection.clone(),
            session.role,
            self.observer.clone(),
        );
        session.stop = Some(stop);
        session.listener = listener;
        info!(room = %session.code, "Room feed re-opened");
        Ok(())
    }

    /// Stops following the room and returns to a fresh local match.
    ///
    /// The room record is left in the store.
    #[instrument(skip(self))]
    pub async fn leave(&mut self) {
        if let Some(listener) = self.detach()
            && let Err(e) = listener.await
        {
            warn!(error = %e, "Room listener ended abnormally");
        }
        self.mode = Mode::Local(LocalMatch::new());
        info!("Left room");
    }

    fn remote_store(&self) -> Result<Arc<dyn RoomStore>, MatchError> {
        self.store.clone().ok_or_else(|| {
            warn!("Room operation without a store");
            MatchError::RemoteUnavailable
        })
    }

    fn attach(
        &mut self,
        store: Arc<dyn RoomStore>,
        code: RoomCode,
        role: Symbol,
        subscription: Subscription,
    ) {
        if let Some(listener) = self.detach() {
            drop(listener);
        }
        self.emit(&[MatchEvent::Reset, MatchEvent::TurnChanged(Symbol::Pp)]);
        let projection = Arc::new(Mutex::new(Projection::new()));
        let (stop, listener) = spawn_listener(
            store.clone(),
            subscription,
            projection.clone(),
            role,
            self.observer.clone(),
        );
        self.mode = Mode::Remote(RemoteSession {
            store,
            code,
            role,
            projection,
            in_flight: AtomicBool::new(false),
            stop: Some(stop),
            listener,
        });
    }

    /// Signals the room listener to stop and hands back its task.
    fn detach(&mut self) -> Option<JoinHandle<()>> {
        let previous = std::mem::replace(&mut self.mode, Mode::Local(LocalMatch::new()));
        match previous {
            Mode::Remote(mut session) => {
                if let Some(stop) = session.stop.take() {
                    let _ = stop.send(());
                }
                debug!(room = %session.code, "Detached from room");
                Some(session.listener)
            }
            Mode::Local(game) => {
                self.mode = Mode::Local(game);
                None
            }
        }
    }

    fn emit(&self, events: &[MatchEvent]) {
        for event in events {
            event.dispatch(self.observer.as_ref());
        }
    }
}

fn spawn_listener(
    store: Arc<dyn RoomStore>,
    subscription: Subscription,
    projection: SharedProjection,
    role: Symbol,
    observer: Arc<dyn MatchObserver>,
) -> (oneshot::Sender<()>, JoinHandle<()>) {
    let (stop_tx, stop_rx) = oneshot::channel();
    let listener = tokio::spawn(remote::listen(
        store,
        subscription,
        projection,
        role,
        observer,
        stop_rx,
    ));
    (stop_tx, listener)
}
