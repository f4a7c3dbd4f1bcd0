//! Tests for room-based matches over an in-memory store.

mod common;

use async_trait::async_trait;
use common::{RecordingObserver, settle};
use pink_sesame::rules::{Outcome, Symbol};
use pink_sesame::{
    MatchCoordinator, MatchError, MatchEvent, MatchStatus, MemoryStore, ModeKind, MoveOutcome,
    RejectReason, RoomCode, RoomPatch, RoomRecord, RoomStore, StoreError, StoreErrorKind,
    Subscription, submit_move,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Barrier, mpsc};

/// Memory store wrapper that counts reads and can slow down, fail, or hand
/// out dead feeds.
#[derive(Debug, Default)]
struct TestStore {
    inner: MemoryStore,
    reads: AtomicUsize,
    failing: AtomicBool,
    dead_feeds: AtomicBool,
    yield_on_read: AtomicBool,
    read_barrier: Option<Arc<Barrier>>,
}

impl TestStore {
    fn with_barrier(parties: usize) -> Self {
        Self {
            read_barrier: Some(Arc::new(Barrier::new(parties))),
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::new(StoreErrorKind::Unreachable(
                "connection refused".to_string(),
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RoomStore for TestStore {
    async fn create(&self, code: &RoomCode, record: RoomRecord) -> Result<(), StoreError> {
        self.check()?;
        self.inner.create(code, record).await
    }

    async fn read(&self, code: &RoomCode) -> Result<Option<RoomRecord>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let record = self.inner.read(code).await?;
        if self.yield_on_read.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        if let Some(barrier) = &self.read_barrier {
            barrier.wait().await;
        }
        Ok(record)
    }

    async fn update(&self, code: &RoomCode, patch: RoomPatch) -> Result<(), StoreError> {
        self.check()?;
        self.inner.update(code, patch).await
    }

    async fn subscribe(&self, code: &RoomCode) -> Result<Subscription, StoreError> {
        self.check()?;
        if self.dead_feeds.load(Ordering::SeqCst) {
            let (tx, rx) = mpsc::unbounded_channel();
            drop(tx);
            return Ok(Subscription::new(code.clone(), rx));
        }
        self.inner.subscribe(code).await
    }
}

fn shared(store: &Arc<TestStore>) -> Option<Arc<dyn RoomStore>> {
    let store: Arc<dyn RoomStore> = store.clone();
    Some(store)
}

struct Room {
    store: Arc<TestStore>,
    code: RoomCode,
    host: MatchCoordinator,
    host_events: Arc<RecordingObserver>,
    guest: MatchCoordinator,
    guest_events: Arc<RecordingObserver>,
}

async fn open_room(store: Arc<TestStore>) -> Room {
    let host_events = RecordingObserver::new();
    let guest_events = RecordingObserver::new();
    let mut host = MatchCoordinator::new(shared(&store), host_events.clone());
    let mut guest = MatchCoordinator::new(shared(&store), guest_events.clone());

    let code = host.create_room().await.unwrap();
    guest.join_room(code.as_str()).await.unwrap();
    settle(|| *host.view().opponent_joined()).await;

    Room {
        store,
        code,
        host,
        host_events,
        guest,
        guest_events,
    }
}

impl Room {
    /// Plays `index` for whoever holds the turn and waits until both
    /// clients have seen the write.
    async fn play(&self, index: usize) {
        let (mover, other) = if self.host.is_my_turn() {
            (&self.host, &self.guest)
        } else {
            (&self.guest, &self.host)
        };
        assert_eq!(mover.attempt_move(index).await.unwrap(), MoveOutcome::Accepted);
        settle(|| {
            [mover, other]
                .iter()
                .all(|c| c.view().board().cells()[index].symbol().is_some())
        })
        .await;
    }
}

#[tokio::test]
async fn test_scenario_c_create_and_join() {
    let store = Arc::new(TestStore::default());
    let host_events = RecordingObserver::new();
    let mut host = MatchCoordinator::new(shared(&store), host_events.clone());

    let code = host.create_room().await.unwrap();
    let record = store.inner.read(&code).await.unwrap().expect("room exists");
    assert!(record.board.is_blank());
    assert_eq!(record.turn, Symbol::Pp);
    assert!(record.active);
    assert_eq!(record.guest, None);
    assert_eq!(&record.host, host.player_id());
    assert_eq!(*host.view().role(), Some(Symbol::Pp));

    let mut guest = MatchCoordinator::new(shared(&store), RecordingObserver::new());
    let joined = guest
        .join_room(&code.as_str().to_lowercase())
        .await
        .unwrap();
    assert_eq!(joined, code);

    let record = store.inner.read(&code).await.unwrap().unwrap();
    assert_eq!(record.guest.as_ref(), Some(guest.player_id()));

    settle(|| *host.view().opponent_joined()).await;
    assert!(host_events.events().contains(&MatchEvent::OpponentJoined));
    assert!(host.is_my_turn());
    assert!(!guest.is_my_turn());
    assert_eq!(*guest.view().role(), Some(Symbol::Sms));
    assert_eq!(*guest.view().mode(), ModeKind::Remote);
}

#[tokio::test]
async fn test_moves_propagate_to_both_clients() {
    let room = open_room(Arc::new(TestStore::default())).await;
    room.play(4).await;

    assert!(room.guest.is_my_turn());
    assert!(!room.host.is_my_turn());
    assert_eq!(*room.guest.view().turn(), Symbol::Sms);
    assert!(
        room.guest_events
            .events()
            .contains(&MatchEvent::CellChanged { index: 4, symbol: Symbol::Pp })
    );
}

#[tokio::test]
async fn test_occupied_cell_rejected_by_authoritative_read() {
    let room = open_room(Arc::new(TestStore::default())).await;
    room.play(4).await;

    assert_eq!(
        room.guest.attempt_move(4).await.unwrap(),
        MoveOutcome::Rejected(RejectReason::Occupied)
    );
    assert!(room.guest.is_my_turn());
}

#[tokio::test]
async fn test_not_your_turn_rejected_without_store_access() {
    let room = open_room(Arc::new(TestStore::default())).await;
    let reads = room.store.reads.load(Ordering::SeqCst);

    assert_eq!(
        room.guest.attempt_move(0).await.unwrap(),
        MoveOutcome::Rejected(RejectReason::NotYourTurn)
    );
    assert_eq!(
        room.host.attempt_move(9).await.unwrap(),
        MoveOutcome::Rejected(RejectReason::OutOfRange)
    );
    assert_eq!(room.store.reads.load(Ordering::SeqCst), reads);
}

#[tokio::test]
async fn test_scenario_d_turn_gate_lets_only_holder_through() {
    let room = open_room(Arc::new(TestStore::default())).await;

    let (host_move, guest_move) =
        tokio::join!(room.host.attempt_move(0), room.guest.attempt_move(0));
    assert_eq!(host_move.unwrap(), MoveOutcome::Accepted);
    assert_eq!(
        guest_move.unwrap(),
        MoveOutcome::Rejected(RejectReason::NotYourTurn)
    );
}

#[tokio::test]
async fn test_scenario_d_stale_reads_are_not_exclusive() {
    let store = TestStore::with_barrier(2);
    let code = RoomCode::parse("RACE01").unwrap();
    store
        .inner
        .create(&code, RoomRecord::new(pink_sesame::PlayerId::new("host")))
        .await
        .unwrap();

    // Both submissions read the empty cell and PP's turn before either
    // writes, so both pass the authoritative checks.
    let (first, second) = tokio::join!(
        submit_move(&store, &code, Symbol::Pp, 0),
        submit_move(&store, &code, Symbol::Pp, 0),
    );
    assert_eq!(first.unwrap(), MoveOutcome::Accepted);
    assert_eq!(second.unwrap(), MoveOutcome::Accepted);

    let record = store.inner.read(&code).await.unwrap().unwrap();
    assert_eq!(record.board.get(0).and_then(|c| c.symbol()), Some(Symbol::Pp));
    assert_eq!(record.turn, Symbol::Sms);
    assert_eq!(record.version, 3);
}

#[tokio::test]
async fn test_submit_move_checks_stored_turn() {
    let store = TestStore::default();
    let code = RoomCode::parse("TURN01").unwrap();
    store
        .inner
        .create(&code, RoomRecord::new(pink_sesame::PlayerId::new("host")))
        .await
        .unwrap();

    assert_eq!(
        submit_move(&store, &code, Symbol::Sms, 4).await.unwrap(),
        MoveOutcome::Rejected(RejectReason::NotYourTurn)
    );
    assert_eq!(
        submit_move(&store, &code, Symbol::Pp, 4).await.unwrap(),
        MoveOutcome::Accepted
    );
    assert_eq!(
        submit_move(&store, &code, Symbol::Pp, 0).await.unwrap(),
        MoveOutcome::Rejected(RejectReason::NotYourTurn)
    );

    let record = store.inner.read(&code).await.unwrap().unwrap();
    assert!(record.board.get(0).is_some_and(|c| c.symbol().is_none()));
    assert_eq!(record.version, 2);
}

#[tokio::test]
async fn test_back_to_back_moves_by_same_client() {
    let room = open_room(Arc::new(TestStore::default())).await;

    assert_eq!(room.host.attempt_move(0).await.unwrap(), MoveOutcome::Accepted);
    assert!(!room.host.is_my_turn());
    assert_eq!(*room.host.view().turn(), Symbol::Sms);
    assert_eq!(
        room.host.attempt_move(1).await.unwrap(),
        MoveOutcome::Rejected(RejectReason::NotYourTurn)
    );
    assert_eq!(
        room.host.attempt_move(2).await.unwrap(),
        MoveOutcome::Rejected(RejectReason::NotYourTurn)
    );

    let record = room.store.inner.read(&room.code).await.unwrap().unwrap();
    let marked: Vec<usize> = (0..9)
        .filter(|&i| record.board.get(i).and_then(|c| c.symbol()).is_some())
        .collect();
    assert_eq!(marked, vec![0]);
    assert_eq!(record.turn, Symbol::Sms);

    // The echo of the write changes nothing and raises no duplicate events.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let placed = room
        .host_events
        .events()
        .into_iter()
        .filter(|e| *e == MatchEvent::CellChanged { index: 0, symbol: Symbol::Pp })
        .count();
    assert_eq!(placed, 1);
    assert!(!room.host.is_my_turn());
}

#[tokio::test]
async fn test_second_move_rejected_while_first_in_flight() {
    let room = open_room(Arc::new(TestStore::default())).await;
    room.store.yield_on_read.store(true, Ordering::SeqCst);

    let (first, second) = tokio::join!(room.host.attempt_move(0), room.host.attempt_move(1));
    assert_eq!(first.unwrap(), MoveOutcome::Accepted);
    assert_eq!(
        second.unwrap(),
        MoveOutcome::Rejected(RejectReason::MoveInFlight)
    );
}

#[tokio::test]
async fn test_win_reported_once_on_both_clients() {
    let room = open_room(Arc::new(TestStore::default())).await;
    for index in [0, 4, 1, 5, 2] {
        room.play(index).await;
    }

    let expected = MatchEvent::MatchEnded {
        outcome: Outcome::Winner(Symbol::Pp),
        line: Some([0, 1, 2]),
    };
    settle(|| room.host_events.endings().len() == 1 && room.guest_events.endings().len() == 1)
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(room.host_events.endings(), vec![expected]);
    assert_eq!(room.guest_events.endings(), vec![expected]);

    assert_eq!(*room.guest.view().status(), MatchStatus::Won(Symbol::Pp));
    assert_eq!(*room.guest.view().winning_line(), Some([0, 1, 2]));
    assert!(!room.host.is_my_turn());
    assert!(!room.guest.is_my_turn());
    assert_eq!(
        room.guest.attempt_move(8).await.unwrap(),
        MoveOutcome::Rejected(RejectReason::MatchOver)
    );
}

#[tokio::test]
async fn test_win_then_immediate_restart_still_reports_end() {
    let mut room = open_room(Arc::new(TestStore::default())).await;
    for index in [0, 4, 1, 5] {
        room.play(index).await;
    }

    assert_eq!(room.host.attempt_move(2).await.unwrap(), MoveOutcome::Accepted);
    room.host.new_game().await.unwrap();

    settle(|| room.guest.view().board().is_blank() && *room.guest.view().active()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        room.guest_events.endings(),
        vec![MatchEvent::MatchEnded {
            outcome: Outcome::Winner(Symbol::Pp),
            line: Some([0, 1, 2]),
        }]
    );
    assert_eq!(room.host_events.endings().len(), 1);
    let events = room.guest_events.events();
    let ended = events
        .iter()
        .position(|e| matches!(e, MatchEvent::MatchEnded { .. }));
    let reset = events.iter().rposition(|e| *e == MatchEvent::Reset);
    assert!(ended < reset);
}

#[tokio::test]
async fn test_tie_reported() {
    let room = open_room(Arc::new(TestStore::default())).await;
    for index in [0, 1, 2, 4, 7, 6, 3, 5, 8] {
        room.play(index).await;
    }
    settle(|| room.guest_events.endings().len() == 1).await;
    assert_eq!(
        room.guest_events.endings(),
        vec![MatchEvent::MatchEnded {
            outcome: Outcome::Tie,
            line: None,
        }]
    );
    assert_eq!(*room.host.view().status(), MatchStatus::Tied);
}

#[tokio::test]
async fn test_new_game_restarts_room_for_both() {
    let mut room = open_room(Arc::new(TestStore::default())).await;
    for index in [0, 4, 1, 5, 2] {
        room.play(index).await;
    }
    settle(|| room.guest_events.endings().len() == 1).await;

    room.host_events.clear();
    room.guest.new_game().await.unwrap();
    settle(|| room.host.view().board().is_blank() && *room.host.view().active()).await;
    settle(|| room.guest.view().board().is_blank() && *room.guest.view().active()).await;

    assert!(room.host.is_my_turn());
    assert!(!room.guest.is_my_turn());
    assert!(room.host_events.events().contains(&MatchEvent::Reset));

    let record = room.store.inner.read(&room.code).await.unwrap().unwrap();
    assert!(record.guest.is_some());
    assert_eq!(record.result, None);

    // A second match ends and is reported again.
    for index in [0, 4, 1, 5, 2] {
        room.play(index).await;
    }
    settle(|| room.host_events.endings().len() == 2).await;
    room.host.leave().await;
}

#[tokio::test]
async fn test_join_rejects_malformed_codes_before_store_access() {
    let store = Arc::new(TestStore::default());
    let mut guest = MatchCoordinator::new(shared(&store), RecordingObserver::new());

    for input in ["", "ABC12", "ABC1234", "AB 12C", "ab-12c"] {
        let err = guest.join_room(input).await.unwrap_err();
        assert!(
            matches!(err, MatchError::InvalidRoomCode(_)),
            "{:?} gave {:?}",
            input,
            err
        );
    }
    assert_eq!(store.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_join_unknown_room() {
    let store = Arc::new(TestStore::default());
    let mut guest = MatchCoordinator::new(shared(&store), RecordingObserver::new());
    let err = guest.join_room("ZZZ999").await.unwrap_err();
    assert!(matches!(err, MatchError::RoomNotFound(code) if code.as_str() == "ZZZ999"));
    assert_eq!(*guest.view().mode(), ModeKind::Local);
}

#[tokio::test]
async fn test_join_full_room() {
    let room = open_room(Arc::new(TestStore::default())).await;
    let mut third = MatchCoordinator::new(shared(&room.store), RecordingObserver::new());

    let err = third.join_room(room.code.as_str()).await.unwrap_err();
    assert!(matches!(err, MatchError::RoomFull(_)));

    let record = room.store.inner.read(&room.code).await.unwrap().unwrap();
    assert_eq!(record.guest.as_ref(), Some(room.guest.player_id()));
}

#[tokio::test]
async fn test_transport_failure_is_reported_and_retryable() {
    let room = open_room(Arc::new(TestStore::default())).await;
    room.store.failing.store(true, Ordering::SeqCst);

    let err = room.host.attempt_move(0).await.unwrap_err();
    assert!(matches!(
        err,
        MatchError::Transport(StoreError {
            kind: StoreErrorKind::Unreachable(_),
            ..
        })
    ));
    assert!(room.host.view().board().is_blank());
    assert!(room.host.is_my_turn());

    room.store.failing.store(false, Ordering::SeqCst);
    assert_eq!(room.host.attempt_move(0).await.unwrap(), MoveOutcome::Accepted);
}

#[tokio::test]
async fn test_create_room_transport_failure() {
    let store = Arc::new(TestStore::default());
    store.failing.store(true, Ordering::SeqCst);
    let mut host = MatchCoordinator::new(shared(&store), RecordingObserver::new());

    assert!(matches!(
        host.create_room().await,
        Err(MatchError::Transport(_))
    ));
    assert_eq!(*host.view().mode(), ModeKind::Local);
}

#[tokio::test]
async fn test_closed_feed_freezes_moves_until_reconnect() {
    let store = Arc::new(TestStore::default());
    store.dead_feeds.store(true, Ordering::SeqCst);
    let mut host = MatchCoordinator::new(shared(&store), RecordingObserver::new());
    host.create_room().await.unwrap();

    // Let the listener observe the closed feed.
    tokio::time::sleep(Duration::from_millis(50)).await;
    match host.attempt_move(0).await {
        Err(MatchError::Transport(e)) => assert_eq!(e.kind, StoreErrorKind::SubscriptionClosed),
        other => panic!("expected a closed feed, got {:?}", other),
    }

    store.dead_feeds.store(false, Ordering::SeqCst);
    host.reconnect().await.unwrap();
    assert_eq!(host.attempt_move(0).await.unwrap(), MoveOutcome::Accepted);
}

#[tokio::test]
async fn test_leave_keeps_record_and_stops_updates() {
    let mut room = open_room(Arc::new(TestStore::default())).await;
    room.guest.leave().await;

    assert_eq!(*room.guest.view().mode(), ModeKind::Local);
    assert!(room.store.inner.read(&room.code).await.unwrap().is_some());

    room.guest_events.clear();
    assert_eq!(room.host.attempt_move(4).await.unwrap(), MoveOutcome::Accepted);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(room.guest_events.events().is_empty());
    assert!(room.guest.view().board().is_blank());
}

#[tokio::test]
async fn test_local_moves_disabled_in_room() {
    let mut room = open_room(Arc::new(TestStore::default())).await;
    assert_eq!(
        room.host.apply_move(0),
        MoveOutcome::Rejected(RejectReason::WrongMode)
    );
    room.host.start_local();
    assert_eq!(*room.host.view().mode(), ModeKind::Local);
    assert_eq!(room.host.apply_move(0), MoveOutcome::Accepted);
}
