//! Shared helpers for integration tests.

#![allow(dead_code)]

use pink_sesame::rules::{Outcome, Symbol};
use pink_sesame::{MatchEvent, MatchObserver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Observer that records every event it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<MatchEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<MatchEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn endings(&self) -> Vec<MatchEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, MatchEvent::MatchEnded { .. }))
            .collect()
    }

    fn push(&self, event: MatchEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl MatchObserver for RecordingObserver {
    fn on_cell_changed(&self, index: usize, symbol: Symbol) {
        self.push(MatchEvent::CellChanged { index, symbol });
    }

    fn on_turn_changed(&self, symbol: Symbol) {
        self.push(MatchEvent::TurnChanged(symbol));
    }

    fn on_match_ended(&self, outcome: Outcome, line: Option<[usize; 3]>) {
        self.push(MatchEvent::MatchEnded { outcome, line });
    }

    fn on_reset(&self) {
        self.push(MatchEvent::Reset);
    }

    fn on_opponent_joined(&self) {
        self.push(MatchEvent::OpponentJoined);
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn settle(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
