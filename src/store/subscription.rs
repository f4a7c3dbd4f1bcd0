//! Change feed for a single room key.

use crate::room::{RoomCode, RoomRecord};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Live view of one room record.
///
/// Yields the full record after every write, in write order, starting with
/// the value current when the subscription was opened. Each subscription
/// owns its queue, so a slow reader never loses a write. Dropping the
/// subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    code: RoomCode,
    rx: mpsc::UnboundedReceiver<RoomRecord>,
    feeder: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wraps a queue fed directly by the store.
    pub fn new(code: RoomCode, rx: mpsc::UnboundedReceiver<RoomRecord>) -> Self {
        Self {
            code,
            rx,
            feeder: None,
        }
    }

    /// Wraps a queue fed by a background task that is stopped when the
    /// subscription is dropped.
    pub fn with_feeder(
        code: RoomCode,
        rx: mpsc::UnboundedReceiver<RoomRecord>,
        feeder: JoinHandle<()>,
    ) -> Self {
        Self {
            code,
            rx,
            feeder: Some(feeder),
        }
    }

    /// Room this subscription follows.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Waits for the next record. Returns `None` once the feed has closed.
    pub async fn recv(&mut self) -> Option<RoomRecord> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
    }
}
