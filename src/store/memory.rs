//! In-process room store.

use super::{RoomStore, StoreError, StoreErrorKind, Subscription};
use crate::room::{RoomCode, RoomPatch, RoomRecord};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Number of past writes kept per room for [`MemoryStore::changes_since`].
const HISTORY_LEN: usize = 32;

/// One key: the record, its recent writes and the live subscriber queues.
#[derive(Debug, Default)]
struct Slot {
    record: Option<RoomRecord>,
    history: VecDeque<RoomRecord>,
    subscribers: Vec<mpsc::UnboundedSender<RoomRecord>>,
}

impl Slot {
    /// Makes `record` current and queues it for every live subscriber.
    fn publish(&mut self, record: RoomRecord) {
        self.subscribers.retain(|tx| tx.send(record.clone()).is_ok());
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(record.clone());
        self.record = Some(record);
    }
}

type Slots = HashMap<RoomCode, Slot>;

/// Room store kept in memory.
///
/// Every subscriber gets its own unbounded queue and receives one record per
/// write. Keys that hold no record are dropped once their last subscriber
/// is gone. Clones share the same rooms.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rooms: Arc<Mutex<Slots>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating in-memory room store");
        Self::default()
    }

    /// Lists every room code that currently holds a record.
    #[instrument(skip(self))]
    pub fn list_rooms(&self) -> Vec<RoomCode> {
        let rooms = self.lock();
        let mut codes: Vec<_> = rooms
            .iter()
            .filter(|(_, slot)| slot.record.is_some())
            .map(|(code, _)| code.clone())
            .collect();
        codes.sort();
        debug!(count = codes.len(), "Listed rooms");
        codes
    }

    /// Writes to `code` newer than `after`, oldest first.
    ///
    /// Only the most recent writes are kept (32 per room). Returns `None` when the
    /// room holds no record.
    #[instrument(skip(self), fields(room = %code))]
    pub fn changes_since(&self, code: &RoomCode, after: u64) -> Option<Vec<RoomRecord>> {
        let rooms = self.lock();
        let slot = rooms.get(code).filter(|slot| slot.record.is_some())?;
        let changes: Vec<_> = slot
            .history
            .iter()
            .filter(|record| record.version > after)
            .cloned()
            .collect();
        debug!(after, count = changes.len(), "Collected room changes");
        Some(changes)
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops closed subscriber queues, then keys left with neither a record nor
/// a subscriber.
fn prune(rooms: &mut Slots) {
    rooms.retain(|_, slot| {
        slot.subscribers.retain(|tx| !tx.is_closed());
        slot.record.is_some() || !slot.subscribers.is_empty()
    });
}

#[async_trait]
impl RoomStore for MemoryStore {
    #[instrument(skip(self, record), fields(room = %code))]
    async fn create(&self, code: &RoomCode, mut record: RoomRecord) -> Result<(), StoreError> {
        let mut rooms = self.lock();
        let slot = rooms.entry(code.clone()).or_default();
        let previous = slot.record.as_ref().map(|r| r.version).unwrap_or(0);
        if previous > 0 {
            warn!(room = %code, "Overwriting existing room");
        }
        record.version = previous + 1;
        slot.publish(record);
        info!(room = %code, "Room created");
        Ok(())
    }

    #[instrument(skip(self), fields(room = %code))]
    async fn read(&self, code: &RoomCode) -> Result<Option<RoomRecord>, StoreError> {
        let rooms = self.lock();
        let record = rooms.get(code).and_then(|slot| slot.record.clone());
        debug!(found = record.is_some(), "Read room");
        Ok(record)
    }

    #[instrument(skip(self, patch), fields(room = %code))]
    async fn update(&self, code: &RoomCode, patch: RoomPatch) -> Result<(), StoreError> {
        let mut rooms = self.lock();
        let Some(slot) = rooms.get_mut(code).filter(|slot| slot.record.is_some()) else {
            warn!("Update for unknown room");
            return Err(StoreError::new(StoreErrorKind::MissingRoom(code.clone())));
        };
        let Some(mut record) = slot.record.clone() else {
            return Err(StoreError::new(StoreErrorKind::MissingRoom(code.clone())));
        };

        patch.apply_to(&mut record);
        record.version += 1;
        slot.publish(record);
        debug!(?patch, "Room updated");
        Ok(())
    }

    #[instrument(skip(self), fields(room = %code))]
    async fn subscribe(&self, code: &RoomCode) -> Result<Subscription, StoreError> {
        let mut rooms = self.lock();
        prune(&mut rooms);

        let slot = rooms.entry(code.clone()).or_default();
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(record) = &slot.record {
            // Fresh receiver; cannot be closed yet.
            let _ = tx.send(record.clone());
        }
        slot.subscribers.push(tx);
        debug!(subscribers = slot.subscribers.len(), "Subscribed to room");
        Ok(Subscription::new(code.clone(), rx))
    }

    #[instrument(skip(self, subscription), fields(room = %subscription.code()))]
    async fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
        prune(&mut self.lock());
        debug!("Unsubscribed from room");
    }
}
