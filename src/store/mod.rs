//! Remote room stores.
//!
//! A room store is the externally owned key-value service that holds every
//! [`RoomRecord`](crate::RoomRecord). The coordinator only ever talks to it
//! through [`RoomStore`], so the synchronization protocol does not care
//! which backend sits behind it.

mod error;
mod http;
mod memory;
mod service;
mod subscription;

pub use error::{StoreError, StoreErrorKind};
pub use http::HttpStore;
pub use memory::MemoryStore;
pub use service::router;
pub use subscription::Subscription;

use crate::room::{RoomCode, RoomPatch, RoomRecord};
use async_trait::async_trait;

/// Minimal contract of a real-time keyed store.
#[async_trait]
pub trait RoomStore: Send + Sync + std::fmt::Debug {
    /// Writes `record` at `code`, replacing whatever was there.
    async fn create(&self, code: &RoomCode, record: RoomRecord) -> Result<(), StoreError>;

    /// Point-in-time fetch.
    async fn read(&self, code: &RoomCode) -> Result<Option<RoomRecord>, StoreError>;

    /// Merges the present fields of `patch` into the record at `code`.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreErrorKind::MissingRoom`] when no record exists.
    async fn update(&self, code: &RoomCode, patch: RoomPatch) -> Result<(), StoreError>;

    /// Opens a change feed for `code`.
    ///
    /// The feed yields the current record (when there is one), then one
    /// record per later write, in write order.
    async fn subscribe(&self, code: &RoomCode) -> Result<Subscription, StoreError>;

    /// Closes a change feed.
    async fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }
}
