//! Room store reached over HTTP.

use super::{RoomStore, StoreError, StoreErrorKind, Subscription};
use crate::room::{RoomCode, RoomPatch, RoomRecord};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Client for the room service exposed by `pink_sesame serve`.
///
/// Change notifications are produced by polling the service for writes
/// newer than the last one seen and forwarding each of them in order.
#[derive(Debug, Clone)]
pub struct HttpStore {
    base_url: String,
    client: reqwest::Client,
    poll_interval: Duration,
}

impl HttpStore {
    /// Creates a client for the service at `base_url`.
    ///
    /// `timeout` bounds every request so an unreachable service surfaces as
    /// an error instead of a hang.
    #[instrument(skip(base_url), fields(base_url = %base_url))]
    pub fn new(
        base_url: String,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, StoreError> {
        info!("Creating HTTP room store client");
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            poll_interval,
        })
    }

    fn room_url(&self, code: &RoomCode) -> String {
        format!("{}/rooms/{}", self.base_url, code)
    }

    /// Writes to `code` newer than `after`, oldest first. Empty when the
    /// room does not exist.
    #[instrument(skip(self), fields(room = %code))]
    async fn changes(&self, code: &RoomCode, after: u64) -> Result<Vec<RoomRecord>, StoreError> {
        let response = self
            .client
            .get(format!("{}/changes?after={}", self.room_url(code), after))
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => Ok(response.json::<Vec<RoomRecord>>().await?),
            _ => Err(self.reject(&response)),
        }
    }

    #[instrument(skip(self, response))]
    fn reject(&self, response: &reqwest::Response) -> StoreError {
        let status = response.status();
        warn!(%status, url = %response.url(), "Room service rejected request");
        StoreError::new(StoreErrorKind::Rejected(format!("HTTP {}", status)))
    }
}

#[async_trait]
impl RoomStore for HttpStore {
    #[instrument(skip(self, record), fields(room = %code))]
    async fn create(&self, code: &RoomCode, record: RoomRecord) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.room_url(code))
            .json(&record)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.reject(&response));
        }
        debug!("Room created remotely");
        Ok(())
    }

    #[instrument(skip(self), fields(room = %code))]
    async fn read(&self, code: &RoomCode) -> Result<Option<RoomRecord>, StoreError> {
        let response = self.client.get(self.room_url(code)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<RoomRecord>().await?)),
            _ => Err(self.reject(&response)),
        }
    }

    #[instrument(skip(self, patch), fields(room = %code))]
    async fn update(&self, code: &RoomCode, patch: RoomPatch) -> Result<(), StoreError> {
        let response = self
            .client
            .patch(self.room_url(code))
            .json(&patch)
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::new(StoreErrorKind::MissingRoom(code.clone()))),
            status if status.is_success() => Ok(()),
            _ => Err(self.reject(&response)),
        }
    }

    #[instrument(skip(self), fields(room = %code))]
    async fn subscribe(&self, code: &RoomCode) -> Result<Subscription, StoreError> {
        let initial = self.read(code).await?;
        let mut seen = initial.as_ref().map(|r| r.version).unwrap_or(0);
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(record) = initial {
            let _ = tx.send(record);
        }

        let store = self.clone();
        let room = code.clone();
        let feeder = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            'poll: loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                match store.changes(&room, seen).await {
                    Ok(records) => {
                        for record in records {
                            seen = record.version;
                            if tx.send(record).is_err() {
                                break 'poll;
                            }
                        }
                    }
                    Err(e) => warn!(room = %room, error = %e, "Polling room failed, will retry"),
                }
            }
            debug!(room = %room, "Room poller stopped");
        });

        Ok(Subscription::with_feeder(code.clone(), rx, feeder))
    }
}
