//! HTTP room service backed by a [`MemoryStore`].
//!
//! | Method | Path | Effect |
//! |--------|------|--------|
//! | `GET` | `/health` | liveness probe |
//! | `GET` | `/rooms` | codes of every room holding a record |
//! | `PUT` | `/rooms/{code}` | create (overwrite) a room |
//! | `GET` | `/rooms/{code}` | read a room, `404` when absent |
//! | `PATCH` | `/rooms/{code}` | merge fields, `404` when absent |
//! | `GET` | `/rooms/{code}/changes?after=N` | writes newer than version `N`, oldest first |

use super::{MemoryStore, RoomStore, StoreError, StoreErrorKind};
use crate::room::{RoomCode, RoomPatch, RoomRecord};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

/// Builds the room service router over `store`.
#[instrument(skip(store))]
pub fn router(store: MemoryStore) -> Router {
    info!("Building room service router");
    Router::new()
        .route("/health", get(health))
        .route("/rooms", get(list_rooms))
        .route("/rooms/{code}/changes", get(room_changes))
        .route(
            "/rooms/{code}",
            get(read_room).put(create_room).patch(update_room),
        )
        .with_state(store)
}

async fn health() -> &'static str {
    "ok"
}

#[instrument(skip(store))]
async fn list_rooms(State(store): State<MemoryStore>) -> Json<Vec<RoomCode>> {
    let codes = store.list_rooms();
    debug!(count = codes.len(), "Listing rooms");
    Json(codes)
}

/// Query of `/rooms/{code}/changes`.
#[derive(Debug, Deserialize)]
struct ChangesQuery {
    #[serde(default)]
    after: u64,
}

#[instrument(skip(store))]
async fn room_changes(
    State(store): State<MemoryStore>,
    Path(code): Path<String>,
    Query(query): Query<ChangesQuery>,
) -> Response {
    let code = match parse_code(&code) {
        Ok(code) => code,
        Err(response) => return response,
    };
    match store.changes_since(&code, query.after) {
        Some(records) => Json(records).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn parse_code(raw: &str) -> Result<RoomCode, Response> {
    RoomCode::parse(raw).ok_or_else(|| {
        warn!(code = %raw, "Rejected malformed room code");
        (StatusCode::BAD_REQUEST, "room codes are 6 letters or digits").into_response()
    })
}

fn store_failure(err: StoreError) -> Response {
    match err.kind {
        StoreErrorKind::MissingRoom(_) => StatusCode::NOT_FOUND.into_response(),
        _ => {
            warn!(error = %err, "Room store failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

#[instrument(skip(store))]
async fn read_room(State(store): State<MemoryStore>, Path(code): Path<String>) -> Response {
    let code = match parse_code(&code) {
        Ok(code) => code,
        Err(response) => return response,
    };
    match store.read(&code).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => store_failure(e),
    }
}

#[instrument(skip(store, record))]
async fn create_room(
    State(store): State<MemoryStore>,
    Path(code): Path<String>,
    Json(record): Json<RoomRecord>,
) -> Response {
    let code = match parse_code(&code) {
        Ok(code) => code,
        Err(response) => return response,
    };
    match store.create(&code, record).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_failure(e),
    }
}

#[instrument(skip(store, patch))]
async fn update_room(
    State(store): State<MemoryStore>,
    Path(code): Path<String>,
    Json(patch): Json<RoomPatch>,
) -> Response {
    let code = match parse_code(&code) {
        Ok(code) => code,
        Err(response) => return response,
    };
    match store.update(&code, patch).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_failure(e),
    }
}
