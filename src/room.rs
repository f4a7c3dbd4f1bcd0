//! Room identity and the shared room record.

use chrono::{DateTime, Utc};
use pink_sesame_rules::{Board, Outcome, Symbol};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::instrument;

/// Length of every room code.
pub const ROOM_CODE_LEN: usize = 6;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const PLAYER_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Short code naming a shared room, e.g. `K3Q9ZB`.
///
/// Always exactly six ASCII letters or digits, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, derive_more::Display)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalizes user input into a room code.
    ///
    /// Surrounding whitespace is trimmed and letters are uppercased. Returns
    /// `None` unless the result is exactly six ASCII alphanumerics.
    #[instrument]
    pub fn parse(input: &str) -> Option<Self> {
        let code = input.trim().to_ascii_uppercase();
        if code.len() == ROOM_CODE_LEN && code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Some(Self(code))
        } else {
            None
        }
    }

    /// Generates a random code. Uniqueness is not checked.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for RoomCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RoomCode::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid room code {:?}", raw)))
    }
}

/// Opaque identity of one client, such as `player_k2j9x0a1b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Generates a fresh random identity.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..9)
            .map(|_| PLAYER_ID_ALPHABET[rng.gen_range(0..PLAYER_ID_ALPHABET.len())] as char)
            .collect();
        Self(format!("player_{}", suffix))
    }

    /// Wraps an existing identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The shared record behind a room.
///
/// This is the single source of truth for a remote match; each client only
/// holds a projection of it. Field names on the wire follow the browser
/// client's layout (`player1`, `currentPlayer`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Client that created the room (plays PP).
    #[serde(rename = "player1")]
    pub host: PlayerId,
    /// Client that joined the room (plays SMS), if any.
    #[serde(rename = "player2", default)]
    pub guest: Option<PlayerId>,
    /// Current board.
    pub board: Board,
    /// Symbol entitled to move.
    #[serde(rename = "currentPlayer")]
    pub turn: Symbol,
    /// False once the match has ended.
    #[serde(rename = "gameActive")]
    pub active: bool,
    /// Outcome once the match has ended.
    #[serde(rename = "gameResult", default)]
    pub result: Option<Outcome>,
    /// When the room was created.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Write counter stamped by the store; clients never set it.
    #[serde(default)]
    pub version: u64,
}

impl RoomRecord {
    /// A fresh room hosted by `host`: empty board, PP to move, no guest.
    #[instrument]
    pub fn new(host: PlayerId) -> Self {
        Self {
            host,
            guest: None,
            board: Board::new(),
            turn: Symbol::Pp,
            active: true,
            result: None,
            created_at: Utc::now(),
            version: 0,
        }
    }

    /// True once the guest slot is taken.
    pub fn is_full(&self) -> bool {
        self.guest.is_some()
    }
}

/// A partial write to a [`RoomRecord`]; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPatch {
    /// New guest identity.
    #[serde(rename = "player2", default, skip_serializing_if = "Option::is_none")]
    pub guest: Option<PlayerId>,
    /// New board.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<Board>,
    /// New symbol to move.
    #[serde(rename = "currentPlayer", default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<Symbol>,
    /// New active flag.
    #[serde(rename = "gameActive", default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// New result; `Some(None)` clears it.
    #[serde(
        rename = "gameResult",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_field"
    )]
    pub result: Option<Option<Outcome>>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field.
fn present_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl RoomPatch {
    /// Claims the guest slot.
    pub fn join(guest: PlayerId) -> Self {
        Self {
            guest: Some(guest),
            ..Self::default()
        }
    }

    /// Writes the state following a move.
    pub fn after_move(board: Board, next_turn: Symbol, result: Option<Outcome>) -> Self {
        Self {
            guest: None,
            board: Some(board),
            turn: Some(next_turn),
            active: Some(result.is_none()),
            result: Some(result),
        }
    }

    /// Restores the match fields to their starting values, keeping players.
    pub fn restart() -> Self {
        Self::after_move(Board::new(), Symbol::Pp, None)
    }

    /// Merges the present fields into `record`.
    pub fn apply_to(&self, record: &mut RoomRecord) {
        if let Some(guest) = &self.guest {
            record.guest = Some(guest.clone());
        }
        if let Some(board) = self.board {
            record.board = board;
        }
        if let Some(turn) = self.turn {
            record.turn = turn;
        }
        if let Some(active) = self.active {
            record.active = active;
        }
        if let Some(result) = self.result {
            record.result = result;
        }
    }
}
