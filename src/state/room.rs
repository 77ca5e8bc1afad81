//! Domain model for rooms and their participants.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::board::FinalBoard;
use crate::sync::models::{PlayerRecord, RoomRecord};

/// Identity of a participant, generated once per local client.
pub type PlayerId = Uuid;

/// Alphabet used for generated room codes.
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Short shareable identifier of a game session.
///
/// Codes are 5 uppercase alphanumeric characters; parsing is
/// case-insensitive and normalizes to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

/// Error returned when a string is not a valid room code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomCodeError {
    /// The code does not have exactly [`RoomCode::LENGTH`] characters.
    #[error("room code must be exactly {expected} characters (got {got})")]
    Length {
        /// Required length.
        expected: usize,
        /// Length of the rejected input.
        got: usize,
    },
    /// The code contains a character outside `A-Z0-9`.
    #[error("room code must contain only letters and digits")]
    Charset,
}

impl RoomCode {
    /// Fixed length of every room code.
    pub const LENGTH: usize = 5;

    /// Generate a fresh random code.
    ///
    /// Enough entropy for casual session joining; duplicate insertion is
    /// still checked at the adapter.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..Self::LENGTH)
            .map(|_| {
                let index = rng.random_range(0..CODE_CHARSET.len());
                char::from(CODE_CHARSET[index])
            })
            .collect();
        Self(code)
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.chars().count() != Self::LENGTH {
            return Err(RoomCodeError::Length {
                expected: Self::LENGTH,
                got: trimmed.chars().count(),
            });
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RoomCodeError::Charset);
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle phase of a room.
///
/// `Lobby` and `Setup` are equivalent pre-game states: a room starts in
/// `Lobby` and may be re-labeled `Setup` by convention, both accept
/// board-building and ready actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    /// Waiting for players to join and build boards.
    Lobby,
    /// Same as [`RoomStatus::Lobby`]; kept as a distinct label only.
    Setup,
    /// Turn-based play is in progress.
    Playing,
    /// A winner has been declared; terminal.
    Finished,
}

impl RoomStatus {
    /// Whether this is a pre-game state accepting setup and ready actions.
    pub fn is_pregame(self) -> bool {
        matches!(self, Self::Lobby | Self::Setup)
    }

    /// Whether the room has reached its terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Monotonic ordering rank; `Lobby` and `Setup` share a rank so the
    /// redundant relabeling is not treated as a backward transition.
    fn rank(self) -> u8 {
        match self {
            Self::Lobby | Self::Setup => 0,
            Self::Playing => 1,
            Self::Finished => 2,
        }
    }
}

/// One game session's shared, authoritative fields.
///
/// All mutation goes through the crate-internal guarded methods so the
/// invariants (append-only picks, write-once winner, monotonic status)
/// are enforced in a single place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    code: RoomCode,
    status: RoomStatus,
    numbers_picked: Vec<u8>,
    current_turn: Option<PlayerId>,
    winner: Option<PlayerId>,
}

impl Room {
    /// Fresh room in the lobby with no picks and no winner.
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            status: RoomStatus::Lobby,
            numbers_picked: Vec::new(),
            current_turn: None,
            winner: None,
        }
    }

    /// Shareable session code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Current lifecycle phase.
    pub fn status(&self) -> RoomStatus {
        self.status
    }

    /// Globally shared picked numbers, in pick order.
    pub fn numbers_picked(&self) -> &[u8] {
        &self.numbers_picked
    }

    /// Whether `value` has already been picked this round.
    pub fn is_picked(&self, value: u8) -> bool {
        self.numbers_picked.contains(&value)
    }

    /// Player currently allowed to pick, `None` outside of play.
    pub fn current_turn(&self) -> Option<PlayerId> {
        self.current_turn
    }

    /// Declared winner, if any.
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// Advance the status, refusing backward transitions.
    ///
    /// Returns whether the new status was applied.
    pub(crate) fn advance_status(&mut self, next: RoomStatus) -> bool {
        if next.rank() < self.status.rank() {
            return false;
        }
        self.status = next;
        if !matches!(self.status, RoomStatus::Playing) {
            self.current_turn = None;
        }
        true
    }

    /// Replace the pick sequence with a newer authoritative one.
    ///
    /// A shorter sequence can only come from a stale read and is ignored,
    /// keeping the local sequence append-only.
    pub(crate) fn adopt_picks(&mut self, numbers: Vec<u8>) -> bool {
        if numbers.len() < self.numbers_picked.len() {
            return false;
        }
        self.numbers_picked = numbers;
        true
    }

    /// Hand the turn to a player (or clear it).
    pub(crate) fn set_current_turn(&mut self, turn: Option<PlayerId>) {
        self.current_turn = turn;
    }

    /// Record the winner; write-once, forces the terminal status.
    pub(crate) fn set_winner(&mut self, winner: PlayerId) -> bool {
        if self.winner.is_some() {
            return false;
        }
        self.winner = Some(winner);
        self.advance_status(RoomStatus::Finished);
        true
    }
}

impl From<&Room> for RoomRecord {
    fn from(room: &Room) -> Self {
        Self {
            id: room.code.clone(),
            status: room.status,
            numbers_picked: room.numbers_picked.clone(),
            current_player_turn_id: room.current_turn,
            winner_id: room.winner,
        }
    }
}

/// One participant's identity, readiness, and board within a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Opaque identity, stable across reconnects within a session.
    pub id: PlayerId,
    /// Display name, non-empty.
    pub name: String,
    /// Set once the player finalized their board; never reverts in a round.
    pub is_ready: bool,
    /// Finalized board layout, known once `is_ready` is true.
    pub board: Option<FinalBoard>,
    /// Join timestamp, the sole ordering key for turn sequencing.
    pub joined_at: OffsetDateTime,
}

impl From<PlayerRecord> for Player {
    fn from(record: PlayerRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            is_ready: record.is_ready,
            board: record.board,
            joined_at: record.joined_at,
        }
    }
}
