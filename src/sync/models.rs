//! Wire records and partial patches exchanged with the sync backend.
//!
//! Field naming is canonical snake_case on the wire.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::state::board::FinalBoard;
use crate::state::room::{PlayerId, RoomCode, RoomStatus};

/// Authoritative shared state of a room as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Shareable room code, the record's identity.
    pub id: RoomCode,
    /// Lifecycle phase.
    pub status: RoomStatus,
    /// Append-only shared pick sequence.
    #[serde(default)]
    pub numbers_picked: Vec<u8>,
    /// Player allowed to pick next; `None` outside of play.
    #[serde(default)]
    pub current_player_turn_id: Option<PlayerId>,
    /// Winner identity, set at most once.
    #[serde(default)]
    pub winner_id: Option<PlayerId>,
}

impl RoomRecord {
    /// Fresh lobby record for a newly created room.
    pub fn new(id: RoomCode) -> Self {
        Self {
            id,
            status: RoomStatus::Lobby,
            numbers_picked: Vec::new(),
            current_player_turn_id: None,
            winner_id: None,
        }
    }
}

/// One participant's stored state, one record per (room, player).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Opaque player identity.
    pub id: PlayerId,
    /// Room this participation belongs to.
    pub room_id: RoomCode,
    /// Display name.
    pub name: String,
    /// Whether the board has been finalized.
    #[serde(default)]
    pub is_ready: bool,
    /// Finalized board layout, present once ready.
    #[serde(default)]
    pub board: Option<FinalBoard>,
    /// Join timestamp; the sole ordering key for turn sequencing.
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

/// Partial update of a room record; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPatch {
    /// New lifecycle phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RoomStatus>,
    /// Replacement pick sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numbers_picked: Option<Vec<u8>>,
    /// New turn holder. The outer option marks presence of the field,
    /// the inner one allows clearing the turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player_turn_id: Option<Option<PlayerId>>,
    /// Winner declaration. First write wins at the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<PlayerId>,
}

impl RoomPatch {
    /// Patch flipping a room into active play with its first turn holder.
    pub fn start(starter: PlayerId) -> Self {
        Self {
            status: Some(RoomStatus::Playing),
            current_player_turn_id: Some(Some(starter)),
            ..Self::default()
        }
    }

    /// Patch appending a pick and handing the turn over, as one atomic write.
    pub fn pick(numbers_picked: Vec<u8>, next_turn: PlayerId) -> Self {
        Self {
            numbers_picked: Some(numbers_picked),
            current_player_turn_id: Some(Some(next_turn)),
            ..Self::default()
        }
    }

    /// Patch declaring the winner and finishing the room.
    pub fn win(winner: PlayerId) -> Self {
        Self {
            status: Some(RoomStatus::Finished),
            winner_id: Some(winner),
            ..Self::default()
        }
    }
}

/// Partial update of a player record; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPatch {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Readiness flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_ready: Option<bool>,
    /// Finalized board layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<FinalBoard>,
}

impl PlayerPatch {
    /// Patch publishing a finalized board together with the ready flag.
    pub fn ready(board: FinalBoard) -> Self {
        Self {
            is_ready: Some(true),
            board: Some(board),
            ..Self::default()
        }
    }
}
