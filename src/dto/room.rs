//! Entry-action payloads and read-side projections of room state.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::validation::{validate_player_name, validate_room_code};
use crate::state::board::CELL_COUNT;
use crate::state::room::{PlayerId, RoomCode, RoomStatus};
use crate::state::state_machine::RoomStateMachine;

/// Payload used to create a fresh room.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomRequest {
    /// Display name of the creating player.
    #[validate(custom(function = "validate_player_name"))]
    pub name: String,
}

/// Payload used to join an existing room by its code.
#[derive(Debug, Deserialize, Validate)]
pub struct JoinRoomRequest {
    /// Display name of the joining player.
    #[validate(custom(function = "validate_player_name"))]
    pub name: String,
    /// Code of the room to join, case-insensitive.
    #[validate(custom(function = "validate_room_code"))]
    pub code: String,
}

/// Derived, render-ready view of the room for the local participant.
///
/// Recomputed from the latest authoritative snapshots plus the locally
/// known board; holds no authority of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomView {
    /// Shareable session code.
    pub code: RoomCode,
    /// Lifecycle phase.
    pub status: RoomStatus,
    /// Shared pick sequence, in pick order.
    pub numbers_picked: Vec<u8>,
    /// Player currently allowed to pick.
    pub current_turn: Option<PlayerId>,
    /// Whether the local player may pick this instant.
    pub is_local_turn: bool,
    /// Completed lines on the local board; 5 letters of B-I-N-G-O win.
    pub completed_lines: usize,
    /// Declared winner, if any.
    pub winner: Option<PlayerId>,
    /// All roster members with their visible board projections.
    pub players: Vec<PlayerView>,
}

/// One roster member as visible to the local participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerView {
    /// Participant identity.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Whether the board has been finalized.
    pub is_ready: bool,
    /// Whether this entry is the local participant.
    pub is_local: bool,
    /// Board cells; masked (all `None`) for other players until they are
    /// ready, so unrevealed layouts are never leaked to viewers.
    pub board: Vec<Option<u8>>,
}

impl From<&RoomStateMachine> for RoomView {
    fn from(machine: &RoomStateMachine) -> Self {
        let local_id = machine.local_id();
        let room = machine.room();

        let players = machine
            .roster()
            .values()
            .map(|player| {
                let is_local = player.id == local_id;
                let board = if is_local {
                    machine.local_board().cells().to_vec()
                } else if player.is_ready {
                    player
                        .board
                        .map(|layout| layout.into_iter().map(Some).collect())
                        .unwrap_or_else(masked_board)
                } else {
                    masked_board()
                };

                PlayerView {
                    id: player.id,
                    name: player.name.clone(),
                    is_ready: player.is_ready,
                    is_local,
                    board,
                }
            })
            .collect();

        Self {
            code: room.code().clone(),
            status: room.status(),
            numbers_picked: room.numbers_picked().to_vec(),
            current_turn: room.current_turn(),
            is_local_turn: machine.is_local_turn(),
            completed_lines: machine.completed_lines(),
            winner: room.winner(),
            players,
        }
    }
}

fn masked_board() -> Vec<Option<u8>> {
    vec![None; CELL_COUNT]
}
