//! Room creation and joining flows.

use time::OffsetDateTime;
use tracing::{info, warn};
use validator::Validate;

use crate::dto::room::{CreateRoomRequest, JoinRoomRequest};
use crate::error::ServiceError;
use crate::state::SharedState;
use crate::state::room::RoomCode;
use crate::state::state_machine::RoomStateMachine;
use crate::sync::error::SyncError;
use crate::sync::models::{PlayerRecord, RoomRecord};

/// Code generation attempts before giving up on a create request.
const CREATE_ATTEMPTS: usize = 3;

/// Create a fresh room and enroll the local player as its first member.
///
/// Generated codes can collide with existing rooms; the insert is retried
/// with a new code a few times before the error surfaces.
pub async fn create_room(
    state: &SharedState,
    request: &CreateRoomRequest,
) -> Result<RoomCode, ServiceError> {
    request.validate()?;

    for _ in 0..CREATE_ATTEMPTS {
        let code = RoomCode::generate();
        match state.adapter().create_room(RoomRecord::new(code.clone())).await {
            Ok(()) => {
                enroll(state, code.clone(), request.name.clone()).await?;
                info!(room = %code, "created room");
                return Ok(code);
            }
            Err(SyncError::Duplicate { id }) => {
                warn!(room = %id, "room code collision; generating a new code");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::InvalidState(
        "could not allocate a unique room code".into(),
    ))
}

/// Join an existing room by code and enroll the local player.
///
/// The fetched room record is applied immediately so a client joining a
/// game already in progress starts from the current phase rather than an
/// empty lobby.
pub async fn join_room(
    state: &SharedState,
    request: &JoinRoomRequest,
) -> Result<RoomCode, ServiceError> {
    request.validate()?;
    let code = request
        .code
        .parse::<RoomCode>()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let room = state
        .adapter()
        .fetch_room(&code)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room `{code}` not found")))?;

    enroll(state, code.clone(), request.name.clone()).await?;
    state
        .with_machine_mut(|machine| machine.apply_room_snapshot(&room))
        .await;
    state.publish_view().await;
    info!(room = %code, status = ?room.status, "joined room");
    Ok(code)
}

/// Publish the local membership record and install a fresh room machine.
///
/// The upsert is idempotent per (room, player), so a reconnecting client
/// refreshes its name while the backend keeps its original join time,
/// ready flag, and published board.
async fn enroll(state: &SharedState, code: RoomCode, name: String) -> Result<(), ServiceError> {
    let name = match name.trim() {
        "" => "Anonymous".to_string(),
        trimmed => trimmed.to_string(),
    };
    let record = PlayerRecord {
        id: state.local_id(),
        room_id: code.clone(),
        name,
        is_ready: false,
        board: None,
        joined_at: OffsetDateTime::now_utc(),
    };
    state.adapter().upsert_player(record).await?;
    state
        .install_machine(RoomStateMachine::new(code, state.local_id()))
        .await;
    Ok(())
}
