//! In-game player actions against the active room.
//!
//! Every remote write here is idempotent and optimistic: the local machine
//! only changes through the authoritative snapshots the session loop feeds
//! back, so a failed or duplicated write never desynchronizes the client.

use tracing::debug;

use crate::error::ServiceError;
use crate::state::SharedState;
use crate::sync::models::{PlayerPatch, RoomPatch};

/// Finalize the local board and publish it with the ready flag.
///
/// Returns `false` when the action is a no-op (already ready, or the room
/// left the pre-game states). On a failed publish the machine re-enables
/// the action so the user can retry.
pub async fn ready_up(state: &SharedState) -> Result<bool, ServiceError> {
    let Some((code, directive)) = state
        .with_machine_mut(|machine| {
            let code = machine.room().code().clone();
            machine.ready_up().map(|directive| (code, directive))
        })
        .await
        .flatten()
    else {
        return Ok(false);
    };

    let write = state
        .adapter()
        .update_player(&code, state.local_id(), PlayerPatch::ready(directive.board))
        .await;
    if let Err(err) = write {
        state
            .with_machine_mut(|machine| machine.retract_ready())
            .await;
        return Err(err.into());
    }

    state.publish_view().await;
    Ok(true)
}

/// Pick a number on the local player's turn.
///
/// Returns `false` for picks the machine rejects (not playing, not our
/// turn, value already picked); the pick sequence and the turn handover
/// are submitted as one atomic room patch.
pub async fn pick_number(state: &SharedState, value: u8) -> Result<bool, ServiceError> {
    let Some((code, directive)) = state
        .with_machine(|machine| {
            machine
                .propose_pick(value)
                .map(|directive| (machine.room().code().clone(), directive))
        })
        .await
        .flatten()
    else {
        debug!(value, "pick rejected locally");
        return Ok(false);
    };

    state
        .adapter()
        .update_room(
            &code,
            RoomPatch::pick(directive.numbers_picked, directive.next_turn),
        )
        .await?;
    Ok(true)
}

/// Place the next sequential value on the local board during setup.
///
/// Purely local until the board is published via [`ready_up`].
pub async fn fill_cell(state: &SharedState, index: usize) {
    state
        .with_machine_mut(|machine| machine.fill_cell(index))
        .await;
    state.publish_view().await;
}

/// Replace the local board with a fresh random layout during setup.
pub async fn randomize_board(state: &SharedState) {
    state
        .with_machine_mut(|machine| machine.randomize_board())
        .await;
    state.publish_view().await;
}
