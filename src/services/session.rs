//! Per-room session loop.
//!
//! Subscribes to the room and roster feeds, reconciles every update into
//! the local machine, and submits the reactive writes the machine decides
//! on (the start election, the self-heal publish, the win declaration).
//! Also arms the lobby liveness countdown that auto-readies a stalled
//! local player.

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::services::gameplay;
use crate::state::SharedState;
use crate::state::room::RoomCode;
use crate::sync::models::{PlayerPatch, RoomPatch};

/// Drive the active room until it finishes or its feeds close.
///
/// Subscriptions are opened before the initial fetch so no update can fall
/// between the snapshot and the feed. Write failures inside the loop are
/// logged and dropped; the next authoritative snapshot resolves them.
pub async fn run_session(state: SharedState) -> Result<(), ServiceError> {
    let Some(code) = state
        .with_machine(|machine| machine.room().code().clone())
        .await
    else {
        return Err(ServiceError::InvalidState("no active room".into()));
    };

    let mut room_rx = state.adapter().subscribe_room(&code).await?;
    let mut players_rx = state.adapter().subscribe_players(&code).await?;

    refresh_room(&state, &code).await?;
    refresh_roster(&state, &code).await?;
    react(&state, &code).await;
    state.publish_view().await;
    info!(room = %code, "session started");

    let countdown = tokio::time::sleep(state.config().ready_countdown);
    tokio::pin!(countdown);

    loop {
        let finished = state
            .with_machine(|machine| machine.room().status().is_terminal())
            .await
            .unwrap_or(true);
        if finished {
            break;
        }

        // Guarding the branch keeps the completed sleep from being polled
        // again after the auto-ready already fired or became moot.
        let auto_ready_armed = state
            .with_machine(|machine| machine.auto_ready_pending())
            .await
            .unwrap_or(false);

        tokio::select! {
            update = room_rx.recv() => match update {
                Ok(record) => {
                    state
                        .with_machine_mut(|machine| machine.apply_room_snapshot(&record))
                        .await;
                    react(&state, &code).await;
                    state.publish_view().await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(room = %code, skipped, "room feed lagged; refetching");
                    if let Err(err) = refresh_room(&state, &code).await {
                        warn!(room = %code, error = %err, "room refetch failed");
                    }
                    react(&state, &code).await;
                    state.publish_view().await;
                }
                Err(RecvError::Closed) => break,
            },
            notice = players_rx.recv() => match notice {
                Ok(()) => {
                    if let Err(err) = refresh_roster(&state, &code).await {
                        warn!(room = %code, error = %err, "roster refresh failed");
                    }
                    react(&state, &code).await;
                    state.publish_view().await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(room = %code, skipped, "player feed lagged");
                    if let Err(err) = refresh_roster(&state, &code).await {
                        warn!(room = %code, error = %err, "roster refresh failed");
                    }
                    react(&state, &code).await;
                    state.publish_view().await;
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut countdown, if auto_ready_armed => {
                info!(room = %code, "ready countdown elapsed; auto-readying");
                if let Err(err) = gameplay::ready_up(&state).await {
                    warn!(room = %code, error = %err, "auto-ready publish failed");
                }
                // A failed publish retracts ready and re-arms the branch;
                // without a reset the elapsed sleep would re-fire it in a
                // tight loop instead of waiting another full period.
                countdown
                    .as_mut()
                    .reset(tokio::time::Instant::now() + state.config().ready_countdown);
            }
        }
    }

    state.publish_view().await;
    info!(room = %code, "session finished");
    Ok(())
}

/// Fetch the room record and reconcile it into the machine.
async fn refresh_room(state: &SharedState, code: &RoomCode) -> Result<(), ServiceError> {
    if let Some(record) = state.adapter().fetch_room(code).await? {
        state
            .with_machine_mut(|machine| machine.apply_room_snapshot(&record))
            .await;
    }
    Ok(())
}

/// Re-list the roster and reconcile it into the machine.
async fn refresh_roster(state: &SharedState, code: &RoomCode) -> Result<(), ServiceError> {
    let records = state.adapter().list_players(code).await?;
    state
        .with_machine_mut(|machine| machine.apply_roster(records))
        .await;
    Ok(())
}

/// Submit the writes the machine decided on after a reconcile.
///
/// Each directive is an idempotent patch; a failed write is logged and
/// left for the next snapshot (or another client) to resolve.
async fn react(state: &SharedState, code: &RoomCode) {
    if let Some(directive) = state
        .with_machine(|machine| machine.maybe_start())
        .await
        .flatten()
    {
        info!(room = %code, starter = %directive.starter, "roster complete; starting play");
        if let Err(err) = state
            .adapter()
            .update_room(code, RoomPatch::start(directive.starter))
            .await
        {
            warn!(room = %code, error = %err, "start write failed");
        }
    }

    if let Some(directive) = state
        .with_machine_mut(|machine| machine.heal_board())
        .await
        .flatten()
    {
        info!(room = %code, "publishing self-healed board");
        if let Err(err) = state
            .adapter()
            .update_player(code, state.local_id(), PlayerPatch::ready(directive.board))
            .await
        {
            warn!(room = %code, error = %err, "board heal write failed");
        }
    }

    if let Some(directive) = state
        .with_machine(|machine| machine.check_win())
        .await
        .flatten()
    {
        info!(room = %code, winner = %directive.winner, "declaring win");
        if let Err(err) = state
            .adapter()
            .update_room(code, RoomPatch::win(directive.winner))
            .await
        {
            warn!(room = %code, error = %err, "win write failed");
        }
    }
}
