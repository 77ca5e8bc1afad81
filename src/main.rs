//! Bingo Arena binary entrypoint running a local multi-client simulation
//! against the in-memory sync backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rand::seq::IndexedRandom;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bingo_arena::config::AppConfig;
use bingo_arena::dto::room::{CreateRoomRequest, JoinRoomRequest, RoomView};
use bingo_arena::services::{gameplay, lobby, session};
use bingo_arena::state::board::MAX_VALUE;
use bingo_arena::state::{AppState, SharedState};
use bingo_arena::sync::memory::MemorySyncAdapter;

/// Display names handed out to the simulated participants.
const BOT_NAMES: [&str; 6] = ["ana", "ben", "cleo", "dora", "emil", "finn"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let adapter = Arc::new(MemorySyncAdapter::new(config.feed_capacity));

    let creator = AppState::new(adapter.clone(), config.clone());
    let code = lobby::create_room(
        &creator,
        &CreateRoomRequest {
            name: BOT_NAMES[0].into(),
        },
    )
    .await
    .context("creating the room")?;

    let mut participants = vec![creator];
    for index in 1..config.simulated_players {
        let state = AppState::new(adapter.clone(), config.clone());
        lobby::join_room(
            &state,
            &JoinRoomRequest {
                name: BOT_NAMES[index % BOT_NAMES.len()].into(),
                code: code.to_string(),
            },
        )
        .await
        .context("joining the room")?;
        participants.push(state);
    }
    info!(room = %code, players = participants.len(), "simulation lobby assembled");

    let mut tasks = Vec::new();
    for state in &participants {
        let session_state = state.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(err) = session::run_session(session_state).await {
                warn!(error = %err, "session loop failed");
            }
        }));
        tasks.push(tokio::spawn(run_bot(state.clone())));
    }

    let game = async {
        for task in tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "simulation task panicked");
            }
        }
    };
    tokio::select! {
        _ = game => {}
        _ = shutdown_signal() => {
            info!("shutdown requested; abandoning the simulation");
            return Ok(());
        }
    }

    report_outcome(&participants[0]);
    for state in &participants {
        state.clear_machine().await;
    }
    Ok(())
}

/// Drive one simulated participant: ready up after a short delay, then
/// pick random unpicked numbers whenever the turn comes around.
async fn run_bot(state: SharedState) {
    sleep(Duration::from_millis(200)).await;
    gameplay::randomize_board(&state).await;
    if let Err(err) = gameplay::ready_up(&state).await {
        warn!(error = %err, "bot failed to ready up");
    }

    let mut views = state.view_watcher();
    loop {
        let snapshot = views.borrow_and_update().clone();
        if let Some(view) = snapshot {
            if view.status.is_terminal() {
                break;
            }
            if view.is_local_turn {
                let unpicked: Vec<u8> = (1..=MAX_VALUE)
                    .filter(|value| !view.numbers_picked.contains(value))
                    .collect();
                // The rng handle must not live across an await point.
                let choice = unpicked.choose(&mut rand::rng()).copied();
                if let Some(value) = choice {
                    sleep(Duration::from_millis(150)).await;
                    info!(player = %view_name(&view), value, "picking");
                    if let Err(err) = gameplay::pick_number(&state, value).await {
                        warn!(error = %err, "bot pick failed");
                    }
                }
            }
        }
        if views.changed().await.is_err() {
            break;
        }
    }
}

/// Log how the game ended, from one participant's final view.
fn report_outcome(state: &SharedState) {
    let Some(view) = state.view_watcher().borrow().clone() else {
        warn!("simulation ended without a room view");
        return;
    };

    match view.winner {
        Some(winner) => {
            let name = view
                .players
                .iter()
                .find(|player| player.id == winner)
                .map(|player| player.name.clone())
                .unwrap_or_else(|| winner.to_string());
            info!(
                winner = %name,
                picks = view.numbers_picked.len(),
                "bingo! game finished"
            );
        }
        None => warn!(status = ?view.status, "game ended without a winner"),
    }
}

/// The local player's display name, for log lines.
fn view_name(view: &RoomView) -> String {
    view.players
        .iter()
        .find(|player| player.is_local)
        .map(|player| player.name.clone())
        .unwrap_or_else(|| "unknown".into())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the simulation down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
