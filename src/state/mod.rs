//! Client-side shared state and the room state machine it owns.

/// Board construction during setup.
pub mod board;
/// Rooms, players, codes, and statuses.
pub mod room;
/// The per-client room lifecycle machine.
pub mod state_machine;
/// Turn sequencing over the join-ordered roster.
pub mod turns;
/// Win detection over the fixed line table.
pub mod win;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::config::AppConfig;
use crate::dto::room::RoomView;
use crate::state::room::PlayerId;
use crate::state::state_machine::RoomStateMachine;
use crate::sync::RoomSyncAdapter;

/// Shared handle to the per-client application state.
pub type SharedState = Arc<AppState>;

/// Central state for one participant process.
///
/// Holds the locally persisted identity, the sync adapter handle, and at
/// most one active room machine. All reads and mutations of the room go
/// through the machine's accessors and transition methods; consumers
/// observe derived [`RoomView`]s through a watch channel.
pub struct AppState {
    adapter: Arc<dyn RoomSyncAdapter>,
    config: AppConfig,
    local_id: PlayerId,
    machine: RwLock<Option<RoomStateMachine>>,
    views: watch::Sender<Option<RoomView>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be
    /// cloned cheaply, with a freshly generated local identity.
    pub fn new(adapter: Arc<dyn RoomSyncAdapter>, config: AppConfig) -> SharedState {
        let (views, _rx) = watch::channel(None);
        Arc::new(Self {
            adapter,
            config,
            local_id: PlayerId::new_v4(),
            machine: RwLock::new(None),
            views,
        })
    }

    /// Handle to the sync backend.
    pub fn adapter(&self) -> &Arc<dyn RoomSyncAdapter> {
        &self.adapter
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Locally persisted participant identity, stable for this process.
    pub fn local_id(&self) -> PlayerId {
        self.local_id
    }

    /// Install the machine for a newly created or joined room, replacing
    /// any previous one (a process tracks a single active room).
    pub async fn install_machine(&self, machine: RoomStateMachine) {
        {
            let mut guard = self.machine.write().await;
            *guard = Some(machine);
        }
        self.publish_view().await;
    }

    /// Drop the active room, e.g. when leaving a finished game.
    pub async fn clear_machine(&self) {
        {
            let mut guard = self.machine.write().await;
            guard.take();
        }
        self.views.send_replace(None);
    }

    /// Run a closure against the active machine, if any.
    pub async fn with_machine<T>(&self, f: impl FnOnce(&RoomStateMachine) -> T) -> Option<T> {
        let guard = self.machine.read().await;
        guard.as_ref().map(f)
    }

    /// Run a mutating closure against the active machine, if any.
    pub async fn with_machine_mut<T>(
        &self,
        f: impl FnOnce(&mut RoomStateMachine) -> T,
    ) -> Option<T> {
        let mut guard = self.machine.write().await;
        guard.as_mut().map(f)
    }

    /// Subscribe to derived room views.
    pub fn view_watcher(&self) -> watch::Receiver<Option<RoomView>> {
        self.views.subscribe()
    }

    /// Recompute the derived view and push it to all watchers.
    pub async fn publish_view(&self) {
        let view = {
            let guard = self.machine.read().await;
            guard.as_ref().map(RoomView::from)
        };
        self.views.send_replace(view);
    }
}
