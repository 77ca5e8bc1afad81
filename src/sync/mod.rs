//! Boundary to the hosted persistence and realtime notification backend.

/// Adapter-agnostic error type.
pub mod error;
/// In-process adapter backed by shared maps and broadcast channels.
pub mod memory;
/// Wire records and partial patches.
pub mod models;

use futures::future::BoxFuture;
use tokio::sync::broadcast;

use crate::state::room::{PlayerId, RoomCode};
use crate::sync::error::SyncResult;
use crate::sync::models::{PlayerPatch, PlayerRecord, RoomPatch, RoomRecord};

/// Abstraction over the shared, eventually-consistent room store.
///
/// The backend guarantees per-record last-write-wins visibility to all
/// subscribers but no cross-client mutual exclusion; callers keep every
/// write idempotent so concurrent duplicates are harmless. Subscriptions
/// are plain broadcast receivers, dropped to unsubscribe.
pub trait RoomSyncAdapter: Send + Sync {
    /// Insert a fresh room record, failing on a code collision.
    fn create_room(&self, room: RoomRecord) -> BoxFuture<'static, SyncResult<()>>;
    /// Fetch the current room record, if the room exists.
    fn fetch_room(&self, code: &RoomCode) -> BoxFuture<'static, SyncResult<Option<RoomRecord>>>;
    /// Apply a partial update to a room record and notify subscribers.
    fn update_room(&self, code: &RoomCode, patch: RoomPatch) -> BoxFuture<'static, SyncResult<()>>;
    /// Insert or refresh a player record, keyed by (room, player).
    fn upsert_player(&self, player: PlayerRecord) -> BoxFuture<'static, SyncResult<()>>;
    /// All player records of a room, ordered ascending by join time.
    fn list_players(&self, code: &RoomCode) -> BoxFuture<'static, SyncResult<Vec<PlayerRecord>>>;
    /// Apply a partial update to a player record, addressed by its
    /// (room, player) identity, and notify subscribers.
    fn update_player(
        &self,
        code: &RoomCode,
        id: PlayerId,
        patch: PlayerPatch,
    ) -> BoxFuture<'static, SyncResult<()>>;
    /// Subscribe to authoritative room record updates.
    fn subscribe_room(
        &self,
        code: &RoomCode,
    ) -> BoxFuture<'static, SyncResult<broadcast::Receiver<RoomRecord>>>;
    /// Subscribe to change notifications for a room's player records.
    ///
    /// The notification carries no payload; subscribers re-list the
    /// roster to pick up the new state.
    fn subscribe_players(
        &self,
        code: &RoomCode,
    ) -> BoxFuture<'static, SyncResult<broadcast::Receiver<()>>>;
}
