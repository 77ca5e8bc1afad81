//! In-process sync adapter backed by shared maps and broadcast channels.
//!
//! Implements the same last-write-wins visibility contract as the hosted
//! backend: every committed write is broadcast to all subscribers of the
//! room. Used by the simulation binary and the test suite.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::broadcast;

use crate::state::room::{PlayerId, RoomCode};
use crate::sync::RoomSyncAdapter;
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::models::{PlayerPatch, PlayerRecord, RoomPatch, RoomRecord};

/// Default broadcast capacity per room feed.
const DEFAULT_CAPACITY: usize = 16;

/// Per-room broadcast hubs fanning out record changes.
struct RoomHub {
    rooms: broadcast::Sender<RoomRecord>,
    players: broadcast::Sender<()>,
}

impl RoomHub {
    fn new(capacity: usize) -> Self {
        let (rooms, _) = broadcast::channel(capacity);
        let (players, _) = broadcast::channel(capacity);
        Self { rooms, players }
    }
}

struct Inner {
    rooms: DashMap<RoomCode, RoomRecord>,
    // One record per (room, player): the same identity participating in
    // several rooms over time keeps a distinct record in each.
    players: DashMap<(RoomCode, PlayerId), PlayerRecord>,
    hubs: DashMap<RoomCode, RoomHub>,
    capacity: usize,
}

impl Inner {
    fn notify_room(&self, record: RoomRecord) {
        if let Some(hub) = self.hubs.get(&record.id) {
            let _ = hub.rooms.send(record);
        }
    }

    fn notify_players(&self, code: &RoomCode) {
        if let Some(hub) = self.hubs.get(code) {
            let _ = hub.players.send(());
        }
    }
}

/// Sync adapter keeping all records in process memory.
#[derive(Clone)]
pub struct MemorySyncAdapter {
    inner: Arc<Inner>,
}

impl Default for MemorySyncAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MemorySyncAdapter {
    /// Build an adapter whose per-room feeds buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                rooms: DashMap::new(),
                players: DashMap::new(),
                hubs: DashMap::new(),
                capacity,
            }),
        }
    }
}

impl RoomSyncAdapter for MemorySyncAdapter {
    fn create_room(&self, room: RoomRecord) -> BoxFuture<'static, SyncResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if inner.rooms.contains_key(&room.id) {
                return Err(SyncError::Duplicate {
                    id: room.id.to_string(),
                });
            }
            inner
                .hubs
                .entry(room.id.clone())
                .or_insert_with(|| RoomHub::new(inner.capacity));
            inner.rooms.insert(room.id.clone(), room);
            Ok(())
        })
    }

    fn fetch_room(&self, code: &RoomCode) -> BoxFuture<'static, SyncResult<Option<RoomRecord>>> {
        let inner = self.inner.clone();
        let code = code.clone();
        Box::pin(async move { Ok(inner.rooms.get(&code).map(|entry| entry.clone())) })
    }

    fn update_room(&self, code: &RoomCode, patch: RoomPatch) -> BoxFuture<'static, SyncResult<()>> {
        let inner = self.inner.clone();
        let code = code.clone();
        Box::pin(async move {
            let Some(mut record) = inner.rooms.get_mut(&code) else {
                return Err(SyncError::NotFound {
                    id: code.to_string(),
                });
            };

            if let Some(status) = patch.status {
                record.status = status;
            }
            if let Some(numbers) = patch.numbers_picked {
                record.numbers_picked = numbers;
            }
            if let Some(turn) = patch.current_player_turn_id {
                record.current_player_turn_id = turn;
            }
            // Winner is first-write-wins: the deterministic tie-break
            // for two players finishing in the same instant.
            if let Some(winner) = patch.winner_id
                && record.winner_id.is_none()
            {
                record.winner_id = Some(winner);
            }

            // Notify while the entry guard is held so broadcasts go out
            // in commit order; interleaved sends would let a subscriber
            // see an older record after a newer one.
            inner.notify_room(record.clone());
            drop(record);
            Ok(())
        })
    }

    fn upsert_player(&self, player: PlayerRecord) -> BoxFuture<'static, SyncResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let room = player.room_id.clone();
            let key = (player.room_id.clone(), player.id);
            let entry = inner
                .players
                .entry(key)
                .and_modify(|existing| {
                    // Reconnect of a known participant: refresh the name,
                    // keep join order, readiness, and board intact.
                    existing.name = player.name.clone();
                })
                .or_insert(player);
            // Notify while the entry guard is held so broadcasts go out
            // in commit order.
            inner.notify_players(&room);
            drop(entry);
            Ok(())
        })
    }

    fn list_players(&self, code: &RoomCode) -> BoxFuture<'static, SyncResult<Vec<PlayerRecord>>> {
        let inner = self.inner.clone();
        let code = code.clone();
        Box::pin(async move {
            let mut players: Vec<PlayerRecord> = inner
                .players
                .iter()
                .filter(|entry| entry.key().0 == code)
                .map(|entry| entry.clone())
                .collect();
            players.sort_by_key(|player| (player.joined_at, player.id));
            Ok(players)
        })
    }

    fn update_player(
        &self,
        code: &RoomCode,
        id: PlayerId,
        patch: PlayerPatch,
    ) -> BoxFuture<'static, SyncResult<()>> {
        let inner = self.inner.clone();
        let code = code.clone();
        Box::pin(async move {
            let Some(mut record) = inner.players.get_mut(&(code.clone(), id)) else {
                return Err(SyncError::NotFound { id: id.to_string() });
            };

            if let Some(name) = patch.name {
                record.name = name;
            }
            if let Some(is_ready) = patch.is_ready {
                record.is_ready = is_ready;
            }
            if let Some(board) = patch.board {
                record.board = Some(board);
            }

            // Notify while the entry guard is held so broadcasts go out
            // in commit order.
            inner.notify_players(&code);
            drop(record);
            Ok(())
        })
    }

    fn subscribe_room(
        &self,
        code: &RoomCode,
    ) -> BoxFuture<'static, SyncResult<broadcast::Receiver<RoomRecord>>> {
        let inner = self.inner.clone();
        let code = code.clone();
        Box::pin(async move {
            let hub = inner
                .hubs
                .entry(code)
                .or_insert_with(|| RoomHub::new(inner.capacity));
            Ok(hub.rooms.subscribe())
        })
    }

    fn subscribe_players(
        &self,
        code: &RoomCode,
    ) -> BoxFuture<'static, SyncResult<broadcast::Receiver<()>>> {
        let inner = self.inner.clone();
        let code = code.clone();
        Box::pin(async move {
            let hub = inner
                .hubs
                .entry(code)
                .or_insert_with(|| RoomHub::new(inner.capacity));
            Ok(hub.players.subscribe())
        })
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::state::room::RoomStatus;

    fn player(room: &RoomCode, name: &str, offset_secs: i64) -> PlayerRecord {
        PlayerRecord {
            id: PlayerId::new_v4(),
            room_id: room.clone(),
            name: name.into(),
            is_ready: false,
            board: None,
            joined_at: OffsetDateTime::from_unix_timestamp(1_700_000_000 + offset_secs).unwrap(),
        }
    }

    #[tokio::test]
    async fn duplicate_room_codes_are_rejected() {
        let adapter = MemorySyncAdapter::default();
        let code: RoomCode = "AB12C".parse().unwrap();

        adapter.create_room(RoomRecord::new(code.clone())).await.unwrap();
        let err = adapter
            .create_room(RoomRecord::new(code))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn room_updates_reach_subscribers() {
        let adapter = MemorySyncAdapter::default();
        let code: RoomCode = "AB12C".parse().unwrap();
        adapter.create_room(RoomRecord::new(code.clone())).await.unwrap();

        let mut feed = adapter.subscribe_room(&code).await.unwrap();
        let starter = PlayerId::new_v4();
        adapter
            .update_room(&code, RoomPatch::start(starter))
            .await
            .unwrap();

        let record = feed.recv().await.unwrap();
        assert_eq!(record.status, RoomStatus::Playing);
        assert_eq!(record.current_player_turn_id, Some(starter));
    }

    #[tokio::test]
    async fn winner_is_first_write_wins() {
        let adapter = MemorySyncAdapter::default();
        let code: RoomCode = "AB12C".parse().unwrap();
        adapter.create_room(RoomRecord::new(code.clone())).await.unwrap();

        let first = PlayerId::new_v4();
        let second = PlayerId::new_v4();
        adapter.update_room(&code, RoomPatch::win(first)).await.unwrap();
        adapter.update_room(&code, RoomPatch::win(second)).await.unwrap();

        let record = adapter.fetch_room(&code).await.unwrap().unwrap();
        assert_eq!(record.winner_id, Some(first));
        assert_eq!(record.status, RoomStatus::Finished);
    }

    #[tokio::test]
    async fn upsert_preserves_join_order_and_progress() {
        let adapter = MemorySyncAdapter::default();
        let code: RoomCode = "AB12C".parse().unwrap();
        adapter.create_room(RoomRecord::new(code.clone())).await.unwrap();

        let mut original = player(&code, "ana", 0);
        adapter.upsert_player(original.clone()).await.unwrap();
        adapter
            .update_player(&code, original.id, PlayerPatch::ready([1; 25]))
            .await
            .unwrap();

        // Reconnect with a changed name and a later timestamp.
        original.name = "ana2".into();
        original.joined_at += time::Duration::seconds(60);
        adapter.upsert_player(original.clone()).await.unwrap();

        let players = adapter.list_players(&code).await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "ana2");
        assert!(players[0].is_ready);
        assert_eq!(
            players[0].joined_at,
            OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
        );
    }

    #[tokio::test]
    async fn players_are_listed_by_join_time() {
        let adapter = MemorySyncAdapter::default();
        let code: RoomCode = "AB12C".parse().unwrap();
        adapter.create_room(RoomRecord::new(code.clone())).await.unwrap();

        adapter.upsert_player(player(&code, "late", 30)).await.unwrap();
        adapter.upsert_player(player(&code, "early", 0)).await.unwrap();
        adapter.upsert_player(player(&code, "middle", 15)).await.unwrap();

        let names: Vec<String> = adapter
            .list_players(&code)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["early", "middle", "late"]);
    }

    #[tokio::test]
    async fn updating_missing_player_fails() {
        let adapter = MemorySyncAdapter::default();
        let code: RoomCode = "AB12C".parse().unwrap();
        let err = adapter
            .update_player(&code, PlayerId::new_v4(), PlayerPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
    }

    #[tokio::test]
    async fn same_identity_participates_in_several_rooms() {
        let adapter = MemorySyncAdapter::default();
        let first: RoomCode = "AAAAA".parse().unwrap();
        let second: RoomCode = "BBBBB".parse().unwrap();
        adapter.create_room(RoomRecord::new(first.clone())).await.unwrap();
        adapter.create_room(RoomRecord::new(second.clone())).await.unwrap();

        // A stable local identity starts a fresh game in a new room; the
        // old participation record must not swallow the new one.
        let mut record = player(&first, "ana", 0);
        adapter.upsert_player(record.clone()).await.unwrap();
        adapter
            .update_player(&first, record.id, PlayerPatch::ready([1; 25]))
            .await
            .unwrap();
        record.room_id = second.clone();
        adapter.upsert_player(record.clone()).await.unwrap();

        let in_second = adapter.list_players(&second).await.unwrap();
        assert_eq!(in_second.len(), 1);
        assert_eq!(in_second[0].room_id, second);
        // Each participation tracks its own round: ready in the finished
        // room, fresh in the new one.
        assert!(!in_second[0].is_ready);
        assert!(adapter.list_players(&first).await.unwrap()[0].is_ready);
    }

    #[tokio::test]
    async fn last_broadcast_matches_the_final_record() {
        let adapter = MemorySyncAdapter::new(128);
        let code: RoomCode = "AB12C".parse().unwrap();
        adapter.create_room(RoomRecord::new(code.clone())).await.unwrap();
        let mut feed = adapter.subscribe_room(&code).await.unwrap();

        // Many concurrent commits: whatever committed last must also be
        // broadcast last, or subscribers end on a stale record.
        let mut writers = Vec::new();
        for _ in 0..64 {
            let adapter = adapter.clone();
            let code = code.clone();
            writers.push(tokio::spawn(async move {
                adapter
                    .update_room(&code, RoomPatch::start(PlayerId::new_v4()))
                    .await
                    .unwrap();
            }));
        }
        for writer in writers {
            writer.await.unwrap();
        }

        let mut last = None;
        while let Ok(record) = feed.try_recv() {
            last = Some(record);
        }
        let stored = adapter.fetch_room(&code).await.unwrap().unwrap();
        assert_eq!(last, Some(stored));
    }
}
