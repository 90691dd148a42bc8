//! Process-wide table of live rooms.
//!
//! The registry is the only cross-actor shared resource besides the store:
//! it owns the handle map behind a small RwLock and spawns one task per
//! room. Room state itself is never touched outside its actor.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, oneshot};

use super::actor::{RoomActor, RoomHandle, RoomPolicy};
use super::messages::RoomCommand;
use crate::db::snapshots::SnapshotStore;
use crate::game::entities::{Room, RoomId, RoomStatus};
use crate::game::errors::GameError;

#[derive(Clone, Copy, Debug)]
pub struct RegistryConfig {
    /// Seconds a fully-disconnected room survives before deletion.
    pub idle_room_ttl_secs: i64,
    pub auto_fold_disconnected: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            idle_room_ttl_secs: 600,
            auto_fold_disconnected: false,
        }
    }
}

pub struct RoomRegistry {
    store: Arc<dyn SnapshotStore>,
    rooms: RwLock<HashMap<RoomId, RoomHandle>>,
    config: RegistryConfig,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn SnapshotStore>, config: RegistryConfig) -> Self {
        Self {
            store,
            rooms: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn policy(&self) -> RoomPolicy {
        RoomPolicy {
            auto_fold_disconnected: self.config.auto_fold_disconnected,
        }
    }

    /// Persist a fresh room and spawn its actor. The room is visible to
    /// `lookup` only after its first snapshot is safely in the store.
    pub async fn open(&self, room: Room) -> Result<RoomHandle, GameError> {
        let bytes = serde_json::to_vec(&room)
            .map_err(|e| GameError::Internal(format!("snapshot encode failed: {e}")))?;
        self.store
            .save(&room.id, &bytes)
            .await
            .map_err(|e| GameError::Internal(format!("snapshot save failed: {e}")))?;
        Ok(self.spawn(room).await)
    }

    async fn spawn(&self, room: Room) -> RoomHandle {
        let room_id = room.id.clone();
        let (actor, handle) = RoomActor::new(room, self.store.clone(), self.policy());
        self.rooms.write().await.insert(room_id.clone(), handle.clone());
        tokio::spawn(actor.run());
        log::info!("room {room_id}: opened");
        handle
    }

    pub async fn lookup(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Snapshot every live room. Rooms whose actor died are skipped.
    pub async fn list(&self) -> Vec<Arc<Room>> {
        let handles: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();
        let mut snapshots = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(room) = handle.snapshot().await {
                snapshots.push(room);
            }
        }
        snapshots
    }

    /// The non-finished room a device is currently in, if any.
    pub async fn room_of_player(&self, player_id: &str) -> Option<RoomId> {
        self.list()
            .await
            .into_iter()
            .find(|room| room.status != RoomStatus::Finished && room.players.contains_key(player_id))
            .map(|room| room.id.clone())
    }

    /// Stop a room's actor; optionally delete its snapshot.
    pub async fn close(&self, room_id: &str, delete: bool) -> Result<(), GameError> {
        if let Some(handle) = self.rooms.write().await.remove(room_id) {
            let (tx, rx) = oneshot::channel();
            if handle.send(RoomCommand::Shutdown { respond: tx }).await.is_ok() {
                let _ = rx.await;
            }
        }
        if delete {
            self.store
                .delete(room_id)
                .await
                .map_err(|e| GameError::Internal(format!("snapshot delete failed: {e}")))?;
            log::info!("room {room_id}: closed and deleted");
        } else {
            log::info!("room {room_id}: closed");
        }
        Ok(())
    }

    /// Reconstitute every persisted room into a live actor. Sessions do not
    /// survive a restart, so every player comes back disconnected and the
    /// idle clock starts ticking for rooms nobody returns to.
    pub async fn restore_all(&self, now: i64) -> Result<usize, GameError> {
        let ids = self
            .store
            .list_active()
            .await
            .map_err(|e| GameError::Internal(format!("snapshot listing failed: {e}")))?;
        let mut restored = 0;
        for room_id in ids {
            let Some(bytes) = self
                .store
                .load(&room_id)
                .await
                .map_err(|e| GameError::Internal(format!("snapshot load failed: {e}")))?
            else {
                continue;
            };
            match serde_json::from_slice::<Room>(&bytes) {
                Ok(mut room) => {
                    for player in room.players.values_mut() {
                        player.is_connected = false;
                    }
                    room.last_all_disconnected_at.get_or_insert(now);
                    self.spawn(room).await;
                    restored += 1;
                }
                Err(e) => {
                    log::warn!("room {room_id}: skipping unreadable snapshot: {e}");
                }
            }
        }
        Ok(restored)
    }

    /// Delete rooms whose players have all been offline past the TTL.
    pub async fn sweep_idle(&self, now: i64) {
        for room in self.list().await {
            if !room.all_disconnected() {
                continue;
            }
            let Some(since) = room.last_all_disconnected_at else {
                continue;
            };
            if now - since > self.config.idle_room_ttl_secs {
                log::info!(
                    "room {}: idle for {}s, deleting",
                    room.id,
                    now - since
                );
                if let Err(e) = self.close(&room.id, true).await {
                    log::error!("room {}: idle sweep failed: {}", room.id, e);
                }
            }
        }
    }

    pub async fn active_room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Stop every actor without deleting snapshots. Used at shutdown.
    pub async fn shutdown(&self) {
        let ids: Vec<RoomId> = self.rooms.read().await.keys().cloned().collect();
        for room_id in ids {
            let _ = self.close(&room_id, false).await;
        }
    }
}
