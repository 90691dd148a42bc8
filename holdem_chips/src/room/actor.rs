//! Room actor: single-consumer event loop over one room snapshot.
//!
//! The actor is the only writer of its room. A command is applied to a clone
//! of the snapshot; the clone is persisted to the snapshot store *before*
//! the in-memory state is swapped, so a store failure leaves the room
//! exactly as it was and surfaces `Internal` to the originator only.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::messages::{RoomCommand, RoomUpdate};
use crate::db::snapshots::SnapshotStore;
use crate::game::engine;
use crate::game::entities::{PlayerId, Room, RoomId};
use crate::game::errors::GameError;
use crate::game::events::GameEvent;

const INBOX_CAPACITY: usize = 64;
const SUBSCRIBER_CAPACITY: usize = 32;

/// Per-room policy knobs, owned by the registry.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoomPolicy {
    /// Fold a disconnected player whose turn it is. Off by default: a dead
    /// connection blocks the table rather than costing the player the pot.
    pub auto_fold_disconnected: bool,
}

/// Cloneable handle for sending commands to a room actor.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomCommand>,
    room_id: RoomId,
}

impl RoomHandle {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Send a command to the room. Fails with `NotFound` once the actor has
    /// shut down.
    pub async fn send(&self, command: RoomCommand) -> Result<(), GameError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| GameError::NotFound)
    }

    /// Send a command built around a fresh ack channel and wait for the
    /// engine's verdict.
    pub async fn request<F>(&self, build: F) -> Result<(), GameError>
    where
        F: FnOnce(super::messages::Ack) -> RoomCommand,
    {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await
            .map_err(|_| GameError::Internal("room actor dropped the request".to_string()))?
    }

    /// Read the current snapshot.
    pub async fn snapshot(&self) -> Result<Arc<Room>, GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Snapshot { respond: tx }).await?;
        rx.await
            .map_err(|_| GameError::Internal("room actor dropped the request".to_string()))
    }
}

/// The actor itself. Construct with [`RoomActor::new`] and drive it with
/// [`RoomActor::run`] on its own task.
pub struct RoomActor {
    room: Arc<Room>,
    inbox: mpsc::Receiver<RoomCommand>,
    store: Arc<dyn SnapshotStore>,
    subscribers: HashMap<PlayerId, mpsc::Sender<RoomUpdate>>,
    policy: RoomPolicy,
    closed: bool,
}

impl RoomActor {
    pub fn new(
        room: Room,
        store: Arc<dyn SnapshotStore>,
        policy: RoomPolicy,
    ) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let handle = RoomHandle {
            sender,
            room_id: room.id.clone(),
        };
        let actor = Self {
            room: Arc::new(room),
            inbox,
            store,
            subscribers: HashMap::new(),
            policy,
            closed: false,
        };
        (actor, handle)
    }

    /// Run the actor event loop until shutdown or until every handle is gone.
    pub async fn run(mut self) {
        log::info!("room {}: actor started", self.room.id);
        while let Some(command) = self.inbox.recv().await {
            self.handle_command(command).await;
            if self.closed {
                break;
            }
        }
        log::info!("room {}: actor stopped", self.room.id);
    }

    async fn handle_command(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join {
                player_id,
                name,
                emoji,
                respond,
            } => {
                let result = self
                    .apply(|room| engine::join(room, &player_id, &name, &emoji))
                    .await;
                let _ = respond.send(result);
            }
            RoomCommand::Leave { player_id, respond } => {
                let now = chrono::Utc::now().timestamp();
                let result = self.apply(|room| engine::leave(room, &player_id, now)).await;
                let _ = respond.send(result);
            }
            RoomCommand::Sit {
                player_id,
                seat,
                respond,
            } => {
                let result = self.apply(|room| engine::sit(room, &player_id, seat)).await;
                let _ = respond.send(result);
            }
            RoomCommand::Stand { player_id, respond } => {
                let result = self.apply(|room| engine::stand(room, &player_id)).await;
                let _ = respond.send(result);
            }
            RoomCommand::Ready {
                player_id,
                ready,
                respond,
            } => {
                let result = self
                    .apply(|room| engine::set_ready(room, &player_id, ready))
                    .await;
                let _ = respond.send(result);
            }
            RoomCommand::Action {
                player_id,
                action,
                amount,
                respond,
            } => {
                let result = self
                    .apply(|room| engine::take_action(room, &player_id, action, amount))
                    .await;
                let _ = respond.send(result);
            }
            RoomCommand::ProposeSettle {
                player_id,
                pot_winners,
                respond,
            } => {
                let result = self
                    .apply(|room| engine::propose_settlement(room, &player_id, pot_winners))
                    .await;
                let _ = respond.send(result);
            }
            RoomCommand::ConfirmSettle { player_id, respond } => {
                let result = self
                    .apply(|room| engine::confirm_settlement(room, &player_id))
                    .await;
                let _ = respond.send(result);
            }
            RoomCommand::RejectSettle { player_id, respond } => {
                let result = self
                    .apply(|room| engine::reject_settlement(room, &player_id))
                    .await;
                let _ = respond.send(result);
            }
            RoomCommand::Rebuy { player_id, respond } => {
                let result = self.apply(|room| engine::rebuy(room, &player_id)).await;
                let _ = respond.send(result);
            }
            RoomCommand::Cashout { player_id, respond } => {
                let result = self.apply(|room| engine::cashout(room, &player_id)).await;
                let _ = respond.send(result);
            }
            RoomCommand::EndGame { player_id, respond } => {
                let result = self.apply(|room| engine::end_game(room, &player_id)).await;
                let _ = respond.send(result);
            }
            RoomCommand::Subscribe {
                player_id,
                sender,
                respond,
            } => {
                log::debug!("room {}: {} subscribed", self.room.id, player_id);
                self.subscribers.insert(player_id, sender);
                let _ = respond.send(self.room.clone());
            }
            RoomCommand::Unsubscribe { player_id } => {
                log::debug!("room {}: {} unsubscribed", self.room.id, player_id);
                self.subscribers.remove(&player_id);
            }
            RoomCommand::SetConnected {
                player_id,
                connected,
            } => {
                let now = chrono::Utc::now().timestamp();
                let auto_fold = self.policy.auto_fold_disconnected;
                if let Err(e) = self
                    .apply(|room| engine::set_connected(room, &player_id, connected, now, auto_fold))
                    .await
                {
                    log::debug!(
                        "room {}: connection flag for {} not applied: {}",
                        self.room.id,
                        player_id,
                        e
                    );
                }
            }
            RoomCommand::Snapshot { respond } => {
                let _ = respond.send(self.room.clone());
            }
            RoomCommand::Shutdown { respond } => {
                self.closed = true;
                let _ = respond.send(());
            }
        }
    }

    /// Apply an engine transition to a clone of the snapshot, persist it,
    /// swap it in, and broadcast. Any failure leaves `self.room` untouched.
    async fn apply<F>(&mut self, transition: F) -> Result<(), GameError>
    where
        F: FnOnce(&mut Room) -> Result<Vec<GameEvent>, GameError>,
    {
        let mut next = (*self.room).clone();
        let events = transition(&mut next)?;
        let bytes = serde_json::to_vec(&next)
            .map_err(|e| GameError::Internal(format!("snapshot encode failed: {e}")))?;
        if let Err(e) = self.store.save(&next.id, &bytes).await {
            log::error!("room {}: snapshot save failed: {}", next.id, e);
            return Err(GameError::Internal(
                "failed to persist room state".to_string(),
            ));
        }
        self.room = Arc::new(next);
        self.broadcast(events).await;
        Ok(())
    }

    /// Push a state marker and then the transition's events to every
    /// subscriber, in order. Dead subscribers are dropped.
    async fn broadcast(&mut self, events: Vec<GameEvent>) {
        let mut updates = Vec::with_capacity(events.len() + 1);
        updates.push(RoomUpdate::State);
        updates.extend(events.into_iter().map(RoomUpdate::Event));

        for update in updates {
            let mut dead = Vec::new();
            for (player_id, sender) in &self.subscribers {
                if sender.send(update.clone()).await.is_err() {
                    dead.push(player_id.clone());
                }
            }
            for player_id in dead {
                log::debug!("room {}: dropping dead subscriber {}", self.room.id, player_id);
                self.subscribers.remove(&player_id);
            }
        }
    }
}

/// Capacity a session should give its update channel.
pub fn subscriber_channel() -> (mpsc::Sender<RoomUpdate>, mpsc::Receiver<RoomUpdate>) {
    mpsc::channel(SUBSCRIBER_CAPACITY)
}
