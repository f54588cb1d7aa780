use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::{PlayerId, RoomId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

/// Outbound queue of one websocket connection
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

/// Message delivery to connections and room groups.
///
/// Send failures mean the connection is going away; its disconnect will
/// clean up, so they are ignored here.
#[derive(Default)]
pub struct Hub {
    connections: RwLock<HashMap<PlayerId, ClientSender>>,
    groups: RwLock<HashMap<RoomId, HashSet<PlayerId>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and get the receiving end of its queue
    pub async fn register(&self, id: PlayerId) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.write().await.insert(id, tx);
        rx
    }

    pub async fn unregister(&self, id: PlayerId) {
        self.connections.write().await.remove(&id);
    }

    pub async fn join(&self, id: PlayerId, room_id: &RoomId) {
        self.groups
            .write()
            .await
            .entry(room_id.clone())
            .or_default()
            .insert(id);
    }

    pub async fn leave(&self, id: PlayerId, room_id: &RoomId) {
        let mut groups = self.groups.write().await;
        if let Some(members) = groups.get_mut(room_id) {
            members.remove(&id);
            if members.is_empty() {
                groups.remove(room_id);
            }
        }
    }

    pub async fn drop_room(&self, room_id: &RoomId) {
        self.groups.write().await.remove(room_id);
    }

    pub async fn send_to(&self, id: PlayerId, msg: ServerMessage) {
        if let Some(tx) = self.connections.read().await.get(&id) {
            let _ = tx.send(msg);
        }
    }

    pub async fn broadcast_to_room(&self, room_id: &RoomId, msg: ServerMessage) {
        let groups = self.groups.read().await;
        let Some(members) = groups.get(room_id) else {
            return;
        };

        let connections = self.connections.read().await;
        for id in members {
            if let Some(tx) = connections.get(id) {
                let _ = tx.send(msg.clone());
            }
        }
    }
}

/// Spawn a background task that evicts idle rooms
pub fn spawn_room_sweeper(state: Arc<AppState>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let evicted = state.sweep_idle_rooms().await;
            if evicted > 0 {
                tracing::info!(
                    "Evicted {} idle rooms, {} remaining",
                    evicted,
                    state.room_count().await
                );
            }
        }
    });
}
