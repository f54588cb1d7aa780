mod pairing;
mod registry;
mod room;
mod round;
mod score;
mod timer;
mod vote;

pub use pairing::pair_up;
pub use registry::{EvictionPolicy, IdleTimeout, RoomRegistry};
pub use room::{Effect, Room};
pub use score::{leaderboard, ScoreLedger};
pub use timer::TimerKind;

use crate::broadcast::Hub;
use crate::error::GameError;
use crate::questions::QuestionBank;
use crate::types::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<RoomRegistry>>,
    pub hub: Arc<Hub>,
    pub questions: Arc<QuestionBank>,
    pub config: GameConfig,
    eviction: Arc<dyn EvictionPolicy>,
}

impl AppState {
    pub fn new(config: GameConfig, questions: QuestionBank) -> Self {
        Self {
            registry: Arc::new(RwLock::new(RoomRegistry::new())),
            hub: Arc::new(Hub::new()),
            questions: Arc::new(questions),
            config,
            eviction: Arc::new(IdleTimeout::default()),
        }
    }

    pub fn with_eviction(mut self, policy: impl EvictionPolicy + 'static) -> Self {
        self.eviction = Arc::new(policy);
        self
    }

    pub async fn room(&self, id: &RoomId) -> Option<Arc<Mutex<Room>>> {
        self.registry.read().await.get(id)
    }

    pub async fn room_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Put a connection into a room, creating the room on first use. A
    /// connection already in another room leaves that one first.
    pub async fn join_room(
        &self,
        conn: PlayerId,
        room_id: RoomId,
        player_name: &str,
    ) -> Result<(), GameError> {
        let name = player_name.trim();
        let room_id = RoomId::new(room_id.as_str().trim());
        if room_id.as_str().is_empty() || name.is_empty() {
            return Err(GameError::InvalidJoin);
        }

        let previous = self.registry.read().await.room_of(conn).cloned();
        if let Some(previous) = previous.filter(|p| *p != room_id) {
            self.registry.write().await.unbind(conn);
            self.remove_from_room(conn, &previous).await;
        }

        let mut room = {
            let mut registry = self.registry.write().await;
            let room = registry.get_or_create(&room_id, || {
                tracing::info!("Created room {}", room_id);
                Room::new(room_id.clone(), self.config.clone())
            });
            registry.bind(conn, room_id.clone());
            room.lock_owned().await
        };

        self.hub.join(conn, &room_id).await;
        room.join(conn, name.to_string());
        room.touch();
        self.flush(&mut room).await;
        Ok(())
    }

    pub async fn start_game(&self, conn: PlayerId, room_id: &RoomId) -> Result<(), GameError> {
        self.with_member_room(conn, room_id, |room, questions| {
            room.start_game(conn, questions)
        })
        .await
    }

    pub async fn next_round(&self, conn: PlayerId, room_id: &RoomId) -> Result<(), GameError> {
        self.with_member_room(conn, room_id, |room, questions| {
            room.next_round(conn, questions)
        })
        .await
    }

    pub async fn submit_answer(
        &self,
        conn: PlayerId,
        room_id: &RoomId,
        pair_index: usize,
        prompt: PromptIndex,
        answer: &str,
    ) -> Result<(), GameError> {
        self.with_member_room(conn, room_id, |room, _| {
            room.submit_answer(conn, pair_index, prompt, answer)
        })
        .await
    }

    pub async fn submit_vote(
        &self,
        conn: PlayerId,
        room_id: &RoomId,
        pair_index: usize,
        prompt: PromptIndex,
        target: PlayerId,
        emoji: Reaction,
    ) -> Result<(), GameError> {
        self.with_member_room(conn, room_id, |room, _| {
            room.submit_vote(conn, pair_index, prompt, target, emoji)
        })
        .await
    }

    /// Connection closed: drop it from the hub and from its room
    pub async fn disconnect(&self, conn: PlayerId) {
        self.hub.unregister(conn).await;
        let room_id = self.registry.write().await.unbind(conn);
        if let Some(room_id) = room_id {
            self.remove_from_room(conn, &room_id).await;
        }
    }

    /// Remove idle rooms. Returns how many were evicted.
    pub async fn sweep_idle_rooms(&self) -> usize {
        let evicted = self
            .registry
            .write()
            .await
            .evict(self.eviction.as_ref(), Instant::now());

        for room_id in &evicted {
            tracing::info!("Evicting idle room {}", room_id);
            self.hub.drop_room(room_id).await;
        }
        evicted.len()
    }

    async fn remove_from_room(&self, conn: PlayerId, room_id: &RoomId) {
        self.hub.leave(conn, room_id).await;
        let Some(room) = self.room(room_id).await else {
            return;
        };
        let mut room = room.lock().await;
        if room.leave(conn) {
            room.touch();
        }
        self.flush(&mut room).await;
    }

    /// Run one transition on a room the connection belongs to
    async fn with_member_room<T>(
        &self,
        conn: PlayerId,
        room_id: &RoomId,
        op: impl FnOnce(&mut Room, &QuestionBank) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let room = {
            let registry = self.registry.read().await;
            if registry.room_of(conn) != Some(room_id) {
                return Err(GameError::NotInRoom(room_id.clone()));
            }
            registry
                .get(room_id)
                .ok_or_else(|| GameError::RoomNotFound(room_id.clone()))?
        };

        let mut room = room.lock().await;
        let result = op(&mut *room, self.questions.as_ref());
        if result.is_ok() {
            room.touch();
        }
        self.flush(&mut room).await;
        result
    }

    async fn fire_timer(&self, room_id: &RoomId, kind: TimerKind, token: u64) {
        let Some(room) = self.room(room_id).await else {
            return;
        };
        let mut room = room.lock().await;
        if room.fire_timer(kind, token, &self.questions) {
            // This task is the handle's owner and is about to finish
            room.timer_handles.remove(&kind);
            room.touch();
        }
        self.flush(&mut room).await;
    }

    /// Deliver a room's pending effects. Called with the room lock held so
    /// messages leave in transition order.
    async fn flush(&self, room: &mut Room) {
        for effect in room.drain_effects() {
            match effect {
                Effect::Broadcast(msg) => self.hub.broadcast_to_room(&room.id, msg).await,
                Effect::Send(to, msg) => self.hub.send_to(to, msg).await,
                Effect::ArmTimer { kind, token, after } => {
                    let handle = self.spawn_timer(room.id.clone(), kind, token, after);
                    if let Some(old) = room.timer_handles.insert(kind, handle) {
                        old.abort();
                    }
                }
                Effect::DisarmTimer(kind) => {
                    if let Some(handle) = room.timer_handles.remove(&kind) {
                        handle.abort();
                    }
                }
            }
        }
    }

    fn spawn_timer(&self, room_id: RoomId, kind: TimerKind, token: u64, after: Duration) -> AbortHandle {
        let state = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            state.fire_timer(&room_id, kind, token).await;
        })
        .abort_handle()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(GameConfig::default(), QuestionBank::fallback())
    }
}
