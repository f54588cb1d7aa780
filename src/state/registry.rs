use super::room::Room;
use crate::config::RoomsConfig;
use crate::types::{PlayerId, RoomId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Decides when a room is removed from the registry
pub trait EvictionPolicy: Send + Sync {
    fn should_evict(&self, room: &Room, now: Instant) -> bool;
}

/// Evict rooms nobody has acted in for `max_idle`. A room with a pending
/// timer is mid-game and never counts as idle.
#[derive(Debug, Clone)]
pub struct IdleTimeout {
    pub max_idle: Duration,
}

impl Default for IdleTimeout {
    fn default() -> Self {
        Self {
            max_idle: RoomsConfig::default().idle_timeout,
        }
    }
}

impl EvictionPolicy for IdleTimeout {
    fn should_evict(&self, room: &Room, now: Instant) -> bool {
        !room.timers.any_armed()
            && now.saturating_duration_since(room.last_activity) >= self.max_idle
    }
}

/// All live rooms, plus which room each connection is in.
///
/// Lock order is registry, then room. Nothing holding a room lock may
/// touch the registry.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Arc<Mutex<Room>>>,
    connections: HashMap<PlayerId, RoomId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &RoomId) -> Option<Arc<Mutex<Room>>> {
        self.rooms.get(id).cloned()
    }

    pub fn get_or_create(
        &mut self,
        id: &RoomId,
        create: impl FnOnce() -> Room,
    ) -> Arc<Mutex<Room>> {
        self.rooms
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(create())))
            .clone()
    }

    pub fn room_of(&self, conn: PlayerId) -> Option<&RoomId> {
        self.connections.get(&conn)
    }

    /// Returns the room the connection was bound to before
    pub fn bind(&mut self, conn: PlayerId, room: RoomId) -> Option<RoomId> {
        self.connections.insert(conn, room)
    }

    pub fn unbind(&mut self, conn: PlayerId) -> Option<RoomId> {
        self.connections.remove(&conn)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Remove every room the policy selects, cancelling its timers. Rooms
    /// that are busy right now are skipped until the next sweep.
    pub fn evict(&mut self, policy: &dyn EvictionPolicy, now: Instant) -> Vec<RoomId> {
        let mut evicted = Vec::new();
        self.rooms.retain(|id, room| {
            let Ok(mut room) = room.try_lock() else {
                return true;
            };
            if !policy.should_evict(&room, now) {
                return true;
            }
            room.cancel_timers();
            evicted.push(id.clone());
            false
        });
        self.connections
            .retain(|_, room_id| !evicted.contains(room_id));
        evicted
    }
}
