use super::score::ScoreLedger;
use super::timer::{TimerKind, TimerSlots};
use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::questions::QuestionBank;
use crate::types::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// Side effects produced by a room transition. `AppState` delivers them
/// while still holding the room lock, so they go out in transition order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Broadcast(ServerMessage),
    Send(PlayerId, ServerMessage),
    ArmTimer {
        kind: TimerKind,
        token: u64,
        after: Duration,
    },
    DisarmTimer(TimerKind),
}

/// One game instance.
///
/// All mutation goes through `&mut self` methods, which the caller runs
/// under the room's mutex. Each method is one complete transition.
pub struct Room {
    pub id: RoomId,
    /// In join order; the first one inherits the host role
    pub players: Vec<Player>,
    /// None only while the room is empty
    pub host_id: Option<PlayerId>,
    pub round: u32,
    pub total_rounds: u32,
    pub scores: ScoreLedger,
    pub phase: RoomPhase,
    /// Present from the first round on. Read-only once in Results.
    pub round_data: Option<RoundData>,
    pub last_activity: Instant,
    pub(crate) config: GameConfig,
    pub(crate) timers: TimerSlots,
    pub(crate) timer_handles: HashMap<TimerKind, AbortHandle>,
    pub(crate) rng: StdRng,
    effects: Vec<Effect>,
}

impl Room {
    pub fn new(id: RoomId, config: GameConfig) -> Self {
        Self::with_rng(id, config, StdRng::from_os_rng())
    }

    pub fn with_rng(id: RoomId, config: GameConfig, rng: StdRng) -> Self {
        Self {
            id,
            players: Vec::new(),
            host_id: None,
            round: 0,
            total_rounds: config.total_rounds,
            scores: ScoreLedger::default(),
            phase: RoomPhase::Lobby,
            round_data: None,
            last_activity: Instant::now(),
            config,
            timers: TimerSlots::default(),
            timer_handles: HashMap::new(),
            rng,
            effects: Vec::new(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn has_player(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    pub fn voting_cursor(&self) -> Option<StepCursor> {
        self.round_data.as_ref().map(|r| r.voting_cursor)
    }

    pub fn is_timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_armed(kind)
    }

    /// Add a player. Joining twice on the same connection only re-sends the
    /// room snapshot.
    pub fn join(&mut self, id: PlayerId, name: String) {
        if !self.has_player(id) {
            tracing::info!("Player {} ({}) joined room {}", name, id, self.id);
            self.players.push(Player { id, name });
            self.scores.ensure(id);
        }
        if self.host_id.is_none() {
            self.host_id = Some(id);
        }

        self.broadcast(ServerMessage::RoomJoined {
            room_id: self.id.clone(),
            players: self.players.clone(),
            host_id: self.host_id,
            round: self.round,
            state: self.phase,
        });
        self.broadcast(ServerMessage::PlayerListUpdate {
            players: self.players.clone(),
        });
    }

    /// Remove a player, handing the host role to the first remaining player.
    /// Pair memberships of the running round are left untouched.
    pub fn leave(&mut self, id: PlayerId) -> bool {
        let Some(index) = self.players.iter().position(|p| p.id == id) else {
            return false;
        };
        let player = self.players.remove(index);
        tracing::info!("Player {} ({}) left room {}", player.name, id, self.id);

        self.broadcast(ServerMessage::PlayerListUpdate {
            players: self.players.clone(),
        });

        if self.host_id == Some(id) {
            self.host_id = self.players.first().map(|p| p.id);
            match self.host_id {
                Some(host_id) => {
                    tracing::info!("Host of room {} is now {}", self.id, host_id);
                    self.broadcast(ServerMessage::HostChanged { host_id });
                }
                None => tracing::info!("Room {} is empty", self.id),
            }
        }
        true
    }

    fn require_host(&self, id: PlayerId, action: &'static str) -> Result<(), GameError> {
        if self.host_id == Some(id) {
            Ok(())
        } else {
            Err(GameError::NotHost(action))
        }
    }

    pub fn start_game(&mut self, by: PlayerId, questions: &QuestionBank) -> Result<(), GameError> {
        self.require_host(by, "start the game")?;
        if self.phase != RoomPhase::Lobby {
            return Err(GameError::WrongPhase(self.phase));
        }
        self.start_round(questions)
    }

    /// Start the next round right away instead of waiting for the delay
    pub fn next_round(&mut self, by: PlayerId, questions: &QuestionBank) -> Result<(), GameError> {
        self.require_host(by, "start the next round")?;
        if self.round >= self.total_rounds {
            return Err(GameError::GameOver(self.total_rounds));
        }
        if self.phase != RoomPhase::Results {
            return Err(GameError::WrongPhase(self.phase));
        }
        self.start_round(questions)
    }

    /// Apply a timer firing. Returns false for stale tokens, which are
    /// ignored.
    pub fn fire_timer(&mut self, kind: TimerKind, token: u64, questions: &QuestionBank) -> bool {
        if !self.timers.fire(kind, token) {
            return false;
        }

        match kind {
            TimerKind::Round => {
                tracing::info!("Round {} timer expired in room {}", self.round, self.id);
                if self.phase == RoomPhase::Answering {
                    self.start_voting();
                }
            }
            TimerKind::VoteStep => {
                tracing::info!("Voting step timed out in room {}", self.id);
                if self.phase == RoomPhase::Voting {
                    self.close_open_step();
                    self.emit_voting_step();
                }
            }
            TimerKind::NextRound if self.phase == RoomPhase::Results => {
                if let Err(e) = self.start_round(questions) {
                    tracing::warn!("Could not start next round in room {}: {}", self.id, e);
                }
            }
            TimerKind::NextRound => {}
        }
        true
    }

    /// Stop everything scheduled for this room
    pub fn cancel_timers(&mut self) {
        self.timers.clear();
        for (_, handle) in self.timer_handles.drain() {
            handle.abort();
        }
    }

    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub(crate) fn broadcast(&mut self, msg: ServerMessage) {
        self.effects.push(Effect::Broadcast(msg));
    }

    pub(crate) fn send(&mut self, to: PlayerId, msg: ServerMessage) {
        self.effects.push(Effect::Send(to, msg));
    }

    pub(crate) fn arm_timer(&mut self, kind: TimerKind, after: Duration) {
        let token = self.timers.arm(kind);
        self.effects.push(Effect::ArmTimer { kind, token, after });
    }

    pub(crate) fn disarm_timer(&mut self, kind: TimerKind) {
        if self.timers.disarm(kind) {
            self.effects.push(Effect::DisarmTimer(kind));
        }
    }
}

/// Name shown for a player id; players who already left show their id
pub(crate) fn display_name(players: &[Player], id: PlayerId) -> String {
    players
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| id.to_string())
}
