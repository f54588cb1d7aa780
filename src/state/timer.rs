use std::collections::HashMap;

/// The scheduled transitions a room can have pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Ends the answering phase
    Round,
    /// Closes the open voting step
    VoteStep,
    /// Starts the next round after results
    NextRound,
}

/// Armed timer tokens per kind.
///
/// A timer task carries the token it was armed with and only acts if that
/// token is still armed when it fires. Disarming (or re-arming) invalidates
/// any task already in flight.
#[derive(Debug, Default)]
pub struct TimerSlots {
    next_token: u64,
    armed: HashMap<TimerKind, u64>,
}

impl TimerSlots {
    /// Arm `kind`, replacing whatever was armed before
    pub fn arm(&mut self, kind: TimerKind) -> u64 {
        self.next_token += 1;
        self.armed.insert(kind, self.next_token);
        self.next_token
    }

    /// Returns whether something was armed
    pub fn disarm(&mut self, kind: TimerKind) -> bool {
        self.armed.remove(&kind).is_some()
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains_key(&kind)
    }

    /// Claim a firing. True exactly once per armed token.
    pub fn fire(&mut self, kind: TimerKind, token: u64) -> bool {
        if self.armed.get(&kind) == Some(&token) {
            self.armed.remove(&kind);
            true
        } else {
            false
        }
    }

    pub fn any_armed(&self) -> bool {
        !self.armed.is_empty()
    }

    pub fn clear(&mut self) {
        self.armed.clear();
    }
}
