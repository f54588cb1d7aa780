use super::room::Room;
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashMap;

/// Cumulative reaction counters per player, kept for the whole game.
/// Players keep their counters after leaving.
#[derive(Debug, Clone, Default)]
pub struct ScoreLedger {
    counters: HashMap<PlayerId, ScoreCounters>,
}

impl ScoreLedger {
    pub fn ensure(&mut self, id: PlayerId) {
        self.counters.entry(id).or_default();
    }

    pub fn record(&mut self, target: PlayerId, reaction: Reaction) {
        self.counters.entry(target).or_default().bump(reaction);
    }

    pub fn get(&self, id: PlayerId) -> ScoreCounters {
        self.counters.get(&id).copied().unwrap_or_default()
    }
}

/// Rank current players: most laughs first, then most neutrals, then fewest
/// negatives. Ties keep join order.
pub fn leaderboard(players: &[Player], scores: &ScoreLedger) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = players
        .iter()
        .map(|p| {
            let s = scores.get(p.id);
            LeaderboardEntry {
                player_id: p.id,
                name: p.name.clone(),
                laugh: s.laugh,
                neutral: s.neutral,
                negative: s.negative,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.laugh
            .cmp(&a.laugh)
            .then(b.neutral.cmp(&a.neutral))
            .then(a.negative.cmp(&b.negative))
    });
    entries
}

impl Room {
    /// Add the votes of one step to the counters and publish them
    pub(crate) fn tally_step(&mut self, cursor: StepCursor) {
        let votes = self
            .round_data
            .as_ref()
            .and_then(|r| r.votes_at(cursor))
            .cloned()
            .unwrap_or_default();

        for vote in votes.values() {
            self.scores.record(vote.target_player_id, vote.emoji);
        }
        tracing::debug!(
            "Tallied {} votes for pair {} prompt {} in room {}",
            votes.len(),
            cursor.pair_index,
            cursor.prompt.as_usize(),
            self.id
        );

        self.broadcast(ServerMessage::VotingStepTally {
            pair_index: cursor.pair_index,
            q_index: cursor.prompt,
            votes,
        });
    }
}
