use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    JoinRoom {
        room_id: RoomId,
        player_name: String,
    },
    /// Host only
    StartGame {
        room_id: RoomId,
    },
    SubmitAnswer {
        room_id: RoomId,
        pair_index: usize,
        q_index: PromptIndex,
        answer: String,
    },
    SubmitVote {
        room_id: RoomId,
        pair_index: usize,
        q_index: PromptIndex,
        target_player_id: PlayerId,
        emoji: Reaction,
    },
    /// Host only, skips the wait between rounds
    NextRound {
        room_id: RoomId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// First message on every connection
    Welcome {
        connection_id: PlayerId,
        server_now: String,
    },
    RoomJoined {
        room_id: RoomId,
        players: Vec<Player>,
        host_id: Option<PlayerId>,
        round: u32,
        state: RoomPhase,
    },
    PlayerListUpdate {
        players: Vec<Player>,
    },
    HostChanged {
        host_id: PlayerId,
    },
    RoundStarted {
        round: u32,
        pairs: Vec<PairSummary>,
        total_rounds: u32,
    },
    /// Sent only to the members of the pair
    ShowQuestion {
        pair_index: usize,
        q_index: PromptIndex,
        question: String,
    },
    VotingPhaseStarted,
    VotingStep {
        pair_index: usize,
        q_index: PromptIndex,
        question: String,
        answers: Vec<StepAnswer>,
        eligible_voters: Vec<PlayerId>,
    },
    /// Raw votes of a finished step, keyed by voter
    VotingStepTally {
        pair_index: usize,
        q_index: PromptIndex,
        votes: HashMap<PlayerId, Vote>,
    },
    RoundResults {
        round: u32,
        leaderboard: Vec<LeaderboardEntry>,
        total_rounds: u32,
    },
    GameFinished {
        leaderboard: Vec<LeaderboardEntry>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PairSummary {
    pub pair_index: usize,
    pub members: Vec<PlayerId>,
}

/// One answer as shown to voters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepAnswer {
    pub player_id: PlayerId,
    pub player_name: String,
    pub answer: String,
}
