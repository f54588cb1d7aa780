use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Transient per-connection identifier. A player is identified by the
/// connection it joined on, so this doubles as the player id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(ulid::Ulid);

impl PlayerId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-chosen room name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    Lobby,
    Answering,
    Voting,
    Results,
}

/// The three reactions a voter can give an answer. They double as the
/// score counter buckets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Reaction {
    #[serde(rename = "😂")]
    Laugh,
    #[serde(rename = "🙂")]
    Neutral,
    #[serde(rename = "💩")]
    Negative,
}

/// Which of the two prompts of a pair is addressed. Travels as `0` or `1`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum PromptIndex {
    First,
    Second,
}

impl PromptIndex {
    pub const ALL: [PromptIndex; 2] = [PromptIndex::First, PromptIndex::Second];

    pub fn as_usize(self) -> usize {
        match self {
            PromptIndex::First => 0,
            PromptIndex::Second => 1,
        }
    }
}

impl TryFrom<u8> for PromptIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PromptIndex::First),
            1 => Ok(PromptIndex::Second),
            other => Err(format!("prompt index must be 0 or 1, got {}", other)),
        }
    }
}

impl From<PromptIndex> for u8 {
    fn from(index: PromptIndex) -> Self {
        index.as_usize() as u8
    }
}

/// Position of the voting phase: one (pair, prompt) step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct StepCursor {
    pub pair_index: usize,
    pub prompt: PromptIndex,
}

impl StepCursor {
    pub fn start() -> Self {
        Self {
            pair_index: 0,
            prompt: PromptIndex::First,
        }
    }

    /// Prompt 0 -> 1 within a pair, then prompt 0 of the next pair.
    pub fn advance(&mut self) {
        match self.prompt {
            PromptIndex::First => self.prompt = PromptIndex::Second,
            PromptIndex::Second => {
                self.prompt = PromptIndex::First;
                self.pair_index += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub player_id: PlayerId,
    pub text: String,
}

/// Two (rarely three) players answering the same two prompts in a round.
#[derive(Debug, Clone)]
pub struct Pair {
    pub members: Vec<PlayerId>,
    pub prompts: [String; 2],
    /// Accepted answers per prompt, in submission order
    pub answers: [Vec<Answer>; 2],
    pub first_answer_at: Option<DateTime<Utc>>,
}

impl Pair {
    pub fn new(members: Vec<PlayerId>, prompts: [String; 2]) -> Self {
        Self {
            members,
            prompts,
            answers: [Vec::new(), Vec::new()],
            first_answer_at: None,
        }
    }

    pub fn is_member(&self, id: PlayerId) -> bool {
        self.members.contains(&id)
    }

    pub fn prompt(&self, index: PromptIndex) -> &str {
        &self.prompts[index.as_usize()]
    }

    pub fn answers(&self, index: PromptIndex) -> &[Answer] {
        &self.answers[index.as_usize()]
    }

    pub fn answer_of(&self, index: PromptIndex, id: PlayerId) -> Option<&Answer> {
        self.answers(index).iter().find(|a| a.player_id == id)
    }

    /// Answerers per prompt needed before the pair counts as done with it.
    /// A triad still only needs two.
    pub fn needed_answerers(&self) -> usize {
        self.members.len().min(2)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub target_player_id: PlayerId,
    pub emoji: Reaction,
}

/// The step currently accepting votes, with the voters it waits for.
#[derive(Debug, Clone)]
pub struct OpenStep {
    pub cursor: StepCursor,
    pub eligible_voters: Vec<PlayerId>,
}

/// Everything belonging to one round. Replaced wholesale when the next
/// round starts.
#[derive(Debug, Clone)]
pub struct RoundData {
    pub pairs: Vec<Pair>,
    pub answers_count: usize,
    pub total_expected_answers: usize,
    pub voting_cursor: StepCursor,
    pub votes: HashMap<StepCursor, HashMap<PlayerId, Vote>>,
    pub open_step: Option<OpenStep>,
}

impl RoundData {
    pub fn new(pairs: Vec<Pair>) -> Self {
        let total_expected_answers = pairs.iter().map(|p| 2 * p.needed_answerers()).sum();
        Self {
            pairs,
            answers_count: 0,
            total_expected_answers,
            voting_cursor: StepCursor::start(),
            votes: HashMap::new(),
            open_step: None,
        }
    }

    pub fn votes_at(&self, cursor: StepCursor) -> Option<&HashMap<PlayerId, Vote>> {
        self.votes.get(&cursor)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreCounters {
    pub laugh: u32,
    pub neutral: u32,
    pub negative: u32,
}

impl ScoreCounters {
    pub fn bump(&mut self, reaction: Reaction) {
        match reaction {
            Reaction::Laugh => self.laugh += 1,
            Reaction::Neutral => self.neutral += 1,
            Reaction::Negative => self.negative += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub laugh: u32,
    pub neutral: u32,
    pub negative: u32,
}

/// Timings and length of a game
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub round_duration: Duration,
    pub vote_step_timeout: Duration,
    pub next_round_delay: Duration,
    pub total_rounds: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_duration: Duration::from_millis(60_000),
            vote_step_timeout: Duration::from_millis(30_000),
            next_round_delay: Duration::from_millis(5_000),
            total_rounds: 3,
        }
    }
}
