use crate::questions::QuestionError;
use crate::types::{RoomId, RoomPhase};

/// Why a client request was dropped. None of these reach the client; the
/// dispatcher only logs them.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("connection has not joined room {0}")]
    NotInRoom(RoomId),

    #[error("room id and player name must not be blank")]
    InvalidJoin,

    #[error("only the host can {0}")]
    NotHost(&'static str),

    #[error("not allowed during {0:?}")]
    WrongPhase(RoomPhase),

    #[error("all {0} rounds have been played")]
    GameOver(u32),

    #[error("need at least 2 players, have {0}")]
    NotEnoughPlayers(usize),

    #[error("pair {0} does not exist")]
    UnknownPair(usize),

    #[error("player is not a member of pair {0}")]
    NotPairMember(usize),

    #[error("answer already submitted for this prompt")]
    DuplicateAnswer,

    #[error("answer is empty")]
    EmptyAnswer,

    #[error("pair members cannot vote on their own answers")]
    OwnPair,

    #[error("player was not in the room when this step opened")]
    NotEligible,

    #[error("voting step is not open")]
    StepNotOpen,

    #[error("vote already cast for this step")]
    DuplicateVote,

    #[error("target has no answer for this prompt")]
    NoSuchAnswer,

    #[error(transparent)]
    Questions(#[from] QuestionError),
}
