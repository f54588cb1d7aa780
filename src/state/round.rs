use super::pairing;
use super::room::Room;
use super::timer::TimerKind;
use crate::error::GameError;
use crate::protocol::{PairSummary, ServerMessage};
use crate::questions::{QuestionBank, QuestionError};
use crate::types::*;

impl Room {
    /// Pair up the current players and open the answering phase.
    ///
    /// Pairing and prompt selection happen before any state changes, so a
    /// failed start leaves the room as it was.
    pub(crate) fn start_round(&mut self, questions: &QuestionBank) -> Result<(), GameError> {
        let players = self.player_ids();
        let groups = pairing::pair_up(&mut self.rng, &players)?;

        let mut pairs = Vec::with_capacity(groups.len());
        for members in groups {
            let mut picked = questions.sample(&mut self.rng, 2)?.into_iter();
            let (Some(first), Some(second)) = (picked.next(), picked.next()) else {
                return Err(QuestionError::TooFew {
                    needed: 2,
                    available: questions.len(),
                }
                .into());
            };
            pairs.push(Pair::new(members, [first, second]));
        }

        self.disarm_timer(TimerKind::NextRound);
        self.round += 1;
        self.phase = RoomPhase::Answering;

        let round = RoundData::new(pairs);
        tracing::info!(
            "Room {} round {}/{} started with {} pairs, expecting {} answers",
            self.id,
            self.round,
            self.total_rounds,
            round.pairs.len(),
            round.total_expected_answers
        );

        for (pair_index, pair) in round.pairs.iter().enumerate() {
            for member in &pair.members {
                self.send(
                    *member,
                    ServerMessage::ShowQuestion {
                        pair_index,
                        q_index: PromptIndex::First,
                        question: pair.prompt(PromptIndex::First).to_string(),
                    },
                );
            }
        }

        let summaries = round
            .pairs
            .iter()
            .enumerate()
            .map(|(pair_index, pair)| PairSummary {
                pair_index,
                members: pair.members.clone(),
            })
            .collect();

        self.round_data = Some(round);
        self.arm_timer(TimerKind::Round, self.config.round_duration);
        self.broadcast(ServerMessage::RoundStarted {
            round: self.round,
            pairs: summaries,
            total_rounds: self.total_rounds,
        });
        Ok(())
    }

    /// Record a pair member's answer. Finishing prompt 0 reveals prompt 1 to
    /// that pair; the last expected answer ends the phase early.
    pub fn submit_answer(
        &mut self,
        from: PlayerId,
        pair_index: usize,
        prompt: PromptIndex,
        text: &str,
    ) -> Result<(), GameError> {
        let phase = self.phase;
        if phase != RoomPhase::Answering {
            return Err(GameError::WrongPhase(phase));
        }
        let round = self
            .round_data
            .as_mut()
            .ok_or(GameError::WrongPhase(phase))?;
        let pair = round
            .pairs
            .get_mut(pair_index)
            .ok_or(GameError::UnknownPair(pair_index))?;

        if !pair.is_member(from) {
            return Err(GameError::NotPairMember(pair_index));
        }
        if pair.answer_of(prompt, from).is_some() {
            return Err(GameError::DuplicateAnswer);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(GameError::EmptyAnswer);
        }

        pair.first_answer_at.get_or_insert_with(chrono::Utc::now);
        pair.answers[prompt.as_usize()].push(Answer {
            player_id: from,
            text: text.to_string(),
        });
        round.answers_count += 1;

        let reveal = (prompt == PromptIndex::First
            && pair.answers(PromptIndex::First).len() == pair.needed_answerers())
        .then(|| {
            (
                pair.members.clone(),
                pair.prompt(PromptIndex::Second).to_string(),
            )
        });
        let complete = round.answers_count >= round.total_expected_answers;

        tracing::debug!(
            "Room {}: answer {}/{} from {}",
            self.id,
            round.answers_count,
            round.total_expected_answers,
            from
        );

        if let Some((members, question)) = reveal {
            for member in members {
                self.send(
                    member,
                    ServerMessage::ShowQuestion {
                        pair_index,
                        q_index: PromptIndex::Second,
                        question: question.clone(),
                    },
                );
            }
        }

        if complete {
            self.disarm_timer(TimerKind::Round);
            self.start_voting();
        }
        Ok(())
    }
}
