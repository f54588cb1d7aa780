use super::room::{display_name, Room};
use super::score::leaderboard;
use super::timer::TimerKind;
use crate::error::GameError;
use crate::protocol::{ServerMessage, StepAnswer};
use crate::types::*;

impl Room {
    pub(crate) fn start_voting(&mut self) {
        let Some(round) = self.round_data.as_mut() else {
            return;
        };
        round.voting_cursor = StepCursor::start();
        round.open_step = None;
        self.phase = RoomPhase::Voting;
        tracing::info!(
            "Room {} round {} voting started ({}/{} answers)",
            self.id,
            self.round,
            round.answers_count,
            round.total_expected_answers
        );

        self.broadcast(ServerMessage::VotingPhaseStarted);
        self.emit_voting_step();
    }

    /// Open the step under the cursor, skipping steps with fewer than two
    /// answers. Past the last pair the round is finished.
    pub(crate) fn emit_voting_step(&mut self) {
        loop {
            let Some(round) = self.round_data.as_mut() else {
                return;
            };
            let cursor = round.voting_cursor;
            if cursor.pair_index >= round.pairs.len() {
                self.finish_round();
                return;
            }

            let pair = &round.pairs[cursor.pair_index];
            if pair.answers(cursor.prompt).len() < 2 {
                tracing::debug!(
                    "Room {}: skipping pair {} prompt {}",
                    self.id,
                    cursor.pair_index,
                    cursor.prompt.as_usize()
                );
                round.voting_cursor.advance();
                continue;
            }

            let eligible_voters: Vec<PlayerId> = self
                .players
                .iter()
                .map(|p| p.id)
                .filter(|id| !pair.is_member(*id))
                .collect();
            let answers: Vec<StepAnswer> = pair
                .answers(cursor.prompt)
                .iter()
                .map(|a| StepAnswer {
                    player_id: a.player_id,
                    player_name: display_name(&self.players, a.player_id),
                    answer: a.text.clone(),
                })
                .collect();
            let question = pair.prompt(cursor.prompt).to_string();

            round.open_step = Some(OpenStep {
                cursor,
                eligible_voters: eligible_voters.clone(),
            });

            self.broadcast(ServerMessage::VotingStep {
                pair_index: cursor.pair_index,
                q_index: cursor.prompt,
                question,
                answers,
                eligible_voters,
            });
            self.arm_timer(TimerKind::VoteStep, self.config.vote_step_timeout);
            return;
        }
    }

    /// Record a reaction on the open step. The last eligible vote closes the
    /// step without waiting for its timer.
    pub fn submit_vote(
        &mut self,
        voter: PlayerId,
        pair_index: usize,
        prompt: PromptIndex,
        target: PlayerId,
        emoji: Reaction,
    ) -> Result<(), GameError> {
        let phase = self.phase;
        if phase != RoomPhase::Voting {
            return Err(GameError::WrongPhase(phase));
        }
        let round = self
            .round_data
            .as_mut()
            .ok_or(GameError::WrongPhase(phase))?;
        let pair = round
            .pairs
            .get(pair_index)
            .ok_or(GameError::UnknownPair(pair_index))?;
        if pair.is_member(voter) {
            return Err(GameError::OwnPair);
        }

        let cursor = StepCursor { pair_index, prompt };
        let open = round
            .open_step
            .as_ref()
            .filter(|s| s.cursor == cursor)
            .ok_or(GameError::StepNotOpen)?;
        if !open.eligible_voters.contains(&voter) {
            return Err(GameError::NotEligible);
        }
        let needed = open.eligible_voters.len();

        if round
            .votes_at(cursor)
            .is_some_and(|votes| votes.contains_key(&voter))
        {
            return Err(GameError::DuplicateVote);
        }
        if pair.answer_of(prompt, target).is_none() {
            return Err(GameError::NoSuchAnswer);
        }

        let votes = round.votes.entry(cursor).or_default();
        votes.insert(
            voter,
            Vote {
                target_player_id: target,
                emoji,
            },
        );
        let complete = votes.len() >= needed;
        tracing::debug!(
            "Room {}: vote {}/{} on pair {} prompt {}",
            self.id,
            votes.len(),
            needed,
            pair_index,
            prompt.as_usize()
        );

        if complete {
            self.disarm_timer(TimerKind::VoteStep);
            self.close_open_step();
            self.emit_voting_step();
        }
        Ok(())
    }

    /// Tally and leave the open step. Taking the step out of the round makes
    /// a second close for the same step a no-op.
    pub(crate) fn close_open_step(&mut self) {
        let Some(round) = self.round_data.as_mut() else {
            return;
        };
        let Some(open) = round.open_step.take() else {
            return;
        };
        round.voting_cursor.advance();
        self.tally_step(open.cursor);
    }

    fn finish_round(&mut self) {
        self.phase = RoomPhase::Results;
        if let Some(round) = self.round_data.as_mut() {
            round.open_step = None;
        }

        let leaderboard = leaderboard(&self.players, &self.scores);
        tracing::info!(
            "Room {} round {}/{} finished",
            self.id,
            self.round,
            self.total_rounds
        );
        self.broadcast(ServerMessage::RoundResults {
            round: self.round,
            leaderboard: leaderboard.clone(),
            total_rounds: self.total_rounds,
        });

        if self.round < self.total_rounds {
            self.arm_timer(TimerKind::NextRound, self.config.next_round_delay);
        } else {
            tracing::info!("Room {} game finished", self.id);
            self.broadcast(ServerMessage::GameFinished { leaderboard });
        }
    }
}
