use reactdash::broadcast::spawn_room_sweeper;
use reactdash::error::GameError;
use reactdash::protocol::{ClientMessage, ServerMessage};
use reactdash::state::{AppState, IdleTimeout};
use reactdash::types::*;
use reactdash::ws::handlers::handle_message;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

struct Client {
    id: PlayerId,
    rx: UnboundedReceiver<ServerMessage>,
}

impl Client {
    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

fn room_id() -> RoomId {
    RoomId::new("party")
}

/// Connect `n` clients and join them all into the same room. The first one
/// is the host.
async fn setup_room(state: &Arc<AppState>, n: usize) -> Vec<Client> {
    let mut clients = Vec::new();
    for i in 0..n {
        let id = PlayerId::new();
        let rx = state.hub.register(id).await;
        handle_message(
            ClientMessage::JoinRoom {
                room_id: room_id(),
                player_name: format!("Player{}", i),
            },
            id,
            state,
        )
        .await
        .expect("join should succeed");
        clients.push(Client { id, rx });
    }
    for client in &mut clients {
        client.drain();
    }
    clients
}

async fn start_game(state: &Arc<AppState>, host: &Client) {
    handle_message(
        ClientMessage::StartGame { room_id: room_id() },
        host.id,
        state,
    )
    .await
    .expect("host should be able to start");
}

async fn pairs(state: &Arc<AppState>) -> Vec<Vec<PlayerId>> {
    let room = state.room(&room_id()).await.expect("room exists");
    let room = room.lock().await;
    room.round_data
        .as_ref()
        .expect("round started")
        .pairs
        .iter()
        .map(|p| p.members.clone())
        .collect()
}

async fn phase(state: &Arc<AppState>) -> RoomPhase {
    let room = state.room(&room_id()).await.expect("room exists");
    let phase = room.lock().await.phase;
    phase
}

async fn answer(state: &Arc<AppState>, from: PlayerId, pair_index: usize, q: PromptIndex) {
    handle_message(
        ClientMessage::SubmitAnswer {
            room_id: room_id(),
            pair_index,
            q_index: q,
            answer: format!("answer from {}", from),
        },
        from,
        state,
    )
    .await
    .expect("answer should be accepted");
}

/// Two answerers per prompt for every pair
async fn answer_everything(state: &Arc<AppState>, pairs: &[Vec<PlayerId>]) {
    for (pair_index, members) in pairs.iter().enumerate() {
        for member in members.iter().take(2) {
            for q in PromptIndex::ALL {
                answer(state, *member, pair_index, q).await;
            }
        }
    }
}

async fn vote(
    state: &Arc<AppState>,
    voter: PlayerId,
    pair_index: usize,
    q: PromptIndex,
    target: PlayerId,
    emoji: Reaction,
) -> Result<(), GameError> {
    handle_message(
        ClientMessage::SubmitVote {
            room_id: room_id(),
            pair_index,
            q_index: q,
            target_player_id: target,
            emoji,
        },
        voter,
        state,
    )
    .await
}

fn tallies(messages: &[ServerMessage]) -> Vec<(usize, PromptIndex, usize)> {
    messages
        .iter()
        .filter_map(|m| match m {
            ServerMessage::VotingStepTally {
                pair_index,
                q_index,
                votes,
            } => Some((*pair_index, *q_index, votes.len())),
            _ => None,
        })
        .collect()
}

fn shown_questions(messages: &[ServerMessage]) -> Vec<(usize, PromptIndex)> {
    messages
        .iter()
        .filter_map(|m| match m {
            ServerMessage::ShowQuestion {
                pair_index,
                q_index,
                ..
            } => Some((*pair_index, *q_index)),
            _ => None,
        })
        .collect()
}

fn round_results(messages: &[ServerMessage]) -> Vec<(u32, Vec<LeaderboardEntry>)> {
    messages
        .iter()
        .filter_map(|m| match m {
            ServerMessage::RoundResults {
                round, leaderboard, ..
            } => Some((*round, leaderboard.clone())),
            _ => None,
        })
        .collect()
}

fn client<'a>(clients: &'a mut [Client], id: PlayerId) -> &'a mut Client {
    clients
        .iter_mut()
        .find(|c| c.id == id)
        .expect("client exists")
}

/// Four players: two pairs, prompt 1 revealed per pair, voting after the
/// eighth answer
#[tokio::test(start_paused = true)]
async fn test_four_player_round_flow() {
    let state = Arc::new(AppState::default());
    let mut clients = setup_room(&state, 4).await;
    start_game(&state, &clients[0]).await;

    let pairs = pairs(&state).await;
    assert_eq!(pairs.len(), 2);
    assert!(pairs.iter().all(|p| p.len() == 2));

    for c in &mut clients {
        let messages = c.drain();
        let pair_index = pairs.iter().position(|p| p.contains(&c.id)).unwrap();
        assert_eq!(
            shown_questions(&messages),
            vec![(pair_index, PromptIndex::First)]
        );
        assert!(messages.iter().any(|m| matches!(
            m,
            ServerMessage::RoundStarted {
                round: 1,
                total_rounds: 3,
                ..
            }
        )));
    }

    answer(&state, pairs[0][0], 0, PromptIndex::First).await;
    answer(&state, pairs[0][1], 0, PromptIndex::First).await;

    for member in &pairs[0] {
        let messages = client(&mut clients, *member).drain();
        assert_eq!(shown_questions(&messages), vec![(0, PromptIndex::Second)]);
    }
    for member in &pairs[1] {
        let messages = client(&mut clients, *member).drain();
        assert!(shown_questions(&messages).is_empty());
    }

    answer(&state, pairs[0][0], 0, PromptIndex::Second).await;
    answer(&state, pairs[0][1], 0, PromptIndex::Second).await;
    for member in &pairs[1] {
        answer(&state, *member, 1, PromptIndex::First).await;
        answer(&state, *member, 1, PromptIndex::Second).await;
    }

    assert_eq!(phase(&state).await, RoomPhase::Voting);
    let room = state.room(&room_id()).await.unwrap();
    assert_eq!(room.lock().await.voting_cursor(), Some(StepCursor::start()));

    let messages = clients[0].drain();
    let started = messages
        .iter()
        .position(|m| *m == ServerMessage::VotingPhaseStarted)
        .expect("voting started");
    match &messages[started + 1] {
        ServerMessage::VotingStep {
            pair_index,
            q_index,
            answers,
            eligible_voters,
            ..
        } => {
            assert_eq!(*pair_index, 0);
            assert_eq!(*q_index, PromptIndex::First);
            assert_eq!(answers.len(), 2);
            let mut eligible = eligible_voters.clone();
            eligible.sort();
            let mut expected = pairs[1].clone();
            expected.sort();
            assert_eq!(eligible, expected);
        }
        other => panic!("Expected VotingStep, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_three_players_form_one_triad() {
    let state = Arc::new(AppState::default());
    let clients = setup_room(&state, 3).await;
    start_game(&state, &clients[0]).await;

    let pairs = pairs(&state).await;
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].len(), 3);

    let room = state.room(&room_id()).await.unwrap();
    assert_eq!(
        room.lock()
            .await
            .round_data
            .as_ref()
            .unwrap()
            .total_expected_answers,
        4
    );
    drop(room);

    answer_everything(&state, &pairs).await;
    assert_eq!(phase(&state).await, RoomPhase::Voting);
}

#[tokio::test(start_paused = true)]
async fn test_round_timer_without_answers_reaches_results() {
    let state = Arc::new(AppState::default());
    let mut clients = setup_room(&state, 4).await;
    start_game(&state, &clients[0]).await;

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(phase(&state).await, RoomPhase::Answering);

    tokio::time::sleep(Duration::from_secs(2)).await;

    // Every step has fewer than two answers, so voting ends immediately
    assert_eq!(phase(&state).await, RoomPhase::Results);
    let messages = clients[1].drain();
    assert!(messages.contains(&ServerMessage::VotingPhaseStarted));
    assert!(tallies(&messages).is_empty());
    assert_eq!(round_results(&messages).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_vote_step_timeouts_walk_to_results() {
    let state = Arc::new(AppState::default());
    let mut clients = setup_room(&state, 4).await;
    start_game(&state, &clients[0]).await;
    answer_everything(&state, &pairs(&state).await).await;
    clients[0].drain();

    for _ in 0..4 {
        assert_eq!(phase(&state).await, RoomPhase::Voting);
        tokio::time::sleep(Duration::from_secs(31)).await;
    }

    assert_eq!(phase(&state).await, RoomPhase::Results);
    let messages = clients[0].drain();
    assert_eq!(
        tallies(&messages),
        vec![
            (0, PromptIndex::First, 0),
            (0, PromptIndex::Second, 0),
            (1, PromptIndex::First, 0),
            (1, PromptIndex::Second, 0),
        ]
    );
    assert_eq!(round_results(&messages)[0].0, 1);
}

#[tokio::test(start_paused = true)]
async fn test_votes_feed_leaderboard() {
    let state = Arc::new(AppState::default());
    let mut clients = setup_room(&state, 4).await;
    start_game(&state, &clients[0]).await;
    let pairs = pairs(&state).await;
    answer_everything(&state, &pairs).await;

    for q in PromptIndex::ALL {
        for voter in &pairs[1] {
            vote(&state, *voter, 0, q, pairs[0][0], Reaction::Laugh)
                .await
                .unwrap();
        }
    }
    for q in PromptIndex::ALL {
        for voter in &pairs[0] {
            vote(&state, *voter, 1, q, pairs[1][1], Reaction::Negative)
                .await
                .unwrap();
        }
    }

    assert_eq!(phase(&state).await, RoomPhase::Results);
    let messages = clients[0].drain();
    assert_eq!(tallies(&messages).len(), 4);
    assert!(tallies(&messages).iter().all(|(_, _, n)| *n == 2));

    let (round, board) = round_results(&messages).remove(0);
    assert_eq!(round, 1);
    assert_eq!(board.len(), 4);
    assert_eq!(board[0].player_id, pairs[0][0]);
    assert_eq!(board[0].laugh, 4);
    assert_eq!(board[3].player_id, pairs[1][1]);
    assert_eq!(board[3].negative, 4);
}

#[tokio::test(start_paused = true)]
async fn test_member_and_missing_answer_votes_are_rejected() {
    let state = Arc::new(AppState::default());
    let mut clients = setup_room(&state, 4).await;
    start_game(&state, &clients[0]).await;
    let pairs = pairs(&state).await;
    // Only prompt 0 of pair 0 gets its two answers
    answer(&state, pairs[0][0], 0, PromptIndex::First).await;
    answer(&state, pairs[0][1], 0, PromptIndex::First).await;
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(phase(&state).await, RoomPhase::Voting);
    clients[0].drain();

    let own = vote(
        &state,
        pairs[0][1],
        0,
        PromptIndex::First,
        pairs[0][0],
        Reaction::Laugh,
    )
    .await;
    assert!(matches!(own, Err(GameError::OwnPair)));

    let nobody = vote(
        &state,
        pairs[1][0],
        0,
        PromptIndex::First,
        pairs[1][1],
        Reaction::Laugh,
    )
    .await;
    assert!(matches!(nobody, Err(GameError::NoSuchAnswer)));

    let wrong_step = vote(
        &state,
        pairs[1][0],
        0,
        PromptIndex::Second,
        pairs[0][0],
        Reaction::Laugh,
    )
    .await;
    assert!(matches!(wrong_step, Err(GameError::StepNotOpen)));

    // Nothing recorded, the step closes empty on timeout
    tokio::time::sleep(Duration::from_secs(31)).await;
    let messages = clients[0].drain();
    assert_eq!(tallies(&messages), vec![(0, PromptIndex::First, 0)]);
    assert_eq!(phase(&state).await, RoomPhase::Results);
}

/// All votes landing just before the step deadline close the step once; the
/// old deadline passing afterwards must not tally it again
#[tokio::test(start_paused = true)]
async fn test_step_is_tallied_once() {
    let state = Arc::new(AppState::default());
    let mut clients = setup_room(&state, 4).await;
    start_game(&state, &clients[0]).await;
    let pairs = pairs(&state).await;
    answer_everything(&state, &pairs).await;
    clients[0].drain();

    tokio::time::sleep(Duration::from_secs(29)).await;
    for voter in &pairs[1] {
        vote(
            &state,
            *voter,
            0,
            PromptIndex::First,
            pairs[0][0],
            Reaction::Neutral,
        )
        .await
        .unwrap();
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    let messages = clients[0].drain();
    assert_eq!(tallies(&messages), vec![(0, PromptIndex::First, 2)]);
    let room = state.room(&room_id()).await.unwrap();
    let room = room.lock().await;
    assert_eq!(
        room.voting_cursor(),
        Some(StepCursor {
            pair_index: 0,
            prompt: PromptIndex::Second
        })
    );
    assert_eq!(room.scores.get(pairs[0][0]).neutral, 2);
}

#[tokio::test(start_paused = true)]
async fn test_next_round_starts_automatically() {
    let state = Arc::new(AppState::default());
    let mut clients = setup_room(&state, 2).await;
    start_game(&state, &clients[0]).await;

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(phase(&state).await, RoomPhase::Results);
    clients[1].drain();

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(phase(&state).await, RoomPhase::Answering);
    let messages = clients[1].drain();
    assert!(messages.iter().any(|m| matches!(
        m,
        ServerMessage::RoundStarted { round: 2, .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_host_skips_delay_and_non_host_cannot() {
    let state = Arc::new(AppState::default());
    let mut clients = setup_room(&state, 2).await;
    start_game(&state, &clients[0]).await;

    // Not in Results yet
    let early = handle_message(
        ClientMessage::NextRound { room_id: room_id() },
        clients[0].id,
        &state,
    )
    .await;
    assert!(matches!(early, Err(GameError::WrongPhase(_))));

    tokio::time::sleep(Duration::from_secs(61)).await;
    let by_guest = handle_message(
        ClientMessage::NextRound { room_id: room_id() },
        clients[1].id,
        &state,
    )
    .await;
    assert!(matches!(by_guest, Err(GameError::NotHost(_))));

    handle_message(
        ClientMessage::NextRound { room_id: room_id() },
        clients[0].id,
        &state,
    )
    .await
    .unwrap();
    clients[0].drain();

    // The cancelled auto-start must not begin a third round
    tokio::time::sleep(Duration::from_secs(6)).await;
    let room = state.room(&room_id()).await.unwrap();
    assert_eq!(room.lock().await.round, 2);
    let messages = clients[0].drain();
    assert!(!messages
        .iter()
        .any(|m| matches!(m, ServerMessage::RoundStarted { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_game_finishes_after_three_rounds() {
    let state = Arc::new(AppState::default());
    let mut clients = setup_room(&state, 2).await;
    start_game(&state, &clients[0]).await;

    for round in 1..=3 {
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(phase(&state).await, RoomPhase::Results);
        let room = state.room(&room_id()).await.unwrap();
        assert_eq!(room.lock().await.round, round);
        drop(room);
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    let messages = clients[1].drain();
    let finished: Vec<_> = messages
        .iter()
        .filter(|m| matches!(m, ServerMessage::GameFinished { .. }))
        .collect();
    assert_eq!(finished.len(), 1);
    assert_eq!(round_results(&messages).len(), 3);

    // Results is terminal
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(phase(&state).await, RoomPhase::Results);
    assert!(clients[1].drain().is_empty());

    let more = handle_message(
        ClientMessage::NextRound { room_id: room_id() },
        clients[0].id,
        &state,
    )
    .await;
    assert!(matches!(more, Err(GameError::GameOver(3))));
}

#[tokio::test(start_paused = true)]
async fn test_host_disconnect_reassigns_host() {
    let state = Arc::new(AppState::default());
    let mut clients = setup_room(&state, 3).await;

    state.disconnect(clients[0].id).await;

    let new_host = clients[1].id;
    let messages = clients[2].drain();
    assert!(messages.contains(&ServerMessage::HostChanged { host_id: new_host }));

    let room = state.room(&room_id()).await.unwrap();
    let room = room.lock().await;
    assert_eq!(room.host_id, Some(new_host));
    assert_eq!(room.players.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_auto_start_with_one_player_left_stays_in_results() {
    let state = Arc::new(AppState::default());
    let clients = setup_room(&state, 2).await;
    start_game(&state, &clients[0]).await;

    state.disconnect(clients[1].id).await;
    tokio::time::sleep(Duration::from_secs(61 + 6)).await;

    let room = state.room(&room_id()).await.unwrap();
    let room = room.lock().await;
    assert_eq!(room.phase, RoomPhase::Results);
    assert_eq!(room.round, 1);
    assert_eq!(room.host_id, Some(clients[0].id));
}

#[tokio::test(start_paused = true)]
async fn test_late_joiner_plays_from_next_round() {
    let state = Arc::new(AppState::default());
    let mut clients = setup_room(&state, 2).await;
    start_game(&state, &clients[0]).await;

    let late = PlayerId::new();
    let mut late_rx = state.hub.register(late).await;
    state
        .join_room(late, room_id(), "Latecomer")
        .await
        .unwrap();
    assert!(pairs(&state).await.iter().all(|p| !p.contains(&late)));
    match late_rx.try_recv().unwrap() {
        ServerMessage::RoomJoined {
            round,
            state: room_phase,
            ..
        } => {
            assert_eq!(round, 1);
            assert_eq!(room_phase, RoomPhase::Answering);
        }
        other => panic!("Expected RoomJoined, got {:?}", other),
    }

    tokio::time::sleep(Duration::from_secs(61 + 5)).await;

    let pairs = pairs(&state).await;
    assert_eq!(pairs.len(), 1);
    assert!(pairs[0].contains(&late));
    assert_eq!(pairs[0].len(), 3);
    clients[0].drain();
}

#[tokio::test(start_paused = true)]
async fn test_idle_rooms_are_swept() {
    let state = Arc::new(AppState::default().with_eviction(IdleTimeout {
        max_idle: Duration::from_secs(10),
    }));
    let clients = setup_room(&state, 2).await;
    spawn_room_sweeper(state.clone(), Duration::from_secs(5));

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(state.room_count().await, 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(state.room_count().await, 0);

    let result = handle_message(
        ClientMessage::StartGame { room_id: room_id() },
        clients[0].id,
        &state,
    )
    .await;
    assert!(matches!(result, Err(GameError::NotInRoom(_))));
}
