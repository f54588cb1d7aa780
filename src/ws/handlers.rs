//! WebSocket message dispatch
//!
//! Every client message maps onto one room operation. Failures are returned
//! to the socket loop, which logs them; the client never gets a reply.

use crate::error::GameError;
use crate::protocol::ClientMessage;
use crate::state::AppState;
use crate::types::PlayerId;
use std::sync::Arc;

/// Apply a client message on behalf of connection `conn`
pub async fn handle_message(
    msg: ClientMessage,
    conn: PlayerId,
    state: &Arc<AppState>,
) -> Result<(), GameError> {
    match msg {
        ClientMessage::JoinRoom {
            room_id,
            player_name,
        } => state.join_room(conn, room_id, &player_name).await,

        ClientMessage::StartGame { room_id } => {
            tracing::info!("Start game requested by {} in room {}", conn, room_id);
            state.start_game(conn, &room_id).await
        }

        ClientMessage::SubmitAnswer {
            room_id,
            pair_index,
            q_index,
            answer,
        } => {
            state
                .submit_answer(conn, &room_id, pair_index, q_index, &answer)
                .await
        }

        ClientMessage::SubmitVote {
            room_id,
            pair_index,
            q_index,
            target_player_id,
            emoji,
        } => {
            state
                .submit_vote(conn, &room_id, pair_index, q_index, target_player_id, emoji)
                .await
        }

        ClientMessage::NextRound { room_id } => {
            tracing::info!("Next round requested by {} in room {}", conn, room_id);
            state.next_round(conn, &room_id).await
        }
    }
}
