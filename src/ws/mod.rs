pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::PlayerId;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let conn = PlayerId::new();
    let mut outbox = state.hub.register(conn).await;
    tracing::info!("WebSocket connected: {}", conn);

    let welcome = ServerMessage::Welcome {
        connection_id: conn,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if let Ok(msg) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send welcome message to {}", conn);
            state.disconnect(conn).await;
            return;
        }
    }

    loop {
        tokio::select! {
            // Messages routed to this connection by the hub
            outgoing = outbox.recv() => {
                let Some(msg) = outgoing else { break };
                if let Ok(json) = serde_json::to_string(&msg) {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message from {}: {}", conn, text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if let Err(e) = handlers::handle_message(client_msg, conn, &state).await {
                                    tracing::debug!("Dropped message from {}: {}", conn, e);
                                }
                            }
                            Err(e) => {
                                tracing::debug!("Failed to parse message from {}: {}", conn, e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed by {}", conn);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error on {}: {}", conn, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    state.disconnect(conn).await;
    tracing::info!("WebSocket connection closed: {}", conn);
}
