//! WebSocket transport for realtime updates
//!
//! Each socket is one registry client. A single task per connection drains
//! the client's queue and answers its control messages, so events reach the
//! socket in publish order.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Path, State},
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use pollwatch_common::models::SubmissionView;
use pollwatch_common::Topic;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::broadcaster::ClientConnection;
use crate::services::submissions::recent_station_updates;
use crate::AppState;

/// Messages accepted from clients
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    Subscribe { topic: String },
    Unsubscribe { topic: String },
}

/// Control messages sent to clients (events use the broadcaster's format)
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Pong,
    Subscribed { topic: Topic },
    Unsubscribed { topic: Topic },
    InitialData {
        election_id: i64,
        updates: Vec<SubmissionView>,
    },
    Error { message: String },
}

/// GET /ws/live-updates
pub async fn live_updates(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, state, Topic::Global))
}

/// GET /ws/elections/:id
pub async fn election_updates(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(election_id): Path<i64>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, state, Topic::Election(election_id)))
}

/// GET /ws/incidents
pub async fn incident_updates(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, state, Topic::Incidents))
}

/// Apply one text frame from a client; returns the reply to send, if any
pub fn handle_client_message(client: &ClientConnection, text: &str) -> Option<ServerMessage> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            return Some(ServerMessage::Error {
                message: format!("unrecognized message: {}", e),
            })
        }
    };

    let reply = match message {
        ClientMessage::Ping => ServerMessage::Pong,
        ClientMessage::Subscribe { topic } => match topic.parse::<Topic>() {
            Ok(topic) => {
                client.subscribe(topic.clone());
                ServerMessage::Subscribed { topic }
            }
            Err(e) => ServerMessage::Error {
                message: e.to_string(),
            },
        },
        ClientMessage::Unsubscribe { topic } => match topic.parse::<Topic>() {
            Ok(topic) => {
                client.unsubscribe(&topic);
                ServerMessage::Unsubscribed { topic }
            }
            Err(e) => ServerMessage::Error {
                message: e.to_string(),
            },
        },
    };

    Some(reply)
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            warn!("Failed to serialize WebSocket message: {}", e);
            None
        }
    }
}

async fn serve_socket(socket: WebSocket, state: AppState, topic: Topic) {
    let mut client = state.broadcaster.connect();
    client.subscribe(topic.clone());
    info!(
        "WebSocket client {} connected on {} ({} clients)",
        client.id(),
        topic,
        state.broadcaster.client_count()
    );

    let (mut sender, mut receiver) = socket.split();

    if let Topic::Election(election_id) = topic {
        match recent_station_updates(&state.db, election_id, state.config.live_window_minutes).await {
            Ok(updates) => {
                let initial = ServerMessage::InitialData {
                    election_id,
                    updates,
                };
                if let Some(frame) = encode(&initial) {
                    if sender.send(frame).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => warn!("Failed to load initial data for election {}: {}", election_id, e),
        }
    }

    loop {
        tokio::select! {
            delivery = client.recv() => {
                let Some(delivery) = delivery else { break };
                match delivery.to_json() {
                    Ok(json) => {
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to serialize event: {}", e),
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_client_message(&client, &text);
                        if let Some(frame) = reply.as_ref().and_then(encode) {
                            if sender.send(frame).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Protocol-level ping/pong is answered by the socket itself
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    info!("WebSocket client {} disconnected", client.id());
}
