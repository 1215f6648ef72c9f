//! WebSocket endpoint for realtime event delivery
//!
//! Each connection subscribes to exactly one audience room derived from the
//! caller's identity: students get their private channel, restaurant staff
//! share their restaurant's channel, super-admins join the broadcast
//! channel. Events are hints — clients reconcile authoritative state via the
//! REST API.

use axum::Extension;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use shared::error::AppError;
use shared::types::Role;

use crate::auth::Identity;
use crate::live::Room;
use crate::state::AppState;

/// GET /api/live/ws — upgrade to WebSocket
pub async fn handle_ws(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let room = match identity.role {
        Role::Student => Room::Student(identity.user_id),
        Role::Restaurant => Room::Restaurant(identity.require_restaurant()?),
        Role::SuperAdmin => Room::SuperAdmins,
    };

    Ok(ws.on_upgrade(move |socket| handle_connection(socket, state, identity, room)))
}

async fn handle_connection(socket: WebSocket, state: AppState, identity: Identity, room: Room) {
    let mut events = state.hub.subscribe(room);

    tracing::info!(
        user_id = %identity.user_id,
        role = %identity.role,
        "WebSocket connected"
    );

    let (mut ws_sink, mut ws_stream) = socket.split();

    loop {
        tokio::select! {
            // Client traffic: answer pings, notice disconnects
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(user_id = %identity.user_id, "WebSocket disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(user_id = %identity.user_id, "WebSocket error: {e}");
                        break;
                    }
                    _ => {} // Text, Binary, Pong — clients don't talk to us
                }
            }

            // Event to push
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event)
                            && ws_sink.send(Message::Text(json.into())).await.is_err()
                        {
                            tracing::warn!(user_id = %identity.user_id, "Failed to push event");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Slow consumer lost old hints; authoritative state
                        // comes from the next poll anyway.
                        tracing::warn!(
                            user_id = %identity.user_id,
                            skipped,
                            "WebSocket subscriber lagged"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    let _ = ws_sink.close().await;

    // Drop our receiver before asking the hub to garbage-collect the room
    drop(events);
    state.hub.release(room);
}
