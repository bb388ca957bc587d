use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    pub courier_id: Uuid,
}

/// Live event channel for one courier: job offers and supersede notices.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.courier_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, courier_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.courier_events_tx.subscribe();

    info!(courier_id = %courier_id, "courier channel connected");

    let send_task = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if event.courier_id() != courier_id {
                continue;
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize courier event");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!(courier_id = %courier_id, "courier channel disconnected");
}
