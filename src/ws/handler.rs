use std::sync::Arc;
use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, State},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info};

use crate::state::AppState;
use crate::utils::scope_guard::ScopeGuard;

/// WebSocket upgrade endpoint
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    debug!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let hub = state.hub.clone();
    let (session, mut outbound) = hub.connect();
    let connection_id = session.connection_id;
    info!("WebSocket connection established: {}", connection_id);

    // Runs however the connection ends, including task aborts.
    let guard_hub = hub.clone();
    let _guard = ScopeGuard::new(move || {
        guard_hub.disconnect(connection_id);
        info!("WebSocket connection terminated: {}", connection_id);
    });

    let (mut sender, mut receiver) = socket.split();

    // Writer: everything the registry queues for this connection.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode '{}' for {}: {}", event.name(), connection_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Reader: frames are handled one at a time, in arrival order.
    let reader_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut session = session;
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    session = reader_hub.handle_text(session, &text).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("WebSocket read error on {}: {}", connection_id, e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };
}
