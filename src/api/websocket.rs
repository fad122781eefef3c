//! WebSocket handler for real-time event streaming

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::{state::ApiState, types::StreamParams};

/// WebSocket upgrade handler
///
/// GET /api/v1/stream?asset_id=
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
    Query(params): Query<StreamParams>,
) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state, params))
}

/// Forward every domain event as one JSON text frame
async fn handle_websocket(socket: WebSocket, state: ApiState, params: StreamParams) {
    info!("WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut event_rx = state.hub.events.subscribe();

    let mut send_task = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    if params
                        .asset_id
                        .as_deref()
                        .is_some_and(|id| id != event.asset_id())
                    {
                        continue;
                    }

                    if let Ok(text) = serde_json::to_string(&event)
                        && sender.send(Message::Text(text)).await.is_err()
                    {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("event channel closed");
                    break;
                }
            }
        }
    });

    // clients only ever close; anything else is ignored
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    info!("WebSocket client disconnected");
}
