//! WebSocket handler: owns one client connection's full duration.

use std::collections::VecDeque;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::api::AppState;

use super::types::{OutboundFrame, resolve_query};

/// WebSocket upgrade handler.
///
/// GET /ws
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Run one relay session: receive a frame, resolve the query, generate,
/// reply, repeat. Strictly serial per connection, so replies always match
/// request order.
async fn handle_connection(socket: WebSocket, state: AppState) {
    let session = state.registry.register();
    let session_id = session.id();
    info!(%session_id, "relay session open");

    let (mut sender, mut receiver) = socket.split();

    // Frames that arrived while a generation was in flight; drained in
    // arrival order before the socket is read again.
    let mut pending: VecDeque<String> = VecDeque::new();

    'session: loop {
        let frame = match pending.pop_front() {
            Some(frame) => frame,
            None => match receiver.next().await {
                Some(Ok(Message::Text(text))) => text.to_string(),
                Some(Ok(Message::Close(_))) | None => break 'session,
                // Binary frames are not part of the protocol; ping/pong are
                // handled by axum.
                Some(Ok(_)) => continue 'session,
                Some(Err(e)) => {
                    warn!(%session_id, error = %e, "transport error");
                    break 'session;
                }
            },
        };

        let query = resolve_query(&frame);
        debug!(%session_id, query_chars = query.chars().count(), "dispatching query");

        // Generate while keeping an eye on the socket: a disconnect drops
        // the in-flight generation cleanly, and text frames that arrive
        // meanwhile are queued rather than read out of turn.
        let generation = state.generator.generate(&query);
        tokio::pin!(generation);

        let outcome = loop {
            tokio::select! {
                result = &mut generation => break result,
                incoming = receiver.next() => match incoming {
                    Some(Ok(Message::Text(text))) => pending.push_back(text.to_string()),
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%session_id, "client left mid-generation, cancelling");
                        break 'session;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(%session_id, error = %e, "transport error mid-generation");
                        break 'session;
                    }
                },
            }
        };

        let outbound = match outcome {
            Ok(answer) => OutboundFrame::reply(answer),
            Err(err) => {
                warn!(
                    %session_id,
                    category = err.category(),
                    detail = err.detail(),
                    "generation error"
                );
                OutboundFrame::from(&err)
            }
        };

        let json = match serde_json::to_string(&outbound) {
            Ok(json) => json,
            Err(e) => {
                error!(%session_id, error = %e, "failed to serialize reply frame");
                continue 'session;
            }
        };

        if sender.send(Message::Text(json.into())).await.is_err() {
            warn!(%session_id, "failed to write reply, closing session");
            break 'session;
        }
    }

    // The guard drop unregisters the session.
    info!(%session_id, "relay session closed");
}
