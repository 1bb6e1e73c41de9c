//! Realtime WebSocket Route
//!
//! `GET /ws?formId=<id>` registers the connection as an observer of one form.
//! Events are pushed as text frames; client messages are read only to detect
//! disconnects. Without a `formId` the server sends `{"error":"missing formId"}`
//! and closes.

use std::borrow::Cow;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use super::state::AppState;
use crate::realtime::{Observer, RealtimeError};

/// Query string of the websocket endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserveQuery {
    #[serde(default)]
    pub form_id: Option<String>,
}

/// Create realtime routes
pub fn realtime_routes(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// Handle WebSocket upgrade request
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<ObserveQuery>,
) -> impl IntoResponse {
    let form_id = query.form_id.filter(|id| !id.trim().is_empty());
    ws.on_upgrade(move |socket| async move {
        match form_id {
            Some(form_id) => observe(socket, state, form_id).await,
            None => reject(socket, RealtimeError::MissingFormId).await,
        }
    })
}

/// Send an error frame followed by a close frame
async fn reject(mut socket: WebSocket, err: RealtimeError) {
    let body = serde_json::json!({ "error": err.to_string() }).to_string();
    let _ = socket.send(Message::Text(body)).await;
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: err.close_code(),
            reason: Cow::Owned(err.to_string()),
        })))
        .await;
}

/// Forward hub events to one connection until either side goes away
async fn observe(socket: WebSocket, state: AppState, form_id: String) {
    let (observer, mut events) = Observer::channel();
    if let Err(e) = state.hub.subscribe(&form_id, &observer) {
        warn!(form_id = %form_id, error = %e, "observer registration failed");
        reject(socket, e).await;
        return;
    }
    debug!(form_id = %form_id, observer = %observer.id(), "observer connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let frame = match event.to_wire_format() {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(form_id = %form_id, error = %e, "dropping unencodable event");
                        continue;
                    }
                };
                if sender.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.hub.unsubscribe(&form_id, observer.id());
    debug!(form_id = %form_id, observer = %observer.id(), "observer disconnected");
}
