// src/ws.rs
//! Dashboard WebSocket: one shared broadcast group plus per-socket echo.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use metrics::gauge;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

pub const HUB_CAPACITY: usize = 64;

/// Event relayed to every connected client as `{"type": .., "message": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEvent {
    #[serde(rename = "type")]
    pub update_type: String,
    pub message: Value,
}

#[derive(Clone)]
pub struct DashboardHub {
    tx: broadcast::Sender<HubEvent>,
}

impl Default for DashboardHub {
    fn default() -> Self {
        Self::new(HUB_CAPACITY)
    }
}

impl DashboardHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.tx.subscribe()
    }

    /// Returns how many connections received the event (0 when nobody listens).
    pub fn publish(&self, update_type: &str, message: Value) -> usize {
        self.tx
            .send(HubEvent {
                update_type: update_type.to_string(),
                message,
            })
            .unwrap_or(0)
    }

    pub fn connections(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub fn welcome_frame() -> String {
    json!({
        "type": "connection_established",
        "message": "Connected to CS Student Hub Dashboard!",
    })
    .to_string()
}

/// `{"message": "hi"}` and plain `hi` both echo as `Echo: hi`.
pub fn echo_reply(text: &str) -> String {
    let message = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| text.to_string());
    json!({ "type": "echo", "message": format!("Echo: {message}") }).to_string()
}

pub async fn ws_handler(State(hub): State<DashboardHub>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: DashboardHub) {
    let mut rx = hub.subscribe();
    gauge!("ws_connections_active").set(hub.connections() as f64);

    let (mut sender, mut receiver) = socket.split();
    if sender.send(Message::Text(welcome_frame().into())).await.is_ok() {
        loop {
            tokio::select! {
                ev = rx.recv() => match ev {
                    Ok(ev) => {
                        let Ok(txt) = serde_json::to_string(&ev) else { continue };
                        if sender.send(Message::Text(txt.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "ws client lagging"),
                    Err(RecvError::Closed) => break,
                },
                incoming = receiver.next() => match incoming {
                    Some(Ok(Message::Text(t))) => {
                        if sender.send(Message::Text(echo_reply(t.as_str()).into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    drop(rx);
    gauge!("ws_connections_active").set(hub.connections() as f64);
}
