//! Live chat channel
//!
//! One WebSocket per user session at `/ws/{user_id}`. Inbound frames are
//! persisted first, then relayed verbatim to every live connection of
//! the recipient. Persistence is guaranteed; delivery is best-effort.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use crate::models::NewMessage;
use crate::state::AppState;

type ConnectionId = uuid::Uuid;
type Registry = HashMap<i32, HashMap<ConnectionId, UnboundedSender<String>>>;

/// Registry of live connections, keyed by user id. A user may hold any
/// number of simultaneous connections; disconnects prune their entry so
/// dead senders never accumulate.
#[derive(Clone, Default)]
pub struct ChatRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl ChatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new live connection for a user; returns the connection
    /// id and the receiving end the socket writer drains.
    pub fn register(&self, user_id: i32) -> (ConnectionId, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = ConnectionId::new_v4();

        let mut registry = self.inner.lock().expect("chat registry poisoned");
        registry.entry(user_id).or_default().insert(conn_id, tx);

        (conn_id, rx)
    }

    /// Drop a connection; the per-user entry disappears with its last
    /// connection.
    pub fn unregister(&self, user_id: i32, conn_id: ConnectionId) {
        let mut registry = self.inner.lock().expect("chat registry poisoned");
        if let Some(connections) = registry.get_mut(&user_id) {
            connections.remove(&conn_id);
            if connections.is_empty() {
                registry.remove(&user_id);
            }
        }
    }

    /// Snapshot of a user's live senders. Taken under the lock so a
    /// concurrent disconnect cannot race the iteration that follows.
    fn senders_for(&self, user_id: i32) -> Vec<UnboundedSender<String>> {
        let registry = self.inner.lock().expect("chat registry poisoned");
        registry
            .get(&user_id)
            .map(|connections| connections.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Deliver a payload to every live connection of a user; returns how
    /// many connections accepted it. Zero connections is not an error;
    /// the message is already durably stored by the caller.
    pub fn deliver(&self, user_id: i32, payload: &str) -> usize {
        let mut delivered = 0;
        for sender in self.senders_for(user_id) {
            if sender.send(payload.to_string()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Number of live connections for a user
    pub fn connection_count(&self, user_id: i32) -> usize {
        let registry = self.inner.lock().expect("chat registry poisoned");
        registry.get(&user_id).map_or(0, HashMap::len)
    }
}

/// WebSocket entry point at `/ws/{user_id}`
pub async fn ws_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, user_id, socket))
}

async fn handle_socket(state: AppState, user_id: i32, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (conn_id, mut rx) = state.chat_registry.register(user_id);
    info!("User {user_id} opened chat connection {conn_id}");

    // Writer: drain the registry channel into the socket.
    let mut write_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sink.send(WsMessage::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    // Reader: persist each inbound frame, then relay it.
    let registry = state.chat_registry.clone();
    let messages = state.message_repository.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = stream.next().await {
            let text = match frame {
                WsMessage::Text(text) => text,
                WsMessage::Close(_) => break,
                _ => continue,
            };

            let inbound: NewMessage = match serde_json::from_str(&text) {
                Ok(inbound) => inbound,
                Err(e) => {
                    warn!("Discarding malformed chat frame from user {user_id}: {e}");
                    continue;
                }
            };

            // Store first; only a stored message is relayed.
            if let Err(e) = messages.create(&inbound).await {
                warn!("Failed to persist chat message from user {user_id}: {e}");
                continue;
            }

            registry.deliver(inbound.recipient_id, &text);
        }
    });

    // Whichever side closes first tears the other down.
    tokio::select! {
        _ = &mut write_task => read_task.abort(),
        _ = &mut read_task => write_task.abort(),
    }

    state.chat_registry.unregister(user_id, conn_id);
    info!("User {user_id} closed chat connection {conn_id}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_every_live_connection() {
        let registry = ChatRegistry::new();
        let (_id_a, mut rx_a) = registry.register(7);
        let (_id_b, mut rx_b) = registry.register(7);

        assert_eq!(registry.deliver(7, "{\"contenido\":\"hola\"}"), 2);
        assert_eq!(rx_a.recv().await.unwrap(), "{\"contenido\":\"hola\"}");
        assert_eq!(rx_b.recv().await.unwrap(), "{\"contenido\":\"hola\"}");
    }

    #[tokio::test]
    async fn delivery_with_no_connections_is_a_no_op() {
        let registry = ChatRegistry::new();
        assert_eq!(registry.deliver(42, "hola"), 0);
    }

    #[tokio::test]
    async fn unregister_prunes_the_connection() {
        let registry = ChatRegistry::new();
        let (conn_id, _rx) = registry.register(7);
        assert_eq!(registry.connection_count(7), 1);

        registry.unregister(7, conn_id);
        assert_eq!(registry.connection_count(7), 0);
        assert_eq!(registry.deliver(7, "hola"), 0);
    }

    #[tokio::test]
    async fn connections_are_tracked_per_user() {
        let registry = ChatRegistry::new();
        let (_a, mut rx_alice) = registry.register(1);
        let (_b, _rx_bob) = registry.register(2);

        assert_eq!(registry.deliver(1, "for alice"), 1);
        assert_eq!(rx_alice.recv().await.unwrap(), "for alice");
        assert_eq!(registry.connection_count(2), 1);
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_count_as_delivered() {
        let registry = ChatRegistry::new();
        let (_id, rx) = registry.register(7);
        drop(rx);

        assert_eq!(registry.deliver(7, "hola"), 0);
    }
}
