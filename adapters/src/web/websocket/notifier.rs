use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::SinkExt;
use futures::stream::SplitSink;
use serde::Serialize;
use tokio::sync::{Mutex as TokioMutex, RwLock};
use tracing::{debug, warn};

use application::ports::out_::{BattlegroundNotification, BattlegroundNotifier};
use domain::PlayerId;

pub(crate) type WebSocketSender = SplitSink<WebSocket, Message>;

pub struct WebSocketNotifier {
    connections: RwLock<HashMap<PlayerId, TokioMutex<WebSocketSender>>>,
}

impl WebSocketNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register_player(
        &self,
        player_id: PlayerId,
        sender: WebSocketSender,
    ) {
        self.connections
            .write()
            .await
            .insert(player_id, TokioMutex::new(sender));
    }

    pub async fn unregister_player(
        &self,
        player_id: PlayerId,
    ) {
        self.connections.write().await.remove(&player_id);
    }

    /// Serializes `payload` and sends it to one connected player. Unknown players are skipped.
    pub async fn send<T: Serialize + Sync>(
        &self,
        player_id: PlayerId,
        payload: &T,
    ) {
        let message = match serde_json::to_string(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(player_id = %player_id, error = %e, "Failed to serialize outgoing message");
                return;
            }
        };

        debug!(player_id = %player_id, message = %message, "-> Sending");
        let connections = self.connections.read().await;
        if let Some(sender) = connections.get(&player_id) {
            let _ = sender.lock().await.send(Message::Text(message.into())).await;
        }
    }
}

impl Default for WebSocketNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BattlegroundNotifier for WebSocketNotifier {
    async fn notify_player(
        &self,
        player_id: PlayerId,
        notification: BattlegroundNotification,
    ) {
        self.send(player_id, &notification).await;
    }

    async fn broadcast(
        &self,
        notification: BattlegroundNotification,
    ) {
        let message = match serde_json::to_string(&notification) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Failed to serialize broadcast");
                return;
            }
        };

        let connections = self.connections.read().await;
        for (player_id, sender) in connections.iter() {
            debug!(player_id = %player_id, message = %message, "-> Broadcasting");
            let _ = sender
                .lock()
                .await
                .send(Message::Text(message.clone().into()))
                .await;
        }
    }
}
