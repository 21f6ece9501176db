use std::sync::Arc;

use axum::extract::{Query, State};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::StreamExt;
use futures::stream::SplitStream;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use application::BattlegroundServiceError;
use domain::{ArenaTeamEntry, GroupId, JoinRequest, PlayerId, QueueTypeId, Team};

use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingMessage {
    JoinQueue {
        queue_type: QueueTypeId,
        team: Team,
        level: u8,
        #[serde(default)]
        members: Vec<PlayerId>,
        #[serde(default)]
        is_premade: bool,
        #[serde(default)]
        arena_team: Option<ArenaTeamEntry>,
    },
    LeaveQueue {
        queue_type: QueueTypeId,
    },
    AcceptInvitation {
        queue_type: QueueTypeId,
    },
    LeaveBattleground,
}

/// Direct replies to a socket, next to the notifications the service pushes.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Reply {
    Connected { player_id: PlayerId },
    Joined { queue_type: QueueTypeId, ticket_id: GroupId },
    Error { message: String },
}

/// Query of the socket upgrade. A returning player passes their id to reclaim a seat.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub player_id: Option<PlayerId>,
}

impl ConnectParams {
    fn player_id(&self) -> PlayerId {
        self.player_id.unwrap_or_default()
    }
}

pub async fn handle_connection(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let player_id = params.player_id();
        info!(player_id = %player_id, returning = params.player_id.is_some(), "Player connected");

        let (sender, receiver) = socket.split();
        state.notifier.register_player(player_id, sender).await;
        state.directory.set_online(player_id, true);
        state.service.player_logged_in(player_id).await;
        state.notifier.send(player_id, &Reply::Connected { player_id }).await;

        handle_messages(player_id, receiver, Arc::clone(&state)).await;

        info!(player_id = %player_id, "Player disconnected");
        state.directory.set_online(player_id, false);
        state.service.player_logged_out(player_id).await;
        state.notifier.unregister_player(player_id).await;
    })
}

async fn handle_messages(
    player_id: PlayerId,
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
) {
    while let Some(Ok(message)) = receiver.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        debug!(player_id = %player_id, message = %text, "<- Received");

        match serde_json::from_str::<IncomingMessage>(&text) {
            Ok(incoming) => handle_message(player_id, incoming, &state).await,
            Err(e) => {
                warn!(player_id = %player_id, error = %e, "Failed to parse message");
                let reply = Reply::Error {
                    message: e.to_string(),
                };
                state.notifier.send(player_id, &reply).await;
            }
        }
    }
}

async fn handle_message(
    player_id: PlayerId,
    message: IncomingMessage,
    state: &AppState,
) {
    let result = match message {
        IncomingMessage::JoinQueue {
            queue_type,
            team,
            level,
            members,
            is_premade,
            arena_team,
        } => {
            let request = JoinRequest {
                leader: player_id,
                members,
                team,
                level,
                queue_type,
                is_premade,
                arena_team,
            };
            state
                .service
                .join_queue(request)
                .await
                .map(|ticket_id| Some(Reply::Joined { queue_type, ticket_id }))
        }
        IncomingMessage::LeaveQueue { queue_type } => {
            state.service.leave_queue(player_id, queue_type).await;
            Ok(None)
        }
        IncomingMessage::AcceptInvitation { queue_type } => state
            .service
            .accept_invitation(player_id, queue_type)
            .await
            .map(|()| None),
        IncomingMessage::LeaveBattleground => {
            state.service.leave_battleground(player_id).await;
            Ok(None)
        }
    };

    match result {
        Ok(Some(reply)) => state.notifier.send(player_id, &reply).await,
        Ok(None) => {}
        Err(e) => reject(player_id, e, state).await,
    }
}

async fn reject(
    player_id: PlayerId,
    error: BattlegroundServiceError,
    state: &AppState,
) {
    debug!(player_id = %player_id, error = %error, "Request rejected");
    let reply = Reply::Error {
        message: error.to_string(),
    };
    state.notifier.send(player_id, &reply).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_params_reuse_supplied_id() {
        let player_id = PlayerId::new();
        let params = ConnectParams {
            player_id: Some(player_id),
        };

        assert_eq!(params.player_id(), player_id);
    }

    #[test]
    fn test_connect_params_mint_fresh_ids() {
        let params = ConnectParams::default();

        assert_ne!(params.player_id(), params.player_id());
    }
}
