use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use domain::{Announcement, InvitationError, JoinError, PlayerId, QueueStatus, Scoreboard, WorldCommand};

#[derive(Debug, Error)]
pub enum BattlegroundServiceError {
    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    Invitation(#[from] InvitationError),
}

/// What a client gets to see of the battleground system.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BattlegroundNotification {
    Status(QueueStatus),
    Announcement(Announcement),
    StartTimer { remaining: Duration, total: Duration },
    Scoreboard(Scoreboard),
}

#[async_trait]
pub trait BattlegroundNotifier: Send + Sync {
    async fn notify_player(
        &self,
        player_id: PlayerId,
        notification: BattlegroundNotification,
    );

    /// Server-wide delivery to every connected player.
    async fn broadcast(
        &self,
        notification: BattlegroundNotification,
    );
}

/// Carries out the world-side half of a match: teleports, doors, resurrections, rewards.
#[async_trait]
pub trait WorldGateway: Send + Sync {
    async fn execute(
        &self,
        command: WorldCommand,
    );
}
