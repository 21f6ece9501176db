use serde::Serialize;
use thiserror::Error;

use crate::{BattlegroundTypeId, InstanceId, PlayerId, QueueTypeId};

/// Reason a join request was refused. Also the payload of a `Failed` queue status.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinError {
    #[error("no battleground template for type {0}")]
    JoinFailed(BattlegroundTypeId),

    #[error("no bracket covers level {level}")]
    JoinRangeIndex { level: u8 },

    #[error("player {0} is already queued")]
    AlreadyQueued(PlayerId),

    #[error("player {0} is queued in too many queues")]
    TooManyQueues(PlayerId),

    #[error("arena team party size {size} does not match {team_size}v{team_size}")]
    ArenaTeamPartySize { size: usize, team_size: u8 },

    #[error("rated arena joins need an arena team")]
    NotInGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvitationError {
    #[error("player {player_id} is not queued for {queue_type}")]
    NotQueued { player_id: PlayerId, queue_type: QueueTypeId },

    #[error("player {0} has no pending invitation")]
    NotInvited(PlayerId),

    #[error("battleground instance {0} no longer exists")]
    BattlegroundGone(InstanceId),
}
