mod battleground;
mod config;
mod directory;
mod effect;
mod error;
mod manager;
mod queue;
mod template;
mod types;

#[cfg(test)]
mod test_support;

pub use battleground::{
    ArenaRules, Battleground, BattlegroundParams, BattlegroundPlayer, BattlegroundScore, BattlegroundStatus, MatchContext,
    MatchKind, MatchRules, PlayerEvent, Roster, ScoreType, StandardRules, StartingEvents, bonus_honor_from_kills,
};
pub use config::{BattlegroundConfig, InvitationType};
pub use directory::PlayerDirectory;
pub use effect::{
    Announcement, ArenaTeamEvent, BattlegroundEffect, Criteria, MatchRecord, PlayerMatchRecord, QueueState, QueueStatus,
    QueueTicket, Scoreboard, ScoreboardRow, WorldCommand,
};
pub use error::{InvitationError, JoinError};
pub use manager::{
    ArenaTeamEntry, BattlegroundManager, BattlegroundRegistry, JoinRequest, MAX_QUEUES_PER_PLAYER, QueueSummary,
    ScheduledQueueUpdate,
};
pub use queue::{
    ArenaRatings, BattlegroundQueue, BracketSummary, GroupQueueInfo, InvitationState, InviteEvent, InviteEventKind,
    NewGroup, PoolAdmission, SelectedGroup, SelectionPool, SubQueue, TimedEvents,
};
pub use template::{BattlegroundCatalog, BattlegroundTemplate, BracketEntry};
pub use types::{
    ArenaTeamId, BattlegroundTypeId, BracketId, GroupId, InstanceId, MapId, PerTeam, PlayerId, Position, QueueKind,
    QueueTypeId, SpiritGuideId, Team,
};
