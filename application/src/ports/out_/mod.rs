mod battleground;
mod common;
mod persistence;

pub use battleground::{BattlegroundNotification, BattlegroundNotifier, BattlegroundServiceError, WorldGateway};
pub use common::AsyncTimer;
pub use persistence::{ArenaTeamLedger, MatchStatisticsRepository};
