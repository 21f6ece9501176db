use async_trait::async_trait;

use domain::{ArenaTeamEvent, MatchRecord};

/// Fire-and-forget store for finished matches.
#[async_trait]
pub trait MatchStatisticsRepository: Send + Sync {
    async fn save_match(
        &self,
        record: MatchRecord,
    );
}

#[async_trait]
pub trait ArenaTeamLedger: Send + Sync {
    async fn record(
        &self,
        event: ArenaTeamEvent,
    );
}
