use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::ports::out_::{
    ArenaTeamLedger, BattlegroundNotification, BattlegroundNotifier, BattlegroundServiceError, MatchStatisticsRepository,
    WorldGateway,
};
use domain::{
    Battleground, BattlegroundEffect, BattlegroundManager, GroupId, InstanceId, JoinRequest, PlayerDirectory, PlayerId,
    QueueState, QueueSummary, QueueTypeId, ScoreType, SpiritGuideId,
};

/// Runs battleground use cases against the shared manager and delivers their effects.
///
/// The manager lock is released before any effect is dispatched.
pub struct BattlegroundService {
    manager: Mutex<BattlegroundManager>,
    directory: Arc<dyn PlayerDirectory>,
    notifier: Arc<dyn BattlegroundNotifier>,
    world: Arc<dyn WorldGateway>,
    statistics: Arc<dyn MatchStatisticsRepository>,
    arena_teams: Arc<dyn ArenaTeamLedger>,
}

impl BattlegroundService {
    pub fn new(
        manager: BattlegroundManager,
        directory: Arc<dyn PlayerDirectory>,
        notifier: Arc<dyn BattlegroundNotifier>,
        world: Arc<dyn WorldGateway>,
        statistics: Arc<dyn MatchStatisticsRepository>,
        arena_teams: Arc<dyn ArenaTeamLedger>,
    ) -> Self {
        Self {
            manager: Mutex::new(manager),
            directory,
            notifier,
            world,
            statistics,
            arena_teams,
        }
    }

    /// Queues a player or group. A refused join is also reported to the leader as a failed status.
    pub async fn join_queue(
        &self,
        request: JoinRequest,
    ) -> Result<GroupId, BattlegroundServiceError> {
        let leader = request.leader;
        let queue_type = request.queue_type;
        let result = self.manager.lock().await.join_queue(request);

        match result {
            Ok((group_id, effects)) => {
                self.dispatch(effects).await;
                Ok(group_id)
            }
            Err(reason) => {
                debug!(player_id = %leader, %queue_type, %reason, "Join refused");
                let failed = BattlegroundEffect::status(leader, queue_type, None, QueueState::Failed {
                    reason: reason.clone(),
                });
                self.dispatch(vec![failed]).await;
                Err(reason.into())
            }
        }
    }

    pub async fn leave_queue(
        &self,
        player_id: PlayerId,
        queue_type: QueueTypeId,
    ) {
        let effects = self
            .manager
            .lock()
            .await
            .leave_queue(player_id, queue_type, self.directory.as_ref());
        self.dispatch(effects).await;
    }

    pub async fn accept_invitation(
        &self,
        player_id: PlayerId,
        queue_type: QueueTypeId,
    ) -> Result<(), BattlegroundServiceError> {
        let effects = self
            .manager
            .lock()
            .await
            .accept_invitation(player_id, queue_type, self.directory.as_ref())?;
        self.dispatch(effects).await;
        Ok(())
    }

    pub async fn leave_battleground(
        &self,
        player_id: PlayerId,
    ) {
        let effects = self
            .manager
            .lock()
            .await
            .leave_battleground(player_id, self.directory.as_ref());
        self.dispatch(effects).await;
    }

    pub async fn player_logged_in(
        &self,
        player_id: PlayerId,
    ) {
        self.manager.lock().await.player_logged_in(player_id);
    }

    pub async fn player_logged_out(
        &self,
        player_id: PlayerId,
    ) {
        let effects = self
            .manager
            .lock()
            .await
            .player_logged_out(player_id, self.directory.as_ref());
        self.dispatch(effects).await;
    }

    pub async fn handle_kill_player(
        &self,
        instance_id: InstanceId,
        victim: PlayerId,
        killer: Option<PlayerId>,
    ) {
        let effects = self
            .manager
            .lock()
            .await
            .handle_kill_player(instance_id, victim, killer, self.directory.as_ref());
        self.dispatch(effects).await;
    }

    pub async fn update_player_score(
        &self,
        instance_id: InstanceId,
        player_id: PlayerId,
        kind: ScoreType,
        value: u32,
    ) {
        self.manager
            .lock()
            .await
            .update_player_score(instance_id, player_id, kind, value);
    }

    pub async fn add_player_to_resurrect_queue(
        &self,
        instance_id: InstanceId,
        spirit_guide: SpiritGuideId,
        player_id: PlayerId,
    ) -> bool {
        self.manager
            .lock()
            .await
            .add_player_to_resurrect_queue(instance_id, spirit_guide, player_id)
    }

    /// Advances the whole system by `diff`.
    pub async fn tick(
        &self,
        diff: Duration,
    ) {
        let effects = self.manager.lock().await.update(diff, self.directory.as_ref());
        self.dispatch(effects).await;
    }

    pub async fn queue_summaries(&self) -> Vec<QueueSummary> {
        self.manager.lock().await.queue_summaries()
    }

    /// Snapshot of a live battleground.
    pub async fn battleground(
        &self,
        instance_id: InstanceId,
    ) -> Option<Battleground> {
        self.manager.lock().await.battleground(instance_id).cloned()
    }

    /// Instance the player was last invited to by `queue_type`, while the invitation is pending.
    pub async fn pending_invitation(
        &self,
        player_id: PlayerId,
        queue_type: QueueTypeId,
    ) -> Option<InstanceId> {
        self.manager
            .lock()
            .await
            .queue(queue_type)
            .and_then(|queue| queue.player_group(player_id))
            .and_then(|group| group.invited_instance())
    }

    async fn dispatch(
        &self,
        effects: Vec<BattlegroundEffect>,
    ) {
        for effect in effects {
            match effect {
                BattlegroundEffect::Status { player_id, status } => {
                    if self.directory.is_online(player_id) {
                        self.notifier
                            .notify_player(player_id, BattlegroundNotification::Status(status))
                            .await;
                    }
                }
                BattlegroundEffect::Message {
                    recipients,
                    announcement,
                } => {
                    for player_id in recipients {
                        self.notifier
                            .notify_player(player_id, BattlegroundNotification::Announcement(announcement.clone()))
                            .await;
                    }
                }
                BattlegroundEffect::WorldAnnouncement(announcement) => {
                    self.notifier
                        .broadcast(BattlegroundNotification::Announcement(announcement))
                        .await;
                }
                BattlegroundEffect::StartTimer {
                    player_id,
                    remaining,
                    total,
                } => {
                    self.notifier
                        .notify_player(player_id, BattlegroundNotification::StartTimer { remaining, total })
                        .await;
                }
                BattlegroundEffect::Scoreboard { player_id, scoreboard } => {
                    self.notifier
                        .notify_player(player_id, BattlegroundNotification::Scoreboard(scoreboard))
                        .await;
                }
                BattlegroundEffect::World(command) => self.world.execute(command).await,
                BattlegroundEffect::RecordMatch(record) => {
                    debug!(match_id = record.match_id, "Storing match statistics");
                    self.statistics.save_match(record).await;
                }
                BattlegroundEffect::Arena(event) => self.arena_teams.record(event).await,
            }
        }
    }
}
