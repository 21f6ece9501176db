mod registry;


use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    ArenaRatings, ArenaTeamId, Battleground, BattlegroundCatalog, BattlegroundConfig, BattlegroundEffect,
    BattlegroundQueue, BracketEntry, BracketSummary, GroupId, InstanceId, InvitationError, JoinError, NewGroup,
    PlayerDirectory, PlayerId, QueueState, QueueTypeId, ScoreType, SpiritGuideId, Team,
};

pub use registry::{BattlegroundRegistry, ScheduledQueueUpdate};

/// A player may wait in at most this many queues at once.
pub const MAX_QUEUES_PER_PLAYER: usize = 2;

/// Arena team data attached to a rated arena join.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaTeamEntry {
    pub arena_team_id: ArenaTeamId,
    pub team_rating: u32,
    pub matchmaker_rating: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub leader: PlayerId,
    /// Other group members; empty for a solo join.
    #[serde(default)]
    pub members: Vec<PlayerId>,
    pub team: Team,
    pub level: u8,
    pub queue_type: QueueTypeId,
    #[serde(default)]
    pub is_premade: bool,
    #[serde(default)]
    pub arena_team: Option<ArenaTeamEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub queue_type: QueueTypeId,
    pub brackets: Vec<BracketSummary>,
}

/// Process-wide owner of every queue and live battleground.
#[derive(Debug)]
pub struct BattlegroundManager {
    registry: BattlegroundRegistry,
    queues: BTreeMap<QueueTypeId, BattlegroundQueue>,
    next_rated_arena_update: Duration,
}

impl BattlegroundManager {
    #[must_use]
    pub fn new(
        config: BattlegroundConfig,
        catalog: BattlegroundCatalog,
    ) -> Self {
        Self::with_registry(BattlegroundRegistry::new(config, catalog))
    }

    #[must_use]
    pub fn with_registry(registry: BattlegroundRegistry) -> Self {
        let next_rated_arena_update = registry.config().arena_rated_update_timer;
        Self {
            registry,
            queues: BTreeMap::new(),
            next_rated_arena_update,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &BattlegroundRegistry {
        &self.registry
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.registry.now()
    }

    #[must_use]
    pub fn battleground(
        &self,
        instance_id: InstanceId,
    ) -> Option<&Battleground> {
        self.registry.battleground(instance_id)
    }

    #[must_use]
    pub fn queue(
        &self,
        queue_type: QueueTypeId,
    ) -> Option<&BattlegroundQueue> {
        self.queues.get(&queue_type)
    }

    #[must_use]
    pub fn queue_summaries(&self) -> Vec<QueueSummary> {
        self.queues
            .values()
            .map(|queue| QueueSummary {
                queue_type: queue.queue_type(),
                brackets: queue.bracket_summaries(),
            })
            .collect()
    }

    /// Validates and enqueues a solo player or group.
    pub fn join_queue(
        &mut self,
        request: JoinRequest,
    ) -> Result<(GroupId, Vec<BattlegroundEffect>), JoinError> {
        let queue_type = request.queue_type;
        let bg_type_id = queue_type.battlemaster_list_id;

        let Some(template) = self.registry.catalog().template(bg_type_id) else {
            return Err(JoinError::JoinFailed(bg_type_id));
        };
        let Some(bracket) = self
            .registry
            .catalog()
            .bracket_by_level(template.map_id(), request.level)
            .copied()
        else {
            return Err(JoinError::JoinRangeIndex { level: request.level });
        };

        // leader first, each player once
        let mut seen = BTreeSet::new();
        let members: Vec<PlayerId> = std::iter::once(request.leader)
            .chain(request.members.iter().copied())
            .filter(|member| seen.insert(*member))
            .collect();

        let ratings = if queue_type.rated {
            let Some(arena_team) = request.arena_team else {
                return Err(JoinError::NotInGroup);
            };
            if members.len() != usize::from(queue_type.team_size) {
                return Err(JoinError::ArenaTeamPartySize {
                    size: members.len(),
                    team_size: queue_type.team_size,
                });
            }
            ArenaRatings {
                arena_team_id: Some(arena_team.arena_team_id),
                team_rating: arena_team.team_rating,
                matchmaker_rating: arena_team.matchmaker_rating,
                ..ArenaRatings::default()
            }
        } else {
            ArenaRatings::default()
        };

        for &member in &members {
            if self.queues.get(&queue_type).is_some_and(|q| q.contains(member)) {
                return Err(JoinError::AlreadyQueued(member));
            }
            let queued_in = self.queues.values().filter(|q| q.contains(member)).count();
            if queued_in >= MAX_QUEUES_PER_PLAYER {
                return Err(JoinError::TooManyQueues(member));
            }
        }

        let mut effects = Vec::new();
        let new_group = NewGroup {
            leader: request.leader,
            members,
            team: request.team,
            is_premade: request.is_premade,
            ratings,
        };
        let queue = self
            .queues
            .entry(queue_type)
            .or_insert_with(|| BattlegroundQueue::new(queue_type));
        let group_id = queue.add_group(&self.registry, new_group, &bracket, &mut effects);

        self.registry.schedule_queue_update(ScheduledQueueUpdate {
            arena_matchmaker_rating: ratings.matchmaker_rating,
            queue_type,
            bracket_id: bracket.bracket_id,
        });

        Ok((group_id, effects))
    }

    /// Leaves a queue, declining a pending invitation if there is one.
    pub fn leave_queue(
        &mut self,
        player_id: PlayerId,
        queue_type: QueueTypeId,
        directory: &dyn PlayerDirectory,
    ) -> Vec<BattlegroundEffect> {
        let mut effects = Vec::new();
        let Some(queue) = self.queues.get_mut(&queue_type) else {
            return effects;
        };
        let Some(group) = queue.player_group(player_id) else {
            debug!(%player_id, %queue_type, "Leave requested for a queue the player is not in");
            return effects;
        };
        let ticket = group.ticket(player_id);
        let bracket_id = group.bracket_id;
        let matchmaker_rating = group.ratings.matchmaker_rating;

        queue.remove_player(&mut self.registry, player_id, true, directory, &mut effects);
        effects.push(BattlegroundEffect::status(
            player_id,
            queue_type,
            Some(ticket),
            QueueState::None,
        ));

        if !queue_type.is_arena() {
            self.registry.schedule_queue_update(ScheduledQueueUpdate {
                arena_matchmaker_rating: matchmaker_rating,
                queue_type,
                bracket_id,
            });
        }
        effects
    }

    /// Moves an invited player from the queue into the battleground roster.
    pub fn accept_invitation(
        &mut self,
        player_id: PlayerId,
        queue_type: QueueTypeId,
        directory: &dyn PlayerDirectory,
    ) -> Result<Vec<BattlegroundEffect>, InvitationError> {
        let mut effects = Vec::new();
        let Some(queue) = self.queues.get_mut(&queue_type) else {
            return Err(InvitationError::NotQueued { player_id, queue_type });
        };
        let Some(group) = queue.player_group(player_id) else {
            return Err(InvitationError::NotQueued { player_id, queue_type });
        };
        let Some(instance_id) = group.invited_instance() else {
            return Err(InvitationError::NotInvited(player_id));
        };
        let team = group.team;

        if self.registry.battleground(instance_id).is_none() {
            warn!(%player_id, %instance_id, "Invitation points to a deleted battleground");
            queue.remove_player(&mut self.registry, player_id, false, directory, &mut effects);
            return Err(InvitationError::BattlegroundGone(instance_id));
        }

        queue.remove_player(&mut self.registry, player_id, false, directory, &mut effects);
        self.registry
            .with_battleground(instance_id, directory, &mut effects, |bg, ctx| {
                bg.add_player(player_id, team, ctx);
            });
        Ok(effects)
    }

    /// Leaves the battleground the player is seated in.
    pub fn leave_battleground(
        &mut self,
        player_id: PlayerId,
        directory: &dyn PlayerDirectory,
    ) -> Vec<BattlegroundEffect> {
        let mut effects = Vec::new();
        if let Some(instance_id) = self.registry.battleground_of(player_id) {
            self.registry
                .with_battleground(instance_id, directory, &mut effects, |bg, ctx| {
                    bg.remove_player_at_leave(player_id, true, true, ctx);
                });
        }
        effects
    }

    /// Drops the player from every queue and starts the offline timer in their battleground.
    pub fn player_logged_out(
        &mut self,
        player_id: PlayerId,
        directory: &dyn PlayerDirectory,
    ) -> Vec<BattlegroundEffect> {
        let mut effects = Vec::new();
        for queue in self.queues.values_mut() {
            if queue.contains(player_id) {
                queue.remove_player(&mut self.registry, player_id, true, directory, &mut effects);
            }
        }
        if let Some(instance_id) = self.registry.battleground_of(player_id) {
            self.registry
                .with_battleground(instance_id, directory, &mut effects, |bg, ctx| {
                    bg.player_logged_out(player_id, ctx);
                });
        }
        effects
    }

    pub fn player_logged_in(
        &mut self,
        player_id: PlayerId,
    ) {
        if let Some(instance_id) = self.registry.battleground_of(player_id) {
            if let Some(bg) = self.registry.battleground_mut(instance_id) {
                bg.player_logged_in(player_id);
            }
        }
    }

    pub fn handle_kill_player(
        &mut self,
        instance_id: InstanceId,
        victim: PlayerId,
        killer: Option<PlayerId>,
        directory: &dyn PlayerDirectory,
    ) -> Vec<BattlegroundEffect> {
        let mut effects = Vec::new();
        self.registry
            .with_battleground(instance_id, directory, &mut effects, |bg, ctx| {
                bg.handle_kill_player(victim, killer, ctx);
            });
        effects
    }

    pub fn add_player_to_resurrect_queue(
        &mut self,
        instance_id: InstanceId,
        spirit_guide: SpiritGuideId,
        player_id: PlayerId,
    ) -> bool {
        let Some(bg) = self.registry.battleground_mut(instance_id) else {
            return false;
        };
        bg.add_player_to_resurrect_queue(spirit_guide, player_id);
        true
    }

    pub fn update_player_score(
        &mut self,
        instance_id: InstanceId,
        player_id: PlayerId,
        kind: ScoreType,
        value: u32,
    ) {
        if let Some(bg) = self.registry.battleground_mut(instance_id) {
            bg.update_player_score(player_id, kind, value);
        }
    }

    pub fn create_new_battleground(
        &mut self,
        queue_type: QueueTypeId,
        bracket: BracketEntry,
        is_rated: bool,
    ) -> Option<InstanceId> {
        self.registry.create_battleground(queue_type, bracket, is_rated)
    }

    pub fn schedule_queue_update(
        &mut self,
        arena_matchmaker_rating: u32,
        queue_type: QueueTypeId,
        bracket_id: crate::BracketId,
    ) {
        self.registry.schedule_queue_update(ScheduledQueueUpdate {
            arena_matchmaker_rating,
            queue_type,
            bracket_id,
        });
    }

    /// One tick: battlegrounds, then invitation timers, then scheduled and periodic matchmaking.
    pub fn update(
        &mut self,
        diff: Duration,
        directory: &dyn PlayerDirectory,
    ) -> Vec<BattlegroundEffect> {
        let mut effects = Vec::new();
        self.registry.advance(diff);

        for instance_id in self.registry.instance_ids() {
            self.registry
                .with_battleground(instance_id, directory, &mut effects, |bg, ctx| bg.update(diff, ctx));
            if self
                .registry
                .battleground(instance_id)
                .is_some_and(Battleground::to_be_deleted)
            {
                self.registry.remove_battleground(instance_id);
            }
        }

        for queue in self.queues.values_mut() {
            queue.update_events(&mut self.registry, directory, &mut effects);
        }

        for update in self.registry.take_scheduled_updates() {
            let queue = self
                .queues
                .entry(update.queue_type)
                .or_insert_with(|| BattlegroundQueue::new(update.queue_type));
            queue.battleground_queue_update(
                &mut self.registry,
                update.bracket_id,
                update.arena_matchmaker_rating,
                directory,
                &mut effects,
            );
        }

        let max_rating_difference = self.registry.config().arena_max_rating_difference;
        let rated_update_timer = self.registry.config().arena_rated_update_timer;
        if max_rating_difference > 0 && !rated_update_timer.is_zero() {
            if self.next_rated_arena_update <= diff {
                for queue in self
                    .queues
                    .values_mut()
                    .filter(|q| q.queue_type().rated && q.queue_type().is_arena())
                {
                    for bracket_id in queue.active_brackets() {
                        queue.battleground_queue_update(&mut self.registry, bracket_id, 0, directory, &mut effects);
                    }
                }
                self.next_rated_arena_update = rated_update_timer;
            } else {
                self.next_rated_arena_update -= diff;
            }
        }

        effects
    }
}
