mod events;
mod group;
mod invitation;
mod matchmaking;
mod selection_pool;

#[cfg(test)]
mod tests;

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error};

use crate::{
    Announcement, BattlegroundEffect, BattlegroundRegistry, BracketEntry, BracketId, GroupId, PerTeam, PlayerDirectory,
    PlayerId, QueueState, QueueTypeId, Team,
};

pub use events::{InviteEvent, InviteEventKind, TimedEvents};
pub use group::{ArenaRatings, GroupQueueInfo, InvitationState, SubQueue};
pub use selection_pool::{PoolAdmission, SelectedGroup, SelectionPool};

use group::PlayerQueueInfo;

/// Samples kept per (team, bracket) for the average wait time.
const COUNT_OF_PLAYERS_TO_AVERAGE_WAIT_TIME: usize = 10;

/// A join request after validation.
#[derive(Clone, Debug)]
pub struct NewGroup {
    pub leader: PlayerId,
    /// Includes the leader. Empty means the leader joins alone.
    pub members: Vec<PlayerId>,
    pub team: Team,
    pub is_premade: bool,
    pub ratings: ArenaRatings,
}

#[derive(Debug, Default)]
struct BracketQueues {
    rows: [VecDeque<GroupId>; 4],
}

impl BracketQueues {
    fn row(
        &self,
        sub_queue: SubQueue,
    ) -> &VecDeque<GroupId> {
        &self.rows[sub_queue.index()]
    }

    fn row_mut(
        &mut self,
        sub_queue: SubQueue,
    ) -> &mut VecDeque<GroupId> {
        &mut self.rows[sub_queue.index()]
    }

    fn is_empty(&self) -> bool {
        self.rows.iter().all(VecDeque::is_empty)
    }

    fn unlink(
        &mut self,
        group_id: GroupId,
    ) -> Option<SubQueue> {
        for sub_queue in SubQueue::ALL {
            let row = self.row_mut(sub_queue);
            if let Some(pos) = row.iter().position(|id| *id == group_id) {
                row.remove(pos);
                return Some(sub_queue);
            }
        }
        None
    }
}

#[derive(Debug, Default, Clone)]
struct WaitTimeSamples {
    samples: [Duration; COUNT_OF_PLAYERS_TO_AVERAGE_WAIT_TIME],
    sum: Duration,
    next: usize,
    full: bool,
}

impl WaitTimeSamples {
    fn record(
        &mut self,
        sample: Duration,
    ) {
        self.sum -= self.samples[self.next];
        self.samples[self.next] = sample;
        self.sum += sample;
        self.next = (self.next + 1) % COUNT_OF_PLAYERS_TO_AVERAGE_WAIT_TIME;
        if self.next == 0 {
            self.full = true;
        }
    }

    fn average(&self) -> Duration {
        if self.full {
            self.sum / COUNT_OF_PLAYERS_TO_AVERAGE_WAIT_TIME as u32
        } else {
            Duration::ZERO
        }
    }
}

/// Player counts of one bracket, as reported by the queue listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BracketSummary {
    pub bracket_id: BracketId,
    pub premade_alliance: usize,
    pub premade_horde: usize,
    pub normal_alliance: usize,
    pub normal_horde: usize,
    pub invited_groups: usize,
}

/// Waiting room of one queue type, partitioned by bracket and sub-queue.
#[derive(Debug)]
pub struct BattlegroundQueue {
    queue_type: QueueTypeId,
    groups: HashMap<GroupId, GroupQueueInfo>,
    players: HashMap<PlayerId, PlayerQueueInfo>,
    brackets: HashMap<BracketId, BracketQueues>,
    pools: PerTeam<SelectionPool>,
    wait_times: HashMap<(usize, BracketId), WaitTimeSamples>,
    events: TimedEvents,
    next_group_id: u64,
}

impl BattlegroundQueue {
    #[must_use]
    pub fn new(queue_type: QueueTypeId) -> Self {
        Self {
            queue_type,
            groups: HashMap::new(),
            players: HashMap::new(),
            brackets: HashMap::new(),
            pools: PerTeam::default(),
            wait_times: HashMap::new(),
            events: TimedEvents::default(),
            next_group_id: 0,
        }
    }

    #[must_use]
    pub fn queue_type(&self) -> QueueTypeId {
        self.queue_type
    }

    #[must_use]
    pub fn contains(
        &self,
        player_id: PlayerId,
    ) -> bool {
        self.players.contains_key(&player_id)
    }

    #[must_use]
    pub fn group(
        &self,
        group_id: GroupId,
    ) -> Option<&GroupQueueInfo> {
        self.groups.get(&group_id)
    }

    #[must_use]
    pub fn player_group(
        &self,
        player_id: PlayerId,
    ) -> Option<&GroupQueueInfo> {
        self.players
            .get(&player_id)
            .and_then(|info| self.groups.get(&info.group_id))
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.keys().copied()
    }

    /// Groups of one sub-queue, front first.
    pub fn groups_in(
        &self,
        bracket_id: BracketId,
        sub_queue: SubQueue,
    ) -> impl Iterator<Item = &GroupQueueInfo> + '_ {
        self.brackets
            .get(&bracket_id)
            .into_iter()
            .flat_map(move |rows| rows.row(sub_queue).iter())
            .filter_map(|id| self.groups.get(id))
    }

    #[must_use]
    pub fn is_bracket_empty(
        &self,
        bracket_id: BracketId,
    ) -> bool {
        self.brackets.get(&bracket_id).is_none_or(BracketQueues::is_empty)
    }

    #[must_use]
    pub fn active_brackets(&self) -> Vec<BracketId> {
        let mut brackets: Vec<BracketId> = self
            .brackets
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(id, _)| *id)
            .collect();
        brackets.sort();
        brackets
    }

    #[must_use]
    pub fn selection_pool(
        &self,
        team: Team,
    ) -> &SelectionPool {
        self.pools.get(team)
    }

    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn bracket_summaries(&self) -> Vec<BracketSummary> {
        self.active_brackets()
            .into_iter()
            .map(|bracket_id| {
                let players = |sub_queue| {
                    self.groups_in(bracket_id, sub_queue)
                        .map(GroupQueueInfo::size)
                        .sum()
                };
                BracketSummary {
                    bracket_id,
                    premade_alliance: players(SubQueue::PremadeAlliance),
                    premade_horde: players(SubQueue::PremadeHorde),
                    normal_alliance: players(SubQueue::NormalAlliance),
                    normal_horde: players(SubQueue::NormalHorde),
                    invited_groups: SubQueue::ALL
                        .iter()
                        .flat_map(|&sub_queue| self.groups_in(bracket_id, sub_queue))
                        .filter(|g| g.is_invited())
                        .count(),
                }
            })
            .collect()
    }

    /// Average wait of the last invited players on the group's side. Zero until enough samples exist.
    #[must_use]
    pub fn average_wait_time(
        &self,
        group: &GroupQueueInfo,
    ) -> Duration {
        self.wait_times
            .get(&(wait_time_index(self.queue_type, group), group.bracket_id))
            .map_or(Duration::ZERO, WaitTimeSamples::average)
    }

    /// Enqueues a new group and answers each member with a queued status.
    pub fn add_group(
        &mut self,
        registry: &BattlegroundRegistry,
        new_group: NewGroup,
        bracket: &BracketEntry,
        effects: &mut Vec<BattlegroundEffect>,
    ) -> GroupId {
        let now = registry.now();
        let config = registry.config();

        self.next_group_id += 1;
        let group_id = GroupId(self.next_group_id);

        let mut players: BTreeSet<PlayerId> = new_group.members.into_iter().collect();
        players.insert(new_group.leader);

        let is_rated = self.queue_type.rated;
        let sub_queue = if !is_rated && !new_group.is_premade {
            SubQueue::normal(new_group.team)
        } else {
            SubQueue::premade(new_group.team)
        };

        let group = GroupQueueInfo {
            id: group_id,
            team: new_group.team,
            bg_type_id: self.queue_type.battlemaster_list_id,
            bracket_id: bracket.bracket_id,
            arena_type: self.queue_type.team_size,
            is_rated,
            join_time: now,
            invitation: InvitationState::Queued,
            ratings: new_group.ratings,
            players,
        };

        for &player_id in &group.players {
            self.players.insert(
                player_id,
                PlayerQueueInfo {
                    last_online_time: now,
                    group_id,
                },
            );
        }

        debug!(
            group_id = group_id.0,
            queue_type = %self.queue_type,
            bracket_id = bracket.bracket_id.0,
            size = group.size(),
            ?sub_queue,
            "Adding group to battleground queue"
        );

        self.brackets
            .entry(bracket.bracket_id)
            .or_default()
            .row_mut(sub_queue)
            .push_back(group_id);

        let average_wait = self.average_wait_time(&group);
        for &player_id in &group.players {
            effects.push(BattlegroundEffect::status(
                player_id,
                self.queue_type,
                Some(group.ticket(player_id)),
                QueueState::Queued {
                    average_wait,
                    wait_time: Duration::ZERO,
                    as_group: group.size() > 1,
                },
            ));
        }

        if is_rated && config.arena_queue_announcer {
            if let Some(arena_team_id) = group.ratings.arena_team_id {
                effects.push(BattlegroundEffect::WorldAnnouncement(
                    Announcement::ArenaTeamJoinedQueue {
                        arena_team_id,
                        team_size: group.arena_type,
                        rating: group.ratings.team_rating,
                    },
                ));
            }
        }

        if !is_rated && !new_group.is_premade && !self.queue_type.is_arena() && config.queue_announcer {
            if let Some(template) = registry.catalog().template(group.bg_type_id) {
                let queued = |team: Team| -> u32 {
                    let count: usize = self
                        .groups_in(bracket.bracket_id, SubQueue::normal(team))
                        .filter(|g| !g.is_invited())
                        .map(GroupQueueInfo::size)
                        .sum();
                    u32::try_from(count).unwrap_or(u32::MAX)
                };
                // the new group is not stored yet, count it by hand
                let own = u32::try_from(group.size()).unwrap_or(u32::MAX);
                let (alliance_queued, horde_queued) = match group.team {
                    Team::Alliance => (queued(Team::Alliance) + own, queued(Team::Horde)),
                    Team::Horde => (queued(Team::Alliance), queued(Team::Horde) + own),
                };
                let needed = |queued: u32| template.min_players_per_team.saturating_sub(queued);
                let announcement = Announcement::QueueStatus {
                    bg_type_id: group.bg_type_id,
                    min_level: bracket.min_level,
                    max_level: bracket.max_level,
                    alliance_queued,
                    alliance_needed: needed(alliance_queued),
                    horde_queued,
                    horde_needed: needed(horde_queued),
                };
                if config.queue_announcer_player_only {
                    effects.push(BattlegroundEffect::Message {
                        recipients: vec![new_group.leader],
                        announcement,
                    });
                } else {
                    effects.push(BattlegroundEffect::WorldAnnouncement(announcement));
                }
            }
        }

        self.groups.insert(group_id, group);
        group_id
    }

    /// Drops `player_id` from its group, dissolving the group once empty.
    ///
    /// A rated group that was not invited yet leaves the queue as a whole.
    pub fn remove_player(
        &mut self,
        registry: &mut BattlegroundRegistry,
        player_id: PlayerId,
        decrease_invited_count: bool,
        directory: &dyn PlayerDirectory,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        let Some(info) = self.players.remove(&player_id) else {
            debug!(%player_id, queue_type = %self.queue_type, "Player is not in the queue");
            return;
        };
        let Some(group) = self.groups.get_mut(&info.group_id) else {
            error!(%player_id, group_id = info.group_id.0, "Queued player references a missing group");
            return;
        };

        group.players.remove(&player_id);
        debug!(
            %player_id,
            group_id = group.id.0,
            queue_type = %self.queue_type,
            idle = ?registry.now().saturating_sub(info.last_online_time),
            "Removing player from battleground queue"
        );

        if decrease_invited_count {
            if let Some(instance_id) = group.invited_instance() {
                if let Some(bg) = registry.battleground_mut(instance_id) {
                    bg.decrease_invited_count(group.team);
                }
            }
        }

        if let Some(arena_team_id) = group.ratings.arena_team_id {
            if group.is_rated && group.players.is_empty() && registry.config().arena_queue_announcer {
                effects.push(BattlegroundEffect::WorldAnnouncement(
                    Announcement::ArenaTeamLeftQueue {
                        arena_team_id,
                        team_size: group.arena_type,
                        rating: group.ratings.team_rating,
                    },
                ));
            }

            if group.is_invited() && group.is_rated && decrease_invited_count {
                effects.push(BattlegroundEffect::Arena(crate::ArenaTeamEvent::MemberLost {
                    arena_team_id,
                    player_id,
                    opponent_matchmaker_rating: group.ratings.opponents_matchmaker_rating,
                    online: directory.is_online(player_id),
                }));
            }
        }

        if group.players.is_empty() {
            let (group_id, bracket_id) = (group.id, group.bracket_id);
            self.groups.remove(&group_id);
            if let Some(rows) = self.brackets.get_mut(&bracket_id) {
                rows.unlink(group_id);
            }
            return;
        }

        if !group.is_invited() && group.is_rated {
            let Some(next) = group.players.first().copied() else {
                return;
            };
            if directory.is_online(next) {
                effects.push(BattlegroundEffect::status(
                    next,
                    self.queue_type,
                    Some(group.ticket(next)),
                    QueueState::None,
                ));
            }
            self.remove_player(registry, next, decrease_invited_count, directory, effects);
        }
    }

    #[must_use]
    pub fn is_player_invited(
        &self,
        player_id: PlayerId,
        instance_id: crate::InstanceId,
        remove_invite_time: Duration,
    ) -> bool {
        self.player_group(player_id)
            .is_some_and(|group| group.is_invited_to(instance_id, remove_invite_time))
    }

    pub fn reset_pools(&mut self) {
        self.pools.alliance.reset();
        self.pools.horde.reset();
    }

    fn selected_group_ids(&self) -> Vec<(Team, GroupId)> {
        Team::BOTH
            .iter()
            .flat_map(|&team| self.pools.get(team).group_ids().map(move |id| (team, id)))
            .collect()
    }

    fn record_wait_time(
        &mut self,
        index: usize,
        bracket_id: BracketId,
        sample: Duration,
    ) {
        self.wait_times
            .entry((index, bracket_id))
            .or_default()
            .record(sample);
    }
}

/// Rated arena teams share one wait-time side, skirmishes the other.
fn wait_time_index(
    queue_type: QueueTypeId,
    group: &GroupQueueInfo,
) -> usize {
    if !queue_type.is_arena() {
        group.team.index()
    } else if group.is_rated {
        Team::Horde.index()
    } else {
        Team::Alliance.index()
    }
}
