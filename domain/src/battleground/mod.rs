mod lifecycle;
mod rules;
mod score;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    BattlegroundConfig, BattlegroundEffect, BattlegroundTemplate, BattlegroundTypeId, BracketEntry, BracketId,
    InstanceId, InvitationType, MapId, PerTeam, PlayerDirectory, PlayerId, Position, QueueState, QueueTypeId,
    ScheduledQueueUpdate, SpiritGuideId, Team, WorldCommand,
};

pub use rules::{ArenaRules, MatchKind, MatchRules, PlayerEvent, StandardRules};
pub use score::{BattlegroundScore, ScoreType, bonus_honor_from_kills};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BattlegroundStatus {
    #[default]
    None,
    /// Created, waiting for invitations to go out.
    WaitQueue,
    /// Preparation: players enter, doors are closed.
    WaitJoin,
    InProgress,
    /// Ended; players are evicted when the close timer runs out.
    WaitLeave,
}

/// Bit set of the start sequence steps already performed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StartingEvents(u8);

impl StartingEvents {
    pub const FIRST: Self = Self(0x01);
    pub const SECOND: Self = Self(0x02);
    pub const THIRD: Self = Self(0x04);
    pub const FOURTH: Self = Self(0x08);

    #[must_use]
    pub fn contains(
        self,
        other: Self,
    ) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(
        &mut self,
        other: Self,
    ) {
        self.0 |= other.0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BattlegroundPlayer {
    pub team: Team,
    pub offline_remove_time: Option<Duration>,
}

/// Players that entered the match, with per-team counts.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    players: BTreeMap<PlayerId, BattlegroundPlayer>,
    counts: PerTeam<u32>,
}

impl Roster {
    #[must_use]
    pub fn get(
        &self,
        player_id: PlayerId,
    ) -> Option<&BattlegroundPlayer> {
        self.players.get(&player_id)
    }

    #[must_use]
    pub fn contains(
        &self,
        player_id: PlayerId,
    ) -> bool {
        self.players.contains_key(&player_id)
    }

    #[must_use]
    pub fn count(
        &self,
        team: Team,
    ) -> u32 {
        *self.counts.get(team)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &BattlegroundPlayer)> + '_ {
        self.players.iter().map(|(id, player)| (*id, player))
    }

    pub fn team_members(
        &self,
        team: Team,
    ) -> impl Iterator<Item = PlayerId> + '_ {
        self.players
            .iter()
            .filter(move |(_, player)| player.team == team)
            .map(|(id, _)| *id)
    }

    /// Members of `team` that are online and alive.
    #[must_use]
    pub fn alive_count(
        &self,
        team: Team,
        directory: &dyn PlayerDirectory,
    ) -> usize {
        self.team_members(team)
            .filter(|&id| directory.is_online(id) && directory.is_alive(id))
            .count()
    }

    fn insert(
        &mut self,
        player_id: PlayerId,
        team: Team,
    ) -> bool {
        if self.players.contains_key(&player_id) {
            return false;
        }
        self.players.insert(
            player_id,
            BattlegroundPlayer {
                team,
                offline_remove_time: None,
            },
        );
        *self.counts.get_mut(team) += 1;
        true
    }

    fn remove(
        &mut self,
        player_id: PlayerId,
    ) -> Option<BattlegroundPlayer> {
        let player = self.players.remove(&player_id)?;
        let count = self.counts.get_mut(player.team);
        *count = count.saturating_sub(1);
        Some(player)
    }

    fn get_mut(
        &mut self,
        player_id: PlayerId,
    ) -> Option<&mut BattlegroundPlayer> {
        self.players.get_mut(&player_id)
    }

    fn clear(&mut self) {
        self.players.clear();
        self.counts = PerTeam::default();
    }
}

/// What a battleground needs from its owner while it advances.
pub struct MatchContext<'a> {
    pub now: Duration,
    pub config: &'a BattlegroundConfig,
    pub directory: &'a dyn PlayerDirectory,
    pub effects: &'a mut Vec<BattlegroundEffect>,
    pub queue_updates: &'a mut Vec<ScheduledQueueUpdate>,
    pub next_match_id: &'a mut u64,
    /// Players that already won a random battleground; they earn the reduced bonus.
    pub random_winners: &'a mut HashSet<PlayerId>,
}

impl MatchContext<'_> {
    pub fn schedule_queue_update(
        &mut self,
        update: ScheduledQueueUpdate,
    ) {
        if !self.queue_updates.contains(&update) {
            self.queue_updates.push(update);
        }
    }

    fn allocate_match_id(&mut self) -> u64 {
        *self.next_match_id += 1;
        *self.next_match_id
    }
}

/// Everything needed to instantiate a [`Battleground`].
#[derive(Clone, Copy, Debug)]
pub struct BattlegroundParams<'a> {
    pub instance_id: InstanceId,
    pub client_instance_id: u32,
    pub queue_type: QueueTypeId,
    /// Template of the concrete type, already resolved from a random type.
    pub template: &'a BattlegroundTemplate,
    pub bracket: BracketEntry,
    pub is_rated: bool,
}

/// One running match instance.
#[derive(Clone, Debug)]
pub struct Battleground {
    instance_id: InstanceId,
    client_instance_id: u32,
    queue_type: QueueTypeId,
    type_id: BattlegroundTypeId,
    concrete_type_id: BattlegroundTypeId,
    name: String,
    map_id: MapId,
    bracket: BracketEntry,
    is_rated: bool,
    min_players_per_team: u32,
    max_players_per_team: u32,
    start_locations: PerTeam<Position>,
    start_max_dist: f32,

    status: BattlegroundStatus,
    elapsed: Duration,
    remaining: Duration,
    start_delay: Duration,
    countdown_timer: Duration,
    position_check_timer: Duration,
    last_resurrect_time: Duration,
    premature_countdown: Option<Duration>,
    starting_events: StartingEvents,
    winner: Option<Team>,

    invited: PerTeam<u32>,
    roster: Roster,
    scores: BTreeMap<PlayerId, BattlegroundScore>,
    offline_queue: VecDeque<PlayerId>,
    revive_queue: BTreeMap<SpiritGuideId, Vec<PlayerId>>,
    resurrect_queue: Vec<PlayerId>,

    in_free_slot_queue: bool,
    to_be_deleted: bool,
    rules: MatchKind,
}

impl Battleground {
    #[must_use]
    pub fn new(params: BattlegroundParams<'_>) -> Self {
        let template = params.template;
        let (rules, min_players_per_team, max_players_per_team) = if template.is_arena {
            let team_size = u32::from(params.queue_type.team_size);
            (MatchKind::Arena(ArenaRules::new(params.queue_type.team_size)), team_size, team_size)
        } else {
            (
                MatchKind::Standard(StandardRules),
                template.min_players_per_team,
                template.max_players_per_team,
            )
        };

        let mut bg = Self {
            instance_id: params.instance_id,
            client_instance_id: params.client_instance_id,
            queue_type: params.queue_type,
            type_id: params.queue_type.battlemaster_list_id,
            concrete_type_id: template.id,
            name: template.name.clone(),
            map_id: template.map_id(),
            bracket: params.bracket,
            is_rated: params.is_rated,
            min_players_per_team,
            max_players_per_team,
            start_locations: template.start_locations,
            start_max_dist: template.start_max_dist,
            status: BattlegroundStatus::None,
            elapsed: Duration::ZERO,
            remaining: Duration::ZERO,
            start_delay: Duration::ZERO,
            countdown_timer: Duration::ZERO,
            position_check_timer: Duration::ZERO,
            last_resurrect_time: Duration::ZERO,
            premature_countdown: None,
            starting_events: StartingEvents::default(),
            winner: None,
            invited: PerTeam::default(),
            roster: Roster::default(),
            scores: BTreeMap::new(),
            offline_queue: VecDeque::new(),
            revive_queue: BTreeMap::new(),
            resurrect_queue: Vec::new(),
            in_free_slot_queue: false,
            to_be_deleted: false,
            rules,
        };
        bg.reset();
        bg
    }

    #[must_use]
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    #[must_use]
    pub fn client_instance_id(&self) -> u32 {
        self.client_instance_id
    }

    #[must_use]
    pub fn queue_type(&self) -> QueueTypeId {
        self.queue_type
    }

    /// The type players queued for, possibly a random type.
    #[must_use]
    pub fn type_id(&self) -> BattlegroundTypeId {
        self.type_id
    }

    #[must_use]
    pub fn concrete_type_id(&self) -> BattlegroundTypeId {
        self.concrete_type_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn map_id(&self) -> MapId {
        self.map_id
    }

    #[must_use]
    pub fn bracket_id(&self) -> BracketId {
        self.bracket.bracket_id
    }

    #[must_use]
    pub fn status(&self) -> BattlegroundStatus {
        self.status
    }

    #[must_use]
    pub fn is_arena(&self) -> bool {
        matches!(self.rules, MatchKind::Arena(_))
    }

    #[must_use]
    pub fn is_battleground(&self) -> bool {
        !self.is_arena()
    }

    #[must_use]
    pub fn is_rated(&self) -> bool {
        self.is_rated
    }

    #[must_use]
    pub fn is_random(&self) -> bool {
        self.is_battleground() && self.type_id != self.concrete_type_id
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    #[must_use]
    pub fn winner(&self) -> Option<Team> {
        self.winner
    }

    #[must_use]
    pub fn starting_events(&self) -> StartingEvents {
        self.starting_events
    }

    #[must_use]
    pub fn premature_countdown(&self) -> Option<Duration> {
        self.premature_countdown
    }

    #[must_use]
    pub fn min_players_per_team(&self) -> u32 {
        self.min_players_per_team
    }

    #[must_use]
    pub fn max_players_per_team(&self) -> u32 {
        self.max_players_per_team
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn player_count(
        &self,
        team: Team,
    ) -> u32 {
        self.roster.count(team)
    }

    #[must_use]
    pub fn invited_count(
        &self,
        team: Team,
    ) -> u32 {
        *self.invited.get(team)
    }

    #[must_use]
    pub fn score(
        &self,
        player_id: PlayerId,
    ) -> Option<&BattlegroundScore> {
        self.scores.get(&player_id)
    }

    #[must_use]
    pub fn offline_queue(&self) -> &VecDeque<PlayerId> {
        &self.offline_queue
    }

    #[must_use]
    pub fn rules(&self) -> &MatchKind {
        &self.rules
    }

    #[must_use]
    pub fn to_be_deleted(&self) -> bool {
        self.to_be_deleted
    }

    #[must_use]
    pub fn in_free_slot_queue(&self) -> bool {
        self.in_free_slot_queue
    }

    #[must_use]
    pub fn has_free_slots(&self) -> bool {
        self.roster.len() < (self.max_players_per_team * 2) as usize
    }

    pub fn increase_invited_count(
        &mut self,
        team: Team,
    ) {
        *self.invited.get_mut(team) += 1;
    }

    pub fn decrease_invited_count(
        &mut self,
        team: Team,
    ) {
        let invited = self.invited.get_mut(team);
        *invited = invited.saturating_sub(1);
    }

    /// Standard matches advertise free seats while joinable.
    pub fn add_to_free_slot_queue(&mut self) {
        if self.is_battleground() {
            self.in_free_slot_queue = true;
        }
    }

    pub fn remove_from_free_slot_queue(&mut self) {
        self.in_free_slot_queue = false;
    }

    pub fn set_arena_team_id_for_team(
        &mut self,
        team: Team,
        arena_team_id: Option<crate::ArenaTeamId>,
    ) {
        if let MatchKind::Arena(arena) = &mut self.rules {
            *arena.team_ids.get_mut(team) = arena_team_id;
        }
    }

    pub fn set_arena_matchmaker_rating(
        &mut self,
        team: Team,
        rating: u32,
    ) {
        if let MatchKind::Arena(arena) = &mut self.rules {
            *arena.matchmaker_ratings.get_mut(team) = rating;
        }
    }

    /// Seats still open to `team`, honoring the balance mode.
    #[must_use]
    pub fn free_slots_for_team(
        &self,
        team: Team,
        invitation_type: InvitationType,
    ) -> u32 {
        let max = self.max_players_per_team;
        let this_invited = self.invited_count(team);

        if self.status == BattlegroundStatus::WaitJoin && invitation_type == InvitationType::NoBalance {
            return max.saturating_sub(this_invited);
        }

        if !matches!(self.status, BattlegroundStatus::WaitJoin | BattlegroundStatus::InProgress) {
            return 0;
        }

        let other_invited = self.invited_count(team.other());
        let this_players = self.player_count(team);
        let other_players = self.player_count(team.other());

        let by_invited = if other_invited == this_invited {
            1
        } else if other_invited > this_invited {
            other_invited - this_invited
        } else {
            0
        };
        let by_capacity = max.saturating_sub(this_invited);
        let by_players = if other_players == this_players {
            1
        } else if other_players > this_players {
            other_players - this_players
        } else if this_invited <= self.min_players_per_team {
            self.min_players_per_team - this_invited + 1
        } else {
            0
        };

        by_invited.min(by_capacity).min(by_players)
    }

    /// Seats an accepted player. Invited counters already include them.
    pub fn add_player(
        &mut self,
        player_id: PlayerId,
        team: Team,
        ctx: &mut MatchContext<'_>,
    ) {
        if !self.roster.insert(player_id, team) {
            warn!(%player_id, instance_id = %self.instance_id, "Player is already in the battleground");
            return;
        }
        self.scores.insert(player_id, BattlegroundScore::default());

        debug!(%player_id, instance_id = %self.instance_id, ?team, "Player entered battleground");

        ctx.effects.push(BattlegroundEffect::World(WorldCommand::Teleport {
            player_id,
            map_id: self.map_id,
            position: *self.start_locations.get(team),
        }));
        ctx.effects.push(self.active_status(player_id, team));
        if self.status == BattlegroundStatus::WaitJoin {
            let total = self.countdown_max();
            ctx.effects.push(BattlegroundEffect::StartTimer {
                player_id,
                remaining: total.saturating_sub(self.elapsed),
                total,
            });
        }
    }

    /// Takes a player out of the match: on leave, offline timeout, or final eviction.
    pub fn remove_player_at_leave(
        &mut self,
        player_id: PlayerId,
        transport: bool,
        send_status: bool,
        ctx: &mut MatchContext<'_>,
    ) {
        let online = ctx.directory.is_online(player_id);
        let participant = self.roster.remove(player_id);

        self.scores.remove(&player_id);
        self.remove_player_from_resurrect_queue(player_id);
        self.offline_queue.retain(|id| *id != player_id);

        if online && !ctx.directory.is_alive(player_id) {
            ctx.effects
                .push(BattlegroundEffect::World(WorldCommand::Resurrect { player_id }));
        }

        if let Some(player) = participant {
            let team = player.team;
            debug!(%player_id, instance_id = %self.instance_id, ?team, "Player left battleground");

            if self.status == BattlegroundStatus::InProgress {
                let event = PlayerEvent::Left { player_id, team };
                if let Some(winner) = self.rules.handle_player_event(event, &self.roster, ctx.directory) {
                    self.end_battleground(Some(winner), ctx);
                }
            }

            if send_status && online {
                ctx.effects.push(BattlegroundEffect::status(
                    player_id,
                    self.queue_type,
                    None,
                    QueueState::None,
                ));
            }

            if self.is_rated && self.status == BattlegroundStatus::InProgress {
                if let Some((arena_team_id, opponent_matchmaker_rating)) = self.rules.member_lost_penalty(team) {
                    ctx.effects
                        .push(BattlegroundEffect::Arena(crate::ArenaTeamEvent::MemberLost {
                            arena_team_id,
                            player_id,
                            opponent_matchmaker_rating,
                            online,
                        }));
                }
            }

            self.decrease_invited_count(team);

            if self.is_battleground() && self.status < BattlegroundStatus::WaitLeave {
                self.add_to_free_slot_queue();
                ctx.schedule_queue_update(ScheduledQueueUpdate {
                    arena_matchmaker_rating: 0,
                    queue_type: self.queue_type,
                    bracket_id: self.bracket_id(),
                });
            }
        }

        if transport && online {
            ctx.effects
                .push(BattlegroundEffect::World(WorldCommand::TeleportToEntryPoint { player_id }));
        }
    }

    pub fn player_logged_out(
        &mut self,
        player_id: PlayerId,
        ctx: &mut MatchContext<'_>,
    ) {
        let Some(player) = self.roster.get_mut(player_id) else {
            return;
        };
        player.offline_remove_time = Some(ctx.now + ctx.config.max_offline_time);
        let team = player.team;
        self.offline_queue.push_back(player_id);

        if self.status == BattlegroundStatus::InProgress {
            let event = PlayerEvent::LoggedOut { player_id, team };
            if let Some(winner) = self.rules.handle_player_event(event, &self.roster, ctx.directory) {
                self.end_battleground(Some(winner), ctx);
            }
        }
    }

    pub fn player_logged_in(
        &mut self,
        player_id: PlayerId,
    ) {
        self.offline_queue.retain(|id| *id != player_id);
        if let Some(player) = self.roster.get_mut(player_id) {
            player.offline_remove_time = None;
        }
    }

    pub fn update_player_score(
        &mut self,
        player_id: PlayerId,
        kind: ScoreType,
        value: u32,
    ) {
        if let Some(score) = self.scores.get_mut(&player_id) {
            score.update(kind, value);
        }
    }

    pub fn handle_kill_player(
        &mut self,
        victim: PlayerId,
        killer: Option<PlayerId>,
        ctx: &mut MatchContext<'_>,
    ) {
        self.update_player_score(victim, ScoreType::Deaths, 1);
        if let Some(killer) = killer.filter(|&k| k != victim) {
            self.update_player_score(killer, ScoreType::HonorableKills, 1);
            self.update_player_score(killer, ScoreType::KillingBlows, 1);
        }

        if self.status == BattlegroundStatus::InProgress {
            let event = PlayerEvent::Killed { victim, killer };
            if let Some(winner) = self.rules.handle_player_event(event, &self.roster, ctx.directory) {
                self.end_battleground(Some(winner), ctx);
            }
        }
    }

    pub fn add_player_to_resurrect_queue(
        &mut self,
        spirit_guide: SpiritGuideId,
        player_id: PlayerId,
    ) {
        self.revive_queue.entry(spirit_guide).or_default().push(player_id);
    }

    pub fn remove_player_from_resurrect_queue(
        &mut self,
        player_id: PlayerId,
    ) {
        for waiting in self.revive_queue.values_mut() {
            waiting.retain(|id| *id != player_id);
        }
        self.revive_queue.retain(|_, waiting| !waiting.is_empty());
    }

    fn active_status(
        &self,
        player_id: PlayerId,
        team: Team,
    ) -> BattlegroundEffect {
        let shutdown_timer = if self.status == BattlegroundStatus::WaitLeave {
            self.remaining
        } else {
            Duration::ZERO
        };
        BattlegroundEffect::status(
            player_id,
            self.queue_type,
            None,
            QueueState::Active {
                instance_id: self.instance_id,
                map_id: self.map_id,
                team,
                shutdown_timer,
                elapsed: self.elapsed,
            },
        )
    }
}
