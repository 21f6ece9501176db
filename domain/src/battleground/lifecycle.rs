use std::time::Duration;

use tracing::{debug, error, info};

use super::{Battleground, BattlegroundStatus, MatchContext, MatchRules, StartingEvents, bonus_honor_from_kills};
use crate::{
    Announcement, BattlegroundEffect, Criteria, MatchRecord, PerTeam, PlayerId, PlayerMatchRecord,
    Scoreboard, ScoreboardRow, ScoreType, Team, WorldCommand,
};

const BATTLEGROUND_START_DELAYS: [Duration; 4] = [
    Duration::from_secs(120),
    Duration::from_secs(60),
    Duration::from_secs(30),
    Duration::ZERO,
];
const ARENA_START_DELAYS: [Duration; 4] = [
    Duration::from_secs(60),
    Duration::from_secs(30),
    Duration::from_secs(15),
    Duration::ZERO,
];
const START_TIMER_INTERVAL: Duration = Duration::from_secs(10);
const BATTLEGROUND_COUNTDOWN_MAX: Duration = Duration::from_secs(120);
const ARENA_COUNTDOWN_MAX: Duration = Duration::from_secs(60);
const RESURRECTION_DELAY: Duration = Duration::from_millis(500);
const PREMATURE_WARNING_MINUTE: Duration = Duration::from_secs(60);
const PREMATURE_WARNING_STEP: Duration = Duration::from_secs(15);

impl Battleground {
    /// Advances the state machine by `diff`.
    pub fn update(
        &mut self,
        diff: Duration,
        ctx: &mut MatchContext<'_>,
    ) {
        if self.roster.is_empty() {
            if self.invited.alliance == 0 && self.invited.horde == 0 {
                self.to_be_deleted = true;
            }
            return;
        }

        match self.status {
            BattlegroundStatus::WaitJoin => {
                self.process_join(diff, ctx);
                self.check_safe_positions(diff, ctx);
            }
            BattlegroundStatus::InProgress => {
                self.process_offline_queue(ctx);
                if self.is_arena() {
                    if self.elapsed >= ctx.config.arena_max_duration {
                        info!(instance_id = %self.instance_id, "Arena reached its time limit");
                        self.end_battleground(None, ctx);
                        return;
                    }
                } else {
                    self.process_resurrect(diff, ctx);
                    let undermanned = Team::BOTH
                        .iter()
                        .any(|&team| self.roster.count(team) < self.min_players_per_team);
                    if !ctx.config.premature_finish_timer.is_zero() && undermanned {
                        self.process_progress(diff, ctx);
                    } else {
                        self.premature_countdown = None;
                    }
                }
            }
            BattlegroundStatus::WaitLeave => self.process_leave(diff, ctx),
            BattlegroundStatus::None | BattlegroundStatus::WaitQueue => {}
        }

        self.elapsed += diff;
    }

    pub(super) fn countdown_max(&self) -> Duration {
        if self.is_arena() { ARENA_COUNTDOWN_MAX } else { BATTLEGROUND_COUNTDOWN_MAX }
    }

    fn start_delays(&self) -> [Duration; 4] {
        if self.is_arena() { ARENA_START_DELAYS } else { BATTLEGROUND_START_DELAYS }
    }

    fn send_message(
        &self,
        announcement: Announcement,
        ctx: &mut MatchContext<'_>,
    ) {
        ctx.effects.push(BattlegroundEffect::Message {
            recipients: self.roster.ids().collect(),
            announcement,
        });
    }

    fn process_join(
        &mut self,
        diff: Duration,
        ctx: &mut MatchContext<'_>,
    ) {
        let delays = self.start_delays();
        self.start_delay = self.start_delay.saturating_sub(diff);

        self.countdown_timer += diff;
        if self.countdown_timer >= START_TIMER_INTERVAL {
            self.countdown_timer = Duration::ZERO;
            let total = self.countdown_max();
            let remaining = total.saturating_sub(self.elapsed);
            for player_id in self.roster.ids() {
                ctx.effects.push(BattlegroundEffect::StartTimer {
                    player_id,
                    remaining,
                    total,
                });
            }
        }

        if !self.starting_events.contains(StartingEvents::FIRST) {
            self.starting_events.insert(StartingEvents::FIRST);

            if !self.rules.setup_match(self.map_id) {
                error!(instance_id = %self.instance_id, map_id = self.map_id.0, "Battleground setup failed, ending it");
                self.end_now();
                return;
            }

            self.rules.starting_event_close_doors(self.instance_id, ctx.effects);
            self.start_delay = delays[0];
            self.send_message(Announcement::StartingIn { remaining: delays[0] }, ctx);
        } else if self.start_delay <= delays[1] && !self.starting_events.contains(StartingEvents::SECOND) {
            self.starting_events.insert(StartingEvents::SECOND);
            self.send_message(Announcement::StartingIn { remaining: delays[1] }, ctx);
        } else if self.start_delay <= delays[2] && !self.starting_events.contains(StartingEvents::THIRD) {
            self.starting_events.insert(StartingEvents::THIRD);
            self.send_message(Announcement::StartingIn { remaining: delays[2] }, ctx);
        } else if self.start_delay.is_zero() && !self.starting_events.contains(StartingEvents::FOURTH) {
            self.starting_events.insert(StartingEvents::FOURTH);

            self.rules.starting_event_open_doors(self.instance_id, ctx.effects);
            self.send_message(Announcement::HasBegun, ctx);
            self.status = BattlegroundStatus::InProgress;
            self.start_delay = delays[3];

            let arena = self.is_arena();
            let players: Vec<(PlayerId, Team)> = self.roster.iter().map(|(id, p)| (id, p.team)).collect();
            for (player_id, team) in players {
                ctx.effects
                    .push(BattlegroundEffect::World(WorldCommand::RemovePreparation { player_id, arena }));
                if arena {
                    ctx.effects.push(self.active_status(player_id, team));
                }
            }

            info!(instance_id = %self.instance_id, name = %self.name, "Battleground started");

            if arena {
                if let Some(winner) = self.rules.check_win_conditions(&self.roster, ctx.directory) {
                    self.end_battleground(Some(winner), ctx);
                }
            } else if ctx.config.queue_announcer {
                ctx.effects.push(BattlegroundEffect::WorldAnnouncement(
                    Announcement::BattlegroundStarted {
                        bg_type_id: self.type_id,
                        min_level: self.bracket.min_level,
                        max_level: self.bracket.max_level,
                    },
                ));
            }
        }
    }

    /// Sends stragglers back to their start location during preparation.
    fn check_safe_positions(
        &mut self,
        diff: Duration,
        ctx: &mut MatchContext<'_>,
    ) {
        if self.start_max_dist <= 0.0 {
            return;
        }

        self.position_check_timer += diff;
        if self.position_check_timer < ctx.config.position_check_interval {
            return;
        }
        self.position_check_timer = Duration::ZERO;

        let max_dist_sq = self.start_max_dist * self.start_max_dist;
        for (player_id, player) in self.roster.iter() {
            let Some(position) = ctx.directory.position(player_id) else {
                continue;
            };
            let start = *self.start_locations.get(player.team);
            if position.distance_sq(&start) > max_dist_sq {
                debug!(%player_id, instance_id = %self.instance_id, "Player left the start area, teleporting back");
                ctx.effects.push(BattlegroundEffect::World(WorldCommand::Teleport {
                    player_id,
                    map_id: self.map_id,
                    position: start,
                }));
            }
        }
    }

    fn process_offline_queue(
        &mut self,
        ctx: &mut MatchContext<'_>,
    ) {
        let Some(&player_id) = self.offline_queue.front() else {
            return;
        };

        match self.roster.get(player_id).and_then(|p| p.offline_remove_time) {
            Some(deadline) if deadline <= ctx.now => {
                debug!(%player_id, instance_id = %self.instance_id, "Removing offline player");
                self.remove_player_at_leave(player_id, true, true, ctx);
            }
            Some(_) => {}
            None => {
                self.offline_queue.pop_front();
            }
        }
    }

    fn process_resurrect(
        &mut self,
        diff: Duration,
        ctx: &mut MatchContext<'_>,
    ) {
        self.last_resurrect_time += diff;

        if self.last_resurrect_time >= ctx.config.resurrection_interval {
            for (spirit_guide, waiting) in std::mem::take(&mut self.revive_queue) {
                let mut healer_cast = false;
                for player_id in waiting {
                    if !ctx.directory.is_online(player_id) {
                        continue;
                    }
                    if !healer_cast {
                        ctx.effects.push(BattlegroundEffect::World(WorldCommand::SpiritHeal {
                            instance_id: self.instance_id,
                            spirit_guide,
                        }));
                        healer_cast = true;
                    }
                    ctx.effects
                        .push(BattlegroundEffect::World(WorldCommand::ResurrectionVisual { player_id }));
                    self.resurrect_queue.push(player_id);
                }
            }
            self.last_resurrect_time = Duration::ZERO;
        } else if self.last_resurrect_time > RESURRECTION_DELAY {
            for player_id in std::mem::take(&mut self.resurrect_queue) {
                if ctx.directory.is_online(player_id) {
                    ctx.effects
                        .push(BattlegroundEffect::World(WorldCommand::Resurrect { player_id }));
                }
            }
        }
    }

    /// Counts down toward a premature finish while a side is below its minimum.
    fn process_progress(
        &mut self,
        diff: Duration,
        ctx: &mut MatchContext<'_>,
    ) {
        match self.premature_countdown {
            None => self.premature_countdown = Some(ctx.config.premature_finish_timer),
            Some(remaining) if remaining < diff => {
                self.premature_countdown = None;
                let winner = self.premature_winner();
                info!(instance_id = %self.instance_id, ?winner, "Ending battleground prematurely");
                self.end_battleground(winner, ctx);
            }
            Some(remaining) => {
                let next = remaining - diff;
                if !ctx.config.testing {
                    let crossed = if next >= PREMATURE_WARNING_MINUTE {
                        next.as_secs() / 60 != remaining.as_secs() / 60
                    } else {
                        next.as_secs() / PREMATURE_WARNING_STEP.as_secs()
                            != remaining.as_secs() / PREMATURE_WARNING_STEP.as_secs()
                    };
                    if crossed {
                        self.send_message(Announcement::PrematureFinishWarning { remaining }, ctx);
                    }
                }
                self.premature_countdown = Some(next);
            }
        }
    }

    /// The fuller side wins; a tie has no winner.
    fn premature_winner(&self) -> Option<Team> {
        let alliance = self.roster.count(Team::Alliance);
        let horde = self.roster.count(Team::Horde);
        match alliance.cmp(&horde) {
            std::cmp::Ordering::Greater => Some(Team::Alliance),
            std::cmp::Ordering::Less => Some(Team::Horde),
            std::cmp::Ordering::Equal => None,
        }
    }

    fn process_leave(
        &mut self,
        diff: Duration,
        ctx: &mut MatchContext<'_>,
    ) {
        self.remaining = self.remaining.saturating_sub(diff);
        if !self.remaining.is_zero() {
            return;
        }

        let players: Vec<PlayerId> = self.roster.ids().collect();
        for player_id in players {
            self.remove_player_at_leave(player_id, true, true, ctx);
        }
    }

    /// Finishes the match: rewards, scoreboard, statistics, then the close countdown.
    pub fn end_battleground(
        &mut self,
        winner: Option<Team>,
        ctx: &mut MatchContext<'_>,
    ) {
        self.remove_from_free_slot_queue();
        self.winner = winner;
        self.status = BattlegroundStatus::WaitLeave;
        self.remaining = ctx.config.auto_close_time;

        let match_id = (self.is_battleground() && ctx.config.store_statistics).then(|| ctx.allocate_match_id());

        self.rules.finish_match(winner, self.is_rated, ctx.effects);
        self.send_message(Announcement::Winner { team: winner }, ctx);

        let players: Vec<(PlayerId, Team)> = self.roster.iter().map(|(id, p)| (id, p.team)).collect();
        let online: Vec<(PlayerId, Team)> = players
            .into_iter()
            .filter(|&(player_id, _)| {
                let online = ctx.directory.is_online(player_id);
                if !online {
                    debug!(%player_id, instance_id = %self.instance_id, "Skipping offline player at match end");
                }
                online
            })
            .collect();

        for &(player_id, team) in &online {
            if !ctx.directory.is_alive(player_id) {
                ctx.effects
                    .push(BattlegroundEffect::World(WorldCommand::Resurrect { player_id }));
            }
            if self.is_battleground() {
                self.reward_player(player_id, winner == Some(team), ctx);
            }
        }

        let scoreboard = self.scoreboard();
        let mut records = Vec::new();
        for &(player_id, team) in &online {
            ctx.effects.push(self.active_status(player_id, team));
            ctx.effects.push(BattlegroundEffect::Scoreboard {
                player_id,
                scoreboard: scoreboard.clone(),
            });
            ctx.effects.push(BattlegroundEffect::World(WorldCommand::CriteriaCredit {
                player_id,
                criteria: Criteria::CompleteBattleground,
            }));
            if match_id.is_some() {
                records.push(PlayerMatchRecord {
                    player_id,
                    team,
                    winner: winner == Some(team),
                    score: self.scores.get(&player_id).cloned().unwrap_or_default(),
                });
            }
        }

        if let Some(match_id) = match_id {
            ctx.effects.push(BattlegroundEffect::RecordMatch(MatchRecord {
                match_id,
                bg_type_id: self.type_id,
                bracket_id: self.bracket_id(),
                winner,
                players: records,
            }));
        }

        info!(instance_id = %self.instance_id, name = %self.name, ?winner, "Battleground ended");
    }

    fn reward_player(
        &mut self,
        player_id: PlayerId,
        won: bool,
        ctx: &mut MatchContext<'_>,
    ) {
        let config = ctx.config;
        if won {
            if self.is_random() {
                let kills = if ctx.random_winners.insert(player_id) {
                    config.reward_winner_honor_first
                } else {
                    config.reward_winner_honor_last
                };
                self.award_honor(player_id, kills, ctx);
            }
            ctx.effects.push(BattlegroundEffect::World(WorldCommand::CriteriaCredit {
                player_id,
                criteria: Criteria::WinBattleground,
            }));
        } else if self.is_random() {
            let kills = if ctx.random_winners.contains(&player_id) {
                config.reward_loser_honor_last
            } else {
                config.reward_loser_honor_first
            };
            self.award_honor(player_id, kills, ctx);
        }
    }

    fn award_honor(
        &mut self,
        player_id: PlayerId,
        kills: u32,
        ctx: &mut MatchContext<'_>,
    ) {
        let amount = bonus_honor_from_kills(kills, self.bracket.max_level);
        self.update_player_score(player_id, ScoreType::BonusHonor, amount);
        ctx.effects
            .push(BattlegroundEffect::World(WorldCommand::AwardHonor { player_id, amount }));
    }

    fn scoreboard(&self) -> Scoreboard {
        Scoreboard {
            instance_id: self.instance_id,
            winner: self.winner,
            rows: self
                .roster
                .iter()
                .map(|(player_id, player)| ScoreboardRow {
                    player_id,
                    team: player.team,
                    score: self.scores.get(&player_id).cloned().unwrap_or_default(),
                })
                .collect(),
        }
    }

    /// Ends without rewards; remaining players are evicted on the next update.
    pub fn end_now(&mut self) {
        self.remove_from_free_slot_queue();
        self.status = BattlegroundStatus::WaitLeave;
        self.remaining = Duration::ZERO;
    }

    /// Returns the instance to a pristine `WaitQueue` state.
    pub fn reset(&mut self) {
        if self.invited.alliance > 0 || self.invited.horde > 0 {
            error!(
                instance_id = %self.instance_id,
                alliance = self.invited.alliance,
                horde = self.invited.horde,
                "Battleground reset with players still invited"
            );
        }

        self.status = BattlegroundStatus::WaitQueue;
        self.elapsed = Duration::ZERO;
        self.remaining = Duration::ZERO;
        self.start_delay = Duration::ZERO;
        self.countdown_timer = Duration::ZERO;
        self.position_check_timer = Duration::ZERO;
        self.last_resurrect_time = Duration::ZERO;
        self.premature_countdown = None;
        self.starting_events = StartingEvents::default();
        self.winner = None;
        self.invited = PerTeam::default();
        self.roster.clear();
        self.scores.clear();
        self.offline_queue.clear();
        self.revive_queue.clear();
        self.resurrect_queue.clear();
        self.in_free_slot_queue = false;
        self.to_be_deleted = false;
    }

    /// Opens the instance to invited players.
    pub fn start_battleground(&mut self) {
        self.elapsed = Duration::ZERO;
        self.last_resurrect_time = Duration::ZERO;
        self.status = BattlegroundStatus::WaitJoin;
        self.add_to_free_slot_queue();
        if self.is_rated {
            info!(instance_id = %self.instance_id, arena_type = self.queue_type.team_size, "Rated arena match started");
        } else {
            debug!(instance_id = %self.instance_id, name = %self.name, "Battleground opened");
        }
    }
}

