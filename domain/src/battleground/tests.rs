use std::time::Duration;

use crate::test_support::*;
use crate::*;

struct MatchHarness {
    registry: BattlegroundRegistry,
    directory: StubDirectory,
    effects: Vec<BattlegroundEffect>,
    instance_id: InstanceId,
}

impl MatchHarness {
    fn battleground(
        min_players_per_team: u32,
        max_players_per_team: u32,
    ) -> Self {
        Self::with_config(min_players_per_team, max_players_per_team, BattlegroundConfig::default())
    }

    fn with_config(
        min_players_per_team: u32,
        max_players_per_team: u32,
        config: BattlegroundConfig,
    ) -> Self {
        Self::new(
            BattlegroundRegistry::new(config, catalog(min_players_per_team, max_players_per_team)),
            QueueTypeId::battleground(BattlegroundTypeId::WARSONG_GULCH),
            top_bracket(WARSONG_MAP),
            false,
        )
    }

    fn arena(rated: bool) -> Self {
        Self::new(
            BattlegroundRegistry::new(BattlegroundConfig::default(), catalog(10, 10)),
            QueueTypeId::arena(2, rated),
            top_bracket(NAGRAND_MAP),
            rated,
        )
    }

    fn new(
        registry: BattlegroundRegistry,
        queue_type: QueueTypeId,
        bracket: BracketEntry,
        is_rated: bool,
    ) -> Self {
        let mut registry = registry.with_seed(3);
        let instance_id = registry
            .create_battleground(queue_type, bracket, is_rated)
            .expect("template exists");
        registry.start_battleground(instance_id);
        Self {
            registry,
            directory: StubDirectory::default(),
            effects: Vec::new(),
            instance_id,
        }
    }

    fn bg(&self) -> &Battleground {
        self.registry
            .battleground(self.instance_id)
            .expect("battleground exists")
    }

    fn bg_mut(&mut self) -> &mut Battleground {
        self.registry
            .battleground_mut(self.instance_id)
            .expect("battleground exists")
    }

    fn with_bg<T>(
        &mut self,
        f: impl FnOnce(&mut Battleground, &mut MatchContext<'_>) -> T,
    ) -> T {
        self.registry
            .with_battleground(self.instance_id, &self.directory, &mut self.effects, f)
            .expect("battleground exists")
    }

    /// Invites and seats `count` players of `team`.
    fn enter(
        &mut self,
        team: Team,
        count: usize,
    ) -> Vec<PlayerId> {
        (0..count)
            .map(|_| {
                let player_id = PlayerId::new();
                self.bg_mut().increase_invited_count(team);
                self.with_bg(|bg, ctx| bg.add_player(player_id, team, ctx));
                player_id
            })
            .collect()
    }

    fn tick(
        &mut self,
        diff: Duration,
    ) -> &mut Self {
        self.effects.clear();
        self.registry.advance(diff);
        self.with_bg(|bg, ctx| bg.update(diff, ctx));
        self
    }

    /// Runs the preparation countdown until the doors open.
    fn begin(&mut self) -> &mut Self {
        let steps = if self.bg().is_arena() { [1, 30, 15, 15] } else { [1, 60, 30, 30] };
        for secs in steps {
            self.tick(Duration::from_secs(secs));
        }
        self
    }

    fn announcements(&self) -> Vec<&Announcement> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                BattlegroundEffect::Message { announcement, .. } => Some(announcement),
                _ => None,
            })
            .collect()
    }

    fn world(&self) -> Vec<&WorldCommand> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                BattlegroundEffect::World(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    #[track_caller]
    fn check_status(
        &self,
        status: BattlegroundStatus,
    ) -> &Self {
        assert_eq!(self.bg().status(), status);
        self
    }

    #[track_caller]
    fn check_winner(
        &self,
        winner: Option<Team>,
    ) -> &Self {
        assert_eq!(self.bg().status(), BattlegroundStatus::WaitLeave, "match should be over");
        assert_eq!(self.bg().winner(), winner);
        self
    }
}

#[test]
fn new_battleground_opens_for_joining() {
    let h = MatchHarness::battleground(1, 10);

    h.check_status(BattlegroundStatus::WaitJoin);
    assert!(h.bg().in_free_slot_queue());
    assert_eq!(h.bg().client_instance_id(), 1);
    assert_eq!(h.bg().elapsed(), Duration::ZERO);
}

#[test]
fn start_sequence_announces_each_step_and_opens_doors() {
    let mut h = MatchHarness::battleground(1, 10);
    h.enter(Team::Alliance, 1);
    h.enter(Team::Horde, 1);
    let instance_id = h.instance_id;

    h.tick(Duration::from_secs(1));
    assert_eq!(h.announcements(), vec![&Announcement::StartingIn { remaining: Duration::from_secs(120) }]);
    assert!(h.world().contains(&&WorldCommand::Doors { instance_id, open: false }));

    h.tick(Duration::from_secs(60));
    assert_eq!(h.announcements(), vec![&Announcement::StartingIn { remaining: Duration::from_secs(60) }]);

    h.tick(Duration::from_secs(30));
    assert_eq!(h.announcements(), vec![&Announcement::StartingIn { remaining: Duration::from_secs(30) }]);
    h.check_status(BattlegroundStatus::WaitJoin);

    h.tick(Duration::from_secs(30));
    assert_eq!(h.announcements(), vec![&Announcement::HasBegun]);
    assert!(h.world().contains(&&WorldCommand::Doors { instance_id, open: true }));
    h.check_status(BattlegroundStatus::InProgress);
    assert!(h.bg().starting_events().contains(StartingEvents::FOURTH));
}

#[test]
fn entering_during_preparation_shows_countdown() {
    let mut h = MatchHarness::battleground(1, 10);
    let player = h.enter(Team::Horde, 1)[0];

    assert!(statuses(&h.effects, player).any(|s| matches!(s, QueueState::Active { team: Team::Horde, .. })));
    assert!(h.effects.iter().any(|e| matches!(
        e,
        BattlegroundEffect::StartTimer { player_id, remaining, total }
            if *player_id == player && *remaining == Duration::from_secs(120) && *total == Duration::from_secs(120)
    )));
}

#[test]
fn countdown_timer_is_resent_every_ten_seconds() {
    let mut h = MatchHarness::battleground(1, 10);
    h.enter(Team::Alliance, 2);

    h.tick(Duration::from_secs(5));
    let timers = |h: &MatchHarness| {
        h.effects
            .iter()
            .filter(|e| matches!(e, BattlegroundEffect::StartTimer { .. }))
            .count()
    };
    assert_eq!(timers(&h), 0);

    h.tick(Duration::from_secs(5));
    assert_eq!(timers(&h), 2);
}

#[test]
fn undermanned_battleground_finishes_prematurely() {
    let mut h = MatchHarness::battleground(5, 10);
    h.enter(Team::Alliance, 3);
    h.enter(Team::Horde, 9);
    h.begin();

    h.tick(Duration::from_secs(1));
    assert_eq!(h.bg().premature_countdown(), Some(Duration::from_secs(300)));

    h.tick(Duration::from_secs(60));
    assert!(h
        .announcements()
        .iter()
        .any(|a| matches!(a, Announcement::PrematureFinishWarning { .. })));

    h.tick(Duration::from_secs(241));
    h.check_winner(Some(Team::Horde));
    assert!(!h.bg().in_free_slot_queue());
}

#[test]
fn premature_finish_with_equal_sides_has_no_winner() {
    let mut h = MatchHarness::battleground(5, 10);
    h.enter(Team::Alliance, 2);
    h.enter(Team::Horde, 2);
    h.begin();

    h.tick(Duration::from_secs(1)).tick(Duration::from_secs(301));

    h.check_winner(None);
}

#[test]
fn full_teams_never_start_the_premature_countdown() {
    let mut h = MatchHarness::battleground(2, 10);
    h.enter(Team::Alliance, 2);
    h.enter(Team::Horde, 2);
    h.begin();

    h.tick(Duration::from_secs(600));

    h.check_status(BattlegroundStatus::InProgress);
    assert_eq!(h.bg().premature_countdown(), None);
}

#[test]
fn arena_ends_without_winner_at_time_limit() {
    let mut h = MatchHarness::arena(false);
    h.enter(Team::Alliance, 2);
    h.enter(Team::Horde, 2);
    h.begin().check_status(BattlegroundStatus::InProgress);

    h.tick(Duration::from_secs(47 * 60));
    h.check_status(BattlegroundStatus::InProgress);

    h.tick(Duration::from_secs(1));
    h.check_winner(None);
}

#[test]
fn arena_is_won_when_the_last_opponent_dies() {
    let mut h = MatchHarness::arena(false);
    let alliance = h.enter(Team::Alliance, 2);
    let horde = h.enter(Team::Horde, 2);
    h.begin();

    h.directory.kill(horde[0]);
    h.with_bg(|bg, ctx| bg.handle_kill_player(horde[0], Some(alliance[0]), ctx));
    h.check_status(BattlegroundStatus::InProgress);

    h.directory.kill(horde[1]);
    h.with_bg(|bg, ctx| bg.handle_kill_player(horde[1], Some(alliance[0]), ctx));
    h.check_winner(Some(Team::Alliance));

    let score = h.bg().score(alliance[0]).cloned().expect("scored");
    assert_eq!(score.killing_blows, 2);
    assert_eq!(score.honorable_kills, 2);
}

#[test]
fn arena_is_lost_when_the_last_standing_member_logs_out() {
    let mut h = MatchHarness::arena(false);
    h.enter(Team::Alliance, 2);
    let horde = h.enter(Team::Horde, 2);
    h.begin();

    h.directory.kill(horde[1]);
    h.with_bg(|bg, ctx| bg.handle_kill_player(horde[1], None, ctx));
    h.check_status(BattlegroundStatus::InProgress);

    h.directory.set_offline(horde[0]);
    h.with_bg(|bg, ctx| bg.player_logged_out(horde[0], ctx));

    h.check_winner(Some(Team::Alliance));
}

#[test]
fn rated_arena_reports_result_and_deserters() {
    let mut h = MatchHarness::arena(true);
    h.bg_mut().set_arena_team_id_for_team(Team::Alliance, Some(ArenaTeamId(1)));
    h.bg_mut().set_arena_team_id_for_team(Team::Horde, Some(ArenaTeamId(2)));
    h.bg_mut().set_arena_matchmaker_rating(Team::Alliance, 1500);
    h.bg_mut().set_arena_matchmaker_rating(Team::Horde, 1600);
    let alliance = h.enter(Team::Alliance, 2);
    let horde = h.enter(Team::Horde, 2);
    h.begin();

    h.effects.clear();
    h.with_bg(|bg, ctx| bg.remove_player_at_leave(horde[0], true, true, ctx));
    assert!(h.effects.contains(&BattlegroundEffect::Arena(ArenaTeamEvent::MemberLost {
        arena_team_id: ArenaTeamId(2),
        player_id: horde[0],
        opponent_matchmaker_rating: 1500,
        online: true,
    })));
    assert!(h.world().contains(&&WorldCommand::TeleportToEntryPoint { player_id: horde[0] }));

    h.directory.kill(horde[1]);
    h.effects.clear();
    h.with_bg(|bg, ctx| bg.handle_kill_player(horde[1], Some(alliance[1]), ctx));

    h.check_winner(Some(Team::Alliance));
    assert!(h.effects.contains(&BattlegroundEffect::Arena(ArenaTeamEvent::MatchFinished {
        winner: ArenaTeamId(1),
        loser: ArenaTeamId(2),
        winner_matchmaker_rating: 1500,
        loser_matchmaker_rating: 1600,
    })));
}

#[test]
fn offline_player_is_removed_after_grace_period() {
    let mut h = MatchHarness::battleground(1, 10);
    let alliance = h.enter(Team::Alliance, 2);
    h.enter(Team::Horde, 2);
    h.begin();

    h.directory.set_offline(alliance[0]);
    h.with_bg(|bg, ctx| bg.player_logged_out(alliance[0], ctx));
    assert_eq!(h.bg().offline_queue().front(), Some(&alliance[0]));

    h.tick(Duration::from_secs(299));
    assert!(h.bg().roster().contains(alliance[0]));

    h.tick(Duration::from_secs(1));
    assert!(!h.bg().roster().contains(alliance[0]));
    assert_eq!(h.bg().invited_count(Team::Alliance), 1);
    assert!(h.bg().in_free_slot_queue());
    assert_eq!(h.registry.scheduled_updates().len(), 1);
}

#[test]
fn returning_player_keeps_the_seat() {
    let mut h = MatchHarness::battleground(1, 10);
    let alliance = h.enter(Team::Alliance, 1);
    h.enter(Team::Horde, 1);
    h.begin();

    h.with_bg(|bg, ctx| bg.player_logged_out(alliance[0], ctx));
    h.bg_mut().player_logged_in(alliance[0]);
    h.tick(Duration::from_secs(600));

    assert!(h.bg().roster().contains(alliance[0]));
    assert!(h.bg().offline_queue().is_empty());
}

#[test]
fn spirit_guide_resurrects_in_waves() {
    let mut h = MatchHarness::battleground(1, 10);
    let alliance = h.enter(Team::Alliance, 2);
    h.enter(Team::Horde, 1);
    h.begin();
    for &player_id in &alliance {
        h.bg_mut().add_player_to_resurrect_queue(SpiritGuideId(7), player_id);
    }

    h.tick(Duration::from_secs(30));
    let heals = h
        .world()
        .iter()
        .filter(|c| matches!(c, WorldCommand::SpiritHeal { .. }))
        .count();
    let visuals = h
        .world()
        .iter()
        .filter(|c| matches!(c, WorldCommand::ResurrectionVisual { .. }))
        .count();
    assert_eq!((heals, visuals), (1, 2));

    h.tick(Duration::from_secs(1));
    for player_id in alliance {
        assert!(h.world().contains(&&WorldCommand::Resurrect { player_id }));
    }
}

#[test]
fn leaving_the_resurrect_queue_skips_the_wave() {
    let mut h = MatchHarness::battleground(1, 10);
    let alliance = h.enter(Team::Alliance, 1);
    h.enter(Team::Horde, 1);
    h.begin();
    h.bg_mut().add_player_to_resurrect_queue(SpiritGuideId(7), alliance[0]);
    h.bg_mut().remove_player_from_resurrect_queue(alliance[0]);

    h.tick(Duration::from_secs(30));

    assert!(h.world().is_empty());
}

#[test]
fn reset_and_restart_clear_the_instance() {
    let mut h = MatchHarness::battleground(1, 10);
    h.enter(Team::Alliance, 2);
    h.begin();

    let bg = h.bg_mut();
    bg.reset();
    assert_eq!(bg.status(), BattlegroundStatus::WaitQueue);
    bg.start_battleground();

    h.check_status(BattlegroundStatus::WaitJoin);
    assert_eq!(h.bg().elapsed(), Duration::ZERO);
    assert_eq!(h.bg().invited_count(Team::Alliance), 0);
    assert!(h.bg().roster().is_empty());
    assert_eq!(h.bg().starting_events(), StartingEvents::default());
}

#[test]
fn empty_battleground_is_flagged_for_deletion_once_nobody_is_invited() {
    let mut h = MatchHarness::battleground(1, 10);
    h.bg_mut().increase_invited_count(Team::Horde);

    h.tick(Duration::from_secs(1));
    assert!(!h.bg().to_be_deleted());

    h.bg_mut().decrease_invited_count(Team::Horde);
    h.tick(Duration::from_secs(1));
    assert!(h.bg().to_be_deleted());
}

#[test]
fn free_slots_follow_the_balance_mode() {
    let mut h = MatchHarness::battleground(1, 10);
    for _ in 0..3 {
        h.bg_mut().increase_invited_count(Team::Alliance);
    }
    h.bg_mut().increase_invited_count(Team::Horde);

    let bg = h.bg();
    assert_eq!(bg.free_slots_for_team(Team::Alliance, InvitationType::NoBalance), 7);
    assert_eq!(bg.free_slots_for_team(Team::Horde, InvitationType::NoBalance), 9);
    assert_eq!(bg.free_slots_for_team(Team::Alliance, InvitationType::Balanced), 0);
    assert_eq!(bg.free_slots_for_team(Team::Horde, InvitationType::Balanced), 1);
}

#[test]
fn finished_match_has_no_free_slots() {
    let mut h = MatchHarness::battleground(1, 10);
    h.enter(Team::Alliance, 1);
    h.with_bg(|bg, ctx| bg.end_battleground(Some(Team::Alliance), ctx));

    assert_eq!(h.bg().free_slots_for_team(Team::Horde, InvitationType::NoBalance), 0);
    assert!(!h.bg().in_free_slot_queue());
}

#[test]
fn random_battleground_pays_reduced_honor_to_repeat_winners() {
    let mut h = MatchHarness::new(
        BattlegroundRegistry::new(BattlegroundConfig::default(), catalog(1, 10)),
        QueueTypeId::battleground(BattlegroundTypeId::RANDOM_BATTLEGROUND),
        top_bracket(WARSONG_MAP),
        false,
    );
    assert!(h.bg().is_random());
    let winner = h.enter(Team::Alliance, 1)[0];
    let loser = h.enter(Team::Horde, 1)[0];

    h.with_bg(|bg, ctx| bg.end_battleground(Some(Team::Alliance), ctx));

    let config = BattlegroundConfig::default();
    let honor = |h: &MatchHarness, player: PlayerId| {
        h.world().iter().find_map(|c| match c {
            WorldCommand::AwardHonor { player_id, amount } if *player_id == player => Some(*amount),
            _ => None,
        })
    };
    assert_eq!(honor(&h, winner), Some(bonus_honor_from_kills(config.reward_winner_honor_first, 80)));
    assert_eq!(honor(&h, loser), Some(bonus_honor_from_kills(config.reward_loser_honor_first, 80)));
    assert!(h.world().contains(&&WorldCommand::CriteriaCredit {
        player_id: winner,
        criteria: Criteria::WinBattleground,
    }));
    assert_eq!(
        h.bg().score(winner).map(|s| s.bonus_honor),
        Some(bonus_honor_from_kills(config.reward_winner_honor_first, 80))
    );

    // a second win in the same registry earns the repeat reward
    let queue_type = QueueTypeId::battleground(BattlegroundTypeId::RANDOM_BATTLEGROUND);
    h.instance_id = h
        .registry
        .create_battleground(queue_type, top_bracket(WARSONG_MAP), false)
        .expect("template exists");
    h.registry.start_battleground(h.instance_id);
    h.bg_mut().increase_invited_count(Team::Alliance);
    h.with_bg(|bg, ctx| bg.add_player(winner, Team::Alliance, ctx));
    h.effects.clear();
    h.with_bg(|bg, ctx| bg.end_battleground(Some(Team::Alliance), ctx));

    assert_eq!(honor(&h, winner), Some(bonus_honor_from_kills(config.reward_winner_honor_last, 80)));
}

#[test]
fn bonus_honor_scales_with_level() {
    assert_eq!(bonus_honor_from_kills(10, 80), 1240);
    assert_eq!(bonus_honor_from_kills(0, 80), 0);
}

#[test]
fn finished_match_sends_results_and_records_statistics() {
    let config = BattlegroundConfig {
        store_statistics: true,
        ..BattlegroundConfig::default()
    };
    let mut h = MatchHarness::with_config(1, 10, config);
    let alliance = h.enter(Team::Alliance, 2);
    let horde = h.enter(Team::Horde, 1);
    h.directory.set_offline(alliance[1]);
    h.directory.kill(horde[0]);
    h.effects.clear();

    h.with_bg(|bg, ctx| bg.end_battleground(Some(Team::Horde), ctx));

    h.check_winner(Some(Team::Horde));
    assert_eq!(h.bg().remaining(), Duration::from_secs(120));
    assert!(h.world().contains(&&WorldCommand::Resurrect { player_id: horde[0] }));
    assert!(h.world().contains(&&WorldCommand::CriteriaCredit {
        player_id: horde[0],
        criteria: Criteria::WinBattleground,
    }));

    let scoreboards = h
        .effects
        .iter()
        .filter(|e| matches!(e, BattlegroundEffect::Scoreboard { .. }))
        .count();
    assert_eq!(scoreboards, 2, "offline players get no scoreboard");

    let record = h
        .effects
        .iter()
        .find_map(|e| match e {
            BattlegroundEffect::RecordMatch(record) => Some(record),
            _ => None,
        })
        .expect("match recorded");
    assert_eq!(record.match_id, 1);
    assert_eq!(record.winner, Some(Team::Horde));
    assert_eq!(record.players.len(), 2);
    assert!(record.players.iter().any(|p| p.player_id == horde[0] && p.winner));
}

#[test]
fn ended_match_evicts_everyone_when_the_close_timer_runs_out() {
    let mut h = MatchHarness::battleground(1, 10);
    let alliance = h.enter(Team::Alliance, 1);
    h.with_bg(|bg, ctx| bg.end_battleground(None, ctx));

    h.tick(Duration::from_secs(119));
    assert!(h.bg().roster().contains(alliance[0]));

    h.tick(Duration::from_secs(1));
    assert!(h.bg().roster().is_empty());
    assert!(statuses(&h.effects, alliance[0]).any(|s| *s == QueueState::None));
    assert!(h.world().contains(&&WorldCommand::TeleportToEntryPoint { player_id: alliance[0] }));
    assert!(h.registry.scheduled_updates().is_empty(), "finished matches ask for no backfill");
}

#[test]
fn stragglers_are_sent_back_during_preparation() {
    let mut wsg = template(BattlegroundTypeId::WARSONG_GULCH, &[WARSONG_MAP], 1, 10, false);
    wsg.start_max_dist = 10.0;
    let mut h = MatchHarness::new(
        BattlegroundRegistry::new(
            BattlegroundConfig::default(),
            BattlegroundCatalog::new(vec![wsg], vec![top_bracket(WARSONG_MAP)]),
        ),
        QueueTypeId::battleground(BattlegroundTypeId::WARSONG_GULCH),
        top_bracket(WARSONG_MAP),
        false,
    );
    let alliance = h.enter(Team::Alliance, 2);
    h.directory.place(alliance[0], Position::new(50.0, 0.0, 0.0, 0.0));
    h.directory.place(alliance[1], Position::new(1.0, 0.0, 0.0, 0.0));

    h.tick(Duration::from_secs(1));

    let teleported: Vec<PlayerId> = h
        .world()
        .iter()
        .filter_map(|c| match c {
            WorldCommand::Teleport { player_id, .. } => Some(*player_id),
            _ => None,
        })
        .collect();
    assert_eq!(teleported, vec![alliance[0]]);
}
