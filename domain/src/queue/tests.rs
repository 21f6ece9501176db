use std::time::Duration;

use crate::test_support::*;
use crate::*;

struct QueueHarness {
    registry: BattlegroundRegistry,
    queue: BattlegroundQueue,
    directory: StubDirectory,
    effects: Vec<BattlegroundEffect>,
    bracket: BracketEntry,
}

impl QueueHarness {
    fn battleground(
        min_players_per_team: u32,
        max_players_per_team: u32,
    ) -> Self {
        Self::new(
            QueueTypeId::battleground(BattlegroundTypeId::WARSONG_GULCH),
            BattlegroundConfig::default(),
            min_players_per_team,
            max_players_per_team,
        )
    }

    fn arena(
        team_size: u8,
        rated: bool,
    ) -> Self {
        Self::new(QueueTypeId::arena(team_size, rated), BattlegroundConfig::default(), 10, 10)
    }

    fn new(
        queue_type: QueueTypeId,
        config: BattlegroundConfig,
        min_players_per_team: u32,
        max_players_per_team: u32,
    ) -> Self {
        let map_id = if queue_type.is_arena() { NAGRAND_MAP } else { WARSONG_MAP };
        Self {
            registry: BattlegroundRegistry::new(config, catalog(min_players_per_team, max_players_per_team)).with_seed(7),
            queue: BattlegroundQueue::new(queue_type),
            directory: StubDirectory::default(),
            effects: Vec::new(),
            bracket: top_bracket(map_id),
        }
    }

    fn configured(
        mut self,
        configure: impl FnOnce(&mut BattlegroundConfig),
    ) -> Self {
        let mut config = self.registry.config().clone();
        configure(&mut config);
        let (min, max) = self
            .registry
            .catalog()
            .template(BattlegroundTypeId::WARSONG_GULCH)
            .map(|t| (t.min_players_per_team, t.max_players_per_team))
            .unwrap_or((10, 10));
        self.registry = BattlegroundRegistry::new(config, catalog(min, max)).with_seed(7);
        self
    }

    fn join(
        &mut self,
        group: NewGroup,
    ) -> GroupId {
        self.queue
            .add_group(&self.registry, group, &self.bracket, &mut self.effects)
    }

    fn solos(
        &mut self,
        team: Team,
        count: usize,
    ) -> Vec<PlayerId> {
        (0..count)
            .map(|_| {
                let group = group_of(team, 1, false);
                let leader = group.leader;
                self.join(group);
                leader
            })
            .collect()
    }

    fn advance(
        &mut self,
        diff: Duration,
    ) -> &mut Self {
        self.registry.advance(diff);
        self
    }

    fn update(&mut self) -> &mut Self {
        self.effects.clear();
        self.queue.battleground_queue_update(
            &mut self.registry,
            self.bracket.bracket_id,
            0,
            &self.directory,
            &mut self.effects,
        );
        self
    }

    fn fire_events(&mut self) -> &mut Self {
        self.effects.clear();
        self.queue
            .update_events(&mut self.registry, &self.directory, &mut self.effects);
        self
    }

    fn remove(
        &mut self,
        player_id: PlayerId,
        decrease_invited_count: bool,
    ) -> &mut Self {
        self.effects.clear();
        self.queue.remove_player(
            &mut self.registry,
            player_id,
            decrease_invited_count,
            &self.directory,
            &mut self.effects,
        );
        self
    }

    fn check_normal_match(
        &mut self,
        min_players: usize,
        required: usize,
        max_players: usize,
    ) -> bool {
        let config = self.registry.config().clone();
        self.queue.reset_pools();
        self.queue
            .check_normal_match(self.bracket.bracket_id, min_players, required, max_players, &config)
    }

    fn group_of_player(
        &self,
        player_id: PlayerId,
    ) -> &GroupQueueInfo {
        self.queue
            .player_group(player_id)
            .expect("player should be queued")
    }

    #[track_caller]
    fn check_pools(
        &self,
        alliance: usize,
        horde: usize,
    ) -> &Self {
        assert_eq!(
            self.queue.selection_pool(Team::Alliance).player_count(),
            alliance,
            "alliance pool size"
        );
        assert_eq!(
            self.queue.selection_pool(Team::Horde).player_count(),
            horde,
            "horde pool size"
        );
        self
    }

    #[track_caller]
    fn check_battlegrounds(
        &self,
        count: usize,
    ) -> &Self {
        assert_eq!(self.registry.battlegrounds().count(), count, "live battlegrounds");
        self
    }

    #[track_caller]
    fn check_confirmations(
        &self,
        count: usize,
    ) -> &Self {
        assert_eq!(count_confirmations(&self.effects), count, "need-confirmation statuses");
        self
    }

    #[track_caller]
    fn check_row(
        &self,
        sub_queue: SubQueue,
        group_ids: &[GroupId],
    ) -> &Self {
        let row: Vec<GroupId> = self
            .queue
            .groups_in(self.bracket.bracket_id, sub_queue)
            .map(|g| g.id)
            .collect();
        assert_eq!(row, group_ids, "{sub_queue:?} row");
        self
    }
}

fn queued_group(
    id: u64,
    size: usize,
) -> GroupQueueInfo {
    GroupQueueInfo {
        id: GroupId(id),
        team: Team::Alliance,
        bg_type_id: BattlegroundTypeId::WARSONG_GULCH,
        bracket_id: TOP_BRACKET,
        arena_type: 0,
        is_rated: false,
        join_time: Duration::ZERO,
        invitation: InvitationState::Queued,
        ratings: ArenaRatings::default(),
        players: (0..size).map(|_| PlayerId::new()).collect(),
    }
}

#[track_caller]
fn check_pool_count(pool: &SelectionPool) {
    let sum: usize = pool.selected().iter().map(|g| g.size).sum();
    assert_eq!(pool.player_count(), sum, "pool count must equal the sum of its groups");
}

#[test]
fn pool_accepts_groups_until_capacity() {
    let mut pool = SelectionPool::default();

    let admission = pool.add_group(&queued_group(1, 3), 5);
    assert!(admission.accepted);
    assert!(!admission.should_stop);

    let admission = pool.add_group(&queued_group(2, 3), 5);
    assert!(!admission.accepted, "3 + 3 exceeds 5");
    assert!(!admission.should_stop, "pool is not full yet");

    let admission = pool.add_group(&queued_group(3, 2), 5);
    assert!(admission.accepted);

    let admission = pool.add_group(&queued_group(4, 1), 5);
    assert!(!admission.accepted);
    assert!(admission.should_stop);

    assert_eq!(pool.player_count(), 5);
    check_pool_count(&pool);
}

#[test]
fn pool_never_accepts_invited_groups() {
    let mut pool = SelectionPool::default();
    let mut group = queued_group(1, 1);
    group.invitation = InvitationState::Invited {
        instance_id: InstanceId(4),
        remove_invite_time: Duration::from_secs(90),
    };

    let admission = pool.add_group(&group, 10);

    assert!(!admission.accepted);
    assert_eq!(pool.player_count(), 0);
}

#[test]
fn kick_group_prefers_last_group_close_to_target() {
    let mut pool = SelectionPool::default();
    for (id, size) in [(1, 5), (2, 2), (3, 3), (4, 6)] {
        pool.add_group(&queued_group(id, size), 20);
    }

    // sizes 2 and 3 are within one of 2, the later one goes
    let keep_shrinking = pool.kick_group(2);

    assert!(!keep_shrinking);
    let remaining: Vec<u64> = pool.selected().iter().map(|g| g.id.0).collect();
    assert_eq!(remaining, vec![1, 2, 4]);
    check_pool_count(&pool);
}

#[test]
fn kick_group_falls_back_to_largest() {
    let mut pool = SelectionPool::default();
    for (id, size) in [(1, 5), (2, 1)] {
        pool.add_group(&queued_group(id, size), 20);
    }

    let keep_shrinking = pool.kick_group(3);

    assert!(keep_shrinking, "a five-player group overshoots a target of three");
    assert_eq!(pool.player_count(), 1);
    check_pool_count(&pool);
}

#[test]
fn kick_group_on_empty_pool_keeps_going() {
    let mut pool = SelectionPool::default();
    assert!(pool.kick_group(1));
    assert_eq!(pool.player_count(), 0);
}

#[test]
fn timed_events_pop_in_fire_order() {
    let mut events = TimedEvents::default();
    let event = |kind| InviteEvent {
        kind,
        player_id: PlayerId::new(),
        instance_id: InstanceId(1),
        bg_type_id: BattlegroundTypeId::WARSONG_GULCH,
        remove_invite_time: Duration::from_secs(90),
    };
    events.schedule(Duration::from_secs(90), event(InviteEventKind::Remove));
    events.schedule(Duration::from_secs(20), event(InviteEventKind::Remind));

    assert!(events.pop_due(Duration::from_secs(19)).is_none());
    assert_eq!(
        events.pop_due(Duration::from_secs(20)).map(|e| e.kind),
        Some(InviteEventKind::Remind)
    );
    assert!(events.pop_due(Duration::from_secs(89)).is_none());
    assert_eq!(
        events.pop_due(Duration::from_secs(120)).map(|e| e.kind),
        Some(InviteEventKind::Remove)
    );
    assert!(events.is_empty());
}

#[test]
fn testing_mode_matches_two_solos_per_side() {
    let mut h = QueueHarness::battleground(10, 10).configured(|c| c.testing = true);
    h.solos(Team::Alliance, 2);
    h.solos(Team::Horde, 2);

    assert!(h.check_normal_match(10, 1, 10));
    h.check_pools(2, 2);

    h.update().check_battlegrounds(1).check_confirmations(4);
}

#[test]
fn normal_match_waits_for_minimum() {
    let mut h = QueueHarness::battleground(3, 10);
    h.solos(Team::Alliance, 2);
    h.solos(Team::Horde, 3);

    h.update().check_battlegrounds(0).check_confirmations(0);

    h.solos(Team::Alliance, 1);
    h.update().check_battlegrounds(1).check_confirmations(6);
}

#[test]
fn balanced_match_rejects_uneven_teams() {
    let mut h = QueueHarness::battleground(3, 10).configured(|c| c.invitation_type = InvitationType::Balanced);
    h.join(group_of(Team::Alliance, 6, false));
    h.solos(Team::Horde, 3);

    assert!(!h.check_normal_match(3, 3, 10), "6 against 3 is more than two apart");
}

#[test]
fn balanced_match_grows_the_smaller_side() {
    let mut h = QueueHarness::battleground(3, 10).configured(|c| c.invitation_type = InvitationType::Balanced);
    h.join(group_of(Team::Alliance, 5, false));
    h.solos(Team::Horde, 6);

    assert!(h.check_normal_match(3, 3, 10));
    h.check_pools(5, 5);
}

#[test]
fn premades_are_paired_against_each_other() {
    let mut h = QueueHarness::battleground(3, 10);
    let alliance = h.join(group_of(Team::Alliance, 4, true));
    let horde = h.join(group_of(Team::Horde, 4, true));

    h.update().check_battlegrounds(1).check_confirmations(8);

    assert!(h.queue.group(alliance).is_some_and(GroupQueueInfo::is_invited));
    assert!(h.queue.group(horde).is_some_and(GroupQueueInfo::is_invited));
}

#[test]
fn lone_premade_is_demoted_after_waiting() {
    let mut h = QueueHarness::battleground(5, 10);
    let premade = h.join(group_of(Team::Horde, 8, true));

    h.update();
    h.check_row(SubQueue::PremadeHorde, &[premade])
        .check_row(SubQueue::NormalHorde, &[]);

    h.advance(BattlegroundConfig::default().premade_group_wait_for_match)
        .update();
    h.check_row(SubQueue::PremadeHorde, &[])
        .check_row(SubQueue::NormalHorde, &[premade]);
}

#[test]
fn undersized_premade_is_demoted_at_once() {
    let mut h = QueueHarness::battleground(5, 10);
    let premade = h.join(group_of(Team::Alliance, 2, true));

    h.update();

    h.check_row(SubQueue::PremadeAlliance, &[])
        .check_row(SubQueue::NormalAlliance, &[premade]);
}

#[test]
fn invitation_prompts_and_schedules_both_timers() {
    let mut h = QueueHarness::battleground(1, 10);
    let alliance = h.solos(Team::Alliance, 1)[0];
    h.solos(Team::Horde, 1);

    h.update();

    assert_eq!(h.queue.pending_events(), 4);
    let timeout = statuses(&h.effects, alliance).find_map(|state| match state {
        QueueState::NeedConfirmation { timeout, .. } => Some(*timeout),
        _ => None,
    });
    assert_eq!(timeout, Some(Duration::from_secs(90)));

    let instance = h.group_of_player(alliance).invited_instance().expect("invited");
    let bg = h.registry.battleground(instance).expect("battleground exists");
    assert_eq!(bg.invited_count(Team::Alliance), 1);
    assert_eq!(bg.invited_count(Team::Horde), 1);
    assert_eq!(bg.status(), BattlegroundStatus::WaitJoin);
}

#[test]
fn reminder_repeats_confirmation_with_shorter_timeout() {
    let mut h = QueueHarness::battleground(1, 10);
    let alliance = h.solos(Team::Alliance, 1)[0];
    h.solos(Team::Horde, 1);
    h.update();

    h.advance(Duration::from_secs(20)).fire_events();

    let timeout = statuses(&h.effects, alliance).find_map(|state| match state {
        QueueState::NeedConfirmation { timeout, .. } => Some(*timeout),
        _ => None,
    });
    assert_eq!(timeout, Some(Duration::from_secs(70)));
}

#[test]
fn eviction_removes_pending_player_and_requests_backfill() {
    let mut h = QueueHarness::battleground(1, 10);
    let alliance = h.solos(Team::Alliance, 1)[0];
    h.solos(Team::Horde, 1);
    h.update();
    let instance = h.group_of_player(alliance).invited_instance().expect("invited");

    h.advance(Duration::from_secs(90)).fire_events();

    assert!(!h.queue.contains(alliance));
    assert!(statuses(&h.effects, alliance).any(|s| *s == QueueState::None));
    let bg = h.registry.battleground(instance).expect("battleground exists");
    assert_eq!(bg.invited_count(Team::Alliance), 0);
    assert_eq!(
        h.registry.scheduled_updates(),
        &[ScheduledQueueUpdate {
            arena_matchmaker_rating: 0,
            queue_type: h.queue.queue_type(),
            bracket_id: TOP_BRACKET,
        }]
    );
}

#[test]
fn eviction_after_accept_is_a_no_op() {
    let mut h = QueueHarness::battleground(1, 10);
    let alliance = h.solos(Team::Alliance, 1)[0];
    h.solos(Team::Horde, 1);
    h.update();
    let instance = h.group_of_player(alliance).invited_instance().expect("invited");

    h.advance(Duration::from_secs(20)).fire_events();
    assert_eq!(count_confirmations(&h.effects), 2);

    // accepting leaves the queue without touching invited counters
    h.remove(alliance, false);

    h.advance(Duration::from_secs(70)).fire_events();
    assert!(statuses(&h.effects, alliance).next().is_none());
    let bg = h.registry.battleground(instance).expect("battleground exists");
    assert_eq!(bg.invited_count(Team::Alliance), 1);
}

#[test]
fn removing_a_rated_member_removes_the_whole_team() {
    let mut h = QueueHarness::arena(3, true);
    let team = arena_team(Team::Alliance, 3, 11, 1500);
    let members = team.members.clone();
    h.join(team);

    h.remove(members[1], true);

    for member in &members {
        assert!(!h.queue.contains(*member), "every member leaves with the team");
    }
    h.check_row(SubQueue::PremadeAlliance, &[]);
}

#[test]
fn average_wait_is_reported_once_ten_samples_exist() {
    let mut h = QueueHarness::battleground(5, 10).configured(|c| c.testing = true);
    h.solos(Team::Alliance, 4);
    h.solos(Team::Horde, 4);
    h.advance(Duration::from_secs(60)).update();

    let probe = group_of(Team::Alliance, 1, false);
    let probe_id = h.join(probe);
    let group = h.queue.group(probe_id).cloned().expect("queued");
    assert_eq!(h.queue.average_wait_time(&group), Duration::ZERO, "only four alliance samples");

    let late = h.solos(Team::Alliance, 6);
    h.solos(Team::Horde, 1);
    h.update();
    assert!(h.queue.player_group(late[0]).is_some_and(GroupQueueInfo::is_invited));

    let probe = group_of(Team::Alliance, 1, false);
    let probe_id = h.join(probe);
    let group = h.queue.group(probe_id).cloned().expect("queued");
    assert!(h.queue.average_wait_time(&group) > Duration::ZERO);
}

#[test]
fn skirmish_reassigns_same_faction_players() {
    let mut h = QueueHarness::arena(2, false);
    let players = h.solos(Team::Alliance, 4);

    h.update().check_battlegrounds(1).check_confirmations(4);

    let teams: Vec<Team> = players.iter().map(|p| h.group_of_player(*p).team).collect();
    assert_eq!(teams, vec![Team::Alliance, Team::Alliance, Team::Horde, Team::Horde]);
}

#[test]
fn skirmish_needs_an_exact_complement() {
    let mut h = QueueHarness::arena(2, false);
    h.solos(Team::Alliance, 3);

    h.update().check_battlegrounds(0);
}

#[test]
fn rated_teams_within_window_are_paired() {
    let mut h = QueueHarness::arena(2, true);
    let alliance = h.join(arena_team(Team::Alliance, 2, 1, 1500));
    let horde = h.join(arena_team(Team::Horde, 2, 2, 1600));

    h.update().check_battlegrounds(1).check_confirmations(4);

    let alliance = h.queue.group(alliance).expect("still queued until accepted");
    let horde = h.queue.group(horde).expect("still queued until accepted");
    assert_eq!(alliance.ratings.opponents_matchmaker_rating, 1600);
    assert_eq!(horde.ratings.opponents_matchmaker_rating, 1500);

    let instance = alliance.invited_instance().expect("invited");
    let bg = h.registry.battleground(instance).expect("arena exists");
    assert!(bg.is_arena() && bg.is_rated());
    assert_eq!(bg.client_instance_id(), 0);
}

#[test]
fn rated_teams_outside_window_wait_for_discard() {
    let mut h = QueueHarness::arena(2, true);
    h.join(arena_team(Team::Alliance, 2, 1, 1500));
    h.join(arena_team(Team::Horde, 2, 2, 1900));

    h.update().check_battlegrounds(0);

    h.advance(Duration::from_secs(10 * 60 + 1))
        .update()
        .check_battlegrounds(1);
}

#[test]
fn rated_teams_of_one_faction_are_split_across_sides() {
    let mut h = QueueHarness::arena(2, true);
    let first = h.join(arena_team(Team::Alliance, 2, 1, 1500));
    let second = h.join(arena_team(Team::Alliance, 2, 2, 1550));

    h.update().check_battlegrounds(1);

    h.check_row(SubQueue::PremadeAlliance, &[first])
        .check_row(SubQueue::PremadeHorde, &[second]);
    assert_eq!(h.queue.group(second).map(|g| g.team), Some(Team::Horde));
}

#[test]
fn same_arena_team_is_never_paired_with_itself() {
    let mut h = QueueHarness::arena(2, true);
    h.join(arena_team(Team::Alliance, 2, 1, 1500));
    h.join(arena_team(Team::Alliance, 2, 1, 1500));

    h.update().check_battlegrounds(0);
}

#[test]
fn running_battleground_is_topped_up_first() {
    let mut h = QueueHarness::battleground(5, 10);
    let queue_type = h.queue.queue_type();
    let instance = h
        .registry
        .create_battleground(queue_type, h.bracket, false)
        .expect("template exists");
    h.registry.start_battleground(instance);
    h.solos(Team::Alliance, 3);

    h.update().check_battlegrounds(1).check_confirmations(3);

    let bg = h.registry.battleground(instance).expect("battleground exists");
    assert_eq!(bg.invited_count(Team::Alliance), 3);
}
