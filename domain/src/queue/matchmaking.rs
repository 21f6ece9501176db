use std::time::Duration;

use tracing::{debug, error};

use super::{BattlegroundQueue, GroupQueueInfo, SubQueue};
use crate::{
    Battleground, BattlegroundConfig, BattlegroundEffect, BattlegroundRegistry, BattlegroundStatus, BracketEntry,
    BracketId, GroupId, InvitationType, PlayerDirectory, Team,
};

impl BattlegroundQueue {
    /// One matchmaking pass over a bracket.
    ///
    /// Running battlegrounds with free slots are topped up first. Then a premade match, then a
    /// normal match (or a same-faction skirmish) is attempted for unrated queues, or a rated
    /// arena pairing around `arena_rating` for rated ones.
    pub fn battleground_queue_update(
        &mut self,
        registry: &mut BattlegroundRegistry,
        bracket_id: BracketId,
        arena_rating: u32,
        directory: &dyn PlayerDirectory,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        if self.is_bracket_empty(bracket_id) {
            return;
        }

        let bg_type_id = self.queue_type.battlemaster_list_id;
        let config = registry.config().clone();

        for instance_id in registry.free_slot_instances(bg_type_id) {
            let Some(bg) = registry.battleground(instance_id) else {
                continue;
            };
            if bg.is_rated()
                || bg.queue_type() != self.queue_type
                || bg.bracket_id() != bracket_id
                || !matches!(bg.status(), BattlegroundStatus::WaitJoin | BattlegroundStatus::InProgress)
            {
                continue;
            }

            self.reset_pools();
            self.fill_players_to_bg(bg, bracket_id, config.invitation_type);

            for (_, group_id) in self.selected_group_ids() {
                self.invite_group_to_bg(registry, group_id, instance_id, None, directory, effects);
            }

            if let Some(bg) = registry.battleground_mut(instance_id) {
                if !bg.has_free_slots() {
                    bg.remove_from_free_slot_queue();
                }
            }
            registry.sync_free_slot_index(instance_id);
        }

        let Some(template) = registry.catalog().template(bg_type_id) else {
            error!(%bg_type_id, "Battleground queue update for a type without template");
            return;
        };
        let is_arena = template.is_arena;
        let min_per_team = template.min_players_per_team as usize;
        let max_per_team = template.max_players_per_team as usize;
        let Some(bracket) = registry
            .catalog()
            .bracket_by_id(template.map_id(), bracket_id)
            .copied()
        else {
            error!(%bg_type_id, bracket_id = bracket_id.0, "Battleground queue update for an unknown bracket");
            return;
        };

        let (min_players, max_players) = if is_arena {
            let team_size = usize::from(self.queue_type.team_size);
            (if config.arena_testing { 1 } else { team_size }, team_size)
        } else {
            (min_per_team, max_per_team)
        };
        // testing relaxes what a side needs, not how far the pools fill
        let required = if config.testing && !is_arena { 1 } else { min_players };

        self.reset_pools();

        if !is_arena && self.check_premade_match(bracket_id, required, max_players, registry.now(), &config) {
            self.start_match(registry, bracket, directory, effects);
        }

        if !self.queue_type.rated {
            if self.check_normal_match(bracket_id, min_players, required, max_players, &config)
                || (is_arena && self.check_skirmish_for_same_faction(bracket_id, min_players))
            {
                self.start_match(registry, bracket, directory, effects);
            }
        } else if is_arena {
            self.match_rated_arena(registry, bracket, arena_rating, &config, directory, effects);
        }
    }

    fn start_match(
        &mut self,
        registry: &mut BattlegroundRegistry,
        bracket: BracketEntry,
        directory: &dyn PlayerDirectory,
        effects: &mut Vec<BattlegroundEffect>,
    ) -> bool {
        let Some(instance_id) = registry.create_battleground(self.queue_type, bracket, false) else {
            error!(queue_type = %self.queue_type, bracket_id = bracket.bracket_id.0, "Could not create battleground");
            self.reset_pools();
            return false;
        };

        for (team, group_id) in self.selected_group_ids() {
            self.invite_group_to_bg(registry, group_id, instance_id, Some(team), directory, effects);
        }

        registry.start_battleground(instance_id);
        self.reset_pools();
        true
    }

    /// Pairs the oldest uninvited premade of each faction, padded with solo players up to the
    /// smaller premade. Stale or undersized premades are demoted to the normal rows.
    pub(crate) fn check_premade_match(
        &mut self,
        bracket_id: BracketId,
        min_players: usize,
        max_players: usize,
        now: Duration,
        config: &BattlegroundConfig,
    ) -> bool {
        let Some(rows) = self.brackets.get(&bracket_id) else {
            return false;
        };
        let groups = &self.groups;
        let first_uninvited = |sub_queue: SubQueue| {
            rows.row(sub_queue)
                .iter()
                .copied()
                .find(|id| !groups[id].is_invited())
        };

        if let (Some(alliance), Some(horde)) = (
            first_uninvited(SubQueue::PremadeAlliance),
            first_uninvited(SubQueue::PremadeHorde),
        ) {
            self.pools.alliance.add_group(&groups[&alliance], max_players);
            self.pools.horde.add_group(&groups[&horde], max_players);

            let target = self
                .pools
                .alliance
                .player_count()
                .min(self.pools.horde.player_count());
            for team in Team::BOTH {
                let pool = self.pools.get_mut(team);
                for id in rows.row(SubQueue::normal(team)) {
                    let group = &groups[id];
                    if !group.is_invited() && pool.add_group(group, target).should_stop {
                        break;
                    }
                }
            }
            return true;
        }

        let demoted: Vec<(Team, GroupId)> = Team::BOTH
            .iter()
            .filter_map(|&team| {
                let &front = rows.row(SubQueue::premade(team)).front()?;
                let group = &groups[&front];
                let stale = now.saturating_sub(group.join_time) >= config.premade_group_wait_for_match;
                (!group.is_invited() && (stale || group.size() < min_players)).then_some((team, front))
            })
            .collect();

        if let Some(rows) = self.brackets.get_mut(&bracket_id) {
            for (team, group_id) in demoted {
                debug!(group_id = group_id.0, ?team, "Moving premade group to the normal queue");
                rows.row_mut(SubQueue::premade(team)).pop_front();
                rows.row_mut(SubQueue::normal(team)).push_front(group_id);
            }
        }
        false
    }

    /// Fills both pools from the normal rows and decides whether they make a match.
    pub(crate) fn check_normal_match(
        &mut self,
        bracket_id: BracketId,
        min_players: usize,
        required: usize,
        max_players: usize,
        config: &BattlegroundConfig,
    ) -> bool {
        let Some(rows) = self.brackets.get(&bracket_id) else {
            return false;
        };
        let groups = &self.groups;

        let mut resume = [0_usize; 2];
        for team in Team::BOTH {
            let pool = self.pools.get_mut(team);
            let row = rows.row(SubQueue::normal(team));
            let mut index = 0;
            while index < row.len() {
                let group = &groups[&row[index]];
                index += 1;
                if !group.is_invited() {
                    pool.add_group(group, max_players);
                    if pool.player_count() >= min_players {
                        break;
                    }
                }
            }
            resume[team.index()] = index;
        }

        let alliance = self.pools.alliance.player_count();
        let horde = self.pools.horde.player_count();
        if config.invitation_type != InvitationType::NoBalance && alliance >= required && horde >= required {
            let smaller = if horde < alliance { Team::Horde } else { Team::Alliance };
            let target = self.pools.get(smaller.other()).player_count();
            let pool = self.pools.get_mut(smaller);
            for id in rows
                .row(SubQueue::normal(smaller))
                .iter()
                .skip(resume[smaller.index()])
            {
                let group = &groups[id];
                if !group.is_invited() && pool.add_group(group, target).should_stop {
                    break;
                }
            }

            if self
                .pools
                .alliance
                .player_count()
                .abs_diff(self.pools.horde.player_count())
                > 2
            {
                return false;
            }
        }

        let alliance = self.pools.alliance.player_count();
        let horde = self.pools.horde.player_count();
        if config.testing && (alliance > 0 || horde > 0) {
            return true;
        }
        alliance >= required && horde >= required
    }

    /// When one faction alone fills both sides of a skirmish, the overflow is reassigned to the
    /// other faction.
    pub(crate) fn check_skirmish_for_same_faction(
        &mut self,
        bracket_id: BracketId,
        min_players: usize,
    ) -> bool {
        let alliance = self.pools.alliance.player_count();
        let horde = self.pools.horde.player_count();
        if alliance < min_players && horde < min_players {
            return false;
        }

        let (full, other) = if horde == min_players {
            (Team::Horde, Team::Alliance)
        } else {
            (Team::Alliance, Team::Horde)
        };
        self.pools.get_mut(other).reset();

        let Some(last) = self.pools.get(full).selected().last().copied() else {
            return false;
        };
        let Some(rows) = self.brackets.get(&bracket_id) else {
            return false;
        };
        let row = rows.row(SubQueue::normal(full));
        let Some(last_pos) = row.iter().position(|id| *id == last.id) else {
            return false;
        };

        let groups = &self.groups;
        let pool = self.pools.get_mut(other);
        for id in row.iter().skip(last_pos + 1) {
            let group = &groups[id];
            if !group.is_invited() && pool.add_group(group, min_players).should_stop {
                break;
            }
        }

        if self.pools.get(other).player_count() != min_players {
            return false;
        }

        let moved: Vec<GroupId> = self.pools.get(other).group_ids().collect();
        if let Some(rows) = self.brackets.get_mut(&bracket_id) {
            for group_id in moved {
                if let Some(group) = self.groups.get_mut(&group_id) {
                    group.team = other;
                }
                rows.row_mut(SubQueue::normal(full)).retain(|id| *id != group_id);
                rows.row_mut(SubQueue::normal(other)).push_front(group_id);
            }
        }
        true
    }

    /// Selects groups for the free slots of a running battleground.
    pub(crate) fn fill_players_to_bg(
        &mut self,
        bg: &Battleground,
        bracket_id: BracketId,
        invitation_type: InvitationType,
    ) {
        let mut alliance_free = i64::from(bg.free_slots_for_team(Team::Alliance, invitation_type));
        let mut horde_free = i64::from(bg.free_slots_for_team(Team::Horde, invitation_type));

        let Some(rows) = self.brackets.get(&bracket_id) else {
            return;
        };
        let groups = &self.groups;
        let alliance_row = rows.row(SubQueue::NormalAlliance);
        let horde_row = rows.row(SubQueue::NormalHorde);

        if invitation_type == InvitationType::Even && alliance_free == 1 && horde_free == 1 {
            let alliance_groups = alliance_row.len() as i64;
            let horde_groups = horde_row.len() as i64;
            if alliance_groups != horde_groups {
                alliance_free = (alliance_free - (alliance_groups - horde_groups).max(0)).max(0);
                horde_free = (horde_free - (horde_groups - alliance_groups).max(0)).max(0);
            }
        }

        let capacity = |free: i64| usize::try_from(free).unwrap_or(0);
        let fill = |pool: &mut super::SelectionPool, row: &std::collections::VecDeque<GroupId>, index: &mut usize, free: i64| {
            while *index < row.len() && !pool.add_group(&groups[&row[*index]], capacity(free)).should_stop {
                *index += 1;
            }
        };

        let mut alliance_index = 0;
        let mut horde_index = 0;
        fill(&mut self.pools.alliance, alliance_row, &mut alliance_index, alliance_free);
        fill(&mut self.pools.horde, horde_row, &mut horde_index, horde_free);

        if invitation_type == InvitationType::NoBalance {
            return;
        }

        let count = |pool: &super::SelectionPool| pool.player_count() as i64;
        let mut alliance_diff = alliance_free - count(&self.pools.alliance);
        let mut horde_diff = horde_free - count(&self.pools.horde);

        while (alliance_diff - horde_diff).abs() > 1
            && (self.pools.alliance.player_count() > 0 || self.pools.horde.player_count() > 0)
        {
            if alliance_diff < horde_diff {
                let excess = usize::try_from(horde_diff - alliance_diff).unwrap_or(0);
                if self.pools.alliance.kick_group(excess) {
                    fill(
                        &mut self.pools.alliance,
                        alliance_row,
                        &mut alliance_index,
                        (alliance_free - horde_diff).max(0),
                    );
                }
                if self.pools.alliance.player_count() == 0 {
                    if alliance_free <= horde_diff + 1 {
                        break;
                    }
                    self.pools.horde.kick_group(excess);
                }
            } else {
                let excess = usize::try_from(alliance_diff - horde_diff).unwrap_or(0);
                if self.pools.horde.kick_group(excess) {
                    fill(
                        &mut self.pools.horde,
                        horde_row,
                        &mut horde_index,
                        (horde_free - alliance_diff).max(0),
                    );
                }
                if self.pools.horde.player_count() == 0 {
                    if horde_free <= alliance_diff + 1 {
                        break;
                    }
                    self.pools.alliance.kick_group(excess);
                }
            }

            alliance_diff = alliance_free - count(&self.pools.alliance);
            horde_diff = horde_free - count(&self.pools.horde);
        }
    }

    /// Pairs two rated arena teams within the rating window (or past the discard timer).
    fn match_rated_arena(
        &mut self,
        registry: &mut BattlegroundRegistry,
        bracket: BracketEntry,
        arena_rating: u32,
        config: &BattlegroundConfig,
        directory: &dyn PlayerDirectory,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        let now = registry.now();
        let Some(found) = self.find_rated_opponents(bracket.bracket_id, arena_rating, now, config) else {
            return;
        };
        let [(alliance_row, alliance_id), (horde_row, horde_id)] = found;

        let Some(instance_id) = registry.create_battleground(self.queue_type, bracket, true) else {
            error!(queue_type = %self.queue_type, bracket_id = bracket.bracket_id.0, "Could not create rated arena");
            return;
        };

        let alliance_ratings = self.groups[&alliance_id].ratings;
        let horde_ratings = self.groups[&horde_id].ratings;
        if let Some(group) = self.groups.get_mut(&alliance_id) {
            group.ratings.opponents_team_rating = horde_ratings.team_rating;
            group.ratings.opponents_matchmaker_rating = horde_ratings.matchmaker_rating;
        }
        if let Some(group) = self.groups.get_mut(&horde_id) {
            group.ratings.opponents_team_rating = alliance_ratings.team_rating;
            group.ratings.opponents_matchmaker_rating = alliance_ratings.matchmaker_rating;
        }

        if let Some(rows) = self.brackets.get_mut(&bracket.bracket_id) {
            for (side, row, group_id) in [(Team::Alliance, alliance_row, alliance_id), (Team::Horde, horde_row, horde_id)] {
                if row != SubQueue::premade(side) {
                    rows.row_mut(row).retain(|id| *id != group_id);
                    rows.row_mut(SubQueue::premade(side)).push_front(group_id);
                }
            }
        }

        if let Some(bg) = registry.battleground_mut(instance_id) {
            bg.set_arena_matchmaker_rating(Team::Alliance, alliance_ratings.matchmaker_rating);
            bg.set_arena_matchmaker_rating(Team::Horde, horde_ratings.matchmaker_rating);
        }

        self.invite_group_to_bg(registry, alliance_id, instance_id, Some(Team::Alliance), directory, effects);
        self.invite_group_to_bg(registry, horde_id, instance_id, Some(Team::Horde), directory, effects);

        debug!(
            %instance_id,
            alliance_mmr = alliance_ratings.matchmaker_rating,
            horde_mmr = horde_ratings.matchmaker_rating,
            "Starting rated arena match"
        );
        registry.start_battleground(instance_id);
    }

    fn find_rated_opponents(
        &self,
        bracket_id: BracketId,
        arena_rating: u32,
        now: Duration,
        config: &BattlegroundConfig,
    ) -> Option<[(SubQueue, GroupId); 2]> {
        let rows = self.brackets.get(&bracket_id)?;
        let front = |sub_queue: SubQueue| rows.row(sub_queue).front().and_then(|id| self.groups.get(id));

        let rating = if arena_rating > 0 {
            arena_rating
        } else {
            match (front(SubQueue::PremadeAlliance), front(SubQueue::PremadeHorde)) {
                (Some(alliance), Some(horde)) => {
                    if alliance.join_time < horde.join_time {
                        alliance.ratings.matchmaker_rating
                    } else {
                        horde.ratings.matchmaker_rating
                    }
                }
                (Some(group), None) | (None, Some(group)) => group.ratings.matchmaker_rating,
                (None, None) => return None,
            }
        };

        let max_difference = config.arena_max_rating_difference;
        let min_rating = rating.saturating_sub(max_difference);
        let max_rating = rating.saturating_add(max_difference);
        let qualifies = |group: &GroupQueueInfo| {
            let mmr = group.ratings.matchmaker_rating;
            let in_window = max_difference == 0 || (min_rating..=max_rating).contains(&mmr);
            let discarded = now.saturating_sub(group.join_time) > config.arena_rating_discard_timer;
            !group.is_invited() && (in_window || discarded)
        };

        let mut found: Vec<(SubQueue, GroupId)> = Vec::with_capacity(2);
        for sub_queue in [SubQueue::PremadeAlliance, SubQueue::PremadeHorde] {
            if let Some(id) = rows
                .row(sub_queue)
                .iter()
                .copied()
                .find(|id| qualifies(&self.groups[id]))
            {
                found.push((sub_queue, id));
            }
        }

        if let [(sub_queue, first)] = found[..] {
            let first_team = self.groups[&first].ratings.arena_team_id;
            let row = rows.row(sub_queue);
            let start = row.iter().position(|id| *id == first).map_or(row.len(), |pos| pos + 1);
            if let Some(id) = row.iter().skip(start).copied().find(|id| {
                let group = &self.groups[id];
                qualifies(group) && group.ratings.arena_team_id != first_team
            }) {
                found.push((sub_queue, id));
            }
        }

        match found[..] {
            [first, second] => Some([first, second]),
            _ => None,
        }
    }
}
