use tracing::debug;

use crate::{
    ArenaTeamEvent, ArenaTeamId, BattlegroundEffect, InstanceId, MapId, PerTeam, PlayerDirectory, PlayerId, Team,
    WorldCommand,
};

use super::Roster;

/// Something that happened to a participant while the match is in progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerEvent {
    Killed {
        victim: PlayerId,
        killer: Option<PlayerId>,
    },
    Left {
        player_id: PlayerId,
        team: Team,
    },
    LoggedOut {
        player_id: PlayerId,
        team: Team,
    },
}

/// Per-variant hooks of the match state machine.
pub trait MatchRules {
    /// Prepares the match instance. `false` aborts the battleground.
    fn setup_match(
        &mut self,
        map_id: MapId,
    ) -> bool;

    fn starting_event_close_doors(
        &mut self,
        instance_id: InstanceId,
        effects: &mut Vec<BattlegroundEffect>,
    );

    fn starting_event_open_doors(
        &mut self,
        instance_id: InstanceId,
        effects: &mut Vec<BattlegroundEffect>,
    );

    /// The team that has won by now, if any.
    fn check_win_conditions(
        &self,
        roster: &Roster,
        directory: &dyn PlayerDirectory,
    ) -> Option<Team>;

    /// Reacts to a participant event; a returned team wins the match.
    fn handle_player_event(
        &mut self,
        event: PlayerEvent,
        roster: &Roster,
        directory: &dyn PlayerDirectory,
    ) -> Option<Team>;

    fn finish_match(
        &mut self,
        winner: Option<Team>,
        rated: bool,
        effects: &mut Vec<BattlegroundEffect>,
    );
}

#[derive(Clone, Debug, Default)]
pub struct StandardRules;

impl MatchRules for StandardRules {
    fn setup_match(
        &mut self,
        map_id: MapId,
    ) -> bool {
        map_id != MapId(0)
    }

    fn starting_event_close_doors(
        &mut self,
        instance_id: InstanceId,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        effects.push(BattlegroundEffect::World(WorldCommand::Doors {
            instance_id,
            open: false,
        }));
    }

    fn starting_event_open_doors(
        &mut self,
        instance_id: InstanceId,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        effects.push(BattlegroundEffect::World(WorldCommand::Doors {
            instance_id,
            open: true,
        }));
    }

    fn check_win_conditions(
        &self,
        _roster: &Roster,
        _directory: &dyn PlayerDirectory,
    ) -> Option<Team> {
        None
    }

    fn handle_player_event(
        &mut self,
        _event: PlayerEvent,
        _roster: &Roster,
        _directory: &dyn PlayerDirectory,
    ) -> Option<Team> {
        None
    }

    fn finish_match(
        &mut self,
        _winner: Option<Team>,
        _rated: bool,
        _effects: &mut Vec<BattlegroundEffect>,
    ) {
    }
}

#[derive(Clone, Debug, Default)]
pub struct ArenaRules {
    pub arena_type: u8,
    pub team_ids: PerTeam<Option<ArenaTeamId>>,
    pub matchmaker_ratings: PerTeam<u32>,
}

impl ArenaRules {
    #[must_use]
    pub fn new(arena_type: u8) -> Self {
        Self {
            arena_type,
            ..Self::default()
        }
    }
}

impl MatchRules for ArenaRules {
    fn setup_match(
        &mut self,
        map_id: MapId,
    ) -> bool {
        map_id != MapId(0)
    }

    fn starting_event_close_doors(
        &mut self,
        instance_id: InstanceId,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        effects.push(BattlegroundEffect::World(WorldCommand::Doors {
            instance_id,
            open: false,
        }));
    }

    fn starting_event_open_doors(
        &mut self,
        instance_id: InstanceId,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        effects.push(BattlegroundEffect::World(WorldCommand::Doors {
            instance_id,
            open: true,
        }));
    }

    fn check_win_conditions(
        &self,
        roster: &Roster,
        directory: &dyn PlayerDirectory,
    ) -> Option<Team> {
        [Team::Horde, Team::Alliance].into_iter().find_map(|team| {
            let loser = team.other();
            (roster.alive_count(loser, directory) == 0 && roster.count(team) > 0).then_some(team)
        })
    }

    fn handle_player_event(
        &mut self,
        event: PlayerEvent,
        roster: &Roster,
        directory: &dyn PlayerDirectory,
    ) -> Option<Team> {
        match event {
            PlayerEvent::Killed { .. } | PlayerEvent::Left { .. } => self.check_win_conditions(roster, directory),
            PlayerEvent::LoggedOut { player_id, team } => {
                let standing = roster
                    .team_members(team)
                    .filter(|&id| id != player_id && directory.is_alive(id) && directory.is_online(id))
                    .count();
                let other = team.other();
                (standing == 0 && roster.count(other) > 0).then_some(other)
            }
        }
    }

    fn finish_match(
        &mut self,
        winner: Option<Team>,
        rated: bool,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        if !rated {
            return;
        }
        let Some(winner) = winner else {
            debug!(arena_type = self.arena_type, "Rated arena ended without a winner");
            return;
        };
        let loser = winner.other();
        if let (Some(winner_id), Some(loser_id)) = (*self.team_ids.get(winner), *self.team_ids.get(loser)) {
            effects.push(BattlegroundEffect::Arena(ArenaTeamEvent::MatchFinished {
                winner: winner_id,
                loser: loser_id,
                winner_matchmaker_rating: *self.matchmaker_ratings.get(winner),
                loser_matchmaker_rating: *self.matchmaker_ratings.get(loser),
            }));
        }
    }
}

/// Variant of a match, dispatching the [`MatchRules`] hooks.
#[derive(Clone, Debug)]
pub enum MatchKind {
    Standard(StandardRules),
    Arena(ArenaRules),
}

impl MatchKind {
    /// Arena team and opponent rating charged when a member of `team` leaves a rated arena.
    #[must_use]
    pub fn member_lost_penalty(
        &self,
        team: Team,
    ) -> Option<(ArenaTeamId, u32)> {
        match self {
            MatchKind::Standard(_) => None,
            MatchKind::Arena(arena) => {
                let team_id = (*arena.team_ids.get(team))?;
                Some((team_id, *arena.matchmaker_ratings.get(team.other())))
            }
        }
    }

    fn rules_mut(&mut self) -> &mut dyn MatchRules {
        match self {
            MatchKind::Standard(rules) => rules,
            MatchKind::Arena(rules) => rules,
        }
    }

    fn rules(&self) -> &dyn MatchRules {
        match self {
            MatchKind::Standard(rules) => rules,
            MatchKind::Arena(rules) => rules,
        }
    }
}

impl MatchRules for MatchKind {
    fn setup_match(
        &mut self,
        map_id: MapId,
    ) -> bool {
        self.rules_mut().setup_match(map_id)
    }

    fn starting_event_close_doors(
        &mut self,
        instance_id: InstanceId,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        self.rules_mut().starting_event_close_doors(instance_id, effects);
    }

    fn starting_event_open_doors(
        &mut self,
        instance_id: InstanceId,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        self.rules_mut().starting_event_open_doors(instance_id, effects);
    }

    fn check_win_conditions(
        &self,
        roster: &Roster,
        directory: &dyn PlayerDirectory,
    ) -> Option<Team> {
        self.rules().check_win_conditions(roster, directory)
    }

    fn handle_player_event(
        &mut self,
        event: PlayerEvent,
        roster: &Roster,
        directory: &dyn PlayerDirectory,
    ) -> Option<Team> {
        self.rules_mut().handle_player_event(event, roster, directory)
    }

    fn finish_match(
        &mut self,
        winner: Option<Team>,
        rated: bool,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        self.rules_mut().finish_match(winner, rated, effects);
    }
}
