use std::collections::{HashMap, HashSet};

use crate::*;

pub(crate) const WARSONG_MAP: MapId = MapId(489);
pub(crate) const ARATHI_MAP: MapId = MapId(529);
pub(crate) const NAGRAND_MAP: MapId = MapId(559);
pub(crate) const BLADES_EDGE_MAP: MapId = MapId(562);

/// Bracket covering level 80 on every test map.
pub(crate) const TOP_BRACKET: BracketId = BracketId(1);

/// World stand-in: everyone is online and alive unless told otherwise.
#[derive(Default)]
pub(crate) struct StubDirectory {
    offline: HashSet<PlayerId>,
    dead: HashSet<PlayerId>,
    positions: HashMap<PlayerId, Position>,
}

impl StubDirectory {
    pub(crate) fn set_offline(
        &mut self,
        player_id: PlayerId,
    ) {
        self.offline.insert(player_id);
    }

    pub(crate) fn kill(
        &mut self,
        player_id: PlayerId,
    ) {
        self.dead.insert(player_id);
    }

    pub(crate) fn place(
        &mut self,
        player_id: PlayerId,
        position: Position,
    ) {
        self.positions.insert(player_id, position);
    }
}

impl PlayerDirectory for StubDirectory {
    fn is_online(
        &self,
        player_id: PlayerId,
    ) -> bool {
        !self.offline.contains(&player_id)
    }

    fn is_alive(
        &self,
        player_id: PlayerId,
    ) -> bool {
        !self.dead.contains(&player_id)
    }

    fn position(
        &self,
        player_id: PlayerId,
    ) -> Option<Position> {
        self.positions.get(&player_id).copied()
    }
}

pub(crate) fn template(
    id: BattlegroundTypeId,
    map_ids: &[MapId],
    min_players_per_team: u32,
    max_players_per_team: u32,
    is_arena: bool,
) -> BattlegroundTemplate {
    BattlegroundTemplate {
        id,
        name: format!("bg-{id}"),
        map_ids: map_ids.to_vec(),
        min_players_per_team,
        max_players_per_team,
        min_level: 10,
        max_level: 80,
        start_locations: PerTeam::new(Position::new(0.0, 0.0, 0.0, 0.0), Position::new(100.0, 0.0, 0.0, 0.0)),
        start_max_dist: 0.0,
        weight: 1,
        is_arena,
    }
}

/// Warsong Gulch sized `min`..`max` per team, Arathi Basin, a random type over both, and the arenas.
pub(crate) fn catalog(
    min_players_per_team: u32,
    max_players_per_team: u32,
) -> BattlegroundCatalog {
    let templates = vec![
        template(
            BattlegroundTypeId::WARSONG_GULCH,
            &[WARSONG_MAP],
            min_players_per_team,
            max_players_per_team,
            false,
        ),
        template(BattlegroundTypeId::ARATHI_BASIN, &[ARATHI_MAP], 8, 15, false),
        template(
            BattlegroundTypeId::RANDOM_BATTLEGROUND,
            &[WARSONG_MAP, ARATHI_MAP],
            min_players_per_team,
            max_players_per_team,
            false,
        ),
        template(BattlegroundTypeId::ALL_ARENAS, &[NAGRAND_MAP, BLADES_EDGE_MAP], 2, 5, true),
        template(BattlegroundTypeId::NAGRAND_ARENA, &[NAGRAND_MAP], 2, 5, true),
        template(BattlegroundTypeId::BLADES_EDGE_ARENA, &[BLADES_EDGE_MAP], 2, 5, true),
    ];

    let brackets = [WARSONG_MAP, ARATHI_MAP, NAGRAND_MAP, BLADES_EDGE_MAP]
        .into_iter()
        .flat_map(|map_id| {
            [
                BracketEntry {
                    map_id,
                    bracket_id: BracketId(0),
                    min_level: 10,
                    max_level: 69,
                },
                BracketEntry {
                    map_id,
                    bracket_id: TOP_BRACKET,
                    min_level: 70,
                    max_level: 80,
                },
            ]
        })
        .collect();

    BattlegroundCatalog::new(templates, brackets)
}

pub(crate) fn top_bracket(map_id: MapId) -> BracketEntry {
    BracketEntry {
        map_id,
        bracket_id: TOP_BRACKET,
        min_level: 70,
        max_level: 80,
    }
}

pub(crate) fn group_of(
    team: Team,
    size: usize,
    is_premade: bool,
) -> NewGroup {
    let members: Vec<PlayerId> = (0..size).map(|_| PlayerId::new()).collect();
    NewGroup {
        leader: members[0],
        members,
        team,
        is_premade,
        ratings: ArenaRatings::default(),
    }
}

pub(crate) fn arena_team(
    team: Team,
    size: usize,
    arena_team_id: u32,
    matchmaker_rating: u32,
) -> NewGroup {
    NewGroup {
        ratings: ArenaRatings {
            arena_team_id: Some(ArenaTeamId(arena_team_id)),
            team_rating: matchmaker_rating,
            matchmaker_rating,
            ..ArenaRatings::default()
        },
        ..group_of(team, size, true)
    }
}

pub(crate) fn statuses<'a>(
    effects: &'a [BattlegroundEffect],
    player_id: PlayerId,
) -> impl Iterator<Item = &'a QueueState> + 'a {
    effects.iter().filter_map(move |effect| match effect {
        BattlegroundEffect::Status { player_id: id, status } if *id == player_id => Some(&status.state),
        _ => None,
    })
}

pub(crate) fn count_confirmations(effects: &[BattlegroundEffect]) -> usize {
    effects
        .iter()
        .filter(|effect| {
            matches!(
                effect,
                BattlegroundEffect::Status {
                    status: QueueStatus {
                        state: QueueState::NeedConfirmation { .. },
                        ..
                    },
                    ..
                }
            )
        })
        .count()
}
