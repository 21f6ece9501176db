use std::time::Duration;

use serde::Serialize;

use crate::battleground::BattlegroundScore;
use crate::{
    ArenaTeamId, BattlegroundTypeId, BracketId, GroupId, InstanceId, JoinError, MapId, PlayerId, Position, QueueTypeId,
    SpiritGuideId, Team,
};

/// Consequences of a domain operation, delivered by the application layer through its outbound ports.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum BattlegroundEffect {
    Status {
        player_id: PlayerId,
        status: QueueStatus,
    },
    Message {
        recipients: Vec<PlayerId>,
        announcement: Announcement,
    },
    WorldAnnouncement(Announcement),
    StartTimer {
        player_id: PlayerId,
        remaining: Duration,
        total: Duration,
    },
    Scoreboard {
        player_id: PlayerId,
        scoreboard: Scoreboard,
    },
    World(WorldCommand),
    RecordMatch(MatchRecord),
    Arena(ArenaTeamEvent),
}

impl BattlegroundEffect {
    #[must_use]
    pub fn status(
        player_id: PlayerId,
        queue_type: QueueTypeId,
        ticket: Option<QueueTicket>,
        state: QueueState,
    ) -> Self {
        BattlegroundEffect::Status {
            player_id,
            status: QueueStatus {
                ticket,
                queue_type,
                state,
            },
        }
    }

    #[must_use]
    pub fn recipient(&self) -> Option<PlayerId> {
        match self {
            BattlegroundEffect::Status { player_id, .. }
            | BattlegroundEffect::StartTimer { player_id, .. }
            | BattlegroundEffect::Scoreboard { player_id, .. } => Some(*player_id),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueueTicket {
    pub requester_id: PlayerId,
    pub ticket_id: GroupId,
    pub join_time: Duration,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueueStatus {
    pub ticket: Option<QueueTicket>,
    pub queue_type: QueueTypeId,
    pub state: QueueState,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QueueState {
    None,
    NeedConfirmation {
        instance_id: InstanceId,
        client_instance_id: u32,
        map_id: MapId,
        timeout: Duration,
    },
    Active {
        instance_id: InstanceId,
        map_id: MapId,
        team: Team,
        shutdown_timer: Duration,
        elapsed: Duration,
    },
    Queued {
        average_wait: Duration,
        wait_time: Duration,
        as_group: bool,
    },
    Failed {
        reason: JoinError,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Announcement {
    QueueStatus {
        bg_type_id: BattlegroundTypeId,
        min_level: u8,
        max_level: u8,
        alliance_queued: u32,
        alliance_needed: u32,
        horde_queued: u32,
        horde_needed: u32,
    },
    ArenaTeamJoinedQueue {
        arena_team_id: ArenaTeamId,
        team_size: u8,
        rating: u32,
    },
    ArenaTeamLeftQueue {
        arena_team_id: ArenaTeamId,
        team_size: u8,
        rating: u32,
    },
    BattlegroundStarted {
        bg_type_id: BattlegroundTypeId,
        min_level: u8,
        max_level: u8,
    },
    StartingIn {
        remaining: Duration,
    },
    HasBegun,
    PrematureFinishWarning {
        remaining: Duration,
    },
    Winner {
        team: Option<Team>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criteria {
    WinBattleground,
    CompleteBattleground,
}

/// Actions on the game world the battleground asks for. The world simulation carries them out.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WorldCommand {
    Teleport {
        player_id: PlayerId,
        map_id: MapId,
        position: Position,
    },
    TeleportToEntryPoint {
        player_id: PlayerId,
    },
    Doors {
        instance_id: InstanceId,
        open: bool,
    },
    SpiritHeal {
        instance_id: InstanceId,
        spirit_guide: SpiritGuideId,
    },
    ResurrectionVisual {
        player_id: PlayerId,
    },
    Resurrect {
        player_id: PlayerId,
    },
    RemovePreparation {
        player_id: PlayerId,
        arena: bool,
    },
    AwardHonor {
        player_id: PlayerId,
        amount: u32,
    },
    CriteriaCredit {
        player_id: PlayerId,
        criteria: Criteria,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreboardRow {
    pub player_id: PlayerId,
    pub team: Team,
    pub score: BattlegroundScore,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Scoreboard {
    pub instance_id: InstanceId,
    pub winner: Option<Team>,
    pub rows: Vec<ScoreboardRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerMatchRecord {
    pub player_id: PlayerId,
    pub team: Team,
    pub winner: bool,
    pub score: BattlegroundScore,
}

/// One finished match as persisted by the statistics store.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchRecord {
    pub match_id: u64,
    pub bg_type_id: BattlegroundTypeId,
    pub bracket_id: BracketId,
    pub winner: Option<Team>,
    pub players: Vec<PlayerMatchRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ArenaTeamEvent {
    MemberLost {
        arena_team_id: ArenaTeamId,
        player_id: PlayerId,
        opponent_matchmaker_rating: u32,
        online: bool,
    },
    MatchFinished {
        winner: ArenaTeamId,
        loser: ArenaTeamId,
        winner_matchmaker_rating: u32,
        loser_matchmaker_rating: u32,
    },
}
