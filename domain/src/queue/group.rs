use std::collections::BTreeSet;
use std::time::Duration;

use crate::{ArenaTeamId, BattlegroundTypeId, BracketId, GroupId, InstanceId, PlayerId, QueueTicket, Team};

/// Invitation state of a queued group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvitationState {
    #[default]
    Queued,
    Invited {
        instance_id: InstanceId,
        /// Also used as the staleness marker of scheduled reminder/eviction events.
        remove_invite_time: Duration,
    },
}

/// Rated arena data carried by a group queued for a rated match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaRatings {
    pub arena_team_id: Option<ArenaTeamId>,
    pub team_rating: u32,
    pub matchmaker_rating: u32,
    pub opponents_team_rating: u32,
    pub opponents_matchmaker_rating: u32,
}

/// One queued unit. A solo player is a group of one.
#[derive(Clone, Debug)]
pub struct GroupQueueInfo {
    pub id: GroupId,
    pub team: Team,
    pub bg_type_id: BattlegroundTypeId,
    pub bracket_id: BracketId,
    pub arena_type: u8,
    pub is_rated: bool,
    pub join_time: Duration,
    pub invitation: InvitationState,
    pub ratings: ArenaRatings,
    pub players: BTreeSet<PlayerId>,
}

impl GroupQueueInfo {
    #[must_use]
    pub fn size(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn invited_instance(&self) -> Option<InstanceId> {
        match self.invitation {
            InvitationState::Queued => None,
            InvitationState::Invited { instance_id, .. } => Some(instance_id),
        }
    }

    #[must_use]
    pub fn is_invited(&self) -> bool {
        self.invited_instance().is_some()
    }

    #[must_use]
    pub fn is_invited_to(
        &self,
        instance_id: InstanceId,
        remove_invite_time: Duration,
    ) -> bool {
        self.invitation
            == InvitationState::Invited {
                instance_id,
                remove_invite_time,
            }
    }

    #[must_use]
    pub fn ticket(
        &self,
        requester_id: PlayerId,
    ) -> QueueTicket {
        QueueTicket {
            requester_id,
            ticket_id: self.id,
            join_time: self.join_time,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct PlayerQueueInfo {
    pub(crate) last_online_time: Duration,
    pub(crate) group_id: GroupId,
}

/// Sub-lists of one bracket. Rated teams always occupy the premade rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubQueue {
    PremadeAlliance = 0,
    PremadeHorde = 1,
    NormalAlliance = 2,
    NormalHorde = 3,
}

impl SubQueue {
    pub const ALL: [SubQueue; 4] = [
        SubQueue::PremadeAlliance,
        SubQueue::PremadeHorde,
        SubQueue::NormalAlliance,
        SubQueue::NormalHorde,
    ];

    #[must_use]
    pub fn premade(team: Team) -> Self {
        match team {
            Team::Alliance => SubQueue::PremadeAlliance,
            Team::Horde => SubQueue::PremadeHorde,
        }
    }

    #[must_use]
    pub fn normal(team: Team) -> Self {
        match team {
            Team::Alliance => SubQueue::NormalAlliance,
            Team::Horde => SubQueue::NormalHorde,
        }
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}
