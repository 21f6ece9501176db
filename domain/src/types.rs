use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct PlayerId(pub uuid::Uuid);

impl Default for PlayerId {
    fn default() -> Self {
        PlayerId::new()
    }
}

impl PlayerId {
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-internal battleground instance id. Never reused within a process.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Queue ticket id of one queued group.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct GroupId(pub u64);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct ArenaTeamId(pub u32);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct MapId(pub u32);

/// Creature id of a spirit healer collecting the dead for batch resurrection.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct SpiritGuideId(pub u64);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct BracketId(pub u8);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BattlegroundTypeId(pub u32);

impl BattlegroundTypeId {
    pub const ALTERAC_VALLEY: Self = Self(1);
    pub const WARSONG_GULCH: Self = Self(2);
    pub const ARATHI_BASIN: Self = Self(3);
    pub const NAGRAND_ARENA: Self = Self(4);
    pub const BLADES_EDGE_ARENA: Self = Self(5);
    pub const ALL_ARENAS: Self = Self(6);
    pub const EYE_OF_THE_STORM: Self = Self(7);
    pub const RUINS_OF_LORDAERON: Self = Self(8);
    pub const STRAND_OF_THE_ANCIENTS: Self = Self(9);
    pub const DALARAN_SEWERS: Self = Self(10);
    pub const RING_OF_VALOR: Self = Self(11);
    pub const ISLE_OF_CONQUEST: Self = Self(30);
    pub const RANDOM_BATTLEGROUND: Self = Self(32);
}

impl fmt::Display for BattlegroundTypeId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Alliance,
    Horde,
}

impl Team {
    pub const BOTH: [Team; 2] = [Team::Alliance, Team::Horde];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Team::Alliance => 0,
            Team::Horde => 1,
        }
    }

    #[must_use]
    pub fn from_index(index: usize) -> Self {
        if index == 0 { Team::Alliance } else { Team::Horde }
    }

    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Team::Alliance => Team::Horde,
            Team::Horde => Team::Alliance,
        }
    }
}

/// Per-team pair of values indexed by [`Team`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerTeam<T> {
    pub alliance: T,
    pub horde: T,
}

impl<T> PerTeam<T> {
    pub fn new(
        alliance: T,
        horde: T,
    ) -> Self {
        Self { alliance, horde }
    }

    pub fn get(
        &self,
        team: Team,
    ) -> &T {
        match team {
            Team::Alliance => &self.alliance,
            Team::Horde => &self.horde,
        }
    }

    pub fn get_mut(
        &mut self,
        team: Team,
    ) -> &mut T {
        match team {
            Team::Alliance => &mut self.alliance,
            Team::Horde => &mut self.horde,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub orientation: f32,
}

impl Position {
    #[must_use]
    pub fn new(
        x: f32,
        y: f32,
        z: f32,
        orientation: f32,
    ) -> Self {
        Self { x, y, z, orientation }
    }

    #[must_use]
    pub fn distance_sq(
        &self,
        other: &Position,
    ) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// Kind of queue a [`QueueTypeId`] addresses.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    Battleground,
    Arena,
    Wargame,
    ArenaSkirmish,
}

/// Immutable key of one [`crate::BattlegroundQueue`].
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct QueueTypeId {
    pub battlemaster_list_id: BattlegroundTypeId,
    pub kind: QueueKind,
    pub rated: bool,
    pub team_size: u8,
}

impl QueueTypeId {
    #[must_use]
    pub fn battleground(bg_type_id: BattlegroundTypeId) -> Self {
        Self {
            battlemaster_list_id: bg_type_id,
            kind: QueueKind::Battleground,
            rated: false,
            team_size: 0,
        }
    }

    #[must_use]
    pub fn arena(
        team_size: u8,
        rated: bool,
    ) -> Self {
        Self {
            battlemaster_list_id: BattlegroundTypeId::ALL_ARENAS,
            kind: if rated { QueueKind::Arena } else { QueueKind::ArenaSkirmish },
            rated,
            team_size,
        }
    }

    #[must_use]
    pub fn is_arena(&self) -> bool {
        matches!(self.kind, QueueKind::Arena | QueueKind::ArenaSkirmish)
    }
}

impl fmt::Display for QueueTypeId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{:?}:{}{}{}",
            self.kind,
            self.battlemaster_list_id,
            if self.rated { ":rated" } else { "" },
            if self.team_size > 0 {
                format!(":{}v{}", self.team_size, self.team_size)
            } else {
                String::new()
            }
        )
    }
}
