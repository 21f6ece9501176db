use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use application::ports::out_::{
    ArenaTeamLedger, AsyncTimer, BattlegroundNotification, BattlegroundNotifier, MatchStatisticsRepository,
    WorldGateway,
};
use domain::{ArenaTeamEvent, MatchRecord, PlayerDirectory, PlayerId, Position, WorldCommand};

/// Recording adapter for every outbound port. Doubles as the default match store.
#[derive(Default)]
pub struct InMemory {
    notifications: RwLock<Vec<(Option<PlayerId>, BattlegroundNotification)>>,
    world_commands: RwLock<Vec<WorldCommand>>,
    matches: RwLock<Vec<MatchRecord>>,
    arena_events: RwLock<Vec<ArenaTeamEvent>>,
}

impl InMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications addressed to `player_id`, oldest first. Broadcasts are included.
    #[must_use]
    pub fn notifications_for(
        &self,
        player_id: PlayerId,
    ) -> Vec<BattlegroundNotification> {
        self.notifications
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(recipient, _)| recipient.is_none_or(|id| id == player_id))
            .map(|(_, notification)| notification.clone())
            .collect()
    }

    #[must_use]
    pub fn broadcasts(&self) -> Vec<BattlegroundNotification> {
        self.notifications
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(recipient, _)| recipient.is_none())
            .map(|(_, notification)| notification.clone())
            .collect()
    }

    #[must_use]
    pub fn world_commands(&self) -> Vec<WorldCommand> {
        self.world_commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn matches(&self) -> Vec<MatchRecord> {
        self.matches.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn arena_events(&self) -> Vec<ArenaTeamEvent> {
        self.arena_events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.notifications
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.world_commands
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl BattlegroundNotifier for InMemory {
    async fn notify_player(
        &self,
        player_id: PlayerId,
        notification: BattlegroundNotification,
    ) {
        self.notifications
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((Some(player_id), notification));
    }

    async fn broadcast(
        &self,
        notification: BattlegroundNotification,
    ) {
        self.notifications
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((None, notification));
    }
}

#[async_trait]
impl WorldGateway for InMemory {
    async fn execute(
        &self,
        command: WorldCommand,
    ) {
        self.world_commands
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }
}

#[async_trait]
impl MatchStatisticsRepository for InMemory {
    async fn save_match(
        &self,
        record: MatchRecord,
    ) {
        self.matches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

#[async_trait]
impl ArenaTeamLedger for InMemory {
    async fn record(
        &self,
        event: ArenaTeamEvent,
    ) {
        self.arena_events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[async_trait]
impl AsyncTimer for InMemory {
    async fn sleep(
        &self,
        _duration: Duration,
    ) {
        // instant, so tests drive ticks without waiting
    }
}

/// Presence and vitals of connected players. Unknown players are offline.
#[derive(Default)]
pub struct InMemoryPlayerDirectory {
    online: RwLock<HashSet<PlayerId>>,
    dead: RwLock<HashSet<PlayerId>>,
    positions: RwLock<HashMap<PlayerId, Position>>,
}

impl InMemoryPlayerDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(
        &self,
        player_id: PlayerId,
        online: bool,
    ) {
        let mut players = self.online.write().unwrap_or_else(PoisonError::into_inner);
        if online {
            players.insert(player_id);
        } else {
            players.remove(&player_id);
        }
    }

    pub fn set_alive(
        &self,
        player_id: PlayerId,
        alive: bool,
    ) {
        let mut dead = self.dead.write().unwrap_or_else(PoisonError::into_inner);
        if alive {
            dead.remove(&player_id);
        } else {
            dead.insert(player_id);
        }
    }

    pub fn set_position(
        &self,
        player_id: PlayerId,
        position: Position,
    ) {
        self.positions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player_id, position);
    }
}

impl PlayerDirectory for InMemoryPlayerDirectory {
    fn is_online(
        &self,
        player_id: PlayerId,
    ) -> bool {
        self.online
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&player_id)
    }

    fn is_alive(
        &self,
        player_id: PlayerId,
    ) -> bool {
        self.is_online(player_id)
            && !self
                .dead
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&player_id)
    }

    fn position(
        &self,
        player_id: PlayerId,
    ) -> Option<Position> {
        if !self.is_online(player_id) {
            return None;
        }
        self.positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&player_id)
            .copied()
    }
}
