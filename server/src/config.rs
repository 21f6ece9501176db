//! Server configuration loaded from TOML.
//!
//! Durations are written in milliseconds and mapped onto the domain's [`BattlegroundConfig`].

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use domain::{
    BattlegroundCatalog, BattlegroundConfig, BattlegroundTemplate, BattlegroundTypeId, BracketEntry, BracketId,
    InvitationType, MapId, PerTeam, Position,
};

const WARSONG_GULCH_MAP: MapId = MapId(489);
const ARATHI_BASIN_MAP: MapId = MapId(529);
const NAGRAND_ARENA_MAP: MapId = MapId(559);
const BLADES_EDGE_ARENA_MAP: MapId = MapId(562);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub battleground: BattlegroundSettings,
    pub templates: Vec<BattlegroundTemplate>,
    pub brackets: Vec<BracketEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
            battleground: BattlegroundSettings::default(),
            templates: default_templates(),
            brackets: default_brackets(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    /// Interval of the battleground tick.
    pub tick_interval_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            tick_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error
    pub level: String,
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// The `[battleground]` table. Every duration is in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattlegroundSettings {
    pub invitation_type: InvitationType,
    pub premade_group_wait_for_match_ms: u64,
    pub premature_finish_timer_ms: u64,
    pub invite_accept_wait_time_ms: u64,
    pub invitation_remind_time_ms: u64,
    pub arena_max_rating_difference: u32,
    pub arena_rating_discard_timer_ms: u64,
    pub arena_rated_update_timer_ms: u64,
    pub testing: bool,
    pub arena_testing: bool,
    pub store_statistics: bool,
    pub queue_announcer: bool,
    pub queue_announcer_player_only: bool,
    pub arena_queue_announcer: bool,
    pub reward_winner_honor_first: u32,
    pub reward_winner_honor_last: u32,
    pub reward_loser_honor_first: u32,
    pub reward_loser_honor_last: u32,
    pub max_offline_time_ms: u64,
    pub auto_close_time_ms: u64,
    pub resurrection_interval_ms: u64,
    pub arena_max_duration_ms: u64,
    pub position_check_interval_ms: u64,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for BattlegroundSettings {
    fn default() -> Self {
        let defaults = BattlegroundConfig::default();
        Self {
            invitation_type: defaults.invitation_type,
            premade_group_wait_for_match_ms: millis(defaults.premade_group_wait_for_match),
            premature_finish_timer_ms: millis(defaults.premature_finish_timer),
            invite_accept_wait_time_ms: millis(defaults.invite_accept_wait_time),
            invitation_remind_time_ms: millis(defaults.invitation_remind_time),
            arena_max_rating_difference: defaults.arena_max_rating_difference,
            arena_rating_discard_timer_ms: millis(defaults.arena_rating_discard_timer),
            arena_rated_update_timer_ms: millis(defaults.arena_rated_update_timer),
            testing: defaults.testing,
            arena_testing: defaults.arena_testing,
            store_statistics: defaults.store_statistics,
            queue_announcer: defaults.queue_announcer,
            queue_announcer_player_only: defaults.queue_announcer_player_only,
            arena_queue_announcer: defaults.arena_queue_announcer,
            reward_winner_honor_first: defaults.reward_winner_honor_first,
            reward_winner_honor_last: defaults.reward_winner_honor_last,
            reward_loser_honor_first: defaults.reward_loser_honor_first,
            reward_loser_honor_last: defaults.reward_loser_honor_last,
            max_offline_time_ms: millis(defaults.max_offline_time),
            auto_close_time_ms: millis(defaults.auto_close_time),
            resurrection_interval_ms: millis(defaults.resurrection_interval),
            arena_max_duration_ms: millis(defaults.arena_max_duration),
            position_check_interval_ms: millis(defaults.position_check_interval),
        }
    }
}

impl From<&BattlegroundSettings> for BattlegroundConfig {
    fn from(settings: &BattlegroundSettings) -> Self {
        Self {
            invitation_type: settings.invitation_type,
            premade_group_wait_for_match: Duration::from_millis(settings.premade_group_wait_for_match_ms),
            premature_finish_timer: Duration::from_millis(settings.premature_finish_timer_ms),
            invite_accept_wait_time: Duration::from_millis(settings.invite_accept_wait_time_ms),
            invitation_remind_time: Duration::from_millis(settings.invitation_remind_time_ms),
            arena_max_rating_difference: settings.arena_max_rating_difference,
            arena_rating_discard_timer: Duration::from_millis(settings.arena_rating_discard_timer_ms),
            arena_rated_update_timer: Duration::from_millis(settings.arena_rated_update_timer_ms),
            testing: settings.testing,
            arena_testing: settings.arena_testing,
            store_statistics: settings.store_statistics,
            queue_announcer: settings.queue_announcer,
            queue_announcer_player_only: settings.queue_announcer_player_only,
            arena_queue_announcer: settings.arena_queue_announcer,
            reward_winner_honor_first: settings.reward_winner_honor_first,
            reward_winner_honor_last: settings.reward_winner_honor_last,
            reward_loser_honor_first: settings.reward_loser_honor_first,
            reward_loser_honor_last: settings.reward_loser_honor_last,
            max_offline_time: Duration::from_millis(settings.max_offline_time_ms),
            auto_close_time: Duration::from_millis(settings.auto_close_time_ms),
            resurrection_interval: Duration::from_millis(settings.resurrection_interval_ms),
            arena_max_duration: Duration::from_millis(settings.arena_max_duration_ms),
            position_check_interval: Duration::from_millis(settings.position_check_interval_ms),
        }
    }
}

fn template(
    id: BattlegroundTypeId,
    name: &str,
    map_ids: &[MapId],
    players_per_team: (u32, u32),
    start_locations: PerTeam<Position>,
    is_arena: bool,
) -> BattlegroundTemplate {
    BattlegroundTemplate {
        id,
        name: name.to_string(),
        map_ids: map_ids.to_vec(),
        min_players_per_team: players_per_team.0,
        max_players_per_team: players_per_team.1,
        min_level: 10,
        max_level: 80,
        start_locations,
        start_max_dist: if is_arena { 0.0 } else { 75.0 },
        weight: 1,
        is_arena,
    }
}

fn default_templates() -> Vec<BattlegroundTemplate> {
    let warsong = PerTeam::new(
        Position::new(1519.53, 1481.87, 352.02, 3.14),
        Position::new(933.33, 1433.72, 345.54, 0.0),
    );
    let arathi = PerTeam::new(
        Position::new(1285.81, 1282.42, -15.7, 0.77),
        Position::new(707.34, 681.98, -12.3, 0.83),
    );
    let nagrand = PerTeam::new(
        Position::new(4055.5, 2919.66, 13.61, 0.0),
        Position::new(4023.7, 2981.77, 10.7, 0.0),
    );
    let blades_edge = PerTeam::new(
        Position::new(6238.93, 262.96, 0.89, 0.0),
        Position::new(6180.28, 236.93, 3.3, 0.0),
    );

    vec![
        template(
            BattlegroundTypeId::WARSONG_GULCH,
            "Warsong Gulch",
            &[WARSONG_GULCH_MAP],
            (5, 10),
            warsong,
            false,
        ),
        template(
            BattlegroundTypeId::ARATHI_BASIN,
            "Arathi Basin",
            &[ARATHI_BASIN_MAP],
            (8, 15),
            arathi,
            false,
        ),
        template(
            BattlegroundTypeId::RANDOM_BATTLEGROUND,
            "Random Battleground",
            &[WARSONG_GULCH_MAP, ARATHI_BASIN_MAP],
            (5, 15),
            PerTeam::default(),
            false,
        ),
        template(
            BattlegroundTypeId::ALL_ARENAS,
            "All Arenas",
            &[NAGRAND_ARENA_MAP, BLADES_EDGE_ARENA_MAP],
            (2, 5),
            PerTeam::default(),
            true,
        ),
        template(
            BattlegroundTypeId::NAGRAND_ARENA,
            "Nagrand Arena",
            &[NAGRAND_ARENA_MAP],
            (2, 5),
            nagrand,
            true,
        ),
        template(
            BattlegroundTypeId::BLADES_EDGE_ARENA,
            "Blade's Edge Arena",
            &[BLADES_EDGE_ARENA_MAP],
            (2, 5),
            blades_edge,
            true,
        ),
    ]
}

/// Ten-level brackets from 10 up to a level-80 bracket of its own, on every default map.
fn default_brackets() -> Vec<BracketEntry> {
    [WARSONG_GULCH_MAP, ARATHI_BASIN_MAP, NAGRAND_ARENA_MAP, BLADES_EDGE_ARENA_MAP]
        .into_iter()
        .flat_map(|map_id| {
            (0u8..8).map(move |index| {
                let min_level = 10 + index * 10;
                BracketEntry {
                    map_id,
                    bracket_id: BracketId(index),
                    min_level,
                    max_level: if index == 7 { 80 } else { min_level + 9 },
                }
            })
        })
        .collect()
}

impl AppConfig {
    /// Reads the TOML file at `path`. A missing file yields `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content).map(Some)
    }

    fn parse(
        path: &Path,
        content: &str,
    ) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_address()?;

        if self.server.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".to_string()));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log level {} is not one of {valid_levels:?}",
                self.logging.level
            )));
        }

        for template in &self.templates {
            if template.map_ids.is_empty() {
                return Err(ConfigError::Invalid(format!("template {} has no map", template.id)));
            }
            if template.min_players_per_team > template.max_players_per_team {
                return Err(ConfigError::Invalid(format!(
                    "template {} wants more than its maximum players per team",
                    template.id
                )));
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind_address
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bind address {}", self.server.bind_address)))
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.server.tick_interval_ms)
    }

    #[must_use]
    pub fn battleground_config(&self) -> BattlegroundConfig {
        BattlegroundConfig::from(&self.battleground)
    }

    #[must_use]
    pub fn catalog(&self) -> BattlegroundCatalog {
        BattlegroundCatalog::new(self.templates.clone(), self.brackets.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_default_config_matches_domain_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.battleground.invite_accept_wait_time_ms, 90_000);
        assert_eq!(
            config.battleground_config().premade_group_wait_for_match,
            Duration::from_secs(30 * 60)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_catalog_covers_level_80() {
        let catalog = AppConfig::default().catalog();

        let bracket = catalog.bracket_by_level(WARSONG_GULCH_MAP, 80).expect("level 80 bracket");
        assert_eq!(bracket.bracket_id, BracketId(7));
        assert_eq!(catalog.bracket_by_level(WARSONG_GULCH_MAP, 75).map(|b| b.bracket_id), Some(BracketId(6)));
        assert!(catalog.bracket_by_level(WARSONG_GULCH_MAP, 5).is_none());
        assert!(
            catalog
                .template(BattlegroundTypeId::RANDOM_BATTLEGROUND)
                .is_some_and(BattlegroundTemplate::is_random)
        );
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");

        let loaded = AppConfig::load(&dir.path().join("absent.toml")).expect("load");

        assert!(loaded.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
            [server]
            tick_interval_ms = 250

            [battleground]
            invitation_type = "even"
            testing = true
            invite_accept_wait_time_ms = 60000
            "#,
        );

        let config = AppConfig::load(file.path()).expect("load").expect("file exists");

        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        let battleground = config.battleground_config();
        assert_eq!(battleground.invitation_type, InvitationType::Even);
        assert!(battleground.testing);
        assert_eq!(battleground.invite_accept_wait_time, Duration::from_secs(60));
        assert_eq!(battleground.invitation_remind_time, Duration::from_secs(20));
        assert_eq!(config.templates.len(), default_templates().len());
    }

    #[test]
    fn test_templates_and_brackets_from_file() {
        let file = write_config(
            r#"
            [[templates]]
            id = 2
            name = "Warsong Gulch"
            map_ids = [489]
            min_players_per_team = 1
            max_players_per_team = 10
            min_level = 10
            max_level = 80
            start_locations = { alliance = { x = 1.0, y = 2.0, z = 3.0, orientation = 0.0 }, horde = { x = 4.0, y = 5.0, z = 6.0, orientation = 3.1 } }

            [[brackets]]
            map_id = 489
            bracket_id = 0
            min_level = 10
            max_level = 80
            "#,
        );

        let config = AppConfig::load(file.path()).expect("load").expect("file exists");

        assert!(config.validate().is_ok());
        let catalog = config.catalog();
        let warsong = catalog.template(BattlegroundTypeId::WARSONG_GULCH).expect("template");
        assert_eq!(warsong.weight, 1);
        assert!(!warsong.is_arena);
        assert_eq!(warsong.start_locations.horde, Position::new(4.0, 5.0, 6.0, 3.1));
        assert!(catalog.template(BattlegroundTypeId::ARATHI_BASIN).is_none());
        assert_eq!(catalog.bracket_by_level(WARSONG_GULCH_MAP, 42).map(|b| b.bracket_id), Some(BracketId(0)));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let file = write_config("[server\nbind_address = ");

        let result = AppConfig::load(file.path());

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.server.bind_address = "not an address".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.server.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
