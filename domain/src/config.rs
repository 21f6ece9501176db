use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How aggressively matchmaking equalizes team sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationType {
    #[default]
    NoBalance,
    Balanced,
    Even,
}

#[derive(Clone, Debug)]
pub struct BattlegroundConfig {
    pub invitation_type: InvitationType,
    pub premade_group_wait_for_match: Duration,
    /// Zero disables the premature finish countdown.
    pub premature_finish_timer: Duration,
    pub invite_accept_wait_time: Duration,
    pub invitation_remind_time: Duration,
    /// Zero disables rating windows and the periodic rated sweep.
    pub arena_max_rating_difference: u32,
    pub arena_rating_discard_timer: Duration,
    pub arena_rated_update_timer: Duration,
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
    pub max_offline_time: Duration,
    pub auto_close_time: Duration,
    pub resurrection_interval: Duration,
    pub arena_max_duration: Duration,
    pub position_check_interval: Duration,
}

impl Default for BattlegroundConfig {
    fn default() -> Self {
        Self {
            invitation_type: InvitationType::NoBalance,
            premade_group_wait_for_match: Duration::from_secs(30 * 60),
            premature_finish_timer: Duration::from_secs(5 * 60),
            invite_accept_wait_time: Duration::from_secs(90),
            invitation_remind_time: Duration::from_secs(20),
            arena_max_rating_difference: 150,
            arena_rating_discard_timer: Duration::from_secs(10 * 60),
            arena_rated_update_timer: Duration::from_secs(5),
            testing: false,
            arena_testing: false,
            store_statistics: false,
            queue_announcer: false,
            queue_announcer_player_only: false,
            arena_queue_announcer: false,
            reward_winner_honor_first: 30,
            reward_winner_honor_last: 15,
            reward_loser_honor_first: 5,
            reward_loser_honor_last: 5,
            max_offline_time: Duration::from_secs(5 * 60),
            auto_close_time: Duration::from_secs(2 * 60),
            resurrection_interval: Duration::from_secs(30),
            arena_max_duration: Duration::from_secs(47 * 60),
            position_check_interval: Duration::from_secs(1),
        }
    }
}
