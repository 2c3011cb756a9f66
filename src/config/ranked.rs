//! Ranked engine settings
//!
//! Rating constants, expiry timeouts and leaderboard defaults. The defaults
//! reproduce the behaviour ranked servers have always had: a starting
//! rating of 200, swings of 19-24 points and no expiry enforcement.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest accepted queue or match timeout (one year)
pub const MAX_TIMEOUT_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Settings for queues, matches and rating updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankedSettings {
    /// Rating assigned to a player the first time they are seen
    pub default_rating: i64,
    /// Lower bound of the random base swing
    pub base_delta_min: i64,
    /// Upper bound of the random base swing (inclusive)
    pub base_delta_max: i64,
    /// Rating gap beyond which the swing is adjusted
    pub rating_gap_threshold: i64,
    /// Points removed from / added to the swing across the gap threshold
    pub gap_adjustment: i64,
    /// Smallest swing a heavy favourite can earn
    pub min_favourite_delta: i64,
    /// Largest swing an underdog can earn
    pub max_underdog_delta: i64,
    /// Seconds a queue entry may wait before the sweep removes it
    pub queue_timeout_seconds: u64,
    /// Seconds a match may stay unresolved before the sweep disputes it
    pub match_timeout_seconds: u64,
    /// Run the background expiry sweep
    pub enable_expiry_sweep: bool,
    /// Interval between background sweeps
    pub sweep_interval_seconds: u64,
    /// Rows returned by the leaderboard when no limit is given
    pub leaderboard_default_limit: usize,
}

impl Default for RankedSettings {
    fn default() -> Self {
        Self {
            default_rating: 200,
            base_delta_min: 19,
            base_delta_max: 24,
            rating_gap_threshold: 100,
            gap_adjustment: 5,
            min_favourite_delta: 15,
            max_underdog_delta: 29,
            queue_timeout_seconds: 300,  // 5 minutes
            match_timeout_seconds: 3600, // 1 hour to report results
            enable_expiry_sweep: false,
            sweep_interval_seconds: 60,
            leaderboard_default_limit: 10,
        }
    }
}

impl RankedSettings {
    pub fn queue_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_timeout_seconds)
    }

    pub fn match_timeout(&self) -> Duration {
        Duration::from_secs(self.match_timeout_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}
