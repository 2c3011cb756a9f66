//! Rating calculator trait and implementations
//!
//! This module defines the interface for rating updates after a decided match
//! and the swing-based calculator ranked servers use: a random base swing
//! of 19-24 points, shrunk for heavy favourites and grown for underdogs.

use crate::config::RankedSettings;
use crate::error::{RankedError, Result};
use crate::types::Rating;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// New ratings after one winner/loser comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingOutcome {
    pub winner_rating: Rating,
    pub loser_rating: Rating,
    /// Swing credited to the winner
    pub delta: Rating,
}

/// Trait for calculating rating changes after a decided match
pub trait RatingCalculator: Send + Sync {
    /// Compute the new ratings of a winner and a loser
    fn compute_delta(&self, winner_rating: Rating, loser_rating: Rating) -> Result<RatingOutcome>;

    /// Get the initial rating for new players
    fn initial_rating(&self) -> Rating;
}

/// Constants of the swing calculator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingConfig {
    pub initial_rating: Rating,
    pub base_delta_min: Rating,
    pub base_delta_max: Rating,
    pub gap_threshold: Rating,
    pub gap_adjustment: Rating,
    pub min_favourite_delta: Rating,
    pub max_underdog_delta: Rating,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self::from(&RankedSettings::default())
    }
}

impl From<&RankedSettings> for SwingConfig {
    fn from(settings: &RankedSettings) -> Self {
        Self {
            initial_rating: settings.default_rating,
            base_delta_min: settings.base_delta_min,
            base_delta_max: settings.base_delta_max,
            gap_threshold: settings.rating_gap_threshold,
            gap_adjustment: settings.gap_adjustment,
            min_favourite_delta: settings.min_favourite_delta,
            max_underdog_delta: settings.max_underdog_delta,
        }
    }
}

impl SwingConfig {
    /// Swing for a given base draw and rating pair
    pub fn adjusted_delta(&self, base: Rating, winner_rating: Rating, loser_rating: Rating) -> Rating {
        let gap = winner_rating - loser_rating;
        if gap > self.gap_threshold {
            (base - self.gap_adjustment).max(self.min_favourite_delta)
        } else if gap < -self.gap_threshold {
            (base + self.gap_adjustment).min(self.max_underdog_delta)
        } else {
            base
        }
    }

    /// Apply a swing, flooring the loser at 0
    pub fn apply(&self, delta: Rating, winner_rating: Rating, loser_rating: Rating) -> RatingOutcome {
        RatingOutcome {
            winner_rating: winner_rating + delta,
            loser_rating: (loser_rating - delta).max(0),
            delta,
        }
    }
}

/// Swing-based rating calculator with an injectable random source
#[derive(Debug)]
pub struct SwingRatingCalculator {
    config: SwingConfig,
    rng: Mutex<StdRng>,
}

impl SwingRatingCalculator {
    /// Create a calculator seeded from system entropy
    pub fn new(config: SwingConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a calculator with a fixed seed (reproducible swings)
    pub fn with_seed(config: SwingConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SwingConfig, rng: StdRng) -> Result<Self> {
        if config.base_delta_min > config.base_delta_max {
            return Err(RankedError::Internal {
                message: format!(
                    "Invalid base delta range {}..={}",
                    config.base_delta_min, config.base_delta_max
                ),
            });
        }
        Ok(Self {
            config,
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &SwingConfig {
        &self.config
    }

    fn draw_base(&self) -> Result<Rating> {
        let mut rng = self.rng.lock().map_err(|_| RankedError::Internal {
            message: "Failed to acquire rating rng lock".to_string(),
        })?;
        Ok(rng.gen_range(self.config.base_delta_min..=self.config.base_delta_max))
    }
}

impl RatingCalculator for SwingRatingCalculator {
    fn compute_delta(&self, winner_rating: Rating, loser_rating: Rating) -> Result<RatingOutcome> {
        let base = self.draw_base()?;
        let delta = self
            .config
            .adjusted_delta(base, winner_rating, loser_rating);
        Ok(self.config.apply(delta, winner_rating, loser_rating))
    }

    fn initial_rating(&self) -> Rating {
        self.config.initial_rating
    }
}
