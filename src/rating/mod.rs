//! Rating system for ranked matches
//!
//! This module provides the swing-based rating calculator, the per-scope
//! player directory and the leaderboard derived from it.

pub mod calculator;
pub mod directory;
pub mod leaderboard;

// Re-export commonly used types
pub use calculator::{RatingCalculator, RatingOutcome, SwingConfig, SwingRatingCalculator};
pub use directory::PlayerDirectory;
pub use leaderboard::Leaderboard;
