//! Ranked leaderboard derived from the player directory

use crate::rating::directory::PlayerDirectory;
use crate::types::LeaderboardEntry;

/// Read-only ranked view over a [`PlayerDirectory`]
pub struct Leaderboard;

impl Leaderboard {
    /// Top `limit` players by rating, highest first.
    ///
    /// The sort is stable, so equal ratings keep the directory's iteration
    /// order (ascending player id).
    pub fn top(directory: &PlayerDirectory, limit: usize) -> Vec<LeaderboardEntry> {
        let mut records: Vec<_> = directory.iter().collect();
        records.sort_by(|a, b| b.rating.cmp(&a.rating));

        records
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, record)| LeaderboardEntry {
                rank: index + 1,
                player_id: record.player_id.clone(),
                rating: record.rating,
                wins: record.wins,
                losses: record.losses,
                matches_played: record.matches_played,
                win_rate_percent: record.win_rate_percent(),
            })
            .collect()
    }
}
