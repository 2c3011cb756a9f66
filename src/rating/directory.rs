//! Per-scope player directory
//!
//! Maps player identities to rating records. Records are created lazily the
//! first time a player is referenced and are never deleted.

use crate::types::{PlayerId, PlayerRecord, Rating};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rating records of every player seen in a scope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerDirectory {
    records: BTreeMap<PlayerId, PlayerRecord>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a player's record, creating it with `initial_rating` if unseen
    pub fn get_or_create(&mut self, player_id: &str, initial_rating: Rating) -> &mut PlayerRecord {
        self.records
            .entry(player_id.to_string())
            .or_insert_with(|| PlayerRecord::new(player_id.to_string(), initial_rating))
    }

    pub fn get(&self, player_id: &str) -> Option<&PlayerRecord> {
        self.records.get(player_id)
    }

    /// Current rating, or `initial_rating` for a player not seen yet
    pub fn rating_of(&self, player_id: &str, initial_rating: Rating) -> Rating {
        self.records
            .get(player_id)
            .map(|record| record.rating)
            .unwrap_or(initial_rating)
    }

    /// Credit a win and set the new rating
    pub fn record_win(&mut self, player_id: &str, new_rating: Rating, initial_rating: Rating) {
        let record = self.get_or_create(player_id, initial_rating);
        record.rating = new_rating;
        record.wins += 1;
        record.matches_played += 1;
    }

    /// Charge a loss and set the new rating
    pub fn record_loss(&mut self, player_id: &str, new_rating: Rating, initial_rating: Rating) {
        let record = self.get_or_create(player_id, initial_rating);
        record.rating = new_rating;
        record.losses += 1;
        record.matches_played += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
