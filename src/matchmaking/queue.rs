//! Mode queues and queue admission
//!
//! Each scope holds one FIFO queue per mode. [`QueueManager`] admits and
//! removes players and drains a queue into a match once it reaches quorum.

use crate::error::{RankedError, Result};
use crate::matchmaking::factory::MatchFactory;
use crate::types::{
    JoinOutcome, LeaveOutcome, Mode, PlayerId, QueueDepth, QueueStatus, Rating, ScopeState,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Queue entry that preserves join order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub player_id: PlayerId,
    pub joined_at: DateTime<Utc>,
}

/// FIFO waiting list for one mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeQueue {
    mode: Mode,
    entries: VecDeque<QueueEntry>,
}

impl ModeQueue {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            entries: VecDeque::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.entries.iter().any(|entry| entry.player_id == player_id)
    }

    /// Player ids in admission order
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.entries
            .iter()
            .map(|entry| entry.player_id.clone())
            .collect()
    }

    /// Append a player at the tail
    pub fn push(&mut self, player_id: PlayerId, joined_at: DateTime<Utc>) {
        self.entries.push_back(QueueEntry {
            player_id,
            joined_at,
        });
    }

    /// Remove a player; returns whether they were queued
    pub fn remove(&mut self, player_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.player_id != player_id);
        self.entries.len() != before
    }

    pub fn has_quorum(&self) -> bool {
        self.entries.len() >= self.mode.required_players()
    }

    /// Take exactly the required number of players from the head, oldest first
    pub fn drain_quorum(&mut self) -> Option<Vec<PlayerId>> {
        if !self.has_quorum() {
            return None;
        }
        Some(
            self.entries
                .drain(..self.mode.required_players())
                .map(|entry| entry.player_id)
                .collect(),
        )
    }

    /// Remove every entry that joined before `cutoff`
    pub fn remove_joined_before(&mut self, cutoff: DateTime<Utc>) -> Vec<PlayerId> {
        let (stale, fresh): (VecDeque<_>, VecDeque<_>) = self
            .entries
            .drain(..)
            .partition(|entry| entry.joined_at < cutoff);
        self.entries = fresh;
        stale.into_iter().map(|entry| entry.player_id).collect()
    }
}

/// Admits players to queues and forms matches at quorum
pub struct QueueManager {
    factory: Arc<MatchFactory>,
    initial_rating: Rating,
}

impl QueueManager {
    pub fn new(factory: Arc<MatchFactory>, initial_rating: Rating) -> Self {
        Self {
            factory,
            initial_rating,
        }
    }

    /// Admit a player to a mode's queue, forming a match if quorum is reached.
    ///
    /// Fails without touching the state if the player is already queued in
    /// any mode or is part of an active match.
    pub fn join(
        &self,
        state: &mut ScopeState,
        player_id: &str,
        mode: Mode,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome> {
        if let Some(queued_mode) = state.queued_mode(player_id) {
            return Err(RankedError::AlreadyQueued {
                player_id: player_id.to_string(),
                mode: queued_mode,
            });
        }
        if let Some(active) = state.active_match_of(player_id) {
            return Err(RankedError::AlreadyInMatch {
                player_id: player_id.to_string(),
                match_id: active.match_id.clone(),
            });
        }

        let rating = state
            .players
            .get_or_create(player_id, self.initial_rating)
            .rating;

        let queue = state.queue_mut(mode);
        queue.push(player_id.to_string(), now);
        let count = queue.len();
        let required = mode.required_players();

        debug!(
            "Player '{}' admitted to {} queue ({}/{})",
            player_id, mode, count, required
        );

        match queue.drain_quorum() {
            Some(cohort) => {
                info!(
                    "{} queue reached quorum, forming match from {:?}",
                    mode, cohort
                );
                let formed = self.factory.create(state, mode, cohort, now)?;
                Ok(JoinOutcome::MatchFormed { formed })
            }
            None => Ok(JoinOutcome::Waiting {
                mode,
                count,
                required,
                rating,
            }),
        }
    }

    /// Remove a player from every queue of the scope
    pub fn leave(&self, state: &mut ScopeState, player_id: &str) -> Result<LeaveOutcome> {
        let modes_left: Vec<Mode> = state
            .queues
            .values_mut()
            .filter_map(|queue| queue.remove(player_id).then(|| queue.mode()))
            .collect();

        if modes_left.is_empty() {
            return Err(RankedError::NotQueued {
                player_id: player_id.to_string(),
            });
        }

        debug!("Player '{}' left queues {:?}", player_id, modes_left);
        Ok(LeaveOutcome { modes_left })
    }

    /// Queue depth per mode plus the number of active matches
    pub fn status(state: &ScopeState) -> QueueStatus {
        QueueStatus {
            queues: Mode::ALL
                .iter()
                .map(|mode| QueueDepth {
                    mode: *mode,
                    count: state.queue_len(*mode),
                    required: mode.required_players(),
                })
                .collect(),
            active_matches: state.active_matches.len(),
        }
    }
}
