//! Error types for the ranked engine
//!
//! Every engine operation reports failures through [`RankedError`]. All variants
//! are caller-visible and none of them is fatal to the engine. Process-level
//! plumbing (configuration, server start-up) uses `anyhow` instead.

use crate::types::{MatchId, Mode, PlayerId, ScopeId};

/// Result type alias for engine operations
pub type Result<T, E = RankedError> = std::result::Result<T, E>;

/// Caller-visible failures of the ranked engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankedError {
    #[error("Invalid mode: '{token}' (use 1s, 2s or 3s)")]
    InvalidMode { token: String },

    #[error("Player {player_id} is already in the {mode} queue")]
    AlreadyQueued { player_id: PlayerId, mode: Mode },

    #[error("Player {player_id} is already in active match {match_id}")]
    AlreadyInMatch {
        player_id: PlayerId,
        match_id: MatchId,
    },

    #[error("Player {player_id} is not in any queue")]
    NotQueued { player_id: PlayerId },

    #[error("Match not found or already resolved: {match_id}")]
    MatchNotFound { match_id: MatchId },

    #[error("Player {player_id} did not play in match {match_id}")]
    NotAParticipant {
        player_id: PlayerId,
        match_id: MatchId,
    },

    #[error("Invalid vote: '{token}' (use team1 or team2)")]
    InvalidVote { token: String },

    /// The state store failed. The in-memory mutation that triggered the save
    /// has already happened and is not rolled back.
    #[error("Persistence failed for scope {scope}: {message}")]
    Persistence { scope: ScopeId, message: String },

    #[error("Internal engine error: {message}")]
    Internal { message: String },
}

impl RankedError {
    /// Stable snake_case code for API responses and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            RankedError::InvalidMode { .. } => "invalid_mode",
            RankedError::AlreadyQueued { .. } => "already_queued",
            RankedError::AlreadyInMatch { .. } => "already_in_match",
            RankedError::NotQueued { .. } => "not_queued",
            RankedError::MatchNotFound { .. } => "match_not_found",
            RankedError::NotAParticipant { .. } => "not_a_participant",
            RankedError::InvalidVote { .. } => "invalid_vote",
            RankedError::Persistence { .. } => "persistence_error",
            RankedError::Internal { .. } => "internal_error",
        }
    }

    /// Whether the error was caused by the request rather than the engine
    pub fn is_caller_error(&self) -> bool {
        !matches!(
            self,
            RankedError::Persistence { .. } | RankedError::Internal { .. }
        )
    }
}
