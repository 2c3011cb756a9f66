//! Common types used throughout the ranked engine

use crate::error::RankedError;
use crate::matchmaking::queue::ModeQueue;
use crate::rating::directory::PlayerDirectory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Opaque player identity (a chat-platform user id)
pub type PlayerId = String;

/// Isolation boundary for queues, matches and ratings (a server/guild id)
pub type ScopeId = String;

/// Eight character match identifier drawn from `[A-Z0-9]`
pub type MatchId = String;

/// Integer skill rating, floor 0
pub type Rating = i64;

/// Match format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "1v1")]
    OneVsOne,
    #[serde(rename = "2v2")]
    TwoVsTwo,
    #[serde(rename = "3v3")]
    ThreeVsThree,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::OneVsOne, Mode::TwoVsTwo, Mode::ThreeVsThree];

    /// Number of players that drains the queue into a match
    pub fn required_players(self) -> usize {
        self.team_size() * 2
    }

    pub fn team_size(self) -> usize {
        match self {
            Mode::OneVsOne => 1,
            Mode::TwoVsTwo => 2,
            Mode::ThreeVsThree => 3,
        }
    }

    /// Canonical label used in stored state
    pub fn label(self) -> &'static str {
        match self {
            Mode::OneVsOne => "1v1",
            Mode::TwoVsTwo => "2v2",
            Mode::ThreeVsThree => "3v3",
        }
    }

    /// Short token callers type when joining
    pub fn token(self) -> &'static str {
        match self {
            Mode::OneVsOne => "1s",
            Mode::TwoVsTwo => "2s",
            Mode::ThreeVsThree => "3s",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Mode {
    type Err = RankedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1s" | "1v1" => Ok(Mode::OneVsOne),
            "2s" | "2v2" => Ok(Mode::TwoVsTwo),
            "3s" | "3v3" => Ok(Mode::ThreeVsThree),
            _ => Err(RankedError::InvalidMode {
                token: s.to_string(),
            }),
        }
    }
}

/// One of the two teams of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Team1,
    Team2,
}

impl TeamSide {
    pub fn opposite(self) -> Self {
        match self {
            TeamSide::Team1 => TeamSide::Team2,
            TeamSide::Team2 => TeamSide::Team1,
        }
    }
}

impl std::fmt::Display for TeamSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamSide::Team1 => write!(f, "team1"),
            TeamSide::Team2 => write!(f, "team2"),
        }
    }
}

impl FromStr for TeamSide {
    type Err = RankedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "team1" => Ok(TeamSide::Team1),
            "team2" => Ok(TeamSide::Team2),
            _ => Err(RankedError::InvalidVote {
                token: s.to_string(),
            }),
        }
    }
}

/// Lifecycle of a match. `Completed` and `Disputed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Active,
    Completed,
    Disputed,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, MatchStatus::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Active => "active",
            MatchStatus::Completed => "completed",
            MatchStatus::Disputed => "disputed",
        }
    }
}

/// Rating record of a player within one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player_id: PlayerId,
    pub rating: Rating,
    pub wins: u32,
    pub losses: u32,
    pub matches_played: u32,
}

impl PlayerRecord {
    pub fn new(player_id: PlayerId, rating: Rating) -> Self {
        Self {
            player_id,
            rating,
            wins: 0,
            losses: 0,
            matches_played: 0,
        }
    }

    /// Win rate in percent, 0 when no matches were played
    pub fn win_rate_percent(&self) -> f64 {
        crate::utils::win_rate_percent(self.wins, self.matches_played)
    }
}

/// A formed match and its reporting state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub match_id: MatchId,
    pub mode: Mode,
    /// Private session name handed to players out-of-band
    pub name: String,
    /// Private session password handed to players out-of-band
    pub password: String,
    pub team1: Vec<PlayerId>,
    pub team2: Vec<PlayerId>,
    pub created_at: DateTime<Utc>,
    pub status: MatchStatus,
    /// Claimed winner per reporting participant
    #[serde(default)]
    pub reports: BTreeMap<PlayerId, TeamSide>,
    #[serde(default)]
    pub winner: Option<TeamSide>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Set when the expiry sweep closed the match instead of the players
    #[serde(default)]
    pub expired: bool,
}

impl Match {
    pub fn team(&self, side: TeamSide) -> &[PlayerId] {
        match side {
            TeamSide::Team1 => &self.team1,
            TeamSide::Team2 => &self.team2,
        }
    }

    pub fn participants(&self) -> impl Iterator<Item = &PlayerId> {
        self.team1.iter().chain(self.team2.iter())
    }

    pub fn participant_count(&self) -> usize {
        self.team1.len() + self.team2.len()
    }

    pub fn is_participant(&self, player_id: &str) -> bool {
        self.participants().any(|p| p == player_id)
    }

    /// Votes for (team1, team2) from the current reports
    pub fn tally(&self) -> (usize, usize) {
        self.reports
            .values()
            .fold((0, 0), |(t1, t2), side| match side {
                TeamSide::Team1 => (t1 + 1, t2),
                TeamSide::Team2 => (t1, t2 + 1),
            })
    }

    pub fn all_reported(&self) -> bool {
        self.reports.len() == self.participant_count()
    }
}

/// Complete ranked state of one scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeState {
    pub queues: BTreeMap<Mode, ModeQueue>,
    pub active_matches: HashMap<MatchId, Match>,
    /// Resolved matches in resolution order
    pub history: Vec<Match>,
    pub players: PlayerDirectory,
}

impl Default for ScopeState {
    fn default() -> Self {
        Self {
            queues: Mode::ALL
                .iter()
                .map(|mode| (*mode, ModeQueue::new(*mode)))
                .collect(),
            active_matches: HashMap::new(),
            history: Vec::new(),
            players: PlayerDirectory::default(),
        }
    }
}

impl ScopeState {
    /// Queue for a mode, created if a stored state predates it
    pub fn queue_mut(&mut self, mode: Mode) -> &mut ModeQueue {
        self.queues
            .entry(mode)
            .or_insert_with(|| ModeQueue::new(mode))
    }

    pub fn queue_len(&self, mode: Mode) -> usize {
        self.queues.get(&mode).map(|q| q.len()).unwrap_or(0)
    }

    /// Mode whose queue currently holds the player
    pub fn queued_mode(&self, player_id: &str) -> Option<Mode> {
        self.queues
            .values()
            .find(|queue| queue.contains(player_id))
            .map(|queue| queue.mode())
    }

    /// Active match the player is part of
    pub fn active_match_of(&self, player_id: &str) -> Option<&Match> {
        self.active_matches
            .values()
            .find(|m| m.is_participant(player_id))
    }

    pub fn find_match(&self, match_id: &str) -> Option<&Match> {
        self.active_matches
            .get(match_id)
            .or_else(|| self.history.iter().rev().find(|m| m.match_id == match_id))
    }
}

/// Result of joining a queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum JoinOutcome {
    Waiting {
        mode: Mode,
        count: usize,
        required: usize,
        rating: Rating,
    },
    MatchFormed {
        #[serde(rename = "match")]
        formed: Match,
    },
}

/// Result of leaving the queues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveOutcome {
    pub modes_left: Vec<Mode>,
}

/// Rating change applied to one player during resolution.
///
/// `delta` is the change actually applied. A loser already near 0 is
/// floored there, so their delta can be smaller in magnitude than the
/// winner's gain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingDelta {
    pub player_id: PlayerId,
    pub delta: Rating,
    pub new_rating: Rating,
}

/// Result of a resolved match. Each winner contributes a pair of
/// [`RatingDelta`]s: their own gain and the floored loss of the opponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub match_id: MatchId,
    pub status: MatchStatus,
    pub winning_team: Option<TeamSide>,
    pub rating_deltas: Vec<RatingDelta>,
}

/// Result of reporting a match outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReportOutcome {
    Pending {
        match_id: MatchId,
        votes_team1: usize,
        votes_team2: usize,
        received: usize,
        required: usize,
    },
    Resolved(Resolution),
}

/// Queue depth for one mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDepth {
    pub mode: Mode,
    pub count: usize,
    pub required: usize,
}

/// Queue and match overview of a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queues: Vec<QueueDepth>,
    pub active_matches: usize,
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player_id: PlayerId,
    pub rating: Rating,
    pub wins: u32,
    pub losses: u32,
    pub matches_played: u32,
    pub win_rate_percent: f64,
}

/// What an expiry sweep removed from a scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub expired_queue_entries: Vec<(PlayerId, Mode)>,
    pub expired_matches: Vec<MatchId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired_queue_entries.is_empty() && self.expired_matches.is_empty()
    }
}
