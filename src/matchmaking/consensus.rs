//! Outcome reporting and match resolution
//!
//! Every participant of a match claims which team won. Once all of them have
//! reported, the majority claim decides the match; a tied vote disputes it.
//!
//! Rating updates pair every winner with the first player of the losing
//! team only. That player absorbs one loss per winner while the rest of the
//! losing team keeps its rating and record untouched.

use crate::error::{RankedError, Result};
use crate::rating::RatingCalculator;
use crate::types::{
    Match, MatchStatus, PlayerId, Rating, RatingDelta, ReportOutcome, Resolution, ScopeState,
    TeamSide,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collects outcome claims and resolves matches
pub struct ConsensusResolver {
    calculator: Arc<dyn RatingCalculator>,
}

/// Rating change planned for one winner against the designated opponent
struct PlannedUpdate {
    winner: PlayerId,
    winner_rating: Rating,
    loser_rating: Rating,
}

impl ConsensusResolver {
    pub fn new(calculator: Arc<dyn RatingCalculator>) -> Self {
        Self { calculator }
    }

    /// Record a participant's claim and resolve the match once everyone has voted.
    ///
    /// A later claim from the same player replaces the earlier one.
    pub fn report(
        &self,
        state: &mut ScopeState,
        match_id: &str,
        player_id: &str,
        claimed_winner: TeamSide,
        now: DateTime<Utc>,
    ) -> Result<ReportOutcome> {
        let active = state
            .active_matches
            .get_mut(match_id)
            .ok_or_else(|| RankedError::MatchNotFound {
                match_id: match_id.to_string(),
            })?;

        if !active.is_participant(player_id) {
            return Err(RankedError::NotAParticipant {
                player_id: player_id.to_string(),
                match_id: match_id.to_string(),
            });
        }

        active
            .reports
            .insert(player_id.to_string(), claimed_winner);

        let (votes_team1, votes_team2) = active.tally();
        let received = active.reports.len();
        let required = active.participant_count();

        debug!(
            "Match {} report from '{}': {} ({}/{} received, votes {}-{})",
            match_id, player_id, claimed_winner, received, required, votes_team1, votes_team2
        );

        if !active.all_reported() {
            return Ok(ReportOutcome::Pending {
                match_id: match_id.to_string(),
                votes_team1,
                votes_team2,
                received,
                required,
            });
        }

        let resolution = if votes_team1 == votes_team2 {
            self.dispute(state, match_id, now)?
        } else {
            let winner = if votes_team1 > votes_team2 {
                TeamSide::Team1
            } else {
                TeamSide::Team2
            };
            self.complete(state, match_id, winner, now)?
        };

        Ok(ReportOutcome::Resolved(resolution))
    }

    /// Close a tied match without touching any rating
    fn dispute(
        &self,
        state: &mut ScopeState,
        match_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Resolution> {
        let mut disputed = take_active(state, match_id)?;
        disputed.status = MatchStatus::Disputed;
        disputed.resolved_at = Some(now);

        warn!(
            "Match {} disputed - teams reported different winners",
            match_id
        );

        state.history.push(disputed);
        Ok(Resolution {
            match_id: match_id.to_string(),
            status: MatchStatus::Disputed,
            winning_team: None,
            rating_deltas: Vec::new(),
        })
    }

    /// Apply ratings for a decided match and move it to history
    fn complete(
        &self,
        state: &mut ScopeState,
        match_id: &str,
        winner: TeamSide,
        now: DateTime<Utc>,
    ) -> Result<Resolution> {
        let initial = self.calculator.initial_rating();
        let decided = state
            .active_matches
            .get(match_id)
            .ok_or_else(|| RankedError::MatchNotFound {
                match_id: match_id.to_string(),
            })?;

        let winners = decided.team(winner).to_vec();
        let opponent = decided
            .team(winner.opposite())
            .first()
            .cloned()
            .ok_or_else(|| RankedError::Internal {
                message: format!("Match {} has an empty losing team", match_id),
            })?;

        // Compute every swing before mutating so a calculator failure leaves
        // the scope untouched. The opponent's rating carries over between
        // winners.
        let mut opponent_rating = state.players.rating_of(&opponent, initial);
        let mut planned = Vec::with_capacity(winners.len());
        for winner_id in &winners {
            let winner_rating = state.players.rating_of(winner_id, initial);
            let outcome = self
                .calculator
                .compute_delta(winner_rating, opponent_rating)?;
            planned.push(PlannedUpdate {
                winner: winner_id.clone(),
                winner_rating: outcome.winner_rating,
                loser_rating: outcome.loser_rating,
            });
            opponent_rating = outcome.loser_rating;
        }

        let mut rating_deltas = Vec::with_capacity(planned.len() * 2);
        for update in planned {
            let old_winner = state.players.rating_of(&update.winner, initial);
            let old_loser = state.players.rating_of(&opponent, initial);

            state
                .players
                .record_win(&update.winner, update.winner_rating, initial);
            state
                .players
                .record_loss(&opponent, update.loser_rating, initial);

            rating_deltas.push(RatingDelta {
                player_id: update.winner,
                delta: update.winner_rating - old_winner,
                new_rating: update.winner_rating,
            });
            rating_deltas.push(RatingDelta {
                player_id: opponent.clone(),
                delta: update.loser_rating - old_loser,
                new_rating: update.loser_rating,
            });
        }

        let mut completed = take_active(state, match_id)?;
        completed.status = MatchStatus::Completed;
        completed.winner = Some(winner);
        completed.resolved_at = Some(now);

        info!(
            "Match {} completed - winner: {}, rating changes: {:?}",
            match_id,
            winner,
            rating_deltas
                .iter()
                .map(|d| (d.player_id.as_str(), d.delta))
                .collect::<Vec<_>>()
        );

        state.history.push(completed);
        Ok(Resolution {
            match_id: match_id.to_string(),
            status: MatchStatus::Completed,
            winning_team: Some(winner),
            rating_deltas,
        })
    }
}

fn take_active(state: &mut ScopeState, match_id: &str) -> Result<Match> {
    state
        .active_matches
        .remove(match_id)
        .ok_or_else(|| RankedError::MatchNotFound {
            match_id: match_id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::{SwingConfig, SwingRatingCalculator};
    use crate::types::Mode;
    use crate::utils::current_timestamp;
    use std::collections::BTreeMap;

    fn resolver() -> ConsensusResolver {
        ConsensusResolver::new(Arc::new(
            SwingRatingCalculator::with_seed(SwingConfig::default(), 21).unwrap(),
        ))
    }

    fn state_with_match(mode: Mode, team1: &[&str], team2: &[&str]) -> ScopeState {
        let mut state = ScopeState::default();
        let m = Match {
            match_id: "MATCH001".to_string(),
            mode,
            name: "NAME".to_string(),
            password: "PASS".to_string(),
            team1: team1.iter().map(|s| s.to_string()).collect(),
            team2: team2.iter().map(|s| s.to_string()).collect(),
            created_at: current_timestamp(),
            status: MatchStatus::Active,
            reports: BTreeMap::new(),
            winner: None,
            resolved_at: None,
            expired: false,
        };
        state.active_matches.insert(m.match_id.clone(), m);
        state
    }

    #[test]
    fn test_unknown_match_and_outsider() {
        let resolver = resolver();
        let mut state = state_with_match(Mode::OneVsOne, &["a"], &["b"]);
        let now = current_timestamp();

        assert!(matches!(
            resolver.report(&mut state, "NOPE0000", "a", TeamSide::Team1, now),
            Err(RankedError::MatchNotFound { .. })
        ));
        assert!(matches!(
            resolver.report(&mut state, "MATCH001", "z", TeamSide::Team1, now),
            Err(RankedError::NotAParticipant { .. })
        ));
        assert!(state.active_matches["MATCH001"].reports.is_empty());
    }

    #[test]
    fn test_repeat_report_overwrites() {
        let resolver = resolver();
        let mut state = state_with_match(Mode::TwoVsTwo, &["a", "b"], &["c", "d"]);
        let now = current_timestamp();

        resolver
            .report(&mut state, "MATCH001", "a", TeamSide::Team1, now)
            .unwrap();
        let outcome = resolver
            .report(&mut state, "MATCH001", "a", TeamSide::Team2, now)
            .unwrap();

        assert_eq!(
            outcome,
            ReportOutcome::Pending {
                match_id: "MATCH001".to_string(),
                votes_team1: 0,
                votes_team2: 1,
                received: 1,
                required: 4,
            }
        );
        assert_eq!(state.active_matches["MATCH001"].reports.len(), 1);
    }

    #[test]
    fn test_tie_disputes_without_rating_change() {
        let resolver = resolver();
        let mut state = state_with_match(Mode::OneVsOne, &["a"], &["b"]);
        let now = current_timestamp();

        resolver
            .report(&mut state, "MATCH001", "a", TeamSide::Team1, now)
            .unwrap();
        let outcome = resolver
            .report(&mut state, "MATCH001", "b", TeamSide::Team2, now)
            .unwrap();

        match outcome {
            ReportOutcome::Resolved(resolution) => {
                assert_eq!(resolution.status, MatchStatus::Disputed);
                assert!(resolution.winning_team.is_none());
                assert!(resolution.rating_deltas.is_empty());
            }
            other => panic!("expected resolution, got {:?}", other),
        }
        assert!(state.active_matches.is_empty());
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].status, MatchStatus::Disputed);
        assert!(state.players.get("a").is_none());
        assert!(state.players.get("b").is_none());
    }

    #[test]
    fn test_single_opponent_pairing() {
        let resolver = resolver();
        let mut state = state_with_match(Mode::TwoVsTwo, &["a", "b"], &["c", "d"]);
        let now = current_timestamp();

        for player in ["a", "b", "c"] {
            resolver
                .report(&mut state, "MATCH001", player, TeamSide::Team1, now)
                .unwrap();
        }
        let outcome = resolver
            .report(&mut state, "MATCH001", "d", TeamSide::Team2, now)
            .unwrap();

        let resolution = match outcome {
            ReportOutcome::Resolved(resolution) => resolution,
            other => panic!("expected resolution, got {:?}", other),
        };
        assert_eq!(resolution.status, MatchStatus::Completed);
        assert_eq!(resolution.winning_team, Some(TeamSide::Team1));
        assert_eq!(resolution.rating_deltas.len(), 4);

        let a = state.players.get("a").unwrap();
        let b = state.players.get("b").unwrap();
        let c = state.players.get("c").unwrap();
        assert_eq!((a.wins, a.matches_played), (1, 1));
        assert_eq!((b.wins, b.matches_played), (1, 1));
        // First loser absorbs one loss per winner
        assert_eq!((c.losses, c.matches_played), (2, 2));
        assert_eq!(c.rating, 200 - (a.rating - 200) - (b.rating - 200));
        // Second loser untouched
        assert!(state.players.get("d").is_none());

        assert_eq!(state.history[0].winner, Some(TeamSide::Team1));
        assert!(state.history[0].resolved_at.is_some());
    }

    #[test]
    fn test_floored_delta_in_resolution() {
        let resolver = resolver();
        let mut state = state_with_match(Mode::OneVsOne, &["a"], &["b"]);
        state.players.record_loss("b", 5, 200);
        let now = current_timestamp();

        resolver
            .report(&mut state, "MATCH001", "a", TeamSide::Team1, now)
            .unwrap();
        let resolution = match resolver
            .report(&mut state, "MATCH001", "b", TeamSide::Team1, now)
            .unwrap()
        {
            ReportOutcome::Resolved(resolution) => resolution,
            other => panic!("expected resolution, got {:?}", other),
        };

        let winner = &resolution.rating_deltas[0];
        let loser = &resolution.rating_deltas[1];
        assert_eq!(winner.player_id, "a");
        assert!(winner.delta >= 15);
        assert_eq!(loser.player_id, "b");
        assert_eq!(loser.delta, -5);
        assert_eq!(loser.new_rating, 0);
    }
}
