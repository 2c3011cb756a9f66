//! Match formation
//!
//! [`MatchFactory`] turns a drained queue cohort into an active match: it
//! splits the cohort into two teams through a [`TeamAssigner`], draws the
//! match id and private-session credentials, and registers the match in the
//! scope's active set.

use crate::error::{RankedError, Result};
use crate::types::{Match, MatchStatus, Mode, PlayerId, ScopeState};
use crate::utils::{generate_credential, generate_match_id};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Strategy for splitting a cohort into two teams
pub trait TeamAssigner: Send + Sync {
    /// Split `players` (length = mode's required count) into (team1, team2)
    fn assign(&self, mode: Mode, players: Vec<PlayerId>) -> Result<(Vec<PlayerId>, Vec<PlayerId>)>;
}

/// Uniform random team split.
///
/// 1v1 keeps queue order (first joiner is team 1). Larger modes shuffle the
/// cohort and cut it at the midpoint; ratings are not considered.
#[derive(Debug)]
pub struct RandomTeamAssigner {
    rng: Mutex<StdRng>,
}

impl RandomTeamAssigner {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomTeamAssigner {
    fn default() -> Self {
        Self::new()
    }
}

impl TeamAssigner for RandomTeamAssigner {
    fn assign(
        &self,
        mode: Mode,
        mut players: Vec<PlayerId>,
    ) -> Result<(Vec<PlayerId>, Vec<PlayerId>)> {
        if players.len() != mode.required_players() {
            return Err(RankedError::Internal {
                message: format!(
                    "{} needs {} players, got {}",
                    mode,
                    mode.required_players(),
                    players.len()
                ),
            });
        }

        if mode != Mode::OneVsOne {
            let mut rng = self.rng.lock().map_err(|_| RankedError::Internal {
                message: "Failed to acquire team assigner rng lock".to_string(),
            })?;
            players.shuffle(&mut *rng);
        }

        let team2 = players.split_off(players.len() / 2);
        Ok((players, team2))
    }
}

/// Creates matches and registers them as active
pub struct MatchFactory {
    assigner: Arc<dyn TeamAssigner>,
    rng: Mutex<StdRng>,
}

impl MatchFactory {
    pub fn new(assigner: Arc<dyn TeamAssigner>) -> Self {
        Self {
            assigner,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Factory whose match ids and credentials are reproducible
    pub fn with_seed(assigner: Arc<dyn TeamAssigner>, seed: u64) -> Self {
        Self {
            assigner,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Form a match from `players` and store it in the scope's active set.
    ///
    /// Match ids are not checked against existing ones; with 36^8 possible
    /// ids a collision is negligible.
    pub fn create(
        &self,
        state: &mut ScopeState,
        mode: Mode,
        players: Vec<PlayerId>,
        now: DateTime<Utc>,
    ) -> Result<Match> {
        let (team1, team2) = self.assigner.assign(mode, players)?;

        let (match_id, name, password) = {
            let mut rng = self.rng.lock().map_err(|_| RankedError::Internal {
                message: "Failed to acquire match factory rng lock".to_string(),
            })?;
            (
                generate_match_id(&mut *rng),
                generate_credential(&mut *rng),
                generate_credential(&mut *rng),
            )
        };

        let formed = Match {
            match_id: match_id.clone(),
            mode,
            name,
            password,
            team1,
            team2,
            created_at: now,
            status: MatchStatus::Active,
            reports: BTreeMap::new(),
            winner: None,
            resolved_at: None,
            expired: false,
        };

        info!(
            "Created {} match {} - team1: {:?}, team2: {:?}",
            mode, match_id, formed.team1, formed.team2
        );

        state.active_matches.insert(match_id, formed.clone());
        Ok(formed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::current_timestamp;
    use std::collections::HashSet;

    fn ids(n: usize) -> Vec<PlayerId> {
        (0..n).map(|i| format!("p{}", i)).collect()
    }

    #[test]
    fn test_one_vs_one_keeps_queue_order() {
        let assigner = RandomTeamAssigner::with_seed(5);
        for _ in 0..20 {
            let (team1, team2) = assigner.assign(Mode::OneVsOne, ids(2)).unwrap();
            assert_eq!(team1, vec!["p0"]);
            assert_eq!(team2, vec!["p1"]);
        }
    }

    #[test]
    fn test_split_is_disjoint_and_complete() {
        let assigner = RandomTeamAssigner::with_seed(9);
        for mode in [Mode::TwoVsTwo, Mode::ThreeVsThree] {
            let (team1, team2) = assigner.assign(mode, ids(mode.required_players())).unwrap();
            assert_eq!(team1.len(), mode.team_size());
            assert_eq!(team2.len(), mode.team_size());

            let all: HashSet<_> = team1.iter().chain(team2.iter()).collect();
            assert_eq!(all.len(), mode.required_players());
        }
    }

    #[test]
    fn test_wrong_cohort_size_rejected() {
        let assigner = RandomTeamAssigner::with_seed(1);
        assert!(assigner.assign(Mode::TwoVsTwo, ids(3)).is_err());
    }

    #[test]
    fn test_create_registers_active_match() {
        let factory = MatchFactory::with_seed(Arc::new(RandomTeamAssigner::with_seed(2)), 3);
        let mut state = ScopeState::default();

        let formed = factory
            .create(&mut state, Mode::TwoVsTwo, ids(4), current_timestamp())
            .unwrap();

        assert_eq!(formed.status, MatchStatus::Active);
        assert_eq!(formed.match_id.len(), 8);
        assert_eq!(formed.name.len(), 4);
        assert_eq!(formed.password.len(), 4);
        assert!(formed.reports.is_empty());
        assert_eq!(state.active_matches.get(&formed.match_id), Some(&formed));
    }
}
