//! Test fixtures and helpers shared by the integration tests
#![allow(dead_code)]

use ranked_arena::config::RankedSettings;
use ranked_arena::error::Result;
use ranked_arena::matchmaking::{MatchFactory, RandomTeamAssigner};
use ranked_arena::metrics::MetricsCollector;
use ranked_arena::rating::{RatingCalculator, RatingOutcome, SwingConfig};
use ranked_arena::storage::MockStateStore;
use ranked_arena::types::{
    JoinOutcome, Match, Mode, PlayerId, Rating, ReportOutcome, Resolution, TeamSide,
};
use ranked_arena::RankedEngine;
use std::sync::Arc;

/// Calculator with a fixed base swing, so rating changes are exact
#[derive(Debug, Clone)]
pub struct FixedSwingCalculator {
    base_delta: Rating,
    config: SwingConfig,
}

impl FixedSwingCalculator {
    pub fn new(base_delta: Rating) -> Self {
        Self {
            base_delta,
            config: SwingConfig::default(),
        }
    }
}

impl RatingCalculator for FixedSwingCalculator {
    fn compute_delta(&self, winner_rating: Rating, loser_rating: Rating) -> Result<RatingOutcome> {
        let delta = self
            .config
            .adjusted_delta(self.base_delta, winner_rating, loser_rating);
        Ok(self.config.apply(delta, winner_rating, loser_rating))
    }

    fn initial_rating(&self) -> Rating {
        200
    }
}

/// Engine with a fixed 20 point base swing over a mock store
pub fn create_test_engine() -> (RankedEngine, Arc<MockStateStore>) {
    create_test_engine_with(RankedSettings::default(), 20)
}

pub fn create_test_engine_with(
    settings: RankedSettings,
    base_delta: Rating,
) -> (RankedEngine, Arc<MockStateStore>) {
    let store = Arc::new(MockStateStore::new());
    let factory = Arc::new(MatchFactory::with_seed(
        Arc::new(RandomTeamAssigner::with_seed(7)),
        8,
    ));
    let engine = RankedEngine::with_components(
        store.clone(),
        settings,
        Arc::new(FixedSwingCalculator::new(base_delta)),
        factory,
        Arc::new(MetricsCollector::new().expect("Failed to create collector")),
    )
    .expect("test settings should be valid");
    (engine, store)
}

/// `count` player ids with a common prefix
pub fn players(prefix: &str, count: usize) -> Vec<PlayerId> {
    (1..=count).map(|i| format!("{}_{}", prefix, i)).collect()
}

/// Queue every player and return the match formed by the last one
pub async fn form_match(engine: &RankedEngine, scope: &str, mode: Mode, ids: &[PlayerId]) -> Match {
    assert_eq!(ids.len(), mode.required_players());

    let mut formed = None;
    for (i, id) in ids.iter().enumerate() {
        match engine.join_queue(scope, id, mode).await.unwrap() {
            JoinOutcome::Waiting { count, .. } => assert_eq!(count, i + 1),
            JoinOutcome::MatchFormed { formed: m } => formed = Some(m),
        }
    }
    formed.expect("last join should form a match")
}

/// Every participant reports `side`; returns the resolution
pub async fn report_all(
    engine: &RankedEngine,
    scope: &str,
    formed: &Match,
    side: TeamSide,
) -> Resolution {
    let participants: Vec<PlayerId> = formed.participants().cloned().collect();
    let last = participants.len() - 1;

    for (i, player) in participants.iter().enumerate() {
        let outcome = engine
            .report_outcome(scope, &formed.match_id, player, side)
            .await
            .unwrap();
        match outcome {
            ReportOutcome::Pending { received, .. } => {
                assert!(i < last);
                assert_eq!(received, i + 1);
            }
            ReportOutcome::Resolved(resolution) => {
                assert_eq!(i, last);
                return resolution;
            }
        }
    }
    panic!("match {} never resolved", formed.match_id)
}
