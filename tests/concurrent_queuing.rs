//! High concurrency tests for queue admission and outcome reporting
//!
//! Many tasks hit the same scope at once; every operation on a scope must
//! behave as if it ran alone.

mod fixtures;

use async_trait::async_trait;
use futures::future::join_all;
use ranked_arena::config::RankedSettings;
use ranked_arena::types::{JoinOutcome, Mode, ReportOutcome, ScopeId, ScopeState, TeamSide};
use ranked_arena::{InMemoryStateStore, RankedEngine, RankedError, RankedStateStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

use fixtures::{create_test_engine, form_match, players};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_100_concurrent_joins_form_exact_matches() {
    let (engine, _store) = create_test_engine();
    let ids = players("load", 100);

    let start_time = Instant::now();
    let tasks: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.join_queue("arena", &id, Mode::TwoVsTwo).await })
        })
        .collect();

    let results = join_all(tasks).await;
    let elapsed = start_time.elapsed();

    let mut matches = Vec::new();
    for result in results {
        match result.unwrap().unwrap() {
            JoinOutcome::MatchFormed { formed } => matches.push(formed),
            JoinOutcome::Waiting { count, .. } => assert!((1..=3).contains(&count)),
        }
    }

    assert_eq!(matches.len(), 25);
    let mut seen = HashSet::new();
    for formed in &matches {
        for player in formed.participants() {
            assert!(seen.insert(player.clone()), "{} placed twice", player);
        }
    }
    assert_eq!(seen.len(), 100);

    let match_ids: HashSet<_> = matches.iter().map(|m| m.match_id.clone()).collect();
    assert_eq!(match_ids.len(), 25);

    let status = engine.queue_status("arena").await.unwrap();
    assert_eq!(status.queues[1].count, 0);
    assert_eq!(status.active_matches, 25);

    println!("100 concurrent joins processed in {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_concurrent_joins_admit_once() {
    let (engine, _store) = create_test_engine();

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.join_queue("arena", "spammer", Mode::ThreeVsThree).await })
        })
        .collect();

    let mut admitted = 0;
    for result in join_all(tasks).await {
        match result.unwrap() {
            Ok(_) => admitted += 1,
            Err(RankedError::AlreadyQueued { mode, .. }) => {
                assert_eq!(mode, Mode::ThreeVsThree)
            }
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(admitted, 1);
    let status = engine.queue_status("arena").await.unwrap();
    assert_eq!(status.queues[2].count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reports_resolve_once() {
    let (engine, _store) = create_test_engine();
    let formed = form_match(&engine, "arena", Mode::ThreeVsThree, &players("rep", 6)).await;

    let tasks: Vec<_> = formed
        .participants()
        .cloned()
        .map(|player| {
            let engine = engine.clone();
            let match_id = formed.match_id.clone();
            tokio::spawn(async move {
                engine
                    .report_outcome("arena", &match_id, &player, TeamSide::Team1)
                    .await
            })
        })
        .collect();

    let mut resolutions = Vec::new();
    for result in join_all(tasks).await {
        if let ReportOutcome::Resolved(resolution) = result.unwrap().unwrap() {
            resolutions.push(resolution);
        }
    }

    assert_eq!(resolutions.len(), 1);
    // Three winners paired against a single opponent
    assert_eq!(resolutions[0].rating_deltas.len(), 6);

    let stats = engine.stats().unwrap();
    assert_eq!(stats.matches_completed, 1);
    assert_eq!(stats.reports_received, 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scopes_progress_independently() {
    let (engine, _store) = create_test_engine();

    let tasks: Vec<_> = (0..8)
        .flat_map(|scope| {
            let engine = engine.clone();
            players(&format!("s{}", scope), 2).into_iter().map(move |id| {
                let engine = engine.clone();
                let scope_id = format!("scope_{}", scope);
                tokio::spawn(async move { engine.join_queue(&scope_id, &id, Mode::OneVsOne).await })
            })
        })
        .collect();

    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    assert_eq!(engine.loaded_scopes().await.len(), 8);
    for scope in 0..8 {
        let status = engine
            .queue_status(&format!("scope_{}", scope))
            .await
            .unwrap();
        assert_eq!(status.active_matches, 1);
        assert_eq!(status.queues[0].count, 0);
    }
}

/// Store whose loads of one scope block until released
struct GatedStore {
    inner: InMemoryStateStore,
    gated_scope: &'static str,
    gate: Arc<Notify>,
}

#[async_trait]
impl RankedStateStore for GatedStore {
    async fn load_scope_state(&self, scope: &ScopeId) -> anyhow::Result<Option<ScopeState>> {
        if scope == self.gated_scope {
            self.gate.notified().await;
        }
        self.inner.load_scope_state(scope).await
    }

    async fn save_scope_state(&self, scope: &ScopeId, state: &ScopeState) -> anyhow::Result<()> {
        self.inner.save_scope_state(scope, state).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_scope_load_does_not_block_other_scopes() {
    let gate = Arc::new(Notify::new());
    let store = Arc::new(GatedStore {
        inner: InMemoryStateStore::new(),
        gated_scope: "slow",
        gate: gate.clone(),
    });
    let engine = RankedEngine::with_seed(store, RankedSettings::default(), 21).unwrap();

    engine.join_queue("fast", "a", Mode::TwoVsTwo).await.unwrap();

    let slow_engine = engine.clone();
    let slow = tokio::spawn(async move {
        slow_engine
            .join_queue("slow", "s", Mode::OneVsOne)
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!slow.is_finished());

    // Both a loaded scope and a brand new one proceed while "slow" loads
    let fast = tokio::time::timeout(
        Duration::from_secs(1),
        engine.join_queue("fast", "b", Mode::TwoVsTwo),
    )
    .await
    .expect("loaded scope blocked by another scope's load")
    .unwrap();
    assert!(matches!(fast, JoinOutcome::Waiting { count: 2, .. }));

    tokio::time::timeout(
        Duration::from_secs(1),
        engine.join_queue("other", "c", Mode::OneVsOne),
    )
    .await
    .expect("new scope blocked by another scope's load")
    .unwrap();
    assert_eq!(
        engine.loaded_scopes().await,
        vec!["fast".to_string(), "other".to_string()]
    );

    gate.notify_one();
    let outcome = slow.await.unwrap().unwrap();
    assert!(matches!(outcome, JoinOutcome::Waiting { count: 1, .. }));
    assert_eq!(engine.loaded_scopes().await.len(), 3);
}
