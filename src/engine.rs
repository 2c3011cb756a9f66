//! Ranked engine
//!
//! [`RankedEngine`] is the entry point for every ranked operation. It owns
//! one async mutex per scope, loads a scope from the [`RankedStateStore`] the
//! first time it is referenced and writes the whole scope state back before
//! returning from any operation that changed it.
//!
//! Holding the scope mutex across check, mutation and save serialises queue
//! admission and report resolution within a scope. Different scopes never
//! contend on each other's mutex, and loading one scope never blocks
//! operations on another.

use crate::config::RankedSettings;
use crate::error::{RankedError, Result};
use crate::matchmaking::{
    ConsensusResolver, ExpiryPolicy, MatchFactory, QueueManager, RandomTeamAssigner,
};
use crate::metrics::collector::MetricsTimer;
use crate::metrics::MetricsCollector;
use crate::rating::{Leaderboard, RatingCalculator, SwingConfig, SwingRatingCalculator};
use crate::storage::RankedStateStore;
use crate::types::{
    JoinOutcome, LeaderboardEntry, LeaveOutcome, Match, MatchStatus, Mode, PlayerRecord,
    QueueStatus, ReportOutcome, ScopeId, ScopeState, SweepReport, TeamSide,
};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, error, info, warn};

/// Counters describing what the engine has done since start-up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Players admitted to a queue
    pub players_queued: u64,
    /// Players removed from the queues on request
    pub players_left: u64,
    /// Matches formed from a full queue
    pub matches_formed: u64,
    /// Outcome reports accepted
    pub reports_received: u64,
    /// Matches resolved by majority vote
    pub matches_completed: u64,
    /// Matches closed by a tied vote
    pub matches_disputed: u64,
    /// Matches closed by the expiry sweep
    pub matches_expired: u64,
    /// Queue entries removed by the expiry sweep
    pub queue_entries_expired: u64,
    /// Failed state store writes
    pub persistence_failures: u64,
    /// Scopes currently held in memory
    pub loaded_scopes: usize,
}

type ScopeSlot = Arc<Mutex<ScopeState>>;
type ScopeCell = Arc<OnceCell<ScopeSlot>>;

/// The ranked matchmaking and rating engine
#[derive(Clone)]
pub struct RankedEngine {
    /// Loaded scopes by id
    scopes: Arc<RwLock<HashMap<ScopeId, ScopeCell>>>,
    /// Persistence gateway
    store: Arc<dyn RankedStateStore>,
    queue_manager: Arc<QueueManager>,
    resolver: Arc<ConsensusResolver>,
    expiry: ExpiryPolicy,
    settings: RankedSettings,
    stats: Arc<std::sync::RwLock<EngineStats>>,
    metrics_collector: Arc<MetricsCollector>,
}

impl RankedEngine {
    /// Create an engine with entropy-seeded randomness and its own metrics
    pub fn new(store: Arc<dyn RankedStateStore>, settings: RankedSettings) -> Result<Self> {
        let calculator = Arc::new(SwingRatingCalculator::new(SwingConfig::from(&settings))?);
        let factory = Arc::new(MatchFactory::new(Arc::new(RandomTeamAssigner::new())));
        Self::with_components(
            store,
            settings,
            calculator,
            factory,
            Arc::new(new_metrics_collector()?),
        )
    }

    /// Create an engine whose team splits, ids and rating swings are reproducible
    pub fn with_seed(
        store: Arc<dyn RankedStateStore>,
        settings: RankedSettings,
        seed: u64,
    ) -> Result<Self> {
        let calculator = Arc::new(SwingRatingCalculator::with_seed(
            SwingConfig::from(&settings),
            seed,
        )?);
        let assigner = Arc::new(RandomTeamAssigner::with_seed(seed.wrapping_add(1)));
        let factory = Arc::new(MatchFactory::with_seed(assigner, seed.wrapping_add(2)));
        Self::with_components(
            store,
            settings,
            calculator,
            factory,
            Arc::new(new_metrics_collector()?),
        )
    }

    /// Create an engine from explicit components
    pub fn with_components(
        store: Arc<dyn RankedStateStore>,
        settings: RankedSettings,
        calculator: Arc<dyn RatingCalculator>,
        factory: Arc<MatchFactory>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<Self> {
        let expiry = ExpiryPolicy::try_from(&settings)?;
        Ok(Self {
            scopes: Arc::new(RwLock::new(HashMap::new())),
            store,
            queue_manager: Arc::new(QueueManager::new(factory, settings.default_rating)),
            resolver: Arc::new(ConsensusResolver::new(calculator)),
            expiry,
            settings,
            stats: Arc::new(std::sync::RwLock::new(EngineStats::default())),
            metrics_collector,
        })
    }

    /// Admit a player to a mode's queue; forms a match once the queue is full
    pub async fn join_queue(&self, scope: &str, player_id: &str, mode: Mode) -> Result<JoinOutcome> {
        let timer = self.metrics_collector.start_timer();
        let result = self.join_queue_inner(scope, player_id, mode).await;
        self.finish("join_queue", timer, result)
    }

    /// [`join_queue`](Self::join_queue) with a caller-typed mode token such as `"2s"`
    pub async fn join_queue_token(
        &self,
        scope: &str,
        player_id: &str,
        mode_token: &str,
    ) -> Result<JoinOutcome> {
        match mode_token.parse::<Mode>() {
            Ok(mode) => self.join_queue(scope, player_id, mode).await,
            Err(e) => self.finish("join_queue", self.metrics_collector.start_timer(), Err(e)),
        }
    }

    async fn join_queue_inner(
        &self,
        scope: &str,
        player_id: &str,
        mode: Mode,
    ) -> Result<JoinOutcome> {
        let slot = self.scope_slot(scope).await?;
        let mut state = slot.lock().await;

        let outcome = self
            .queue_manager
            .join(&mut state, player_id, mode, current_timestamp())?;

        self.metrics_collector.record_queue_join(mode);
        let formed = matches!(outcome, JoinOutcome::MatchFormed { .. });
        self.update_stats(|stats| {
            stats.players_queued += 1;
            if formed {
                stats.matches_formed += 1;
            }
        });

        match &outcome {
            JoinOutcome::Waiting {
                count, required, ..
            } => {
                info!(
                    "Player '{}' joined {} queue in scope {} ({}/{})",
                    player_id, mode, scope, count, required
                );
            }
            JoinOutcome::MatchFormed { formed } => {
                self.metrics_collector.record_match_formed(mode);
                info!(
                    "Player '{}' completed {} queue in scope {}, match {} formed",
                    player_id, mode, scope, formed.match_id
                );
            }
        }

        self.persist(scope, &state).await?;
        Ok(outcome)
    }

    /// Remove a player from every queue of a scope
    pub async fn leave_queue(&self, scope: &str, player_id: &str) -> Result<LeaveOutcome> {
        let timer = self.metrics_collector.start_timer();
        let result = self.leave_queue_inner(scope, player_id).await;
        self.finish("leave_queue", timer, result)
    }

    async fn leave_queue_inner(&self, scope: &str, player_id: &str) -> Result<LeaveOutcome> {
        let slot = self.scope_slot(scope).await?;
        let mut state = slot.lock().await;

        let outcome = self.queue_manager.leave(&mut state, player_id)?;

        self.metrics_collector.record_queue_leave();
        self.update_stats(|stats| stats.players_left += 1);
        info!(
            "Player '{}' left {:?} in scope {}",
            player_id, outcome.modes_left, scope
        );

        self.persist(scope, &state).await?;
        Ok(outcome)
    }

    /// Record a participant's claimed winner for an active match
    pub async fn report_outcome(
        &self,
        scope: &str,
        match_id: &str,
        player_id: &str,
        claimed_winner: TeamSide,
    ) -> Result<ReportOutcome> {
        let timer = self.metrics_collector.start_timer();
        let result = self
            .report_outcome_inner(scope, match_id, player_id, claimed_winner)
            .await;
        self.finish("report_outcome", timer, result)
    }

    /// [`report_outcome`](Self::report_outcome) with a vote token such as `"team1"`
    pub async fn report_outcome_token(
        &self,
        scope: &str,
        match_id: &str,
        player_id: &str,
        vote_token: &str,
    ) -> Result<ReportOutcome> {
        match vote_token.parse::<TeamSide>() {
            Ok(side) => self.report_outcome(scope, match_id, player_id, side).await,
            Err(e) => self.finish("report_outcome", self.metrics_collector.start_timer(), Err(e)),
        }
    }

    async fn report_outcome_inner(
        &self,
        scope: &str,
        match_id: &str,
        player_id: &str,
        claimed_winner: TeamSide,
    ) -> Result<ReportOutcome> {
        let slot = self.scope_slot(scope).await?;
        let mut state = slot.lock().await;

        let mode = state.active_matches.get(match_id).map(|m| m.mode);
        let outcome = self.resolver.report(
            &mut state,
            match_id,
            player_id,
            claimed_winner,
            current_timestamp(),
        )?;

        self.metrics_collector.record_report();
        self.update_stats(|stats| stats.reports_received += 1);

        if let ReportOutcome::Resolved(resolution) = &outcome {
            if let Some(mode) = mode {
                self.metrics_collector
                    .record_match_resolved(mode, resolution.status);
            }
            self.update_stats(|stats| match resolution.status {
                MatchStatus::Completed => stats.matches_completed += 1,
                MatchStatus::Disputed => stats.matches_disputed += 1,
                MatchStatus::Active => {}
            });
            info!(
                "Match {} in scope {} resolved as {}",
                match_id,
                scope,
                resolution.status.as_str()
            );
        }

        self.persist(scope, &state).await?;
        Ok(outcome)
    }

    /// Queue depth per mode and the number of active matches
    pub async fn queue_status(&self, scope: &str) -> Result<QueueStatus> {
        let slot = self.scope_slot(scope).await?;
        let state = slot.lock().await;
        Ok(QueueManager::status(&state))
    }

    /// Top players of a scope; `None` uses the configured default limit
    pub async fn leaderboard(
        &self,
        scope: &str,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let limit = limit.unwrap_or(self.settings.leaderboard_default_limit);
        let slot = self.scope_slot(scope).await?;
        let state = slot.lock().await;
        Ok(Leaderboard::top(&state.players, limit))
    }

    /// Look up a match, active or resolved
    pub async fn get_match(&self, scope: &str, match_id: &str) -> Result<Match> {
        let slot = self.scope_slot(scope).await?;
        let state = slot.lock().await;
        state
            .find_match(match_id)
            .cloned()
            .ok_or_else(|| RankedError::MatchNotFound {
                match_id: match_id.to_string(),
            })
    }

    /// A player's record; `None` if the player never joined a queue in this scope
    pub async fn get_player(&self, scope: &str, player_id: &str) -> Result<Option<PlayerRecord>> {
        let slot = self.scope_slot(scope).await?;
        let state = slot.lock().await;
        Ok(state.players.get(player_id).cloned())
    }

    /// Drop stale queue entries and close unreported matches of one scope
    pub async fn sweep_expired(&self, scope: &str, now: DateTime<Utc>) -> Result<SweepReport> {
        let timer = self.metrics_collector.start_timer();
        let result = self.sweep_expired_inner(scope, now).await;
        self.finish("sweep_expired", timer, result)
    }

    async fn sweep_expired_inner(&self, scope: &str, now: DateTime<Utc>) -> Result<SweepReport> {
        let slot = self.scope_slot(scope).await?;
        let mut state = slot.lock().await;

        let modes: HashMap<_, _> = state
            .active_matches
            .values()
            .map(|m| (m.match_id.clone(), m.mode))
            .collect();
        let report = self.expiry.sweep(&mut state, now);
        if report.is_empty() {
            return Ok(report);
        }

        for match_id in &report.expired_matches {
            if let Some(mode) = modes.get(match_id) {
                self.metrics_collector
                    .record_match_resolved(*mode, MatchStatus::Disputed);
            }
        }
        self.metrics_collector.record_expired(
            report.expired_queue_entries.len(),
            report.expired_matches.len(),
        );
        self.update_stats(|stats| {
            stats.queue_entries_expired += report.expired_queue_entries.len() as u64;
            stats.matches_expired += report.expired_matches.len() as u64;
        });

        self.persist(scope, &state).await?;
        Ok(report)
    }

    /// Sweep every loaded scope. A failing scope is logged and skipped.
    pub async fn sweep_all(&self, now: DateTime<Utc>) -> SweepReport {
        let mut total = SweepReport::default();
        for scope in self.loaded_scopes().await {
            match self.sweep_expired(&scope, now).await {
                Ok(report) => {
                    total
                        .expired_queue_entries
                        .extend(report.expired_queue_entries);
                    total.expired_matches.extend(report.expired_matches);
                }
                Err(e) => warn!("Expiry sweep of scope {} failed: {}", scope, e),
            }
        }
        total
    }

    /// Ids of the scopes currently held in memory
    pub async fn loaded_scopes(&self) -> Vec<ScopeId> {
        let mut scopes: Vec<_> = self
            .scopes
            .read()
            .await
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(scope, _)| scope.clone())
            .collect();
        scopes.sort();
        scopes
    }

    /// Snapshot of the engine counters
    pub fn stats(&self) -> Result<EngineStats> {
        let stats = self.stats.read().map_err(|_| RankedError::Internal {
            message: "Failed to acquire stats read lock".to_string(),
        })?;
        Ok(stats.clone())
    }

    pub fn settings(&self) -> &RankedSettings {
        &self.settings
    }

    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    pub fn store(&self) -> Arc<dyn RankedStateStore> {
        self.store.clone()
    }

    /// Get a scope's slot, loading it from the store on first reference.
    ///
    /// The map lock only guards creating the scope's cell. The load itself
    /// runs under the cell, so a slow store read delays that scope alone.
    /// A failed load leaves the cell empty and the next call retries.
    async fn scope_slot(&self, scope: &str) -> Result<ScopeSlot> {
        let existing = self.scopes.read().await.get(scope).cloned();
        let cell = match existing {
            Some(cell) => cell,
            None => self
                .scopes
                .write()
                .await
                .entry(scope.to_string())
                .or_default()
                .clone(),
        };

        if let Some(slot) = cell.get() {
            return Ok(slot.clone());
        }

        let slot = cell
            .get_or_try_init(|| self.load_scope(scope))
            .await?
            .clone();
        Ok(slot)
    }

    async fn load_scope(&self, scope: &str) -> Result<ScopeSlot> {
        let scope_id = scope.to_string();
        let state = match self.store.load_scope_state(&scope_id).await {
            Ok(Some(state)) => {
                debug!(
                    "Loaded scope {} ({} players, {} active matches)",
                    scope,
                    state.players.len(),
                    state.active_matches.len()
                );
                state
            }
            Ok(None) => {
                debug!("Scope {} has no stored state, starting fresh", scope);
                ScopeState::default()
            }
            Err(e) => {
                error!("Failed to load scope {}: {:#}", scope, e);
                return Err(RankedError::Persistence {
                    scope: scope_id,
                    message: format!("{:#}", e),
                });
            }
        };

        let active_by_mode: Vec<(Mode, usize)> = Mode::ALL
            .iter()
            .map(|mode| {
                let count = state
                    .active_matches
                    .values()
                    .filter(|m| m.mode == *mode)
                    .count();
                (*mode, count)
            })
            .collect();
        self.metrics_collector.record_loaded_scope(&active_by_mode);
        self.update_stats(|stats| stats.loaded_scopes += 1);

        Ok(Arc::new(Mutex::new(state)))
    }

    /// Write a scope's whole state through to the store
    async fn persist(&self, scope: &str, state: &ScopeState) -> Result<()> {
        match self.store.save_scope_state(&scope.to_string(), state).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Failed to save scope {}: {:#}", scope, e);
                self.metrics_collector.record_persistence_failure();
                self.update_stats(|stats| stats.persistence_failures += 1);
                Err(RankedError::Persistence {
                    scope: scope.to_string(),
                    message: format!("{:#}", e),
                })
            }
        }
    }

    fn update_stats(&self, update: impl FnOnce(&mut EngineStats)) {
        match self.stats.write() {
            Ok(mut stats) => update(&mut stats),
            Err(_) => warn!("Failed to acquire stats write lock"),
        }
    }

    fn finish<T>(&self, operation: &str, timer: MetricsTimer, result: Result<T>) -> Result<T> {
        let kind = result.as_ref().err().map(|e| e.kind());
        if let Err(e) = &result {
            if e.is_caller_error() {
                debug!("{} rejected: {}", operation, e);
            } else {
                warn!("{} failed: {}", operation, e);
            }
        }
        self.metrics_collector
            .record_operation(operation, timer.stop(), kind);
        result
    }
}

fn new_metrics_collector() -> Result<MetricsCollector> {
    MetricsCollector::new().map_err(|e| RankedError::Internal {
        message: format!("Failed to create metrics collector: {}", e),
    })
}
