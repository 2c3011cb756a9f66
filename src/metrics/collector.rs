//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the ranked-arena engine using
//! Prometheus metrics. Every collector owns its own registry.

use crate::types::{MatchStatus, Mode};
use anyhow::Result;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the ranked engine
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Queue and match metrics
    match_metrics: MatchMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,

    /// Scopes currently loaded in memory
    pub loaded_scopes: IntGauge,
}

/// Queue and match metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Players admitted to a queue
    pub queue_joins_total: IntCounterVec,

    /// Players that left the queues
    pub queue_leaves_total: IntCounter,

    /// Matches formed
    pub matches_formed_total: IntCounterVec,

    /// Outcome reports accepted
    pub reports_total: IntCounter,

    /// Matches resolved by final status
    pub matches_resolved_total: IntCounterVec,

    /// Matches currently awaiting reports
    pub active_matches: IntGaugeVec,

    /// Queue entries and matches removed by the expiry sweep
    pub expired_total: IntCounterVec,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Engine operation durations
    pub operation_duration: HistogramVec,

    /// Rejected or failed operations by error kind
    pub operation_errors_total: IntCounterVec,

    /// Failed state store writes
    pub persistence_failures_total: IntCounter,
}

impl MetricsCollector {
    /// Create a new metrics collector with a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            match_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a player admitted to a queue
    pub fn record_queue_join(&self, mode: Mode) {
        self.match_metrics
            .queue_joins_total
            .with_label_values(&[mode.label()])
            .inc();
    }

    /// Record a player leaving the queues
    pub fn record_queue_leave(&self) {
        self.match_metrics.queue_leaves_total.inc();
    }

    /// Record a match being formed
    pub fn record_match_formed(&self, mode: Mode) {
        self.match_metrics
            .matches_formed_total
            .with_label_values(&[mode.label()])
            .inc();
        self.match_metrics
            .active_matches
            .with_label_values(&[mode.label()])
            .inc();
    }

    /// Record an accepted outcome report
    pub fn record_report(&self) {
        self.match_metrics.reports_total.inc();
    }

    /// Record a match leaving the active set
    pub fn record_match_resolved(&self, mode: Mode, status: MatchStatus) {
        self.match_metrics
            .matches_resolved_total
            .with_label_values(&[mode.label(), status.as_str()])
            .inc();
        self.match_metrics
            .active_matches
            .with_label_values(&[mode.label()])
            .dec();
    }

    /// Account for active matches found in a freshly loaded scope
    pub fn record_loaded_scope(&self, active_by_mode: &[(Mode, usize)]) {
        self.service_metrics.loaded_scopes.inc();
        for (mode, count) in active_by_mode {
            self.match_metrics
                .active_matches
                .with_label_values(&[mode.label()])
                .add(*count as i64);
        }
    }

    /// Record what an expiry sweep removed
    pub fn record_expired(&self, queue_entries: usize, matches: usize) {
        self.match_metrics
            .expired_total
            .with_label_values(&["queue_entry"])
            .inc_by(queue_entries as u64);
        self.match_metrics
            .expired_total
            .with_label_values(&["match"])
            .inc_by(matches as u64);
    }

    /// Record an engine operation's duration and outcome
    pub fn record_operation(&self, operation: &str, duration: Duration, error_kind: Option<&str>) {
        self.performance_metrics
            .operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());

        if let Some(kind) = error_kind {
            self.performance_metrics
                .operation_errors_total
                .with_label_values(&[operation, kind])
                .inc();
        }
    }

    /// Record a failed state store write
    pub fn record_persistence_failure(&self) {
        self.performance_metrics.persistence_failures_total.inc();
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Update uptime gauge
    pub fn update_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("ranked_arena_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "ranked_arena_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("ranked_arena_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        let loaded_scopes = IntGauge::new(
            "ranked_arena_loaded_scopes",
            "Scopes currently loaded in memory",
        )?;
        registry.register(Box::new(loaded_scopes.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
            loaded_scopes,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let queue_joins_total = IntCounterVec::new(
            Opts::new("ranked_arena_queue_joins_total", "Players admitted to a queue"),
            &["mode"],
        )?;
        registry.register(Box::new(queue_joins_total.clone()))?;

        let queue_leaves_total = IntCounter::new(
            "ranked_arena_queue_leaves_total",
            "Players that left the queues",
        )?;
        registry.register(Box::new(queue_leaves_total.clone()))?;

        let matches_formed_total = IntCounterVec::new(
            Opts::new("ranked_arena_matches_formed_total", "Matches formed"),
            &["mode"],
        )?;
        registry.register(Box::new(matches_formed_total.clone()))?;

        let reports_total = IntCounter::new(
            "ranked_arena_reports_total",
            "Outcome reports accepted",
        )?;
        registry.register(Box::new(reports_total.clone()))?;

        let matches_resolved_total = IntCounterVec::new(
            Opts::new(
                "ranked_arena_matches_resolved_total",
                "Matches resolved by final status",
            ),
            &["mode", "status"],
        )?;
        registry.register(Box::new(matches_resolved_total.clone()))?;

        let active_matches = IntGaugeVec::new(
            Opts::new(
                "ranked_arena_active_matches",
                "Matches currently awaiting reports",
            ),
            &["mode"],
        )?;
        registry.register(Box::new(active_matches.clone()))?;

        let expired_total = IntCounterVec::new(
            Opts::new(
                "ranked_arena_expired_total",
                "Queue entries and matches removed by the expiry sweep",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(expired_total.clone()))?;

        Ok(Self {
            queue_joins_total,
            queue_leaves_total,
            matches_formed_total,
            reports_total,
            matches_resolved_total,
            active_matches,
            expired_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "ranked_arena_operation_duration_seconds",
                "Engine operation duration in seconds",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let operation_errors_total = IntCounterVec::new(
            Opts::new(
                "ranked_arena_operation_errors_total",
                "Rejected or failed engine operations",
            ),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(operation_errors_total.clone()))?;

        let persistence_failures_total = IntCounter::new(
            "ranked_arena_persistence_failures_total",
            "Failed state store writes",
        )?;
        registry.register(Box::new(persistence_failures_total.clone()))?;

        Ok(Self {
            operation_duration,
            operation_errors_total,
            persistence_failures_total,
        })
    }
}
