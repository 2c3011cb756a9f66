//! Health check endpoints and monitoring
//!
//! This module provides health check functionality for the ranked-arena
//! service, including readiness and liveness checks.

use crate::service::app::ServiceContext;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Scopes currently held in memory
    pub loaded_scopes: usize,
    pub players_queued: u64,
    pub matches_formed: u64,
    pub matches_completed: u64,
    pub matches_disputed: u64,
    pub matches_expired: u64,
    pub persistence_failures: u64,
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(context: &ServiceContext) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        let service_check = Self::check_service_running(context).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        for component in [
            Self::check_engine(context),
            Self::check_state_store(context).await,
        ] {
            if component.status == HealthStatus::Unhealthy {
                overall_status = HealthStatus::Unhealthy;
            } else if component.status == HealthStatus::Degraded
                && overall_status == HealthStatus::Healthy
            {
                overall_status = HealthStatus::Degraded;
            }
            checks.push(component);
        }

        let stats = Self::gather_service_stats(context);

        Ok(HealthCheck {
            status: overall_status,
            service: context.config().service.name.clone(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(context: &ServiceContext) -> Result<HealthStatus> {
        if context.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - the service runs and its state store answers
    pub async fn readiness_check(context: &ServiceContext) -> Result<HealthStatus> {
        if !context.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        Ok(Self::check_state_store(context).await.status)
    }

    async fn check_service_running(context: &ServiceContext) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = if context.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Engine is degraded once any state store write has failed
    fn check_engine(context: &ServiceContext) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = match context.engine().stats() {
            Ok(stats) if stats.persistence_failures > 0 => (
                HealthStatus::Degraded,
                Some(format!(
                    "{} state writes failed since start-up",
                    stats.persistence_failures
                )),
            ),
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("Engine stats check failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("Stats check failed: {}", e)),
                )
            }
        };

        ComponentCheck {
            name: "engine".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn check_state_store(context: &ServiceContext) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = match context.engine().store().ping().await {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("State store ping failed: {:#}", e);
                (HealthStatus::Unhealthy, Some(format!("{:#}", e)))
            }
        };

        ComponentCheck {
            name: "state_store".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn gather_service_stats(context: &ServiceContext) -> ServiceStats {
        let uptime_seconds = context.uptime().as_secs();
        match context.engine().stats() {
            Ok(stats) => ServiceStats {
                loaded_scopes: stats.loaded_scopes,
                players_queued: stats.players_queued,
                matches_formed: stats.matches_formed,
                matches_completed: stats.matches_completed,
                matches_disputed: stats.matches_disputed,
                matches_expired: stats.matches_expired,
                persistence_failures: stats.persistence_failures,
                uptime_seconds,
            },
            Err(e) => {
                debug!("Failed to get engine stats for health check: {}", e);
                ServiceStats {
                    uptime_seconds,
                    ..ServiceStats::default()
                }
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, RankedSettings};
    use crate::engine::RankedEngine;
    use crate::storage::MockStateStore;
    use crate::types::Mode;
    use std::sync::Arc;

    fn context_with(store: Arc<MockStateStore>) -> ServiceContext {
        let engine = RankedEngine::with_seed(store, RankedSettings::default(), 3).unwrap();
        ServiceContext::new(AppConfig::default(), engine)
    }

    #[tokio::test]
    async fn test_stopped_service_is_unhealthy() {
        let context = context_with(Arc::new(MockStateStore::new()));

        let health = HealthCheck::check(&context).await.unwrap();
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(
            HealthCheck::liveness_check(&context).await.unwrap(),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_running_service_is_healthy() {
        let context = context_with(Arc::new(MockStateStore::new()));
        context.set_running(true).await;

        let health = HealthCheck::check(&context).await.unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.checks.len(), 3);
        assert_eq!(
            HealthCheck::readiness_check(&context).await.unwrap(),
            HealthStatus::Healthy
        );
        assert!(health.to_json().unwrap().contains("state_store"));
    }

    #[tokio::test]
    async fn test_failed_writes_degrade_engine() {
        let store = Arc::new(MockStateStore::new());
        let context = context_with(store.clone());
        context.set_running(true).await;

        store.set_fail_saves(true);
        let _ = context
            .engine()
            .join_queue("guild", "a", Mode::OneVsOne)
            .await;

        let health = HealthCheck::check(&context).await.unwrap();
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.stats.persistence_failures, 1);
        assert_eq!(health.stats.players_queued, 1);
    }
}
