//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the state store,
//! the ranked engine and the HTTP server together and owns the background
//! tasks.

use crate::config::{AppConfig, StorageBackend};
use crate::engine::RankedEngine;
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector, MetricsService};
use crate::storage::{InMemoryStateStore, JsonFileStateStore, RankedStateStore};
use crate::utils::current_timestamp;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Cheap handle to the running service shared with HTTP handlers and health checks
#[derive(Clone)]
pub struct ServiceContext {
    config: Arc<AppConfig>,
    engine: RankedEngine,
    is_running: Arc<RwLock<bool>>,
    started_at: Instant,
}

impl ServiceContext {
    pub fn new(config: AppConfig, engine: RankedEngine) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn engine(&self) -> &RankedEngine {
        &self.engine
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub async fn set_running(&self, running: bool) {
        *self.is_running.write().await = running;
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

/// Main application state containing all service components
pub struct AppState {
    /// Shared handle to config, engine and running flag
    context: ServiceContext,

    /// Metrics service for monitoring, health checks and the engine API
    metrics_service: Arc<MetricsService>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing ranked-arena service");
        info!(
            "Configuration: service={}, storage={:?}, data_dir={}",
            config.service.name,
            config.storage.backend,
            config.storage.data_dir.display()
        );

        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: format!("{:#}", e),
        })?;

        let store = Self::initialize_store(&config).await?;

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let engine = Self::initialize_engine(&config, store, metrics_collector.clone())?;
        let context = ServiceContext::new(config, engine);
        let metrics_service = Self::initialize_metrics(&context, metrics_collector);

        Ok(Self {
            context,
            metrics_service,
            background_tasks: Vec::new(),
        })
    }

    /// Start the HTTP server and background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting ranked-arena service");

        // Mark as running
        self.context.set_running(true).await;

        self.start_metrics_service().await?;
        self.start_background_tasks().await?;

        info!("✅ Ranked-arena service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of ranked-arena service");

        // Mark as not running
        self.context.set_running(false).await;

        // Stop the HTTP server before aborting its task
        info!("Stopping HTTP server...");
        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop HTTP server: {}", e);
        } else {
            info!("✅ HTTP server stopped");
        }

        self.stop_background_tasks().await;

        let final_stats =
            self.context
                .engine()
                .stats()
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final stats: {}", e),
                })?;

        info!("Final engine statistics: {:?}", final_stats);
        info!("✅ Ranked-arena service shutdown completed");

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        self.context.config()
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        self.context.is_running().await
    }

    pub fn context(&self) -> ServiceContext {
        self.context.clone()
    }

    /// Get the ranked engine for operations
    pub fn engine(&self) -> RankedEngine {
        self.context.engine().clone()
    }

    /// Get metrics service
    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    /// Build the configured state store and make sure it is usable
    async fn initialize_store(
        config: &AppConfig,
    ) -> Result<Arc<dyn RankedStateStore>, ServiceError> {
        let store: Arc<dyn RankedStateStore> = match config.storage.backend {
            StorageBackend::Memory => {
                warn!("Using in-memory state store - ranked state is lost on restart");
                Arc::new(InMemoryStateStore::new())
            }
            StorageBackend::Json => {
                info!(
                    "Using JSON state store in {}",
                    config.storage.data_dir.display()
                );
                Arc::new(JsonFileStateStore::new(config.storage.data_dir.clone()))
            }
        };

        store.ping().await.map_err(|e| ServiceError::Storage {
            message: format!("State store is not usable: {:#}", e),
        })?;

        Ok(store)
    }

    fn initialize_engine(
        config: &AppConfig,
        store: Arc<dyn RankedStateStore>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<RankedEngine, ServiceError> {
        use crate::matchmaking::{MatchFactory, RandomTeamAssigner};
        use crate::rating::{SwingConfig, SwingRatingCalculator};

        let calculator = Arc::new(
            SwingRatingCalculator::new(SwingConfig::from(&config.ranked)).map_err(|e| {
                ServiceError::Initialization {
                    message: format!("Failed to initialize rating calculator: {}", e),
                }
            })?,
        );
        let factory = Arc::new(MatchFactory::new(Arc::new(RandomTeamAssigner::new())));

        RankedEngine::with_components(
            store,
            config.ranked.clone(),
            calculator,
            factory,
            metrics_collector,
        )
        .map_err(|e| ServiceError::Initialization {
            message: format!("Failed to initialize ranked engine: {}", e),
        })
    }

    /// Initialize metrics service
    fn initialize_metrics(
        context: &ServiceContext,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Arc<MetricsService> {
        let config = context.config();
        info!(
            "Initializing HTTP server on {}:{}",
            config.service.host, config.service.http_port
        );

        let health_config = HealthServerConfig {
            port: config.service.http_port,
            host: config.service.host.clone(),
        };

        let health_server = Arc::new(
            HealthServer::new(health_config, metrics_collector.clone())
                .with_context(context.clone()),
        );
        Arc::new(MetricsService::new(metrics_collector, health_server))
    }

    /// Start the HTTP server
    async fn start_metrics_service(&mut self) -> Result<(), ServiceError> {
        info!("Starting engine API, metrics and health endpoints");

        let metrics_service = self.metrics_service.clone();
        let port = self.config().service.http_port;

        let server_handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("HTTP server failed: {}", e);
            } else {
                info!("HTTP server task completed");
            }
        });

        self.background_tasks.push(server_handle);

        // Give the server a moment to start up
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        info!("✅ HTTP server started on port {}", port);
        Ok(())
    }

    /// Start background maintenance tasks
    async fn start_background_tasks(&mut self) -> Result<(), ServiceError> {
        info!("Starting background maintenance tasks...");

        info!("Starting health metrics task (15s interval)...");
        let health_metrics_task = {
            let context = self.context.clone();
            let metrics_collector = self.metrics_service.collector();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(15));
                info!("Health metrics task started");

                while context.is_running().await {
                    interval.tick().await;

                    metrics_collector.update_uptime(context.uptime());

                    let store_healthy = match context.engine().store().ping().await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("State store ping failed: {:#}", e);
                            false
                        }
                    };
                    metrics_collector.update_component_health("state_store", store_healthy);
                    metrics_collector.update_component_health("engine", true);
                    // 2 = healthy, 1 = degraded
                    metrics_collector.update_health_status(if store_healthy { 2 } else { 1 });

                    debug!(
                        "Updated service health metrics - uptime: {}s",
                        context.uptime().as_secs()
                    );
                }

                info!("Health metrics task stopped");
            })
        };
        self.background_tasks.push(health_metrics_task);

        let ranked = &self.config().ranked;
        if ranked.enable_expiry_sweep {
            let sweep_interval = ranked.sweep_interval();
            info!(
                "Starting expiry sweep task ({}s interval, queue timeout {}s, match timeout {}s)...",
                sweep_interval.as_secs(),
                ranked.queue_timeout_seconds,
                ranked.match_timeout_seconds
            );

            let context = self.context.clone();
            let sweep_task = tokio::spawn(async move {
                let mut interval = tokio::time::interval(sweep_interval);
                info!("Expiry sweep task started");

                while context.is_running().await {
                    interval.tick().await;

                    let report = context.engine().sweep_all(current_timestamp()).await;
                    if report.is_empty() {
                        debug!("Expiry sweep completed - nothing stale");
                    } else {
                        info!(
                            "Expiry sweep removed {} queue entries, closed matches {:?}",
                            report.expired_queue_entries.len(),
                            report.expired_matches
                        );
                    }
                }

                info!("Expiry sweep task stopped");
            });
            self.background_tasks.push(sweep_task);
        } else {
            info!("Expiry sweep disabled - queue and match timeouts are not enforced");
        }

        info!(
            "{} background tasks running",
            self.background_tasks.len()
        );
        Ok(())
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        for (i, task) in self.background_tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        info!("✅ All {} background tasks stopped", task_count);
    }
}
