//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! ranked-arena service, including environment variable loading, TOML file
//! loading and validation.

use crate::config::ranked::{RankedSettings, MAX_TIMEOUT_SECONDS};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub ranked: RankedSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host the HTTP server binds to
    pub host: String,
    /// Port for the engine API, health and metrics endpoints
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Where scope state is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Json,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "json" => Ok(StorageBackend::Json),
            _ => Err(anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

/// State store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Directory holding one JSON document per scope
    pub data_dir: PathBuf,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "ranked-arena".to_string(),
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            data_dir: PathBuf::from("data/ranked"),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid {} value: {}", key, value)),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still override it
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Some(name) = parse_env("SERVICE_NAME")? {
            self.service.name = name;
        }
        if let Some(log_level) = parse_env("LOG_LEVEL")? {
            self.service.log_level = log_level;
        }
        if let Some(host) = parse_env("HTTP_HOST")? {
            self.service.host = host;
        }
        if let Some(port) = parse_env("HTTP_PORT")? {
            self.service.http_port = port;
        }
        if let Some(timeout) = parse_env("SHUTDOWN_TIMEOUT_SECONDS")? {
            self.service.shutdown_timeout_seconds = timeout;
        }

        // Storage settings
        if let Some(backend) = parse_env("STORAGE_BACKEND")? {
            self.storage.backend = backend;
        }
        if let Some(dir) = parse_env::<String>("DATA_DIR")? {
            self.storage.data_dir = PathBuf::from(dir);
        }

        // Ranked settings
        if let Some(rating) = parse_env("DEFAULT_RATING")? {
            self.ranked.default_rating = rating;
        }
        if let Some(timeout) = parse_env("QUEUE_TIMEOUT_SECONDS")? {
            self.ranked.queue_timeout_seconds = timeout;
        }
        if let Some(timeout) = parse_env("MATCH_TIMEOUT_SECONDS")? {
            self.ranked.match_timeout_seconds = timeout;
        }
        if let Some(enabled) = parse_env("ENABLE_EXPIRY_SWEEP")? {
            self.ranked.enable_expiry_sweep = enabled;
        }
        if let Some(interval) = parse_env("SWEEP_INTERVAL_SECONDS")? {
            self.ranked.sweep_interval_seconds = interval;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    if config.storage.backend == StorageBackend::Json
        && config.storage.data_dir.as_os_str().is_empty()
    {
        return Err(anyhow!("Data directory cannot be empty for the json backend"));
    }

    let ranked = &config.ranked;
    if ranked.default_rating < 0 {
        return Err(anyhow!("Default rating cannot be negative"));
    }
    if ranked.base_delta_min <= 0 || ranked.base_delta_min > ranked.base_delta_max {
        return Err(anyhow!(
            "Invalid base delta range: {}..={}",
            ranked.base_delta_min,
            ranked.base_delta_max
        ));
    }
    if ranked.min_favourite_delta > ranked.max_underdog_delta {
        return Err(anyhow!(
            "Favourite delta floor exceeds underdog delta ceiling"
        ));
    }
    if ranked.enable_expiry_sweep && ranked.sweep_interval_seconds == 0 {
        return Err(anyhow!("Sweep interval must be greater than 0"));
    }
    if ranked.queue_timeout_seconds == 0 || ranked.match_timeout_seconds == 0 {
        return Err(anyhow!("Queue and match timeouts must be greater than 0"));
    }
    for (name, seconds) in [
        ("queue_timeout_seconds", ranked.queue_timeout_seconds),
        ("match_timeout_seconds", ranked.match_timeout_seconds),
    ] {
        if seconds > MAX_TIMEOUT_SECONDS {
            return Err(anyhow!(
                "{} = {} exceeds the maximum of {} seconds",
                name,
                seconds,
                MAX_TIMEOUT_SECONDS
            ));
        }
    }

    Ok(())
}
