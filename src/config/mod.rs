//! Configuration management for the ranked-arena service
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values for the service.

pub mod app;
pub mod ranked;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings, StorageBackend, StorageSettings};
pub use ranked::{RankedSettings, MAX_TIMEOUT_SECONDS};
