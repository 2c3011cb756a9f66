//! Service layer for the ranked-arena service
//!
//! This module contains the main application state, the HTTP API over the
//! engine, health checks and background task management.

pub mod api;
pub mod app;
pub mod health;

pub use app::{AppState, ServiceContext, ServiceError};
pub use health::{HealthCheck, HealthStatus};
