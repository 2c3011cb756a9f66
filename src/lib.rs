//! Ranked Arena - ranked matchmaking and rating engine for community servers
//!
//! This crate queues players per match format, forms matches with random
//! teams and private-session credentials, resolves outcomes by participant
//! majority vote and keeps a per-scope integer rating ladder. State is
//! isolated per scope and written through to a pluggable state store after
//! every change.

pub mod config;
pub mod engine;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RankedError, Result};
pub use types::*;

// Re-export key components
pub use engine::{EngineStats, RankedEngine};
pub use storage::{InMemoryStateStore, JsonFileStateStore, RankedStateStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
