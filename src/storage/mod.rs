//! Persistence gateway for ranked scope state
//!
//! The engine loads a scope's full state the first time it is referenced and
//! writes the complete state back after every mutation.

pub mod json_file;
pub mod memory;

use crate::types::{ScopeId, ScopeState};
use anyhow::Result;
use async_trait::async_trait;

pub use json_file::JsonFileStateStore;
pub use memory::{InMemoryStateStore, MockStateStore};

/// Trait for loading and saving whole scope states
#[async_trait]
pub trait RankedStateStore: Send + Sync {
    /// Load a scope's state; `None` if the scope was never saved
    async fn load_scope_state(&self, scope: &ScopeId) -> Result<Option<ScopeState>>;

    /// Overwrite a scope's stored state with `state`
    async fn save_scope_state(&self, scope: &ScopeId, state: &ScopeState) -> Result<()>;

    /// Check the store is reachable (used by readiness checks)
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
