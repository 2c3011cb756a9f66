//! In-memory state stores
//!
//! [`InMemoryStateStore`] keeps serialized copies so that state handed back by
//! `load_scope_state` never aliases the engine's live state.
//! [`MockStateStore`] records saves and can be told to fail them.

use crate::storage::RankedStateStore;
use crate::types::{ScopeId, ScopeState};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// In-memory state store
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    scopes: RwLock<HashMap<ScopeId, String>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scopes saved so far
    pub fn scope_count(&self) -> usize {
        self.scopes.read().map(|scopes| scopes.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RankedStateStore for InMemoryStateStore {
    async fn load_scope_state(&self, scope: &ScopeId) -> Result<Option<ScopeState>> {
        let scopes = self
            .scopes
            .read()
            .map_err(|_| anyhow!("Failed to acquire scopes read lock"))?;

        match scopes.get(scope) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    async fn save_scope_state(&self, scope: &ScopeId, state: &ScopeState) -> Result<()> {
        let raw = serde_json::to_string(state)?;
        let mut scopes = self
            .scopes
            .write()
            .map_err(|_| anyhow!("Failed to acquire scopes write lock"))?;
        scopes.insert(scope.clone(), raw);
        Ok(())
    }
}

/// Mock state store for testing
#[derive(Debug, Default)]
pub struct MockStateStore {
    inner: InMemoryStateStore,
    save_calls: RwLock<Vec<(ScopeId, ScopeState)>>,
    fail_saves: AtomicBool,
}

impl MockStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following save fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Get all save calls made (for testing)
    pub fn get_save_calls(&self) -> Vec<(ScopeId, ScopeState)> {
        self.save_calls
            .read()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Preset a scope's stored state
    pub async fn preset(&self, scope: &ScopeId, state: &ScopeState) -> Result<()> {
        self.inner.save_scope_state(scope, state).await
    }
}

#[async_trait]
impl RankedStateStore for MockStateStore {
    async fn load_scope_state(&self, scope: &ScopeId) -> Result<Option<ScopeState>> {
        self.inner.load_scope_state(scope).await
    }

    async fn save_scope_state(&self, scope: &ScopeId, state: &ScopeState) -> Result<()> {
        if let Ok(mut calls) = self.save_calls.write() {
            calls.push((scope.clone(), state.clone()));
        }

        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(anyhow!("Simulated save failure for scope {}", scope));
        }

        self.inner.save_scope_state(scope, state).await
    }
}
