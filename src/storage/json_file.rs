//! JSON file state store
//!
//! One pretty-printed JSON document per scope under a data directory. Saves
//! write a temporary file next to the target and rename it over the old
//! document, so a crash mid-write never leaves a truncated state behind.

use crate::storage::RankedStateStore;
use crate::types::{ScopeId, ScopeState};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File-backed state store
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    data_dir: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of a scope's document.
    ///
    /// Bytes outside `[A-Za-z0-9-]` (including `_`) are written as `_XX`
    /// hex escapes, so distinct scope ids always map to distinct files and
    /// no id can escape the data directory.
    pub fn scope_path(&self, scope: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", encode_file_stem(scope)))
    }
}

fn encode_file_stem(scope: &str) -> String {
    let mut stem = String::with_capacity(scope.len());
    for byte in scope.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{:02X}", byte));
        }
    }
    stem
}

#[async_trait]
impl RankedStateStore for JsonFileStateStore {
    async fn load_scope_state(&self, scope: &ScopeId) -> Result<Option<ScopeState>> {
        let path = self.scope_path(scope);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        let state = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        debug!("Loaded scope '{}' from {}", scope, path.display());
        Ok(Some(state))
    }

    async fn save_scope_state(&self, scope: &ScopeId, state: &ScopeState) -> Result<()> {
        fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.data_dir.display()))?;

        let path = self.scope_path(scope);
        let tmp_path = path.with_extension("json.tmp");
        let raw = serde_json::to_string_pretty(state)?;

        fs::write(&tmp_path, raw)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!("Saved scope '{}' to {}", scope, path.display());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        if fs::try_exists(&self.data_dir).await? {
            let metadata = fs::metadata(&self.data_dir).await?;
            anyhow::ensure!(
                metadata.is_dir(),
                "{} is not a directory",
                self.data_dir.display()
            );
        }
        Ok(())
    }
}
