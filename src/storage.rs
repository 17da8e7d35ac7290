//! Key-value lookups for persisted UI flags.
//!
//! The dashboard only reads from this store. Values are raw strings holding
//! JSON, as written by the rest of the application.
//!
//! File store: `~/.hookdash/storage.json` (a flat JSON object of strings)

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Key holding whether the active project finished its setup steps.
pub const PROJECT_CONFIGURATION_COMPLETE: &str = "isActiveProjectConfigurationComplete";

/// Read-only string lookup.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Read a boolean flag stored as JSON. Missing or malformed values are `false`.
pub fn read_flag(store: &dyn KeyValueStore, key: &str) -> bool {
    store
        .get(key)
        .and_then(|raw| serde_json::from_str::<bool>(&raw).ok())
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// Snapshot of a JSON storage file taken when the store is opened.
#[derive(Debug, Clone, Default)]
pub struct FileStore {
    values: HashMap<String, String>,
}

impl FileStore {
    /// Open the default store. A missing file yields an empty store.
    pub fn open_default() -> Result<Self> {
        match storage_path() {
            Some(path) if path.exists() => Self::open(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_str(content)?;
        let values = raw
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect();
        Ok(Self { values })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Return the path to the storage file.
pub fn storage_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hookdash").join("storage.json"))
}
