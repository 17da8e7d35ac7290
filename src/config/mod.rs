//! Configuration system for hookdash.
//!
//! Provides a layered configuration hierarchy:
//!
//! 1. **Built-in defaults**: hardcoded in [`schema::HookdashConfig::default()`]
//! 2. **User global config**: `~/.hookdash/config.toml`
//! 3. **Project local config**: `.hookdash.toml` in the current working directory
//! 4. **Environment variables**: `HOOKDASH_*` overrides (highest precedence)
//!
//! Later layers override earlier ones key by key. Keys a TOML file leaves
//! out keep the value from the layer below.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hookdash::config;
//!
//! let cfg = config::load();
//! if cfg.poller.enabled {
//!     // ...
//! }
//! ```
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::HookdashConfig;

use crate::analytics::{Frequency, ReconcileMode};
use crate::api::models::ProjectKind;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved hookdash configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars. This is the primary entry point for all modules that need
/// configuration.
pub fn load() -> HookdashConfig {
    let mut merged = toml::Value::try_from(HookdashConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::map::Map::new()));

    // Layer 2: user global config (~/.hookdash/config.toml)
    if let Some(global) = load_toml_file(global_config_path()) {
        merge_values(&mut merged, global);
    }

    // Layer 3: project local config (.hookdash.toml)
    if let Some(project) = load_toml_file(project_config_path()) {
        merge_values(&mut merged, project);
    }

    let mut config: HookdashConfig = merged.try_into().unwrap_or_default();

    // Layer 4: environment variable overrides
    apply_env_overrides(&mut config);

    config
}

/// Load a TOML config file from the given path (if it exists).
///
/// Returns `None` if the path is `None`, the file doesn't exist, or the
/// content is not TOML or does not fit the config schema. A broken config
/// file must not take the dashboard down, so such files are ignored.
fn load_toml_file(path: Option<PathBuf>) -> Option<toml::Value> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str::<HookdashConfig>(&content).ok()?;
    toml::from_str(&content).ok()
}

/// Merge a config layer into the base, key by key.
///
/// Tables merge recursively; any other overlay value replaces the base value.
/// Keys the overlay doesn't mention keep the value from earlier layers.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.hookdash/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hookdash").join("config.toml"))
}

/// Path to the project local config: `.hookdash.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".hookdash.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `HOOKDASH_BASE_URL`: backend base URL
/// - `HOOKDASH_ORGANISATION_ID` / `HOOKDASH_PROJECT_ID`: active project
/// - `HOOKDASH_PROJECT_KIND`: `incoming` or `outgoing`
/// - `HOOKDASH_FREQUENCY`: default chart frequency
/// - `HOOKDASH_RECONCILE`: `direct` or `zero-fill`
/// - `HOOKDASH_POLLER`: poller enabled (`1`/`true`/`yes`/`on`)
/// - `HOOKDASH_POLL_INTERVAL_MS`: poll interval
/// - `HOOKDASH_LOG`: activity log enabled
fn apply_env_overrides(config: &mut HookdashConfig) {
    // Backend
    if let Ok(val) = std::env::var("HOOKDASH_BASE_URL")
        && !val.is_empty()
    {
        config.backend.base_url = val;
    }
    if let Ok(val) = std::env::var("HOOKDASH_ORGANISATION_ID")
        && !val.is_empty()
    {
        config.backend.organisation_id = val;
    }
    if let Ok(val) = std::env::var("HOOKDASH_PROJECT_ID")
        && !val.is_empty()
    {
        config.backend.project_id = val;
    }

    // Project and dashboard
    if let Ok(val) = std::env::var("HOOKDASH_PROJECT_KIND")
        && let Ok(kind) = val.parse::<ProjectKind>()
    {
        config.project.kind = kind;
    }
    if let Ok(val) = std::env::var("HOOKDASH_FREQUENCY")
        && let Ok(frequency) = val.parse::<Frequency>()
    {
        config.dashboard.frequency = frequency;
    }
    if let Ok(val) = std::env::var("HOOKDASH_RECONCILE")
        && let Ok(mode) = val.parse::<ReconcileMode>()
    {
        config.dashboard.reconcile = mode;
    }

    // Poller
    if let Ok(val) = std::env::var("HOOKDASH_POLLER") {
        config.poller.enabled = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("HOOKDASH_POLL_INTERVAL_MS")
        && let Ok(ms) = val.parse::<u64>()
        && ms > 0
    {
        config.poller.interval_ms = ms;
    }

    // Logging
    if let Ok(val) = std::env::var("HOOKDASH_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.hookdash/config.toml`.
///
/// Creates the `~/.hookdash/` directory if it doesn't exist. Returns an error
/// if the file already exists (use `force = true` to overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.hookdash/ directory")?;
    }

    fs::write(&path, HookdashConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Reads the current global config (or defaults), updates the specified key,
/// and writes the result back. Supports dotted keys like `poller.interval_ms`.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let current = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&HookdashConfig::default())
            .context("failed to serialize default config")?
    };

    let mut value_table: toml::Value =
        toml::from_str(&current).context("failed to parse config as TOML value")?;

    set_toml_value(&mut value_table, key, value)?;

    let updated =
        toml::to_string_pretty(&value_table).context("failed to serialize updated config")?;
    validate(&updated).with_context(|| format!("invalid value '{value}' for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, updated).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        anyhow::bail!("empty config key segment in '{key}'");
    }

    // Navigate to the parent table
    let mut current = root;
    for &part in &parts[..parts.len() - 1] {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let leaf = parts[parts.len() - 1];

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    // Keep the type of the existing value
    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("config key not found: '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reject config text that would no longer load or would make the poller spin.
fn validate(text: &str) -> Result<()> {
    let config: HookdashConfig = toml::from_str(text)?;
    if config.poller.interval_ms == 0 {
        anyhow::bail!("poller.interval_ms must be greater than zero");
    }
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    render_config(&load())
}

fn render_config(config: &HookdashConfig) -> Result<String> {
    toml::to_string_pretty(config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
