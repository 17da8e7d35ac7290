//! Configuration schema and defaults for hookdash.
//!
//! Defines the TOML-serializable configuration structure with all sections:
//! `[backend]`, `[project]`, `[dashboard]`, `[poller]`, `[logging]` and
//! `[web]`.
//!
//! Every field has a sensible built-in default. Users only need to set the
//! values they want to override.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analytics::{Frequency, ReconcileMode};
use crate::api::models::ProjectKind;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level hookdash configuration.
///
/// Maps directly to the `~/.hookdash/config.toml` and `.hookdash.toml` file
/// schemas. All sections and fields are optional; missing values fall back
/// to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HookdashConfig {
    pub backend: BackendConfig,
    pub project: ProjectConfig,
    pub dashboard: DashboardConfig,
    pub poller: PollerConfig,
    pub logging: LoggingConfig,
    pub web: WebConfig,
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

/// Where the delivery backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the dashboard API, e.g. `http://localhost:5005/ui`.
    pub base_url: String,
    pub organisation_id: String,
    pub project_id: String,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5005/ui".to_string(),
            organisation_id: String::new(),
            project_id: String::new(),
            timeout_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [project]
// ---------------------------------------------------------------------------

/// Details of the active project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// `incoming` projects poll for new deliveries, `outgoing` ones never do.
    pub kind: ProjectKind,
}

// ---------------------------------------------------------------------------
// [dashboard]
// ---------------------------------------------------------------------------

/// Chart defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Frequency selected when the dashboard opens.
    pub frequency: Frequency,
    /// How backend samples become chart points: `direct` or `zero-fill`.
    pub reconcile: ReconcileMode,
}

// ---------------------------------------------------------------------------
// [poller]
// ---------------------------------------------------------------------------

/// Latest-deliveries poller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub enabled: bool,
    /// Time between two fetches (milliseconds).
    pub interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 2000,
        }
    }
}

/// Shortest poll interval honoured; smaller settings are raised to it.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

impl PollerConfig {
    /// The configured interval, never below [`MIN_POLL_INTERVAL_MS`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether `~/.hookdash/activity.jsonl` is written.
    pub enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address for `hookdash web`.
    pub addr: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl HookdashConfig {
    /// Generate the annotated default TOML config file content.
    ///
    /// Used by `hookdash config init` to create a starting config file with
    /// all settings documented.
    pub fn default_toml() -> String {
        r#"# hookdash Configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (HOOKDASH_*)
#   2. Project config (.hookdash.toml in current directory)
#   3. User global config (~/.hookdash/config.toml)
#   4. Built-in defaults

[backend]
base_url = "http://localhost:5005/ui"
organisation_id = ""
project_id = ""
timeout_ms = 10000

[project]
kind = "incoming"     # incoming | outgoing

[dashboard]
frequency = "daily"   # daily | weekly | monthly | yearly
reconcile = "direct"  # direct | zero-fill

[poller]
enabled = true
interval_ms = 2000

[logging]
enabled = true        # ~/.hookdash/activity.jsonl

[web]
addr = "127.0.0.1:9747"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = HookdashConfig::default();
        assert_eq!(config.backend.timeout_ms, 10_000);
        assert_eq!(config.project.kind, ProjectKind::Incoming);
        assert_eq!(config.dashboard.frequency, Frequency::Daily);
        assert_eq!(config.dashboard.reconcile, ReconcileMode::Direct);
        assert!(config.poller.enabled);
        assert_eq!(config.poller.interval_ms, 2000);
        assert!(config.logging.enabled);
        assert_eq!(config.web.addr, "127.0.0.1:9747");
    }

    #[test]
    fn deserialize_minimal_toml() {
        let toml_str = r#"
[dashboard]
frequency = "monthly"
"#;
        let config: HookdashConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dashboard.frequency, Frequency::Monthly);
        // All other sections fall back to defaults
        assert_eq!(config.dashboard.reconcile, ReconcileMode::Direct);
        assert_eq!(config.poller.interval_ms, 2000);
    }

    #[test]
    fn deserialize_full_toml() {
        let toml_str = r#"
[backend]
base_url = "https://dashboard.example.com/ui"
organisation_id = "org_1"
project_id = "proj_1"
timeout_ms = 5000

[project]
kind = "outgoing"

[dashboard]
frequency = "weekly"
reconcile = "zero-fill"

[poller]
enabled = false
interval_ms = 500

[logging]
enabled = false

[web]
addr = "0.0.0.0:8080"
"#;
        let config: HookdashConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.project_id, "proj_1");
        assert_eq!(config.project.kind, ProjectKind::Outgoing);
        assert_eq!(config.dashboard.frequency, Frequency::Weekly);
        assert_eq!(config.dashboard.reconcile, ReconcileMode::ZeroFill);
        assert!(!config.poller.enabled);
        assert_eq!(config.poller.interval_ms, 500);
        assert!(!config.logging.enabled);
        assert_eq!(config.web.addr, "0.0.0.0:8080");
    }

    #[test]
    fn empty_toml_produces_defaults() {
        let config: HookdashConfig = toml::from_str("").unwrap();
        assert_eq!(config.poller.interval_ms, 2000);
        assert_eq!(config.project.kind, ProjectKind::Incoming);
    }

    #[test]
    fn default_toml_parses_back() {
        let config: HookdashConfig = toml::from_str(&HookdashConfig::default_toml()).unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:5005/ui");
        assert_eq!(config.web.addr, "127.0.0.1:9747");
    }

    #[test]
    fn poll_interval_is_floored() {
        let mut poller = PollerConfig::default();
        assert_eq!(poller.interval(), Duration::from_millis(2000));

        poller.interval_ms = 0;
        assert_eq!(poller.interval(), Duration::from_millis(MIN_POLL_INTERVAL_MS));
    }
}
