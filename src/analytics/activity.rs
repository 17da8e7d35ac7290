//! Activity log: records what the dashboard did in the background.
//!
//! Fetch failures are never shown to the user, so this log is the only place
//! they surface. Poller lifecycle transitions and dropped backend samples are
//! recorded as well.
//!
//! Log file: `~/.hookdash/activity.jsonl`

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

static ENABLED: AtomicBool = AtomicBool::new(true);

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// What kind of thing happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// A backend call failed and the previous value was kept.
    FetchError,
    /// A backend sample could not be mapped to a calendar day.
    SampleDropped,
    PollerStarted,
    /// The poller saw deliveries and stopped itself.
    PollerStopped,
    /// The poller was torn down with the view.
    PollerCancelled,
    /// A poller thread panicked.
    PollerPanicked,
}

/// One line of `activity.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    pub kind: ActivityKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Turn activity logging on or off for this process.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Append an entry. Best-effort: failures are silently ignored.
pub fn record(kind: ActivityKind, message: &str, detail: Option<String>) {
    if !is_enabled() {
        return;
    }

    let entry = ActivityEntry {
        timestamp: Utc::now().to_rfc3339(),
        kind,
        message: message.to_string(),
        detail,
    };
    let _ = append_entry(&entry);
}

/// Record a swallowed backend failure.
pub fn fetch_error(operation: &str, error: &anyhow::Error) {
    record(ActivityKind::FetchError, operation, Some(format!("{error:#}")));
}

fn append_entry(entry: &ActivityEntry) -> anyhow::Result<()> {
    let Some(path) = activity_log_path() else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read the newest `limit` entries, oldest first.
///
/// Malformed lines are skipped. A missing log reads as empty.
pub fn read_recent(limit: usize) -> Vec<ActivityEntry> {
    let Some(path) = activity_log_path() else {
        return Vec::new();
    };

    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    let entries: Vec<ActivityEntry> = BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str(&line).ok())
        .collect();

    let skip = entries.len().saturating_sub(limit);
    entries.into_iter().skip(skip).collect()
}

/// Return the path to the activity log file.
pub fn activity_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hookdash").join("activity.jsonl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_without_empty_detail() {
        let entry = ActivityEntry {
            timestamp: "2024-03-01T10:00:00+00:00".to_string(),
            kind: ActivityKind::PollerStarted,
            message: "polling latest deliveries".to_string(),
            detail: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""kind":"poller_started""#));
        assert!(!json.contains("detail"));
    }

    #[test]
    fn entry_round_trips_from_log_line() {
        let line = r#"{"timestamp":"2024-03-01T10:00:00+00:00","kind":"fetch_error","message":"latest deliveries","detail":"connection refused"}"#;
        let entry: ActivityEntry = serde_json::from_str(line).unwrap();
        assert_eq!(entry.kind, ActivityKind::FetchError);
        assert_eq!(entry.detail.as_deref(), Some("connection refused"));
    }
}
