//! CLI command implementations for hookdash.
//!
//! Provides subcommand handlers for:
//! - `hookdash summary`: counters and chart series for a filter
//! - `hookdash buckets`: offline preview of the chart buckets
//! - `hookdash watch`: wait for the first deliveries of an incoming project
//! - `hookdash activity`: recent background activity
//! - `hookdash health`: check backend, config and local state
//! - `hookdash config show|init|set|reset`: configuration management

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use colored::Colorize;

use crate::analytics::activity::{self, ActivityEntry};
use crate::analytics::buckets::{self, Bucket};
use crate::analytics::{DatePreset, DateRange, Frequency, ReconcileMode, SeriesPoint};
use crate::api::client::HttpBackend;
use crate::api::models::{EventDelivery, ProjectKind};
use crate::config::{self, HookdashConfig};
use crate::dashboard::{ControllerOptions, DashboardController, DashboardView, FilterChange};
use crate::storage::{self, FileStore, KeyValueStore, MemoryStore};

/// Output format for data commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Filter flags shared by `summary` and `buckets`.
#[derive(Debug, Clone, Default)]
pub struct FilterArgs {
    pub start: Option<String>,
    pub end: Option<String>,
    pub preset: Option<String>,
    pub frequency: Option<String>,
}

impl FilterArgs {
    fn to_change(&self) -> Result<FilterChange> {
        let start = self.start.as_deref().map(parse_date).transpose()?;
        let end = self.end.as_deref().map(parse_date).transpose()?;
        let range = match (start, end) {
            (None, None) => None,
            (start, end) => Some(DateRange { start, end }),
        };

        Ok(FilterChange {
            range,
            preset: self
                .preset
                .as_deref()
                .map(str::parse::<DatePreset>)
                .transpose()?,
            frequency: self
                .frequency
                .as_deref()
                .map(str::parse::<Frequency>)
                .transpose()?,
        })
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}' (expected YYYY-MM-DD)"))
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Build a controller for the configured project.
///
/// A storage file that cannot be read is reported and treated as empty.
pub fn controller_from_config(config: &HookdashConfig) -> DashboardController {
    let backend = Arc::new(HttpBackend::from_config(&config.backend));

    let store: Arc<dyn KeyValueStore> = match FileStore::open_default() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("{} {e:#}", "Warning:".yellow().bold());
            Arc::new(MemoryStore::new())
        }
    };

    DashboardController::new(
        backend,
        store,
        ControllerOptions::from_config(config),
        Local::now().date_naive(),
    )
}

// ---------------------------------------------------------------------------
// hookdash summary
// ---------------------------------------------------------------------------

/// Fetch the dashboard for a filter and print counters plus the series.
pub fn run_summary(filter: &FilterArgs, zero_fill: bool, format: OutputFormat) -> Result<()> {
    let change = filter.to_change()?;
    let mut cfg = config::load();
    cfg.poller.enabled = false;
    if zero_fill {
        cfg.dashboard.reconcile = ReconcileMode::ZeroFill;
    }

    let mut controller = controller_from_config(&cfg);
    controller.select(change);
    let poller = controller.activate();
    let view = controller.view();
    controller.deactivate(poller);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Csv => print_series_csv(&view.series),
        OutputFormat::Table => print_summary_table(&view),
    }

    Ok(())
}

fn print_summary_table(view: &DashboardView) {
    println!("{}", "Delivery Summary".bold().cyan());
    println!("{}", "=".repeat(60));
    println!();

    println!("  {} {}", "Range:      ".bold(), format_range(&view.range));
    println!("  {} {}", "Frequency:  ".bold(), view.frequency);
    println!("  {} {}", "Reconcile:  ".bold(), view.reconcile);
    println!("  {} {}", "Apps:       ".bold(), format_number(view.apps));
    println!("  {} {}", "Events sent:".bold(), format_number(view.events_sent));
    if let Some(source) = &view.latest_source {
        println!("  {} {}", "Latest source:".bold(), source.name);
    }
    println!();

    if !view.has_events {
        println!(
            "{}",
            "No deliveries yet. Send an event to this project to see the chart.".yellow()
        );
        if !view.is_project_configuration_complete {
            println!("  {}", "Project setup is not complete.".dimmed());
        }
        return;
    }

    if view.series.is_empty() {
        println!("{}", "No samples in this range.".yellow());
        return;
    }

    print_series_chart(&view.series);
}

fn print_series_chart(series: &[SeriesPoint]) {
    const BAR_WIDTH: u64 = 40;

    let max = series.iter().map(|p| p.value).max().unwrap_or(0);
    let label_width = series.iter().map(|p| p.label.len()).max().unwrap_or(0);

    for (i, point) in series.iter().enumerate() {
        let bar_len = if max == 0 { 0 } else { point.value * BAR_WIDTH / max };
        let line = format!(
            "  {:<width$} {:>8} {}",
            point.label,
            format_number(point.value),
            "█".repeat(bar_len as usize),
            width = label_width,
        );

        if i % 2 == 0 {
            println!("{}", line);
        } else {
            println!("{}", line.dimmed());
        }
    }
}

fn print_series_csv(series: &[SeriesPoint]) {
    println!("label,value");
    for point in series {
        println!("\"{}\",{}", point.label, point.value);
    }
}

// ---------------------------------------------------------------------------
// hookdash buckets
// ---------------------------------------------------------------------------

/// Print the bucket sequence for a filter without contacting the backend.
pub fn run_buckets(filter: &FilterArgs, format: OutputFormat) -> Result<()> {
    let change = filter.to_change()?;
    let today = Local::now().date_naive();

    let frequency = change
        .frequency
        .unwrap_or_else(|| config::load().dashboard.frequency);
    let range = match (change.preset, change.range) {
        (Some(preset), _) => preset.range(today),
        (None, Some(range)) => range,
        (None, None) => DateRange::default_for(today),
    };
    let buckets = buckets::generate(&range, frequency);

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "frequency": frequency,
                "range": range,
                "buckets": buckets,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Csv => {
            println!("label,index");
            for bucket in &buckets {
                println!("\"{}\",{}", bucket.label, bucket.index);
            }
        }
        OutputFormat::Table => print_buckets_table(&buckets, &range, frequency),
    }

    Ok(())
}

fn print_buckets_table(buckets: &[Bucket], range: &DateRange, frequency: Frequency) {
    println!(
        "{}",
        format!("Chart Buckets: {frequency}, {}", format_range(range))
            .bold()
            .cyan()
    );
    println!("{}", "=".repeat(40));

    if buckets.is_empty() {
        println!("{}", "No buckets: the range is empty.".yellow());
        return;
    }

    println!("  {:<20} {:>8}", "Label", "Index");
    println!("  {}", "-".repeat(30));
    for bucket in buckets {
        println!("  {:<20} {:>8}", bucket.label, bucket.index);
    }
    println!();
    println!("  {} {}", "Total:".bold(), buckets.len());
}

// ---------------------------------------------------------------------------
// hookdash watch
// ---------------------------------------------------------------------------

/// Poll until the project receives its first deliveries or `timeout_secs` pass.
pub fn run_watch(timeout_secs: u64) -> Result<()> {
    let cfg = config::load();

    if cfg.project.kind == ProjectKind::Outgoing {
        println!(
            "{}",
            "Outgoing projects are not polled for new deliveries.".yellow()
        );
        return Ok(());
    }

    let mut controller = controller_from_config(&cfg);
    let poller = controller.activate();

    if controller.has_events() {
        println!("{}", "Deliveries already present.".green());
        print_deliveries_table(&controller.latest_deliveries());
        controller.deactivate(poller);
        return Ok(());
    }

    if !poller.is_polling() {
        println!("{}", "Polling is disabled ([poller] enabled = false).".yellow());
        return Ok(());
    }

    println!(
        "Waiting for deliveries (every {} ms, up to {}s)...",
        cfg.poller.interval_ms, timeout_secs
    );

    let found = poller.wait_idle(Duration::from_secs(timeout_secs));
    let ticks = poller.ticks();
    controller.deactivate(poller);

    if found && controller.has_events() {
        println!("{} after {} poll(s)", "Deliveries arrived".green().bold(), ticks);
        print_deliveries_table(&controller.latest_deliveries());
    } else {
        println!(
            "{}",
            format!("No deliveries after {ticks} poll(s). Failed polls are in the activity log.")
                .yellow()
        );
    }

    Ok(())
}

fn print_deliveries_table(deliveries: &[EventDelivery]) {
    println!();
    println!(
        "  {:<12} {:<28} {:<26} Next Attempt",
        "Status", "Event Type", "Event Time"
    );
    println!("  {}", "-".repeat(90));
    for delivery in deliveries {
        println!(
            "  {:<12} {:<28} {:<26} {}",
            colorize_status(&delivery.status),
            truncate(delivery.event_type(), 28),
            delivery.created_at.as_deref().unwrap_or("-"),
            delivery.next_attempt().unwrap_or("-"),
        );
    }
}

// ---------------------------------------------------------------------------
// hookdash activity
// ---------------------------------------------------------------------------

/// Show the newest activity log entries.
pub fn run_activity(limit: usize, format: OutputFormat) -> Result<()> {
    let entries = activity::read_recent(limit);

    if entries.is_empty() {
        println!("{}", "No activity recorded yet.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Csv => {
            println!("timestamp,kind,message,detail");
            for e in &entries {
                println!(
                    "{},{:?},\"{}\",\"{}\"",
                    e.timestamp,
                    e.kind,
                    e.message,
                    e.detail.as_deref().unwrap_or("")
                );
            }
        }
        OutputFormat::Table => print_activity_table(&entries),
    }

    Ok(())
}

fn print_activity_table(entries: &[ActivityEntry]) {
    println!("{}", "Recent Activity".bold().cyan());
    println!("{}", "=".repeat(60));
    for e in entries {
        let time = e.timestamp.get(..19).unwrap_or(e.timestamp.as_str());
        let kind = format!("{:?}", e.kind);
        println!(
            "  {} {:<16} {} {}",
            time.dimmed(),
            kind,
            e.message,
            e.detail.as_deref().unwrap_or("").dimmed()
        );
    }
}

// ---------------------------------------------------------------------------
// hookdash health
// ---------------------------------------------------------------------------

/// Check config files, backend reachability and local state.
pub fn run_health() -> Result<()> {
    println!("{}", "hookdash Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let cfg = config::load();

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.hookdash/config.toml found"
        } else {
            "not found (run `hookdash config init` to create)"
        },
    );

    let configured = !cfg.backend.organisation_id.is_empty() && !cfg.backend.project_id.is_empty();
    print_health_item(
        "Project",
        configured,
        &if configured {
            format!("{} ({})", cfg.backend.project_id, cfg.project.kind)
        } else {
            "organisation_id / project_id not set".to_string()
        },
    );

    let backend_ok = configured && HttpBackend::from_config(&cfg.backend).is_healthy();
    print_health_item(
        "Backend",
        backend_ok,
        &if backend_ok {
            format!("reachable at {}", cfg.backend.base_url)
        } else {
            format!("not reachable at {}", cfg.backend.base_url)
        },
    );

    let polls = cfg.poller.enabled && cfg.project.kind == ProjectKind::Incoming;
    print_health_item(
        "Poller",
        polls,
        &if polls {
            format!("every {} ms until deliveries arrive", cfg.poller.interval_ms)
        } else {
            "inactive for this project".to_string()
        },
    );

    let store_ok = FileStore::open_default();
    let setup_complete = store_ok
        .as_ref()
        .map(|store| storage::read_flag(store, storage::PROJECT_CONFIGURATION_COMPLETE))
        .unwrap_or(false);
    print_health_item(
        "Project setup",
        setup_complete,
        match &store_ok {
            Ok(_) if setup_complete => "complete",
            Ok(_) => "not complete",
            Err(_) => "storage file unreadable",
        },
    );

    let log_exists = activity::activity_log_path()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_health_item(
        "Activity log",
        log_exists,
        &if !cfg.logging.enabled {
            "disabled".to_string()
        } else if log_exists {
            format!("{} recent entries", activity::read_recent(usize::MAX).len())
        } else {
            "no log file yet".to_string()
        },
    );

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<16} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// hookdash config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective hookdash Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    println!("  {} {}", "·".dimmed(), "~/.hookdash/config.toml".dimmed());
    println!("  {} {}", "·".dimmed(), ".hookdash.toml".dimmed());
    println!(
        "  {} {}",
        "·".dimmed(),
        "HOOKDASH_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.hookdash/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Format a number with comma separators for readability.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

fn format_range(range: &DateRange) -> String {
    match range.bounds() {
        Some((start, end)) => format!("{start} → {end}"),
        None => "no filter".to_string(),
    }
}

/// Colorize a delivery status.
fn colorize_status(status: &str) -> colored::ColoredString {
    match status {
        "Success" => status.green(),
        "Failure" | "Discarded" => status.red(),
        "Retry" | "Scheduled" | "Processing" => status.yellow(),
        _ => status.normal(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
