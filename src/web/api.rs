//! JSON API handlers for the dashboard server.
//!
//! Each handler corresponds to an API endpoint and returns a
//! `Response<Cursor<Vec<u8>>>` with JSON content. Malformed query
//! parameters are answered with `400`.

use std::io::Cursor;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tiny_http::{Response, StatusCode};

use crate::analytics::activity::{self, ActivityEntry};
use crate::analytics::buckets::{self, Bucket};
use crate::analytics::{DatePreset, DateRange, Frequency, ReconcileMode};
use crate::api::models::EventDelivery;
use crate::config;
use crate::dashboard::{DashboardController, FilterChange, PollerHandle, PollerState};
use crate::storage;

use super::{content_type_json, error_response};

/// Entries returned by `/api/activity` when no `limit` is given.
const DEFAULT_ACTIVITY_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct BucketsResponse {
    frequency: Frequency,
    range: DateRange,
    buckets: Vec<Bucket>,
}

#[derive(Serialize)]
struct LatestDeliveriesResponse {
    poller: PollerState,
    has_events: bool,
    deliveries: Vec<EventDelivery>,
}

#[derive(Serialize)]
struct ActivityResponse {
    entries: Vec<ActivityEntry>,
}

/// Config API response: the full config as a JSON value + the raw TOML.
#[derive(Serialize)]
struct ConfigResponse {
    config: config::HookdashConfig,
    toml_text: String,
}

#[derive(Serialize)]
struct HealthResponse {
    poller: PollerState,
    poller_ticks: u64,
    config_exists: bool,
    storage_exists: bool,
    activity_log_exists: bool,
    project_configuration_complete: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<Response<Cursor<Vec<u8>>>> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

/// Extract a raw query parameter from a URL.
fn query_param<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    url.split('?').nth(1)?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key && !v.is_empty()).then_some(v)
    })
}

/// Parse the filter parameters `start`, `end`, `preset` and `frequency`.
///
/// `start`/`end` only count when both are given.
fn parse_filter(url: &str) -> Result<FilterChange> {
    let start = query_param(url, "start").map(parse_date).transpose()?;
    let end = query_param(url, "end").map(parse_date).transpose()?;
    let range = match (start, end) {
        (Some(start), Some(end)) => Some(DateRange::new(start, end)),
        _ => None,
    };

    Ok(FilterChange {
        range,
        preset: query_param(url, "preset")
            .map(|v| v.replace("%20", " ").parse::<DatePreset>())
            .transpose()?,
        frequency: query_param(url, "frequency")
            .map(str::parse::<Frequency>)
            .transpose()?,
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}' (expected YYYY-MM-DD)"))
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/dashboard?start=&end=&preset=&frequency=&reconcile=`: view snapshot.
///
/// Any filter parameter triggers a recompute before the snapshot is taken.
pub fn get_dashboard(
    controller: &mut DashboardController,
    url: &str,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let change = match parse_filter(url) {
        Ok(change) => change,
        Err(e) => return Ok(error_response(400, &format!("{e:#}"))),
    };
    let reconcile = match query_param(url, "reconcile").map(str::parse::<ReconcileMode>) {
        Some(Err(e)) => return Ok(error_response(400, &format!("{e:#}"))),
        Some(Ok(mode)) => Some(mode),
        None => None,
    };

    controller.apply_filter(change);
    if let Some(mode) = reconcile {
        controller.set_reconcile_mode(mode);
    }

    json_response(&controller.view())
}

/// `GET /api/buckets?start=&end=&frequency=`: chart buckets.
///
/// Without parameters the controller's current filter is used. The
/// controller itself is not changed.
pub fn get_buckets(
    controller: &DashboardController,
    url: &str,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let change = match parse_filter(url) {
        Ok(change) => change,
        Err(e) => return Ok(error_response(400, &format!("{e:#}"))),
    };

    let frequency = change.frequency.unwrap_or(controller.frequency());
    let range = change
        .range
        .unwrap_or_else(|| controller.range());

    let resp = BucketsResponse {
        frequency,
        range,
        buckets: buckets::generate(&range, frequency),
    };
    json_response(&resp)
}

/// `GET /api/deliveries/latest`: the poller's cache.
pub fn get_latest_deliveries(
    controller: &DashboardController,
    poller: &PollerHandle,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let resp = LatestDeliveriesResponse {
        poller: poller.state(),
        has_events: controller.has_events(),
        deliveries: controller.latest_deliveries(),
    };
    json_response(&resp)
}

/// `GET /api/activity?limit=N`: recent activity log entries.
pub fn get_activity(url: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let limit = query_param(url, "limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT);

    json_response(&ActivityResponse {
        entries: activity::read_recent(limit),
    })
}

/// `GET /api/config`: current effective configuration.
pub fn get_config() -> Result<Response<Cursor<Vec<u8>>>> {
    let cfg = config::load();
    let toml_text = toml::to_string_pretty(&cfg).unwrap_or_default();

    json_response(&ConfigResponse {
        config: cfg,
        toml_text,
    })
}

/// `GET /api/health`: local state summary.
pub fn get_health(
    controller: &DashboardController,
    poller: &PollerHandle,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let exists = |path: Option<std::path::PathBuf>| path.map(|p| p.exists()).unwrap_or(false);

    let resp = HealthResponse {
        poller: poller.state(),
        poller_ticks: poller.ticks(),
        config_exists: exists(config::global_config_file()),
        storage_exists: exists(storage::storage_path()),
        activity_log_exists: exists(activity::activity_log_path()),
        project_configuration_complete: controller.is_project_configuration_complete(),
    };
    json_response(&resp)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
