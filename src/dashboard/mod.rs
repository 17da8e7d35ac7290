//! Dashboard controller for the events overview page.
//!
//! Owns the selected filter (date range, frequency, preset) and everything
//! derived from it: summary counters, the chart series, the latest source
//! and the latest deliveries. The rendering layer reads a [`DashboardView`]
//! snapshot and sends filter actions back; every filter action recomputes the
//! summary and series wholesale.
//!
//! Backend failures never surface here. A failed fetch is written to the
//! activity log and the previous value stays on screen.

pub mod filter;
pub mod poller;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::activity;
use crate::analytics::buckets::{self, Bucket};
use crate::analytics::series::{self, Sample, SeriesPoint};
use crate::analytics::{DatePreset, DateRange, Frequency, ReconcileMode};
use crate::api::DashboardBackend;
use crate::api::models::{DashboardSummary, EventDelivery, Page, ProjectKind, Source};
use crate::config::HookdashConfig;
use crate::storage::{self, KeyValueStore};

pub use poller::{PollerHandle, PollerState, SharedDeliveries};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Controller settings, usually taken from the resolved config.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub project_kind: ProjectKind,
    pub frequency: Frequency,
    pub reconcile: ReconcileMode,
    pub polling_enabled: bool,
    pub poll_interval: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            project_kind: ProjectKind::default(),
            frequency: Frequency::default(),
            reconcile: ReconcileMode::default(),
            polling_enabled: true,
            poll_interval: poller::DEFAULT_INTERVAL,
        }
    }
}

impl ControllerOptions {
    pub fn from_config(config: &HookdashConfig) -> Self {
        Self {
            project_kind: config.project.kind,
            frequency: config.dashboard.frequency,
            reconcile: config.dashboard.reconcile,
            polling_enabled: config.poller.enabled,
            poll_interval: config.poller.interval(),
        }
    }
}

// ---------------------------------------------------------------------------
// Filter change
// ---------------------------------------------------------------------------

/// Several filter edits applied with a single refetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChange {
    /// Explicit range; ignored when a preset is given.
    pub range: Option<DateRange>,
    pub preset: Option<DatePreset>,
    pub frequency: Option<Frequency>,
}

impl FilterChange {
    pub fn is_empty(&self) -> bool {
        self.range.is_none() && self.preset.is_none() && self.frequency.is_none()
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Everything the rendering layer binds to.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub apps: u64,
    pub events_sent: u64,
    pub series: Vec<SeriesPoint>,
    pub frequency: Frequency,
    pub reconcile: ReconcileMode,
    pub range: DateRange,
    pub selected_preset: Option<DatePreset>,
    pub is_loading: bool,
    /// `false` shows onboarding, `true` shows the chart.
    pub has_events: bool,
    pub latest_source: Option<Source>,
    pub latest_deliveries: Vec<EventDelivery>,
    pub is_project_configuration_complete: bool,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct DashboardController {
    backend: Arc<dyn DashboardBackend>,
    store: Arc<dyn KeyValueStore>,
    options: ControllerOptions,
    today: NaiveDate,

    range: DateRange,
    frequency: Frequency,
    selected_preset: Option<DatePreset>,

    apps: u64,
    events_sent: u64,
    samples: Vec<Sample>,
    series: Vec<SeriesPoint>,
    latest_source: Option<Source>,
    latest: SharedDeliveries,
    is_loading: bool,
}

impl DashboardController {
    /// Build a controller showing the default range ending `today`.
    pub fn new(
        backend: Arc<dyn DashboardBackend>,
        store: Arc<dyn KeyValueStore>,
        options: ControllerOptions,
        today: NaiveDate,
    ) -> Self {
        let frequency = options.frequency;
        Self {
            backend,
            store,
            options,
            today,
            range: DateRange::default_for(today),
            frequency,
            selected_preset: None,
            apps: 0,
            events_sent: 0,
            samples: Vec::new(),
            series: Vec::new(),
            latest_source: None,
            latest: SharedDeliveries::default(),
            is_loading: false,
        }
    }

    // -- Lifecycle --

    /// First load: fetch summary, sources and deliveries concurrently, then
    /// start the poller for incoming projects.
    ///
    /// The returned handle must be passed to [`deactivate`](Self::deactivate)
    /// (or dropped) when the view goes away.
    pub fn activate(&mut self) -> PollerHandle {
        self.is_loading = true;

        let query = filter::summary_query(&self.range, self.frequency);
        let backend = self.backend.as_ref();

        let (summary, sources, deliveries) = thread::scope(|scope| {
            let summary = scope.spawn(|| backend.dashboard_summary(&query));
            let sources = scope.spawn(|| backend.sources());
            let deliveries = scope.spawn(|| backend.latest_event_deliveries(1));
            (
                settle(summary.join(), "dashboard summary"),
                settle(sources.join(), "sources"),
                settle(deliveries.join(), "latest event deliveries"),
            )
        });

        match summary {
            Ok(summary) => self.apply_summary(summary),
            Err(e) => activity::fetch_error("dashboard summary", &e),
        }
        match sources {
            Ok(page) => self.apply_sources(page),
            Err(e) => activity::fetch_error("sources", &e),
        }
        match deliveries {
            Ok(page) => poller::lock(&self.latest).deliveries = page.content,
            Err(e) => activity::fetch_error("latest event deliveries", &e),
        }

        self.check_events_on_first_load();
        self.is_loading = false;

        if self.options.project_kind == ProjectKind::Incoming && self.options.polling_enabled {
            PollerHandle::start(
                Arc::clone(&self.backend),
                Arc::clone(&self.latest),
                self.options.poll_interval,
            )
        } else {
            PollerHandle::idle()
        }
    }

    /// Tear the view down. Cancelling an idle or already cancelled poller is a
    /// no-op.
    pub fn deactivate(&self, mut handle: PollerHandle) {
        handle.cancel();
    }

    fn check_events_on_first_load(&mut self) {
        let mut latest = poller::lock(&self.latest);
        latest.has_events = !latest.deliveries.is_empty();
    }

    // -- Filter actions --

    /// Re-fetch the summary for the current filter and rebuild the series.
    pub fn refresh_summary(&mut self) {
        let query = filter::summary_query(&self.range, self.frequency);
        match self.backend.dashboard_summary(&query) {
            Ok(summary) => self.apply_summary(summary),
            Err(e) => activity::fetch_error("dashboard summary", &e),
        }
    }

    /// Apply a date-picker selection. `None` resets to the default range.
    pub fn set_date_range(&mut self, range: Option<DateRange>) {
        self.range = range.unwrap_or_else(|| DateRange::default_for(self.today));
        self.selected_preset = None;
        self.refresh_summary();
    }

    pub fn select_preset(&mut self, preset: DatePreset) {
        self.range = preset.range(self.today);
        self.selected_preset = Some(preset);
        self.refresh_summary();
    }

    pub fn set_frequency(&mut self, frequency: Frequency) {
        self.frequency = frequency;
        self.refresh_summary();
    }

    /// Apply a combined filter edit. An empty change does nothing.
    pub fn apply_filter(&mut self, change: FilterChange) {
        if self.select(change) {
            self.refresh_summary();
        }
    }

    /// Record a filter edit without fetching, e.g. before [`activate`](Self::activate).
    ///
    /// Returns whether anything was selected.
    pub fn select(&mut self, change: FilterChange) -> bool {
        if change.is_empty() {
            return false;
        }
        if let Some(frequency) = change.frequency {
            self.frequency = frequency;
        }
        if let Some(preset) = change.preset {
            self.range = preset.range(self.today);
            self.selected_preset = Some(preset);
        } else if let Some(range) = change.range {
            self.range = range;
            self.selected_preset = None;
        }
        true
    }

    /// Switch how samples map onto the chart. Reuses the last samples.
    pub fn set_reconcile_mode(&mut self, mode: ReconcileMode) {
        self.options.reconcile = mode;
        self.rebuild_series();
    }

    // -- Derived data --

    /// Chart buckets for the current filter.
    pub fn buckets(&self) -> Vec<Bucket> {
        buckets::generate(&self.range, self.frequency)
    }

    pub fn series(&self) -> &[SeriesPoint] {
        &self.series
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn has_events(&self) -> bool {
        poller::lock(&self.latest).has_events
    }

    pub fn latest_deliveries(&self) -> Vec<EventDelivery> {
        poller::lock(&self.latest).deliveries.clone()
    }

    pub fn latest_source(&self) -> Option<&Source> {
        self.latest_source.as_ref()
    }

    pub fn is_project_configuration_complete(&self) -> bool {
        storage::read_flag(self.store.as_ref(), storage::PROJECT_CONFIGURATION_COMPLETE)
    }

    pub fn view(&self) -> DashboardView {
        let latest = poller::lock(&self.latest).clone();
        DashboardView {
            apps: self.apps,
            events_sent: self.events_sent,
            series: self.series.clone(),
            frequency: self.frequency,
            reconcile: self.options.reconcile,
            range: self.range,
            selected_preset: self.selected_preset,
            is_loading: self.is_loading,
            has_events: latest.has_events,
            latest_source: self.latest_source.clone(),
            latest_deliveries: latest.deliveries,
            is_project_configuration_complete: self.is_project_configuration_complete(),
        }
    }

    // -- Internal --

    fn apply_summary(&mut self, summary: DashboardSummary) {
        self.apps = summary.apps;
        self.events_sent = summary.events_sent;
        self.samples = summary.samples();
        self.rebuild_series();
    }

    fn apply_sources(&mut self, page: Page<Source>) {
        self.latest_source = page.content.last().cloned();
    }

    fn rebuild_series(&mut self) {
        let buckets = self.buckets();
        self.series = series::reconcile(&self.samples, &buckets, self.frequency, self.options.reconcile);
    }
}

/// Flatten a scoped-thread join into the fetch result.
fn settle<T>(joined: thread::Result<Result<T>>, operation: &str) -> Result<T> {
    joined.unwrap_or_else(|_| Err(anyhow!("{operation} fetch panicked")))
}
