//! Delivery backend collaborator.
//!
//! [`DashboardBackend`] is the seam between the dashboard and the HTTP API
//! that serves delivery data. [`client::HttpBackend`] talks to the real
//! service; tests supply in-process implementations.

pub mod client;
pub mod models;

use anyhow::Result;

use models::{DashboardSummary, EventDelivery, Page, Source, SummaryQuery};

/// Read-only access to the delivery data the dashboard needs.
///
/// Implementations are shared between the controller and the poller thread.
pub trait DashboardBackend: Send + Sync {
    /// Counters and per-period samples for a filter window.
    fn dashboard_summary(&self, query: &SummaryQuery) -> Result<DashboardSummary>;

    /// One page of the most recent event deliveries, newest first.
    fn latest_event_deliveries(&self, page: u32) -> Result<Page<EventDelivery>>;

    /// Sources of the active project. The last one is the latest.
    fn sources(&self) -> Result<Page<Source>>;
}
