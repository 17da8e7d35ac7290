//! HTTP client for the delivery backend.
//!
//! Uses the synchronous `ureq` client. Every call is bounded by the
//! configured timeout, so a stalled poll fetch thread ends after one request
//! budget.
//!
//! Routes are scoped to the active project:
//!
//! ```text
//! {base_url}/organisations/{org}/projects/{project}/dashboard/summary
//! {base_url}/organisations/{org}/projects/{project}/eventdeliveries
//! {base_url}/organisations/{org}/projects/{project}/sources
//! ```
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use super::DashboardBackend;
use super::models::{DashboardSummary, Envelope, EventDelivery, Page, Source, SummaryQuery};
use crate::config::schema::BackendConfig;

/// Synchronous backend client bound to one project.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    organisation_id: String,
    project_id: String,
    timeout: Duration,
}

impl HttpBackend {
    /// Build a client from the resolved config.
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            organisation_id: config.organisation_id.clone(),
            project_id: config.project_id.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// URL of a route under the active project.
    fn project_url(&self, route: &str) -> String {
        format!(
            "{}/organisations/{}/projects/{}/{}",
            self.base_url, self.organisation_id, self.project_id, route
        )
    }

    /// Check whether the backend answers for the active project.
    ///
    /// Uses a short timeout (5 s) so `hookdash health` doesn't stall.
    pub fn is_healthy(&self) -> bool {
        let url = format!(
            "{}/organisations/{}/projects/{}",
            self.base_url, self.organisation_id, self.project_id
        );
        ureq::get(&url)
            .timeout(Duration::from_secs(5))
            .call()
            .is_ok()
    }

    fn get<T: DeserializeOwned>(&self, route: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.project_url(route);

        let mut request = ureq::get(&url).timeout(self.timeout);
        for (key, value) in query {
            request = request.query(key, value);
        }

        let response = request
            .call()
            .with_context(|| format!("GET {route} failed"))?;

        let envelope: Envelope<T> = response
            .into_json()
            .with_context(|| format!("failed to parse {route} response"))?;

        Ok(envelope.data)
    }
}

impl DashboardBackend for HttpBackend {
    fn dashboard_summary(&self, query: &SummaryQuery) -> Result<DashboardSummary> {
        self.get(
            "dashboard/summary",
            &[
                ("startDate", query.start_date.as_str()),
                ("endDate", query.end_date.as_str()),
                ("type", query.frequency.as_str()),
            ],
        )
    }

    fn latest_event_deliveries(&self, page: u32) -> Result<Page<EventDelivery>> {
        let page = page.to_string();
        self.get(
            "eventdeliveries",
            &[("page", page.as_str()), ("sort", "DESC")],
        )
    }

    fn sources(&self) -> Result<Page<Source>> {
        self.get("sources", &[])
    }
}
