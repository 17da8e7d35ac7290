//! Wire types exchanged with the delivery backend.
//!
//! Every endpoint wraps its payload in an [`Envelope`]. Fields the dashboard
//! does not strictly need are defaulted so that a partial response still
//! renders.
use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::analytics::activity::{self, ActivityKind};
use crate::analytics::series::{Sample, parse_sample_date};
use crate::analytics::Frequency;

// ---------------------------------------------------------------------------
// Envelope and paging
// ---------------------------------------------------------------------------

/// `{ "status": true, "message": "...", "data": ... }`
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: T,
}

/// One page of a listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            pagination: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub prev: u64,
    pub next: u64,
    pub total_page: u64,
}

// ---------------------------------------------------------------------------
// Dashboard summary
// ---------------------------------------------------------------------------

/// Query for `GET .../dashboard/summary`.
///
/// Dates are preformatted filter strings, empty when no filter is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryQuery {
    pub start_date: String,
    pub end_date: String,
    pub frequency: Frequency,
}

/// Counters and per-period samples for the selected window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(default)]
    pub apps: u64,
    #[serde(default)]
    pub events_sent: u64,
    #[serde(default)]
    pub event_data: Vec<SampleRecord>,
}

impl DashboardSummary {
    /// Samples in backend order (newest first).
    ///
    /// Records whose date cannot be read are dropped and logged.
    pub fn samples(&self) -> Vec<Sample> {
        self.event_data
            .iter()
            .filter_map(|record| {
                let sample = record.to_sample();
                if sample.is_none() {
                    activity::record(
                        ActivityKind::SampleDropped,
                        "unreadable sample date",
                        Some(record.data.date.clone()),
                    );
                }
                sample
            })
            .collect()
    }
}

/// `{ "count": 5, "data": { "index": 62, "date": "2024-03-02" } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    #[serde(default)]
    pub count: Option<u64>,
    pub data: SamplePeriod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplePeriod {
    #[serde(default)]
    pub index: i32,
    pub date: String,
}

impl SampleRecord {
    pub fn to_sample(&self) -> Option<Sample> {
        Some(Sample {
            index: self.data.index,
            date: parse_sample_date(&self.data.date)?,
            count: self.count,
        })
    }
}

// ---------------------------------------------------------------------------
// Deliveries and sources
// ---------------------------------------------------------------------------

/// A single attempt to deliver an event to an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDelivery {
    pub uid: String,
    pub status: String,
    pub event_metadata: Option<EventMetadata>,
    pub metadata: Option<DeliveryMetadata>,
    pub created_at: Option<String>,
}

impl EventDelivery {
    pub fn event_type(&self) -> &str {
        self.event_metadata
            .as_ref()
            .map(|m| m.event_type.as_str())
            .unwrap_or("")
    }

    pub fn next_attempt(&self) -> Option<&str> {
        self.metadata.as_ref()?.next_send_time.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventMetadata {
    pub uid: String,
    pub event_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryMetadata {
    pub num_trials: u32,
    pub retry_limit: u32,
    pub next_send_time: Option<String>,
}

/// An ingest source of an incoming project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

// ---------------------------------------------------------------------------
// Project kind
// ---------------------------------------------------------------------------

/// Direction of traffic in a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    /// Receives webhooks from external providers.
    #[default]
    Incoming,
    /// Sends webhooks to subscribers.
    Outgoing,
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incoming => write!(f, "incoming"),
            Self::Outgoing => write!(f, "outgoing"),
        }
    }
}

impl FromStr for ProjectKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incoming" => Ok(Self::Incoming),
            "outgoing" => Ok(Self::Outgoing),
            other => bail!("unknown project kind '{other}' (expected incoming or outgoing)"),
        }
    }
}
