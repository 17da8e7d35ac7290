//! In-process backend used by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::NaiveDate;

use hookdash::api::DashboardBackend;
use hookdash::api::models::{
    DashboardSummary, EventDelivery, Page, SamplePeriod, SampleRecord, Source, SummaryQuery,
};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn delivery(uid: &str) -> EventDelivery {
    EventDelivery {
        uid: uid.to_string(),
        status: "Success".to_string(),
        ..EventDelivery::default()
    }
}

pub fn record(date: &str, index: i32, count: u64) -> SampleRecord {
    SampleRecord {
        count: Some(count),
        data: SamplePeriod {
            index,
            date: date.to_string(),
        },
    }
}

/// A deliveries response: `Some(n)` is a page of `n` deliveries, `None` fails.
pub type DeliveriesStep = Option<usize>;

/// Backend whose responses are scripted per call.
///
/// Deliveries steps are consumed in order; the last step repeats once the
/// script runs out. Without a script every deliveries fetch fails. Delays
/// are consumed the same way but do not repeat: once they run out, calls
/// answer immediately.
#[derive(Default)]
pub struct ScriptedBackend {
    pub summary: Mutex<Option<DashboardSummary>>,
    pub sources: Mutex<Option<Vec<Source>>>,
    deliveries: Mutex<VecDeque<DeliveriesStep>>,
    last_step: Mutex<DeliveriesStep>,
    delays: Mutex<VecDeque<Duration>>,
    pub summary_queries: Mutex<Vec<SummaryQuery>>,
    pub delivery_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_summary(self, summary: DashboardSummary) -> Self {
        *self.summary.lock().unwrap() = Some(summary);
        self
    }

    pub fn with_sources(self, sources: Vec<Source>) -> Self {
        *self.sources.lock().unwrap() = Some(sources);
        self
    }

    pub fn with_deliveries(self, steps: &[DeliveriesStep]) -> Self {
        *self.deliveries.lock().unwrap() = steps.iter().copied().collect();
        self
    }

    /// Hold the n-th deliveries call for the n-th delay before answering.
    pub fn with_delays(self, delays: &[Duration]) -> Self {
        *self.delays.lock().unwrap() = delays.iter().copied().collect();
        self
    }

    pub fn set_summary(&self, summary: Option<DashboardSummary>) {
        *self.summary.lock().unwrap() = summary;
    }

    pub fn summary_queries(&self) -> Vec<SummaryQuery> {
        self.summary_queries.lock().unwrap().clone()
    }

    pub fn delivery_calls(&self) -> usize {
        self.delivery_calls.load(Ordering::SeqCst)
    }
}

impl DashboardBackend for ScriptedBackend {
    fn dashboard_summary(&self, query: &SummaryQuery) -> Result<DashboardSummary> {
        self.summary_queries.lock().unwrap().push(query.clone());
        match self.summary.lock().unwrap().clone() {
            Some(summary) => Ok(summary),
            None => bail!("summary unavailable"),
        }
    }

    fn latest_event_deliveries(&self, _page: u32) -> Result<Page<EventDelivery>> {
        self.delivery_calls.fetch_add(1, Ordering::SeqCst);

        let (step, delay) = {
            let mut script = self.deliveries.lock().unwrap();
            let mut last = self.last_step.lock().unwrap();
            if let Some(step) = script.pop_front() {
                *last = step;
            }
            (*last, self.delays.lock().unwrap().pop_front())
        };

        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        match step {
            Some(n) => Ok(Page {
                content: (0..n).map(|i| delivery(&format!("d{i}"))).collect(),
                pagination: None,
            }),
            None => bail!("connection refused"),
        }
    }

    fn sources(&self) -> Result<Page<Source>> {
        match self.sources.lock().unwrap().clone() {
            Some(content) => Ok(Page {
                content,
                pagination: None,
            }),
            None => bail!("sources unavailable"),
        }
    }
}
