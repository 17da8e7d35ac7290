//! Chart series reconciliation.
//!
//! The backend reports delivery counts per calendar period, newest first, and
//! only for periods that saw traffic. Two ways of turning those samples into a
//! chart series are supported:
//!
//! - [`ReconcileMode::Direct`] (default): samples are put in chronological
//!   order and labelled one-to-one. Periods without a sample are absent, so
//!   the series is exactly as long as the backend response.
//! - [`ReconcileMode::ZeroFill`]: the bucket sequence drives the series.
//!   Each bucket takes the count of the sample with the same label and index,
//!   or zero.
//!
//! `Direct` is what the dashboard ships today. `ZeroFill` renders gaps as
//! explicit zeros and is selectable through `[dashboard] reconcile`.
use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::buckets::Bucket;
use super::frequency::Frequency;

/// A backend aggregate for one calendar period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub index: i32,
    pub date: NaiveDate,
    /// `None` when the backend omitted the count; read as zero.
    pub count: Option<u64>,
}

/// One chart point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: u64,
}

/// How samples are matched up with buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcileMode {
    /// One point per sample, chronological, no gap filling.
    #[default]
    Direct,
    /// One point per bucket, missing periods count as zero.
    ZeroFill,
}

impl fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::ZeroFill => write!(f, "zero-fill"),
        }
    }
}

impl FromStr for ReconcileMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "zero-fill" | "zero_fill" | "zerofill" => Ok(Self::ZeroFill),
            other => bail!("unknown reconcile mode '{other}' (expected direct or zero-fill)"),
        }
    }
}

/// Build the chart series from newest-first `samples`.
pub fn reconcile(
    samples: &[Sample],
    buckets: &[Bucket],
    frequency: Frequency,
    mode: ReconcileMode,
) -> Vec<SeriesPoint> {
    let chronological = samples.iter().rev();

    match mode {
        ReconcileMode::Direct => chronological
            .map(|sample| SeriesPoint {
                label: frequency.label(sample.date),
                value: sample.count.unwrap_or(0),
            })
            .collect(),
        ReconcileMode::ZeroFill => {
            let labelled: Vec<(String, &Sample)> = chronological
                .map(|sample| (frequency.label(sample.date), sample))
                .collect();

            buckets
                .iter()
                .map(|bucket| {
                    let value = labelled
                        .iter()
                        .find(|(label, sample)| *label == bucket.label && sample.index == bucket.index)
                        .and_then(|(_, sample)| sample.count)
                        .unwrap_or(0);
                    SeriesPoint {
                        label: bucket.label.clone(),
                        value,
                    }
                })
                .collect()
        }
    }
}

/// Parse the period date of a backend sample.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` and bare `YYYY-MM-DD`. Offsets
/// are dropped: the calendar day as written by the backend is kept.
pub fn parse_sample_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(date: &str, index: i32, count: Option<u64>) -> Sample {
        Sample {
            index,
            date: parse_sample_date(date).unwrap(),
            count,
        }
    }

    fn bucket(label: &str, index: i32) -> Bucket {
        Bucket {
            label: label.to_string(),
            index,
        }
    }

    #[test]
    fn direct_mode_reverses_and_ignores_buckets() {
        let samples = vec![
            sample("2024-03-02", 62, Some(5)),
            sample("2024-03-01", 61, Some(3)),
        ];
        let buckets = vec![bucket("29th, Feb, 2024", 60)];

        let series = reconcile(&samples, &buckets, Frequency::Daily, ReconcileMode::Direct);
        assert_eq!(
            series,
            vec![
                SeriesPoint { label: "1st, Mar, 2024".to_string(), value: 3 },
                SeriesPoint { label: "2nd, Mar, 2024".to_string(), value: 5 },
            ]
        );
    }

    #[test]
    fn missing_count_reads_as_zero() {
        let samples = vec![sample("2024-03-01", 61, None)];
        let series = reconcile(&samples, &[], Frequency::Daily, ReconcileMode::Direct);
        assert_eq!(series[0].value, 0);
    }

    #[test]
    fn zero_fill_follows_buckets() {
        let samples = vec![sample("2024-03-02", 62, Some(5))];
        let buckets = vec![
            bucket("1st, Mar, 2024", 61),
            bucket("2nd, Mar, 2024", 62),
            bucket("3rd, Mar, 2024", 63),
        ];

        let series = reconcile(&samples, &buckets, Frequency::Daily, ReconcileMode::ZeroFill);
        let values: Vec<u64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0, 5, 0]);
        assert_eq!(series[1].label, "2nd, Mar, 2024");
    }

    #[test]
    fn zero_fill_requires_matching_index() {
        let samples = vec![sample("2024-03-02", 9, Some(5))];
        let buckets = vec![bucket("Mar, 2024", 3)];
        let series = reconcile(&samples, &buckets, Frequency::Monthly, ReconcileMode::ZeroFill);
        assert_eq!(series, vec![SeriesPoint { label: "Mar, 2024".to_string(), value: 0 }]);
    }

    #[test]
    fn sample_dates_accept_several_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 2);
        assert_eq!(parse_sample_date("2024-03-02"), expected);
        assert_eq!(parse_sample_date("2024-03-02T00:00:00"), expected);
        assert_eq!(parse_sample_date("2024-03-02T10:30:00Z"), expected);
        assert_eq!(parse_sample_date("2024-03-02T10:30:00+01:00"), expected);
        assert_eq!(parse_sample_date("yesterday"), None);
    }

    #[test]
    fn reconcile_mode_parsing() {
        assert_eq!("direct".parse::<ReconcileMode>().unwrap(), ReconcileMode::Direct);
        assert_eq!("zero-fill".parse::<ReconcileMode>().unwrap(), ReconcileMode::ZeroFill);
        assert_eq!("ZERO_FILL".parse::<ReconcileMode>().unwrap(), ReconcileMode::ZeroFill);
        assert!("fill".parse::<ReconcileMode>().is_err());
    }
}
