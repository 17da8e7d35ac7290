//! Date ranges selected through the dashboard filter.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days covered by the range the dashboard opens with.
pub const DEFAULT_RANGE_DAYS: u64 = 30;

/// A user-selected filter window, inclusive on both ends.
///
/// Either endpoint may be unset (the filter was cleared). A range with a
/// missing endpoint is treated as empty: no buckets are generated and empty
/// strings are sent to the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// A range with neither endpoint set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The last `days` days up to and including `today`.
    pub fn last_days(today: NaiveDate, days: u64) -> Self {
        let start = today.checked_sub_days(Days::new(days)).unwrap_or(today);
        Self::new(start, today)
    }

    /// The range the dashboard shows before any filter is chosen.
    pub fn default_for(today: NaiveDate) -> Self {
        Self::last_days(today, DEFAULT_RANGE_DAYS)
    }

    /// Both endpoints, or `None` when either is missing.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.start?, self.end?))
    }

    pub fn is_empty(&self) -> bool {
        self.bounds().is_none()
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Shortcut ranges offered next to the date picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatePreset {
    LastYear,
    LastMonth,
    LastWeek,
    Yesterday,
}

impl DatePreset {
    pub const ALL: [DatePreset; 4] = [
        DatePreset::LastYear,
        DatePreset::LastMonth,
        DatePreset::LastWeek,
        DatePreset::Yesterday,
    ];

    /// Resolve the preset against the current day.
    pub fn range(&self, today: NaiveDate) -> DateRange {
        let start = match self {
            Self::LastYear => today.checked_sub_months(Months::new(12)),
            Self::LastMonth => today.checked_sub_months(Months::new(1)),
            Self::LastWeek => today.checked_sub_days(Days::new(7)),
            Self::Yesterday => {
                let yesterday = today.pred_opt().unwrap_or(today);
                return DateRange::new(yesterday, yesterday);
            }
        };
        DateRange::new(start.unwrap_or(today), today)
    }

    /// Label shown in the dropdown.
    pub fn title(&self) -> &'static str {
        match self {
            Self::LastYear => "Last Year",
            Self::LastMonth => "Last Month",
            Self::LastWeek => "Last Week",
            Self::Yesterday => "Yesterday",
        }
    }
}

impl fmt::Display for DatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for DatePreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "lastyear" => Ok(Self::LastYear),
            "lastmonth" => Ok(Self::LastMonth),
            "lastweek" => Ok(Self::LastWeek),
            "yesterday" => Ok(Self::Yesterday),
            _ => {
                let known: Vec<&str> = Self::ALL.iter().map(DatePreset::title).collect();
                bail!("unknown date preset '{s}' (expected one of: {})", known.join(", "))
            }
        }
    }
}
