//! Calendar semantics for each chart aggregation frequency.
//!
//! A [`Frequency`] decides how a calendar day is rendered as an x-axis label,
//! which ordinal identifies the period it falls in, how many whole periods
//! separate two days, and how far back the chart window is widened when a
//! filter is narrower than [`CLAMP_WINDOW`] periods.
//!
//! | Frequency | Label          | Index            | Step back          |
//! |-----------|----------------|------------------|--------------------|
//! | daily     | `3rd, Jan, 2024` | day of year    | 1 day              |
//! | weekly    | `2024-01`      | ISO week of year | 7 days             |
//! | monthly   | `Jan, 2024`    | month (1–12)     | 1 calendar month   |
//! | yearly    | `2024`         | calendar year    | 12 calendar months |
use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Minimum number of periods every generated chart window spans.
pub const CLAMP_WINDOW: u32 = 30;

// ---------------------------------------------------------------------------
// Frequency
// ---------------------------------------------------------------------------

/// Aggregation granularity selected by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Every frequency, in filter-dropdown order.
    pub const ALL: [Frequency; 4] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    /// Wire name, also sent to the backend as the summary `type` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Render a day as the x-axis label of the period it belongs to.
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            Self::Daily => format!("{}, {}", ordinal(date.day()), date.format("%b, %Y")),
            Self::Weekly => date.format("%Y-%m").to_string(),
            Self::Monthly => date.format("%b, %Y").to_string(),
            Self::Yearly => date.format("%Y").to_string(),
        }
    }

    /// Ordinal of the period a day falls in.
    ///
    /// Not monotonic across year boundaries: ISO week 1 can start in late
    /// December and day-of-year restarts every January.
    pub fn index_of(&self, date: NaiveDate) -> i32 {
        match self {
            Self::Daily => date.ordinal() as i32,
            Self::Weekly => date.iso_week().week() as i32,
            Self::Monthly => date.month() as i32,
            Self::Yearly => date.year(),
        }
    }

    /// Number of period boundaries crossed going from `start` to `end`.
    ///
    /// Zero when both days are in the same period, negative when `start` is
    /// in a later period than `end`.
    pub fn periods_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        match self {
            Self::Daily => (end - start).num_days(),
            Self::Weekly => (week_start(end) - week_start(start)).num_days() / 7,
            Self::Monthly => month_number(end) - month_number(start),
            Self::Yearly => i64::from(end.year()) - i64::from(start.year()),
        }
    }

    /// Step `periods` whole periods back from `date`.
    ///
    /// Month arithmetic clamps to the last day of a shorter target month.
    /// Returns `None` when the result leaves the supported calendar.
    pub fn periods_before(&self, date: NaiveDate, periods: u32) -> Option<NaiveDate> {
        match self {
            Self::Daily => date.checked_sub_days(Days::new(u64::from(periods))),
            Self::Weekly => date.checked_sub_days(Days::new(7 * u64::from(periods))),
            Self::Monthly => date.checked_sub_months(Months::new(periods)),
            Self::Yearly => date.checked_sub_months(Months::new(periods.checked_mul(12)?)),
        }
    }

    /// Minimum chart width in periods. Identical for every frequency.
    pub const fn clamp_window(&self) -> u32 {
        CLAMP_WINDOW
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "yearly" | "year" => Ok(Self::Yearly),
            other => bail!("unknown frequency '{other}' (expected daily, weekly, monthly or yearly)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Calendar helpers
// ---------------------------------------------------------------------------

/// English ordinal for a day of month: `1st`, `2nd`, `3rd`, `4th`, `11th`, `22nd`.
fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Monday of the ISO week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

fn month_number(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
