//! Filter strings sent to the summary endpoint.

use crate::analytics::{DateRange, Frequency};
use crate::api::models::SummaryQuery;

/// Time suffix appended to a start date.
pub const START_OF_DAY: &str = "T00:00:00";
/// Time suffix appended to an end date.
pub const END_OF_DAY: &str = "T23:59:59";

/// Format a range as `(startDate, endDate)` query strings.
///
/// Each present endpoint becomes `YYYY-MM-DD` plus a time suffix, either the
/// caller's or the start/end-of-day default. A missing endpoint becomes an
/// empty string.
pub fn filter_dates(
    range: &DateRange,
    start_time: Option<&str>,
    end_time: Option<&str>,
) -> (String, String) {
    let start = range
        .start
        .map(|date| format!("{}{}", date.format("%Y-%m-%d"), start_time.unwrap_or(START_OF_DAY)))
        .unwrap_or_default();
    let end = range
        .end
        .map(|date| format!("{}{}", date.format("%Y-%m-%d"), end_time.unwrap_or(END_OF_DAY)))
        .unwrap_or_default();
    (start, end)
}

/// Summary query for a range with whole-day bounds.
pub fn summary_query(range: &DateRange, frequency: Frequency) -> SummaryQuery {
    let (start_date, end_date) = filter_dates(range, None, None);
    SummaryQuery {
        start_date,
        end_date,
        frequency,
    }
}
