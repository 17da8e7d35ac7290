//! Chart bucket generation.
//!
//! Turns a filter window and a [`Frequency`] into the ordered x-axis ticks of
//! the delivery chart. The window is first widened to at least
//! [`CLAMP_WINDOW`](super::frequency::CLAMP_WINDOW) periods ending at the
//! filter's end day, then walked one calendar day at a time. Every day is
//! labelled with its period label and collapsed into the bucket carrying that
//! label, so coarse frequencies still step daily.
//!
//! Widening means the first bucket can precede the filter's start. A yearly
//! filter of four years is still rendered as thirty years back from its end.
use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::frequency::Frequency;
use super::range::DateRange;

/// One x-axis tick: a period label plus the period ordinal it was last seen with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub index: i32,
}

// ---------------------------------------------------------------------------
// Ordered label map
// ---------------------------------------------------------------------------

/// Buckets keyed by label, iterated in first-insertion order.
///
/// Re-inserting an existing label overwrites its index in place.
#[derive(Debug, Default)]
struct LabelMap {
    positions: HashMap<String, usize>,
    buckets: Vec<Bucket>,
}

impl LabelMap {
    fn upsert(&mut self, label: String, index: i32) {
        match self.positions.get(&label) {
            Some(&pos) => self.buckets[pos].index = index,
            None => {
                self.positions.insert(label.clone(), self.buckets.len());
                self.buckets.push(Bucket { label, index });
            }
        }
    }

    fn into_buckets(self) -> Vec<Bucket> {
        self.buckets
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// First day walked for a window ending at `end`.
///
/// Windows spanning fewer than the clamp width are widened to start exactly
/// `clamp_window` periods before `end`. A zero period difference (`end` one
/// period before `start`) keeps the requested start.
pub fn effective_start(start: NaiveDate, end: NaiveDate, frequency: Frequency) -> NaiveDate {
    let period_difference = frequency.periods_between(start, end) + 1;
    let window = frequency.clamp_window();

    if period_difference != 0 && period_difference < i64::from(window) {
        frequency.periods_before(end, window).unwrap_or(start)
    } else {
        start
    }
}

/// Build the deduplicated bucket sequence for a filter window.
///
/// An incomplete range yields no buckets. The result is a pure function of
/// its inputs.
pub fn generate(range: &DateRange, frequency: Frequency) -> Vec<Bucket> {
    let Some((start, end)) = range.bounds() else {
        return Vec::new();
    };

    let first = effective_start(start, end, frequency);
    let mut map = LabelMap::default();

    for day in first.iter_days().take_while(|day| *day <= end) {
        map.upsert(frequency.label(day), frequency.index_of(day));
    }

    map.into_buckets()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn label_map_keeps_first_position_and_last_index() {
        let mut map = LabelMap::default();
        map.upsert("a".to_string(), 1);
        map.upsert("b".to_string(), 2);
        map.upsert("a".to_string(), 3);

        let buckets = map.into_buckets();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0], Bucket { label: "a".to_string(), index: 3 });
        assert_eq!(buckets[1], Bucket { label: "b".to_string(), index: 2 });
    }

    #[test]
    fn narrow_window_is_widened() {
        assert_eq!(
            effective_start(d(2024, 1, 1), d(2024, 1, 5), Frequency::Daily),
            d(2023, 12, 6)
        );
        assert_eq!(
            effective_start(d(2023, 1, 1), d(2024, 1, 5), Frequency::Monthly),
            d(2021, 7, 5)
        );
    }

    #[test]
    fn wide_window_keeps_requested_start() {
        assert_eq!(
            effective_start(d(2023, 1, 1), d(2024, 1, 5), Frequency::Daily),
            d(2023, 1, 1)
        );
    }

    #[test]
    fn zero_period_difference_keeps_requested_start() {
        // end is exactly one day before start: periodsBetween = -1, +1 = 0.
        assert_eq!(
            effective_start(d(2024, 1, 6), d(2024, 1, 5), Frequency::Daily),
            d(2024, 1, 6)
        );
        assert!(generate(&DateRange::new(d(2024, 1, 6), d(2024, 1, 5)), Frequency::Daily).is_empty());
    }

    #[test]
    fn incomplete_range_yields_nothing() {
        let range = DateRange {
            start: None,
            end: Some(d(2024, 1, 5)),
        };
        assert!(generate(&range, Frequency::Daily).is_empty());
    }

    #[test]
    fn weekly_buckets_collapse_to_months() {
        let buckets = generate(&DateRange::new(d(2024, 6, 1), d(2024, 6, 30)), Frequency::Weekly);
        // 30 weeks back from 2024-06-30 is 2023-12-03.
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["2023-12", "2024-01", "2024-02", "2024-03", "2024-04", "2024-05", "2024-06"]
        );
        // Last day seen for June is Sunday 2024-06-30, ISO week 26.
        assert_eq!(buckets.last().unwrap().index, 26);
    }
}
