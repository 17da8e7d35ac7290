/// Chart bucket generation tests.
///
/// Covers the clamp window, label deduplication, index domains and the
/// presets that feed the generator.
use hookdash::analytics::buckets::{self, Bucket};
use hookdash::analytics::{DatePreset, DateRange, Frequency};

mod common;
use common::d;

fn labels(buckets: &[Bucket]) -> Vec<&str> {
    buckets.iter().map(|b| b.label.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Clamp window
// ---------------------------------------------------------------------------

#[test]
fn short_daily_range_is_widened_to_thirty_days_back() {
    let result = buckets::generate(&DateRange::new(d(2024, 1, 1), d(2024, 1, 5)), Frequency::Daily);

    assert_eq!(result.len(), 31);
    assert_eq!(result[0].label, "6th, Dec, 2023");
    assert_eq!(result[0].index, 340);
    assert_eq!(result[30].label, "5th, Jan, 2024");
    assert_eq!(result[30].index, 5);
    assert!(labels(&result).contains(&"31st, Dec, 2023"));
    assert!(labels(&result).contains(&"1st, Jan, 2024"));
}

#[test]
fn wide_yearly_range_is_kept() {
    let result = buckets::generate(&DateRange::new(d(1993, 1, 1), d(2023, 12, 31)), Frequency::Yearly);

    assert_eq!(result.len(), 31);
    assert_eq!(result.first().map(|b| b.label.as_str()), Some("1993"));
    assert_eq!(result.last().map(|b| b.label.as_str()), Some("2023"));
    assert!(result.iter().all(|b| b.label == b.index.to_string()));
}

#[test]
fn short_yearly_range_is_widened_thirty_years_back() {
    let result = buckets::generate(&DateRange::new(d(2020, 1, 1), d(2023, 12, 31)), Frequency::Yearly);

    assert_eq!(result.len(), 31);
    assert_eq!(result.first().map(|b| b.label.as_str()), Some("1993"));
    assert_eq!(result.last().map(|b| b.label.as_str()), Some("2023"));
    assert!(result.iter().all(|b| b.label == b.index.to_string()));
}

#[test]
fn short_weekly_range_starts_thirty_weeks_before_its_end() {
    let end = d(2024, 6, 30);
    let first = buckets::effective_start(d(2024, 6, 1), end, Frequency::Weekly);

    assert_eq!(first, d(2023, 12, 3));
    assert_eq!((end - first).num_days(), 30 * 7);
    assert_eq!(Frequency::Weekly.periods_between(first, end), 30);
}

#[test]
fn short_monthly_range_reaches_back_thirty_months() {
    let result = buckets::generate(&DateRange::new(d(2023, 1, 1), d(2024, 1, 5)), Frequency::Monthly);

    assert_eq!(result.len(), 31);
    assert_eq!(result[0].label, "Jul, 2021");
    assert_eq!(result[0].index, 7);
    assert_eq!(result[30].label, "Jan, 2024");
    assert_eq!(result[30].index, 1);
}

#[test]
fn range_at_clamp_width_is_not_widened() {
    // 30 days inclusive: Jan 1 .. Jan 30
    let result = buckets::generate(&DateRange::new(d(2024, 1, 1), d(2024, 1, 30)), Frequency::Daily);
    assert_eq!(result.len(), 30);
    assert_eq!(result[0].label, "1st, Jan, 2024");
}

#[test]
fn incomplete_range_yields_nothing() {
    let open = DateRange {
        start: None,
        end: Some(d(2024, 1, 5)),
    };
    for frequency in Frequency::ALL {
        assert!(buckets::generate(&open, frequency).is_empty());
        assert!(buckets::generate(&DateRange::empty(), frequency).is_empty());
    }
}

// ---------------------------------------------------------------------------
// Deduplication and indices
// ---------------------------------------------------------------------------

#[test]
fn labels_are_unique_for_every_frequency() {
    let range = DateRange::new(d(2022, 11, 15), d(2024, 2, 20));
    for frequency in Frequency::ALL {
        let result = buckets::generate(&range, frequency);
        let mut seen = std::collections::HashSet::new();
        assert!(
            result.iter().all(|b| seen.insert(b.label.clone())),
            "duplicate label for {frequency}"
        );
    }
}

#[test]
fn weekly_buckets_collapse_to_months() {
    let result = buckets::generate(&DateRange::new(d(2024, 6, 1), d(2024, 6, 30)), Frequency::Weekly);

    assert_eq!(
        labels(&result),
        vec!["2023-12", "2024-01", "2024-02", "2024-03", "2024-04", "2024-05", "2024-06"]
    );
    // Each label keeps the ISO week of its last day.
    assert_eq!(result[0].index, 52);
    assert_eq!(result[6].index, 26);
}

#[test]
fn indices_stay_in_their_domain() {
    let range = DateRange::new(d(2020, 1, 1), d(2024, 12, 31));

    for b in buckets::generate(&range, Frequency::Daily) {
        assert!((1..=366).contains(&b.index), "{} -> {}", b.label, b.index);
    }
    for b in buckets::generate(&range, Frequency::Weekly) {
        assert!((1..=53).contains(&b.index), "{} -> {}", b.label, b.index);
    }
    for b in buckets::generate(&range, Frequency::Monthly) {
        assert!((1..=12).contains(&b.index), "{} -> {}", b.label, b.index);
    }
}

#[test]
fn generation_is_idempotent() {
    let range = DateRange::new(d(2024, 2, 10), d(2024, 3, 2));
    for frequency in Frequency::ALL {
        assert_eq!(
            buckets::generate(&range, frequency),
            buckets::generate(&range, frequency)
        );
    }
}

#[test]
fn leap_day_is_labelled() {
    let result = buckets::generate(&DateRange::new(d(2024, 2, 1), d(2024, 3, 2)), Frequency::Daily);
    let leap = result.iter().find(|b| b.label == "29th, Feb, 2024");
    assert_eq!(leap.map(|b| b.index), Some(60));
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

#[test]
fn presets_resolve_against_today() {
    let today = d(2024, 3, 31);
    assert_eq!(DatePreset::LastYear.range(today), DateRange::new(d(2023, 3, 31), today));
    assert_eq!(DatePreset::LastMonth.range(today), DateRange::new(d(2024, 2, 29), today));
    assert_eq!(DatePreset::LastWeek.range(today), DateRange::new(d(2024, 3, 24), today));
    assert_eq!(
        DatePreset::Yesterday.range(today),
        DateRange::new(d(2024, 3, 30), d(2024, 3, 30))
    );
}

#[test]
fn yesterday_preset_widens_like_any_short_range() {
    let range = DatePreset::Yesterday.range(d(2024, 1, 6));
    let result = buckets::generate(&range, Frequency::Daily);
    assert_eq!(result.len(), 31);
    assert_eq!(result.last().map(|b| b.label.as_str()), Some("5th, Jan, 2024"));
}
