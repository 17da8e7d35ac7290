//! Delivery analytics: calendar bucketing and chart series.
//!
//! - [`frequency`]: per-frequency calendar rules (labels, indices, clamp)
//! - [`range`]: filter windows and date presets
//! - [`buckets`]: deduplicated x-axis bucket generation
//! - [`series`]: merging backend samples into a chart series
//! - [`activity`]: JSONL log of background fetches and poller transitions

pub mod activity;
pub mod buckets;
pub mod frequency;
pub mod range;
pub mod series;

pub use buckets::Bucket;
pub use frequency::Frequency;
pub use range::{DatePreset, DateRange};
pub use series::{ReconcileMode, Sample, SeriesPoint};
