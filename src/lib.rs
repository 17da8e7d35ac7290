//! hookdash: analytics engine for a webhook gateway's events dashboard.
//!
//! Turns a date range and a frequency into chart buckets, reconciles backend
//! samples onto them, and polls for the first deliveries of an incoming
//! project. The [`dashboard`] controller ties these together for the CLI and
//! the JSON API in [`web`].

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod storage;
pub mod web;
