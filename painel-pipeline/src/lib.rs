//! Aggregation and filtering pipeline for the integrated retail dashboard.
//!
//! Four semicolon-separated source files (stock snapshots, sales,
//! purchases, product catalog) are loaded once per session, snapshot-reduced
//! and left-joined into an immutable [`dataset::Dataset`]. Every user
//! interaction builds a fresh [`filter::FilterSpec`] and calls
//! [`dashboard::evaluate`], which derives the filtered views and computes
//! all headline metrics, ranked tables, monthly series and business-rule
//! recommendations the rendering layer displays.
//!
//! Load failures are the only errors in the system; everything after a
//! successful load is a pure, total function where "no data" is an empty
//! result.

pub mod aggregate;
pub mod catalog;
pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod loader;
pub mod rules;
pub mod snapshot;
pub mod types;
