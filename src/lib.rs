//! Live monitoring of Fronius solar inverters.
//!
//! Polls each configured site's power-flow and meter endpoints, normalizes
//! the telemetry into kilowatts, keeps a bounded per-site series in memory
//! and renders it as a terminal dashboard.

pub mod config;
pub mod dashboard;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod series;
pub mod sites;
pub mod staleness;
pub mod units;
pub mod verify;
