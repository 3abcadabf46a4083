/// Core data types for the solar monitoring service.
///
/// This module defines the shared domain model imported by all other modules:
/// the normalized reading, the chartable metrics and the fetch error taxonomy.
/// It contains no I/O.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::units::{Amperes, Kilowatts, Volts};

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// One successful poll of a site, converted to display units.
///
/// Power values are kilowatts; load power is always non-negative because the
/// inverter reports consumption as a negative flow. Currents and voltages are
/// copied from the meter verbatim, phase 1 first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedReading {
    pub timestamp: DateTime<Utc>,
    pub solar_power: Kilowatts,
    pub grid_power: Kilowatts,
    pub load_power: Kilowatts,
    pub currents: [Amperes; 3],
    pub voltages: [Volts; 3],
}

impl NormalizedReading {
    /// Projects the reading onto one chartable metric.
    pub fn power(&self, metric: Metric) -> Kilowatts {
        match metric {
            Metric::Solar => self.solar_power,
            Metric::Grid => self.grid_power,
            Metric::Load => self.load_power,
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Power metrics that can be charted across sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Solar,
    Grid,
    Load,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Solar, Metric::Grid, Metric::Load];

    /// Field name used by the Fronius power-flow payload.
    pub fn vendor_key(self) -> &'static str {
        match self {
            Metric::Solar => "P_PV",
            Metric::Grid => "P_Grid",
            Metric::Load => "P_Load",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Solar => "Solar generation",
            Metric::Grid => "Grid exchange",
            Metric::Load => "Total load",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.vendor_key())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Which of the two per-site requests a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    PowerFlow,
    Meter,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::PowerFlow => write!(f, "power-flow"),
            Endpoint::Meter => write!(f, "meter"),
        }
    }
}

/// Why a request never produced a usable JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// Connection refused, DNS failure, TLS failure.
    Connect,
    /// No response within the configured timeout.
    Timeout,
    /// Non-2xx HTTP status.
    Status(u16),
    /// A 2xx response whose body is not JSON (e.g. a tunnel error page).
    Body,
    /// Any other client-side request failure.
    Request,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Connect => write!(f, "connection failed"),
            TransportKind::Timeout => write!(f, "timed out"),
            TransportKind::Status(code) => write!(f, "HTTP {}", code),
            TransportKind::Body => write!(f, "response is not JSON"),
            TransportKind::Request => write!(f, "request failed"),
        }
    }
}

/// Errors that can arise when fetching one site's telemetry.
///
/// The two variants are deliberately coarse: `Transport` means the site is
/// unreachable, `Schema` means it answered with a payload shape we do not
/// understand (e.g. an API version mismatch).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("{endpoint} request {kind}: {message}")]
    Transport {
        endpoint: Endpoint,
        kind: TransportKind,
        message: String,
    },
    #[error("unexpected {endpoint} payload: {message}")]
    Schema { endpoint: Endpoint, message: String },
}

impl FetchError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            FetchError::Transport { endpoint, .. } | FetchError::Schema { endpoint, .. } => {
                *endpoint
            }
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, FetchError::Schema { .. })
    }

    /// How loudly the failure should be surfaced.
    pub fn severity(&self) -> Severity {
        match self {
            FetchError::Transport { .. } => Severity::Error,
            FetchError::Schema { .. } => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}
