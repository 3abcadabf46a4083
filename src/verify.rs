//! Endpoint Availability Probe
//!
//! Checks which Solar API v1 endpoints a Fronius inverter exposes. Firmware
//! generations differ (e.g. storage data only exists with a battery), so run
//! this against a new inverter before adding it to the site registry.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Endpoints probed on every host, relative to the inverter root.
pub const PROBE_ENDPOINTS: [&str; 6] = [
    "/solar_api/v1/GetPowerFlowRealtimeData.fcgi",
    "/solar_api/v1/GetInverterRealtimeData.cgi",
    "/solar_api/v1/GetMeterRealtimeData.cgi",
    "/solar_api/v1/GetStorageRealtimeData.cgi",
    "/solar_api/v1/GetDeviceList.cgi",
    "/solar_api/v1/GetSystemStatus.cgi",
];

// ============================================================================
// Probe Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub timestamp: String,
    pub host: String,
    pub results: Vec<EndpointProbe>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointProbe {
    pub endpoint: String,
    pub status: ProbeStatus,
    /// `Head.Status.Code` of the Fronius envelope; 0 means OK.
    pub api_status_code: Option<i64>,
    /// The decoded body of an available endpoint.
    pub sample: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ProbeStatus {
    Available,
    Unavailable(u16),
    Failed(String),
}

impl ProbeReport {
    pub fn available(&self) -> usize {
        self.results.iter().filter(|r| r.status == ProbeStatus::Available).count()
    }
}

// ============================================================================
// Probing
// ============================================================================

/// Accepts `192.168.1.181`, `inverter.local:8080` or a full URL.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

/// `Head.Status.Code` of a Fronius response envelope.
fn api_status_code(json: &serde_json::Value) -> Option<i64> {
    json.pointer("/Head/Status/Code").and_then(serde_json::Value::as_i64)
}

pub fn probe_endpoint(
    client: &reqwest::blocking::Client,
    base: &str,
    endpoint: &str,
) -> EndpointProbe {
    let url = format!("{}{}", base, endpoint);
    let (status, sample) = match client.get(&url).send() {
        Ok(response) if response.status() == reqwest::StatusCode::OK => {
            match response.json::<serde_json::Value>() {
                Ok(json) => (ProbeStatus::Available, Some(json)),
                Err(e) => (ProbeStatus::Failed(format!("Invalid JSON: {}", e)), None),
            }
        }
        Ok(response) => (ProbeStatus::Unavailable(response.status().as_u16()), None),
        Err(e) => (ProbeStatus::Failed(format!("Request failed: {}", e)), None),
    };

    debug!(endpoint, ?status, "probed");
    EndpointProbe {
        endpoint: endpoint.to_string(),
        status,
        api_status_code: sample.as_ref().and_then(api_status_code),
        sample,
    }
}

/// Probe every endpoint in `PROBE_ENDPOINTS` on one host.
///
/// Endpoints are independent: a failure never skips the rest.
#[instrument(skip(timeout))]
pub fn run_probe(host: &str, timeout: Duration) -> Result<ProbeReport, reqwest::Error> {
    let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
    let base = normalize_host(host);

    let results = PROBE_ENDPOINTS
        .iter()
        .map(|endpoint| probe_endpoint(&client, &base, endpoint))
        .collect();

    Ok(ProbeReport {
        timestamp: Utc::now().to_rfc3339(),
        host: base,
        results,
    })
}

pub fn print_summary(report: &ProbeReport) {
    println!("Probing {}", report.host);
    for result in &report.results {
        match &result.status {
            ProbeStatus::Available => {
                println!("  ✓ available: {}", result.endpoint);
                if let Some(code) = result.api_status_code.filter(|code| *code != 0) {
                    println!("    (Fronius status code {})", code);
                }
                if let Some(sample) = &result.sample {
                    println!("    {}", sample);
                }
            }
            ProbeStatus::Unavailable(code) => {
                println!("  ✗ not available: {} (HTTP {})", result.endpoint, code);
            }
            ProbeStatus::Failed(message) => {
                println!("  ✗ error probing {}: {}", result.endpoint, message);
            }
        }
    }
    println!("\n{}/{} endpoints available", report.available(), report.results.len());
}
