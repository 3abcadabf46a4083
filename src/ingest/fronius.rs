/// Fronius Solar API v1 client
///
/// Retrieves realtime power flow and smart-meter data from a Fronius
/// inverter (Datamanager / Gen24) and normalizes it into a
/// `NormalizedReading`.
///
/// API Documentation: Fronius Solar API V1 (42,0410,2012)
/// Power flow: GET /solar_api/v1/GetPowerFlowRealtimeData.fcgi
/// Meter:      GET /solar_api/v1/GetMeterRealtimeData.cgi?Scope=System
///
/// Each response is first decoded as generic JSON and only then mapped onto
/// the typed structures below. A body that is not JSON is a transport
/// failure; JSON with a missing or mistyped field is a schema failure.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::model::{Endpoint, FetchError, NormalizedReading, TransportKind};
use crate::sites::Site;
use crate::units::{Amperes, Kilowatts, Volts, Watts};

// ============================================================================
// Power Flow Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PowerFlowResponse {
    #[serde(rename = "Body")]
    pub body: PowerFlowBody,
}

#[derive(Debug, Deserialize)]
pub struct PowerFlowBody {
    #[serde(rename = "Data")]
    pub data: PowerFlowData,
}

#[derive(Debug, Deserialize)]
pub struct PowerFlowData {
    #[serde(rename = "Site")]
    pub site: PowerFlowSite,
}

/// Site-level aggregate power, in watts.
///
/// The inverter sends `null` for a component that is idle or not installed
/// (e.g. `P_PV` at night), which is read as zero. The keys themselves are
/// required.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PowerFlowSite {
    #[serde(rename = "P_PV", deserialize_with = "nullable_watts")]
    pub pv: Watts,
    #[serde(rename = "P_Grid", deserialize_with = "nullable_watts")]
    pub grid: Watts,
    #[serde(rename = "P_Load", deserialize_with = "nullable_watts")]
    pub load: Watts,
}

fn nullable_watts<'de, D>(deserializer: D) -> Result<Watts, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.map(Watts).unwrap_or(Watts::ZERO))
}

// ============================================================================
// Meter Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MeterResponse {
    #[serde(rename = "Body")]
    pub body: MeterBody,
}

#[derive(Debug, Deserialize)]
pub struct MeterBody {
    #[serde(rename = "Data")]
    pub data: MeterDevices,
}

/// `Data` is keyed by meter device index; only the primary meter is read.
#[derive(Debug, Deserialize)]
pub struct MeterDevices {
    #[serde(rename = "0")]
    pub primary: MeterPhases,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MeterPhases {
    #[serde(rename = "Current_AC_Phase_1")]
    pub current_phase_1: f64,
    #[serde(rename = "Current_AC_Phase_2")]
    pub current_phase_2: f64,
    #[serde(rename = "Current_AC_Phase_3")]
    pub current_phase_3: f64,
    #[serde(rename = "Voltage_AC_Phase_1")]
    pub voltage_phase_1: f64,
    #[serde(rename = "Voltage_AC_Phase_2")]
    pub voltage_phase_2: f64,
    #[serde(rename = "Voltage_AC_Phase_3")]
    pub voltage_phase_3: f64,
}

// ============================================================================
// Parsing and Normalization
// ============================================================================

/// Decode a response body, classifying the failure mode.
fn decode<T: DeserializeOwned>(endpoint: Endpoint, body: &str) -> Result<T, FetchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Transport {
            endpoint,
            kind: TransportKind::Body,
            message: e.to_string(),
        })?;

    serde_json::from_value(value).map_err(|e| FetchError::Schema {
        endpoint,
        message: e.to_string(),
    })
}

pub fn parse_power_flow(body: &str) -> Result<PowerFlowSite, FetchError> {
    decode::<PowerFlowResponse>(Endpoint::PowerFlow, body).map(|r| r.body.data.site)
}

pub fn parse_meter(body: &str) -> Result<MeterPhases, FetchError> {
    decode::<MeterResponse>(Endpoint::Meter, body).map(|r| r.body.data.primary)
}

/// Convert raw vendor values to display units.
///
/// Pure: identical inputs always produce identical readings apart from the
/// timestamp passed in.
pub fn normalize(
    power_flow: &PowerFlowSite,
    meter: &MeterPhases,
    timestamp: DateTime<Utc>,
) -> NormalizedReading {
    NormalizedReading {
        timestamp,
        solar_power: Kilowatts::from(power_flow.pv),
        grid_power: Kilowatts::from(power_flow.grid),
        load_power: Kilowatts::from(power_flow.load).abs(),
        currents: [
            Amperes(meter.current_phase_1),
            Amperes(meter.current_phase_2),
            Amperes(meter.current_phase_3),
        ],
        voltages: [
            Volts(meter.voltage_phase_1),
            Volts(meter.voltage_phase_2),
            Volts(meter.voltage_phase_3),
        ],
    }
}

// ============================================================================
// API Client
// ============================================================================

/// Blocking client for the two realtime endpoints.
///
/// One attempt per request, no retries.
pub struct FroniusClient {
    http: reqwest::blocking::Client,
}

impl FroniusClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    /// Fetch and normalize the current telemetry of one site.
    ///
    /// The power-flow request goes first; the meter is only queried once the
    /// power-flow payload has been accepted.
    #[instrument(skip_all, fields(site = %site.id))]
    pub fn fetch(&self, site: &Site) -> Result<NormalizedReading, FetchError> {
        let power_flow_body = self.get(Endpoint::PowerFlow, &site.power_flow_url(), &[])?;
        let power_flow = parse_power_flow(&power_flow_body)?;

        let meter_body = self.get(Endpoint::Meter, &site.meter_url(), &[("Scope", "System")])?;
        let meter = parse_meter(&meter_body)?;

        let reading = normalize(&power_flow, &meter, Utc::now());
        debug!(
            solar = %reading.solar_power,
            grid = %reading.grid_power,
            load = %reading.load_power,
            "fetched reading"
        );
        Ok(reading)
    }

    fn get(
        &self,
        endpoint: Endpoint,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .map_err(|e| transport_error(endpoint, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport {
                endpoint,
                kind: TransportKind::Status(status.as_u16()),
                message: status.canonical_reason().unwrap_or("unexpected status").to_string(),
            });
        }

        response.text().map_err(|e| transport_error(endpoint, &e))
    }
}

fn transport_error(endpoint: Endpoint, err: &reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        TransportKind::Timeout
    } else if err.is_connect() {
        TransportKind::Connect
    } else {
        TransportKind::Request
    };
    FetchError::Transport {
        endpoint,
        kind,
        message: err.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
