/// Site registry for the solar monitoring service.
///
/// Defines the inverters monitored by this service along with their base
/// address and rated capacity. The built-in registry mirrors the production
/// deployment; `config::Config` may replace it with sites read from TOML.
/// All other modules should reference sites from here rather than
/// hardcoding addresses.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::units::Kilowatts;

// ---------------------------------------------------------------------------
// Solar API paths
// ---------------------------------------------------------------------------

pub const POWER_FLOW_PATH: &str = "/solar_api/v1/GetPowerFlowRealtimeData.fcgi";
pub const METER_PATH: &str = "/solar_api/v1/GetMeterRealtimeData.cgi";

// ---------------------------------------------------------------------------
// Site metadata
// ---------------------------------------------------------------------------

/// A single monitored installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Short identifier shown on the dashboard, e.g. `NOVACAP`.
    pub id: String,
    /// Scheme and host of the inverter (or the tunnel in front of it).
    pub base_url: String,
    /// Rated maximum power. Informational only.
    pub max_power_kw: f64,
    #[serde(default)]
    pub description: String,
}

impl Site {
    pub fn new(id: &str, base_url: &str, max_power_kw: f64) -> Self {
        Self {
            id: id.to_string(),
            base_url: base_url.to_string(),
            max_power_kw,
            description: String::new(),
        }
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn power_flow_url(&self) -> String {
        format!("{}{}", self.base(), POWER_FLOW_PATH)
    }

    /// Meter URL without the `Scope=System` query, which the fetcher adds.
    pub fn meter_url(&self) -> String {
        format!("{}{}", self.base(), METER_PATH)
    }

    /// Solar output as a percentage of the rated maximum.
    ///
    /// Returns `None` when no positive rating is known.
    pub fn utilization_percent(&self, solar: Kilowatts) -> Option<f64> {
        if self.max_power_kw > 0.0 {
            Some(solar.0 / self.max_power_kw * 100.0)
        } else {
            None
        }
    }
}

/// One registry line: id, rating, address and the description when set.
impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10} {:>6.0} kW  {}", self.id, self.max_power_kw, self.base_url)?;
        if !self.description.is_empty() {
            write!(f, "  ({})", self.description)?;
        }
        Ok(())
    }
}

/// The installations monitored in production.
///
/// Both inverters sit behind public tunnels, so the addresses change whenever
/// a tunnel is recreated; deployments normally override them in `solmon.toml`.
pub fn default_sites() -> Vec<Site> {
    vec![
        Site {
            id: "NOVACAP".to_string(),
            base_url: "https://df8b-190-15-217-99.ngrok-free.app".to_string(),
            max_power_kw: 150.0,
            description: "NOVACAP rooftop plant".to_string(),
        },
        Site {
            id: "ALTIERI".to_string(),
            base_url: "https://c425-190-15-217-99.ngrok-free.app".to_string(),
            max_power_kw: 220.0,
            description: "ALTIERI rooftop plant".to_string(),
        },
    ]
}

/// Looks up a site by id. Returns `None` if not found.
pub fn find_site<'a>(sites: &'a [Site], id: &str) -> Option<&'a Site> {
    sites.iter().find(|s| s.id == id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_contains_both_plants() {
        let sites = default_sites();
        let ids: Vec<&str> = sites.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["NOVACAP", "ALTIERI"]);
    }

    #[test]
    fn test_default_registry_has_no_duplicate_ids() {
        let sites = default_sites();
        let mut seen = std::collections::HashSet::new();
        for site in &sites {
            assert!(seen.insert(&site.id), "duplicate site id '{}'", site.id);
        }
    }

    #[test]
    fn test_default_registry_uses_https_and_positive_ratings() {
        for site in default_sites() {
            assert!(
                site.base_url.starts_with("https://"),
                "site '{}' should be reached through its https tunnel",
                site.id
            );
            assert!(site.max_power_kw > 0.0, "site '{}' needs a rating", site.id);
        }
    }

    #[test]
    fn test_find_site_returns_correct_entry() {
        let sites = default_sites();
        let site = find_site(&sites, "ALTIERI").expect("ALTIERI should be in registry");
        assert_eq!(site.max_power_kw, 220.0);
        assert!(find_site(&sites, "UNKNOWN").is_none());
    }

    #[test]
    fn test_registry_line_includes_description() {
        let sites = default_sites();
        let line = find_site(&sites, "NOVACAP").unwrap().to_string();
        assert!(line.starts_with("NOVACAP       150 kW  https://"), "{}", line);
        assert!(line.ends_with("(NOVACAP rooftop plant)"), "{}", line);

        let bare = Site::new("LAB", "http://192.168.1.181", 10.0).to_string();
        assert_eq!(bare, "LAB            10 kW  http://192.168.1.181");
    }

    #[test]
    fn test_urls_tolerate_trailing_slash() {
        let site = Site::new("LAB", "http://192.168.1.181/", 10.0);
        assert_eq!(
            site.power_flow_url(),
            "http://192.168.1.181/solar_api/v1/GetPowerFlowRealtimeData.fcgi"
        );
        assert_eq!(
            site.meter_url(),
            "http://192.168.1.181/solar_api/v1/GetMeterRealtimeData.cgi"
        );
    }

    #[test]
    fn test_utilization_is_relative_to_rating() {
        let site = Site::new("LAB", "http://lab", 150.0);
        assert_eq!(site.utilization_percent(Kilowatts(75.0)), Some(50.0));

        let unrated = Site::new("LAB", "http://lab", 0.0);
        assert_eq!(unrated.utilization_percent(Kilowatts(75.0)), None);
    }
}
