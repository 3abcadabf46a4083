//! Periodic polling of every configured site.
//!
//! One tick fetches all sites sequentially, appends the successful readings
//! to the series store and reports what happened to each site. A failure for
//! one site never stops the others or the loop.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::ingest::fronius::FroniusClient;
use crate::logging::{log_fetch_failure, log_tick_summary};
use crate::model::{FetchError, NormalizedReading};
use crate::series::SeriesStore;
use crate::sites::Site;

/// Anything that can produce a reading for a site.
pub trait TelemetrySource {
    fn fetch(&self, site: &Site) -> Result<NormalizedReading, FetchError>;
}

impl TelemetrySource for FroniusClient {
    fn fetch(&self, site: &Site) -> Result<NormalizedReading, FetchError> {
        FroniusClient::fetch(self, site)
    }
}

// ---------------------------------------------------------------------------
// Tick reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SiteStatus {
    Updated,
    Failed(FetchError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteOutcome {
    pub site_id: String,
    pub status: SiteStatus,
}

impl SiteOutcome {
    pub fn error(&self) -> Option<&FetchError> {
        match &self.status {
            SiteStatus::Failed(err) => Some(err),
            SiteStatus::Updated => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<SiteOutcome>,
}

impl TickReport {
    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status == SiteStatus::Updated).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.successful()
    }

    pub fn outcome(&self, site_id: &str) -> Option<&SiteOutcome> {
        self.outcomes.iter().find(|o| o.site_id == site_id)
    }
}

/// JSON shape printed by `once --json`.
#[derive(Debug, Serialize)]
pub struct SiteSnapshot<'a> {
    pub site_id: &'a str,
    pub reading: Option<&'a NormalizedReading>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct Monitor<S> {
    source: S,
    sites: Vec<Site>,
    store: SeriesStore,
}

impl<S: TelemetrySource> Monitor<S> {
    pub fn new(source: S, sites: Vec<Site>, store: SeriesStore) -> Self {
        Self { source, sites, store }
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    /// Poll every site once.
    #[instrument(skip_all)]
    pub fn tick(&mut self) -> TickReport {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(self.sites.len());

        for site in &self.sites {
            let status = match self.source.fetch(site) {
                Ok(reading) => {
                    self.store.append(&site.id, reading);
                    SiteStatus::Updated
                }
                Err(err) => {
                    log_fetch_failure(&site.id, &err);
                    SiteStatus::Failed(err)
                }
            };
            outcomes.push(SiteOutcome {
                site_id: site.id.clone(),
                status,
            });
        }

        let report = TickReport { started_at, outcomes };
        log_tick_summary(report.outcomes.len(), report.successful(), report.failed());
        report
    }

    /// Per-site latest reading plus the error from `report`, for JSON output.
    pub fn snapshot<'a>(&'a self, report: &TickReport) -> Vec<SiteSnapshot<'a>> {
        self.sites
            .iter()
            .map(|site| SiteSnapshot {
                site_id: &site.id,
                reading: self.store.latest(&site.id),
                error: report
                    .outcome(&site.id)
                    .and_then(SiteOutcome::error)
                    .map(ToString::to_string),
            })
            .collect()
    }

    /// Tick every `interval` until `max_ticks` ticks have run or `on_tick`
    /// breaks. Returns the number of ticks run.
    ///
    /// The interval is measured from the start of a tick, so a tick slower
    /// than the interval is followed immediately by the next one. Data errors
    /// never end the loop.
    pub fn run<F>(&mut self, interval: Duration, max_ticks: Option<u64>, mut on_tick: F) -> u64
    where
        F: FnMut(&Self, &TickReport) -> ControlFlow<()>,
    {
        let mut ticks = 0u64;
        let mut started = Instant::now();
        while max_ticks.is_none_or(|max| ticks < max) {
            if ticks > 0 {
                let remaining = interval.saturating_sub(started.elapsed());
                debug!(?remaining, "sleeping until next tick");
                std::thread::sleep(remaining);
            }

            started = Instant::now();
            let report = self.tick();
            ticks += 1;
            if on_tick(self, &report).is_break() {
                debug!(ticks, "stopped by caller");
                break;
            }
        }
        ticks
    }
}
