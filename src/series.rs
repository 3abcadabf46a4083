/// In-memory time series of normalized readings, one per site.
///
/// The store is the only owner of accumulated readings. The presentation
/// layer reads it through `latest`, `history` and `readings`; `append` is the
/// only mutator and is called solely for successful fetches, so a series never
/// contains a point for a failed poll.
///
/// Retention is a per-site ring buffer. Once a site holds `capacity` readings,
/// each append evicts that site's oldest reading.

use std::collections::{BTreeMap, VecDeque};

use crate::model::{Metric, NormalizedReading};
use crate::units::Kilowatts;

#[derive(Debug, Default)]
pub struct SeriesStore {
    /// `None` keeps every reading for the lifetime of the process.
    capacity: Option<usize>,
    series: BTreeMap<String, VecDeque<NormalizedReading>>,
}

impl SeriesStore {
    /// A store that keeps at most `capacity` readings per site.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            series: BTreeMap::new(),
        }
    }

    /// A store that never evicts.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Adds `reading` to the end of the site's series.
    ///
    /// No deduplication or reordering is done: callers append in time order.
    pub fn append(&mut self, site_id: &str, reading: NormalizedReading) {
        let series = self.series.entry(site_id.to_string()).or_default();
        if let Some(capacity) = self.capacity {
            while series.len() >= capacity {
                series.pop_front();
            }
        }
        series.push_back(reading);
    }

    /// The most recently appended reading, or `None` if there is none yet.
    pub fn latest(&self, site_id: &str) -> Option<&NormalizedReading> {
        self.series.get(site_id).and_then(|s| s.back())
    }

    /// One metric across the retained series, oldest first.
    ///
    /// Different sites may return different lengths.
    pub fn history(&self, site_id: &str, metric: Metric) -> Vec<Kilowatts> {
        self.readings(site_id).map(|r| r.power(metric)).collect()
    }

    pub fn readings(&self, site_id: &str) -> impl Iterator<Item = &NormalizedReading> + '_ {
        self.series.get(site_id).into_iter().flatten()
    }

    pub fn len(&self, site_id: &str) -> usize {
        self.series.get(site_id).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, site_id: &str) -> bool {
        self.len(site_id) == 0
    }
}
