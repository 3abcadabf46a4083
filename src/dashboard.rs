//! Terminal rendering of the monitored sites.
//!
//! Everything here only reads the series store; rendering produces a
//! `String` so that the caller decides where it goes.

use chrono::{DateTime, Utc};
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use std::fmt::Write;
use std::time::Duration;

use crate::model::{Metric, Severity};
use crate::monitor::TickReport;
use crate::series::SeriesStore;
use crate::sites::Site;
use crate::staleness::{age_at, format_age, is_stale_at};
use crate::units::Kilowatts;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Sparkline width; longer histories show only their most recent points.
const CHART_WIDTH: usize = 60;

pub struct Dashboard<'a> {
    pub sites: &'a [Site],
    pub store: &'a SeriesStore,
    pub last_tick: Option<&'a TickReport>,
    pub stale_after: Duration,
    pub now: DateTime<Utc>,
}

impl Dashboard<'_> {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Realtime power dashboard - Fronius");
        let _ = writeln!(out, "{}\n", self.now.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out, "{}", self.power_table());

        for line in self.failure_lines() {
            let _ = writeln!(out, "{}", line);
        }

        for site in self.sites {
            if self.store.latest(&site.id).is_some() {
                let _ = writeln!(out, "\n{} - per-phase values", site.id);
                let _ = writeln!(out, "{}", self.phase_table(site));
            }
        }

        for metric in Metric::ALL {
            let _ = writeln!(out, "\n{}", metric);
            for site in self.sites {
                let history = self.store.history(&site.id, metric);
                let _ = writeln!(
                    out,
                    "  {:<10} {}",
                    site.id,
                    if history.is_empty() { "no data yet".to_string() } else { sparkline(&history) }
                );
            }
        }
        out
    }

    fn power_table(&self) -> Table {
        let mut table = new_table();
        table.set_header(vec!["Site", "Solar (P_PV)", "Grid (P_Grid)", "Load (P_Load)", "Rated", "Updated"]);

        for site in self.sites {
            let Some(reading) = self.store.latest(&site.id) else {
                table.add_row(vec![
                    Cell::new(&site.id).add_attribute(Attribute::Bold),
                    Cell::new("no data yet").add_attribute(Attribute::Dim),
                ]);
                continue;
            };

            let stale = is_stale_at(reading, self.stale_after, self.now);
            let power_cell = |power: Kilowatts| {
                let cell = Cell::new(power).set_alignment(CellAlignment::Right);
                if stale { cell.add_attribute(Attribute::Dim) } else { cell }
            };
            let rated = site
                .utilization_percent(reading.solar_power)
                .map(|percent| format!("{:.0}% of {:.0} kW", percent, site.max_power_kw))
                .unwrap_or_default();
            let age = format!("{} ago", format_age(age_at(reading, self.now)));

            table.add_row(vec![
                Cell::new(&site.id).add_attribute(Attribute::Bold),
                power_cell(reading.solar_power).fg(Color::Yellow),
                power_cell(reading.grid_power).fg(if reading.grid_power > Kilowatts::ZERO {
                    Color::Red
                } else {
                    Color::Green
                }),
                power_cell(reading.load_power),
                Cell::new(rated).add_attribute(Attribute::Dim),
                Cell::new(age).fg(if stale { Color::DarkYellow } else { Color::Reset }),
            ]);
        }
        table
    }

    fn phase_table(&self, site: &Site) -> Table {
        let mut table = new_table();
        table.set_header(vec!["Phase", "Current", "Voltage"]);
        if let Some(reading) = self.store.latest(&site.id) {
            for (i, (current, voltage)) in reading.currents.iter().zip(&reading.voltages).enumerate() {
                table.add_row(vec![
                    Cell::new(format!("L{}", i + 1)),
                    Cell::new(current).set_alignment(CellAlignment::Right),
                    Cell::new(voltage).set_alignment(CellAlignment::Right),
                ]);
            }
        }
        table
    }

    /// One line per site whose last fetch failed.
    fn failure_lines(&self) -> Vec<String> {
        let Some(report) = self.last_tick else {
            return Vec::new();
        };
        report
            .outcomes
            .iter()
            .filter_map(|outcome| {
                let err = outcome.error()?;
                let marker = match err.severity() {
                    Severity::Error => "✗ error",
                    Severity::Warning => "⚠ warning",
                };
                let kept = if self.store.latest(&outcome.site_id).is_some() {
                    " (showing last known values)"
                } else {
                    ""
                };
                Some(format!("{} {}: {}{}", marker, outcome.site_id, err, kept))
            })
            .collect()
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table
}

/// Render the most recent `CHART_WIDTH` points as block characters scaled
/// between the minimum and the maximum of those points.
pub fn sparkline(values: &[Kilowatts]) -> String {
    let window = &values[values.len().saturating_sub(CHART_WIDTH)..];
    let Some(last) = window.last() else {
        return String::new();
    };
    let min = window.iter().map(|v| v.0).fold(f64::INFINITY, f64::min);
    let max = window.iter().map(|v| v.0).fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    let top = SPARK_LEVELS.len() - 1;

    let bars: String = window
        .iter()
        .map(|v| {
            if span > 0.0 {
                let level = ((v.0 - min) / span * top as f64).round() as usize;
                SPARK_LEVELS[level.min(top)]
            } else {
                SPARK_LEVELS[top / 2]
            }
        })
        .collect();
    format!("{} {}", bars, last)
}
