/// End-to-end tick tests: real HTTP fetcher, series store and dashboard.
///
/// Two stub inverters stand in for the production sites. One of them is
/// made unreachable or misbehaving to check that failures stay isolated to
/// their site and never produce a data point.

mod common;

use chrono::Utc;
use common::{METER, POWER_FLOW, Reply, StubServer, closed_base_url, healthy_inverter, meter_json};
use solmon_service::dashboard::Dashboard;
use solmon_service::ingest::fronius::FroniusClient;
use solmon_service::model::Metric;
use solmon_service::monitor::{Monitor, SiteStatus};
use solmon_service::series::SeriesStore;
use solmon_service::sites::Site;
use solmon_service::units::Kilowatts;
use std::ops::ControlFlow;
use std::time::Duration;

fn monitor(sites: Vec<Site>, store: SeriesStore) -> Monitor<FroniusClient> {
    let client = FroniusClient::new(Duration::from_millis(500)).expect("Failed to create HTTP client");
    Monitor::new(client, sites, store)
}

#[test]
fn test_unreachable_site_does_not_block_healthy_site() {
    let healthy = healthy_inverter();
    let sites = vec![
        Site::new("NOVACAP", &closed_base_url(), 150.0),
        Site::new("ALTIERI", &healthy.base_url, 220.0),
    ];
    let mut monitor = monitor(sites, SeriesStore::unbounded());

    let report = monitor.tick();

    assert_eq!(report.successful(), 1);
    assert!(report.outcome("NOVACAP").unwrap().error().unwrap().is_transport());
    assert_eq!(report.outcome("ALTIERI").unwrap().status, SiteStatus::Updated);
    assert!(monitor.store().latest("NOVACAP").is_none());
    assert_eq!(monitor.store().history("ALTIERI", Metric::Solar), vec![Kilowatts(5.23)]);
}

#[test]
fn test_history_length_matches_successful_ticks() {
    let healthy = healthy_inverter();
    let broken = StubServer::spawn(vec![
        (POWER_FLOW, Reply::Json(r#"{ "Body": { "Data": { "Site": {} } } }"#.to_string())),
        (METER, Reply::Json(meter_json())),
    ]);
    let sites = vec![
        Site::new("NOVACAP", &healthy.base_url, 150.0),
        Site::new("ALTIERI", &broken.base_url, 220.0),
    ];
    let mut monitor = monitor(sites, SeriesStore::unbounded());

    let mut reports = Vec::new();
    monitor.run(Duration::ZERO, Some(3), |_, report| {
        reports.push(report.clone());
        ControlFlow::Continue(())
    });

    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.successful() == 1 && r.failed() == 1));
    assert!(
        reports
            .iter()
            .all(|r| r.outcome("ALTIERI").unwrap().error().unwrap().is_schema())
    );
    assert_eq!(monitor.store().history("NOVACAP", Metric::Load).len(), 3);
    assert!(monitor.store().history("ALTIERI", Metric::Load).is_empty());
}

#[test]
fn test_bounded_store_retains_most_recent_ticks() {
    let healthy = healthy_inverter();
    let mut monitor = monitor(
        vec![Site::new("NOVACAP", &healthy.base_url, 150.0)],
        SeriesStore::with_capacity(2),
    );

    monitor.run(Duration::ZERO, Some(4), |_, _| ControlFlow::Continue(()));

    assert_eq!(monitor.store().len("NOVACAP"), 2);
}

#[test]
fn test_dashboard_renders_after_mixed_tick() {
    let healthy = healthy_inverter();
    let sites = vec![
        Site::new("NOVACAP", &healthy.base_url, 150.0),
        Site::new("ALTIERI", &closed_base_url(), 220.0),
    ];
    let mut monitor = monitor(sites, SeriesStore::unbounded());
    let report = monitor.tick();

    let out = Dashboard {
        sites: monitor.sites(),
        store: monitor.store(),
        last_tick: Some(&report),
        stale_after: Duration::from_secs(60),
        now: Utc::now(),
    }
    .render();

    assert!(out.contains("5.23 kW"), "{}", out);
    assert!(out.contains("✗ error ALTIERI"), "{}", out);
    assert!(out.contains("no data yet"), "{}", out);
}
