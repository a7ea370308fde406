//! Edge-case feeds read from CSV files and reported on without a database
//!
//! The fixture covers a store with no business hours, one on the default
//! timezone, an overnight shift, a store with a single poll, a store with a
//! malformed weekday and a store that was never polled.

use chrono::{DateTime, NaiveDateTime, Utc};

use store_uptime::{
    config::ReportConfig,
    models::{ingest::FeedSummary, store::StoreSnapshot},
    services::{
        ingest::{parse_feeds_blocking, FeedFiles},
        reports::{compute_snapshot, render_csv, ReportRun},
    },
    uptime::ReportRow,
};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/edge_cases");

fn utc(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap()
        .and_utc()
}

async fn run_fixture() -> ReportRun {
    let files = FeedFiles::from_path(FIXTURE).await.unwrap();
    let parsed = parse_feeds_blocking(files).await.unwrap();

    assert_eq!(parsed.summary.store_status, FeedSummary { accepted: 9, skipped: 1 });
    assert_eq!(parsed.summary.business_hours.accepted, 5);
    assert_eq!(parsed.summary.timezones.accepted, 5);

    let config = ReportConfig::default();
    let snapshot = StoreSnapshot {
        statuses: parsed.statuses,
        business_hours: parsed.business_hours,
        timezones: parsed.timezones,
    };
    // the wall clock is earlier than the latest poll, which becomes "now"
    compute_snapshot(snapshot, utc("2024-01-16 00:00:00"), config.settings().unwrap(), &config).await
}

fn row<'a>(run: &'a ReportRun, store_id: &str) -> &'a ReportRow {
    run.outcome
        .rows
        .iter()
        .find(|r| r.store_id == store_id)
        .unwrap_or_else(|| panic!("no row for {}", store_id))
}

#[tokio::test]
async fn test_edge_case_rows() {
    let run = run_fixture().await;
    assert_eq!(run.now, utc("2024-01-16 12:00:00"));

    let ids: Vec<&str> = run.outcome.rows.iter().map(|r| r.store_id.as_str()).collect();
    assert_eq!(ids, ["always_open", "default_tz", "overnight", "sparse"]);

    // no business hours: open around the clock
    let always = row(&run, "always_open");
    assert_eq!((always.uptime_last_hour, always.downtime_last_hour), (30.0, 30.0));
    assert_eq!((always.uptime_last_day, always.downtime_last_day), (0.5, 23.5));
    assert_eq!((always.uptime_last_week, always.downtime_last_week), (0.5, 167.5));

    // no timezone row: Monday 09:00-17:00 in America/Chicago
    let fallback = row(&run, "default_tz");
    assert_eq!((fallback.uptime_last_hour, fallback.downtime_last_hour), (0.0, 0.0));
    assert_eq!((fallback.uptime_last_day, fallback.downtime_last_day), (5.0, 3.0));
    assert_eq!((fallback.uptime_last_week, fallback.downtime_last_week), (5.0, 3.0));

    // Monday 22:00 -> Tuesday 06:00 in New York, polls out of order
    let overnight = row(&run, "overnight");
    assert_eq!(overnight.uptime_last_hour + overnight.downtime_last_hour, 0.0);
    assert_eq!((overnight.uptime_last_day, overnight.downtime_last_day), (6.0, 2.0));
    assert_eq!((overnight.uptime_last_week, overnight.downtime_last_week), (6.0, 2.0));

    // one poll four days back still decides the whole week
    let sparse = row(&run, "sparse");
    assert_eq!(sparse.downtime_last_hour, 60.0);
    assert_eq!(sparse.downtime_last_day, 12.0);
    assert_eq!(sparse.downtime_last_week, 12.0);
    assert_eq!(sparse.uptime_last_week, 0.0);
}

#[tokio::test]
async fn test_edge_case_failures_and_csv() {
    let run = run_fixture().await;

    assert_eq!(run.outcome.failures.len(), 1);
    assert_eq!(run.outcome.failures[0].store_id, "bad_hours");
    assert!(run.outcome.failures[0].message.contains("day_of_week 9"));
    assert!(run.outcome.rows.iter().all(|r| r.store_id != "no_polls"));

    let csv = String::from_utf8(render_csv(&run.outcome.rows).unwrap()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], ReportRow::CSV_HEADER);
    assert_eq!(lines[1], "always_open,30.0,0.5,0.5,30.0,23.5,167.5");
}
