//! Per-store report rows over the trailing hour, day and week

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::{
    aggregate::{aggregate, NoDataPolicy, Tally},
    business_hours::{business_windows, BusinessHourRule, WeeklySchedule},
    error::{UptimeError, UptimeResult},
    timeline::{build_timeline, StatusObservation},
    timezone::parse_timezone,
};

/// Business-hour row as delivered by the feed, validated at report time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBusinessHours {
    pub day_of_week: i32,
    pub start_local: String,
    pub end_local: String,
}

/// Everything known about one store
#[derive(Debug, Clone, Default)]
pub struct StoreInput {
    pub store_id: String,
    pub observations: Vec<StatusObservation>,
    pub business_hours: Vec<RawBusinessHours>,
    /// IANA name; `None` or blank falls back to the default timezone
    pub timezone: Option<String>,
}

/// Report-wide settings shared by every store
#[derive(Debug, Clone, Copy)]
pub struct ReportSettings {
    pub default_timezone: Tz,
    pub no_data_policy: NoDataPolicy,
}

impl ReportSettings {
    pub fn new(default_timezone: &str, no_data_policy: NoDataPolicy) -> UptimeResult<Self> {
        if default_timezone.trim().is_empty() {
            return Err(UptimeError::Configuration(
                "default timezone is not configured".to_string(),
            ));
        }
        let default_timezone = default_timezone.trim().parse::<Tz>().map_err(|_| {
            UptimeError::Configuration(format!("unknown default timezone '{}'", default_timezone))
        })?;
        Ok(Self {
            default_timezone,
            no_data_policy,
        })
    }
}

/// The three reported ranges, all ending at the report anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingWindow {
    LastHour,
    LastDay,
    LastWeek,
}

impl TrailingWindow {
    pub const ALL: [TrailingWindow; 3] = [
        TrailingWindow::LastHour,
        TrailingWindow::LastDay,
        TrailingWindow::LastWeek,
    ];

    pub fn span(&self) -> Duration {
        match self {
            TrailingWindow::LastHour => Duration::hours(1),
            TrailingWindow::LastDay => Duration::days(1),
            TrailingWindow::LastWeek => Duration::days(7),
        }
    }

    /// Reported value of `d`: minutes for the hour window, hours otherwise
    pub fn express(&self, d: Duration) -> f64 {
        let seconds = d.num_milliseconds() as f64 / 1000.0;
        let value = match self {
            TrailingWindow::LastHour => seconds / 60.0,
            TrailingWindow::LastDay | TrailingWindow::LastWeek => seconds / 3600.0,
        };
        round2(value)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One line of the uptime report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub store_id: String,
    /// Minutes
    pub uptime_last_hour: f64,
    /// Hours
    pub uptime_last_day: f64,
    /// Hours
    pub uptime_last_week: f64,
    /// Minutes
    pub downtime_last_hour: f64,
    /// Hours
    pub downtime_last_day: f64,
    /// Hours
    pub downtime_last_week: f64,
}

impl ReportRow {
    pub const CSV_HEADER: &'static str = "store_id,uptime_last_hour,uptime_last_day,uptime_last_week,downtime_last_hour,downtime_last_day,downtime_last_week";
}

/// A store whose row could not be computed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StoreFailure {
    pub store_id: String,
    pub message: String,
}

/// Rows of every store that succeeded, plus the failures
#[derive(Debug, Clone, Default)]
pub struct ReportOutcome {
    pub rows: Vec<ReportRow>,
    pub failures: Vec<StoreFailure>,
}

/// Reference "now" of a report: the latest observation, unless the wall
/// clock is later.
pub fn report_anchor<'a>(
    observations: impl IntoIterator<Item = &'a StatusObservation>,
    wall_clock: DateTime<Utc>,
) -> DateTime<Utc> {
    observations
        .into_iter()
        .map(|o| o.timestamp)
        .max()
        .map_or(wall_clock, |latest| latest.max(wall_clock))
}

/// Build per-store inputs from flat feeds.
///
/// Only stores with at least one observation are returned, sorted by id.
pub fn group_by_store(
    observations: Vec<StatusObservation>,
    business_hours: Vec<(String, RawBusinessHours)>,
    timezones: Vec<(String, String)>,
) -> Vec<StoreInput> {
    let mut stores: BTreeMap<String, StoreInput> = BTreeMap::new();
    for observation in observations {
        stores
            .entry(observation.store_id.clone())
            .or_insert_with_key(|id| StoreInput {
                store_id: id.clone(),
                ..Default::default()
            })
            .observations
            .push(observation);
    }

    for (store_id, rule) in business_hours {
        if let Some(store) = stores.get_mut(&store_id) {
            store.business_hours.push(rule);
        }
    }

    for (store_id, tz_name) in timezones {
        if let Some(store) = stores.get_mut(&store_id) {
            store.timezone = Some(tz_name);
        }
    }

    stores.into_values().collect()
}

/// Compute the report row of one store
pub fn compute_store_report(
    input: &StoreInput,
    settings: &ReportSettings,
    now: DateTime<Utc>,
) -> UptimeResult<ReportRow> {
    let tz = match input.timezone.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => parse_timezone(&input.store_id, name)?,
        _ => settings.default_timezone,
    };

    let rules = input
        .business_hours
        .iter()
        .map(|r| BusinessHourRule::parse(&input.store_id, r.day_of_week, &r.start_local, &r.end_local))
        .collect::<UptimeResult<Vec<_>>>()?;
    let schedule = WeeklySchedule::new(rules);

    let [hour, day, week] = TrailingWindow::ALL.map(|window| {
        let start = now - window.span();
        let windows = business_windows(&schedule, &tz, start, now);
        let timeline = build_timeline(&input.observations, start, now);
        aggregate(&timeline, &windows, settings.no_data_policy)
    });

    Ok(build_row(&input.store_id, &hour, &day, &week))
}

fn build_row(store_id: &str, hour: &Tally, day: &Tally, week: &Tally) -> ReportRow {
    use TrailingWindow::*;

    ReportRow {
        store_id: store_id.to_string(),
        uptime_last_hour: LastHour.express(hour.uptime),
        uptime_last_day: LastDay.express(day.uptime),
        uptime_last_week: LastWeek.express(week.uptime),
        downtime_last_hour: LastHour.express(hour.downtime),
        downtime_last_day: LastDay.express(day.downtime),
        downtime_last_week: LastWeek.express(week.downtime),
    }
}

/// Compute every store; a failing store does not prevent the others
pub fn compute_full_report(
    stores: &[StoreInput],
    settings: &ReportSettings,
    now: DateTime<Utc>,
) -> ReportOutcome {
    let mut outcome = ReportOutcome::default();
    for store in stores {
        match compute_store_report(store, settings, now) {
            Ok(row) => outcome.rows.push(row),
            Err(e) => outcome.failures.push(StoreFailure {
                store_id: store.store_id.clone(),
                message: e.to_string(),
            }),
        }
    }
    outcome.rows.sort_by(|a, b| a.store_id.cmp(&b.store_id));
    outcome
}
