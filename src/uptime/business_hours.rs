//! Business-hour rules and open-window generation

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use super::{
    error::{UptimeError, UptimeResult},
    timezone::{local_midnight_utc, local_to_utc, utc_to_local},
};

/// Accepted time-of-day layouts, tried in order
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

/// One opening slot on a given local weekday.
///
/// `end_local <= start_local` marks an overnight slot that closes on the
/// following calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHourRule {
    pub day_of_week: Weekday,
    pub start_local: NaiveTime,
    pub end_local: NaiveTime,
}

impl BusinessHourRule {
    /// Build a rule from raw feed values (day 0 = Monday .. 6 = Sunday)
    pub fn parse(store_id: &str, day_of_week: i32, start: &str, end: &str) -> UptimeResult<Self> {
        let day_of_week = u8::try_from(day_of_week)
            .ok()
            .and_then(|d| Weekday::try_from(d).ok())
            .ok_or_else(|| {
                UptimeError::validation(
                    store_id,
                    format!("day_of_week {} is outside 0..=6", day_of_week),
                )
            })?;

        Ok(Self {
            day_of_week,
            start_local: parse_time_of_day(store_id, start)?,
            end_local: parse_time_of_day(store_id, end)?,
        })
    }

    pub fn is_overnight(&self) -> bool {
        self.end_local <= self.start_local
    }
}

fn parse_time_of_day(store_id: &str, value: &str) -> UptimeResult<NaiveTime> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| UptimeError::validation(store_id, format!("invalid time of day '{}'", value)))
}

/// A store's rules grouped by local weekday
#[derive(Debug, Clone, Default)]
pub struct WeeklySchedule {
    by_day: [Vec<BusinessHourRule>; 7],
}

impl WeeklySchedule {
    pub fn new(rules: impl IntoIterator<Item = BusinessHourRule>) -> Self {
        let mut schedule = Self::default();
        for rule in rules {
            schedule.by_day[rule.day_of_week.num_days_from_monday() as usize].push(rule);
        }
        schedule
    }

    /// A store without any rule is open around the clock
    pub fn is_always_open(&self) -> bool {
        self.by_day.iter().all(Vec::is_empty)
    }

    pub fn rules_for(&self, day: Weekday) -> &[BusinessHourRule] {
        &self.by_day[day.num_days_from_monday() as usize]
    }
}

/// Half-open UTC interval `[start, end)` during which the store is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpenWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl OpenWindow {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Total open duration covered by `windows`
pub fn total_duration(windows: &[OpenWindow]) -> Duration {
    windows.iter().fold(Duration::zero(), |acc, w| acc + w.duration())
}

/// Open windows of a store intersecting `[start, end)`, sorted and disjoint.
pub fn business_windows(
    schedule: &WeeklySchedule,
    tz: &Tz,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<OpenWindow> {
    if start >= end {
        return Vec::new();
    }
    if schedule.is_always_open() {
        return vec![OpenWindow { start, end }];
    }

    let mut windows = Vec::new();

    // Begin one local day early so a slot opened the previous evening still
    // contributes its after-midnight part.
    let start_date = utc_to_local(tz, start).date();
    let mut date = start_date.pred_opt().unwrap_or(start_date);

    while local_midnight_utc(tz, date) < end {
        for rule in schedule.rules_for(date.weekday()) {
            let close_date = if rule.is_overnight() {
                match date.succ_opt() {
                    Some(next) => next,
                    None => continue,
                }
            } else {
                date
            };

            let open_utc = local_to_utc(tz, date.and_time(rule.start_local));
            let close_utc = local_to_utc(tz, close_date.and_time(rule.end_local));

            let window_start = open_utc.max(start);
            let window_end = close_utc.min(end);
            if window_start < window_end {
                windows.push(OpenWindow {
                    start: window_start,
                    end: window_end,
                });
            }
        }

        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    merge_windows(windows)
}

/// Sort windows and coalesce the ones that overlap or touch
pub fn merge_windows(mut windows: Vec<OpenWindow>) -> Vec<OpenWindow> {
    windows.sort_by_key(|w| (w.start, w.end));

    let mut merged: Vec<OpenWindow> = Vec::with_capacity(windows.len());
    for window in windows {
        match merged.last_mut() {
            Some(last) if window.start <= last.end => {
                last.end = last.end.max(window.end);
            }
            _ => merged.push(window),
        }
    }
    merged
}
