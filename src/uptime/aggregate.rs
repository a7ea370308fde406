//! Attribution of open-hours time to uptime and downtime

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{
    business_hours::{total_duration, OpenWindow},
    timeline::{StoreStatus, Timeline},
};

/// How open time is counted for a store that has no observation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoDataPolicy {
    /// Count it as downtime
    #[default]
    Downtime,
    /// Keep it apart in [`Tally::unknown`]
    Unknown,
}

/// Open-hours time split by status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub uptime: Duration,
    pub downtime: Duration,
    pub unknown: Duration,
}

impl Default for Tally {
    fn default() -> Self {
        Self {
            uptime: Duration::zero(),
            downtime: Duration::zero(),
            unknown: Duration::zero(),
        }
    }
}

impl Tally {
    pub fn total(&self) -> Duration {
        self.uptime + self.downtime + self.unknown
    }
}

/// Sum the overlap of each timeline segment with the open windows.
///
/// `windows` must be disjoint (as produced by `business_windows`) for the
/// totals to equal the open duration.
pub fn aggregate(timeline: &Timeline, windows: &[OpenWindow], policy: NoDataPolicy) -> Tally {
    let mut tally = Tally::default();

    let segments = match timeline {
        Timeline::NoData => {
            let open = total_duration(windows);
            match policy {
                NoDataPolicy::Downtime => tally.downtime = open,
                NoDataPolicy::Unknown => tally.unknown = open,
            }
            return tally;
        }
        Timeline::Segments(segments) => segments,
    };

    for segment in segments {
        let covered = windows
            .iter()
            .filter_map(|w| {
                let start = segment.start.max(w.start);
                let end = segment.end.min(w.end);
                (start < end).then(|| end - start)
            })
            .fold(Duration::zero(), |acc, d| acc + d);

        match segment.status {
            StoreStatus::Active => tally.uptime = tally.uptime + covered,
            StoreStatus::Inactive => tally.downtime = tally.downtime + covered,
        }
    }

    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uptime::timeline::{build_timeline, Segment, StatusObservation};
    use chrono::{DateTime, NaiveDateTime, Utc};

    fn utc(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
    }

    fn window(a: &str, b: &str) -> OpenWindow {
        OpenWindow { start: utc(a), end: utc(b) }
    }

    #[test]
    fn test_no_data_counts_as_downtime_by_default() {
        let windows = [window("2024-01-15 09:00:00", "2024-01-15 18:00:00")];
        let tally = aggregate(&Timeline::NoData, &windows, NoDataPolicy::default());
        assert_eq!(tally.uptime, Duration::zero());
        assert_eq!(tally.downtime, Duration::hours(9));
        assert_eq!(tally.unknown, Duration::zero());
    }

    #[test]
    fn test_no_data_unknown_bucket() {
        let windows = [window("2024-01-15 09:00:00", "2024-01-15 18:00:00")];
        let tally = aggregate(&Timeline::NoData, &windows, NoDataPolicy::Unknown);
        assert_eq!(tally.downtime, Duration::zero());
        assert_eq!(tally.unknown, Duration::hours(9));
    }

    #[test]
    fn test_overlap_with_several_windows() {
        let timeline = Timeline::Segments(vec![
            Segment {
                start: utc("2024-01-15 00:00:00"),
                end: utc("2024-01-15 12:00:00"),
                status: StoreStatus::Active,
            },
            Segment {
                start: utc("2024-01-15 12:00:00"),
                end: utc("2024-01-16 00:00:00"),
                status: StoreStatus::Inactive,
            },
        ]);
        let windows = [
            window("2024-01-15 08:00:00", "2024-01-15 10:00:00"),
            window("2024-01-15 11:00:00", "2024-01-15 14:00:00"),
            window("2024-01-15 20:00:00", "2024-01-15 21:30:00"),
        ];
        let tally = aggregate(&timeline, &windows, NoDataPolicy::Downtime);
        assert_eq!(tally.uptime, Duration::hours(3));
        assert_eq!(tally.downtime, Duration::minutes(210));
        assert_eq!(tally.total(), Duration::minutes(390));
    }

    #[test]
    fn test_no_windows_means_nothing_counted() {
        let start = utc("2024-01-15 00:00:00");
        let end = utc("2024-01-16 00:00:00");
        let timeline = build_timeline(
            &[StatusObservation {
                store_id: "store".to_string(),
                timestamp: utc("2024-01-15 06:00:00"),
                status: StoreStatus::Active,
            }],
            start,
            end,
        );
        assert_eq!(aggregate(&timeline, &[], NoDataPolicy::Downtime), Tally::default());
    }
}
