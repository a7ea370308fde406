//! Status observations and their interpolation into a gap-free timeline

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status reported by a store poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    Active,
    Inactive,
}

impl FromStr for StoreStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(StoreStatus::Active),
            "inactive" => Ok(StoreStatus::Inactive),
            other => Err(format!("unknown store status '{}'", other)),
        }
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StoreStatus::Active => "active",
            StoreStatus::Inactive => "inactive",
        };
        write!(f, "{}", label)
    }
}

/// A point-in-time status sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusObservation {
    pub store_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: StoreStatus,
}

/// Sub-interval `[start, end)` with a constant status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: StoreStatus,
}

/// Interpolated status over a range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timeline {
    /// The store has no observation at all
    NoData,
    /// Ordered segments that partition the requested range
    Segments(Vec<Segment>),
}

/// Interpolate `observations` over `[start, end)`.
///
/// Each sample's status holds until the next sample. The first sample is
/// extended back to `start` and the last one forward to `end`.
pub fn build_timeline(
    observations: &[StatusObservation],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Timeline {
    if observations.is_empty() {
        return Timeline::NoData;
    }

    let mut points: Vec<(DateTime<Utc>, StoreStatus)> = observations
        .iter()
        .map(|o| (o.timestamp, o.status))
        .collect();
    // stable: equal timestamps keep feed order, the later sample wins
    points.sort_by_key(|(ts, _)| *ts);

    let (first_ts, first_status) = points[0];
    if first_ts > start {
        points.insert(0, (start, first_status));
    }
    let (last_ts, last_status) = points[points.len() - 1];
    if last_ts < end {
        points.push((end, last_status));
    }

    let segments = points
        .windows(2)
        .filter_map(|pair| {
            let (t0, status) = pair[0];
            let (t1, _) = pair[1];
            let seg_start = t0.max(start);
            let seg_end = t1.min(end);
            (seg_start < seg_end).then_some(Segment {
                start: seg_start,
                end: seg_end,
                status,
            })
        })
        .collect();

    Timeline::Segments(segments)
}
