//! Local <-> UTC conversion for IANA timezones

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;

use super::error::{UptimeError, UptimeResult};

/// Longest DST gap we probe across when a local time does not exist.
const MAX_GAP_MINUTES: i64 = 180;

/// Parse an IANA timezone name for the given store
pub fn parse_timezone(store_id: &str, name: &str) -> UptimeResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| UptimeError::validation(store_id, format!("unknown timezone '{}'", name)))
}

/// Convert a wall-clock time in `tz` to UTC.
///
/// Ambiguous times (clocks going back) resolve to the earliest instant.
/// Times inside a spring-forward gap resolve to the first instant after it.
pub fn local_to_utc(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            for minutes in 1..=MAX_GAP_MINUTES {
                if let Some(dt) = tz.from_local_datetime(&(local + Duration::minutes(minutes))).earliest() {
                    return dt.with_timezone(&Utc);
                }
            }
            // No real zone has a gap this long
            with_offset_of_previous_day(tz, local)
        }
    }
}

/// Interpret `local` with the offset `tz` had one day earlier
fn with_offset_of_previous_day(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    let offset = tz
        .offset_from_utc_datetime(&(local - Duration::days(1)))
        .fix()
        .local_minus_utc();
    Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(offset))))
}

/// Convert a UTC instant to the wall-clock time in `tz`
pub fn utc_to_local(tz: &Tz, instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(tz).naive_local()
}

/// UTC instant of local midnight on `date`
pub fn local_midnight_utc(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    local_to_utc(tz, date.and_time(NaiveTime::MIN))
}
