//! Wall-clock fire time resolution.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Next occurrence of `fire` in `tz` strictly after `now`.
///
/// An ambiguous local time (DST fall-back) resolves to the earlier instant;
/// a nonexistent one (DST spring-forward gap) to the same time an hour later.
pub fn next_run_time(fire: NaiveTime, tz: Tz, now: DateTime<Utc>) -> DateTime<Tz> {
    let local_now = now.with_timezone(&tz);
    local_now
        .date_naive()
        .iter_days()
        .filter_map(|day| resolve_local(tz, day.and_time(fire)))
        .find(|candidate| *candidate > now)
        .unwrap_or(local_now)
}

fn resolve_local(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz.from_local_datetime(&(naive + Duration::hours(1))).earliest(),
    }
}

/// Display form used in notifications and `/next`.
pub fn format_run_time(at: &DateTime<Tz>) -> String {
    at.format("%Y-%m-%d %H:%M:%S %Z").to_string()
}
