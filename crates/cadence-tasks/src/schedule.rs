use chrono::{DateTime, Datelike, Duration, NaiveTime, SubsecRound, TimeZone, Timelike, Utc};
use tracing::warn;

use crate::types::ScheduleInfo;

/// Layout of day-time literals: 24-hour `HH:MM`.
pub const TIME_LAYOUT: &str = "%H:%M";

/// Parse a day-time literal. Returns `None` for anything that is not a valid
/// 24-hour `HH:MM` time.
pub fn parse_time(literal: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(literal.trim(), TIME_LAYOUT).ok()
}

/// Drop sub-second precision; every persisted timestamp goes through here.
pub fn truncate_to_secs(t: DateTime<Utc>) -> DateTime<Utc> {
    t.trunc_subsecs(0)
}

/// Compute the next UTC execution time for `schedule` strictly *after* `from`.
///
/// Returns `None` when the stored descriptor is unusable (a day-time literal
/// that no longer parses).
pub fn compute_next_run(schedule: &ScheduleInfo, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match schedule {
        ScheduleInfo::Interval { unit, interval } => {
            let secs = i64::try_from(interval.saturating_mul(unit.as_secs())).ok()?;
            let next = from.checked_add_signed(Duration::try_seconds(secs)?)?;
            Some(truncate_to_secs(next))
        }

        ScheduleInfo::DayTime { day, time } => {
            let Some(at) = parse_time(time) else {
                warn!(%time, "unparseable day-time literal; next run will not be set");
                return None;
            };

            // Both sides use Monday-based numbering (0=Monday … 6=Sunday).
            let today_dow = from.weekday().num_days_from_monday() as i64;
            let target_dow = day.weekday().num_days_from_monday() as i64;
            let days_ahead = (target_dow - today_dow).rem_euclid(7);

            let candidate_day = from + Duration::days(days_ahead);
            let candidate = Utc
                .with_ymd_and_hms(
                    candidate_day.year(),
                    candidate_day.month(),
                    candidate_day.day(),
                    at.hour(),
                    at.minute(),
                    0,
                )
                .single()?;

            if candidate > from {
                Some(candidate)
            } else {
                // Today is the target day but the time has already passed.
                Some(candidate + Duration::days(7))
            }
        }
    }
}
