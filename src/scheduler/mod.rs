//! Publication slot helpers
//!
//! Scheduled items are published at a fixed local wall-clock time. These
//! helpers compute the next slot and the wait until it; the timer that fires
//! the publication lives outside this crate.

use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Default publication time (09:00 local wall clock)
pub fn default_slot() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Next occurrence of `at` in `tz` strictly after `now`
///
/// Rolls to the next day when today's slot has passed. A slot that falls in
/// a DST gap resolves to the first valid instant after it.
pub fn next_slot(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let local_today = now.with_timezone(&tz).date_naive();

    let mut day = local_today;
    loop {
        if let Some(slot) = resolve_local(day.and_time(at), tz) {
            if slot > now {
                return slot;
            }
        }
        day = match day.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => return now,
        };
    }
}

fn resolve_local(naive: chrono::NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return Some(dt.with_timezone(&Utc));
    }
    // Spring-forward gap: shift by an hour
    tz.from_local_datetime(&(naive + chrono::Duration::hours(1)))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Wait from `now` until `target`, zero if already due
pub fn delay_until(now: DateTime<Utc>, target: DateTime<Utc>) -> Duration {
    (target - now).to_std().unwrap_or(Duration::ZERO)
}

/// Parse an `HH:MM` slot
pub fn parse_slot(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}
