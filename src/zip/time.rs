//! DOS timestamp conversion.
//!
//! ZIP entries store their modification time as packed DOS date and time
//! fields without any zone information. Installers compare these against
//! file mtimes, so the conversion has to behave like `mktime(3)`: fields are
//! interpreted in the local zone, out-of-range fields (month 0, day 0,
//! hour 31, ...) roll over into the neighbouring unit, and DST is resolved by
//! the zone rules.

use chrono::{Days, Local, Months, NaiveDate, NaiveTime, TimeDelta, TimeZone};

/// Convert broken-down DOS fields to seconds since the Unix epoch.
pub(crate) fn local_timestamp(
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
) -> i64 {
    // DOS years are 1980..=2107, always representable
    let base = NaiveDate::from_ymd_opt(year as i32, 1, 1).unwrap_or_default();

    let date = base
        .checked_add_months(Months::new(month as u32))
        .and_then(|d| d.checked_sub_months(Months::new(1)))
        .and_then(|d| d.checked_add_days(Days::new(day as u64)))
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .unwrap_or(base);

    let seconds = hour as i64 * 3600 + minute as i64 * 60 + second as i64;
    let naive = date.and_time(NaiveTime::MIN) + TimeDelta::seconds(seconds);

    match Local.from_local_datetime(&naive).earliest() {
        Some(t) => t.timestamp(),
        // Inside a DST gap: mktime moves forward past it
        None => Local
            .from_local_datetime(&(naive + TimeDelta::hours(1)))
            .earliest()
            .map(|t| t.timestamp())
            .unwrap_or_else(|| naive.and_utc().timestamp()),
    }
}
