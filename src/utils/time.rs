use std::fmt::Display;

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Calendar day identifier. Serialized as `YYYY-MM-DD` through chrono's serde support.
pub type DateKey = NaiveDate;

/// This is the standard way of converting a date to a string in daystreak.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

pub fn format_date_key(date: DateKey) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(value: &str) -> Option<DateKey> {
    NaiveDate::parse_from_str(value.trim(), DATE_KEY_FORMAT).ok()
}

/// Calendar date of `instant` as seen from `offset`.
pub fn date_key(instant: DateTime<Utc>, offset: &FixedOffset) -> DateKey {
    instant.with_timezone(offset).date_naive()
}

/// Wall clock time of `instant` as seen from `offset`, truncated to minutes.
pub fn local_time(instant: DateTime<Utc>, offset: &FixedOffset) -> NaiveTime {
    let time = instant.with_timezone(offset).time();
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// Signed number of days from `from` to `to`. Positive when `to` is later.
pub fn days_between(from: DateKey, to: DateKey) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// First day of a span of `days` days that ends on `to`. Clamped to the earliest representable
/// day, a zero day span is treated as one.
pub fn span_start(to: DateKey, days: u32) -> DateKey {
    to.checked_sub_days(Days::new(u64::from(days.max(1)) - 1))
        .unwrap_or(NaiveDate::MIN)
}

/// ISO-8601 week identifier, e.g. `2024-W22`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn of(date: DateKey) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

impl Display for WeekKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Returns an iterator of dates between start (inclusive) and end (inclusive).
pub fn date_range(start: DateKey, end: DateKey) -> impl Iterator<Item = DateKey> {
    std::iter::successors(Some(start), |current| current.succ_opt()).take_while(move |v| *v <= end)
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    use super::{
        date_key, date_range, days_between, local_time, parse_date_key, span_start, WeekKey,
    };

    const JUNE_1: NaiveDate = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    const JUNE_3: NaiveDate = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

    #[test]
    fn test_date_key_uses_offset() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 1, 23, 30, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let kyiv = FixedOffset::east_opt(3 * 3600).unwrap();
        let new_york = FixedOffset::west_opt(4 * 3600).unwrap();

        assert_eq!(date_key(instant, &utc), JUNE_1);
        assert_eq!(date_key(instant, &kyiv), JUNE_1.succ_opt().unwrap());
        assert_eq!(date_key(instant, &new_york), JUNE_1);
        assert_eq!(local_time(instant, &kyiv).to_string(), "02:30:00");
    }

    #[test]
    fn test_days_between_is_signed() {
        assert_eq!(days_between(JUNE_1, JUNE_3), 2);
        assert_eq!(days_between(JUNE_3, JUNE_1), -2);
        assert_eq!(days_between(JUNE_3, JUNE_3), 0);
    }

    #[test]
    fn test_days_between_crosses_month_and_leap_day() {
        let feb_28 = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let mar_1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(days_between(feb_28, mar_1), 2);
    }

    #[test]
    fn test_week_key_follows_iso_years() {
        // 2024-12-30 belongs to the first ISO week of 2025
        let date = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        assert_eq!(WeekKey::of(date).to_string(), "2025-W01");
        assert_eq!(WeekKey::of(JUNE_3).to_string(), "2024-W23");
    }

    #[test]
    fn test_date_range_inclusive() {
        let days = date_range(JUNE_1, JUNE_3).collect::<Vec<_>>();
        assert_eq!(days.len(), 3);
        assert_eq!(days[0], JUNE_1);
        assert_eq!(days[2], JUNE_3);
        assert_eq!(date_range(JUNE_3, JUNE_1).count(), 0);
    }

    #[test]
    fn test_span_start() {
        assert_eq!(span_start(JUNE_3, 3), JUNE_1);
        assert_eq!(span_start(JUNE_3, 1), JUNE_3);
        assert_eq!(span_start(JUNE_3, 0), JUNE_3);
        assert_eq!(span_start(JUNE_3, u32::MAX), NaiveDate::MIN);
    }

    #[test]
    fn test_parse_date_key() {
        assert_eq!(parse_date_key(" 2024-06-03 "), Some(JUNE_3));
        assert_eq!(parse_date_key("06/03/2024"), None);
    }
}
