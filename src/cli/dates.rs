use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};
use now::DateTimeNow;

use crate::utils::time::{parse_date_key, span_start, DateKey};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Inclusive range of days to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub from: DateKey,
    pub to: DateKey,
}

/// Days covered when `--from` is left out.
pub const DEFAULT_RANGE_DAYS: u32 = 7;

/// Resolves user supplied bounds such as "last monday", "3 days ago" or "2024-06-01" into days.
/// A missing `to` is today, a missing `from` is a week before `to`.
pub fn parse_day_range(
    from: Option<&str>,
    to: Option<&str>,
    date_style: DateStyle,
    now: DateTime<FixedOffset>,
) -> Result<DayRange> {
    let to = match to {
        Some(value) => parse_day(value, date_style, now, "end")?,
        None => now.date_naive(),
    };
    let from = match from {
        Some(value) => parse_day(value, date_style, now, "start")?,
        None => span_start(to, DEFAULT_RANGE_DAYS),
    };
    if from > to {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Range start {from} is after its end {to}"),
            )
            .into());
    }
    Ok(DayRange { from, to })
}

fn parse_day(
    value: &str,
    date_style: DateStyle,
    now: DateTime<FixedOffset>,
    bound: &str,
) -> Result<DateKey> {
    if let Some(date) = parse_date_key(value) {
        return Ok(date);
    }
    match parse_date_string(value, now, date_style.into()) {
        Ok(v) => Ok(v.beginning_of_day().date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {bound} date {e}"),
            )
            .into()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

    use super::{parse_day_range, DateStyle, DayRange};

    fn now() -> DateTime<FixedOffset> {
        // Wednesday
        FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 5, 18, 30, 0)
            .unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[test]
    fn test_defaults_to_last_week() {
        let range = parse_day_range(None, None, DateStyle::Uk, now()).unwrap();
        assert_eq!(
            range,
            DayRange {
                from: NaiveDate::from_ymd_opt(2024, 5, 30).unwrap(),
                to: date(5)
            }
        );
    }

    #[test]
    fn test_iso_and_relative_bounds() {
        let range =
            parse_day_range(Some("2024-06-01"), Some("yesterday"), DateStyle::Uk, now()).unwrap();
        assert_eq!(range, DayRange { from: date(1), to: date(4) });
    }

    #[test]
    fn test_dialects() {
        let uk = parse_day_range(Some("02/06/2024"), None, DateStyle::Uk, now()).unwrap();
        let us = parse_day_range(Some("06/02/2024"), None, DateStyle::Us, now()).unwrap();
        assert_eq!(uk.from, date(2));
        assert_eq!(us.from, date(2));
    }

    #[test]
    fn test_rejects_garbage_and_inverted_ranges() {
        assert!(parse_day_range(Some("whenever"), None, DateStyle::Uk, now()).is_err());
        assert!(
            parse_day_range(Some("2024-06-05"), Some("2024-06-01"), DateStyle::Uk, now()).is_err()
        );
    }
}
