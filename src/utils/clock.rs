use chrono::{DateTime, FixedOffset, Local, Offset, Utc};

use super::time::{date_key, DateKey};

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    fn time(&self) -> DateTime<Utc>;

    /// Offset of the local time zone at the current moment.
    fn offset(&self) -> FixedOffset;
}

/// Local calendar day of [Clock::time].
pub fn local_today(clock: &(impl Clock + ?Sized)) -> DateKey {
    date_key(clock.time(), &clock.offset())
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        Local::now().offset().fix()
    }
}

/// Clock pinned to a single moment. Handy when a caller wants to evaluate streaks "as of" a
/// specific day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    time: DateTime<Utc>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(time: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { time, offset }
    }
}

impl Clock for FixedClock {
    fn time(&self) -> DateTime<Utc> {
        self.time
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    use super::{local_today, FixedClock, MockClock};

    #[test]
    fn test_today_is_local() {
        let mut clock = MockClock::new();
        clock
            .expect_time()
            .return_const(Utc.with_ymd_and_hms(2024, 6, 3, 22, 15, 0).unwrap());
        clock
            .expect_offset()
            .return_const(FixedOffset::east_opt(2 * 3600).unwrap());

        assert_eq!(local_today(&clock), NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 3, 1, 0, 0).unwrap(),
            FixedOffset::west_opt(3 * 3600).unwrap(),
        );
        assert_eq!(local_today(&clock), NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
    }
}
