use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::journal::{
    entities::{Entry, Level},
    error::ValidationError,
};

use super::{
    aggregate::{
        bucket_by, hour_buckets, level_distribution, peak_bucket, Aggregate, BucketKey,
        Granularity, HourDomain,
    },
    streak::{compute_streak, ActiveDateSet, StreakState},
    trend::{classify, split_windows, TrendReport},
};

/// How an [InsightReport] slices the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsightConfig {
    granularity: Granularity,
    window: usize,
    hour_domain: HourDomain,
}

impl InsightConfig {
    /// `window` is the number of buckets in each of the two trend windows.
    pub fn new(
        granularity: Granularity,
        window: usize,
        hour_domain: HourDomain,
    ) -> Result<Self, ValidationError> {
        if window == 0 {
            return Err(ValidationError::EmptyWindow);
        }
        Ok(Self {
            granularity,
            window,
            hour_domain,
        })
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub count: usize,
    pub active_days: usize,
    pub average: Option<f64>,
}

/// Read-only summary handed to presentation code.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightReport {
    pub streak: StreakState,
    pub buckets: BTreeMap<BucketKey, Aggregate>,
    /// Last `window` bucket averages against the `window` before them. None without data,
    /// and always None for hour buckets, which are hours of the day rather than points in time.
    pub trend: Option<TrendReport>,
    pub totals: Totals,
    pub peak: Option<(BucketKey, f64)>,
}

/// Composes bucketing, trend and streak analysis over `entries`. Does no I/O.
///
/// `active_dates` decides which days count towards the streak.
#[instrument(skip(entries, active_dates))]
pub fn compute_insights(
    entries: &[Entry],
    active_dates: impl Fn(&[Entry]) -> ActiveDateSet,
    config: InsightConfig,
    today: NaiveDate,
) -> InsightReport {
    let buckets: BTreeMap<BucketKey, Aggregate> = match config.granularity {
        Granularity::Hour => hour_buckets(entries, config.hour_domain)
            .into_iter()
            .map(|(hour, aggregate)| (BucketKey::Hour(hour), aggregate))
            .collect(),
        granularity => bucket_by(entries, |v| granularity.key(v)),
    };

    let series = buckets
        .values()
        .filter_map(Aggregate::average)
        .collect::<Vec<_>>();
    let trend = match config.granularity {
        Granularity::Hour => None,
        _ => {
            let (recent, prior) = split_windows(&series, config.window);
            classify(recent, prior)
        }
    };

    let dates = active_dates(entries);
    let total = entries.iter().collect::<Aggregate>();

    debug!(
        "{} buckets, {} with data, trend {:?}",
        buckets.len(),
        series.len(),
        trend.map(|v| v.direction)
    );

    InsightReport {
        streak: compute_streak(&dates, today),
        peak: peak_bucket(&buckets),
        trend,
        totals: Totals {
            count: total.count,
            active_days: dates.len(),
            average: total.average(),
        },
        buckets,
    }
}

/// Lowest level that counts as a good day.
pub const GOOD_LEVEL: u8 = 4;

/// All-time numbers for a journal.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalStats {
    pub total: Aggregate,
    pub active_days: usize,
    /// Entries per active day. None before the first active day.
    pub entries_per_day: Option<f64>,
    pub distribution: BTreeMap<Level, usize>,
    pub streak: StreakState,
    /// Streak over days with a level of at least [GOOD_LEVEL].
    pub good_streak: StreakState,
}

pub fn compute_stats(entries: &[Entry], today: NaiveDate) -> JournalStats {
    let dates = ActiveDateSet::from_entries(entries);
    let good_dates = ActiveDateSet::from_entries_where(entries, |v| {
        v.level().is_some_and(|l| *l >= GOOD_LEVEL)
    });
    let total = entries.iter().collect::<Aggregate>();
    let active_days = dates.len();

    JournalStats {
        total,
        active_days,
        entries_per_day: (active_days > 0).then(|| total.count as f64 / active_days as f64),
        distribution: level_distribution(entries),
        streak: compute_streak(&dates, today),
        good_streak: compute_streak(&good_dates, today),
    }
}
