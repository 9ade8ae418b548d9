use std::{collections::BTreeMap, fmt::Display};

use clap::ValueEnum;
use tracing::trace;

use crate::{
    journal::{
        entities::{Entry, Level},
        error::ValidationError,
    },
    utils::time::{date_range, format_date_key, DateKey, WeekKey},
};

/// Count, sum and average over the levels of the entries in one bucket.
///
/// Entries without a level (text, completion) only add to `count`. The average is taken over
/// `measured`, the number of entries that had a level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub count: usize,
    pub measured: usize,
    pub sum: u64,
}

impl Aggregate {
    pub fn add(&mut self, entry: &Entry) {
        self.count += 1;
        if let Some(level) = entry.level() {
            self.measured += 1;
            self.sum += *level as u64;
        }
    }

    /// None when nothing measurable fell into the bucket. Callers render that as "no data".
    pub fn average(&self) -> Option<f64> {
        if self.measured == 0 {
            None
        } else {
            Some(self.sum as f64 / self.measured as f64)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl<'a> FromIterator<&'a Entry> for Aggregate {
    fn from_iter<T: IntoIterator<Item = &'a Entry>>(iter: T) -> Self {
        let mut aggregate = Aggregate::default();
        for entry in iter {
            aggregate.add(entry);
        }
        aggregate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    Day(DateKey),
    Hour(u32),
    Week(WeekKey),
}

impl Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketKey::Day(date) => write!(f, "{}", format_date_key(*date)),
            BucketKey::Hour(hour) => write!(f, "{hour:02}:00"),
            BucketKey::Week(week) => write!(f, "{week}"),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
pub enum Granularity {
    Day,
    Hour,
    Week,
}

impl Granularity {
    pub fn key(&self, entry: &Entry) -> Option<BucketKey> {
        match self {
            Granularity::Day => Some(BucketKey::Day(entry.date())),
            Granularity::Hour => entry.hour().map(BucketKey::Hour),
            Granularity::Week => Some(BucketKey::Week(WeekKey::of(entry.date()))),
        }
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Granularity::Day => write!(f, "day"),
            Granularity::Hour => write!(f, "hour"),
            Granularity::Week => write!(f, "week"),
        }
    }
}

/// Inclusive range of hours of day that hour bucketing reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourDomain {
    start: u32,
    end: u32,
}

impl HourDomain {
    pub const FULL_DAY: HourDomain = HourDomain { start: 0, end: 23 };
    pub const WAKING: HourDomain = HourDomain { start: 6, end: 23 };

    pub fn new(start: u32, end: u32) -> Result<Self, ValidationError> {
        if start <= end && end <= 23 {
            Ok(Self { start, end })
        } else {
            Err(ValidationError::InvalidHourDomain { start, end })
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn contains(&self, hour: u32) -> bool {
        (self.start..=self.end).contains(&hour)
    }

    pub fn hours(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

/// Groups entries by whatever `key_fn` extracts. Entries it returns `None` for are skipped.
pub fn bucket_by<'a, K: Ord>(
    entries: impl IntoIterator<Item = &'a Entry>,
    key_fn: impl Fn(&Entry) -> Option<K>,
) -> BTreeMap<K, Aggregate> {
    let mut map = BTreeMap::<K, Aggregate>::new();
    for entry in entries {
        if let Some(key) = key_fn(entry) {
            map.entry(key).or_default().add(entry);
        }
    }
    map
}

/// Buckets by hour of day. Every hour of `domain` is present, entries outside of it are dropped.
pub fn hour_buckets<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
    domain: HourDomain,
) -> BTreeMap<u32, Aggregate> {
    let mut map = domain
        .hours()
        .map(|hour| (hour, Aggregate::default()))
        .collect::<BTreeMap<_, _>>();
    for entry in entries {
        match entry.hour() {
            Some(hour) if domain.contains(hour) => map.entry(hour).or_default().add(entry),
            hour => trace!("Dropping entry at hour {hour:?} outside of {domain:?}"),
        }
    }
    map
}

/// One aggregate per calendar day from `from` to `to` inclusive, empty days included.
pub fn day_series<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
    from: DateKey,
    to: DateKey,
) -> Vec<(DateKey, Aggregate)> {
    let mut by_day = bucket_by(entries, |v| Some(v.date()));
    date_range(from, to)
        .map(|day| (day, by_day.remove(&day).unwrap_or_default()))
        .collect()
}

/// Number of entries per level, every level present.
pub fn level_distribution<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
) -> BTreeMap<Level, usize> {
    let mut map = Level::all().map(|v| (v, 0)).collect::<BTreeMap<_, _>>();
    for level in entries.into_iter().filter_map(|v| v.level()) {
        *map.entry(level).or_default() += 1;
    }
    map
}

/// Bucket with the highest average. Ties resolve to the earliest key.
pub fn peak_bucket<K: Copy>(buckets: &BTreeMap<K, Aggregate>) -> Option<(K, f64)> {
    let mut peak: Option<(K, f64)> = None;
    for (key, aggregate) in buckets {
        let Some(average) = aggregate.average() else {
            continue;
        };
        match peak {
            Some((_, best)) if best >= average => {}
            _ => peak = Some((*key, average)),
        }
    }
    peak
}
