use std::{collections::BTreeMap, fmt::Display, path::Path};

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, instrument};

use crate::{
    analysis::{
        aggregate::{day_series, hour_buckets, Aggregate, Granularity, HourDomain},
        insights::{compute_insights, compute_stats, InsightConfig, InsightReport, JournalStats},
        streak::{compute_streak, ActiveDateSet, ActivityDateSource, StreakState},
    },
    journal::{
        entities::{AppendPolicy, Entry, EntryValue, Journal, PayloadKind},
        error::{JournalError, ValidationError},
        storage::{JournalStorage, JsonJournalStorage},
    },
    utils::{
        clock::{local_today, Clock},
        time::{span_start, DateKey},
    },
};

/// Built-in trackers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerKind {
    Mood,
    Energy,
    Gratitude,
    Habit,
}

impl TrackerKind {
    pub fn profile(&self) -> TrackerProfile {
        match self {
            TrackerKind::Mood => TrackerProfile {
                name: "mood",
                payload: PayloadKind::Level,
                policy: AppendPolicy::ReplaceSameDay,
                cache_streak: false,
                hour_domain: HourDomain::FULL_DAY,
            },
            TrackerKind::Energy => TrackerProfile {
                name: "energy",
                payload: PayloadKind::Level,
                policy: AppendPolicy::AppendAlways,
                cache_streak: false,
                hour_domain: HourDomain::WAKING,
            },
            TrackerKind::Gratitude => TrackerProfile {
                name: "gratitude",
                payload: PayloadKind::Text,
                policy: AppendPolicy::AppendAlways,
                cache_streak: true,
                hour_domain: HourDomain::FULL_DAY,
            },
            TrackerKind::Habit => TrackerProfile {
                name: "habit",
                payload: PayloadKind::Completion,
                policy: AppendPolicy::ReplaceSameDay,
                cache_streak: true,
                hour_domain: HourDomain::FULL_DAY,
            },
        }
    }
}

impl Display for TrackerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.profile().name)
    }
}

/// Per tracker behaviour of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerProfile {
    pub name: &'static str,
    pub payload: PayloadKind,
    pub policy: AppendPolicy,
    /// Keep `streak`/`lastDate` in the journal file up to date on every append.
    pub cache_streak: bool,
    pub hour_domain: HourDomain,
}

impl TrackerProfile {
    pub fn file_name(&self) -> String {
        format!("{}.json", self.name)
    }
}

/// Facade the presentation layer talks to. Owns the storage of a single journal.
pub struct Tracker<S: JournalStorage> {
    storage: S,
    profile: TrackerProfile,
    clock: Box<dyn Clock>,
}

impl Tracker<JsonJournalStorage> {
    /// Tracker backed by `<dir>/<name>.json`.
    pub fn open(dir: &Path, kind: TrackerKind, clock: Box<dyn Clock>) -> Self {
        let profile = kind.profile();
        Tracker::new(
            JsonJournalStorage::new(dir.join(profile.file_name())),
            profile,
            clock,
        )
    }
}

impl<S: JournalStorage> Tracker<S> {
    pub fn new(storage: S, profile: TrackerProfile, clock: Box<dyn Clock>) -> Self {
        Self {
            storage,
            profile,
            clock,
        }
    }

    pub fn profile(&self) -> &TrackerProfile {
        &self.profile
    }

    pub fn today(&self) -> DateKey {
        local_today(self.clock.as_ref())
    }

    /// Current moment in the local offset.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.time().with_timezone(&self.clock.offset())
    }

    pub async fn journal(&self) -> Result<Journal, JournalError> {
        self.storage.load().await
    }

    /// Validates and persists a new entry stamped with the current time. Nothing is written when
    /// validation fails.
    #[instrument(skip(self, note), fields(tracker = self.profile.name))]
    pub async fn append_entry(
        &self,
        value: EntryValue,
        note: &str,
        policy: AppendPolicy,
    ) -> Result<Entry, JournalError> {
        if value.kind() != self.profile.payload {
            return Err(ValidationError::UnexpectedPayload {
                expected: self.profile.payload,
                found: value.kind(),
            }
            .into());
        }

        let entry = Entry::new(value, note, self.clock.time(), &self.clock.offset());
        let today = self.today();
        let cache_streak = self.profile.cache_streak;
        let appended = entry.clone();

        let journal = self
            .storage
            .update(move |journal| {
                let journal = journal.append(appended, policy);
                if !cache_streak {
                    return Ok(journal);
                }
                let state = compute_streak(&journal.active_dates()?, today);
                Ok(journal.with_streak_cache(state.current, state.last_active))
            })
            .await?;

        info!("Logged {} for {}", entry.value(), entry.date());
        debug!("Journal now holds {} entries", journal.len());
        Ok(entry)
    }

    /// Parses raw user input for this tracker's payload and appends it with the profile policy.
    pub async fn log(&self, raw: &str, note: &str) -> Result<Entry, JournalError> {
        let value = EntryValue::parse(self.profile.payload, raw)?;
        self.append_entry(value, note, self.profile.policy).await
    }

    /// Entries made between `from` and `to`, both inclusive.
    pub async fn query_range(
        &self,
        from: DateKey,
        to: DateKey,
    ) -> Result<Vec<Entry>, JournalError> {
        let journal = self.storage.load().await?;
        Ok(journal.range(from, to).cloned().collect())
    }

    /// Entries of the last `days` days, today included.
    pub async fn within_days(&self, days: u32) -> Result<Vec<Entry>, JournalError> {
        let to = self.today();
        self.query_range(span_start(to, days), to).await
    }

    pub async fn today_entries(&self) -> Result<Vec<Entry>, JournalError> {
        let today = self.today();
        self.query_range(today, today).await
    }

    /// Last `count` entries in insertion order.
    pub async fn recent(&self, count: usize) -> Result<Vec<Entry>, JournalError> {
        let journal = self.storage.load().await?;
        let entries = journal.entries();
        Ok(entries[entries.len().saturating_sub(count)..].to_vec())
    }

    pub async fn compute_insights(
        &self,
        granularity: Granularity,
        window: usize,
    ) -> Result<InsightReport, JournalError> {
        let config = InsightConfig::new(granularity, window, self.profile.hour_domain)?;
        let journal = self.storage.load().await?;
        Ok(compute_insights(
            journal.entries(),
            |v: &[Entry]| ActiveDateSet::from_entries(v),
            config,
            self.today(),
        ))
    }

    /// Streak over any activity source as seen from today.
    pub fn compute_streak(
        &self,
        source: &impl ActivityDateSource,
    ) -> Result<StreakState, JournalError> {
        Ok(compute_streak(&source.active_dates()?, self.today()))
    }

    /// Streak of this tracker's own journal.
    pub async fn streak(&self) -> Result<StreakState, JournalError> {
        let journal = self.storage.load().await?;
        self.compute_streak(&journal)
    }

    pub async fn stats(&self) -> Result<JournalStats, JournalError> {
        let journal = self.storage.load().await?;
        Ok(compute_stats(journal.entries(), self.today()))
    }

    /// Hour of day aggregates. `domain` defaults to the profile's hours.
    pub async fn hour_chart(
        &self,
        domain: Option<HourDomain>,
    ) -> Result<BTreeMap<u32, Aggregate>, JournalError> {
        let journal = self.storage.load().await?;
        Ok(hour_buckets(
            journal.entries(),
            domain.unwrap_or(self.profile.hour_domain),
        ))
    }

    /// One aggregate per day for the last `days` days, today included.
    pub async fn last_days(&self, days: u32) -> Result<Vec<(DateKey, Aggregate)>, JournalError> {
        let to = self.today();
        let from = span_start(to, days);
        let entries = self.query_range(from, to).await?;
        Ok(day_series(&entries, from, to))
    }
}
