use std::{fmt::Display, ops::Deref, str::FromStr};

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::utils::time::{date_key, local_time, DateKey};

use super::error::ValidationError;

/// Bounded ordinal rating, 1 (worst) to 5 (best). Used by mood and energy style trackers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new_opt(value: i64) -> Option<Level> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Some(Level(value as u8))
        } else {
            None
        }
    }

    pub fn all() -> impl Iterator<Item = Level> {
        (Self::MIN..=Self::MAX).map(Level)
    }
}

impl TryFrom<i64> for Level {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Level::new_opt(value).ok_or(ValidationError::LevelOutOfRange(value))
    }
}

impl From<Level> for u8 {
    fn from(value: Level) -> Self {
        value.0
    }
}

impl FromStr for Level {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let v = s
            .parse::<i64>()
            .map_err(|_| ValidationError::LevelNotNumeric(s.to_string()))?;
        Level::try_from(v)
    }
}

impl Deref for Level {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of payload a tracker records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Level,
    Text,
    Completion,
}

impl Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadKind::Level => write!(f, "level"),
            PayloadKind::Text => write!(f, "text"),
            PayloadKind::Completion => write!(f, "completion"),
        }
    }
}

/// Domain payload of a journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    Level(Level),
    Text(String),
    Completion(bool),
}

impl EntryValue {
    /// Validates raw user input for the given payload kind.
    pub fn parse(kind: PayloadKind, raw: &str) -> Result<EntryValue, ValidationError> {
        match kind {
            PayloadKind::Level => Ok(EntryValue::Level(raw.parse()?)),
            PayloadKind::Text => EntryValue::text(raw),
            PayloadKind::Completion => match raw.trim().to_lowercase().as_str() {
                "done" | "check" | "yes" | "y" | "true" | "1" => Ok(EntryValue::Completion(true)),
                "skip" | "uncheck" | "no" | "n" | "false" | "0" => {
                    Ok(EntryValue::Completion(false))
                }
                _ => Err(ValidationError::UnknownCompletion(raw.to_string())),
            },
        }
    }

    pub fn text(value: &str) -> Result<EntryValue, ValidationError> {
        let value = value.trim();
        if value.is_empty() {
            Err(ValidationError::EmptyText("text"))
        } else {
            Ok(EntryValue::Text(value.to_string()))
        }
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            EntryValue::Level(_) => PayloadKind::Level,
            EntryValue::Text(_) => PayloadKind::Text,
            EntryValue::Completion(_) => PayloadKind::Completion,
        }
    }
}

impl Display for EntryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryValue::Level(level) => write!(f, "{level}/{}", Level::MAX),
            EntryValue::Text(text) => write!(f, "{text}"),
            EntryValue::Completion(true) => write!(f, "done"),
            EntryValue::Completion(false) => write!(f, "skipped"),
        }
    }
}

/// A single timestamped journal record.
///
/// `date` and `time` are the local calendar day and wall clock time at the moment the entry was
/// created. They are fixed at creation and are what every bucketing and streak computation
/// reads, so an entry never moves to another day when the machine's time zone changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EntryRecord", into = "EntryRecord")]
pub struct Entry {
    timestamp: DateTime<Utc>,
    date: DateKey,
    time: Option<NaiveTime>,
    /// `time` exactly as it was stored. None when the key was absent.
    stored_time: Option<Value>,
    value: EntryValue,
    level_key: LevelKey,
    note: Option<String>,
    extra: Map<String, Value>,
}

/// Where a level lives in the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelKey {
    /// `"level": <int>`, or `"level": null` for entries without a level.
    Level,
    /// `"mood": <int>` as older mood journals write it.
    Mood,
    /// No level key at all.
    Absent,
}

const TIME_FORMAT: &str = "%H:%M";

impl Entry {
    pub fn new(
        value: EntryValue,
        note: impl Into<String>,
        timestamp: DateTime<Utc>,
        offset: &FixedOffset,
    ) -> Self {
        let time = local_time(timestamp, offset);
        Self {
            timestamp,
            date: date_key(timestamp, offset),
            time: Some(time),
            stored_time: Some(Value::String(time.format(TIME_FORMAT).to_string())),
            value,
            level_key: LevelKey::Level,
            note: Some(note.into().trim().to_string()),
            extra: Map::new(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn date(&self) -> DateKey {
        self.date
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    /// Local hour of day the entry was made at. Entries written without a time have none.
    pub fn hour(&self) -> Option<u32> {
        self.time.map(|v| v.hour())
    }

    pub fn value(&self) -> &EntryValue {
        &self.value
    }

    pub fn note(&self) -> &str {
        self.note.as_deref().unwrap_or_default()
    }

    pub fn level(&self) -> Option<Level> {
        match self.value {
            EntryValue::Level(level) => Some(level),
            _ => None,
        }
    }

    /// Whether the entry counts as activity for its day.
    pub fn is_active(&self) -> bool {
        match &self.value {
            EntryValue::Level(_) => true,
            EntryValue::Text(text) => !text.trim().is_empty(),
            EntryValue::Completion(done) => *done,
        }
    }
}

/// On-disk shape of an [Entry]. Unknown fields are carried along and optional keys are written
/// back the way they were read, so saving a loaded journal doesn't change what other tools wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryRecord {
    date: DateKey,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    time: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    level: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mood: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Tells a key holding `null` apart from a missing one, which `#[serde(default)]` maps to None.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn parse_stored_time(value: &Value) -> Result<Option<NaiveTime>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => NaiveTime::parse_from_str(s, TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map(Some)
            .map_err(|_| ValidationError::InvalidTime(s.clone())),
        other => Err(ValidationError::InvalidTime(other.to_string())),
    }
}

fn parse_stored_level(value: &Value) -> Result<Option<Level>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_i64() {
            Some(v) => Level::try_from(v).map(Some),
            None => Err(ValidationError::LevelNotNumeric(n.to_string())),
        },
        other => Err(ValidationError::LevelNotNumeric(other.to_string())),
    }
}

impl TryFrom<EntryRecord> for Entry {
    type Error = ValidationError;

    fn try_from(record: EntryRecord) -> Result<Self, Self::Error> {
        let time = match &record.time {
            Some(stored) => parse_stored_time(stored)?,
            None => None,
        };
        let level = match &record.level {
            Some(stored) => parse_stored_level(stored)?,
            None => None,
        };
        let mut extra = record.extra;
        let level_key = match (&record.level, record.mood) {
            (None, Some(_)) => LevelKey::Mood,
            (None, None) => LevelKey::Absent,
            (Some(_), mood) => {
                // Both keys present, `level` wins and `mood` is kept untouched
                if let Some(mood) = mood {
                    extra.insert("mood".into(), Value::from(*mood));
                }
                LevelKey::Level
            }
        };
        let mood = record.mood.filter(|_| level_key == LevelKey::Mood);

        let value = match (record.text, record.done, level.or(mood)) {
            (Some(text), _, _) => EntryValue::Text(text),
            (None, Some(done), _) => EntryValue::Completion(done),
            (None, None, Some(level)) => EntryValue::Level(level),
            (None, None, None) => return Err(ValidationError::EmptyText("entry payload")),
        };
        Ok(Entry {
            timestamp: record.timestamp,
            date: record.date,
            time,
            stored_time: record.time,
            value,
            level_key,
            note: record.note,
            extra,
        })
    }
}

impl From<Entry> for EntryRecord {
    fn from(entry: Entry) -> Self {
        let level = match (entry.level_key, entry.level()) {
            (LevelKey::Level, Some(level)) => Some(Value::from(*level)),
            (LevelKey::Level, None) => Some(Value::Null),
            (LevelKey::Mood | LevelKey::Absent, _) => None,
        };
        let mood = match entry.level_key {
            LevelKey::Mood => entry.level(),
            _ => None,
        };
        let (text, done) = match entry.value {
            EntryValue::Level(_) => (None, None),
            EntryValue::Text(text) => (Some(text), None),
            EntryValue::Completion(done) => (None, Some(done)),
        };
        EntryRecord {
            date: entry.date,
            time: entry.stored_time,
            level,
            mood,
            text,
            done,
            note: entry.note,
            timestamp: entry.timestamp,
            extra: entry.extra,
        }
    }
}

/// How an append treats entries already logged for the same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendPolicy {
    /// Every call adds an entry (gratitude, energy).
    AppendAlways,
    /// At most one entry per day, the latest wins (daily mood, habit check).
    ReplaceSameDay,
}

/// Ordered sequence of entries plus the legacy streak cache some trackers keep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journal {
    #[serde(default)]
    entries: Vec<Entry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    streak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_date: Option<DateKey>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Journal {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds `entry` according to `policy` and returns the updated journal. Insertion order is
    /// preserved. Under [AppendPolicy::ReplaceSameDay] earlier entries of the same day are
    /// dropped first.
    pub fn append(mut self, entry: Entry, policy: AppendPolicy) -> Journal {
        if policy == AppendPolicy::ReplaceSameDay {
            self.entries.retain(|v| v.date != entry.date);
        }
        self.entries.push(entry);
        self
    }

    /// Entries whose day falls between `from` and `to`, both inclusive, in insertion order.
    pub fn range(&self, from: DateKey, to: DateKey) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(move |v| v.date >= from && v.date <= to)
    }

    pub fn on(&self, date: DateKey) -> impl Iterator<Item = &Entry> {
        self.range(date, date)
    }

    /// Cached `(streak, lastDate)` as last written. Informational only, never use it in place of
    /// recomputing from entries.
    pub fn streak_cache(&self) -> (Option<u32>, Option<DateKey>) {
        (self.streak, self.last_date)
    }

    pub fn with_streak_cache(self, streak: u32, last_date: Option<DateKey>) -> Journal {
        Journal {
            streak: Some(streak),
            last_date,
            ..self
        }
    }
}

impl FromIterator<Entry> for Journal {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        Journal {
            entries: iter.into_iter().collect(),
            ..Default::default()
        }
    }
}
