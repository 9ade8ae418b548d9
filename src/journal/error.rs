use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors produced while reading, mutating or writing a journal.
///
/// A missing journal file is not an error. [JournalStorage::load](super::storage::JournalStorage::load)
/// treats it as an empty journal.
#[derive(Debug, Error)]
pub enum JournalError {
    /// The backing file exists but doesn't hold a journal.
    #[error("journal {} is corrupt: {source}", path.display())]
    CorruptData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Input was rejected before anything was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Filesystem failure. `action` names what was attempted, e.g. "rename".
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl JournalError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Rejected caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("level {0} is out of range, expected {min}-{max}", min = super::entities::Level::MIN, max = super::entities::Level::MAX)]
    LevelOutOfRange(i64),
    #[error("level '{0}' is not a number")]
    LevelNotNumeric(String),
    #[error("{0} must not be empty")]
    EmptyText(&'static str),
    #[error("'{0}' is not a completion marker, expected done or skip")]
    UnknownCompletion(String),
    #[error("hour range {start}-{end} is invalid, hours are 0-23")]
    InvalidHourDomain { start: u32, end: u32 },
    #[error("window size must be at least 1")]
    EmptyWindow,
    #[error("'{0}' is not a date, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("'{0}' is not a time of day, expected HH:MM")]
    InvalidTime(String),
    #[error("this journal records {expected} entries, got {found}")]
    UnexpectedPayload {
        expected: super::entities::PayloadKind,
        found: super::entities::PayloadKind,
    },
}
