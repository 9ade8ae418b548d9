//! Journal storage is organized through [storage::JsonJournalStorage].
//! The basic idea is:
//!  - Every tracker owns exactly one JSON file with an ordered list of entries.
//!  - Entries carry the local calendar day they were made on, which is what analysis reads.
//!  - A file that doesn't exist is an empty journal, a file that can't be parsed is an error.

pub mod entities;
pub mod error;
pub mod storage;
