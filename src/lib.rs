//! Small personal journals (mood, energy, gratitude, habits) with streak and trend analytics.
//! Each journal is a single JSON file, every command is one short-lived invocation.
//!

pub mod analysis;
pub mod cli;
pub mod journal;
pub mod tracker;
pub mod utils;
