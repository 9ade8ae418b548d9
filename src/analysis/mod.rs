//! Pure computations over journal entries. Nothing in here touches the filesystem.

pub mod aggregate;
pub mod insights;
pub mod streak;
pub mod trend;
