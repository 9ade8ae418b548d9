use std::{
    future::Future,
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

use fs4::tokio::AsyncFileExt;
use tempfile::NamedTempFile;
use tokio::fs::File;
use tracing::{debug, instrument, trace};

use super::{entities::Journal, error::JournalError};

/// Interface for abstracting storage of a journal.
pub trait JournalStorage {
    /// Reads the whole journal. A missing journal is empty, not an error.
    fn load(&self) -> impl Future<Output = Result<Journal, JournalError>>;

    /// Replaces the stored journal with `journal`.
    fn save(&self, journal: &Journal) -> impl Future<Output = Result<(), JournalError>>;

    /// Read-modify-write cycle. Returns the journal as it was saved.
    fn update<F>(&self, modify: F) -> impl Future<Output = Result<Journal, JournalError>>
    where
        F: FnOnce(Journal) -> Result<Journal, JournalError>,
    {
        async move {
            let journal = modify(self.load().await?)?;
            self.save(&journal).await?;
            Ok(journal)
        }
    }
}

/// The main realization of [JournalStorage]. One pretty printed JSON document per tracker.
///
/// Writes go to a temporary file next to the journal which is then renamed over it, so readers
/// see either the old or the new journal, never a partial one. Writers hold an advisory
/// exclusive lock on `<file>.lock` for the whole read-modify-write cycle. Loads take a shared lock
/// on it when the lock file is there and leave the filesystem untouched.
#[derive(Debug, Clone)]
pub struct JsonJournalStorage {
    path: PathBuf,
}

impl JsonJournalStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        sibling(&self.path, "lock")
    }

    /// Lock file for writers, created along with missing parent directories.
    async fn create_lock(&self) -> Result<File, JournalError> {
        let lock_path = self.lock_path();
        create_parent(&lock_path).await?;
        File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .await
            .map_err(|e| JournalError::io("open lock", &lock_path, e))
    }

    /// Lock file for readers. None when it doesn't exist or can't be opened, in which case no
    /// writer has ever run here or the directory is not ours to lock.
    async fn existing_lock(&self) -> Result<Option<File>, JournalError> {
        let lock_path = self.lock_path();
        match File::open(&lock_path).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                trace!("Reading without a lock, {lock_path:?}: {e}");
                Ok(None)
            }
            Err(e) => Err(JournalError::io("open lock", &lock_path, e)),
        }
    }

    async fn read(&self) -> Result<Journal, JournalError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No journal at {:?}, starting empty", self.path);
                return Ok(Journal::default());
            }
            Err(e) => return Err(JournalError::io("read", &self.path, e)),
        };

        serde_json::from_slice::<Journal>(&bytes).map_err(|source| JournalError::CorruptData {
            path: self.path.clone(),
            source,
        })
    }

    async fn write(&self, journal: &Journal) -> Result<(), JournalError> {
        create_parent(&self.path).await?;

        let mut buffer = serde_json::to_vec_pretty(journal).map_err(|source| {
            JournalError::CorruptData {
                path: self.path.clone(),
                source,
            }
        })?;
        buffer.push(b'\n');
        trace!("Writing {} bytes into {:?}", buffer.len(), self.path);

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &buffer))
            .await
            .map_err(|e| JournalError::io("write", &self.path, io::Error::other(e)))?
    }
}

impl JournalStorage for JsonJournalStorage {
    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load(&self) -> Result<Journal, JournalError> {
        let Some(lock) = self.existing_lock().await? else {
            let journal = self.read().await?;
            debug!("Loaded {} entries", journal.len());
            return Ok(journal);
        };
        lock.lock_shared()
            .map_err(|e| JournalError::io("lock", self.lock_path(), e))?;
        let result = self.read().await;
        lock.unlock_async()
            .await
            .map_err(|e| JournalError::io("unlock", self.lock_path(), e))?;
        let journal = result?;
        debug!("Loaded {} entries", journal.len());
        Ok(journal)
    }

    #[instrument(skip(self, journal), fields(path = ?self.path, entries = journal.len()))]
    async fn save(&self, journal: &Journal) -> Result<(), JournalError> {
        let lock = self.create_lock().await?;
        lock.lock_exclusive()
            .map_err(|e| JournalError::io("lock", self.lock_path(), e))?;
        let result = self.write(journal).await;
        lock.unlock_async()
            .await
            .map_err(|e| JournalError::io("unlock", self.lock_path(), e))?;
        result
    }

    #[instrument(skip(self, modify), fields(path = ?self.path))]
    async fn update<F>(&self, modify: F) -> Result<Journal, JournalError>
    where
        F: FnOnce(Journal) -> Result<Journal, JournalError>,
    {
        // Semi-safe acquire-release for a file
        let lock = self.create_lock().await?;
        lock.lock_exclusive()
            .map_err(|e| JournalError::io("lock", self.lock_path(), e))?;
        let result = async {
            let journal = modify(self.read().await?)?;
            self.write(&journal).await?;
            Ok(journal)
        }
        .await;
        lock.unlock_async()
            .await
            .map_err(|e| JournalError::io("unlock", self.lock_path(), e))?;
        if let Ok(journal) = &result {
            debug!("Saved {} entries", journal.len());
        }
        result
    }
}

/// Writes `data` into a temporary file in the directory of `path` and renames it over `path`.
/// The temporary file is removed when anything fails.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), JournalError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| JournalError::io("create temporary file in", parent, e))?;
    temp.write_all(data)
        .map_err(|e| JournalError::io("write", temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| JournalError::io("sync", temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| JournalError::io("rename", path, e.error))?;
    Ok(())
}

/// `<dir>/<file name>.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

async fn create_parent(path: &Path) -> Result<(), JournalError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| JournalError::io("create directory", parent, e)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{FixedOffset, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::journal::{
        entities::{AppendPolicy, Entry, EntryValue, Journal, Level},
        error::{JournalError, ValidationError},
    };

    use super::{JournalStorage, JsonJournalStorage};

    fn entry(day: u32, level: i64, note: &str) -> Entry {
        Entry::new(
            EntryValue::Level(Level::try_from(level).unwrap()),
            note,
            Utc.with_ymd_and_hms(2024, 6, day, 12, 30, 0).unwrap(),
            &FixedOffset::east_opt(0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonJournalStorage::new(dir.path().join("mood.json"));
        let journal = storage.load().await?;
        assert!(journal.is_empty());
        assert!(!storage.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mood.json");
        std::fs::write(&path, "{\"entries\": [")?;
        let storage = JsonJournalStorage::new(path);

        let result = storage.load().await;
        assert!(matches!(result, Err(JournalError::CorruptData { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_shape_is_corrupt() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mood.json");
        std::fs::write(&path, "[1, 2, 3]")?;
        let storage = JsonJournalStorage::new(path);

        assert!(matches!(
            storage.load().await,
            Err(JournalError::CorruptData { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_save_creates_parent_directories() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("deeper").join("energy.json");
        let storage = JsonJournalStorage::new(path.clone());

        let journal = Journal::default().append(entry(1, 3, ""), AppendPolicy::AppendAlways);
        storage.save(&journal).await?;

        assert!(path.exists());
        assert_eq!(storage.load().await?, journal);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonJournalStorage::new(dir.path().join("mood.json"));
        storage
            .save(&Journal::default().append(entry(1, 3, ""), AppendPolicy::AppendAlways))
            .await?;

        let mut names = std::fs::read_dir(dir.path())?
            .map(|v| v.map(|v| v.file_name().to_string_lossy().to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        names.sort();
        assert_eq!(names, vec!["mood.json", "mood.json.lock"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_has_no_side_effects() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonJournalStorage::new(dir.path().join("nested").join("mood.json"));

        assert!(storage.load().await?.is_empty());
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_save_reports_os_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mood.json");
        // A directory can't be replaced by a file
        std::fs::create_dir(&path)?;
        let storage = JsonJournalStorage::new(path.clone());

        let result = storage
            .save(&Journal::default().append(entry(1, 3, ""), AppendPolicy::AppendAlways))
            .await;
        match result {
            Err(JournalError::Io { action, source, .. }) => {
                assert_eq!(action, "rename");
                assert!(source.raw_os_error().is_some());
            }
            other => panic!("Expected an io error, got {other:?}"),
        }

        assert!(path.is_dir());
        let mut names = std::fs::read_dir(dir.path())?
            .map(|v| v.map(|v| v.file_name().to_string_lossy().to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        names.sort();
        assert_eq!(names, vec!["mood.json", "mood.json.lock"]);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_save_keeps_previous_journal() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let path = dir.path().join("mood.json");
        let storage = JsonJournalStorage::new(path.clone());
        storage
            .save(&Journal::default().append(entry(1, 3, "kept"), AppendPolicy::AppendAlways))
            .await?;
        let before = std::fs::read(&path)?;

        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o555))?;
        // Permissions don't apply to root
        if std::fs::write(dir.path().join("writable"), "").is_ok() {
            std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755))?;
            return Ok(());
        }

        let result = storage
            .update(|j| Ok(j.append(entry(2, 5, "lost"), AppendPolicy::AppendAlways)))
            .await;
        let names = std::fs::read_dir(dir.path())?.count();
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755))?;

        assert!(matches!(result, Err(JournalError::Io { .. })));
        assert_eq!(std::fs::read(&path)?, before);
        assert_eq!(names, 2);
        assert_eq!(storage.load().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_save_is_lossless() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("energy.json");
        let original = serde_json::json!({
            "entries": [
                {"date": "2024-06-01", "time": "09:05", "hour": 9, "level": 4, "note": "coffee", "timestamp": "2024-06-01T09:05:00Z"},
                {"date": "2024-06-02", "time": "21:40", "hour": 21, "level": 2, "note": "", "timestamp": "2024-06-02T21:40:00Z"}
            ],
            "peakHours": {}
        });
        std::fs::write(&path, serde_json::to_vec_pretty(&original)?)?;

        let storage = JsonJournalStorage::new(path.clone());
        let journal = storage.load().await?;
        storage.save(&journal).await?;

        let saved: serde_json::Value = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(saved, original);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_rejects_without_writing() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonJournalStorage::new(dir.path().join("gratitude.json"));

        let result = storage
            .update(|_| Err(ValidationError::EmptyText("text").into()))
            .await;

        assert!(matches!(result, Err(JournalError::Validation(_))));
        assert!(!storage.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_appends() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonJournalStorage::new(dir.path().join("mood.json"));

        storage
            .update(|j| Ok(j.append(entry(1, 2, "a"), AppendPolicy::ReplaceSameDay)))
            .await?;
        storage
            .update(|j| Ok(j.append(entry(1, 5, "b"), AppendPolicy::ReplaceSameDay)))
            .await?;

        let journal = storage.load().await?;
        assert_eq!(journal.len(), 1);
        assert_eq!(journal.entries()[0].note(), "b");
        Ok(())
    }
}
