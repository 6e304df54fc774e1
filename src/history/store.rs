//! Append-only JSON history of composite results.
//!
//! Layout under the data directory:
//! - `over-back-history.json` - `{"history": [...]}`, oldest first, capped at the retention window
//! - `YYYY-MM-DD.json` - per-day audit snapshot of the entry and its raw inputs
//!
//! Each append reads the whole document, appends, trims the head and writes it back
//! through a per-process temp file and a rename. Writers are serialized by an
//! in-process lock only: a second process appending at the same time can lose
//! an entry, so exactly one process may write a given data directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::StorageSettings;
use crate::error::StorageError;
use crate::models::{CompositeIndexResult, DailySnapshot, HistoryEntry, RawReadings};

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryDocument {
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

pub struct HistoryStore {
    data_dir: PathBuf,
    history_path: PathBuf,
    retention: usize,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(data_dir: impl Into<PathBuf>, history_file: &str, retention: usize) -> Self {
        let data_dir = data_dir.into();
        Self {
            history_path: data_dir.join(history_file),
            data_dir,
            retention: retention.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(
            settings.data_dir.clone(),
            &settings.history_file,
            settings.retention,
        )
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    /// Creates the data directory and an empty history document when missing.
    pub async fn initialize(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| StorageError::io(&self.data_dir, e))?;

        let exists = tokio::fs::try_exists(&self.history_path)
            .await
            .map_err(|e| StorageError::io(&self.history_path, e))?;

        if !exists {
            let _guard = self.write_lock.lock().await;
            write_json(&self.history_path, &HistoryDocument::default()).await?;
            info!("Created empty history at {}", self.history_path.display());
        }
        Ok(())
    }

    /// Appends `result`, stamped with the current time, and returns the stored entry.
    pub async fn append(&self, result: CompositeIndexResult) -> Result<HistoryEntry, StorageError> {
        self.append_at(result, Utc::now()).await
    }

    /// Appends `result` with an explicit timestamp.
    pub async fn append_at(
        &self,
        result: CompositeIndexResult,
        timestamp: DateTime<Utc>,
    ) -> Result<HistoryEntry, StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.read_document().await?;
        let entry = HistoryEntry { timestamp, result };
        document.history.push(entry.clone());

        let len = document.history.len();
        if len > self.retention {
            document.history.drain(..len - self.retention);
            debug!("Trimmed {} history entries", len - self.retention);
        }

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| StorageError::io(&self.data_dir, e))?;
        write_json(&self.history_path, &document).await?;

        Ok(entry)
    }

    /// Writes the audit snapshot for the entry's calendar date, replacing any
    /// earlier snapshot of that day.
    pub async fn write_snapshot(
        &self,
        entry: &HistoryEntry,
        raw: RawReadings,
    ) -> Result<PathBuf, StorageError> {
        let path = self.snapshot_path(entry.timestamp.date_naive());
        let snapshot = DailySnapshot {
            entry: entry.clone(),
            raw,
        };

        let _guard = self.write_lock.lock().await;
        write_json(&path, &snapshot).await?;
        Ok(path)
    }

    pub fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    /// The `n` most recent entries, oldest first.
    pub async fn read_window(&self, n: usize) -> Result<Vec<HistoryEntry>, StorageError> {
        let mut history = self.read_document().await?.history;
        let skip = history.len().saturating_sub(n);
        Ok(history.split_off(skip))
    }

    pub async fn latest(&self) -> Result<Option<HistoryEntry>, StorageError> {
        Ok(self.read_window(1).await?.pop())
    }

    /// A missing document reads as empty history.
    async fn read_document(&self) -> Result<HistoryDocument, StorageError> {
        let content = match tokio::fs::read(&self.history_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HistoryDocument::default())
            },
            Err(e) => return Err(StorageError::io(&self.history_path, e)),
        };

        serde_json::from_slice(&content)
            .map_err(|e| StorageError::Corrupt(format!("{}: {}", self.history_path.display(), e)))
    }
}

/// Sibling temp file, distinct per process so two writers never share one.
fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", std::process::id()));
    PathBuf::from(tmp)
}

/// Serializes `value` to a sibling temp file and renames it over `path`.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = temp_path(path);

    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| StorageError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StorageError::io(path, e))?;
    Ok(())
}
