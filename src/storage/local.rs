//! Local filesystem storage for batch files and output inspection.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── events.json                         # Latest full batch
//! ├── events_YYYY-MM-DD.json              # Batch of that day's run
//! ├── events_stream.jsonl                 # Append-only stream (StreamSink)
//! ├── events_stream_*.jsonl.gz            # Stream snapshots (StreamSink)
//! └── error_screenshot.png                # Last failed run, if any
//! ```

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::EventRecord;
use crate::storage::stream::is_snapshot_name;
use crate::storage::{BATCH_FILE, STREAM_FILE};

/// Paths written by [`LocalStorage::write_batch`].
#[derive(Debug, Clone)]
pub struct BatchFiles {
    pub latest: PathBuf,
    pub dated: PathBuf,
}

/// What is currently in the output directory.
#[derive(Debug, Clone, Default)]
pub struct OutputSummary {
    pub stream_lines: usize,
    pub snapshots: Vec<String>,
    pub batch_records: Option<usize>,
}

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<PathBuf> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Write the full run's records as `events.json` and a dated copy.
    pub async fn write_batch(&self, records: &[EventRecord]) -> Result<BatchFiles> {
        let dated_key = format!("events_{}.json", Local::now().format("%Y-%m-%d"));
        let latest = self.write_json(BATCH_FILE, records).await?;
        let dated = self.write_json(&dated_key, records).await?;
        log::info!(
            "Batch of {} records written to {} and {}",
            records.len(),
            latest.display(),
            dated.display()
        );
        Ok(BatchFiles { latest, dated })
    }

    /// Load the latest batch, if one was written.
    pub async fn load_batch(&self) -> Result<Option<Vec<EventRecord>>> {
        self.read_json(BATCH_FILE).await
    }

    /// Inspect the output directory.
    pub async fn summary(&self) -> Result<OutputSummary> {
        let stream_lines = match self.read_bytes(STREAM_FILE).await? {
            Some(bytes) => bytes.split(|b| *b == b'\n').filter(|l| !l.is_empty()).count(),
            None => 0,
        };

        let mut snapshots = Vec::new();
        match tokio::fs::read_dir(&self.root_dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if is_snapshot_name(&name) {
                        snapshots.push(name);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(AppError::Io(e)),
        }
        snapshots.sort();

        let batch_records = self.load_batch().await?.map(|records| records.len());

        Ok(OutputSummary {
            stream_lines,
            snapshots,
            batch_records,
        })
    }
}
