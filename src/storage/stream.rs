// src/storage/stream.rs

//! Append-only record stream with compressed checkpoints.
//!
//! ```text
//! {dir}/
//! ├── events_stream.jsonl                  # one compact JSON object per line
//! └── events_stream_YYYYmmdd_HHMMSS.jsonl.gz  # immutable snapshots
//! ```
//!
//! Every append is flushed before returning, so a crash right after it leaves
//! the log consistent up to and including that record. The whole log is
//! republished after each append under a day-stamped name.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{EventRecord, StreamConfig};
use crate::storage::STREAM_FILE;
use crate::storage::publish::Publisher;

const SNAPSHOT_PREFIX: &str = "events_stream_";
const SNAPSHOT_SUFFIX: &str = ".jsonl.gz";

/// Write position and append counter of the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamState {
    /// Byte offset of the next write; recovered from the file length on open
    pub cursor: u64,
    /// Appends in this run
    pub appended: usize,
}

/// Durable, append-only sink for extracted records.
pub struct StreamSink {
    dir: PathBuf,
    log_path: PathBuf,
    publisher: Arc<dyn Publisher>,
    snapshot_every: usize,
    strict: bool,
    state: StreamState,
    snapshots: Vec<PathBuf>,
}

impl StreamSink {
    /// Open (or create) the stream log in `dir`.
    pub async fn open(
        dir: impl Into<PathBuf>,
        config: &StreamConfig,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        let log_path = dir.join(STREAM_FILE);

        let cursor = match tokio::fs::metadata(&log_path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(AppError::Io(e)),
        };
        if cursor > 0 {
            log::info!("Resuming stream {} at byte {cursor}", log_path.display());
        }

        Ok(Self {
            dir,
            log_path,
            publisher,
            snapshot_every: config.snapshot_every.max(1),
            strict: config.strict_publisher,
            state: StreamState {
                cursor,
                appended: 0,
            },
            snapshots: Vec::new(),
        })
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Snapshots produced by this sink, oldest first.
    pub fn snapshots(&self) -> &[PathBuf] {
        &self.snapshots
    }

    /// Append one record, republish the log and snapshot when due.
    ///
    /// No deduplication: appending the same record twice writes two lines.
    /// Errors raised after the write leave the line durable and already
    /// counted in [`StreamSink::state`].
    pub async fn append(&mut self, record: EventRecord) -> Result<()> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        file.sync_data().await?;
        drop(file);

        self.state.cursor += line.len() as u64;
        self.state.appended += 1;
        log::debug!("Appended {} (#{})", record.label(), self.state.appended);

        let destination = Self::day_name();
        self.publish(&self.log_path, &destination).await?;

        if self.state.appended % self.snapshot_every == 0 {
            self.snapshot().await?;
        }
        Ok(())
    }

    /// Write a gzip copy of the current log and publish it.
    pub async fn snapshot(&mut self) -> Result<PathBuf> {
        let contents = match tokio::fs::read(&self.log_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&contents)?;
        let compressed = encoder.finish()?;

        let path = self.write_unique_snapshot(&compressed).await?;
        log::info!(
            "Snapshot {} ({} records in run)",
            path.display(),
            self.state.appended
        );

        self.snapshots.push(path.clone());

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.publish(&path, &name).await?;
        Ok(path)
    }

    /// Produce the trailing snapshot. Safe to call right after a scheduled one.
    pub async fn finish(&mut self) -> Result<PathBuf> {
        let path = self.snapshot().await?;
        log::info!(
            "Stream finished: {} records appended, {} snapshots",
            self.state.appended,
            self.snapshots.len()
        );
        Ok(path)
    }

    async fn publish(&self, path: &Path, destination: &str) -> Result<()> {
        match self.publisher.publish(path, destination).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                log::warn!("Publisher rejected {destination}, continuing");
                Ok(())
            }
            Err(e) if self.strict => Err(e),
            Err(e) => {
                log::warn!("Publish of {destination} failed, continuing: {e}");
                Ok(())
            }
        }
    }

    /// Create a snapshot file that never overwrites an earlier one.
    async fn write_unique_snapshot(&self, bytes: &[u8]) -> Result<PathBuf> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut suffix = 0usize;
        loop {
            let name = if suffix == 0 {
                format!("{SNAPSHOT_PREFIX}{stamp}{SNAPSHOT_SUFFIX}")
            } else {
                format!("{SNAPSHOT_PREFIX}{stamp}_{suffix}{SNAPSHOT_SUFFIX}")
            };
            let path = self.dir.join(name);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    file.sync_data().await?;
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(AppError::Io(e)),
            }
        }
    }

    fn day_name() -> String {
        format!("{SNAPSHOT_PREFIX}{}.jsonl", Local::now().format("%Y%m%d"))
    }
}

/// Whether a file name looks like a stream snapshot.
pub fn is_snapshot_name(name: &str) -> bool {
    name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(SNAPSHOT_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::publish::RecordingPublisher;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn record(id: &str) -> EventRecord {
        EventRecord {
            id: Some(id.to_string()),
            name: Some(format!("Trial {id}")),
            ..Default::default()
        }
    }

    fn config(every: usize) -> StreamConfig {
        StreamConfig {
            snapshot_every: every,
            ..Default::default()
        }
    }

    fn snapshot_count(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| is_snapshot_name(&e.file_name().to_string_lossy()))
            .count()
    }

    #[tokio::test]
    async fn test_append_never_deduplicates() {
        let dir = TempDir::new().unwrap();
        let publisher = Arc::new(RecordingPublisher::default());
        let mut sink = StreamSink::open(dir.path(), &config(100), publisher)
            .await
            .unwrap();

        sink.append(record("a")).await.unwrap();
        sink.append(record("a")).await.unwrap();
        sink.append(record("b")).await.unwrap();

        let text = std::fs::read_to_string(sink.log_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], lines[1]);
        assert_eq!(sink.state().appended, 3);
        assert_eq!(sink.state().cursor, text.len() as u64);
    }

    #[tokio::test]
    async fn test_snapshot_cadence() {
        let dir = TempDir::new().unwrap();
        let publisher = Arc::new(RecordingPublisher::default());
        let mut sink = StreamSink::open(dir.path(), &config(3), publisher.clone())
            .await
            .unwrap();

        for i in 0..6 {
            sink.append(record(&i.to_string())).await.unwrap();
        }
        assert_eq!(sink.snapshots().len(), 2);
        assert_eq!(snapshot_count(dir.path()), 2);

        // Aligned finish still adds one
        sink.finish().await.unwrap();
        assert_eq!(snapshot_count(dir.path()), 3);

        let destinations = publisher.destinations();
        let log_publishes = destinations.iter().filter(|d| d.ends_with(".jsonl")).count();
        let snapshot_publishes = destinations.iter().filter(|d| is_snapshot_name(d)).count();
        assert_eq!(log_publishes, 6);
        assert_eq!(snapshot_publishes, 3);
    }

    #[tokio::test]
    async fn test_snapshot_is_gzip_of_log() {
        let dir = TempDir::new().unwrap();
        let publisher = Arc::new(RecordingPublisher::default());
        let mut sink = StreamSink::open(dir.path(), &config(10), publisher)
            .await
            .unwrap();
        sink.append(record("x")).await.unwrap();

        let path = sink.snapshot().await.unwrap();
        let mut decoded = String::new();
        GzDecoder::new(std::fs::File::open(&path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, std::fs::read_to_string(sink.log_path()).unwrap());
    }

    #[tokio::test]
    async fn test_snapshots_in_same_second_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let publisher = Arc::new(RecordingPublisher::default());
        let mut sink = StreamSink::open(dir.path(), &config(10), publisher)
            .await
            .unwrap();

        let first = sink.snapshot().await.unwrap();
        let second = sink.snapshot().await.unwrap();
        let third = sink.snapshot().await.unwrap();
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(snapshot_count(dir.path()), 3);
    }

    #[tokio::test]
    async fn test_publish_failures_do_not_abort() {
        let dir = TempDir::new().unwrap();
        let publisher = Arc::new(RecordingPublisher {
            unavailable: true,
            ..Default::default()
        });
        let mut sink = StreamSink::open(dir.path(), &config(1), publisher.clone())
            .await
            .unwrap();

        sink.append(record("a")).await.unwrap();
        sink.finish().await.unwrap();
        assert_eq!(publisher.destinations().len(), 3);

        let rejecting = Arc::new(RecordingPublisher {
            reject: true,
            ..Default::default()
        });
        let mut sink = StreamSink::open(dir.path(), &config(10), rejecting)
            .await
            .unwrap();
        sink.append(record("b")).await.unwrap();
    }

    #[tokio::test]
    async fn test_strict_mode_surfaces_publish_failure() {
        let dir = TempDir::new().unwrap();
        let publisher = Arc::new(RecordingPublisher {
            unavailable: true,
            ..Default::default()
        });
        let mut strict = config(10);
        strict.strict_publisher = true;
        let mut sink = StreamSink::open(dir.path(), &strict, publisher).await.unwrap();

        let err = sink.append(record("a")).await.unwrap_err();
        assert!(matches!(err, AppError::Publish(_)));
        // The record is durable and counted even though publishing failed
        let text = std::fs::read_to_string(sink.log_path()).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert_eq!(sink.state().appended, 1);

        assert!(sink.finish().await.is_err());
        assert_eq!(sink.snapshots().len(), 1);
        assert!(sink.snapshots()[0].exists());
    }

    #[tokio::test]
    async fn test_reopen_resumes_cursor() {
        let dir = TempDir::new().unwrap();
        let publisher = Arc::new(RecordingPublisher::default());
        let mut sink = StreamSink::open(dir.path(), &config(10), publisher.clone())
            .await
            .unwrap();
        sink.append(record("a")).await.unwrap();
        let cursor = sink.state().cursor;

        let reopened = StreamSink::open(dir.path(), &config(10), publisher)
            .await
            .unwrap();
        assert_eq!(reopened.state().cursor, cursor);
        assert_eq!(reopened.state().appended, 0);
    }
}
