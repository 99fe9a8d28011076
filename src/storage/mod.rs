//! Persistence of harvested records.
//!
//! Two complementary outputs share one directory:
//! - Stream: `events_stream.jsonl`, appended record by record, with gzip
//!   snapshots and per-append publishing (`StreamSink`)
//! - Batch: `events.json` plus a dated copy, written once per successful run
//!   (`LocalStorage`)

pub mod local;
pub mod publish;
pub mod stream;

// Re-export for convenience
pub use local::{BatchFiles, LocalStorage, OutputSummary};
pub use publish::{CommandPublisher, NoopPublisher, Publisher, publisher_from_config};
pub use stream::{StreamSink, StreamState};

/// Append-only stream log.
pub const STREAM_FILE: &str = "events_stream.jsonl";

/// Latest full batch.
pub const BATCH_FILE: &str = "events.json";

/// Diagnostic capture of a failed run.
pub const SCREENSHOT_FILE: &str = "error_screenshot.png";
