// src/pipeline/harvest.rs

//! One complete harvest run.
//!
//! `Init → Authenticating → Navigating → Collecting → Finalizing → Done`,
//! with any unrecovered error before the end moving to `Failed`. Both final
//! states release the document source.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::browser::DocumentSource;
use crate::error::{AppError, Result};
use crate::models::{Config, EventRecord};
use crate::services::{PaginatedCollector, RecordExtractor, SessionManager};
use crate::storage::{BatchFiles, LocalStorage, Publisher, SCREENSHOT_FILE, StreamSink};
use crate::utils::pause;

#[cfg(feature = "chrome")]
use crate::browser::ChromeSource;
#[cfg(feature = "chrome")]
use crate::storage::publisher_from_config;

/// Run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestState {
    Init,
    Authenticating,
    Navigating,
    Collecting,
    Finalizing,
    Done,
    Failed,
}

/// Summary of a harvest run.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub state: HarvestState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Records durably appended to the stream
    pub records: usize,
    pub pages: usize,
    /// Containers whose record never reached the stream
    pub item_failures: usize,
    pub snapshots: Vec<PathBuf>,
    pub batch: Option<BatchFiles>,
    pub screenshot: Option<PathBuf>,
    pub error: Option<String>,
}

impl HarvestReport {
    fn started() -> Self {
        let now = Utc::now();
        Self {
            state: HarvestState::Init,
            started_at: now,
            finished_at: now,
            records: 0,
            pages: 0,
            item_failures: 0,
            snapshots: Vec::new(),
            batch: None,
            screenshot: None,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == HarvestState::Done
    }

    pub fn elapsed_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Drives a single run over one document source.
pub struct Harvester {
    config: Arc<Config>,
    source: Arc<dyn DocumentSource>,
    publisher: Arc<dyn Publisher>,
    state: HarvestState,
}

impl Harvester {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn DocumentSource>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            config,
            source,
            publisher,
            state: HarvestState::Init,
        }
    }

    pub fn state(&self) -> HarvestState {
        self.state
    }

    fn transition(&mut self, next: HarvestState) {
        log::info!("Harvest: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run to completion. Failures are reported, not returned.
    pub async fn run(&mut self) -> HarvestReport {
        let mut report = HarvestReport::started();
        let mut sink = None;

        match self.drive(&mut report, &mut sink).await {
            Ok(()) => self.transition(HarvestState::Done),
            Err(e) => {
                log::error!("Harvest failed during {:?}: {e}", self.state);
                report.error = Some(e.to_string());
                self.transition(HarvestState::Failed);
                self.salvage(&mut report, sink.as_mut()).await;
            }
        }

        if let Err(e) = self.source.close().await {
            log::warn!("Could not release document source: {e}");
        }

        report.state = self.state;
        report.finished_at = Utc::now();
        report
    }

    async fn drive(
        &mut self,
        report: &mut HarvestReport,
        sink_slot: &mut Option<StreamSink>,
    ) -> Result<()> {
        let config = Arc::clone(&self.config);
        if !config.credentials.is_complete() {
            return Err(AppError::config(
                "credentials missing: set FLOW_EMAIL and FLOW_PASS",
            ));
        }

        let storage = LocalStorage::new(&config.output.dir);
        let sink = sink_slot.insert(
            StreamSink::open(&config.output.dir, &config.stream, Arc::clone(&self.publisher))
                .await?,
        );

        self.transition(HarvestState::Authenticating);
        let session = SessionManager::new(Arc::clone(&self.source), Arc::clone(&config));
        if !session.establish().await?.is_authenticated() {
            return Err(AppError::auth(format!(
                "no session after {} attempts",
                config.session.max_login_attempts
            )));
        }

        self.transition(HarvestState::Navigating);
        let mut collector =
            PaginatedCollector::new(Arc::clone(&self.source), session, Arc::clone(&config))?;
        collector.open().await?;

        self.transition(HarvestState::Collecting);
        let extractor = RecordExtractor::new(&config)?;
        let mut batch: Vec<EventRecord> = Vec::new();

        while let Some(page) = collector.next_page().await? {
            report.pages = collector.context().page_index;
            for markup in page {
                let record = extractor.extract(&markup);
                if record.is_empty() {
                    log::debug!("Container yielded no fields");
                }

                let label = record.label().to_string();
                batch.push(record.clone());
                let before = sink.state().appended;
                let appended = sink.append(record).await;
                report.records = sink.state().appended;
                match appended {
                    Ok(()) => log::info!("[{}] {label}", report.records),
                    // Only strict publishing surfaces these, and it aborts the run
                    Err(e @ AppError::Publish(_)) => return Err(e),
                    Err(e) if report.records > before => {
                        log::warn!("Streamed {label}, but the follow-up snapshot failed: {e}");
                    }
                    Err(e) => {
                        report.item_failures += 1;
                        log::warn!("Could not stream {label}: {e}");
                    }
                }

                let stream = &config.stream;
                pause(stream.extra_delay_min_ms, stream.extra_delay_max_ms).await;
            }
        }

        self.transition(HarvestState::Finalizing);
        match sink.finish().await {
            Ok(_) => {}
            Err(AppError::Publish(e)) => log::warn!("Trailing snapshot kept local: {e}"),
            Err(e) => return Err(e),
        }
        report.snapshots = sink.snapshots().to_vec();
        report.batch = Some(storage.write_batch(&batch).await?);
        Ok(())
    }

    /// Best-effort diagnostics and persistence after a failure.
    async fn salvage(&self, report: &mut HarvestReport, sink: Option<&mut StreamSink>) {
        let dir = &self.config.output.dir;
        let shot = dir.join(SCREENSHOT_FILE);
        let captured = match tokio::fs::create_dir_all(dir).await {
            Ok(()) => self.source.screenshot(&shot).await,
            Err(e) => Err(e.into()),
        };
        match captured {
            Ok(()) => {
                log::info!("Saved diagnostic screenshot to {}", shot.display());
                report.screenshot = Some(shot);
            }
            Err(e) => log::warn!("Could not capture screenshot: {e}"),
        }

        if let Some(sink) = sink {
            if sink.state().appended > 0 {
                if let Err(e) = sink.finish().await {
                    log::warn!("Could not write trailing snapshot: {e}");
                }
            }
            report.snapshots = sink.snapshots().to_vec();
        }
    }
}

/// Launch Chrome and run one harvest with the configured publisher.
///
/// Errors only when the run cannot start at all.
#[cfg(feature = "chrome")]
pub async fn run_harvest(config: Arc<Config>) -> Result<HarvestReport> {
    let publisher = publisher_from_config(&config.stream)?;
    let source = ChromeSource::launch(&config.browser).await?;
    let mut harvester = Harvester::new(config, Arc::new(source), publisher);
    Ok(harvester.run().await)
}
