// src/storage/publish.rs

//! Off-box publishing of stream artifacts.
//!
//! The transport is opaque: a publisher receives a local file and the name it
//! should be stored under. Production uses an external command, tests use a
//! recording double and runs without an upload script use [`NoopPublisher`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::models::StreamConfig;

/// Hands a local artifact to an external transport.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `local` as `destination`.
    ///
    /// `Ok(false)` means the transport ran and reported failure; `Err` means
    /// it could not be run at all.
    async fn publish(&self, local: &Path, destination: &str) -> Result<bool>;
}

/// Keeps everything local.
#[derive(Debug, Default, Clone)]
pub struct NoopPublisher;

#[async_trait]
impl Publisher for NoopPublisher {
    async fn publish(&self, local: &Path, destination: &str) -> Result<bool> {
        log::debug!("Publish skipped for {} ({destination})", local.display());
        Ok(true)
    }
}

/// Runs `<interpreter> <script> <local> <destination>`.
#[derive(Debug, Clone)]
pub struct CommandPublisher {
    interpreter: String,
    script: PathBuf,
    timeout: Duration,
}

impl CommandPublisher {
    pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Publisher for CommandPublisher {
    async fn publish(&self, local: &Path, destination: &str) -> Result<bool> {
        let child = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg(local)
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Publish(format!("cannot run {}: {e}", self.script.display())))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                AppError::Publish(format!(
                    "{destination}: no result after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        if output.status.success() {
            log::info!("Published {destination}");
            Ok(true)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!(
                "Publish of {destination} exited with {}: {}",
                output.status,
                stderr.trim()
            );
            Ok(false)
        }
    }
}

/// Pick the publisher the stream configuration asks for.
///
/// A configured script that does not exist falls back to local-only
/// operation, unless strict mode is on.
pub fn publisher_from_config(config: &StreamConfig) -> Result<Arc<dyn Publisher>> {
    let Some(script) = &config.publish_script else {
        log::info!("No publish script configured, keeping artifacts local");
        return Ok(Arc::new(NoopPublisher));
    };

    if !script.exists() {
        if config.strict_publisher {
            return Err(AppError::Publish(format!(
                "publish script {} not found",
                script.display()
            )));
        }
        log::info!(
            "Publish script {} not found, keeping artifacts local",
            script.display()
        );
        return Ok(Arc::new(NoopPublisher));
    }

    log::info!("Publishing through {}", script.display());
    Ok(Arc::new(CommandPublisher::new(
        config.publish_interpreter.clone(),
        script.clone(),
        config.publish_timeout(),
    )))
}

/// Test double that records every call.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingPublisher {
    pub calls: std::sync::Mutex<Vec<(PathBuf, String)>>,
    /// Report a non-zero exit
    pub reject: bool,
    /// Fail as if the transport were unavailable
    pub unavailable: bool,
    /// Fail like `unavailable`, but only for gzip snapshots
    pub snapshots_unavailable: bool,
}

#[cfg(test)]
impl RecordingPublisher {
    pub fn destinations(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, d)| d.clone())
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, local: &Path, destination: &str) -> Result<bool> {
        self.calls
            .lock()
            .unwrap()
            .push((local.to_path_buf(), destination.to_string()));
        if self.unavailable || (self.snapshots_unavailable && destination.ends_with(".gz")) {
            return Err(AppError::Publish("transport unavailable".into()));
        }
        Ok(!self.reject)
    }
}
