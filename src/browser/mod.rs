//! Rendered document source abstraction.
//!
//! The harvester never talks to a browser directly. Everything it needs
//! (navigation, in-page scripts, the rendered markup and a few element
//! interactions) goes through [`DocumentSource`], so the production Chrome
//! driver and the test doubles are interchangeable.

#[cfg(feature = "chrome")]
pub mod chrome;
#[cfg(test)]
pub(crate) mod scripted;

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{Result, StepError};

#[cfg(feature = "chrome")]
pub use chrome::ChromeSource;

/// Interval between polls of a bounded wait.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How to find one element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locator {
    /// CSS selector
    Css(String),
    /// First `tag` element whose text contains any needle (case-insensitive)
    Text { tag: String, needles: Vec<String> },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn text(tag: impl Into<String>, needles: &[&str]) -> Self {
        Self::Text {
            tag: tag.into(),
            needles: needles.iter().map(|n| n.to_string()).collect(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css({selector})"),
            Locator::Text { tag, needles } => write!(f, "text({tag} ~ {})", needles.join("|")),
        }
    }
}

/// A live, navigable rendered page.
///
/// Implementations are not required to support concurrent navigation; the
/// harvester drives one source strictly sequentially.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load a URL and wait for the page to finish loading.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// URL currently shown.
    async fn current_url(&self) -> Result<String>;

    /// Evaluate a script expression in the page and return its value.
    async fn run_script(&self, script: &str) -> Result<serde_json::Value>;

    /// Fully rendered markup of the current page.
    async fn rendered_document(&self) -> Result<String>;

    /// Whether the locator currently matches an element. Never waits.
    async fn exists(&self, locator: &Locator) -> Result<bool>;

    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Clear an input and type `text` into it.
    async fn fill(&self, locator: &Locator, text: &str) -> Result<()>;

    /// Write a point-in-time image of the page.
    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Release the underlying driver.
    async fn close(&self) -> Result<()>;
}

/// Wait until any of `locators` matches, preferring earlier ones.
///
/// Every poll checks the locators in order and the first match wins, so a
/// later strategy never shadows an earlier one that is present in the same
/// poll. A zero timeout performs exactly one poll.
pub async fn locate_first<'a>(
    source: &dyn DocumentSource,
    locators: &'a [Locator],
    timeout: Duration,
    what: &str,
) -> Result<&'a Locator> {
    if locators.is_empty() {
        return Err(StepError::not_found(format!("{what} (no locators configured)")).into());
    }

    let deadline = Instant::now() + timeout;
    loop {
        for locator in locators {
            if source.exists(locator).await? {
                log::debug!("Located {what} via {locator}");
                return Ok(locator);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(StepError::timeout(what, timeout).into());
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}

/// Wait until the current URL satisfies `done`.
pub async fn wait_for_url<F>(
    source: &dyn DocumentSource,
    timeout: Duration,
    what: &str,
    done: F,
) -> Result<String>
where
    F: Fn(&str) -> bool + Send,
{
    let deadline = Instant::now() + timeout;
    loop {
        let url = source.current_url().await?;
        if done(&url) {
            return Ok(url);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(StepError::timeout(what, timeout).into());
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}
