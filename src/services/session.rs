// src/services/session.rs

//! Authenticated session management.
//!
//! The session itself lives inside the document source. It is observed only
//! through the current URL: a view on the login route is unauthenticated,
//! anything else is treated as authenticated.

use std::sync::Arc;

use crate::browser::{DocumentSource, Locator, locate_first, wait_for_url};
use crate::error::{AppError, Result, StepError};
use crate::models::Config;
use crate::utils::pause;

/// Outcome of [`SessionManager::ensure_authenticated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Already authenticated; nothing was done
    Valid,
    /// A login was performed (or a redirect proved the session live)
    Restored,
    /// All attempts failed or login is impossible
    Lost,
}

impl SessionStatus {
    pub fn is_authenticated(self) -> bool {
        !matches!(self, SessionStatus::Lost)
    }
}

/// Result of a single login attempt.
#[derive(Debug)]
enum Attempt {
    Success,
    Retryable(AppError),
    Fatal(String),
}

/// Establishes and re-verifies the site session.
#[derive(Clone)]
pub struct SessionManager {
    source: Arc<dyn DocumentSource>,
    config: Arc<Config>,
}

impl SessionManager {
    pub fn new(source: Arc<dyn DocumentSource>, config: Arc<Config>) -> Self {
        Self { source, config }
    }

    /// Whether the current view is the login route.
    pub async fn is_on_login_page(&self) -> Result<bool> {
        let url = self.source.current_url().await?;
        Ok(url.contains(&self.config.site.login_path))
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(!self.is_on_login_page().await?)
    }

    /// Open the login route and authenticate if it does not redirect away.
    pub async fn establish(&self) -> Result<SessionStatus> {
        self.source.navigate(&self.config.site.login_url()).await?;
        let status = self
            .ensure_authenticated(self.config.session.max_login_attempts)
            .await?;
        if status == SessionStatus::Valid {
            log::info!("Login route redirected away, session already live");
            return Ok(SessionStatus::Restored);
        }
        Ok(status)
    }

    /// Make sure the current view is authenticated, logging in at most
    /// `max_attempts` times.
    ///
    /// Cheap when the session is live: a single URL check.
    pub async fn ensure_authenticated(&self, max_attempts: usize) -> Result<SessionStatus> {
        if !self.is_on_login_page().await? {
            return Ok(SessionStatus::Valid);
        }

        for attempt in 1..=max_attempts {
            if attempt > 1 && !self.is_on_login_page().await? {
                log::info!("Session became valid before attempt {attempt}");
                return Ok(SessionStatus::Restored);
            }

            log::info!("Login attempt {attempt}/{max_attempts}");
            match self.login_once().await {
                Ok(Attempt::Success) => {
                    log::info!("Login successful");
                    return Ok(SessionStatus::Restored);
                }
                Ok(Attempt::Retryable(e)) => {
                    log::warn!("Login attempt {attempt} failed: {e}");
                }
                Ok(Attempt::Fatal(reason)) => {
                    log::error!("Login impossible: {reason}");
                    return Ok(SessionStatus::Lost);
                }
                Err(e) => {
                    log::warn!("Login attempt {attempt} errored: {e}");
                }
            }
        }

        if !self.is_on_login_page().await? {
            return Ok(SessionStatus::Restored);
        }
        log::error!("Authentication failed after {max_attempts} attempts");
        Ok(SessionStatus::Lost)
    }

    async fn login_once(&self) -> Result<Attempt> {
        let credentials = &self.config.credentials;
        if !credentials.is_complete() {
            return Ok(Attempt::Fatal("credentials are not configured".into()));
        }

        let site = &self.config.site;
        self.source.navigate(&site.login_url()).await?;
        if !self.is_on_login_page().await? {
            return Ok(Attempt::Success);
        }

        let selectors = &self.config.selectors;
        let Some(email) = self.control(&selectors.email, "email input").await? else {
            return Ok(Attempt::Fatal("email input not found".into()));
        };
        let Some(password) = self.control(&selectors.password, "password input").await? else {
            return Ok(Attempt::Fatal("password input not found".into()));
        };
        let Some(submit) = self.control(&selectors.submit, "submit control").await? else {
            return Ok(Attempt::Fatal("submit control not found".into()));
        };

        self.source.fill(&email, &credentials.email).await?;
        self.human_pause().await;
        self.source.fill(&password, &credentials.password).await?;
        self.human_pause().await;
        self.source.click(&submit).await?;

        let login_path = site.login_path.as_str();
        let markers = &site.post_login_markers;
        let redirected = wait_for_url(
            self.source.as_ref(),
            self.config.session.login_timeout(),
            "post-login redirect",
            |url| !url.contains(login_path) || markers.iter().any(|m| url.contains(m.as_str())),
        )
        .await;

        match redirected {
            Ok(url) => {
                // A marker in the query string does not prove the login route was left
                if self.is_on_login_page().await? {
                    let stuck = StepError::not_found(format!("post-login page, still at {url}"));
                    return Ok(Attempt::Retryable(stuck.into()));
                }
                log::debug!("Landed on {url}");
                Ok(Attempt::Success)
            }
            Err(e @ AppError::Step(_)) => Ok(Attempt::Retryable(e)),
            Err(e) => Err(e),
        }
    }

    /// First matching locator, or `None` once every strategy is exhausted.
    async fn control(&self, locators: &[Locator], what: &str) -> Result<Option<Locator>> {
        let timeout = self.config.session.control_timeout();
        match locate_first(self.source.as_ref(), locators, timeout, what).await {
            Ok(locator) => Ok(Some(locator.clone())),
            Err(AppError::Step(e)) => {
                log::warn!("Could not locate {what}: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn human_pause(&self) {
        let base = self.config.session.interaction_delay_ms;
        pause(base / 2, base + base / 2).await;
    }
}
