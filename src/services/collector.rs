// src/services/collector.rs

//! Lazy-loading, paginated container collection.
//!
//! Pages are pulled one at a time with [`PaginatedCollector::next_page`], so
//! the caller can process each page's containers before the next one is
//! requested. Running out of "next" controls, timing out while waiting for a
//! new page and hitting the page ceiling all end pagination normally.

use std::sync::Arc;

use scraper::{Html, Selector};

use crate::browser::{DocumentSource, Locator, locate_first};
use crate::error::{AppError, Result, StepError};
use crate::models::{CollectionContext, Config};
use crate::services::rules::parse_selector;
use crate::services::session::{SessionManager, SessionStatus};

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
const SCROLL_HEIGHT: &str = "document.body.scrollHeight";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// Nothing read yet
    Start,
    /// At least one page read
    Paging,
    /// No further pages
    Exhausted,
}

/// Walks the listing page by page.
pub struct PaginatedCollector {
    source: Arc<dyn DocumentSource>,
    session: SessionManager,
    config: Arc<Config>,
    container: Selector,
    container_locator: [Locator; 1],
    context: CollectionContext,
    cursor: Cursor,
}

impl PaginatedCollector {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        session: SessionManager,
        config: Arc<Config>,
    ) -> Result<Self> {
        let selector = &config.selectors.container;
        Ok(Self {
            container: parse_selector(selector)?,
            container_locator: [Locator::css(selector.clone())],
            source,
            session,
            config,
            context: CollectionContext::new(),
            cursor: Cursor::Start,
        })
    }

    pub fn context(&self) -> &CollectionContext {
        &self.context
    }

    /// Navigate to the listing, re-authenticating if it bounces to login.
    pub async fn open(&mut self) -> Result<()> {
        self.context.reset();
        self.cursor = Cursor::Start;
        self.navigate_listing().await?;

        if self.session.is_on_login_page().await? {
            log::warn!("Listing redirected to login, re-authenticating");
            self.reauthenticate().await?;
        }
        self.dismiss_consent_banner().await;
        Ok(())
    }

    /// Containers of the next page in document order, or `None` when done.
    pub async fn next_page(&mut self) -> Result<Option<Vec<String>>> {
        match self.cursor {
            Cursor::Exhausted => return Ok(None),
            Cursor::Start => self.cursor = Cursor::Paging,
            Cursor::Paging => {
                let max_pages = self.config.collector.max_pages;
                if self.context.page_index >= max_pages {
                    log::info!("Reached page ceiling ({max_pages}), stopping");
                    self.cursor = Cursor::Exhausted;
                    return Ok(None);
                }
                if let Err(e) = self.advance().await {
                    if matches!(e, AppError::Auth(_)) {
                        return Err(e);
                    }
                    log::info!("No further pages: {e}");
                    self.cursor = Cursor::Exhausted;
                    return Ok(None);
                }
            }
        }

        match self.lazy_load().await {
            Ok(scrolls) => self.context.stable_scrolls = scrolls,
            Err(e) => log::warn!("Lazy load interrupted: {e}"),
        }

        let containers = self.read_containers().await?;
        self.context.page_index += 1;
        self.context.record_count += containers.len();
        log::info!(
            "Page {}: {} containers ({} total)",
            self.context.page_index,
            containers.len(),
            self.context.record_count
        );
        Ok(Some(containers))
    }

    /// Drain every remaining page.
    pub async fn collect_all(&mut self) -> Result<Vec<String>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }

    /// Scroll to the bottom until the document height stops changing.
    ///
    /// Returns the number of scrolls performed; hitting the scroll budget is
    /// not an error.
    pub async fn lazy_load(&self) -> Result<usize> {
        let settings = &self.config.collector;
        let mut last = self.scroll_height().await?;

        for scroll in 1..=settings.max_scrolls {
            self.source.run_script(SCROLL_TO_BOTTOM).await?;
            tokio::time::sleep(settings.scroll_wait()).await;

            let height = self.scroll_height().await?;
            if height == last {
                log::debug!("Height stable at {height} after {scroll} scrolls");
                return Ok(scroll);
            }
            last = height;
        }

        log::debug!("Scroll budget of {} exhausted", settings.max_scrolls);
        Ok(settings.max_scrolls)
    }

    /// Click the first visible consent control, if any. Never fails.
    pub async fn dismiss_consent_banner(&self) -> bool {
        for locator in &self.config.selectors.cookie_consent {
            match self.source.exists(locator).await {
                Ok(true) => match self.source.click(locator).await {
                    Ok(()) => {
                        log::info!("Dismissed cookie banner via {locator}");
                        return true;
                    }
                    Err(e) => log::debug!("Consent control {locator} not clickable: {e}"),
                },
                Ok(false) => {}
                Err(e) => log::debug!("Consent check failed: {e}"),
            }
        }
        false
    }

    /// Document height as reported by the page; zoomed layouts report fractions.
    async fn scroll_height(&self) -> Result<f64> {
        let value = self.source.run_script(SCROLL_HEIGHT).await?;
        value
            .as_f64()
            .ok_or_else(|| StepError::malformed(format!("scroll height {value}")).into())
    }

    async fn read_containers(&self) -> Result<Vec<String>> {
        let markup = self.source.rendered_document().await?;
        let document = Html::parse_document(&markup);
        Ok(document.select(&self.container).map(|el| el.html()).collect())
    }

    async fn navigate_listing(&self) -> Result<()> {
        let url = self.config.site.events_url();
        log::info!("Opening listing {url}");
        self.source.navigate(&url).await
    }

    async fn reauthenticate(&self) -> Result<()> {
        let max = self.config.session.max_login_attempts;
        match self.session.ensure_authenticated(max).await? {
            SessionStatus::Lost => Err(AppError::auth("session lost and could not be restored")),
            _ => self.navigate_listing().await,
        }
    }

    /// Click "next", re-verify the session and wait for the new page.
    async fn advance(&self) -> Result<()> {
        let settings = &self.config.collector;
        let next = locate_first(
            self.source.as_ref(),
            &self.config.selectors.next_page,
            settings.next_control_timeout(),
            "next page control",
        )
        .await?
        .clone();

        self.source.click(&next).await?;
        tokio::time::sleep(settings.settle()).await;

        let max = self.config.session.max_login_attempts;
        match self.session.ensure_authenticated(max).await? {
            SessionStatus::Valid => {}
            SessionStatus::Restored => {
                log::warn!("Session restored mid-run, reopening listing");
                self.navigate_listing().await?;
                self.dismiss_consent_banner().await;
            }
            SessionStatus::Lost => {
                return Err(AppError::auth("session lost and could not be restored"));
            }
        }

        locate_first(
            self.source.as_ref(),
            &self.container_locator,
            settings.next_page_timeout(),
            "next page containers",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::scripted::{ScriptedSource, card, fast_config, listing};
    use tempfile::TempDir;

    fn pages(count: usize) -> Vec<String> {
        (0..count)
            .map(|p| listing(&[card(&format!("p{p}a"), "A"), card(&format!("p{p}b"), "B")]))
            .collect()
    }

    async fn collector(config: Config, source: &Arc<ScriptedSource>) -> PaginatedCollector {
        let config = Arc::new(config);
        let session = SessionManager::new(source.clone(), config.clone());
        session.establish().await.unwrap();
        PaginatedCollector::new(source.clone(), session, config).unwrap()
    }

    #[tokio::test]
    async fn test_collects_pages_in_discovery_order() {
        let dir = TempDir::new().unwrap();
        let config = fast_config(dir.path());
        let source = Arc::new(ScriptedSource::for_site(&config).with_pages(pages(3)));
        let mut collector = collector(config, &source).await;

        collector.open().await.unwrap();
        let containers = collector.collect_all().await.unwrap();

        assert_eq!(containers.len(), 6);
        assert!(containers[0].contains("event-card-p0a"));
        assert!(containers[1].contains("event-card-p0b"));
        assert!(containers[5].contains("event-card-p2b"));
        assert_eq!(collector.context().page_index, 3);
        assert_eq!(collector.context().record_count, 6);
        assert!(collector.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_page_ceiling_stops_endless_next() {
        let dir = TempDir::new().unwrap();
        let mut config = fast_config(dir.path());
        config.collector.max_pages = 3;
        let source = Arc::new(ScriptedSource::for_site(&config).with_pages(pages(1)));
        source.state().next_always = true;
        let mut collector = collector(config, &source).await;

        collector.open().await.unwrap();
        let mut yielded = 0;
        while collector.next_page().await.unwrap().is_some() {
            yielded += 1;
        }

        assert_eq!(yielded, 3);
        assert_eq!(source.state().clicks.len(), 3); // login submit + two next clicks
    }

    #[tokio::test]
    async fn test_next_page_timeout_ends_pagination() {
        let dir = TempDir::new().unwrap();
        let config = fast_config(dir.path());
        let source = Arc::new(ScriptedSource::for_site(&config).with_pages(pages(2)));
        let mut collector = collector(config, &source).await;

        collector.open().await.unwrap();
        assert!(collector.next_page().await.unwrap().is_some());
        source.state().next_page_loads = false;
        assert!(collector.next_page().await.unwrap().is_none());
        assert_eq!(collector.context().page_index, 1);
    }

    #[tokio::test]
    async fn test_lazy_load_stabilizes() {
        let dir = TempDir::new().unwrap();
        let config = fast_config(dir.path());
        let source = Arc::new(ScriptedSource::for_site(&config));
        source.state().heights = vec![1000.0, 2000.0, 3000.0, 3000.0];
        let collector = collector(config, &source).await;
        source.state().height_cursor = 0;

        let scrolls = collector.lazy_load().await.unwrap();
        assert_eq!(scrolls, 3);
    }

    #[tokio::test]
    async fn test_lazy_load_sees_fractional_growth() {
        let dir = TempDir::new().unwrap();
        let config = fast_config(dir.path());
        let source = Arc::new(ScriptedSource::for_site(&config));
        source.state().heights = vec![1000.25, 1000.75, 1000.75];
        let collector = collector(config, &source).await;
        source.state().height_cursor = 0;

        let scrolls = collector.lazy_load().await.unwrap();
        assert_eq!(scrolls, 2);
    }

    #[tokio::test]
    async fn test_lazy_load_respects_scroll_cap() {
        let dir = TempDir::new().unwrap();
        let mut config = fast_config(dir.path());
        config.collector.max_scrolls = 4;
        let source = Arc::new(ScriptedSource::for_site(&config));
        source.state().growing_height = true;
        let collector = collector(config, &source).await;

        let scrolls = collector.lazy_load().await.unwrap();
        assert_eq!(scrolls, 4);
        assert_eq!(source.state().scrolls, 4);
    }

    #[tokio::test]
    async fn test_session_restored_mid_pagination() {
        let dir = TempDir::new().unwrap();
        let config = fast_config(dir.path());
        let source = Arc::new(ScriptedSource::for_site(&config).with_pages(pages(2)));
        source.state().expire_on_page = Some(1);
        let mut collector = collector(config, &source).await;

        collector.open().await.unwrap();
        let containers = collector.collect_all().await.unwrap();

        // Page one is read again after re-login, then pagination continues
        assert_eq!(containers.len(), 6);
        assert_eq!(
            containers.iter().filter(|c| c.contains("event-card-p0a")).count(),
            2
        );
        assert!(containers.last().unwrap().contains("event-card-p1b"));
        assert_eq!(source.state().submits, 2);
    }

    #[tokio::test]
    async fn test_open_dismisses_consent_banner() {
        let dir = TempDir::new().unwrap();
        let config = fast_config(dir.path());
        let source = Arc::new(ScriptedSource::for_site(&config));
        source.state().consent_banner = true;
        let mut collector = collector(config, &source).await;

        collector.open().await.unwrap();
        assert!(!source.state().consent_banner);
    }

    #[tokio::test]
    async fn test_open_reauthenticates_when_bounced() {
        let dir = TempDir::new().unwrap();
        let config = Arc::new(fast_config(dir.path()));
        let source = Arc::new(ScriptedSource::for_site(&config));
        let session = SessionManager::new(source.clone(), config.clone());
        let mut collector = PaginatedCollector::new(source.clone(), session, config.clone()).unwrap();

        collector.open().await.unwrap();
        assert_eq!(source.state().submits, 1);
        assert_eq!(source.current_url().await.unwrap(), config.site.events_url());
    }
}
