//! Scripted in-memory document source for tests.
//!
//! Models just enough of the target site to exercise the harvester: a login
//! route that redirects once a session exists, a listing split into pages
//! behind a "next" control, a scroll height that grows until it settles, and
//! an optional consent banner.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::browser::{DocumentSource, Locator};
use crate::error::{AppError, Result};
use crate::models::{Config, Credentials};

#[derive(Debug)]
pub(crate) struct ScriptState {
    pub login_url: String,
    pub login_path: String,
    pub events_url: String,
    pub landing_url: String,
    pub url: String,

    pub session_valid: bool,
    pub login_succeeds: bool,
    pub failing_submits: usize,
    pub login_controls: HashSet<Locator>,
    pub submit: HashSet<Locator>,
    pub next: HashSet<Locator>,
    pub consent: HashSet<Locator>,
    pub consent_banner: bool,
    pub container: Locator,

    pub pages: Vec<String>,
    pub page: usize,
    pub next_always: bool,
    pub next_page_loads: bool,
    pub expire_on_page: Option<usize>,
    pub heights: Vec<f64>,
    pub height_cursor: usize,
    pub growing_height: bool,
    pub fail_navigation: bool,

    pub navigations: Vec<String>,
    pub fills: Vec<(Locator, String)>,
    pub clicks: Vec<Locator>,
    pub submits: usize,
    pub scrolls: usize,
    pub screenshots: usize,
    pub closed: bool,
}

impl ScriptState {
    fn on_login_page(&self) -> bool {
        self.url.contains(&self.login_path)
    }

    fn height(&self) -> f64 {
        if self.growing_height {
            return 1000.0 + self.height_cursor as f64 * 500.0;
        }
        self.heights
            .get(self.height_cursor)
            .or(self.heights.last())
            .copied()
            .unwrap_or(0.0)
    }

    fn has_next(&self) -> bool {
        self.next_always || self.page + 1 < self.pages.len()
    }
}

pub(crate) struct ScriptedSource {
    state: Mutex<ScriptState>,
}

impl ScriptedSource {
    /// A site with a working login form and a single empty listing page.
    pub fn for_site(config: &Config) -> Self {
        let selectors = &config.selectors;
        let mut login_controls: HashSet<Locator> = HashSet::new();
        login_controls.insert(selectors.email[0].clone());
        login_controls.insert(selectors.password[0].clone());
        login_controls.insert(selectors.submit[0].clone());

        let state = ScriptState {
            login_url: config.site.login_url(),
            login_path: config.site.login_path.clone(),
            events_url: config.site.events_url(),
            landing_url: format!("{}/zone/dashboard", config.site.base_url),
            url: "about:blank".to_string(),
            session_valid: false,
            login_succeeds: true,
            failing_submits: 0,
            login_controls,
            submit: selectors.submit.iter().cloned().collect(),
            next: selectors.next_page.iter().cloned().collect(),
            consent: selectors.cookie_consent.iter().cloned().collect(),
            consent_banner: false,
            container: Locator::css(selectors.container.clone()),
            pages: vec![listing(&[])],
            page: 0,
            next_always: false,
            next_page_loads: true,
            expire_on_page: None,
            heights: vec![1000.0],
            height_cursor: 0,
            growing_height: false,
            fail_navigation: false,
            navigations: Vec::new(),
            fills: Vec::new(),
            clicks: Vec::new(),
            submits: 0,
            scrolls: 0,
            screenshots: 0,
            closed: false,
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn with_pages(self, pages: Vec<String>) -> Self {
        self.state().pages = pages;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl DocumentSource for ScriptedSource {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut s = self.state();
        if s.fail_navigation {
            return Err(AppError::browser(format!("navigation to {url} failed")));
        }
        s.navigations.push(url.to_string());

        let landed = if url.contains(&s.login_path) && s.session_valid {
            s.landing_url.clone()
        } else if url == s.events_url && !s.session_valid {
            s.login_url.clone()
        } else {
            url.to_string()
        };
        s.url = landed;
        if s.url == s.events_url {
            s.page = 0;
            s.height_cursor = 0;
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state().url.clone())
    }

    async fn run_script(&self, script: &str) -> Result<Value> {
        let mut s = self.state();
        if script.contains("scrollTo(") {
            s.scrolls += 1;
            if s.growing_height {
                s.height_cursor += 1;
            } else {
                s.height_cursor = (s.height_cursor + 1).min(s.heights.len().saturating_sub(1));
            }
            return Ok(Value::Null);
        }
        if script.contains("scrollHeight") {
            return Ok(json!(s.height()));
        }
        Ok(Value::Null)
    }

    async fn rendered_document(&self) -> Result<String> {
        let s = self.state();
        if s.on_login_page() {
            return Ok("<html><body><form id=\"login\"></form></body></html>".to_string());
        }
        Ok(s
            .pages
            .get(s.page)
            .or(s.pages.last())
            .cloned()
            .unwrap_or_default())
    }

    async fn exists(&self, locator: &Locator) -> Result<bool> {
        let s = self.state();
        if *locator == Locator::css("body") {
            return Ok(true);
        }
        if s.on_login_page() {
            return Ok(s.login_controls.contains(locator));
        }
        if s.next.contains(locator) {
            return Ok(s.has_next());
        }
        if *locator == s.container {
            return Ok(s.next_page_loads && !s.pages.is_empty());
        }
        if s.consent.contains(locator) {
            return Ok(s.consent_banner);
        }
        Ok(false)
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let mut s = self.state();
        s.clicks.push(locator.clone());

        if s.on_login_page() && s.submit.contains(locator) {
            s.submits += 1;
            if s.failing_submits > 0 {
                s.failing_submits -= 1;
            } else if s.login_succeeds {
                s.session_valid = true;
                s.url = s.landing_url.clone();
            }
            return Ok(());
        }
        if s.next.contains(locator) && s.has_next() {
            s.page += 1;
            s.height_cursor = 0;
            if s.expire_on_page == Some(s.page) {
                s.expire_on_page = None;
                s.session_valid = false;
                s.url = s.login_url.clone();
            }
            return Ok(());
        }
        if s.consent.contains(locator) && s.consent_banner {
            s.consent_banner = false;
            return Ok(());
        }
        Err(AppError::browser(format!("nothing clickable at {locator}")))
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        self.state().fills.push((locator.clone(), text.to_string()));
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.state().screenshots += 1;
        tokio::fs::write(path, b"PNG").await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state().closed = true;
        Ok(())
    }
}

/// Markup of one event container.
pub(crate) fn card(id: &str, name: &str) -> String {
    format!(
        r#"<div class="group mb-6" id="event-card-{id}"><div class="font-caption text-lg text-black truncate -mt-1">{name}</div><div class="text-xs">1-2 Mar 2025</div><div class="text-xs">Club {name}</div><div class="text-xs">Madrid / Spain</div><a href="/zone/events/{id}/info/">Info</a></div>"#
    )
}

/// A listing page wrapping the given containers.
pub(crate) fn listing(cards: &[String]) -> String {
    format!(
        "<html><body><main>{}</main><footer>end</footer></body></html>",
        cards.concat()
    )
}

/// Config with every wait and pause set to zero and credentials present.
pub(crate) fn fast_config(out_dir: &Path) -> Config {
    let mut config = Config::default();
    config.credentials = Credentials {
        email: "tester@example.com".to_string(),
        password: "secret".to_string(),
    };
    config.session.login_timeout_secs = 0;
    config.session.control_timeout_secs = 0;
    config.session.interaction_delay_ms = 0;
    config.collector.scroll_wait_ms = 0;
    config.collector.next_control_timeout_secs = 0;
    config.collector.next_page_timeout_secs = 0;
    config.collector.settle_ms = 0;
    config.stream.publish_script = None;
    config.output.dir = out_dir.to_path_buf();
    config
}
