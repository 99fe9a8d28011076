//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::browser::Locator;
use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Target site routes
    #[serde(default)]
    pub site: SiteConfig,

    /// Element locators for forms, pagination and containers
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Browser driver settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Login and session verification
    #[serde(default)]
    pub session: SessionConfig,

    /// Lazy-load and pagination bounds
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Field extraction heuristics
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Append-only stream and publishing
    #[serde(default)]
    pub stream: StreamConfig,

    /// Output locations
    #[serde(default)]
    pub output: OutputConfig,

    /// Log verbosity
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Account credentials (environment only)
    #[serde(skip)]
    pub credentials: Credentials,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Overlay settings from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay settings from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(email) = get("FLOW_EMAIL") {
            self.credentials.email = email;
        }
        if let Some(password) = get("FLOW_PASS") {
            self.credentials.password = password;
        }
        if let Some(v) = get("HEADLESS") {
            self.browser.headless = parse_flag(&v);
        }
        if let Some(v) = get("INCOGNITO") {
            self.browser.incognito = parse_flag(&v);
        }
        if let Some(v) = get("MAX_SCROLLS") {
            self.collector.max_scrolls = parse_number("MAX_SCROLLS", &v)?;
        }
        if let Some(v) = get("SCROLL_WAIT_S") {
            self.collector.scroll_wait_ms = parse_seconds_as_ms("SCROLL_WAIT_S", &v)?;
        }
        if let Some(v) = get("OUT_DIR") {
            self.output.dir = PathBuf::from(v);
        }
        if let Some(v) = get("SNAPSHOT_EVERY") {
            self.stream.snapshot_every = parse_number("SNAPSHOT_EVERY", &v)?;
        }
        if let Some(v) = get("STREAM_EXTRA_SLEEP_MIN") {
            self.stream.extra_delay_min_ms = parse_seconds_as_ms("STREAM_EXTRA_SLEEP_MIN", &v)?;
        }
        if let Some(v) = get("STREAM_EXTRA_SLEEP_MAX") {
            self.stream.extra_delay_max_ms = parse_seconds_as_ms("STREAM_EXTRA_SLEEP_MAX", &v)?;
        }
        if let Some(v) = get("CHROME_BIN") {
            self.browser.chrome_bin = Some(PathBuf::from(v));
        }
        if let Some(v) = get("CHROME_UA") {
            self.browser.user_agent = v;
        }
        Ok(())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.site.base_url)
            .map_err(|e| AppError::validation(format!("site.base_url is invalid: {e}")))?;
        if self.site.login_path.trim().is_empty() {
            return Err(AppError::validation("site.login_path is empty"));
        }
        if self.selectors.container.trim().is_empty() {
            return Err(AppError::validation("selectors.container is empty"));
        }
        for (name, list) in [
            ("selectors.email", &self.selectors.email),
            ("selectors.password", &self.selectors.password),
            ("selectors.submit", &self.selectors.submit),
            ("selectors.next_page", &self.selectors.next_page),
        ] {
            if list.is_empty() {
                return Err(AppError::validation(format!("{name} has no locators")));
            }
        }
        if self.session.max_login_attempts == 0 {
            return Err(AppError::validation("session.max_login_attempts must be > 0"));
        }
        if self.collector.max_pages == 0 {
            return Err(AppError::validation("collector.max_pages must be > 0"));
        }
        if self.stream.snapshot_every == 0 {
            return Err(AppError::validation("stream.snapshot_every must be > 0"));
        }
        if self.stream.extra_delay_min_ms > self.stream.extra_delay_max_ms {
            return Err(AppError::validation(
                "stream.extra_delay_min_ms must not exceed stream.extra_delay_max_ms",
            ));
        }
        Ok(())
    }
}

/// Target site routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Origin every relative link is resolved against
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Login route; its presence in the current URL means "not authenticated"
    #[serde(default = "defaults::login_path")]
    pub login_path: String,

    /// Listing route
    #[serde(default = "defaults::events_path")]
    pub events_path: String,

    /// URL fragments that prove a completed login
    #[serde(default = "defaults::post_login_markers")]
    pub post_login_markers: Vec<String>,
}

impl SiteConfig {
    pub fn login_url(&self) -> String {
        join_route(&self.base_url, &self.login_path)
    }

    pub fn events_url(&self) -> String {
        join_route(&self.base_url, &self.events_path)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            login_path: defaults::login_path(),
            events_path: defaults::events_path(),
            post_login_markers: defaults::post_login_markers(),
        }
    }
}

fn join_route(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Element locators, each list tried in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// CSS selector of one event container
    #[serde(default = "defaults::container")]
    pub container: String,

    #[serde(default = "defaults::email")]
    pub email: Vec<Locator>,

    #[serde(default = "defaults::password")]
    pub password: Vec<Locator>,

    #[serde(default = "defaults::submit")]
    pub submit: Vec<Locator>,

    #[serde(default = "defaults::next_page")]
    pub next_page: Vec<Locator>,

    #[serde(default = "defaults::cookie_consent")]
    pub cookie_consent: Vec<Locator>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            container: defaults::container(),
            email: defaults::email(),
            password: defaults::password(),
            submit: defaults::submit(),
            next_page: defaults::next_page(),
            cookie_consent: defaults::cookie_consent(),
        }
    }
}

/// Browser driver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "defaults::enabled")]
    pub headless: bool,

    #[serde(default = "defaults::enabled")]
    pub incognito: bool,

    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Custom Chrome/Chromium executable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_bin: Option<PathBuf>,

    #[serde(default = "defaults::page_load_timeout")]
    pub page_load_timeout_secs: u64,

    #[serde(default = "defaults::window_width")]
    pub window_width: u32,

    #[serde(default = "defaults::window_height")]
    pub window_height: u32,
}

impl BrowserConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            incognito: true,
            user_agent: defaults::user_agent(),
            chrome_bin: None,
            page_load_timeout_secs: defaults::page_load_timeout(),
            window_width: defaults::window_width(),
            window_height: defaults::window_height(),
        }
    }
}

/// Login and session verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Total login attempts before giving up
    #[serde(default = "defaults::max_login_attempts")]
    pub max_login_attempts: usize,

    /// Wait for the post-submit redirect
    #[serde(default = "defaults::login_timeout")]
    pub login_timeout_secs: u64,

    /// Wait for the login form controls to appear
    #[serde(default = "defaults::control_timeout")]
    pub control_timeout_secs: u64,

    /// Upper bound of the randomized pause between form interactions
    #[serde(default = "defaults::interaction_delay")]
    pub interaction_delay_ms: u64,
}

impl SessionConfig {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_secs(self.control_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_login_attempts: defaults::max_login_attempts(),
            login_timeout_secs: defaults::login_timeout(),
            control_timeout_secs: defaults::control_timeout(),
            interaction_delay_ms: defaults::interaction_delay(),
        }
    }
}

/// Lazy-load and pagination bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Scroll-to-bottom iterations per page view
    #[serde(default = "defaults::max_scrolls")]
    pub max_scrolls: usize,

    /// Wait after each scroll
    #[serde(default = "defaults::scroll_wait")]
    pub scroll_wait_ms: u64,

    /// Hard ceiling on pages visited in one run
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Wait for a clickable "next" control
    #[serde(default = "defaults::next_control_timeout")]
    pub next_control_timeout_secs: u64,

    /// Wait for the next page's containers
    #[serde(default = "defaults::next_page_timeout")]
    pub next_page_timeout_secs: u64,

    /// Pause after lazy-loading, before reading the document
    #[serde(default = "defaults::settle")]
    pub settle_ms: u64,
}

impl CollectorConfig {
    pub fn scroll_wait(&self) -> Duration {
        Duration::from_millis(self.scroll_wait_ms)
    }

    pub fn next_control_timeout(&self) -> Duration {
        Duration::from_secs(self.next_control_timeout_secs)
    }

    pub fn next_page_timeout(&self) -> Duration {
        Duration::from_secs(self.next_page_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_scrolls: defaults::max_scrolls(),
            scroll_wait_ms: defaults::scroll_wait(),
            max_pages: defaults::max_pages(),
            next_control_timeout_secs: defaults::next_control_timeout(),
            next_page_timeout_secs: defaults::next_page_timeout(),
            settle_ms: defaults::settle(),
        }
    }
}

/// Field extraction heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Treat a container without a status badge as a finished event
    #[serde(default = "defaults::enabled")]
    pub assume_finished: bool,

    /// Flag used when a container has none; an empty string disables it
    #[serde(default = "defaults::default_flag")]
    pub default_flag: Option<String>,

    /// Badge keywords that classify an event as finished
    #[serde(default = "defaults::finished_keywords")]
    pub finished_keywords: Vec<String>,

    /// Place names that confirm a slash-separated location
    #[serde(default = "defaults::location_tokens")]
    pub location_tokens: Vec<String>,

    /// Country names that disqualify a text as a club name
    #[serde(default = "defaults::country_tokens")]
    pub country_tokens: Vec<String>,

    /// Length ceiling for the loose location fallback
    #[serde(default = "defaults::location_max_len")]
    pub location_max_len: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            assume_finished: true,
            default_flag: defaults::default_flag(),
            finished_keywords: defaults::finished_keywords(),
            location_tokens: defaults::location_tokens(),
            country_tokens: defaults::country_tokens(),
            location_max_len: defaults::location_max_len(),
        }
    }
}

impl ExtractorConfig {
    /// The configured fallback flag, if one is enabled.
    pub fn fallback_flag(&self) -> Option<&str> {
        self.default_flag.as_deref().filter(|f| !f.trim().is_empty())
    }
}

/// Append-only stream and publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Snapshot cadence in appended records
    #[serde(default = "defaults::snapshot_every")]
    pub snapshot_every: usize,

    /// External upload script; `None` keeps everything local
    #[serde(default = "defaults::publish_script")]
    pub publish_script: Option<PathBuf>,

    #[serde(default = "defaults::publish_interpreter")]
    pub publish_interpreter: String,

    /// Wall-clock budget for one publish call
    #[serde(default = "defaults::publish_timeout")]
    pub publish_timeout_secs: u64,

    /// Abort instead of continuing locally when the script is missing
    #[serde(default)]
    pub strict_publisher: bool,

    #[serde(default)]
    pub extra_delay_min_ms: u64,

    #[serde(default)]
    pub extra_delay_max_ms: u64,
}

impl StreamConfig {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            snapshot_every: defaults::snapshot_every(),
            publish_script: defaults::publish_script(),
            publish_interpreter: defaults::publish_interpreter(),
            publish_timeout_secs: defaults::publish_timeout(),
            strict_publisher: false,
            extra_delay_min_ms: 0,
            extra_delay_max_ms: 0,
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "defaults::output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: defaults::output_dir(),
        }
    }
}

/// Log verbosity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Account credentials.
#[derive(Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::config(format!("{key} must be a non-negative integer, got '{value}'")))
}

fn parse_seconds_as_ms(key: &str, value: &str) -> Result<u64> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| AppError::config(format!("{key} must be a number of seconds, got '{value}'")))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(AppError::config(format!("{key} must be >= 0, got '{value}'")));
    }
    Ok((secs * 1000.0).round() as u64)
}

mod defaults {
    use std::path::PathBuf;

    use crate::browser::Locator;

    pub fn enabled() -> bool {
        true
    }

    // Site defaults
    pub fn base_url() -> String {
        "https://www.flowagility.com".into()
    }
    pub fn login_path() -> String {
        "/user/login".into()
    }
    pub fn events_path() -> String {
        "/zone/events/past".into()
    }
    pub fn post_login_markers() -> Vec<String> {
        vec!["dashboard".into(), "zone".into()]
    }

    // Selector defaults
    pub fn container() -> String {
        "div.group.mb-6".into()
    }
    pub fn email() -> Vec<Locator> {
        vec![
            Locator::css("input[name='user[email]']"),
            Locator::css("#user_email"),
            Locator::css("input[type='email']"),
            Locator::css("input[name*='email']"),
        ]
    }
    pub fn password() -> Vec<Locator> {
        vec![
            Locator::css("input[name='user[password]']"),
            Locator::css("#user_password"),
            Locator::css("input[type='password']"),
        ]
    }
    pub fn submit() -> Vec<Locator> {
        vec![
            Locator::css("button[type='submit']"),
            Locator::text("button", &["Sign", "Log", "Iniciar"]),
        ]
    }
    pub fn next_page() -> Vec<Locator> {
        vec![
            Locator::css("a[class*='next']"),
            Locator::text("a", &["Siguiente", "Next"]),
        ]
    }
    pub fn cookie_consent() -> Vec<Locator> {
        vec![
            Locator::css("[data-testid='uc-accept-all-button']"),
            Locator::css("button[aria-label='Accept all']"),
            Locator::css("button[aria-label='Aceptar todo']"),
            Locator::css("button[mode='primary']"),
            Locator::text("button", &["aceptar", "accept", "consent", "agree", "de acuerdo"]),
        ]
    }

    // Browser defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
    }
    pub fn page_load_timeout() -> u64 {
        75
    }
    pub fn window_width() -> u32 {
        1920
    }
    pub fn window_height() -> u32 {
        1080
    }

    // Session defaults
    pub fn max_login_attempts() -> usize {
        3
    }
    pub fn login_timeout() -> u64 {
        40
    }
    pub fn control_timeout() -> u64 {
        10
    }
    pub fn interaction_delay() -> u64 {
        1000
    }

    // Collector defaults
    pub fn max_scrolls() -> usize {
        15
    }
    pub fn scroll_wait() -> u64 {
        3000
    }
    pub fn max_pages() -> usize {
        50
    }
    pub fn next_control_timeout() -> u64 {
        10
    }
    pub fn next_page_timeout() -> u64 {
        15
    }
    pub fn settle() -> u64 {
        2000
    }

    // Extractor defaults
    pub fn default_flag() -> Option<String> {
        Some("🇪🇸".into())
    }
    pub fn finished_keywords() -> Vec<String> {
        vec!["Finalizado".into(), "Completado".into()]
    }
    pub fn location_tokens() -> Vec<String> {
        vec![
            "Spain".into(),
            "España".into(),
            "Madrid".into(),
            "Barcelona".into(),
        ]
    }
    pub fn country_tokens() -> Vec<String> {
        vec!["Spain".into(), "España".into()]
    }
    pub fn location_max_len() -> usize {
        100
    }

    // Stream defaults
    pub fn snapshot_every() -> usize {
        10
    }
    pub fn publish_script() -> Option<PathBuf> {
        Some(PathBuf::from("scripts/upload_event.sh"))
    }
    pub fn publish_interpreter() -> String {
        "bash".into()
    }
    pub fn publish_timeout() -> u64 {
        120
    }

    // Output defaults
    pub fn output_dir() -> PathBuf {
        PathBuf::from("./output")
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert!(config.browser.headless);
        assert!(config.browser.incognito);
        assert_eq!(config.collector.max_scrolls, 15);
        assert_eq!(config.collector.scroll_wait_ms, 3000);
        assert_eq!(config.stream.snapshot_every, 10);
        assert_eq!(config.output.dir, PathBuf::from("./output"));
        assert_eq!(config.stream.extra_delay_max_ms, 0);
        assert!(!config.credentials.is_complete());
    }

    #[test]
    fn validate_rejects_zero_snapshot_cadence() {
        let mut config = Config::default();
        config.stream.snapshot_every = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_page_ceiling() {
        let mut config = Config::default();
        config.collector.max_pages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_delay_bounds() {
        let mut config = Config::default();
        config.stream.extra_delay_min_ms = 500;
        config.stream.extra_delay_max_ms = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.site.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overlay_reads_recognized_variables() {
        let mut config = Config::default();
        config
            .apply_env_from(lookup(&[
                ("FLOW_EMAIL", "me@example.com"),
                ("FLOW_PASS", "secret"),
                ("HEADLESS", "false"),
                ("MAX_SCROLLS", "4"),
                ("SCROLL_WAIT_S", "1.5"),
                ("OUT_DIR", "/tmp/out"),
                ("SNAPSHOT_EVERY", "3"),
                ("STREAM_EXTRA_SLEEP_MAX", "0.25"),
            ]))
            .unwrap();

        assert!(config.credentials.is_complete());
        assert!(!config.browser.headless);
        assert!(config.browser.incognito);
        assert_eq!(config.collector.max_scrolls, 4);
        assert_eq!(config.collector.scroll_wait_ms, 1500);
        assert_eq!(config.output.dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.stream.snapshot_every, 3);
        assert_eq!(config.stream.extra_delay_max_ms, 250);
    }

    #[test]
    fn env_overlay_rejects_malformed_numbers() {
        let mut config = Config::default();
        let result = config.apply_env_from(lookup(&[("MAX_SCROLLS", "lots")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials {
            email: "me@example.com".into(),
            password: "hunter2".into(),
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("me@example.com"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config: Config = toml::from_str(
            r#"
            [collector]
            max_pages = 5

            [extractor]
            assume_finished = false

            [selectors]
            next_page = ["a.more", { tag = "a", needles = ["More"] }]
            "#,
        )
        .unwrap();

        assert_eq!(config.collector.max_pages, 5);
        assert_eq!(config.collector.max_scrolls, 15);
        assert!(!config.extractor.assume_finished);
        assert_eq!(
            config.selectors.next_page,
            vec![Locator::css("a.more"), Locator::text("a", &["More"])]
        );
        assert_eq!(config.selectors.email, defaults::email());
    }

    #[test]
    fn empty_default_flag_turns_it_off() {
        let config: Config = toml::from_str(
            r#"
            [extractor]
            default_flag = ""
            "#,
        )
        .unwrap();
        assert_eq!(config.extractor.fallback_flag(), None);
        assert_eq!(Config::default().extractor.fallback_flag(), Some("🇪🇸"));
    }

    #[test]
    fn shipped_config_loads_and_validates() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("harvest.toml");
        let config = Config::load(&path).unwrap();
        config.validate().unwrap();
        assert_eq!(config.selectors.next_page.len(), 2);
        assert_eq!(config.extractor.default_flag.as_deref(), Some("🇪🇸"));
    }

    #[test]
    fn site_urls_join_routes() {
        let site = SiteConfig::default();
        assert_eq!(site.login_url(), "https://www.flowagility.com/user/login");
        assert_eq!(
            site.events_url(),
            "https://www.flowagility.com/zone/events/past"
        );
    }
}
