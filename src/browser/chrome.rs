// src/browser/chrome.rs

//! Headless Chrome document source.
//!
//! Drives a real Chrome/Chromium over the DevTools protocol. Text locators
//! are resolved in-page: the matching element is tagged with a marker
//! attribute and then addressed with an ordinary CSS selector.

use std::path::Path;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::browser::{DocumentSource, Locator};
use crate::error::{AppError, Result, StepError};
use crate::models::BrowserConfig;

const MARKER_ATTR: &str = "data-harvest-target";
const MASK_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined })";

/// [`DocumentSource`] backed by a launched Chrome instance.
pub struct ChromeSource {
    browser: Mutex<Browser>,
    page: Page,
    handler: StdMutex<Option<JoinHandle<()>>>,
    page_load_timeout: Duration,
}

impl ChromeSource {
    /// Launch Chrome with the configured flags and open one blank tab.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = LaunchConfig::builder()
            .window_size(config.window_width, config.window_height)
            .request_timeout(config.page_load_timeout())
            .args(launch_args(config));
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(bin) = &config.chrome_bin {
            if bin.exists() {
                builder = builder.chrome_executable(bin);
            } else {
                log::warn!("CHROME_BIN {} does not exist, using default", bin.display());
            }
        }
        let launch_config = builder.build().map_err(AppError::browser)?;

        let (browser, mut handler) = Browser::launch(launch_config)
            .await
            .map_err(AppError::browser)?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(AppError::browser)?;
        log::info!(
            "Chrome launched (headless: {}, incognito: {})",
            config.headless,
            config.incognito
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler: StdMutex::new(Some(handler_task)),
            page_load_timeout: config.page_load_timeout(),
        })
    }

    async fn eval(&self, script: &str) -> Result<Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(AppError::browser)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    /// Turn a locator into a CSS selector that matches the intended element.
    async fn resolve(&self, locator: &Locator) -> Result<String> {
        match locator {
            Locator::Css(selector) => Ok(selector.clone()),
            Locator::Text { .. } => {
                let tagged = self.eval(&tag_script(locator)).await?;
                if tagged.as_bool() == Some(true) {
                    Ok(format!("[{MARKER_ATTR}='1']"))
                } else {
                    Err(StepError::not_found(locator.to_string()).into())
                }
            }
        }
    }
}

fn launch_args(config: &BrowserConfig) -> Vec<String> {
    let mut args: Vec<String> = [
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--disable-extensions",
        "--disable-infobars",
        "--disable-setuid-sandbox",
        "--disable-features=VizDisplayCompositor",
        "--disable-blink-features=AutomationControlled",
        "--ignore-certificate-errors",
    ]
    .iter()
    .map(|a| a.to_string())
    .collect();
    if config.incognito {
        args.push("--incognito".to_string());
    }
    args.push(format!("--user-agent={}", config.user_agent));
    args
}

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// Expression yielding the first element a text locator matches, or null.
fn find_by_text_expr(tag: &str, needles: &[String]) -> String {
    let needles = Value::from(needles.to_vec()).to_string();
    format!(
        "(() => {{ const needles = {needles}.map(n => n.toLowerCase()); \
         for (const el of document.querySelectorAll({tag})) {{ \
           const text = (el.textContent || '').toLowerCase(); \
           if (needles.some(n => text.includes(n))) return el; \
         }} return null; }})()",
        tag = js_string(tag),
    )
}

fn exists_script(locator: &Locator) -> String {
    match locator {
        Locator::Css(selector) => {
            format!("document.querySelector({}) !== null", js_string(selector))
        }
        Locator::Text { tag, needles } => format!("{} !== null", find_by_text_expr(tag, needles)),
    }
}

fn tag_script(locator: &Locator) -> String {
    let find = match locator {
        Locator::Css(selector) => format!("document.querySelector({})", js_string(selector)),
        Locator::Text { tag, needles } => find_by_text_expr(tag, needles),
    };
    format!(
        "(() => {{ document.querySelectorAll('[{MARKER_ATTR}]').forEach(e => e.removeAttribute('{MARKER_ATTR}')); \
         const el = {find}; if (!el) return false; el.setAttribute('{MARKER_ATTR}', '1'); return true; }})()"
    )
}

#[async_trait]
impl DocumentSource for ChromeSource {
    async fn navigate(&self, url: &str) -> Result<()> {
        log::debug!("Navigating to {url}");
        tokio::time::timeout(self.page_load_timeout, self.page.goto(url))
            .await
            .map_err(|_| StepError::timeout(format!("page load of {url}"), self.page_load_timeout))?
            .map_err(AppError::browser)?;
        if let Err(e) = self.eval(MASK_WEBDRIVER).await {
            log::debug!("Could not mask navigator.webdriver: {e}");
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self.page.url().await.map_err(AppError::browser)?;
        Ok(url.unwrap_or_default())
    }

    async fn run_script(&self, script: &str) -> Result<Value> {
        self.eval(script).await
    }

    async fn rendered_document(&self) -> Result<String> {
        self.page.content().await.map_err(AppError::browser)
    }

    async fn exists(&self, locator: &Locator) -> Result<bool> {
        Ok(self.eval(&exists_script(locator)).await?.as_bool() == Some(true))
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let selector = self.resolve(locator).await?;
        let element = self
            .page
            .find_element(selector.as_str())
            .await
            .map_err(|_| StepError::not_found(locator.to_string()))?;
        element.click().await.map_err(AppError::browser)?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        let selector = self.resolve(locator).await?;
        self.eval(&format!(
            "(() => {{ const el = document.querySelector({}); if (el) el.value = ''; }})()",
            js_string(&selector)
        ))
        .await?;
        let element = self
            .page
            .find_element(selector.as_str())
            .await
            .map_err(|_| StepError::not_found(locator.to_string()))?;
        element
            .click()
            .await
            .map_err(AppError::browser)?
            .type_str(text)
            .await
            .map_err(AppError::browser)?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let bytes = self
            .page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(AppError::browser)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.map_err(AppError::browser);
        if let Err(e) = browser.wait().await {
            log::debug!("Chrome process did not exit cleanly: {e}");
        }
        if let Ok(mut handler) = self.handler.lock() {
            if let Some(task) = handler.take() {
                task.abort();
            }
        }
        closed.map(|_| ())
    }
}
