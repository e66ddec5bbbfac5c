use anyhow::{Context, Result};
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator as WdLocator};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::errors::ActionError;
use crate::page::{ControlInfo, Page, ResourceEntry};
use crate::targets::{Locator, ScrollTo};
use crate::types::{Theme, ViewportSize};
use crate::webdriver_manager::GLOBAL_WEBDRIVER_MANAGER;

/// localStorage key the dashboard keeps its theme under
pub const THEME_STORAGE_KEY: &str = "omega-theme";

/// WebDriver key code for Escape
const ESCAPE_KEY: &str = "\u{e00c}";

const INVENTORY_SCRIPT: &str = r#"
    const selectors = 'button, a[href], [role="button"], [role="tab"], [role="menuitem"], input, select, textarea, [data-testid]';
    return Array.from(document.querySelectorAll(selectors)).map(el => ({
        tag: el.tagName.toLowerCase(),
        kind: el.type || el.getAttribute('role') || 'unknown',
        text: (el.textContent || '').trim().slice(0, 100),
        id: el.id || null,
        classes: (typeof el.className === 'string' && el.className) ? el.className : null,
        test_id: el.getAttribute('data-testid'),
        href: el.href || null,
        visible: el.offsetParent !== null,
        enabled: !el.disabled
    }));
"#;

const RESOURCES_SCRIPT: &str = r#"
    const entries = performance.getEntriesByType('resource').map(e => ({
        url: e.name,
        resource_type: e.initiatorType || 'other',
        duration_ms: e.duration,
        status: e.responseStatus || null
    }));
    performance.clearResourceTimings();
    return entries;
"#;

/// Supported browser types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    /// Mozilla Firefox
    Firefox,
    /// Google Chrome/Chromium
    Chrome,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserType::Firefox),
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

impl BrowserType {
    /// Name of the WebDriver executable for this browser
    pub fn driver_name(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "geckodriver",
            BrowserType::Chrome => "chromedriver",
        }
    }

    /// Port the driver listens on when started by hand
    pub fn default_port(&self) -> u16 {
        match self {
            BrowserType::Firefox => 4444,
            BrowserType::Chrome => 9515,
        }
    }

    /// W3C capabilities for a fresh session
    pub fn capabilities(
        &self,
        headless: bool,
        viewport: ViewportSize,
        profile_dir: Option<&std::path::Path>,
    ) -> serde_json::Map<String, serde_json::Value> {
        let mut caps = serde_json::Map::new();

        match self {
            BrowserType::Firefox => {
                let mut args = Vec::new();
                if headless {
                    args.push("--headless".to_string());
                }
                args.push(format!("--width={}", viewport.width));
                args.push(format!("--height={}", viewport.height));
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            BrowserType::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                args.push("--hide-scrollbars".to_string());
                args.push(format!("--window-size={},{}", viewport.width, viewport.height));
                if let Some(dir) = profile_dir {
                    args.push(format!("--user-data-dir={}", dir.display()));
                }
                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
        }

        caps
    }
}

/// A WebDriver session driving one page
pub struct Browser {
    client: Client,
    load_timeout: Duration,
    // Chrome refuses to share profile directories; removed on drop
    _profile_dir: Option<tempfile::TempDir>,
}

impl Browser {
    /// Connect to (or start) the driver and open a session
    pub async fn new(browser_type: BrowserType, headless: bool, viewport: ViewportSize) -> Result<Self> {
        info!("Connecting to {:?} WebDriver", browser_type);

        let webdriver_url = GLOBAL_WEBDRIVER_MANAGER.ensure_driver(&browser_type).await?;

        let profile_dir = match browser_type {
            BrowserType::Chrome => Some(
                tempfile::Builder::new()
                    .prefix("statecrawl-chrome-")
                    .tempdir()
                    .context("Failed to create Chrome profile directory")?,
            ),
            BrowserType::Firefox => None,
        };

        let caps = browser_type.capabilities(
            headless,
            viewport,
            profile_dir.as_ref().map(|d| d.path()),
        );

        debug!("Connecting to WebDriver at {}", webdriver_url);

        let client = match ClientBuilder::rustls()
            .capabilities(caps.clone())
            .connect(&webdriver_url)
            .await
        {
            Ok(client) => client,
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("Session is already started")
                    || error_str.contains("session not created")
                {
                    info!("WebDriver appears to be in a bad state, attempting recovery...");
                    GLOBAL_WEBDRIVER_MANAGER.kill_driver(&browser_type);
                    tokio::time::sleep(Duration::from_millis(500)).await;

                    let new_url = GLOBAL_WEBDRIVER_MANAGER
                        .ensure_driver(&browser_type)
                        .await
                        .context("Failed to restart WebDriver after recovery")?;

                    ClientBuilder::rustls()
                        .capabilities(caps)
                        .connect(&new_url)
                        .await
                        .context("Failed to connect to WebDriver after restart")?
                } else {
                    return Err(e).context("Failed to connect to WebDriver");
                }
            }
        };

        Ok(Browser {
            client,
            load_timeout: Duration::from_secs(10),
            _profile_dir: profile_dir,
        })
    }

    async fn execute(&self, script: &str, args: Vec<serde_json::Value>) -> Result<serde_json::Value, ActionError> {
        Ok(self.client.execute(script, args).await?)
    }

    /// Poll `document.readyState` until the load completes
    async fn wait_until_loaded(&self) -> Result<(), ActionError> {
        let deadline = Instant::now() + self.load_timeout;
        loop {
            match self
                .client
                .execute("return document.readyState === 'complete';", vec![])
                .await
            {
                Ok(val) if val.as_bool().unwrap_or(false) => return Ok(()),
                Ok(_) => {}
                Err(e) => {
                    let err = ActionError::from(e);
                    if err.is_fatal() {
                        return Err(err);
                    }
                }
            }
            if Instant::now() >= deadline {
                return Err(ActionError::Timeout(format!(
                    "page did not finish loading within {} ms",
                    self.load_timeout.as_millis()
                )));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// First match of `locator` that is currently displayed
    async fn find_visible(&self, locator: &Locator) -> Result<Option<Element>, ActionError> {
        let elements = match locator {
            Locator::Css { selector } => self.client.find_all(WdLocator::Css(selector)).await?,
            Locator::Text { text, exact } => {
                let xpath = Locator::text_xpath(text, *exact);
                self.client.find_all(WdLocator::XPath(&xpath)).await?
            }
        };

        for element in elements {
            if element.is_displayed().await.unwrap_or(false) {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    async fn require_visible(&self, locator: &Locator) -> Result<Element, ActionError> {
        self.find_visible(locator)
            .await?
            .ok_or_else(|| ActionError::ElementNotFound {
                locator: locator.to_string(),
                waited_ms: 0,
            })
    }

    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

impl Page for Browser {
    async fn set_viewport(&self, size: ViewportSize) -> Result<(), ActionError> {
        debug!("Setting viewport to {}", size);
        self.client.set_window_size(size.width, size.height).await?;

        // Window size includes browser chrome; grow the window by the difference
        let chrome = self
            .execute(
                "return [window.outerWidth - window.innerWidth, window.outerHeight - window.innerHeight];",
                vec![],
            )
            .await?;
        let dx = chrome.get(0).and_then(|v| v.as_i64()).unwrap_or(0).max(0) as u32;
        let dy = chrome.get(1).and_then(|v| v.as_i64()).unwrap_or(0).max(0) as u32;
        if dx > 0 || dy > 0 {
            debug!("Correcting window size by {}x{}", dx, dy);
            self.client
                .set_window_size(size.width + dx, size.height + dy)
                .await?;
        }
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), ActionError> {
        info!("Navigating to {}", url);

        if let Err(e) = self.client.goto(url).await {
            let err = ActionError::from(e);
            if err.is_fatal() {
                return Err(err);
            }
            return Err(ActionError::Navigation {
                url: url.to_string(),
                reason: err.to_string(),
            });
        }

        self.wait_until_loaded().await?;

        // Chrome reports unreachable hosts as a successful load of its error page
        let landed = self.current_url().await?;
        if landed.starts_with("chrome-error://") || landed.starts_with("about:neterror") {
            return Err(ActionError::Navigation {
                url: url.to_string(),
                reason: format!("browser showed error page {}", landed),
            });
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ActionError> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn apply_theme(&self, theme: Theme) -> Result<(), ActionError> {
        let script = r#"
            const [key, theme] = arguments;
            localStorage.setItem(key, theme);
            document.documentElement.classList.toggle('dark', theme === 'dark');
        "#;
        let args = vec![json!(THEME_STORAGE_KEY), json!(theme.as_str())];

        self.execute(script, args.clone()).await?;
        self.client.refresh().await?;
        self.wait_until_loaded().await?;
        // Re-assert the class in case the app only reads the key on first mount
        self.execute(script, args).await?;
        Ok(())
    }

    async fn active_theme(&self) -> Result<Option<Theme>, ActionError> {
        let script = r#"
            return {
                stored: localStorage.getItem(arguments[0]),
                dark: document.documentElement.classList.contains('dark')
            };
        "#;
        let state = self.execute(script, vec![json!(THEME_STORAGE_KEY)]).await?;
        let stored = state.get("stored").and_then(|v| v.as_str());
        let dark = state.get("dark").and_then(|v| v.as_bool()).unwrap_or(false);

        Ok(match (stored, dark) {
            (Some("dark"), true) => Some(Theme::Dark),
            (Some("light"), false) => Some(Theme::Light),
            _ => None,
        })
    }

    async fn wait_visible(
        &self,
        locator: &Locator,
        timeout: Duration,
        poll: Duration,
    ) -> Result<(), ActionError> {
        let started = Instant::now();
        let deadline = started + timeout;
        loop {
            match self.find_visible(locator).await {
                Ok(Some(_)) => return Ok(()),
                Ok(None) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => debug!("Lookup of {} failed: {}", locator, err),
            }
            if Instant::now() >= deadline {
                return Err(ActionError::ElementNotFound {
                    locator: locator.to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn click(&self, locator: &Locator) -> Result<(), ActionError> {
        let element = self.require_visible(locator).await?;
        debug!("Clicking {}", locator);

        match element.click().await {
            Ok(()) => Ok(()),
            Err(e) => {
                let err = ActionError::from(e);
                if err.is_fatal() {
                    return Err(err);
                }
                // Overlapping elements intercept native clicks; dispatch one directly
                debug!("Native click on {} failed ({}), using script click", locator, err);
                let handle = serde_json::to_value(&element)
                    .map_err(|e| ActionError::Script(e.to_string()))?;
                self.execute("arguments[0].click();", vec![handle]).await?;
                Ok(())
            }
        }
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), ActionError> {
        let element = self.require_visible(locator).await?;
        element.click().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    async fn scroll(&self, to: ScrollTo) -> Result<(), ActionError> {
        debug!("Executing scroll: {}", to.script());
        self.execute(to.script(), vec![]).await?;
        Ok(())
    }

    async fn press_escape(&self) -> Result<(), ActionError> {
        let focused = self.client.active_element().await?;
        focused.send_keys(ESCAPE_KEY).await?;
        Ok(())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, ActionError> {
        self.client
            .screenshot()
            .await
            .map_err(|e| match ActionError::from(e) {
                fatal @ ActionError::Session(_) => fatal,
                other => ActionError::Screenshot(other.to_string()),
            })
    }

    async fn scan_controls(&self) -> Result<Vec<ControlInfo>, ActionError> {
        let value = self.execute(INVENTORY_SCRIPT, vec![]).await?;
        serde_json::from_value(value).map_err(|e| ActionError::Script(format!("Unexpected inventory shape: {}", e)))
    }

    async fn resources(&self) -> Result<Vec<ResourceEntry>, ActionError> {
        let value = self.execute(RESOURCES_SCRIPT, vec![]).await?;
        serde_json::from_value(value).map_err(|e| ActionError::Script(format!("Unexpected resource timing shape: {}", e)))
    }
}

#[cfg(test)]
#[path = "webdriver_test.rs"]
mod webdriver_test;
