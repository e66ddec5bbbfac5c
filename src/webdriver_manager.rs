use anyhow::{Context, Result};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::webdriver::BrowserType;

/// Starts geckodriver/chromedriver on demand and stops what it started
pub struct WebDriverManager {
    processes: Mutex<Vec<WebDriverProcess>>,
}

struct WebDriverProcess {
    browser_type: BrowserType,
    child: Child,
    port: u16,
    url: String,
}

impl Default for WebDriverManager {
    fn default() -> Self {
        Self {
            processes: Mutex::new(Vec::new()),
        }
    }
}

impl WebDriverManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the URL of a working driver for `browser_type`, starting one if needed
    pub async fn ensure_driver(&self, browser_type: &BrowserType) -> Result<String> {
        let managed: Vec<String> = self
            .lock()
            .iter()
            .filter(|p| p.browser_type == *browser_type)
            .map(|p| p.url.clone())
            .collect();

        for url in managed {
            if Self::verify_driver_working(&url).await {
                debug!("Using existing managed WebDriver at {}", url);
                return Ok(url);
            }
        }

        let standard = format!("http://localhost:{}", browser_type.default_port());
        if Self::verify_driver_working(&standard).await {
            debug!("Found external WebDriver at {}", standard);
            return Ok(standard);
        }

        info!("WebDriver not detected, attempting to start automatically...");
        self.start_driver(browser_type).await
    }

    async fn start_driver(&self, browser_type: &BrowserType) -> Result<String> {
        let command = browser_type.driver_name();
        let port = Self::find_free_port(browser_type.default_port())?;
        let args = match browser_type {
            BrowserType::Firefox => vec!["--port".to_string(), port.to_string()],
            BrowserType::Chrome => vec![format!("--port={}", port)],
        };

        if !Self::command_exists(command) {
            anyhow::bail!(
                "{} not found in PATH. Please install it:\n\
                  macOS: brew install {}\n\
                  Linux: Download from official releases\n\
                  Or see: https://www.selenium.dev/documentation/webdriver/getting_started/install_drivers/",
                command,
                command
            );
        }

        info!("Starting {} on port {}", command, port);

        let mut cmd = Command::new(command);
        cmd.args(&args).stdout(Stdio::null()).stderr(Stdio::null());

        // Own process group so the browser children go down with the driver
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn().context(format!("Failed to start {}", command))?;
        let url = format!("http://localhost:{}", port);

        self.lock().push(WebDriverProcess {
            browser_type: *browser_type,
            child,
            port,
            url: url.clone(),
        });

        // 3 seconds total
        for attempt in 1..=30 {
            if Self::is_driver_running(&url).await {
                info!("WebDriver started successfully on port {}", port);
                return Ok(url);
            }
            if attempt < 30 {
                sleep(Duration::from_millis(100)).await;
            }
        }

        self.stop_where(|p| p.port == port);
        anyhow::bail!("{} failed to start within timeout", command)
    }

    /// Check if a command exists in PATH
    pub fn command_exists(command: &str) -> bool {
        let finder = if cfg!(windows) { "where" } else { "which" };
        Command::new(finder)
            .arg(command)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Preferred port if free, otherwise the next two, otherwise one from the OS
    pub fn find_free_port(preferred: u16) -> Result<u16> {
        for port in preferred..preferred.saturating_add(3) {
            if !Self::is_port_in_use(port) {
                return Ok(port);
            }
            debug!("Port {} is in use", port);
        }

        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        drop(listener);
        Ok(port)
    }

    pub fn is_port_in_use(port: u16) -> bool {
        std::net::TcpListener::bind(("127.0.0.1", port)).is_err()
    }

    /// Whether anything answers on the driver's `/status` endpoint
    pub async fn is_driver_running(url: &str) -> bool {
        match Self::status(url).await {
            Some(response) => response.status().is_success(),
            None => false,
        }
    }

    /// Whether the driver reports `ready: true`
    async fn verify_driver_working(url: &str) -> bool {
        let Some(response) = Self::status(url).await else {
            return false;
        };
        match response.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("value")
                .and_then(|v| v.get("ready"))
                .and_then(|r| r.as_bool())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn status(url: &str) -> Option<reqwest::Response> {
        reqwest::Client::new()
            .get(format!("{}/status", url))
            .timeout(Duration::from_secs(1))
            .send()
            .await
            .ok()
    }

    /// Stop the managed driver for a browser type
    pub fn kill_driver(&self, browser_type: &BrowserType) {
        warn!("Stopping {}", browser_type.driver_name());
        self.stop_where(|p| p.browser_type == *browser_type);
    }

    /// Stop all managed WebDriver processes
    pub fn stop_all(&self) {
        self.stop_where(|_| true);
    }

    fn stop_where(&self, matches: impl Fn(&WebDriverProcess) -> bool) {
        let mut processes = self.lock();
        let mut kept = Vec::with_capacity(processes.len());
        for mut process in processes.drain(..) {
            if !matches(&process) {
                kept.push(process);
                continue;
            }
            debug!("Stopping WebDriver on port {}", process.port);

            #[cfg(unix)]
            Self::kill_process_group(process.child.id() as i32);

            let _ = process.child.kill();
            let _ = process.child.wait();
        }
        *processes = kept;
    }

    #[cfg(unix)]
    fn kill_process_group(pgid: i32) {
        if let Err(e) = Command::new("kill")
            .args(["-TERM", &format!("-{}", pgid)])
            .output()
        {
            debug!("Failed to send SIGTERM to process group {}: {}", pgid, e);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<WebDriverProcess>> {
        // A panic while holding the lock leaves the list itself intact
        self.processes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for WebDriverManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}

// Global WebDriver manager instance
lazy_static::lazy_static! {
    pub static ref GLOBAL_WEBDRIVER_MANAGER: WebDriverManager = WebDriverManager::new();
}

#[cfg(test)]
#[path = "webdriver_manager_test.rs"]
mod webdriver_manager_test;
