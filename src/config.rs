use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::errors::CrawlError;

/// When a target with a route triggers a fresh page load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NavigationPolicy {
    /// Reload for every target, so no state carries over between targets
    Always,
    /// Reload only when the route differs from the current one
    OnRouteChange,
}

/// Bounded waits and settle delays used by the traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    /// Max wait for an element to become visible
    pub action_timeout: Duration,
    /// Interval between visibility checks
    pub poll_interval: Duration,
    /// Pause after each click or type
    pub action_settle: Duration,
    /// Pause after a route load
    pub route_settle: Duration,
    /// Max wait for the theme to become observable
    pub theme_timeout: Duration,
    /// Pause after dismissing an overlay
    pub reset_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_millis(5000),
            poll_interval: Duration::from_millis(100),
            action_settle: Duration::from_millis(800),
            route_settle: Duration::from_millis(1500),
            theme_timeout: Duration::from_millis(5000),
            reset_settle: Duration::from_millis(300),
        }
    }
}

impl Timings {
    /// No settle delays; for pages that render synchronously
    pub fn immediate() -> Self {
        Self {
            action_timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(5),
            action_settle: Duration::ZERO,
            route_settle: Duration::ZERO,
            theme_timeout: Duration::from_millis(50),
            reset_settle: Duration::ZERO,
        }
    }
}

/// Everything a run needs besides the page and the state table
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: Url,
    pub output_dir: PathBuf,
    pub jpeg_quality: u8,
    pub navigation: NavigationPolicy,
    /// Scan interactive controls per route on the first breakpoint
    pub inventory: bool,
    /// Record Resource Timing entries after each target
    pub network_log: bool,
    pub timings: Timings,
}

impl CrawlConfig {
    pub fn new(base_url: &str, output_dir: impl Into<PathBuf>) -> Result<Self, CrawlError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            output_dir: output_dir.into(),
            jpeg_quality: 80,
            navigation: NavigationPolicy::Always,
            inventory: true,
            network_log: true,
            timings: Timings::default(),
        })
    }

    /// URL of a hash route, e.g. `/entertainment` → `http://host/#/entertainment`
    pub fn route_url(&self, route: &str) -> String {
        let mut url = self.base_url.clone();
        let route = if route.starts_with('/') {
            route.to_string()
        } else {
            format!("/{}", route)
        };
        url.set_fragment(Some(&route));
        url.to_string()
    }

    /// The application's root entry point
    pub fn entry_url(&self) -> String {
        self.route_url("/")
    }
}

/// Validate the base address; only http(s) makes sense for a served SPA
pub fn parse_base_url(raw: &str) -> Result<Url, CrawlError> {
    let url = Url::parse(raw).map_err(|e| CrawlError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(CrawlError::InvalidBaseUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            });
        }
    }

    if url.fragment().is_some() {
        return Err(CrawlError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: "base URL must not contain a #fragment".to_string(),
        });
    }

    Ok(url)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
