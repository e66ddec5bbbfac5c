use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Widest viewport the dashboard still lays out as mobile
pub const MOBILE_MAX_WIDTH: u32 = 768;

/// Browser viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels
    pub height: u32,
}

impl ViewportSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse viewport size from "WIDTHxHEIGHT" format (e.g., "1920x1080")
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('x').collect();
        if parts.len() != 2 {
            anyhow::bail!("Invalid viewport format. Use WIDTHxHEIGHT (e.g., 1920x1080)");
        }

        let width = parts[0]
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid width in viewport size"))?;
        let height = parts[1]
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid height in viewport size"))?;

        Ok(ViewportSize { width, height })
    }

    /// Whether the dashboard renders its mobile layout at this size
    pub fn is_mobile(&self) -> bool {
        self.width <= MOBILE_MAX_WIDTH
    }
}

impl fmt::Display for ViewportSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Color theme persisted by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => anyhow::bail!("Unknown theme: {}", s),
        }
    }
}

/// A named viewport and theme combination the dashboard is captured under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Folder and file-name component, e.g. `desktop_dark`
    pub name: String,
    pub viewport: ViewportSize,
    pub theme: Theme,
}

impl Breakpoint {
    pub fn new(name: impl Into<String>, viewport: ViewportSize, theme: Theme) -> Self {
        Self {
            name: name.into(),
            viewport,
            theme,
        }
    }

    pub fn is_mobile(&self) -> bool {
        self.viewport.is_mobile()
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.viewport, self.theme)
    }
}

pub const DESKTOP: ViewportSize = ViewportSize::new(1440, 900);
pub const MOBILE: ViewportSize = ViewportSize::new(390, 844);

/// The four breakpoints every run covers, in capture order
pub fn default_breakpoints() -> Vec<Breakpoint> {
    vec![
        Breakpoint::new("desktop_dark", DESKTOP, Theme::Dark),
        Breakpoint::new("desktop_light", DESKTOP, Theme::Light),
        Breakpoint::new("mobile_dark", MOBILE, Theme::Dark),
        Breakpoint::new("mobile_light", MOBILE, Theme::Light),
    ]
}

/// Keep only the named breakpoints, preserving declared order.
///
/// An empty filter keeps everything. Unknown names are an error so a typo
/// on the command line doesn't silently produce an empty run.
pub fn select_breakpoints(all: Vec<Breakpoint>, only: &[String]) -> Result<Vec<Breakpoint>> {
    if only.is_empty() {
        return Ok(all);
    }

    for name in only {
        if !all.iter().any(|bp| &bp.name == name) {
            let known: Vec<&str> = all.iter().map(|bp| bp.name.as_str()).collect();
            anyhow::bail!(
                "Unknown breakpoint '{}'. Known breakpoints: {}",
                name,
                known.join(", ")
            );
        }
    }

    Ok(all
        .into_iter()
        .filter(|bp| only.iter().any(|name| name == &bp.name))
        .collect())
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
