//! Browser primitives the traversal is written against.
//!
//! [`crate::webdriver::Browser`] implements this over a WebDriver session;
//! tests drive the traversal with an in-memory page instead.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ActionError;
use crate::targets::{Locator, ScrollTo};
use crate::types::{Theme, ViewportSize};

/// An interactive control found on a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlInfo {
    pub tag: String,
    /// `type` attribute, ARIA role, or "unknown"
    pub kind: String,
    pub text: String,
    pub id: Option<String>,
    pub classes: Option<String>,
    pub test_id: Option<String>,
    pub href: Option<String>,
    pub visible: bool,
    pub enabled: bool,
}

/// A resource the page fetched, as reported by the Resource Timing API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub url: String,
    pub resource_type: String,
    pub duration_ms: f64,
    #[serde(default)]
    pub status: Option<u16>,
}

/// One browser page, driven one command at a time
#[allow(async_fn_in_trait)]
pub trait Page {
    /// Resize so the page's inner viewport matches `size`
    async fn set_viewport(&self, size: ViewportSize) -> Result<(), ActionError>;

    /// Load `url` and wait for the document to finish loading
    async fn navigate(&self, url: &str) -> Result<(), ActionError>;

    async fn current_url(&self) -> Result<String, ActionError>;

    /// Persist `theme` as the app's preference and reload so it is picked up
    async fn apply_theme(&self, theme: Theme) -> Result<(), ActionError>;

    /// The theme the page currently shows, if it can be determined
    async fn active_theme(&self) -> Result<Option<Theme>, ActionError>;

    /// Wait until an element matching `locator` is visible
    async fn wait_visible(
        &self,
        locator: &Locator,
        timeout: Duration,
        poll: Duration,
    ) -> Result<(), ActionError>;

    /// Click the first visible match
    async fn click(&self, locator: &Locator) -> Result<(), ActionError>;

    /// Click the first visible match and type into it
    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), ActionError>;

    async fn scroll(&self, to: ScrollTo) -> Result<(), ActionError>;

    /// Send the Escape key to the focused element
    async fn press_escape(&self) -> Result<(), ActionError>;

    /// PNG-encoded screenshot of the viewport
    async fn screenshot_png(&self) -> Result<Vec<u8>, ActionError>;

    /// Interactive controls on the current document
    async fn scan_controls(&self) -> Result<Vec<ControlInfo>, ActionError>;

    /// Resources fetched since the previous call or the last page load
    async fn resources(&self) -> Result<Vec<ResourceEntry>, ActionError>;
}
