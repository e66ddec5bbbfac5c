//! # statecrawl
#![allow(clippy::uninlined_format_args)]
//!
//! Visual baseline crawler for a hash-routed dashboard SPA.
//!
//! Walks a fixed table of UI states (routes, modals, tabs) under each of four
//! breakpoints (desktop/mobile × dark/light), captures a JPEG of every state
//! it reaches, and writes a traversal log, network log, DOM inventory and
//! coverage report next to the screenshots.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Crawl a locally served dashboard (starts geckodriver if needed)
//! statecrawl http://localhost:3000
//!
//! # Chrome, visible window, custom output folder
//! statecrawl http://localhost:3000 --browser chrome --no-headless --output shots
//!
//! # Only the dark desktop pass
//! statecrawl http://localhost:3000 --only desktop_dark
//!
//! # Print the state table without touching a browser
//! statecrawl http://localhost:3000 --list
//! ```
//!
//! ## Output
//!
//! ```text
//! baseline_export/
//!   desktop_dark/0001_home_default_desktop_dark.jpg
//!   ...
//!   TRAVERSAL_LOG.txt
//!   COVERAGE_REPORT.json
//!   NETWORK_LOG.json
//!   DOM_INVENTORY.json
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use statecrawl::{
//!     Browser, BrowserType, CrawlConfig, TraversalSession, dashboard_states,
//!     default_breakpoints, run_traversal,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CrawlConfig::new("http://localhost:3000", "baseline_export")?;
//! let breakpoints = default_breakpoints();
//! let browser = Browser::new(BrowserType::Firefox, true, breakpoints[0].viewport).await?;
//!
//! let mut session = TraversalSession::new(config.base_url.as_str(), &config.output_dir);
//! session.prepare(&breakpoints)?;
//! let report = run_traversal(&browser, &dashboard_states(), &breakpoints, &config, &mut session)
//!     .await
//!     .unwrap_or_else(|aborted| aborted.report);
//! session.flush(&report)?;
//! # Ok(())
//! # }
//! ```

/// Run configuration and timing bounds
pub mod config;

/// Recoverable action errors and process-level errors
pub mod errors;

/// Browser primitives the traversal depends on
pub mod page;

/// Capture outcomes and the coverage report
pub mod report;

/// Per-run log and result accumulator
pub mod session;

/// Declarative table of UI states
pub mod targets;

/// The traversal driver
pub mod traversal;

/// Viewport, theme and breakpoint definitions
pub mod types;

/// WebDriver-backed page
pub mod webdriver;

/// Automatic WebDriver process management
pub mod webdriver_manager;

pub use config::{CrawlConfig, NavigationPolicy, Timings};
pub use errors::{ActionError, CrawlError};
pub use page::{ControlInfo, Page, ResourceEntry};
pub use report::{CaptureOutcome, CaptureResult, CoverageReport};
pub use session::{NetworkLogEntry, TraversalLogEntry, TraversalSession};
pub use targets::{Action, Locator, ScrollTo, StateKind, TargetState, dashboard_states};
pub use traversal::{AbortedRun, run_traversal};
pub use types::{Breakpoint, Theme, ViewportSize, default_breakpoints};
pub use webdriver::{Browser, BrowserType};
