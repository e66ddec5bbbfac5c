use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single browser action or capture.
///
/// Everything except [`ActionError::Session`] is recoverable: the traversal
/// records it against the current target and moves on.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The element never became visible within the wait bound
    #[error("element not found: {locator} (waited {waited_ms} ms)")]
    ElementNotFound { locator: String, waited_ms: u64 },

    /// A bounded wait other than element visibility ran out
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The page could not be loaded
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The requested theme never became observable on the page
    #[error("theme did not settle: expected {expected}, observed {observed}")]
    Theme { expected: String, observed: String },

    /// Script execution inside the page failed
    #[error("script failed: {0}")]
    Script(String),

    /// The browser returned no usable screenshot
    #[error("screenshot failed: {0}")]
    Screenshot(String),

    /// Writing or verifying an output file failed
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The WebDriver session is gone; nothing further can succeed
    #[error("browser session lost: {0}")]
    Session(String),
}

impl ActionError {
    /// Whether this error must abort the whole traversal
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActionError::Session(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ActionError::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify a W3C WebDriver error code such as `"no such element"`
    pub(crate) fn from_webdriver_code(code: &str, detail: String) -> Self {
        match code {
            "invalid session id" => ActionError::Session(detail),
            "no such element" => ActionError::ElementNotFound {
                locator: detail,
                waited_ms: 0,
            },
            "timeout" | "script timeout" => ActionError::Timeout(detail),
            _ => ActionError::Script(detail),
        }
    }
}

impl From<fantoccini::error::CmdError> for ActionError {
    fn from(err: fantoccini::error::CmdError) -> Self {
        use fantoccini::error::CmdError;

        if err.is_miss() {
            return ActionError::ElementNotFound {
                locator: err.to_string(),
                waited_ms: 0,
            };
        }

        match &err {
            CmdError::Lost(e) => ActionError::Session(e.to_string()),
            CmdError::WaitTimeout => ActionError::Timeout(err.to_string()),
            CmdError::Standard(wd) => ActionError::from_webdriver_code(wd.error(), err.to_string()),
            _ => ActionError::Script(err.to_string()),
        }
    }
}

/// Process-level error carrying an exit code
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Base URL could not be parsed (exit code 2)
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// WebDriver could not be reached or started (exit code 4)
    #[error("WebDriver connection failed: {0}")]
    WebDriverFailed(String),

    /// Output directory or artifact could not be written (exit code 1)
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The browser session died mid-run (exit code 6)
    #[error("traversal aborted after {completed} captures: {reason}")]
    Aborted { completed: usize, reason: String },

    /// Generic error (exit code 1)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CrawlError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CrawlError::InvalidBaseUrl { .. } => 2,
            CrawlError::WebDriverFailed(_) => 4,
            CrawlError::Aborted { .. } => 6,
            CrawlError::Io { .. } | CrawlError::Other(_) => 1,
        }
    }
}

#[cfg(test)]
#[path = "errors_test.rs"]
mod errors_test;
