//! Capture outcomes and the coverage report built from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::types::default_breakpoints;

/// Result of trying to reach and photograph one state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Screenshot written and verified on disk
    Success { path: PathBuf, bytes: u64 },
    Failure { reason: String },
}

impl CaptureOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        CaptureOutcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CaptureOutcome::Success { .. })
    }
}

/// Recorded outcome of one target under one breakpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub target: String,
    pub breakpoint: String,
    pub description: String,
    pub success: bool,
    /// Screenshot path relative to the output directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CaptureResult {
    pub fn from_outcome(
        target: &str,
        breakpoint: &str,
        description: &str,
        outcome: CaptureOutcome,
        output_dir: &Path,
    ) -> Self {
        let (success, screenshot, bytes, error) = match outcome {
            CaptureOutcome::Success { path, bytes } => {
                let relative = path
                    .strip_prefix(output_dir)
                    .map(Path::to_path_buf)
                    .unwrap_or(path);
                (true, Some(relative), Some(bytes), None)
            }
            CaptureOutcome::Failure { reason } => (false, None, None, Some(reason)),
        };

        Self {
            target: target.to_string(),
            breakpoint: breakpoint.to_string(),
            description: description.to_string(),
            success,
            screenshot,
            bytes,
            error,
            timestamp: Utc::now(),
        }
    }

    /// Identity of the (target, breakpoint) pair
    pub fn key(&self) -> (&str, &str) {
        (&self.target, &self.breakpoint)
    }
}

/// Aggregate of every capture in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub run_id: uuid::Uuid,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_discovered: usize,
    pub total_exercised: usize,
    pub total_failed: usize,
    pub coverage_percentage: f64,
    pub elements: Vec<CaptureResult>,
    pub failures: Vec<CaptureResult>,
}

impl CoverageReport {
    pub fn from_results(
        base_url: &str,
        started_at: DateTime<Utc>,
        results: Vec<CaptureResult>,
    ) -> Self {
        let (elements, failures): (Vec<_>, Vec<_>) =
            results.into_iter().partition(|r| r.success);

        let mut report = Self {
            run_id: uuid::Uuid::new_v4(),
            base_url: base_url.to_string(),
            started_at,
            finished_at: Utc::now(),
            total_discovered: 0,
            total_exercised: 0,
            total_failed: 0,
            coverage_percentage: 0.0,
            elements,
            failures,
        };
        report.recount();
        report
    }

    fn recount(&mut self) {
        self.total_exercised = self.elements.len();
        self.total_failed = self.failures.len();
        self.total_discovered = self.total_exercised + self.total_failed;
        self.coverage_percentage = coverage_percentage(self.total_exercised, self.total_discovered);
    }

    /// Every result, successes first
    pub fn results(&self) -> impl Iterator<Item = &CaptureResult> {
        self.elements.iter().chain(self.failures.iter())
    }

    /// Combine reports from independent runs, e.g. one per breakpoint.
    ///
    /// The merged result lists are sorted by declared breakpoint order, then
    /// target, so the outcome doesn't depend on the order the reports are
    /// given in.
    pub fn merge(reports: Vec<CoverageReport>) -> Option<CoverageReport> {
        let started_at = reports.iter().map(|r| r.started_at).min()?;
        let finished_at = reports.iter().map(|r| r.finished_at).max()?;
        let mut base_urls: Vec<&str> = reports.iter().map(|r| r.base_url.as_str()).collect();
        base_urls.sort_unstable();
        let base_url = base_urls.first().map(|s| s.to_string()).unwrap_or_default();

        let mut elements = Vec::new();
        let mut failures = Vec::new();
        for report in &reports {
            elements.extend(report.elements.iter().cloned());
            failures.extend(report.failures.iter().cloned());
        }
        elements.sort_by(merge_order);
        failures.sort_by(merge_order);

        let mut merged = CoverageReport {
            run_id: uuid::Uuid::new_v4(),
            base_url,
            started_at,
            finished_at,
            total_discovered: 0,
            total_exercised: 0,
            total_failed: 0,
            coverage_percentage: 0.0,
            elements,
            failures,
        };
        merged.recount();
        Some(merged)
    }
}

/// Declared breakpoint order first; names outside the default set go last.
/// Repeated pairs fall back to timestamp and error text.
fn merge_order(a: &CaptureResult, b: &CaptureResult) -> Ordering {
    let rank = |name: &str| {
        default_breakpoints()
            .iter()
            .position(|bp| bp.name == name)
            .unwrap_or(usize::MAX)
    };
    rank(&a.breakpoint)
        .cmp(&rank(&b.breakpoint))
        .then_with(|| a.breakpoint.cmp(&b.breakpoint))
        .then_with(|| a.target.cmp(&b.target))
        .then_with(|| a.timestamp.cmp(&b.timestamp))
        .then_with(|| a.error.cmp(&b.error))
}

/// Share of exercised states in percent; 0.0 when nothing was discovered
pub fn coverage_percentage(exercised: usize, discovered: usize) -> f64 {
    if discovered == 0 {
        return 0.0;
    }
    let pct = exercised as f64 * 100.0 / discovered as f64;
    (pct * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "report_test.rs"]
mod report_test;
