//! Per-run accumulator for logs, results and page inventories.
//!
//! A [`TraversalSession`] is created for one run, appended to by the driver,
//! and flushed to the output directory once at the end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::errors::CrawlError;
use crate::page::{ControlInfo, ResourceEntry};
use crate::report::{CaptureResult, CoverageReport};
use crate::types::Breakpoint;

pub const TRAVERSAL_LOG_FILE: &str = "TRAVERSAL_LOG.txt";
pub const COVERAGE_REPORT_FILE: &str = "COVERAGE_REPORT.json";
pub const NETWORK_LOG_FILE: &str = "NETWORK_LOG.json";
pub const DOM_INVENTORY_FILE: &str = "DOM_INVENTORY.json";

/// Timestamped line of the traversal log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalLogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl std::fmt::Display for TraversalLogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.timestamp.to_rfc3339(), self.message)
    }
}

/// A fetched resource attributed to the state that was on screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkLogEntry {
    pub timestamp: DateTime<Utc>,
    pub breakpoint: String,
    pub target: String,
    #[serde(flatten)]
    pub resource: ResourceEntry,
}

/// Owns everything a single traversal accumulates
#[derive(Debug)]
pub struct TraversalSession {
    base_url: String,
    output_dir: PathBuf,
    started_at: DateTime<Utc>,
    log: Vec<TraversalLogEntry>,
    results: Vec<CaptureResult>,
    network: Vec<NetworkLogEntry>,
    inventory: BTreeMap<String, Vec<ControlInfo>>,
}

impl TraversalSession {
    pub fn new(base_url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            output_dir: output_dir.into(),
            started_at: Utc::now(),
            log: Vec::new(),
            results: Vec::new(),
            network: Vec::new(),
            inventory: BTreeMap::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory and one folder per breakpoint
    pub fn prepare(&self, breakpoints: &[Breakpoint]) -> Result<(), CrawlError> {
        for bp in breakpoints {
            let dir = self.output_dir.join(&bp.name);
            fs::create_dir_all(&dir).map_err(|source| CrawlError::Io { path: dir, source })?;
        }
        fs::create_dir_all(&self.output_dir).map_err(|source| CrawlError::Io {
            path: self.output_dir.clone(),
            source,
        })
    }

    /// Append to the traversal log and echo it through tracing
    pub fn log(&mut self, message: impl Into<String>) {
        let entry = TraversalLogEntry {
            timestamp: Utc::now(),
            message: message.into(),
        };
        info!("{}", entry.message);
        self.log.push(entry);
    }

    pub fn record(&mut self, result: CaptureResult) {
        self.results.push(result);
    }

    pub fn record_network(&mut self, breakpoint: &str, target: &str, resources: Vec<ResourceEntry>) {
        let now = Utc::now();
        self.network.extend(resources.into_iter().map(|resource| NetworkLogEntry {
            timestamp: now,
            breakpoint: breakpoint.to_string(),
            target: target.to_string(),
            resource,
        }));
    }

    pub fn has_inventory(&self, route: &str) -> bool {
        self.inventory.contains_key(route)
    }

    pub fn record_inventory(&mut self, route: &str, controls: Vec<ControlInfo>) {
        self.inventory.insert(route.to_string(), controls);
    }

    pub fn log_entries(&self) -> &[TraversalLogEntry] {
        &self.log
    }

    pub fn results(&self) -> &[CaptureResult] {
        &self.results
    }

    pub fn network_entries(&self) -> &[NetworkLogEntry] {
        &self.network
    }

    pub fn inventory(&self) -> &BTreeMap<String, Vec<ControlInfo>> {
        &self.inventory
    }

    /// Build the coverage report from everything recorded so far
    pub fn report(&self) -> CoverageReport {
        CoverageReport::from_results(&self.base_url, self.started_at, self.results.clone())
    }

    /// Write the log, report, network log and inventory, consuming the session
    pub fn flush(self, report: &CoverageReport) -> Result<Vec<PathBuf>, CrawlError> {
        let mut written = Vec::new();

        let log_text: Vec<String> = self.log.iter().map(ToString::to_string).collect();
        written.push(self.write_file(TRAVERSAL_LOG_FILE, log_text.join("\n").into_bytes())?);
        written.push(self.write_json(COVERAGE_REPORT_FILE, report)?);
        written.push(self.write_json(NETWORK_LOG_FILE, &self.network)?);
        if !self.inventory.is_empty() {
            written.push(self.write_json(DOM_INVENTORY_FILE, &self.inventory)?);
        }

        Ok(written)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, CrawlError> {
        let json = serde_json::to_vec_pretty(value)
            .map_err(|e| CrawlError::Other(anyhow::anyhow!("Failed to serialize {}: {}", name, e)))?;
        self.write_file(name, json)
    }

    fn write_file(&self, name: &str, contents: Vec<u8>) -> Result<PathBuf, CrawlError> {
        let path = self.output_dir.join(name);
        fs::write(&path, contents).map_err(|source| CrawlError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
