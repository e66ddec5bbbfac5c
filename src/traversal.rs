//! The traversal driver.
//!
//! For each breakpoint, in order: size the viewport, load the entry point,
//! apply and confirm the theme, then for each target load its route, replay
//! its actions, capture a screenshot and return the page to a neutral state.
//! Every (target, breakpoint) pair yields exactly one [`CaptureResult`]
//! unless the browser session itself is lost.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{CrawlConfig, NavigationPolicy, Timings};
use crate::errors::ActionError;
use crate::page::Page;
use crate::report::{CaptureOutcome, CaptureResult, CoverageReport};
use crate::session::TraversalSession;
use crate::targets::{Action, ScrollTo, TargetState};
use crate::types::{Breakpoint, Theme};

/// Upper bound on waiting for a close control before falling back to Escape
const CLOSE_CONTROL_WAIT: Duration = Duration::from_millis(2000);

/// A run that stopped early because the browser became unusable
#[derive(Debug)]
pub struct AbortedRun {
    /// Report over the results gathered before the abort
    pub report: CoverageReport,
    pub error: ActionError,
}

/// Visit every breakpoint × target pair and build the coverage report
pub async fn run_traversal<P: Page>(
    page: &P,
    targets: &[TargetState],
    breakpoints: &[Breakpoint],
    config: &CrawlConfig,
    session: &mut TraversalSession,
) -> Result<CoverageReport, AbortedRun> {
    session.log("=== STARTING VISUAL CRAWL ===");
    session.log(format!(
        "{} targets x {} breakpoints against {}",
        targets.len(),
        breakpoints.len(),
        config.base_url
    ));

    for (bp_index, breakpoint) in breakpoints.iter().enumerate() {
        let first = bp_index == 0;
        if let Err(error) = run_breakpoint(page, targets, breakpoint, first, config, session).await
        {
            session.log(format!("ABORT: {} - {}", breakpoint.name, error));
            return Err(AbortedRun {
                report: session.report(),
                error,
            });
        }
    }

    let report = session.report();
    session.log(format!(
        "=== CRAWL COMPLETE: {}/{} captured ({:.1}%) ===",
        report.total_exercised, report.total_discovered, report.coverage_percentage
    ));
    Ok(report)
}

/// Run every target under one breakpoint. Errors returned here are fatal.
async fn run_breakpoint<P: Page>(
    page: &P,
    targets: &[TargetState],
    breakpoint: &Breakpoint,
    first_breakpoint: bool,
    config: &CrawlConfig,
    session: &mut TraversalSession,
) -> Result<(), ActionError> {
    session.log(format!("--- BREAKPOINT: {} ---", breakpoint));

    if let Err(err) = setup_breakpoint(page, breakpoint, config, session).await {
        if err.is_fatal() {
            return Err(err);
        }
        session.log(format!("SETUP FAIL: {} - {}", breakpoint.name, err));
        let reason = format!("breakpoint setup failed: {}", err);
        for target in targets {
            record(session, config, target, breakpoint, CaptureOutcome::failure(&reason));
        }
        return Ok(());
    }

    let mut current_route = Some("/".to_string());

    for (index, target) in targets.iter().enumerate() {
        let outcome = match attempt_target(
            page,
            target,
            index,
            breakpoint,
            first_breakpoint,
            config,
            &mut current_route,
            session,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                let fatal = err.is_fatal();
                record(session, config, target, breakpoint, CaptureOutcome::failure(err.to_string()));
                if fatal {
                    return Err(err);
                }
                continue;
            }
        };

        // A verified capture stands even if cleanup loses the session
        record(session, config, target, breakpoint, outcome);
        finish_target(page, target, breakpoint, config, session).await?;
    }

    Ok(())
}

/// Size the viewport, load the entry point and confirm the theme
async fn setup_breakpoint<P: Page>(
    page: &P,
    breakpoint: &Breakpoint,
    config: &CrawlConfig,
    session: &mut TraversalSession,
) -> Result<(), ActionError> {
    page.set_viewport(breakpoint.viewport).await?;
    session.log(format!("VIEWPORT: {}", breakpoint.viewport));

    let entry = config.entry_url();
    page.navigate(&entry).await?;
    session.log(format!("NAVIGATE: {}", entry));

    page.apply_theme(breakpoint.theme).await?;
    wait_for_theme(page, breakpoint.theme, &config.timings).await?;
    session.log(format!("THEME: {} confirmed", breakpoint.theme));

    settle(config.timings.route_settle).await;
    Ok(())
}

/// Poll until the page shows `theme` or the bound runs out
async fn wait_for_theme<P: Page>(page: &P, theme: Theme, timings: &Timings) -> Result<(), ActionError> {
    let deadline = Instant::now() + timings.theme_timeout;
    loop {
        let observed = page.active_theme().await?;
        if observed == Some(theme) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(ActionError::Theme {
                expected: theme.to_string(),
                observed: observed.map_or_else(|| "unknown".to_string(), |t| t.to_string()),
            });
        }
        tokio::time::sleep(timings.poll_interval).await;
    }
}

/// Reach and capture one target.
///
/// Recoverable failures come back as `Ok(CaptureOutcome::Failure)`; an `Err`
/// is either fatal or a navigation error the caller records as a failure.
#[allow(clippy::too_many_arguments)]
async fn attempt_target<P: Page>(
    page: &P,
    target: &TargetState,
    index: usize,
    breakpoint: &Breakpoint,
    first_breakpoint: bool,
    config: &CrawlConfig,
    current_route: &mut Option<String>,
    session: &mut TraversalSession,
) -> Result<CaptureOutcome, ActionError> {
    if let Some(route) = &target.route {
        let needs_load = match config.navigation {
            NavigationPolicy::Always => true,
            NavigationPolicy::OnRouteChange => current_route.as_deref() != Some(route.as_str()),
        };
        if needs_load {
            let url = config.route_url(route);
            debug!("Loading {} for {}", url, target.name);
            if let Err(err) = page.navigate(&url).await {
                *current_route = None;
                session.log(format!("NAVIGATE FAIL: {} - {}", url, err));
                return Err(err);
            }
            *current_route = Some(route.clone());
            settle(config.timings.route_settle).await;
        }

        if first_breakpoint && config.inventory && !session.has_inventory(route) {
            scan_inventory(page, route, session).await?;
        }
    }

    let reached = perform_actions(page, target, breakpoint, &config.timings, session).await;

    let outcome = match reached {
        Ok(()) => {
            let path = screenshot_path(&config.output_dir, index, target, breakpoint);
            match capture(page, &path, config.jpeg_quality).await {
                Ok(outcome) => outcome,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => CaptureOutcome::failure(err.to_string()),
            }
        }
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => CaptureOutcome::failure(err.to_string()),
    };

    match &outcome {
        CaptureOutcome::Success { path, bytes } => session.log(format!(
            "SCREENSHOT OK: {} ({} bytes) - {}",
            display_relative(path, &config.output_dir),
            bytes,
            target.description
        )),
        CaptureOutcome::Failure { reason } => session.log(format!(
            "SCREENSHOT FAIL: {}@{} - {}",
            target.name, breakpoint.name, reason
        )),
    }

    Ok(outcome)
}

/// Collect network entries for the target, then dismiss what it opened
async fn finish_target<P: Page>(
    page: &P,
    target: &TargetState,
    breakpoint: &Breakpoint,
    config: &CrawlConfig,
    session: &mut TraversalSession,
) -> Result<(), ActionError> {
    if config.network_log {
        match page.resources().await {
            Ok(resources) => session.record_network(&breakpoint.name, &target.name, resources),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => debug!("Could not read resource timings: {}", err),
        }
    }

    reset(page, target, breakpoint, &config.timings, session).await
}

/// Replay the target's actions for this breakpoint's layout
async fn perform_actions<P: Page>(
    page: &P,
    target: &TargetState,
    breakpoint: &Breakpoint,
    timings: &Timings,
    session: &mut TraversalSession,
) -> Result<(), ActionError> {
    for action in target.actions_for(breakpoint.is_mobile()) {
        let result = match action {
            Action::Click { target: locator } => {
                match page
                    .wait_visible(locator, timings.action_timeout, timings.poll_interval)
                    .await
                {
                    Ok(()) => page.click(locator).await,
                    Err(err) => Err(err),
                }
            }
            Action::Type {
                target: locator,
                text,
            } => {
                match page
                    .wait_visible(locator, timings.action_timeout, timings.poll_interval)
                    .await
                {
                    Ok(()) => page.type_text(locator, text).await,
                    Err(err) => Err(err),
                }
            }
            Action::Scroll { to } => page.scroll(*to).await,
            Action::Pause { ms } => {
                settle(Duration::from_millis(*ms)).await;
                Ok(())
            }
        };

        match result {
            Ok(()) => {
                session.log(format!("ACTION OK: {} ({})", action, target.name));
                if !matches!(action, Action::Pause { .. }) {
                    settle(timings.action_settle).await;
                }
            }
            Err(err) => {
                session.log(format!("ACTION FAIL: {} ({}) - {}", action, target.name, err));
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Take the screenshot, write it as JPEG and confirm it landed on disk
async fn capture<P: Page>(page: &P, path: &Path, quality: u8) -> Result<CaptureOutcome, ActionError> {
    let png = page.screenshot_png().await?;
    let jpeg = encode_jpeg(&png, quality)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ActionError::io(parent, e))?;
    }
    std::fs::write(path, &jpeg).map_err(|e| ActionError::io(path, e))?;

    verify_file(path)
}

/// A screenshot only counts once the file exists with content
pub fn verify_file(path: &Path) -> Result<CaptureOutcome, ActionError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(CaptureOutcome::Success {
            path: path.to_path_buf(),
            bytes: meta.len(),
        }),
        Ok(_) => Ok(CaptureOutcome::failure(format!(
            "file is empty: {}",
            path.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CaptureOutcome::failure(
            format!("file not created: {}", path.display()),
        )),
        Err(e) => Err(ActionError::io(path, e)),
    }
}

/// Re-encode a PNG screenshot as JPEG at the given quality
pub fn encode_jpeg(png: &[u8], quality: u8) -> Result<Vec<u8>, ActionError> {
    if png.is_empty() {
        return Err(ActionError::Screenshot("browser returned no image data".to_string()));
    }

    let image = image::load_from_memory(png)
        .map_err(|e| ActionError::Screenshot(format!("Failed to decode PNG: {}", e)))?;
    let rgb = image.to_rgb8();

    let mut bytes = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder
        .encode_image(&rgb)
        .map_err(|e| ActionError::Screenshot(format!("Failed to encode JPEG: {}", e)))?;
    Ok(bytes)
}

/// `<output>/<breakpoint>/<NNNN>_<target>_<breakpoint>.jpg`
pub fn screenshot_path(
    output_dir: &Path,
    index: usize,
    target: &TargetState,
    breakpoint: &Breakpoint,
) -> PathBuf {
    output_dir
        .join(&breakpoint.name)
        .join(screenshot_file_name(index, &target.name, &breakpoint.name))
}

pub fn screenshot_file_name(index: usize, target: &str, breakpoint: &str) -> String {
    format!("{:04}_{}_{}.jpg", index + 1, target, breakpoint)
}

/// Dismiss whatever the target opened so the next target starts clean
async fn reset<P: Page>(
    page: &P,
    target: &TargetState,
    breakpoint: &Breakpoint,
    timings: &Timings,
    session: &mut TraversalSession,
) -> Result<(), ActionError> {
    let actions = target.actions_for(breakpoint.is_mobile());

    if target.leaves_overlay() && !actions.is_empty() {
        let mut closed = false;
        if let Some(close) = &target.close {
            let wait = timings.action_timeout.min(CLOSE_CONTROL_WAIT);
            match page.wait_visible(close, wait, timings.poll_interval).await {
                Ok(()) => match page.click(close).await {
                    Ok(()) => closed = true,
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => debug!("Close control {} failed: {}", close, err),
                },
                Err(err) if err.is_fatal() => return Err(err),
                Err(_) => {}
            }
        }

        if !closed {
            match page.press_escape().await {
                Ok(()) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => warn!("Escape after {} failed: {}", target.name, err),
            }
        }
        session.log(format!("RESET: {} dismissed", target.name));
        settle(timings.reset_settle).await;
    }

    if actions.iter().any(|a| matches!(a, Action::Scroll { .. })) {
        match page.scroll(ScrollTo::Top).await {
            Ok(()) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => debug!("Scroll reset failed: {}", err),
        }
    }

    Ok(())
}

async fn scan_inventory<P: Page>(
    page: &P,
    route: &str,
    session: &mut TraversalSession,
) -> Result<(), ActionError> {
    match page.scan_controls().await {
        Ok(controls) => {
            session.log(format!("DOM SCAN: {} - Found {} controls", route, controls.len()));
            session.record_inventory(route, controls);
            Ok(())
        }
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            session.log(format!("DOM SCAN FAIL: {} - {}", route, err));
            Ok(())
        }
    }
}

fn record(
    session: &mut TraversalSession,
    config: &CrawlConfig,
    target: &TargetState,
    breakpoint: &Breakpoint,
    outcome: CaptureOutcome,
) {
    session.record(CaptureResult::from_outcome(
        &target.name,
        &breakpoint.name,
        &target.description,
        outcome,
        &config.output_dir,
    ));
}

fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}

async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
#[path = "traversal_test.rs"]
mod traversal_test;
