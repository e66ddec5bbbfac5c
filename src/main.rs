#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use statecrawl::targets::duplicate_names;
use statecrawl::types::select_breakpoints;
use statecrawl::webdriver_manager::GLOBAL_WEBDRIVER_MANAGER;
use statecrawl::{
    Browser, BrowserType, CoverageReport, CrawlConfig, CrawlError, NavigationPolicy,
    TraversalSession, dashboard_states, default_breakpoints, run_traversal,
};

const EXIT_SUCCESS: i32 = 0;

#[derive(Parser)]
#[command(name = "statecrawl")]
#[command(about = "Capture every dashboard state at every breakpoint", long_about = None)]
struct Cli {
    /// Base address of the running dashboard (e.g. http://localhost:3000)
    base_url: String,

    /// Directory for screenshots and reports
    #[arg(short, long, default_value = "baseline_export")]
    output: PathBuf,

    /// Browser to use
    #[arg(short, long, value_enum, default_value = "firefox")]
    browser: BrowserType,

    /// Run browser in visible mode (disables headless)
    #[arg(long = "no-headless")]
    no_headless: bool,

    /// Restrict the run to these breakpoints (repeatable)
    #[arg(long = "only")]
    only: Vec<String>,

    /// Skip scanning interactive controls per route
    #[arg(long)]
    no_inventory: bool,

    /// Skip collecting resource timings
    #[arg(long)]
    no_network_log: bool,

    /// JPEG quality (1-100)
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Max wait for an element to become visible, in milliseconds
    #[arg(long, default_value_t = 5000)]
    action_timeout_ms: u64,

    /// When targets trigger a fresh page load
    #[arg(long, value_enum, default_value = "always")]
    navigation: NavigationPolicy,

    /// Print the state table and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() {
    let result = run().await;

    // Always clean up WebDriver processes before exiting
    GLOBAL_WEBDRIVER_MANAGER.stop_all();

    match result {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(err) => {
            let crawl_err = match err.downcast::<CrawlError>() {
                Ok(crawl_err) => crawl_err,
                Err(other) => CrawlError::Other(other),
            };

            // Output JSON error to stdout for programmatic consumption
            let error_json = json!({
                "error": true,
                "message": crawl_err.to_string(),
                "exit_code": crawl_err.exit_code()
            });
            println!(
                "{}",
                serde_json::to_string(&error_json).unwrap_or_else(|_| "{}".to_string())
            );

            eprintln!("Error: {}", crawl_err);
            std::process::exit(crawl_err.exit_code());
        }
    }
}

async fn run() -> Result<()> {
    // Logs go to stderr so the JSON summary on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statecrawl=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();

    let mut config = CrawlConfig::new(&cli.base_url, &cli.output)?;
    config.jpeg_quality = cli.jpeg_quality;
    config.navigation = cli.navigation;
    config.inventory = !cli.no_inventory;
    config.network_log = !cli.no_network_log;
    config.timings.action_timeout = std::time::Duration::from_millis(cli.action_timeout_ms);

    let targets = dashboard_states();
    let duplicates = duplicate_names(&targets);
    if !duplicates.is_empty() {
        anyhow::bail!("Duplicate target names in state table: {}", duplicates.join(", "));
    }

    let breakpoints = select_breakpoints(default_breakpoints(), &cli.only)?;

    if cli.list {
        for (index, target) in targets.iter().enumerate() {
            println!(
                "{:04}  {:<28} {:<16} {}",
                index + 1,
                target.name,
                target.route.as_deref().unwrap_or("-"),
                target.description
            );
        }
        return Ok(());
    }

    let mut session = TraversalSession::new(config.base_url.as_str(), &config.output_dir);
    session.prepare(&breakpoints)?;

    let first_viewport = breakpoints
        .first()
        .map(|bp| bp.viewport)
        .ok_or_else(|| anyhow::anyhow!("No breakpoints selected"))?;
    let browser = Browser::new(cli.browser, !cli.no_headless, first_viewport)
        .await
        .map_err(|e| CrawlError::WebDriverFailed(format!("{:#}", e)))?;

    let outcome = run_traversal(&browser, &targets, &breakpoints, &config, &mut session).await;

    if let Err(e) = browser.close().await {
        warn!("Failed to close browser session: {}", e);
    }

    match outcome {
        Ok(report) => {
            let written = session.flush(&report)?;
            info!("Wrote {} report files to {}", written.len(), config.output_dir.display());
            print_summary(&report, &config.output_dir);
            Ok(())
        }
        Err(aborted) => {
            session.flush(&aborted.report)?;
            print_summary(&aborted.report, &config.output_dir);
            Err(CrawlError::Aborted {
                completed: aborted.report.total_discovered,
                reason: aborted.error.to_string(),
            }
            .into())
        }
    }
}

fn print_summary(report: &CoverageReport, output_dir: &std::path::Path) {
    let summary = json!({
        "run_id": report.run_id,
        "total_discovered": report.total_discovered,
        "total_exercised": report.total_exercised,
        "total_failed": report.total_failed,
        "coverage_percentage": report.coverage_percentage,
        "output": output_dir.display().to_string(),
    });
    println!(
        "{}",
        serde_json::to_string(&summary).unwrap_or_else(|_| "{}".to_string())
    );
}
