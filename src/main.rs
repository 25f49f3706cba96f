// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, filtered by RUST_LOG or --verbose)
// 3. Acquire the resources a crawl needs: status probe, CSV sink, renderer
//    (any failure here is fatal, nothing has been crawled yet)
// 4. Run the crawl, with Ctrl+C wired to a graceful stop
// 5. Print the summary
// 6. Exit with proper code (0 = success, 1 = broken links, 2 = error)
// =============================================================================

// Module declarations - tells Rust about our other source files
mod audit;         // src/audit.rs - per-page diagnostics
mod checker;       // src/checker/ - status probe and HTML extraction
mod cli;           // src/cli.rs - command-line parsing
mod config;        // src/config.rs - crawl settings and defaults
mod crawl;         // src/crawl/ - frontier, worker pool, crawl loop
mod error;         // src/error.rs - typed errors
mod render;        // src/render/ - Chrome and static page renderers
mod report;        // src/report/ - result rows and the summary report

#[cfg(test)]
mod fixtures;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use checker::{HttpStatusProbe, StatusProbe};
use cli::Cli;
use crawl::Orchestrator;
use report::{CrawlReport, ResultSink};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = no broken links
//   Ok(1) = broken links found
//   Err = the crawl could not start (mapped to exit code 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let json = cli.json;
    let config = cli.into_config();

    println!("🔍 Crawling website: {}", config.seed);
    println!("📊 Max pages: {}, delay: {} ms", config.max_pages, config.delay.as_millis());

    let probe: Arc<dyn StatusProbe> = Arc::new(
        HttpStatusProbe::new(config.probe_timeout, &config.user_agent)
            .context("failed to build the HTTP client")?,
    );

    let sink = Arc::new(match &config.csv_path {
        Some(path) => ResultSink::create(path, config.flags)
            .with_context(|| format!("failed to create {}", path.display()))?,
        None => ResultSink::in_memory(config.flags),
    });

    let renderer = render::start_renderer(&config, probe.clone())
        .await
        .context("failed to start the page renderer")?;
    let auditor =
        audit::PageAuditor::new(renderer, probe.clone(), config.flags, config.ready_timeout);

    // Ctrl+C stops admissions; the crawl still drains and writes its report
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing up...");
            let _ = stop_tx.send(true);
        }
    });

    let orchestrator = Orchestrator::new(&config, auditor, probe, sink, stop_rx);
    let outcome = orchestrator.run().await;

    print_summary(&outcome.report);
    if let Some(path) = &config.csv_path {
        println!("💾 Results saved to {}", path.display());
    }
    if let Some(path) = &config.report_path {
        println!("📝 Summary saved to {}", path.display());
    }
    if outcome.interrupted {
        println!("⚠️  Crawl was interrupted, {} URL(s) never processed", outcome.pending);
    }

    if json {
        let json_output = serde_json::to_string_pretty(&outcome.report)?;
        println!("{}", json_output);
    }

    if outcome.report.broken_links > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Logs go to stderr so stdout stays clean for --json
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(report: &CrawlReport) {
    println!();
    println!("📊 Summary:");
    println!("   📋 Processed: {}", report.total_processed);
    println!("   🏠 Internal: {}", report.internal);
    println!("   🌐 External: {}", report.external);
    if let Some(count) = report.pages_with_console_errors {
        println!("   🐛 Pages with console errors: {}", count);
    }
    if let Some(count) = report.pages_with_broken_images {
        println!("   🖼️  Pages with broken images: {}", count);
    }
    if report.broken_links > 0 {
        println!("   ❌ Broken: {}", report.broken_links);
    } else {
        println!("   ✅ No broken links");
    }
    if report.metadata.abandoned > 0 {
        println!("   ⏱️  Unfinished checks: {}", report.metadata.abandoned);
    }
}
