// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using a
// Rust struct and attributes (the #[...] things). There is only one thing
// this tool does, so there are no subcommands: the seed URL is positional
// and everything else is a flag with a sensible default.
//
// Rust concepts:
// - Structs: Custom data types that group related data
// - Derive macros: Automatically generate code for our types
// - Option<T>: flags the user may leave out entirely
// =============================================================================

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::audit::AuditFlags;
use crate::config::{
    CrawlConfig, RemoteGrid, RendererKind, DEFAULT_DELAY_MS, DEFAULT_MAX_PAGES, DEFAULT_POOL_SIZE,
    DEFAULT_PROBE_TIMEOUT_MS,
};

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
// The #[command(...)] attributes configure how the CLI behaves
#[derive(Parser, Debug)]
#[command(
    name = "site-guardian",
    version = "0.1.0",
    about = "Crawl a website and audit every link, script error and broken image",
    long_about = "site-guardian starts from one URL, renders every page on the same site in a \
                  real browser, status-checks every off-site link, and writes a CSV of results \
                  plus a summary report. It exits with 1 when broken links were found, which \
                  makes it easy to use in CI."
)]
pub struct Cli {
    /// Website URL to start from (e.g., https://example.com)
    pub seed_url: String,

    /// Maximum number of pages and links to process
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    /// Delay between requests, in milliseconds
    #[arg(long, default_value_t = DEFAULT_DELAY_MS)]
    pub delay_ms: u64,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    /// Don't collect JavaScript/console errors on internal pages
    #[arg(long)]
    pub no_console_errors: bool,

    /// Don't look for broken images on internal pages
    #[arg(long)]
    pub no_broken_images: bool,

    /// Timeout for each status check, in milliseconds
    #[arg(long, default_value_t = DEFAULT_PROBE_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Number of concurrent external link checks
    #[arg(long, default_value_t = DEFAULT_POOL_SIZE)]
    pub workers: usize,

    /// Where to write one CSV row per processed URL
    #[arg(long, default_value = "crawl_results.csv")]
    pub csv: PathBuf,

    /// Where to write the plain-text summary
    #[arg(long, default_value = "crawl_report.txt")]
    pub report: PathBuf,

    /// Page renderer backend
    #[arg(long, value_enum, default_value_t = RendererKind::Chrome)]
    pub renderer: RendererKind,

    /// DevTools endpoint of a remote browser grid (falls back to local Chrome)
    #[arg(long)]
    pub remote_url: Option<String>,

    /// Remote grid user name
    #[arg(long, env = "SITE_GUARDIAN_REMOTE_USER")]
    pub remote_user: Option<String>,

    /// Remote grid access key
    #[arg(long, env = "SITE_GUARDIAN_REMOTE_KEY", hide_env_values = true)]
    pub remote_key: Option<String>,

    /// Also print the final report as JSON
    #[arg(long)]
    pub json: bool,

    /// Log debug output (RUST_LOG overrides this)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    // Turns parsed arguments into the crawl configuration
    pub fn into_config(self) -> CrawlConfig {
        let mut config = CrawlConfig::new(&self.seed_url);
        config.max_pages = self.max_pages;
        config.delay = Duration::from_millis(self.delay_ms);
        config.headless = !self.headed;
        config.flags = AuditFlags {
            console_errors: !self.no_console_errors,
            broken_images: !self.no_broken_images,
        };
        config.probe_timeout = Duration::from_millis(self.timeout_ms);
        config.pool_size = self.workers.max(1);
        config.csv_path = Some(self.csv);
        config.report_path = Some(self.report);
        config.renderer = self.renderer;
        config.remote = self.remote_url.map(|endpoint| RemoteGrid {
            endpoint,
            username: self.remote_user,
            access_key: self.remote_key,
        });
        config
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. How does clap name the flags?
//    - Field `max_pages` becomes `--max-pages` (underscores -> dashes)
//    - A field with no #[arg] attribute is positional (seed_url here)
//    - bool fields are switches: present = true, absent = false
//
// 2. Why "no_*" flags instead of "--console-errors false"?
//    - Both diagnostics are on by default, so the switch turns them OFF
//
// 3. What does `env = "..."` do?
//    - If the flag is missing, clap reads the environment variable instead
//    - Handy for secrets you don't want in your shell history
//    - hide_env_values keeps the key out of --help output
// -----------------------------------------------------------------------------
