// src/config.rs
// =============================================================================
// Everything a crawl run needs to know, in one plain struct.
//
// The CLI fills this in (see cli.rs), tests build it directly with
// CrawlConfig::new(seed) and tweak the fields they care about.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::audit::AuditFlags;
use crate::checker::DEFAULT_USER_AGENT;
use crate::render::ScreenSize;

pub const DEFAULT_MAX_PAGES: usize = 5000;
pub const DEFAULT_DELAY_MS: u64 = 500;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_POOL_SIZE: usize = 15;
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_POOL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PROGRESS_EVERY: usize = 25;

/// Which page renderer backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RendererKind {
    /// Chromium over the DevTools protocol
    Chrome,
    /// Plain HTTP fetch and HTML parsing, no JavaScript
    Static,
}

/// A remote browser grid exposing a DevTools endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteGrid {
    pub endpoint: String,
    pub username: Option<String>,
    pub access_key: Option<String>,
}

impl RemoteGrid {
    // The endpoint with the credentials as URL userinfo
    //
    // Falls back to the bare endpoint when it can't hold credentials.
    pub fn endpoint_with_credentials(&self) -> String {
        let Ok(mut url) = Url::parse(&self.endpoint) else {
            return self.endpoint.clone();
        };
        if let Some(username) = &self.username {
            if url.set_username(username).is_err() {
                return self.endpoint.clone();
            }
        }
        if let Some(key) = &self.access_key {
            if url.set_password(Some(key)).is_err() {
                return self.endpoint.clone();
            }
        }
        url.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub seed: String,
    /// Upper bound on admitted targets (internal audits + external probes).
    pub max_pages: usize,
    /// Pause between orchestrator iterations.
    pub delay: Duration,
    pub headless: bool,
    pub flags: AuditFlags,
    pub probe_timeout: Duration,
    pub pool_size: usize,
    pub ready_timeout: Duration,
    /// How long the drain waits for each outstanding probe.
    pub drain_timeout: Duration,
    pub pool_shutdown_timeout: Duration,
    pub progress_every: usize,
    pub csv_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub renderer: RendererKind,
    pub remote: Option<RemoteGrid>,
    pub window: ScreenSize,
    pub user_agent: String,
}

impl CrawlConfig {
    // Defaults for everything except the seed; no output files
    pub fn new(seed: &str) -> Self {
        Self {
            seed: seed.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            headless: true,
            flags: AuditFlags::default(),
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            pool_size: DEFAULT_POOL_SIZE,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            pool_shutdown_timeout: DEFAULT_POOL_SHUTDOWN_TIMEOUT,
            progress_every: DEFAULT_PROGRESS_EVERY,
            csv_path: None,
            report_path: None,
            renderer: RendererKind::Chrome,
            remote: None,
            window: ScreenSize::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
