// src/audit.rs
// =============================================================================
// The page auditor: everything we learn about ONE internal page.
//
// How it works:
// 1. Ask the renderer to navigate (a failure here degrades the result,
//    it never stops the crawl)
// 2. Wait for the document to be ready, but give up quietly after a timeout
// 3. Probe the URL for its HTTP status
// 4. Run the enabled diagnostics (console errors, broken images), each
//    capped so one noisy page can't flood the report
// 5. Always ask the renderer for the page's links
// =============================================================================

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::checker::{StatusProbe, PROBE_FAILED};
use crate::error::RenderError;
use crate::render::{Renderer, ScreenSize};

/// Diagnostic was switched off for this run.
pub const NOT_CHECKED: &str = "Not checked";
/// Diagnostic ran and found nothing.
pub const NONE_FOUND: &str = "None";
/// Console column when the page could not be loaded at all.
pub const NAVIGATION_ERROR: &str = "Navigation Error";
/// Image column when the page could not be loaded at all.
pub const COULD_NOT_CHECK: &str = "Could not check";

pub const MAX_CONSOLE_ENTRIES: usize = 10;
pub const MAX_BROKEN_IMAGES: usize = 20;

/// Which optional diagnostics run on internal pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuditFlags {
    pub console_errors: bool,
    pub broken_images: bool,
}

impl AuditFlags {
    pub fn any(&self) -> bool {
        self.console_errors || self.broken_images
    }
}

impl Default for AuditFlags {
    fn default() -> Self {
        Self {
            console_errors: true,
            broken_images: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAudit {
    pub status: u16,
    pub console_errors: String,
    pub broken_images: String,
    pub links: Vec<String>,
}

impl PageAudit {
    fn navigation_failed() -> Self {
        Self {
            status: PROBE_FAILED,
            console_errors: NAVIGATION_ERROR.to_string(),
            broken_images: COULD_NOT_CHECK.to_string(),
            links: Vec::new(),
        }
    }
}

pub struct PageAuditor {
    renderer: Box<dyn Renderer>,
    probe: Arc<dyn StatusProbe>,
    flags: AuditFlags,
    ready_timeout: Duration,
}

impl PageAuditor {
    pub fn new(
        renderer: Box<dyn Renderer>,
        probe: Arc<dyn StatusProbe>,
        flags: AuditFlags,
        ready_timeout: Duration,
    ) -> Self {
        Self {
            renderer,
            probe,
            flags,
            ready_timeout,
        }
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    pub async fn audit(&mut self, url: &str) -> PageAudit {
        if let Err(e) = self.renderer.navigate(url).await {
            warn!("Error crawling {}: {}", url, e);
            return PageAudit::navigation_failed();
        }

        match self.renderer.wait_until_ready(self.ready_timeout).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("{} not ready after {:?}, continuing anyway", url, self.ready_timeout)
            }
            Err(e) => debug!("Readiness check failed for {}: {}", url, e),
        }

        let status = self.probe.status(url).await;

        let console_errors = if self.flags.console_errors {
            match self.renderer.console_errors(MAX_CONSOLE_ENTRIES).await {
                Ok(entries) => summarize(entries, MAX_CONSOLE_ENTRIES, " | "),
                Err(e) => format!("Error checking console: {}", e),
            }
        } else {
            NOT_CHECKED.to_string()
        };

        let broken_images = if self.flags.broken_images {
            match self.renderer.broken_images(MAX_BROKEN_IMAGES).await {
                Ok(images) => summarize(images, MAX_BROKEN_IMAGES, ";"),
                Err(e) => format!("Error checking images: {}", e),
            }
        } else {
            NOT_CHECKED.to_string()
        };

        let links = match self.renderer.links().await {
            Ok(links) => links,
            Err(e) => {
                warn!("Error extracting links from {}: {}", url, e);
                Vec::new()
            }
        };

        PageAudit {
            status,
            console_errors,
            broken_images,
            links,
        }
    }

    pub async fn screen_size(&mut self) -> Option<ScreenSize> {
        match self.renderer.screen_size().await {
            Ok(size) => Some(size),
            Err(e) => {
                debug!("Could not read screen size: {}", e);
                None
            }
        }
    }

    pub async fn close(&mut self) -> Result<(), RenderError> {
        self.renderer.close().await
    }
}

// Joins findings, enforcing the cap even if a renderer ignores it
fn summarize(entries: Vec<String>, cap: usize, separator: &str) -> String {
    let kept: Vec<String> = entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .take(cap)
        .collect();
    if kept.is_empty() {
        NONE_FOUND.to_string()
    } else {
        kept.join(separator)
    }
}
