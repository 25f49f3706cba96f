// src/report/mod.rs
// =============================================================================
// Results and reporting.
//
// Submodules:
// - sink: the append-only, thread-safe result collection + CSV rows
// - summary: the end-of-run CrawlReport and its plain-text rendering
//
// This file holds the per-URL record both of them work with.
// =============================================================================

mod sink;
mod summary;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audit::{PageAudit, NONE_FOUND, NOT_CHECKED};
use crate::checker::PROBE_FAILED;

pub use sink::ResultSink;
pub use summary::{CrawlReport, RunMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Internal,
    External,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::Internal => f.write_str("Internal"),
            LinkType::External => f.write_str("External"),
        }
    }
}

/// One processed target. Immutable once appended to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlResult {
    pub sequence: u64,
    pub url: String,
    pub status: u16,
    pub link_type: LinkType,
    /// None for external links, which get no diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_errors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broken_images: Option<String>,
}

impl CrawlResult {
    pub fn internal(sequence: u64, url: &str, audit: &PageAudit) -> Self {
        Self {
            sequence,
            url: url.to_string(),
            status: audit.status,
            link_type: LinkType::Internal,
            console_errors: Some(audit.console_errors.clone()),
            broken_images: Some(audit.broken_images.clone()),
        }
    }

    pub fn external(sequence: u64, url: &str, status: u16) -> Self {
        Self {
            sequence,
            url: url.to_string(),
            status,
            link_type: LinkType::External,
            console_errors: None,
            broken_images: None,
        }
    }

    // Failed probe, 4xx or 5xx
    pub fn is_broken(&self) -> bool {
        self.status == PROBE_FAILED || self.status >= 400
    }

    pub fn has_console_errors(&self) -> bool {
        self.console_errors.as_deref().is_some_and(is_finding)
    }

    pub fn has_broken_images(&self) -> bool {
        self.broken_images.as_deref().is_some_and(is_finding)
    }

    pub fn broken_image_count(&self) -> usize {
        match self.broken_images.as_deref() {
            Some(images) if is_finding(images) => images.split(';').count(),
            _ => 0,
        }
    }
}

// Anything except "not checked", "none" or blank is something to report
fn is_finding(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != NOT_CHECKED && value != NONE_FOUND
}
