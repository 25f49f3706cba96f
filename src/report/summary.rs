// src/report/summary.rs
// =============================================================================
// The end-of-run summary, built ONCE from the full result list.
//
// CrawlReport is plain data (Serialize, so --json can print it) plus a
// render_text() that produces the human-readable report file.
// =============================================================================

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use super::{CrawlResult, LinkType};
use crate::audit::AuditFlags;
use crate::render::ScreenSize;

/// Facts about the run that the results alone can't tell us.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub base_domain: String,
    /// Size of the visited set at shutdown.
    pub visited: usize,
    /// Size of the queued set at shutdown.
    pub queued: usize,
    pub flags: AuditFlags,
    pub pool_size: usize,
    pub probe_timeout_ms: u64,
    pub delay_ms: u64,
    pub renderer: String,
    pub screen_size: Option<ScreenSize>,
    /// The crawl was stopped by a signal instead of finishing.
    pub interrupted: bool,
    /// External probes given up on during the drain.
    pub abandoned: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub total_processed: usize,
    pub total_discovered: usize,
    pub total_queued: usize,
    pub base_domain: String,
    pub flags: AuditFlags,
    // BTreeMap keeps the histogram sorted by status code
    pub status_counts: BTreeMap<u16, usize>,
    pub internal: usize,
    pub external: usize,
    /// Only counted when the matching diagnostic was enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_with_console_errors: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_with_broken_images: Option<usize>,
    pub broken_links: usize,
    pub metadata: RunMetadata,
}

impl CrawlReport {
    pub fn build(results: &[CrawlResult], metadata: RunMetadata) -> Self {
        let mut status_counts = BTreeMap::new();
        for result in results {
            *status_counts.entry(result.status).or_insert(0) += 1;
        }

        let internal_results = || results.iter().filter(|r| r.link_type == LinkType::Internal);
        let internal = internal_results().count();
        let flags = metadata.flags;

        let pages_with_console_errors = flags
            .console_errors
            .then(|| internal_results().filter(|r| r.has_console_errors()).count());
        let pages_with_broken_images = flags
            .broken_images
            .then(|| internal_results().filter(|r| r.has_broken_images()).count());

        Self {
            total_processed: results.len(),
            total_discovered: metadata.visited,
            total_queued: metadata.queued,
            base_domain: metadata.base_domain.clone(),
            flags,
            status_counts,
            internal,
            external: results.len() - internal,
            pages_with_console_errors,
            pages_with_broken_images,
            broken_links: results.iter().filter(|r| r.is_broken()).count(),
            metadata,
        }
    }

    pub fn render_text(&self) -> String {
        let rule = "=".repeat(50);
        let mut out = String::new();

        // write! into a String can't fail, so the results are ignored
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "CRAWL SUMMARY REPORT");
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Total URLs processed: {}", self.total_processed);
        let _ = writeln!(out, "Total URLs discovered: {}", self.total_discovered);
        let _ = writeln!(out, "Total URLs queued: {}", self.total_queued);
        let _ = writeln!(out, "Base Domain: {}", self.base_domain);
        if self.metadata.interrupted {
            let _ = writeln!(out, "Run was interrupted before the frontier was exhausted");
        }
        if self.metadata.abandoned > 0 {
            let _ = writeln!(out, "External checks abandoned: {}", self.metadata.abandoned);
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Configuration:");
        let _ = writeln!(out, "  Console error checking: {}", on_off(self.flags.console_errors));
        let _ = writeln!(out, "  Broken image checking: {}", on_off(self.flags.broken_images));
        let _ = writeln!(out, "  Renderer: {}", self.metadata.renderer);
        if let Some(size) = self.metadata.screen_size {
            let _ = writeln!(out, "  Screen size: {}x{}", size.width, size.height);
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "STATUS CODE DISTRIBUTION:");
        for (status, count) in &self.status_counts {
            let _ = writeln!(out, "  {}: {} pages", status, count);
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "LINK TYPE DISTRIBUTION:");
        let _ = writeln!(out, "  Internal: {} links", self.internal);
        let _ = writeln!(out, "  External: {} links", self.external);

        if self.flags.any() {
            let _ = writeln!(out);
            let _ = writeln!(out, "ERROR SUMMARY (Internal Links Only):");
            if let Some(count) = self.pages_with_console_errors {
                let _ = writeln!(out, "  Pages with console errors: {}", count);
            }
            if let Some(count) = self.pages_with_broken_images {
                let _ = writeln!(out, "  Pages with broken images: {}", count);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "PERFORMANCE METRICS:");
        let _ = writeln!(out, "  Worker pool size: {}", self.metadata.pool_size);
        let _ = writeln!(out, "  Status check timeout: {} ms", self.metadata.probe_timeout_ms);
        let _ = writeln!(out, "  Request delay: {} ms", self.metadata.delay_ms);
        let _ = writeln!(out, "{}", rule);

        out
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render_text())
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "Enabled"
    } else {
        "Disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{PageAudit, NONE_FOUND, NOT_CHECKED};

    fn metadata(flags: AuditFlags) -> RunMetadata {
        RunMetadata {
            base_domain: "site.test".to_string(),
            visited: 6,
            queued: 5,
            flags,
            pool_size: 15,
            probe_timeout_ms: 3000,
            delay_ms: 500,
            renderer: "static".to_string(),
            screen_size: None,
            interrupted: false,
            abandoned: 0,
        }
    }

    fn page(sequence: u64, url: &str, status: u16, console: &str, images: &str) -> CrawlResult {
        let audit = PageAudit {
            status,
            console_errors: console.to_string(),
            broken_images: images.to_string(),
            links: Vec::new(),
        };
        CrawlResult::internal(sequence, url, &audit)
    }

    fn results() -> Vec<CrawlResult> {
        vec![
            page(1, "https://site.test/", 200, NONE_FOUND, NONE_FOUND),
            page(2, "https://site.test/a", 200, "JS error: x", NONE_FOUND),
            page(3, "https://site.test/b", 500, NONE_FOUND, "https://site.test/x.png"),
            CrawlResult::external(4, "https://ext.test/x", 404),
            CrawlResult::external(5, "https://ext.test/y", 200),
        ]
    }

    #[test]
    fn test_aggregates() {
        let report = CrawlReport::build(&results(), metadata(AuditFlags::default()));
        assert_eq!(report.total_processed, 5);
        assert_eq!(report.total_discovered, 6);
        assert_eq!(report.internal, 3);
        assert_eq!(report.external, 2);
        assert_eq!(report.status_counts.get(&200), Some(&3));
        assert_eq!(report.status_counts.get(&404), Some(&1));
        assert_eq!(report.status_counts.get(&500), Some(&1));
        assert_eq!(report.pages_with_console_errors, Some(1));
        assert_eq!(report.pages_with_broken_images, Some(1));
        assert_eq!(report.broken_links, 2);
    }

    #[test]
    fn test_disabled_flags_skip_error_counts() {
        let flags = AuditFlags {
            console_errors: false,
            broken_images: false,
        };
        let results = vec![page(1, "https://site.test/", 200, NOT_CHECKED, NOT_CHECKED)];
        let report = CrawlReport::build(&results, metadata(flags));
        assert_eq!(report.pages_with_console_errors, None);
        assert_eq!(report.pages_with_broken_images, None);

        let text = report.render_text();
        assert!(!text.contains("ERROR SUMMARY"));
        assert!(text.contains("Console error checking: Disabled"));
    }

    #[test]
    fn test_text_report_sections_in_order() {
        let report = CrawlReport::build(&results(), metadata(AuditFlags::default()));
        let text = report.render_text();

        let sections = [
            "CRAWL SUMMARY REPORT",
            "Total URLs processed: 5",
            "Base Domain: site.test",
            "STATUS CODE DISTRIBUTION:",
            "LINK TYPE DISTRIBUTION:",
            "ERROR SUMMARY (Internal Links Only):",
            "PERFORMANCE METRICS:",
        ];
        let mut last = 0;
        for section in sections {
            let at = text.find(section).unwrap_or_else(|| panic!("missing {}", section));
            assert!(at >= last, "{} out of order", section);
            last = at;
        }

        // Histogram is sorted by status code
        let ok = text.find("  200: 3 pages").unwrap();
        let missing = text.find("  404: 1 pages").unwrap();
        let failed = text.find("  500: 1 pages").unwrap();
        assert!(ok < missing && missing < failed);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let report = CrawlReport::build(&results(), metadata(AuditFlags::default()));
        report.write_to(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), report.render_text());
    }

    #[test]
    fn test_serializes_histogram_keys() {
        let report = CrawlReport::build(&results(), metadata(AuditFlags::default()));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status_counts"]["404"], 1);
        assert_eq!(json["internal"], 3);
    }
}
