// src/crawl/normalize.rs
// =============================================================================
// This module turns raw URL strings into canonical crawl targets.
//
// Two URLs that point at the same page should collapse into one frontier
// entry, so before any set lookup or queue insertion we:
// 1. Cut everything from the first '#'
// 2. Lower-case scheme and host (the url crate does this while parsing)
// 3. Keep the port only when it isn't the scheme's default
// 4. Keep path and query exactly as they are
// 5. Drop trailing slashes, except the one that makes a bare origin
//
// It also owns the "skip policy": static assets are recorded but never
// rendered or probed, and links with fragments never enter the frontier.
//
// Rust concepts:
// - Newtypes: CrawlTarget wraps a String so raw URLs can't sneak into sets
// - let-else: early return when parsing fails
// =============================================================================

use std::fmt;
use url::Url;

// File extensions that are never worth rendering or probing
const SKIP_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".jpg", ".jpeg", ".png", ".gif",
    ".bmp", ".svg", ".ico", ".mp3", ".mp4", ".avi", ".mov", ".wav", ".zip", ".rar", ".tar.gz",
];

/// A URL that has been through `normalize`.
///
/// The only way to build one is `CrawlTarget::new`, so every value stored in
/// the frontier's sets is guaranteed to be canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrawlTarget(String);

impl CrawlTarget {
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CrawlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Canonicalizes a URL string
//
// Never fails: if the input can't be parsed (or has no host) it comes back
// unchanged, which keeps normalize(normalize(x)) == normalize(x) for every x.
//
// Examples:
//   "HTTPS://Example.COM:443/Docs/#intro" -> "https://example.com/Docs"
//   "https://example.com"                 -> "https://example.com/"
//   "not a url"                           -> "not a url"
pub fn normalize(raw: &str) -> String {
    let without_fragment = match raw.find('#') {
        Some(index) => &raw[..index],
        None => raw,
    };

    let Ok(parsed) = Url::parse(without_fragment) else {
        return raw.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return raw.to_string();
    };

    let mut canonical = format!("{}://{}", parsed.scheme(), host);

    // port() is None when the port is the scheme's default
    if let Some(port) = parsed.port() {
        canonical.push_str(&format!(":{}", port));
    }

    // A run of trailing slashes collapses; "/" on its own is kept
    let path = parsed.path();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        canonical.push('/');
    } else {
        canonical.push_str(trimmed);
    }

    if let Some(query) = parsed.query() {
        canonical.push('?');
        canonical.push_str(query);
    }

    canonical
}

// Decides whether a target is recorded as visited without doing any work
//
// We skip:
// - anything still carrying a '#' (only possible for unparsable input)
// - documents, images, archives, audio and video files
pub fn should_skip(target: &str) -> bool {
    if target.contains('#') {
        return true;
    }

    // Look at the path when we can, so "/report.pdf?download=1" is caught too
    let path = match Url::parse(target) {
        Ok(url) => url.path().to_ascii_lowercase(),
        Err(_) => target.to_ascii_lowercase(),
    };

    SKIP_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

// Decides whether a link found on a page may enter the frontier at all
//
// Links carrying a '#' are dropped here, before normalization would strip
// the fragment and turn them into an ordinary page URL.
pub fn is_discoverable(link: &str) -> bool {
    is_http_link(link) && !link.contains('#')
}

// Only web links are crawled; mailto:, tel:, javascript: and friends are not
pub fn is_http_link(link: &str) -> bool {
    let lower = link.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
