// src/checker/html.rs
// =============================================================================
// This module pulls links and image sources out of raw HTML.
//
// The browser renderer asks the live DOM for these. The static renderer
// (plain HTTP, no JavaScript) has only the HTML text, so it uses this module.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
//
// And the `url` crate to resolve relative references against the page URL.
// =============================================================================

use scraper::{Html, Selector};
use url::Url;

// Extracts all web links (<a href>) as absolute URLs
//
// Example:
//   html = "<a href='/docs'>Docs</a>"
//   page_url = "https://example.com"
//   result = ["https://example.com/docs"]
pub fn extract_html_links(html: &str, page_url: &str) -> Vec<String> {
    collect_attribute(html, page_url, "a[href]", "href")
        .into_iter()
        .filter(|url| is_checkable_link(url))
        .collect()
}

// Extracts every <img src> as an absolute URL, in document order
pub fn extract_image_sources(html: &str, page_url: &str) -> Vec<String> {
    collect_attribute(html, page_url, "img[src]", "src")
        .into_iter()
        .filter(|url| is_checkable_link(url))
        .collect()
}

fn collect_attribute(html: &str, page_url: &str, css: &str, attribute: &str) -> Vec<String> {
    let mut found = Vec::new();

    let Ok(selector) = Selector::parse(css) else {
        return found;
    };
    let Ok(base) = Url::parse(page_url) else {
        return found;
    };

    let document = Html::parse_document(html);
    for element in document.select(&selector) {
        if let Some(value) = element.value().attr(attribute) {
            if let Some(absolute) = resolve_url(&base, value) {
                found.push(absolute);
            }
        }
    }

    found
}

// Resolves a possibly-relative URL to an absolute URL
//
// Examples:
//   base = "https://example.com/page"
//   href = "/docs" -> Some("https://example.com/docs")
//   href = "../other" -> Some("https://example.com/other")
//   href = "https://other.com" -> Some("https://other.com/")
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    // join() handles absolute hrefs too: they simply replace the base
    base.join(href).ok().map(|url| url.to_string())
}

// Only HTTP/HTTPS targets can be rendered or probed
fn is_checkable_link(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
