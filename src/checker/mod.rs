// src/checker/mod.rs
// =============================================================================
// This module contains the network-facing checks.
//
// Submodules:
// - http: the status probe (HEAD/GET, final status code or 0)
// - html: link and image extraction from raw HTML
//
// This file (mod.rs) is the module root - it ties everything together and
// exports the public API that other parts of our application can use.
// =============================================================================

mod html;
mod http;

pub use html::{extract_html_links, extract_image_sources};
pub use http::{HttpStatusProbe, StatusProbe, DEFAULT_USER_AGENT, PROBE_FAILED};
