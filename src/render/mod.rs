// src/render/mod.rs
// =============================================================================
// The page renderer: something that can load a URL like a real browser and
// answer questions about the resulting page.
//
// The crawler never parses HTML on its own for internal pages; it asks the
// renderer for links, script errors and broken images. Two backends exist:
// - chrome:  a real Chromium driven over the DevTools protocol
//            (local launch, or a remote grid with local fallback)
// - static:  plain HTTP + HTML parsing, no JavaScript
//
// One renderer session is shared by every internal page, so the trait takes
// &mut self: only one navigation can ever be in flight.
// =============================================================================

mod browser;
mod static_page;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::checker::StatusProbe;
use crate::config::{CrawlConfig, RendererKind};
use crate::error::RenderError;

pub use browser::ChromeRenderer;
pub use static_page::StaticRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[async_trait]
pub trait Renderer: Send {
    /// Short backend name for logs and the summary report.
    fn name(&self) -> &'static str;

    async fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// Waits for `document.readyState == "complete"`.
    ///
    /// `Ok(false)` means the wait timed out; the page is still usable.
    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<bool, RenderError>;

    async fn console_errors(&mut self, limit: usize) -> Result<Vec<String>, RenderError>;

    async fn broken_images(&mut self, limit: usize) -> Result<Vec<String>, RenderError>;

    /// Absolute URLs of every `<a href>` on the current page.
    async fn links(&mut self) -> Result<Vec<String>, RenderError>;

    async fn screen_size(&mut self) -> Result<ScreenSize, RenderError>;

    async fn close(&mut self) -> Result<(), RenderError>;
}

// Starts the renderer the configuration asks for
//
// A failure here is fatal for the run: without a renderer there is nothing
// to crawl with.
pub async fn start_renderer(
    config: &CrawlConfig,
    probe: Arc<dyn StatusProbe>,
) -> Result<Box<dyn Renderer>, RenderError> {
    match config.renderer {
        RendererKind::Static => {
            let renderer = StaticRenderer::new(
                config.probe_timeout,
                &config.user_agent,
                probe,
                config.window,
            )?;
            info!("Using static HTML renderer (no JavaScript)");
            Ok(Box::new(renderer))
        }
        RendererKind::Chrome => {
            if let Some(remote) = &config.remote {
                let endpoint = remote.endpoint_with_credentials();
                match ChromeRenderer::connect(&endpoint, config.window).await {
                    Ok(renderer) => {
                        info!("Running on remote browser grid at {}", remote.endpoint);
                        return Ok(Box::new(renderer));
                    }
                    Err(e) => {
                        warn!(
                            "Remote browser grid unavailable ({}), falling back to local execution",
                            e
                        );
                    }
                }
            }
            let renderer = ChromeRenderer::launch(config.headless, config.window).await?;
            if config.headless {
                info!("Running Chrome locally in headless mode");
            } else {
                info!("Running Chrome locally with GUI");
            }
            Ok(Box::new(renderer))
        }
    }
}
