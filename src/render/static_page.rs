// src/render/static_page.rs
// =============================================================================
// A renderer without a browser: fetch the HTML over HTTP and read it.
//
// Useful on machines without Chrome and for quick audits of server-rendered
// sites. Limitations compared to the Chrome backend:
// - no JavaScript, so no console errors and no script-generated links
// - "broken image" means the <img src> does not answer with a 2xx/3xx
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use super::{Renderer, ScreenSize};
use crate::checker::{extract_html_links, extract_image_sources, StatusProbe, PROBE_FAILED};
use crate::error::RenderError;

// Same scan bound the browser backend uses for <img> elements
const IMAGE_SCAN_LIMIT: usize = 100;

struct LoadedPage {
    url: String,
    html: String,
}

pub struct StaticRenderer {
    client: Client,
    probe: Arc<dyn StatusProbe>,
    window: ScreenSize,
    current: Option<LoadedPage>,
}

impl StaticRenderer {
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        probe: Arc<dyn StatusProbe>,
        window: ScreenSize,
    ) -> Result<Self, RenderError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .timeout(timeout * 4)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        Ok(Self {
            client,
            probe,
            window,
            current: None,
        })
    }

    fn page(&self) -> Result<&LoadedPage, RenderError> {
        self.current.as_ref().ok_or(RenderError::NoPage)
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        self.current = None;
        let navigation_error = |e: reqwest::Error| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(navigation_error)?;
        // Like a browser, error pages are still pages; the status is
        // reported separately by the probe
        let final_url = response.url().to_string();
        let html = response.text().await.map_err(navigation_error)?;

        self.current = Some(LoadedPage { url: final_url, html });
        Ok(())
    }

    async fn wait_until_ready(&mut self, _timeout: Duration) -> Result<bool, RenderError> {
        // The whole body is already here
        Ok(self.current.is_some())
    }

    async fn console_errors(&mut self, _limit: usize) -> Result<Vec<String>, RenderError> {
        self.page()?;
        Ok(Vec::new())
    }

    async fn broken_images(&mut self, limit: usize) -> Result<Vec<String>, RenderError> {
        let page = self.page()?;
        let sources = extract_image_sources(&page.html, &page.url);

        let mut broken = Vec::new();
        for src in sources.into_iter().take(IMAGE_SCAN_LIMIT) {
            if broken.len() >= limit {
                break;
            }
            let status = self.probe.status(&src).await;
            if status == PROBE_FAILED || status >= 400 {
                broken.push(src);
            }
        }
        Ok(broken)
    }

    async fn links(&mut self) -> Result<Vec<String>, RenderError> {
        let page = self.page()?;
        Ok(extract_html_links(&page.html, &page.url))
    }

    async fn screen_size(&mut self) -> Result<ScreenSize, RenderError> {
        Ok(self.window)
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.current = None;
        Ok(())
    }
}
