// src/fixtures.rs
// =============================================================================
// In-memory stand-ins for the renderer and the status probe, for tests.
//
// FixtureRenderer serves a made-up site: each page has a list of links and
// optional console errors / broken images. FixtureProbe answers from a
// status table (200 for anything unknown). Both record what they were asked
// to do so tests can check that skipped URLs were never touched.
// =============================================================================

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::checker::StatusProbe;
use crate::error::RenderError;
use crate::render::{Renderer, ScreenSize};

#[derive(Default)]
pub struct FixtureProbe {
    statuses: HashMap<String, u16>,
    delays: HashMap<String, Duration>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FixtureProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.statuses.insert(url.to_string(), status);
        self
    }

    pub fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// Shared log of every probed URL, in call order.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl StatusProbe for FixtureProbe {
    async fn status(&self, url: &str) -> u16 {
        self.calls.lock().push(url.to_string());
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.statuses.get(url).copied().unwrap_or(200)
    }
}

#[derive(Default, Clone)]
struct FixturePage {
    links: Vec<String>,
    console_errors: Vec<String>,
    broken_images: Vec<String>,
}

#[derive(Default)]
pub struct FixtureRenderer {
    pages: HashMap<String, FixturePage>,
    failing: HashSet<String>,
    current: Option<String>,
    navigations: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl FixtureRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, links: &[&str]) -> Self {
        self.pages.entry(url.to_string()).or_default().links = to_strings(links);
        self
    }

    pub fn console_errors(mut self, url: &str, errors: &[&str]) -> Self {
        self.pages.entry(url.to_string()).or_default().console_errors = to_strings(errors);
        self
    }

    pub fn broken_images(mut self, url: &str, images: &[&str]) -> Self {
        self.pages.entry(url.to_string()).or_default().broken_images = to_strings(images);
        self
    }

    // Navigating to this URL fails
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn navigations(&self) -> Arc<Mutex<Vec<String>>> {
        self.navigations.clone()
    }

    pub fn closed(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    fn current_page(&self) -> Result<FixturePage, RenderError> {
        let url = self.current.as_ref().ok_or(RenderError::NoPage)?;
        // Unknown pages load fine and are empty
        Ok(self.pages.get(url).cloned().unwrap_or_default())
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[async_trait]
impl Renderer for FixtureRenderer {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        self.navigations.lock().push(url.to_string());
        if self.failing.contains(url) {
            self.current = None;
            return Err(RenderError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn wait_until_ready(&mut self, _timeout: Duration) -> Result<bool, RenderError> {
        Ok(self.current.is_some())
    }

    async fn console_errors(&mut self, limit: usize) -> Result<Vec<String>, RenderError> {
        let mut errors = self.current_page()?.console_errors;
        errors.truncate(limit);
        Ok(errors)
    }

    async fn broken_images(&mut self, limit: usize) -> Result<Vec<String>, RenderError> {
        let mut images = self.current_page()?.broken_images;
        images.truncate(limit);
        Ok(images)
    }

    async fn links(&mut self) -> Result<Vec<String>, RenderError> {
        Ok(self.current_page()?.links)
    }

    async fn screen_size(&mut self) -> Result<ScreenSize, RenderError> {
        Ok(ScreenSize::default())
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
