// src/render/browser.rs
// =============================================================================
// A real Chromium, driven over the Chrome DevTools Protocol (chromiumoxide).
//
// One browser, one tab, reused for every internal page:
// 1. Launch locally (or connect to a remote grid's CDP endpoint)
// 2. Open a single page and install an error-capture script that runs
//    before any site script on every document we load
// 3. navigate / wait / query the DOM with small injected scripts
// 4. close() shuts the tab, the browser and the CDP event loop
//
// chromiumoxide needs its Handler stream polled for the connection to make
// progress, so we park it on a tokio task and abort that task on close/drop.
// =============================================================================

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Handler, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{Renderer, ScreenSize};
use crate::error::RenderError;

// Collects script errors, rejected promises, console.error calls and failed
// resource loads into window.__siteGuardianErrors
const ERROR_CAPTURE_SCRIPT: &str = r#"
(() => {
  if (window.__siteGuardianErrors) { return; }
  const errors = [];
  window.__siteGuardianErrors = errors;
  window.addEventListener('error', (event) => {
    const el = event.target;
    if (el && el !== window && (el.src || el.href)) {
      errors.push('Failed resource: ' + (el.src || el.href));
    } else {
      const where = event.filename ? ' at ' + event.filename + ':' + event.lineno : '';
      errors.push('JS error: ' + (event.message || 'unknown error') + where);
    }
  }, true);
  window.addEventListener('unhandledrejection', (event) => {
    errors.push('Unhandled rejection: ' + String(event.reason));
  });
  const original = console.error;
  console.error = function (...args) {
    errors.push('console.error: ' + args.map(String).join(' '));
    return original.apply(this, args);
  };
})();
"#;

const LINKS_SCRIPT: &str = r#"
(() => Array.from(document.querySelectorAll('a[href]'))
  .map((a) => a.href)
  .filter((href) => typeof href === 'string' && href.length > 0))()
"#;

const SCREEN_SCRIPT: &str = "({ width: window.screen.width, height: window.screen.height })";

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

// No extensions or background throttling, and mixed content is allowed.
// Images and JavaScript stay ON since we audit both.
const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-web-security",
    "--allow-running-insecure-content",
    "--disable-extensions",
    "--disable-plugins",
    "--disable-default-apps",
    "--disable-background-timer-throttling",
    "--disable-renderer-backgrounding",
    "--disable-backgrounding-occluded-windows",
    "--aggressive-cache-discard",
];

fn console_errors_script(limit: usize) -> String {
    format!(
        r#"
(() => {{
  const errors = (window.__siteGuardianErrors || []).slice();
  const images = document.getElementsByTagName('img');
  for (let i = 0; i < Math.min(images.length, 50); i++) {{
    const img = images[i];
    if (img.complete && img.naturalWidth === 0 && img.src) {{
      errors.push('Failed resource: ' + img.src);
    }}
  }}
  return Array.from(new Set(errors)).slice(0, {limit});
}})()
"#
    )
}

fn broken_images_script(limit: usize) -> String {
    format!(
        r#"
(() => {{
  const broken = [];
  const images = document.getElementsByTagName('img');
  const scan = Math.min(images.length, 100);
  for (let i = 0; i < scan; i++) {{
    const img = images[i];
    if (img.complete && img.naturalWidth === 0 && img.src) {{
      broken.push(img.src);
    }}
  }}
  return broken.slice(0, {limit});
}})()
"#
    )
}

#[derive(Debug, Deserialize)]
struct ScreenDimensions {
    width: u32,
    height: u32,
}

pub struct ChromeRenderer {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    window: ScreenSize,
    closed: bool,
}

impl ChromeRenderer {
    // Launches a local Chromium
    pub async fn launch(headless: bool, window: ScreenSize) -> Result<Self, RenderError> {
        let mut builder = BrowserConfig::builder()
            .window_size(window.width, window.height)
            .request_timeout(Duration::from_secs(30));
        if !headless {
            builder = builder.with_head();
        }
        for arg in LAUNCH_ARGS {
            builder = builder.arg(*arg);
        }
        let config = builder.build().map_err(RenderError::Launch)?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        Self::from_parts(browser, handler, window).await
    }

    // Connects to an already running browser, e.g. a remote grid
    //
    // `endpoint` is the DevTools websocket (or http) URL, credentials included.
    pub async fn connect(endpoint: &str, window: ScreenSize) -> Result<Self, RenderError> {
        let (browser, handler) = Browser::connect(endpoint)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        Self::from_parts(browser, handler, window).await
    }

    async fn from_parts(
        browser: Browser,
        handler: Handler,
        window: ScreenSize,
    ) -> Result<Self, RenderError> {
        let handler = spawn_handler(handler);

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(RenderError::Launch(format!("could not open a tab: {}", e)));
            }
        };

        let install = page
            .execute(AddScriptToEvaluateOnNewDocumentParams {
                source: ERROR_CAPTURE_SCRIPT.to_string(),
                include_command_line_api: None,
                world_name: None,
                run_immediately: None,
            })
            .await;
        if let Err(e) = install {
            // Still usable: console errors will just miss script-level events
            warn!("Could not install error capture script: {}", e);
        }

        Ok(Self {
            browser,
            page,
            handler,
            window,
            closed: false,
        })
    }

    async fn evaluate<T: DeserializeOwned>(&self, script: &str) -> Result<T, RenderError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Script(e.to_string()))?;
        result
            .into_value::<T>()
            .map_err(|e| RenderError::Script(e.to_string()))
    }
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                // Unknown CDP messages show up here too; they are harmless
                debug!("Browser handler error: {}", e);
            }
        }
        debug!("Browser handler task completed");
    })
}

#[async_trait]
impl Renderer for ChromeRenderer {
    fn name(&self) -> &'static str {
        "chrome"
    }

    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<bool, RenderError> {
        let start = Instant::now();
        loop {
            match self.evaluate::<String>("document.readyState").await {
                Ok(state) if state == "complete" => return Ok(true),
                Ok(_) => {}
                Err(e) => debug!("Failed to check readyState: {}, retrying", e),
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn console_errors(&mut self, limit: usize) -> Result<Vec<String>, RenderError> {
        self.evaluate(&console_errors_script(limit)).await
    }

    async fn broken_images(&mut self, limit: usize) -> Result<Vec<String>, RenderError> {
        self.evaluate(&broken_images_script(limit)).await
    }

    async fn links(&mut self) -> Result<Vec<String>, RenderError> {
        self.evaluate(LINKS_SCRIPT).await
    }

    async fn screen_size(&mut self) -> Result<ScreenSize, RenderError> {
        match self.evaluate::<ScreenDimensions>(SCREEN_SCRIPT).await {
            Ok(dims) => Ok(ScreenSize {
                width: dims.width,
                height: dims.height,
            }),
            Err(e) => {
                debug!("Falling back to configured window size: {}", e);
                Ok(self.window)
            }
        }
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Err(e) = self.page.clone().close().await {
            debug!("Closing tab failed: {}", e);
        }
        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Shutdown(e.to_string()));
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for browser exit failed: {}", e);
        }
        self.handler.abort();
        result
    }
}

impl Drop for ChromeRenderer {
    fn drop(&mut self) {
        if !self.closed {
            // Browser's own Drop kills a locally launched process
            warn!("Chrome renderer dropped without close(), aborting CDP handler");
            self.handler.abort();
        }
    }
}
