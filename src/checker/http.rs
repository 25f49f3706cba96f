// src/checker/http.rs
// =============================================================================
// This module checks if URLs are alive by making HTTP requests.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Falls back to GET when a server refuses HEAD (405)
// - Follows redirects and reports the FINAL status code
// - Turns every failure (DNS, TLS, timeout, bad URL) into status 0
//
// The crawler talks to this through the StatusProbe trait, so the worker
// pool and the tests can swap in any implementation.
//
// Rust concepts:
// - Traits: a shared interface (StatusProbe) with several implementations
// - async-trait: lets trait methods be async and still work behind dyn
// - Result<T, E>: construction can fail, probing never does
// =============================================================================

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Status reported when the probe could not get any HTTP answer.
///
/// Real HTTP statuses start at 100, so 0 can never be confused with one.
pub const PROBE_FAILED: u16 = 0;

/// Desktop browser user agent; some sites answer bots differently.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/137.0 Safari/537.36";

// Anything that can tell us the HTTP status of a URL
//
// Send + Sync because one probe is shared by every worker task.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Returns the final HTTP status, or `PROBE_FAILED`.
    async fn status(&self, url: &str) -> u16;
}

// The real probe, backed by a reqwest client
pub struct HttpStatusProbe {
    client: Client,
}

impl HttpStatusProbe {
    // Builds the HTTP client once; it is reused for every probe
    //
    // Parameters:
    //   timeout: connect timeout, and also the budget for reading the answer
    //   user_agent: sent with every request
    pub fn new(timeout: Duration, user_agent: &str) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .timeout(timeout * 2)
            .redirect(reqwest::redirect::Policy::limited(10))
            // No idle connections are kept: each probe opens and closes its own
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StatusProbe for HttpStatusProbe {
    async fn status(&self, url: &str) -> u16 {
        let head = match self.client.head(url).send().await {
            Ok(response) => response.status(),
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                return PROBE_FAILED;
            }
        };

        if head != StatusCode::METHOD_NOT_ALLOWED {
            return head.as_u16();
        }

        // Some servers only speak GET; the body is dropped unread
        match self.client.get(url).send().await {
            Ok(response) => response.status().as_u16(),
            Err(e) => {
                debug!("GET {} failed after HEAD 405: {}", url, e);
                PROBE_FAILED
            }
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why return 0 instead of Result?
//    - A dead external link is a normal crawl outcome, not an error
//    - The caller just records the number; no error handling needed
//
// 2. Why connect_timeout AND timeout?
//    - connect_timeout bounds the TCP/TLS handshake
//    - timeout bounds the whole request, including waiting for headers
//
// 3. What does pool_max_idle_per_host(0) do?
//    - reqwest normally keeps connections open for reuse
//    - With 0 idle slots every connection is closed once the response is dropped
// -----------------------------------------------------------------------------
