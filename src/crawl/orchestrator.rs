// src/crawl/orchestrator.rs
// =============================================================================
// The crawl loop.
//
// States: Running -> Draining -> Stopped
//
// Running, once per frontier entry:
// 1. Dequeue the next target and mark it visited
// 2. Skip static assets (visited, but no work and no slot used)
// 3. Internal: audit the page right here (one shared renderer) and feed
//    every discovered link back into the frontier
// 4. External: hand it to the probe pool and move on
// 5. Collect whatever the pool has finished
// 6. Wait for the rate limiter (or a stop request)
//
// Draining: wait until every outstanding status check has reported back. Each
// check gets drain_timeout of its own once it is running. Only checks that
// outlive it are abandoned, and checks queued behind them still run.
//
// Stopped: shut down the pool, close the renderer, write the summary. This
// runs on every path out of the loop: frontier exhausted, page cap reached,
// or Ctrl+C.
// =============================================================================

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::classify::Classifier;
use super::frontier::Frontier;
use super::normalize::{is_discoverable, should_skip, CrawlTarget};
use super::pool::{Completion, ProbePool, ProbeTask};
use super::rate::RateLimiter;
use crate::audit::PageAuditor;
use crate::checker::StatusProbe;
use crate::config::CrawlConfig;
use crate::report::{CrawlReport, CrawlResult, LinkType, ResultSink, RunMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Running,
    Draining,
    Stopped,
}

/// What a finished run hands back to the caller.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub report: CrawlReport,
    pub interrupted: bool,
    /// External probes that never reported back.
    pub abandoned: usize,
    /// Targets still waiting in the frontier (non-zero after cap or stop).
    pub pending: usize,
}

pub struct Orchestrator {
    config: CrawlConfig,
    classifier: Classifier,
    frontier: Arc<Frontier>,
    auditor: PageAuditor,
    pool: ProbePool,
    sink: Arc<ResultSink>,
    limiter: RateLimiter,
    stop: watch::Receiver<bool>,
    state: CrawlState,
    admitted: usize,
    internal: usize,
    external: usize,
}

impl Orchestrator {
    // Wires everything together and queues the seed
    //
    // Must be called inside a tokio runtime (the pool spawns its workers).
    pub fn new(
        config: &CrawlConfig,
        auditor: PageAuditor,
        probe: Arc<dyn StatusProbe>,
        sink: Arc<ResultSink>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        let classifier = Classifier::new(&config.seed);
        if !classifier.has_base() {
            warn!("Seed {} has no host, it will only be status-checked", config.seed);
        }

        let frontier = Arc::new(Frontier::new());
        frontier.try_enqueue(&CrawlTarget::new(&config.seed));

        Self {
            config: config.clone(),
            classifier,
            frontier,
            auditor,
            pool: ProbePool::new(probe, config.pool_size, config.pool_size * 2),
            sink,
            limiter: RateLimiter::new(config.delay),
            stop,
            state: CrawlState::Running,
            admitted: 0,
            internal: 0,
            external: 0,
        }
    }

    #[cfg(test)]
    fn frontier(&self) -> Arc<Frontier> {
        self.frontier.clone()
    }

    // Runs the crawl to completion; per-page failures never end it early
    pub async fn run(mut self) -> CrawlOutcome {
        info!(
            "Starting crawl of {} (base domain: {}, max pages: {})",
            self.config.seed,
            self.classifier.base_host(),
            self.config.max_pages
        );

        let interrupted = self.crawl().await;

        self.enter(CrawlState::Draining);
        let abandoned = self.drain().await;

        self.enter(CrawlState::Stopped);
        self.shutdown(interrupted, abandoned).await
    }

    // Returns true if a stop request ended the loop
    async fn crawl(&mut self) -> bool {
        loop {
            if *self.stop.borrow() {
                info!("Stop requested, no new pages will be admitted");
                return true;
            }
            if self.admitted >= self.config.max_pages {
                info!("Reached the limit of {} pages", self.config.max_pages);
                return false;
            }
            let Some(target) = self.frontier.dequeue() else {
                debug!("Frontier exhausted");
                return false;
            };
            if !self.frontier.mark_visited(&target) {
                debug!("{} already visited", target);
                continue;
            }
            if should_skip(target.as_str()) {
                debug!("Skipping {}", target);
                continue;
            }

            match self.classifier.link_type(target.as_str()) {
                LinkType::Internal => self.process_internal(&target).await,
                LinkType::External => self.submit_external(target).await,
            }
            self.admitted += 1;

            self.collect_completed();
            if self.config.progress_every > 0 && self.admitted % self.config.progress_every == 0 {
                self.log_progress();
            }

            tokio::select! {
                _ = self.limiter.wait() => {}
                _ = stop_requested(&mut self.stop) => {
                    info!("Stop requested, no new pages will be admitted");
                    return true;
                }
            }
        }
    }

    async fn process_internal(&mut self, target: &CrawlTarget) {
        let sequence = self.frontier.next_sequence();
        let url = target.as_str();
        let audit = self.auditor.audit(url).await;

        let mut discovered = 0;
        for link in &audit.links {
            if !is_discoverable(link) {
                continue;
            }
            if self.frontier.try_enqueue(&CrawlTarget::new(link)) {
                discovered += 1;
            }
        }
        debug!("{} new links queued from {}", discovered, url);

        self.internal += 1;
        self.sink.append(CrawlResult::internal(sequence, url, &audit));
    }

    async fn submit_external(&mut self, target: CrawlTarget) {
        let sequence = self.frontier.next_sequence();
        let url = target.to_string();
        self.external += 1;
        if !self.pool.submit(ProbeTask { sequence, target }).await {
            warn!("Could not schedule status check for {}", url);
        }
    }

    fn collect_completed(&mut self) {
        for completion in self.pool.try_completed() {
            record(&self.sink, completion);
        }
    }

    // Returns how many probes were abandoned
    async fn drain(&mut self) -> usize {
        self.collect_completed();
        let outstanding = self.pool.outstanding();
        if outstanding == 0 {
            return 0;
        }
        info!("Waiting for {} external link check(s) to finish", outstanding);

        let sink = self.sink.clone();
        self.pool
            .drain(self.config.drain_timeout, |completion| record(&sink, completion))
            .await
    }

    async fn shutdown(mut self, interrupted: bool, abandoned: usize) -> CrawlOutcome {
        self.pool.shutdown(self.config.pool_shutdown_timeout).await;

        let screen_size = self.auditor.screen_size().await;
        let renderer = self.auditor.renderer_name().to_string();
        match self.auditor.close().await {
            Ok(()) => debug!("Renderer closed"),
            Err(e) => warn!("Error closing renderer: {}", e),
        }

        if let Err(e) = self.sink.finish() {
            error!("Could not finish writing results: {}", e);
        }

        let metadata = RunMetadata {
            base_domain: self.classifier.base_host().to_string(),
            visited: self.frontier.visited_len(),
            queued: self.frontier.queued_len(),
            flags: self.config.flags,
            pool_size: self.config.pool_size,
            probe_timeout_ms: self.config.probe_timeout.as_millis() as u64,
            delay_ms: self.config.delay.as_millis() as u64,
            renderer,
            screen_size,
            interrupted,
            abandoned,
        };
        let report = CrawlReport::build(&self.sink.snapshot(), metadata);

        if let Some(path) = &self.config.report_path {
            match report.write_to(path) {
                Ok(()) => info!("Summary report saved to {}", path.display()),
                Err(e) => error!("Could not write summary report to {}: {}", path.display(), e),
            }
        }

        info!(
            "Crawl finished: {} results ({} internal, {} external)",
            self.sink.len(),
            report.internal,
            report.external
        );

        CrawlOutcome {
            report,
            interrupted,
            abandoned,
            pending: self.frontier.pending_len(),
        }
    }

    fn enter(&mut self, state: CrawlState) {
        debug!("Crawl state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn log_progress(&self) {
        info!(
            "Progress: {} processed ({} internal, {} external), {} in queue, {} discovered",
            self.admitted,
            self.internal,
            self.external,
            self.frontier.pending_len(),
            self.frontier.visited_len()
        );
    }
}

fn record(sink: &ResultSink, completion: Completion) {
    match completion {
        Completion::Done(result) => sink.append(result),
        Completion::Failed { sequence, url, reason } => {
            warn!("Status check #{} for {} failed: {}", sequence, url, reason);
        }
    }
}

// Resolves once a stop has been requested
//
// If the sender is gone nobody can ask us to stop anymore, so it never
// resolves.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
