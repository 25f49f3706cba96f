// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Features:
// - FIFO frontier with atomic dedup (a page is never queued or processed twice)
// - Same-site pages are rendered and mined for links, off-site links only
//   get a status check on a bounded worker pool
// - Page cap, polite delay between iterations, clean shutdown on Ctrl+C
//
// Submodules, leaves first:
// - normalize: canonical URLs and the skip policy
// - classify: internal vs external
// - frontier: visited/queued sets, the queue, sequence numbers
// - pool: external status-check workers
// - rate: the delay between iterations
// - orchestrator: the loop that drives all of the above
// =============================================================================

mod classify;
mod frontier;
mod normalize;
mod orchestrator;
mod pool;
mod rate;

pub use orchestrator::{CrawlOutcome, Orchestrator};
