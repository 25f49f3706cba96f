// src/crawl/frontier.rs
// =============================================================================
// The frontier is the crawl's shared memory:
// - visited: targets already taken off the queue (never processed twice)
// - queued:  targets ever pushed onto the queue (never pushed twice)
// - pending: the FIFO queue itself, so shallow pages tend to go first
// - a sequence counter that numbers results in admission order
//
// Two pages can discover the same link at the same moment, so "check then
// insert" has to be one step. All three collections live behind a single
// lock and each public method is one critical section.
//
// Rust concepts:
// - Arc<Frontier>: one store shared by the orchestrator and the worker pool
// - Interior mutability: &self methods that still mutate through a Mutex
// - Atomics: a lock-free counter for sequence numbers
// =============================================================================

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use super::normalize::CrawlTarget;

#[derive(Debug, Default)]
struct FrontierState {
    visited: HashSet<CrawlTarget>,
    queued: HashSet<CrawlTarget>,
    pending: VecDeque<CrawlTarget>,
}

#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    sequence: AtomicU64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    // Pushes a target unless it was already visited or already queued
    //
    // Returns true only for the call that actually pushed it.
    pub fn try_enqueue(&self, target: &CrawlTarget) -> bool {
        let mut state = self.state.lock();
        if state.visited.contains(target) {
            return false;
        }
        if !state.queued.insert(target.clone()) {
            return false;
        }
        state.pending.push_back(target.clone());
        true
    }

    // Pops the oldest pending target without waiting
    //
    // None means "nothing pending right now", not "crawl finished".
    pub fn dequeue(&self) -> Option<CrawlTarget> {
        self.state.lock().pending.pop_front()
    }

    // Records a target as processed; returns false if it already was
    pub fn mark_visited(&self, target: &CrawlTarget) -> bool {
        self.state.lock().visited.insert(target.clone())
    }

    // Hands out 1, 2, 3, ... across all threads
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn visited_len(&self) -> usize {
        self.state.lock().visited.len()
    }

    pub fn queued_len(&self) -> usize {
        self.state.lock().queued.len()
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why one Mutex instead of three?
//    - try_enqueue reads `visited` and writes `queued` and `pending`
//    - With separate locks another thread could slip in between the steps
//    - One lock makes the whole check-and-insert a single operation
//
// 2. Why parking_lot::Mutex?
//    - lock() returns the guard directly, no Result to unwrap
//    - It never gets "poisoned" if a thread panics while holding it
//
// 3. What does fetch_add return?
//    - The value BEFORE adding, so we add 1 to start numbering at 1
//    - SeqCst is the strictest ordering; plenty fast for a counter like this
// -----------------------------------------------------------------------------
