// src/crawl/pool.rs
// =============================================================================
// A fixed-size pool of worker tasks that probe external links.
//
// How it works:
// 1. The orchestrator submits ProbeTasks on a BOUNDED channel
//    (if every worker is busy and the channel is full, submit waits)
// 2. N workers share the receiving end and take tasks one at a time
// 3. Each worker runs the probe and sends a Completion back on a second
//    channel, which the orchestrator polls without blocking
// 4. drain() waits for everything still outstanding. Each task gets its own
//    window, counted from when it started running (or from the start of the
//    drain, whichever is later), and only tasks that outlive it are aborted
// 5. shutdown() closes the task channel, waits for the workers to finish,
//    and aborts any that don't finish in time
//
// The probe runs in its own spawned task, so a panicking probe is caught as
// a JoinError and reported as a failed completion instead of killing the
// worker.
// =============================================================================

use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::normalize::CrawlTarget;
use crate::checker::StatusProbe;
use crate::report::CrawlResult;

#[derive(Debug, Clone)]
pub struct ProbeTask {
    pub sequence: u64,
    pub target: CrawlTarget,
}

#[derive(Debug)]
pub enum Completion {
    Done(CrawlResult),
    /// The probe task itself died; no result is recorded for it.
    Failed {
        sequence: u64,
        url: String,
        reason: String,
    },
}

impl Completion {
    pub fn sequence(&self) -> u64 {
        match self {
            Completion::Done(result) => result.sequence,
            Completion::Failed { sequence, .. } => *sequence,
        }
    }
}

// Aborts the wrapped task when dropped, so an aborted worker takes its
// in-flight probe down with it
struct AbortTaskOnDrop(AbortHandle);

impl Drop for AbortTaskOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

// A status check a worker is running right now
struct InFlight {
    url: String,
    started: Instant,
    abort: AbortHandle,
}

type Running = Arc<parking_lot::Mutex<HashMap<u64, InFlight>>>;

pub struct ProbePool {
    // None once shutdown() has closed the channel
    tasks: Option<mpsc::Sender<ProbeTask>>,
    completions: mpsc::UnboundedReceiver<Completion>,
    running: Running,
    workers: Vec<JoinHandle<()>>,
    abort_handles: Vec<AbortHandle>,
    outstanding: usize,
}

impl ProbePool {
    // Spawns the workers right away; must be called inside a tokio runtime
    //
    // Parameters:
    //   probe: shared by every worker
    //   size: number of workers (at least one is always spawned)
    //   capacity: how many submitted tasks may wait for a free worker
    pub fn new(probe: Arc<dyn StatusProbe>, size: usize, capacity: usize) -> Self {
        let (task_tx, task_rx) = mpsc::channel(capacity.max(1));
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let task_rx = Arc::new(Mutex::new(task_rx));
        let running: Running = Arc::default();

        let workers: Vec<JoinHandle<()>> = (0..size.max(1))
            .map(|id| {
                tokio::spawn(worker(
                    id,
                    probe.clone(),
                    task_rx.clone(),
                    done_tx.clone(),
                    running.clone(),
                ))
            })
            .collect();
        let abort_handles = workers.iter().map(|w| w.abort_handle()).collect();

        Self {
            tasks: Some(task_tx),
            completions: done_rx,
            running,
            workers,
            abort_handles,
            outstanding: 0,
        }
    }

    // Hands a task to the pool, waiting for channel space if needed
    //
    // Returns false if the pool is already shut down.
    pub async fn submit(&mut self, task: ProbeTask) -> bool {
        let Some(tasks) = &self.tasks else {
            return false;
        };
        match tasks.send(task).await {
            Ok(()) => {
                self.outstanding += 1;
                true
            }
            Err(e) => {
                warn!("Probe pool rejected {}: all workers are gone", e.0.target);
                false
            }
        }
    }

    /// Submitted tasks whose completion hasn't been collected yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    // Everything that finished since the last call, without waiting
    pub fn try_completed(&mut self) -> Vec<Completion> {
        let mut done = Vec::new();
        while let Ok(completion) = self.completions.try_recv() {
            self.outstanding = self.outstanding.saturating_sub(1);
            done.push(completion);
        }
        done
    }

    // Waits until nothing is outstanding, handing every completion to
    // `on_completion` as it arrives
    //
    // A task that has been running for `per_task` (counted from the later of
    // its start and the start of the drain) is aborted and abandoned. Tasks
    // still queued behind it are not affected: they start once a worker frees
    // up and get a full window of their own.
    //
    // Returns how many tasks were abandoned.
    pub async fn drain<F>(&mut self, per_task: Duration, mut on_completion: F) -> usize
    where
        F: FnMut(Completion),
    {
        let drain_start = Instant::now();
        let mut abandoned: HashSet<u64> = HashSet::new();

        while self.outstanding > 0 {
            let deadline = self.next_deadline(drain_start, per_task, &abandoned);
            let next = tokio::select! {
                // Finished work wins over an expiring deadline
                biased;
                completion = self.completions.recv() => Some(completion),
                _ = tokio::time::sleep_until(deadline) => None,
            };

            match next {
                Some(Some(completion)) => {
                    if abandoned.contains(&completion.sequence()) {
                        debug!("Dropping late completion #{}", completion.sequence());
                        continue;
                    }
                    self.outstanding -= 1;
                    on_completion(completion);
                }
                Some(None) => {
                    warn!("Workers are gone with {} task(s) outstanding", self.outstanding);
                    break;
                }
                None => {
                    let expired = self.abandon_expired(drain_start, per_task, &mut abandoned);
                    self.outstanding = self.outstanding.saturating_sub(expired);
                }
            }
        }

        if !abandoned.is_empty() {
            info!("Abandoned {} status check(s) after {:?} each", abandoned.len(), per_task);
        }
        abandoned.len()
    }

    // When the soonest running task's window closes
    //
    // With nothing running yet (tasks still queued), wakes up after one window
    // to look again.
    fn next_deadline(
        &self,
        drain_start: Instant,
        per_task: Duration,
        abandoned: &HashSet<u64>,
    ) -> Instant {
        self.running
            .lock()
            .iter()
            .filter(|(sequence, _)| !abandoned.contains(*sequence))
            .map(|(_, flight)| flight.started.max(drain_start) + per_task)
            .min()
            .unwrap_or_else(|| Instant::now() + per_task)
    }

    // Aborts every running task whose window has closed; returns how many
    fn abandon_expired(
        &self,
        drain_start: Instant,
        per_task: Duration,
        abandoned: &mut HashSet<u64>,
    ) -> usize {
        let now = Instant::now();
        let running = self.running.lock();
        let mut expired = 0;
        for (sequence, flight) in running.iter() {
            if abandoned.contains(sequence) || flight.started.max(drain_start) + per_task > now {
                continue;
            }
            warn!(
                "Status check #{} for {} still running after {:?}, abandoning it",
                sequence, flight.url, per_task
            );
            flight.abort.abort();
            abandoned.insert(*sequence);
            expired += 1;
        }
        expired
    }

    // Stops accepting tasks and waits for the workers to exit
    //
    // Workers that are still busy after `timeout` are aborted.
    pub async fn shutdown(&mut self, timeout: Duration) {
        // Dropping the sender lets idle workers see the channel close
        self.tasks = None;
        let workers = std::mem::take(&mut self.workers);
        if workers.is_empty() {
            return;
        }

        if tokio::time::timeout(timeout, join_all(workers)).await.is_err() {
            warn!("Probe workers still busy after {:?}, aborting them", timeout);
            for handle in &self.abort_handles {
                handle.abort();
            }
        } else {
            debug!("All probe workers stopped");
        }
    }
}

impl Drop for ProbePool {
    fn drop(&mut self) {
        for handle in &self.abort_handles {
            handle.abort();
        }
    }
}

async fn worker(
    id: usize,
    probe: Arc<dyn StatusProbe>,
    tasks: Arc<Mutex<mpsc::Receiver<ProbeTask>>>,
    done: mpsc::UnboundedSender<Completion>,
    running: Running,
) {
    loop {
        // Lock only long enough to take one task
        let next = tasks.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };

        let probe = probe.clone();
        let url = task.target.as_str().to_string();
        let handle = tokio::spawn(async move { probe.status(&url).await });
        let _guard = AbortTaskOnDrop(handle.abort_handle());
        running.lock().insert(
            task.sequence,
            InFlight {
                url: task.target.to_string(),
                started: Instant::now(),
                abort: handle.abort_handle(),
            },
        );

        let outcome = handle.await;
        running.lock().remove(&task.sequence);

        let completion = match outcome {
            Ok(status) => {
                Completion::Done(CrawlResult::external(task.sequence, task.target.as_str(), status))
            }
            Err(e) => Completion::Failed {
                sequence: task.sequence,
                url: task.target.to_string(),
                reason: e.to_string(),
            },
        };

        if done.send(completion).is_err() {
            // Nobody is listening anymore
            break;
        }
    }
    debug!("Probe worker {} exiting", id);
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Arc<Mutex<Receiver>>?
//    - An mpsc Receiver has exactly one owner
//    - Wrapping it lets N workers take turns pulling from the same queue
//    - It's tokio's Mutex because we hold it across .await (the recv)
//
// 2. Why a bounded task channel but an unbounded completion channel?
//    - Bounded tasks = backpressure: the orchestrator can't pile up
//      thousands of pending probes
//    - Completions are small and we always read them, so unbounded is fine
//
// 3. What is an AbortHandle?
//    - A cheap handle that can cancel a spawned task
//    - Unlike JoinHandle, keeping one doesn't stop you from awaiting the task
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FixtureProbe;
    use crate::report::LinkType;
    use async_trait::async_trait;

    fn task(sequence: u64, url: &str) -> ProbeTask {
        ProbeTask {
            sequence,
            target: CrawlTarget::new(url),
        }
    }

    // Drains with a 5 s window per task
    async fn collect_all(pool: &mut ProbePool) -> (Vec<Completion>, usize) {
        let mut all = Vec::new();
        let abandoned = pool.drain(Duration::from_secs(5), |c| all.push(c)).await;
        (all, abandoned)
    }

    fn done_sequences(completions: &[Completion]) -> Vec<u64> {
        let mut sequences: Vec<u64> = completions
            .iter()
            .filter(|c| matches!(c, Completion::Done(_)))
            .map(Completion::sequence)
            .collect();
        sequences.sort_unstable();
        sequences
    }

    #[tokio::test]
    async fn test_every_submission_completes_once() {
        let probe = Arc::new(FixtureProbe::new().status("https://ext.test/missing", 404));
        let mut pool = ProbePool::new(probe, 3, 2);

        for i in 0..10u64 {
            let url = if i == 4 {
                "https://ext.test/missing".to_string()
            } else {
                format!("https://ext.test/{}", i)
            };
            assert!(pool.submit(task(i + 1, &url)).await);
        }

        let (completions, abandoned) = collect_all(&mut pool).await;
        assert_eq!(abandoned, 0);
        for completion in &completions {
            match completion {
                Completion::Done(result) => {
                    assert_eq!(result.link_type, LinkType::External);
                    let expected = if result.sequence == 5 { 404 } else { 200 };
                    assert_eq!(result.status, expected);
                }
                Completion::Failed { reason, .. } => panic!("unexpected failure: {}", reason),
            }
        }
        assert_eq!(done_sequences(&completions), (1..=10).collect::<Vec<_>>());
        assert_eq!(pool.outstanding(), 0);

        pool.shutdown(Duration::from_secs(1)).await;
        assert!(!pool.submit(task(11, "https://ext.test/late")).await);
    }

    struct PanickingProbe;

    #[async_trait]
    impl StatusProbe for PanickingProbe {
        async fn status(&self, url: &str) -> u16 {
            if url.contains("boom") {
                panic!("probe exploded");
            }
            200
        }
    }

    #[tokio::test]
    async fn test_panicking_probe_becomes_failed_completion() {
        let mut pool = ProbePool::new(Arc::new(PanickingProbe), 1, 4);
        pool.submit(task(1, "https://ext.test/boom")).await;
        pool.submit(task(2, "https://ext.test/fine")).await;

        let (completions, abandoned) = collect_all(&mut pool).await;
        assert_eq!(abandoned, 0);
        assert_eq!(completions.len(), 2);
        assert!(completions
            .iter()
            .any(|c| matches!(c, Completion::Failed { sequence: 1, .. })));
        // The worker survived and handled the next task
        assert_eq!(done_sequences(&completions), vec![2]);
        pool.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_check_is_abandoned_after_its_window() {
        let slow = Duration::from_secs(3600);
        let probe = Arc::new(FixtureProbe::new().delay("https://ext.test/slow", slow));
        let mut pool = ProbePool::new(probe, 2, 4);
        pool.submit(task(1, "https://ext.test/slow")).await;
        pool.submit(task(2, "https://ext.test/fast")).await;

        let started = Instant::now();
        let (completions, abandoned) = collect_all(&mut pool).await;
        assert_eq!(abandoned, 1);
        assert_eq!(done_sequences(&completions), vec![2]);
        assert_eq!(pool.outstanding(), 0);
        assert!(started.elapsed() < Duration::from_secs(6));

        pool.shutdown(Duration::from_secs(30)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_task_gets_its_own_window() {
        // One worker: the second task can't start until the first is gone
        let probe = Arc::new(
            FixtureProbe::new()
                .delay("https://ext.test/slow", Duration::from_secs(8))
                .delay("https://ext.test/steady", Duration::from_secs(4)),
        );
        let mut pool = ProbePool::new(probe, 1, 4);
        pool.submit(task(1, "https://ext.test/slow")).await;
        pool.submit(task(2, "https://ext.test/steady")).await;

        let started = Instant::now();
        let (completions, abandoned) = collect_all(&mut pool).await;

        // slow is cut off at 5 s, steady then runs 5 s..9 s inside its window
        assert_eq!(abandoned, 1);
        assert_eq!(done_sequences(&completions), vec![2]);
        assert!(started.elapsed() >= Duration::from_secs(9));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(pool.outstanding(), 0);

        pool.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_drain_with_nothing_outstanding_returns_at_once() {
        let mut pool = ProbePool::new(Arc::new(FixtureProbe::new()), 2, 2);
        let (completions, abandoned) = collect_all(&mut pool).await;
        assert!(completions.is_empty());
        assert_eq!(abandoned, 0);
    }

    #[tokio::test]
    async fn test_try_completed_does_not_block() {
        let probe = Arc::new(FixtureProbe::new());
        let mut pool = ProbePool::new(probe, 2, 2);
        assert!(pool.try_completed().is_empty());

        pool.submit(task(1, "https://ext.test/a")).await;
        let mut got = Vec::new();
        while got.is_empty() {
            got = pool.try_completed();
            tokio::task::yield_now().await;
        }
        assert_eq!(got.len(), 1);
        assert_eq!(pool.outstanding(), 0);
    }
}
