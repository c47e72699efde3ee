//! Fixed-size pool of lookup workers sharing one input queue.
use std::net::IpAddr;
use std::num::NonZero;
use std::sync::Arc;

use log::debug;
use tokio::sync::{mpsc, Mutex};

use super::Match;
use crate::error::{Result, ScanError};
use crate::keywords::Keywords;
use crate::resolver::PtrLookup;

/// Completion signal a worker sends exactly once, after the input queue ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerDone {
    pub id: usize,
    pub processed: usize,
    pub matched: usize,
}

/// Totals gathered while joining the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Completion signals received. Always equals the number of workers on success.
    pub completions: usize,
    pub processed: usize,
    pub matched: usize,
}

/// Shared read end of the input queue.
pub type SharedInput = Arc<Mutex<mpsc::Receiver<IpAddr>>>;

/// Handle on a running pool. Joining it is the wait-group of the scan.
#[derive(Debug)]
pub struct WorkerPool {
    started: usize,
    done: mpsc::UnboundedReceiver<WorkerDone>,
}

impl WorkerPool {
    /// Spawns `workers` tasks that pull from `input` until it is closed and drained.
    ///
    /// Every worker holds its own clone of `output` and drops it before
    /// signalling, so once all signals are in, no worker can still write.
    pub fn spawn<R: PtrLookup>(
        workers: NonZero<usize>,
        resolver: Arc<R>,
        keywords: Arc<Keywords>,
        input: SharedInput,
        output: &mpsc::Sender<Match>,
    ) -> Self {
        let (done_tx, done) = mpsc::unbounded_channel();

        for id in 0..workers.get() {
            let worker = Worker {
                id,
                resolver: Arc::clone(&resolver),
                keywords: Arc::clone(&keywords),
                input: Arc::clone(&input),
                output: output.clone(),
            };
            let done_tx = done_tx.clone();
            tokio::spawn(async move {
                let signal = worker.run().await;
                // The receiver only goes away if the coordinator itself was dropped.
                let _ = done_tx.send(signal);
            });
        }

        Self {
            started: workers.get(),
            done,
        }
    }

    #[must_use]
    pub const fn started(&self) -> usize {
        self.started
    }

    /// Waits for exactly one completion signal per started worker.
    ///
    /// A worker that panics drops its signal sender without sending; once
    /// every sender is gone the missing signals are reported as
    /// [`ScanError::WorkerLost`] rather than waited on forever.
    pub async fn join(mut self) -> Result<PoolReport> {
        let mut report = PoolReport::default();

        while report.completions < self.started {
            let Some(signal) = self.done.recv().await else {
                return Err(ScanError::WorkerLost {
                    started: self.started,
                    lost: self.started - report.completions,
                });
            };
            debug!(
                "Worker {} done after {} addresses, {} matches",
                signal.id, signal.processed, signal.matched
            );
            report.completions += 1;
            report.processed += signal.processed;
            report.matched += signal.matched;
        }

        Ok(report)
    }
}

struct Worker<R> {
    id: usize,
    resolver: Arc<R>,
    keywords: Arc<Keywords>,
    input: SharedInput,
    output: mpsc::Sender<Match>,
}

impl<R: PtrLookup> Worker<R> {
    async fn run(self) -> WorkerDone {
        let mut processed = 0;
        let mut matched = 0;

        while let Some(address) = self.next_address().await {
            processed += 1;
            for hostname in self.resolver.reverse_lookup(address).await {
                if !self.keywords.matches(&hostname) {
                    continue;
                }
                if self.output.send(Match { address, hostname }).await.is_err() {
                    debug!("Worker {}: output queue closed early", self.id);
                    continue;
                }
                matched += 1;
            }
        }

        // Release the output handle before reporting in.
        drop(self.output);
        WorkerDone {
            id: self.id,
            processed,
            matched,
        }
    }

    /// `None` once the queue is closed and empty.
    async fn next_address(&self) -> Option<IpAddr> {
        self.input.lock().await.recv().await
    }
}
