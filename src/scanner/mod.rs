//! Core functionality for the actual sweep: fan addresses out to workers,
//! fan matches back in to a single writer, and shut both down in order.
mod pool;
mod sink;

pub use pool::{PoolReport, WorkerDone, WorkerPool};
pub use sink::{ResultSink, SinkReport};

use std::fmt;
use std::io;
use std::net::IpAddr;
use std::num::NonZero;
use std::sync::Arc;

use log::debug;
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, Mutex};

use crate::error::{Result, ScanError};
use crate::keywords::Keywords;
use crate::resolver::PtrLookup;

/// Worker count used when none is configured.
pub const DEFAULT_WORKERS: usize = 100;

/// An address whose PTR name contained a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Match {
    pub address: IpAddr,
    pub hostname: String,
}

impl fmt::Display for Match {
    /// Address padded to 15 columns, never truncated, then ` => ` and the name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<15} => {}", self.address.to_string(), self.hostname)
    }
}

/// Stages of a scan, in the only order they can happen.
///
/// - `Feeding`: addresses go into the input queue.
/// - `Draining`: input is closed; waiting for one completion signal per worker.
/// - `Flushing`: output is closed; waiting for the sink to write what is left.
/// - `Finished`: every match is on the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Feeding,
    Draining,
    Flushing,
    Finished,
}

impl ScanPhase {
    /// The phase that follows, `None` after `Finished`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Feeding => Some(Self::Draining),
            Self::Draining => Some(Self::Flushing),
            Self::Flushing => Some(Self::Finished),
            Self::Finished => None,
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Feeding => "feeding",
            Self::Draining => "draining",
            Self::Flushing => "flushing",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed scan.
#[derive(Debug)]
pub struct ScanSummary<W> {
    /// Addresses put into the input queue.
    pub submitted: usize,
    pub pool: PoolReport,
    /// Lines the sink wrote.
    pub written: usize,
    pub destination: W,
}

/// The scan coordinator.
///
/// Owns the read-only pieces every worker shares; each call to [`Scanner::run`]
/// builds fresh queues, so a scanner can be reused for several runs.
#[derive(Debug)]
pub struct Scanner<R> {
    resolver: Arc<R>,
    keywords: Arc<Keywords>,
    workers: NonZero<usize>,
}

impl<R: PtrLookup> Scanner<R> {
    /// A worker count of zero is corrected to one.
    pub fn new(resolver: R, keywords: Keywords, workers: usize) -> Self {
        Self {
            resolver: Arc::new(resolver),
            keywords: Arc::new(keywords),
            workers: NonZero::new(workers).unwrap_or(NonZero::<usize>::MIN),
        }
    }

    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers.get()
    }

    /// Looks up every address and writes matching names to `destination`.
    ///
    /// Returns only after the last match has been written and flushed.
    pub async fn run<I, W>(&self, addresses: I, destination: W) -> Result<ScanSummary<W>>
    where
        I: IntoIterator<Item = IpAddr>,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let capacity = self.workers.get();
        let (input_tx, input_rx) = mpsc::channel(capacity);
        let (output_tx, output_rx) = mpsc::channel(capacity);

        let sink = tokio::spawn(ResultSink::new(destination).drain(output_rx));
        let pool = WorkerPool::spawn(
            self.workers,
            Arc::clone(&self.resolver),
            Arc::clone(&self.keywords),
            Arc::new(Mutex::new(input_rx)),
            &output_tx,
        );

        let mut phase = ScanPhase::Feeding;
        debug!("Scan {phase} with {} workers", pool.started());

        let mut submitted = 0;
        for address in addresses {
            // Only fails when every worker is gone; join reports that below.
            if input_tx.send(address).await.is_err() {
                break;
            }
            submitted += 1;
        }

        // Closing keeps whatever is still queued.
        drop(input_tx);
        phase = advance(phase);
        debug!("Scan {phase} after submitting {submitted} addresses");
        let joined = pool.join().await;

        // Last sender gone: the sink sees the end of the queue once it has drained it.
        drop(output_tx);
        phase = advance(phase);
        debug!("Scan {phase}");
        let flushed = sink.await;

        let pool = joined?;
        let sink = flushed
            .map_err(|e| ScanError::Sink(io::Error::other(e)))?
            .map_err(ScanError::Sink)?;

        phase = advance(phase);
        debug!(
            "Scan {phase}: {submitted} addresses, {} completions, {} lines",
            pool.completions, sink.lines
        );

        Ok(ScanSummary {
            submitted,
            pool,
            written: sink.lines,
            destination: sink.writer,
        })
    }
}

fn advance(phase: ScanPhase) -> ScanPhase {
    phase.next().unwrap_or(phase)
}

#[cfg(test)]
mod tests {
    use super::{Match, ScanPhase, Scanner};
    use crate::keywords::Keywords;
    use crate::resolver::PtrLookup;
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};

    struct Fixed(HashMap<IpAddr, Vec<String>>);

    impl PtrLookup for Fixed {
        async fn reverse_lookup(&self, addr: IpAddr) -> Vec<String> {
            self.0.get(&addr).cloned().unwrap_or_default()
        }
    }

    fn v4(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(198, 51, 100, last))
    }

    #[test]
    fn phases_advance_in_order() {
        let mut phase = ScanPhase::Feeding;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            seen.push(next);
            phase = next;
        }

        assert_eq!(
            seen,
            [
                ScanPhase::Feeding,
                ScanPhase::Draining,
                ScanPhase::Flushing,
                ScanPhase::Finished
            ]
        );
    }

    #[test]
    fn match_line_format() {
        let found = Match {
            address: v4(1),
            hostname: "host1.example.com.".to_owned(),
        };
        assert_eq!(found.to_string(), "198.51.100.1    => host1.example.com.");
    }

    #[test]
    fn zero_workers_becomes_one() {
        let scanner = Scanner::new(Fixed(HashMap::new()), Keywords::default(), 0);
        assert_eq!(scanner.workers(), 1);
    }

    #[tokio::test]
    async fn every_ptr_record_is_checked() {
        let names = HashMap::from([(
            v4(7),
            vec![
                "edge.example.net.".to_owned(),
                "mail.corp.example.".to_owned(),
                "vpn.corp.example.".to_owned(),
            ],
        )]);
        let scanner = Scanner::new(Fixed(names), "corp".parse().unwrap(), 4);

        let summary = scanner.run([v4(7), v4(8)], Vec::<u8>::new()).await.unwrap();
        let output = String::from_utf8(summary.destination).unwrap();

        assert_eq!(summary.submitted, 2);
        assert_eq!(summary.written, 2);
        assert!(output.contains("198.51.100.7    => mail.corp.example.\n"));
        assert!(output.contains("198.51.100.7    => vpn.corp.example.\n"));
        assert!(!output.contains("edge"));
    }

    #[tokio::test]
    async fn empty_address_list_still_shuts_down() {
        let scanner = Scanner::new(Fixed(HashMap::new()), "x".parse().unwrap(), 16);

        let summary = scanner.run(Vec::<IpAddr>::new(), Vec::<u8>::new()).await.unwrap();

        assert_eq!(summary.submitted, 0);
        assert_eq!(summary.pool.completions, 16);
        assert_eq!(summary.written, 0);
        assert!(summary.destination.is_empty());
    }
}
