//! Error type shared by the scan engine and its input collaborators.
use std::io;

use thiserror::Error;

/// Everything that can abort a scan.
///
/// Per-address lookup failures never show up here: a failed lookup just
/// produces no hostnames.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The string handed to [`NetworkBlock::parse`](crate::address::NetworkBlock::parse)
    /// is not CIDR notation.
    #[error("invalid CIDR block {block:?}: {reason}")]
    InvalidBlock { block: String, reason: String },

    /// The block holds more addresses than the caller is willing to sweep.
    #[error("block {block} holds {size} addresses, above the limit of {limit}")]
    BlockTooLarge { block: String, size: u128, limit: u128 },

    /// The scan target is neither a literal address nor a resolvable host.
    #[error("could not resolve target {0:?}")]
    UnresolvedTarget(String),

    /// No route/CIDR line could be found in any whois answer.
    #[error("no CIDR notation subnets found for {0}; sanity check the raw whois output")]
    NoBlocksFound(String),

    #[error("whois query to {server} failed: {source}")]
    Whois {
        server: String,
        #[source]
        source: io::Error,
    },

    #[error("could not fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A worker task ended without emitting its completion signal.
    #[error("{lost} of {started} workers exited without signalling completion")]
    WorkerLost { started: usize, lost: usize },

    #[error("invalid configuration file {0}")]
    Config(String),

    #[error("result sink failed: {0}")]
    Sink(#[source] io::Error),
}

/// Convenience alias used across the crate.
pub type Result<T, E = ScanError> = std::result::Result<T, E>;
