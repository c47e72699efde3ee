//! Finds the network blocks a target address belongs to by asking whois.
//!
//! Registries answer in free text. Blocks are pulled from `route:`/`route6:`
//! lines (RIPE style) and `CIDR:` lines (ARIN style); other formats simply
//! yield nothing.
use std::net::IpAddr;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use itertools::Itertools;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;

use crate::error::{Result, ScanError};

/// Root server that refers on to the responsible registry.
pub const DEFAULT_WHOIS_SERVER: &str = "whois.iana.org";
pub const WHOIS_PORT: u16 = 43;
/// Budget for one question to one server, connect to last byte.
pub const DEFAULT_WHOIS_TIMEOUT: Duration = Duration::from_secs(30);

// Line prefixes carrying CIDR lists.
const BLOCK_PREFIXES: [&str; 2] = ["route", "CIDR"];

static ASN: Lazy<Regex> = Lazy::new(|| Regex::new(r"AS\d+").unwrap());

/// Blocks and AS numbers found in one whois answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhoisRecord {
    pub blocks: Vec<String>,
    pub asns: Vec<String>,
}

impl WhoisRecord {
    /// Parses the raw answer of a registry.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self {
            blocks: extract_blocks(text),
            asns: extract_asns(text),
        }
    }
}

/// Pulls every CIDR string out of `route*` and `CIDR` lines, first occurrence kept.
///
/// ```rust
/// # use sand_devil::whois::extract_blocks;
/// let text = "NetRange: 20.33.0.0 - 20.128.255.255\nCIDR:           20.33.0.0/16, 20.34.0.0/15\n";
/// assert_eq!(extract_blocks(text), ["20.33.0.0/16", "20.34.0.0/15"]);
/// ```
#[must_use]
pub fn extract_blocks(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| BLOCK_PREFIXES.iter().any(|prefix| line.starts_with(prefix)))
        .filter_map(|line| line.find(':').map(|at| &line[at..]))
        .flat_map(|list| list.split(", "))
        .map(|block| block.trim_matches(|c| c == ':' || c == '\t' || c == ' '))
        .filter(|block| !block.is_empty())
        .unique()
        .map(str::to_owned)
        .collect()
}

#[must_use]
pub fn extract_asns(text: &str) -> Vec<String> {
    ASN.find_iter(text)
        .map(|m| m.as_str())
        .unique()
        .map(str::to_owned)
        .collect()
}

/// The registry IANA points at, from a `refer:` or `whois:` line.
#[must_use]
pub fn referral(text: &str) -> Option<&str> {
    text.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        let value = value.trim();
        (matches!(key.trim(), "refer" | "whois") && !value.is_empty()).then_some(value)
    })
}

/// Plain-text whois over TCP.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    server: String,
    port: u16,
    timeout: Duration,
}

impl WhoisClient {
    pub fn new(server: impl Into<String>, timeout: Duration) -> Self {
        Self {
            server: server.into(),
            port: WHOIS_PORT,
            timeout,
        }
    }

    /// Talks to a non-standard port, referrals included.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Queries the root server and follows at most one referral.
    pub async fn lookup(&self, ip: IpAddr) -> Result<String> {
        let query = ip.to_string();
        let answer = self.query(&self.server, &query).await?;

        match referral(&answer) {
            Some(next) if next != self.server => {
                debug!("{} refers {query} to {next}", self.server);
                self.query(next, &query).await
            }
            _ => Ok(answer),
        }
    }

    /// Looks `ip` up and parses the answer, failing when it names no block.
    pub async fn blocks_for(&self, ip: IpAddr) -> Result<WhoisRecord> {
        let record = WhoisRecord::parse(&self.lookup(ip).await?);
        info!("Whois for {ip}: CIDRs: {:?}, ASNs: {:?}", record.blocks, record.asns);

        if record.blocks.is_empty() {
            return Err(ScanError::NoBlocksFound(ip.to_string()));
        }
        Ok(record)
    }

    async fn query(&self, server: &str, query: &str) -> Result<String> {
        let whois_err = |source: std::io::Error| ScanError::Whois {
            server: server.to_owned(),
            source,
        };

        let exchange = async {
            let mut stream = TcpStream::connect((server, self.port)).await?;
            stream.write_all(format!("{query}\r\n").as_bytes()).await?;

            let mut raw = Vec::new();
            stream.read_to_end(&mut raw).await?;
            Ok::<_, std::io::Error>(String::from_utf8_lossy(&raw).into_owned())
        };

        time::timeout(self.timeout, exchange)
            .await
            .map_err(|elapsed| whois_err(elapsed.into()))?
            .map_err(whois_err)
    }
}

/// Asks whois about every target address and merges the blocks found, first occurrence kept.
///
/// A failed lookup for one address is only a warning; the result is an error
/// when no address produced a block at all.
pub async fn discover_blocks(client: &WhoisClient, ips: &[IpAddr]) -> Result<Vec<String>> {
    let records: Vec<(IpAddr, Result<WhoisRecord>)> = stream::iter(ips.iter().copied())
        .map(|ip| async move { (ip, client.blocks_for(ip).await) })
        .buffered(4)
        .collect()
        .await;

    let mut blocks = Vec::new();
    let mut asns = Vec::new();
    for (ip, record) in records {
        match record {
            Ok(record) => {
                blocks.extend(record.blocks);
                asns.extend(record.asns);
            }
            Err(e) => warn!("Whois failed for {ip}: {e}"),
        }
    }

    let blocks = blocks.into_iter().unique().collect_vec();
    let asns = asns.into_iter().unique().collect_vec();
    info!("All Route CIDRs found:       {blocks:?}");
    info!("All AS numbers found:        {asns:?}");

    if blocks.is_empty() {
        return Err(ScanError::NoBlocksFound(ips.iter().join(", ")));
    }
    Ok(blocks)
}
