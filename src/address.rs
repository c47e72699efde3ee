//! Provides functions to parse network blocks and walk every address inside them.
//!
//! Enumeration is inclusive: the network and broadcast addresses of a block are
//! produced as well. Nothing here caps the size of a block, so sweeping a large
//! IPv6 prefix will run forever in practice. Callers bound the size up front with
//! [`NetworkBlock::ensure_at_most`].
//!
//! That bound is per block, not per sweep: many blocks that each pass it are all
//! collected by [`unique_addresses`], whose dedup set grows with the total.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use cidr_utils::cidr::{IpCidr, IpInet};
use itertools::Itertools;
use log::debug;

use crate::error::{Result, ScanError};

/// A validated CIDR block, masked to its network boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkBlock {
    cidr: IpCidr,
}

impl NetworkBlock {
    /// Parses `base/prefix` notation.
    ///
    /// Host bits set in the base are masked off, so `192.168.1.77/24` is the
    /// same block as `192.168.1.0/24`. A bare address without a prefix is
    /// rejected.
    ///
    /// ```rust
    /// # use sand_devil::address::NetworkBlock;
    /// let block = NetworkBlock::parse("192.168.1.77/30").unwrap();
    /// assert_eq!(block.to_string(), "192.168.1.76/30");
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let invalid = |reason: String| ScanError::InvalidBlock {
            block: input.to_owned(),
            reason,
        };

        if !input.contains('/') {
            return Err(invalid("missing prefix length".to_owned()));
        }

        let inet = IpInet::from_str(input).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            cidr: inet.network(),
        })
    }

    /// First address of the block (the network address).
    #[must_use]
    pub fn first(&self) -> IpAddr {
        self.cidr.first_address()
    }

    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.cidr.network_length()
    }

    /// Width of the address family in bits.
    #[must_use]
    pub fn address_bits(&self) -> u8 {
        if self.cidr.is_ipv4() {
            32
        } else {
            128
        }
    }

    /// Number of addresses in the block, saturating at `u128::MAX` for `::/0`.
    #[must_use]
    pub fn size(&self) -> u128 {
        let host_bits = u32::from(self.address_bits() - self.prefix_len());
        1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
    }

    #[must_use]
    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.cidr.contains(addr)
    }

    /// Rejects the block when it holds more than `limit` addresses.
    pub fn ensure_at_most(&self, limit: u128) -> Result<()> {
        let size = self.size();
        if size > limit {
            return Err(ScanError::BlockTooLarge {
                block: self.to_string(),
                size,
                limit,
            });
        }
        Ok(())
    }

    /// Every address of the block in ascending order.
    #[must_use]
    pub fn addresses(&self) -> BlockIter {
        enumerate(self)
    }
}

impl fmt::Display for NetworkBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cidr)
    }
}

impl FromStr for NetworkBlock {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Lazily walks a block from its first to its last address.
#[derive(Debug, Clone)]
pub struct BlockIter {
    block: NetworkBlock,
    next: Option<IpAddr>,
}

impl Iterator for BlockIter {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        let current = self.next?;
        self.next = step(current).filter(|addr| self.block.contains(addr));
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let Some(current) = self.next else {
            return (0, Some(0));
        };
        let last = self.block.cidr.last_address();
        let remaining = (as_u128(last) - as_u128(current))
            .checked_add(1)
            .and_then(|n| usize::try_from(n).ok());
        match remaining {
            Some(n) => (n, Some(n)),
            None => (usize::MAX, None),
        }
    }
}

/// Produces every address of `block`, network and broadcast included.
///
/// ```rust
/// # use sand_devil::address::{enumerate, NetworkBlock};
/// let block = NetworkBlock::parse("192.168.1.0/30").unwrap();
/// let ips: Vec<String> = enumerate(&block).map(|ip| ip.to_string()).collect();
/// assert_eq!(ips, ["192.168.1.0", "192.168.1.1", "192.168.1.2", "192.168.1.3"]);
/// ```
#[must_use]
pub fn enumerate(block: &NetworkBlock) -> BlockIter {
    BlockIter {
        block: *block,
        next: Some(block.first()),
    }
}

/// Adds one to a big-endian unsigned integer in place, carrying from the last byte.
///
/// Returns `false` when the value wrapped around to all zeroes.
pub fn increment(bytes: &mut [u8]) -> bool {
    for byte in bytes.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            return true;
        }
    }
    false
}

fn step(addr: IpAddr) -> Option<IpAddr> {
    match addr {
        IpAddr::V4(v4) => {
            let mut octets = v4.octets();
            increment(&mut octets).then(|| IpAddr::from(octets))
        }
        IpAddr::V6(v6) => {
            let mut octets = v6.octets();
            increment(&mut octets).then(|| IpAddr::from(octets))
        }
    }
}

fn as_u128(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

/// Parses every block string, dropping repeats and rejecting any block above `limit`.
///
/// One bad block aborts the whole list: a sweep never starts on a partial set.
pub fn parse_blocks<S: AsRef<str>>(raw: &[S], limit: u128) -> Result<Vec<NetworkBlock>> {
    raw.iter()
        .map(|block| -> Result<NetworkBlock> {
            let block = NetworkBlock::parse(block.as_ref())?;
            block.ensure_at_most(limit)?;
            Ok(block)
        })
        .process_results(|blocks| blocks.unique().collect())
}

/// Concatenates the addresses of all blocks, dropping repeats.
///
/// The first occurrence of an address keeps its position.
#[must_use]
pub fn unique_addresses(blocks: &[NetworkBlock]) -> Vec<IpAddr> {
    let addrs: Vec<IpAddr> = blocks.iter().flat_map(enumerate).unique().collect();
    debug!("{} unique addresses across {} blocks", addrs.len(), blocks.len());
    addrs
}

/// Turns a scan target into literal addresses.
///
/// A literal IP is returned as is; anything else is looked up through the
/// operating system, the same way the target would be reached by hand.
pub async fn resolve_target(target: &str) -> Result<Vec<IpAddr>> {
    if let Ok(ip) = IpAddr::from_str(target) {
        return Ok(vec![ip]);
    }

    let ips = match tokio::net::lookup_host((target, 80)).await {
        Ok(addrs) => addrs.map(|sock| sock.ip()).unique().collect_vec(),
        Err(e) => {
            debug!("Lookup of {target} failed: {e}");
            Vec::new()
        }
    };

    if ips.is_empty() {
        return Err(ScanError::UnresolvedTarget(target.to_owned()));
    }
    Ok(ips)
}
