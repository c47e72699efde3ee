//! Reverse-DNS lookups against one explicitly configured nameserver.
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use log::debug;
use tokio::time;

/// Standard DNS port.
pub const DNS_PORT: u16 = 53;

/// Per-lookup timeout unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how long to ask. Built once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupConfig {
    pub nameserver: SocketAddr,
    pub timeout: Duration,
}

impl LookupConfig {
    #[must_use]
    pub const fn new(nameserver: IpAddr, timeout: Duration) -> Self {
        Self {
            nameserver: SocketAddr::new(nameserver, DNS_PORT),
            timeout,
        }
    }
}

impl Default for LookupConfig {
    /// Cloudflare on port 53 with a ten second timeout.
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), DEFAULT_TIMEOUT)
    }
}

/// Anything able to map an address to its PTR names.
///
/// Implementations never fail: timeouts, refusals, NXDOMAIN and transport
/// errors all come back as an empty list.
pub trait PtrLookup: Send + Sync + 'static {
    fn reverse_lookup(&self, addr: IpAddr) -> impl Future<Output = Vec<String>> + Send;
}

/// PTR lookups over UDP, falling back to TCP on truncation, against a single server.
#[derive(Clone)]
pub struct DnsClient {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsClient {
    /// Builds a resolver that only ever talks to `config.nameserver`.
    ///
    /// The system configuration and the hosts file are ignored, and a query
    /// is attempted exactly once.
    #[must_use]
    pub fn new(config: &LookupConfig) -> Self {
        let servers = NameServerConfigGroup::from_ips_clear(
            &[config.nameserver.ip()],
            config.nameserver.port(),
            true,
        );
        let resolver_config = ResolverConfig::from_parts(None, vec![], servers);

        let mut opts = ResolverOpts::default();
        opts.timeout = config.timeout;
        opts.attempts = 1;
        opts.use_hosts_file = false;

        Self {
            resolver: TokioAsyncResolver::tokio(resolver_config, opts),
            timeout: config.timeout,
        }
    }
}

impl PtrLookup for DnsClient {
    async fn reverse_lookup(&self, addr: IpAddr) -> Vec<String> {
        match time::timeout(self.timeout, self.resolver.reverse_lookup(addr)).await {
            Ok(Ok(names)) => names.iter().map(ToString::to_string).collect(),
            Ok(Err(e)) => {
                debug!("Reverse lookup of {addr} failed: {e}");
                Vec::new()
            }
            Err(_) => {
                debug!("Reverse lookup of {addr} timed out");
                Vec::new()
            }
        }
    }
}
