//! Provides a means to read, parse and hold configuration options for sweeps.
use clap::Parser;
use serde_derive::Deserialize;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, ScanError};
use crate::keywords::Keywords;
use crate::resolver::LookupConfig;
use crate::scanner::DEFAULT_WORKERS;
use crate::whois::DEFAULT_WHOIS_SERVER;

/// Largest block swept unless configured otherwise: a /8.
pub const DEFAULT_MAX_ADDRESSES: u64 = 1 << 24;

const CONFIG_FILE_NAME: &str = ".sand-devil.toml";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sand-devil",
    version = env!("CARGO_PKG_VERSION"),
    max_term_width = 120,
    help_template = "{bin} {version}\n{about}\n\nUSAGE:\n    {usage}\n\nOPTIONS:\n{options}",
)]
#[allow(clippy::struct_excessive_bools)]
/// Whois a known address, then reverse-resolve every address of its network
/// blocks and print the hostnames containing any keyword.
/// WARNING a sweep sends one PTR query per address to the chosen resolver.
pub struct Opts {
    /// Target IP address or domain to query for whois information.
    #[arg(short, long)]
    pub target: Option<String>,

    /// Comma-separated list of keywords to search for. Matching is case-sensitive.
    #[arg(short, long)]
    pub keywords: Option<String>,

    /// DNS server to use for reverse lookups, always queried on port 53.
    #[arg(short, long, default_value = "1.1.1.1")]
    pub resolver: IpAddr,

    /// Number of concurrent lookup workers.
    #[arg(long, default_value = "100")]
    pub threads: usize,

    /// The timeout in milliseconds for a single reverse lookup.
    #[arg(long, default_value = "10000")]
    pub timeout: u64,

    /// Output file to write results to instead of stdout.
    #[arg(short, long, value_parser)]
    pub output: Option<PathBuf>,

    /// URL to scrape for the keywords instead of sweeping.
    #[arg(short, long)]
    pub url: Option<String>,

    /// A comma-delimited list of CIDR blocks to sweep. Skips the whois lookup.
    #[arg(short, long, value_delimiter = ',')]
    pub blocks: Option<Vec<String>>,

    /// Whois server asked first; referrals are followed once.
    #[arg(long, default_value = DEFAULT_WHOIS_SERVER)]
    pub whois_server: String,

    /// Refuse to sweep blocks holding more addresses than this.
    /// Applies to each block on its own, not to the sum of all blocks.
    #[arg(long, default_value = "16777216")]
    pub max_addresses: u64,

    /// Automatically ups the ULIMIT with the value you provided.
    #[arg(long)]
    pub ulimit: Option<u64>,

    /// Whether to ignore the configuration file or not.
    #[arg(short, long)]
    pub no_config: bool,

    /// Custom path to config file
    #[arg(short, long, value_parser)]
    pub config_path: Option<PathBuf>,

    /// Hide the banner
    #[arg(long)]
    pub no_banner: bool,

    /// Accessible mode. Turns off features which negatively affect screen readers.
    #[arg(long)]
    pub accessible: bool,
}

#[cfg(not(tarpaulin_include))]
impl Opts {
    pub fn read() -> Self {
        Self::parse()
    }

    /// Merges values found within the user configuration file.
    pub fn merge(&mut self, config: &Config) {
        if !self.no_config {
            self.merge_required(config);
            self.merge_optional(config);
        }
    }

    fn merge_required(&mut self, config: &Config) {
        macro_rules! merge_required {
            ($($field: ident),+) => {
                $(
                    if let Some(e) = &config.$field {
                        self.$field = e.clone();
                    }
                )+
            }
        }

        merge_required!(resolver, threads, timeout, whois_server, max_addresses, accessible);
    }

    fn merge_optional(&mut self, config: &Config) {
        macro_rules! merge_optional {
            ($($field: ident),+) => {
                $(
                    if config.$field.is_some() {
                        self.$field = config.$field.clone();
                    }
                )+
            }
        }

        merge_optional!(target, keywords, output, blocks, ulimit);
    }

    /// The keyword set, empty when none were given.
    #[must_use]
    pub fn keyword_set(&self) -> Keywords {
        self.keywords
            .as_deref()
            .map(|list| Keywords::new(list.split(',')))
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    #[must_use]
    pub const fn lookup_config(&self) -> LookupConfig {
        LookupConfig::new(self.resolver, self.lookup_timeout())
    }
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            target: None,
            keywords: None,
            resolver: IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
            threads: DEFAULT_WORKERS,
            timeout: 10_000,
            output: None,
            url: None,
            blocks: None,
            whois_server: DEFAULT_WHOIS_SERVER.to_owned(),
            max_addresses: DEFAULT_MAX_ADDRESSES,
            ulimit: None,
            no_config: true,
            config_path: None,
            no_banner: false,
            accessible: false,
        }
    }
}

/// Struct used to deserialize the options specified within our config file.
/// These will be further merged with our command line arguments in order to
/// generate the final Opts struct.
#[cfg(not(tarpaulin_include))]
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    target: Option<String>,
    keywords: Option<String>,
    resolver: Option<IpAddr>,
    threads: Option<usize>,
    timeout: Option<u64>,
    output: Option<PathBuf>,
    blocks: Option<Vec<String>>,
    whois_server: Option<String>,
    max_addresses: Option<u64>,
    ulimit: Option<u64>,
    accessible: Option<bool>,
}

#[cfg(not(tarpaulin_include))]
impl Config {
    /// Reads the configuration file with TOML format and parses it into a
    /// Config struct. A missing or unreadable file is an empty config.
    ///
    /// # Format
    ///
    /// keywords = "microsoft,ms,office,azure"
    /// resolver = "8.8.8.8"
    /// threads = 200
    /// timeout = 5000
    ///
    pub fn read(custom_config_path: Option<PathBuf>) -> Result<Self> {
        let Some(config_path) = custom_config_path.or_else(default_config_path) else {
            return Ok(Self::default());
        };

        let content = if config_path.exists() {
            fs::read_to_string(&config_path).unwrap_or_default()
        } else {
            String::new()
        };

        toml::from_str(&content).map_err(|e| {
            ScanError::Config(format!("{}: {e}", config_path.display()))
        })
    }
}

/// Constructs default path to config toml, `None` without a home directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    let mut config_path = dirs::home_dir()?;
    config_path.push(CONFIG_FILE_NAME);
    Some(config_path)
}
