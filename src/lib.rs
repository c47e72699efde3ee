//! This crate exposes the internal functionality of the Sand Devil
//! reverse-DNS sweeper.
//!
//! Starting from one known address, Sand Devil asks whois which network blocks
//! that address belongs to, reverse-resolves every address in those blocks
//! against a resolver of your choosing, and reports the hostnames that contain
//! any of your keywords. It is a quick way to map the footprint an
//! organisation leaves in shared address space.
//!
//! ## Architecture Overview
//!
//! The sweep itself is run by [`Scanner`](crate::scanner::Scanner), which in
//! turn needs a [`PtrLookup`](crate::resolver::PtrLookup) implementation and a
//! [`Keywords`](crate::keywords::Keywords) set:
//!
//! 1. **Block discovery**: [`whois`] turns a target address into CIDR strings
//! 2. **Enumeration**: [`address`] parses the blocks and walks every address
//! 3. **Lookup**: a fixed pool of workers resolves PTR names concurrently
//! 4. **Matching**: names containing a keyword become [`Match`](crate::scanner::Match)es
//! 5. **Output**: a single sink writes `address => hostname` lines
//!
//! ## Basic Usage Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use sand_devil::address::{parse_blocks, unique_addresses};
//! use sand_devil::resolver::{DnsClient, LookupConfig};
//! use sand_devil::scanner::Scanner;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let blocks = parse_blocks(&["198.51.100.0/24"], 1 << 24)?;
//! let addrs = unique_addresses(&blocks);
//!
//! let config = LookupConfig::new("1.1.1.1".parse()?, Duration::from_secs(10));
//! let scanner = Scanner::new(DnsClient::new(&config), "mail,vpn".parse()?, 100);
//!
//! let summary = scanner.run(addrs, tokio::io::stdout()).await?;
//! eprintln!("{} matches", summary.written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Known limitations
//!
//! Enumeration steps linearly through a block, so large IPv6 prefixes are out
//! of reach; the command line refuses blocks above `--max-addresses`.
#![doc(html_root_url = "https://docs.rs/sand-devil/0.2.0")]

pub mod tui;

pub mod error;

pub mod input;

pub mod address;

pub mod keywords;

pub mod resolver;

pub mod scanner;

pub mod whois;

pub mod scrape;
