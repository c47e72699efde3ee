#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::doc_markdown)]

use sand_devil::address::{parse_blocks, resolve_target, unique_addresses};
use sand_devil::input::{Config, Opts};
use sand_devil::keywords::Keywords;
use sand_devil::resolver::DnsClient;
use sand_devil::scanner::Scanner;
use sand_devil::scrape::{fetch_document, keywords_in, report};
use sand_devil::whois::{discover_blocks, WhoisClient, DEFAULT_WHOIS_TIMEOUT};
use sand_devil::{detail, tui, warning};

use anyhow::{Context, Result};
use clap::CommandFactory;
use itertools::Itertools;
use log::{debug, info};
use tokio::fs::File;
use tokio::io::AsyncWrite;

/// Faster than a whois, a dig and a for loop.
#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut opts: Opts = Opts::read();
    let config = Config::read(opts.config_path.clone())?;
    opts.merge(&config);

    debug!("Main() `opts` arguments are {opts:?}");

    if !opts.no_banner {
        eprint!("{}", tui::banner(opts.accessible));
    }

    let keywords = opts.keyword_set();

    if let Some(url) = opts.url.as_deref().filter(|_| !keywords.is_empty()) {
        return scan_document(url, &keywords).await;
    }

    let raw_blocks = match (&opts.blocks, &opts.target) {
        _ if keywords.is_empty() => return usage(),
        (Some(blocks), _) => blocks.clone(),
        (None, Some(target)) => whois_blocks(target, &opts).await?,
        (None, None) => return usage(),
    };

    let blocks = parse_blocks(&raw_blocks, u128::from(opts.max_addresses))?;
    info!("Route CIDRs to sweep:        {}", blocks.iter().join(", "));

    let addresses = unique_addresses(&blocks);
    info!("Number of IPs to scan:       {}", addresses.len());

    let ulimit = adjust_ulimit_size(&opts);
    let workers = infer_worker_count(&opts, ulimit);

    // Opened before any worker starts so a bad path aborts cleanly.
    let destination: Box<dyn AsyncWrite + Unpin + Send> = match &opts.output {
        Some(path) => Box::new(
            File::create(path)
                .await
                .with_context(|| format!("Failed to open output file {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    detail!(
        format!(
            "Sweeping {} addresses with {workers} workers against {}",
            addresses.len(),
            opts.resolver
        ),
        opts.accessible
    );

    let scanner = Scanner::new(DnsClient::new(&opts.lookup_config()), keywords, workers);
    let summary = scanner.run(addresses, destination).await?;

    detail!(
        format!(
            "Done: {} addresses looked up, {} matches",
            summary.pool.processed, summary.written
        ),
        opts.accessible
    );

    Ok(())
}

fn usage() -> Result<()> {
    Opts::command().print_help()?;
    std::process::exit(1);
}

/// Resolves the target and collects the blocks whois reports for it.
async fn whois_blocks(target: &str, opts: &Opts) -> Result<Vec<String>> {
    let ips = resolve_target(target).await?;
    if ips.iter().any(|ip| ip.to_string() != target) {
        info!("Resolved {target} to: {}", ips.iter().join(", "));
    }

    let client = WhoisClient::new(opts.whois_server.clone(), DEFAULT_WHOIS_TIMEOUT);
    Ok(discover_blocks(&client, &ips).await?)
}

async fn scan_document(url: &str, keywords: &Keywords) -> Result<()> {
    let body = fetch_document(url).await?;
    for line in report(url, &keywords_in(&body, keywords)) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(unix)]
fn adjust_ulimit_size(opts: &Opts) -> u64 {
    use rlimit::Resource;

    if let Some(limit) = opts.ulimit {
        if Resource::NOFILE.set(limit, limit).is_ok() {
            detail!(
                format!("Automatically increasing ulimit value to {limit}."),
                opts.accessible
            );
        } else {
            warning!("ERROR. Failed to set ulimit value.", opts.accessible);
        }
    }

    match Resource::NOFILE.get() {
        Ok((soft, _)) => soft,
        Err(e) => {
            debug!("Could not read the open file limit: {e}");
            u64::MAX
        }
    }
}

#[cfg(not(unix))]
fn adjust_ulimit_size(_opts: &Opts) -> u64 {
    u64::MAX
}

/// Caps the worker count so in-flight lookups stay within the open file limit.
///
/// Each lookup may hold a UDP and a TCP socket, so at most half the limit is used.
fn infer_worker_count(opts: &Opts, ulimit: u64) -> usize {
    let ceiling = usize::try_from(ulimit / 2).unwrap_or(usize::MAX).max(1);

    if opts.threads > ceiling {
        warning!(
            format!(
                "File limit is {ulimit}, lowering workers from {} to {ceiling}.",
                opts.threads
            ),
            opts.accessible
        );
        if opts.ulimit.is_none() {
            detail!("Use --ulimit to raise the limit instead.", opts.accessible);
        }
        return ceiling;
    }

    opts.threads
}
