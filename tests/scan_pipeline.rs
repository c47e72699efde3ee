//! End-to-end sweeps against a deterministic resolver.
use std::collections::{BTreeSet, HashMap};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use sand_devil::address::{parse_blocks, unique_addresses};
use sand_devil::keywords::Keywords;
use sand_devil::resolver::PtrLookup;
use sand_devil::scanner::Scanner;

/// Answers from a fixed table; unknown addresses stall, then come back empty
/// the way a timed-out query does.
struct StubResolver {
    names: HashMap<IpAddr, Vec<String>>,
    stall: Duration,
}

impl StubResolver {
    fn new<const N: usize>(entries: [(IpAddr, &str); N]) -> Self {
        let mut names: HashMap<IpAddr, Vec<String>> = HashMap::new();
        for (addr, name) in entries {
            names.entry(addr).or_default().push(name.to_owned());
        }
        Self {
            names,
            stall: Duration::from_millis(20),
        }
    }
}

impl PtrLookup for StubResolver {
    async fn reverse_lookup(&self, addr: IpAddr) -> Vec<String> {
        match self.names.get(&addr) {
            Some(names) => names.clone(),
            None => {
                tokio::time::sleep(self.stall).await;
                Vec::new()
            }
        }
    }
}

fn ip(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(a, b, c, d))
}

fn lines(output: Vec<u8>) -> BTreeSet<String> {
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

#[tokio::test]
async fn timed_out_address_produces_no_match() {
    let resolver = StubResolver::new([(ip(198, 51, 100, 1), "host1.example.com.")]);
    let keywords: Keywords = "host1".parse().unwrap();
    let scanner = Scanner::new(resolver, keywords, 2);

    let summary = scanner
        .run([ip(198, 51, 100, 1), ip(198, 51, 100, 2)], Vec::<u8>::new())
        .await
        .unwrap();

    assert_eq!(summary.submitted, 2);
    assert_eq!(summary.pool.processed, 2);
    assert_eq!(summary.written, 1);
    assert_eq!(
        String::from_utf8(summary.destination).unwrap(),
        "198.51.100.1    => host1.example.com.\n"
    );
}

#[tokio::test]
async fn sweep_of_enumerated_blocks() {
    let resolver = StubResolver::new([
        (ip(20, 192, 2, 0), "mailforcepoint1new.centralindia.cloudapp.azure.com."),
        (ip(20, 192, 2, 5), "imap.centralindia.cloudapp.azure.com."),
        (ip(20, 192, 2, 6), "example.com."),
        (ip(20, 192, 2, 7), "smtp.hourlyrooms.co.in."),
        (ip(20, 194, 27, 43), "mscreen.cariflex.com."),
    ]);
    let keywords: Keywords = "microsoft,ms,office,azure".parse().unwrap();
    let scanner = Scanner::new(resolver, keywords, 16);

    // The /30 overlaps the /29, so its addresses must only be looked up once.
    let blocks = parse_blocks(&["20.192.2.0/29", "20.192.2.4/30", "20.194.27.40/30"], 256).unwrap();
    let addresses = unique_addresses(&blocks);
    assert_eq!(addresses.len(), 12);

    let summary = scanner.run(addresses, Vec::<u8>::new()).await.unwrap();

    assert_eq!(summary.submitted, 12);
    assert_eq!(summary.pool.completions, 16);
    assert_eq!(summary.pool.processed, 12);
    assert_eq!(
        lines(summary.destination),
        BTreeSet::from([
            "20.192.2.0      => mailforcepoint1new.centralindia.cloudapp.azure.com.".to_owned(),
            "20.192.2.5      => imap.centralindia.cloudapp.azure.com.".to_owned(),
            "20.192.2.7      => smtp.hourlyrooms.co.in.".to_owned(),
            "20.194.27.43    => mscreen.cariflex.com.".to_owned(),
        ])
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_sweeps_find_the_same_matches() {
    let resolver = StubResolver::new([
        (ip(192, 0, 2, 10), "vpn.corp.example."),
        (ip(192, 0, 2, 11), "www.example.net."),
        (ip(192, 0, 2, 77), "mail.corp.example."),
        (ip(192, 0, 2, 77), "mx1.corp.example."),
        (ip(192, 0, 2, 200), "corp-backup.example.org."),
    ]);
    let scanner = Scanner::new(resolver, "corp".parse().unwrap(), 32);
    let blocks = parse_blocks(&["192.0.2.0/24"], 256).unwrap();

    let mut runs = Vec::new();
    for _ in 0..3 {
        let summary = scanner
            .run(unique_addresses(&blocks), Vec::<u8>::new())
            .await
            .unwrap();
        assert_eq!(summary.pool.completions, 32);
        runs.push(lines(summary.destination));
    }

    assert_eq!(runs[0].len(), 4);
    assert!(runs.iter().all(|run| *run == runs[0]));
}

#[tokio::test]
async fn results_land_in_output_file() {
    let path = std::env::temp_dir().join(format!("sand-devil-{}-results.txt", std::process::id()));
    let file = tokio::fs::File::create(&path).await.unwrap();

    let resolver = StubResolver::new([(ip(203, 0, 113, 9), "edge.corp.example.")]);
    let scanner = Scanner::new(resolver, "corp".parse().unwrap(), 4);
    let summary = scanner
        .run(unique_addresses(&parse_blocks(&["203.0.113.8/30"], 4).unwrap()), file)
        .await
        .unwrap();
    drop(summary.destination);

    let written = tokio::fs::read_to_string(&path).await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();

    assert_eq!(written, "203.0.113.9     => edge.corp.example.\n");
}
