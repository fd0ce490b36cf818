use std::future::Future;
use std::time::Duration;

use futures::{StreamExt, stream};
use log::{debug, warn};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::blockchain::{Block, check_chain};
use crate::error::{LedgerError, PeerError};

/// Path every node serves its chain report on.
pub const CHAIN_PATH: &str = "/api/v1/chain/";

/// Body of a chain report, served locally and read from peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainReport {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainReport {
    pub fn new(chain: Vec<Block>) -> Self {
        Self {
            length: chain.len(),
            chain,
        }
    }
}

/// Source of peer chains. The HTTP implementation is `HttpChainFetcher`.
pub trait ChainFetcher {
    fn fetch_chain(&self, node: &str) -> impl Future<Output = Result<ChainReport, PeerError>>;
}

/// Fetches `http://{node}/api/v1/chain/` with reqwest.
#[derive(Debug, Clone)]
pub struct HttpChainFetcher {
    client: reqwest::Client,
}

impl HttpChainFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, node: &str) -> Result<ChainReport, PeerError> {
        let url = format!("http://{node}{CHAIN_PATH}");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PeerError::Status(status.as_u16()));
        }
        resp.json::<ChainReport>()
            .await
            .map_err(|e| PeerError::Malformed(e.to_string()))
    }
}

/// Limits applied to one consensus round.
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub fanout: usize,
}

/// Registered peers in registration order, without duplicates.
#[derive(Debug, Default, Clone)]
pub struct NodeSet {
    nodes: Vec<String>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and store a peer location. Returns the stored form.
    pub fn register(&mut self, address: &str) -> Result<String, LedgerError> {
        let node = parse_node_address(address)?;
        if !self.nodes.contains(&node) {
            self.nodes.push(node.clone());
        }
        Ok(node)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.nodes.clone()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Extract `host[:port]` from a URL (`http://10.0.0.5:5000/x`) or a bare
/// location (`10.0.0.5:5000`). A port is kept exactly as written, even when
/// it is the scheme's default.
pub fn parse_node_address(address: &str) -> Result<String, LedgerError> {
    let invalid = || LedgerError::InvalidNodeAddress(address.to_string());
    let trimmed = address.trim();

    if trimmed.contains("://") {
        let url = Url::parse(trimmed).map_err(|_| invalid())?;
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid());
        }
        // `Url` drops default ports, so the location comes from the input
        let (_, rest) = trimmed.split_once("://").ok_or_else(invalid)?;
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let location = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
        return Ok(location.to_string());
    }

    let location = trimmed.split('/').next().unwrap_or_default();
    if location.is_empty() || location.contains(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(location.to_string())
}

/// Query every peer (at most `policy.fanout` at once) and pick the longest
/// chain that is strictly longer than `local_len` and passes validation.
/// Equal lengths keep the earlier peer. Failing peers are skipped.
pub async fn longest_valid_chain<F: ChainFetcher>(
    fetcher: &F,
    peers: &[String],
    local_len: usize,
    difficulty: u32,
    policy: FetchPolicy,
) -> Option<(String, Vec<Block>)> {
    let timeout = policy.timeout;
    let reports: Vec<(String, Result<ChainReport, PeerError>)> = stream::iter(peers.iter().cloned())
        .map(move |peer| async move {
            let report = match tokio::time::timeout(timeout, fetcher.fetch_chain(&peer)).await {
                Ok(report) => report,
                Err(_) => Err(PeerError::Timeout(timeout)),
            };
            (peer, report)
        })
        .buffered(policy.fanout.max(1))
        .collect()
        .await;

    let mut max_length = local_len;
    let mut best = None;
    for (peer, report) in reports {
        let report = match report {
            Ok(report) => report,
            Err(e) => {
                warn!("peer {peer} skipped: {e}");
                continue;
            }
        };
        if report.length != report.chain.len() {
            warn!(
                "peer {peer} skipped: {}",
                PeerError::Malformed(format!(
                    "length {} but {} blocks",
                    report.length,
                    report.chain.len()
                ))
            );
            continue;
        }
        debug!("peer {peer} reports {} blocks", report.length);
        if report.length <= max_length {
            continue;
        }
        let chain = report.chain;
        let checked = tokio::task::spawn_blocking(move || {
            let verdict = check_chain(&chain, difficulty);
            (chain, verdict)
        })
        .await;
        match checked {
            Ok((chain, Ok(()))) => {
                max_length = chain.len();
                best = Some((peer, chain));
            }
            Ok((_, Err(e))) => warn!("chain from {peer} rejected: {e}"),
            Err(e) => warn!("validation of {peer}'s chain aborted: {e}"),
        }
    }
    best
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::blockchain::{Blockchain, proof_of_work};
    use std::collections::HashMap;

    pub(crate) const TEST_DIFFICULTY: u32 = 2;

    /// A valid chain of `len` blocks at the test difficulty.
    pub(crate) fn build_chain(len: usize) -> Vec<Block> {
        let mut bc = Blockchain::new(TEST_DIFFICULTY);
        while bc.len() < len {
            let last = bc.last_block().clone();
            let proof = proof_of_work(&last, TEST_DIFFICULTY);
            bc.new_block(proof, Some(last.hash()));
        }
        bc.chain
    }

    pub(crate) enum Reply {
        Chain(Vec<Block>),
        Lie(Vec<Block>, usize),
        Fail,
        Hang,
    }

    #[derive(Default)]
    pub(crate) struct StubFetcher {
        pub(crate) replies: HashMap<String, Reply>,
    }

    impl StubFetcher {
        pub(crate) fn with(mut self, node: &str, reply: Reply) -> Self {
            self.replies.insert(node.to_string(), reply);
            self
        }
    }

    impl ChainFetcher for StubFetcher {
        async fn fetch_chain(&self, node: &str) -> Result<ChainReport, PeerError> {
            match self.replies.get(node) {
                Some(Reply::Chain(chain)) => Ok(ChainReport::new(chain.clone())),
                Some(Reply::Lie(chain, length)) => Ok(ChainReport {
                    chain: chain.clone(),
                    length: *length,
                }),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(PeerError::Status(504))
                }
                Some(Reply::Fail) | None => Err(PeerError::Status(500)),
            }
        }
    }

    pub(crate) fn policy() -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_millis(200),
            fanout: 2,
        }
    }

    fn peers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn register_accepts_urls_and_bare_locations() {
        let mut set = NodeSet::new();
        assert_eq!(set.register("http://192.168.0.5:5000").unwrap(), "192.168.0.5:5000");
        assert_eq!(set.register("192.168.0.5:5000").unwrap(), "192.168.0.5:5000");
        assert_eq!(set.register("https://peer.example/chain").unwrap(), "peer.example");
        assert_eq!(set.register("10.0.0.1:6000/").unwrap(), "10.0.0.1:6000");
        assert_eq!(set.to_vec(), vec!["192.168.0.5:5000", "peer.example", "10.0.0.1:6000"]);
    }

    #[test]
    fn default_ports_are_kept_as_written() {
        assert_eq!(parse_node_address("https://peer.example:443").unwrap(), "peer.example:443");
        assert_eq!(parse_node_address("http://peer.example:80/chain").unwrap(), "peer.example:80");
        assert_eq!(parse_node_address("http://user@peer.example:8080").unwrap(), "peer.example:8080");
        assert_eq!(parse_node_address("http://[::1]:5000").unwrap(), "[::1]:5000");
    }

    #[test]
    fn register_rejects_garbage() {
        let mut set = NodeSet::new();
        assert!(matches!(set.register(""), Err(LedgerError::InvalidNodeAddress(_))));
        assert!(set.register("http://").is_err());
        assert!(set.register("/only/a/path").is_err());
        assert!(set.register("bad host").is_err());
        assert!(set.is_empty());
    }

    #[actix_web::test]
    async fn picks_longest_valid_chain() {
        let five = build_chain(5);
        let fetcher = StubFetcher::default()
            .with("a", Reply::Chain(five.clone()))
            .with("b", Reply::Chain(build_chain(4)));
        let got = longest_valid_chain(&fetcher, &peers(&["a", "b"]), 3, TEST_DIFFICULTY, policy()).await;
        let (peer, chain) = got.unwrap();
        assert_eq!(peer, "a");
        assert_eq!(chain, five);
    }

    #[actix_web::test]
    async fn nothing_longer_means_no_candidate() {
        let fetcher = StubFetcher::default()
            .with("a", Reply::Chain(build_chain(3)))
            .with("b", Reply::Chain(build_chain(2)));
        let got = longest_valid_chain(&fetcher, &peers(&["a", "b"]), 3, TEST_DIFFICULTY, policy()).await;
        assert!(got.is_none());
    }

    #[actix_web::test]
    async fn invalid_longer_chain_is_ignored() {
        let mut ten = build_chain(10);
        ten[4].previous_hash = "f".repeat(64);
        let five = build_chain(5);
        let fetcher = StubFetcher::default()
            .with("liar", Reply::Chain(ten))
            .with("honest", Reply::Chain(five.clone()));
        let got = longest_valid_chain(&fetcher, &peers(&["liar", "honest"]), 3, TEST_DIFFICULTY, policy()).await;
        assert_eq!(got.unwrap().1, five);
    }

    #[actix_web::test]
    async fn failing_and_slow_peers_are_skipped() {
        let four = build_chain(4);
        let fetcher = StubFetcher::default()
            .with("down", Reply::Fail)
            .with("slow", Reply::Hang)
            .with("padded", Reply::Lie(build_chain(2), 9))
            .with("ok", Reply::Chain(four.clone()));
        let got = longest_valid_chain(
            &fetcher,
            &peers(&["down", "slow", "padded", "ok"]),
            3,
            TEST_DIFFICULTY,
            policy(),
        )
        .await;
        assert_eq!(got.unwrap(), ("ok".to_string(), four));
    }

    #[actix_web::test]
    async fn equal_length_keeps_first_peer() {
        let first = build_chain(5);
        let fetcher = StubFetcher::default()
            .with("first", Reply::Chain(first.clone()))
            .with("second", Reply::Chain(build_chain(5)));
        let got = longest_valid_chain(&fetcher, &peers(&["first", "second"]), 1, TEST_DIFFICULTY, policy()).await;
        assert_eq!(got.unwrap().0, "first");
    }
}
