//! End-to-end crawls over the in-memory link graph

use crate::common::{config, EndlessGraph, LinkGraph, GENESIS};
use async_trait::async_trait;
use onion_sieve::output::MemorySink;
use onion_sieve::seeds::{SeedError, SeedLookup, StaticSeeds};
use onion_sieve::{Crawler, FailureKind, SieveError, Termination, VisitResult};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn no_lookup() -> Arc<StaticSeeds> {
    Arc::new(StaticSeeds::default())
}

fn urls(results: &[VisitResult]) -> Vec<String> {
    results.iter().map(|r| r.url.clone()).collect()
}

fn find<'a>(results: &'a [VisitResult], url: &str) -> &'a VisitResult {
    results
        .iter()
        .find(|r| r.url == url)
        .unwrap_or_else(|| panic!("no result for {}", url))
}

#[tokio::test]
async fn test_depth_limited_crawl_finds_address() {
    let dir = TempDir::new().unwrap();
    let graph = LinkGraph::new()
        .page("http://a.onion/", &["http://b.onion"], GENESIS)
        .page("http://b.onion/", &["http://c.onion/"], "")
        .page("http://c.onion/", &[], "");
    let graph = Arc::new(graph);
    let sink = MemorySink::new();

    let crawler = Crawler::new(
        config(&["http://a.onion"], "max-depth = 1", dir.path()),
        graph.clone(),
        no_lookup(),
        Box::new(sink.clone()),
    );
    let report = crawler.run().await.unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    let results = sink.results();
    assert_eq!(results.len(), 2);

    let a = find(&results, "http://a.onion/");
    assert_eq!(a.depth, 0);
    assert_eq!(a.http_status, Some(200));
    assert_eq!(a.links_found, 1);
    assert!(a.addresses.contains(GENESIS));
    assert_eq!(a.addresses.len(), 1);

    let b = find(&results, "http://b.onion/");
    assert_eq!(b.depth, 1);
    assert_eq!(b.discovered_from.as_deref(), Some("http://a.onion/"));
    assert!(b.addresses.is_empty());

    assert_eq!(graph.fetch_count("http://c.onion/"), 0);
    assert!(report.summary.addresses.contains(GENESIS));
    assert_eq!(report.summary.pages_with_addresses, 1);
}

#[tokio::test]
async fn test_transient_failures_are_retried_then_recorded() {
    let dir = TempDir::new().unwrap();
    let graph = Arc::new(LinkGraph::new().timeout("http://c.onion/"));
    let sink = MemorySink::new();

    let crawler = Crawler::new(
        config(&["http://c.onion/"], "max-retries = 2", dir.path()),
        graph.clone(),
        no_lookup(),
        Box::new(sink.clone()),
    );
    let report = crawler.run().await.unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(graph.fetch_count("http://c.onion/"), 3);

    let results = sink.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].failure, Some(FailureKind::Timeout));
    assert_eq!(results[0].retry_count, 2);
    assert_eq!(report.summary.failures_by_kind.get(&FailureKind::Timeout), Some(&1));
}

#[tokio::test]
async fn test_permanent_failures_are_not_retried() {
    let dir = TempDir::new().unwrap();
    let graph = Arc::new(
        LinkGraph::new()
            .page("http://a.onion/", &["http://gone.onion/"], "")
            .status("http://gone.onion/", 410),
    );
    let sink = MemorySink::new();

    let crawler = Crawler::new(
        config(&["http://a.onion/"], "max-retries = 5", dir.path()),
        graph.clone(),
        no_lookup(),
        Box::new(sink.clone()),
    );
    crawler.run().await.unwrap();

    assert_eq!(graph.fetch_count("http://gone.onion/"), 1);
    let gone = find(&sink.results(), "http://gone.onion/").clone();
    assert_eq!(gone.failure, Some(FailureKind::ClientError));
    assert_eq!(gone.http_status, Some(410));
    assert_eq!(gone.retry_count, 0);
}

#[tokio::test]
async fn test_pending_cap_refuses_overflow() {
    let dir = TempDir::new().unwrap();
    let children = [
        "http://c1.onion/",
        "http://c2.onion/",
        "http://c3.onion/",
        "http://c4.onion/",
        "http://c5.onion/",
    ];
    let graph = children.iter().fold(
        LinkGraph::new().page("http://a.onion/", &children, ""),
        |graph, child| graph.page(child, &[], ""),
    );
    let graph = Arc::new(graph);
    let sink = MemorySink::new();

    let crawler = Crawler::new(
        config(&["http://a.onion/"], "workers = 1\nmax-pending = 2", dir.path()),
        graph.clone(),
        no_lookup(),
        Box::new(sink.clone()),
    );
    let report = crawler.run().await.unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    let results = sink.results();
    assert_eq!(results.len(), 3);
    assert_eq!(find(&results, "http://a.onion/").links_found, 5);
    assert_eq!(graph.total_fetches(), 3);
}

#[tokio::test]
async fn test_cyclic_graph_visits_each_url_once() {
    let dir = TempDir::new().unwrap();
    let graph = LinkGraph::new()
        .page("http://a.onion/", &["http://b.onion/", "http://a.onion/"], "")
        .page("http://b.onion/", &["http://c.onion/", "http://a.onion/"], "")
        .page(
            "http://c.onion/",
            &["http://a.onion/#top", "http://b.onion/?ref=c"],
            "",
        );
    let graph = Arc::new(graph);
    let sink = MemorySink::new();

    let crawler = Crawler::new(
        config(&["http://a.onion/"], "workers = 4", dir.path()),
        graph.clone(),
        no_lookup(),
        Box::new(sink.clone()),
    );
    let report = crawler.run().await.unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    let visited = urls(&sink.results());
    let unique: HashSet<_> = visited.iter().collect();
    assert_eq!(visited.len(), 3);
    assert_eq!(unique.len(), 3);
    assert_eq!(graph.total_fetches(), 3);
}

#[tokio::test]
async fn test_out_of_scope_links_are_ignored() {
    let dir = TempDir::new().unwrap();
    let graph = Arc::new(LinkGraph::new().page(
        "http://a.onion/",
        &[
            "https://clearnet.example.com/",
            "mailto:admin@a.onion",
            "javascript:void(0)",
        ],
        "",
    ));
    let sink = MemorySink::new();

    let crawler = Crawler::new(
        config(&["http://a.onion/"], "", dir.path()),
        graph.clone(),
        no_lookup(),
        Box::new(sink.clone()),
    );
    crawler.run().await.unwrap();

    assert_eq!(urls(&sink.results()), vec!["http://a.onion/".to_string()]);
    assert_eq!(graph.total_fetches(), 1);
}

#[tokio::test]
async fn test_results_respect_depth_bound() {
    let dir = TempDir::new().unwrap();
    let graph = Arc::new(LinkGraph::chain(8));
    let sink = MemorySink::new();

    let crawler = Crawler::new(
        config(&["http://p0.onion/"], "max-depth = 3", dir.path()),
        graph,
        no_lookup(),
        Box::new(sink.clone()),
    );
    crawler.run().await.unwrap();

    let results = sink.results();
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.depth <= 3));
}

#[tokio::test]
async fn test_page_limit_drains() {
    let dir = TempDir::new().unwrap();
    let sink = MemorySink::new();

    let crawler = Crawler::new(
        config(&["http://p0.onion/"], "workers = 1\nmax-pages = 2", dir.path()),
        Arc::new(LinkGraph::chain(10)),
        no_lookup(),
        Box::new(sink.clone()),
    );
    let report = crawler.run().await.unwrap();

    assert_eq!(report.termination, Termination::PageLimit);
    assert!(report.summary.pages_visited >= 2);
    assert!(report.summary.pages_visited < 10);
    assert_eq!(report.summary.pages_visited as usize, sink.results().len());
}

#[tokio::test]
async fn test_stop_handle_drains_endless_crawl() {
    let dir = TempDir::new().unwrap();
    let sink = MemorySink::new();

    let crawler = Crawler::new(
        config(&["http://n0.onion/"], "workers = 2", dir.path()),
        Arc::new(EndlessGraph {
            delay: Duration::from_millis(5),
        }),
        no_lookup(),
        Box::new(sink.clone()),
    );

    let stop = crawler.stop_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.stop();
    });

    let report = crawler.run().await.unwrap();
    assert_eq!(report.termination, Termination::Stopped);
    assert!(report.summary.pages_visited >= 1);
    assert_eq!(report.summary.pages_visited as usize, sink.results().len());
}

#[tokio::test]
async fn test_runtime_limit_drains_endless_crawl() {
    let dir = TempDir::new().unwrap();

    let crawler = Crawler::new(
        config(&["http://n0.onion/"], "max-runtime-secs = 1", dir.path()),
        Arc::new(EndlessGraph {
            delay: Duration::from_millis(10),
        }),
        no_lookup(),
        Box::new(MemorySink::new()),
    );

    let report = crawler.run().await.unwrap();
    assert_eq!(report.termination, Termination::Deadline);
    assert!(report.summary.pages_visited >= 1);
}

/// Always fails, like a search engine that is down
struct BrokenLookup;

#[async_trait]
impl SeedLookup for BrokenLookup {
    async fn lookup(&self, _keywords: &[String]) -> Result<Vec<String>, SeedError> {
        Err(SeedError::Lookup("search engine unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_seed_lookup_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let graph = Arc::new(LinkGraph::new().page("http://a.onion/", &[], ""));

    let crawler = Crawler::new(
        config(&["http://a.onion/"], "", dir.path()),
        graph.clone(),
        Arc::new(BrokenLookup),
        Box::new(MemorySink::new()),
    );

    let result = crawler.run().await;
    assert!(matches!(
        result,
        Err(SieveError::Seeding(SeedError::Lookup(_)))
    ));
    assert_eq!(graph.total_fetches(), 0);
}

#[tokio::test]
async fn test_seeds_from_lookup_are_scope_filtered() {
    let dir = TempDir::new().unwrap();
    let graph = Arc::new(
        LinkGraph::new()
            .page("http://a.onion/", &[], "")
            .page("http://found.onion/", &[], GENESIS),
    );
    let sink = MemorySink::new();

    let crawler = Crawler::new(
        config(&["http://a.onion/"], "", dir.path()),
        graph,
        Arc::new(StaticSeeds::new([
            "http://found.onion",
            "https://clearnet.example.com/",
            "not a url",
        ])),
        Box::new(sink.clone()),
    );
    let report = crawler.run().await.unwrap();

    let mut visited = urls(&sink.results());
    visited.sort();
    assert_eq!(visited, vec!["http://a.onion/", "http://found.onion/"]);
    assert!(sink.results().iter().all(|r| r.depth == 0));
    assert_eq!(report.summary.unique_addresses(), 1);
}

#[tokio::test]
async fn test_missing_keyword_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let toml = format!(
        r#"
        [seeds]
        keyword-path = "{}"

        [output]
        directory = "{}"
        "#,
        dir.path().join("missing.txt").display(),
        dir.path().display()
    );
    let config = Arc::new(onion_sieve::config::parse_config(&toml).unwrap());

    let crawler = Crawler::new(
        config,
        Arc::new(LinkGraph::new()),
        no_lookup(),
        Box::new(MemorySink::new()),
    );

    let result = crawler.run().await;
    assert!(matches!(
        result,
        Err(SieveError::Seeding(SeedError::Keywords { .. }))
    ));
}

#[tokio::test]
async fn test_v2_onions_are_recorded_without_fetching() {
    let dir = TempDir::new().unwrap();
    let v2 = "http://expyuzz4wqqyqhjn.onion/";
    let graph = Arc::new(LinkGraph::new().page("http://a.onion/", &[v2], ""));
    let sink = MemorySink::new();

    let crawler = Crawler::new(
        config(&["http://a.onion/"], "", dir.path()),
        graph.clone(),
        no_lookup(),
        Box::new(sink.clone()),
    );
    crawler.run().await.unwrap();

    assert_eq!(graph.fetch_count(v2), 0);
    let result = find(&sink.results(), v2).clone();
    assert_eq!(result.failure, Some(FailureKind::DeprecatedOnion));
}

/// Answers with a fixed seed list after a delay, like a slow search engine
struct SlowLookup {
    delay: Duration,
    urls: Vec<String>,
}

#[async_trait]
impl SeedLookup for SlowLookup {
    async fn lookup(&self, _keywords: &[String]) -> Result<Vec<String>, SeedError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.urls.clone())
    }
}

#[tokio::test]
async fn test_runtime_limit_includes_seeding() {
    let dir = TempDir::new().unwrap();
    let lookup = SlowLookup {
        delay: Duration::from_millis(1200),
        urls: vec!["http://n0.onion/".to_string()],
    };

    let crawler = Crawler::new(
        config(&["https://example.com/"], "max-runtime-secs = 1", dir.path()),
        Arc::new(EndlessGraph {
            delay: Duration::from_millis(10),
        }),
        Arc::new(lookup),
        Box::new(MemorySink::new()),
    );

    let started = std::time::Instant::now();
    let report = crawler.run().await.unwrap();

    assert_eq!(report.termination, Termination::Deadline);
    assert!(
        started.elapsed() < Duration::from_millis(1800),
        "crawl ran {:?} past a 1s limit",
        started.elapsed()
    );
}
