//! Interrupted crawls resumed from the SQLite savestate

use crate::common::{config, LinkGraph};
use onion_sieve::output::MemorySink;
use onion_sieve::seeds::StaticSeeds;
use onion_sieve::storage::{open_storage, RunStatus, Savestate, Storage};
use onion_sieve::{Crawler, Termination};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn open(dir: &TempDir, fresh: bool) -> Savestate {
    let storage = open_storage(&dir.path().join("savestate.db")).unwrap();
    Savestate::open(Box::new(storage), "hash", fresh).unwrap()
}

#[tokio::test]
async fn test_interrupted_crawl_resumes_where_it_stopped() {
    let dir = TempDir::new().unwrap();
    let graph = Arc::new(LinkGraph::chain(6));

    // First run stops early on the page limit.
    let first_sink = MemorySink::new();
    let savestate = open(&dir, false);
    let first_run = savestate.run_id;
    let report = Crawler::new(
        config(&["http://p0.onion/"], "workers = 1\nmax-pages = 2", dir.path()),
        graph.clone(),
        Arc::new(StaticSeeds::default()),
        Box::new(first_sink.clone()),
    )
    .with_savestate(savestate)
    .run()
    .await
    .unwrap();
    assert_eq!(report.termination, Termination::PageLimit);

    let storage = open_storage(&dir.path().join("savestate.db")).unwrap();
    assert_eq!(
        storage.get_run(first_run).unwrap().status,
        RunStatus::Interrupted
    );
    assert!(storage.count_pending().unwrap() > 0);
    drop(storage);

    // Second run picks up the saved queue and finishes the chain.
    let second_sink = MemorySink::new();
    let savestate = open(&dir, false);
    assert_eq!(savestate.run_id, first_run);
    assert!(savestate.restored.is_some());

    let report = Crawler::new(
        config(&["http://p0.onion/"], "workers = 1", dir.path()),
        graph.clone(),
        Arc::new(StaticSeeds::default()),
        Box::new(second_sink.clone()),
    )
    .with_savestate(savestate)
    .run()
    .await
    .unwrap();
    assert_eq!(report.termination, Termination::Exhausted);

    let first: HashSet<String> = first_sink.results().into_iter().map(|r| r.url).collect();
    let second: HashSet<String> = second_sink.results().into_iter().map(|r| r.url).collect();
    assert!(first.is_disjoint(&second));
    assert_eq!(first.len() + second.len(), 6);
    assert_eq!(graph.total_fetches(), 6);

    let storage = open_storage(&dir.path().join("savestate.db")).unwrap();
    assert_eq!(
        storage.get_run(first_run).unwrap().status,
        RunStatus::Completed
    );
    assert_eq!(storage.count_pending().unwrap(), 0);
}

#[tokio::test]
async fn test_fresh_start_ignores_saved_queue() {
    let dir = TempDir::new().unwrap();
    let graph = Arc::new(LinkGraph::chain(4));

    let savestate = open(&dir, false);
    Crawler::new(
        config(&["http://p0.onion/"], "workers = 1\nmax-pages = 1", dir.path()),
        graph.clone(),
        Arc::new(StaticSeeds::default()),
        Box::new(MemorySink::new()),
    )
    .with_savestate(savestate)
    .run()
    .await
    .unwrap();

    let savestate = open(&dir, true);
    assert!(savestate.restored.is_none());

    let sink = MemorySink::new();
    let report = Crawler::new(
        config(&["http://p0.onion/"], "workers = 1", dir.path()),
        graph,
        Arc::new(StaticSeeds::default()),
        Box::new(sink.clone()),
    )
    .with_savestate(savestate)
    .run()
    .await
    .unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(sink.results().len(), 4);
}

#[tokio::test]
async fn test_killed_crawl_resumes_without_relogging() {
    let dir = TempDir::new().unwrap();
    let graph = Arc::new(LinkGraph::chain(10).slow(Duration::from_millis(50)));

    // Dropping the run future mid-crawl stands in for the process dying.
    let first_sink = MemorySink::new();
    let run = Crawler::new(
        config(&["http://p0.onion/"], "workers = 1", dir.path()),
        graph.clone(),
        Arc::new(StaticSeeds::default()),
        Box::new(first_sink.clone()),
    )
    .with_savestate(open(&dir, false))
    .run();
    assert!(tokio::time::timeout(Duration::from_millis(380), run)
        .await
        .is_err());

    let logged_before = first_sink.results().len();
    assert!(logged_before > 0 && logged_before < 10);

    let second_sink = MemorySink::new();
    let report = Crawler::new(
        config(&["http://p0.onion/"], "workers = 1", dir.path()),
        graph,
        Arc::new(StaticSeeds::default()),
        Box::new(second_sink.clone()),
    )
    .with_savestate(open(&dir, false))
    .run()
    .await
    .unwrap();
    assert_eq!(report.termination, Termination::Exhausted);

    let mut seen = HashSet::new();
    for result in first_sink.results().into_iter().chain(second_sink.results()) {
        assert!(seen.insert(result.url.clone()), "{} logged twice", result.url);
    }
    assert_eq!(seen.len(), 10);
}

#[tokio::test]
async fn test_page_limit_covers_whole_run() {
    let dir = TempDir::new().unwrap();
    let graph = Arc::new(LinkGraph::chain(6));
    let limited = "workers = 1\nmax-pages = 2";

    let report = Crawler::new(
        config(&["http://p0.onion/"], limited, dir.path()),
        graph.clone(),
        Arc::new(StaticSeeds::default()),
        Box::new(MemorySink::new()),
    )
    .with_savestate(open(&dir, false))
    .run()
    .await
    .unwrap();
    assert_eq!(report.termination, Termination::PageLimit);
    let fetched = graph.total_fetches();

    // Resuming with the same budget has nothing left to spend.
    let sink = MemorySink::new();
    let savestate = open(&dir, false);
    let run_id = savestate.run_id;
    let report = Crawler::new(
        config(&["http://p0.onion/"], limited, dir.path()),
        graph.clone(),
        Arc::new(StaticSeeds::default()),
        Box::new(sink.clone()),
    )
    .with_savestate(savestate)
    .run()
    .await
    .unwrap();

    assert_eq!(report.termination, Termination::PageLimit);
    assert!(sink.results().is_empty());
    assert_eq!(graph.total_fetches(), fetched);

    let storage = open_storage(&dir.path().join("savestate.db")).unwrap();
    assert_eq!(storage.get_run(run_id).unwrap().status, RunStatus::Interrupted);
}
