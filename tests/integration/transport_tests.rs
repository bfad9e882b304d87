//! Proxy transport and search seeding against local mock servers
//!
//! No proxy is configured, so requests go straight to wiremock.

use onion_sieve::config::TransportConfig;
use onion_sieve::crawler::{FetchOutcome, LinkExtractor, ProxyTransport, Transport};
use onion_sieve::seeds::{SearchEngineSeeds, SeedError, SeedLookup};
use onion_sieve::{FailureKind, Scope};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(max_body_bytes: usize) -> ProxyTransport {
    transport_with_timeout(max_body_bytes, 5)
}

fn transport_with_timeout(max_body_bytes: usize, timeout_secs: u64) -> ProxyTransport {
    let config = TransportConfig {
        timeout_secs,
        connect_timeout_secs: 5,
        max_body_bytes,
        ..TransportConfig::default()
    };
    ProxyTransport::new(&config).unwrap()
}

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

#[tokio::test]
async fn test_fetch_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>hello</body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    match transport(1024 * 1024).fetch(&url(&server, "/page")).await {
        FetchOutcome::Success(page) => {
            assert_eq!(page.status, 200);
            assert!(page.body.contains("hello"));
            assert!(!page.truncated);
            assert_eq!(page.final_url.path(), "/page");
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_follows_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved here"))
        .mount(&server)
        .await;

    match transport(1024 * 1024).fetch(&url(&server, "/old")).await {
        FetchOutcome::Success(page) => {
            assert_eq!(page.final_url.path(), "/new");
            assert_eq!(page.body, "moved here");
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_error_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    match transport(1024).fetch(&url(&server, "/missing")).await {
        FetchOutcome::Permanent(error) => {
            assert_eq!(error.kind, FailureKind::ClientError);
            assert_eq!(error.status, Some(404));
        }
        other => panic!("expected permanent failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_errors_and_rate_limits_are_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow-down"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let transport = transport(1024);

    match transport.fetch(&url(&server, "/busy")).await {
        FetchOutcome::Transient(error) => assert_eq!(error.kind, FailureKind::ServerError),
        other => panic!("expected transient failure, got {:?}", other),
    }
    match transport.fetch(&url(&server, "/slow-down")).await {
        FetchOutcome::Transient(error) => {
            assert_eq!(error.kind, FailureKind::RateLimited);
            assert_eq!(error.status, Some(429));
        }
        other => panic!("expected transient failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_oversized_body_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(8192)))
        .mount(&server)
        .await;

    match transport(1024).fetch(&url(&server, "/big")).await {
        FetchOutcome::Success(page) => {
            assert!(page.truncated);
            assert_eq!(page.body.len(), 1024);
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_response_times_out_as_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    match transport_with_timeout(1024, 1).fetch(&url(&server, "/slow")).await {
        FetchOutcome::Transient(error) => {
            assert_eq!(error.kind, FailureKind::Timeout);
            assert_eq!(error.status, None);
        }
        other => panic!("expected transient timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refused_connection_is_transient() {
    // Bind and drop a listener so the port is very likely closed.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let target = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();

    let outcome = transport(1024).fetch(&target).await;
    assert!(matches!(outcome, FetchOutcome::Transient(_)), "{:?}", outcome);
}

#[tokio::test]
async fn test_search_engine_seeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("q", "bitcoin mixer"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"
            <a href="/search/redirect?search_term=x&redirect_url=http://aaaa.onion/">a</a>
            <a href="http://bbbb.onion/shop?id=3">b</a>
            <a href="https://clearnet.example.com/">ignored</a>
            "#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("q", "broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let links = Arc::new(LinkExtractor::new(Scope::new([".onion"], false), false));
    let seeds = SearchEngineSeeds::new(
        Arc::new(transport(1024 * 1024)),
        links,
        format!("{}/search/?q=", server.uri()),
    );

    let found = seeds
        .lookup(&["bitcoin mixer".to_string(), "broken".to_string()])
        .await
        .unwrap();
    assert_eq!(found, vec!["http://aaaa.onion/", "http://bbbb.onion/shop"]);

    let all_failed = seeds.lookup(&["broken".to_string()]).await;
    assert!(matches!(all_failed, Err(SeedError::AllSearchesFailed(1))));
}
