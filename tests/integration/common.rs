//! Shared fixtures: a scripted link-graph transport and config builders

use async_trait::async_trait;
use onion_sieve::config::{parse_config, Config};
use onion_sieve::crawler::{FetchError, FetchOutcome, FetchedPage, Transport};
use onion_sieve::FailureKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const GENESIS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

/// How the fake network answers one URL
#[derive(Debug, Clone)]
pub enum Page {
    Html(String),
    Timeout,
    Status(u16),
}

/// An in-memory hidden-service graph keyed by normalized URL
///
/// Unknown URLs answer 404. Every fetch is counted.
#[derive(Default)]
pub struct LinkGraph {
    pages: HashMap<String, Page>,
    fetches: Mutex<HashMap<String, u32>>,
    delay: Option<Duration>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an HTML page linking to `links`, with `text` in its body
    pub fn page(mut self, url: &str, links: &[&str], text: &str) -> Self {
        let anchors: String = links
            .iter()
            .map(|link| format!(r#"<a href="{}">link</a>"#, link))
            .collect();
        let body = format!(
            "<html><head><title>{}</title></head><body><p>{}</p>{}</body></html>",
            url, text, anchors
        );
        self.pages.insert(url.to_string(), Page::Html(body));
        self
    }

    pub fn timeout(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Timeout);
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(url.to_string(), Page::Status(status));
        self
    }

    /// Makes every fetch take `delay`
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Chain `http://p0.onion/ → p1 → … → p{n-1}`
    pub fn chain(n: usize) -> Self {
        (0..n).fold(Self::new(), |graph, i| {
            let next = format!("http://p{}.onion/", i + 1);
            let links: Vec<&str> = if i + 1 < n { vec![next.as_str()] } else { vec![] };
            graph.page(&format!("http://p{}.onion/", i), &links, "")
        })
    }

    pub fn fetch_count(&self, url: &str) -> u32 {
        self.fetches
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> u32 {
        self.fetches.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Transport for LinkGraph {
    async fn fetch(&self, url: &Url) -> FetchOutcome {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.pages.get(url.as_str()) {
            Some(Page::Html(body)) => FetchOutcome::Success(FetchedPage {
                status: 200,
                final_url: url.clone(),
                body: body.clone(),
                truncated: false,
            }),
            Some(Page::Timeout) => {
                FetchOutcome::failed(FetchError::new(FailureKind::Timeout, "operation timed out"))
            }
            Some(Page::Status(status)) => FetchOutcome::failed(
                FetchError::new(FailureKind::ClientError, format!("HTTP {}", status))
                    .with_status(*status),
            ),
            None => FetchOutcome::failed(
                FetchError::new(FailureKind::ClientError, "HTTP 404").with_status(404),
            ),
        }
    }
}

/// Generates `http://nN.onion/` pages on the fly, each linking to the next
pub struct EndlessGraph {
    pub delay: Duration,
}

#[async_trait]
impl Transport for EndlessGraph {
    async fn fetch(&self, url: &Url) -> FetchOutcome {
        tokio::time::sleep(self.delay).await;

        let n: u64 = url
            .host_str()
            .and_then(|host| host.strip_prefix('n'))
            .and_then(|host| host.strip_suffix(".onion"))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);

        FetchOutcome::Success(FetchedPage {
            status: 200,
            final_url: url.clone(),
            body: format!(r#"<a href="http://n{}.onion/">next</a>"#, n + 1),
            truncated: false,
        })
    }
}

/// Config with `seeds` as static URLs and `crawler` as extra `[crawler]` keys
pub fn config(seeds: &[&str], crawler: &str, output_dir: &std::path::Path) -> Arc<Config> {
    let urls: Vec<String> = seeds.iter().map(|s| format!("\"{}\"", s)).collect();
    let toml = format!(
        r#"
        [crawler]
        idle-backoff-ms = 5
        {crawler}

        [seeds]
        urls = [{urls}]

        [output]
        directory = "{dir}"
        "#,
        crawler = crawler,
        urls = urls.join(", "),
        dir = output_dir.display(),
    );

    Arc::new(parse_config(&toml).unwrap())
}
