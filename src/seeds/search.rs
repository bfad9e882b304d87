use crate::crawler::{FetchOutcome, LinkExtractor, Transport};
use crate::seeds::{SeedError, SeedLookup};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use url::{form_urlencoded, Url};

/// Seeds the crawl from a hidden-service search engine
///
/// Each keyword is appended, form-encoded, to the search URL. The result
/// pages are fetched through the crawl transport and every in-scope link on
/// them (including redirect-wrapped ones) becomes a seed.
pub struct SearchEngineSeeds {
    transport: Arc<dyn Transport>,
    links: Arc<LinkExtractor>,
    search_url: String,
}

impl SearchEngineSeeds {
    pub fn new(
        transport: Arc<dyn Transport>,
        links: Arc<LinkExtractor>,
        search_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            links,
            search_url: search_url.into(),
        }
    }

    /// Builds the query URL for one keyword
    pub fn query_url(&self, keyword: &str) -> Result<Url, SeedError> {
        let encoded: String = form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
        let full = format!("{}{}", self.search_url, encoded);
        Url::parse(&full).map_err(|e| SeedError::InvalidSearchUrl(format!("{}: {}", full, e)))
    }
}

#[async_trait]
impl SeedLookup for SearchEngineSeeds {
    async fn lookup(&self, keywords: &[String]) -> Result<Vec<String>, SeedError> {
        let mut seeds = Vec::new();
        let mut seen = HashSet::new();
        let mut failures = 0;

        for keyword in keywords {
            let url = self.query_url(keyword)?;

            match self.transport.fetch(&url).await {
                FetchOutcome::Success(page) => {
                    let parsed = self.links.parse(&page.body, &page.final_url);
                    tracing::info!(
                        "Search for '{}' returned {} in-scope links",
                        keyword,
                        parsed.links.len()
                    );
                    for link in parsed.links {
                        let link = String::from(link);
                        if seen.insert(link.clone()) {
                            seeds.push(link);
                        }
                    }
                }
                FetchOutcome::Transient(error) | FetchOutcome::Permanent(error) => {
                    failures += 1;
                    tracing::warn!(
                        "Search for '{}' failed ({}): {}",
                        keyword,
                        error.kind,
                        error.message
                    );
                }
            }
        }

        if !keywords.is_empty() && failures == keywords.len() {
            return Err(SeedError::AllSearchesFailed(failures));
        }

        Ok(seeds)
    }
}
