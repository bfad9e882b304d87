//! Seed lookup for the start of a crawl
//!
//! Keywords from the keyword file are turned into start URLs by a
//! [`SeedLookup`]. The search engine lookup is the normal source; a static
//! list serves fixed seeds and tests.

mod keywords;
mod search;

pub use keywords::{load_keywords, parse_keywords};
pub use search::SearchEngineSeeds;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end seeding
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read keyword file {path}: {source}")]
    Keywords {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid search URL: {0}")]
    InvalidSearchUrl(String),

    #[error("All {0} keyword searches failed")]
    AllSearchesFailed(usize),

    #[error("Seed lookup failed: {0}")]
    Lookup(String),

    #[error("No in-scope seed URLs")]
    NoSeeds,
}

/// Resolves keywords into candidate seed URLs
///
/// Returned URLs are raw; the crawler normalizes and scope-filters them.
#[async_trait]
pub trait SeedLookup: Send + Sync {
    async fn lookup(&self, keywords: &[String]) -> Result<Vec<String>, SeedError>;
}

/// A fixed seed list that ignores the keywords
#[derive(Debug, Clone, Default)]
pub struct StaticSeeds {
    urls: Vec<String>,
}

impl StaticSeeds {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl SeedLookup for StaticSeeds {
    async fn lookup(&self, _keywords: &[String]) -> Result<Vec<String>, SeedError> {
        Ok(self.urls.clone())
    }
}
