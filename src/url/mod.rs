//! URL handling module for Onion-Sieve
//!
//! This module provides URL normalization, onion hostname helpers and the
//! crawl scope predicate.

mod normalize;
mod onion;

use crate::config::ScopeConfig;
use url::Url;

// Re-export main functions
pub use normalize::{normalize_parsed, normalize_url};
pub use onion::{is_v2_onion, is_v3_onion, onion_service_label};

/// Decides which hosts the crawl may visit
///
/// A URL is in scope when it uses http(s) and its host ends with one of the
/// configured suffixes. With `strict_onion` set, hosts under `.onion` must
/// also carry a well-formed service name (v3, or v2 so that it can be
/// recorded as deprecated).
#[derive(Debug, Clone)]
pub struct Scope {
    suffixes: Vec<String>,
    strict_onion: bool,
}

impl Scope {
    /// Creates a scope from hostname suffixes such as `.onion`
    pub fn new<I, S>(suffixes: I, strict_onion: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .collect(),
            strict_onion,
        }
    }

    /// Builds the scope described by the `[scope]` config section
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self::new(config.suffixes.iter().cloned(), config.strict_onion_hosts)
    }

    /// Returns true if the URL may be crawled
    ///
    /// # Examples
    ///
    /// ```
    /// use onion_sieve::url::Scope;
    /// use url::Url;
    ///
    /// let scope = Scope::new([".onion"], false);
    /// assert!(scope.contains(&Url::parse("http://a.onion/").unwrap()));
    /// assert!(!scope.contains(&Url::parse("https://example.com/").unwrap()));
    /// ```
    pub fn contains(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        match url.host_str() {
            Some(host) => self.contains_host(host),
            None => false,
        }
    }

    /// Returns true if the hostname matches the scope
    pub fn contains_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();

        let suffix_match = self
            .suffixes
            .iter()
            .any(|suffix| host.len() > suffix.len() && host.ends_with(suffix.as_str()));

        if !suffix_match {
            return false;
        }

        if self.strict_onion && host.ends_with(".onion") {
            return is_v3_onion(&host) || is_v2_onion(&host);
        }

        true
    }
}
