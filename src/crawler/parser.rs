//! HTML parser for extracting links and the page title
//!
//! Hyperlinks are resolved against the page URL, normalized, filtered to the
//! crawl scope and deduplicated. Parsing is best effort: broken markup
//! yields whatever links `scraper` recovers, never an error.

use crate::config::ScopeConfig;
use crate::url::{normalize_parsed, Scope};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Distinct in-scope links, in first-seen order
    pub links: Vec<Url>,
}

/// Turns page markup into in-scope crawl targets
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    scope: Scope,
    keep_query: bool,
}

impl LinkExtractor {
    pub fn new(scope: Scope, keep_query: bool) -> Self {
        Self { scope, keep_query }
    }

    pub fn from_config(config: &ScopeConfig) -> Self {
        Self::new(Scope::from_config(config), config.keep_query)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Parses HTML content and extracts links and the title
    ///
    /// # Link Extraction Rules
    ///
    /// **Include:**
    /// - `<a href="...">` and `<area href="...">`
    /// - Out-of-scope links that wrap an in-scope URL in a query value
    ///   (search engine redirect links), replaced by the wrapped URL
    ///
    /// **Exclude:**
    /// - `javascript:`, `mailto:`, `tel:` and `data:` hrefs
    /// - Fragment-only hrefs (same page anchors)
    /// - Anything outside the scope after normalization
    ///
    /// # Example
    ///
    /// ```
    /// use onion_sieve::crawler::LinkExtractor;
    /// use onion_sieve::url::Scope;
    /// use url::Url;
    ///
    /// let extractor = LinkExtractor::new(Scope::new([".onion"], false), false);
    /// let html = r#"<title>Test</title><a href="/page?x=1">a</a><a href="https://example.com/">b</a>"#;
    /// let page = extractor.parse(html, &Url::parse("http://abc.onion/").unwrap());
    /// assert_eq!(page.title.as_deref(), Some("Test"));
    /// assert_eq!(page.links.len(), 1);
    /// assert_eq!(page.links[0].as_str(), "http://abc.onion/page");
    /// ```
    pub fn parse(&self, html: &str, base_url: &Url) -> ParsedPage {
        let document = Html::parse_document(html);

        ParsedPage {
            title: extract_title(&document),
            links: self.extract_links(&document, base_url),
        }
    }

    /// Normalizes a URL and returns it if it is a crawl target
    ///
    /// Falls back to an absolute in-scope URL carried in one of the query
    /// values when the URL itself is out of scope.
    pub fn accept(&self, url: Url) -> Option<Url> {
        if self.scope.contains(&url) {
            return normalize_parsed(url, self.keep_query).ok();
        }

        url.query_pairs()
            .filter_map(|(_, value)| Url::parse(&value).ok())
            .find(|embedded| self.scope.contains(embedded))
            .and_then(|embedded| normalize_parsed(embedded, self.keep_query).ok())
    }

    fn extract_links(&self, document: &Html, base_url: &Url) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        let Ok(selector) = Selector::parse("a[href], area[href]") else {
            return links;
        };

        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };

            if let Some(url) = resolve_link(href, base_url).and_then(|url| self.accept(url)) {
                if seen.insert(url.as_str().to_string()) {
                    links.push(url);
                }
            }
        }

        links
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| {
            element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|s| !s.is_empty())
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url)
    } else {
        None
    }
}
