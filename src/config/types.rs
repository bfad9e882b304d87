use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Onion-Sieve
///
/// Loaded once at start and shared read-only (behind an `Arc`) with the
/// orchestrator and every worker for the whole run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
    pub seeds: SeedConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Maximum link depth from the seeds (unbounded if absent)
    #[serde(rename = "max-depth", default)]
    pub max_depth: Option<u32>,

    /// Stop after this many pages have reached a terminal outcome
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u64>,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Cap on the number of pending URLs
    #[serde(rename = "max-pending", default = "default_max_pending")]
    pub max_pending: usize,

    /// Wall-clock cap on the whole run (seconds)
    #[serde(rename = "max-runtime-secs", default)]
    pub max_runtime_secs: Option<u64>,

    /// Initial backoff when the frontier is temporarily empty (milliseconds)
    #[serde(rename = "idle-backoff-ms", default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
}

/// Forward proxy transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Forward proxy endpoint, e.g. `socks5h://127.0.0.1:9050`
    #[serde(default)]
    pub proxy: Option<String>,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(
        rename = "connect-timeout-secs",
        default = "default_connect_timeout_secs"
    )]
    pub connect_timeout_secs: u64,

    /// Response bodies are truncated after this many bytes
    #[serde(rename = "max-body-bytes", default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Client identification string
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Crawl scope configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeConfig {
    /// Hostname suffixes that are in scope
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,

    /// Require well-formed onion service names
    #[serde(rename = "strict-onion-hosts", default)]
    pub strict_onion_hosts: bool,

    /// Record deprecated v2 onion services without fetching them
    #[serde(rename = "reject-v2-onions", default = "default_true")]
    pub reject_v2_onions: bool,

    /// Keep query strings when normalizing links
    #[serde(rename = "keep-query", default)]
    pub keep_query: bool,
}

/// Seed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    /// File with one search keyword per line
    #[serde(rename = "keyword-path", default)]
    pub keyword_path: Option<PathBuf>,

    /// Search endpoint the URL-encoded keyword is appended to
    #[serde(rename = "search-url", default = "default_search_url")]
    pub search_url: String,

    /// Fixed seed URLs
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory for the visit log, summary and savestate
    pub directory: PathBuf,

    /// Visit log format
    #[serde(default)]
    pub format: LogFormat,
}

/// On-disk format of the visit log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Jsonl,
    Tsv,
}

impl CrawlerConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn max_runtime(&self) -> Option<Duration> {
        self.max_runtime_secs.map(Duration::from_secs)
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl OutputConfig {
    pub fn log_path(&self) -> PathBuf {
        match self.format {
            LogFormat::Jsonl => self.directory.join("visits.jsonl"),
            LogFormat::Tsv => self.directory.join("visits.tsv"),
        }
    }

    pub fn summary_path(&self) -> PathBuf {
        self.directory.join("summary.md")
    }

    pub fn savestate_path(&self) -> PathBuf {
        self.directory.join("savestate.db")
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_depth: None,
            max_pages: None,
            max_retries: default_max_retries(),
            max_pending: default_max_pending(),
            max_runtime_secs: None,
            idle_backoff_ms: default_idle_backoff_ms(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            suffixes: default_suffixes(),
            strict_onion_hosts: false,
            reject_v2_onions: true,
            keep_query: false,
        }
    }
}

fn default_workers() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_max_pending() -> usize {
    100_000
}

fn default_idle_backoff_ms() -> u64 {
    250
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; rv:128.0) Gecko/20100101 Firefox/128.0".to_string()
}

fn default_suffixes() -> Vec<String> {
    vec![".onion".to_string()]
}

fn default_search_url() -> String {
    "https://ahmia.fi/search/?q=".to_string()
}

fn default_true() -> bool {
    true
}
