//! Configuration module for Onion-Sieve
//!
//! One TOML file describes a run: worker count and limits, the proxy
//! transport, the crawl scope, where seeds come from and where output goes.
//! The parsed [`Config`] is validated once and then shared read-only.
//!
//! # Example
//!
//! ```no_run
//! use onion_sieve::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sieve.toml")).unwrap();
//! println!("{} workers, proxy {:?}", config.crawler.workers, config.transport.proxy);
//! ```

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use types::{
    Config, CrawlerConfig, LogFormat, OutputConfig, ScopeConfig, SeedConfig, TransportConfig,
};
