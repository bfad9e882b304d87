use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, ScopeConfig, SeedConfig, TransportConfig,
};
use crate::ConfigError;
use url::Url;

const PROXY_SCHEMES: &[&str] = &["socks5", "socks5h", "http", "https"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_transport_config(&config.transport)?;
    validate_scope_config(&config.scope)?;
    validate_seed_config(&config.seeds)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    if config.max_pending < 1 {
        return Err(ConfigError::Validation(
            "max_pending must be >= 1".to_string(),
        ));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    if config.max_runtime_secs == Some(0) {
        return Err(ConfigError::Validation(
            "max_runtime_secs must be >= 1 when set".to_string(),
        ));
    }

    if config.idle_backoff_ms < 1 {
        return Err(ConfigError::Validation(
            "idle_backoff_ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates transport configuration
fn validate_transport_config(config: &TransportConfig) -> Result<(), ConfigError> {
    if let Some(proxy) = &config.proxy {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;

        if !PROXY_SCHEMES.contains(&url.scheme()) {
            return Err(ConfigError::Validation(format!(
                "proxy scheme must be one of {:?}, got '{}'",
                PROXY_SCHEMES,
                url.scheme()
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "proxy '{}' has no host",
                proxy
            )));
        }
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_body_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_body_bytes must be >= 1024, got {}",
            config.max_body_bytes
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the scope predicate configuration
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    if config.suffixes.is_empty() {
        return Err(ConfigError::Validation(
            "scope needs at least one hostname suffix".to_string(),
        ));
    }

    for suffix in &config.suffixes {
        validate_suffix(suffix)?;
    }

    Ok(())
}

/// Validates a single hostname suffix such as `.onion`
fn validate_suffix(suffix: &str) -> Result<(), ConfigError> {
    let Some(rest) = suffix.strip_prefix('.') else {
        return Err(ConfigError::Validation(format!(
            "suffix '{}' must start with '.'",
            suffix
        )));
    };

    if rest.is_empty()
        || rest.ends_with('.')
        || rest.contains("..")
        || !rest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "suffix '{}' is not a valid hostname suffix",
            suffix
        )));
    }

    Ok(())
}

/// Validates the seed configuration
fn validate_seed_config(config: &SeedConfig) -> Result<(), ConfigError> {
    if config.keyword_path.is_none() && config.urls.is_empty() {
        return Err(ConfigError::Validation(
            "seeds need a keyword_path or at least one url".to_string(),
        ));
    }

    let search = Url::parse(&config.search_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid search_url '{}': {}", config.search_url, e))
    })?;
    if search.scheme() != "http" && search.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "search_url '{}' must use http or https",
            config.search_url
        )));
    }

    for seed in &config.urls {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}
