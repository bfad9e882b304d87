//! HTTP transport through the forward proxy
//!
//! This module handles every request the crawler makes, including:
//! - Building the HTTP client with proxy, timeouts and user agent
//! - Streaming response bodies up to the configured cap
//! - Classifying statuses and client errors into failure kinds

use crate::config::TransportConfig;
use crate::state::FailureKind;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, Proxy};
use url::Url;

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// A successfully retrieved page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code (always 2xx)
    pub status: u16,
    /// URL after redirects
    pub final_url: Url,
    /// Body decoded as UTF-8, lossily
    pub body: String,
    /// True if the body was cut at the size cap
    pub truncated: bool,
}

/// A failed fetch
#[derive(Debug, Clone)]
pub struct FetchError {
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Result of one fetch, tagged for the retry decision
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(FetchedPage),
    /// Worth retrying later
    Transient(FetchError),
    /// Terminal for this URL
    Permanent(FetchError),
}

impl FetchOutcome {
    /// Wraps an error in the variant its kind calls for
    pub fn failed(error: FetchError) -> Self {
        if error.kind.is_transient() {
            Self::Transient(error)
        } else {
            Self::Permanent(error)
        }
    }
}

/// Anything that can retrieve a page
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn fetch(&self, url: &Url) -> FetchOutcome;
}

/// Fetches pages through the configured forward proxy
///
/// With a `socks5h://` proxy, hostnames are resolved by the proxy, which is
/// what hidden-service names need. Without a proxy requests go out directly.
#[derive(Debug, Clone)]
pub struct ProxyTransport {
    client: Client,
    max_body_bytes: usize,
}

impl ProxyTransport {
    /// Builds the transport from the `[transport]` config section
    ///
    /// # Returns
    ///
    /// * `Ok(ProxyTransport)` - Client built successfully
    /// * `Err(reqwest::Error)` - Invalid proxy or TLS backend failure
    pub fn new(config: &TransportConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .redirect(Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy.as_str())?);
        }

        Ok(Self {
            client: builder.build()?,
            max_body_bytes: config.max_body_bytes,
        })
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    async fn fetch(&self, url: &Url) -> FetchOutcome {
        let mut response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::failed(classify_error(&e)),
        };

        let status = response.status().as_u16();
        if let Some(kind) = classify_status(status) {
            return FetchOutcome::failed(
                FetchError::new(kind, format!("HTTP {}", status)).with_status(status),
            );
        }

        let final_url = response.url().clone();
        let mut body: Vec<u8> = Vec::new();
        let mut truncated = false;

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let room = self.max_body_bytes - body.len();
                    if chunk.len() > room {
                        body.extend_from_slice(&chunk[..room]);
                        truncated = true;
                        break;
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) => {
                    return FetchOutcome::failed(classify_error(&e).with_status(status));
                }
            }
        }

        if truncated {
            tracing::debug!("Body of {} truncated at {} bytes", url, self.max_body_bytes);
        }

        FetchOutcome::Success(FetchedPage {
            status,
            final_url,
            body: String::from_utf8_lossy(&body).into_owned(),
            truncated,
        })
    }
}

/// Maps an HTTP status to a failure kind, or None for 2xx
///
/// | Status | Kind |
/// |--------|------|
/// | 2xx | success |
/// | 408 | `timeout` (transient) |
/// | 429 | `rate_limited` (transient) |
/// | 5xx | `server_error` (transient) |
/// | 3xx | `redirect` (an unfollowed redirect) |
/// | other 4xx | `client_error` |
/// | anything else | `unexpected_status` |
pub fn classify_status(status: u16) -> Option<FailureKind> {
    match status {
        200..=299 => None,
        408 => Some(FailureKind::Timeout),
        429 => Some(FailureKind::RateLimited),
        300..=399 => Some(FailureKind::Redirect),
        400..=499 => Some(FailureKind::ClientError),
        500..=599 => Some(FailureKind::ServerError),
        _ => Some(FailureKind::UnexpectedStatus),
    }
}

/// Maps a client error to a failure kind
fn classify_error(error: &reqwest::Error) -> FetchError {
    let kind = if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_redirect() {
        FailureKind::Redirect
    } else if error.is_builder() {
        FailureKind::MalformedUrl
    } else if error.is_connect() {
        FailureKind::Connect
    } else {
        FailureKind::Network
    };

    FetchError::new(kind, error.to_string())
}
