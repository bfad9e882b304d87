/// Failure classification for a visited URL
///
/// Every failed visit carries exactly one of these kinds. A kind is either
/// transient (the URL goes back into the frontier until its retries run out)
/// or permanent (the visit is terminal immediately).
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a visit did not produce a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    // ===== Transient =====
    /// Request or read timed out (also HTTP 408)
    Timeout,

    /// Connection to the proxy or the service could not be established
    Connect,

    /// Any other network-level failure mid-transfer
    Network,

    /// HTTP 5xx
    ServerError,

    /// HTTP 429
    RateLimited,

    // ===== Permanent =====
    /// HTTP 4xx other than 408 and 429
    ClientError,

    /// Redirect loop, too many redirects, or an unfollowed 3xx
    Redirect,

    /// Status outside the classified ranges (1xx and friends)
    UnexpectedStatus,

    /// The URL could not be requested at all
    MalformedUrl,

    /// Hidden service uses the retired v2 address format
    DeprecatedOnion,

    /// The worker's fetch task panicked
    WorkerFault,
}

impl FailureKind {
    /// All kinds, transient first
    pub const ALL: [FailureKind; 11] = [
        Self::Timeout,
        Self::Connect,
        Self::Network,
        Self::ServerError,
        Self::RateLimited,
        Self::ClientError,
        Self::Redirect,
        Self::UnexpectedStatus,
        Self::MalformedUrl,
        Self::DeprecatedOnion,
        Self::WorkerFault,
    ];

    /// Returns true if the URL should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Connect | Self::Network | Self::ServerError | Self::RateLimited
        )
    }

    /// Returns true if the visit is terminal on the first occurrence
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Wire name, as used in the visit log and the summary
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Network => "network",
            Self::ServerError => "server_error",
            Self::RateLimited => "rate_limited",
            Self::ClientError => "client_error",
            Self::Redirect => "redirect",
            Self::UnexpectedStatus => "unexpected_status",
            Self::MalformedUrl => "malformed_url",
            Self::DeprecatedOnion => "deprecated_onion",
            Self::WorkerFault => "worker_fault",
        }
    }

    /// Parses a wire name back into a kind
    ///
    /// Returns None if the string doesn't match any known kind.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
