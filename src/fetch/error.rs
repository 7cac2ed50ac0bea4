//! Error types for the fetch module.
//!
//! Policy violations (redirect budget, size cap, wall-clock budget) are kept
//! apart from transport failures so callers can pick a retry policy per
//! [`FailureKind`].

use thiserror::Error;

/// Errors that can occur while fetching a remote resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The location could not be parsed into an absolute http(s) URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected location.
        url: String,
    },

    /// The redirect budget ran out before a terminal response arrived.
    #[error("redirect limit of {limit} exhausted fetching {url}")]
    RedirectLimitExceeded {
        /// The location that would have been requested next.
        url: String,
        /// The effective redirect budget for this fetch.
        limit: u32,
    },

    /// A redirect response arrived without a usable `Location` header.
    #[error("HTTP {status} redirect without Location fetching {url}")]
    MissingLocation {
        /// The URL that answered with the redirect.
        url: String,
        /// The redirect status code.
        status: u16,
    },

    /// Non-2xx response that is not a followed redirect.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The streamed body grew past the configured size cap.
    #[error("response from {url} exceeded {limit_bytes} bytes")]
    PayloadTooLarge {
        /// The URL whose body was too large.
        url: String,
        /// The cap that was exceeded.
        limit_bytes: u64,
    },

    /// A read timeout fired or the wall-clock budget ran out mid-stream.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Connection, DNS or TLS failure, including connect timeouts.
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be constructed from the options.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

/// Coarse classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A configured budget was exceeded (redirects, size, time).
    Policy,
    /// The server answered with a status the fetcher does not accept.
    Http,
    /// The request never completed at the transport level.
    Transport,
    /// The caller supplied an unusable location.
    Input,
}

impl FetchError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a redirect-budget error.
    pub fn redirect_limit_exceeded(url: impl Into<String>, limit: u32) -> Self {
        Self::RedirectLimitExceeded {
            url: url.into(),
            limit,
        }
    }

    /// Creates a missing-Location error.
    pub fn missing_location(url: impl Into<String>, status: u16) -> Self {
        Self::MissingLocation {
            url: url.into(),
            status,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a payload-too-large error.
    pub fn payload_too_large(url: impl Into<String>, limit_bytes: u64) -> Self {
        Self::PayloadTooLarge {
            url: url.into(),
            limit_bytes,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Maps a reqwest failure, promoting read timeouts to [`FetchError::Timeout`].
    ///
    /// A timeout while connecting is a transport failure and stays
    /// [`FetchError::Network`].
    pub fn from_transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() && !source.is_connect() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Creates a client construction error.
    #[must_use]
    pub fn client_build(source: reqwest::Error) -> Self {
        Self::ClientBuild { source }
    }

    /// Classifies the error for retry decisions.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RedirectLimitExceeded { .. }
            | Self::PayloadTooLarge { .. }
            | Self::Timeout { .. } => FailureKind::Policy,
            Self::HttpStatus { .. } | Self::MissingLocation { .. } => FailureKind::Http,
            Self::Network { .. } | Self::ClientBuild { .. } => FailureKind::Transport,
            Self::InvalidUrl { .. } => FailureKind::Input,
        }
    }

    /// Returns true if a configured budget stopped the fetch.
    #[must_use]
    pub fn is_policy_violation(&self) -> bool {
        self.kind() == FailureKind::Policy
    }
}

// No `From<reqwest::Error>`: every variant carries the URL.
