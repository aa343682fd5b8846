//! Error types for the scraping session.
//!
//! Every failure the library can surface is a [`ScrapeError`] variant. Variants
//! carry URLs and paths for context but never credentials, login tokens, or
//! cookie values.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while logging in, searching, fetching, or exporting.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A page no longer has the structure the scraper depends on.
    ///
    /// Usually means the identity provider or directory changed its markup.
    /// Not retryable: the same response will be served again.
    #[error("unexpected page structure at {url}: {detail}")]
    ProtocolShape {
        /// The URL whose response was malformed.
        url: String,
        /// What was missing or malformed.
        detail: String,
    },

    /// The login handshake finished without granting a session.
    ///
    /// Caused by bad credentials or a step-up challenge. The reason never
    /// contains the submitted username or password.
    #[error("login failed: {reason}")]
    Authentication {
        /// Human-readable cause, free of credential data.
        reason: String,
    },

    /// A redirect chain exceeded the configured hop limit.
    #[error("redirect chain starting at {url} exceeded {hops} hops")]
    RedirectLoop {
        /// The URL that started the chain.
        url: String,
        /// The hop limit that was exceeded.
        hops: usize,
    },

    /// A directory operation was attempted before a successful login.
    #[error("session is not authenticated; call login() first")]
    NotAuthenticated,

    /// A single HTTP fetch failed. Safe to retry at the caller's discretion.
    #[error("failed to fetch {url}: {cause}")]
    Fetch {
        /// The URL that failed.
        url: String,
        /// Why the fetch failed.
        #[source]
        cause: FetchCause,
    },

    /// Export destination could not be created or written, or the export
    /// had no columns.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The export path.
        path: PathBuf,
        /// The underlying IO error, unmodified.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

/// Underlying cause of a [`ScrapeError::Fetch`].
#[derive(Debug, Error)]
pub enum FetchCause {
    /// DNS, connection, TLS, or protocol failure.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("HTTP {0}")]
    Status(u16),

    /// The response body could not be read or decoded.
    #[error("unreadable response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The redirect chain could not be followed to a final page.
    #[error("redirect failed: {0}")]
    Redirect(String),
}

impl ScrapeError {
    /// Creates a protocol-shape error.
    pub fn protocol_shape(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ProtocolShape {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Creates an authentication error.
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    /// Creates a redirect-loop error.
    pub fn redirect_loop(url: impl Into<String>, hops: usize) -> Self {
        Self::RedirectLoop {
            url: url.into(),
            hops,
        }
    }

    /// Creates a fetch error from a transport failure, separating timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let cause = if source.is_timeout() {
            FetchCause::Timeout
        } else {
            FetchCause::Network(source)
        };
        Self::Fetch {
            url: url.into(),
            cause,
        }
    }

    /// Creates a fetch error for a non-success HTTP status.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::Fetch {
            url: url.into(),
            cause: FetchCause::Status(status),
        }
    }

    /// Creates a fetch error for a body that could not be read.
    pub fn body(url: impl Into<String>, source: reqwest::Error) -> Self {
        let cause = if source.is_timeout() {
            FetchCause::Timeout
        } else {
            FetchCause::Body(source)
        };
        Self::Fetch {
            url: url.into(),
            cause,
        }
    }

    /// Folds redirect-handling failures into a [`ScrapeError::Fetch`] for `url`.
    ///
    /// Used where a bad redirect only affects one page, not the session.
    /// Other errors pass through unchanged.
    #[must_use]
    pub fn into_page_fetch(self, url: &str) -> Self {
        match self {
            Self::RedirectLoop { .. } | Self::ProtocolShape { .. } => Self::Fetch {
                url: url.to_string(),
                cause: FetchCause::Redirect(self.to_string()),
            },
            other => other,
        }
    }

    /// Creates an export IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true when retrying the same call may succeed.
    ///
    /// Only transient fetch failures qualify. Structural, authentication, and
    /// usage errors will repeat until something outside the call changes.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Stable short label for logs and summaries.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProtocolShape { .. } => ErrorKind::ProtocolShape,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::RedirectLoop { .. } => ErrorKind::RedirectLoop,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::Io { .. } => ErrorKind::Io,
            Self::ClientBuild { .. } => ErrorKind::ClientBuild,
        }
    }
}

/// Coarse classification of [`ScrapeError`] for matching in callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ProtocolShape,
    Authentication,
    RedirectLoop,
    NotAuthenticated,
    Fetch,
    Io,
    ClientBuild,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ProtocolShape => "protocol_shape",
            Self::Authentication => "authentication",
            Self::RedirectLoop => "redirect_loop",
            Self::NotAuthenticated => "not_authenticated",
            Self::Fetch => "fetch",
            Self::Io => "io",
            Self::ClientBuild => "client_build",
        };
        f.write_str(label)
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs a URL or
// path the source error does not carry.
