use thiserror::Error;

/// Top-level error type for the `spc-api` crate.
///
/// Covers every failure mode between the adapter and the panel: the legacy
/// TLS exchange, the Web UI session, markup scraping, and form submission.
/// `spc-core` folds these into its four-way taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong credentials, locked user, no session marker).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The panel kept answering with its login page, even right after a
    /// fresh login.
    #[error("Session expired -- panel rejected a freshly established session")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// TCP connection could not be established.
    #[error("Cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// TLS handshake or connector configuration error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// HTTP/1 protocol error on an established connection.
    #[error("HTTP transport error: {0}")]
    Http(#[from] hyper::Error),

    /// Exchange did not finish within the transport timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request could not be assembled (bad header value, bad path).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ── Web UI ──────────────────────────────────────────────────────
    /// The status page did not contain a state the adapter can confirm.
    #[error("Unexpected panel response: {0}")]
    Parse(#[from] ParseError),

    /// The panel refused a form submission at the HTTP level.
    #[error("Panel rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Why a status page could not be turned into a [`PanelState`](crate::PanelState).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The area row or its state token is missing from the page.
    #[error("no '{marker}' state marker found (body preview: {preview:?})")]
    MarkerNotFound { marker: String, preview: String },

    /// A state token was found but is not one the adapter models.
    #[error("unsupported area state '{found}'")]
    UnsupportedState { found: String },
}

impl Error {
    /// Returns `true` if this error indicates the session is gone
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` for credential rejection, which retrying cannot fix.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient network error worth retrying
    /// on the next poll.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Tls(_) | Self::Http(_) | Self::Timeout { .. }
        )
    }

    /// Returns `true` if the panel answered but with markup we cannot read.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
