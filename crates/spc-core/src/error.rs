// ── Core error types ──
//
// User-facing errors from spc-core. Consumers never see HTTP status codes
// or raw transport failures directly: the `From<spc_api::Error>` impl folds
// them into connection / authentication / parse / command failures.

use thiserror::Error;

use spc_api::{PanelCommand, PanelState, ParseError};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to panel at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// TLS handshake or HTTP framing broke on an established connection.
    #[error("Panel transport failed: {reason}")]
    Transport { reason: String },

    #[error("Panel connection timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not connected to panel")]
    NotConnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Unreadable status page: {0}")]
    Parse(ParseError),

    // ── Command errors ───────────────────────────────────────────────
    #[error("Panel did not confirm {command} (last confirmed state: {last_state})")]
    CommandTimeout {
        command: PanelCommand,
        last_state: PanelState,
    },

    #[error("Panel rejected command (HTTP {status}): {message}")]
    CommandRejected { status: u16, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Failures a later poll may clear on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::Transport { .. }
                | Self::Timeout { .. }
                | Self::Parse(_)
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<spc_api::Error> for CoreError {
    fn from(err: spc_api::Error) -> Self {
        match err {
            spc_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            spc_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "panel rejected a freshly established session".into(),
            },
            spc_api::Error::Connect { addr, source } => CoreError::ConnectionFailed {
                url: addr,
                reason: source.to_string(),
            },
            spc_api::Error::Tls(msg) => CoreError::Transport {
                reason: format!("TLS error: {msg}"),
            },
            spc_api::Error::Http(e) => CoreError::Transport {
                reason: format!("HTTP error: {e}"),
            },
            spc_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            spc_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            spc_api::Error::InvalidRequest(message) => CoreError::Config { message },
            spc_api::Error::Parse(e) => CoreError::Parse(e),
            spc_api::Error::Rejected { status, message } => {
                CoreError::CommandRejected { status, message }
            }
        }
    }
}
