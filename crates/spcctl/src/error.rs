//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and distinct exit codes.

use miette::Diagnostic;
use thiserror::Error;

use spc_config::ConfigError;
use spc_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const PARSE: i32 = 9;
    pub const COMMAND: i32 = 10;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to panel at {url}")]
    #[diagnostic(
        code(spcctl::connection_failed),
        help(
            "Check that the panel is powered, reachable, and its Web UI is enabled.\n\
             Panels only speak TLS 1.2 with AES256-SHA; keep --tls legacy unless\n\
             the panel sits behind a proxy."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Lost the connection to the panel: {message}")]
    #[diagnostic(
        code(spcctl::transport),
        help(
            "The panel accepted the connection but the exchange failed.\n\
             A handshake failure usually means the TLS mode does not match the\n\
             panel: use --tls legacy for a direct connection."
        )
    )]
    Transport { message: String },

    #[error("Panel did not answer within {seconds}s")]
    #[diagnostic(
        code(spcctl::timeout),
        help("Increase the timeout with --timeout or check the panel's network link.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(spcctl::auth_failed),
        help(
            "Verify the Web UI user and password for profile '{profile}'.\n\
             The panel allows a single Web UI session per user; log out of the\n\
             browser UI if it is open."
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(spcctl::no_credentials),
        help(
            "Set username/password in the profile, store the password in the system\n\
             keyring (service 'spcctl', user '{profile}/password'), or export\n\
             SPC_USERNAME and SPC_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Panel responses ──────────────────────────────────────────────
    #[error("Could not read the panel state: {message}")]
    #[diagnostic(
        code(spcctl::parse),
        help(
            "The status page did not show a recognizable \"All Areas\" state.\n\
             The panel may be busy, partially set, or running firmware with a\n\
             different page layout (see [profiles.<name>.endpoints])."
        )
    )]
    Parse { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(spcctl::command_failed),
        help("The panel state was not changed as requested. Check it with: spcctl status")
    )]
    CommandFailed { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(spcctl::profile_not_found),
        help("Expected at: {path}\nOr pass --url to talk to a panel without a profile.")
    )]
    ProfileNotFound { name: String, path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(spcctl::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(spcctl::config))]
    Config(ConfigError),

    // ── Serialization ─────────────────────────────────────────────────
    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(spcctl::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Transport { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Parse { .. } => exit_code::PARSE,
            Self::CommandFailed { .. } => exit_code::COMMAND,
            Self::ProfileNotFound { .. } | Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to authentication failures.
    pub fn for_profile(self, name: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: name.into(),
                message,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },
            CoreError::Transport { reason } => CliError::Transport { message: reason },
            CoreError::NotConnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                source: "panel connection was closed".into(),
            },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },
            CoreError::Parse(e) => CliError::Parse {
                message: e.to_string(),
            },
            err @ (CoreError::CommandTimeout { .. } | CoreError::CommandRejected { .. }) => {
                CliError::CommandFailed {
                    message: err.to_string(),
                }
            }
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                path: spc_config::config_path().display().to_string(),
            },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
