// ── Runtime panel configuration ──
//
// These types describe *how* to talk to one SPC panel. They carry
// credential data and timing knobs, but never touch disk. The CLI (or any
// other host) builds a `PanelConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use spc_api::transport::LEGACY_CIPHER_LIST;
use spc_api::{Endpoints, TlsMode, TransportConfig};

use crate::error::CoreError;

/// TLS negotiation policy for the panel connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsPolicy {
    /// TLS 1.2, a single legacy RSA cipher, no certificate checks.
    /// Required by every SPC controller firmware seen so far.
    Legacy {
        cipher_list: String,
        security_level: u32,
    },
    /// Full verification with library defaults (panel behind a proxy).
    SystemDefaults,
}

impl Default for TlsPolicy {
    fn default() -> Self {
        Self::Legacy {
            cipher_list: LEGACY_CIPHER_LIST.into(),
            security_level: 0,
        }
    }
}

/// Configuration for one panel.
///
/// Built by the host, passed to [`Controller`](crate::Controller) -- core
/// never reads config files.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Panel Web UI base URL (e.g. `https://192.168.1.100`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsPolicy,
    /// Bound for a single HTTP exchange.
    pub timeout: Duration,
    /// Interval between scheduled status polls.
    pub poll_interval: Duration,
    /// Polls allowed to observe a commanded state before giving up.
    pub confirmation_polls: u32,
    /// Pause between confirmation polls.
    pub confirmation_interval: Duration,
    /// Consecutive failed polls before the panel is reported unavailable.
    pub failure_threshold: u32,
    /// Upper bound for a whole command, including the wait for the lock.
    pub command_timeout: Duration,
    pub endpoints: Endpoints,
}

impl PanelConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
    pub const DEFAULT_CONFIRMATION_POLLS: u32 = 3;
    pub const DEFAULT_CONFIRMATION_INTERVAL: Duration = Duration::from_secs(5);
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
    pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

    /// Config with default timing, legacy TLS and stock endpoints.
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            username: username.into(),
            password,
            tls: TlsPolicy::default(),
            timeout: Self::DEFAULT_TIMEOUT,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            confirmation_polls: Self::DEFAULT_CONFIRMATION_POLLS,
            confirmation_interval: Self::DEFAULT_CONFIRMATION_INTERVAL,
            failure_threshold: Self::DEFAULT_FAILURE_THRESHOLD,
            command_timeout: Self::DEFAULT_COMMAND_TIMEOUT,
            endpoints: Endpoints::default(),
        }
    }

    /// Reject values that would stall the scheduler or never confirm.
    pub fn validate(&self) -> Result<(), CoreError> {
        let problem = if self.poll_interval.is_zero() {
            "poll interval must be greater than zero"
        } else if self.confirmation_polls == 0 {
            "confirmation window must allow at least one poll"
        } else if self.failure_threshold == 0 {
            "failure threshold must be at least 1"
        } else if self.timeout.is_zero() || self.command_timeout.is_zero() {
            "timeouts must be greater than zero"
        } else if !matches!(self.url.scheme(), "https" | "http") {
            "panel URL must use https (or http behind a proxy)"
        } else {
            return Ok(());
        };
        Err(CoreError::Config {
            message: problem.into(),
        })
    }

    /// Transport settings derived from this config.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: tls_to_transport(&self.tls),
            timeout: self.timeout,
        }
    }
}

fn tls_to_transport(tls: &TlsPolicy) -> TlsMode {
    match tls {
        TlsPolicy::Legacy {
            cipher_list,
            security_level,
        } => TlsMode::Legacy {
            cipher_list: cipher_list.clone(),
            security_level: *security_level,
        },
        TlsPolicy::SystemDefaults => TlsMode::System,
    }
}
