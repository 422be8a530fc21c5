//! Shared configuration for spcctl and other hosts.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `spc_core::PanelConfig`. The CLI layers its flag
//! overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use spc_core::{Endpoints, PanelConfig, TlsPolicy};

/// Keyring service name under which panel passwords are stored.
pub const KEYRING_SERVICE: &str = "spcctl";

const ENV_PREFIX: &str = "SPC_";
const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    ProfileNotFound { name: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named panel profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

/// Timing defaults applied to every profile that does not override them.
/// Durations are in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    #[serde(default = "default_confirmation_polls")]
    pub confirmation_polls: u32,

    #[serde(default = "default_confirmation_interval")]
    pub confirmation_interval: u64,

    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
            confirmation_polls: default_confirmation_polls(),
            confirmation_interval: default_confirmation_interval(),
            failure_threshold: default_failure_threshold(),
            command_timeout: default_command_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    PanelConfig::DEFAULT_TIMEOUT.as_secs()
}
fn default_poll_interval() -> u64 {
    PanelConfig::DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_confirmation_polls() -> u32 {
    PanelConfig::DEFAULT_CONFIRMATION_POLLS
}
fn default_confirmation_interval() -> u64 {
    PanelConfig::DEFAULT_CONFIRMATION_INTERVAL.as_secs()
}
fn default_failure_threshold() -> u32 {
    PanelConfig::DEFAULT_FAILURE_THRESHOLD
}
fn default_command_timeout() -> u64 {
    PanelConfig::DEFAULT_COMMAND_TIMEOUT.as_secs()
}

/// A named panel profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Panel Web UI base URL (e.g., "https://192.168.1.100").
    pub url: String,

    /// Web UI user (an engineer or user code login).
    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// TLS mode: "legacy" (default) or "system".
    pub tls: Option<String>,

    /// OpenSSL cipher list for legacy mode.
    pub cipher_list: Option<String>,

    /// OpenSSL security level for legacy mode.
    pub security_level: Option<u32>,

    pub timeout: Option<u64>,
    pub poll_interval: Option<u64>,
    pub confirmation_polls: Option<u32>,
    pub confirmation_interval: Option<u64>,
    pub failure_threshold: Option<u32>,
    pub command_timeout: Option<u64>,

    /// Web UI paths and form fields, for firmware that differs from the
    /// stock layout.
    pub endpoints: Option<Endpoints>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "spc-webui", "spcctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("spcctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` + `SPC_` environment variables.
///
/// Nested keys use a double underscore: `SPC_DEFAULTS__POLL_INTERVAL=10`.
/// A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

impl Config {
    /// Pick a profile: the explicit `name`, else `default_profile`, else
    /// the only profile if there is exactly one.
    pub fn select_profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = match name {
            Some(name) => name.to_owned(),
            None => self.implicit_profile()?,
        };

        let profile = self
            .profiles
            .get(&name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.clone() })?;
        Ok((name, profile))
    }

    fn implicit_profile(&self) -> Result<String, ConfigError> {
        if let Some(ref name) = self.default_profile {
            if self.profiles.contains_key(name) {
                return Ok(name.clone());
            }
        }
        let mut names = self.profiles.keys();
        match (names.next(), names.next()) {
            (Some(only), None) => Ok(only.clone()),
            (None, _) => Err(ConfigError::ProfileNotFound {
                name: self.default_profile.clone().unwrap_or_else(|| "default".into()),
            }),
            (Some(_), Some(_)) => Err(ConfigError::Validation {
                field: "profile".into(),
                reason: "several profiles configured; pass --profile or set default_profile"
                    .into(),
            }),
        }
    }

    /// Render as TOML with every stored password replaced.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut redacted = self.clone();
        for profile in redacted.profiles.values_mut() {
            if profile.password.is_some() {
                profile.password = Some(REDACTED.into());
            }
        }
        Ok(toml::to_string_pretty(&redacted)?)
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Keyring user under which the password of `profile_name` is stored.
pub fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/password")
}

/// Resolve the Web UI username: profile, then `SPC_USERNAME`.
pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var(format!("{ENV_PREFIX}USERNAME")).ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Resolve the Web UI password.
///
/// Order: the profile's `password_env` variable, `SPC_PASSWORD`, the
/// system keyring, then plaintext in the profile.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        |user| {
            keyring::Entry::new(KEYRING_SERVICE, user)
                .and_then(|entry| entry.get_password())
                .ok()
        },
    )
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(pw) = profile.password_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(pw));
    }

    // 2. Global env var
    if let Some(pw) = env(&format!("{ENV_PREFIX}PASSWORD")) {
        return Ok(SecretString::from(pw));
    }

    // 3. System keyring
    if let Some(pw) = keyring(&keyring_user(profile_name)) {
        return Ok(SecretString::from(pw));
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation to PanelConfig ──────────────────────────────────────

fn resolve_tls(profile: &Profile) -> Result<TlsPolicy, ConfigError> {
    match profile.tls.as_deref().unwrap_or("legacy") {
        "legacy" => {
            let mut policy = TlsPolicy::default();
            if let TlsPolicy::Legacy {
                cipher_list,
                security_level,
            } = &mut policy
            {
                if let Some(ref list) = profile.cipher_list {
                    cipher_list.clone_from(list);
                }
                if let Some(level) = profile.security_level {
                    *security_level = level;
                }
            }
            Ok(policy)
        }
        "system" => Ok(TlsPolicy::SystemDefaults),
        other => Err(ConfigError::Validation {
            field: "tls".into(),
            reason: format!("expected 'legacy' or 'system', got '{other}'"),
        }),
    }
}

/// Build a `PanelConfig` from a profile and the global defaults.
pub fn profile_to_panel_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<PanelConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;

    let username = resolve_username(profile, profile_name)?;
    let password = resolve_password(profile, profile_name)?;

    build_panel_config(profile, url, username, password, defaults)
}

fn build_panel_config(
    profile: &Profile,
    url: url::Url,
    username: String,
    password: SecretString,
    defaults: &Defaults,
) -> Result<PanelConfig, ConfigError> {
    let secs = |value: Option<u64>, fallback: u64| Duration::from_secs(value.unwrap_or(fallback));

    let mut config = PanelConfig::new(url, username, password);
    config.tls = resolve_tls(profile)?;
    config.timeout = secs(profile.timeout, defaults.timeout);
    config.poll_interval = secs(profile.poll_interval, defaults.poll_interval);
    config.confirmation_polls = profile
        .confirmation_polls
        .unwrap_or(defaults.confirmation_polls);
    config.confirmation_interval =
        secs(profile.confirmation_interval, defaults.confirmation_interval);
    config.failure_threshold = profile
        .failure_threshold
        .unwrap_or(defaults.failure_threshold);
    config.command_timeout = secs(profile.command_timeout, defaults.command_timeout);
    if let Some(ref endpoints) = profile.endpoints {
        config.endpoints = endpoints.clone();
    }

    config.validate().map_err(|e| ConfigError::Validation {
        field: "profile".into(),
        reason: e.to_string(),
    })?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "home"

[defaults]
poll_interval = 15

[profiles.home]
url = "https://192.168.1.100"
username = "engineer"
password = "1111"

[profiles.office]
url = "https://10.0.0.5:8443"
username = "manager"
password_env = "OFFICE_SPC_PASSWORD"
tls = "system"
failure_threshold = 5

[profiles.office.endpoints]
area_label = "Alle Bereiche"
"#;

    fn write_sample() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE.as_bytes()).expect("write config");
        file
    }

    fn none(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn loads_profiles_from_toml() {
        let file = write_sample();
        let config = load_config_from(file.path()).expect("config loads");

        assert_eq!(config.default_profile.as_deref(), Some("home"));
        assert_eq!(config.defaults.poll_interval, 15);
        assert_eq!(config.defaults.timeout, 10);
        assert_eq!(config.profiles.len(), 2);

        let office = &config.profiles["office"];
        let endpoints = office.endpoints.as_ref().expect("endpoints");
        assert_eq!(endpoints.area_label, "Alle Bereiche");
        // Unspecified endpoint fields keep the stock firmware layout.
        assert_eq!(endpoints.username_field, "userid");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_config_from(&dir.path().join("absent.toml")).expect("defaults");
        assert!(config.profiles.is_empty());
        assert_eq!(config.defaults.command_timeout, 120);
    }

    #[test]
    fn selects_default_profile() {
        let file = write_sample();
        let config = load_config_from(file.path()).expect("config loads");

        let (name, profile) = config.select_profile(None).expect("default profile");
        assert_eq!(name, "home");
        assert_eq!(profile.username.as_deref(), Some("engineer"));

        let err = config.select_profile(Some("garage")).unwrap_err();
        assert!(matches!(err, ConfigError::ProfileNotFound { .. }));
    }

    #[test]
    fn builds_panel_config_with_defaults_and_overrides() {
        let file = write_sample();
        let config = load_config_from(file.path()).expect("config loads");
        let office = &config.profiles["office"];

        let panel = build_panel_config(
            office,
            office.url.parse().expect("url"),
            "manager".into(),
            SecretString::from("x".to_string()),
            &config.defaults,
        )
        .expect("panel config");

        assert_eq!(panel.tls, TlsPolicy::SystemDefaults);
        assert_eq!(panel.failure_threshold, 5);
        assert_eq!(panel.poll_interval, Duration::from_secs(15));
        assert_eq!(panel.confirmation_polls, 3);
        assert_eq!(panel.endpoints.area_label, "Alle Bereiche");
    }

    #[test]
    fn rejects_unknown_tls_mode() {
        let profile = Profile {
            url: "https://192.168.1.100".into(),
            tls: Some("tls13".into()),
            ..Profile::default()
        };
        assert!(matches!(
            resolve_tls(&profile),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn legacy_tls_accepts_cipher_override() {
        let profile = Profile {
            cipher_list: Some("AES128-SHA".into()),
            ..Profile::default()
        };
        assert_eq!(
            resolve_tls(&profile).expect("tls"),
            TlsPolicy::Legacy {
                cipher_list: "AES128-SHA".into(),
                security_level: 0,
            }
        );
    }

    #[test]
    fn password_resolution_order() {
        let profile = Profile {
            password: Some("plain".into()),
            password_env: Some("HOME_PW".into()),
            ..Profile::default()
        };

        let env_all = |name: &str| Some(format!("env:{name}"));
        let keyring = |user: &str| Some(format!("keyring:{user}"));

        let pw = resolve_password_with(&profile, "home", env_all, keyring).expect("password");
        assert_eq!(pw.expose_secret(), "env:HOME_PW");

        let global_only = |name: &str| (name == "SPC_PASSWORD").then(|| "global".to_owned());
        let pw = resolve_password_with(&profile, "home", global_only, keyring).expect("password");
        assert_eq!(pw.expose_secret(), "global");

        let pw = resolve_password_with(&profile, "home", none, keyring).expect("password");
        assert_eq!(pw.expose_secret(), "keyring:home/password");

        let pw = resolve_password_with(&profile, "home", none, none).expect("password");
        assert_eq!(pw.expose_secret(), "plain");
    }

    #[test]
    fn missing_password_is_reported() {
        let err = resolve_password_with(&Profile::default(), "home", none, none).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { ref profile } if profile == "home"));
    }

    #[test]
    fn redacts_passwords() {
        let file = write_sample();
        let config = load_config_from(file.path()).expect("config loads");

        let rendered = config.to_redacted_toml().expect("render");
        assert!(rendered.contains(REDACTED));
        assert!(!rendered.contains("1111"));
    }
}
