//! CLI flag overrides on top of `spc-config` profiles.
//!
//! This is the single boundary where CLI inputs cross into
//! `spc_core::PanelConfig`.

use std::time::Duration;

use spc_config::{Config, Profile};
use spc_core::{PanelConfig, TlsPolicy};

use crate::cli::{GlobalOpts, TlsArg};
use crate::error::CliError;

/// Name used when the panel is addressed by `--url` alone.
const ADHOC_PROFILE: &str = "default";

/// Resolve the profile to use, falling back to an ad-hoc profile built
/// from `--url` when the config has none.
fn select(global: &GlobalOpts, config: &Config) -> Result<(String, Profile), CliError> {
    match config.select_profile(global.profile.as_deref()) {
        Ok((name, profile)) => Ok((name, profile.clone())),
        Err(err) => match global.url {
            Some(ref url) if global.profile.is_none() => Ok((
                ADHOC_PROFILE.into(),
                Profile {
                    url: url.clone(),
                    ..Profile::default()
                },
            )),
            _ => Err(err.into()),
        },
    }
}

/// Build a `PanelConfig` from the config file, profile, and CLI overrides.
pub fn build_panel_config(global: &GlobalOpts) -> Result<(String, PanelConfig), CliError> {
    let config = spc_config::load_config()?;
    let (name, mut profile) = select(global, &config)?;

    // Flag > env > profile
    if let Some(ref url) = global.url {
        profile.url.clone_from(url);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }

    let mut panel = spc_config::profile_to_panel_config(&profile, &name, &config.defaults)?;

    if let Some(secs) = global.timeout {
        panel.timeout = Duration::from_secs(secs);
    }
    match global.tls {
        Some(TlsArg::Legacy) if matches!(panel.tls, TlsPolicy::SystemDefaults) => {
            panel.tls = TlsPolicy::default();
        }
        Some(TlsArg::System) => panel.tls = TlsPolicy::SystemDefaults,
        _ => {}
    }

    panel.validate()?;
    Ok((name, panel))
}
