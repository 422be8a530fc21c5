// Raw panel values shared by the Web UI layer and its consumers.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Arming state of the "All Areas" group as confirmed from the Web UI.
///
/// `Unknown` is never produced by the scraper; it is the value consumers
/// publish before the first confirmed read or while the panel is unreachable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum PanelState {
    Unset,
    Fullset,
    #[default]
    Unknown,
}

impl PanelState {
    /// Whether this is a state read back from the panel (not a placeholder).
    pub fn is_confirmed(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// A state-changing request against "All Areas".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum PanelCommand {
    /// Fullset all areas.
    Arm,
    /// Unset all areas.
    Disarm,
}

impl PanelCommand {
    /// The state the panel must report before the command counts as applied.
    pub fn target_state(self) -> PanelState {
        match self {
            Self::Arm => PanelState::Fullset,
            Self::Disarm => PanelState::Unset,
        }
    }
}

/// Identification scraped from the post-login landing page.
///
/// Every field is best effort: firmware versions differ in what they show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelInfo {
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub site: Option<String>,
}

impl PanelInfo {
    /// Human-readable device name: site, then model, then a generic label.
    pub fn display_name(&self) -> &str {
        self.site
            .as_deref()
            .or(self.model.as_deref())
            .unwrap_or("SPC Panel")
    }
}
