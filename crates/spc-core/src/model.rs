// Host-facing view of the panel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use spc_api::PanelState;

/// Alarm state in home-automation terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlarmState {
    Disarmed,
    ArmedAway,
}

impl AlarmState {
    /// `None` while the panel state is not confirmed.
    pub fn from_panel(state: PanelState) -> Option<Self> {
        match state {
            PanelState::Unset => Some(Self::Disarmed),
            PanelState::Fullset => Some(Self::ArmedAway),
            PanelState::Unknown => None,
        }
    }
}

/// What the scheduler publishes after every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelSnapshot {
    /// Last confirmed state. Kept across failed polls.
    pub state: PanelState,
    /// False before the first confirmed read and while faulted.
    pub available: bool,
    pub consecutive_failures: u32,
    /// When `state` was last confirmed.
    pub updated_at: Option<DateTime<Utc>>,
    /// Message of the most recent failed poll, cleared by a success.
    pub last_error: Option<String>,
}

impl Default for PanelSnapshot {
    fn default() -> Self {
        Self {
            state: PanelState::Unknown,
            available: false,
            consecutive_failures: 0,
            updated_at: None,
            last_error: None,
        }
    }
}

impl PanelSnapshot {
    /// The state a host should display: `Unknown` unless available.
    pub fn effective_state(&self) -> PanelState {
        if self.available {
            self.state
        } else {
            PanelState::Unknown
        }
    }

    pub fn alarm_state(&self) -> Option<AlarmState> {
        AlarmState::from_panel(self.effective_state())
    }
}

/// Where the poll scheduler currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SchedulerPhase {
    /// Waiting for the next tick or a command.
    #[default]
    Idle,
    /// A request against the panel is in flight.
    Polling,
    /// Publishing the result of a successful read.
    Reconciling,
    /// Failure threshold reached; polling continues at the normal interval.
    Faulted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_panel_states_for_hosts() {
        assert_eq!(AlarmState::from_panel(PanelState::Unset), Some(AlarmState::Disarmed));
        assert_eq!(AlarmState::from_panel(PanelState::Fullset), Some(AlarmState::ArmedAway));
        assert_eq!(AlarmState::from_panel(PanelState::Unknown), None);
        assert_eq!(AlarmState::ArmedAway.to_string(), "armed_away");
    }

    #[test]
    fn unavailable_snapshot_hides_stale_state() {
        let snapshot = PanelSnapshot {
            state: PanelState::Fullset,
            available: false,
            consecutive_failures: 3,
            updated_at: None,
            last_error: Some("timed out".into()),
        };
        assert_eq!(snapshot.effective_state(), PanelState::Unknown);
        assert_eq!(snapshot.alarm_state(), None);
    }
}
