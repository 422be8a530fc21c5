// ── Command issuer ──
//
// Submits an arm/disarm form and then polls until the panel reports the
// requested state. An HTTP 200 from the form post proves nothing on its
// own; only a confirmed read does. Commands are never re-submitted.

use std::time::Duration;

use tracing::{debug, info, warn};

use spc_api::{PanelCommand, PanelState, WebUiClient};

use crate::error::CoreError;

/// Confirmation of an applied command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// State read back from the panel (always the command's target).
    pub state: PanelState,
    /// Confirmation polls used, starting at 1.
    pub polls: u32,
}

/// Bounded confirmation policy for one command.
#[derive(Debug, Clone, Copy)]
pub struct CommandIssuer {
    polls: u32,
    interval: Duration,
}

impl CommandIssuer {
    pub fn new(polls: u32, interval: Duration) -> Self {
        Self {
            polls: polls.max(1),
            interval,
        }
    }

    /// Submit `command` and wait for the panel to converge on its target.
    ///
    /// Every confirmation read is handed to `observe` before it is judged,
    /// so the caller can publish it like a scheduled poll. `last_known` is
    /// reported in [`CoreError::CommandTimeout`] when no read succeeds.
    pub async fn issue<F>(
        &self,
        client: &mut WebUiClient,
        command: PanelCommand,
        last_known: PanelState,
        mut observe: F,
    ) -> Result<Ack, CoreError>
    where
        F: FnMut(&Result<PanelState, spc_api::Error>) + Send,
    {
        let target = command.target_state();
        client.submit_command(command).await?;

        let mut last_state = last_known;
        for poll in 1..=self.polls {
            if poll > 1 {
                tokio::time::sleep(self.interval).await;
            }

            let result = client.read_state().await;
            observe(&result);

            match result {
                Ok(state) if state == target => {
                    info!(%command, %state, polls = poll, "command confirmed");
                    return Ok(Ack { state, polls: poll });
                }
                Ok(state) => {
                    debug!(%command, %state, poll, "panel has not converged yet");
                    last_state = state;
                }
                Err(e) if e.is_transient() || e.is_parse() => {
                    warn!(%command, poll, error = %e, "confirmation poll failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(%command, %last_state, polls = self.polls, "command not confirmed");
        Err(CoreError::CommandTimeout {
            command,
            last_state,
        })
    }
}
