// Arm / disarm submission
//
// The Web UI gives no synchronous confirmation beyond the HTTP status, so a
// successful submission here only means the panel took the form. Whether it
// acted is for the caller to confirm by reading the state back.

use tracing::{debug, warn};

use crate::error::Error;
use crate::model::PanelCommand;
use crate::webui::client::{WebUiClient, WebUiRequest};

const REJECTION_PREVIEW_LEN: usize = 200;

impl WebUiClient {
    /// Submit the "All Areas" form for `command`.
    ///
    /// `Ok` is provisional acceptance. HTTP 4xx/5xx are returned as
    /// [`Error::Rejected`]. Never retried here.
    pub async fn submit_command(&mut self, command: PanelCommand) -> Result<(), Error> {
        debug!(%command, "submitting command");

        let response = self
            .send_authenticated(WebUiRequest::Command(command))
            .await?;

        let status = response.status;
        if status.is_client_error() || status.is_server_error() {
            warn!(%command, %status, "panel rejected command");
            return Err(Error::Rejected {
                status: status.as_u16(),
                message: response.body.chars().take(REJECTION_PREVIEW_LEN).collect(),
            });
        }

        debug!(%command, %status, "command accepted provisionally");
        Ok(())
    }
}
