// Status page scraping
//
// One request, one parse. The markup rules live in `markup`; this module
// only wires them to the authenticated status page.

use tracing::debug;

use crate::error::Error;
use crate::model::PanelState;
use crate::webui::client::{WebUiClient, WebUiRequest};
use crate::webui::markup;

impl WebUiClient {
    /// Read the confirmed "All Areas" state from the status page.
    ///
    /// Returns [`Error::Parse`] whenever the page lacks a recognizable
    /// marker, including error and maintenance pages served with non-2xx
    /// status codes.
    pub async fn read_state(&mut self) -> Result<PanelState, Error> {
        let response = self.send_authenticated(WebUiRequest::Status).await?;
        let state = markup::parse_area_state(&response.body, &self.endpoints().area_label)?;
        debug!(%state, status = %response.status, "panel state read");
        Ok(state)
    }
}
