// spc-api: Async Rust client for the Vanderbilt SPC Web UI.
//
// Layers, leaves first: `transport` (legacy TLS exchange with one panel),
// `webui` (session handling, status scraping, command submission).

pub mod error;
pub mod model;
pub mod transport;
pub mod webui;

pub use error::{Error, ParseError};
pub use model::{PanelCommand, PanelInfo, PanelState};
pub use transport::{LegacyTlsTransport, PanelRequest, PanelResponse, TlsMode, Transport, TransportConfig};
pub use webui::{Credentials, Endpoints, FormField, WebUiClient};
