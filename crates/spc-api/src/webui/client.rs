// Web UI client
//
// Owns the transport, the endpoint contract, and the one session the panel
// allows. Every authenticated request goes through `send_authenticated`,
// which re-logs in at most once when the panel bounces the session.
// Login/logout, status scraping and command submission live in sibling
// modules as inherent methods.

use std::sync::Arc;

use http::StatusCode;
use secrecy::SecretString;
use tracing::debug;
use url::Url;
use url::form_urlencoded;

use crate::error::Error;
use crate::model::{PanelCommand, PanelInfo};
use crate::transport::{LegacyTlsTransport, PanelRequest, PanelResponse, Transport, TransportConfig};
use crate::webui::endpoints::Endpoints;
use crate::webui::markup;

/// Web UI login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Authenticated context: the URL session id plus any cookies the panel set.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) id: String,
    pub(crate) cookies: Vec<String>,
}

impl Session {
    pub(crate) fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            None
        } else {
            Some(self.cookies.join("; "))
        }
    }
}

/// Authenticated requests the client knows how to build.
#[derive(Debug, Clone, Copy)]
pub(crate) enum WebUiRequest {
    Status,
    Command(PanelCommand),
}

/// Session-managing client for one panel's Web UI.
///
/// Methods that may touch the session take `&mut self`: the panel is not
/// designed for concurrent use, and exclusive access is how callers
/// serialize requests.
pub struct WebUiClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    credentials: Credentials,
    pub(crate) session: Option<Session>,
    pub(crate) info: PanelInfo,
    pub(crate) logins: u64,
    pub(crate) rejected: bool,
}

impl WebUiClient {
    /// Create a client talking to `base_url` through a [`LegacyTlsTransport`].
    pub fn new(
        base_url: &Url,
        credentials: Credentials,
        endpoints: Endpoints,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let transport = LegacyTlsTransport::new(base_url, transport)?;
        Ok(Self::with_transport(Arc::new(transport), credentials, endpoints))
    }

    /// Create a client over an existing transport.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        credentials: Credentials,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            transport,
            endpoints,
            credentials,
            session: None,
            info: PanelInfo::default(),
            logins: 0,
            rejected: false,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Identification captured at the last successful login.
    pub fn panel_info(&self) -> &PanelInfo {
        &self.info
    }

    /// Whether a session is currently held (it may still be expired panel-side).
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the panel refused the credentials at the last login.
    ///
    /// While set, no request logs in implicitly; only an explicit
    /// [`login()`](Self::login) posts the credentials again.
    pub fn credentials_rejected(&self) -> bool {
        self.rejected
    }

    /// Number of successful logins performed by this client.
    pub fn login_count(&self) -> u64 {
        self.logins
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated request, re-authenticating once if the panel
    /// answers as though the session were gone.
    ///
    /// A session bounced again right after a fresh login is reported as
    /// [`Error::SessionExpired`]; no further attempt is made.
    pub(crate) async fn send_authenticated(
        &mut self,
        kind: WebUiRequest,
    ) -> Result<PanelResponse, Error> {
        let request = self.prepare(kind).await?;
        let response = self.transport.send(request).await?;
        if !is_unauthenticated(&response) {
            return Ok(response);
        }

        debug!(?kind, "session rejected by panel, re-authenticating");
        self.invalidate();

        let request = self.prepare(kind).await?;
        let response = self.transport.send(request).await?;
        if is_unauthenticated(&response) {
            self.invalidate();
            return Err(Error::SessionExpired);
        }
        Ok(response)
    }

    async fn prepare(&mut self, kind: WebUiRequest) -> Result<PanelRequest, Error> {
        let session = self.current_session().await?;
        Ok(self.build(kind, &session))
    }

    fn build(&self, kind: WebUiRequest, session: &Session) -> PanelRequest {
        let request = match kind {
            WebUiRequest::Status => PanelRequest::get(self.endpoints.status(&session.id)),
            WebUiRequest::Command(command) => {
                let field = self.endpoints.command_field(command);
                let form = form_urlencoded::Serializer::new(String::new())
                    .append_pair(&field.name, &field.value)
                    .finish();
                PanelRequest::post_form(self.endpoints.command(&session.id), form)
            }
        };
        request.with_cookie(session.cookie_header())
    }
}

/// The panel signals a dead session by a 401/403, a redirect to the login
/// page, or by serving the login form in place of the requested page.
pub(crate) fn is_unauthenticated(response: &PanelResponse) -> bool {
    if matches!(
        response.status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    ) {
        return true;
    }
    if response.status.is_redirection() {
        return response
            .location()
            .is_some_and(|target| target.to_ascii_lowercase().contains("login"));
    }
    markup::is_login_page(&response.body)
}

/// Convert a redirect target into an origin-form path on the same panel.
pub(crate) fn origin_form(location: &str) -> String {
    if let Ok(url) = Url::parse(location) {
        return match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_owned(),
        };
    }
    if location.starts_with('/') {
        location.to_owned()
    } else {
        format!("/{location}")
    }
}
