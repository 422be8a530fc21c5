// Web UI session lifecycle
//
// The panel hands out a session id in the post-login redirect (some
// firmware also sets cookies). There is no expiry contract: a session is
// valid until a request comes back as the login page.

use secrecy::ExposeSecret;
use tracing::{debug, info};
use url::form_urlencoded;

use crate::error::Error;
use crate::model::PanelInfo;
use crate::transport::PanelRequest;
use crate::webui::client::{Session, WebUiClient, origin_form};
use crate::webui::markup;

impl WebUiClient {
    /// Log in, replacing any session currently held.
    ///
    /// Success requires a session id in the redirect target or the page
    /// body; the Web UI answers 200 to failed logins too, so the status
    /// code alone proves nothing.
    pub async fn login(&mut self) -> Result<(), Error> {
        self.session = None;

        let endpoints = self.endpoints();
        let credentials = self.credentials();
        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair(&endpoints.username_field, &credentials.username)
            .append_pair(&endpoints.password_field, credentials.password.expose_secret())
            .finish();
        let request = PanelRequest::post_form(endpoints.login_path.clone(), form);

        debug!(user = %credentials.username, path = %endpoints.login_path, "logging in");

        let response = self.transport().send(request).await?;
        let location = response.location().map(str::to_owned);

        let session_id = location
            .as_deref()
            .and_then(markup::extract_session_id)
            .or_else(|| markup::extract_session_id(&response.body));

        let Some(id) = session_id else {
            let message = if markup::is_login_page(&response.body) {
                self.rejected = true;
                "credentials rejected (login form returned)".to_owned()
            } else {
                format!("no session marker in login response (HTTP {})", response.status)
            };
            return Err(Error::Authentication { message });
        };

        let session = Session {
            id,
            cookies: response.set_cookies(),
        };

        let info = match location {
            Some(target) if response.status.is_redirection() => {
                self.fetch_landing_info(&target, &session).await
            }
            _ => markup::parse_panel_info(&response.body),
        };
        if info != PanelInfo::default() {
            self.info = info;
        }

        self.session = Some(session);
        self.rejected = false;
        self.logins += 1;
        info!(panel = %self.info.display_name(), "logged in to panel Web UI");
        Ok(())
    }

    /// Make sure a session is held, logging in if necessary.
    ///
    /// Fails without contacting the panel once the credentials have been
    /// rejected.
    pub async fn ensure_session(&mut self) -> Result<(), Error> {
        self.current_session().await.map(|_| ())
    }

    /// Drop the current session without telling the panel.
    pub fn invalidate(&mut self) {
        if self.session.take().is_some() {
            debug!("session invalidated");
        }
    }

    /// End the current session on the panel.
    ///
    /// The local session is dropped even if the logout request fails.
    pub async fn logout(&mut self) -> Result<(), Error> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        let path = self.endpoints().logout(&session.id);
        debug!(%path, "logging out");

        self.transport()
            .send(PanelRequest::get(path).with_cookie(session.cookie_header()))
            .await?;

        debug!("logout complete");
        Ok(())
    }

    pub(crate) async fn current_session(&mut self) -> Result<Session, Error> {
        if self.session.is_none() {
            if self.rejected {
                return Err(Error::Authentication {
                    message: "credentials were rejected at the last login".into(),
                });
            }
            self.login().await?;
        }
        self.session.clone().ok_or_else(|| Error::Authentication {
            message: "login completed without a session".into(),
        })
    }

    /// Follow the post-login redirect once to read panel identification.
    /// Failures are logged and yield an empty [`PanelInfo`].
    async fn fetch_landing_info(&self, location: &str, session: &Session) -> PanelInfo {
        let request =
            PanelRequest::get(origin_form(location)).with_cookie(session.cookie_header());

        match self.transport().send(request).await {
            Ok(response) if response.status.is_success() => {
                markup::parse_panel_info(&response.body)
            }
            Ok(response) => {
                debug!(status = %response.status, "landing page unavailable");
                PanelInfo::default()
            }
            Err(e) => {
                debug!(error = %e, "landing page fetch failed");
                PanelInfo::default()
            }
        }
    }
}
