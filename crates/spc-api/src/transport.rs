// Legacy transport for the SPC Web UI.
//
// The panel only speaks TLS 1.2 with an RSA key-exchange cipher and never
// upgraded to secure renegotiation. Those relaxations are applied to a
// connector owned by one `LegacyTlsTransport`, which is bound to one panel
// URL; nothing here touches process-wide TLS defaults.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use http::header::{CONNECTION, CONTENT_TYPE, COOKIE, HOST, LOCATION, SET_COOKIE, USER_AGENT};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use openssl::error::ErrorStack;
use openssl::ssl::{SslConnector, SslMethod, SslOptions, SslVerifyMode, SslVersion};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_openssl::SslStream;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;

/// The only cipher suite SPC controllers offer (`TLS_RSA_WITH_AES_256_CBC_SHA`).
pub const LEGACY_CIPHER_LIST: &str = "AES256-SHA";

const USER_AGENT_VALUE: &str = concat!("spcctl/", env!("CARGO_PKG_VERSION"));
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// TLS negotiation mode for the panel connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS 1.2 only, restricted cipher list, unsafe legacy renegotiation
    /// allowed, no certificate or hostname verification.
    Legacy {
        cipher_list: String,
        /// OpenSSL security level for this connector (0 admits 1024-bit RSA
        /// certificates and SHA-1 MACs).
        security_level: u32,
    },
    /// Library defaults with full verification (panel behind a modern proxy).
    System,
}

impl Default for TlsMode {
    fn default() -> Self {
        Self::Legacy {
            cipher_list: LEGACY_CIPHER_LIST.into(),
            security_level: 0,
        }
    }
}

/// Shared transport configuration for building panel transports.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Upper bound for one exchange: connect, handshake, request, full body.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build the OpenSSL connector for this config.
    pub fn build_connector(&self) -> Result<SslConnector, Error> {
        let mut builder = SslConnector::builder(SslMethod::tls_client()).map_err(tls_error)?;

        match &self.tls {
            TlsMode::System => {}
            TlsMode::Legacy {
                cipher_list,
                security_level,
            } => {
                builder
                    .set_min_proto_version(Some(SslVersion::TLS1_2))
                    .map_err(tls_error)?;
                builder
                    .set_max_proto_version(Some(SslVersion::TLS1_2))
                    .map_err(tls_error)?;
                builder.set_security_level(*security_level);
                builder.set_cipher_list(cipher_list).map_err(tls_error)?;
                builder.set_options(SslOptions::ALLOW_UNSAFE_LEGACY_RENEGOTIATION);
                builder.set_verify(SslVerifyMode::NONE);
            }
        }

        Ok(builder.build())
    }

    fn verifies_peer(&self) -> bool {
        matches!(self.tls, TlsMode::System)
    }
}

// ── Request / response ──────────────────────────────────────────────

/// One HTTP exchange against the panel, addressed by origin-form path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRequest {
    pub method: Method,
    /// Path and query, e.g. `/secure.htm?session=0x1A&page=system_summary`.
    pub path: String,
    /// `application/x-www-form-urlencoded` body.
    pub form: Option<String>,
    /// `Cookie` header value carrying session cookies, if the panel set any.
    pub cookie: Option<String>,
}

impl PanelRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            form: None,
            cookie: None,
        }
    }

    pub fn post_form(path: impl Into<String>, form: String) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            form: Some(form),
            cookie: None,
        }
    }

    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }
}

/// Fully buffered panel response. Redirects are returned as-is.
#[derive(Debug, Clone)]
pub struct PanelResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl PanelResponse {
    /// Target of a redirect, if any.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// `name=value` pairs from every `Set-Cookie` header (attributes dropped).
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .map(|pair| pair.trim().to_owned())
            .filter(|pair| pair.contains('='))
            .collect()
    }
}

// ── Transport seam ──────────────────────────────────────────────────

/// A single-target transport to the panel.
///
/// Implementations must not retry: the caller distinguishes transient
/// network failures from protocol-level rejection.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PanelRequest) -> Result<PanelResponse, Error>;
}

/// Production transport: one TCP (+ legacy TLS) connection per exchange.
pub struct LegacyTlsTransport {
    host: String,
    port: u16,
    default_port: bool,
    tls: Option<SslConnector>,
    verify_hostname: bool,
    timeout: Duration,
}

impl LegacyTlsTransport {
    /// Bind a transport to the panel at `base_url`.
    ///
    /// `https` URLs get the configured TLS connector; `http` URLs are served
    /// over plain TCP.
    pub fn new(base_url: &Url, config: &TransportConfig) -> Result<Self, Error> {
        let tls = match base_url.scheme() {
            "https" => Some(config.build_connector()?),
            "http" => None,
            other => {
                return Err(Error::InvalidRequest(format!(
                    "unsupported URL scheme '{other}'"
                )));
            }
        };

        let host = base_url
            .host_str()
            .ok_or_else(|| Error::InvalidRequest(format!("URL has no host: {base_url}")))?
            .to_owned();
        let port = base_url
            .port_or_known_default()
            .ok_or_else(|| Error::InvalidRequest(format!("URL has no port: {base_url}")))?;

        Ok(Self {
            host,
            port,
            default_port: base_url.port().is_none(),
            tls,
            verify_hostname: config.verifies_peer(),
            timeout: config.timeout,
        })
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn host_header(&self) -> String {
        if self.default_port {
            self.host.clone()
        } else {
            self.addr()
        }
    }

    /// Host name for SNI / verification (IPv6 literals lose their brackets).
    fn server_name(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    async fn exchange(&self, request: PanelRequest) -> Result<PanelResponse, Error> {
        let addr = self.addr();
        debug!(method = %request.method, path = %request.path, "panel request");

        let http_request = self.build_request(request)?;
        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|source| Error::Connect { addr, source })?;

        match &self.tls {
            Some(connector) => {
                let stream = self.handshake(connector, tcp).await?;
                send_over(stream, http_request).await
            }
            None => send_over(tcp, http_request).await,
        }
    }

    async fn handshake(
        &self,
        connector: &SslConnector,
        tcp: TcpStream,
    ) -> Result<SslStream<TcpStream>, Error> {
        let ssl = connector
            .configure()
            .map_err(tls_error)?
            .verify_hostname(self.verify_hostname)
            .into_ssl(self.server_name())
            .map_err(tls_error)?;

        let mut stream = SslStream::new(ssl, tcp).map_err(tls_error)?;
        Pin::new(&mut stream)
            .connect()
            .await
            .map_err(|e| Error::Tls(format!("handshake with {} failed: {e}", self.addr())))?;

        if let Some(cipher) = stream.ssl().current_cipher() {
            trace!(
                cipher = cipher.name(),
                version = stream.ssl().version_str(),
                "TLS established"
            );
        }
        Ok(stream)
    }

    fn build_request(&self, request: PanelRequest) -> Result<Request<Full<Bytes>>, Error> {
        let mut builder = Request::builder()
            .method(request.method)
            .uri(request.path.as_str())
            .header(HOST, self.host_header())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(CONNECTION, "close");

        if let Some(cookie) = request.cookie {
            builder = builder.header(COOKIE, cookie);
        }

        let body = match request.form {
            Some(form) => {
                builder = builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE);
                Bytes::from(form)
            }
            None => Bytes::new(),
        };

        builder
            .body(Full::new(body))
            .map_err(|e| Error::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl Transport for LegacyTlsTransport {
    async fn send(&self, request: PanelRequest) -> Result<PanelResponse, Error> {
        tokio::time::timeout(self.timeout, self.exchange(request))
            .await
            .map_err(|_| Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })?
    }
}

/// Run one HTTP/1.1 request over an established stream and buffer the reply.
async fn send_over<S>(stream: S, request: Request<Full<Bytes>>) -> Result<PanelResponse, Error>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            trace!(error = %e, "panel connection closed with error");
        }
    });

    let response = sender.send_request(request).await?;
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await?.to_bytes();

    trace!(status = %parts.status, len = bytes.len(), "panel response");

    let body = decode_body(&parts.headers, &bytes);
    Ok(PanelResponse {
        status: parts.status,
        headers: parts.headers,
        body,
    })
}

/// Decode a page using its declared charset.
///
/// SPC firmware serves ISO-8859-1, usually without saying so. Bodies that
/// are not valid UTF-8 are read as Windows-1252 (the WHATWG mapping of
/// `iso-8859-1`), even when the header claims UTF-8.
fn decode_body(headers: &HeaderMap, bytes: &[u8]) -> String {
    let declared = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let encoding = if declared == UTF_8 && std::str::from_utf8(bytes).is_err() {
        WINDOWS_1252
    } else {
        declared
    };

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"'))
}

fn tls_error(err: ErrorStack) -> Error {
    Error::Tls(err.to_string())
}
