// Shared transport configuration and the persistent session wrapper.
//
// Every connector owns one `Session`: a `reqwest::Client` plus the
// settings it was built from, so the client can be rebuilt in place when
// the verification policy changes. The cookie jar and default headers
// survive a rebuild.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderMap;
use reqwest::tls::Version;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;

const USER_AGENT: &str = concat!("jss-api/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for self-signed servers).
    DangerAcceptInvalid,
}

impl TlsMode {
    pub fn verifies(&self) -> bool {
        !matches!(self, Self::DangerAcceptInvalid)
    }
}

/// Shared transport configuration for building HTTP clients.
///
/// `min_tls` defaults to TLS 1.2; the server refuses older handshakes.
/// There is no timeout unless the caller sets one.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub min_tls: Version,
    pub timeout: Option<Duration>,
    pub headers: HeaderMap,
    pub cookie_jar: Option<Arc<Jar>>,
    /// CA to trust whenever verification is on, even if it starts off.
    pub ca_cert: Option<PathBuf>,
    /// Silence the warning logged when certificate checks are off.
    pub suppress_warnings: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            min_tls: Version::TLS_1_2,
            timeout: None,
            headers: HeaderMap::new(),
            cookie_jar: None,
            ca_cert: None,
            suppress_warnings: false,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .min_tls_version(self.min_tls)
            .default_headers(self.headers.clone());

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Builder: add default headers sent on every request.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// The mode used while verification is on: the current one if it
    /// verifies, otherwise the configured CA or the system store.
    pub fn verified_mode(&self) -> TlsMode {
        if self.tls.verifies() {
            return self.tls.clone();
        }
        match self.ca_cert {
            Some(ref path) => TlsMode::CustomCa(path.clone()),
            None => TlsMode::System,
        }
    }

    /// Create a config with a fresh cookie jar (for session auth).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }
}

/// Authentication attached by the session to every request it builds.
#[derive(Debug, Clone, Default)]
pub enum SessionAuth {
    /// Nothing; the connector handles auth itself (token, cookie).
    #[default]
    None,
    /// HTTP Basic with static credentials.
    Basic {
        username: String,
        password: SecretString,
    },
}

/// Persistent connection context reused across requests.
pub struct Session {
    http: reqwest::Client,
    config: TransportConfig,
    auth: SessionAuth,
    /// Mode restored when verification is switched back on.
    verified_tls: TlsMode,
}

impl Session {
    /// Build the client. Logs a warning when certificate verification is
    /// disabled, unless the config suppresses it.
    pub fn new(config: TransportConfig, auth: SessionAuth, base: &str) -> Result<Self, Error> {
        warn_if_unverified(&config, base);
        let http = config.build_client()?;
        let verified_tls = config.verified_mode();
        Ok(Self {
            http,
            config,
            auth,
            verified_tls,
        })
    }

    /// Start a request, with session auth applied.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.auth {
            SessionAuth::None => builder,
            SessionAuth::Basic { username, password } => {
                builder.basic_auth(username, Some(password.expose_secret()))
            }
        }
    }

    /// The underlying HTTP client, without session auth.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Whether server certificates are verified.
    pub fn ssl_verify(&self) -> bool {
        self.config.tls.verifies()
    }

    /// Switch certificate verification on or off.
    ///
    /// Rebuilds the client right away, so the next request uses the new
    /// policy. Turning verification back on keeps a configured custom CA.
    pub fn set_ssl_verify(&mut self, verify: bool, base: &str) -> Result<(), Error> {
        if verify == self.ssl_verify() {
            return Ok(());
        }

        let mut config = self.config.clone();
        config.tls = if verify {
            self.verified_tls.clone()
        } else {
            TlsMode::DangerAcceptInvalid
        };

        debug!(verify, "rebuilding HTTP client for new verification policy");
        warn_if_unverified(&config, base);
        self.http = config.build_client()?;
        self.config = config;
        Ok(())
    }

    /// The `Cookie` header value the jar holds for `url`, if any.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let jar = self.config.cookie_jar.as_ref()?;
        let cookies = jar.cookies(url)?;
        cookies.to_str().ok().map(String::from)
    }
}

fn warn_if_unverified(config: &TransportConfig, base: &str) {
    if !config.tls.verifies() && !config.suppress_warnings {
        warn!("TLS certificate verification is disabled for {base}");
    }
}
