// Base connector: the settings every transport shares, and the
// capability trait the three concrete connectors implement.
//
// `ConnectorConfig` is a plain value built once from a `JssPrefs` or from
// individual parameters, then handed to `XmlApiConnector::new`,
// `UapiConnector::new`, or `ScraperConnector::new`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::SecretString;
use tracing::{debug, info};
use url::Url;

use crate::distribution_points::RepositoryPrefs;
use crate::error::Error;
use crate::transport::{Session, TlsMode, TransportConfig};

// ── Endpoint ─────────────────────────────────────────────────────────

/// Base location of the server (scheme, host, port, optional path).
///
/// Never ends in `/`: `"https://jss:8443/"` is stored as
/// `"https://jss:8443"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim_end_matches('/');
        let invalid = |reason: String| Error::InvalidEndpoint {
            url: raw.to_owned(),
            reason,
        };

        let parsed = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host".into()));
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The endpoint itself. A context path keeps its exact form:
    /// `https://jss/jamf` is not widened to `https://jss/jamf/`.
    pub fn url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&self.0)?)
    }

    /// Append `prefix` and `path` as percent-encoded path segments.
    ///
    /// `"/packages/id/5"` under prefix `"JSSResource"` becomes
    /// `<endpoint>/JSSResource/packages/id/5`; a segment like
    /// `"My Package"` is sent as `My%20Package`.
    pub fn join_segments(&self, prefix: &str, path: &str) -> Result<Url, Error> {
        let mut url = Url::parse(&self.0)?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidEndpoint {
                url: self.0.clone(),
                reason: "cannot carry a path".into(),
            })?
            .pop_if_empty()
            .extend(prefix.split('/').filter(|s| !s.is_empty()))
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    /// Append a raw path (which may carry a query) without re-encoding.
    pub fn join_raw(&self, path: &str) -> Result<Url, Error> {
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{}/{path}", self.0))?)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Credentials / preferences ───────────────────────────────────────

/// Username + secret. Sent as HTTP Basic, a token request, or login form
/// fields depending on the connector.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Resolved server preferences, as produced by `jss-config`.
#[derive(Debug, Clone)]
pub struct JssPrefs {
    pub url: String,
    pub user: String,
    pub password: SecretString,
    pub repos: Vec<RepositoryPrefs>,
    pub verify: bool,
    pub suppress_warnings: bool,
    pub ca_cert: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

// ── ConnectorConfig ─────────────────────────────────────────────────

/// Settings shared by every connector.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct ConnectorConfig {
    endpoint: Endpoint,
    credentials: Credentials,
    repo_prefs: Vec<RepositoryPrefs>,
    ssl_verify: bool,
    verbose: bool,
    /// Scripts live in the database rather than on distribution points.
    jss_migrated: bool,
    suppress_warnings: bool,
    ca_cert: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ConnectorConfig {
    /// Build from individual parameters. Verification is on; everything
    /// else is off until set with the `with_*` builders.
    pub fn new(
        url: &str,
        user: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Result<Self, Error> {
        Ok(Self {
            endpoint: Endpoint::new(url)?,
            credentials: Credentials::new(user, password),
            repo_prefs: Vec::new(),
            ssl_verify: true,
            verbose: false,
            jss_migrated: false,
            suppress_warnings: false,
            ca_cert: None,
            timeout: None,
        })
    }

    /// Build from a preferences object.
    pub fn from_prefs(prefs: &JssPrefs) -> Result<Self, Error> {
        Ok(Self {
            endpoint: Endpoint::new(&prefs.url)?,
            credentials: Credentials::new(prefs.user.clone(), prefs.password.clone()),
            repo_prefs: prefs.repos.clone(),
            ssl_verify: prefs.verify,
            verbose: false,
            jss_migrated: false,
            suppress_warnings: prefs.suppress_warnings,
            ca_cert: prefs.ca_cert.clone(),
            timeout: prefs.timeout,
        })
    }

    pub fn with_repo_prefs(mut self, repos: Vec<RepositoryPrefs>) -> Self {
        self.repo_prefs = repos;
        self
    }

    pub fn with_ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = verify;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_jss_migrated(mut self, migrated: bool) -> Self {
        self.jss_migrated = migrated;
        self
    }

    pub fn with_suppress_warnings(mut self, suppress: bool) -> Self {
        self.suppress_warnings = suppress;
        self
    }

    pub fn with_ca_cert(mut self, path: PathBuf) -> Self {
        self.ca_cert = Some(path);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Replace the endpoint; trailing `/` is stripped.
    pub fn set_endpoint(&mut self, raw: &str) -> Result<(), Error> {
        self.endpoint = Endpoint::new(raw)?;
        Ok(())
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn repo_prefs(&self) -> &[RepositoryPrefs] {
        &self.repo_prefs
    }

    pub fn ssl_verify(&self) -> bool {
        self.ssl_verify
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn jss_migrated(&self) -> bool {
        self.jss_migrated
    }

    pub fn set_jss_migrated(&mut self, migrated: bool) {
        self.jss_migrated = migrated;
    }

    pub fn suppress_warnings(&self) -> bool {
        self.suppress_warnings
    }

    /// Transport settings derived from the verification policy.
    pub fn transport(&self) -> TransportConfig {
        let tls = match (&self.ca_cert, self.ssl_verify) {
            (_, false) => TlsMode::DangerAcceptInvalid,
            (Some(path), true) => TlsMode::CustomCa(path.clone()),
            (None, true) => TlsMode::System,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            ca_cert: self.ca_cert.clone(),
            suppress_warnings: self.suppress_warnings,
            ..TransportConfig::default()
        }
    }
}

// ── Connector trait ─────────────────────────────────────────────────

/// The contract every concrete connector satisfies.
///
/// Mutating methods take `&mut self`: a connector has one writer, so a
/// policy change can never race an in-flight request on the same value.
pub trait Connector {
    /// Path under the endpoint that this connector talks to.
    const PREFIX: &'static str;

    fn config(&self) -> &ConnectorConfig;

    fn config_mut(&mut self) -> &mut ConnectorConfig;

    fn session(&self) -> &Session;

    fn session_mut(&mut self) -> &mut Session;

    fn endpoint(&self) -> &Endpoint {
        self.config().endpoint()
    }

    fn set_endpoint(&mut self, raw: &str) -> Result<(), Error> {
        self.config_mut().set_endpoint(raw)
    }

    fn credentials(&self) -> &Credentials {
        self.config().credentials()
    }

    fn verbose(&self) -> bool {
        self.config().verbose()
    }

    fn jss_migrated(&self) -> bool {
        self.config().jss_migrated()
    }

    fn ssl_verify(&self) -> bool {
        self.session().ssl_verify()
    }

    /// Change certificate verification; applies to the very next request.
    fn set_ssl_verify(&mut self, verify: bool) -> Result<(), Error> {
        let base = self.endpoint().to_string();
        self.session_mut().set_ssl_verify(verify, &base)?;
        self.config_mut().ssl_verify = verify;
        Ok(())
    }

    /// `<endpoint>/<PREFIX>`, e.g. `https://jss:8443/JSSResource`.
    fn api_url(&self) -> String {
        if Self::PREFIX.is_empty() {
            self.endpoint().to_string()
        } else {
            format!("{}/{}", self.endpoint(), Self::PREFIX)
        }
    }
}

/// Status >= 400. Redirects and other non-error answers are not failures.
pub(crate) fn is_failure(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

/// One line per successful call; promoted to `info` in verbose mode.
pub(crate) fn trace_success(verbose: bool, method: &str, url: &Url) {
    if verbose {
        info!("{method} {url}: Success.");
    } else {
        debug!("{method} {url}: success");
    }
}
