// UAPI authentication
//
// Session id bootstrap and bearer-token acquisition. The token is fetched
// on demand by the first request that needs one and reused afterwards.
// Expiry is recorded but not acted on unless a `TokenLifecycle` asks for
// a refresh.

use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::connector::{Connector, is_failure, trace_success};
use crate::error::{Error, Failure};
use crate::uapi::client::UapiConnector;

/// Bearer token issued by `POST /uapi/auth/tokens`.
#[derive(Debug, Clone)]
pub struct Token {
    value: SecretString,
    expires: Option<DateTime<Utc>>,
}

impl Token {
    pub fn new(value: impl Into<SecretString>, expires: Option<DateTime<Utc>>) -> Self {
        Self {
            value: value.into(),
            expires,
        }
    }

    /// Expiry reported by the server, if it sent one.
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    pub(crate) fn expose(&self) -> &str {
        self.value.expose_secret()
    }
}

/// Decides when a held token must be replaced.
///
/// Consulted before every authenticated request. The server's refresh and
/// invalidation endpoints are not used; returning `true` simply requests a
/// brand-new token with the stored credentials.
pub trait TokenLifecycle: fmt::Debug + Send + Sync {
    fn needs_refresh(&self, token: &Token) -> bool;
}

/// Default lifecycle: a token is kept for the life of the connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefresh;

impl TokenLifecycle for NoRefresh {
    fn needs_refresh(&self, _token: &Token) -> bool {
        false
    }
}

/// Refresh once the server-reported expiry has passed.
///
/// An opt-in convenience, not the connector's default contract: unless a
/// caller picks this, a token is never replaced ([`NoRefresh`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshOnExpiry;

impl TokenLifecycle for RefreshOnExpiry {
    fn needs_refresh(&self, token: &Token) -> bool {
        token.is_expired_at(Utc::now())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(default)]
    expires: Option<Expiry>,
}

/// Older servers send epoch milliseconds, newer ones an RFC 3339 string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Expiry {
    Millis(i64),
    Text(String),
}

impl Expiry {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            Self::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl UapiConnector {
    /// GET the index page so the server issues a `JSESSIONID`.
    ///
    /// The cookie lands in the session's jar and rides along on every
    /// later request.
    pub async fn init_session_id(&self) -> Result<(), Error> {
        let url = self.config().endpoint().join_raw("")?;
        debug!("GET {url}");

        let resp = self.session().http().get(url.clone()).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if is_failure(status) {
            return Err(Error::Get {
                url: url.into(),
                failure: Failure::status(status, body),
            });
        }

        trace_success(self.config().verbose(), "GET", &url);
        Ok(())
    }

    /// Exchange the stored credentials for a bearer token and keep it.
    pub async fn create_token(&self) -> Result<Token, Error> {
        let url = self.url("/auth/tokens")?;
        let credentials = self.config().credentials();
        debug!("POST {url}");

        let resp = self
            .session()
            .request(Method::POST, url.clone())
            .basic_auth(
                &credentials.username,
                Some(credentials.password.expose_secret()),
            )
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if is_failure(status) {
            return Err(Error::Post {
                url: url.into(),
                failure: Failure::status(status, body),
            });
        }

        let parsed: TokenResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(Error::Post {
                    url: url.into(),
                    failure: Failure::MalformedJson {
                        message: e.to_string(),
                        body,
                    },
                });
            }
        };
        trace_success(self.config().verbose(), "POST", &url);

        let token = Token::new(
            parsed.token,
            parsed.expires.as_ref().and_then(Expiry::to_datetime),
        );
        self.store_token(token.clone());
        Ok(token)
    }

    /// The token for the next request: the held one, or a fresh one when
    /// none is held or the lifecycle wants it replaced.
    pub(crate) async fn bearer(&self) -> Result<Token, Error> {
        if let Some(token) = self.token() {
            if !self.lifecycle().needs_refresh(&token) {
                return Ok(token);
            }
            debug!("token lifecycle requested a refresh");
        }
        self.create_token().await
    }
}
