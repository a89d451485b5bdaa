// UAPI (JSON) connector
//
// Talks to `<endpoint>/uapi`. Authentication is a bearer token obtained
// from `POST /uapi/auth/tokens` with the stored credentials; the session
// also keeps a cookie jar so the `JSESSIONID` issued by
// `init_session_id()` accompanies every request.

use std::sync::RwLock;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::connector::{Connector, ConnectorConfig, is_failure, trace_success};
use crate::error::{Error, Failure};
use crate::transport::{Session, SessionAuth};
use crate::uapi::auth::{NoRefresh, Token, TokenLifecycle};

/// Connector for the JSON UAPI.
///
/// The token is acquired lazily by the first call that needs it. All verbs
/// take `&self`; the token slot is behind a lock that is never held across
/// an `.await`.
pub struct UapiConnector {
    config: ConnectorConfig,
    session: Session,
    token: RwLock<Option<Token>>,
    lifecycle: Box<dyn TokenLifecycle>,
}

impl UapiConnector {
    /// Create a connector that keeps its token for its whole lifetime.
    pub fn new(config: ConnectorConfig) -> Result<Self, Error> {
        Self::with_lifecycle(config, NoRefresh)
    }

    /// Create a connector whose token is replaced whenever `lifecycle`
    /// says so.
    pub fn with_lifecycle(
        config: ConnectorConfig,
        lifecycle: impl TokenLifecycle + 'static,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let transport = config.transport().with_headers(headers).with_cookie_jar();
        let session = Session::new(transport, SessionAuth::None, config.endpoint().as_str())?;

        Ok(Self {
            config,
            session,
            token: RwLock::new(None),
            lifecycle: Box::new(lifecycle),
        })
    }

    /// `<endpoint>/uapi<path>`, percent-encoded per segment.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        self.config.endpoint().join_segments(Self::PREFIX, path)
    }

    /// The token currently held, if one has been issued.
    pub fn token(&self) -> Option<Token> {
        self.token.read().expect("token lock poisoned").clone()
    }

    /// Drop the held token; the next request fetches a new one.
    pub fn clear_token(&self) {
        *self.token.write().expect("token lock poisoned") = None;
    }

    pub(crate) fn store_token(&self, token: Token) {
        *self.token.write().expect("token lock poisoned") = Some(token);
    }

    pub(crate) fn lifecycle(&self) -> &dyn TokenLifecycle {
        self.lifecycle.as_ref()
    }

    // ── Verbs ────────────────────────────────────────────────────────

    /// GET `path` and decode the JSON answer into `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let (url, body) = self.send(Method::GET, path, |b| b).await?;
        decode(&Method::GET, url, body)
    }

    /// POST `data` as JSON and decode the answer.
    pub async fn post<B, T>(&self, path: &str, data: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (url, body) = self.send(Method::POST, path, |b| b.json(data)).await?;
        decode(&Method::POST, url, body)
    }

    /// PUT `data` as JSON and decode the answer.
    pub async fn put<B, T>(&self, path: &str, data: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (url, body) = self.send(Method::PUT, path, |b| b.json(data)).await?;
        decode(&Method::PUT, url, body)
    }

    /// DELETE `path`. The answer body, if any, is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        self.send(Method::DELETE, path, |b| b).await?;
        Ok(())
    }

    /// Send one authenticated request and return the body of any answer
    /// below 400.
    async fn send(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<(Url, String), Error> {
        let url = self.url(path)?;
        let token = self.bearer().await?;
        debug!("{method} {url}");

        let builder = self
            .session
            .request(method.clone(), url.clone())
            .bearer_auth(token.expose());
        let resp = build(builder).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if is_failure(status) {
            return Err(Error::for_method(
                &method,
                url.into(),
                Failure::status(status, body),
            ));
        }

        trace_success(self.config.verbose(), method.as_str(), &url);
        Ok((url, body))
    }
}

impl Connector for UapiConnector {
    const PREFIX: &'static str = "uapi";

    fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ConnectorConfig {
        &mut self.config
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

/// Decode a success body. An empty body decodes as JSON `null`, so
/// `T = ()` or `Option<_>` accept a 204.
fn decode<T: DeserializeOwned>(method: &Method, url: Url, body: String) -> Result<T, Error> {
    let text = if body.trim().is_empty() { "null" } else { &body };
    serde_json::from_str(text).map_err(|e| {
        Error::for_method(
            method,
            url.into(),
            Failure::MalformedJson {
                message: e.to_string(),
                body,
            },
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn url() -> Url {
        Url::parse("https://jss:8443/uapi/v1/buildings").unwrap()
    }

    #[test]
    fn empty_body_decodes_as_unit() {
        let () = decode(&Method::PUT, url(), String::new()).unwrap();
        let none: Option<Value> = decode(&Method::GET, url(), " \n".into()).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn bad_json_reports_the_verb() {
        let err = decode::<Value>(&Method::PUT, url(), "<html/>".into()).unwrap_err();
        assert!(matches!(
            err,
            Error::Put {
                failure: Failure::MalformedJson { .. },
                ..
            }
        ));
        assert_eq!(err.body(), Some("<html/>"));
    }

    #[test]
    fn url_lives_under_uapi() {
        let config = ConnectorConfig::new("https://jss:8443/", "api", "pw".to_owned()).unwrap();
        let api = UapiConnector::new(config).unwrap();
        assert_eq!(
            api.url("/v1/departments").unwrap().as_str(),
            "https://jss:8443/uapi/v1/departments"
        );
        assert_eq!(api.api_url(), "https://jss:8443/uapi");
        assert!(api.token().is_none());
    }
}
