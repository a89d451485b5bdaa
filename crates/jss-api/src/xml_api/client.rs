// Classic (XML) API connector
//
// Stateless CRUD under `<endpoint>/JSSResource` with HTTP Basic on every
// request. Request and response bodies are XML documents; the server
// answers 200 for GET/DELETE and 201 for POST/PUT.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use tracing::debug;
use url::Url;

use crate::connector::{Connector, ConnectorConfig, is_failure, trace_success};
use crate::distribution_points::DistributionPoints;
use crate::error::{Error, Failure};
use crate::objects::{ObjectFactory, ObjectKind, ResourceFactory};
use crate::transport::{Session, SessionAuth};
use crate::xml::Element;

static CREATED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<id>([0-9]+)</id>").expect("valid id regex"));

/// Connector for the Classic XML API.
///
/// Owns its session, an [`ObjectFactory`] used by [`post`](Self::post),
/// and the configured [`DistributionPoints`].
pub struct XmlApiConnector<F: ObjectFactory = ResourceFactory> {
    config: ConnectorConfig,
    session: Session,
    factory: F,
    distribution_points: DistributionPoints,
}

impl XmlApiConnector<ResourceFactory> {
    /// Create a connector with the default [`ResourceFactory`].
    pub fn new(config: ConnectorConfig) -> Result<Self, Error> {
        Self::with_factory(config, ResourceFactory)
    }
}

impl<F: ObjectFactory> XmlApiConnector<F> {
    /// Create a connector that builds posted objects with `factory`.
    ///
    /// Some resources answer JSON by default, so both `Content-Type` and
    /// `Accept` are pinned to XML for every request.
    pub fn with_factory(config: ConnectorConfig, factory: F) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/xml"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/xml"));

        let auth = SessionAuth::Basic {
            username: config.credentials().username.clone(),
            password: config.credentials().password.clone(),
        };
        let transport = config.transport().with_headers(headers);
        let session = Session::new(transport, auth, config.endpoint().as_str())?;
        let distribution_points = DistributionPoints::new(config.repo_prefs().to_vec());

        Ok(Self {
            config,
            session,
            factory,
            distribution_points,
        })
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn distribution_points(&self) -> &DistributionPoints {
        &self.distribution_points
    }

    /// `<endpoint>/JSSResource<path>`, percent-encoded per segment.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        self.config.endpoint().join_segments(Self::PREFIX, path)
    }

    // ── Verbs ────────────────────────────────────────────────────────

    /// GET a resource and parse the XML answer.
    ///
    /// A status >= 400 and an unparseable 2xx body both fail with
    /// [`Error::Get`]; the [`Failure`] tells them apart.
    pub async fn get(&self, path: &str) -> Result<Element, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.session.request(Method::GET, url.clone()).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if is_failure(status) {
            return Err(Error::Get {
                url: url.into(),
                failure: Failure::status(status, body),
            });
        }
        trace_success(self.config.verbose(), "GET", &url);

        Element::parse(&body).map_err(|e| Error::Get {
            url: url.into(),
            failure: Failure::MalformedXml {
                message: e.to_string(),
                body,
            },
        })
    }

    /// POST a new object and return it as the server stored it.
    ///
    /// The server echoes the new object's `<id>`; that id is handed to the
    /// factory, which fetches the complete object. `document` may be
    /// partial since the server fills in the rest.
    pub async fn post(
        &self,
        kind: ObjectKind,
        path: &str,
        document: &Element,
    ) -> Result<F::Object, Error> {
        let url = self.url(path)?;
        let payload = document.to_bytes()?;
        debug!("POST {url}");

        let resp = self
            .session
            .request(Method::POST, url.clone())
            .body(payload)
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
        trace_success(self.config.verbose(), "POST", &url);

        let Some(id) = extract_id(&body) else {
            return Err(Error::Post {
                url: url.into(),
                failure: Failure::MissingId { body },
            });
        };

        self.factory.get_object(self, kind, id).await
    }

    /// PUT an updated object. Only 201 counts as success.
    pub async fn put(&self, path: &str, document: &Element) -> Result<(), Error> {
        let url = self.url(path)?;
        let payload = document.to_bytes()?;
        debug!("PUT {url}");

        let resp = self
            .session
            .request(Method::PUT, url.clone())
            .body(payload)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if is_failure(status) {
            return Err(Error::Put {
                url: url.into(),
                failure: Failure::status(status, body),
            });
        }
        if status != StatusCode::CREATED {
            return Err(Error::Put {
                url: url.into(),
                failure: Failure::UnexpectedStatus {
                    status: status.as_u16(),
                    expected: StatusCode::CREATED.as_u16(),
                    body,
                },
            });
        }
        trace_success(self.config.verbose(), "PUT", &url);
        Ok(())
    }

    /// DELETE a resource. Some deletions (sub-resources) need a payload;
    /// without one the request carries no body.
    pub async fn delete(&self, path: &str, document: Option<&Element>) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let mut builder = self.session.request(Method::DELETE, url.clone());
        if let Some(document) = document {
            builder = builder.body(document.to_bytes()?);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if is_failure(status) {
            return Err(Error::Delete {
                url: url.into(),
                failure: Failure::status(status, body),
            });
        }
        trace_success(self.config.verbose(), "DELETE", &url);
        Ok(())
    }
}

impl<F: ObjectFactory> Connector for XmlApiConnector<F> {
    const PREFIX: &'static str = "JSSResource";

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

/// The id of a created object, from the first `<id>NNN</id>` in `body`.
fn extract_id(body: &str) -> Option<u64> {
    CREATED_ID
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_extracted_from_echo() {
        assert_eq!(
            extract_id("<?xml version=\"1.0\"?><package><id>42</id></package>"),
            Some(42)
        );
        assert_eq!(extract_id("<policy><id>7</id><id>9</id></policy>"), Some(7));
    }

    #[test]
    fn missing_or_bad_id_yields_none() {
        assert_eq!(extract_id("<package><name>x</name></package>"), None);
        assert_eq!(extract_id("<id>abc</id>"), None);
        assert_eq!(extract_id("<id>99999999999999999999999</id>"), None);
        assert_eq!(extract_id(""), None);
    }
}
