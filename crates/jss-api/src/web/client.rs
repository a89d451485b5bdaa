// Web UI connector
//
// Signs in through the login form like a browser would, then fetches and
// submits pages with the session cookie the server hands back.

use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, Response};
use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::connector::{Connector, ConnectorConfig, is_failure, trace_success};
use crate::error::{Error, Failure};
use crate::transport::{Session, SessionAuth};
use crate::web::page::{ScrapedPage, ScrapedResource};

/// Connector for the HTML web UI.
pub struct ScraperConnector {
    config: ConnectorConfig,
    session: Session,
    logged_in: AtomicBool,
}

impl ScraperConnector {
    pub fn new(config: ConnectorConfig) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );

        let transport = config.transport().with_headers(headers).with_cookie_jar();
        let session = Session::new(transport, SessionAuth::None, config.endpoint().as_str())?;

        Ok(Self {
            config,
            session,
            logged_in: AtomicBool::new(false),
        })
    }

    /// Whether [`login`](Self::login) has succeeded on this connector.
    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::Acquire)
    }

    /// POST the credentials as `username`/`password` form fields to the
    /// endpoint itself, without a trailing `/`. The session cookie set in reply is kept by the jar.
    ///
    /// Fails with [`Error::Authentication`] on a status >= 400, or when the
    /// server answers with the sign-in page again.
    pub async fn login(&self) -> Result<(), Error> {
        let url = self.config.endpoint().url()?;
        let credentials = self.config.credentials();
        debug!("POST {url} (login)");

        let resp = self
            .session
            .request(Method::POST, url.clone())
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.expose_secret()),
            ])
            .send()
            .await?;
        let status = resp.status();
        let page = into_page(resp).await?;

        if is_failure(status) {
            self.logged_in.store(false, Ordering::Release);
            return Err(Error::Authentication {
                message: format!(
                    "login as {} rejected with HTTP {}",
                    credentials.username,
                    status.as_u16()
                ),
            });
        }
        if page.has_login_form() {
            self.logged_in.store(false, Ordering::Release);
            return Err(Error::Authentication {
                message: format!("credentials for {} were not accepted", credentials.username),
            });
        }

        self.logged_in.store(true, Ordering::Release);
        if self.config.verbose() {
            info!("logged in to {} as {}", self.config.endpoint(), credentials.username);
        }
        Ok(())
    }

    /// GET a page under the endpoint. `path` may carry a query string.
    pub async fn fetch_page(&self, path: &str) -> Result<ScrapedPage, Error> {
        let url = self.config.endpoint().join_raw(path)?;
        debug!("GET {url}");

        let resp = self.session.request(Method::GET, url.clone()).send().await?;
        let status = resp.status();
        let page = into_page(resp).await?;

        if is_failure(status) {
            return Err(Error::Get {
                url: url.into(),
                failure: Failure::status(status, page.body().to_owned()),
            });
        }
        trace_success(self.config.verbose(), "GET", &url);
        Ok(page)
    }

    pub async fn fetch_resource(&self, resource: ScrapedResource) -> Result<ScrapedPage, Error> {
        self.fetch_page(resource.path()).await
    }

    /// POST `fields` url-encoded to `path` and return the resulting page.
    pub async fn submit_form(
        &self,
        path: &str,
        fields: &[(String, String)],
    ) -> Result<ScrapedPage, Error> {
        let url = self.config.endpoint().join_raw(path)?;
        debug!("POST {url} ({} fields)", fields.len());

        let resp = self
            .session
            .request(Method::POST, url.clone())
            .form(fields)
            .send()
            .await?;
        let status = resp.status();
        let page = into_page(resp).await?;

        if is_failure(status) {
            return Err(Error::Post {
                url: url.into(),
                failure: Failure::status(status, page.body().to_owned()),
            });
        }
        trace_success(self.config.verbose(), "POST", &url);
        Ok(page)
    }
}

impl Connector for ScraperConnector {
    const PREFIX: &'static str = "";

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

async fn into_page(resp: Response) -> Result<ScrapedPage, Error> {
    let url = resp.url().clone();
    let status = resp.status().as_u16();
    let body = resp.text().await?;
    Ok(ScrapedPage::new(url, status, body))
}
