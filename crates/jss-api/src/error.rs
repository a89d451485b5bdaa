use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::xml::XmlError;

/// Top-level error type for the `jss-api` crate.
///
/// One variant per failed verb (`Get`, `Post`, `Put`, `Delete`), each
/// carrying the request URL and a [`Failure`] that says *why* the call
/// failed. The remaining variants cover authentication, transport, and
/// configuration problems that happen before a response exists.
#[derive(Debug, Error)]
pub enum Error {
    // ── Verb failures ───────────────────────────────────────────────
    /// GET was rejected, or returned a body that could not be parsed.
    #[error("GET {url} failed: {failure}")]
    Get { url: String, failure: Failure },

    /// POST was rejected, or the response carried no object id.
    #[error("POST {url} failed: {failure}")]
    Post { url: String, failure: Failure },

    /// PUT was rejected, or answered with something other than 201.
    #[error("PUT {url} failed: {failure}")]
    Put { url: String, failure: Failure },

    /// DELETE was rejected.
    #[error("DELETE {url} failed: {failure}")]
    Delete { url: String, failure: Failure },

    // ── Authentication ──────────────────────────────────────────────
    /// Login or token acquisition failed.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The server endpoint is not an absolute http(s) location.
    #[error("Invalid endpoint {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// TLS setup or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// An outgoing document could not be serialized.
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    /// A CSS selector used to scrape a page did not parse.
    #[error("Invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Why a verb failed.
///
/// Causes that share an [`Error`] variant (an HTTP rejection versus a
/// malformed success body) stay distinguishable here.
#[derive(Debug, Error)]
pub enum Failure {
    /// The server answered with status >= 400.
    #[error("HTTP {status}: {reason}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    /// A non-error status that is still not the one the verb requires.
    #[error("unexpected HTTP {status} (expected {expected})")]
    UnexpectedStatus {
        status: u16,
        expected: u16,
        body: String,
    },

    /// The request succeeded but the body is not well-formed XML.
    #[error("error parsing XML: {message}")]
    MalformedXml { message: String, body: String },

    /// The request succeeded but the body is not the expected JSON.
    #[error("error parsing JSON: {message}")]
    MalformedJson { message: String, body: String },

    /// The request succeeded but no `<id>` element was found in the body.
    #[error("response contains no <id> for the created object")]
    MissingId { body: String },
}

impl Failure {
    /// Build a [`Failure::Status`] from a rejected response.
    pub fn status(status: reqwest::StatusCode, body: String) -> Self {
        Self::Status {
            status: status.as_u16(),
            reason: describe_response(status, &body),
            body,
        }
    }

    /// The response body, verbatim.
    pub fn body(&self) -> &str {
        match self {
            Self::Status { body, .. }
            | Self::UnexpectedStatus { body, .. }
            | Self::MalformedXml { body, .. }
            | Self::MalformedJson { body, .. }
            | Self::MissingId { body } => body,
        }
    }

    /// The HTTP status, when the failure came from the status line.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl Error {
    /// Wrap `failure` in the variant matching the HTTP method.
    pub(crate) fn for_method(method: &reqwest::Method, url: String, failure: Failure) -> Self {
        if *method == reqwest::Method::POST {
            Self::Post { url, failure }
        } else if *method == reqwest::Method::PUT {
            Self::Put { url, failure }
        } else if *method == reqwest::Method::DELETE {
            Self::Delete { url, failure }
        } else {
            Self::Get { url, failure }
        }
    }

    /// The [`Failure`] behind a verb error.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Get { failure, .. }
            | Self::Post { failure, .. }
            | Self::Put { failure, .. }
            | Self::Delete { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            other => other.failure().and_then(Failure::http_status),
        }
    }

    /// Body of the failed response, if one was received.
    pub fn body(&self) -> Option<&str> {
        self.failure().map(Failure::body)
    }

    /// Returns `true` if the server answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if the request never got a usable answer because
    /// of a connect failure or timeout.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

// ── Response formatting ─────────────────────────────────────────────

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").expect("valid paragraph regex"));
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

const PREVIEW_CHARS: usize = 200;

/// Turn a failed response into a one-line diagnostic.
///
/// The server renders errors as small HTML status pages; the `<p>`
/// paragraphs hold the human-readable reason. Bodies without paragraphs
/// fall back to a trimmed preview, and empty bodies to the canonical
/// reason phrase.
pub fn describe_response(status: reqwest::StatusCode, body: &str) -> String {
    let paragraphs: Vec<String> = PARAGRAPH
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| TAG.replace_all(m.as_str(), "").trim().to_owned())
        .filter(|text| !text.is_empty())
        .collect();

    if !paragraphs.is_empty() {
        return paragraphs.join(". ");
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_owned();
    }

    trimmed.chars().take(PREVIEW_CHARS).collect()
}
