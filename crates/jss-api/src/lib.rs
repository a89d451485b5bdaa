// jss-api: Async Rust connectors for the Jamf Pro server (Classic XML API, UAPI, web UI)

pub mod connector;
pub mod distribution_points;
pub mod error;
pub mod objects;
pub mod transport;
pub mod uapi;
pub mod web;
pub mod xml;
pub mod xml_api;

pub use connector::{Connector, ConnectorConfig, Credentials, Endpoint, JssPrefs};
pub use distribution_points::{DistributionPoints, RepositoryPrefs};
pub use error::{Error, Failure, describe_response};
pub use objects::{ApiObject, ObjectFactory, ObjectKind, ResourceFactory};
pub use transport::{Session, SessionAuth, TlsMode, TransportConfig};
pub use uapi::{NoRefresh, RefreshOnExpiry, Token, TokenLifecycle, UapiConnector};
pub use web::{Form, ScrapedPage, ScrapedResource, ScraperConnector};
pub use xml::{Element, XmlError};
pub use xml_api::XmlApiConnector;
