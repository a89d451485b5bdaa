// UAPI connector
//
// JSON endpoints under `/uapi`, authenticated with a bearer token.

pub mod auth;
pub mod client;

pub use auth::{NoRefresh, RefreshOnExpiry, Token, TokenLifecycle};
pub use client::UapiConnector;
