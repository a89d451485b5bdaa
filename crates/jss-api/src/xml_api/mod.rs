// Classic API connector
//
// CRUD over `/JSSResource` with Basic auth and XML payloads.

pub mod client;

pub use client::XmlApiConnector;
