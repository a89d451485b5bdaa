// Web UI connector
//
// Cookie login plus page fetch, form extraction and form submission.

pub mod client;
pub mod page;

pub use client::ScraperConnector;
pub use page::{Form, ScrapedPage, ScrapedResource};
