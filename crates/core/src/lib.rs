// Core fetching, content classification and Markdown conversion for tmcp-fetch

pub mod classify;
pub mod convert;
pub mod error;
pub mod http;
pub mod wikipedia;

pub use error::{FetchError, Result};
pub use http::{FetchResult, HttpFetcher};

/// Identifying `User-Agent` sent on every outbound request
pub const USER_AGENT: &str = concat!("tmcp-fetch/", env!("CARGO_PKG_VERSION"));
