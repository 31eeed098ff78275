//! Error types shared by the fetch pipeline.

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Failures that can occur while fetching, converting or looking up content.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure (DNS, refused connection, body read).
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status.
    #[error("upstream responded with status {0}")]
    Status(u16),

    /// A request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Upstream body was not the JSON we expected.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The conversion backend rejected a batch or one of its entries.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// A converted value was requested for a key that is absent or failed.
    #[error("unable to find conversion result for {key}: \"{message}\"")]
    ConversionLookup { key: String, message: String },

    /// No Wikipedia page with the requested id survived filtering.
    #[error("page with id {0} not found")]
    PageNotFound(u64),
}

impl FetchError {
    /// HTTP status carried by this error, if it came from a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            _ => None,
        }
    }
}
