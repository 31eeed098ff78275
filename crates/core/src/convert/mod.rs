//! Markdown conversion.
//!
//! Conversion is batched: a caller submits a list of [`ConversionRequest`]s
//! and gets back a [`ConversionBatch`] keyed by each request's `key`. Entries
//! succeed or fail independently. Whether one failed entry spoils the whole
//! batch is the caller's decision (see [`ConversionBatch::into_result`]).

mod cloudflare;
mod local;

pub use cloudflare::{CloudflareConverter, DEFAULT_BASE_URL as CLOUDFLARE_BASE_URL};
pub use local::LocalConverter;

use crate::error::{FetchError, Result};
use std::collections::HashMap;

/// Convert an HTML document to Markdown in-process.
pub fn html_to_markdown(html: &str) -> String {
    html2md::parse_html(html).trim().to_string()
}

/// One document submitted for conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub key: String,
    pub contents: String,
    pub mime: String,
}

impl ConversionRequest {
    pub fn new(
        key: impl Into<String>,
        contents: impl Into<String>,
        mime: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            contents: contents.into(),
            mime: mime.into(),
        }
    }

    pub fn html(key: impl Into<String>, contents: impl Into<String>) -> Self {
        Self::new(key, contents, "text/html")
    }
}

/// Outcome of converting a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    Success { data: String },
    Error { message: String },
}

/// A failed entry in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionFailure {
    pub key: String,
    pub error: String,
}

/// Results of one conversion batch, looked up by key.
#[derive(Debug, Clone, Default)]
pub struct ConversionBatch {
    results: HashMap<String, ConversionResult>,
    errors: Vec<ConversionFailure>,
}

impl ConversionBatch {
    /// Build a batch from `(key, result)` pairs in backend order.
    ///
    /// A repeated key overwrites the earlier entry in the lookup map, while
    /// every failure is still recorded in the error list.
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = (String, ConversionResult)>,
    {
        let mut batch = Self::default();
        for (key, result) in results {
            if let ConversionResult::Error { message } = &result {
                batch.errors.push(ConversionFailure {
                    key: key.clone(),
                    error: message.clone(),
                });
            }
            batch.results.insert(key, result);
        }
        batch
    }

    /// Per-key failures, `None` when every entry converted.
    pub fn errors(&self) -> Option<&[ConversionFailure]> {
        if self.errors.is_empty() {
            None
        } else {
            Some(&self.errors)
        }
    }

    /// Converted data for `key`.
    pub fn get(&self, key: &str) -> Result<&str> {
        match self.results.get(key) {
            Some(ConversionResult::Success { data }) => Ok(data.as_str()),
            Some(ConversionResult::Error { message }) => Err(FetchError::ConversionLookup {
                key: key.to_string(),
                message: message.clone(),
            }),
            None => Err(FetchError::ConversionLookup {
                key: key.to_string(),
                message: "no result for key".to_string(),
            }),
        }
    }

    /// All-or-nothing view: fails with [`FetchError::Conversion`] if any entry failed.
    pub fn into_result(self) -> Result<Self> {
        match self.errors() {
            None => Ok(self),
            Some(errors) => {
                let detail = errors
                    .iter()
                    .map(|failure| format!("{}: {}", failure.key, failure.error))
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(FetchError::Conversion(detail))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// A Markdown conversion strategy.
#[async_trait::async_trait]
pub trait MarkdownConverter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Media types this converter accepts
    async fn supported(&self) -> Result<Vec<String>>;

    /// Convert every request in one call
    async fn convert(&self, requests: Vec<ConversionRequest>) -> Result<ConversionBatch>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(data: &str) -> ConversionResult {
        ConversionResult::Success {
            data: data.to_string(),
        }
    }

    fn failure(message: &str) -> ConversionResult {
        ConversionResult::Error {
            message: message.to_string(),
        }
    }

    #[test]
    fn test_partial_failure_batch() {
        let batch = ConversionBatch::from_results(vec![
            ("a".to_string(), success("A")),
            ("b".to_string(), failure("bad b")),
            ("c".to_string(), success("C")),
            ("d".to_string(), failure("bad d")),
            ("e".to_string(), success("E")),
        ]);

        assert_eq!(batch.len(), 5);
        assert_eq!(batch.get("a").unwrap(), "A");
        assert_eq!(batch.get("e").unwrap(), "E");

        match batch.get("b") {
            Err(FetchError::ConversionLookup { key, message }) => {
                assert_eq!(key, "b");
                assert_eq!(message, "bad b");
            }
            other => panic!("expected lookup error, got {:?}", other),
        }

        let errors = batch.errors().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].key, "b");
        assert_eq!(errors[1].key, "d");
    }

    #[test]
    fn test_missing_key_is_lookup_error() {
        let batch = ConversionBatch::from_results(vec![("a".to_string(), success("A"))]);
        assert!(batch.errors().is_none());
        assert!(matches!(
            batch.get("zzz"),
            Err(FetchError::ConversionLookup { .. })
        ));
    }

    #[test]
    fn test_duplicate_key_overwrites() {
        let batch = ConversionBatch::from_results(vec![
            ("k".to_string(), success("first")),
            ("k".to_string(), success("second")),
        ]);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.get("k").unwrap(), "second");
    }

    #[test]
    fn test_into_result_is_all_or_nothing() {
        let ok = ConversionBatch::from_results(vec![("a".to_string(), success("A"))]);
        assert!(ok.into_result().is_ok());

        let partial = ConversionBatch::from_results(vec![
            ("a".to_string(), success("A")),
            ("b".to_string(), failure("nope")),
        ]);
        match partial.into_result() {
            Err(FetchError::Conversion(detail)) => assert!(detail.contains("b: nope")),
            other => panic!("expected conversion error, got {:?}", other),
        }
    }

    #[test]
    fn test_html_to_markdown_keeps_structure() {
        let md = html_to_markdown("<h1>Hello</h1><p>World</p>");

        let heading = md.find("Hello").unwrap();
        let paragraph = md.find("World").unwrap();
        assert!(heading < paragraph);
        assert!(md.contains("# Hello") || md.contains("Hello\n="));
        assert!(!md.contains("<h1>"));
        assert!(!md.contains("<p>"));
    }
}
