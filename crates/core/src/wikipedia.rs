//! Wikipedia action API client.
//!
//! Two lookups are supported: full-text search (titles and snippets rendered
//! to Markdown) and plain-text page extraction by page id.

use crate::convert::{ConversionRequest, MarkdownConverter};
use crate::error::{FetchError, Result};
use crate::http::HttpFetcher;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// A search hit with Markdown-rendered title and snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub page_id: u64,
    pub title: String,
    pub snippet: String,
}

/// Plain-text page extract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    pageid: u64,
    title: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    query: PageQuery,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    pages: Vec<RawPage>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    pageid: Option<i64>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
}

impl RawPage {
    fn is_present(&self) -> bool {
        !self.missing && !self.invalid
    }
}

fn title_key(page_id: u64) -> String {
    format!("{}-title", page_id)
}

fn snippet_key(page_id: u64) -> String {
    format!("{}-snippet", page_id)
}

pub struct WikipediaClient {
    fetcher: HttpFetcher,
    converter: Arc<dyn MarkdownConverter>,
    endpoint: String,
}

impl WikipediaClient {
    pub fn new(fetcher: HttpFetcher, converter: Arc<dyn MarkdownConverter>) -> Self {
        Self {
            fetcher,
            converter,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Point the client at another action API endpoint (mirrors, other languages)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_url(&self, params: &[(&str, &str)]) -> Result<Url> {
        Ok(Url::parse_with_params(&self.endpoint, params)?)
    }

    /// Full-text search. Results keep the API's order, duplicates included.
    ///
    /// Titles and snippets are converted in a single batch; any failed entry
    /// fails the whole search. The response status is not checked, only
    /// whether the body decodes.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let url = self.build_url(&[
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("list", "search"),
            ("srsearch", query),
        ])?;

        let response = self.fetcher.get(url.as_str()).await?;
        let hits = response.json::<SearchResponse>()?.query.search;

        tracing::debug!(query, hits = hits.len(), "wikipedia search");

        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let requests = hits
            .iter()
            .flat_map(|hit| {
                [
                    ConversionRequest::html(title_key(hit.pageid), hit.title.clone()),
                    ConversionRequest::html(snippet_key(hit.pageid), hit.snippet.clone()),
                ]
            })
            .collect();

        let batch = self.converter.convert(requests).await?.into_result()?;

        hits.iter()
            .map(|hit| {
                Ok(SearchResult {
                    page_id: hit.pageid,
                    title: batch.get(&title_key(hit.pageid))?.to_string(),
                    snippet: batch.get(&snippet_key(hit.pageid))?.to_string(),
                })
            })
            .collect()
    }

    /// Plain-text extract of the page with `id`.
    ///
    /// As with [`search`](Self::search), the status is not checked: an error
    /// page fails to decode and surfaces as [`FetchError::Decode`].
    pub async fn page(&self, id: u64) -> Result<Page> {
        let page_id = id.to_string();
        let url = self.build_url(&[
            ("action", "query"),
            ("prop", "extracts"),
            ("explaintext", "1"),
            ("pageids", &page_id),
            ("format", "json"),
            ("formatversion", "2"),
        ])?;

        let response = self.fetcher.get(url.as_str()).await?;
        let pages = response.json::<PageResponse>()?.query.pages;

        let page = pages
            .into_iter()
            .filter(RawPage::is_present)
            .find(|page| page.pageid.and_then(|p| u64::try_from(p).ok()) == Some(id))
            .ok_or(FetchError::PageNotFound(id))?;

        Ok(Page {
            title: page.title,
            content: page.extract,
        })
    }
}
