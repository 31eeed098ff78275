pub mod args;
pub mod failure;
pub mod fetch;
pub mod wikipedia;
mod registry;

pub use args::{parse_arguments, Validate, ValidationError};
pub use failure::{failure_result, GENERIC_FAILURE};
pub use fetch::{FetchTool, FETCH_TOOL};
pub use registry::{
    json_schema_integer, json_schema_object, json_schema_string, json_schema_url, Tool,
    ToolRegistry,
};
pub use wikipedia::{
    FetchWikipediaPageTool, SearchWikipediaTool, FETCH_WIKIPEDIA_PAGE_TOOL, SEARCH_WIKIPEDIA_TOOL,
};

use std::sync::Arc;
use tmcp_fetch_core::convert::MarkdownConverter;
use tmcp_fetch_core::wikipedia::WikipediaClient;
use tmcp_fetch_core::HttpFetcher;

/// Shared collaborators the tools are built from
#[derive(Clone)]
pub struct ToolServices {
    pub fetcher: HttpFetcher,
    pub converter: Arc<dyn MarkdownConverter>,
    pub wikipedia: Arc<WikipediaClient>,
}

impl ToolServices {
    /// Wikipedia client is built from the same fetcher and converter
    pub fn new(
        fetcher: HttpFetcher,
        converter: Arc<dyn MarkdownConverter>,
        wikipedia_endpoint: Option<&str>,
    ) -> Self {
        let mut wikipedia = WikipediaClient::new(fetcher.clone(), converter.clone());
        if let Some(endpoint) = wikipedia_endpoint {
            wikipedia = wikipedia.with_endpoint(endpoint);
        }

        Self {
            fetcher,
            converter,
            wikipedia: Arc::new(wikipedia),
        }
    }
}

/// Register every tool this server exposes
pub fn build_registry(services: ToolServices) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(FetchTool::new(
        services.fetcher,
        services.converter,
    )));
    registry.register(Arc::new(SearchWikipediaTool::new(services.wikipedia.clone())));
    registry.register(Arc::new(FetchWikipediaPageTool::new(services.wikipedia)));

    tracing::info!("Registered {} tools", registry.len());
    registry
}
