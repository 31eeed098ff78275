// Wikipedia search and page tools

use super::args::{parse_arguments, Validate, ValidationError};
use super::failure::failure_result;
use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_integer, json_schema_object, json_schema_string, Tool};
use serde::Deserialize;
use std::sync::Arc;
use tmcp_fetch_core::wikipedia::{SearchResult, WikipediaClient};

pub const SEARCH_WIKIPEDIA_TOOL: &str = "search-wikipedia";
pub const FETCH_WIKIPEDIA_PAGE_TOOL: &str = "fetch-wikipedia-page";

/// Render one search hit as a content entry
pub fn format_search_result(result: &SearchResult) -> String {
    format!(
        "# {}\n\npage id: `{}`\n\n## Snippet\n\n{}",
        result.title,
        result.page_id,
        result.snippet.trim()
    )
}

/// Tool to search Wikipedia
pub struct SearchWikipediaTool {
    client: Arc<WikipediaClient>,
}

impl SearchWikipediaTool {
    pub fn new(client: Arc<WikipediaClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

impl Validate for SearchArgs {}

#[async_trait::async_trait]
impl Tool for SearchWikipediaTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: SEARCH_WIKIPEDIA_TOOL.to_string(),
            description: "Search Wikipedia for relevant document names and summaries, which can be used to fetch the full document".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "query": json_schema_string("The query to search for")
                }),
                vec!["query"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult, ValidationError> {
        let args: SearchArgs = parse_arguments(SEARCH_WIKIPEDIA_TOOL, arguments)?;

        Ok(match self.client.search(&args.query).await {
            Ok(results) => CallToolResult::texts(results.iter().map(format_search_result)),
            Err(e) => failure_result(SEARCH_WIKIPEDIA_TOOL, &e),
        })
    }
}

/// Tool to fetch a Wikipedia page's plain-text extract by id
pub struct FetchWikipediaPageTool {
    client: Arc<WikipediaClient>,
}

impl FetchWikipediaPageTool {
    pub fn new(client: Arc<WikipediaClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct PageArgs {
    id: u64,
}

impl Validate for PageArgs {}

#[async_trait::async_trait]
impl Tool for FetchWikipediaPageTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: FETCH_WIKIPEDIA_PAGE_TOOL.to_string(),
            description: "Fetch a Wikipedia page by its ID".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "id": json_schema_integer("The ID of the Wikipedia page")
                }),
                vec!["id"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult, ValidationError> {
        let args: PageArgs = parse_arguments(FETCH_WIKIPEDIA_PAGE_TOOL, arguments)?;

        Ok(match self.client.page(args.id).await {
            Ok(page) => CallToolResult::text(page.content),
            Err(e) => failure_result(FETCH_WIKIPEDIA_PAGE_TOOL, &e),
        })
    }
}
