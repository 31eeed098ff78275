// Tool for fetching a URL and returning it as text or Markdown

use super::args::{parse_arguments, Validate, ValidationError};
use super::failure::failure_result;
use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, json_schema_url, Tool};
use serde::Deserialize;
use std::sync::Arc;
use tmcp_fetch_core::classify::{media_type_essence, should_convert};
use tmcp_fetch_core::convert::{ConversionRequest, MarkdownConverter};
use tmcp_fetch_core::{FetchError, HttpFetcher};
use url::Url;

pub const FETCH_TOOL: &str = "fetch";

const FETCHED_KEY: &str = "fetched";

/// Fetches a URL; convertible bodies come back as Markdown, the rest verbatim
pub struct FetchTool {
    fetcher: HttpFetcher,
    converter: Arc<dyn MarkdownConverter>,
}

impl FetchTool {
    pub fn new(fetcher: HttpFetcher, converter: Arc<dyn MarkdownConverter>) -> Self {
        Self { fetcher, converter }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.fetcher.get(url).await?.error_for_status()?;

        let Some(content_type) = response.content_type.as_deref() else {
            return Ok(response.body);
        };

        let supported = self.converter.supported().await?;
        if !should_convert(Some(content_type), &supported) {
            tracing::debug!(url, content_type, "returning body as-is");
            return Ok(response.body);
        }

        let mime = media_type_essence(content_type).to_ascii_lowercase();
        tracing::debug!(url, mime = %mime, converter = self.converter.name(), "converting");

        let batch = self
            .converter
            .convert(vec![ConversionRequest::new(FETCHED_KEY, response.body, mime)])
            .await?;

        Ok(batch.get(FETCHED_KEY)?.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct FetchArgs {
    url: String,
}

impl Validate for FetchArgs {
    fn validate(&self) -> Result<(), String> {
        Url::parse(&self.url)
            .map(|_| ())
            .map_err(|e| format!("invalid url {:?}: {}", self.url, e))
    }
}

#[async_trait::async_trait]
impl Tool for FetchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: FETCH_TOOL.to_string(),
            description: "Fetch URLs and return as markdown".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "url": json_schema_url("The URL to fetch")
                }),
                vec!["url"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult, ValidationError> {
        let args: FetchArgs = parse_arguments(FETCH_TOOL, arguments)?;

        Ok(match self.fetch_text(&args.url).await {
            Ok(text) => CallToolResult::text(text),
            Err(e) => failure_result(FETCH_TOOL, &e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ToolContent;
    use tmcp_fetch_core::convert::{CloudflareConverter, ConversionBatch, LocalConverter};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool() -> FetchTool {
        FetchTool::new(HttpFetcher::new().unwrap(), Arc::new(LocalConverter::new()))
    }

    fn only_text(result: &CallToolResult) -> &str {
        let texts: Vec<_> = result.text_entries().collect();
        assert_eq!(texts.len(), 1);
        texts[0]
    }

    /// Claims to support text/html but never produces anything
    struct BrokenConverter;

    #[async_trait::async_trait]
    impl MarkdownConverter for BrokenConverter {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn supported(&self) -> tmcp_fetch_core::Result<Vec<String>> {
            Ok(vec!["text/html".to_string()])
        }

        async fn convert(
            &self,
            _requests: Vec<ConversionRequest>,
        ) -> tmcp_fetch_core::Result<ConversionBatch> {
            Err(FetchError::Conversion("backend unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_plain_text_is_returned_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("success!"))
            .mount(&server)
            .await;

        let result = tool()
            .execute(serde_json::json!({ "url": server.uri() }))
            .await
            .unwrap();

        assert!(!result.is_error());
        assert_eq!(result.content, vec![ToolContent::text("success!")]);
    }

    #[tokio::test]
    async fn test_non_html_types_are_not_converted() {
        let server = MockServer::start().await;
        let body = r#"{"html": "<h1>not really</h1>"}"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let result = tool()
            .execute(serde_json::json!({ "url": server.uri() }))
            .await
            .unwrap();

        assert_eq!(only_text(&result), body);
    }

    #[tokio::test]
    async fn test_html_is_converted_to_markdown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "<html>\n  <body>\n    <h1>Hello World</h1>\n    <p>Hello TMCP</p>\n  </body>\n</html>",
                "text/html",
            ))
            .mount(&server)
            .await;

        let result = tool()
            .execute(serde_json::json!({ "url": server.uri() }))
            .await
            .unwrap();

        assert!(!result.is_error());
        let text = only_text(&result);
        assert!(text.contains("Hello World"));
        assert!(text.contains("Hello TMCP"));
        assert!(text.find("Hello World") < text.find("Hello TMCP"));
        assert!(!text.contains("<h1>"));
        assert!(!text.contains("<body>"));
    }

    #[tokio::test]
    async fn test_html_with_charset_is_converted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<h1>Hello</h1><p>World</p>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let result = tool()
            .execute(serde_json::json!({ "url": server.uri() }))
            .await
            .unwrap();

        let text = only_text(&result);
        assert!(text.contains("# Hello") || text.contains("Hello\n="));
        assert!(text.contains("World"));
    }

    #[tokio::test]
    async fn test_non_success_status_reports_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = tool()
            .execute(serde_json::json!({ "url": server.uri() }))
            .await
            .unwrap();

        assert_eq!(result, CallToolResult::error("failed to fetch with code 404"));
    }

    #[tokio::test]
    async fn test_network_error_is_generic() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = tool()
            .execute(serde_json::json!({ "url": format!("http://127.0.0.1:{}/", port) }))
            .await
            .unwrap();

        assert_eq!(result, CallToolResult::error("failed to fetch"));
    }

    #[tokio::test]
    async fn test_conversion_error_is_generic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<p>x</p>", "text/html"))
            .mount(&server)
            .await;

        let tool = FetchTool::new(HttpFetcher::new().unwrap(), Arc::new(BrokenConverter));
        let result = tool
            .execute(serde_json::json!({ "url": server.uri() }))
            .await
            .unwrap();

        assert_eq!(result, CallToolResult::error("failed to fetch"));
    }

    #[tokio::test]
    async fn test_conversion_backend_status_is_generic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<p>x</p>", "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/accounts/acct/ai/tomarkdown/supported"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let converter = CloudflareConverter::new(fetcher.client().clone(), "acct", "secret")
            .with_base_url(server.uri());
        let result = FetchTool::new(fetcher, Arc::new(converter))
            .execute(serde_json::json!({ "url": format!("{}/page", server.uri()) }))
            .await
            .unwrap();

        assert_eq!(result, CallToolResult::error("failed to fetch"));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let err = tool()
            .execute(serde_json::json!({ "url": "not a url" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::Invalid { tool: FETCH_TOOL, .. }));

        let err = tool().execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { .. }));
    }
}
