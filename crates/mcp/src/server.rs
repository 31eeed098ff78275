// MCP server: JSON-RPC dispatch plus the stdio transport

use crate::protocol::{
    negotiate_protocol_version, CallToolParams, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerCapabilities, ServerInfo,
    ToolsCapability, JSONRPC_VERSION,
};
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

pub const SERVER_NAME: &str = "fetch";

const INSTRUCTIONS: &str = "Fetch URLs and return as markdown";

/// Dispatches MCP requests to the tool registry.
///
/// The registry is fixed at construction; transports share the server
/// behind an `Arc` and may dispatch concurrently.
pub struct McpServer {
    registry: ToolRegistry,
    info: ServerInfo,
}

fn to_result<T: Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Parse one raw JSON-RPC message, or produce the error response for it
    pub fn parse_message(raw: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|_| JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()))?;

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        if value.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
        }

        serde_json::from_value(value)
            .map_err(|_| JsonRpcResponse::error(id, JsonRpcError::invalid_request()))
    }

    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        match Self::parse_message(raw) {
            Ok(request) => self.handle_request(request).await,
            Err(response) => Some(response),
        }
    }

    /// Handle a parsed request. Notifications produce no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification received");
            return None;
        }

        let id = request.id.unwrap_or(Value::Null);

        let params = request.params.unwrap_or(Value::Null);
        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => to_result(ListToolsResult {
                tools: self.registry.list_schemas(),
            }),
            "tools/call" => self.call_tool(params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                tracing::warn!(method = %request.method, code = error.code, message = %error.message, "request failed");
                JsonRpcResponse::error(id, error)
            }
        })
    }

    fn initialize(&self, params: Value) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)))?;

        tracing::info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol = %params.protocol_version,
            "client initializing"
        );

        to_result(InitializeResult {
            protocol_version: negotiate_protocol_version(&params.protocol_version).to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: true }),
            },
            server_info: self.info.clone(),
            instructions: Some(INSTRUCTIONS.to_string()),
        })
    }

    async fn call_tool(&self, params: Value) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)))?;

        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        tracing::info!(tool = %params.name, "calling tool");

        let result = tool
            .execute(params.arguments)
            .await
            .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;

        to_result(result)
    }

    /// Serve newline-delimited JSON-RPC until `reader` is exhausted
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = FramedRead::new(reader, LinesCodec::new());
        let mut sink = FramedWrite::new(writer, LinesCodec::new());

        while let Some(line) = lines.next().await {
            let line = line.context("Failed to read message")?;
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(&line).await {
                let json = serde_json::to_string(&response)?;
                sink.send(json).await.context("Failed to write response")?;
            }
        }

        tracing::info!("input closed, shutting down");
        Ok(())
    }

    /// Serve over stdin/stdout
    pub async fn start(&self) -> Result<()> {
        tracing::info!("MCP server listening on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{build_registry, ToolServices};
    use std::sync::Arc;
    use tmcp_fetch_core::convert::LocalConverter;
    use tmcp_fetch_core::HttpFetcher;
    use tokio::io::AsyncReadExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server() -> McpServer {
        let services = ToolServices::new(
            HttpFetcher::new().unwrap(),
            Arc::new(LocalConverter::new()),
            Some("http://127.0.0.1:9/w/api.php"),
        );
        McpServer::new(build_registry(services))
    }

    async fn call(server: &McpServer, method: &str, params: Value) -> JsonRpcResponse {
        server
            .handle_request(JsonRpcRequest::new(1, method, params))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = call(
            &server(),
            "initialize",
            serde_json::json!({
                "protocolVersion": "2025-01-01",
                "capabilities": {},
                "clientInfo": { "name": "test", "version": "0.1.0" }
            }),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "fetch");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], true);
        assert_eq!(
            result["protocolVersion"],
            crate::protocol::SUPPORTED_PROTOCOL_VERSIONS[0]
        );
    }

    #[tokio::test]
    async fn test_list_tools() {
        let response = call(&server(), "tools/list", Value::Null).await;
        let result = response.result.unwrap();
        let names: Vec<_> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();

        assert_eq!(names, vec!["fetch", "fetch-wikipedia-page", "search-wikipedia"]);
        assert_eq!(result["tools"][0]["inputSchema"]["required"][0], "url");
    }

    #[tokio::test]
    async fn test_call_fetch_tool() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("success!"))
            .mount(&upstream)
            .await;

        let response = call(
            &server(),
            "tools/call",
            serde_json::json!({ "name": "fetch", "arguments": { "url": upstream.uri() } }),
        )
        .await;

        assert_eq!(
            response.result.unwrap(),
            serde_json::json!({ "content": [{ "type": "text", "text": "success!" }] })
        );
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let response = call(
            &server(),
            "tools/call",
            serde_json::json!({ "name": "nope", "arguments": {} }),
        )
        .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert!(error.message.contains("nope"));
    }

    #[tokio::test]
    async fn test_call_with_invalid_arguments() {
        let response = call(
            &server(),
            "tools/call",
            serde_json::json!({ "name": "fetch-wikipedia-page", "arguments": { "id": "abc" } }),
        )
        .await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_unknown_method_and_ping() {
        let server = server();
        let response = call(&server, "resources/list", Value::Null).await;
        assert_eq!(response.error.unwrap().code, -32601);

        let response = call(&server, "ping", Value::Null).await;
        assert_eq!(response.result.unwrap(), serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let response = server()
            .handle_request(JsonRpcRequest::notification("notifications/initialized"))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_malformed_messages() {
        let server = server();

        let response = server.handle_message("{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, -32700);
        assert_eq!(response.id, Value::Null);

        let response = server
            .handle_message(r#"{"jsonrpc":"1.0","id":7,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32600);
        assert_eq!(response.id, serde_json::json!(7));
    }

    #[tokio::test]
    async fn test_serve_over_lines() {
        let server = server();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );

        let (mut client, server_side) = tokio::io::duplex(64 * 1024);
        server.serve(input.as_bytes(), server_side).await.unwrap();

        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();

        let responses: Vec<JsonRpcResponse> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].id, serde_json::json!(1));
        assert_eq!(responses[1].id, serde_json::json!(2));
    }
}
