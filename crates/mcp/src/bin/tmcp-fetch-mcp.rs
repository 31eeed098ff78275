// Standalone MCP server binary (stdio transport)

use anyhow::{Context, Result};
use std::sync::Arc;
use tmcp_fetch_core::convert::{CloudflareConverter, LocalConverter, MarkdownConverter};
use tmcp_fetch_core::{HttpFetcher, USER_AGENT};
use tmcp_fetch_mcp::{build_registry, McpServer, ToolServices};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::info!("tmcp-fetch MCP server starting...");

    let user_agent =
        std::env::var("TMCP_FETCH_USER_AGENT").unwrap_or_else(|_| USER_AGENT.to_string());
    let fetcher =
        HttpFetcher::with_user_agent(&user_agent).context("Failed to create HTTP client")?;

    // Remote conversion is opt-in through Cloudflare credentials
    let converter: Arc<dyn MarkdownConverter> = match (
        std::env::var("CLOUDFLARE_ACCOUNT_ID"),
        std::env::var("CLOUDFLARE_API_TOKEN"),
    ) {
        (Ok(account_id), Ok(api_token)) => {
            tracing::info!("Using Cloudflare conversion backend");
            Arc::new(CloudflareConverter::new(
                fetcher.client().clone(),
                account_id,
                api_token,
            ))
        }
        _ => Arc::new(LocalConverter::new()),
    };

    let wikipedia_endpoint = std::env::var("TMCP_FETCH_WIKIPEDIA_ENDPOINT").ok();
    let services = ToolServices::new(fetcher, converter, wikipedia_endpoint.as_deref());

    let server = McpServer::new(build_registry(services));
    server.start().await?;

    Ok(())
}
