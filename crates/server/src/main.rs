use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod api;
mod config;
mod session;

use config::{AppState, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "tmcp-fetch")]
#[command(about = "MCP endpoint for fetching URLs as Markdown and reading Wikipedia", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "tmcp-fetch.toml", env = "TMCP_FETCH_CONFIG")]
    config: PathBuf,

    /// Port to listen on (overrides the configuration file)
    #[arg(short, long, env = "TMCP_FETCH_PORT")]
    port: Option<u16>,

    /// Host to bind to (overrides the configuration file)
    #[arg(long, env = "TMCP_FETCH_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tmcp_fetch=info,tower_http=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let args = Args::parse();

    tracing::info!("Starting tmcp-fetch {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = ServerConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(host) = args.host {
        config.http.host = host;
    }

    let state = AppState::new(&config)?;

    api::serve(&config.bind_addr(), state).await?;

    Ok(())
}
