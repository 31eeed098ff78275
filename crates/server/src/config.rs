use crate::session::{self, SessionStore};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tmcp_fetch_core::convert::{
    CloudflareConverter, LocalConverter, MarkdownConverter, CLOUDFLARE_BASE_URL,
};
use tmcp_fetch_core::{wikipedia, HttpFetcher, USER_AGENT};
use tmcp_fetch_mcp::{build_registry, McpServer, ToolServices};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub wikipedia: WikipediaConfig,

    #[serde(default)]
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds without a request before a session expires
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_session_idle_secs() -> u64 {
    session::DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_max_sessions() -> usize {
    session::DEFAULT_MAX_SESSIONS
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            session_idle_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikipediaConfig {
    #[serde(default = "default_wikipedia_endpoint")]
    pub endpoint: String,
}

fn default_wikipedia_endpoint() -> String {
    wikipedia::DEFAULT_ENDPOINT.to_string()
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            endpoint: default_wikipedia_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionBackend {
    /// In-process HTML to Markdown
    #[default]
    Local,
    /// Cloudflare Workers AI batched conversion
    Cloudflare,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    #[serde(default)]
    pub backend: ConversionBackend,

    #[serde(default)]
    pub account_id: Option<String>,

    /// Falls back to `CLOUDFLARE_API_TOKEN`
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_conversion_base_url")]
    pub base_url: String,
}

fn default_conversion_base_url() -> String {
    CLOUDFLARE_BASE_URL.to_string()
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            backend: ConversionBackend::default(),
            account_id: None,
            api_token: None,
            base_url: default_conversion_base_url(),
        }
    }
}

impl ConversionConfig {
    /// Build the configured converter, sharing the fetcher's HTTP client
    pub fn build(&self, fetcher: &HttpFetcher) -> Result<Arc<dyn MarkdownConverter>> {
        match self.backend {
            ConversionBackend::Local => Ok(Arc::new(LocalConverter::new())),
            ConversionBackend::Cloudflare => {
                let Some(account_id) = self.account_id.clone() else {
                    bail!("conversion.account_id is required for the cloudflare backend");
                };
                let Some(api_token) = self
                    .api_token
                    .clone()
                    .or_else(|| std::env::var("CLOUDFLARE_API_TOKEN").ok())
                else {
                    bail!("conversion.api_token or CLOUDFLARE_API_TOKEN is required for the cloudflare backend");
                };

                Ok(Arc::new(
                    CloudflareConverter::new(fetcher.client().clone(), account_id, api_token)
                        .with_base_url(&self.base_url),
                ))
            }
        }
    }
}

impl ServerConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .context("Failed to read configuration file")?;
            toml::from_str(&content).context("Failed to parse configuration file")
        } else {
            tracing::info!("Configuration file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<McpServer>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let fetcher = HttpFetcher::with_user_agent(&config.fetch.user_agent)
            .context("Failed to create HTTP client")?;

        let converter = config
            .conversion
            .build(&fetcher)
            .context("Failed to create conversion backend")?;
        tracing::info!(backend = converter.name(), "conversion backend ready");

        let services = ToolServices::new(fetcher, converter, Some(&config.wikipedia.endpoint));
        let server = Arc::new(McpServer::new(build_registry(services)));

        Ok(Self {
            server,
            sessions: SessionStore::with_limits(
                config.http.session_idle_secs,
                config.http.max_sessions,
            ),
        })
    }
}
