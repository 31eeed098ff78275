// Remote conversion through the Workers AI "to markdown" REST API

use super::{ConversionBatch, ConversionRequest, ConversionResult, MarkdownConverter};
use crate::error::{FetchError, Result};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Batched converter backed by Cloudflare's `ai/tomarkdown` endpoint
#[derive(Debug, Clone)]
pub struct CloudflareConverter {
    client: reqwest::Client,
    base_url: String,
    account_id: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SupportedType {
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct RemoteResult {
    name: String,
    format: String,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl RemoteResult {
    fn into_entry(self) -> (String, ConversionResult) {
        let result = if self.format == "error" {
            ConversionResult::Error {
                message: self.error.unwrap_or_else(|| "unknown error".to_string()),
            }
        } else {
            ConversionResult::Success {
                data: self.data.unwrap_or_default(),
            }
        };
        (self.name, result)
    }
}

impl CloudflareConverter {
    pub fn new(
        client: reqwest::Client,
        account_id: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            account_id: account_id.into(),
            api_token: api_token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!(
            "{}/accounts/{}/ai/tomarkdown{}",
            self.base_url, self.account_id, suffix
        )
    }

    async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        // A backend status is a conversion failure, not a status of the fetched resource
        if !status.is_success() {
            return Err(FetchError::Conversion(format!(
                "conversion backend returned {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&body)?;

        match envelope.result {
            Some(result) if envelope.success => Ok(result),
            _ => {
                let detail = envelope
                    .errors
                    .iter()
                    .map(|e| match e.code {
                        Some(code) => format!("{} ({})", e.message, code),
                        None => e.message.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(FetchError::Conversion(if detail.is_empty() {
                    "backend reported failure".to_string()
                } else {
                    detail
                }))
            }
        }
    }
}

#[async_trait::async_trait]
impl MarkdownConverter for CloudflareConverter {
    fn name(&self) -> &'static str {
        "cloudflare"
    }

    async fn supported(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.endpoint("/supported"))
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let types: Vec<SupportedType> = Self::read_envelope(response).await?;
        Ok(types.into_iter().map(|t| t.mime_type).collect())
    }

    async fn convert(&self, requests: Vec<ConversionRequest>) -> Result<ConversionBatch> {
        if requests.is_empty() {
            return Ok(ConversionBatch::default());
        }

        let count = requests.len();
        let mut form = Form::new();
        for request in requests {
            let part = Part::text(request.contents)
                .file_name(request.key)
                .mime_str(&request.mime)
                .map_err(|e| {
                    FetchError::Conversion(format!("invalid mime type {}: {}", request.mime, e))
                })?;
            form = form.part("files", part);
        }

        tracing::debug!(count, "submitting conversion batch");

        let response = self
            .client
            .post(self.endpoint(""))
            .bearer_auth(&self.api_token)
            .multipart(form)
            .send()
            .await?;

        let results: Vec<RemoteResult> = Self::read_envelope(response).await?;
        Ok(ConversionBatch::from_results(
            results.into_iter().map(RemoteResult::into_entry),
        ))
    }
}
