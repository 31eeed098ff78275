use super::{html_to_markdown, ConversionBatch, ConversionRequest, ConversionResult, MarkdownConverter};
use crate::classify::should_convert;
use crate::error::Result;

const SUPPORTED: &[&str] = &["text/html"];

/// In-process HTML to Markdown converter
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalConverter;

impl LocalConverter {
    pub fn new() -> Self {
        Self
    }

    fn convert_one(request: &ConversionRequest) -> ConversionResult {
        if should_convert(Some(&request.mime), SUPPORTED) {
            ConversionResult::Success {
                data: html_to_markdown(&request.contents),
            }
        } else {
            ConversionResult::Error {
                message: format!("unsupported mime type {}", request.mime),
            }
        }
    }
}

#[async_trait::async_trait]
impl MarkdownConverter for LocalConverter {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn supported(&self) -> Result<Vec<String>> {
        Ok(SUPPORTED.iter().map(|mime| mime.to_string()).collect())
    }

    async fn convert(&self, requests: Vec<ConversionRequest>) -> Result<ConversionBatch> {
        Ok(ConversionBatch::from_results(requests.into_iter().map(
            |request| {
                let result = Self::convert_one(&request);
                (request.key, result)
            },
        )))
    }
}
