//! Structured Extraction Fallback: one image, one provider call, one
//! validated [`DocumentPayload`].
//!
//! No retries here. The queue worker owns retry policy.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use paperflow_core::DocumentPayload;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::VisionError;

#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    /// Extracts a document payload from a PNG-encoded page.
    async fn extract(&self, png: &[u8]) -> Result<DocumentPayload, VisionError>;

    fn model(&self) -> &str;
}

const SYSTEM_PROMPT: &str = "You are an expert in document understanding. \
Extract the requested fields from the provided document image. \
Always respond with valid JSON matching the described schema.";

const SCHEMA_DESCRIPTION: &str = "Return a JSON object with keys: document_type (offer|invoice|receipt), \
document_number, issue_date, due_date, total {currency, amount}, subtotal {currency, amount}, \
tax {currency, amount}, supplier {name,address,vat_number}, customer {name,address,vat_number}, \
items (list of {description, quantity, unit_price, total}), and notes.";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// OpenAI-compatible chat completions client in JSON mode.
#[derive(Debug, Clone)]
pub struct OpenAiExtractor {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiExtractor {
    pub fn new(config: OpenAiConfig) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VisionError::backend("http client", e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

/// Request body for one page.
pub fn build_request(model: &str, png: &[u8]) -> Value {
    let data_url = format!("data:image/png;base64,{}", BASE64.encode(png));
    json!({
        "model": model,
        "temperature": 0.1,
        "response_format": { "type": "json_object" },
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": SCHEMA_DESCRIPTION },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }
        ]
    })
}

/// Pulls the message content out of a chat completion and validates it.
pub fn parse_completion(body: &Value) -> Result<DocumentPayload, VisionError> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| VisionError::ExtractionParseFailed("empty response from provider".into()))?;
    DocumentPayload::from_json_str(content).map_err(|e| {
        warn!(response = content, "provider response failed validation");
        VisionError::from(e)
    })
}

#[async_trait]
impl StructuredExtractor for OpenAiExtractor {
    async fn extract(&self, png: &[u8]) -> Result<DocumentPayload, VisionError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&build_request(&self.config.model, png))
            .send()
            .await
            .map_err(|e| VisionError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, detail = %detail, "provider request failed");
            return Err(VisionError::UpstreamUnavailable(format!("provider returned {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| VisionError::ExtractionParseFailed(e.to_string()))?;
        let payload = parse_completion(&body)?;
        info!(model = %self.config.model, document_type = payload.document_type.as_str(), "provider extraction completed");
        Ok(payload)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperflow_core::DocumentType;

    fn completion(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[test]
    fn request_carries_image_and_json_mode() {
        let body = build_request("gpt-4o-mini", b"png");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["temperature"], 0.1);
        let url = body["messages"][1]["content"][1]["image_url"]["url"].as_str().unwrap();
        assert_eq!(url, "data:image/png;base64,cG5n");
    }

    #[test]
    fn valid_completion_is_parsed() {
        let payload = parse_completion(&completion(r#"{"document_type":"invoice"}"#)).unwrap();
        assert_eq!(payload.document_type, DocumentType::Invoice);
    }

    #[test]
    fn empty_completion_is_a_parse_failure() {
        let err = parse_completion(&completion("  ")).unwrap_err();
        assert!(matches!(err, VisionError::ExtractionParseFailed(_)));
        let err = parse_completion(&json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, VisionError::ExtractionParseFailed(_)));
    }

    #[test]
    fn schema_mismatch_is_a_parse_failure() {
        let err = parse_completion(&completion(r#"{"document_type":"memo"}"#)).unwrap_err();
        assert!(matches!(err, VisionError::ExtractionParseFailed(_)));
    }

    #[tokio::test]
    async fn unreachable_provider_is_upstream_unavailable() {
        let mut config = OpenAiConfig::new("test-key");
        config.base_url = "http://127.0.0.1:9".to_string();
        config.timeout = Duration::from_secs(2);
        let extractor = OpenAiExtractor::new(config).unwrap();
        let err = extractor.extract(b"png").await.unwrap_err();
        assert!(matches!(err, VisionError::UpstreamUnavailable(_)));
    }
}
