//! LLM HTTP client
//!
//! One request/response round trip against the messages API, with a fixed
//! number of retries and a fixed delay between them.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::LlmSettings;
use crate::error::{Error, Result};
use crate::types::*;

/// One completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub temperature: f64,
}

pub struct LlmClient {
    settings: LlmSettings,
    http_client: reqwest::Client,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            settings,
            http_client,
        })
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    /// POST /v1/messages - returns the first text block of the reply
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.send_once(request).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.settings.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.settings.max_retries,
                        error = %e,
                        "LLM request failed, retrying"
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<String> {
        let body = MessagesRequest {
            model: request.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: request.temperature,
            system: request.system.clone(),
            messages: vec![ChatMessage::user(request.prompt.clone())],
        };

        info!(model = %request.model, url = %self.settings.api_url, "Calling LLM API");

        let response = self
            .http_client
            .post(&self.settings.api_url)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", &self.settings.api_version)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(status = %status, bytes = text.len(), "LLM API responded");

        let parsed: Option<MessagesResponse> = serde_json::from_str(&text).ok();

        if let Some(error) = parsed.as_ref().and_then(|r| r.error.as_ref()) {
            return Err(Error::Api {
                status: Some(status.as_u16()),
                message: error
                    .message
                    .clone()
                    .or_else(|| error.error_type.clone())
                    .unwrap_or_else(|| "API Error".to_string()),
            });
        }

        if !status.is_success() {
            return Err(Error::Api {
                status: Some(status.as_u16()),
                message: truncate(&text, 500),
            });
        }

        let parsed = parsed.ok_or_else(|| Error::UnexpectedResponse(truncate(&text, 500)))?;
        parsed
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| Error::UnexpectedResponse("no text content block".to_string()))
    }
}

fn is_retryable(error: &Error) -> bool {
    matches!(error, Error::Api { .. } | Error::Http(_))
}

/// Parse the JSON object out of a model reply.
///
/// Replies are supposed to be a bare object, but fenced code blocks and a
/// sentence of preamble show up often enough that we slice from the first
/// `{` to the last `}` when a direct parse fails.
pub fn extract_json_object(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(Error::InvalidWorkflow(format!(
            "model reply contains no JSON object: {}",
            truncate(trimmed, 500)
        )));
    };
    if end < start {
        return Err(Error::InvalidWorkflow(format!(
            "model reply contains no JSON object: {}",
            truncate(trimmed, 500)
        )));
    }

    serde_json::from_str(&trimmed[start..=end]).map_err(|e| Error::json("model reply", e))
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bare_object() {
        let value = extract_json_object(r#"{"name": "T"}"#).unwrap();
        assert_eq!(value["name"], "T");
    }

    #[test]
    fn test_extract_fenced_object() {
        let reply = "Here you go:\n```json\n{\"name\": \"T\", \"nodes\": []}\n```";
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["nodes"], serde_json::json!([]));
    }

    #[test]
    fn test_extract_rejects_non_object() {
        assert!(extract_json_object("no json here").is_err());
        assert!(extract_json_object("} backwards {").is_err());
        assert!(extract_json_object("{ not: json }").is_err());
    }
}
