mod anthropic;
mod factory;
mod fallback;
mod ollama;
mod open_ai;

pub use anthropic::AnthropicProvider;
pub use factory::ProviderFactory;
pub use fallback::FallbackProvider;
pub use ollama::OllamaProvider;
pub use open_ai::OpenAIProvider;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

use crate::error::DishcoveryError;

/// One part of the user message in a chat request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// Image embedded as a `data:<mime>;base64,...` URL
    ImageUrl(String),
}

/// A provider-neutral chat request: a system instruction followed by a
/// single user message made of ordered text and image parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system: String,
    pub user: Vec<ContentPart>,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>) -> Self {
        ChatRequest {
            system: system.into(),
            user: Vec::new(),
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.user.push(ContentPart::Text(text.into()));
        self
    }

    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.user.push(ContentPart::ImageUrl(url.into()));
        self
    }

    /// All text parts joined by blank lines
    pub fn user_text(&self) -> String {
        self.user
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::ImageUrl(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.user.iter().filter_map(|part| match part {
            ContentPart::ImageUrl(url) => Some(url.as_str()),
            ContentPart::Text(_) => None,
        })
    }

    pub fn has_images(&self) -> bool {
        self.image_urls().next().is_some()
    }
}

/// Unified trait for all model providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn provider_name(&self) -> &str;

    /// Send the request and return the model's text answer
    async fn complete(&self, request: &ChatRequest) -> Result<String, DishcoveryError>;
}

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client(timeout: Duration) -> Result<Client, DishcoveryError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DishcoveryError::Builder(format!("Failed to create HTTP client: {}", e)))
}

/// Send a request and return the JSON body, treating non-2xx statuses as errors.
pub(crate) async fn send_json(
    provider: &str,
    request: RequestBuilder,
) -> Result<Value, DishcoveryError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(DishcoveryError::ModelCall(format!(
            "{} API error ({}): {}",
            provider, status, error_text
        )));
    }

    let body: Value = response.json().await.map_err(|e| {
        DishcoveryError::ModelCall(format!("{} returned a malformed body: {}", provider, e))
    })?;
    debug!("{} response: {:?}", provider, body);
    Ok(body)
}

/// Pull a string out of a response body, or explain what was missing.
pub(crate) fn extract_text(
    provider: &str,
    body: &Value,
    pointer: &str,
) -> Result<String, DishcoveryError> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            DishcoveryError::ModelCall(format!(
                "Failed to extract content from {} response. Response: {}",
                provider, body
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_parts() {
        let request = ChatRequest::new("system")
            .text("first")
            .image_url("data:image/jpeg;base64,AAAA")
            .text("second");

        assert_eq!(request.user.len(), 3);
        assert_eq!(request.user_text(), "first\n\nsecond");
        assert!(request.has_images());
        assert_eq!(
            request.image_urls().collect::<Vec<_>>(),
            vec!["data:image/jpeg;base64,AAAA"]
        );
    }

    #[test]
    fn test_extract_text() {
        let body = json!({"choices": [{"message": {"content": "hello"}}]});
        assert_eq!(
            extract_text("openai", &body, "/choices/0/message/content").unwrap(),
            "hello"
        );

        let err = extract_text("openai", &json!({"choices": []}), "/choices/0/message/content")
            .unwrap_err();
        assert!(matches!(err, DishcoveryError::ModelCall(_)));
        assert!(err.to_string().contains("Failed to extract content"));
    }
}
