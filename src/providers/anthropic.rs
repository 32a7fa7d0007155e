use crate::config::ProviderConfig;
use crate::error::DishcoveryError;
use crate::normalizer::split_data_url;
use crate::providers::{
    extract_text, http_client, send_json, ChatRequest, ContentPart, LlmProvider, DEFAULT_TIMEOUT,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider from configuration
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, DishcoveryError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                DishcoveryError::Builder(
                    "ANTHROPIC_API_KEY not found in config or environment".to_string(),
                )
            })?;

        Ok(AnthropicProvider {
            client: http_client(timeout)?,
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        AnthropicProvider {
            client: http_client(DEFAULT_TIMEOUT).unwrap_or_else(|_| Client::new()),
            api_key,
            base_url,
            model,
            temperature: 0.7,
            max_tokens: 4000,
        }
    }

    /// Anthropic takes images as base64 sources rather than URLs
    fn user_content(request: &ChatRequest) -> Result<Vec<Value>, DishcoveryError> {
        request
            .user
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => Ok(json!({"type": "text", "text": text})),
                ContentPart::ImageUrl(url) => {
                    let (media_type, data) = split_data_url(url)?;
                    Ok(json!({
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": media_type,
                            "data": data
                        }
                    }))
                }
            })
            .collect()
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, DishcoveryError> {
        let http_request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
                "system": request.system,
                "messages": [
                    {
                        "role": "user",
                        "content": Self::user_content(request)?
                    }
                ]
            }));

        let body = send_json(self.provider_name(), http_request).await?;
        extract_text(self.provider_name(), &body, "/content/0/text")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_complete_with_image() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", API_VERSION)
            .match_body(Matcher::PartialJson(json!({
                "system": "look closely",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "ingredients?"},
                        {"type": "image", "source": {
                            "type": "base64",
                            "media_type": "image/jpeg",
                            "data": "aGVsbG8="
                        }}
                    ]
                }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content": [{"type": "text", "text": "- egg"}]}"#)
            .create_async()
            .await;

        let provider = AnthropicProvider::with_base_url(
            "test-key".to_string(),
            server.url(),
            "claude-3-5-sonnet-20241022".to_string(),
        );
        let request = ChatRequest::new("look closely")
            .text("ingredients?")
            .image_url("data:image/jpeg;base64,aGVsbG8=");

        assert_eq!(provider.complete(&request).await.unwrap(), "- egg");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_image_url_is_rejected_before_sending() {
        let provider = AnthropicProvider::with_base_url(
            "test-key".to_string(),
            "http://127.0.0.1:1".to_string(),
            "claude-3-5-sonnet-20241022".to_string(),
        );
        let request = ChatRequest::new("s").image_url("https://example.com/photo.jpg");

        let result = provider.complete(&request).await;
        assert!(matches!(result, Err(DishcoveryError::InvalidInput(_))));
    }

    #[test]
    fn test_provider_name() {
        let config = ProviderConfig {
            api_key: Some("test-key".to_string()),
            ..ProviderConfig::for_provider("anthropic")
        };

        let provider = AnthropicProvider::new(&config, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(provider.provider_name(), "anthropic");
    }
}
