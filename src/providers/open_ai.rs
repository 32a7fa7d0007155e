use crate::config::ProviderConfig;
use crate::error::DishcoveryError;
use crate::providers::{
    extract_text, http_client, send_json, ChatRequest, ContentPart, LlmProvider, DEFAULT_TIMEOUT,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible chat completions provider
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, DishcoveryError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                DishcoveryError::Builder(
                    "OPENAI_API_KEY not found in config or environment".to_string(),
                )
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(OpenAIProvider {
            client: http_client(timeout)?,
            api_key,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        OpenAIProvider {
            client: http_client(DEFAULT_TIMEOUT).unwrap_or_else(|_| Client::new()),
            api_key,
            base_url,
            model,
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    fn user_content(request: &ChatRequest) -> Value {
        if !request.has_images() {
            return Value::String(request.user_text());
        }
        let parts: Vec<Value> = request
            .user
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => json!({"type": "text", "text": text}),
                ContentPart::ImageUrl(url) => {
                    json!({"type": "image_url", "image_url": {"url": url}})
                }
            })
            .collect();
        Value::Array(parts)
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, DishcoveryError> {
        let http_request = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": request.system},
                    {"role": "user", "content": Self::user_content(request)}
                ],
                "temperature": self.temperature,
                "max_tokens": self.max_tokens
            }));

        let body = send_json(self.provider_name(), http_request).await?;
        extract_text(self.provider_name(), &body, "/choices/0/message/content")
    }
}
