use crate::config::ProviderConfig;
use crate::error::DishcoveryError;
use crate::normalizer::split_data_url;
use crate::providers::{extract_text, http_client, send_json, ChatRequest, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Local Ollama server, using the native `/api/chat` endpoint so images can
/// be attached as raw base64.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaProvider {
    /// Create a new Ollama provider from configuration
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, DishcoveryError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(OllamaProvider {
            client: http_client(timeout)?,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, DishcoveryError> {
        let images = request
            .image_urls()
            .map(|url| split_data_url(url).map(|(_, payload)| payload))
            .collect::<Result<Vec<_>, _>>()?;

        let mut user = json!({"role": "user", "content": request.user_text()});
        if !images.is_empty() {
            user["images"] = json!(images);
        }

        let http_request = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&json!({
                "model": self.model,
                "stream": false,
                "messages": [
                    {"role": "system", "content": request.system},
                    user
                ],
                "options": {
                    "temperature": self.temperature,
                    "num_predict": self.max_tokens
                }
            }));

        let body = send_json(self.provider_name(), http_request).await?;

        // Ollama reports some failures with a 200 and an error field
        if let Some(error) = body.get("error") {
            let message = error.as_str().unwrap_or("Unknown error");
            return Err(DishcoveryError::ModelCall(format!(
                "Ollama API error: {}",
                message
            )));
        }

        extract_text(self.provider_name(), &body, "/message/content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn provider_for(url: String) -> OllamaProvider {
        let config = ProviderConfig {
            base_url: Some(url),
            ..ProviderConfig::for_provider("ollama")
        };
        OllamaProvider::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_complete_attaches_raw_base64() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "model": "llava",
                "stream": false,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "what is it?", "images": ["aGVsbG8="]}
                ]
            })))
            .with_status(200)
            .with_body(r#"{"message": {"role": "assistant", "content": "unsure"}}"#)
            .create_async()
            .await;

        let request = ChatRequest::new("sys")
            .text("what is it?")
            .image_url("data:image/jpeg;base64,aGVsbG8=");

        let result = provider_for(server.url()).complete(&request).await.unwrap();
        assert_eq!(result, "unsure");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_field() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(r#"{"error": "model 'llava' not found"}"#)
            .create_async()
            .await;

        let result = provider_for(server.url())
            .complete(&ChatRequest::new("s").text("u"))
            .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_provider_name() {
        let provider = provider_for(DEFAULT_BASE_URL.to_string());
        assert_eq!(provider.provider_name(), "ollama");
    }
}
