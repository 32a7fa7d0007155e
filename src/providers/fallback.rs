use crate::config::AppConfig;
use crate::error::DishcoveryError;
use crate::providers::{ChatRequest, LlmProvider, ProviderFactory};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::sleep;

/// Tries a chain of providers in order, retrying each one before moving on.
pub struct FallbackProvider {
    providers: Vec<Box<dyn LlmProvider>>,
    retry_attempts: u32,
    retry_delay_ms: u64,
}

impl FallbackProvider {
    /// Create a new fallback provider from configuration, giving every
    /// provider in the chain the same per-request `timeout`
    pub fn new(config: &AppConfig, timeout: Duration) -> Result<Self, DishcoveryError> {
        if !config.fallback.enabled {
            // If fallback is disabled, just use the default provider once
            let default_provider = ProviderFactory::get_default_provider(config, timeout)?;
            return Ok(FallbackProvider {
                providers: vec![default_provider],
                retry_attempts: 1,
                retry_delay_ms: 0,
            });
        }

        let mut providers = Vec::new();

        // Create providers in fallback order
        for provider_name in &config.fallback.order {
            if let Some(provider_config) = config.providers.get(provider_name) {
                if provider_config.enabled {
                    match ProviderFactory::create(provider_name, provider_config, timeout) {
                        Ok(provider) => {
                            info!("Added '{}' to fallback chain", provider_name);
                            providers.push(provider);
                        }
                        Err(e) => {
                            warn!("Failed to initialize provider '{}': {}", provider_name, e);
                        }
                    }
                }
            } else {
                warn!(
                    "Provider '{}' in fallback order not found in configuration",
                    provider_name
                );
            }
        }

        if providers.is_empty() {
            return Err(DishcoveryError::Builder(
                "No providers available in fallback configuration".to_string(),
            ));
        }

        Ok(FallbackProvider {
            providers,
            retry_attempts: config.fallback.retry_attempts.max(1),
            retry_delay_ms: config.fallback.retry_delay_ms,
        })
    }

    /// Try a provider with linearly growing delays between attempts.
    /// Only [`DishcoveryError::ModelCall`] is retried; any other error would
    /// fail the same way again.
    async fn try_provider_with_retry(
        &self,
        provider: &dyn LlmProvider,
        request: &ChatRequest,
    ) -> Result<String, DishcoveryError> {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!(
                "Calling {} (attempt {}/{})",
                provider.provider_name(),
                attempt,
                self.retry_attempts
            );

            match provider.complete(request).await {
                Ok(result) => {
                    info!("Model call succeeded using {}", provider.provider_name());
                    return Ok(result);
                }
                Err(e @ DishcoveryError::ModelCall(_)) => {
                    warn!(
                        "Provider {} failed (attempt {}/{}): {}",
                        provider.provider_name(),
                        attempt,
                        self.retry_attempts,
                        e
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!("Provider {} failed: {}", provider.provider_name(), e);
                    return Err(e);
                }
            }

            if attempt < self.retry_attempts {
                let delay = Duration::from_millis(self.retry_delay_ms * attempt as u64);
                debug!("Waiting {:?} before retry", delay);
                sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DishcoveryError::ModelCall(format!("{} was never called", provider.provider_name()))
        }))
    }
}

#[async_trait]
impl LlmProvider for FallbackProvider {
    fn provider_name(&self) -> &str {
        match self.providers.as_slice() {
            [single] => single.provider_name(),
            _ => "fallback",
        }
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, DishcoveryError> {
        let mut all_errors: Vec<String> = Vec::new();

        for provider in &self.providers {
            match self.try_provider_with_retry(provider.as_ref(), request).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    // A single provider keeps its own error untouched
                    if self.providers.len() == 1 {
                        return Err(e);
                    }
                    all_errors.push(format!("{}: {}", provider.provider_name(), e));
                }
            }
        }

        Err(DishcoveryError::ModelCall(format!(
            "All providers failed:\n{}",
            all_errors.join("\n")
        )))
    }
}
