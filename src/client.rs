use std::fmt;
use std::io::{Read, Seek};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::composer::RecipeComposer;
use crate::config::{AppConfig, ProviderConfig};
use crate::detector::IngredientDetector;
use crate::error::DishcoveryError;
use crate::model::{Generation, Ingredients, Preferences, RecipeDocument};
use crate::normalizer::{self, ImageOptions, NormalizedImage};
use crate::providers::{FallbackProvider, LlmProvider, ProviderFactory};

/// Model backends selectable from the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    /// Convert to provider name string used by the factory
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(format!(
                "unknown provider '{}', expected one of: {}",
                other,
                ProviderFactory::available_providers().join(", ")
            )),
        }
    }
}

/// Builder for a [`Dishcovery`] client
#[derive(Default)]
pub struct DishcoveryBuilder {
    config: Option<AppConfig>,
    provider_kind: Option<ProviderKind>,
    provider: Option<Arc<dyn LlmProvider>>,
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
    image_options: Option<ImageOptions>,
}

impl DishcoveryBuilder {
    /// Use this configuration instead of loading `config.toml` and the environment
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Select the model provider
    ///
    /// # Example
    /// ```
    /// use dishcovery::{Dishcovery, ProviderKind};
    ///
    /// let builder = Dishcovery::builder().provider(ProviderKind::Anthropic);
    /// ```
    pub fn provider(mut self, kind: ProviderKind) -> Self {
        self.provider_kind = Some(kind);
        self
    }

    /// Use an already constructed provider. Configuration is then only
    /// consulted for image options.
    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the API key instead of relying on environment variables or config files
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the model identifier
    ///
    /// # Example
    /// ```
    /// use dishcovery::Dishcovery;
    ///
    /// let builder = Dishcovery::builder().model("gpt-4o");
    /// ```
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Point the provider at a different endpoint (proxy, local server)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set a timeout for each model request
    ///
    /// # Example
    /// ```
    /// use dishcovery::Dishcovery;
    /// use std::time::Duration;
    ///
    /// let builder = Dishcovery::builder().timeout(Duration::from_secs(20));
    /// ```
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Override how uploads are resized and compressed
    pub fn image_options(mut self, options: ImageOptions) -> Self {
        self.image_options = Some(options);
        self
    }

    fn has_overrides(&self) -> bool {
        self.provider_kind.is_some()
            || self.api_key.is_some()
            || self.model.is_some()
            || self.base_url.is_some()
            || self.temperature.is_some()
    }

    /// Construct the client
    ///
    /// # Errors
    /// Returns [`DishcoveryError::Config`] if configuration cannot be loaded and
    /// [`DishcoveryError::Builder`] if the selected provider cannot be created
    /// (unknown, disabled, or missing an API key) or the timeout is zero.
    pub fn build(self) -> Result<Dishcovery, DishcoveryError> {
        if let Some(provider) = self.provider.clone() {
            let image_options = match (self.image_options, self.config) {
                (Some(options), _) => options,
                (None, Some(config)) => config.image,
                (None, None) => ImageOptions::default(),
            };
            return Ok(Dishcovery::from_parts(provider, image_options));
        }

        let has_overrides = self.has_overrides();
        let mut config = match self.config {
            Some(config) => config,
            None => AppConfig::load()?,
        };

        let timeout = self.timeout.unwrap_or_else(|| config.request_timeout());
        if timeout.is_zero() {
            return Err(DishcoveryError::Builder(
                "timeout must be greater than zero".to_string(),
            ));
        }

        if has_overrides {
            let name = self
                .provider_kind
                .map(|kind| kind.as_str().to_string())
                .unwrap_or_else(|| config.default_provider.clone());
            let mut provider_config = config
                .providers
                .get(&name)
                .cloned()
                .unwrap_or_else(|| ProviderConfig::for_provider(&name));

            if self.provider_kind.is_some() {
                provider_config.enabled = true;
                // An explicit provider choice bypasses the fallback chain
                config.fallback.enabled = false;
            }
            if let Some(key) = self.api_key {
                provider_config.api_key = Some(key);
            }
            if let Some(model) = self.model {
                provider_config.model = model;
            }
            if let Some(url) = self.base_url {
                provider_config.base_url = Some(url);
            }
            if let Some(temperature) = self.temperature {
                provider_config.temperature = temperature;
            }

            debug!("Using provider '{}' with model {}", name, provider_config.model);
            config.providers.insert(name.clone(), provider_config);
            config.default_provider = name;
        }

        let provider = FallbackProvider::new(&config, timeout)?;
        let image_options = self.image_options.unwrap_or(config.image);
        Ok(Dishcovery::from_parts(Arc::new(provider), image_options))
    }
}

/// Photo-to-recipes client.
///
/// Create one at startup and reuse it; it holds the model connection and the
/// image settings and nothing else.
#[derive(Clone)]
pub struct Dishcovery {
    provider: Arc<dyn LlmProvider>,
    detector: IngredientDetector,
    composer: RecipeComposer,
    image_options: ImageOptions,
}

impl Dishcovery {
    /// Creates a new builder
    ///
    /// # Example
    /// ```
    /// use dishcovery::Dishcovery;
    ///
    /// let builder = Dishcovery::builder();
    /// ```
    pub fn builder() -> DishcoveryBuilder {
        DishcoveryBuilder::default()
    }

    fn from_parts(provider: Arc<dyn LlmProvider>, image_options: ImageOptions) -> Self {
        Dishcovery {
            detector: IngredientDetector::new(provider.clone()),
            composer: RecipeComposer::new(provider.clone()),
            provider,
            image_options,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn image_options(&self) -> &ImageOptions {
        &self.image_options
    }

    /// Normalize an upload with this client's image options
    pub fn normalize<R: Read + Seek>(&self, reader: R) -> Result<NormalizedImage, DishcoveryError> {
        normalizer::normalize(reader, &self.image_options)
    }

    pub async fn detect_ingredients(
        &self,
        image: &NormalizedImage,
    ) -> Result<Ingredients, DishcoveryError> {
        self.detector.detect(image).await
    }

    pub async fn compose_recipes(
        &self,
        ingredients: &Ingredients,
        preferences: &Preferences,
    ) -> Result<RecipeDocument, DishcoveryError> {
        self.composer.compose(ingredients, preferences).await
    }

    /// Run the whole pipeline: normalize, detect, then compose.
    ///
    /// Composition only starts after detection has returned, and runs even
    /// when the detector answered `unsure`.
    pub async fn generate<R: Read + Seek>(
        &self,
        reader: R,
        preferences: &Preferences,
    ) -> Result<Generation, DishcoveryError> {
        let image = self.normalize(reader)?;
        let ingredients = self.detect_ingredients(&image).await?;
        let recipes = self.compose_recipes(&ingredients, preferences).await?;
        Ok(Generation {
            ingredients,
            recipes,
        })
    }
}
