use std::sync::Arc;

use log::{debug, info};

use crate::error::DishcoveryError;
use crate::model::Ingredients;
use crate::normalizer::NormalizedImage;
use crate::prompts::{DETECT_SYSTEM_PROMPT, DETECT_USER_PROMPT};
use crate::providers::{ChatRequest, LlmProvider};

/// Asks the model which ingredients are visible in a photo.
#[derive(Clone)]
pub struct IngredientDetector {
    provider: Arc<dyn LlmProvider>,
}

impl IngredientDetector {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        IngredientDetector { provider }
    }

    /// Build the detection request: fixed instruction plus the photo as a data URL.
    pub fn build_request(image: &NormalizedImage) -> ChatRequest {
        ChatRequest::new(DETECT_SYSTEM_PROMPT.trim())
            .text(DETECT_USER_PROMPT)
            .image_url(image.to_data_url())
    }

    /// Detect ingredients in a normalized photo.
    ///
    /// The answer is returned trimmed but otherwise untouched; a reply of
    /// `unsure` or prose instead of a bullet list is not an error.
    pub async fn detect(&self, image: &NormalizedImage) -> Result<Ingredients, DishcoveryError> {
        let (width, height) = image.dimensions();
        info!(
            "Detecting ingredients with {} ({}x{}, {} bytes)",
            self.provider.provider_name(),
            width,
            height,
            image.len()
        );
        let answer = self.provider.complete(&Self::build_request(image)).await?;
        let ingredients = Ingredients::new(answer);
        debug!("Detected ingredients: {}", ingredients);
        Ok(ingredients)
    }
}
