use std::sync::Arc;

use log::{debug, info};

use crate::error::DishcoveryError;
use crate::model::{Ingredients, Preferences, RecipeDocument};
use crate::prompts::{
    fill_template, ALLERGY_RULE, RECIPE_DISCLAIMER, RECIPE_PROMPT_TEMPLATE, RECIPE_SYSTEM_PROMPT,
};
use crate::providers::{ChatRequest, LlmProvider};

/// Build the recipe composition prompt.
///
/// Ingredients and preferences are inserted exactly as given. Allergy text in
/// particular is not escaped, so whatever the user typed reaches the model.
pub fn build_recipe_prompt(ingredients: &Ingredients, preferences: &Preferences) -> String {
    let allergy_rule = if preferences.allergies.trim().is_empty() {
        ""
    } else {
        ALLERGY_RULE
    };

    fill_template(
        RECIPE_PROMPT_TEMPLATE,
        &[
            ("INGREDIENTS", ingredients.as_str()),
            ("CUISINE", preferences.cuisine.as_str()),
            ("ALLERGIES", &preferences.allergies),
            ("TASTE", preferences.taste.as_str()),
            ("ALLERGY_RULE", allergy_rule),
            ("DISCLAIMER", RECIPE_DISCLAIMER),
        ],
    )
}

/// Turns detected ingredients and preferences into three recipes.
#[derive(Clone)]
pub struct RecipeComposer {
    provider: Arc<dyn LlmProvider>,
}

impl RecipeComposer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        RecipeComposer { provider }
    }

    pub fn build_request(ingredients: &Ingredients, preferences: &Preferences) -> ChatRequest {
        ChatRequest::new(RECIPE_SYSTEM_PROMPT).text(build_recipe_prompt(ingredients, preferences))
    }

    /// Ask the model for recipes.
    ///
    /// The formatting rules live in the prompt only; the answer is not checked
    /// against them and should be treated as display text.
    pub async fn compose(
        &self,
        ingredients: &Ingredients,
        preferences: &Preferences,
    ) -> Result<RecipeDocument, DishcoveryError> {
        info!(
            "Composing recipes with {} (cuisine: {}, taste: {})",
            self.provider.provider_name(),
            preferences.cuisine,
            preferences.taste
        );
        let request = Self::build_request(ingredients, preferences);
        let answer = self.provider.complete(&request).await?;
        let document = RecipeDocument::new(answer);
        debug!("Composer returned {} sections", document.sections().len());
        Ok(document)
    }
}
