//! Upload a food photo, detect its ingredients with a multimodal model, and get
//! three recipes that fit your cuisine, allergy and taste preferences.
//!
//! ```no_run
//! # use dishcovery::{Dishcovery, Preferences, Cuisine, Taste};
//! # #[tokio::main]
//! # async fn main() -> Result<(), dishcovery::DishcoveryError> {
//! let client = Dishcovery::builder().build()?;
//! let photo = std::fs::File::open("dinner.jpg")?;
//! let prefs = Preferences::new(Cuisine::Italian, "peanuts", Taste::Savory);
//! let generation = client.generate(photo, &prefs).await?;
//! println!("{}", generation.recipes);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod composer;
pub mod config;
pub mod detector;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod prompts;
pub mod providers;
pub mod recommend;

use std::fs::File;
use std::path::Path;

pub use client::{Dishcovery, DishcoveryBuilder, ProviderKind};
pub use composer::{build_recipe_prompt, RecipeComposer};
pub use config::AppConfig;
pub use detector::IngredientDetector;
pub use error::DishcoveryError;
pub use model::{Cuisine, Generation, Ingredients, Preferences, RecipeDocument, Taste};
pub use normalizer::{
    normalize, normalize_bytes, parse_data_url, split_data_url, ImageOptions, NormalizedImage,
};
pub use providers::LlmProvider;
pub use recommend::recommend_similar;

/// Generate recipes for the photo at `path` using configuration from
/// `config.toml` and the environment.
pub async fn generate_recipes(
    path: impl AsRef<Path>,
    preferences: &Preferences,
) -> Result<Generation, DishcoveryError> {
    let client = Dishcovery::builder().build()?;
    let file = File::open(path.as_ref())?;
    client.generate(file, preferences).await
}

/// Detect the ingredients in the photo at `path` using configuration from
/// `config.toml` and the environment.
pub async fn detect_ingredients(path: impl AsRef<Path>) -> Result<Ingredients, DishcoveryError> {
    let client = Dishcovery::builder().build()?;
    let image = client.normalize(File::open(path.as_ref())?)?;
    client.detect_ingredients(&image).await
}
