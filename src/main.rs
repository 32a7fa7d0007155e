use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error};

use dishcovery::{
    recommend_similar, Cuisine, Dishcovery, DishcoveryError, Preferences, ProviderKind, Taste,
};

/// Upload a food photo, detect ingredients, get three recipes.
#[derive(Parser, Debug)]
#[command(name = "dishcovery", version, about)]
struct Cli {
    /// Photo of a meal or ingredients (JPEG or PNG)
    image: PathBuf,

    /// Cuisine: Any, Italian, Arabic, Asian, Mexican, Indian, French, Mediterranean
    #[arg(long, default_value = "Any")]
    cuisine: Cuisine,

    /// Allergies, comma-separated
    #[arg(long, default_value = "")]
    allergies: String,

    /// Taste or meal type: Any, Salty, Sweet, Spicy, Savory, Umami, Sour,
    /// Breakfast, Lunch, Dinner, Dessert, Snack
    #[arg(long, default_value = "Any")]
    taste: Taste,

    /// Model provider (openai, anthropic, ollama); defaults to config
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Model identifier, e.g. gpt-4o-mini
    #[arg(long)]
    model: Option<String>,

    /// Print recommendations for the Nth generated recipe (1-3)
    #[arg(long)]
    favorite: Option<usize>,

    /// Stop after ingredient detection
    #[arg(long)]
    ingredients_only: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    debug!("{:?}", cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:?}", e);
            eprintln!("Something went wrong: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), DishcoveryError> {
    let mut builder = Dishcovery::builder();
    if let Some(kind) = cli.provider {
        builder = builder.provider(kind);
    }
    if let Some(model) = cli.model {
        builder = builder.model(model);
    }
    let client = builder.build()?;

    let image = client.normalize(File::open(&cli.image)?)?;
    let ingredients = client.detect_ingredients(&image).await?;

    println!("### Detected Ingredients\n");
    println!("{}\n", ingredients);

    if cli.ingredients_only {
        return Ok(());
    }

    let preferences = Preferences::new(cli.cuisine, cli.allergies, cli.taste);
    let recipes = client.compose_recipes(&ingredients, &preferences).await?;

    println!("### Generated Recipes\n");
    println!("{}", recipes);

    if let Some(favorite) = cli.favorite {
        let titles = recipes.titles();
        let title = favorite
            .checked_sub(1)
            .and_then(|index| titles.get(index))
            .ok_or_else(|| {
                DishcoveryError::InvalidInput(format!(
                    "favorite must be between 1 and {}, got {}",
                    titles.len(),
                    favorite
                ))
            })?;

        println!("\n### Recommended for You\n");
        println!("{}", recommend_similar(title));
    }

    Ok(())
}
