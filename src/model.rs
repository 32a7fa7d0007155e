use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Heading marker that starts every recipe section in the composer output.
pub const SECTION_MARKER: &str = "### ";

/// Number of recipes the composer asks for.
pub const RECIPE_COUNT: usize = 3;

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum $name {
            #[default]
            Any,
            $($variant),+
        }

        impl $name {
            /// All choices, `Any` first
            pub const ALL: &'static [$name] = &[$name::Any, $($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $name::Any => "Any",
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|choice| choice.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        let options: Vec<&str> = $name::ALL.iter().map(|c| c.as_str()).collect();
                        format!("unknown {} '{}', expected one of: {}", stringify!($name).to_lowercase(), wanted, options.join(", "))
                    })
            }
        }
    };
}

choice_enum! {
    /// Cuisine the recipes should lean towards
    Cuisine {
        Italian => "Italian",
        Arabic => "Arabic",
        Asian => "Asian",
        Mexican => "Mexican",
        Indian => "Indian",
        French => "French",
        Mediterranean => "Mediterranean",
    }
}

choice_enum! {
    /// Taste or meal-type preference
    Taste {
        Salty => "Salty",
        Sweet => "Sweet",
        Spicy => "Spicy",
        Savory => "Savory",
        Umami => "Umami",
        Sour => "Sour",
        Breakfast => "Breakfast",
        Lunch => "Lunch",
        Dinner => "Dinner",
        Dessert => "Dessert",
        Snack => "Snack",
    }
}

/// User preferences that shape the generated recipes.
///
/// `allergies` is free text (usually comma-separated) and is passed to the
/// model exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub cuisine: Cuisine,
    pub allergies: String,
    pub taste: Taste,
}

impl Preferences {
    pub fn new(cuisine: Cuisine, allergies: impl Into<String>, taste: Taste) -> Self {
        Self {
            cuisine,
            allergies: allergies.into(),
            taste,
        }
    }
}

/// Ingredient list returned by the detection call.
///
/// Usually a markdown bullet list, sometimes just `unsure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ingredients(String);

impl Ingredients {
    pub fn new(text: impl AsRef<str>) -> Self {
        Ingredients(text.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the model declined to name ingredients.
    pub fn is_unsure(&self) -> bool {
        self.0
            .trim_matches(|c: char| c == '\'' || c == '"' || c == '.' || c.is_whitespace())
            .eq_ignore_ascii_case("unsure")
    }
}

impl fmt::Display for Ingredients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recipe text returned by the composition call.
///
/// The model is asked for `### N. Name` sections but nothing guarantees it
/// complied, so the text is only split shallowly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeDocument(String);

impl RecipeDocument {
    pub fn new(text: impl AsRef<str>) -> Self {
        RecipeDocument(text.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty chunks of the document split on the `### ` heading marker.
    pub fn sections(&self) -> Vec<&str> {
        self.0
            .split(SECTION_MARKER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// First line of each of the first three sections, e.g. `1. Tomato Pasta`.
    pub fn titles(&self) -> Vec<&str> {
        self.sections()
            .into_iter()
            .take(RECIPE_COUNT)
            .filter_map(|section| section.lines().next())
            .map(str::trim)
            .collect()
    }
}

impl fmt::Display for RecipeDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything produced by one photo-to-recipes run.
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub ingredients: Ingredients,
    pub recipes: RecipeDocument,
}
