/// System instruction for the ingredient detection call.
///
/// Loaded from `prompts/detect_system.txt` at compile time so it can be
/// edited without dealing with Rust string syntax.
pub const DETECT_SYSTEM_PROMPT: &str = include_str!("prompts/detect_system.txt");

/// Text part sent next to the photo in the detection call.
pub const DETECT_USER_PROMPT: &str = "Identify the visible ingredients in this photo.";

/// System instruction for the recipe composition call.
pub const RECIPE_SYSTEM_PROMPT: &str = "You generate safe, clear cooking recipes.";

/// Template for the composition call.
///
/// Contains `{{INGREDIENTS}}`, `{{CUISINE}}`, `{{ALLERGIES}}`, `{{TASTE}}`,
/// `{{ALLERGY_RULE}}` and `{{DISCLAIMER}}` placeholders.
pub const RECIPE_PROMPT_TEMPLATE: &str = include_str!("prompts/recipe.txt");

/// Sentence the model is told to end every recipe document with.
pub const RECIPE_DISCLAIMER: &str = "*Ingredients marked with * are not detected in the image and can be ordered from HungerStation Market.";

/// Task line added only when the user listed allergies.
pub const ALLERGY_RULE: &str = "- Respect the allergies and avoid them completely\n";

/// Replace `{{KEY}}` placeholders in a single pass.
///
/// Substituted values are never rescanned, so user text that happens to
/// contain `{{...}}` ends up in the prompt verbatim. Unknown placeholders are
/// left as they are.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match values.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
