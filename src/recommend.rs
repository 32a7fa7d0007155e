/// Suggest follow-ups for a recipe the user liked.
///
/// Pure templating, no model call.
pub fn recommend_similar(selected_recipe: &str) -> String {
    let suggestions = [
        format!(
            "If you liked {}, try making a healthier version with less oil.",
            selected_recipe.trim()
        ),
        "Or try a variation using seasonal vegetables or different spices!".to_string(),
    ];
    suggestions.join("\n")
}
