//! Full-pipeline extraction command.

use std::path::Path;

use crate::cli::helpers::{read_input, to_pretty_json};
use crate::cli::icons::{error, success, warn};
use crate::config::Config;
use crate::pipeline::RecipeExtractor;

/// Extract a recipe from a URL or from a text file.
pub async fn cmd_extract(
    config: &Config,
    url: Option<&str>,
    text_file: Option<&Path>,
) -> anyhow::Result<()> {
    let extractor = RecipeExtractor::from_config(config)?;

    let result = match (url, text_file) {
        (Some(url), _) => extractor.from_url(url).await,
        (None, file) => {
            let text = read_input(file).await?;
            extractor.from_text(&text).await
        }
    };

    let recipe = match result {
        Ok(recipe) => recipe,
        Err(e) => {
            eprintln!("{} {}", error(), e);
            return Err(e.into());
        }
    };

    if recipe.is_empty() {
        eprintln!("{} No ingredients or instructions found", warn());
    } else {
        eprintln!(
            "{} {} ({} ingredients, {} steps)",
            success(),
            recipe.title.as_deref().unwrap_or("Untitled"),
            recipe.ingredient_count(),
            recipe.instructions.len()
        );
    }
    println!("{}", to_pretty_json(&recipe)?);
    Ok(())
}
