//! JSON repair and normalization commands.

use std::path::Path;

use console::style;

use crate::cli::helpers::{read_input, to_pretty_json};
use crate::cli::icons::{dim_arrow, success, warn};
use crate::config::Config;
use crate::extraction::{extract_json_traced, Normalizer};
use crate::pipeline::recipe_from_model_output;

/// Print the JSON recovered from model output.
pub async fn cmd_repair(file: Option<&Path>, show_tier: bool) -> anyhow::Result<()> {
    let raw = read_input(file).await?;
    let repaired = extract_json_traced(&raw)?;

    if show_tier {
        let attempted: Vec<&str> = repaired.attempted.iter().map(|t| t.as_str()).collect();
        eprintln!(
            "{} Parsed at tier {}",
            success(),
            style(repaired.tier).cyan()
        );
        eprintln!("  {} Attempted: {}", dim_arrow(), attempted.join(", "));
    }
    println!("{}", to_pretty_json(&repaired.value)?);
    Ok(())
}

/// Repair, normalize, and print a canonical recipe.
pub async fn cmd_normalize(
    config: &Config,
    file: Option<&Path>,
    source: Option<&str>,
) -> anyhow::Result<()> {
    let raw = read_input(file).await?;
    let normalizer = Normalizer::new(config.normalize.clone());
    let recipe = recipe_from_model_output(&normalizer, &raw, source)?;
    if recipe.is_empty() {
        eprintln!("{} No ingredients or instructions found", warn());
    }
    println!("{}", to_pretty_json(&recipe)?);
    Ok(())
}
