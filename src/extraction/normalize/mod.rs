//! Recipe normalization.
//!
//! Maps whatever JSON the model produced onto [`Recipe`]. Field lookups
//! go through alias lists, every coercion is total, and nothing here
//! returns an error: unusable input becomes `None` or an empty list.
//!
//! Normalizing a normalized recipe (after `serde_json::to_value`) gives the
//! same recipe back.

mod fields;
mod images;
mod ingredients;
mod instructions;
mod nutrition;
mod servings;
mod times;
mod units;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub use fields::number_text;
pub use images::is_image_url;
pub use nutrition::nutrient_amount;
pub use servings::coerce_servings;
pub use times::{parse_duration, parse_minutes};
pub use units::{UnitTable, DEFAULT_UNIT_TOKENS};

use crate::models::Recipe;

const TITLE_ALIASES: &[&str] = &["title", "name", "recipeName"];
const DESCRIPTION_ALIASES: &[&str] = &["description", "summary"];
const SOURCE_ALIASES: &[&str] = &["source", "sourceUrl", "source_url", "url"];
const LANGUAGE_ALIASES: &[&str] = &["language", "inLanguage", "lang"];
const NOTES_ALIASES: &[&str] = &["notes", "tips", "note"];

/// Keys whose presence marks an object as a recipe.
const RECIPE_KEYS: &[&str] = &[
    "title",
    "name",
    "recipeName",
    "ingredients",
    "recipeIngredient",
    "ingredientGroups",
    "ingredient_groups",
    "instructions",
    "recipeInstructions",
    "instructionGroups",
    "steps",
];

const MAX_UNWRAP_DEPTH: usize = 4;

/// Normalizer configuration (`[normalize]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Name given to instruction groups that arrive without one.
    pub default_instruction_group: String,
    /// Measurement-unit tokens used by the misassigned-unit repair.
    pub unit_tokens: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            default_instruction_group: "Instructions".to_string(),
            unit_tokens: DEFAULT_UNIT_TOKENS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Converts loosely typed model output into a canonical [`Recipe`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizeConfig,
    units: UnitTable,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizeConfig::default())
    }
}

fn is_recipe_shaped(obj: &Map<String, Value>) -> bool {
    RECIPE_KEYS.iter().any(|k| obj.contains_key(*k))
}

fn is_recipe_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t.eq_ignore_ascii_case("Recipe"),
        Some(Value::Array(types)) => types
            .iter()
            .any(|t| t.as_str().is_some_and(|t| t.eq_ignore_ascii_case("Recipe"))),
        _ => false,
    }
}

/// Peel arrays, JSON-LD graphs and single-key wrappers off the recipe.
fn unwrap_recipe(value: &Value) -> Option<&Map<String, Value>> {
    let mut current = value;
    for _ in 0..MAX_UNWRAP_DEPTH {
        match current {
            Value::Array(items) => {
                current = items.iter().find(|v| v.is_object())?;
            }
            Value::Object(obj) => {
                if let Some(Value::Array(graph)) = obj.get("@graph") {
                    if let Some(recipe) = graph.iter().find(|v| is_recipe_type(v)) {
                        debug!("Unwrapped recipe from @graph");
                        current = recipe;
                        continue;
                    }
                }
                if is_recipe_shaped(obj) || obj.len() != 1 {
                    return Some(obj);
                }
                match obj.values().next() {
                    Some(inner) if inner.as_object().is_some_and(is_recipe_shaped) => {
                        debug!(
                            "Unwrapped recipe from {:?} wrapper",
                            obj.keys().next().map(String::as_str).unwrap_or_default()
                        );
                        current = inner;
                    }
                    _ => return Some(obj),
                }
            }
            _ => return None,
        }
    }
    current.as_object()
}

impl Normalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        let units = UnitTable::new(config.unit_tokens.iter().cloned());
        Self { config, units }
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    pub fn units(&self) -> &UnitTable {
        &self.units
    }

    /// Canonical recipe from parsed model output.
    pub fn normalize(&self, value: &Value) -> Recipe {
        let Some(obj) = unwrap_recipe(value) else {
            debug!("Model output has no recipe object; returning empty recipe");
            return Recipe::default();
        };

        let (prep_time_minutes, cook_time_minutes, total_time_minutes) =
            times::resolve_times(obj);

        let ingredient_groups = ingredients::resolve_ingredient_groups(obj, &self.units);
        let ingredients = ingredient_groups
            .iter()
            .flat_map(|g| g.ingredients.iter().cloned())
            .collect();

        let instruction_groups = instructions::resolve_instruction_groups(
            obj,
            &self.config.default_instruction_group,
        );
        let instructions = instruction_groups
            .iter()
            .flat_map(|g| g.instructions.iter().cloned())
            .collect();

        let (image_url, images) = images::resolve_images(obj);

        let recipe = Recipe {
            title: fields::text_field(obj, TITLE_ALIASES),
            description: fields::text_field(obj, DESCRIPTION_ALIASES),
            source: fields::text_field(obj, SOURCE_ALIASES),
            language: fields::text_field(obj, LANGUAGE_ALIASES),
            servings: servings::resolve_servings(obj),
            prep_time_minutes,
            cook_time_minutes,
            total_time_minutes,
            ingredient_groups,
            ingredients,
            instructions,
            instruction_groups,
            notes: fields::first_present(obj, NOTES_ALIASES)
                .map(fields::text_lines)
                .unwrap_or_default(),
            image_url,
            images,
            nutrition: nutrition::resolve_nutrition(obj),
        };

        if recipe.is_empty() {
            debug!("Normalized recipe has no ingredients or instructions");
        }
        recipe
    }
}
