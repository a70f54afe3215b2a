//! Canonical recipe record.
//!
//! Every extraction path (web page, OCR text, pasted ingredient list)
//! converges on [`Recipe`]. The normalizer is the only producer; nothing
//! mutates a recipe after it is returned.

use serde::{Deserialize, Serialize};

/// The canonical recipe schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Where the recipe came from (URL or free-form attribution).
    pub source: Option<String>,
    pub language: Option<String>,
    pub servings: Option<Servings>,
    pub prep_time_minutes: Option<u32>,
    pub cook_time_minutes: Option<u32>,
    pub total_time_minutes: Option<u32>,
    /// Always present, possibly empty.
    #[serde(default)]
    pub ingredient_groups: Vec<IngredientGroup>,
    /// Every ingredient of every group, in order.
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    /// Every instruction line of every group, in order.
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub instruction_groups: Vec<InstructionGroup>,
    /// Always present, possibly empty.
    #[serde(default)]
    pub notes: Vec<String>,
    pub image_url: Option<String>,
    /// Always present, possibly empty.
    #[serde(default)]
    pub images: Vec<String>,
    pub nutrition: Option<Nutrition>,
}

impl Recipe {
    /// Total number of ingredients across groups.
    pub fn ingredient_count(&self) -> usize {
        self.ingredient_groups
            .iter()
            .map(|g| g.ingredients.len())
            .sum()
    }

    /// True when the model gave us nothing usable to cook from.
    pub fn is_empty(&self) -> bool {
        self.ingredient_count() == 0 && self.instructions.is_empty()
    }
}

/// A named or unnamed ordered collection of ingredients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientGroup {
    pub name: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

/// One ingredient line.
///
/// `raw` is the source wording, byte-for-byte. The other fields are a
/// best-effort breakdown and may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: Option<String>,
    pub amount: Option<String>,
    pub preparation: Option<String>,
    pub raw: String,
}

impl Ingredient {
    /// Ingredient known only by its source text.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let name = raw.trim();
        Self {
            name: (!name.is_empty()).then(|| name.to_string()),
            amount: None,
            preparation: None,
            raw,
        }
    }
}

/// An ordered list of instruction steps under a heading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstructionGroup {
    pub name: String,
    #[serde(default)]
    pub instructions: Vec<String>,
}

/// Yield of a recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Servings {
    pub amount: Option<f64>,
    pub unit: Option<String>,
    pub raw: Option<String>,
}

/// Nutrition facts; `None` on the recipe when every number is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub carbs_g: Option<f64>,
    /// Basis the numbers refer to, e.g. "serving" or "100g".
    pub per: Option<String>,
}

impl Nutrition {
    pub fn has_values(&self) -> bool {
        self.calories.is_some()
            || self.protein_g.is_some()
            || self.fat_g.is_some()
            || self.carbs_g.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case_with_required_lists() {
        let value = serde_json::to_value(Recipe::default()).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("ingredientGroups"));
        assert!(obj.contains_key("prepTimeMinutes"));
        assert_eq!(obj["notes"], serde_json::json!([]));
        assert_eq!(obj["images"], serde_json::json!([]));
    }

    #[test]
    fn test_nutrition_keys_keep_unit_suffix() {
        let n = Nutrition {
            protein_g: Some(3.0),
            ..Default::default()
        };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["protein_g"], 3.0);
        assert!(n.has_values());
        assert!(!Nutrition::default().has_values());
    }

    #[test]
    fn test_ingredient_from_raw_keeps_raw_verbatim() {
        let ing = Ingredient::from_raw("  1 egg ");
        assert_eq!(ing.raw, "  1 egg ");
        assert_eq!(ing.name.as_deref(), Some("1 egg"));
    }
}
