//! Nutrition facts with unit-suffixed numeric fields.

use serde_json::{Map, Value};

use super::fields::{first_parsed, first_present, text_field};
use crate::models::Nutrition;

pub const NUTRITION_ALIASES: &[&str] = &["nutrition", "nutritionInfo", "nutrition_facts", "nutritionalInfo"];

const CALORIE_KEYS: &[&str] = &["calories", "kcal", "energy", "calories_kcal", "caloriesKcal"];
const PROTEIN_KEYS: &[&str] = &["protein_g", "protein", "proteinG", "proteinContent"];
const FAT_KEYS: &[&str] = &["fat_g", "fat", "fatG", "totalFat", "fatContent"];
const CARB_KEYS: &[&str] = &[
    "carbs_g",
    "carbs",
    "carbohydrates",
    "carbohydrate",
    "carbsG",
    "carbohydrateContent",
];
const PER_KEYS: &[&str] = &["per", "basis", "servingSize"];

/// Non-negative number from a number or a string like "12 g" / "1,200 kcal".
pub fn nutrient_amount(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.starts_with('-') {
                return None;
            }
            let digits: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            digits.parse().ok()?
        }
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then_some(n)
}

/// Nutrition facts, `None` when no numeric field survives.
pub fn resolve_nutrition(obj: &Map<String, Value>) -> Option<Nutrition> {
    let Some(Value::Object(facts)) = first_present(obj, NUTRITION_ALIASES) else {
        return None;
    };
    let nutrition = Nutrition {
        calories: first_parsed(facts, CALORIE_KEYS, nutrient_amount),
        protein_g: first_parsed(facts, PROTEIN_KEYS, nutrient_amount),
        fat_g: first_parsed(facts, FAT_KEYS, nutrient_amount),
        carbs_g: first_parsed(facts, CARB_KEYS, nutrient_amount),
        per: text_field(facts, PER_KEYS),
    };
    nutrition.has_values().then_some(nutrition)
}
