//! Ingredient groups: shape coercion, flat-list conversion, line splitting.

use serde_json::{Map, Value};

use super::fields::{first_present, scalar_text, text_field};
use super::units::UnitTable;
use crate::models::{Ingredient, IngredientGroup};

pub const GROUP_ALIASES: &[&str] = &["ingredientGroups", "ingredient_groups", "ingredientSections"];
pub const FLAT_ALIASES: &[&str] = &["ingredients", "recipeIngredient", "ingredientList", "ingredients_list"];

const GROUP_NAME_KEYS: &[&str] = &["name", "title", "group", "section", "heading"];
const GROUP_LIST_KEYS: &[&str] = &["ingredients", "items", "list"];

const NAME_KEYS: &[&str] = &["name", "item", "ingredient", "ingredientName", "food"];
const AMOUNT_KEYS: &[&str] = &["amount"];
const QUANTITY_KEYS: &[&str] = &["quantity", "qty"];
const UNIT_KEYS: &[&str] = &["unit", "units"];
const PREPARATION_KEYS: &[&str] = &["preparation", "notes", "note", "prep", "comment"];
const RAW_KEYS: &[&str] = &["raw", "text", "original", "originalText", "line"];

/// Uniform ingredient from a string or loosely keyed object.
pub fn coerce_ingredient(value: &Value) -> Option<Ingredient> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(Ingredient::from_raw(s.as_str())),
        Value::Number(_) => scalar_text(value).map(Ingredient::from_raw),
        Value::Object(obj) => ingredient_from_object(obj),
        _ => None,
    }
}

fn ingredient_from_object(obj: &Map<String, Value>) -> Option<Ingredient> {
    let name = text_field(obj, NAME_KEYS);
    let amount = text_field(obj, AMOUNT_KEYS).or_else(|| {
        let quantity = text_field(obj, QUANTITY_KEYS);
        let unit = text_field(obj, UNIT_KEYS);
        match (quantity, unit) {
            (Some(q), Some(u)) => Some(format!("{} {}", q, u)),
            (q, u) => q.or(u),
        }
    });
    let preparation = text_field(obj, PREPARATION_KEYS);

    // Raw is the source wording; keep it exactly as supplied.
    let raw = match first_present(obj, RAW_KEYS) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => synthesize_raw(amount.as_deref(), name.as_deref(), preparation.as_deref())?,
    };

    Some(Ingredient {
        name,
        amount,
        preparation,
        raw,
    })
}

/// "2 cups flour, sifted" from its parts.
fn synthesize_raw(amount: Option<&str>, name: Option<&str>, preparation: Option<&str>) -> Option<String> {
    let head = [amount, name]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let raw = match (head.is_empty(), preparation) {
        (true, None) => return None,
        (true, Some(p)) => p.to_string(),
        (false, Some(p)) => format!("{}, {}", head, p),
        (false, None) => head,
    };
    Some(raw)
}

fn is_group_shaped(obj: &Map<String, Value>) -> bool {
    GROUP_LIST_KEYS
        .iter()
        .any(|k| matches!(obj.get(*k), Some(Value::Array(_)) | Some(Value::String(_))))
}

fn group_ingredients(value: &Value) -> Vec<Ingredient> {
    match value {
        Value::Array(items) => items.iter().filter_map(coerce_ingredient).collect(),
        other => coerce_ingredient(other).into_iter().collect(),
    }
}

fn group_from_object(obj: &Map<String, Value>) -> IngredientGroup {
    IngredientGroup {
        name: text_field(obj, GROUP_NAME_KEYS),
        ingredients: first_present(obj, GROUP_LIST_KEYS)
            .map(group_ingredients)
            .unwrap_or_default(),
    }
}

/// Groups from a list mixing group objects with loose ingredients.
///
/// Consecutive loose entries share one unnamed group.
fn groups_from_list(items: &[Value]) -> Vec<IngredientGroup> {
    let mut groups = Vec::new();
    let mut loose: Vec<Ingredient> = Vec::new();

    for item in items {
        match item {
            Value::Object(obj) if is_group_shaped(obj) => {
                if !loose.is_empty() {
                    groups.push(IngredientGroup {
                        name: None,
                        ingredients: std::mem::take(&mut loose),
                    });
                }
                groups.push(group_from_object(obj));
            }
            other => loose.extend(coerce_ingredient(other)),
        }
    }
    if !loose.is_empty() {
        groups.push(IngredientGroup {
            name: None,
            ingredients: loose,
        });
    }
    groups
}

fn groups_from_value(value: &Value) -> Vec<IngredientGroup> {
    match value {
        Value::Array(items) => groups_from_list(items),
        Value::Object(obj) if is_group_shaped(obj) => vec![group_from_object(obj)],
        // {"For the dough": [...], "For the filling": [...]}
        Value::Object(obj) => obj
            .iter()
            .map(|(name, list)| IngredientGroup {
                name: Some(name.trim().to_string()).filter(|n| !n.is_empty()),
                ingredients: group_ingredients(list),
            })
            .collect(),
        other => groups_from_list(std::slice::from_ref(other)),
    }
}

/// One ingredient per non-empty line of a multi-line raw.
fn explode_lines(ingredient: Ingredient) -> Vec<Ingredient> {
    if !ingredient.raw.contains('\n') {
        return vec![ingredient];
    }
    ingredient
        .raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(Ingredient::from_raw)
        .collect()
}

/// Ingredient groups with group data preferred over a flat list.
pub fn resolve_ingredient_groups(obj: &Map<String, Value>, units: &UnitTable) -> Vec<IngredientGroup> {
    let non_empty = |groups: Vec<IngredientGroup>| -> Vec<IngredientGroup> {
        groups
            .into_iter()
            .filter(|g| !g.ingredients.is_empty())
            .collect()
    };

    let mut groups = non_empty(
        first_present(obj, GROUP_ALIASES)
            .map(groups_from_value)
            .unwrap_or_default(),
    );
    if groups.is_empty() {
        groups = non_empty(
            first_present(obj, FLAT_ALIASES)
                .map(groups_from_value)
                .unwrap_or_default(),
        );
    }

    for group in &mut groups {
        for ingredient in &mut group.ingredients {
            units.repair(ingredient);
        }
        group.ingredients = std::mem::take(&mut group.ingredients)
            .into_iter()
            .flat_map(explode_lines)
            .collect();
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve(value: Value) -> Vec<IngredientGroup> {
        resolve_ingredient_groups(value.as_object().unwrap(), &UnitTable::default())
    }

    #[test]
    fn test_flat_strings_become_one_unnamed_group() {
        let groups = resolve(json!({"ingredients": ["2 cups flour", "1 egg"]}));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, None);
        let raws: Vec<&str> = groups[0].ingredients.iter().map(|i| i.raw.as_str()).collect();
        assert_eq!(raws, ["2 cups flour", "1 egg"]);
    }

    #[test]
    fn test_groups_win_over_flat_list() {
        let groups = resolve(json!({
            "ingredientGroups": [{"name": "Dough", "ingredients": ["flour"]}],
            "ingredients": ["something else"]
        }));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name.as_deref(), Some("Dough"));
        assert_eq!(groups[0].ingredients[0].raw, "flour");
    }

    #[test]
    fn test_empty_groups_fall_back_to_flat() {
        let groups = resolve(json!({
            "ingredientGroups": [{"name": "Empty", "ingredients": []}],
            "ingredients": ["salt"]
        }));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, None);
    }

    #[test]
    fn test_object_shapes() {
        let groups = resolve(json!({"ingredients": [
            {"item": "flour", "quantity": 2, "unit": "cups", "notes": "sifted"},
            {"name": "eggs", "amount": "3"},
            {"raw": "  a pinch of salt ", "name": "salt"},
            {"unit": "", "quantity": null},
        ]}));
        let ings = &groups[0].ingredients;
        assert_eq!(ings.len(), 3);
        assert_eq!(ings[0].name.as_deref(), Some("flour"));
        assert_eq!(ings[0].amount.as_deref(), Some("2 cups"));
        assert_eq!(ings[0].preparation.as_deref(), Some("sifted"));
        assert_eq!(ings[0].raw, "2 cups flour, sifted");
        assert_eq!(ings[1].raw, "3 eggs");
        assert_eq!(ings[2].raw, "  a pinch of salt ");
    }

    #[test]
    fn test_unit_repair_applies() {
        let groups = resolve(json!({"ingredients": [{"raw": "2 כפות סוכר", "name": "כפות"}]}));
        let ing = &groups[0].ingredients[0];
        assert_eq!(ing.amount.as_deref(), Some("2 כפות"));
        assert_eq!(ing.name.as_deref(), Some("סוכר"));
    }

    #[test]
    fn test_multi_line_raw_is_exploded() {
        let groups = resolve(json!({"ingredients": ["2 cups flour\n\n1 egg\n", "salt"]}));
        let raws: Vec<&str> = groups[0].ingredients.iter().map(|i| i.raw.as_str()).collect();
        assert_eq!(raws, ["2 cups flour", "1 egg", "salt"]);
    }

    #[test]
    fn test_mixed_list_and_section_map() {
        let groups = resolve(json!({"ingredients": [
            "water",
            {"name": "Filling", "items": ["cheese"]},
            "oil"
        ]}));
        let names: Vec<Option<&str>> = groups.iter().map(|g| g.name.as_deref()).collect();
        assert_eq!(names, [None, Some("Filling"), None]);

        let groups = resolve(json!({"ingredients": {"Dough": ["flour"], "Topping": "sesame"}}));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].ingredients[0].raw, "sesame");
    }
}
