//! Raw model output through repair and normalization.

use recipe_acquire::extraction::{extract_json_traced, Normalizer, RepairTier};
use recipe_acquire::pipeline::recipe_from_model_output;
use serde_json::json;

const HEBREW_OUTPUT: &str = r#"Here is the extracted recipe:

```json
{
  "recipe": {
    "title": "עוגת שוקולד",
    "language": "he",
    "servings": "12 פרוסות",
    "prepTime": "20 דקות",
    "cookTime": "שעה",
    "ingredientGroups": [
      {"name": "לבלילה", "ingredients": [
        {"raw": "2 כוסות קמח", "name": "כוסות", "amount": null},
        {"raw": "3 ביצים", "name": "ביצים", "amount": "3"},
        "1 כוס סוכר\n1/2 כוס שמן",
      ]},
      {"name": "לציפוי", "ingredients": ["200 גרם שוקולד מריר"]}
    ],
    "instructions": [
      {"instruction": "לאפות 40 דקות", "step": 2},
      {"instruction": "לערבב את כל חומרי הבלילה", "step": 1}
    ],
    "nutrition": {"calories": "350 kcal", "protein": "5g", "fat": "-3"},
    "images": ["https://cdn.example.co.il/cake.jpg?w=600", "https://example.co.il/recipe/cake"],
  }
}
```"#;

#[test]
fn hebrew_recipe_end_to_end() {
    let repaired = extract_json_traced(HEBREW_OUTPUT).unwrap();
    assert_eq!(repaired.tier, RepairTier::CommaTrimmed);

    let recipe = recipe_from_model_output(
        &Normalizer::default(),
        HEBREW_OUTPUT,
        Some("https://example.co.il/recipe/cake"),
    )
    .unwrap();

    assert_eq!(recipe.title.as_deref(), Some("עוגת שוקולד"));
    assert_eq!(recipe.source.as_deref(), Some("https://example.co.il/recipe/cake"));
    assert_eq!(recipe.servings.as_ref().unwrap().amount, Some(12.0));
    assert_eq!(recipe.prep_time_minutes, Some(20));
    assert_eq!(recipe.cook_time_minutes, Some(60));
    assert_eq!(recipe.total_time_minutes, Some(80));

    let groups: Vec<Option<&str>> = recipe
        .ingredient_groups
        .iter()
        .map(|g| g.name.as_deref())
        .collect();
    assert_eq!(groups, [Some("לבלילה"), Some("לציפוי")]);

    let raws: Vec<&str> = recipe.ingredients.iter().map(|i| i.raw.as_str()).collect();
    assert_eq!(
        raws,
        ["2 כוסות קמח", "3 ביצים", "1 כוס סוכר", "1/2 כוס שמן", "200 גרם שוקולד מריר"]
    );
    assert_eq!(recipe.ingredients[0].amount.as_deref(), Some("2 כוסות"));
    assert_eq!(recipe.ingredients[0].name.as_deref(), Some("קמח"));

    assert_eq!(recipe.instructions, ["לערבב את כל חומרי הבלילה", "לאפות 40 דקות"]);

    let nutrition = recipe.nutrition.as_ref().unwrap();
    assert_eq!(nutrition.calories, Some(350.0));
    assert_eq!(nutrition.protein_g, Some(5.0));
    assert_eq!(nutrition.fat_g, None);

    assert_eq!(recipe.images, ["https://cdn.example.co.il/cake.jpg?w=600"]);
    assert_eq!(recipe.image_url.as_deref(), Some("https://cdn.example.co.il/cake.jpg?w=600"));
}

#[test]
fn normalizing_twice_changes_nothing() {
    let normalizer = Normalizer::default();
    let fixtures = [
        json!({"ingredients": ["2 cups flour", "1 egg"]}),
        json!({"nutrition": {"protein": "25g"}}),
        json!({"ingredients": [{"raw": "2 כפות סוכר", "name": "כפות"}]}),
        json!({"instructions": ["https://example.com/step", "Mix well"]}),
        json!({
            "name": "Pita",
            "recipeYield": ["8", "8 pitas"],
            "totalTime": "PT2H",
            "recipeIngredient": ["500 g flour", "7 g yeast"],
            "recipeInstructions": [
                {"@type": "HowToStep", "text": "Mix and knead."},
                {"@type": "HowToStep", "text": "Rise, shape, bake hot."}
            ],
            "image": {"@type": "ImageObject", "url": "https://example.com/pita.webp"}
        }),
    ];

    for fixture in fixtures {
        let once = normalizer.normalize(&fixture);
        let twice = normalizer.normalize(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice, "not idempotent for {}", fixture);
    }
}

#[test]
fn serialized_recipe_shape() {
    let recipe = Normalizer::default().normalize(&json!({"title": "Tea"}));
    let value = serde_json::to_value(&recipe).unwrap();
    for key in ["ingredientGroups", "notes", "images", "instructions", "totalTimeMinutes"] {
        assert!(value.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(value["ingredientGroups"], json!([]));
}
