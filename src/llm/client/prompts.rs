//! Prompt templates.

/// Default prompt for turning page or OCR text into recipe JSON.
///
/// Placeholders: `{source}` and `{content}`.
pub const DEFAULT_RECIPE_PROMPT: &str = r#"You are extracting a cooking recipe from text that was scraped from a web page or read from a photo. The text may contain navigation, ads, comments, and other noise. Find the recipe and ignore everything else.

Source: {source}

Text:
{content}

Respond with ONLY a JSON object, no markdown and no commentary, using these keys:
- "title": string
- "description": string or null
- "language": ISO 639-1 code of the recipe text (e.g. "he", "en")
- "servings": {"amount": number, "unit": string, "raw": string} or null
- "prepTimeMinutes", "cookTimeMinutes", "totalTimeMinutes": integers or null
- "ingredientGroups": [{"name": string or null, "ingredients": [{"name": string, "amount": string, "preparation": string or null, "raw": string}]}]
- "instructionGroups": [{"name": string, "instructions": [string]}]
- "notes": [string]
- "imageUrl": string or null
- "nutrition": {"calories": number, "protein_g": number, "fat_g": number, "carbs_g": number, "per": string} or null

RULES:
1. "raw" must be the ingredient line exactly as written in the text. Do not translate or reword it.
2. Keep the original language of the recipe. Do not translate anything.
3. Put quantities and units in "amount" (e.g. "2 cups", "2 כפות"), never in "name".
4. Keep ingredient and instruction order as in the text.
5. If the text contains no recipe, return {"title": null, "ingredientGroups": [], "instructionGroups": []}."#;

/// Fill the recipe template.
pub fn render_recipe_prompt(template: &str, content: &str, source: Option<&str>) -> String {
    template
        .replace("{source}", source.unwrap_or("unknown"))
        .replace("{content}", content)
}
