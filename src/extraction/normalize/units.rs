//! Measurement-unit tokens and the misassigned-unit repair.
//!
//! Models sometimes put the unit in the ingredient name: `{"raw": "2 כפות
//! סוכר", "name": "כפות"}`. When the name is exactly a known unit token, the
//! raw text is re-split into amount and name.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use crate::models::Ingredient;

/// Default unit tokens, Hebrew and English.
pub const DEFAULT_UNIT_TOKENS: &[&str] = &[
    // Hebrew
    "כף", "כפות", "כפית", "כפיות", "כוס", "כוסות", "גרם", "ג׳", "ג'", "קילו", "קילוגרם", "ק\"ג",
    "ק״ג", "מ\"ל", "מ״ל", "מיליליטר", "ליטר", "ליטרים", "חבילה", "חבילות", "יחידה", "יחידות",
    "קורט", "שן", "שיני", "שקית", "שקיות", "פחית", "פחיות", "קופסה", "קופסת", "צרור", "חופן",
    "פרוסה", "פרוסות", "מקל", "מקלות",
    // English
    "cup", "cups", "tbsp", "tablespoon", "tablespoons", "tsp", "teaspoon", "teaspoons", "g",
    "gram", "grams", "kg", "ml", "l", "liter", "liters", "litre", "litres", "oz", "ounce",
    "ounces", "lb", "lbs", "pound", "pounds", "pinch", "dash", "clove", "cloves", "can", "cans",
    "package", "packages", "bunch", "handful", "slice", "slices", "stick", "sticks",
];

/// Characters a leading quantity may consist of.
const QUANTITY: &str = r"[\d½¼¾⅓⅔⅛⅜⅝⅞/.,\s-]*\d[\d½¼¾⅓⅔⅛⅜⅝⅞/.,-]*|[½¼¾⅓⅔⅛⅜⅝⅞]";

/// Known unit tokens plus the two repair patterns built from them.
#[derive(Debug, Clone)]
pub struct UnitTable {
    tokens: HashSet<String>,
    /// quantity + unit + name
    with_quantity: Option<Regex>,
    /// unit + name
    unit_first: Option<Regex>,
}

impl Default for UnitTable {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT_TOKENS.iter().map(|t| t.to_string()))
    }
}

impl UnitTable {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        let tokens: HashSet<String> = tokens
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        // Longest first so "tablespoons" wins over "tablespoon".
        let mut sorted: Vec<&String> = tokens.iter().collect();
        sorted.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        let alternation = sorted
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");

        let build = |pattern: String| {
            RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .ok()
        };
        let (with_quantity, unit_first) = if alternation.is_empty() {
            (None, None)
        } else {
            (
                build(format!(
                    r"^\s*(?P<qty>{})\s*(?P<unit>{})\s+(?P<name>.+?)\s*$",
                    QUANTITY, alternation
                )),
                build(format!(
                    r"^\s*(?P<unit>{})\s+(?P<name>.+?)\s*$",
                    alternation
                )),
            )
        };

        Self {
            tokens,
            with_quantity,
            unit_first,
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(&token.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Move a unit misassigned to `name` into `amount`.
    ///
    /// Only fires when the name is exactly a unit token and the raw text
    /// splits around that same unit. `raw` is never touched.
    pub fn repair(&self, ingredient: &mut Ingredient) {
        let Some(name) = ingredient.name.as_deref() else {
            return;
        };
        if !self.contains(name) {
            return;
        }
        let name = name.trim().to_lowercase();
        let raw = ingredient.raw.as_str();

        if let Some(caps) = self.with_quantity.as_ref().and_then(|re| re.captures(raw)) {
            if caps["unit"].to_lowercase() == name {
                let amount = format!("{} {}", caps["qty"].trim(), &caps["unit"]);
                let rest = caps["name"].to_string();
                ingredient.amount = Some(amount);
                ingredient.name = Some(rest);
                return;
            }
        }

        if let Some(caps) = self.unit_first.as_ref().and_then(|re| re.captures(raw)) {
            if caps["unit"].to_lowercase() == name {
                let amount = caps["unit"].to_string();
                let rest = caps["name"].to_string();
                ingredient.amount = Some(amount);
                ingredient.name = Some(rest);
            }
        }
    }
}
