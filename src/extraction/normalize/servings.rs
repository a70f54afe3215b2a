//! Servings / yield coercion.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::fields::{first_present, scalar_text};
use crate::models::Servings;

pub const SERVINGS_ALIASES: &[&str] = &["servings", "yield", "recipeYield", "serves", "portions"];

/// Leading amount (optionally a range) and the unit after it.
static LEADING_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:[.,]\d+)?)(?:\s*[-–]\s*\d+(?:[.,]\d+)?)?\s*(.*)$").unwrap()
});

static ANY_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").unwrap());

fn number(text: &str) -> Option<f64> {
    text.replace(',', ".").parse().ok()
}

fn non_negative(n: f64) -> Option<f64> {
    (n.is_finite() && n >= 0.0).then_some(n)
}

fn from_text(text: &str) -> Option<Servings> {
    let raw = text.trim();
    if raw.is_empty() {
        return None;
    }

    let (amount, unit) = match LEADING_AMOUNT.captures(raw) {
        Some(caps) => {
            let unit = caps[2].trim();
            (
                number(&caps[1]).and_then(non_negative),
                (!unit.is_empty()).then(|| unit.to_string()),
            )
        }
        None => (
            ANY_NUMBER
                .find(raw)
                .and_then(|m| number(m.as_str()))
                .and_then(non_negative),
            None,
        ),
    };

    Some(Servings {
        amount,
        unit,
        raw: Some(raw.to_string()),
    })
}

fn from_object(obj: &Map<String, Value>) -> Option<Servings> {
    let has_canonical = ["amount", "unit", "raw"]
        .iter()
        .any(|k| obj.get(*k).is_some_and(|v| !v.is_null()));

    if has_canonical {
        let amount = obj.get("amount").and_then(|v| match v {
            Value::Number(n) => n.as_f64().and_then(non_negative),
            Value::String(s) => from_text(s).and_then(|s| s.amount),
            _ => None,
        });
        let servings = Servings {
            amount,
            unit: obj.get("unit").and_then(scalar_text),
            raw: obj.get("raw").and_then(scalar_text),
        };
        return (servings.amount.is_some() || servings.unit.is_some() || servings.raw.is_some())
            .then_some(servings);
    }

    if let Some(value) = first_present(obj, &["value", "quantity", "count"]) {
        let mut servings = coerce_servings(value)?;
        if let Some(unit) = obj.get("unit").and_then(scalar_text) {
            servings.unit = Some(unit);
        }
        return Some(servings);
    }

    if obj.is_empty() {
        None
    } else {
        Some(Servings {
            amount: None,
            unit: None,
            raw: Some(Value::Object(obj.clone()).to_string()),
        })
    }
}

/// Coerce any servings shape; unusable shapes become `None`.
pub fn coerce_servings(value: &Value) -> Option<Servings> {
    match value {
        Value::Number(n) => Some(Servings {
            amount: Some(non_negative(n.as_f64()?)?),
            unit: None,
            raw: None,
        }),
        Value::String(s) => from_text(s),
        Value::Object(obj) => from_object(obj),
        Value::Array(items) => items.iter().find_map(coerce_servings),
        Value::Bool(_) | Value::Null => None,
    }
}

/// Servings from the first alias present.
pub fn resolve_servings(obj: &Map<String, Value>) -> Option<Servings> {
    first_present(obj, SERVINGS_ALIASES).and_then(coerce_servings)
}
