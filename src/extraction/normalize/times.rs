//! Duration coercion to whole minutes.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use super::fields::first_parsed;

pub const PREP_ALIASES: &[&str] = &["prepTimeMinutes", "prep_time_minutes", "prepTime", "prep_time"];
pub const COOK_ALIASES: &[&str] = &["cookTimeMinutes", "cook_time_minutes", "cookTime", "cook_time"];
pub const TOTAL_ALIASES: &[&str] = &[
    "totalTimeMinutes",
    "total_time_minutes",
    "totalTime",
    "total_time",
];

static ISO_8601: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(
        r"^P(?:(\d+)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .case_insensitive(true)
    .build()
    .unwrap()
});

static CLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());

static HOURS: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"(\d+(?:[.,]\d+)?)\s*(?:hours?|hrs?|h|שעות|שעה|ש׳|ש')")
        .case_insensitive(true)
        .build()
        .unwrap()
});

static MINUTES: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"(\d+(?:[.,]\d+)?)\s*(?:minutes?|mins?|m|דקות|דקה|דק׳|דק')")
        .case_insensitive(true)
        .build()
        .unwrap()
});

static BARE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\D*?(\d+(?:[.,]\d+)?)\D*$").unwrap());

/// Hebrew duration words with no digits, checked before the numeric rules.
const HEBREW_PHRASES: &[(&str, f64)] = &[
    ("שעה וחצי", 90.0),
    ("שעתיים וחצי", 150.0),
    ("שעתיים", 120.0),
    ("חצי שעה", 30.0),
    ("רבע שעה", 15.0),
    ("שלושת רבעי שעה", 45.0),
];

fn to_minutes(n: f64) -> Option<u32> {
    (n.is_finite() && n >= 0.0 && n <= u32::MAX as f64).then(|| n.round() as u32)
}

fn number(text: &str) -> Option<f64> {
    text.replace(',', ".").parse().ok()
}

/// Minutes in a free-form duration string.
pub fn parse_duration(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(n) = text.parse::<f64>() {
        return to_minutes(n);
    }

    if let Some(caps) = ISO_8601.captures(text) {
        if caps.iter().skip(1).any(|c| c.is_some()) {
            let part = |i: usize| caps.get(i).and_then(|m| number(m.as_str())).unwrap_or(0.0);
            return to_minutes(part(1) * 1440.0 + part(2) * 60.0 + part(3) + part(4) / 60.0);
        }
    }

    if let Some(caps) = CLOCK.captures(text) {
        let hours: f64 = caps[1].parse().ok()?;
        let minutes: f64 = caps[2].parse().ok()?;
        return to_minutes(hours * 60.0 + minutes);
    }

    let mut total = 0.0;
    let mut matched = false;
    let mut rest = text.to_string();
    for (phrase, minutes) in HEBREW_PHRASES {
        if rest.contains(phrase) {
            total += minutes;
            matched = true;
            rest = rest.replace(phrase, " ");
        }
    }

    let mut hours_matched = false;
    for caps in HOURS.captures_iter(&rest) {
        if let Some(n) = number(&caps[1]) {
            total += n * 60.0;
            hours_matched = true;
        }
    }
    matched |= hours_matched;
    for caps in MINUTES.captures_iter(&rest) {
        if let Some(n) = number(&caps[1]) {
            total += n;
            matched = true;
        }
    }
    // A bare "hour" with no count in front of it.
    if !hours_matched && rest.contains("שעה") {
        total += 60.0;
        matched = true;
    }
    if matched {
        return to_minutes(total);
    }

    BARE_NUMBER
        .captures(text)
        .and_then(|caps| number(&caps[1]))
        .and_then(to_minutes)
}

/// Minutes from a number, string, or `{minutes|value}` object.
pub fn parse_minutes(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => to_minutes(n.as_f64()?),
        Value::String(s) => parse_duration(s),
        Value::Object(obj) => first_parsed(obj, &["minutes", "value", "duration"], parse_minutes),
        _ => None,
    }
}

/// (prep, cook, total); total falls back to prep + cook.
///
/// Within each alias list the first value that parses wins, so an
/// unusable `prepTimeMinutes: "soon"` does not hide `prepTime: "PT15M"`.
pub fn resolve_times(obj: &Map<String, Value>) -> (Option<u32>, Option<u32>, Option<u32>) {
    let prep = first_parsed(obj, PREP_ALIASES, parse_minutes);
    let cook = first_parsed(obj, COOK_ALIASES, parse_minutes);
    let total = first_parsed(obj, TOTAL_ALIASES, parse_minutes).or_else(|| match (prep, cook) {
        (None, None) => None,
        (p, c) => Some(p.unwrap_or(0).saturating_add(c.unwrap_or(0))),
    });
    (prep, cook, total)
}
