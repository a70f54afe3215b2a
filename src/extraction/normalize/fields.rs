//! Loose field access over model JSON.

use serde_json::{Map, Value};

/// First alias present with a non-null value.
pub fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

/// First alias whose value `parse` accepts.
pub fn first_parsed<T>(
    obj: &Map<String, Value>,
    keys: &[&str],
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(parse)
}

/// Trimmed, non-empty string form of a scalar.
pub fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => number_text(n.as_f64()?),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// `2.0` -> "2", `1.5` -> "1.5".
pub fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// First alias holding usable text.
pub fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    first_parsed(obj, keys, scalar_text)
}

/// Lines of a string or list of strings, trimmed, empties dropped.
pub fn text_lines(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items.iter().flat_map(text_lines).collect(),
        Value::Object(obj) => text_field(obj, &["text", "note", "description", "name"])
            .map(|t| text_lines(&Value::String(t)))
            .unwrap_or_default(),
        Value::Number(_) | Value::Bool(_) => scalar_text(value).into_iter().collect(),
        Value::Null => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_present_skips_null() {
        let value = json!({"a": null, "b": 2, "c": 3});
        let obj = value.as_object().unwrap();
        assert_eq!(first_present(obj, &["a", "b", "c"]), Some(&json!(2)));
        assert_eq!(first_present(obj, &["x"]), None);
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!("  hi ")), Some("hi".to_string()));
        assert_eq!(scalar_text(&json!(2.0)), Some("2".to_string()));
        assert_eq!(scalar_text(&json!(1.25)), Some("1.25".to_string()));
        assert_eq!(scalar_text(&json!("   ")), None);
        assert_eq!(scalar_text(&json!([1])), None);
    }

    #[test]
    fn test_text_lines() {
        assert_eq!(
            text_lines(&json!(["a\n\n b ", "", {"text": "c"}])),
            vec!["a", "b", "c"]
        );
    }
}
