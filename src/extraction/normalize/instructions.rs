//! Instruction groups from strings, step lists, HowTo sections, and maps.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::fields::{first_present, scalar_text, text_field};
use crate::models::InstructionGroup;

pub const GROUP_ALIASES: &[&str] = &[
    "instructionGroups",
    "instruction_groups",
    "instructionSections",
];
pub const FLAT_ALIASES: &[&str] = &[
    "instructions",
    "recipeInstructions",
    "steps",
    "directions",
    "method",
];

const GROUP_NAME_KEYS: &[&str] = &["name", "title", "section", "heading"];
const GROUP_LIST_KEYS: &[&str] = &["instructions", "steps", "itemListElement", "items"];
const STEP_TEXT_KEYS: &[&str] = &["text", "instruction", "step", "description", "name"];

static URL_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:https?://|www\.)\S+$").unwrap());

static STEP_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)").unwrap());

fn keep_line(line: &str) -> bool {
    !line.is_empty() && !URL_ONLY.is_match(line)
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| keep_line(l))
        .map(str::to_string)
        .collect()
}

fn is_group_shaped(obj: &Map<String, Value>) -> bool {
    let typed_section = obj
        .get("@type")
        .and_then(Value::as_str)
        .is_some_and(|t| t.eq_ignore_ascii_case("HowToSection"));
    typed_section
        || GROUP_LIST_KEYS
            .iter()
            .any(|k| matches!(obj.get(*k), Some(Value::Array(_))))
}

/// `{"instruction": "...", "step": 2}` entries carry their own order.
fn step_order(obj: &Map<String, Value>) -> Option<u64> {
    if !obj.contains_key("instruction") {
        return None;
    }
    match obj.get("step")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => STEP_NUMBER
            .captures(s)
            .and_then(|caps| caps[1].parse().ok()),
        _ => None,
    }
}

/// Text lines of a single step, whatever its shape.
fn step_lines(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => split_lines(s),
        Value::Number(_) => scalar_text(value).map(|t| split_lines(&t)).unwrap_or_default(),
        Value::Object(obj) => text_field(obj, STEP_TEXT_KEYS)
            .map(|t| split_lines(&t))
            .unwrap_or_default(),
        Value::Array(items) => steps_from_list(items),
        _ => Vec::new(),
    }
}

/// Flattened step text of a list, honoring explicit step numbers.
fn steps_from_list(items: &[Value]) -> Vec<String> {
    let numbered: Option<Vec<(u64, &Value)>> = items
        .iter()
        .map(|item| match item {
            Value::Object(obj) => step_order(obj).map(|n| (n, item)),
            _ => None,
        })
        .collect();

    match numbered {
        Some(mut numbered) if !numbered.is_empty() => {
            numbered.sort_by_key(|(n, _)| *n);
            numbered
                .into_iter()
                .flat_map(|(_, item)| match item {
                    Value::Object(obj) => text_field(obj, &["instruction"])
                        .map(|t| split_lines(&t))
                        .unwrap_or_default(),
                    _ => Vec::new(),
                })
                .collect()
        }
        _ => items.iter().flat_map(step_lines).collect(),
    }
}

struct Grouper<'a> {
    default_name: &'a str,
    groups: Vec<InstructionGroup>,
    loose: Vec<String>,
}

impl<'a> Grouper<'a> {
    fn new(default_name: &'a str) -> Self {
        Self {
            default_name,
            groups: Vec::new(),
            loose: Vec::new(),
        }
    }

    fn flush(&mut self) {
        if !self.loose.is_empty() {
            self.groups.push(InstructionGroup {
                name: self.default_name.to_string(),
                instructions: std::mem::take(&mut self.loose),
            });
        }
    }

    fn push_group(&mut self, name: Option<String>, instructions: Vec<String>) {
        self.flush();
        self.groups.push(InstructionGroup {
            name: name.unwrap_or_else(|| self.default_name.to_string()),
            instructions,
        });
    }

    fn push_section(&mut self, obj: &Map<String, Value>) {
        let steps = first_present(obj, GROUP_LIST_KEYS)
            .map(step_lines)
            .unwrap_or_default();
        self.push_group(text_field(obj, GROUP_NAME_KEYS), steps);
    }

    fn finish(mut self) -> Vec<InstructionGroup> {
        self.flush();
        self.groups
            .into_iter()
            .filter(|g| !g.instructions.is_empty())
            .collect()
    }
}

fn groups_from_value(value: &Value, default_name: &str) -> Vec<InstructionGroup> {
    let mut grouper = Grouper::new(default_name);
    match value {
        Value::Array(items) => {
            let has_sections = items
                .iter()
                .any(|item| matches!(item, Value::Object(obj) if is_group_shaped(obj)));
            if has_sections {
                for item in items {
                    match item {
                        Value::Object(obj) if is_group_shaped(obj) => grouper.push_section(obj),
                        other => grouper.loose.extend(step_lines(other)),
                    }
                }
            } else {
                grouper.loose.extend(steps_from_list(items));
            }
        }
        Value::Object(obj) if is_group_shaped(obj) => grouper.push_section(obj),
        Value::Object(obj)
            if !STEP_TEXT_KEYS.iter().any(|k| obj.contains_key(*k))
                && obj.values().all(|v| v.is_array() || v.is_string()) =>
        {
            // {"Dough": [...], "Baking": "..."}
            for (name, steps) in obj {
                let name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
                grouper.push_group(name, step_lines(steps));
            }
        }
        other => grouper.loose.extend(step_lines(other)),
    }
    grouper.finish()
}

/// Instruction groups, preferring explicit group data over a flat list.
pub fn resolve_instruction_groups(
    obj: &Map<String, Value>,
    default_name: &str,
) -> Vec<InstructionGroup> {
    let groups = first_present(obj, GROUP_ALIASES)
        .map(|v| groups_from_value(v, default_name))
        .unwrap_or_default();
    if !groups.is_empty() {
        return groups;
    }
    first_present(obj, FLAT_ALIASES)
        .map(|v| groups_from_value(v, default_name))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEFAULT: &str = "Instructions";

    fn resolve(value: Value) -> Vec<InstructionGroup> {
        resolve_instruction_groups(value.as_object().unwrap(), DEFAULT)
    }

    #[test]
    fn test_string_is_split_into_lines() {
        let groups = resolve(json!({"instructions": "Mix.\n\n  Bake.  \nhttps://example.com/step"}));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, DEFAULT);
        assert_eq!(groups[0].instructions, ["Mix.", "Bake."]);
    }

    #[test]
    fn test_how_to_steps_and_sections() {
        let groups = resolve(json!({"recipeInstructions": [
            {"@type": "HowToSection", "name": "Dough", "itemListElement": [
                {"@type": "HowToStep", "text": "Knead"},
                {"@type": "HowToStep", "text": "Rest"}
            ]},
            {"@type": "HowToStep", "text": "Shape"}
        ]}));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Dough");
        assert_eq!(groups[0].instructions, ["Knead", "Rest"]);
        assert_eq!(groups[1].name, DEFAULT);
        assert_eq!(groups[1].instructions, ["Shape"]);
    }

    #[test]
    fn test_numbered_steps_are_sorted() {
        let groups = resolve(json!({"steps": [
            {"instruction": "second", "step": 2},
            {"instruction": "first", "step": "1"}
        ]}));
        assert_eq!(groups[0].instructions, ["first", "second"]);
    }

    #[test]
    fn test_name_to_list_map() {
        let groups = resolve(json!({"instructions": {"Sauce": ["Simmer"], "Pasta": "Boil\nDrain"}}));
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Sauce", "Pasta"]);
        assert_eq!(groups[1].instructions, ["Boil", "Drain"]);
    }

    #[test]
    fn test_groups_win_and_empty_groups_drop() {
        let groups = resolve(json!({
            "instructionGroups": [
                {"name": "Empty", "instructions": []},
                {"name": "Prep", "instructions": ["Chop"]}
            ],
            "instructions": ["ignored"]
        }));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Prep");

        let groups = resolve(json!({
            "instructionGroups": [{"name": "Empty", "instructions": ["www.example.com"]}],
            "instructions": ["used"]
        }));
        assert_eq!(groups[0].instructions, ["used"]);
    }

    #[test]
    fn test_nothing_usable() {
        assert!(resolve(json!({})).is_empty());
        assert!(resolve(json!({"instructions": []})).is_empty());
        assert!(resolve(json!({"instructions": [null, {"image": "x"}]})).is_empty());
    }
}
