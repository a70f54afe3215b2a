//! JSON recovery from language-model output.
//!
//! Models wrap JSON in prose and markdown fences, leave trailing commas, use
//! smart or single quotes, and forget to quote keys and string values. The
//! extractor tries progressively more invasive rewrites, each tier applied on
//! top of the previous one, and stops at the first text that parses.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Characters of the original text kept in a failure.
const EXCERPT_CHARS: usize = 500;

/// Rewrites are re-applied until stable to catch matches that overlapped.
const MAX_RULE_PASSES: usize = 8;

/// Repair tiers, least to most invasive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairTier {
    AsIs,
    FenceStripped,
    CommaTrimmed,
    QuoteNormalized,
    KeyQuoted,
    ValueQuoted,
    WhitespaceCollapsed,
}

impl RepairTier {
    pub const ALL: [RepairTier; 7] = [
        Self::AsIs,
        Self::FenceStripped,
        Self::CommaTrimmed,
        Self::QuoteNormalized,
        Self::KeyQuoted,
        Self::ValueQuoted,
        Self::WhitespaceCollapsed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AsIs => "as_is",
            Self::FenceStripped => "fence_stripped",
            Self::CommaTrimmed => "comma_trimmed",
            Self::QuoteNormalized => "quote_normalized",
            Self::KeyQuoted => "key_quoted",
            Self::ValueQuoted => "value_quoted",
            Self::WhitespaceCollapsed => "whitespace_collapsed",
        }
    }

    /// Rule table for the tier (empty for the structural tiers).
    pub fn rules(&self) -> &'static [RepairRule] {
        match self {
            Self::AsIs | Self::FenceStripped => &[],
            Self::CommaTrimmed => COMMA_RULES.as_slice(),
            Self::QuoteNormalized => QUOTE_RULES.as_slice(),
            Self::KeyQuoted => KEY_RULES.as_slice(),
            Self::ValueQuoted => VALUE_RULES.as_slice(),
            Self::WhitespaceCollapsed => WHITESPACE_RULES.as_slice(),
        }
    }

    /// This tier's rewrite of `text`.
    pub fn rewrite(&self, text: &str) -> String {
        match self {
            Self::AsIs => text.trim().to_string(),
            Self::FenceStripped => strip_fences(text),
            _ => self
                .rules()
                .iter()
                .fold(text.to_string(), |acc, rule| rule.apply(&acc)),
        }
    }
}

impl fmt::Display for RepairTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a rule may rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Everywhere,
    /// Only between double-quoted string literals.
    OutsideStrings,
    /// Double-quoted literals are matched as whole tokens and copied through,
    /// so the rule itself may consume text that contains `"`.
    SkipLiterals,
}

enum Rewrite {
    Template(&'static str),
    Func(fn(&Captures) -> String),
}

/// One textual rewrite: a pattern and what to replace it with.
pub struct RepairRule {
    pub name: &'static str,
    pub scope: Scope,
    pattern: Regex,
    rewrite: Rewrite,
}

impl fmt::Debug for RepairRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepairRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

impl RepairRule {
    fn new(name: &'static str, scope: Scope, pattern: &str, rewrite: Rewrite) -> Self {
        let pattern = match scope {
            Scope::SkipLiterals => format!(r#"(?:"(?:[^"\\]|\\.)*")|(?:{})"#, pattern),
            _ => pattern.to_string(),
        };
        Self {
            name,
            scope,
            pattern: Regex::new(&pattern).unwrap(),
            rewrite,
        }
    }

    /// Apply the rule until the text stops changing.
    pub fn apply(&self, text: &str) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_RULE_PASSES {
            let next = match self.scope {
                Scope::Everywhere | Scope::SkipLiterals => self.replace(&current).into_owned(),
                Scope::OutsideStrings => outside_strings(&current, |s| self.replace(s)),
            };
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn replace<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if self.scope == Scope::SkipLiterals {
            return self.pattern.replace_all(text, |caps: &Captures| {
                if caps.get(1).is_none() {
                    return caps[0].to_string();
                }
                match self.rewrite {
                    Rewrite::Template(template) => {
                        let mut out = String::new();
                        caps.expand(template, &mut out);
                        out
                    }
                    Rewrite::Func(f) => f(caps),
                }
            });
        }
        match self.rewrite {
            Rewrite::Template(template) => self.pattern.replace_all(text, template),
            Rewrite::Func(f) => self.pattern.replace_all(text, |caps: &Captures| f(caps)),
        }
    }
}

static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:[^"\\]|\\.)*""#).unwrap());

static FENCE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_-]*[ \t]*$").unwrap());

static BARE_SCALAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?|true|false|null)$").unwrap()
});

static COMMA_RULES: LazyLock<Vec<RepairRule>> = LazyLock::new(|| {
    vec![RepairRule::new(
        "trailing_comma",
        Scope::OutsideStrings,
        r",(\s*[}\]])",
        Rewrite::Template("$1"),
    )]
});

static QUOTE_RULES: LazyLock<Vec<RepairRule>> = LazyLock::new(|| {
    vec![
        RepairRule::new(
            "smart_double_quotes",
            Scope::Everywhere,
            "[\u{201C}\u{201D}\u{201E}\u{201F}\u{2033}]",
            Rewrite::Template("\""),
        ),
        RepairRule::new(
            "smart_single_quotes",
            Scope::Everywhere,
            "[\u{2018}\u{2019}\u{201A}\u{201B}\u{2032}]",
            Rewrite::Template("'"),
        ),
        RepairRule::new(
            "single_quoted_strings",
            Scope::SkipLiterals,
            r#"([{\[,:]\s*)'((?:[^'\\\n]|\\.)*)'(\s*[,:}\]])"#,
            Rewrite::Func(requote_single),
        ),
    ]
});

static KEY_RULES: LazyLock<Vec<RepairRule>> = LazyLock::new(|| {
    vec![RepairRule::new(
        "bare_key",
        Scope::OutsideStrings,
        r"([{,]\s*)([\p{L}_$][\w$-]*)(\s*:)",
        Rewrite::Template("$1\"$2\"$3"),
    )]
});

static VALUE_RULES: LazyLock<Vec<RepairRule>> = LazyLock::new(|| {
    vec![
        RepairRule::new(
            "bare_object_value",
            Scope::OutsideStrings,
            r#"(:\s*)([^\s"\[{\]},][^,}\]\n]*?)(\s*[,}\]\n])"#,
            Rewrite::Func(quote_bare),
        ),
        RepairRule::new(
            "bare_array_item",
            Scope::OutsideStrings,
            r#"([\[,]\s*)([^\s"\[{\]},:][^,:}\]\n]*?)(\s*[,\]])"#,
            Rewrite::Func(quote_bare),
        ),
    ]
});

static WHITESPACE_RULES: LazyLock<Vec<RepairRule>> = LazyLock::new(|| {
    vec![
        RepairRule::new(
            "control_whitespace",
            Scope::Everywhere,
            r"[\r\n\t]+",
            Rewrite::Template(" "),
        ),
        RepairRule::new("space_runs", Scope::Everywhere, r" {2,}", Rewrite::Template(" ")),
    ]
});

fn json_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// `'it\'s'` -> `"it's"`, escaping any embedded double quotes.
fn requote_single(caps: &Captures) -> String {
    let inner = caps[2].replace("\\'", "'");
    format!("{}{}{}", &caps[1], json_string(&inner), &caps[3])
}

/// Quote a bare value unless it already is a JSON scalar.
fn quote_bare(caps: &Captures) -> String {
    let value = caps[2].trim();
    if BARE_SCALAR.is_match(value) {
        return caps[0].to_string();
    }
    format!("{}{}{}", &caps[1], json_string(value), &caps[3])
}

/// Apply `f` to the text between string literals, copying literals verbatim.
fn outside_strings<'t>(text: &'t str, f: impl Fn(&'t str) -> Cow<'t, str>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in STRING_LITERAL.find_iter(text) {
        out.push_str(&f(&text[last..m.start()]));
        out.push_str(m.as_str());
        last = m.end();
    }
    out.push_str(&f(&text[last..]));
    out
}

/// Drop markdown fences and slice from the first `{`/`[` to the last `}`/`]`.
fn strip_fences(text: &str) -> String {
    let unfenced = FENCE_LINE.replace_all(text, "");
    let start = unfenced.find(&['{', '['][..]);
    let end = unfenced.rfind(&['}', ']'][..]);
    match (start, end) {
        (Some(start), Some(end)) if start < end => unfenced[start..=end].to_string(),
        _ => unfenced.trim().to_string(),
    }
}

/// No tier produced a parseable object or array.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not recover JSON from model output: {excerpt}")]
pub struct JsonRepairError {
    /// Start of the original text.
    pub excerpt: String,
}

impl JsonRepairError {
    fn new(raw: &str) -> Self {
        Self {
            excerpt: raw.chars().take(EXCERPT_CHARS).collect(),
        }
    }
}

/// A successful recovery and how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired {
    pub value: Value,
    pub tier: RepairTier,
    /// Every tier tried, in order, ending with `tier`.
    pub attempted: Vec<RepairTier>,
}

fn parse_structured(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}

/// Recover a JSON object or array from `raw`.
pub fn extract_json(raw: &str) -> Result<Value, JsonRepairError> {
    extract_json_traced(raw).map(|repaired| repaired.value)
}

/// Like [`extract_json`], reporting the winning tier.
pub fn extract_json_traced(raw: &str) -> Result<Repaired, JsonRepairError> {
    let mut text = raw.to_string();
    let mut attempted = Vec::with_capacity(RepairTier::ALL.len());

    for tier in RepairTier::ALL {
        text = tier.rewrite(&text);
        attempted.push(tier);
        if let Some(value) = parse_structured(&text) {
            debug!("Recovered JSON at tier {}", tier);
            return Ok(Repaired {
                value,
                tier,
                attempted,
            });
        }
    }

    debug!("JSON recovery failed after {} tiers", attempted.len());
    Err(JsonRepairError::new(raw))
}
