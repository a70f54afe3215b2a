//! Bot-block page detection.
//!
//! Sites behind Cloudflare, Akamai, PerimeterX and friends answer automated
//! clients with a challenge or denial page instead of content, often with a
//! 200 status. The detector looks at the text alone.

use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

/// Phrases that only show up on block/challenge pages.
pub const DEFAULT_BLOCK_PHRASES: &[&str] = &[
    // English
    "access denied",
    "access to this page has been denied",
    "you have been blocked",
    "sorry, you have been blocked",
    "request blocked",
    "are you a robot",
    "are you human",
    "verify you are human",
    "verifying you are human",
    "confirm you are human",
    "checking your browser",
    "checking if the site connection is secure",
    "attention required! | cloudflare",
    "performance & security by cloudflare",
    "enable javascript and cookies to continue",
    "please enable cookies",
    "press & hold",
    "press and hold",
    "unusual traffic from your computer",
    "bot detection",
    "ddos protection by",
    "complete the security check",
    "solve the captcha",
    "incapsula incident id",
    "pardon our interruption",
    "403 forbidden",
    // Hebrew
    "הגישה נדחתה",
    "הגישה נחסמה",
    "הגישה לדף זה נחסמה",
    "אנא אמת שאינך רובוט",
    "אינך רובוט",
    // Spanish
    "acceso denegado",
    "verifica que eres humano",
    // French
    "accès refusé",
    "vérifiez que vous êtes humain",
    // German
    "zugriff verweigert",
    "bitte bestätigen sie, dass sie kein roboter sind",
    // Russian
    "доступ запрещен",
    "доступ запрещён",
    // Portuguese
    "acesso negado",
    // Italian
    "accesso negato",
];

/// Why a page was (or was not) judged blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    PatternMatch,
    TooShortAndLowAlnum,
    None,
}

/// Classification of one piece of fetched text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockVerdict {
    pub is_blocked: bool,
    pub reason: BlockReason,
}

impl BlockVerdict {
    fn blocked(reason: BlockReason) -> Self {
        Self {
            is_blocked: true,
            reason,
        }
    }

    fn usable() -> Self {
        Self {
            is_blocked: false,
            reason: BlockReason::None,
        }
    }
}

/// Detector thresholds and phrase list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRules {
    /// Texts shorter than this (in characters) need a high alnum ratio.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Alphanumeric ratio a short text must exceed to count as content.
    #[serde(default = "default_min_alnum_ratio")]
    pub min_alnum_ratio: f64,
    /// Block phrases (case-insensitive). Empty means the built-in list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phrases: Vec<String>,
    /// Phrases added on top of `phrases`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_phrases: Vec<String>,
}

fn default_min_length() -> usize {
    160
}

fn default_min_alnum_ratio() -> f64 {
    0.25
}

impl Default for BlockRules {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            min_alnum_ratio: default_min_alnum_ratio(),
            phrases: Vec::new(),
            extra_phrases: Vec::new(),
        }
    }
}

impl BlockRules {
    fn effective_phrases(&self) -> Vec<String> {
        let base: Vec<String> = if self.phrases.is_empty() {
            DEFAULT_BLOCK_PHRASES.iter().map(|s| s.to_string()).collect()
        } else {
            self.phrases.clone()
        };
        base.into_iter()
            .chain(self.extra_phrases.iter().cloned())
            .filter(|p| !p.trim().is_empty())
            .collect()
    }
}

/// Classifies text as content or block page. Pure; cheap to share.
#[derive(Debug, Clone)]
pub struct BlockDetector {
    rules: BlockRules,
    patterns: RegexSet,
}

impl Default for BlockDetector {
    fn default() -> Self {
        Self::new(BlockRules::default())
    }
}

impl BlockDetector {
    pub fn new(rules: BlockRules) -> Self {
        let escaped: Vec<String> = rules
            .effective_phrases()
            .iter()
            .map(|p| regex::escape(p.trim()))
            .collect();
        let patterns = RegexSetBuilder::new(&escaped)
            .case_insensitive(true)
            .build()
            .unwrap_or_else(|_| RegexSet::empty());
        Self { rules, patterns }
    }

    pub fn rules(&self) -> &BlockRules {
        &self.rules
    }

    /// Classify `text`.
    pub fn classify(&self, text: &str) -> BlockVerdict {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return BlockVerdict::blocked(BlockReason::TooShortAndLowAlnum);
        }

        if self.patterns.is_match(trimmed) {
            return BlockVerdict::blocked(BlockReason::PatternMatch);
        }

        let total = trimmed.chars().count();
        if total < self.rules.min_length {
            let alnum = trimmed.chars().filter(|c| c.is_alphanumeric()).count();
            let ratio = alnum as f64 / total as f64;
            if ratio <= self.rules.min_alnum_ratio {
                return BlockVerdict::blocked(BlockReason::TooShortAndLowAlnum);
            }
        }

        BlockVerdict::usable()
    }

    /// Shorthand for `classify(text).is_blocked`.
    pub fn is_blocked(&self, text: &str) -> bool {
        self.classify(text).is_blocked
    }
}
