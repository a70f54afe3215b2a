//! Main-content selection for rendered pages.

use scraper::{Html, Selector};

use crate::utils::{element_text, strip_html};

/// Containers that usually hold the article or recipe body.
const CONTENT_CANDIDATES: &[&str] = &[
    "main",
    "article",
    "[role=main]",
    "[itemtype*=Recipe]",
    ".recipe",
    ".wprm-recipe-container",
    ".tasty-recipes",
    ".entry-content",
    ".post-content",
    "#content",
];

/// Text of the richest content container, or the whole page when no
/// container reaches `min_chars`.
pub fn best_content_text(html: &str, min_chars: usize) -> String {
    let document = Html::parse_document(html);

    let mut best = String::new();
    let mut best_len = 0;
    for candidate in CONTENT_CANDIDATES {
        let Ok(selector) = Selector::parse(candidate) else {
            continue;
        };
        for element in document.select(&selector) {
            let text = element_text(element);
            let len = text.chars().count();
            if len > best_len {
                best_len = len;
                best = text;
            }
        }
    }

    if best_len >= min_chars {
        best
    } else {
        strip_html(html)
    }
}
