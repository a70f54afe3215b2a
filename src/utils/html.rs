//! HTML to text conversion and content capping.

use scraper::{ElementRef, Html, Node};

/// Elements whose text never reaches downstream consumers.
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "iframe"];

/// Elements that start a new line in the extracted text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "br", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6",
    "section", "article", "main", "header", "footer", "blockquote", "pre", "dt", "dd", "figcaption",
];

/// Heuristic check for HTML payloads.
pub fn looks_like_html(text: &str) -> bool {
    let head: String = text.trim_start().chars().take(512).collect::<String>().to_lowercase();
    head.starts_with("<!doctype")
        || head.starts_with("<html")
        || head.contains("<head")
        || head.contains("<body")
}

/// Strip script/style blocks and tags from an HTML document.
pub fn strip_html(html: &str) -> String {
    let document = Html::parse_document(html);
    element_text(document.root_element())
}

/// Visible text of an element, one block per line.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();

    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let skipped = node.ancestors().any(|a| {
            matches!(a.value(), Node::Element(e) if SKIP_TAGS.contains(&e.name()))
        });
        if skipped {
            continue;
        }

        let piece = text.trim();
        if piece.is_empty() {
            continue;
        }

        let in_block = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| BLOCK_TAGS.contains(&e.name())))
            .unwrap_or(false);
        if !out.is_empty() {
            out.push(if in_block { '\n' } else { ' ' });
        }
        out.push_str(piece);
    }

    collapse_whitespace(&out)
}

/// Collapse runs of whitespace within lines and drop blank lines.
pub fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate to at most `max_bytes` (UTF-8 safe).
pub fn truncate_to_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html_drops_scripts_and_styles() {
        let html = r#"<html><head><style>body { color: red }</style>
            <script>var bot = "detect";</script></head>
            <body><h1>Shakshuka</h1><p>Eggs poached in <b>tomato</b> sauce.</p></body></html>"#;
        let text = strip_html(html);
        assert!(!text.contains("color"));
        assert!(!text.contains("detect"));
        assert!(text.contains("Shakshuka"));
        assert!(text.contains("Eggs poached in tomato sauce."));
    }

    #[test]
    fn test_strip_html_keeps_list_items_on_lines() {
        let html = "<ul><li>2 cups flour</li><li>1 egg</li></ul>";
        assert_eq!(strip_html(html), "2 cups flour\n1 egg");
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("<!DOCTYPE html><html></html>"));
        assert!(looks_like_html("  <html lang=\"he\">"));
        assert!(!looks_like_html("plain recipe text"));
    }

    #[test]
    fn test_truncate_to_bytes_respects_char_boundary() {
        let text = "סוכר";
        // Each Hebrew letter is two bytes; 3 bytes must round down to 2.
        assert_eq!(truncate_to_bytes(text, 3), "ס");
        assert_eq!(truncate_to_bytes("abc", 10), "abc");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a   b\n\n\n  c\t d "), "a b\nc d");
    }
}
