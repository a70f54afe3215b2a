//! Shared utility functions.
//!
//! - `html`: HTML to text conversion and UTF-8 safe truncation

mod html;

pub use html::{
    collapse_whitespace, element_text, looks_like_html, strip_html,
    truncate_to_bytes,
};
