//! Image URL collection and filtering.

use serde_json::{Map, Value};

use super::fields::first_parsed;

pub const IMAGE_ALIASES: &[&str] = &["images", "image", "photos", "photo", "thumbnailUrl"];
pub const IMAGE_URL_ALIASES: &[&str] = &["imageUrl", "image_url"];

pub const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".avif", ".bmp", ".svg", ".heic",
];

/// True when the path (query and fragment ignored) carries an image extension,
/// either at the end or as a segment suffix (`/dish.jpg/resize/800x600`).
pub fn is_image_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(ext) || path.contains(&format!("{}/", ext)))
}

fn collect_urls(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.trim().to_string()),
        Value::Array(items) => items.iter().for_each(|item| collect_urls(item, out)),
        Value::Object(obj) => {
            if let Some(url) = ["url", "contentUrl", "src"].iter().find_map(|k| obj.get(*k)) {
                collect_urls(url, out);
            }
        }
        _ => {}
    }
}

/// (image_url, images) with non-image URLs dropped and duplicates removed.
pub fn resolve_images(obj: &Map<String, Value>) -> (Option<String>, Vec<String>) {
    let mut candidates = Vec::new();
    for key in IMAGE_ALIASES {
        if let Some(value) = obj.get(*key) {
            collect_urls(value, &mut candidates);
        }
    }

    let mut images: Vec<String> = Vec::new();
    for url in candidates {
        if is_image_url(&url) && !images.contains(&url) {
            images.push(url);
        }
    }

    let image_url = first_parsed(obj, IMAGE_URL_ALIASES, |v| {
        v.as_str()
            .map(str::trim)
            .filter(|s| is_image_url(s))
            .map(str::to_string)
    })
    .or_else(|| images.first().cloned());

    (image_url, images)
}
