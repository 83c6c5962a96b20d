//! MIME detection for image bytes.

use image::ImageFormat;
use std::path::Path;

const SVG_MIME: &str = "image/svg+xml";

/// Decide the MIME type of an image.
///
/// Magic bytes win. Markup or JSON bodies are never images, except SVG
/// declared as such. Otherwise a declared `image/*` type is trusted, and as a
/// last resort the file name extension is consulted. Returns `None` when
/// nothing identifies the bytes as an image.
pub fn detect_mime(declared: Option<&str>, name: Option<&Path>, bytes: &[u8]) -> Option<String> {
    if let Ok(format) = image::guess_format(bytes) {
        return Some(format.to_mime_type().to_string());
    }

    let declared = declared.map(normalize_content_type);
    if looks_like_text(bytes) {
        return declared.filter(|d| d.as_str() == SVG_MIME);
    }
    if let Some(declared) = declared.filter(|d| d.starts_with("image/")) {
        return Some(declared);
    }

    let ext = name?
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())?;
    match ext.as_str() {
        // Not known to the image crate, but valid uploads.
        "heic" | "heif" => Some("image/heic".into()),
        _ => ImageFormat::from_extension(&ext).map(|f| f.to_mime_type().to_string()),
    }
}

/// Whether the body opens like markup or JSON.
fn looks_like_text(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    matches!(
        bytes.iter().copied().find(|b| !b.is_ascii_whitespace()),
        Some(b'<' | b'{' | b'[')
    )
}

/// Lowercase a Content-Type header and drop its parameters.
fn normalize_content_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
