//! Small text helpers shared by the parsers, the placeholder generator and
//! the image downloader.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));
static SLUG_STRIPPER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-z0-9\x{4e00}-\x{9fa5}-]").expect("Failed to compile slug stripper regex")
});
static FILE_SLUG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\w\x{4e00}-\x{9fff}-]+").expect("Failed to compile file slug regex")
});
static DASHES_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-{2,}").expect("Failed to compile dashes regex"));

/// Removes byte-order marks and surrounding whitespace.
pub fn normalize_text(text: &str) -> String {
    text.replace('\u{feff}', "").trim().to_string()
}

/// Builds the URL-safe identifier of a category name.
///
/// Latin letters are lowercased, whitespace runs become a single `-` and
/// anything outside ASCII alphanumerics, common CJK ideographs and `-` is
/// dropped.
pub fn build_slug(name: &str) -> String {
    let lowered = normalize_text(name).to_lowercase();
    let dashed = WHITESPACE_REGEX.replace_all(&lowered, "-");
    SLUG_STRIPPER_REGEX.replace_all(&dashed, "").into_owned()
}

/// Builds a file-system friendly name for downloaded images.
pub fn file_slug(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let dashed = FILE_SLUG_REGEX.replace_all(&lowered, "-");
    let collapsed = DASHES_REGEX.replace_all(&dashed, "-");
    let slug = collapsed.trim_matches('-');
    if slug.is_empty() {
        "item".to_string()
    } else {
        slug.to_string()
    }
}

pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
