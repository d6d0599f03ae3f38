//! The placeholder module draws the deterministic SVG used for items without a
//! real product photo.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::text::escape_xml;

/// Gradient and text colours of one placeholder style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub start: &'static str,
    pub end: &'static str,
    pub text: &'static str,
}

const fn palette(start: &'static str, end: &'static str, text: &'static str) -> Palette {
    Palette { start, end, text }
}

pub const PALETTES: [Palette; 10] = [
    palette("#a5c9ff", "#6faafc", "#0b1a3c"),
    palette("#a3f3d8", "#5ed7b6", "#04382c"),
    palette("#ffe0b5", "#ffb27f", "#5a2400"),
    palette("#fbc2eb", "#a6c1ee", "#381452"),
    palette("#fbe5d6", "#f5c4a1", "#4a1d07"),
    palette("#c8e7ff", "#7bc2ff", "#05294b"),
    palette("#e5f3ff", "#b8d9ff", "#123460"),
    palette("#e8ffe8", "#b6f6c1", "#0f4020"),
    palette("#fde2ff", "#f1c6ff", "#3c0f45"),
    palette("#fff3c4", "#ffd47a", "#493107"),
];

const DEFAULT_LABEL: &str = "药";

pub const DATA_URI_PREFIX: &str = "data:image/svg+xml;base64,";

/// Polynomial rolling hash over UTF-16 code units with 32-bit wraparound.
///
/// Matches the `hashCode` used by the earlier JavaScript generator so that
/// existing datasets keep their colours.
pub fn placeholder_hash(seed: &str) -> u32 {
    let hash = seed.encode_utf16().fold(0_i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    hash.unsigned_abs()
}

/// Picks the palette of a brand/generic pair.
pub fn select_palette(brand_name: &str, generic_name: &str) -> Palette {
    let seed = format!("{brand_name}-{generic_name}");
    let index = placeholder_hash(&seed) as usize % PALETTES.len();
    PALETTES.get(index).copied().unwrap_or(PALETTES[0])
}

/// First two non-whitespace characters of the brand name, or `药`.
pub fn placeholder_label(brand_name: &str) -> String {
    let label: String = brand_name
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .take(2)
        .collect();

    if label.is_empty() {
        DEFAULT_LABEL.to_string()
    } else {
        label
    }
}

/// Renders the placeholder SVG document.
pub fn placeholder_svg(brand_name: &str, generic_name: &str) -> String {
    let palette = select_palette(brand_name, generic_name);
    let initials = escape_xml(&placeholder_label(brand_name));

    format!(
        r##"
<svg xmlns="http://www.w3.org/2000/svg" width="320" height="220" viewBox="0 0 320 220">
  <defs>
    <linearGradient id="gradient" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" stop-color="{start}" />
      <stop offset="100%" stop-color="{end}" />
    </linearGradient>
  </defs>
  <rect rx="28" ry="28" width="320" height="220" fill="url(#gradient)" />
  <g>
    <circle cx="80" cy="110" r="58" fill="rgba(255,255,255,0.28)" />
    <circle cx="240" cy="90" r="42" fill="rgba(255,255,255,0.22)" />
    <circle cx="230" cy="150" r="26" fill="rgba(255,255,255,0.18)" />
  </g>
  <text
    x="50%"
    y="52%"
    font-family="Noto Sans SC, 'Microsoft YaHei', Arial, sans-serif"
    font-size="74"
    font-weight="600"
    fill="{text}"
    text-anchor="middle"
    dominant-baseline="middle"
  >{initials}</text>
</svg>"##,
        start = palette.start,
        end = palette.end,
        text = palette.text,
    )
}

/// Returns the placeholder as a self-contained `data:` URI.
pub fn placeholder_image(brand_name: &str, generic_name: &str) -> String {
    let svg = placeholder_svg(brand_name, generic_name);
    format!("{DATA_URI_PREFIX}{}", STANDARD.encode(svg.as_bytes()))
}

/// Tells whether an image value is an embedded placeholder rather than a
/// remote photo.
pub fn is_placeholder(image: &str) -> bool {
    image.starts_with("data:image")
}
