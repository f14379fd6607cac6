//! Fonts bundled into the binary and the `@font-face` layer built from them.
//!
//! Every `.ttf`/`.otf` file under `fonts/` is embedded at compile time, so
//! there is no runtime directory scan and the assembled document stays
//! self-contained: each face is referenced through a `data:` URI.
//!
//! The family name is the first `-`-separated segment of the file stem
//! (`NotoColorEmoji-Regular.ttf` becomes `NotoColorEmoji`). Families whose
//! name contains "emoji" are restricted to [`EMOJI_UNICODE_RANGE`], so only
//! emoji and symbol code points render from them while regular text keeps
//! the system sans-serif stack.

use crate::MdpError;
use base64::{engine::general_purpose::STANDARD, Engine};
use log::debug;
use rust_embed::RustEmbed;
use std::borrow::Cow;

#[derive(RustEmbed)]
#[folder = "fonts/"]
#[include = "*.ttf"]
#[include = "*.otf"]
struct BundledFonts;

/// Unicode ranges covering emoji and symbol blocks.
pub const EMOJI_UNICODE_RANGE: &str = "U+200D, U+203C, U+2049, U+20E3, \
U+2122, U+2139, U+2194-2199, U+21A9-21AA, \
U+231A-231B, U+2328, U+23CF, U+23E9-23F3, U+23F8-23FA, \
U+24C2, U+25AA-25AB, U+25B6, U+25C0, U+25FB-25FE, \
U+2600-2604, U+260E, U+2611, U+2614-2615, U+2618, U+261D, \
U+2620, U+2622-2623, U+2626, U+262A, U+262E-262F, \
U+2638-263A, U+2640, U+2642, U+2648-2653, U+265F-2660, \
U+2663, U+2665-2666, U+2668, U+267B, U+267E-267F, \
U+2692-2697, U+2699, U+269B-269C, U+26A0-26A1, U+26A7, \
U+26AA-26AB, U+26B0-26B1, U+26BD-26BE, U+26C4-26C5, \
U+26CE-26CF, U+26D1, U+26D3-26D4, U+26E9-26EA, \
U+26F0-26F5, U+26F7-26FA, U+26FD, U+2702, U+2705, \
U+2708-270D, U+270F, U+2712, U+2714, U+2716, U+271D, \
U+2721, U+2728, U+2733-2734, U+2744, U+2747, U+274C, \
U+274E, U+2753-2755, U+2757, U+2763-2764, U+2795-2797, \
U+27A1, U+27B0, U+27BF, U+2934-2935, U+2B05-2B07, \
U+2B1B-2B1C, U+2B50, U+2B55, U+3030, U+303D, \
U+3297, U+3299, \
U+FE00-FE0F, \
U+1F000-1F02F, U+1F0A0-1F0FF, \
U+1F100-1F1FF, U+1F200-1F2FF, \
U+1F300-1F5FF, U+1F600-1F64F, U+1F650-1F6FF, \
U+1F700-1F77F, U+1F780-1F7FF, U+1F800-1F8FF, \
U+1F900-1F9FF, U+1FA00-1FA6F, U+1FA70-1FAFF";

/// A font file compiled into the binary.
#[derive(Debug, Clone)]
pub struct FontAsset {
    pub file_name: String,
    pub family: String,
    pub data: Cow<'static, [u8]>,
}

impl FontAsset {
    pub fn new(file_name: impl Into<String>, data: Cow<'static, [u8]>) -> Self {
        let file_name = file_name.into();
        let family = family_from_file_name(&file_name);
        Self {
            file_name,
            family,
            data,
        }
    }

    pub fn is_emoji(&self) -> bool {
        self.family.to_ascii_lowercase().contains("emoji")
    }

    fn format(&self) -> (&'static str, &'static str) {
        if self.file_name.to_ascii_lowercase().ends_with(".otf") {
            ("font/otf", "opentype")
        } else {
            ("font/ttf", "truetype")
        }
    }
}

/// Derives a CSS family name from a font file name.
///
/// Only ASCII alphanumerics, spaces and underscores survive, so the name can
/// be placed inside a quoted CSS string as is.
pub fn family_from_file_name(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    let first = stem.split('-').next().unwrap_or(stem);
    first
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '_')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Returns every bundled font, sorted by file name.
pub fn bundled_fonts() -> Result<Vec<FontAsset>, MdpError> {
    let mut names: Vec<String> = BundledFonts::iter().map(|n| n.into_owned()).collect();
    names.sort();

    names
        .into_iter()
        .map(|name| {
            let file = BundledFonts::get(&name).ok_or_else(|| MdpError::FontError {
                font_name: name.clone(),
                message: "bundled font data is missing".to_string(),
                suggestion: "Rebuild md-pdf so the fonts/ directory is embedded again".to_string(),
            })?;
            debug!("Bundled font {} ({} bytes)", name, file.data.len());
            Ok(FontAsset::new(name, file.data))
        })
        .collect()
}

/// Builds the `@font-face` rule for one font.
pub fn font_face_rule(asset: &FontAsset) -> String {
    let (mime, format) = asset.format();
    let unicode_range = if asset.is_emoji() {
        format!(" unicode-range: {};", EMOJI_UNICODE_RANGE)
    } else {
        String::new()
    };
    format!(
        "@font-face {{ font-family: \"{}\"; src: url(\"data:{};base64,{}\") format(\"{}\");{} }}",
        asset.family,
        mime,
        STANDARD.encode(&asset.data),
        format,
        unicode_range
    )
}

/// Builds the font-face layer, one rule per line.
pub fn font_face_css(assets: &[FontAsset]) -> String {
    assets
        .iter()
        .filter(|a| !a.family.is_empty())
        .map(font_face_rule)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str, data: &'static [u8]) -> FontAsset {
        FontAsset::new(name, Cow::Borrowed(data))
    }

    #[test]
    fn test_family_from_file_name() {
        assert_eq!(family_from_file_name("NotoEmoji-Regular.ttf"), "NotoEmoji");
        assert_eq!(family_from_file_name("Inter.otf"), "Inter");
        assert_eq!(family_from_file_name("Weird\"Name-Bold.ttf"), "WeirdName");
        assert_eq!(family_from_file_name("noextension"), "noextension");
    }

    #[test]
    fn test_emoji_font_is_range_scoped() {
        let rule = font_face_rule(&asset("NotoColorEmoji-Regular.ttf", b"\x00\x01\x00\x00"));
        assert!(rule.starts_with("@font-face { font-family: \"NotoColorEmoji\";"));
        assert!(rule.contains("url(\"data:font/ttf;base64,AAEAAA==\") format(\"truetype\")"));
        assert!(rule.contains("unicode-range: U+200D,"));
        assert!(rule.contains("U+1FA70-1FAFF;"));
    }

    #[test]
    fn test_text_font_is_not_range_scoped() {
        let rule = font_face_rule(&asset("Inter-Regular.otf", b"OTTO"));
        assert!(rule.contains("font-family: \"Inter\""));
        assert!(rule.contains("data:font/otf;base64,"));
        assert!(rule.contains("format(\"opentype\")"));
        assert!(!rule.contains("unicode-range"));
    }

    #[test]
    fn test_font_face_css_joins_rules() {
        let css = font_face_css(&[
            asset("A-Regular.ttf", b"a"),
            asset("-.ttf", b"skipped"),
            asset("BEmoji.ttf", b"b"),
        ]);
        assert_eq!(css.lines().count(), 2);
        assert!(css.lines().nth(1).unwrap().contains("unicode-range"));
    }

    #[test]
    fn test_bundled_fonts_are_sorted_and_loadable() {
        let fonts = bundled_fonts().unwrap();
        let names: Vec<&str> = fonts.iter().map(|f| f.file_name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(fonts.iter().all(|f| !f.data.is_empty()));
    }
}
