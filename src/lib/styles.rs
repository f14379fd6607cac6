//! Stylesheet layers and their composition.
//!
//! A rendered document carries four CSS layers in a fixed cascade order:
//!
//! ```text
//! +--------------+   +-------------+   +------------------+   +-------------+
//! | Structural   |   | Theme       |   | Syntax highlight |   | Font faces  |
//! | layout rules |-->| light/dark  |-->| token classes    |-->| bundled     |
//! | (no colors)  |   | colors      |   | (generated)      |   | fonts       |
//! +--------------+   +-------------+   +------------------+   +-------------+
//! ```
//!
//! The structural layer never mentions a color, the theme layers only set
//! colors, so swapping the theme cannot change layout.

use crate::config::ColorMode;
use crate::{fonts, highlighting, MdpError};
use std::borrow::Cow;

/// Layout rules shared by both color modes.
pub const GITHUB_CSS_BASE: &str = r#"
html {
    -webkit-print-color-adjust: exact;
    print-color-adjust: exact;
}

* {
    box-sizing: border-box;
    margin: 0;
    padding: 0;
}

body {
    font-family: "NotoColorEmoji", -apple-system, "Segoe UI", Helvetica, Arial, sans-serif;
    font-size: 16px;
    line-height: 1.5;
    max-width: 860px;
    margin: 0 auto;
    padding: 40px 32px;
}

h1, h2, h3, h4, h5, h6 {
    margin-top: 24px;
    margin-bottom: 16px;
    font-weight: 600;
    line-height: 1.25;
}

h1 { font-size: 2em; padding-bottom: 0.3em; border-bottom-width: 1px; border-bottom-style: solid; }
h2 { font-size: 1.5em; padding-bottom: 0.3em; border-bottom-width: 1px; border-bottom-style: solid; }
h3 { font-size: 1.25em; }
h4 { font-size: 1em; }
h5 { font-size: 0.875em; }
h6 { font-size: 0.85em; }

p {
    margin-top: 0;
    margin-bottom: 16px;
}

a {
    text-decoration: none;
}

ul, ol {
    margin-top: 0;
    margin-bottom: 16px;
    padding-left: 2em;
}

li {
    margin-top: 4px;
}

ul ul, ul ol, ol ul, ol ol {
    margin-top: 0;
    margin-bottom: 0;
}

blockquote {
    margin: 0 0 16px 0;
    padding: 0 1em;
    border-left-width: 4px;
    border-left-style: solid;
}

blockquote > :first-child { margin-top: 0; }
blockquote > :last-child  { margin-bottom: 0; }

hr {
    height: 4px;
    padding: 0;
    margin: 24px 0;
    border: 0;
}

/* Inline code */
code {
    font-family: "SFMono-Regular", Consolas, "Liberation Mono", Menlo, monospace;
    font-size: 85%;
    padding: 0.2em 0.4em;
    border-radius: 6px;
}

/* Code blocks */
pre {
    font-family: "SFMono-Regular", Consolas, "Liberation Mono", Menlo, monospace;
    font-size: 85%;
    line-height: 1.45;
    border-radius: 6px;
    border-width: 1px;
    border-style: solid;
    padding: 16px;
    margin-top: 0;
    margin-bottom: 16px;
    white-space: pre-wrap;
    word-wrap: break-word;
}

pre code {
    display: block;
    font-size: 100%;
    padding: 0;
    margin: 0;
    background-color: transparent;
    border: 0;
    border-radius: 0;
    white-space: pre-wrap;
    word-break: normal;
}

.codehilite {
    margin-bottom: 16px;
    border-radius: 6px;
    border-width: 1px;
    border-style: solid;
    overflow: hidden;
}

.codehilite pre {
    margin: 0;
    border: 0;
    border-radius: 0;
    padding: 16px;
}

/* Tables */
table {
    width: 100%;
    border-collapse: collapse;
    border-spacing: 0;
    margin-top: 0;
    margin-bottom: 16px;
}

tr {
    border-top-width: 1px;
    border-top-style: solid;
}

th, td {
    padding: 6px 13px;
    border-width: 1px;
    border-style: solid;
    text-align: left;
    vertical-align: top;
}

th {
    font-weight: 600;
}

img {
    max-width: 100%;
    height: auto;
}

strong { font-weight: 600; }
em     { font-style: italic; }
del    { text-decoration: line-through; }

dt {
    font-weight: bold;
    margin-top: 8px;
}

dd {
    margin-left: 2em;
    margin-bottom: 4px;
}

.footnote {
    font-size: 85%;
    border-top-width: 1px;
    border-top-style: solid;
    margin-top: 32px;
    padding-top: 16px;
}

/* Page break helpers */
h1, h2, h3          { page-break-after: avoid; }
pre, blockquote, table { page-break-inside: avoid; }
"#;

/// Light mode colors (default).
pub const GITHUB_CSS_LIGHT: &str = r#"
body {
    background-color: #ffffff;
    color: #1f2328;
}

h1, h2, h3, h4, h5, h6 { color: #1f2328; }
h1, h2 { border-bottom-color: #d1d9e0; }
h6 { color: #59636e; }

a { color: #0969da; }

blockquote {
    border-left-color: #d1d9e0;
    color: #59636e;
}

hr { background-color: #d1d9e0; }

code {
    background-color: #f6f8fa;
    color: #1f2328;
}

pre {
    background-color: #f6f8fa;
    border-color: #d1d9e0;
    color: #1f2328;
}

.codehilite { border-color: #d1d9e0; }
.codehilite pre { background-color: #f6f8fa; color: #1f2328; }

tr { background-color: #ffffff; border-top-color: #d1d9e0; }
tr:nth-child(2n) { background-color: #f6f8fa; }
th, td { border-color: #d1d9e0; }
th { background-color: #f6f8fa; }

.footnote { border-top-color: #d1d9e0; }
"#;

/// Dark mode colors.
pub const GITHUB_CSS_DARK: &str = r#"
body {
    background-color: #0d1117;
    color: #e6edf3;
}

h1, h2, h3, h4, h5, h6 { color: #e6edf3; }
h1, h2 { border-bottom-color: #30363d; }
h6 { color: #8b949e; }

a { color: #4493f8; }

blockquote {
    border-left-color: #3d444d;
    color: #8b949e;
}

hr { background-color: #3d444d; }

code {
    background-color: #161b22;
    color: #e6edf3;
}

pre {
    background-color: #0d1117;
    border-color: #30363d;
    color: #e6edf3;
}

.codehilite { border-color: #30363d; }
.codehilite pre { background-color: #0d1117; color: #e6edf3; }

tr { background-color: #0d1117; border-top-color: #30363d; }
tr:nth-child(2n) { background-color: #161b22; }
th, td { border-color: #30363d; }
th { background-color: #161b22; }

.footnote { border-top-color: #30363d; }
"#;

/// Which concern a stylesheet layer covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Structural,
    Theme,
    SyntaxHighlight,
    FontFaces,
}

/// One self-contained block of CSS rules.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleLayer {
    pub kind: LayerKind,
    pub css: Cow<'static, str>,
}

/// Ordered stylesheet layers; the order is the cascade order.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleBundle {
    layers: Vec<StyleLayer>,
}

impl StyleBundle {
    pub fn layers(&self) -> &[StyleLayer] {
        &self.layers
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&StyleLayer> {
        self.layers.iter().find(|l| l.kind == kind)
    }
}

/// Selects the color layer for a mode.
pub fn theme_css(mode: ColorMode) -> &'static str {
    match mode {
        ColorMode::Light => GITHUB_CSS_LIGHT,
        ColorMode::Dark => GITHUB_CSS_DARK,
    }
}

/// Builds the stylesheet layers for `mode`.
///
/// The font-face layer is only present when `with_fonts` is set and at least
/// one font is bundled into the binary.
pub fn compose_stylesheets(mode: ColorMode, with_fonts: bool) -> Result<StyleBundle, MdpError> {
    let mut layers = vec![
        StyleLayer {
            kind: LayerKind::Structural,
            css: Cow::Borrowed(GITHUB_CSS_BASE),
        },
        StyleLayer {
            kind: LayerKind::Theme,
            css: Cow::Borrowed(theme_css(mode)),
        },
        StyleLayer {
            kind: LayerKind::SyntaxHighlight,
            css: Cow::Owned(highlighting::stylesheet_for(mode)?),
        },
    ];

    if with_fonts {
        let assets = fonts::bundled_fonts()?;
        if !assets.is_empty() {
            layers.push(StyleLayer {
                kind: LayerKind::FontFaces,
                css: Cow::Owned(fonts::font_face_css(&assets)),
            });
        }
    }

    Ok(StyleBundle { layers })
}
